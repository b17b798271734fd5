//! Realtime hub client
//!
//! Owns at most one live connection to the MoodLink notification hub and
//! fans inbound chat messages and notifications out to registered listeners.
//! Two recovery paths exist and must not be confused:
//!
//! - the *initial open* is retried on a bounded budget (`RetryPolicy`,
//!   5 attempts 5 s apart by default), with one user-visible alert when the
//!   budget is exhausted;
//! - a *mid-session drop* is resumed by the reader task walking the
//!   `ReconnectSchedule` ladder; exhausting the ladder is a permanent close
//!   with no alert.

mod state;

pub use state::ConnectionState;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::auth::TokenProvider;
use crate::config::Settings;
use crate::events::{ChatMessage, ClientAlert, Notification};
use crate::fanout::{SubscriberSet, Subscription};
use crate::protocol::{parse_server_frame, ClientFrame, ServerFrame};
use crate::retry::{ReconnectSchedule, RetryPolicy};
use crate::transport::{FrameSink, FrameStream, Transport};

const EXHAUSTED_ALERT: &str = "Could not reach the server. Please reload the page.";

/// Client for the MoodLink realtime hub
///
/// Cheap to clone via the inner `Arc`; construct one per user session at the
/// composition root and tie `start_connection`/`stop_connection` to
/// login/logout.
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    hub_url: String,
    policy: RetryPolicy,
    resume_delays_ms: Vec<u64>,
    jitter_factor: f64,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,

    state: Mutex<ConnectionState>,
    /// User bound to the connection; `None` means torn down. Pending timers
    /// check this at fire time and silently exit when it is unset.
    subject_id: Mutex<Option<String>>,
    /// Failed opens in the current start cycle
    failed_opens: AtomicU32,
    /// Bumped on every open attempt and on teardown; stale readers and
    /// in-flight opens compare against it before touching shared state
    generation: AtomicU64,
    sink: tokio::sync::Mutex<Option<Box<dyn FrameSink>>>,
    retry_timer: Mutex<Option<JoinHandle<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,

    message_subscribers: SubscriberSet<ChatMessage>,
    notification_subscribers: SubscriberSet<Notification>,
    connection_subscribers: SubscriberSet<bool>,
    alert_subscribers: SubscriberSet<ClientAlert>,
}

impl RealtimeClient {
    pub fn new(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                hub_url: settings.server.hub_url(),
                policy: RetryPolicy::new(
                    settings.reconnect.max_attempts,
                    settings.reconnect.retry_delay_ms,
                ),
                resume_delays_ms: settings.reconnect.resume_delays_ms.clone(),
                jitter_factor: settings.reconnect.jitter_factor,
                transport,
                tokens,
                state: Mutex::new(ConnectionState::Disconnected),
                subject_id: Mutex::new(None),
                failed_opens: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                sink: tokio::sync::Mutex::new(None),
                retry_timer: Mutex::new(None),
                reader: Mutex::new(None),
                message_subscribers: SubscriberSet::new(),
                notification_subscribers: SubscriberSet::new(),
                connection_subscribers: SubscriberSet::new(),
                alert_subscribers: SubscriberSet::new(),
            }),
        }
    }

    /// Open the hub connection for `subject_id`, authenticating with
    /// `credential`. No-op returning `true` when already connected; returns
    /// `false` when the open fails (the bounded retry procedure then runs in
    /// the background) or when an open is already in flight.
    pub async fn start_connection(&self, credential: &str, subject_id: &str) -> bool {
        match self.inner.state() {
            ConnectionState::Connected => {
                tracing::debug!(subject_id = %subject_id, "Already connected, start is a no-op");
                return true;
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                tracing::debug!(
                    subject_id = %subject_id,
                    "A connection attempt is already in flight, ignoring start"
                );
                return false;
            }
            ConnectionState::Disconnected => {}
        }

        self.inner.cancel_retry_timer();
        *self.inner.subject_id.lock().expect("subject lock poisoned") =
            Some(subject_id.to_string());
        self.inner.failed_opens.store(0, Ordering::SeqCst);

        ClientInner::open_once(self.inner.clone(), credential.to_string()).await
    }

    /// Tear the connection down. Cancels any pending retry timer, clears the
    /// retained subject and closes the transport; cleanup proceeds even when
    /// the close itself fails. Safe to call when nothing was ever opened.
    pub async fn stop_connection(&self) {
        let inner = &self.inner;

        // Invalidate in-flight opens and the reader before touching the sink
        inner.generation.fetch_add(1, Ordering::SeqCst);
        inner.cancel_retry_timer();
        *inner.subject_id.lock().expect("subject lock poisoned") = None;
        if let Some(reader) = inner.reader.lock().expect("reader lock poisoned").take() {
            reader.abort();
        }

        if let Some(mut sink) = inner.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                tracing::warn!(error = %e, "Transport close failed during teardown");
            }
        }

        inner.set_state(ConnectionState::Disconnected);
        inner.connection_subscribers.emit(&false);
        tracing::info!("Hub connection stopped");
    }

    /// Relay a chat message through the hub. Fails fast with `false` when not
    /// connected; never queues and never panics. The delivery echo arrives
    /// asynchronously as a regular inbound message.
    pub async fn send_message(&self, channel_id: &str, content: &str) -> bool {
        if !self.is_connected() {
            tracing::debug!(channel_id = %channel_id, "Not connected, dropping send");
            return false;
        }

        let frame = match serde_json::to_string(&ClientFrame::send_message(channel_id, content)) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode outbound frame");
                return false;
            }
        };

        let mut guard = self.inner.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return false;
        };
        match sink.send(frame).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(channel_id = %channel_id, error = %e, "Hub send failed");
                false
            }
        }
    }

    pub fn on_receive_message(
        &self,
        callback: impl Fn(&ChatMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.message_subscribers.subscribe(callback)
    }

    pub fn on_receive_notification(
        &self,
        callback: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.notification_subscribers.subscribe(callback)
    }

    /// Observe connection availability: `true` on connect/resume, `false` on
    /// drop, permanent close and teardown.
    pub fn on_connection_change(
        &self,
        callback: impl Fn(&bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.connection_subscribers.subscribe(callback)
    }

    /// Observe user-visible alerts (currently only retry exhaustion)
    pub fn on_alert(&self, callback: impl Fn(&ClientAlert) + Send + Sync + 'static) -> Subscription {
        self.inner.alert_subscribers.subscribe(callback)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }
}

impl Clone for RealtimeClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ClientInner {
    fn state(&self) -> ConnectionState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock().expect("state lock poisoned");
        if *state != next {
            tracing::debug!(from = %state, to = %next, "Connection state transition");
            *state = next;
        }
    }

    fn subject_is_set(&self) -> bool {
        self.subject_id
            .lock()
            .expect("subject lock poisoned")
            .is_some()
    }

    fn generation_is(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn cancel_retry_timer(&self) {
        if let Some(timer) = self
            .retry_timer
            .lock()
            .expect("retry timer lock poisoned")
            .take()
        {
            timer.abort();
        }
    }

    /// One transport open attempt. On success installs the sink, spawns the
    /// reader and resets the failure counter; on failure schedules the next
    /// bounded retry.
    async fn open_once(inner: Arc<ClientInner>, credential: String) -> bool {
        // Torn down since this open was scheduled
        if !inner.subject_is_set() {
            return false;
        }

        inner.set_state(ConnectionState::Connecting);
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match inner.transport.open(&inner.hub_url, &credential).await {
            Ok((sink, stream)) => {
                if !inner.generation_is(generation) || !inner.subject_is_set() {
                    // Torn down while the open was in flight
                    let mut sink = sink;
                    let _ = sink.close().await;
                    if !inner.subject_is_set() {
                        inner.set_state(ConnectionState::Disconnected);
                    }
                    return false;
                }

                *inner.sink.lock().await = Some(sink);
                inner.set_state(ConnectionState::Connected);
                inner.failed_opens.store(0, Ordering::SeqCst);
                inner.connection_subscribers.emit(&true);
                tracing::info!(url = %inner.hub_url, "Hub connection established");

                let reader_inner = inner.clone();
                let handle = tokio::spawn(async move {
                    ClientInner::run_reader(reader_inner, stream, generation).await;
                });
                if let Some(previous) = inner
                    .reader
                    .lock()
                    .expect("reader lock poisoned")
                    .replace(handle)
                {
                    previous.abort();
                }
                true
            }
            Err(e) => {
                if !inner.subject_is_set() {
                    // Teardown raced the failed open; nothing left to retry
                    inner.set_state(ConnectionState::Disconnected);
                    return false;
                }
                let failed = inner.failed_opens.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::warn!(
                    url = %inner.hub_url,
                    attempt = failed,
                    error = %e,
                    "Hub open failed"
                );
                inner.set_state(ConnectionState::Disconnected);
                inner.connection_subscribers.emit(&false);
                inner.schedule_retry(failed);
                false
            }
        }
    }

    /// Schedule the next bounded retry, or surface the single exhaustion
    /// alert once the budget is spent. At most one timer is pending at a
    /// time; scheduling cancels the previous one.
    fn schedule_retry(self: &Arc<Self>, failed_opens: u32) {
        if !self.policy.allows_retry(failed_opens) {
            tracing::error!(
                attempts = failed_opens,
                "Retry budget exhausted, giving up until the next explicit start"
            );
            self.alert_subscribers.emit(&ClientAlert::new(EXHAUSTED_ALERT));
            return;
        }

        self.cancel_retry_timer();

        let inner = self.clone();
        let delay = self.policy.retry_delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Torn down or already connected in the interim
            if !inner.subject_is_set() || inner.state() == ConnectionState::Connected {
                return;
            }

            // Fresh credential per attempt; the token may have been refreshed
            let Some(token) = inner.tokens.bearer_token().await else {
                tracing::warn!("No bearer token available, abandoning retry");
                return;
            };
            ClientInner::open_once(inner.clone(), token).await;
        });
        *self.retry_timer.lock().expect("retry timer lock poisoned") = Some(timer);
    }

    /// Reader task: pumps inbound frames to the listeners and resumes the
    /// connection after a mid-session drop by walking the reconnect ladder.
    async fn run_reader(inner: Arc<ClientInner>, mut stream: Box<dyn FrameStream>, generation: u64) {
        let mut schedule = ReconnectSchedule::new(&inner.resume_delays_ms, inner.jitter_factor);

        loop {
            match stream.next_frame().await {
                Some(Ok(text)) => {
                    inner.dispatch(&text);
                    continue;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Hub read failed");
                }
                None => {
                    tracing::info!("Hub connection closed by server");
                }
            }

            // Drop observed. A newer generation means stop/start already ran.
            if !inner.generation_is(generation) || !inner.subject_is_set() {
                return;
            }

            inner.set_state(ConnectionState::Reconnecting);
            inner.connection_subscribers.emit(&false);

            match ClientInner::resume(&inner, &mut schedule, generation).await {
                Some(new_stream) => {
                    stream = new_stream;
                    // Next drop gets the full ladder again
                    schedule.reset();
                }
                None => return,
            }
        }
    }

    /// Walk the resume ladder. Returns the new read half on success, `None`
    /// on permanent close or teardown.
    async fn resume(
        inner: &Arc<ClientInner>,
        schedule: &mut ReconnectSchedule,
        generation: u64,
    ) -> Option<Box<dyn FrameStream>> {
        loop {
            let Some(delay) = schedule.next_delay() else {
                tracing::error!(
                    attempts = schedule.attempts_made(),
                    "Resume ladder exhausted, closing permanently"
                );
                inner.set_state(ConnectionState::Disconnected);
                inner.connection_subscribers.emit(&false);
                return None;
            };
            tokio::time::sleep(delay).await;

            if !inner.generation_is(generation) || !inner.subject_is_set() {
                return None;
            }

            let Some(token) = inner.tokens.bearer_token().await else {
                tracing::warn!("No bearer token available, skipping resume rung");
                continue;
            };

            match inner.transport.open(&inner.hub_url, &token).await {
                Ok((sink, stream)) => {
                    if !inner.generation_is(generation) || !inner.subject_is_set() {
                        let mut sink = sink;
                        let _ = sink.close().await;
                        return None;
                    }

                    *inner.sink.lock().await = Some(sink);
                    inner.set_state(ConnectionState::Connected);
                    inner.failed_opens.store(0, Ordering::SeqCst);
                    inner.connection_subscribers.emit(&true);
                    tracing::info!(
                        attempt = schedule.attempts_made(),
                        "Hub connection resumed"
                    );
                    return Some(stream);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = schedule.attempts_made(),
                        error = %e,
                        "Resume attempt failed"
                    );
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match parse_server_frame(text) {
            Some(ServerFrame::ReceiveMessage(message)) => {
                self.message_subscribers.emit(&message);
            }
            Some(ServerFrame::ReceiveNotification(notification)) => {
                self.notification_subscribers.emit(&notification);
            }
            None => {}
        }
    }
}
