use crate::buffer::LogBuffer;
use crate::console::Console;
use crate::init::ClientConfig;
use crate::layer::CaptureLayer;
use crate::record::{LogLevel, LogRecord, LogValue};
use crate::sink::{ApiKey, LogSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// A buffer this many times over the batch size after a failed delivery
/// is reported, since growth under a sustained outage is unbounded.
const BACKLOG_WARN_FACTOR: usize = 10;

/// Lower bound for the periodic flush interval.
const MIN_BATCH_PERIOD: Duration = Duration::from_millis(10);

/// Arguments of [`Logmonitor::init`].
#[derive(Clone)]
pub struct InitOptions {
    pub api_key: String,
}

impl std::fmt::Debug for InitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitOptions")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl InitOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

/// Result of one [`Logmonitor::flush`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No credential or nothing buffered; no request was made.
    Skipped,
    /// The collector accepted this many records.
    Delivered(usize),
    /// Delivery failed and this many records went back to the buffer head.
    Requeued(usize),
}

/// Counters of what the client has done since it was constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Records appended to the buffer.
    pub captured: u64,
    /// Records accepted by the collector.
    pub delivered: u64,
    /// Records put back after a failed attempt (counted per attempt).
    pub requeued: u64,
    /// Delivery attempts that did not end in acceptance.
    pub failed_attempts: u64,
    /// Times capture was switched on by `init`.
    pub activations: u64,
}

#[derive(Default)]
struct Counters {
    captured: AtomicU64,
    delivered: AtomicU64,
    requeued: AtomicU64,
    failed_attempts: AtomicU64,
    activations: AtomicU64,
}

struct State {
    initialized: bool,
    active: bool,
    api_key: Option<ApiKey>,
    user_id: Option<String>,
    buffer: LogBuffer,
    runtime: Option<Handle>,
    timer: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
    teardown_signal: Option<Arc<Notify>>,
}

struct Inner {
    config: ClientConfig,
    sink: Arc<dyn LogSink>,
    state: Mutex<State>,
    counters: Counters,
}

/// Log collector client.
///
/// A `Logmonitor` starts dormant. [`init`](Logmonitor::init) stores the
/// credential and, in production mode only, switches capture on: records
/// reach the buffer through a [`CaptureLayer`] or an
/// [`InterceptedConsole`](crate::console::InterceptedConsole), a periodic
/// timer flushes the buffer, and a teardown hook performs one last flush.
///
/// Handles are cheap to clone and share one buffer. When the last handle is
/// dropped the timer and teardown hook are cancelled and whatever is still
/// buffered is sent once, best-effort.
#[derive(Clone)]
pub struct Logmonitor {
    inner: Arc<Inner>,
}

/// Non-owning handle held by capture adapters, so an installed layer or
/// console never keeps the client alive.
#[derive(Clone)]
pub struct WeakLogmonitor {
    inner: Weak<Inner>,
}

impl WeakLogmonitor {
    pub fn upgrade(&self) -> Option<Logmonitor> {
        self.inner.upgrade().map(|inner| Logmonitor { inner })
    }
}

impl Logmonitor {
    /// Create a dormant client delivering through `sink`.
    ///
    /// A `batch_period` below 10ms is raised to 10ms.
    pub fn new(mut config: ClientConfig, sink: Arc<dyn LogSink>) -> Self {
        config.batch_period = config.batch_period.max(MIN_BATCH_PERIOD);
        let buffer = LogBuffer::new(config.batch_size);
        let state = State {
            initialized: false,
            active: false,
            api_key: None,
            user_id: None,
            buffer,
            runtime: None,
            timer: None,
            teardown: None,
            teardown_signal: None,
        };
        Logmonitor {
            inner: Arc::new(Inner {
                config,
                sink,
                state: Mutex::new(state),
                counters: Counters::default(),
            }),
        }
    }

    /// Create a dormant client that posts to `config.endpoint` over HTTP.
    #[cfg(feature = "http")]
    pub fn with_http(config: ClientConfig) -> Result<Self, crate::sink::SinkError> {
        use crate::http::{HttpSink, HttpSinkConfig};

        let sink = HttpSink::new(HttpSinkConfig {
            endpoint: config.endpoint.clone(),
            timeout: config.request_timeout,
        })?;
        Ok(Self::new(config, Arc::new(sink)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakLogmonitor {
        WeakLogmonitor {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// `tracing` layer mirroring events into this client.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer::new(self.downgrade())
    }

    /// Wrap the host's console so every call is also captured here.
    pub fn intercept<C: Console>(&self, console: C) -> crate::console::InterceptedConsole<C> {
        crate::console::InterceptedConsole::new(console, self.downgrade())
    }

    /// Store the credential and, in production mode, start capturing.
    ///
    /// A second call while initialized only logs a warning. Outside a tokio
    /// runtime capture cannot be scheduled, so the client stays inert.
    pub fn init(&self, options: InitOptions) {
        let mut state = self.inner.lock();
        if state.initialized {
            drop(state);
            warn!("Logmonitor is already initialized.");
            return;
        }
        state.api_key = Some(ApiKey::new(options.api_key));
        state.initialized = true;

        if !self.inner.config.mode.is_production() {
            drop(state);
            debug!(mode = ?self.inner.config.mode, "capture disabled outside production");
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                drop(state);
                warn!("no tokio runtime available, capture stays disabled");
                return;
            }
        };

        state.active = true;
        state.timer = Some(runtime.spawn(run_timer(
            self.downgrade(),
            self.inner.config.batch_period,
        )));
        let signal = Arc::new(Notify::new());
        state.teardown = Some(runtime.spawn(run_teardown_hook(
            self.downgrade(),
            Arc::clone(&signal),
        )));
        state.teardown_signal = Some(signal);
        state.runtime = Some(runtime);
        drop(state);

        self.inner.counters.activations.fetch_add(1, Ordering::Relaxed);
        debug!(
            batch_size = self.inner.config.batch_size,
            period_ms = self.inner.config.batch_period.as_millis() as u64,
            "capture activated"
        );
    }

    /// Tag records captured from now on with `user_id`.
    pub fn set_user(&self, user_id: impl Into<String>) {
        self.inner.lock().user_id = Some(user_id.into());
    }

    pub fn clear_user(&self) {
        self.inner.lock().user_id = None;
    }

    /// Append a captured call to the buffer.
    ///
    /// Ignored unless capture is active. When the buffer reaches the batch
    /// size it is detached right away and delivered on a background task.
    pub fn record(&self, level: LogLevel, args: Vec<LogValue>) {
        let mut state = self.inner.lock();
        if !state.active {
            return;
        }
        let record = LogRecord::capture(level, args, state.user_id.clone());
        let full = state.buffer.push(record);
        self.inner.counters.captured.fetch_add(1, Ordering::Relaxed);

        if !full {
            return;
        }
        let Some(runtime) = state.runtime.clone() else {
            return;
        };
        let Some((api_key, batch)) = detach(&mut state) else {
            return;
        };
        drop(state);

        let client = self.clone();
        runtime.spawn(async move {
            client.deliver(api_key, batch).await;
        });
    }

    /// Detach everything buffered and try to deliver it.
    ///
    /// Does nothing without a credential or with an empty buffer. Records
    /// captured while the request is in flight go into the fresh buffer; on
    /// failure the batch is put back ahead of them.
    pub async fn flush(&self) -> FlushOutcome {
        let detached = detach(&mut self.inner.lock());
        match detached {
            Some((api_key, batch)) => self.deliver(api_key, batch).await,
            None => FlushOutcome::Skipped,
        }
    }

    async fn deliver(&self, api_key: ApiKey, batch: Vec<LogRecord>) -> FlushOutcome {
        let count = batch.len();
        match self.inner.sink.send(&api_key, &batch).await {
            Ok(()) => {
                self.inner
                    .counters
                    .delivered
                    .fetch_add(count as u64, Ordering::Relaxed);
                debug!(records = count, "log batch delivered");
                FlushOutcome::Delivered(count)
            }
            Err(e) => {
                let (backlog, batch_size) = {
                    let mut state = self.inner.lock();
                    state.buffer.requeue_front(batch);
                    (state.buffer.len(), state.buffer.batch_size())
                };
                self.inner.counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .counters
                    .requeued
                    .fetch_add(count as u64, Ordering::Relaxed);
                warn!(error = %e, records = count, "log batch delivery failed, requeued");
                if backlog > batch_size * BACKLOG_WARN_FACTOR {
                    warn!(buffered = backlog, "log buffer keeps growing while deliveries fail");
                }
                FlushOutcome::Requeued(count)
            }
        }
    }

    /// Fire the teardown hook: the client flushes once more in the
    /// background. Call this from the host's shutdown path, for example
    /// its own Ctrl-C handler.
    ///
    /// Each activation has its own hook; a signal sent after the hook fired
    /// or while inactive is dropped.
    pub fn notify_teardown(&self) {
        let state = self.inner.lock();
        if !state.active {
            return;
        }
        let hook_pending = state.teardown.as_ref().is_some_and(|t| !t.is_finished());
        if let (true, Some(signal)) = (hook_pending, state.teardown_signal.as_ref()) {
            signal.notify_one();
        }
    }

    /// Stop capturing and send what is left.
    ///
    /// Cancels the timer and teardown hook, makes every capture adapter a
    /// pure pass-through, flushes once and drops the credential. Calling it
    /// again, or before `init`, does nothing.
    pub async fn dispose(&self) {
        let (timer, teardown) = {
            let mut state = self.inner.lock();
            if !state.initialized {
                return;
            }
            state.active = false;
            state.teardown_signal = None;
            (state.timer.take(), state.teardown.take())
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(teardown) = teardown {
            teardown.abort();
        }

        let outcome = self.flush().await;
        debug!(?outcome, "final flush on dispose");

        let mut state = self.inner.lock();
        state.initialized = false;
        state.api_key = None;
        state.runtime = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Whether captured calls currently reach the buffer.
    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    /// Copy of the records waiting for delivery, oldest first.
    pub fn buffered(&self) -> Vec<LogRecord> {
        self.inner.lock().buffer.snapshot()
    }

    pub fn stats(&self) -> ClientStats {
        let c = &self.inner.counters;
        ClientStats {
            captured: c.captured.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            requeued: c.requeued.load(Ordering::Relaxed),
            failed_attempts: c.failed_attempts.load(Ordering::Relaxed),
            activations: c.activations.load(Ordering::Relaxed),
        }
    }
}

impl Console for Logmonitor {
    fn write(&self, level: LogLevel, args: &[LogValue]) {
        self.record(level, args.to_vec());
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if let Some(teardown) = state.teardown.take() {
            teardown.abort();
        }
        if !state.active {
            return;
        }
        let (Some(runtime), Some((api_key, batch))) = (state.runtime.take(), detach(state)) else {
            return;
        };

        // Nothing is left to requeue into, so this send is fire-and-forget.
        let sink = Arc::clone(&self.sink);
        runtime.spawn(async move {
            if let Err(e) = sink.send(&api_key, &batch).await {
                warn!(error = %e, records = batch.len(), "final log batch lost");
            }
        });
    }
}

fn detach(state: &mut State) -> Option<(ApiKey, Vec<LogRecord>)> {
    let api_key = state.api_key.clone()?;
    if state.buffer.is_empty() {
        return None;
    }
    Some((api_key, state.buffer.detach()))
}

async fn run_timer(weak: WeakLogmonitor, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(client) = weak.upgrade() else {
            break;
        };
        if client.buffered_len() > 0 {
            client.flush().await;
        }
    }
}

async fn run_teardown_hook(weak: WeakLogmonitor, signal: Arc<Notify>) {
    signal.notified().await;
    if let Some(client) = weak.upgrade() {
        let outcome = client.flush().await;
        debug!(?outcome, "teardown flush");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::DeploymentMode;
    use crate::noop_sink::NoopSink;
    use crate::sink::SinkError;
    use async_trait::async_trait;
    use tracing_test::traced_test;

    struct RejectingSink;

    #[async_trait]
    impl LogSink for RejectingSink {
        async fn send(&self, _api_key: &ApiKey, _batch: &[LogRecord]) -> Result<(), SinkError> {
            Err(SinkError::UnexpectedStatus(503))
        }
    }

    fn production() -> ClientConfig {
        ClientConfig {
            mode: DeploymentMode::Production,
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn second_init_warns_and_activates_once() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        client.init(InitOptions::new("k"));
        client.init(InitOptions::new("other"));

        assert!(logs_contain("Logmonitor is already initialized."));
        assert_eq!(client.stats().activations, 1);
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|l| l.contains("capture activated")).count() {
                1 => Ok(()),
                n => Err(format!("capture activated {} times", n)),
            }
        });
    }

    #[tokio::test]
    async fn development_mode_records_config_only() {
        let client = Logmonitor::new(ClientConfig::default(), Arc::new(NoopSink));
        client.init(InitOptions::new("k"));

        assert!(client.is_initialized());
        assert!(!client.is_active());
        client.record(LogLevel::Warn, vec![LogValue::from("ignored")]);
        assert_eq!(client.buffered_len(), 0);
        assert_eq!(client.stats().activations, 0);
    }

    #[test]
    fn init_outside_runtime_stays_inert() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        client.init(InitOptions::new("k"));
        assert!(client.is_initialized());
        assert!(!client.is_active());
    }

    #[tokio::test]
    async fn identity_is_taken_at_capture_time() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        client.set_user("early");
        client.init(InitOptions::new("k"));

        client.record(LogLevel::Info, vec![LogValue::from("one")]);
        client.set_user("a");
        client.record(LogLevel::Info, vec![LogValue::from("two")]);
        client.set_user("b");
        client.record(LogLevel::Info, vec![LogValue::from("three")]);
        client.clear_user();
        client.record(LogLevel::Info, vec![LogValue::from("four")]);

        let users: Vec<Option<String>> = client
            .buffered()
            .into_iter()
            .map(|r| r.log_user_id)
            .collect();
        assert_eq!(
            users,
            vec![
                Some("early".to_string()),
                Some("a".to_string()),
                Some("b".to_string()),
                None
            ]
        );
    }

    #[tokio::test]
    async fn flush_without_credential_is_skipped() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        assert_eq!(client.flush().await, FlushOutcome::Skipped);
        client.init(InitOptions::new("k"));
        assert_eq!(client.flush().await, FlushOutcome::Skipped);
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_resets() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        client.dispose().await;

        client.init(InitOptions::new("k"));
        client.record(LogLevel::Error, vec![LogValue::from("bye")]);
        client.dispose().await;
        client.dispose().await;

        assert!(!client.is_initialized());
        assert!(!client.is_active());
        assert_eq!(client.buffered_len(), 0);
        assert_eq!(client.stats().delivered, 1);

        client.record(LogLevel::Error, vec![LogValue::from("after")]);
        assert_eq!(client.buffered_len(), 0);
    }

    #[tokio::test]
    async fn reinit_after_dispose_activates_again() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        client.init(InitOptions::new("k"));
        client.dispose().await;
        client.init(InitOptions::new("k2"));
        assert!(client.is_active());
        assert_eq!(client.stats().activations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped_and_timer_keeps_flushing() {
        let config = ClientConfig {
            batch_period: Duration::ZERO,
            ..production()
        };
        let client = Logmonitor::new(config, Arc::new(NoopSink));
        assert_eq!(client.config().batch_period, MIN_BATCH_PERIOD);
        client.init(InitOptions::new("k"));

        client.record(LogLevel::Info, vec![LogValue::from("first")]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.buffered_len(), 0);

        client.record(LogLevel::Info, vec![LogValue::from("second")]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.buffered_len(), 0);
        assert_eq!(client.stats().delivered, 2);
    }

    #[tokio::test]
    async fn teardown_signal_does_not_leak_into_next_activation() {
        let client = Logmonitor::new(production(), Arc::new(NoopSink));
        client.init(InitOptions::new("k"));
        client.record(LogLevel::Warn, vec![LogValue::from("one")]);
        client.notify_teardown();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(client.stats().delivered, 1);

        // Hook already fired: this must not arm the next activation.
        client.notify_teardown();
        client.dispose().await;
        client.notify_teardown();

        client.init(InitOptions::new("k"));
        client.record(LogLevel::Warn, vec![LogValue::from("two")]);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(client.buffered_len(), 1);
        assert_eq!(client.stats().delivered, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn backlog_warning_follows_buffer_batch_size() {
        let config = ClientConfig {
            batch_size: 3,
            ..production()
        };
        let client = Logmonitor::new(config, Arc::new(RejectingSink));
        client.init(InitOptions::new("k"));
        let backlog: Vec<LogRecord> = (0..31)
            .map(|i| LogRecord::capture(LogLevel::Log, vec![LogValue::from(i)], None))
            .collect();
        client.inner.lock().buffer.requeue_front(backlog);

        assert_eq!(client.flush().await, FlushOutcome::Requeued(31));
        assert_eq!(client.buffered_len(), 31);
        assert!(logs_contain("log buffer keeps growing while deliveries fail"));
    }
}
