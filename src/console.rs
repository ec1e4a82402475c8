//! The host's logging facility as an explicit sink.
//!
//! Instead of replacing global logging functions, the host composes an
//! [`InterceptedConsole`] around whatever console it already uses. The
//! wrapped console always sees the call first and unchanged; the client
//! only observes it.

use crate::client::WeakLogmonitor;
use crate::record::{format_message, LogLevel, LogValue};
use std::sync::Arc;

/// Something that accepts logging calls at the five console levels.
pub trait Console: Send + Sync {
    fn write(&self, level: LogLevel, args: &[LogValue]);

    fn log(&self, args: &[LogValue]) {
        self.write(LogLevel::Log, args)
    }

    fn info(&self, args: &[LogValue]) {
        self.write(LogLevel::Info, args)
    }

    fn warn(&self, args: &[LogValue]) {
        self.write(LogLevel::Warn, args)
    }

    fn error(&self, args: &[LogValue]) {
        self.write(LogLevel::Error, args)
    }

    fn debug(&self, args: &[LogValue]) {
        self.write(LogLevel::Debug, args)
    }
}

impl<C: Console + ?Sized> Console for Arc<C> {
    fn write(&self, level: LogLevel, args: &[LogValue]) {
        (**self).write(level, args)
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn write(&self, level: LogLevel, args: &[LogValue]) {
        (**self).write(level, args)
    }
}

/// Prints the formatted message: `warn` and `error` to stderr, the rest to
/// stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&self, level: LogLevel, args: &[LogValue]) {
        let message = format_message(args);
        match level {
            LogLevel::Warn | LogLevel::Error => eprintln!("{}", message),
            LogLevel::Log | LogLevel::Info | LogLevel::Debug => println!("{}", message),
        }
    }
}

/// A console that forwards every call to the wrapped console and mirrors
/// it into a [`Logmonitor`](crate::client::Logmonitor).
///
/// Mirroring only happens while the client is active; otherwise, and once
/// the client is disposed or dropped, this is a plain pass-through.
pub struct InterceptedConsole<C> {
    inner: C,
    client: WeakLogmonitor,
}

impl<C: Console> InterceptedConsole<C> {
    pub fn new(inner: C, client: WeakLogmonitor) -> Self {
        Self { inner, client }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Give back the original console.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Console> Console for InterceptedConsole<C> {
    fn write(&self, level: LogLevel, args: &[LogValue]) {
        self.inner.write(level, args);
        if let Some(client) = self.client.upgrade() {
            client.record(level, args.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InitOptions, Logmonitor};
    use crate::init::{ClientConfig, DeploymentMode};
    use crate::noop_sink::NoopSink;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingConsole {
        calls: Mutex<Vec<(LogLevel, Vec<LogValue>)>>,
    }

    impl Console for RecordingConsole {
        fn write(&self, level: LogLevel, args: &[LogValue]) {
            self.calls.lock().unwrap().push((level, args.to_vec()));
        }
    }

    fn client(mode: DeploymentMode) -> Logmonitor {
        let config = ClientConfig {
            mode,
            ..ClientConfig::default()
        };
        Logmonitor::new(config, Arc::new(NoopSink))
    }

    #[tokio::test]
    async fn forwards_unchanged_and_mirrors_each_level() {
        let client = client(DeploymentMode::Production);
        client.init(InitOptions::new("k"));
        let original = Arc::new(RecordingConsole::default());
        let console = client.intercept(Arc::clone(&original));

        let args = vec![LogValue::from("x"), LogValue::from(1)];
        console.log(&args);
        console.info(&args);
        console.warn(&args);
        console.error(&args);
        console.debug(&args);

        let calls = original.calls.lock().unwrap().clone();
        let levels: Vec<LogLevel> = calls.iter().map(|(l, _)| *l).collect();
        assert_eq!(levels, LogLevel::ALL.to_vec());
        assert!(calls.iter().all(|(_, a)| *a == args));

        let buffered = client.buffered();
        assert_eq!(buffered.len(), 5);
        assert!(buffered.iter().all(|r| r.message == "x 1" && r.payload == args));
    }

    #[tokio::test]
    async fn dispose_turns_wrapper_into_pass_through() {
        let client = client(DeploymentMode::Production);
        client.init(InitOptions::new("k"));
        let original = Arc::new(RecordingConsole::default());
        let console = client.intercept(Arc::clone(&original));

        console.warn(&[LogValue::from("before")]);
        client.dispose().await;
        console.warn(&[LogValue::from("after")]);

        assert_eq!(original.calls.lock().unwrap().len(), 2);
        assert_eq!(client.buffered_len(), 0);
        assert_eq!(client.stats().captured, 1);
    }

    #[tokio::test]
    async fn inert_in_development_mode() {
        let client = client(DeploymentMode::Development);
        client.init(InitOptions::new("k"));
        let console = client.intercept(RecordingConsole::default());

        console.error(&[LogValue::from("boom")]);

        assert_eq!(console.inner().calls.lock().unwrap().len(), 1);
        assert_eq!(client.buffered_len(), 0);
    }

    #[test]
    fn dropped_client_leaves_pass_through() {
        let client = client(DeploymentMode::Production);
        let console = client.intercept(RecordingConsole::default());
        drop(client);

        console.info(&[LogValue::from("still printed")]);
        let original = console.into_inner();
        assert_eq!(original.calls.lock().unwrap().len(), 1);
    }
}
