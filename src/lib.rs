pub mod record;
pub mod buffer;
pub mod sink;
pub mod client;
pub mod console;
pub mod layer;

#[cfg(feature = "http")]
pub mod http;

pub mod env;
pub mod init;
pub mod noop_sink;

pub use client::{ClientStats, FlushOutcome, InitOptions, Logmonitor};
pub use console::{Console, InterceptedConsole, StdConsole};
pub use init::{ClientConfig, DeploymentMode};
pub use record::{LogLevel, LogRecord, LogValue};
pub use sink::{ApiKey, LogSink, SinkError};
