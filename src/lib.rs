pub mod cli;
pub mod config;
pub mod dispatch;
pub mod errlog;
pub mod healthchecks;
pub mod host;
pub mod phase;
pub mod slug;
pub mod tags;

/// Exit code for any fatal hook error.
pub const DEFAULT_ERROR_CODE: i32 = 666;

// Public API
pub use config::{CliOverrides, HcConfig, JobEnv};
pub use dispatch::Dispatcher;
pub use errlog::PendingErrorLog;
pub use healthchecks::{CheckSpec, HcClient, HcError, Monitoring, Report};
pub use host::context::HostContext;
pub use host::{HostError, HostProbe, SystemProbe};
pub use phase::Phase;
pub use slug::slugify;
