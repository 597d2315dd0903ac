pub mod crash_logger;
pub mod logging;
pub mod preferences;
pub mod remote_config;

pub use crash_logger::TracingCrashLogger;
pub use preferences::InMemoryFeePreferences;
pub use remote_config::{HttpRemoteConfig, InMemoryRemoteConfig};
