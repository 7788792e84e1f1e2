mod attester;
mod constants;
mod logging;

pub use attester::{AttesterConfig, RedactedConfig};
pub use constants::*;
pub use logging::{LogLevel, LoggingConfig};
