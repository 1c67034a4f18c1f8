pub mod app_config;
pub mod dispatch;
pub mod logging;
pub mod session;

pub use app_config::AppConfig;
pub use dispatch::{DispatchConfig, PacingConfig};
pub use logging::{LogLevel, ObservabilityConfig, OutputFormat};
pub use session::SessionConfig;
