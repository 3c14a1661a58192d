pub mod alert;
pub mod config;
pub mod event;
pub mod payload;
pub mod retry;
pub mod status;

pub use alert::{AlertKind, DlqAlert};
pub use config::RetryConfig;
pub use event::EventType;
pub use payload::LoadUpdate;
pub use retry::{BackoffPolicy, RetryAttempt, calculate_backoff};
pub use status::{ShipmentStatus, map_upstream_status};
