pub mod monitor;
pub mod service;
pub mod store;

pub use monitor::ThresholdMonitor;
pub use service::DlqService;
pub use store::{
    AttemptOutcome, DeadLetterItem, DeadLetterStore, DlqStats, NewDeadLetter, RecordedAttempt,
    StoreError,
};
