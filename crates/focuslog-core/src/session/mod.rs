//! Pomodoro session domain: records, time accounting, the lifecycle state
//! machine, and the completed-session summary aggregator.

pub mod accounting;
pub mod machine;
pub mod summary;
pub mod types;

pub use machine::SessionService;
pub use summary::{summarize, SummaryGroupBy, SummaryRow};
pub use types::{Session, SessionPatch, SessionStatus, SessionType, StartSession};
