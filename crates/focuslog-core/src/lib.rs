//! # Focuslog Core Library
//!
//! Core business logic for the focuslog personal productivity backend. It
//! implements a CLI-first philosophy where all operations are available via a
//! standalone CLI binary, with any GUI or HTTP layer being a thin shell over
//! the same core library.
//!
//! ## Architecture
//!
//! - **Sessions**: A timestamp-derived Pomodoro state machine; elapsed and
//!   remaining time are recomputed from stored timestamps and an injected
//!   clock, never from a live timer
//! - **Storage**: SQLite-based record storage and TOML-based configuration
//! - **Push**: Subscription registry plus a dispatch pass that notifies
//!   overdue sessions in 15-minute steps, driven by an external trigger
//! - **Memos**: Markdown journal notes linked to log dates and sessions
//!
//! ## Key Components
//!
//! - [`SessionService`]: Session lifecycle and time accounting
//! - [`Store`]: Record persistence
//! - [`AppConfig`]: Application configuration management
//! - [`NotificationDispatcher`]: Overdue push notification pass

pub mod clock;
pub mod config;
pub mod error;
pub mod memo;
pub mod owner;
pub mod push;
pub mod session;
pub mod settings;
pub mod storage;
pub mod tags;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::{CoreError, StoreError, ValidationError};
pub use memo::{Memo, MemoDraft, MemoService};
pub use owner::OwnerId;
pub use push::{
    DeliveryOutcome, DispatchReport, HttpPushDelivery, NotificationDispatcher, PushDelivery,
    PushSubscription, SubscriptionService, SubscriptionUpsert,
};
pub use session::{
    summarize, Session, SessionPatch, SessionService, SessionStatus, SessionType, StartSession,
    SummaryGroupBy, SummaryRow,
};
pub use settings::{PomodoroSettings, SettingsService, SettingsUpdate};
pub use storage::Store;
