//! Background push notifications for overdue sessions.
//!
//! Subscription management, the delivery seam, and the dispatch pass that a
//! periodic external trigger drives -- the library runs no timer of its own.

pub mod delivery;
pub mod dispatch;
pub mod subscription;

pub use delivery::{DeliveryOutcome, HttpPushDelivery, PushDelivery};
pub use dispatch::{
    notification_message, notification_step, DispatchReport, NotificationDispatcher,
    OVERDUE_STEP_SECONDS,
};
pub use subscription::{PushSubscription, SubscriptionService, SubscriptionUpsert};
