//! Push subscription registration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, ValidationError};
use crate::owner::OwnerId;
use crate::storage::Store;

/// Active push subscription row handed to the delivery transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: Uuid,
    pub owner: OwnerId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Registration payload, keyed by (owner, endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionUpsert {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

impl SubscriptionUpsert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_non_empty("endpoint", &self.endpoint)?;
        ValidationError::check_non_empty("p256dh", &self.p256dh)?;
        ValidationError::check_non_empty("auth", &self.auth)?;
        Ok(())
    }
}

/// Subscription use cases over the store.
pub struct SubscriptionService<'a> {
    store: &'a mut Store,
    clock: &'a dyn Clock,
}

impl<'a> SubscriptionService<'a> {
    pub fn new(store: &'a mut Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Register or refresh a subscription; re-registering a deactivated
    /// endpoint reactivates it.
    pub fn register(
        &mut self,
        owner: &OwnerId,
        payload: SubscriptionUpsert,
    ) -> Result<(), CoreError> {
        payload.validate()?;
        self.store.ensure_owner(owner, "")?;
        self.store.upsert_subscription(
            owner,
            &payload.endpoint,
            &payload.p256dh,
            &payload.auth,
            self.clock.now(),
        )?;
        Ok(())
    }

    /// Deactivate the subscription with this endpoint. Unknown endpoints are
    /// a no-op.
    pub fn unregister(&mut self, owner: &OwnerId, endpoint: &str) -> Result<(), CoreError> {
        ValidationError::check_non_empty("endpoint", endpoint)?;
        self.store
            .deactivate_subscription_by_endpoint(owner, endpoint, self.clock.now())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
    }

    fn payload(endpoint: &str) -> SubscriptionUpsert {
        SubscriptionUpsert {
            endpoint: endpoint.into(),
            p256dh: "p256dh-key".into(),
            auth: "auth-secret".into(),
        }
    }

    #[test]
    fn register_then_unregister() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let mut service = SubscriptionService::new(&mut store, &clock);

        service.register(&owner, payload("https://push/a")).unwrap();
        service.register(&owner, payload("https://push/b")).unwrap();
        assert_eq!(store.active_subscriptions(&owner).unwrap().len(), 2);

        let mut service = SubscriptionService::new(&mut store, &clock);
        service.unregister(&owner, "https://push/a").unwrap();
        let subs = store.active_subscriptions(&owner).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].endpoint, "https://push/b");
    }

    #[test]
    fn register_is_idempotent_per_endpoint() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let mut service = SubscriptionService::new(&mut store, &clock);
        service.register(&owner, payload("https://push/a")).unwrap();
        service.register(&owner, payload("https://push/a")).unwrap();
        assert_eq!(store.active_subscriptions(&owner).unwrap().len(), 1);
    }

    #[test]
    fn register_rejects_blank_fields() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let mut service = SubscriptionService::new(&mut store, &clock);
        let err = service.register(&owner, payload(" ")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn unregister_unknown_endpoint_is_noop() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let mut service = SubscriptionService::new(&mut store, &clock);
        service.unregister(&owner, "https://push/none").unwrap();
    }
}
