use clap::Subcommand;

use focuslog_core::{
    HttpPushDelivery, NotificationDispatcher, OwnerId, SubscriptionService, SubscriptionUpsert,
    SystemClock,
};

use super::{context, print_json, CliError};

#[derive(Subcommand)]
pub enum PushAction {
    /// Register a push subscription for the owner
    Subscribe {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        p256dh: String,
        #[arg(long)]
        auth: String,
    },
    /// Deactivate the subscription with this endpoint
    Unsubscribe {
        #[arg(long)]
        endpoint: String,
    },
    /// Evaluate all running sessions and deliver due overdue notifications
    Dispatch,
}

pub fn run(owner: Option<OwnerId>, action: PushAction) -> Result<(), CliError> {
    let mut ctx = context(owner)?;
    let clock = SystemClock;

    match action {
        PushAction::Subscribe {
            endpoint,
            p256dh,
            auth,
        } => {
            SubscriptionService::new(&mut ctx.store, &clock).register(
                &ctx.owner,
                SubscriptionUpsert {
                    endpoint: endpoint.clone(),
                    p256dh,
                    auth,
                },
            )?;
            println!("{{\"subscribed\": {}}}", serde_json::json!(endpoint));
        }
        PushAction::Unsubscribe { endpoint } => {
            SubscriptionService::new(&mut ctx.store, &clock).unregister(&ctx.owner, &endpoint)?;
            println!("{{\"unsubscribed\": {}}}", serde_json::json!(endpoint));
        }
        PushAction::Dispatch => {
            let delivery = HttpPushDelivery::new(ctx.config.push.ttl_secs);
            let report =
                NotificationDispatcher::new(&mut ctx.store, &clock, &delivery).run_pass()?;
            print_json(&report)?;
        }
    }

    Ok(())
}
