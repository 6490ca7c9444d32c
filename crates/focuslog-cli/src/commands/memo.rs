use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use uuid::Uuid;

use focuslog_core::{MemoDraft, MemoService, OwnerId, SystemClock};

use super::{context, print_json, CliError};

#[derive(Subcommand)]
pub enum MemoAction {
    /// All memos, newest log date first
    List,
    /// One memo by id
    Get { id: Uuid },
    /// Create a memo
    Create {
        #[arg(long, default_value = "")]
        title: String,
        /// Markdown body
        #[arg(long)]
        body: String,
        /// Log date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Session this memo relates to
        #[arg(long)]
        session: Option<Uuid>,
    },
    /// Rewrite a memo; absent flags keep the current values
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Delete a memo
    Delete { id: Uuid },
}

pub fn run(owner: Option<OwnerId>, action: MemoAction) -> Result<(), CliError> {
    let mut ctx = context(owner)?;
    let clock = SystemClock;
    let mut service = MemoService::new(&mut ctx.store, &clock);

    match action {
        MemoAction::List => print_json(&service.list(&ctx.owner)?)?,
        MemoAction::Get { id } => print_json(&service.get(&ctx.owner, &id)?)?,
        MemoAction::Create {
            title,
            body,
            date,
            tags,
            session,
        } => {
            let memo = service.create(
                &ctx.owner,
                MemoDraft {
                    title,
                    body_md: body,
                    log_date: date.unwrap_or_else(|| Utc::now().date_naive()),
                    tags,
                    related_session_id: session,
                },
            )?;
            print_json(&memo)?;
        }
        MemoAction::Update {
            id,
            title,
            body,
            date,
            tags,
        } => {
            let current = service.get(&ctx.owner, &id)?;
            let memo = service.update(
                &ctx.owner,
                &id,
                MemoDraft {
                    title: title.unwrap_or(current.title),
                    body_md: body.unwrap_or(current.body_md),
                    log_date: date.unwrap_or(current.log_date),
                    tags: tags.unwrap_or(current.tags),
                    related_session_id: current.related_session_id,
                },
            )?;
            print_json(&memo)?;
        }
        MemoAction::Delete { id } => {
            service.delete(&ctx.owner, &id)?;
            println!("{{\"deleted\": \"{id}\"}}");
        }
    }

    Ok(())
}
