use clap::{Subcommand, ValueEnum};
use uuid::Uuid;

use focuslog_core::session::accounting;
use focuslog_core::{
    Clock, OwnerId, SessionPatch, SessionService, SessionType, StartSession, SystemClock,
};

use super::{context, print_json, CliError};

#[derive(Clone, Copy, ValueEnum)]
pub enum SessionTypeArg {
    Focus,
    ShortBreak,
    LongBreak,
}

impl From<SessionTypeArg> for SessionType {
    fn from(arg: SessionTypeArg) -> Self {
        match arg {
            SessionTypeArg::Focus => SessionType::Focus,
            SessionTypeArg::ShortBreak => SessionType::ShortBreak,
            SessionTypeArg::LongBreak => SessionType::LongBreak,
        }
    }
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session; fails while another one is running or paused
    Start {
        /// Session title
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long = "type", value_enum, default_value = "focus")]
        session_type: SessionTypeArg,
        /// Planned duration in seconds; defaults to the owner's settings
        #[arg(long)]
        planned: Option<u32>,
        /// Position within the Pomodoro cycle
        #[arg(long, default_value = "1")]
        cycle: u32,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Pause the running session
    Pause { id: Uuid },
    /// Resume a paused session
    Resume { id: Uuid },
    /// Complete a running or paused session
    Finish { id: Uuid },
    /// Cancel a running or paused session
    Cancel { id: Uuid },
    /// Edit title and/or tags of an active session
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        /// Comma-separated tags; replaces the whole set
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Print the active session with derived elapsed/remaining time
    Status,
    /// Session history, newest first
    List {
        #[arg(long, default_value = "50")]
        limit: u32,
    },
}

pub fn run(owner: Option<OwnerId>, action: SessionAction) -> Result<(), CliError> {
    let mut ctx = context(owner)?;
    let clock = SystemClock;
    let mut service = SessionService::new(&mut ctx.store, &clock);

    match action {
        SessionAction::Start {
            title,
            session_type,
            planned,
            cycle,
            tags,
        } => {
            let session = service.start(
                &ctx.owner,
                StartSession {
                    title,
                    session_type: session_type.into(),
                    planned_seconds: planned,
                    cycle_index: cycle,
                    tags,
                },
            )?;
            print_json(&session)?;
        }
        SessionAction::Pause { id } => print_json(&service.pause(&ctx.owner, &id)?)?,
        SessionAction::Resume { id } => print_json(&service.resume(&ctx.owner, &id)?)?,
        SessionAction::Finish { id } => print_json(&service.finish(&ctx.owner, &id)?)?,
        SessionAction::Cancel { id } => print_json(&service.cancel(&ctx.owner, &id)?)?,
        SessionAction::Update { id, title, tags } => {
            let session = service.update(&ctx.owner, &id, SessionPatch { title, tags })?;
            print_json(&session)?;
        }
        SessionAction::Status => match service.get_current(&ctx.owner)? {
            Some(session) => {
                let now = clock.now();
                print_json(&serde_json::json!({
                    "session": session,
                    "elapsed_seconds": accounting::elapsed_seconds(&session, now),
                    "remaining_seconds": accounting::remaining_seconds(&session, now),
                }))?;
            }
            None => println!("null"),
        },
        SessionAction::List { limit } => print_json(&service.list(&ctx.owner, limit)?)?,
    }

    Ok(())
}
