use clap::Subcommand;

use focuslog_core::{OwnerId, SettingsService, SettingsUpdate, SystemClock};

use super::{context, print_json, CliError};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the owner's settings, creating defaults on first access
    Show,
    /// Replace all four duration fields
    Set {
        #[arg(long)]
        focus_minutes: u32,
        #[arg(long)]
        short_break_minutes: u32,
        #[arg(long)]
        long_break_minutes: u32,
        /// Focus sessions per long break
        #[arg(long)]
        long_break_every: u32,
    },
}

pub fn run(owner: Option<OwnerId>, action: SettingsAction) -> Result<(), CliError> {
    let mut ctx = context(owner)?;
    let clock = SystemClock;
    let mut service = SettingsService::new(&mut ctx.store, &clock);

    match action {
        SettingsAction::Show => print_json(&service.get(&ctx.owner)?)?,
        SettingsAction::Set {
            focus_minutes,
            short_break_minutes,
            long_break_minutes,
            long_break_every,
        } => {
            let settings = service.update(
                &ctx.owner,
                SettingsUpdate {
                    focus_minutes,
                    short_break_minutes,
                    long_break_minutes,
                    long_break_every,
                },
            )?;
            print_json(&settings)?;
        }
    }

    Ok(())
}
