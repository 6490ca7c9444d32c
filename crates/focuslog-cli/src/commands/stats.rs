use clap::{Subcommand, ValueEnum};

use focuslog_core::{OwnerId, SessionService, SummaryGroupBy, SystemClock};

use super::{context, print_json, CliError};

#[derive(Clone, Copy, ValueEnum)]
pub enum GroupByArg {
    Day,
    Week,
    Month,
}

impl From<GroupByArg> for SummaryGroupBy {
    fn from(arg: GroupByArg) -> Self {
        match arg {
            GroupByArg::Day => SummaryGroupBy::Day,
            GroupByArg::Week => SummaryGroupBy::Week,
            GroupByArg::Month => SummaryGroupBy::Month,
        }
    }
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Completed focus sessions aggregated per period, newest first
    Summary {
        #[arg(long, value_enum, default_value = "day")]
        group_by: GroupByArg,
    },
}

pub fn run(owner: Option<OwnerId>, action: StatsAction) -> Result<(), CliError> {
    let mut ctx = context(owner)?;
    let clock = SystemClock;
    let mut service = SessionService::new(&mut ctx.store, &clock);

    match action {
        StatsAction::Summary { group_by } => {
            print_json(&service.summary(&ctx.owner, group_by.into())?)?;
        }
    }

    Ok(())
}
