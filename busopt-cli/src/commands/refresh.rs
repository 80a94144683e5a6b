//! Refresh command - evaluate the refresh interval rule table.

use busopt::refresh::{RefreshRuleInput, RuleEngine};

use super::common::{RefreshCommandArg, RefreshModeArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the refresh command.
pub struct RefreshArgs {
    pub command: RefreshCommandArg,
    pub mode: RefreshModeArg,
    pub temperature: f64,
    pub banks: Option<i64>,
}

/// Run the refresh command.
pub fn run(args: RefreshArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("refresh");

    let mut input = RefreshRuleInput::new(args.command.into(), args.mode.into(), args.temperature);
    if let Some(banks) = args.banks {
        input = input.with_bank_count(banks);
    }

    let evaluation = RuleEngine::standard().resolve(&input)?;

    println!(
        "{} {} at {}°C ({:?} region): {} µs",
        input.command, input.mode, args.temperature, evaluation.region, evaluation.value_us
    );
    Ok(())
}
