//! Refresh interval rule engine.
//!
//! Maps a refresh command, its mode and the device temperature to a refresh
//! interval in microseconds using a piecewise rule table. The engine is pure
//! and independent of the bus packing pipeline.
//!
//! # Temperature regions
//!
//! The operating range is 0..=95°C. Temperatures up to and including 85°C use
//! the lower-region value, anything above 85°C uses the upper-region value.
//!
//! # Standard table
//!
//! | Command | Mode            | ≤ 85°C   | > 85°C    |
//! |---------|-----------------|----------|-----------|
//! | REFab   | Normal          | 3.9      | 1.95      |
//! | REFab   | FineGranularity | 1.95     | 0.975     |
//! | REFsb   | Normal          | 3.9      | 1.95      |
//! | REFsb   | FineGranularity | 1.95 / n | 0.975 / n |
//!
//! where `n` is the bank count.
//!
//! # Example
//!
//! ```
//! use busopt::refresh::{compute_refresh_value, RefreshCommand, RefreshMode, RefreshRuleInput};
//!
//! let input = RefreshRuleInput::new(RefreshCommand::SameBank, RefreshMode::FineGranularity, 30.0)
//!     .with_bank_count(4);
//! assert_eq!(compute_refresh_value(&input).unwrap(), 1.95 / 4.0);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::error::{BusError, BusResult};

/// Lowest supported temperature in °C.
pub const MIN_TEMPERATURE_C: f64 = 0.0;

/// Highest supported temperature in °C.
pub const MAX_TEMPERATURE_C: f64 = 95.0;

/// Upper bound (inclusive) of the lower temperature region in °C.
pub const LOWER_REGION_MAX_C: f64 = 85.0;

/// Refresh command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefreshCommand {
    /// All-bank refresh (REFab).
    AllBank,
    /// Same-bank refresh (REFsb).
    SameBank,
}

impl RefreshCommand {
    /// JEDEC mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            RefreshCommand::AllBank => "REFab",
            RefreshCommand::SameBank => "REFsb",
        }
    }
}

impl fmt::Display for RefreshCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for RefreshCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "refab" | "ab" | "all-bank" => Ok(RefreshCommand::AllBank),
            "refsb" | "sb" | "same-bank" => Ok(RefreshCommand::SameBank),
            other => Err(format!(
                "unknown refresh command '{}' (expected REFab or REFsb)",
                other
            )),
        }
    }
}

/// Refresh mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefreshMode {
    Normal,
    /// Fine granularity refresh (FGR), refreshing twice as often.
    FineGranularity,
}

impl RefreshMode {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            RefreshMode::Normal => "Normal",
            RefreshMode::FineGranularity => "FineGranularity",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(RefreshMode::Normal),
            "fgr" | "fine" | "finegranularity" | "fine-granularity" => {
                Ok(RefreshMode::FineGranularity)
            }
            other => Err(format!(
                "unknown refresh mode '{}' (expected normal or fgr)",
                other
            )),
        }
    }
}

/// Which half of the operating range a temperature falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureRegion {
    /// 0..=85°C
    Lower,
    /// Above 85°C up to 95°C.
    Upper,
}

impl TemperatureRegion {
    /// Classify a temperature, validating the operating range.
    pub fn classify(temperature_c: f64) -> BusResult<Self> {
        if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&temperature_c) {
            return Err(BusError::InvalidTemperature(temperature_c));
        }
        if temperature_c <= LOWER_REGION_MAX_C {
            Ok(TemperatureRegion::Lower)
        } else {
            Ok(TemperatureRegion::Upper)
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshRule {
    pub command: RefreshCommand,
    pub mode: RefreshMode,
    /// Interval in µs for the lower region.
    pub lower_us: f64,
    /// Interval in µs for the upper region.
    pub upper_us: f64,
    /// Divide the interval by the bank count.
    pub per_bank: bool,
}

impl RefreshRule {
    pub const fn new(
        command: RefreshCommand,
        mode: RefreshMode,
        lower_us: f64,
        upper_us: f64,
    ) -> Self {
        Self {
            command,
            mode,
            lower_us,
            upper_us,
            per_bank: false,
        }
    }

    /// Mark the rule as dividing by the bank count.
    pub const fn per_bank(self) -> Self {
        Self {
            per_bank: true,
            ..self
        }
    }

    fn interval_for(&self, region: TemperatureRegion) -> f64 {
        match region {
            TemperatureRegion::Lower => self.lower_us,
            TemperatureRegion::Upper => self.upper_us,
        }
    }
}

/// The standard rule table.
pub const STANDARD_RULES: [RefreshRule; 4] = [
    RefreshRule::new(RefreshCommand::AllBank, RefreshMode::Normal, 3.9, 1.95),
    RefreshRule::new(
        RefreshCommand::AllBank,
        RefreshMode::FineGranularity,
        1.95,
        0.975,
    ),
    RefreshRule::new(RefreshCommand::SameBank, RefreshMode::Normal, 3.9, 1.95),
    RefreshRule::new(
        RefreshCommand::SameBank,
        RefreshMode::FineGranularity,
        1.95,
        0.975,
    )
    .per_bank(),
];

/// Input to the rule engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshRuleInput {
    pub command: RefreshCommand,
    pub mode: RefreshMode,
    pub temperature_c: f64,
    /// Required for per-bank rules, ignored otherwise.
    pub bank_count: Option<i64>,
}

impl RefreshRuleInput {
    pub fn new(command: RefreshCommand, mode: RefreshMode, temperature_c: f64) -> Self {
        Self {
            command,
            mode,
            temperature_c,
            bank_count: None,
        }
    }

    pub fn with_bank_count(mut self, bank_count: i64) -> Self {
        self.bank_count = Some(bank_count);
        self
    }
}

/// Piecewise refresh rule evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEngine {
    rules: Vec<RefreshRule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleEngine {
    /// Engine over a custom rule table.
    pub fn new(rules: Vec<RefreshRule>) -> Self {
        Self { rules }
    }

    /// Engine over [`STANDARD_RULES`].
    pub fn standard() -> Self {
        Self::new(STANDARD_RULES.to_vec())
    }

    /// The rule table in lookup order.
    pub fn rules(&self) -> &[RefreshRule] {
        &self.rules
    }

    /// Evaluate the refresh interval in µs.
    ///
    /// Validation order: temperature, then the (command, mode) lookup, then
    /// the bank count for per-bank rules.
    pub fn evaluate(&self, input: &RefreshRuleInput) -> BusResult<f64> {
        self.resolve(input).map(|evaluation| evaluation.value_us)
    }

    /// Evaluate and keep the region and rule that produced the value.
    pub fn resolve(&self, input: &RefreshRuleInput) -> BusResult<RefreshEvaluation> {
        let region = TemperatureRegion::classify(input.temperature_c)?;

        let rule = *self
            .rules
            .iter()
            .find(|r| r.command == input.command && r.mode == input.mode)
            .ok_or_else(|| BusError::UnsupportedCombination {
                command: input.command.to_string(),
                mode: input.mode.to_string(),
            })?;

        let interval = rule.interval_for(region);
        let value_us = if rule.per_bank {
            match input.bank_count {
                Some(n) if n > 0 => interval / n as f64,
                other => return Err(BusError::InvalidBankCount(other)),
            }
        } else {
            interval
        };

        debug!(
            command = %input.command,
            mode = %input.mode,
            temperature_c = input.temperature_c,
            ?region,
            value = value_us,
            "Evaluated refresh rule"
        );

        Ok(RefreshEvaluation {
            value_us,
            region,
            rule,
        })
    }
}

/// Result of [`RuleEngine::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshEvaluation {
    /// Refresh interval in µs.
    pub value_us: f64,
    pub region: TemperatureRegion,
    /// The matched rule.
    pub rule: RefreshRule,
}

/// Evaluate against the standard rule table.
pub fn compute_refresh_value(input: &RefreshRuleInput) -> BusResult<f64> {
    RuleEngine::standard().evaluate(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute(command: RefreshCommand, mode: RefreshMode, temperature_c: f64) -> BusResult<f64> {
        compute_refresh_value(&RefreshRuleInput::new(command, mode, temperature_c))
    }

    #[test]
    fn test_all_bank_normal_boundary() {
        assert_eq!(compute(RefreshCommand::AllBank, RefreshMode::Normal, 85.0), Ok(3.9));
        assert_eq!(compute(RefreshCommand::AllBank, RefreshMode::Normal, 85.1), Ok(1.95));
        assert_eq!(compute(RefreshCommand::AllBank, RefreshMode::Normal, 0.0), Ok(3.9));
    }

    #[test]
    fn test_all_bank_fine_granularity() {
        assert_eq!(
            compute(RefreshCommand::AllBank, RefreshMode::FineGranularity, 95.0),
            Ok(0.975)
        );
        assert_eq!(
            compute(RefreshCommand::AllBank, RefreshMode::FineGranularity, 40.0),
            Ok(1.95)
        );
    }

    #[test]
    fn test_same_bank_normal_ignores_bank_count() {
        let input = RefreshRuleInput::new(RefreshCommand::SameBank, RefreshMode::Normal, 90.0)
            .with_bank_count(-1);
        assert_eq!(compute_refresh_value(&input), Ok(1.95));
        assert_eq!(compute(RefreshCommand::SameBank, RefreshMode::Normal, 30.0), Ok(3.9));
    }

    #[test]
    fn test_same_bank_fine_granularity_divides_by_banks() {
        let input =
            RefreshRuleInput::new(RefreshCommand::SameBank, RefreshMode::FineGranularity, 30.0)
                .with_bank_count(4);
        assert_eq!(compute_refresh_value(&input), Ok(1.95 / 4.0));

        let input =
            RefreshRuleInput::new(RefreshCommand::SameBank, RefreshMode::FineGranularity, 90.0)
                .with_bank_count(2);
        assert_eq!(compute_refresh_value(&input), Ok(0.975 / 2.0));
    }

    #[test]
    fn test_same_bank_fine_granularity_requires_bank_count() {
        assert_eq!(
            compute(RefreshCommand::SameBank, RefreshMode::FineGranularity, 30.0),
            Err(BusError::InvalidBankCount(None))
        );

        let input =
            RefreshRuleInput::new(RefreshCommand::SameBank, RefreshMode::FineGranularity, 30.0)
                .with_bank_count(0);
        assert_eq!(
            compute_refresh_value(&input),
            Err(BusError::InvalidBankCount(Some(0)))
        );
    }

    #[test]
    fn test_temperature_out_of_range() {
        assert_eq!(
            compute(RefreshCommand::AllBank, RefreshMode::Normal, 95.5),
            Err(BusError::InvalidTemperature(95.5))
        );
        assert_eq!(
            compute(RefreshCommand::AllBank, RefreshMode::Normal, -0.1),
            Err(BusError::InvalidTemperature(-0.1))
        );
        assert!(matches!(
            compute(RefreshCommand::AllBank, RefreshMode::Normal, f64::NAN),
            Err(BusError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn test_temperature_checked_before_bank_count() {
        assert_eq!(
            compute(RefreshCommand::SameBank, RefreshMode::FineGranularity, 120.0),
            Err(BusError::InvalidTemperature(120.0))
        );
    }

    #[test]
    fn test_custom_table_without_entry_is_unsupported() {
        let engine = RuleEngine::new(vec![RefreshRule::new(
            RefreshCommand::AllBank,
            RefreshMode::Normal,
            7.8,
            3.9,
        )]);
        let input = RefreshRuleInput::new(RefreshCommand::SameBank, RefreshMode::Normal, 30.0);
        assert_eq!(
            engine.evaluate(&input),
            Err(BusError::UnsupportedCombination {
                command: "REFsb".to_string(),
                mode: "Normal".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_command_and_mode() {
        assert_eq!("REFab".parse::<RefreshCommand>(), Ok(RefreshCommand::AllBank));
        assert_eq!("refsb".parse::<RefreshCommand>(), Ok(RefreshCommand::SameBank));
        assert!("refpb".parse::<RefreshCommand>().is_err());
        assert_eq!("FGR".parse::<RefreshMode>(), Ok(RefreshMode::FineGranularity));
        assert_eq!("normal".parse::<RefreshMode>(), Ok(RefreshMode::Normal));
        assert!("double".parse::<RefreshMode>().is_err());
    }

    #[test]
    fn test_region_classification() {
        assert_eq!(TemperatureRegion::classify(85.0), Ok(TemperatureRegion::Lower));
        assert_eq!(TemperatureRegion::classify(85.01), Ok(TemperatureRegion::Upper));
        assert_eq!(TemperatureRegion::classify(95.0), Ok(TemperatureRegion::Upper));
    }

    #[test]
    fn test_resolve_reports_region_and_rule() {
        let input = RefreshRuleInput::new(
            RefreshCommand::SameBank,
            RefreshMode::FineGranularity,
            90.0,
        )
        .with_bank_count(2);
        let evaluation = RuleEngine::standard().resolve(&input).unwrap();

        assert_eq!(evaluation.region, TemperatureRegion::Upper);
        assert_eq!(evaluation.value_us, 0.975 / 2.0);
        assert!(evaluation.rule.per_bank);
        assert_eq!(
            RuleEngine::standard().evaluate(&input),
            Ok(evaluation.value_us)
        );

        let lower = RefreshRuleInput::new(RefreshCommand::AllBank, RefreshMode::Normal, 85.0);
        assert_eq!(
            RuleEngine::standard().resolve(&lower).unwrap().region,
            TemperatureRegion::Lower
        );
    }
}
