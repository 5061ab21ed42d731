use thiserror::Error;

use crate::models::DiagnosticInput;

pub const MAX_MONTHLY_INCOME: f64 = 1_000_000.0;
pub const MAX_MONTHLY_IMPULSIVE_SPENDING: f64 = 100_000.0;
pub const HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("invalid field {field}: must be a finite number")]
    NotFinite { field: &'static str },

    #[error("invalid field {field}: must not be negative")]
    Negative { field: &'static str },

    #[error("invalid field {field}: must be at most {max}")]
    AboveMax { field: &'static str, max: f64 },

    #[error("hours wasted plus hours studying cannot exceed 24 (got {total})")]
    HoursExceedDay { total: f64 },
}

fn check(field: &'static str, value: f64, max: f64) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(InputError::Negative { field });
    }
    if value > max {
        return Err(InputError::AboveMax { field, max });
    }
    Ok(())
}

/// Rejects a submission before it reaches the calculator. Fields are checked
/// in declaration order and the first violation wins.
pub fn validate_input(input: &DiagnosticInput) -> Result<(), InputError> {
    check("monthly_income", input.monthly_income, MAX_MONTHLY_INCOME)?;
    check(
        "monthly_impulsive_spending",
        input.monthly_impulsive_spending,
        MAX_MONTHLY_IMPULSIVE_SPENDING,
    )?;
    check("hours_wasted_per_day", input.hours_wasted_per_day, HOURS_PER_DAY)?;
    check("hours_studying_per_day", input.hours_studying_per_day, HOURS_PER_DAY)?;

    let total = input.hours_wasted_per_day + input.hours_studying_per_day;
    if total > HOURS_PER_DAY {
        return Err(InputError::HoursExceedDay { total });
    }

    Ok(())
}
