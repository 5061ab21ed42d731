use crate::models::{DiagnosticInput, DiagnosticResult};

pub const PROJECTION_YEARS: i32 = 5;
pub const DAYS_PER_YEAR: f64 = 365.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Annual income growth assumed when nothing changes.
pub const GROWTH_UNCHANGED: f64 = 0.02;
/// Annual income growth assumed with disciplined behavior.
pub const GROWTH_DISCIPLINED: f64 = 0.10;

pub const BASE_SCORE: f64 = 50.0;
pub const POINTS_PER_HOUR: f64 = 5.0;
pub const STUDY_BONUS_CAP: f64 = 30.0;
pub const WASTE_PENALTY_CAP: f64 = 40.0;

pub const HIGH_SPENDING_RATIO: f64 = 0.20;
pub const HIGH_SPENDING_PENALTY: f64 = 20.0;
pub const MODERATE_SPENDING_RATIO: f64 = 0.10;
pub const MODERATE_SPENDING_PENALTY: f64 = 10.0;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

fn years() -> f64 {
    f64::from(PROJECTION_YEARS)
}

pub fn five_year_wasted_hours(hours_per_day: f64) -> f64 {
    hours_per_day * DAYS_PER_YEAR * years()
}

pub fn five_year_money_wasted(monthly_impulsive_spending: f64) -> f64 {
    monthly_impulsive_spending * MONTHS_PER_YEAR * years()
}

/// Monthly income in the final projection year, compounding the annualized
/// figure at a fixed yearly rate.
pub fn projected_income(monthly_income: f64, annual_growth_rate: f64) -> f64 {
    let annual = monthly_income * MONTHS_PER_YEAR;
    annual * (1.0 + annual_growth_rate).powi(PROJECTION_YEARS) / MONTHS_PER_YEAR
}

pub fn projected_income_unchanged(monthly_income: f64) -> f64 {
    projected_income(monthly_income, GROWTH_UNCHANGED)
}

pub fn projected_income_disciplined(monthly_income: f64) -> f64 {
    projected_income(monthly_income, GROWTH_DISCIPLINED)
}

/// Penalty for the impulsive spending tier. A ratio sitting exactly on a
/// threshold falls into the lower tier. Zero income skips the check.
pub fn spending_penalty(monthly_income: f64, monthly_impulsive_spending: f64) -> f64 {
    if monthly_income <= 0.0 {
        return 0.0;
    }

    let ratio = monthly_impulsive_spending / monthly_income;
    if ratio > HIGH_SPENDING_RATIO {
        HIGH_SPENDING_PENALTY
    } else if ratio > MODERATE_SPENDING_RATIO {
        MODERATE_SPENDING_PENALTY
    } else {
        0.0
    }
}

/// Score in [0, 100]. The running total is rounded before it is clamped;
/// a NaN total scores 0.
pub fn discipline_score(input: &DiagnosticInput) -> u8 {
    let mut score = BASE_SCORE;
    score += (input.hours_studying_per_day * POINTS_PER_HOUR).min(STUDY_BONUS_CAP);
    score -= (input.hours_wasted_per_day * POINTS_PER_HOUR).min(WASTE_PENALTY_CAP);
    score -= spending_penalty(input.monthly_income, input.monthly_impulsive_spending);

    let rounded = score.round();
    if rounded.is_nan() {
        return 0;
    }
    rounded.clamp(MIN_SCORE, MAX_SCORE) as u8
}

pub fn calculate_diagnostic(input: &DiagnosticInput) -> DiagnosticResult {
    DiagnosticResult {
        input: *input,
        discipline_score: discipline_score(input),
        five_year_wasted_hours: five_year_wasted_hours(input.hours_wasted_per_day),
        five_year_money_wasted: five_year_money_wasted(input.monthly_impulsive_spending),
        projected_income_if_unchanged: projected_income_unchanged(input.monthly_income),
        projected_income_if_disciplined: projected_income_disciplined(input.monthly_income),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn input(income: f64, spending: f64, wasted: f64, studying: f64) -> DiagnosticInput {
        DiagnosticInput {
            monthly_income: income,
            monthly_impulsive_spending: spending,
            hours_wasted_per_day: wasted,
            hours_studying_per_day: studying,
        }
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= 1e-6 * expected.abs().max(1.0)
    }

    #[test]
    fn reference_scenario_matches_expected_metrics() {
        let result = calculate_diagnostic(&input(5000.0, 1200.0, 4.0, 1.0));

        assert_eq!(result.discipline_score, 15);
        assert_eq!(result.five_year_wasted_hours, 7300.0);
        assert_eq!(result.five_year_money_wasted, 72000.0);
        assert!(close(result.projected_income_if_unchanged, 5520.404016));
        assert!(close(result.projected_income_if_disciplined, 8052.55));
        assert_eq!(result.input, input(5000.0, 1200.0, 4.0, 1.0));
    }

    #[test]
    fn spending_thresholds_are_exclusive() {
        assert_eq!(discipline_score(&input(1000.0, 200.0, 0.0, 0.0)), 40);
        assert_eq!(discipline_score(&input(1000.0, 201.0, 0.0, 0.0)), 30);
        assert_eq!(discipline_score(&input(1000.0, 100.0, 0.0, 0.0)), 50);
        assert_eq!(discipline_score(&input(1000.0, 101.0, 0.0, 0.0)), 40);
        assert_eq!(discipline_score(&input(1000.0, 0.0, 0.0, 0.0)), 50);
    }

    #[test]
    fn zero_income_skips_spending_penalty() {
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, 0.0)), 50);
        assert_eq!(discipline_score(&input(0.0, 99_999.0, 0.0, 0.0)), 50);
        assert_eq!(spending_penalty(0.0, 1e12), 0.0);
    }

    #[test]
    fn study_bonus_caps_at_thirty() {
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, 5.0)), 75);
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, 6.0)), 80);
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, 7.0)), 80);
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, 24.0)), 80);
    }

    #[test]
    fn waste_penalty_caps_at_forty() {
        assert_eq!(discipline_score(&input(0.0, 0.0, 7.0, 0.0)), 15);
        assert_eq!(discipline_score(&input(0.0, 0.0, 8.0, 0.0)), 10);
        assert_eq!(discipline_score(&input(0.0, 0.0, 9.0, 0.0)), 10);
        assert_eq!(discipline_score(&input(0.0, 0.0, 24.0, 0.0)), 10);
    }

    #[test]
    fn score_rounds_before_clamping() {
        // 50 + 2.5 = 52.5 rounds up
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, 0.5)), 53);
        // 50 - 2.5 = 47.5 rounds up
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.5, 0.0)), 48);
        // 50 - 40 - 20 = -10 clamps to the floor
        assert_eq!(discipline_score(&input(1000.0, 900.0, 10.0, 0.0)), 0);
        // 50 + 0.4 - 20 = 30.4 rounds down
        assert_eq!(discipline_score(&input(1000.0, 300.0, 0.0, 0.08)), 30);
    }

    #[test]
    fn non_finite_hours_respect_caps_and_floor() {
        assert_eq!(discipline_score(&input(0.0, 0.0, 0.0, f64::NEG_INFINITY)), 0);
        assert_eq!(discipline_score(&input(0.0, 0.0, f64::INFINITY, 0.0)), 10);
    }

    #[test]
    fn projection_is_rate_agnostic() {
        assert!(close(projected_income(1000.0, 0.0), 1000.0));
        assert!(close(projected_income(1000.0, 1.0), 32_000.0));
        assert_eq!(projected_income(0.0, GROWTH_DISCIPLINED), 0.0);
    }

    #[test]
    fn negative_inputs_propagate_arithmetically() {
        assert_eq!(five_year_wasted_hours(-1.0), -1825.0);
        assert_eq!(five_year_money_wasted(-10.0), -600.0);
    }

    #[test]
    fn large_inputs_stay_finite() {
        let result = calculate_diagnostic(&input(1e12, 1e11, 24.0, 24.0));
        assert!(result.projected_income_if_disciplined.is_finite());
        assert!(result.five_year_money_wasted.is_finite());
    }

    fn any_input() -> impl Strategy<Value = DiagnosticInput> {
        (0.0..1_000_000.0f64, 0.0..100_000.0f64, 0.0..=24.0f64, 0.0..=24.0f64)
            .prop_map(|(income, spending, wasted, studying)| {
                input(income, spending, wasted, studying)
            })
    }

    proptest! {
        #[test]
        fn prop_calculation_is_deterministic(input in any_input()) {
            prop_assert_eq!(calculate_diagnostic(&input), calculate_diagnostic(&input));
        }

        #[test]
        fn prop_score_stays_in_bounds(input in any_input()) {
            prop_assert!(discipline_score(&input) <= 100);
        }

        #[test]
        fn prop_more_study_never_lowers_score(input in any_input(), extra in 0.0..24.0f64) {
            let mut more = input;
            more.hours_studying_per_day += extra;
            prop_assert!(discipline_score(&more) >= discipline_score(&input));
        }

        #[test]
        fn prop_more_waste_never_raises_score(input in any_input(), extra in 0.0..24.0f64) {
            let mut more = input;
            more.hours_wasted_per_day += extra;
            prop_assert!(discipline_score(&more) <= discipline_score(&input));
        }

        #[test]
        fn prop_waste_projections_scale_linearly(input in any_input()) {
            let result = calculate_diagnostic(&input);
            prop_assert!(close(result.five_year_wasted_hours, input.hours_wasted_per_day * 1825.0));
            prop_assert!(close(result.five_year_money_wasted, input.monthly_impulsive_spending * 60.0));
        }

        #[test]
        fn prop_discipline_outgrows_inaction(income in 0.01..1_000_000.0f64) {
            prop_assert!(projected_income_disciplined(income) > projected_income_unchanged(income));
        }
    }
}
