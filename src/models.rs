use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticInput {
    pub monthly_income: f64,
    pub monthly_impulsive_spending: f64,
    pub hours_wasted_per_day: f64,
    pub hours_studying_per_day: f64,
}

/// The submitted input echoed back alongside every derived metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    #[serde(flatten)]
    pub input: DiagnosticInput,
    pub discipline_score: u8,
    pub five_year_wasted_hours: f64,
    pub five_year_money_wasted: f64,
    pub projected_income_if_unchanged: f64,
    pub projected_income_if_disciplined: f64,
}

impl DiagnosticResult {
    pub fn income_gap(&self) -> f64 {
        self.projected_income_if_disciplined - self.projected_income_if_unchanged
    }
}

/// A persisted diagnostic owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: DiagnosticResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisciplineLevel {
    High,
    Moderate,
    Weak,
    None,
}

impl DisciplineLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => DisciplineLevel::High,
            60..=79 => DisciplineLevel::Moderate,
            40..=59 => DisciplineLevel::Weak,
            _ => DisciplineLevel::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisciplineLevel::High => "High discipline",
            DisciplineLevel::Moderate => "Moderate discipline",
            DisciplineLevel::Weak => "Weak discipline",
            DisciplineLevel::None => "No discipline",
        }
    }
}

impl fmt::Display for DisciplineLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub count: usize,
    pub avg_score: f64,
    pub best_score: u8,
    pub worst_score: u8,
    pub score_change: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_score_tiers() {
        assert_eq!(DisciplineLevel::from_score(100), DisciplineLevel::High);
        assert_eq!(DisciplineLevel::from_score(80), DisciplineLevel::High);
        assert_eq!(DisciplineLevel::from_score(79), DisciplineLevel::Moderate);
        assert_eq!(DisciplineLevel::from_score(60), DisciplineLevel::Moderate);
        assert_eq!(DisciplineLevel::from_score(59), DisciplineLevel::Weak);
        assert_eq!(DisciplineLevel::from_score(40), DisciplineLevel::Weak);
        assert_eq!(DisciplineLevel::from_score(39), DisciplineLevel::None);
        assert_eq!(DisciplineLevel::from_score(0), DisciplineLevel::None);
    }

    #[test]
    fn result_serializes_flat() {
        let result = DiagnosticResult {
            input: DiagnosticInput {
                monthly_income: 1000.0,
                monthly_impulsive_spending: 50.0,
                hours_wasted_per_day: 1.0,
                hours_studying_per_day: 2.0,
            },
            discipline_score: 55,
            five_year_wasted_hours: 1825.0,
            five_year_money_wasted: 3000.0,
            projected_income_if_unchanged: 1104.0,
            projected_income_if_disciplined: 1610.0,
        };

        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["monthly_income"], 1000.0);
        assert_eq!(json["discipline_score"], 55);
        assert!(json.get("input").is_none());
    }
}
