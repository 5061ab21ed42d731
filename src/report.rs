use std::fmt::Write;

use uuid::Uuid;

use crate::models::{Diagnostic, DisciplineLevel, HistorySummary};

pub const RECENT_LIMIT: usize = 10;

/// Expects `diagnostics` newest first, as the store returns them.
pub fn summarize_history(diagnostics: &[Diagnostic]) -> Option<HistorySummary> {
    let newest = diagnostics.first()?;
    let oldest = diagnostics.last()?;

    let scores: Vec<u8> = diagnostics.iter().map(|d| d.result.discipline_score).collect();
    let total: u32 = scores.iter().map(|&s| u32::from(s)).sum();

    Some(HistorySummary {
        count: scores.len(),
        avg_score: f64::from(total) / scores.len() as f64,
        best_score: scores.iter().copied().max().unwrap_or_default(),
        worst_score: scores.iter().copied().min().unwrap_or_default(),
        score_change: i32::from(newest.result.discipline_score)
            - i32::from(oldest.result.discipline_score),
    })
}

pub fn build_history_report(user_id: Uuid, diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Discipline Diagnostic Report");
    let _ = writeln!(output, "Generated for user {}", user_id);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    match summarize_history(diagnostics) {
        None => {
            let _ = writeln!(output, "No diagnostics recorded for this user.");
        }
        Some(summary) => {
            let _ = writeln!(output, "- Diagnostics: {}", summary.count);
            let _ = writeln!(output, "- Average score: {:.1}", summary.avg_score);
            let _ = writeln!(
                output,
                "- Best / worst score: {} / {}",
                summary.best_score, summary.worst_score
            );
            let _ = writeln!(output, "- Change since first diagnostic: {:+}", summary.score_change);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Diagnostic");

    if let Some(latest) = diagnostics.first() {
        let r = &latest.result;
        let _ = writeln!(
            output,
            "- Score {}/100 ({}) on {}",
            r.discipline_score,
            DisciplineLevel::from_score(r.discipline_score),
            latest.created_at.date_naive()
        );
        let _ = writeln!(output, "- Hours wasted over 5 years: {:.0}", r.five_year_wasted_hours);
        let _ = writeln!(output, "- Money wasted over 5 years: {:.2}", r.five_year_money_wasted);
        let _ = writeln!(
            output,
            "- Monthly income in 5 years: {:.2} unchanged, {:.2} disciplined",
            r.projected_income_if_unchanged, r.projected_income_if_disciplined
        );
    } else {
        let _ = writeln!(output, "No diagnostics recorded for this user.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Diagnostics");

    if diagnostics.is_empty() {
        let _ = writeln!(output, "No diagnostics recorded for this user.");
    } else {
        for diagnostic in diagnostics.iter().take(RECENT_LIMIT) {
            let input = &diagnostic.result.input;
            let _ = writeln!(
                output,
                "- {}: score {} (income {:.2}, impulsive {:.2}, wasted {}h/day, studying {}h/day)",
                diagnostic.created_at.format("%Y-%m-%d %H:%M"),
                diagnostic.result.discipline_score,
                input.monthly_income,
                input.monthly_impulsive_spending,
                input.hours_wasted_per_day,
                input.hours_studying_per_day
            );
        }
    }

    output
}
