use std::path::Path;

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::calculator::calculate_diagnostic;
use crate::models::DiagnosticInput;
use crate::store::DiagnosticStore;
use crate::validation::validate_input;

pub const DEMO_USER_ID: &str = "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Replaces the demo user's history with a few realistic submissions.
pub async fn seed(store: &dyn DiagnosticStore) -> anyhow::Result<Uuid> {
    let user_id = Uuid::parse_str(DEMO_USER_ID)?;

    let submissions = [
        (3200.0, 900.0, 6.0, 0.0),
        (3400.0, 500.0, 4.0, 1.5),
        (3800.0, 250.0, 2.0, 3.0),
    ];

    let results: Vec<_> = submissions
        .into_iter()
        .map(|(income, spending, wasted, studying)| {
            calculate_diagnostic(&DiagnosticInput {
                monthly_income: income,
                monthly_impulsive_spending: spending,
                hours_wasted_per_day: wasted,
                hours_studying_per_day: studying,
            })
        })
        .collect();

    store.replace_for_user(user_id, &results).await?;
    Ok(user_id)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Imports past submissions from a CSV whose header names the four input
/// fields. Rows that fail validation are logged and skipped. A row that does
/// not parse aborts the import before anything is stored.
pub async fn import_csv(
    store: &dyn DiagnosticStore,
    user_id: Uuid,
    csv_path: &Path,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut results = Vec::new();
    let mut skipped = 0;

    for (index, row) in reader.deserialize::<DiagnosticInput>().enumerate() {
        // header is line 1
        let line = index + 2;
        let input = row.with_context(|| format!("line {line} is not a valid row"))?;

        if let Err(err) = validate_input(&input) {
            tracing::warn!(line, %err, "skipping invalid row");
            skipped += 1;
            continue;
        }

        results.push(calculate_diagnostic(&input));
    }

    let inserted = store.insert_batch(user_id, &results).await?.len();
    Ok(ImportSummary { inserted, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;

    #[tokio::test]
    async fn import_scores_valid_rows_and_skips_invalid_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "monthly_income,monthly_impulsive_spending,hours_wasted_per_day,hours_studying_per_day"
        )
        .unwrap();
        writeln!(file, "5000,1200,4,1").unwrap();
        writeln!(file, "2000,0,20,10").unwrap();
        writeln!(file, "1000,50,0,6").unwrap();
        file.flush().unwrap();

        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let summary = import_csv(&store, user_id, file.path()).await.unwrap();

        assert_eq!(summary, ImportSummary { inserted: 2, skipped: 1 });
        let stored = store.list_for_user(user_id, 10).await.unwrap();
        assert_eq!(stored[0].result.discipline_score, 80);
        assert_eq!(stored[1].result.discipline_score, 15);
    }

    #[tokio::test]
    async fn import_fails_on_non_numeric_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "monthly_income,monthly_impulsive_spending,hours_wasted_per_day,hours_studying_per_day"
        )
        .unwrap();
        writeln!(file, "lots,0,1,1").unwrap();
        file.flush().unwrap();

        let store = MemoryStore::new();
        assert!(import_csv(&store, Uuid::new_v4(), file.path()).await.is_err());
    }

    #[tokio::test]
    async fn unparseable_row_leaves_nothing_stored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "monthly_income,monthly_impulsive_spending,hours_wasted_per_day,hours_studying_per_day"
        )
        .unwrap();
        writeln!(file, "5000,1200,4,1").unwrap();
        writeln!(file, "lots,0,1,1").unwrap();
        file.flush().unwrap();

        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();

        let err = import_csv(&store, user_id, file.path()).await.unwrap_err();
        assert!(err.to_string().contains("line 3"));
        assert!(store.list_for_user(user_id, 10).await.unwrap().is_empty());

        // fixing the file and re-running does not duplicate the first row
        let mut fixed = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            fixed,
            "monthly_income,monthly_impulsive_spending,hours_wasted_per_day,hours_studying_per_day"
        )
        .unwrap();
        writeln!(fixed, "5000,1200,4,1").unwrap();
        fixed.flush().unwrap();

        let summary = import_csv(&store, user_id, fixed.path()).await.unwrap();
        assert_eq!(summary, ImportSummary { inserted: 1, skipped: 0 });
        assert_eq!(store.list_for_user(user_id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reseeding_replaces_the_demo_history() {
        let store = MemoryStore::new();
        let user_id = seed(&store).await.unwrap();
        seed(&store).await.unwrap();

        let stored = store.list_for_user(user_id, 10).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].result.input.monthly_income, 3800.0);
        assert_eq!(stored[2].result.input.monthly_income, 3200.0);
    }
}
