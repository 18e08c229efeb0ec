//! Command execution.

use anyhow::{Context, bail};
use vecbench_vector::{DbConfig, InsertReport, VectorDb, VectorStore};

use crate::TRACING_TARGET;
use crate::config::{Cli, Command, LoadArgs, SearchArgs};
use crate::dataset::{into_filters, read_dataset};

/// Runs the parsed command.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Load(args) => load(&cli.db, args).await,
        Command::Search(args) => search(&cli.db, args).await,
    }
}

async fn load(db: &DbConfig, args: LoadArgs) -> anyhow::Result<()> {
    let batch = read_dataset(&args.dataset)?;
    let count = batch.len();

    let store = VectorStore::new(db, args.store.store_config())
        .await
        .context("failed to connect to the vector store")?;

    tracing::info!(
        target: TRACING_TARGET,
        backend = store.backend_name(),
        count,
        "Loading dataset"
    );

    let report = store
        .insert_embeddings(batch)
        .await
        .context("failed to insert embeddings")?;

    println!("{}", summarize(&report));

    if !report.is_complete() {
        bail!(
            "{} of {} records were not written",
            report.unwritten_count(),
            report.total()
        );
    }
    Ok(())
}

async fn search(db: &DbConfig, args: SearchArgs) -> anyhow::Result<()> {
    let store = VectorStore::new(db, args.store.store_config())
        .await
        .context("failed to connect to the vector store")?;

    let filters = into_filters(args.filters);
    let result = store
        .search_embedding(&args.query, args.k, filters.as_ref())
        .await
        .context("search failed")?;

    tracing::info!(
        target: TRACING_TARGET,
        backend = store.backend_name(),
        found = result.len(),
        "Search finished"
    );

    let output = serde_json::to_string_pretty(&result).context("failed to encode results")?;
    println!("{output}");
    Ok(())
}

/// Renders a human readable insert summary.
fn summarize(report: &InsertReport) -> String {
    let mut summary = format!(
        "inserted {} of {} records",
        report.inserted().len(),
        report.total()
    );

    for failure in report.failures() {
        summary.push_str(&format!(
            "\nfailed: {} ({})",
            failure.ids.join(", "),
            failure.error
        ));
    }
    if !report.skipped().is_empty() {
        summary.push_str(&format!("\nskipped: {}", report.skipped().join(", ")));
    }

    summary
}

#[cfg(test)]
mod tests {
    use vecbench_vector::VectorError;

    use super::*;

    #[test]
    fn test_summarize() {
        let mut report = InsertReport::new();
        report.record_inserted(["a".to_string(), "b".to_string()]);
        assert_eq!(summarize(&report), "inserted 2 of 2 records");

        report.record_failure(vec!["c".into()], VectorError::timeout("slow"));
        report.record_skipped(["d".to_string()]);
        assert_eq!(
            summarize(&report),
            "inserted 2 of 4 records\nfailed: c (operation timed out: slow)\nskipped: d"
        );
    }
}
