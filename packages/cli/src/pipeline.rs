//! Extraction and correlation pipeline.
//!
//! Extracts filming permits, then noise complaints, then correlates them.
//! Steps run strictly one after another and the first failure aborts the
//! run, so a failed extraction never reaches the correlator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use film_noise_correlate::{CorrelateError, correlate_datasets};
use film_noise_dates::DateRange;
use film_noise_source::SourceError;
use film_noise_source::extract::extract_dataset;
use film_noise_source::progress::ProgressCallback;
use film_noise_source::registry;
use film_noise_source::socrata::SodaClient;
use film_noise_source_models::{FilmingPermit, NoiseComplaint};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Extracting or decoding a dataset failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Writing the correlation results failed.
    #[error(transparent)]
    Correlate(#[from] CorrelateError),
}

/// Runs the pipeline for `range`, writing every CSV under `output_dir`.
///
/// `progress_for` supplies a progress reporter per dataset label.
///
/// Returns the path of `results.csv`, or `None` if either dataset came back
/// empty.
///
/// # Errors
///
/// Returns [`PipelineError`] on the first failed step.
pub async fn run(
    client: &dyn SodaClient,
    range: &DateRange,
    output_dir: &Path,
    progress_for: impl Fn(&str) -> Arc<dyn ProgressCallback>,
) -> Result<Option<PathBuf>, PipelineError> {
    let start = Instant::now();

    let permits_def = registry::filming_permits();
    let permits: Vec<FilmingPermit> = extract_dataset(
        client,
        &permits_def,
        range,
        output_dir,
        &progress_for(&permits_def.name),
    )
    .await?
    .rows()?;

    let complaints_def = registry::noise_complaints();
    let complaints: Vec<NoiseComplaint> = extract_dataset(
        client,
        &complaints_def,
        range,
        output_dir,
        &progress_for(&complaints_def.name),
    )
    .await?
    .rows()?;

    log::info!(
        "Extracted {} filming permits and {} noise complaints for {} to {} (exclusive)",
        permits.len(),
        complaints.len(),
        range.start_str(),
        range.end_str()
    );

    let written = correlate_datasets(&permits, &complaints, output_dir)?;

    log::info!("Pipeline finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use film_noise_source::memory::MemoryClient;
    use film_noise_source::progress::null_progress;
    use serde_json::json;

    use super::*;

    const PERMITS_ID: &str = "tg4x-b46p";
    const COMPLAINTS_ID: &str = "p5f6-bkga";

    fn range() -> DateRange {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        DateRange::parse("2023-01-01", "2023-01-31", now).unwrap()
    }

    fn permits() -> Vec<serde_json::Value> {
        vec![
            json!({
                "eventid": "20",
                "eventtype": "Shooting Permit",
                "startdatetime": "2023-01-01T00:00:00.000",
                "enddatetime": "2023-01-02T00:00:00.000",
                "borough": "Manhattan",
                "zipcode_s": "10001,",
            }),
            json!({
                "eventid": "10",
                "eventtype": "Shooting Permit",
                "startdatetime": "2023-01-01T00:00:00.000",
                "enddatetime": "2023-01-02T00:00:00.000",
                "borough": "Manhattan",
                "zipcode_s": "10001, 10002",
            }),
        ]
    }

    fn complaints() -> Vec<serde_json::Value> {
        vec![
            json!({"unique_key": "1", "created_date": "2023-01-01T05:00:00.000", "incident_zip": "10001"}),
            json!({"unique_key": "2", "created_date": "2023-01-02T00:00:00.000", "incident_zip": "10002"}),
            json!({"unique_key": "3", "created_date": "2023-01-01T06:00:00.000", "incident_zip": "10003"}),
            json!({"unique_key": "4", "created_date": "2023-01-01T07:00:00.000"}),
        ]
    }

    #[tokio::test]
    async fn writes_audit_and_ranked_results() {
        let dir = tempfile::tempdir().unwrap();
        let client = MemoryClient::new()
            .with_dataset(PERMITS_ID, permits())
            .with_dataset(COMPLAINTS_ID, complaints());

        let written = run(&client, &range(), dir.path(), |_| null_progress())
            .await
            .unwrap();
        assert_eq!(written, Some(dir.path().join("results.csv")));
        assert!(dir.path().join("filming_permits.csv").exists());
        assert!(dir.path().join("noise_complaints.csv").exists());

        let mut reader = csv::Reader::from_path(dir.path().join("results.csv")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        // Equal counts and start times fall back to eventid order.
        assert_eq!(rows[0].get(0), Some("10"));
        assert_eq!(rows[1].get(0), Some("20"));
        for row in &rows {
            assert_eq!(row.get(row.len() - 1), Some("1"));
        }
    }

    #[tokio::test]
    async fn empty_permits_produce_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let client = MemoryClient::new().with_dataset(COMPLAINTS_ID, complaints());

        let written = run(&client, &range(), dir.path(), |_| null_progress())
            .await
            .unwrap();
        assert_eq!(written, None);
        assert!(!dir.path().join("results.csv").exists());
        assert_eq!(client.queries().len(), 2);
    }

    #[tokio::test]
    async fn failed_extraction_aborts_before_correlation() {
        let dir = tempfile::tempdir().unwrap();
        let client = MemoryClient::new()
            .with_dataset(PERMITS_ID, permits())
            .with_error(COMPLAINTS_ID, 500, "Internal Server Error");

        let err = run(&client, &range(), dir.path(), |_| null_progress())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Source(SourceError::Remote { status: 500, .. })
        ));
        assert!(dir.path().join("filming_permits.csv").exists());
        assert!(!dir.path().join("results.csv").exists());
    }

    #[tokio::test]
    async fn failed_permit_extraction_skips_complaints() {
        let dir = tempfile::tempdir().unwrap();
        let client = MemoryClient::new().with_error(PERMITS_ID, 403, "Forbidden");

        run(&client, &range(), dir.path(), |_| null_progress())
            .await
            .unwrap_err();

        let queried: Vec<String> = client.queries().into_iter().map(|(id, _)| id).collect();
        assert_eq!(queried, [PERMITS_ID]);
    }
}
