//! Dataset extraction.
//!
//! Runs a dataset's query for a validated [`DateRange`], materializes the
//! records as a [`Table`], and writes the table to
//! `<output_dir>/<output_filename>.csv` as an audit copy. Failures are logged
//! with the dataset name and returned to the caller unchanged.

use std::path::Path;
use std::sync::Arc;

use film_noise_dates::DateRange;

use crate::SourceError;
use crate::dataset_def::DatasetDefinition;
use crate::progress::ProgressCallback;
use crate::socrata::{SocrataConfig, SodaClient, fetch_socrata};
use crate::table::Table;

/// Extracts `dataset` for `range`, writes the audit CSV under `output_dir`,
/// and returns the table.
///
/// # Errors
///
/// Returns [`SourceError`] if the query fails or the CSV cannot be written.
/// [`SourceError::is_remote`] tells the two apart.
pub async fn extract_dataset(
    client: &dyn SodaClient,
    dataset: &DatasetDefinition,
    range: &DateRange,
    output_dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Table, SourceError> {
    log::info!(
        "Extracting dataset: {} for the provided date range.",
        dataset.output_filename
    );

    let result = extract(client, dataset, range, output_dir, progress).await;

    if let Err(e) = &result {
        if e.is_remote() {
            log::error!(
                "Socrata API error encountered while fetching dataset: {}: {e}",
                dataset.output_filename
            );
        } else {
            log::error!(
                "Unexpected error extracting dataset: {}: {e}",
                dataset.output_filename
            );
        }
    }

    result
}

async fn extract(
    client: &dyn SodaClient,
    dataset: &DatasetDefinition,
    range: &DateRange,
    output_dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Table, SourceError> {
    let where_clause = dataset.where_clause(range);
    log::debug!("{} $where: {where_clause}", dataset.id);

    let records = fetch_socrata(
        client,
        &SocrataConfig {
            dataset_id: &dataset.dataset_id,
            label: &dataset.name,
            where_clause: Some(&where_clause),
            select: dataset.select.as_deref(),
            limit: dataset.limit,
            page_size: dataset.page_size,
        },
        progress,
    )
    .await?;

    let table = Table::from_records(records);

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(dataset.csv_filename());
    table.write_csv(&path)?;
    log::info!("Wrote {} rows to {}", table.len(), path.display());

    Ok(table)
}
