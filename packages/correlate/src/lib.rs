#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Correlates filming permits with noise complaints.
//!
//! Every permit expands into one candidate per entry of its comma-separated
//! `zipcode_s` field. A complaint counts toward a candidate when its
//! `incident_zip` equals the trimmed candidate and its `created_date` lies
//! in the permit window `[startdatetime, enddatetime)`. Counts are summed
//! over candidates, so a zip code listed twice counts its complaints twice.
//!
//! Results are ranked by count (descending), then start time and event id
//! (ascending), and written to `results.csv`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use film_noise_dates::parse_timestamp;
use film_noise_source_models::{CorrelationResult, FilmingPermit, NoiseComplaint};

/// File name of the ranked output inside the output directory.
pub const RESULTS_FILENAME: &str = "results.csv";

/// Errors that can occur while writing correlation output.
#[derive(Debug, thiserror::Error)]
pub enum CorrelateError {
    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of [`correlate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// No filming permits to evaluate.
    NoPermits,
    /// No noise complaints to evaluate.
    NoComplaints,
    /// One ranked result per permit.
    Ranked(Vec<CorrelationResult>),
}

/// Complaint timestamps grouped by zip code, each group sorted ascending.
///
/// Complaints with no zip code or an unparseable `created_date` are left
/// out, since they can never satisfy the match predicate.
pub struct ComplaintIndex<'a> {
    by_zip: HashMap<&'a str, Vec<NaiveDateTime>>,
}

impl<'a> ComplaintIndex<'a> {
    #[must_use]
    pub fn new(complaints: &'a [NoiseComplaint]) -> Self {
        let mut by_zip: HashMap<&'a str, Vec<NaiveDateTime>> = HashMap::new();
        let mut skipped = 0usize;

        for complaint in complaints {
            let zip = complaint.incident_zip.as_str();
            match parse_timestamp(&complaint.created_date) {
                Some(created) if !zip.is_empty() => by_zip.entry(zip).or_default().push(created),
                _ => skipped += 1,
            }
        }

        for timestamps in by_zip.values_mut() {
            timestamps.sort_unstable();
        }

        if skipped > 0 {
            log::debug!("{skipped} noise complaints have no zip code or no usable created_date");
        }

        Self { by_zip }
    }

    /// Number of complaints in `zip` created within `[start, end)`.
    #[must_use]
    pub fn count(&self, zip: &str, start: NaiveDateTime, end: NaiveDateTime) -> u64 {
        let Some(timestamps) = self.by_zip.get(zip) else {
            return 0;
        };
        let lower = timestamps.partition_point(|t| *t < start);
        let upper = timestamps.partition_point(|t| *t < end);
        upper.saturating_sub(lower) as u64
    }
}

/// Counts the complaints attributable to `permit`, summed over every
/// candidate zip code.
#[must_use]
pub fn count_complaints(permit: &FilmingPermit, index: &ComplaintIndex<'_>) -> u64 {
    let (Some(start), Some(end)) = (
        parse_timestamp(&permit.startdatetime),
        parse_timestamp(&permit.enddatetime),
    ) else {
        log::warn!(
            "Permit {} has an unreadable window ({:?} to {:?}); counting no complaints",
            permit.eventid,
            permit.startdatetime,
            permit.enddatetime
        );
        return 0;
    };

    permit
        .zip_codes()
        .map(|zip| index.count(zip, start, end))
        .sum()
}

/// Correlates every permit with the complaints and ranks the results.
#[must_use]
pub fn correlate(permits: &[FilmingPermit], complaints: &[NoiseComplaint]) -> Correlation {
    if permits.is_empty() {
        return Correlation::NoPermits;
    }
    if complaints.is_empty() {
        return Correlation::NoComplaints;
    }

    log::info!(
        "Filtering noise complaints based on zipcodes & created date within filming permit start & end dates."
    );

    let index = ComplaintIndex::new(complaints);
    let mut results: Vec<CorrelationResult> = permits
        .iter()
        .map(|permit| CorrelationResult::new(permit.clone(), count_complaints(permit, &index)))
        .collect();

    rank(&mut results);
    Correlation::Ranked(results)
}

/// Sorts results by complaint count (descending), then `startdatetime` and
/// `eventid` (ascending). The sort is stable.
pub fn rank(results: &mut [CorrelationResult]) {
    results.sort_by(|a, b| {
        b.num_noise_complaints
            .cmp(&a.num_noise_complaints)
            .then_with(|| compare_timestamps(&a.permit.startdatetime, &b.permit.startdatetime))
            .then_with(|| compare_ids(&a.permit.eventid, &b.permit.eventid))
    });
}

/// Orders timestamps chronologically, with unreadable values after every
/// readable one and ordered textually among themselves. Equal instants fall
/// back to their text so the order stays total.
fn compare_timestamps(a: &str, b: &str) -> Ordering {
    timestamp_key(a).cmp(&timestamp_key(b))
}

fn timestamp_key(s: &str) -> (bool, Option<NaiveDateTime>, &str) {
    let parsed = parse_timestamp(s);
    (parsed.is_none(), parsed, s)
}

/// Orders integer ids numerically ahead of all other ids, which order
/// textually.
fn compare_ids(a: &str, b: &str) -> Ordering {
    id_key(a).cmp(&id_key(b))
}

fn id_key(s: &str) -> (bool, Option<u64>, &str) {
    let parsed = s.parse::<u64>().ok();
    (parsed.is_none(), parsed, s)
}

/// Writes ranked results to `path` with a header row, replacing any
/// existing file.
///
/// # Errors
///
/// Returns [`CorrelateError`] if the file cannot be written.
pub fn write_results(results: &[CorrelationResult], path: &Path) -> Result<(), CorrelateError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CorrelationResult::header())?;
    for result in results {
        writer.write_record(result.record())?;
    }
    writer.flush()?;
    Ok(())
}

/// Correlates the datasets and writes `results.csv` into `output_dir`.
///
/// Returns the path written, or `None` when either input is empty (logged,
/// not an error).
///
/// # Errors
///
/// Returns [`CorrelateError`] if the results file cannot be written.
pub fn correlate_datasets(
    permits: &[FilmingPermit],
    complaints: &[NoiseComplaint],
    output_dir: &Path,
) -> Result<Option<PathBuf>, CorrelateError> {
    let results = match correlate(permits, complaints) {
        Correlation::NoPermits => {
            log::info!(
                "No filming permits found for the provided date range. Unable to evaluate related noise complaints."
            );
            return Ok(None);
        }
        Correlation::NoComplaints => {
            log::info!(
                "No noise complaints found for the provided date range. Unable to evaluate related filming permits."
            );
            return Ok(None);
        }
        Correlation::Ranked(results) => results,
    };

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(RESULTS_FILENAME);
    write_results(&results, &path)?;

    log::info!(
        "Data analysis complete for the provided date range, {RESULTS_FILENAME} added to {}.",
        output_dir.display()
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permit(eventid: &str, zipcode_s: &str, start: &str, end: &str) -> FilmingPermit {
        FilmingPermit {
            eventid: eventid.to_string(),
            zipcode_s: zipcode_s.to_string(),
            startdatetime: start.to_string(),
            enddatetime: end.to_string(),
            ..FilmingPermit::default()
        }
    }

    fn complaint(key: &str, zip: &str, created: &str) -> NoiseComplaint {
        NoiseComplaint {
            unique_key: key.to_string(),
            created_date: created.to_string(),
            incident_zip: zip.to_string(),
        }
    }

    fn ranked(correlation: Correlation) -> Vec<CorrelationResult> {
        match correlation {
            Correlation::Ranked(results) => results,
            other => panic!("expected ranked results, got {other:?}"),
        }
    }

    fn sample_complaints() -> Vec<NoiseComplaint> {
        vec![
            complaint("a", "10001", "2023-01-01T05:00:00"),
            complaint("b", "10002", "2023-01-02T00:00:00"),
            complaint("c", "10003", "2023-01-01T06:00:00"),
        ]
    }

    #[test]
    fn excludes_upper_bound_and_other_zips() {
        let permits = vec![permit(
            "1",
            "10001, 10002",
            "2023-01-01T00:00:00",
            "2023-01-02T00:00:00",
        )];
        let results = ranked(correlate(&permits, &sample_complaints()));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].num_noise_complaints, 1);
    }

    #[test]
    fn includes_lower_bound() {
        let complaints = vec![complaint("a", "10001", "2023-01-01T00:00:00.000")];
        let permits = vec![permit(
            "1",
            "10001",
            "2023-01-01T00:00:00.000",
            "2023-01-01T01:00:00.000",
        )];
        let results = ranked(correlate(&permits, &complaints));
        assert_eq!(results[0].num_noise_complaints, 1);
    }

    #[test]
    fn duplicate_zip_codes_count_twice() {
        let permits = vec![permit(
            "1",
            "10001,10001",
            "2023-01-01T00:00:00",
            "2023-01-02T00:00:00",
        )];
        let results = ranked(correlate(&permits, &sample_complaints()));
        assert_eq!(results[0].num_noise_complaints, 2);
    }

    #[test]
    fn blank_zip_segment_counts_nothing() {
        let mut complaints = sample_complaints();
        complaints.push(complaint("d", "", "2023-01-01T07:00:00"));
        let permits = vec![
            permit("1", "10001,", "2023-01-01T00:00:00", "2023-01-02T00:00:00"),
            permit("2", "", "2023-01-01T00:00:00", "2023-01-02T00:00:00"),
        ];
        let results = ranked(correlate(&permits, &complaints));
        assert_eq!(results[0].permit.eventid, "1");
        assert_eq!(results[0].num_noise_complaints, 1);
        assert_eq!(results[1].num_noise_complaints, 0);
    }

    #[test]
    fn zip_match_is_exact_after_trimming() {
        let complaints = vec![
            complaint("a", "10001", "2023-01-01T05:00:00"),
            complaint("b", "100011", "2023-01-01T05:00:00"),
        ];
        let permits = vec![permit(
            "1",
            "  10001  ",
            "2023-01-01T00:00:00",
            "2023-01-02T00:00:00",
        )];
        let results = ranked(correlate(&permits, &complaints));
        assert_eq!(results[0].num_noise_complaints, 1);
    }

    #[test]
    fn unreadable_timestamps_count_nothing() {
        let complaints = vec![
            complaint("a", "10001", "yesterday"),
            complaint("b", "10001", "2023-01-01T05:00:00"),
        ];
        let permits = vec![
            permit("1", "10001", "2023-01-01T00:00:00", "2023-01-02T00:00:00"),
            permit("2", "10001", "soon", "2023-01-02T00:00:00"),
        ];
        let results = ranked(correlate(&permits, &complaints));
        assert_eq!(results[0].permit.eventid, "1");
        assert_eq!(results[0].num_noise_complaints, 1);
        assert_eq!(results[1].num_noise_complaints, 0);
    }

    #[test]
    fn ranks_by_count_then_start_then_eventid() {
        let mut results = vec![
            CorrelationResult::new(permit("20", "", "2023-01-01T00:00:00", ""), 5),
            CorrelationResult::new(permit("10", "", "2023-01-01T00:00:00", ""), 5),
            CorrelationResult::new(permit("5", "", "2023-01-01T00:00:00", ""), 1),
            CorrelationResult::new(permit("30", "", "2022-12-31T00:00:00", ""), 5),
            CorrelationResult::new(permit("1", "", "2023-01-01T00:00:00", ""), 9),
        ];
        rank(&mut results);
        let order: Vec<&str> = results.iter().map(|r| r.permit.eventid.as_str()).collect();
        assert_eq!(order, ["1", "30", "10", "20", "5"]);
    }

    #[test]
    fn eventids_compare_numerically() {
        assert_eq!(compare_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_ids("abc", "abd"), Ordering::Less);
        assert_eq!(compare_ids("10", "1a"), Ordering::Less);
        assert_eq!(compare_ids("9", "1a"), Ordering::Less);
        assert_eq!(compare_ids("007", "7"), Ordering::Less);
    }

    #[test]
    fn unreadable_start_times_sort_after_readable_ones() {
        assert_eq!(
            compare_timestamps("2023-01-01T00:00:00", "2023-01-01T00:00:00.000"),
            Ordering::Less
        );
        assert_eq!(
            compare_timestamps("2023-01-02T00:00:00", "2023-01-01T00:00:00"),
            Ordering::Greater
        );
        assert_eq!(compare_timestamps("2024-01-01", "soon"), Ordering::Less);
        assert_eq!(compare_timestamps("later", "soon"), Ordering::Less);
    }

    #[test]
    fn ranks_mixed_ids_and_start_times_consistently() {
        let starts = ["2023-01-01T00:00:00", "2023-01-01T00:00:00.000", "TBD", ""];
        let mut results: Vec<CorrelationResult> = (0..3000_u64)
            .map(|i| {
                let eventid = if i % 3 == 0 {
                    format!("{}a", i % 97)
                } else {
                    (i % 101).to_string()
                };
                let start = starts[usize::try_from(i % 4).unwrap()];
                CorrelationResult::new(permit(&eventid, "", start, ""), i % 5)
            })
            .collect();

        rank(&mut results);

        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let order = b
                .num_noise_complaints
                .cmp(&a.num_noise_complaints)
                .then_with(|| compare_timestamps(&a.permit.startdatetime, &b.permit.startdatetime))
                .then_with(|| compare_ids(&a.permit.eventid, &b.permit.eventid));
            assert_ne!(order, Ordering::Greater);
        }
    }

    #[test]
    fn empty_inputs_are_reported() {
        let permits = vec![permit("1", "10001", "2023-01-01T00:00:00", "2023-01-02T00:00:00")];
        assert_eq!(correlate(&[], &sample_complaints()), Correlation::NoPermits);
        assert_eq!(correlate(&permits, &[]), Correlation::NoComplaints);
    }

    #[test]
    fn empty_permits_write_no_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let written = correlate_datasets(&[], &sample_complaints(), dir.path()).unwrap();
        assert_eq!(written, None);
        assert!(!dir.path().join(RESULTS_FILENAME).exists());
    }

    #[test]
    fn writes_ranked_results_csv() {
        let dir = tempfile::tempdir().unwrap();
        let permits = vec![
            permit("2", "10003", "2023-01-01T00:00:00", "2023-01-02T00:00:00"),
            permit("1", "10001, 10002", "2023-01-01T00:00:00", "2023-01-02T00:00:00"),
        ];
        let path = correlate_datasets(&permits, &sample_complaints(), dir.path())
            .unwrap()
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("eventid"));
        assert_eq!(headers.get(headers.len() - 1), Some("NumNoiseComplaints"));

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some("1"));
        assert_eq!(rows[0].get(headers.len() - 1), Some("1"));
        assert_eq!(rows[1].get(0), Some("2"));
        assert_eq!(rows[1].get(headers.len() - 1), Some("1"));
    }

    #[test]
    fn overwrites_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RESULTS_FILENAME), "stale\nstale\nstale\nstale\n").unwrap();
        let permits = vec![permit("1", "10001", "2023-01-01T00:00:00", "2023-01-02T00:00:00")];
        correlate_datasets(&permits, &sample_complaints(), dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(RESULTS_FILENAME)).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(!contents.contains("stale"));
    }
}
