//! Config-driven dataset definitions.
//!
//! A [`DatasetDefinition`] captures what differs between the datasets this
//! tool reads: the Socrata id, the `$where` template, the optional
//! projection and the row cap. Definitions are TOML, embedded by
//! [`crate::registry`].

use film_noise_dates::DateRange;
use serde::Deserialize;

use crate::SourceError;

/// Default number of rows requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 50_000;

const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// One Socrata dataset and how to query it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g. `"filming_permits"`).
    pub id: String,
    /// Human-readable name for log output.
    pub name: String,
    /// Socrata four-by-four dataset id (e.g. `"tg4x-b46p"`).
    pub dataset_id: String,
    /// Base name of the audit CSV (without extension).
    pub output_filename: String,
    /// `$where` clause with `{start}` and `{end}` placeholders for the
    /// inclusive start and exclusive end dates.
    pub where_template: String,
    /// Optional `$select` projection.
    #[serde(default)]
    pub select: Option<String>,
    /// Maximum number of rows to extract.
    pub limit: u64,
    /// Rows per request.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl DatasetDefinition {
    /// The `$where` clause for `range`.
    #[must_use]
    pub fn where_clause(&self, range: &DateRange) -> String {
        self.where_template
            .replace("{start}", &range.start_str())
            .replace("{end}", &range.end_str())
    }

    /// File name of the audit CSV.
    #[must_use]
    pub fn csv_filename(&self) -> String {
        format!("{}.csv", self.output_filename)
    }
}

/// Parses a [`DatasetDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if the TOML is malformed or missing
/// required fields.
pub fn parse_dataset_toml(toml_str: &str) -> Result<DatasetDefinition, SourceError> {
    Ok(toml::de::from_str(toml_str)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const MINIMAL: &str = r#"
        id = "demo"
        name = "Demo"
        dataset_id = "abcd-1234"
        output_filename = "demo"
        where_template = "created_date >= '{start}' and created_date < '{end}'"
        limit = 10
    "#;

    fn range() -> DateRange {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        DateRange::parse("2023-07-01", "2023-07-31", now).unwrap()
    }

    #[test]
    fn parses_minimal_definition_with_defaults() {
        let def = parse_dataset_toml(MINIMAL).unwrap();
        assert_eq!(def.id, "demo");
        assert_eq!(def.select, None);
        assert_eq!(def.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(def.csv_filename(), "demo.csv");
    }

    #[test]
    fn fills_where_template() {
        let def = parse_dataset_toml(MINIMAL).unwrap();
        assert_eq!(
            def.where_clause(&range()),
            "created_date >= '2023-07-01' and created_date < '2023-08-01'"
        );
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_dataset_toml("id = \"x\"").unwrap_err();
        assert!(matches!(err, SourceError::Definition(_)));
    }
}
