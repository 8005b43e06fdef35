#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed rows for the NYC filming permit and noise complaint datasets.
//!
//! Socrata returns every column as a JSON string, so all fields are kept as
//! [`String`] exactly as received. Missing columns decode as empty strings.
//! Timestamps are interpreted by the correlator, not here.

use serde::{Deserialize, Serialize};

/// Column header for the computed complaint count in result output.
pub const NUM_NOISE_COMPLAINTS_COLUMN: &str = "NumNoiseComplaints";

/// A row of the NYC Film Permits dataset (`tg4x-b46p`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmingPermit {
    /// Unique permit event id.
    pub eventid: String,
    pub eventtype: String,
    /// Inclusive start of the permit window (ISO-8601).
    pub startdatetime: String,
    /// Exclusive end of the permit window (ISO-8601).
    pub enddatetime: String,
    pub enteredon: String,
    pub eventagency: String,
    pub parkingheld: String,
    pub borough: String,
    pub communityboard_s: String,
    pub policeprecinct_s: String,
    pub category: String,
    pub subcategoryname: String,
    pub country: String,
    /// Comma-separated zip codes, e.g. `"10001, 10002"`.
    pub zipcode_s: String,
}

impl FilmingPermit {
    /// Column names in output order.
    pub const COLUMNS: [&'static str; 14] = [
        "eventid",
        "eventtype",
        "startdatetime",
        "enddatetime",
        "enteredon",
        "eventagency",
        "parkingheld",
        "borough",
        "communityboard_s",
        "policeprecinct_s",
        "category",
        "subcategoryname",
        "country",
        "zipcode_s",
    ];

    /// Field values in [`Self::COLUMNS`] order.
    #[must_use]
    pub fn values(&self) -> [&str; 14] {
        [
            self.eventid.as_str(),
            self.eventtype.as_str(),
            self.startdatetime.as_str(),
            self.enddatetime.as_str(),
            self.enteredon.as_str(),
            self.eventagency.as_str(),
            self.parkingheld.as_str(),
            self.borough.as_str(),
            self.communityboard_s.as_str(),
            self.policeprecinct_s.as_str(),
            self.category.as_str(),
            self.subcategoryname.as_str(),
            self.country.as_str(),
            self.zipcode_s.as_str(),
        ]
    }

    /// Splits [`Self::zipcode_s`] into trimmed candidate zip codes.
    ///
    /// Entries are neither deduplicated nor filtered: `"10001,"` yields
    /// `["10001", ""]` and an empty field yields `[""]`.
    pub fn zip_codes(&self) -> impl Iterator<Item = &str> {
        self.zipcode_s.split(',').map(str::trim)
    }
}

/// A row of the 311 noise complaints dataset (`p5f6-bkga`), projected to
/// the three columns the correlator needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseComplaint {
    /// Unique complaint id.
    pub unique_key: String,
    /// When the complaint was filed (ISO-8601).
    pub created_date: String,
    /// Zip code of the incident. Empty when the source omits it.
    pub incident_zip: String,
}

/// A filming permit together with the number of noise complaints
/// attributed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationResult {
    /// The permit the count belongs to.
    pub permit: FilmingPermit,
    /// Complaints inside the permit window, summed over its zip codes.
    pub num_noise_complaints: u64,
}

impl CorrelationResult {
    #[must_use]
    pub const fn new(permit: FilmingPermit, num_noise_complaints: u64) -> Self {
        Self {
            permit,
            num_noise_complaints,
        }
    }

    /// Header row: every permit column followed by
    /// [`NUM_NOISE_COMPLAINTS_COLUMN`].
    #[must_use]
    pub fn header() -> Vec<&'static str> {
        let mut header = FilmingPermit::COLUMNS.to_vec();
        header.push(NUM_NOISE_COMPLAINTS_COLUMN);
        header
    }

    /// Row values aligned with [`Self::header`].
    #[must_use]
    pub fn record(&self) -> Vec<String> {
        let mut record: Vec<String> = self
            .permit
            .values()
            .iter()
            .map(|v| (*v).to_string())
            .collect();
        record.push(self.num_noise_complaints.to_string());
        record
    }
}
