//! Runtime settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `SOCRATA_APP_TOKEN` | unset |
//! | `SOCRATA_DOMAIN` | `data.cityofnewyork.us` |
//! | `SOCRATA_TIMEOUT_SECS` | `150` |
//! | `FILM_NOISE_OUTPUT_DIR` | `./data/output` |

use std::path::PathBuf;
use std::time::Duration;

use film_noise_source::socrata::{DEFAULT_DOMAIN, DEFAULT_TIMEOUT, SodaClientConfig};

/// Default directory for audit and result CSVs.
pub const DEFAULT_OUTPUT_DIR: &str = "./data/output";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to something that cannot be used.
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the pipeline needs besides the date range.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub client: SodaClientConfig,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let timeout = match get("SOCRATA_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: "SOCRATA_TIMEOUT_SECS",
                        value,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "SOCRATA_TIMEOUT_SECS",
                        value,
                        reason: e.to_string(),
                    });
                }
            },
        };

        Ok(Self {
            output_dir: get("FILM_NOISE_OUTPUT_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from),
            client: SodaClientConfig {
                domain: get("SOCRATA_DOMAIN").unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
                app_token: get("SOCRATA_APP_TOKEN"),
                timeout,
            },
        })
    }
}
