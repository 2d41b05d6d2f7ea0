use std::path::Path;

use serde::Deserialize;

use crate::entropy::clock::ClockSource;
use crate::entropy::jitter::SymbolWidth;
use crate::error::Error;

const DEFAULT_CONFIG_PATH: &str = "/etc/deltarand.toml";

pub const DEFAULT_SCALES: [i64; 7] = [
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub clock: ClockSource,
    pub width: SymbolWidth,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            clock: ClockSource::Monotonic,
            width: SymbolWidth::Byte,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub scales: Vec<i64>,
    pub alpha: f64,
    pub threads: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            scales: DEFAULT_SCALES.to_vec(),
            alpha: 0.01,
            threads: 1,
        }
    }
}

impl ValidatorConfig {
    /// Clamp fields to valid ranges. Trial sizes are left untouched so that
    /// a bad one is rejected with its own error.
    pub fn validate(&mut self) {
        self.threads = self.threads.clamp(1, 64);
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            log::warn!(
                "significance level {} outside (0, 1), using 0.01",
                self.alpha
            );
            self.alpha = 0.01;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub validator: ValidatorConfig,
}

/// Load configuration from a TOML file.
///
/// - If `explicit_path` is `Some` and the file is missing, returns an error.
/// - If `explicit_path` is `None`, tries `/etc/deltarand.toml`; if missing, returns defaults.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config, Error> {
    let path = match explicit_path {
        Some(p) => {
            if !p.exists() {
                return Err(Error::InvalidArgs(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p.to_path_buf()
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(Config::default());
            }
            default.to_path_buf()
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidArgs(format!("failed to read config {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| {
        Error::InvalidArgs(format!("failed to parse config {}: {}", path.display(), e))
    })?;

    Ok(config)
}
