use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FixtureResult;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub socket_path: PathBuf,
    pub buffer_size: usize,

    pub max_header_size: usize,
    pub max_body_size: usize,

    /// Reject requests without an `SCGI: 1` header.
    pub require_scgi_header: bool,

    #[serde(deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,

    /// Length of one unit for the `/test_sleep_*` fixtures.
    #[serde(deserialize_with = "deserialize_duration")]
    pub sleep_unit: Duration,

    pub server_name: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("./run/scgi_test.sock"),
            buffer_size: 4096,

            max_header_size: 8192,
            max_body_size: 1024 * 1024, // 1 MB

            require_scgi_header: true,

            read_timeout: Duration::from_secs(5),
            sleep_unit: Duration::from_secs(1),

            server_name: "scgi-fixture/0.1".to_string(),
        }
    }
}

impl FixtureConfig {
    pub fn parse(content: &str) -> FixtureResult<Self> {
        Ok(toml::from_str::<FixtureConfig>(content)?)
    }

    /// Loads a config file, falling back to the defaults if it cannot be
    /// read or parsed.
    pub fn from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Fail to read {}: {err}", path.display());
                warn!("Fall back to default config");
                return FixtureConfig::default();
            }
        };

        match Self::parse(&content) {
            Ok(config) => config,
            Err(err) => {
                warn!("Fail to deserialize config file {}: {err}", path.display());
                warn!("Fall back to default config");
                FixtureConfig::default()
            }
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(|err| {
        serde::de::Error::custom(format!("invalid duration of {secs} seconds: {err}"))
    })
}
