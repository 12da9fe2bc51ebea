//! Configuration loading for the digitizer tester.
//!
//! Configuration comes from a TOML file merged with environment overrides
//! (prefix `DIGITIZER_DAQ_`), e.g. `DIGITIZER_DAQ_LOG_LEVEL=debug`. Parsing
//! and semantic validation are separate steps: `load` only deserializes,
//! `validate` checks invariants that parse fine but are logically wrong.

use crate::error::{DigiResult, DigitizerError};
use crate::registers::ChannelTopology;
use crate::transport::LinkType;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for one digitizer module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitizerConfig {
    /// Module number, used for diagnostics only.
    #[serde(default)]
    pub module_number: usize,

    /// First channel index handled by this module.
    #[serde(default)]
    pub channel_start: usize,

    /// Number of channels; must be even (channels are paired into groups).
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Bus link used to reach the board.
    #[serde(default = "default_link")]
    pub link: LinkType,

    /// Device index on the link.
    #[serde(default)]
    pub device_index: u32,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_channel_count() -> usize {
    16
}

fn default_link() -> LinkType {
    LinkType::OpticalLink
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            module_number: 0,
            channel_start: 0,
            channel_count: default_channel_count(),
            link: default_link(),
            device_index: 0,
            log_level: default_log_level(),
        }
    }
}

impl DigitizerConfig {
    /// Load configuration from `path` merged with `DIGITIZER_DAQ_` env vars.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DIGITIZER_DAQ_"))
            .extract()
    }

    /// Validate values that deserialize fine but are logically wrong.
    pub fn validate(&self) -> DigiResult<()> {
        self.topology().validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(DigitizerError::Config(format!(
                "invalid log_level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Channel topology described by this configuration.
    pub fn topology(&self) -> ChannelTopology {
        ChannelTopology {
            channel_start: self.channel_start,
            channel_count: self.channel_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = DigitizerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.channel_count, 16);
        assert_eq!(config.link, LinkType::OpticalLink);
    }

    #[test]
    fn odd_channel_count_is_rejected() {
        let config = DigitizerConfig {
            channel_count: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let config = DigitizerConfig {
            log_level: "loud".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = DigitizerConfig {
            module_number: 1,
            channel_start: 4,
            channel_count: 12,
            link: LinkType::Usb,
            device_index: 2,
            log_level: "debug".into(),
        };

        let rendered = toml::to_string(&config).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();

        let reloaded = DigitizerConfig::load_from(file.path()).unwrap();
        assert_eq!(reloaded.module_number, config.module_number);
        assert_eq!(reloaded.channel_start, config.channel_start);
        assert_eq!(reloaded.channel_count, config.channel_count);
        assert_eq!(reloaded.link, config.link);
        assert_eq!(reloaded.device_index, config.device_index);
        assert_eq!(reloaded.log_level, config.log_level);
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "module_number = 2\nchannel_start = 8\nchannel_count = 8\nlink = \"usb\"\n"
        )
        .unwrap();

        let config = DigitizerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.module_number, 2);
        assert_eq!(config.channel_start, 8);
        assert_eq!(config.channel_count, 8);
        assert_eq!(config.link, LinkType::Usb);
        assert_eq!(config.log_level, "info");
        config.validate().unwrap();
    }
}
