/// Playback configuration loaded from a RON file.
///
/// ```ron
/// (
///     bpm: 90.0,
///     steps_per_beat: 4,
///     channel: 10,
///     kit: Some(9),
///     velocities: (ghost: 12, hard: 127),
/// )
/// ```
///
/// Every field is optional.
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::midi::Channel;
use crate::sequencer::clock::TempoClock;
use crate::sequencer::VelocityTable;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bpm: f32,
    pub steps_per_beat: u32,
    pub channel: u8,
    /// Program (drum kit) selected before playback.
    pub kit: Option<u8>,
    pub settle_ms: u64,
    /// Output port index or name fragment; the first port when unset.
    pub port: Option<String>,
    pub velocities: VelocityTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            steps_per_beat: 4,
            channel: Channel::DRUMS.number(),
            kit: None,
            settle_ms: 300,
            port: None,
            velocities: VelocityTable::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates.
    pub fn from_ron(text: &str) -> Result<Self, ConfigurationError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.channel()?;
        self.clock()?;
        self.velocities.validate()
    }

    pub fn channel(&self) -> Result<Channel, ConfigurationError> {
        Channel::new(self.channel)
    }

    pub fn clock(&self) -> Result<TempoClock, ConfigurationError> {
        let clock = TempoClock::new(self.bpm, self.steps_per_beat)?;
        Ok(match self.kit {
            Some(kit) => clock.with_kit(kit, Duration::from_millis(self.settle_ms)),
            None => clock,
        })
    }

    pub fn velocity_table(&self) -> Result<VelocityTable, ConfigurationError> {
        self.velocities.validate()?;
        Ok(self.velocities)
    }
}
