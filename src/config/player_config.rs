use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "player.json";

/// Audio/input latency compensation in milliseconds.
///
/// Always a multiple of `STEP_MS` within `[MIN_MS, MAX_MS]`; values read
/// from disk are clamped and rounded to the nearest step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct LatencyOffset(i32);

impl LatencyOffset {
    pub const MIN_MS: i32 = -150;
    pub const MAX_MS: i32 = 150;
    pub const STEP_MS: i32 = 5;

    pub fn new(ms: i32) -> Self {
        let clamped = ms.clamp(Self::MIN_MS, Self::MAX_MS);
        let steps = (f64::from(clamped) / f64::from(Self::STEP_MS)).round() as i32;
        Self(steps * Self::STEP_MS)
    }

    pub fn ms(self) -> i32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    pub fn increased(self) -> Self {
        Self::new(self.0.saturating_add(Self::STEP_MS))
    }

    pub fn decreased(self) -> Self {
        Self::new(self.0.saturating_sub(Self::STEP_MS))
    }
}

impl From<i32> for LatencyOffset {
    fn from(ms: i32) -> Self {
        Self::new(ms)
    }
}

impl From<LatencyOffset> for i32 {
    fn from(offset: LatencyOffset) -> Self {
        offset.0
    }
}

/// What happens to notes still pending when a session finishes early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Leave them out of the judgment counts.
    #[default]
    LeaveUncounted,
    /// Resolve them as MISS before the result is taken.
    ForceMiss,
}

/// Per-player configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub latency_offset_ms: LatencyOffset,
    pub unresolved_policy: UnresolvedPolicy,
}

impl PlayerConfig {
    /// Loads config from the platform config directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Loads config from a specified path.
    /// Returns default config if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves config to the platform config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Saves config to a specified path, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("com", "beatline", "beatline") {
            proj_dirs.config_dir().join(CONFIG_FILE)
        } else {
            PathBuf::from(".beatline-player.json")
        }
    }

    pub fn increase_latency(&mut self) -> LatencyOffset {
        self.latency_offset_ms = self.latency_offset_ms.increased();
        self.latency_offset_ms
    }

    pub fn decrease_latency(&mut self) -> LatencyOffset {
        self.latency_offset_ms = self.latency_offset_ms.decreased();
        self.latency_offset_ms
    }
}
