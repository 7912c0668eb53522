use crate::error::{Result, SimError};
use crate::settings::{BoundaryPolicy, InteractionMode, SimulationConfig};
use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Partial simulation configuration. Missing fields keep the value they
/// are applied over.
///
/// `count` is signed so that a negative value coming from a file is reported
/// as an invalid configuration rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<InteractionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_strength: Option<f32>,
    /// `Some(None)` (JSON `null`) removes the speed cap
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_speed: Option<Option<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restitution: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trails: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_grid: Option<bool>,
}

impl ConfigPatch {
    /// A patch that sets every field to the values in `config`
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            count: Some(config.count as i64),
            speed: Some(config.speed),
            link_radius: Some(config.link_radius),
            gravity: Some(config.gravity),
            damping: Some(config.damping),
            wind: Some(config.wind),
            mode: Some(config.mode),
            interaction_strength: Some(config.interaction_strength),
            max_speed: Some(config.max_speed),
            boundary: Some(config.boundary),
            restitution: Some(config.restitution),
            trails: Some(config.trails),
            show_grid: Some(config.show_grid),
        }
    }

    /// Parse a flat key-value snapshot, the inverse of [`SimulationConfig::to_flat`]
    pub fn from_flat(flat: &BTreeMap<String, serde_json::Value>) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> =
            flat.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }

    /// Overlay this patch on `base` and validate the result. `base` is never
    /// modified, so a rejected patch leaves the caller's configuration intact.
    pub fn apply(&self, base: &SimulationConfig) -> Result<SimulationConfig> {
        let mut config = base.clone();

        if let Some(count) = self.count {
            config.count = usize::try_from(count)
                .map_err(|_| SimError::invalid(format!("count must be >= 0, got {}", count)))?;
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
        if let Some(link_radius) = self.link_radius {
            config.link_radius = link_radius;
        }
        if let Some(gravity) = self.gravity {
            config.gravity = gravity;
        }
        if let Some(damping) = self.damping {
            config.damping = damping;
        }
        if let Some(wind) = self.wind {
            config.wind = wind;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(strength) = self.interaction_strength {
            config.interaction_strength = strength;
        }
        if let Some(cap) = self.max_speed {
            config.max_speed = cap;
        }
        if let Some(boundary) = self.boundary {
            config.boundary = boundary;
        }
        if let Some(restitution) = self.restitution {
            config.restitution = restitution;
        }
        if let Some(trails) = self.trails {
            config.trails = trails;
        }
        if let Some(show_grid) = self.show_grid {
            config.show_grid = show_grid;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Keeps an explicit `null` apart from a missing field
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Simulation parameters
    pub simulation: SimulationConfig,
    /// Simulation steps per rendered frame (app-level)
    pub steps_per_frame: usize,
}

/// On-disk shape accepted by the loader: any subset of the fields
#[derive(Debug, Default, Deserialize)]
struct AppConfigFile {
    version: Option<u32>,
    simulation: Option<ConfigPatch>,
    steps_per_frame: Option<usize>,
}

pub const MAX_STEPS_PER_FRAME: usize = 10;

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.steps_per_frame == 0 || self.steps_per_frame > MAX_STEPS_PER_FRAME {
            return Err(SimError::invalid(format!(
                "steps per frame must be in 1..={}, got {}",
                MAX_STEPS_PER_FRAME, self.steps_per_frame
            )));
        }
        self.simulation.validate()
    }

    /// Export config to a JSON file, creating the parent directory if needed
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        info!("config saved to {}", path.display());
        Ok(())
    }

    /// Import config from a JSON file over the defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::default().merge_from_file(path)
    }

    /// Import config from a JSON file over `self`. Keys missing from the file
    /// keep their current value.
    pub fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let merged = self.merge_json(&content)?;
        info!("config loaded from {}", path.display());
        Ok(merged)
    }

    /// Merge a JSON document. Two shapes are accepted: the full document
    /// written by [`AppConfig::save_to_file`] (or any subset of it), and a bare
    /// flat simulation object such as `{"count": 300, "mode": "attract"}`.
    pub fn merge_json(&self, content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let wrapped = value.get("simulation").is_some() || value.get("steps_per_frame").is_some();

        let file = if wrapped {
            serde_json::from_value::<AppConfigFile>(value)?
        } else {
            AppConfigFile {
                simulation: Some(serde_json::from_value::<ConfigPatch>(value)?),
                ..Default::default()
            }
        };

        let simulation = match &file.simulation {
            Some(patch) => patch.apply(&self.simulation)?,
            None => self.simulation.clone(),
        };
        let merged = Self {
            version: file.version.unwrap_or(self.version),
            simulation,
            steps_per_frame: file.steps_per_frame.unwrap_or(self.steps_per_frame),
        };
        merged.validate()?;
        Ok(merged)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            simulation: SimulationConfig::default(),
            steps_per_frame: 1,
        }
    }
}

/// Directory holding the config file and user presets
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("particle-links"))
        .ok_or(SimError::NoConfigDir)
}

/// Where `d` saves and `l` loads when no `--config` path is given
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}
