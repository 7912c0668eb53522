use crate::config::{self, ConfigPatch};
use crate::error::{Result, SimError};
use crate::settings::{BoundaryPolicy, InteractionMode};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named configuration patch. Fields the patch leaves out keep their
/// current value when the preset is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub patch: ConfigPatch,
}

impl Preset {
    pub fn new(name: impl Into<String>, description: impl Into<String>, patch: ConfigPatch) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            patch,
        }
    }
}

/// Manager for loading and saving presets
pub struct PresetManager {
    /// Built-in presets that ship with the app
    pub builtin: Vec<Preset>,
    /// User-created presets loaded from disk
    pub user: Vec<Preset>,
    /// Where user presets live; `None` when the platform has no config dir
    dir: Option<PathBuf>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetManager {
    /// Built-ins plus whatever is stored in the user presets directory
    pub fn new() -> Self {
        Self::with_dir(Self::presets_dir())
    }

    /// Use `dir` for user presets instead of the platform config directory
    pub fn with_dir(dir: Option<PathBuf>) -> Self {
        let mut manager = Self {
            builtin: builtin_presets(),
            user: Vec::new(),
            dir,
        };
        manager.load_user_presets();
        manager
    }

    /// Get the presets directory path
    fn presets_dir() -> Option<PathBuf> {
        config::config_dir().ok().map(|p| p.join("presets"))
    }

    /// Load user presets from disk. Unreadable files are skipped.
    fn load_user_presets(&mut self) {
        let Some(dir) = self.dir.as_deref() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match read_preset(&path) {
                Ok(preset) => self.user.push(preset),
                Err(e) => warn!("skipping preset {}: {}", path.display(), e),
            }
        }
        self.user.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn require_dir(&self) -> Result<&Path> {
        self.dir.as_deref().ok_or(SimError::NoConfigDir)
    }

    /// Save a preset to disk, replacing any user preset with the same name
    pub fn save_preset(&mut self, preset: Preset) -> Result<()> {
        let dir = self.require_dir()?;
        fs::create_dir_all(dir)?;

        let path = dir.join(preset_filename(&preset.name));
        let json = serde_json::to_string_pretty(&preset)?;
        fs::write(&path, json)?;
        info!("preset '{}' saved to {}", preset.name, path.display());

        match self.user.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.user.push(preset),
        }
        Ok(())
    }

    /// Delete a user preset
    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        let dir = self.require_dir()?;
        let path = dir.join(preset_filename(name));
        if path.exists() {
            fs::remove_file(&path)?;
            info!("preset '{}' deleted", name);
        }
        self.user.retain(|p| p.name != name);
        Ok(())
    }

    /// Get all presets (builtin + user)
    pub fn all_presets(&self) -> impl Iterator<Item = &Preset> {
        self.builtin.iter().chain(self.user.iter())
    }

    /// Find a preset by name
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.all_presets().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Get preset names for display
    pub fn preset_names(&self) -> Vec<&str> {
        self.all_presets().map(|p| p.name.as_str()).collect()
    }
}

fn read_preset(path: &Path) -> Result<Preset> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// File name for a preset, with anything outside [A-Za-z0-9_-] replaced
fn preset_filename(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.json", stem)
}

fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::new(
            "Jelly",
            "Soft attraction with long links",
            ConfigPatch {
                mode: Some(InteractionMode::Attract),
                damping: Some(0.99),
                gravity: Some(0.0),
                wind: Some(10.0),
                link_radius: Some(120.0),
                ..Default::default()
            },
        ),
        Preset::new(
            "Fireflies",
            "Slow upward drift, short faint trails",
            ConfigPatch {
                mode: Some(InteractionMode::None),
                damping: Some(0.98),
                wind: Some(0.0),
                gravity: Some(-20.0),
                link_radius: Some(90.0),
                trails: Some(0.15),
                ..Default::default()
            },
        ),
        Preset::new(
            "Breeze",
            "Strong rotating wind, no gravity",
            ConfigPatch {
                mode: Some(InteractionMode::None),
                wind: Some(120.0),
                gravity: Some(0.0),
                damping: Some(0.99),
                link_radius: Some(80.0),
                ..Default::default()
            },
        ),
        Preset::new(
            "Galaxy",
            "Dense swirl pulled toward the pointer",
            ConfigPatch {
                mode: Some(InteractionMode::Attract),
                gravity: Some(0.0),
                wind: Some(0.0),
                link_radius: Some(140.0),
                count: Some(700),
                ..Default::default()
            },
        ),
        Preset::new(
            "Mesh",
            "Many particles, short links, pointer pushes",
            ConfigPatch {
                mode: Some(InteractionMode::Repel),
                gravity: Some(0.0),
                wind: Some(0.0),
                link_radius: Some(85.0),
                count: Some(800),
                trails: Some(0.2),
                ..Default::default()
            },
        ),
        Preset::new(
            "Pinball",
            "Bouncing walls with a speed cap",
            ConfigPatch {
                mode: Some(InteractionMode::Repel),
                boundary: Some(BoundaryPolicy::Bounce),
                restitution: Some(0.85),
                max_speed: Some(Some(400.0)),
                wind: Some(0.0),
                ..Default::default()
            },
        ),
    ]
}
