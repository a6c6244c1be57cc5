//! Sandbox settings
//!
//! User-tunable values for the graphical demo, stored next to the
//! executable as RON.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User-configurable sandbox settings
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct SimSettings {
    /// VSync for the demo window
    pub vsync: bool,
    /// Initial simulation speed multiplier
    pub simulation_speed: f32,
    /// Global scale on emitter fire intervals (2.0 = half as many shots)
    pub emitter_interval_scale: f32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            simulation_speed: 1.0,
            emitter_interval_scale: 1.0,
        }
    }
}

impl SimSettings {
    /// Get the path to the settings file
    fn settings_path() -> PathBuf {
        // Store in the same directory as the executable for now
        // In production, you'd use directories::ProjectDirs for proper cross-platform support
        PathBuf::from("settings.ron")
    }

    /// Load settings from file, or return default if file doesn't exist
    pub fn load() -> Self {
        let path = Self::settings_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => match ron::from_str(&contents) {
                    Ok(settings) => {
                        info!("Loaded settings from {:?}", path);
                        settings
                    }
                    Err(e) => {
                        warn!("Failed to parse settings file: {}", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Failed to read settings file: {}", e);
                    Self::default()
                }
            }
        } else {
            info!("No settings file found, using defaults");
            Self::default()
        }
    }

    /// Save settings to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::settings_path();
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(&path, contents)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_round_trip_through_ron() {
        let settings = SimSettings::default();
        let text = ron::ser::to_string(&settings).expect("serialize");
        let parsed: SimSettings = ron::from_str(&text).expect("parse");
        assert_eq!(parsed.vsync, settings.vsync);
        assert_eq!(parsed.simulation_speed, settings.simulation_speed);
    }
}
