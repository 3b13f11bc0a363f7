//! Tunables for grid construction, path search and navigation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

/// Configuration values shared by the grid, the path finder and the navigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Edge length of a grid cell in world units.
    pub cell_size: f64,
    pub allow_diagonal_movement: bool,
    /// Allow a diagonal step when one of the flanking orthogonal cells is blocked.
    pub allow_cutting_corners: bool,
    /// Extra clearance kept between a planned straight line and collision boxes.
    pub path_margin: f64,
    /// Distance at which a navigator considers a waypoint reached.
    pub acceptable_error: f64,
    pub updates_per_second: u32,
    pub penalty_static_prop: f64,
    pub penalty_not_walkable_neighbor: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            cell_size: 16.0,
            allow_diagonal_movement: true,
            allow_cutting_corners: false,
            path_margin: 2.0,
            acceptable_error: 0.3,
            updates_per_second: 50,
            penalty_static_prop: 5.0,
            penalty_not_walkable_neighbor: 4.0,
        }
    }
}

impl NavConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    #[must_use]
    pub fn with_diagonal_movement(mut self, allow: bool) -> Self {
        self.allow_diagonal_movement = allow;
        self
    }

    #[must_use]
    pub fn with_cutting_corners(mut self, allow: bool) -> Self {
        self.allow_cutting_corners = allow;
        self
    }

    #[must_use]
    pub fn with_path_margin(mut self, margin: f64) -> Self {
        self.path_margin = margin;
        self
    }

    #[must_use]
    pub fn with_acceptable_error(mut self, error: f64) -> Self {
        self.acceptable_error = error;
        self
    }

    #[must_use]
    pub fn with_updates_per_second(mut self, updates: u32) -> Self {
        self.updates_per_second = updates;
        self
    }

    /// Reject values the grid and navigator cannot work with.
    pub fn validate(&self) -> NavResult<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(NavError::InvalidCellSize(self.cell_size));
        }
        if self.updates_per_second == 0 {
            return Err(NavError::InvalidConfig(
                "updates_per_second must be greater than zero".into(),
            ));
        }
        if !(self.path_margin.is_finite() && self.path_margin >= 0.0) {
            return Err(NavError::InvalidConfig(format!(
                "path_margin must be non-negative (got {})",
                self.path_margin
            )));
        }
        if !(self.acceptable_error.is_finite() && self.acceptable_error >= 0.0) {
            return Err(NavError::InvalidConfig(format!(
                "acceptable_error must be non-negative (got {})",
                self.acceptable_error
            )));
        }
        Ok(())
    }

    /// Serialize this configuration to JSON.
    pub fn to_json(&self) -> NavResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate a configuration from JSON.
    pub fn from_json(json: &str) -> NavResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save this configuration to a file.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing nav config to {}", path.display()))?;
        Ok(())
    }

    /// Load a configuration from a file.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading nav config from {}", path.display()))?;
        Ok(Self::from_json(&json)?)
    }
}
