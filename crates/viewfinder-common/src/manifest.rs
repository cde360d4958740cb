//! Puzzle manifest — the TOML file that wires puzzle instances together.
//!
//! ```toml
//! [settings]
//! pos_threshold = 0.5
//! rot_threshold = 2.0
//!
//! [hints]
//! up = "HintUp"
//! down = "HintDown"
//! left = "HintLeft"
//! right = "HintRight"
//! large_view = "LargeView"
//!
//! [waypoints]
//! lighthouse_top = [12.0, 40.5, -3.0]
//!
//! [[inventories]]
//! name = "harbor"
//! capacity = 6
//! items = ["Sunset"]
//!
//! [[puzzles]]
//! id = "Sunset"
//! record = "poses/sunset.txt"
//! image = "SunsetImage"
//! border = "SunsetBorder"
//! outcome = { kind = "teleport", waypoint = "lighthouse_top" }
//! ```
//!
//! Every settings field has a default so older manifests keep loading.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Vec3;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Alignment tuning shared by every puzzle routed through one coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignSettings {
    /// Maximum distance (world units) from the recorded position
    #[serde(default = "default_pos_threshold")]
    pub pos_threshold: f32,
    /// Maximum pitch/yaw deviation in degrees
    #[serde(default = "default_rot_threshold")]
    pub rot_threshold: f32,
    /// Fade decay rate per second
    #[serde(default = "default_fade_rate")]
    pub fade_rate: f32,
    /// Alpha below which the fade counts as finished
    #[serde(default = "default_fade_epsilon")]
    pub fade_epsilon: f32,
    /// Audio cue played when a confirmed alignment starts resolving
    #[serde(default = "default_confirm_cue")]
    pub confirm_cue: String,
    /// Explanation shown when confirming a locked puzzle
    #[serde(default = "default_locked_message")]
    pub locked_message: String,
}

fn default_pos_threshold() -> f32 {
    0.5
}

fn default_rot_threshold() -> f32 {
    2.0
}

fn default_fade_rate() -> f32 {
    2.0
}

fn default_fade_epsilon() -> f32 {
    0.01
}

fn default_confirm_cue() -> String {
    "picture_confirm".to_string()
}

fn default_locked_message() -> String {
    "Something is still missing here.".to_string()
}

impl Default for AlignSettings {
    fn default() -> Self {
        Self {
            pos_threshold: default_pos_threshold(),
            rot_threshold: default_rot_threshold(),
            fade_rate: default_fade_rate(),
            fade_epsilon: default_fade_epsilon(),
            confirm_cue: default_confirm_cue(),
            locked_message: default_locked_message(),
        }
    }
}

/// Names of the shared UI elements the hint presenter toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintElements {
    #[serde(default = "default_hint_up")]
    pub up: String,
    #[serde(default = "default_hint_down")]
    pub down: String,
    #[serde(default = "default_hint_left")]
    pub left: String,
    #[serde(default = "default_hint_right")]
    pub right: String,
    /// Enlarged picture overlay toggled by the "open large view" input
    #[serde(default = "default_large_view")]
    pub large_view: String,
}

fn default_hint_up() -> String {
    "HintUp".to_string()
}

fn default_hint_down() -> String {
    "HintDown".to_string()
}

fn default_hint_left() -> String {
    "HintLeft".to_string()
}

fn default_hint_right() -> String {
    "HintRight".to_string()
}

fn default_large_view() -> String {
    "LargeView".to_string()
}

impl Default for HintElements {
    fn default() -> Self {
        Self {
            up: default_hint_up(),
            down: default_hint_down(),
            left: default_hint_left(),
            right: default_hint_right(),
            large_view: default_large_view(),
        }
    }
}

/// What happens once a puzzle's alignment is confirmed and the fade is done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeSpec {
    /// Flip a global flag, then load a follow-on scene
    EnvironmentMutation { flag: String, scene: String },
    /// Move the avatar to a named waypoint
    Teleport { waypoint: String },
    /// Activate a follow-on object
    Spawn { object: String },
    /// Hand the picture to another subsystem as a display mode
    DisplayModeSwitch { mode: String },
    /// Remove the originating item from the inventory holding it
    InventoryRemoval,
    /// Re-arm for another attempt (revisitable puzzles)
    Reset,
}

/// One puzzle instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleEntry {
    pub id: String,
    /// Pose record path, relative to the manifest directory
    pub record: PathBuf,
    /// Picture element shown for this puzzle
    #[serde(default = "default_image")]
    pub image: String,
    /// Frame element drawn around the picture
    #[serde(default = "default_border")]
    pub border: String,
    /// Global flag that must be set before a locked record may resolve
    #[serde(default)]
    pub unlock_flag: Option<String>,
    /// Overrides `settings.locked_message` for this puzzle
    #[serde(default)]
    pub locked_message: Option<String>,
    pub outcome: OutcomeSpec,
}

fn default_image() -> String {
    "PictureImage".to_string()
}

fn default_border() -> String {
    "PictureBorder".to_string()
}

/// A capacity-limited inventory and its starting contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySpec {
    pub name: String,
    pub capacity: usize,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Root manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub settings: AlignSettings,
    #[serde(default)]
    pub hints: HintElements,
    #[serde(default)]
    pub waypoints: BTreeMap<String, Vec3>,
    #[serde(default)]
    pub inventories: Vec<InventorySpec>,
    #[serde(default)]
    pub puzzles: Vec<PuzzleEntry>,
    /// Directory the manifest was loaded from (record paths resolve against it)
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Manifest {
    /// Read and validate a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&text)?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::info!(
            "Manifest {}: {} puzzles, {} inventories, {} waypoints",
            path.display(),
            manifest.puzzles.len(),
            manifest.inventories.len(),
            manifest.waypoints.len()
        );
        Ok(manifest)
    }

    /// Parse and validate manifest text
    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Absolute path of a puzzle's pose record
    pub fn record_path(&self, entry: &PuzzleEntry) -> PathBuf {
        if entry.record.is_absolute() {
            entry.record.clone()
        } else {
            self.base_dir.join(&entry.record)
        }
    }

    pub fn puzzle(&self, id: &str) -> Option<&PuzzleEntry> {
        self.puzzles.iter().find(|p| p.id == id)
    }

    fn validate(&self) -> Result<()> {
        let s = &self.settings;
        let valid = |t: f32| t.is_finite() && t >= 0.0;
        if !valid(s.pos_threshold) || !valid(s.rot_threshold) {
            return Err(ManifestError::Invalid(format!(
                "thresholds must be non-negative (pos={}, rot={})",
                s.pos_threshold, s.rot_threshold
            )));
        }

        let mut seen = HashSet::new();
        for puzzle in &self.puzzles {
            if puzzle.id.trim().is_empty() {
                return Err(ManifestError::Invalid("puzzle with empty id".to_string()));
            }
            if !seen.insert(puzzle.id.as_str()) {
                return Err(ManifestError::Invalid(format!(
                    "duplicate puzzle id '{}'",
                    puzzle.id
                )));
            }
        }

        for inv in &self.inventories {
            if inv.items.len() > inv.capacity {
                return Err(ManifestError::Invalid(format!(
                    "inventory '{}' holds {} items but has capacity {}",
                    inv.name,
                    inv.items.len(),
                    inv.capacity
                )));
            }
        }
        Ok(())
    }
}
