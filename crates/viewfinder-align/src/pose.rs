//! Target-pose records — the text files written by the capture tool.
//!
//! One record per puzzle, line oriented `Key: Value` pairs in any order:
//!
//! ```text
//! Player Position: (12.5, 1.0, -3.25)
//! Camera Rotation: {X:0.087 Y:0.17 Z:0 W:0.98}
//! Camera Euler: (10, 20, 0)
//! shouldLock: true
//! Image Width: 1024
//! Image Height: 768
//! ScreenWidth: 1920
//! ScreenHeight: 1080
//! ```
//!
//! Keys are matched by prefix. `shouldLock` is optional (older records do not
//! carry it) and defaults to false. Everything else the engine needs must be
//! present and parse, otherwise that one record fails to load.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use viewfinder_common::{Manifest, Vec3, ViewAngles};

use crate::error::{AlignError, Result};
use crate::PuzzleId;

const KEY_POSITION: &str = "Player Position";
const KEY_ROTATION: &str = "Camera Rotation";
const KEY_EULER: &str = "Camera Euler";
const KEY_LOCK: &str = "shouldLock";
const KEY_IMAGE_WIDTH: &str = "Image Width";
const KEY_IMAGE_HEIGHT: &str = "Image Height";
const KEY_SCREEN_WIDTH: &str = "ScreenWidth";
const KEY_SCREEN_HEIGHT: &str = "ScreenHeight";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseParseError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("line {line}: invalid {key} value '{value}'")]
    InvalidValue {
        line: usize,
        key: &'static str,
        value: String,
    },
}

/// Where the picture was taken from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPose {
    pub position: Vec3,
    pub angles: ViewAngles,
}

/// A fully parsed pose record
#[derive(Debug, Clone, PartialEq)]
pub struct PoseRecord {
    pub target: TargetPose,
    /// Capture-time camera quaternion (x, y, z, w), kept for tooling
    pub rotation: Option<[f32; 4]>,
    /// Camera roll in degrees; never compared
    pub roll: f32,
    /// Requires an external unlock condition before it may resolve
    pub locked: bool,
    pub image_size: Option<(u32, u32)>,
    pub screen_size: Option<(u32, u32)>,
}

impl PoseRecord {
    /// Parse record text
    pub fn parse(text: &str) -> std::result::Result<Self, PoseParseError> {
        let mut position = None;
        let mut euler: Option<Vec<f32>> = None;
        let mut rotation = None;
        let mut locked = false;
        let mut image_w = None;
        let mut image_h = None;
        let mut screen_w = None;
        let mut screen_h = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let Some((_, value)) = line.split_once(':') else {
                tracing::debug!("pose record line {}: no key, skipped", line_no);
                continue;
            };
            let value = value.trim();
            let invalid = |key: &'static str| PoseParseError::InvalidValue {
                line: line_no,
                key,
                value: value.to_string(),
            };

            if line.starts_with(KEY_POSITION) {
                let v = parse_floats(value).filter(|v| v.len() == 3);
                let v = v.ok_or_else(|| invalid(KEY_POSITION))?;
                position = Some(Vec3::new(v[0], v[1], v[2]));
            } else if line.starts_with(KEY_ROTATION) {
                let q = parse_quaternion(value).ok_or_else(|| invalid(KEY_ROTATION))?;
                rotation = Some(q);
            } else if line.starts_with(KEY_EULER) {
                let v = parse_floats(value).filter(|v| v.len() == 2 || v.len() == 3);
                euler = Some(v.ok_or_else(|| invalid(KEY_EULER))?);
            } else if line.starts_with(KEY_LOCK) {
                locked = parse_bool(value).ok_or_else(|| invalid(KEY_LOCK))?;
            } else if line.starts_with(KEY_IMAGE_WIDTH) {
                image_w = Some(value.parse::<u32>().map_err(|_| invalid(KEY_IMAGE_WIDTH))?);
            } else if line.starts_with(KEY_IMAGE_HEIGHT) {
                image_h = Some(value.parse::<u32>().map_err(|_| invalid(KEY_IMAGE_HEIGHT))?);
            } else if line.starts_with(KEY_SCREEN_WIDTH) {
                screen_w = Some(value.parse::<u32>().map_err(|_| invalid(KEY_SCREEN_WIDTH))?);
            } else if line.starts_with(KEY_SCREEN_HEIGHT) {
                screen_h = Some(value.parse::<u32>().map_err(|_| invalid(KEY_SCREEN_HEIGHT))?);
            } else {
                tracing::debug!("pose record line {}: unknown key, skipped", line_no);
            }
        }

        let position = position.ok_or(PoseParseError::MissingField(KEY_POSITION))?;
        let euler = euler.ok_or(PoseParseError::MissingField(KEY_EULER))?;

        Ok(Self {
            target: TargetPose {
                position,
                angles: ViewAngles::new(euler[0], euler[1]),
            },
            rotation,
            roll: euler.get(2).copied().unwrap_or(0.0),
            locked,
            image_size: image_w.zip(image_h),
            screen_size: screen_w.zip(screen_h),
        })
    }

    /// Size of the enlarged picture on `screen`, keeping the image aspect
    /// ratio and fitting inside the screen. None when the record carries no
    /// image size.
    pub fn display_size(&self, screen: (u32, u32)) -> Option<(u32, u32)> {
        let (iw, ih) = self.image_size?;
        if iw == 0 || ih == 0 || screen.0 == 0 || screen.1 == 0 {
            return None;
        }
        let scale = (screen.0 as f32 / iw as f32).min(screen.1 as f32 / ih as f32);
        Some((
            ((iw as f32 * scale).round() as u32).max(1),
            ((ih as f32 * scale).round() as u32).max(1),
        ))
    }
}

fn parse_finite(s: &str) -> Option<f32> {
    s.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Strip one pair of `()` or `<>` and split on commas
fn parse_floats(value: &str) -> Option<Vec<f32>> {
    let inner = value
        .trim()
        .trim_start_matches(['(', '<'])
        .trim_end_matches([')', '>']);
    inner
        .split(',')
        .map(|part| parse_finite(part.trim()))
        .collect()
}

/// `{X:0.1 Y:0.2 Z:0.3 W:0.9}`; the plain `(x, y, z, w)` form is accepted too
fn parse_quaternion(value: &str) -> Option<[f32; 4]> {
    let mut cleaned = value
        .trim()
        .trim_start_matches(['{', '(', '<'])
        .trim_end_matches(['}', ')', '>'])
        .to_string();
    for label in ["X:", "Y:", "Z:", "W:"] {
        cleaned = cleaned.replace(label, " ");
    }
    let parts: Vec<f32> = cleaned
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(parse_finite)
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [x, y, z, w] => Some([*x, *y, *z, *w]),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Loaded pose records, one per puzzle instance
#[derive(Debug, Default)]
pub struct PoseStore {
    records: HashMap<PuzzleId, PoseRecord>,
}

impl PoseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PuzzleId, record: PoseRecord) {
        self.records.insert(id, record);
    }

    pub fn get(&self, id: &PuzzleId) -> Option<&PoseRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Read and parse a single record file
    pub fn load_record(id: &PuzzleId, path: &Path) -> Result<PoseRecord> {
        let text = std::fs::read_to_string(path).map_err(|source| AlignError::RecordIo {
            path: path.to_path_buf(),
            source,
        })?;
        PoseRecord::parse(&text).map_err(|source| AlignError::RecordParse {
            id: id.clone(),
            source,
        })
    }

    /// Load the record of every puzzle in the manifest.
    ///
    /// A record that is missing or malformed only drops its own puzzle; the
    /// failures are returned next to the store.
    pub fn load_manifest(manifest: &Manifest) -> (Self, Vec<AlignError>) {
        let mut store = Self::new();
        let mut failures = Vec::new();

        for entry in &manifest.puzzles {
            let id = PuzzleId::new(entry.id.as_str());
            let path = manifest.record_path(entry);
            match Self::load_record(&id, &path) {
                Ok(record) => {
                    tracing::debug!(
                        "Pose '{}': pos {} pitch {:.1} yaw {:.1}{}",
                        id,
                        record.target.position,
                        record.target.angles.pitch,
                        record.target.angles.yaw,
                        if record.locked { " (locked)" } else { "" }
                    );
                    store.insert(id, record);
                }
                Err(e) => {
                    tracing::error!("Skipping puzzle '{}': {}", id, e);
                    failures.push(e);
                }
            }
        }

        tracing::info!(
            "Loaded {} pose records ({} failed)",
            store.len(),
            failures.len()
        );
        (store, failures)
    }
}
