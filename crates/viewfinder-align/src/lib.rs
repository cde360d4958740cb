//! Viewfinder alignment engine
//!
//! The player holds up a picture, walks and looks around until their view
//! matches the pose the picture was taken from, and confirms. The engine
//! compares poses every tick, shows directional hints, fades the picture out
//! on confirmation and then fires the puzzle's outcome exactly once.
//!
//! Layout (leaf-first):
//!   pose        — persisted target-pose records and the per-puzzle store
//!   evaluator   — pose comparison, verdict + hint flags
//!   hints       — verdict → indicator visibility
//!   fade        — asymptotic alpha fade with snap-to-zero completion
//!   outcome     — puzzle id → one resolution effect
//!   coordinator — Idle / Engaged / Resolving state machine
//!
//! The host engine is reached only through [`host::HostEngine`], and the
//! inventories that hold pictures through [`inventory::InventoryProvider`].

pub mod coordinator;
pub mod error;
pub mod evaluator;
pub mod fade;
pub mod hints;
pub mod host;
pub mod inventory;
pub mod outcome;
pub mod pose;

use serde::{Deserialize, Serialize};

pub use coordinator::{Phase, PuzzleCoordinator, TickInput, VisualHandle};
pub use error::{AlignError, Result};
pub use evaluator::{evaluate, shortest_angle, Verdict};
pub use fade::FadeSequencer;
pub use host::{AvatarPose, HostCall, HostEngine, RecordingHost};
pub use inventory::{Inventories, InventoryProvider, SlotInventory};
pub use outcome::{Outcome, OutcomeDispatcher, OutcomeKind, OutcomeResult, ResolutionToken};
pub use pose::{PoseParseError, PoseRecord, PoseStore, TargetPose};

/// Identifier of one puzzle instance (the inventory item name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PuzzleId(String);

impl PuzzleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PuzzleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PuzzleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PuzzleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}
