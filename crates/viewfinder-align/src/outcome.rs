//! Puzzle outcomes — what a confirmed alignment actually does.
//!
//! The table is built once from the manifest. Waypoint names are resolved to
//! positions at that point, so a typo fails at load time instead of when the
//! player finally solves the puzzle.
//!
//! Every confirmation carries a [`ResolutionToken`]. A token fires at most
//! once; asking again with the same (or an older) token is a no-op.

use std::collections::HashMap;

use serde::Serialize;
use viewfinder_common::{Manifest, OutcomeSpec, Vec3};

use crate::error::{AlignError, Result};
use crate::fade::FadeSequencer;
use crate::host::HostEngine;
use crate::inventory::InventoryProvider;
use crate::PuzzleId;

/// Resolved outcome for one puzzle
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    EnvironmentMutation { flag: String, scene: String },
    Teleport { waypoint: String, position: Vec3 },
    Spawn { object: String },
    DisplayModeSwitch { mode: String },
    InventoryRemoval,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    EnvironmentMutation,
    Teleport,
    Spawn,
    DisplayModeSwitch,
    InventoryRemoval,
    Reset,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::EnvironmentMutation { .. } => OutcomeKind::EnvironmentMutation,
            Outcome::Teleport { .. } => OutcomeKind::Teleport,
            Outcome::Spawn { .. } => OutcomeKind::Spawn,
            Outcome::DisplayModeSwitch { .. } => OutcomeKind::DisplayModeSwitch,
            Outcome::InventoryRemoval => OutcomeKind::InventoryRemoval,
            Outcome::Reset => OutcomeKind::Reset,
        }
    }

    /// Resolve a manifest entry, looking teleport waypoints up by name
    pub fn from_spec(id: &PuzzleId, spec: &OutcomeSpec, waypoints: &HashMap<String, Vec3>) -> Result<Self> {
        Ok(match spec {
            OutcomeSpec::EnvironmentMutation { flag, scene } => Outcome::EnvironmentMutation {
                flag: flag.clone(),
                scene: scene.clone(),
            },
            OutcomeSpec::Teleport { waypoint } => {
                let position = waypoints.get(waypoint).copied().ok_or_else(|| {
                    AlignError::UnknownWaypoint {
                        id: id.clone(),
                        waypoint: waypoint.clone(),
                    }
                })?;
                Outcome::Teleport {
                    waypoint: waypoint.clone(),
                    position,
                }
            }
            OutcomeSpec::Spawn { object } => Outcome::Spawn { object: object.clone() },
            OutcomeSpec::DisplayModeSwitch { mode } => Outcome::DisplayModeSwitch { mode: mode.clone() },
            OutcomeSpec::InventoryRemoval => Outcome::InventoryRemoval,
            OutcomeSpec::Reset => Outcome::Reset,
        })
    }
}

/// Identifies one confirmed alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolutionToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeResult {
    /// The effect ran. `freeze` asks the caller to keep the avatar locked
    /// (a scene change is on its way).
    Fired { kind: OutcomeKind, freeze: bool },
    /// This token already fired
    AlreadyFired,
}

/// Everything an outcome may touch
pub struct OutcomeContext<'a> {
    pub host: &'a mut dyn HostEngine,
    pub inventory: &'a mut dyn InventoryProvider,
    /// Fade of the shared picture slot, reset after the effect
    pub fade: &'a mut FadeSequencer,
}

#[derive(Debug, Default)]
pub struct OutcomeDispatcher {
    table: HashMap<PuzzleId, Outcome>,
    last_fired: Option<ResolutionToken>,
}

impl OutcomeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table for every puzzle in the manifest
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let waypoints: HashMap<String, Vec3> = manifest
            .waypoints
            .iter()
            .map(|(name, pos)| (name.clone(), *pos))
            .collect();

        let mut dispatcher = Self::new();
        for entry in &manifest.puzzles {
            let id = PuzzleId::new(entry.id.as_str());
            let outcome = Outcome::from_spec(&id, &entry.outcome, &waypoints)?;
            dispatcher.insert(id, outcome)?;
        }
        Ok(dispatcher)
    }

    pub fn insert(&mut self, id: PuzzleId, outcome: Outcome) -> Result<()> {
        if self.table.contains_key(&id) {
            return Err(AlignError::DuplicateOutcome(id));
        }
        self.table.insert(id, outcome);
        Ok(())
    }

    pub fn get(&self, id: &PuzzleId) -> Option<&Outcome> {
        self.table.get(id)
    }

    pub fn contains(&self, id: &PuzzleId) -> bool {
        self.table.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Run the outcome bound to `id` for confirmation `token`.
    ///
    /// An unknown id is an error and touches nothing. A token at or below
    /// the last fired one returns `AlreadyFired` without side effects.
    pub fn resolve(
        &mut self,
        id: &PuzzleId,
        token: ResolutionToken,
        ctx: &mut OutcomeContext<'_>,
    ) -> Result<OutcomeResult> {
        let Some(outcome) = self.table.get(id) else {
            tracing::error!("No outcome registered for puzzle '{}'", id);
            return Err(AlignError::Unmatched(id.clone()));
        };

        if self.last_fired.is_some_and(|last| token <= last) {
            tracing::warn!("Outcome for '{}' already fired (token {})", id, token.0);
            return Ok(OutcomeResult::AlreadyFired);
        }
        self.last_fired = Some(token);

        let mut freeze = false;
        match outcome {
            Outcome::EnvironmentMutation { flag, scene } => {
                let value = ctx.host.toggle_global_flag(flag);
                tracing::info!("'{}': flag {} -> {}, loading {}", id, flag, value, scene);
                ctx.host.load_scene(scene);
                freeze = true;
            }
            Outcome::Teleport { waypoint, position } => {
                tracing::info!("'{}': teleport to {} {}", id, waypoint, position);
                ctx.host.set_avatar_position(*position);
            }
            Outcome::Spawn { object } => {
                tracing::info!("'{}': spawn {}", id, object);
                ctx.host.spawn_object(object);
            }
            Outcome::DisplayModeSwitch { mode } => {
                tracing::info!("'{}': display mode {}", id, mode);
                ctx.host.switch_display_mode(mode);
            }
            Outcome::InventoryRemoval => {
                if ctx.inventory.remove(id.as_str()) {
                    tracing::info!("'{}': removed from inventory", id);
                } else {
                    tracing::warn!("'{}': not held by any inventory", id);
                }
            }
            Outcome::Reset => {
                tracing::info!("'{}': re-armed", id);
            }
        }

        // The picture slot is shared by every puzzle, so it always goes back
        // to opaque before the next one uses it.
        ctx.fade.reset();

        Ok(OutcomeResult::Fired {
            kind: outcome.kind(),
            freeze,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, RecordingHost};
    use crate::inventory::SlotInventory;

    fn dispatcher() -> OutcomeDispatcher {
        let manifest = Manifest::parse(
            r#"
[waypoints]
dock = [1.0, 2.0, 3.0]

[[puzzles]]
id = "Sunset"
record = "s.txt"
outcome = { kind = "teleport", waypoint = "dock" }

[[puzzles]]
id = "Night"
record = "n.txt"
outcome = { kind = "environment_mutation", flag = "is_night", scene = "HarborNight" }

[[puzzles]]
id = "Map"
record = "m.txt"
outcome = { kind = "inventory_removal" }

[[puzzles]]
id = "Statue"
record = "st.txt"
outcome = { kind = "reset" }

[[puzzles]]
id = "Bridge"
record = "b.txt"
outcome = { kind = "spawn", object = "BridgePlanks" }

[[puzzles]]
id = "Lens"
record = "l.txt"
outcome = { kind = "display_mode_switch", mode = "projector" }
"#,
        )
        .unwrap();
        OutcomeDispatcher::from_manifest(&manifest).unwrap()
    }

    struct Fixture {
        host: RecordingHost,
        inventory: SlotInventory,
        fade: FadeSequencer,
    }

    impl Fixture {
        fn new() -> Self {
            let mut inventory = SlotInventory::new("harbor", 4);
            inventory.add("Map");
            let mut fade = FadeSequencer::new(2.0, 0.01).unwrap();
            fade.tick(10.0);
            Self {
                host: RecordingHost::new(),
                inventory,
                fade,
            }
        }

        fn resolve(&mut self, d: &mut OutcomeDispatcher, id: &str, token: u64) -> Result<OutcomeResult> {
            let mut ctx = OutcomeContext {
                host: &mut self.host,
                inventory: &mut self.inventory,
                fade: &mut self.fade,
            };
            d.resolve(&PuzzleId::from(id), ResolutionToken(token), &mut ctx)
        }
    }

    #[test]
    fn test_teleport_moves_avatar_and_resets_fade() {
        let mut d = dispatcher();
        let mut f = Fixture::new();
        assert!(f.fade.is_finished());
        let r = f.resolve(&mut d, "Sunset", 1).unwrap();
        assert_eq!(
            r,
            OutcomeResult::Fired {
                kind: OutcomeKind::Teleport,
                freeze: false
            }
        );
        assert_eq!(f.host.avatar_position, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(f.fade.alpha(), 1.0);
        assert!(!f.fade.is_finished());
    }

    #[test]
    fn test_environment_mutation_requests_freeze() {
        let mut d = dispatcher();
        let mut f = Fixture::new();
        let r = f.resolve(&mut d, "Night", 1).unwrap();
        assert_eq!(
            r,
            OutcomeResult::Fired {
                kind: OutcomeKind::EnvironmentMutation,
                freeze: true
            }
        );
        assert!(f.host.global_flag("is_night"));
        assert!(f
            .host
            .calls
            .contains(&HostCall::LoadScene { scene: "HarborNight".to_string() }));
    }

    #[test]
    fn test_inventory_removal() {
        let mut d = dispatcher();
        let mut f = Fixture::new();
        assert!(f.inventory.contains("Map"));
        f.resolve(&mut d, "Map", 1).unwrap();
        assert!(!f.inventory.contains("Map"));
    }

    #[test]
    fn test_spawn_and_display_mode() {
        let mut d = dispatcher();
        let mut f = Fixture::new();
        f.resolve(&mut d, "Bridge", 1).unwrap();
        f.resolve(&mut d, "Lens", 2).unwrap();
        assert_eq!(
            f.host.calls,
            vec![
                HostCall::SpawnObject { object: "BridgePlanks".to_string() },
                HostCall::SwitchDisplayMode { mode: "projector".to_string() },
            ]
        );
    }

    #[test]
    fn test_same_token_fires_once() {
        let mut d = dispatcher();
        let mut f = Fixture::new();
        let first = f.resolve(&mut d, "Night", 7).unwrap();
        let second = f.resolve(&mut d, "Night", 7).unwrap();
        assert!(matches!(first, OutcomeResult::Fired { .. }));
        assert_eq!(second, OutcomeResult::AlreadyFired);
        assert_eq!(f.host.count(|c| matches!(c, HostCall::ToggleGlobalFlag { .. })), 1);
        assert!(f.host.global_flag("is_night"));
    }

    #[test]
    fn test_unknown_id_fails_without_side_effects() {
        let mut d = dispatcher();
        let mut f = Fixture::new();
        let err = f.resolve(&mut d, "Unknown", 1).unwrap_err();
        assert!(matches!(err, AlignError::Unmatched(id) if id.as_str() == "Unknown"));
        assert!(f.host.calls.is_empty());
        // Fade slot untouched
        assert_eq!(f.fade.alpha(), 0.0);
        // A failed lookup does not consume the token
        assert!(matches!(f.resolve(&mut d, "Statue", 1).unwrap(), OutcomeResult::Fired { .. }));
    }

    #[test]
    fn test_unknown_waypoint_is_config_error() {
        let manifest = Manifest::parse(
            r#"
[[puzzles]]
id = "Lost"
record = "x.txt"
outcome = { kind = "teleport", waypoint = "nowhere" }
"#,
        )
        .unwrap();
        assert!(matches!(
            OutcomeDispatcher::from_manifest(&manifest),
            Err(AlignError::UnknownWaypoint { .. })
        ));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut d = OutcomeDispatcher::new();
        d.insert(PuzzleId::from("A"), Outcome::Reset).unwrap();
        assert!(d.insert(PuzzleId::from("A"), Outcome::InventoryRemoval).is_err());
        assert_eq!(d.len(), 1);
    }
}
