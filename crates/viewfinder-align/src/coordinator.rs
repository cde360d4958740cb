//! Puzzle coordinator — owns the one engaged puzzle.
//!
//! ```text
//!   Idle ──engage──▶ Engaged ──confirm (aligned, unlocked)──▶ Resolving
//!    ▲                  ▲                                         │
//!    │                  └──────── Reset outcome ◀── fade done ────┤
//!    └──────────────────────────── other outcomes ◀───────────────┘
//! ```
//!
//! The picture and border elements are shared by every puzzle. Only the
//! current [`Engagement`] writes to them, and a new engagement always starts
//! from a fresh fade at alpha 1. Engaging (or disengaging) while a puzzle is
//! still resolving completes that resolution first, so its outcome is never
//! lost and never applied to the next puzzle.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use viewfinder_common::{AlignSettings, HintElements, Manifest};

use crate::error::{AlignError, Result};
use crate::evaluator::{evaluate, Verdict};
use crate::fade::FadeSequencer;
use crate::hints;
use crate::host::HostEngine;
use crate::inventory::{Inventories, InventoryProvider};
use crate::outcome::{OutcomeContext, OutcomeDispatcher, OutcomeKind, OutcomeResult, ResolutionToken};
use crate::pose::{PoseStore, TargetPose};
use crate::PuzzleId;

/// Picture element and its frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualHandle {
    pub image: String,
    pub border: String,
}

impl VisualHandle {
    pub fn new(image: &str, border: &str) -> Self {
        Self {
            image: image.to_string(),
            border: border.to_string(),
        }
    }

    fn is_valid(&self) -> bool {
        !self.image.is_empty() && !self.border.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Engaged,
    Resolving,
}

/// Per-frame input from the host. The two flags are edge triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Seconds since the previous tick
    pub dt: f32,
    pub confirm: bool,
    pub toggle_large_view: bool,
}

/// How a locked record gets unlocked
#[derive(Debug, Clone, Default)]
struct LockRule {
    flag: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
struct AlignmentState {
    fade: FadeSequencer,
    has_faded: bool,
    resolving: bool,
}

#[derive(Debug)]
struct Engagement {
    id: PuzzleId,
    visual: VisualHandle,
    target: TargetPose,
    locked: bool,
    state: AlignmentState,
    token: Option<ResolutionToken>,
    large_view: bool,
    verdict: Verdict,
}

pub struct PuzzleCoordinator<I: InventoryProvider = Inventories> {
    settings: AlignSettings,
    hints: HintElements,
    poses: PoseStore,
    dispatcher: OutcomeDispatcher,
    lock_rules: HashMap<PuzzleId, LockRule>,
    unlocked: HashSet<PuzzleId>,
    inventory: I,
    /// Fresh fade copied into every new engagement
    fade_template: FadeSequencer,
    engagement: Option<Engagement>,
    next_token: u64,
}

impl<I: InventoryProvider> PuzzleCoordinator<I> {
    pub fn new(
        settings: AlignSettings,
        hints: HintElements,
        poses: PoseStore,
        dispatcher: OutcomeDispatcher,
        inventory: I,
    ) -> Result<Self> {
        let fade_template = FadeSequencer::new(settings.fade_rate, settings.fade_epsilon)?;
        Ok(Self {
            settings,
            hints,
            poses,
            dispatcher,
            lock_rules: HashMap::new(),
            unlocked: HashSet::new(),
            inventory,
            fade_template,
            engagement: None,
            next_token: 0,
        })
    }

    /// Build a coordinator for every puzzle in the manifest
    pub fn from_manifest(manifest: &Manifest, poses: PoseStore, inventory: I) -> Result<Self> {
        let dispatcher = OutcomeDispatcher::from_manifest(manifest)?;
        let mut coordinator = Self::new(
            manifest.settings.clone(),
            manifest.hints.clone(),
            poses,
            dispatcher,
            inventory,
        )?;
        for entry in &manifest.puzzles {
            coordinator.lock_rules.insert(
                PuzzleId::new(entry.id.as_str()),
                LockRule {
                    flag: entry.unlock_flag.clone(),
                    message: entry.locked_message.clone(),
                },
            );
        }
        tracing::info!(
            "Coordinator ready: {} outcomes, {} poses",
            coordinator.dispatcher.len(),
            coordinator.poses.len()
        );
        Ok(coordinator)
    }

    /// Gate a locked puzzle on a global flag
    pub fn set_unlock_flag(&mut self, id: PuzzleId, flag: &str) {
        self.lock_rules.entry(id).or_default().flag = Some(flag.to_string());
    }

    /// Unlock a puzzle directly (e.g. after a keypad was solved)
    pub fn unlock(&mut self, id: PuzzleId) {
        tracing::info!("Puzzle '{}' unlocked", id);
        self.unlocked.insert(id);
    }

    pub fn is_unlocked(&self, id: &PuzzleId, host: &dyn HostEngine) -> bool {
        if self.unlocked.contains(id) {
            return true;
        }
        self.lock_rules
            .get(id)
            .and_then(|rule| rule.flag.as_deref())
            .is_some_and(|flag| host.global_flag(flag))
    }

    pub fn phase(&self) -> Phase {
        match &self.engagement {
            None => Phase::Idle,
            Some(e) if e.state.resolving => Phase::Resolving,
            Some(_) => Phase::Engaged,
        }
    }

    pub fn engaged_id(&self) -> Option<&PuzzleId> {
        self.engagement.as_ref().map(|e| &e.id)
    }

    /// Alpha of the picture slot, None while idle
    pub fn alpha(&self) -> Option<f32> {
        self.engagement.as_ref().map(|e| e.state.fade.alpha())
    }

    /// Whether the current fade has run to completion
    pub fn has_faded(&self) -> bool {
        self.engagement.as_ref().is_some_and(|e| e.state.has_faded)
    }

    /// Most recent verdict for the engaged puzzle
    pub fn verdict(&self) -> Option<Verdict> {
        self.engagement.as_ref().map(|e| e.verdict)
    }

    pub fn large_view_open(&self) -> bool {
        self.engagement.as_ref().is_some_and(|e| e.large_view)
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Start showing a puzzle. Any previous engagement is released first,
    /// completing it if it was mid-resolution.
    pub fn engage(&mut self, id: PuzzleId, visual: VisualHandle, host: &mut dyn HostEngine) -> Result<()> {
        if !visual.is_valid() {
            tracing::error!("Cannot engage '{}': visual handle is incomplete", id);
            return Err(AlignError::MissingVisual(id));
        }
        let Some(record) = self.poses.get(&id) else {
            tracing::error!("Cannot engage '{}': no pose record loaded", id);
            return Err(AlignError::PoseNotLoaded(id));
        };
        let target = record.target;
        let locked = record.locked;

        if let Some(previous) = self.engagement.take() {
            if previous.state.resolving {
                tracing::warn!(
                    "Engaging '{}' while '{}' is resolving, completing it first",
                    id,
                    previous.id
                );
                self.force_complete(previous, host);
            } else {
                self.release(&previous, host);
            }
        }

        let engagement = Engagement {
            id,
            visual,
            target,
            locked,
            state: AlignmentState {
                fade: self.fade_template.clone(),
                has_faded: false,
                resolving: false,
            },
            token: None,
            large_view: false,
            verdict: Verdict::default(),
        };

        host.set_alpha(&engagement.visual.image, 1.0);
        host.set_alpha(&engagement.visual.border, 1.0);
        host.set_active(&engagement.visual.image, true);
        host.set_active(&engagement.visual.border, true);
        host.set_active(&self.hints.large_view, false);
        hints::clear(&self.hints, host);

        tracing::info!(
            "Engaged '{}'{}",
            engagement.id,
            if engagement.locked { " (locked)" } else { "" }
        );
        self.engagement = Some(engagement);
        Ok(())
    }

    /// Put the picture away and return to Idle
    pub fn disengage(&mut self, host: &mut dyn HostEngine) {
        let Some(engagement) = self.engagement.take() else {
            return;
        };
        if engagement.state.resolving {
            tracing::warn!("Disengaging '{}' mid-resolution, completing it first", engagement.id);
            self.force_complete(engagement, host);
        } else {
            tracing::info!("Disengaged '{}'", engagement.id);
            self.release(&engagement, host);
        }
    }

    /// One engine frame
    pub fn tick(&mut self, input: &TickInput, host: &mut dyn HostEngine) {
        let Some(mut engagement) = self.engagement.take() else {
            return;
        };
        let keep = if engagement.state.resolving {
            self.tick_resolving(&mut engagement, input, host)
        } else {
            self.tick_engaged(&mut engagement, input, host)
        };
        if keep {
            self.engagement = Some(engagement);
        }
    }

    fn tick_engaged(&mut self, eng: &mut Engagement, input: &TickInput, host: &mut dyn HostEngine) -> bool {
        let Some(pose) = host.avatar_pose() else {
            tracing::error!("No avatar pose available, skipping tick for '{}'", eng.id);
            return true;
        };

        eng.verdict = evaluate(
            pose.position,
            pose.angles,
            &eng.target,
            self.settings.pos_threshold,
            self.settings.rot_threshold,
        );
        hints::present(&eng.verdict, true, &self.hints, &eng.visual.border, host);

        if input.toggle_large_view {
            eng.large_view = !eng.large_view;
            host.set_active(&self.hints.large_view, eng.large_view);
        }

        if input.confirm {
            return self.confirm(eng, host);
        }
        true
    }

    fn confirm(&mut self, eng: &mut Engagement, host: &mut dyn HostEngine) -> bool {
        if !eng.verdict.aligned {
            tracing::debug!("Confirm on '{}' ignored, not aligned", eng.id);
            return true;
        }

        if !self.dispatcher.contains(&eng.id) {
            tracing::error!("No outcome registered for '{}', returning to idle", eng.id);
            self.release(eng, host);
            return false;
        }

        if eng.locked && !self.is_unlocked(&eng.id, host) {
            let message = self
                .lock_rules
                .get(&eng.id)
                .and_then(|rule| rule.message.as_deref())
                .unwrap_or(self.settings.locked_message.as_str());
            tracing::info!("'{}' is locked", eng.id);
            host.show_message(message);
            return true;
        }

        self.next_token += 1;
        let token = ResolutionToken(self.next_token);
        eng.token = Some(token);
        eng.state.fade.reset();
        eng.state.has_faded = false;
        eng.state.resolving = true;

        host.set_avatar_locked(true);
        host.play_cue(&self.settings.confirm_cue);
        hints::clear(&self.hints, host);
        if eng.large_view {
            eng.large_view = false;
            host.set_active(&self.hints.large_view, false);
        }

        tracing::info!("Confirmed '{}' (token {})", eng.id, token.0);
        true
    }

    fn tick_resolving(&mut self, eng: &mut Engagement, input: &TickInput, host: &mut dyn HostEngine) -> bool {
        let alpha = eng.state.fade.tick(input.dt);
        host.set_alpha(&eng.visual.image, alpha);
        host.set_alpha(&eng.visual.border, alpha);
        if !eng.state.fade.is_finished() {
            return true;
        }
        eng.state.has_faded = true;

        let result = self.dispatch(eng, host);
        let alpha = eng.state.fade.alpha();
        host.set_alpha(&eng.visual.image, alpha);
        host.set_alpha(&eng.visual.border, alpha);

        match result {
            Some(OutcomeResult::Fired {
                kind: OutcomeKind::Reset,
                ..
            }) => {
                eng.state.resolving = false;
                eng.state.has_faded = false;
                eng.token = None;
                tracing::debug!("'{}' back to engaged", eng.id);
                true
            }
            _ => {
                self.release(eng, host);
                false
            }
        }
    }

    /// Fire the outcome for the engagement's token and release the avatar
    /// unless the outcome keeps it frozen.
    fn dispatch(&mut self, eng: &mut Engagement, host: &mut dyn HostEngine) -> Option<OutcomeResult> {
        let Some(token) = eng.token else {
            tracing::error!("'{}' finished fading without a confirmation token", eng.id);
            host.set_avatar_locked(false);
            return None;
        };

        let mut ctx = OutcomeContext {
            host: &mut *host,
            inventory: &mut self.inventory,
            fade: &mut eng.state.fade,
        };
        match self.dispatcher.resolve(&eng.id, token, &mut ctx) {
            Ok(result) => {
                let freeze = matches!(result, OutcomeResult::Fired { freeze: true, .. });
                if freeze {
                    tracing::info!("Keeping avatar locked for '{}' scene change", eng.id);
                } else {
                    host.set_avatar_locked(false);
                }
                Some(result)
            }
            Err(e) => {
                tracing::error!("Resolving '{}' failed: {}", eng.id, e);
                host.set_avatar_locked(false);
                None
            }
        }
    }

    fn force_complete(&mut self, mut eng: Engagement, host: &mut dyn HostEngine) {
        host.stop_cue(&self.settings.confirm_cue);
        eng.state.fade.finish();
        eng.state.has_faded = true;
        self.dispatch(&mut eng, host);
        let alpha = eng.state.fade.alpha();
        host.set_alpha(&eng.visual.image, alpha);
        host.set_alpha(&eng.visual.border, alpha);
        self.release(&eng, host);
    }

    /// Hide everything the engagement showed
    fn release(&self, eng: &Engagement, host: &mut dyn HostEngine) {
        hints::clear(&self.hints, host);
        host.set_active(&self.hints.large_view, false);
        host.set_active(&eng.visual.border, false);
        host.set_active(&eng.visual.image, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, RecordingHost};
    use crate::inventory::SlotInventory;
    use crate::pose::PoseRecord;
    use viewfinder_common::{Vec3, ViewAngles};

    const DT: f32 = 1.0 / 30.0;

    fn record(position: Vec3, pitch: f32, yaw: f32, locked: bool) -> PoseRecord {
        PoseRecord {
            target: TargetPose {
                position,
                angles: ViewAngles::new(pitch, yaw),
            },
            rotation: None,
            roll: 0.0,
            locked,
            image_size: None,
            screen_size: None,
        }
    }

    fn coordinator() -> PuzzleCoordinator<SlotInventory> {
        let manifest = Manifest::parse(
            r#"
[waypoints]
dock = [50.0, 0.0, 50.0]

[[puzzles]]
id = "Sunset"
record = "sunset.txt"
outcome = { kind = "teleport", waypoint = "dock" }

[[puzzles]]
id = "Statue"
record = "statue.txt"
outcome = { kind = "reset" }

[[puzzles]]
id = "Map"
record = "map.txt"
outcome = { kind = "inventory_removal" }

[[puzzles]]
id = "Night"
record = "night.txt"
unlock_flag = "generator_on"
locked_message = "The lamp is dark."
outcome = { kind = "environment_mutation", flag = "is_night", scene = "HarborNight" }
"#,
        )
        .unwrap();

        let mut poses = PoseStore::new();
        poses.insert("Sunset".into(), record(Vec3::ZERO, 10.0, 20.0, false));
        poses.insert("Statue".into(), record(Vec3::new(5.0, 0.0, 0.0), 0.0, 90.0, false));
        poses.insert("Map".into(), record(Vec3::new(-5.0, 0.0, 0.0), 0.0, 0.0, false));
        poses.insert("Night".into(), record(Vec3::ZERO, 0.0, 0.0, true));
        // Has a pose but no outcome
        poses.insert("Unknown".into(), record(Vec3::ZERO, 0.0, 0.0, false));

        let mut inventory = SlotInventory::new("harbor", 4);
        inventory.add("Map");
        PuzzleCoordinator::from_manifest(&manifest, poses, inventory).unwrap()
    }

    fn visual() -> VisualHandle {
        VisualHandle::new("Picture", "Border")
    }

    fn tick(c: &mut PuzzleCoordinator<SlotInventory>, host: &mut RecordingHost) {
        c.tick(&TickInput { dt: DT, ..TickInput::default() }, host);
    }

    fn confirm(c: &mut PuzzleCoordinator<SlotInventory>, host: &mut RecordingHost) {
        c.tick(
            &TickInput {
                dt: DT,
                confirm: true,
                ..TickInput::default()
            },
            host,
        );
    }

    fn run_until_idle_or_engaged(c: &mut PuzzleCoordinator<SlotInventory>, host: &mut RecordingHost) {
        for _ in 0..1000 {
            if c.phase() != Phase::Resolving {
                return;
            }
            tick(c, host);
        }
        panic!("resolution never finished");
    }

    #[test]
    fn test_engage_shows_picture_and_evaluates() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::new(0.3, 0.0, 0.1), ViewAngles::new(30.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        assert_eq!(c.phase(), Phase::Engaged);
        assert!(host.is_active("Picture"));
        assert!(host.is_active("Border"));
        assert_eq!(host.alpha_of("Picture"), Some(1.0));

        tick(&mut c, &mut host);
        let v = c.verdict().unwrap();
        assert!(!v.aligned);
        assert!(v.down);
        assert!(host.is_active("HintDown"));
        assert!(!host.is_active("HintUp"));
    }

    #[test]
    fn test_full_resolution_fires_once_and_returns_idle() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::new(0.3, 0.0, 0.1), ViewAngles::new(9.0, 19.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Resolving);
        assert!(host.avatar_locked);
        assert!(host.calls.contains(&HostCall::PlayCue {
            cue: "picture_confirm".to_string()
        }));
        assert!(!host.is_active("HintDown"));

        // Fade runs over several ticks, never increasing
        let mut prev = 1.0;
        let mut ticks = 0;
        while c.phase() == Phase::Resolving {
            tick(&mut c, &mut host);
            ticks += 1;
            if let Some(a) = c.alpha() {
                assert!(a <= prev);
                prev = a;
            }
            assert!(ticks < 1000);
        }
        assert!(ticks > 1);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(host.avatar_position, Some(Vec3::new(50.0, 0.0, 50.0)));
        assert!(!host.avatar_locked);
        assert!(!host.is_active("Picture"));
        assert!(!host.is_active("Border"));
        // Shared slot left opaque for the next puzzle
        assert_eq!(host.alpha_of("Picture"), Some(1.0));
        assert_eq!(host.alpha_of("Border"), Some(1.0));

        // Further ticks and confirms do nothing
        confirm(&mut c, &mut host);
        tick(&mut c, &mut host);
        assert_eq!(host.count(|call| matches!(call, HostCall::SetAvatarPosition { .. })), 1);
    }

    #[test]
    fn test_fade_reaches_zero_before_outcome() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(10.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        run_until_idle_or_engaged(&mut c, &mut host);

        let zero_at = host
            .calls
            .iter()
            .position(|call| matches!(call, HostCall::SetAlpha { element, alpha } if element == "Picture" && *alpha == 0.0))
            .expect("picture faded to zero");
        let teleport_at = host
            .calls
            .iter()
            .position(|call| matches!(call, HostCall::SetAvatarPosition { .. }))
            .unwrap();
        assert!(zero_at < teleport_at);
    }

    #[test]
    fn test_confirm_ignored_when_unaligned() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::new(3.0, 0.0, 0.0), ViewAngles::new(10.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Engaged);
        assert!(!host.avatar_locked);
    }

    #[test]
    fn test_reset_outcome_returns_to_engaged() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::new(5.0, 0.0, 0.0), ViewAngles::new(0.0, 90.0));
        c.engage("Statue".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        run_until_idle_or_engaged(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Engaged);
        assert_eq!(c.alpha(), Some(1.0));
        assert!(!c.has_faded());
        assert!(!host.avatar_locked);
        assert_eq!(host.alpha_of("Picture"), Some(1.0));

        // Can be solved again, with a fresh token
        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Resolving);
        run_until_idle_or_engaged(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Engaged);
    }

    #[test]
    fn test_inventory_removal_outcome() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::new(-5.0, 0.0, 0.0), ViewAngles::new(0.0, 0.0));
        assert!(c.inventory().contains("Map"));
        c.engage("Map".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        run_until_idle_or_engaged(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Idle);
        assert!(!c.inventory().contains("Map"));
    }

    #[test]
    fn test_locked_puzzle_refuses_until_flag_set() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(0.0, 0.0));
        c.engage("Night".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        // Alignment is still evaluated
        assert!(c.verdict().unwrap().aligned);
        assert_eq!(c.phase(), Phase::Engaged);
        assert!(host.calls.contains(&HostCall::ShowMessage {
            text: "The lamp is dark.".to_string()
        }));

        host.toggle_global_flag("generator_on");
        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Resolving);
        run_until_idle_or_engaged(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Idle);
        assert!(host.global_flag("is_night"));
        // Scene change keeps the avatar frozen
        assert!(host.avatar_locked);
    }

    #[test]
    fn test_explicit_unlock() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(0.0, 0.0));
        c.unlock("Night".into());
        c.engage("Night".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Resolving);
    }

    #[test]
    fn test_unmatched_identifier_goes_idle_without_fading() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(0.0, 0.0));
        c.engage("Unknown".into(), visual(), &mut host).unwrap();
        tick(&mut c, &mut host);
        host.clear_calls();

        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(host.alpha_of("Picture"), Some(1.0));

        let active = |element: &str, active: bool| HostCall::SetActive {
            element: element.to_string(),
            active,
        };
        // The tick's hint refresh, then the elements are hidden on the way
        // to Idle. Nothing else: no alpha, cue, avatar lock or outcome.
        assert_eq!(
            host.calls,
            vec![
                active("HintUp", false),
                active("HintDown", false),
                active("HintLeft", false),
                active("HintRight", false),
                active("Border", true),
                active("HintUp", false),
                active("HintDown", false),
                active("HintLeft", false),
                active("HintRight", false),
                active("LargeView", false),
                active("Border", false),
                active("Picture", false),
            ]
        );
    }

    #[test]
    fn test_engage_unknown_pose_is_error() {
        let mut c = coordinator();
        let mut host = RecordingHost::new();
        let err = c.engage("Nope".into(), visual(), &mut host).unwrap_err();
        assert!(matches!(err, AlignError::PoseNotLoaded(_)));
        assert_eq!(c.phase(), Phase::Idle);
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_missing_visual_is_error() {
        let mut c = coordinator();
        let mut host = RecordingHost::new();
        let err = c
            .engage("Sunset".into(), VisualHandle::new("Picture", ""), &mut host)
            .unwrap_err();
        assert!(matches!(err, AlignError::MissingVisual(_)));
    }

    #[test]
    fn test_missing_pose_source_is_a_noop_tick() {
        let mut c = coordinator();
        let mut host = RecordingHost::new();
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        host.clear_calls();
        confirm(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Engaged);
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_engage_while_resolving_completes_previous() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::new(-5.0, 0.0, 0.0), ViewAngles::new(0.0, 0.0));

        // A: Map (inventory removal), interrupted mid-fade
        c.engage("Map".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        tick(&mut c, &mut host);
        assert_eq!(c.phase(), Phase::Resolving);
        assert!(c.alpha().unwrap() < 1.0);

        // B: Sunset (teleport)
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        assert_eq!(c.engaged_id().map(PuzzleId::as_str), Some("Sunset"));
        assert_eq!(c.phase(), Phase::Engaged);
        assert_eq!(c.alpha(), Some(1.0));
        assert_eq!(host.alpha_of("Picture"), Some(1.0));
        // A's outcome fired for A
        assert!(!c.inventory().contains("Map"));
        assert_eq!(host.avatar_position, None);
        assert!(!host.avatar_locked);

        // B resolves with its own outcome
        host.set_pose(Vec3::ZERO, ViewAngles::new(10.0, 20.0));
        confirm(&mut c, &mut host);
        run_until_idle_or_engaged(&mut c, &mut host);
        assert_eq!(host.avatar_position, Some(Vec3::new(50.0, 0.0, 50.0)));
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_switching_puzzles_resets_hints() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(30.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        tick(&mut c, &mut host);
        assert!(host.is_active("HintDown"));

        c.engage("Statue".into(), visual(), &mut host).unwrap();
        assert!(!host.is_active("HintDown"));
        assert_eq!(c.verdict(), Some(Verdict::default()));
    }

    #[test]
    fn test_large_view_toggle_and_close_on_confirm() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(10.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        let toggle = TickInput {
            dt: DT,
            toggle_large_view: true,
            ..TickInput::default()
        };
        c.tick(&toggle, &mut host);
        assert!(c.large_view_open());
        assert!(host.is_active("LargeView"));
        c.tick(&toggle, &mut host);
        assert!(!c.large_view_open());
        c.tick(&toggle, &mut host);

        confirm(&mut c, &mut host);
        assert!(!c.large_view_open());
        assert!(!host.is_active("LargeView"));
    }

    #[test]
    fn test_disengage_hides_everything() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(30.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        tick(&mut c, &mut host);
        c.disengage(&mut host);
        assert_eq!(c.phase(), Phase::Idle);
        for element in ["Picture", "Border", "HintUp", "HintDown", "HintLeft", "HintRight", "LargeView"] {
            assert!(!host.is_active(element), "{element} still visible");
        }
        // Idle tick is a no-op
        host.clear_calls();
        tick(&mut c, &mut host);
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_disengage_mid_resolution_fires_outcome() {
        let mut c = coordinator();
        let mut host = RecordingHost::with_pose(Vec3::ZERO, ViewAngles::new(10.0, 20.0));
        c.engage("Sunset".into(), visual(), &mut host).unwrap();
        confirm(&mut c, &mut host);
        c.disengage(&mut host);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(host.count(|call| matches!(call, HostCall::SetAvatarPosition { .. })), 1);
        assert_eq!(
            host.count(|call| matches!(call, HostCall::StopCue { cue } if cue == "picture_confirm")),
            1
        );
    }

    #[test]
    fn test_invalid_fade_rate_rejected() {
        let settings = AlignSettings {
            fade_rate: 0.0,
            ..AlignSettings::default()
        };
        let result = PuzzleCoordinator::new(
            settings,
            HintElements::default(),
            PoseStore::new(),
            OutcomeDispatcher::new(),
            Inventories::new(),
        );
        assert!(matches!(result, Err(AlignError::InvalidFadeRate(_))));
    }
}
