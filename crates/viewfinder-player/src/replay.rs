//! `viewfinder replay` — feed a recorded input trace through the coordinator.
//!
//! A trace is a JSON list of frames. Each frame may move the avatar, select
//! or put away a picture, press confirm, toggle the large view or set a
//! global flag, and can be repeated to cover several ticks:
//!
//! ```json
//! { "frames": [
//!   { "select": "Sunset", "position": [0.3, 0, 0.1], "angles": [9, 19] },
//!   { "confirm": true },
//!   { "repeat": 90 }
//! ] }
//! ```
//!
//! Edge-triggered inputs (select, deselect, confirm, toggle) only fire on the
//! first tick of a repeated frame.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use viewfinder_align::{
    HostCall, Inventories, InventoryProvider, Phase, PoseStore, PuzzleCoordinator, PuzzleId,
    RecordingHost, TickInput, VisualHandle,
};
use viewfinder_common::{Manifest, Vec3, ViewAngles};

fn default_dt() -> f32 {
    1.0 / 30.0
}

fn default_repeat() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default)]
    pub position: Option<Vec3>,
    /// `[pitch, yaw]` in degrees
    #[serde(default)]
    pub angles: Option<[f32; 2]>,
    /// Simulate the avatar/camera being unavailable
    #[serde(default)]
    pub pose_lost: bool,
    /// Pick a picture in the inventory UI
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub deselect: bool,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub toggle_large_view: bool,
    #[serde(default)]
    pub set_flag: Option<String>,
    #[serde(default)]
    pub unlock: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub ticks: u64,
    pub final_phase: Phase,
    pub engaged: Option<String>,
    pub avatar_position: Option<[f32; 3]>,
    pub avatar_locked: bool,
    pub flags: Vec<String>,
    pub calls: Vec<HostCall>,
}

pub struct Replay<'m> {
    manifest: &'m Manifest,
    coordinator: PuzzleCoordinator<Inventories>,
    host: RecordingHost,
    ticks: u64,
}

impl<'m> Replay<'m> {
    pub fn new(manifest: &'m Manifest, coordinator: PuzzleCoordinator<Inventories>) -> Self {
        Self {
            manifest,
            coordinator,
            host: RecordingHost::new(),
            ticks: 0,
        }
    }

    pub fn run(&mut self, trace: &Trace) {
        for frame in &trace.frames {
            for i in 0..frame.repeat.max(1) {
                self.apply(frame, i == 0);
            }
        }
    }

    fn apply(&mut self, frame: &Frame, first: bool) {
        if frame.pose_lost {
            self.host.pose = None;
        } else if frame.position.is_some() || frame.angles.is_some() {
            let current = self.host.pose.unwrap_or_default();
            let position = frame.position.unwrap_or(current.position);
            let angles = frame
                .angles
                .map(|[pitch, yaw]| ViewAngles::new(pitch, yaw))
                .unwrap_or(current.angles);
            self.host.set_pose(position, angles);
        }

        if first {
            if let Some(flag) = &frame.set_flag {
                self.host.flags.insert(flag.clone());
            }
            if let Some(id) = &frame.unlock {
                self.coordinator.unlock(PuzzleId::new(id.as_str()));
            }
            if frame.deselect {
                self.coordinator.disengage(&mut self.host);
            }
            if let Some(item) = &frame.select {
                self.select(item);
            }
        }

        let input = TickInput {
            dt: frame.dt,
            confirm: first && frame.confirm,
            toggle_large_view: first && frame.toggle_large_view,
        };
        self.coordinator.tick(&input, &mut self.host);
        self.ticks += 1;
    }

    fn select(&mut self, item: &str) {
        let Some(holder) = self.coordinator.inventory().holder(item) else {
            tracing::warn!("'{}' is not in any inventory, selection ignored", item);
            return;
        };
        tracing::debug!("Selecting '{}' from inventory '{}'", item, holder);
        let Some(entry) = self.manifest.puzzle(item) else {
            tracing::error!("'{}' has no puzzle entry", item);
            return;
        };
        let visual = VisualHandle::new(&entry.image, &entry.border);
        if let Err(e) = self.coordinator.engage(PuzzleId::new(item), visual, &mut self.host) {
            tracing::error!("Selecting '{}' failed: {}", item, e);
        }
    }

    pub fn report(self) -> ReplayReport {
        ReplayReport {
            ticks: self.ticks,
            final_phase: self.coordinator.phase(),
            engaged: self.coordinator.engaged_id().map(|id| id.to_string()),
            avatar_position: self.host.avatar_position.map(Into::into),
            avatar_locked: self.host.avatar_locked,
            flags: self.host.flags.iter().cloned().collect(),
            calls: self.host.calls,
        }
    }
}

pub fn run(manifest_path: &Path, trace_path: &Path, report_path: Option<&Path>) -> Result<()> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;

    // Broken records only drop their own puzzle
    let (poses, failures) = PoseStore::load_manifest(&manifest);
    for failure in &failures {
        tracing::warn!("{}", failure);
    }

    let inventories = Inventories::from_specs(&manifest.inventories);
    let coordinator = PuzzleCoordinator::from_manifest(&manifest, poses, inventories)
        .context("building puzzle coordinator")?;

    let text = std::fs::read_to_string(trace_path)
        .with_context(|| format!("reading trace {}", trace_path.display()))?;
    let trace: Trace = serde_json::from_str(&text)
        .with_context(|| format!("parsing trace {}", trace_path.display()))?;

    let mut replay = Replay::new(&manifest, coordinator);
    replay.run(&trace);
    let report = replay.report();

    tracing::info!(
        "Replayed {} ticks, final phase {:?}, {} host calls",
        report.ticks,
        report.final_phase,
        report.calls.len()
    );

    match report_path {
        Some(path) => {
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(path, json)
                .with_context(|| format!("writing report {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => {
            println!("ticks:        {}", report.ticks);
            println!("final phase:  {:?}", report.final_phase);
            if let Some(id) = &report.engaged {
                println!("engaged:      {}", id);
            }
            if let Some(p) = report.avatar_position {
                println!("avatar:       {}", Vec3::from(p));
            }
            println!("flags:        {}", report.flags.join(", "));
            println!("host calls:   {}", report.calls.len());
        }
    }
    Ok(())
}
