//! The narrow call surface between the alignment engine and the host engine.
//!
//! Rendering, audio, physics and scene loading all live on the other side of
//! [`HostEngine`]. [`RecordingHost`] is a headless implementation that keeps
//! the last value written to every element and a log of every call; the
//! replay tool and the tests drive the engine through it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use viewfinder_common::{Vec3, ViewAngles};

/// Avatar position plus camera pitch/yaw for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvatarPose {
    pub position: Vec3,
    pub angles: ViewAngles,
}

/// Host engine operations the engine relies on
pub trait HostEngine {
    /// Current avatar pose, None when the avatar/camera is unavailable
    fn avatar_pose(&self) -> Option<AvatarPose>;

    /// Set the alpha of a UI element (picture, border)
    fn set_alpha(&mut self, element: &str, alpha: f32);

    /// Show or hide a UI element
    fn set_active(&mut self, element: &str, active: bool);

    fn play_cue(&mut self, cue: &str);

    fn stop_cue(&mut self, cue: &str);

    /// Freeze or release avatar movement and camera look
    fn set_avatar_locked(&mut self, locked: bool);

    fn set_avatar_position(&mut self, position: Vec3);

    fn load_scene(&mut self, scene: &str);

    fn spawn_object(&mut self, object: &str);

    /// Flip a process-wide flag, returning the new value
    fn toggle_global_flag(&mut self, flag: &str) -> bool;

    fn global_flag(&self, flag: &str) -> bool;

    /// Tell the display coordinator to switch sub-mode
    fn switch_display_mode(&mut self, mode: &str);

    /// Blocking explanation routed to the dialogue box
    fn show_message(&mut self, text: &str);
}

/// One recorded host call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    SetAlpha { element: String, alpha: f32 },
    SetActive { element: String, active: bool },
    PlayCue { cue: String },
    StopCue { cue: String },
    SetAvatarLocked { locked: bool },
    SetAvatarPosition { position: [f32; 3] },
    LoadScene { scene: String },
    SpawnObject { object: String },
    ToggleGlobalFlag { flag: String, value: bool },
    SwitchDisplayMode { mode: String },
    ShowMessage { text: String },
}

/// Headless host that remembers what it was told
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub pose: Option<AvatarPose>,
    pub calls: Vec<HostCall>,
    pub alpha: BTreeMap<String, f32>,
    pub active: BTreeMap<String, bool>,
    pub flags: BTreeSet<String>,
    pub avatar_locked: bool,
    pub avatar_position: Option<Vec3>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pose(position: Vec3, angles: ViewAngles) -> Self {
        Self {
            pose: Some(AvatarPose { position, angles }),
            ..Self::default()
        }
    }

    pub fn set_pose(&mut self, position: Vec3, angles: ViewAngles) {
        self.pose = Some(AvatarPose { position, angles });
    }

    pub fn is_active(&self, element: &str) -> bool {
        self.active.get(element).copied().unwrap_or(false)
    }

    pub fn alpha_of(&self, element: &str) -> Option<f32> {
        self.alpha.get(element).copied()
    }

    /// Number of recorded calls matching `pred`
    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Drop the call log, keeping element state
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl HostEngine for RecordingHost {
    fn avatar_pose(&self) -> Option<AvatarPose> {
        self.pose
    }

    fn set_alpha(&mut self, element: &str, alpha: f32) {
        self.alpha.insert(element.to_string(), alpha);
        self.calls.push(HostCall::SetAlpha {
            element: element.to_string(),
            alpha,
        });
    }

    fn set_active(&mut self, element: &str, active: bool) {
        self.active.insert(element.to_string(), active);
        self.calls.push(HostCall::SetActive {
            element: element.to_string(),
            active,
        });
    }

    fn play_cue(&mut self, cue: &str) {
        tracing::debug!("host: play cue {}", cue);
        self.calls.push(HostCall::PlayCue { cue: cue.to_string() });
    }

    fn stop_cue(&mut self, cue: &str) {
        tracing::debug!("host: stop cue {}", cue);
        self.calls.push(HostCall::StopCue { cue: cue.to_string() });
    }

    fn set_avatar_locked(&mut self, locked: bool) {
        tracing::debug!("host: avatar {}", if locked { "locked" } else { "released" });
        self.avatar_locked = locked;
        self.calls.push(HostCall::SetAvatarLocked { locked });
    }

    fn set_avatar_position(&mut self, position: Vec3) {
        tracing::info!("host: avatar moved to {}", position);
        self.avatar_position = Some(position);
        if let Some(pose) = self.pose.as_mut() {
            pose.position = position;
        }
        self.calls.push(HostCall::SetAvatarPosition {
            position: position.into(),
        });
    }

    fn load_scene(&mut self, scene: &str) {
        tracing::info!("host: load scene {}", scene);
        self.calls.push(HostCall::LoadScene {
            scene: scene.to_string(),
        });
    }

    fn spawn_object(&mut self, object: &str) {
        tracing::info!("host: spawn {}", object);
        self.calls.push(HostCall::SpawnObject {
            object: object.to_string(),
        });
    }

    fn toggle_global_flag(&mut self, flag: &str) -> bool {
        let value = if self.flags.remove(flag) {
            false
        } else {
            self.flags.insert(flag.to_string());
            true
        };
        tracing::info!("host: flag {} = {}", flag, value);
        self.calls.push(HostCall::ToggleGlobalFlag {
            flag: flag.to_string(),
            value,
        });
        value
    }

    fn global_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    fn switch_display_mode(&mut self, mode: &str) {
        tracing::info!("host: display mode {}", mode);
        self.calls.push(HostCall::SwitchDisplayMode {
            mode: mode.to_string(),
        });
    }

    fn show_message(&mut self, text: &str) {
        tracing::info!("host: message \"{}\"", text);
        self.calls.push(HostCall::ShowMessage {
            text: text.to_string(),
        });
    }
}
