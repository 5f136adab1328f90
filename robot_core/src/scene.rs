// The single mutable snapshot of the actor. Owned by `Robot`, borrowed by everything else.
// Setters clamp; nothing outside this module writes a bounded field directly.

use serde::Serialize;

use crate::types::*;

pub const MIN_SCALE: f32 = 0.01;
pub const MAX_SCALE: f32 = 1.5;
pub const DEFAULT_SCALE: f32 = 0.5;

/// Press-and-hold spin. Runs independently of `current_state`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct SpinState {
    pub pointer_held: bool,
    pub hold_started_at: Timestamp,
    pub spinning: bool,
    pub speed: f32,
    pub rotation: f32,
}

impl SpinState {
    /// Spin still contributes to the drawn rotation (including while winding down).
    pub fn is_active(&self) -> bool {
        self.spinning || self.speed > 0.0
    }
}

/// Inner phase machine, meaningful only while `current_state == ComeBack`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct ComebackProgress {
    pub phase: ComebackPhase,
    pub phase_started_at: Timestamp,
}

/// Per-state effect parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Effects {
    pub talk_pulse: f32,
    pub thinking_pulse: f32,
    pub responding_glow: f32,
    /// Scale pulse for the power-move and windmill dance phases.
    pub dance_pulse: f32,
    pub dance_phase: f32,
    /// Which of the six choreography moves is playing.
    pub dance_move: u8,
    /// Position the dance oscillates around, fixed at entry.
    pub dance_anchor: Point,
    pub search_angle: f32,
    pub blinking: bool,
    pub next_blink_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneState {
    pub viewport: Viewport,
    /// Canvas center, recomputed on resize.
    pub center: Point,

    pub position: Point,
    pub target_position: Point,
    scale: f32,
    target_scale: f32,

    pub rotation_body: f32,
    pub rotation_head: f32,
    pub rotation_arm_left: f32,
    pub rotation_arm_right: f32,
    pub head_bob: f32,

    view: View,
    target_view: View,
    view_transition_progress: f32,
    view_transition_started_at: Timestamp,

    pub legs_visible: bool,
    legs_opacity: f32,

    pub current_state: RobotState,
    pub previous_state: RobotState,
    pub state_entered_at: Timestamp,
    pub has_exited: bool,

    /// Shared roll movement toward `target_position` is running.
    pub moving: bool,
    pub roll_speed: f32,
    /// Latched on the first exit-right tick.
    pub exiting: bool,
    pub return_to_center: bool,

    pub spin: SpinState,
    pub comeback: ComebackProgress,
    pub effects: Effects,

    /// Quick-click head-bob pulse is drawn until this deadline.
    pub reaction_until: Option<Timestamp>,
    /// Pointer angle to look toward on the next tick.
    pub pending_gaze: Option<f32>,
    pub gaze_until: Option<Timestamp>,
}

impl SceneState {
    /// Actor centered, idle, front view, default scale.
    pub fn new(viewport: Viewport, default_scale: f32, now: Timestamp) -> Self {
        let center = viewport.center();
        let scale = default_scale.clamp(MIN_SCALE, MAX_SCALE);
        SceneState {
            viewport,
            center,
            position: center,
            target_position: center,
            scale,
            target_scale: scale,
            rotation_body: 0.0,
            rotation_head: 0.0,
            rotation_arm_left: 0.0,
            rotation_arm_right: 0.0,
            head_bob: 0.0,
            view: View::Front,
            target_view: View::Front,
            view_transition_progress: 0.0,
            view_transition_started_at: now,
            legs_visible: true,
            legs_opacity: 1.0,
            current_state: RobotState::Idle,
            previous_state: RobotState::Idle,
            state_entered_at: now,
            has_exited: false,
            moving: false,
            roll_speed: 0.0,
            exiting: false,
            return_to_center: false,
            spin: SpinState::default(),
            comeback: ComebackProgress::default(),
            effects: Effects::default(),
            reaction_until: None,
            pending_gaze: None,
            gaze_until: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    pub fn set_target_scale(&mut self, value: f32) {
        self.target_scale = clamp_scale(value);
    }

    /// Write both current and target scale, for timed ramps that bypass damping.
    pub fn set_scale_now(&mut self, value: f32) {
        self.scale = clamp_scale(value);
        self.target_scale = self.scale;
    }

    /// One damped step of `scale` toward `target_scale`.
    pub(crate) fn step_scale(&mut self, factor: f32) {
        if crate::tween::approach(self.scale, self.target_scale, 0.01) {
            self.scale = self.target_scale;
        } else {
            self.scale = clamp_scale(crate::tween::lerp(self.scale, self.target_scale, factor));
        }
    }

    pub fn legs_opacity(&self) -> f32 {
        self.legs_opacity
    }

    pub fn set_legs_opacity(&mut self, value: f32) {
        self.legs_opacity = value.clamp(0.0, 1.0);
    }

    pub fn hide_legs(&mut self) {
        self.legs_visible = false;
        self.set_legs_opacity(self.legs_opacity - 0.1);
    }

    pub fn show_legs(&mut self) {
        self.legs_visible = true;
        self.set_legs_opacity(self.legs_opacity + 0.05);
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn target_view(&self) -> View {
        self.target_view
    }

    pub fn view_transition_progress(&self) -> f32 {
        self.view_transition_progress
    }

    /// When the current cross-fade was aimed. A re-aim starts a new fade.
    pub fn view_transition_started_at(&self) -> Timestamp {
        self.view_transition_started_at
    }

    /// A cross-fade from `view` to `target_view` is under way.
    pub fn is_cross_fading(&self) -> bool {
        self.view != self.target_view && self.view_transition_progress > 0.0
    }

    /// Aim the cross-fade at `view`. Re-aiming at the current target is a no-op, so
    /// per-tick callers don't restart the fade.
    pub fn set_target_view(&mut self, view: View, now: Timestamp) {
        if view == self.target_view {
            return;
        }
        self.target_view = view;
        self.view_transition_progress = 0.0;
        self.view_transition_started_at = now;
    }

    /// Advance the cross-fade. Progress only grows; at 1 the view snaps and progress resets.
    pub(crate) fn step_view_transition(&mut self, now: Timestamp, duration_ms: f64) {
        if self.view == self.target_view {
            self.view_transition_progress = 0.0;
            return;
        }
        let elapsed = now.millis_since(self.view_transition_started_at);
        let progress = if duration_ms > 0.0 {
            (elapsed / duration_ms).min(1.0) as f32
        } else {
            1.0
        };
        self.view_transition_progress = progress.max(self.view_transition_progress);
        if self.view_transition_progress >= 1.0 {
            self.view = self.target_view;
            self.view_transition_progress = 0.0;
        }
    }

    /// Viewport change. Moves the reference center, never the actor.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.center = viewport.center();
    }

    pub fn is_reacting(&self, now: Timestamp) -> bool {
        self.reaction_until.is_some_and(|until| now < until)
    }
}

fn clamp_scale(value: f32) -> f32 {
    if value.is_nan() {
        return DEFAULT_SCALE;
    }
    value.clamp(MIN_SCALE, MAX_SCALE)
}
