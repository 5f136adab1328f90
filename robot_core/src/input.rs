// Pointer and button routing.
// Each raw event either writes a scene field directly (hold, scale, gaze) or yields an `Intent`
// for the coordinator to run through the state machine.

use std::str::FromStr;

use serde::Serialize;

use crate::error::RobotError;
use crate::scene::SceneState;
use crate::tween::distance;
use crate::types::*;

/// Click radius around the actor, per unit of scale.
pub const HIT_RADIUS: f32 = 100.0;
/// Look-at radius around the actor, per unit of scale.
const GAZE_RADIUS: f32 = 150.0;
/// Pointer has to travel this far on either axis before the head follows it again.
const GAZE_MOVE_THRESHOLD: f32 = 5.0;
const REACTION_MS: f64 = 300.0;
const SCALE_STEP: f32 = 0.1;

/// A button on the control panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Idle,
    Talk,
    Dance,
    Search,
    /// Roll to a random spot.
    Roll,
    ExitRight,
    ComeBack,
    Center,
    ScaleUp,
    ScaleDown,
    ResetScale,
    SetScale(f32),
    Speak(String),
}

impl FromStr for Command {
    type Err = RobotError;

    /// Button names as the page uses them. `SetScale`/`Speak` carry payloads and have
    /// their own entry points.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Command::Idle),
            "talk" => Ok(Command::Talk),
            "dance" => Ok(Command::Dance),
            "search" => Ok(Command::Search),
            "roll" => Ok(Command::Roll),
            "exitRight" => Ok(Command::ExitRight),
            "comeBack" => Ok(Command::ComeBack),
            "center" => Ok(Command::Center),
            "scaleUp" => Ok(Command::ScaleUp),
            "scaleDown" => Ok(Command::ScaleDown),
            "resetScale" => Ok(Command::ResetScale),
            other => Err(RobotError::UnknownCommand(other.to_string())),
        }
    }
}

/// What the coordinator must do after routing an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Transition(RobotState),
    MoveTo(Point),
    RollSomewhere,
    Speak(String),
}

/// Which control-panel affordances are enabled. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub idle: bool,
    pub talk: bool,
    pub dance: bool,
    pub roll: bool,
    pub search: bool,
    pub center: bool,
    pub exit_right: bool,
    pub come_back: bool,
}

impl Controls {
    pub fn for_scene(scene: &SceneState) -> Self {
        let exited = is_exited(scene);
        Controls {
            idle: !exited,
            talk: !exited,
            dance: !exited,
            roll: !exited,
            search: !exited,
            center: !exited,
            exit_right: !exited && scene.current_state != RobotState::ExitRight,
            come_back: exited,
        }
    }
}

fn is_exited(scene: &SceneState) -> bool {
    scene.has_exited || scene.current_state == RobotState::Exited
}

/// Routes pointer, button and resize events.
pub struct InputRouter {
    hold_threshold_ms: f64,
    default_scale: f32,
    last_gaze_sample: Option<Point>,
}

impl InputRouter {
    pub fn new(settings: &AnimationSettings) -> Self {
        InputRouter {
            hold_threshold_ms: settings.hold_threshold_ms,
            default_scale: settings.default_scale,
            last_gaze_sample: None,
        }
    }

    /// Start of a press. Click-vs-hold is decided on release and by the spin timer.
    pub fn pointer_down(&mut self, scene: &mut SceneState, _at: Point, now: Timestamp) {
        if is_exited(scene) {
            return;
        }
        scene.spin.pointer_held = true;
        scene.spin.hold_started_at = now;
    }

    /// End of a press. A short click away from the actor rolls there; on the actor it
    /// triggers the head-bob reaction.
    pub fn pointer_up(
        &mut self,
        scene: &mut SceneState,
        at: Point,
        now: Timestamp,
    ) -> Option<Intent> {
        let was_held = scene.spin.pointer_held;
        scene.spin.pointer_held = false;
        if !was_held || is_exited(scene) || !at.is_finite() {
            return None;
        }

        let held = now.millis_since(scene.spin.hold_started_at);
        if held >= self.hold_threshold_ms || scene.spin.spinning {
            return None;
        }

        if distance(at, scene.position) >= HIT_RADIUS * scene.scale() {
            Some(Intent::MoveTo(at))
        } else {
            scene.reaction_until = Some(now.plus_millis(REACTION_MS));
            None
        }
    }

    /// Pointer hover. Near the actor, the head turns toward it for a while.
    pub fn pointer_move(&mut self, scene: &mut SceneState, at: Point, now: Timestamp) {
        if is_exited(scene) || !at.is_finite() {
            return;
        }
        let moved = self.last_gaze_sample.map_or(true, |last| {
            (at.x - last.x).abs() > GAZE_MOVE_THRESHOLD
                || (at.y - last.y).abs() > GAZE_MOVE_THRESHOLD
        });
        if !moved {
            return;
        }
        self.last_gaze_sample = Some(at);

        if distance(at, scene.position) < GAZE_RADIUS * scene.scale() {
            let angle = (at.y - scene.position.y).atan2(at.x - scene.position.x);
            scene.pending_gaze = Some(angle);
            scene.gaze_until = Some(now.plus_millis(crate::animator::GAZE_MS));
        }
    }

    /// A control-panel button. Everything but `ComeBack` is dead while exited, and
    /// `ComeBack` is dead otherwise.
    pub fn command(&self, scene: &mut SceneState, command: Command) -> Option<Intent> {
        let exited = is_exited(scene);
        if exited != (command == Command::ComeBack) {
            log::debug!("control {:?} disabled (exited: {})", command, exited);
            return None;
        }

        match command {
            Command::Idle => Some(Intent::Transition(RobotState::Idle)),
            Command::Talk => Some(Intent::Transition(RobotState::Talk)),
            Command::Dance => Some(Intent::Transition(RobotState::Dance)),
            Command::Search => Some(Intent::Transition(RobotState::Search)),
            Command::Roll => Some(Intent::RollSomewhere),
            Command::ExitRight => Controls::for_scene(scene)
                .exit_right
                .then_some(Intent::Transition(RobotState::ExitRight)),
            Command::ComeBack => Some(Intent::Transition(RobotState::ComeBack)),
            Command::Center => {
                scene.return_to_center = true;
                if scene.current_state == RobotState::Dance {
                    scene.effects.dance_anchor = scene.center;
                }
                None
            }
            Command::ScaleUp => {
                scene.set_target_scale(scene.target_scale() + SCALE_STEP);
                None
            }
            Command::ScaleDown => {
                scene.set_target_scale(scene.target_scale() - SCALE_STEP);
                None
            }
            Command::ResetScale => {
                scene.set_target_scale(self.default_scale);
                None
            }
            Command::SetScale(value) => {
                scene.set_target_scale(value);
                None
            }
            Command::Speak(text) => Some(Intent::Speak(text)),
        }
    }

    /// Canvas resize. Only the reference center moves.
    pub fn resize(&self, scene: &mut SceneState, width: f32, height: f32) {
        scene.resize(Viewport::new(width, height));
    }
}
