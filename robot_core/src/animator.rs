// Behavioral state machine. One entry reset and one per-tick update per `RobotState`.
// Timers are deadlines on the scene, checked here once per frame; nothing fires between ticks.

use std::f64::consts::PI;
use std::f32::consts::TAU;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::scene::{ComebackProgress, SceneState};
use crate::speech::SpeechOverlay;
use crate::tween::{distance, lerp, lerp_point, mix};
use crate::types::*;

/// Roll stops (and snaps) once this close to the target.
pub const ARRIVAL_DISTANCE: f32 = 5.0;
const ROLL_SPEED_FACTOR: f32 = 0.05;
const WHEEL_FACTOR: f32 = 0.2;
const SCALE_DAMPING: f32 = 0.1;
const CENTER_DAMPING: f32 = 0.05;
const CENTER_SNAP: f32 = 2.0;
const SPIN_UP: f32 = 0.005;
const SPIN_DOWN: f32 = 0.01;

const BLINK_MS: f64 = 200.0;
const BLINK_GAP_MIN_MS: f64 = 2000.0;
const BLINK_GAP_MAX_MS: f64 = 5000.0;
const DANCE_STEP: f32 = 0.08;
pub const DANCE_PHASE_MS: f64 = 1500.0;
const DANCE_MOVES: f64 = 6.0;
const SEARCH_STEP: f32 = 0.03;
const SEARCH_CYCLE_MS: f64 = 3000.0;

/// Exit completes once the actor is this far past the right edge.
pub const EXIT_MARGIN: f32 = 100.0;
/// Where an exited actor is parked, past the right edge.
const PARKED_MARGIN: f32 = 200.0;

pub const COMEBACK_SCALE: f32 = 1.5;
pub const COMEBACK_FLOOR_SCALE: f32 = 0.02;
const COMEBACK_LARGE_MS: f64 = 3000.0;
const COMEBACK_SHRINK_MS: f64 = 2000.0;
const COMEBACK_SPEECH_MS: f64 = 4000.0;
pub const COMEBACK_MESSAGE: &str = "you made me feel really small";

/// Pointer look-at lingers this long after the last qualifying move (ms).
pub const GAZE_MS: f64 = 1000.0;

/// Sinusoid over wall-clock milliseconds.
fn wave(t: f64, freq: f64, phase: f64) -> f32 {
    (t * freq + phase).sin() as f32
}

/// Drives `SceneState` through the behavioral states.
pub struct Animator {
    settings: AnimationSettings,
    rng: SmallRng,
}

impl Animator {
    pub fn new(settings: AnimationSettings, seed: u64) -> Self {
        Animator {
            settings,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// Whether an external request for `requested` would be honored right now.
    pub fn accepts(scene: &SceneState, requested: RobotState) -> bool {
        let exited = scene.has_exited || scene.current_state == RobotState::Exited;
        match requested {
            // Only the exit-right completion may enter it.
            RobotState::Exited => false,
            RobotState::ComeBack => exited,
            _ => !exited,
        }
    }

    /// External state request. Returns whether it was applied; refusals change nothing.
    pub fn request(
        &mut self,
        scene: &mut SceneState,
        speech: &mut SpeechOverlay,
        requested: RobotState,
        now: Timestamp,
    ) -> bool {
        if !Self::accepts(scene, requested) {
            log::debug!(
                "ignoring request for {} while {} (exited: {})",
                requested,
                scene.current_state,
                scene.has_exited
            );
            return false;
        }
        if requested == scene.current_state {
            // Re-requesting the running state must not reset it.
            return true;
        }
        self.enter(scene, speech, requested, now);
        true
    }

    /// Random point in the middle 60% of the viewport, for the roll button.
    pub fn random_roll_target(&mut self, viewport: Viewport) -> Point {
        Point::new(
            self.rng
                .random_range(viewport.width * 0.2..=viewport.width * 0.8),
            self.rng
                .random_range(viewport.height * 0.2..=viewport.height * 0.8),
        )
    }

    /// Transition protocol. Callers have already checked the gate.
    fn enter(
        &mut self,
        scene: &mut SceneState,
        speech: &mut SpeechOverlay,
        state: RobotState,
        now: Timestamp,
    ) {
        log::info!("robot state {} -> {}", scene.current_state, state);
        scene.previous_state = scene.current_state;
        scene.current_state = state;
        scene.state_entered_at = now;
        // An interrupted exit must not leave the latch set.
        scene.exiting = false;

        // ComeBack drives the bubble itself.
        if state != RobotState::ComeBack {
            speech.hide(now);
        }

        match state {
            RobotState::Idle => {
                if !scene.moving {
                    scene.set_target_view(View::Front, now);
                }
            }
            RobotState::Talk => {
                scene.set_target_view(View::Front, now);
                scene.effects.talk_pulse = 0.0;
            }
            RobotState::Dance => {
                scene.effects.dance_phase = 0.0;
                scene.effects.dance_move = 0;
                scene.effects.dance_anchor = scene.position;
            }
            RobotState::Search => {
                scene.effects.search_angle = 0.0;
            }
            RobotState::Roll => {
                scene.moving = true;
                scene.legs_visible = false;
            }
            RobotState::ExitRight => {
                scene.moving = false;
                scene.return_to_center = false;
            }
            RobotState::Thinking => {
                scene.set_target_view(View::Front, now);
                scene.effects.thinking_pulse = 0.0;
            }
            RobotState::Responding => {
                scene.set_target_view(View::Front, now);
                scene.effects.responding_glow = 0.0;
            }
            RobotState::Exited => {
                scene.has_exited = true;
                scene.moving = false;
            }
            RobotState::ComeBack => {
                speech.hide(now);
                scene.has_exited = false;
                scene.return_to_center = false;
                scene.position = Point::new(
                    scene.viewport.width + EXIT_MARGIN,
                    scene.position.y,
                );
                scene.target_position = scene.center;
                scene.moving = true;
                scene.set_target_scale(COMEBACK_SCALE);
                scene.comeback = ComebackProgress {
                    phase: ComebackPhase::Entering,
                    phase_started_at: now,
                };
            }
        }
    }

    /// Advance one frame.
    pub fn tick(&mut self, scene: &mut SceneState, speech: &mut SpeechOverlay, now: Timestamp) {
        scene.step_scale(SCALE_DAMPING);
        step_return_to_center(scene);
        self.step_spin(scene, now);

        if scene.moving && scene.current_state != RobotState::ComeBack {
            let arrived = self.step_roll(scene, now);
            if arrived && scene.current_state == RobotState::Roll {
                self.enter(scene, speech, RobotState::Idle, now);
            }
        } else if !scene.moving && scene.current_state != RobotState::Roll && !scene.legs_visible {
            scene.show_legs();
        }

        match scene.current_state {
            RobotState::Idle => self.update_idle(scene, now),
            RobotState::Talk => update_talk(scene, now),
            RobotState::Dance => update_dance(scene, now),
            RobotState::Search => update_search(scene, now),
            RobotState::Roll => update_roll(scene, now),
            RobotState::ExitRight => self.update_exit_right(scene, speech, now),
            RobotState::Exited => update_exited(scene),
            RobotState::Thinking => update_thinking(scene, now),
            RobotState::Responding => update_responding(scene, now),
            RobotState::ComeBack => self.update_come_back(scene, speech, now),
        }

        step_gaze(scene, now);
        if scene.reaction_until.is_some_and(|until| now >= until) {
            scene.reaction_until = None;
        }
        scene.step_view_transition(now, self.settings.view_transition_ms);
    }

    fn step_spin(&self, scene: &mut SceneState, now: Timestamp) {
        let spin = &mut scene.spin;
        if spin.pointer_held {
            let held = now.millis_since(spin.hold_started_at);
            if !spin.spinning && held >= self.settings.hold_threshold_ms {
                spin.spinning = true;
                spin.speed = 0.0;
            }
            if spin.spinning {
                spin.speed = (spin.speed + SPIN_UP).min(self.settings.max_spin_speed);
                spin.rotation += spin.speed;
            }
        } else if spin.spinning {
            spin.speed = (spin.speed - SPIN_DOWN).max(0.0);
            spin.rotation += spin.speed;
            if spin.speed <= 0.0 {
                spin.spinning = false;
                spin.rotation = 0.0;
            }
        }
    }

    /// Shared roll toward `target_position`. Returns true on arrival.
    fn step_roll(&self, scene: &mut SceneState, now: Timestamp) -> bool {
        let remaining = distance(scene.position, scene.target_position);
        if remaining < ARRIVAL_DISTANCE {
            scene.position = scene.target_position;
            scene.moving = false;
            scene.roll_speed = 0.0;
            return true;
        }

        let dx = scene.target_position.x - scene.position.x;
        let dy = scene.target_position.y - scene.position.y;
        let direction = dy.atan2(dx);
        let (sin, cos) = direction.sin_cos();
        let speed = (remaining * ROLL_SPEED_FACTOR).min(self.settings.roll_speed_cap);

        scene.roll_speed = speed;
        scene.position.x += cos * speed;
        scene.position.y += sin * speed;
        scene.rotation_body += speed * WHEEL_FACTOR;

        // Horizontal travel uses the side view in both directions.
        let view = if cos.abs() > sin.abs() {
            View::Side
        } else if sin > 0.0 {
            View::ThreeQuarter
        } else {
            View::Back
        };
        scene.set_target_view(view, now);
        scene.hide_legs();
        false
    }

    fn update_idle(&mut self, scene: &mut SceneState, now: Timestamp) {
        let t = now.as_millis();
        scene.head_bob = wave(t, 0.002, 0.0) * 5.0;
        scene.rotation_head = wave(t, 0.001, 0.0) * 0.1;
        scene.rotation_arm_left = wave(t, 0.001, 0.0) * 0.05;
        scene.rotation_arm_right = wave(t, 0.001, PI) * 0.05;

        let effects = &mut scene.effects;
        if now > effects.next_blink_at {
            if effects.blinking {
                effects.blinking = false;
                let gap = self.rng.random_range(BLINK_GAP_MIN_MS..=BLINK_GAP_MAX_MS);
                effects.next_blink_at = now.plus_millis(gap);
            } else {
                effects.blinking = true;
                effects.next_blink_at = now.plus_millis(BLINK_MS);
            }
        }

        if !scene.moving {
            scene.set_target_view(View::Front, now);
        }
        scene.show_legs();
    }

    fn update_exit_right(
        &mut self,
        scene: &mut SceneState,
        speech: &mut SpeechOverlay,
        now: Timestamp,
    ) {
        let t = now.as_millis();
        if !scene.exiting {
            scene.exiting = true;
            scene.target_position =
                Point::new(scene.viewport.width + PARKED_MARGIN, scene.position.y);
        }

        let speed = self.settings.exit_speed;
        scene.roll_speed = speed;
        scene.position.x += speed;
        scene.rotation_body += speed * WHEEL_FACTOR;
        scene.set_target_view(View::Side, now);
        scene.hide_legs();

        scene.head_bob = wave(t, 0.01, 0.0) * 3.0;
        scene.rotation_arm_left = wave(t, 0.01, 0.0) * 0.1;
        scene.rotation_arm_right = wave(t, 0.01, PI) * 0.1;

        if scene.position.x > scene.viewport.width + EXIT_MARGIN {
            scene.has_exited = true;
            scene.moving = false;
            self.enter(scene, speech, RobotState::Exited, now);
        }
    }

    fn update_come_back(
        &mut self,
        scene: &mut SceneState,
        speech: &mut SpeechOverlay,
        now: Timestamp,
    ) {
        let t = now.as_millis();
        let elapsed = now.millis_since(scene.comeback.phase_started_at);

        match scene.comeback.phase {
            ComebackPhase::Entering => {
                if self.step_roll(scene, now) {
                    advance_phase(scene, ComebackPhase::Large, now);
                } else {
                    scene.set_target_view(View::Side, now);
                }
                scene.head_bob = wave(t, 0.01, 0.0) * 3.0;
                scene.rotation_arm_left = wave(t, 0.01, 0.0) * 0.1;
                scene.rotation_arm_right = wave(t, 0.01, PI) * 0.1;
            }
            ComebackPhase::Large => {
                if elapsed > COMEBACK_LARGE_MS {
                    advance_phase(scene, ComebackPhase::Shrinking, now);
                }
                scene.set_target_view(View::Front, now);
                scene.show_legs();
                scene.head_bob = wave(t, 0.005, 0.0) * 5.0;
                scene.rotation_arm_left = wave(t, 0.003, 0.0) * 0.2;
                scene.rotation_arm_right = wave(t, 0.003, PI) * 0.2;
            }
            ComebackPhase::Shrinking => {
                let progress = (elapsed / COMEBACK_SHRINK_MS).min(1.0) as f32;
                scene.set_scale_now(mix(COMEBACK_SCALE, COMEBACK_FLOOR_SCALE, progress));
                if progress >= 1.0 {
                    advance_phase(scene, ComebackPhase::SpeechBubble, now);
                    speech.show(COMEBACK_MESSAGE, now);
                }
                scene.set_target_view(View::Front, now);
                scene.show_legs();
                scene.head_bob = wave(t, 0.008, 0.0) * 3.0;
                scene.rotation_arm_left = wave(t, 0.004, 0.0) * 0.15;
                scene.rotation_arm_right = wave(t, 0.004, PI) * 0.15;
            }
            ComebackPhase::SpeechBubble => {
                scene.set_target_view(View::Front, now);
                scene.show_legs();
                scene.head_bob = wave(t, 0.003, 0.0) * 2.0;
                scene.rotation_arm_left = wave(t, 0.002, 0.0) * 0.1;
                scene.rotation_arm_right = wave(t, 0.002, PI) * 0.1;
                if elapsed > COMEBACK_SPEECH_MS {
                    advance_phase(scene, ComebackPhase::Complete, now);
                    speech.hide(now);
                    self.enter(scene, speech, RobotState::Idle, now);
                }
            }
            ComebackPhase::Complete => {}
        }
    }
}

fn advance_phase(scene: &mut SceneState, phase: ComebackPhase, now: Timestamp) {
    log::debug!("comeback {:?} -> {:?}", scene.comeback.phase, phase);
    scene.comeback.phase = phase;
    scene.comeback.phase_started_at = now;
}

fn step_return_to_center(scene: &mut SceneState) {
    if !scene.return_to_center || scene.moving {
        return;
    }
    if distance(scene.position, scene.center) > CENTER_SNAP {
        scene.position = lerp_point(scene.position, scene.center, CENTER_DAMPING);
    } else {
        scene.position = scene.center;
        scene.return_to_center = false;
    }
}

/// Apply a pending pointer look-at, and fall back to the state's view once it lapses.
fn step_gaze(scene: &mut SceneState, now: Timestamp) {
    if scene.has_exited {
        scene.pending_gaze = None;
        scene.gaze_until = None;
        return;
    }
    if let Some(angle) = scene.pending_gaze.take() {
        scene.rotation_head = lerp(scene.rotation_head, angle * 0.2, 0.1);
        let (sin, cos) = angle.sin_cos();
        let view = if cos.abs() > 0.7 {
            View::ThreeQuarter
        } else if sin > 0.0 {
            View::Front
        } else {
            View::Top
        };
        scene.set_target_view(view, now);
    }
    if scene.gaze_until.is_some_and(|until| now > until) {
        scene.gaze_until = None;
        if matches!(scene.current_state, RobotState::Idle | RobotState::Talk) {
            scene.set_target_view(View::Front, now);
        }
    }
}

fn update_talk(scene: &mut SceneState, now: Timestamp) {
    let t = now.as_millis();
    scene.effects.talk_pulse = wave(t, 0.01, 0.0) * 0.05;
    scene.head_bob = wave(t, 0.01, 0.0) * 3.0;
    scene.rotation_arm_left = wave(t, 0.008, 0.0) * 0.2;
    scene.rotation_arm_right = wave(t, 0.008, PI) * 0.2;
    scene.set_target_view(View::Front, now);
    scene.show_legs();
}

/// Six-move breakdance loop, each move `DANCE_PHASE_MS` long, oscillating around the anchor.
fn update_dance(scene: &mut SceneState, now: Timestamp) {
    let t = now.as_millis();
    let elapsed = now.millis_since(scene.state_entered_at);
    let dance_move = ((elapsed / DANCE_PHASE_MS) % DANCE_MOVES).floor() as u8;

    scene.effects.dance_phase += DANCE_STEP;
    scene.effects.dance_move = dance_move;
    let p = scene.effects.dance_phase;
    let anchor = scene.effects.dance_anchor;
    let half_pi = std::f32::consts::FRAC_PI_2;
    let pi = std::f32::consts::PI;

    let (offset, view) = match dance_move {
        // Head spin
        0 => {
            scene.head_bob = (p * 4.0).sin() * 15.0;
            scene.rotation_head = (p * 3.0).sin() * 0.5;
            scene.rotation_arm_left = (p * 2.0).sin() * 0.8;
            scene.rotation_arm_right = (p * 2.0 + pi).sin() * 0.8;
            (Point::new((p * 3.0).sin() * 20.0, (p * 2.0).sin() * 8.0), View::Front)
        }
        // Windmill
        1 => {
            scene.head_bob = (p * 2.0).sin() * 10.0;
            scene.rotation_head = (p * 0.5).sin() * 0.3;
            scene.rotation_arm_left = (p * 2.0) % TAU;
            scene.rotation_arm_right = (p * 2.0 + pi) % TAU;
            (
                Point::new(p.sin() * 15.0, (p * 2.0).sin().abs() * 12.0),
                View::ThreeQuarter,
            )
        }
        // Freeze
        2 => {
            scene.head_bob = (p * 6.0).sin() * 5.0;
            scene.rotation_head = 0.4;
            scene.rotation_arm_left = 1.2;
            scene.rotation_arm_right = -0.8;
            (Point::new((p * 8.0).sin() * 3.0, (p * 10.0).sin() * 2.0), View::Side)
        }
        // Footwork
        3 => {
            scene.head_bob = (p * 3.0).sin() * 12.0;
            scene.rotation_head = (p * 2.0).sin() * 0.25;
            scene.rotation_arm_left = (p * 1.5).sin() * 0.6;
            scene.rotation_arm_right = (p * 1.5 + half_pi).sin() * 0.6;
            scene.set_legs_opacity(0.3 + (p * 8.0).sin() * 0.7);
            (Point::new((p * 4.0).sin() * 25.0, (p * 6.0).sin() * 15.0), View::Front)
        }
        // Power move
        4 => {
            scene.head_bob = (p * 5.0).sin() * 8.0;
            scene.rotation_head = (p * 4.0).sin() * 0.4;
            scene.rotation_arm_left = (p * 6.0).sin() * 1.2;
            scene.rotation_arm_right = (p * 6.0 + pi / 3.0).sin() * 1.2;
            (
                Point::new((p * 2.0).cos() * 30.0, (p * 2.0).sin() * 20.0),
                View::ThreeQuarter,
            )
        }
        // Top rock
        _ => {
            scene.head_bob = (p * 2.5).sin() * 18.0;
            scene.rotation_head = (p * 1.5).sin() * 0.35;
            scene.rotation_arm_left = (p * 3.0).sin() * 0.9;
            scene.rotation_arm_right = (p * 3.0 + pi).sin() * 0.9;
            (
                Point::new((p * 1.5).sin() * 12.0, (p * 3.0).sin().abs() * 20.0),
                View::Front,
            )
        }
    };

    if !scene.moving {
        scene.position = Point::new(anchor.x + offset.x, anchor.y + offset.y);
    }
    scene.set_target_view(view, now);

    scene.effects.dance_pulse = match dance_move {
        1 => wave(t, 0.015, 0.0) * 0.03,
        4 => wave(t, 0.02, 0.0) * 0.05,
        _ => 0.0,
    };
    if dance_move != 3 {
        scene.show_legs();
    }
}

fn update_search(scene: &mut SceneState, now: Timestamp) {
    let t = now.as_millis();
    scene.effects.search_angle += SEARCH_STEP;
    let angle = scene.effects.search_angle;
    scene.rotation_head = angle.sin() * 0.3;
    scene.head_bob = wave(t, 0.005, 0.0) * 3.0;
    scene.rotation_arm_left = (angle * 0.5).sin() * 0.2;
    scene.rotation_arm_right = (angle * 0.5 + std::f32::consts::PI).sin() * 0.2;

    let cycle = now.millis_since(scene.state_entered_at) % SEARCH_CYCLE_MS;
    let view = if cycle < SEARCH_CYCLE_MS / 3.0 {
        View::Front
    } else if cycle < SEARCH_CYCLE_MS * 2.0 / 3.0 {
        View::ThreeQuarter
    } else {
        View::Side
    };
    scene.set_target_view(view, now);
    scene.show_legs();
}

fn update_roll(scene: &mut SceneState, now: Timestamp) {
    let t = now.as_millis();
    let speed_gain = scene.roll_speed * 0.1;
    scene.head_bob = wave(t, 0.01, 0.0) * 3.0;
    scene.rotation_arm_left = wave(t, 0.01, 0.0) * 0.1 * speed_gain;
    scene.rotation_arm_right = wave(t, 0.01, PI) * 0.1 * speed_gain;
    scene.hide_legs();
}

fn update_exited(scene: &mut SceneState) {
    scene.position.x = scene.viewport.width + PARKED_MARGIN;
}

fn update_thinking(scene: &mut SceneState, now: Timestamp) {
    let t = now.as_millis();
    scene.effects.thinking_pulse = wave(t, 0.008, 0.0) * 0.08;
    scene.rotation_head = wave(t, 0.003, 0.0) * 0.15;
    scene.head_bob = wave(t, 0.004, 0.0) * 4.0;
    scene.rotation_arm_left = wave(t, 0.002, 0.0) * 0.03;
    scene.rotation_arm_right = wave(t, 0.002, PI) * 0.03;
    scene.set_target_view(View::Front, now);
    scene.show_legs();
}

fn update_responding(scene: &mut SceneState, now: Timestamp) {
    let t = now.as_millis();
    scene.effects.responding_glow = wave(t, 0.01, 0.0) * 0.1;
    scene.head_bob = wave(t, 0.008, 0.0) * 6.0;
    scene.rotation_arm_left = wave(t, 0.01, 0.0) * 0.25;
    scene.rotation_arm_right = wave(t, 0.01, PI) * 0.25;
    scene.rotation_head = wave(t, 0.005, 0.0) * 0.1;
    scene.set_target_view(View::Front, now);
    scene.show_legs();
}
