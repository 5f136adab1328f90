// Coordinator: owns the scene and routes every external call through the same gate.
// One `tick` per animation frame runs chat deadlines, the state machine, the draw list
// and the speech bubble, in that order.

use crate::animator::Animator;
use crate::chat::{ChatMessage, ChatSession, ProductSource, StaticCatalog};
use crate::error::RobotError;
use crate::input::{Command, Controls, InputRouter, Intent};
use crate::render::{AssetCatalog, Frame, RenderPass};
use crate::scene::SceneState;
use crate::speech::SpeechOverlay;
use crate::types::*;

/// Where the entrance roll starts, left of the canvas.
const ENTRANCE_X: f32 = -100.0;

pub struct Robot {
    scene: SceneState,
    animator: Animator,
    input: InputRouter,
    render: RenderPass,
    speech: SpeechOverlay,
    chat: ChatSession,
}

impl Robot {
    pub fn new(config: RobotConfig, now: Timestamp) -> Self {
        let scene = SceneState::new(config.viewport, config.animation.default_scale, now);
        let source: Box<dyn ProductSource> = match config.products {
            Some(products) => Box::new(StaticCatalog::new(products)),
            None => Box::new(StaticCatalog::sample()),
        };

        let mut robot = Robot {
            scene,
            input: InputRouter::new(&config.animation),
            animator: Animator::new(config.animation, config.seed),
            render: RenderPass::new(AssetCatalog::all()),
            speech: SpeechOverlay::new(),
            chat: ChatSession::new(config.chat, source, config.seed.wrapping_add(1), now),
        };

        if config.entrance {
            robot.scene.position = Point::new(ENTRANCE_X, robot.scene.center.y);
            robot.scene.target_position = robot.scene.center;
            robot.request_state(RobotState::Roll, now);
        }
        robot
    }

    pub fn from_json(config_json: &str, now: Timestamp) -> Result<Self, RobotError> {
        let config: RobotConfig = serde_json::from_str(config_json)
            .map_err(|e| RobotError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(config, now))
    }

    /// Replace the product backend behind the chat.
    pub fn with_product_source(mut self, source: Box<dyn ProductSource>) -> Self {
        self.chat.set_source(source);
        self
    }

    pub fn request_state(&mut self, state: RobotState, now: Timestamp) -> bool {
        self.animator
            .request(&mut self.scene, &mut self.speech, state, now)
    }

    /// Like `request_state`, by name. Unknown names are logged and ignored.
    pub fn request_state_named(&mut self, name: &str, now: Timestamp) -> bool {
        match name.parse::<RobotState>() {
            Ok(state) => self.request_state(state, now),
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    /// Absolute scale slider. Dead while exited, like every other control.
    pub fn set_scale(&mut self, value: f32) {
        self.input.command(&mut self.scene, Command::SetScale(value));
    }

    /// Roll to `target`. Retargets an in-flight roll without re-entering the state.
    /// Non-finite targets are ignored.
    pub fn move_to(&mut self, target: Point, now: Timestamp) -> bool {
        if !target.is_finite() {
            log::warn!("ignoring move to non-finite point {:?}", target);
            return false;
        }
        if !Animator::accepts(&self.scene, RobotState::Roll) {
            return false;
        }
        self.scene.target_position = target;
        if self.scene.current_state == RobotState::Roll {
            self.scene.moving = true;
            self.scene.legs_visible = false;
            true
        } else {
            self.request_state(RobotState::Roll, now)
        }
    }

    pub fn center(&mut self, now: Timestamp) {
        self.command(Command::Center, now);
    }

    pub fn show_speech(&mut self, text: &str, now: Timestamp) {
        self.speech.show(text, now);
    }

    pub fn hide_speech(&mut self, now: Timestamp) {
        self.speech.hide(now);
    }

    pub fn pointer_down(&mut self, at: Point, now: Timestamp) {
        self.input.pointer_down(&mut self.scene, at, now);
    }

    pub fn pointer_move(&mut self, at: Point, now: Timestamp) {
        self.input.pointer_move(&mut self.scene, at, now);
    }

    pub fn pointer_up(&mut self, at: Point, now: Timestamp) {
        if let Some(intent) = self.input.pointer_up(&mut self.scene, at, now) {
            self.apply(intent, now);
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.input.resize(&mut self.scene, width, height);
    }

    pub fn command(&mut self, command: Command, now: Timestamp) {
        if let Some(intent) = self.input.command(&mut self.scene, command) {
            self.apply(intent, now);
        }
    }

    /// Like `command`, by button name. Unknown names are logged and ignored.
    pub fn command_named(&mut self, name: &str, now: Timestamp) {
        match name.parse::<Command>() {
            Ok(command) => self.command(command, now),
            Err(e) => log::warn!("{}", e),
        }
    }

    /// Submit a chat query. Refused while exited, blank, or already processing.
    pub fn send_chat(&mut self, text: &str, now: Timestamp) -> bool {
        if !Animator::accepts(&self.scene, RobotState::Thinking) {
            log::debug!("chat ignored while exited");
            return false;
        }
        match self.chat.send(text, now) {
            Some(state) => {
                self.request_state(state, now);
                true
            }
            None => false,
        }
    }

    pub fn set_asset_available(&mut self, view: View, available: bool) {
        self.render.set_asset_available(view, available);
    }

    /// Advance one frame and describe it.
    pub fn tick(&mut self, now: Timestamp) -> Frame {
        for state in self.chat.tick(now) {
            self.request_state(state, now);
        }
        self.animator.tick(&mut self.scene, &mut self.speech, now);
        let commands = self.render.render(&self.scene, now);
        let speech = self.speech.update(&self.scene, now);

        Frame {
            state: self.scene.current_state,
            visible: self.scene.current_state != RobotState::Exited,
            blinking: self.scene.effects.blinking,
            legs_opacity: self.scene.legs_opacity(),
            commands,
            speech,
        }
    }

    pub fn current_state(&self) -> RobotState {
        self.scene.current_state
    }

    pub fn has_exited(&self) -> bool {
        self.scene.has_exited
    }

    pub fn controls(&self) -> Controls {
        Controls::for_scene(&self.scene)
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn chat_messages(&self) -> Vec<&ChatMessage> {
        self.chat.messages().collect()
    }

    fn apply(&mut self, intent: Intent, now: Timestamp) {
        match intent {
            Intent::Transition(state) => {
                self.request_state(state, now);
            }
            Intent::MoveTo(target) => {
                self.move_to(target, now);
            }
            Intent::RollSomewhere => {
                let target = self.animator.random_roll_target(self.scene.viewport);
                self.move_to(target, now);
            }
            Intent::Speak(text) => self.show_speech(&text, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::animator::{ARRIVAL_DISTANCE, COMEBACK_MESSAGE};
    use crate::render::DrawCommand;
    use crate::tween::distance;

    const FRAME_MS: f64 = 16.0;

    struct Clock(f64);

    impl Clock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0)
        }

        fn advance(&mut self) -> Timestamp {
            self.0 += FRAME_MS;
            self.now()
        }
    }

    fn still_robot() -> Robot {
        let config = RobotConfig {
            entrance: false,
            ..RobotConfig::default()
        };
        Robot::new(config, Timestamp::default())
    }

    fn run_until(
        robot: &mut Robot,
        clock: &mut Clock,
        max_ticks: usize,
        done: impl Fn(&Robot, &Frame) -> bool,
    ) -> Option<Frame> {
        for _ in 0..max_ticks {
            let frame = robot.tick(clock.advance());
            if done(robot, &frame) {
                return Some(frame);
            }
        }
        None
    }

    #[test]
    fn entrance_rolls_in_from_the_left() {
        let mut robot = Robot::new(RobotConfig::default(), Timestamp::default());
        assert_eq!(robot.current_state(), RobotState::Roll);
        assert_eq!(robot.scene().position.x, ENTRANCE_X);

        let mut clock = Clock(0.0);
        let settled = run_until(&mut robot, &mut clock, 2000, |r, _| {
            r.current_state() == RobotState::Idle
        });
        assert!(settled.is_some());
        assert!(distance(robot.scene().position, Point::new(400.0, 300.0)) < ARRIVAL_DISTANCE);
    }

    #[test]
    fn move_to_converges_and_idles() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        let target = Point::new(100.0, 100.0);
        assert!(robot.move_to(target, clock.now()));
        assert_eq!(robot.current_state(), RobotState::Roll);

        let settled = run_until(&mut robot, &mut clock, 2000, |r, _| {
            r.current_state() == RobotState::Idle
        });
        assert!(settled.is_some());
        assert!(distance(robot.scene().position, target) < ARRIVAL_DISTANCE);
    }

    #[test]
    fn move_to_retargets_an_active_roll() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        robot.move_to(Point::new(100.0, 100.0), clock.now());
        robot.tick(clock.advance());
        assert!(robot.move_to(Point::new(700.0, 500.0), clock.now()));
        assert_eq!(robot.scene().target_position, Point::new(700.0, 500.0));
        assert_eq!(robot.current_state(), RobotState::Roll);
    }

    #[test]
    fn long_hold_spins_without_moving() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        let press = Point::new(600.0, 300.0);
        robot.pointer_down(press, clock.now());
        while clock.0 < 500.0 {
            robot.tick(clock.advance());
        }
        assert!(robot.scene().spin.spinning);
        assert!(robot.scene().spin.speed > 0.0);

        robot.pointer_up(press, clock.now());
        assert_eq!(robot.current_state(), RobotState::Idle);
        assert_eq!(robot.scene().target_position, Point::new(400.0, 300.0));
    }

    #[test]
    fn quick_click_rolls_to_pointer() {
        let mut robot = still_robot();
        let click = Point::new(650.0, 450.0);
        robot.pointer_down(click, Timestamp::from_millis(0.0));
        robot.pointer_up(click, Timestamp::from_millis(80.0));
        assert_eq!(robot.current_state(), RobotState::Roll);
        assert_eq!(robot.scene().target_position, click);
    }

    #[test]
    fn exit_right_leaves_nothing_to_draw() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        robot.command(Command::ExitRight, clock.now());
        assert_eq!(robot.current_state(), RobotState::ExitRight);
        assert!(!robot.controls().exit_right);

        let frame = run_until(&mut robot, &mut clock, 500, |r, _| r.has_exited())
            .expect("robot never exited");
        assert_eq!(frame.state, RobotState::Exited);
        assert!(frame.commands.is_empty());
        assert!(!frame.visible);
        assert!(robot.controls().come_back);

        robot.command(Command::Dance, clock.now());
        robot.pointer_down(Point::new(10.0, 10.0), clock.now());
        robot.pointer_up(Point::new(10.0, 10.0), clock.now());
        assert_eq!(robot.current_state(), RobotState::Exited);
        assert!(!robot.request_state_named("idle", clock.now()));
    }

    #[test]
    fn exit_button_works_again_after_an_interrupted_exit() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        robot.command(Command::ExitRight, clock.now());
        robot.tick(clock.advance());
        robot.command(Command::Idle, clock.now());
        for _ in 0..10 {
            robot.tick(clock.advance());
        }
        assert_eq!(robot.current_state(), RobotState::Idle);
        assert!(!robot.scene().exiting);
        assert!(robot.controls().exit_right);

        robot.command(Command::ExitRight, clock.now());
        assert_eq!(robot.current_state(), RobotState::ExitRight);
    }

    #[test]
    fn scale_slider_is_dead_while_exited() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        robot.set_scale(0.8);
        assert!((robot.scene().target_scale() - 0.8).abs() < 1e-6);

        robot.command(Command::ExitRight, clock.now());
        run_until(&mut robot, &mut clock, 500, |r, _| r.has_exited()).expect("exit");
        let before = robot.scene().target_scale();
        robot.set_scale(1.2);
        assert_eq!(robot.scene().target_scale(), before);
    }

    #[test]
    fn non_finite_move_target_is_ignored() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        assert!(!robot.move_to(Point::new(f32::NAN, 100.0), clock.now()));
        robot.pointer_down(Point::new(f32::INFINITY, 0.0), clock.now());
        robot.pointer_up(Point::new(f32::INFINITY, 0.0), clock.now());
        for _ in 0..100 {
            robot.tick(clock.advance());
        }
        assert_eq!(robot.current_state(), RobotState::Idle);
        assert!(robot.scene().position.is_finite());
        assert_eq!(robot.scene().target_position, Point::new(400.0, 300.0));
    }

    #[test]
    fn come_back_round_trip() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        robot.command_named("exitRight", clock.now());
        run_until(&mut robot, &mut clock, 500, |r, _| r.has_exited()).expect("exit");

        robot.command_named("comeBack", clock.now());
        assert_eq!(robot.current_state(), RobotState::ComeBack);
        assert!(!robot.has_exited());

        let saw_bubble = Cell::new(false);
        let done = run_until(&mut robot, &mut clock, 1500, |r, frame| {
            if frame.speech.visible && frame.speech.text == COMEBACK_MESSAGE {
                saw_bubble.set(true);
            }
            if let Some(DrawCommand::Image { transform, .. }) = frame.commands.get(1) {
                if r.current_state() == RobotState::ComeBack {
                    assert!(transform.scale_x < 0.0);
                }
            }
            r.current_state() == RobotState::Idle
        });
        assert!(done.is_some());
        assert!(saw_bubble.get());
        assert!(!robot.has_exited());
        assert!(robot.controls().exit_right);
    }

    #[test]
    fn chat_drives_thinking_responding_idle() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        assert!(robot.send_chat("wireless headphones", clock.now()));
        assert_eq!(robot.current_state(), RobotState::Thinking);
        assert!(!robot.send_chat("lamp", clock.now()));

        run_until(&mut robot, &mut clock, 100, |r, _| {
            r.current_state() == RobotState::Responding
        })
        .expect("never responded");
        assert!(clock.0 >= 1000.0);
        assert!(robot.chat_messages().iter().any(|m| !m.products.is_empty()));

        run_until(&mut robot, &mut clock, 200, |r, _| {
            r.current_state() == RobotState::Idle
        })
        .expect("never went idle");
        assert!(clock.0 >= 3000.0);
    }

    struct OfflineSource;

    impl ProductSource for OfflineSource {
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Product>, RobotError> {
            Err(RobotError::ProductSource("offline".into()))
        }
    }

    #[test]
    fn chat_failure_skips_responding_and_idles() {
        let mut robot = still_robot().with_product_source(Box::new(OfflineSource));
        let mut clock = Clock(0.0);
        assert!(robot.send_chat("lamp", clock.now()));

        let mut seen = Vec::new();
        for _ in 0..250 {
            robot.tick(clock.advance());
            seen.push(robot.current_state());
        }
        assert!(!seen.contains(&RobotState::Responding));
        assert_eq!(robot.current_state(), RobotState::Idle);
        assert!(!robot.chat().is_processing());
    }

    #[test]
    fn chat_refused_while_exited() {
        let mut robot = still_robot();
        let mut clock = Clock(0.0);
        robot.request_state(RobotState::ExitRight, clock.now());
        run_until(&mut robot, &mut clock, 500, |r, _| r.has_exited()).expect("exit");

        assert!(!robot.send_chat("headphones", clock.now()));
        assert!(!robot.chat().is_processing());
        assert_eq!(robot.current_state(), RobotState::Exited);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut robot = still_robot();
        assert!(!robot.request_state_named("moonwalk", Timestamp::default()));
        robot.command_named("fly", Timestamp::default());
        assert_eq!(robot.current_state(), RobotState::Idle);
    }

    #[test]
    fn speak_command_shows_bubble() {
        let mut robot = still_robot();
        robot.command(Command::Speak("hi there".into()), Timestamp::default());
        let frame = robot.tick(Timestamp::from_millis(400.0));
        assert!(frame.speech.visible);
        assert_eq!(frame.speech.text, "hi there");
    }

    #[test]
    fn config_json_errors_are_invalid_config() {
        let err = Robot::from_json("{not json", Timestamp::default()).err();
        assert!(matches!(err, Some(RobotError::InvalidConfig(_))));

        let robot = Robot::from_json(
            r#"{"entrance":false,"viewport":{"width":1000,"height":500}}"#,
            Timestamp::default(),
        )
        .unwrap();
        assert_eq!(robot.scene().position, Point::new(500.0, 250.0));
    }
}
