// robot_core: animated robot actor, Rust/WASM core.
// All behavior lives here; the page only forwards input and replays the draw list.

mod animator;
mod chat;
mod error;
mod input;
mod render;
mod robot;
mod scene;
mod speech;
mod tween;
mod types;

use wasm_bindgen::prelude::*;

pub use animator::Animator;
pub use chat::{ChatMessage, ChatSession, ProductSource, Speaker, StaticCatalog};
pub use error::RobotError;
pub use input::{Command, Controls, InputRouter, Intent};
pub use render::{AssetCatalog, DrawCommand, Frame, RenderPass, Transform2D};
pub use robot::Robot;
pub use scene::{SceneState, MAX_SCALE, MIN_SCALE};
pub use speech::{SpeechFrame, SpeechOverlay};
pub use types::*;

/// Panic hook and console logger for the browser.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Robot handle exposed to JavaScript. Times are `performance.now()` milliseconds.
#[wasm_bindgen]
pub struct RobotEngine {
    inner: Robot,
}

#[wasm_bindgen]
impl RobotEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, now_ms: f64) -> Result<RobotEngine, JsValue> {
        let inner = Robot::from_json(config_json, Timestamp::from_millis(now_ms))
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        Ok(RobotEngine { inner })
    }

    /// Advance one animation frame. Returns the frame as JSON.
    pub fn tick(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let frame = self.inner.tick(Timestamp::from_millis(now_ms));
        serde_json::to_string(&frame)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Request a state by name. Returns whether it was applied.
    pub fn request_state(&mut self, name: &str, now_ms: f64) -> bool {
        self.inner
            .request_state_named(name, Timestamp::from_millis(now_ms))
    }

    /// Press a control-panel button by name.
    pub fn command(&mut self, name: &str, now_ms: f64) {
        self.inner.command_named(name, Timestamp::from_millis(now_ms));
    }

    pub fn set_scale(&mut self, value: f32) {
        self.inner.set_scale(value);
    }

    pub fn move_to(&mut self, x: f32, y: f32, now_ms: f64) -> bool {
        self.inner
            .move_to(Point::new(x, y), Timestamp::from_millis(now_ms))
    }

    pub fn center(&mut self, now_ms: f64) {
        self.inner.center(Timestamp::from_millis(now_ms));
    }

    pub fn show_speech(&mut self, text: &str, now_ms: f64) {
        self.inner.show_speech(text, Timestamp::from_millis(now_ms));
    }

    pub fn hide_speech(&mut self, now_ms: f64) {
        self.inner.hide_speech(Timestamp::from_millis(now_ms));
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, now_ms: f64) {
        self.inner
            .pointer_down(Point::new(x, y), Timestamp::from_millis(now_ms));
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, now_ms: f64) {
        self.inner
            .pointer_move(Point::new(x, y), Timestamp::from_millis(now_ms));
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, now_ms: f64) {
        self.inner
            .pointer_up(Point::new(x, y), Timestamp::from_millis(now_ms));
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.inner.resize(width, height);
    }

    pub fn send_chat(&mut self, text: &str, now_ms: f64) -> bool {
        self.inner.send_chat(text, Timestamp::from_millis(now_ms))
    }

    /// Chat log as a JSON array.
    pub fn chat_messages(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.chat_messages())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Enabled/disabled flags for the control panel, as JSON.
    pub fn controls(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.controls())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn current_state(&self) -> String {
        self.inner.current_state().to_string()
    }

    pub fn has_exited(&self) -> bool {
        self.inner.has_exited()
    }

    /// Report whether a view image loaded. Unknown view names are logged and ignored.
    pub fn asset_loaded(&mut self, view: &str, loaded: bool) {
        match view.parse::<View>() {
            Ok(view) => self.inner.set_asset_available(view, loaded),
            Err(e) => log::warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_creation_works() {
        let engine = RobotEngine::new(r#"{"viewport":{"width":800,"height":600}}"#, 0.0);
        assert!(engine.is_ok());
        assert_eq!(engine.unwrap().current_state(), "roll");
    }

    #[test]
    fn tick_returns_frame_json() {
        let mut engine = RobotEngine::new(r#"{"entrance":false}"#, 0.0).unwrap();
        let json = engine.tick(16.0).unwrap();
        let frame: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(frame["state"], "idle");
        assert_eq!(frame["commands"][0]["type"], "shadow");
        assert_eq!(frame["commands"][1]["view"], "front");
    }

    #[test]
    fn named_calls_round_trip() {
        let mut engine = RobotEngine::new(r#"{"entrance":false}"#, 0.0).unwrap();
        assert!(engine.request_state("dance", 0.0));
        assert_eq!(engine.current_state(), "dance");
        assert!(!engine.request_state("comeBack", 0.0));

        engine.command("exitRight", 10.0);
        assert_eq!(engine.current_state(), "exitRight");
        let controls: serde_json::Value =
            serde_json::from_str(&engine.controls().unwrap()).unwrap();
        assert_eq!(controls["exit_right"], false);
    }

    #[test]
    fn missing_asset_drops_image_draw() {
        let mut engine = RobotEngine::new(r#"{"entrance":false}"#, 0.0).unwrap();
        engine.asset_loaded("front", false);
        engine.asset_loaded("sideways", true);
        let frame: serde_json::Value = serde_json::from_str(&engine.tick(16.0).unwrap()).unwrap();
        assert_eq!(frame["commands"].as_array().map(|c| c.len()), Some(1));
    }

    #[test]
    fn chat_log_serializes() {
        let mut engine = RobotEngine::new(r#"{"entrance":false}"#, 0.0).unwrap();
        assert!(engine.send_chat("desk lamp", 0.0));
        let log: serde_json::Value =
            serde_json::from_str(&engine.chat_messages().unwrap()).unwrap();
        assert_eq!(log[0]["speaker"], "user");
        assert_eq!(log[0]["text"], "desk lamp");
    }
}
