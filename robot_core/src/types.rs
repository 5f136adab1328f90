// Strong typing over strings. Newtypes for timestamps, enums for states and views.
// Everything here crosses the JS boundary as JSON, so it all derives serde.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RobotError;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// From a `performance.now()` style reading. Negative readings clamp to zero.
    pub fn from_millis(ms: f64) -> Self {
        Timestamp((ms.max(0.0) * 1000.0).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn millis_since(&self, earlier: Timestamp) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 / 1000.0
    }

    pub fn plus_millis(&self, ms: f64) -> Self {
        Timestamp(self.0.saturating_add((ms.max(0.0) * 1000.0).round() as u64))
    }
}

/// Canvas-space coordinate in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    /// Both coordinates are real numbers (JS can hand us NaN).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Viewport {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(800.0, 600.0)
    }
}

/// One of the five pre-rendered robot images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Front,
    Side,
    ThreeQuarter,
    Back,
    Top,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Front,
        View::Side,
        View::ThreeQuarter,
        View::Back,
        View::Top,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Front => "front",
            View::Side => "side",
            View::ThreeQuarter => "threeQuarter",
            View::Back => "back",
            View::Top => "top",
        }
    }
}

impl FromStr for View {
    type Err = RobotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| RobotError::InvalidConfig(format!("unknown view '{}'", s)))
    }
}

/// Behavioral state of the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RobotState {
    Idle,
    Talk,
    Dance,
    Search,
    Roll,
    ExitRight,
    /// Off-canvas. Only `ComeBack` leaves it.
    Exited,
    Thinking,
    Responding,
    ComeBack,
}

impl RobotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotState::Idle => "idle",
            RobotState::Talk => "talk",
            RobotState::Dance => "dance",
            RobotState::Search => "search",
            RobotState::Roll => "roll",
            RobotState::ExitRight => "exitRight",
            RobotState::Exited => "exited",
            RobotState::Thinking => "thinking",
            RobotState::Responding => "responding",
            RobotState::ComeBack => "comeBack",
        }
    }
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RobotState {
    type Err = RobotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(RobotState::Idle),
            "talk" => Ok(RobotState::Talk),
            "dance" => Ok(RobotState::Dance),
            "search" => Ok(RobotState::Search),
            "roll" => Ok(RobotState::Roll),
            "exitRight" => Ok(RobotState::ExitRight),
            "exited" => Ok(RobotState::Exited),
            "thinking" => Ok(RobotState::Thinking),
            "responding" => Ok(RobotState::Responding),
            "comeBack" => Ok(RobotState::ComeBack),
            other => Err(RobotError::UnknownState(other.to_string())),
        }
    }
}

/// Sub-state of `RobotState::ComeBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ComebackPhase {
    /// Rolling in from the right edge at oversized scale.
    #[default]
    Entering,
    /// Holding the oversized scale at center.
    Large,
    /// Shrinking linearly to the tiny floor.
    Shrinking,
    /// Tiny, with the speech bubble up.
    SpeechBubble,
    Complete,
}

/// RGB multiply tint applied to an image draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tint {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Tint { r, g, b }
    }
}

/// A catalog entry the chat collaborator can recommend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Robot configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    /// Replaces the built-in sample catalog when present.
    #[serde(default)]
    pub products: Option<Vec<Product>>,
    /// Roll in from the left edge on startup.
    #[serde(default = "default_true")]
    pub entrance: bool,
    /// Seed for blink gaps, random roll targets and canned reply picks.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        RobotConfig {
            viewport: Viewport::default(),
            animation: AnimationSettings::default(),
            chat: ChatSettings::default(),
            products: None,
            entrance: true,
            seed: default_seed(),
        }
    }
}

/// Tunables for the animation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Scale used at startup and by the reset button.
    #[serde(default = "default_scale")]
    pub default_scale: f32,
    /// How long a press must be held before it spins instead of clicking (ms).
    #[serde(default = "default_hold_threshold")]
    pub hold_threshold_ms: f64,
    /// Spin speed ceiling (radians per tick).
    #[serde(default = "default_max_spin_speed")]
    pub max_spin_speed: f32,
    /// Roll speed ceiling (pixels per tick).
    #[serde(default = "default_roll_speed_cap")]
    pub roll_speed_cap: f32,
    /// Constant exit speed (pixels per tick).
    #[serde(default = "default_exit_speed")]
    pub exit_speed: f32,
    /// Length of a view cross-fade (ms).
    #[serde(default = "default_view_transition")]
    pub view_transition_ms: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        AnimationSettings {
            default_scale: default_scale(),
            hold_threshold_ms: default_hold_threshold(),
            max_spin_speed: default_max_spin_speed(),
            roll_speed_cap: default_roll_speed_cap(),
            exit_speed: default_exit_speed(),
            view_transition_ms: default_view_transition(),
        }
    }
}

fn default_scale() -> f32 {
    0.5
}

fn default_hold_threshold() -> f64 {
    300.0
}

fn default_max_spin_speed() -> f32 {
    0.15
}

fn default_roll_speed_cap() -> f32 {
    5.0
}

fn default_exit_speed() -> f32 {
    8.0
}

fn default_view_transition() -> f64 {
    300.0
}

fn default_true() -> bool {
    true
}

fn default_seed() -> u64 {
    0x5EED_0B07
}

/// Chat collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Simulated processing time before the reply lands (ms).
    #[serde(default = "default_typing_delay")]
    pub typing_delay_ms: f64,
    /// Grace period after a reply before the robot returns to idle (ms).
    #[serde(default = "default_idle_delay")]
    pub idle_delay_ms: f64,
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_max_product_results")]
    pub max_product_results: usize,
    #[serde(default)]
    pub responses: ChatResponses,
}

impl Default for ChatSettings {
    fn default() -> Self {
        ChatSettings {
            typing_delay_ms: default_typing_delay(),
            idle_delay_ms: default_idle_delay(),
            max_messages: default_max_messages(),
            max_product_results: default_max_product_results(),
            responses: ChatResponses::default(),
        }
    }
}

fn default_typing_delay() -> f64 {
    1000.0
}

fn default_idle_delay() -> f64 {
    2000.0
}

fn default_max_messages() -> usize {
    50
}

fn default_max_product_results() -> usize {
    5
}

/// Canned lines the chat picks from at random.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponses {
    #[serde(default = "default_greeting")]
    pub greeting: Vec<String>,
    #[serde(default = "default_no_results")]
    pub no_results: Vec<String>,
    #[serde(default = "default_error")]
    pub error: Vec<String>,
    #[serde(default = "default_thinking")]
    pub thinking: Vec<String>,
}

impl Default for ChatResponses {
    fn default() -> Self {
        ChatResponses {
            greeting: default_greeting(),
            no_results: default_no_results(),
            error: default_error(),
            thinking: default_thinking(),
        }
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_greeting() -> Vec<String> {
    lines(&[
        "Hello! I'm here to help you find products. What are you looking for?",
        "Hi there! Tell me what you need and I'll search our products for you!",
        "Welcome! I can help you discover amazing products. What interests you?",
    ])
}

fn default_no_results() -> Vec<String> {
    lines(&[
        "I couldn't find any products matching that description. Try being more specific!",
        "Hmm, no matches found. Could you describe what you're looking for differently?",
        "Sorry, I don't see any products like that. What else can I help you find?",
    ])
}

fn default_error() -> Vec<String> {
    lines(&[
        "Oops! Something went wrong. Please try again.",
        "I'm having trouble right now. Could you try that again?",
        "Technical difficulties! Give me a moment and try again.",
    ])
}

fn default_thinking() -> Vec<String> {
    lines(&[
        "Let me search for that...",
        "Searching our products...",
        "Looking for the best matches...",
        "Checking our inventory...",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_conversions() {
        let ts = Timestamp::from_millis(1500.0);
        assert_eq!(ts.as_micros(), 1_500_000);
        assert!((ts.as_millis() - 1500.0).abs() < 0.0001);
        assert_eq!(ts.plus_millis(250.0).as_micros(), 1_750_000);
    }

    #[test]
    fn huge_delays_saturate_instead_of_overflowing() {
        let ts = Timestamp::from_millis(5.0).plus_millis(1e20);
        assert_eq!(ts, Timestamp::from_micros(u64::MAX));
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f32::NAN, 2.0).is_finite());
    }

    #[test]
    fn millis_since_saturates() {
        let early = Timestamp::from_millis(100.0);
        let late = Timestamp::from_millis(400.0);
        assert_eq!(late.millis_since(early), 300.0);
        assert_eq!(early.millis_since(late), 0.0);
    }

    #[test]
    fn state_names_round_trip_through_from_str() {
        for state in [
            RobotState::Idle,
            RobotState::ExitRight,
            RobotState::ComeBack,
            RobotState::Thinking,
        ] {
            assert_eq!(state.as_str().parse::<RobotState>().ok(), Some(state));
        }
        assert!("wave".parse::<RobotState>().is_err());
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: RobotConfig =
            serde_json::from_str(r#"{"viewport":{"width":1024,"height":768}}"#).unwrap();
        assert_eq!(config.viewport.center(), Point::new(512.0, 384.0));
        assert_eq!(config.animation.hold_threshold_ms, 300.0);
        assert_eq!(config.chat.max_product_results, 5);
        assert_eq!(config.chat.responses.thinking.len(), 4);
        assert!(config.entrance);
    }

    #[test]
    fn view_serializes_camel_case() {
        let json = serde_json::to_string(&View::ThreeQuarter).unwrap();
        assert_eq!(json, "\"threeQuarter\"");
    }
}
