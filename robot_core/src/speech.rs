// Speech bubble anchored to the actor. Fade timers are deadlines checked on update,
// and every show/hide replaces whatever fade was pending.

use serde::Serialize;

use crate::scene::SceneState;
use crate::tween::mix;
use crate::types::{Point, Timestamp};

/// Length of the fade in and of the fade out (ms). Detach happens when the fade out ends.
pub const FADE_MS: f64 = 300.0;
/// Below this scale the default offset would crowd the actor, so placement changes.
const TINY_SCALE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fade {
    Settled,
    In { started: Timestamp, from: f32 },
    Out { started: Timestamp, from: f32, detach_at: Timestamp },
}

/// What JS needs to position and style the bubble element this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SpeechFrame {
    pub visible: bool,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct SpeechOverlay {
    text: String,
    attached: bool,
    opacity: f32,
    fade: Fade,
}

impl SpeechOverlay {
    pub fn new() -> Self {
        SpeechOverlay {
            text: String::new(),
            attached: false,
            opacity: 0.0,
            fade: Fade::Settled,
        }
    }

    /// Set the text and fade in from transparent.
    pub fn show(&mut self, text: &str, now: Timestamp) {
        self.text = text.to_string();
        self.attached = true;
        self.opacity = 0.0;
        self.fade = Fade::In {
            started: now,
            from: 0.0,
        };
    }

    /// Fade out and detach. A hide while already fading out keeps the first detach time.
    pub fn hide(&mut self, now: Timestamp) {
        if !self.attached || matches!(self.fade, Fade::Out { .. }) {
            return;
        }
        self.fade = Fade::Out {
            started: now,
            from: self.opacity,
            detach_at: now.plus_millis(FADE_MS),
        };
    }

    /// Attached and not yet detached (including mid fade-out).
    pub fn is_visible(&self) -> bool {
        self.attached
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Advance the fade and place the bubble relative to the actor.
    pub fn update(&mut self, scene: &SceneState, now: Timestamp) -> SpeechFrame {
        match self.fade {
            Fade::Settled => {}
            Fade::In { started, from } => {
                let t = now.millis_since(started) / FADE_MS;
                self.opacity = mix(from, 1.0, t as f32);
                if t >= 1.0 {
                    self.fade = Fade::Settled;
                }
            }
            Fade::Out {
                started,
                from,
                detach_at,
            } => {
                let t = now.millis_since(started) / FADE_MS;
                self.opacity = mix(from, 0.0, t as f32);
                if now >= detach_at {
                    self.attached = false;
                    self.opacity = 0.0;
                    self.fade = Fade::Settled;
                }
            }
        }

        if !self.attached {
            return SpeechFrame::default();
        }

        let anchor = placement(scene);
        SpeechFrame {
            visible: true,
            text: self.text.clone(),
            x: anchor.x,
            y: anchor.y,
            opacity: self.opacity,
        }
    }
}

impl Default for SpeechOverlay {
    fn default() -> Self {
        Self::new()
    }
}

/// Bubble anchor. A tiny actor gets a wider offset that is pulled back on-screen.
fn placement(scene: &SceneState) -> Point {
    let Point { x, y } = scene.position;
    if scene.scale() >= TINY_SCALE {
        return Point::new(x + 100.0, y - 100.0);
    }

    let mut bubble = Point::new(x + 150.0, y - 80.0);
    if bubble.x > scene.viewport.width - 250.0 {
        bubble.x = x - 150.0;
    }
    if bubble.y < 100.0 {
        bubble.y = y + 80.0;
    }
    bubble
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Viewport;

    fn scene() -> SceneState {
        SceneState::new(Viewport::new(800.0, 600.0), 0.5, Timestamp::default())
    }

    fn at(ms: f64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn show_fades_in() {
        let scene = scene();
        let mut speech = SpeechOverlay::new();
        speech.show("hello", at(0.0));

        let frame = speech.update(&scene, at(150.0));
        assert!(frame.visible);
        assert!((frame.opacity - 0.5).abs() < 1e-3);

        let frame = speech.update(&scene, at(400.0));
        assert_eq!(frame.opacity, 1.0);
        assert_eq!(frame.text, "hello");
    }

    #[test]
    fn hide_detaches_after_fade() {
        let scene = scene();
        let mut speech = SpeechOverlay::new();
        speech.show("bye", at(0.0));
        let _ = speech.update(&scene, at(400.0));

        speech.hide(at(500.0));
        let frame = speech.update(&scene, at(650.0));
        assert!(frame.visible);
        assert!(frame.opacity < 1.0 && frame.opacity > 0.0);

        let frame = speech.update(&scene, at(800.0));
        assert!(!frame.visible);
        assert!(!speech.is_visible());
    }

    #[test]
    fn repeated_hides_do_not_postpone_detach() {
        let scene = scene();
        let mut speech = SpeechOverlay::new();
        speech.show("x", at(0.0));
        speech.hide(at(100.0));
        for ms in [150.0, 200.0, 250.0, 300.0, 350.0] {
            speech.hide(at(ms));
            let _ = speech.update(&scene, at(ms));
        }
        assert!(!speech.update(&scene, at(400.0)).visible);
    }

    #[test]
    fn show_supersedes_pending_hide() {
        let scene = scene();
        let mut speech = SpeechOverlay::new();
        speech.show("first", at(0.0));
        speech.hide(at(100.0));
        speech.show("second", at(200.0));

        let frame = speech.update(&scene, at(1000.0));
        assert!(frame.visible);
        assert_eq!(frame.text, "second");
        assert_eq!(frame.opacity, 1.0);
    }

    #[test]
    fn default_offset_for_normal_scale() {
        let scene = scene();
        let mut speech = SpeechOverlay::new();
        speech.show("hi", at(0.0));
        let frame = speech.update(&scene, at(10.0));
        assert_eq!((frame.x, frame.y), (500.0, 200.0));
    }

    #[test]
    fn tiny_actor_bubble_is_pulled_on_screen() {
        let mut scene = scene();
        scene.set_scale_now(0.02);
        scene.position = Point::new(700.0, 50.0);
        let anchor = placement(&scene);
        assert_eq!(anchor, Point::new(550.0, 130.0));

        scene.position = Point::new(300.0, 300.0);
        assert_eq!(placement(&scene), Point::new(450.0, 220.0));
    }
}
