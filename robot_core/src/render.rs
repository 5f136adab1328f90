// Draw list for one frame. JS replays it on the canvas; it never decides what to draw.

use std::collections::HashSet;

use serde::Serialize;

use crate::scene::SceneState;
use crate::speech::SpeechFrame;
use crate::types::*;

const SHADOW_OPACITY: f32 = 0.3;
const SHADOW_WIDTH: f32 = 120.0;
const SHADOW_HEIGHT: f32 = 30.0;
/// Vertical squash of the shadow ellipse.
const SHADOW_SQUASH: f32 = 0.2;
const SHADOW_OFFSET_Y: f32 = 20.0;
/// Extra head bob while the quick-click reaction is running.
const REACTION_BOB: f32 = -10.0;

const THINKING_TINT: Tint = Tint::new(200, 220, 255);
const RESPONDING_TINT: Tint = Tint::new(220, 255, 220);
const WINDMILL_TINT: Tint = Tint::new(200, 255, 255);
const POWER_MOVE_TINT: Tint = Tint::new(255, 200, 255);

/// Applied as translate, then scale, then rotate. Images are drawn centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform2D {
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawCommand {
    /// Filled black ellipse centered on (x, y).
    Shadow {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        opacity: f32,
    },
    Image {
        view: View,
        transform: Transform2D,
        opacity: f32,
        tint: Option<Tint>,
    },
}

/// Everything JS needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub state: RobotState,
    pub visible: bool,
    pub blinking: bool,
    pub legs_opacity: f32,
    pub commands: Vec<DrawCommand>,
    pub speech: SpeechFrame,
}

/// Which view images finished loading.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    loaded: HashSet<View>,
}

impl AssetCatalog {
    pub fn all() -> Self {
        AssetCatalog {
            loaded: View::ALL.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: View) {
        self.loaded.insert(view);
    }

    pub fn remove(&mut self, view: View) {
        self.loaded.remove(&view);
    }

    pub fn contains(&self, view: View) -> bool {
        self.loaded.contains(&view)
    }
}

pub struct RenderPass {
    assets: AssetCatalog,
    /// Views already warned about, so a missing image logs once.
    reported_missing: HashSet<View>,
}

impl RenderPass {
    pub fn new(assets: AssetCatalog) -> Self {
        RenderPass {
            assets,
            reported_missing: HashSet::new(),
        }
    }

    pub fn set_asset_available(&mut self, view: View, available: bool) {
        if available {
            self.assets.insert(view);
            self.reported_missing.remove(&view);
        } else {
            self.assets.remove(view);
        }
    }

    /// Draw list for the scene as it stands. Empty while exited.
    pub fn render(&mut self, scene: &SceneState, now: Timestamp) -> Vec<DrawCommand> {
        if scene.current_state == RobotState::Exited {
            return Vec::new();
        }

        let scale = scene.scale();
        let mut commands = vec![DrawCommand::Shadow {
            x: scene.position.x,
            y: scene.position.y + SHADOW_OFFSET_Y,
            width: SHADOW_WIDTH * scale,
            height: SHADOW_HEIGHT * scale * SHADOW_SQUASH,
            opacity: SHADOW_OPACITY,
        }];

        let mut bob = scene.head_bob;
        if scene.is_reacting(now) {
            bob += REACTION_BOB;
        }
        let mirror = if scene.current_state == RobotState::ComeBack {
            -1.0
        } else {
            1.0
        };
        let mut rotation = 0.0;
        if scene.spin.is_active() {
            rotation += scene.spin.rotation;
        }
        if scene.current_state == RobotState::Roll {
            rotation += scene.rotation_body;
        }
        let base = Transform2D {
            x: scene.position.x,
            y: scene.position.y + bob,
            scale_x: scale * mirror,
            scale_y: scale,
            rotation,
        };

        if scene.is_cross_fading() {
            let p = scene.view_transition_progress();
            self.push_image(&mut commands, scene.view(), base, 1.0 - p, None);
            self.push_image(&mut commands, scene.target_view(), base, p, None);
            return commands;
        }

        let (pulse, tint) = state_effect(scene);
        let transform = Transform2D {
            scale_x: base.scale_x * (1.0 + pulse),
            scale_y: base.scale_y * (1.0 + pulse),
            ..base
        };
        self.push_image(&mut commands, scene.view(), transform, 1.0, tint);
        commands
    }

    fn push_image(
        &mut self,
        commands: &mut Vec<DrawCommand>,
        view: View,
        transform: Transform2D,
        opacity: f32,
        tint: Option<Tint>,
    ) {
        if !self.assets.contains(view) {
            if self.reported_missing.insert(view) {
                log::warn!("robot image '{}' not loaded, skipping draw", view.as_str());
            }
            return;
        }
        commands.push(DrawCommand::Image {
            view,
            transform,
            opacity,
            tint,
        });
    }
}

/// Scale pulse and tint for the current state.
fn state_effect(scene: &SceneState) -> (f32, Option<Tint>) {
    let effects = &scene.effects;
    match scene.current_state {
        RobotState::Talk => (effects.talk_pulse, None),
        RobotState::Thinking => (effects.thinking_pulse, Some(THINKING_TINT)),
        RobotState::Responding => (effects.responding_glow, Some(RESPONDING_TINT)),
        RobotState::Dance => match effects.dance_move {
            1 => (effects.dance_pulse, Some(WINDMILL_TINT)),
            4 => (effects.dance_pulse, Some(POWER_MOVE_TINT)),
            _ => (0.0, None),
        },
        _ => (0.0, None),
    }
}
