//! Per-turn context sent to the model, and the action history behind it.

use base64::Engine;
use deskpilot_vision::{CapturedImage, ScreenGeometry};
use serde::Serialize;
use serde_json::Value;

/// Append-only log of executed `(tool, args)` pairs for one objective.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    text: String,
    entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed step as `Tool: <tool>, args: <compact json>`.
    pub fn record(&mut self, tool: &str, args: &Value) {
        self.text.push_str(&format!("Tool: {tool}, args: {args}\n"));
        self.entries += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[derive(Debug, Serialize)]
struct ImageSpace {
    width: i32,
    height: i32,
}

#[derive(Debug, Serialize)]
struct VirtualScreen {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

/// The context object for one planning turn.
///
/// Field names are a wire contract with the system prompt.
#[derive(Debug, Serialize)]
pub struct TurnContext<'a> {
    original_user_request: &'a str,
    original_user_request_b64: String,
    step_num: u32,
    actions_history: &'a str,
    keyboard_only_hint: bool,
    image_space: ImageSpace,
    virtual_screen: VirtualScreen,
}

impl<'a> TurnContext<'a> {
    /// `step_num` is zero-based: the first turn sends 0.
    pub fn new(
        objective: &'a str,
        step_num: u32,
        history: &'a History,
        keyboard_only: bool,
        image: CapturedImage,
        geometry: ScreenGeometry,
    ) -> Self {
        Self {
            original_user_request: objective,
            original_user_request_b64: base64::engine::general_purpose::STANDARD
                .encode(objective.as_bytes()),
            step_num,
            actions_history: history.as_str(),
            keyboard_only_hint: keyboard_only,
            image_space: ImageSpace {
                width: image.width,
                height: image.height,
            },
            virtual_screen: VirtualScreen {
                left: geometry.origin_x,
                top: geometry.origin_y,
                width: geometry.width,
                height: geometry.height,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
