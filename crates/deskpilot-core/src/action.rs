//! Typed tool invocations.
//!
//! A [`Step`](crate::plan::Step) carries a tool name and a free-form argument
//! object. [`Action::decode`] checks the arguments for the named tool and
//! produces one variant per tool, so the executor never touches raw JSON.

use deskpilot_vision::{MouseButton, VirtualKey};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Argument validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("missing argument '{0}'")]
    Missing(&'static str),

    #[error("argument '{field}' must be {expected}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
    },

    #[error("no recognizable keys in 'key'/'keys'")]
    NoKeys,
}

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Sleep {
        secs: f64,
    },
    Press {
        keys: Vec<VirtualKey>,
    },
    Hotkey {
        modifiers: Vec<VirtualKey>,
        normals: Vec<VirtualKey>,
    },
    Write {
        text: String,
        /// `None` uses the configured typing interval
        interval: Option<Duration>,
    },
    Paste {
        text: String,
        restore_clipboard: bool,
    },
    Launch {
        command: String,
    },
    Mouse {
        /// Image-space coordinates, checked against the last capture at execution time
        x: i64,
        y: i64,
        button: MouseButton,
        clicks: u32,
        /// `None` uses the configured click interval
        interval: Option<Duration>,
        move_only: bool,
    },
    FocusWindow {
        title: String,
    },
    /// A tool this build does not know; executed as a no-op.
    Unknown {
        tool: String,
        args: Value,
    },
}

pub const MAX_SLEEP_SECS: f64 = 5.0;
pub const MAX_CLICKS: u32 = 4;
pub const CLICK_INTERVAL_MS: (u64, u64) = (10, 1000);

impl Action {
    /// Decode a tool name plus argument object. Tool names are case-insensitive.
    pub fn decode(tool: &str, args: &Value) -> Result<Self, ArgError> {
        let empty = Map::new();
        let a = args.as_object().unwrap_or(&empty);
        let name = tool.trim().to_lowercase();

        let action = match name.as_str() {
            "sleep" => {
                let secs = a
                    .get("secs")
                    .ok_or(ArgError::Missing("secs"))?
                    .as_f64()
                    .ok_or(ArgError::Invalid {
                        field: "secs",
                        expected: "a number",
                    })?;
                Action::Sleep {
                    secs: if secs.is_finite() {
                        secs.clamp(0.0, MAX_SLEEP_SECS)
                    } else {
                        0.0
                    },
                }
            }
            "press" => Action::Press { keys: read_keys(a)? },
            "hotkey" => {
                let (modifiers, normals) = split_modifiers(read_keys(a)?);
                Action::Hotkey { modifiers, normals }
            }
            "write" | "type" => Action::Write {
                text: required_str(a, "text")?,
                interval: optional_u64(a, "interval_ms")?.map(Duration::from_millis),
            },
            "paste" => Action::Paste {
                text: required_str(a, "text")?,
                restore_clipboard: optional_bool(a, "restore_clipboard")?.unwrap_or(false),
            },
            "launch" => Action::Launch {
                command: required_str(a, "command")?,
            },
            "mouse" => {
                let x = required_i64(a, "x")?;
                let y = required_i64(a, "y")?;
                let button = optional_str(a, "button")?
                    .map(|b| MouseButton::from_name(&b))
                    .unwrap_or_default();
                let clicks = optional_u64(a, "clicks")?
                    .map(|c| c.clamp(1, MAX_CLICKS as u64) as u32)
                    .unwrap_or(1);
                let interval = optional_u64(a, "interval_ms")?
                    .map(|ms| Duration::from_millis(ms.clamp(CLICK_INTERVAL_MS.0, CLICK_INTERVAL_MS.1)));
                let move_only = optional_str(a, "action")?
                    .is_some_and(|s| s.trim().eq_ignore_ascii_case("move"));
                Action::Mouse {
                    x,
                    y,
                    button,
                    clicks,
                    interval,
                    move_only,
                }
            }
            "focus_window" => Action::FocusWindow {
                title: required_str(a, "title")?,
            },
            _ => Action::Unknown {
                tool: tool.to_string(),
                args: args.clone(),
            },
        };
        Ok(action)
    }

    /// Canonical tool name.
    pub fn tool_name(&self) -> &str {
        match self {
            Action::Sleep { .. } => "sleep",
            Action::Press { .. } => "press",
            Action::Hotkey { .. } => "hotkey",
            Action::Write { .. } => "write",
            Action::Paste { .. } => "paste",
            Action::Launch { .. } => "launch",
            Action::Mouse { .. } => "mouse",
            Action::FocusWindow { .. } => "focus_window",
            Action::Unknown { tool, .. } => tool,
        }
    }
}

/// Split keys into modifiers and everything else, keeping order.
pub fn split_modifiers(keys: Vec<VirtualKey>) -> (Vec<VirtualKey>, Vec<VirtualKey>) {
    keys.into_iter().partition(|k| k.is_modifier())
}

/// Collect keys from `key` (string) and `keys` (array of strings), in that order.
/// Unrecognized names are dropped with a warning.
fn read_keys(a: &Map<String, Value>) -> Result<Vec<VirtualKey>, ArgError> {
    let mut names: Vec<&str> = Vec::new();
    match a.get("key") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => names.push(s),
        Some(_) => {
            return Err(ArgError::Invalid {
                field: "key",
                expected: "a string",
            })
        }
    }
    match a.get("keys") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => names.extend(items.iter().filter_map(Value::as_str)),
        Some(Value::String(s)) => names.push(s),
        Some(_) => {
            return Err(ArgError::Invalid {
                field: "keys",
                expected: "an array of strings",
            })
        }
    }

    let mut keys = Vec::with_capacity(names.len());
    for name in names {
        match VirtualKey::parse(name) {
            Some(k) => keys.push(k),
            None => warn!(key = name, "Unknown key name ignored"),
        }
    }
    if keys.is_empty() {
        return Err(ArgError::NoKeys);
    }
    Ok(keys)
}

fn required_str(a: &Map<String, Value>, field: &'static str) -> Result<String, ArgError> {
    optional_str(a, field)?.ok_or(ArgError::Missing(field))
}

fn optional_str(a: &Map<String, Value>, field: &'static str) -> Result<Option<String>, ArgError> {
    match a.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ArgError::Invalid {
            field,
            expected: "a string",
        }),
    }
}

fn required_i64(a: &Map<String, Value>, field: &'static str) -> Result<i64, ArgError> {
    let v = a.get(field).ok_or(ArgError::Missing(field))?;
    v.as_i64().ok_or(ArgError::Invalid {
        field,
        expected: "an integer",
    })
}

fn optional_u64(a: &Map<String, Value>, field: &'static str) -> Result<Option<u64>, ArgError> {
    match a.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            // Negative values clamp to zero rather than failing
            if let Some(n) = v.as_i64() {
                return Ok(Some(n.max(0) as u64));
            }
            v.as_u64().map(Some).ok_or(ArgError::Invalid {
                field,
                expected: "an integer",
            })
        }
    }
}

fn optional_bool(a: &Map<String, Value>, field: &'static str) -> Result<Option<bool>, ArgError> {
    match a.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ArgError::Invalid {
            field,
            expected: "a boolean",
        }),
    }
}
