//! # Plan Parser
//!
//! Turns whatever text the model sent back into a validated [`ActionPlan`].
//!
//! Model output arrives in several shapes: the bare plan object, the plan in
//! a markdown code fence, or the plan embedded in a provider response
//! envelope. Content is located by an ordered list of extraction strategies
//! (first hit wins) and then validated against the plan schema.
//!
//! Parsing never panics and never returns a partially valid plan: the result
//! is either a complete plan or a [`ParseError`] with a readable reason.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a model response was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty content.")]
    Empty,

    #[error("Inner content empty.")]
    InnerEmpty,

    #[error("JSON parse failed: {0}")]
    Json(String),

    #[error("Invalid 'done' (must be null/false|string).")]
    InvalidDone,

    #[error("Step missing 'tool'.")]
    MissingTool,

    #[error("Step missing 'args' object.")]
    MissingArgs,

    #[error("Step missing 'human_readable_justification'.")]
    MissingJustification,
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub tool: String,
    /// Always a JSON object once validated
    pub args: Value,
    #[serde(rename = "human_readable_justification")]
    pub justification: String,
}

impl Step {
    pub fn new(tool: impl Into<String>, args: Value, justification: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            justification: justification.into(),
        }
    }

    pub fn args_object(&self) -> Option<&Map<String, Value>> {
        self.args.as_object()
    }
}

/// The validated plan for one model turn.
///
/// `done` is `None` while the model is still working. A plan may carry both
/// steps and `done`; the steps take priority and `done` only counts once no
/// steps remain (see [`ActionPlan::is_complete`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPlan {
    pub steps: Vec<Step>,
    pub done: Option<String>,
}

impl ActionPlan {
    /// Zero steps and a non-empty completion message.
    pub fn is_complete(&self) -> bool {
        self.steps.is_empty() && self.done.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Wire shape before validation.
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Option<Vec<RawStep>>,
    #[serde(default)]
    done: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    args: Option<Value>,
    #[serde(default)]
    human_readable_justification: Option<String>,
}

/// Remove a surrounding markdown code fence, if any, and trim.
///
/// The opening fence line (with its optional language tag) and everything
/// from the last closing fence onwards are dropped.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some(newline) = trimmed.find('\n') else {
        return trimmed;
    };
    let inner = &trimmed[newline + 1..];
    let inner = match inner.rfind("```") {
        Some(end) => &inner[..end],
        None => inner,
    };
    inner.trim()
}

/// Candidate content located in a model response.
type Strategy = fn(raw: &str, stripped: &str) -> Option<String>;

/// Extraction strategies in priority order.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", direct_plan),
    ("output_text", envelope_output_text),
    ("output[0]", envelope_single_output),
    ("output[1].content[0].text", envelope_second_output),
    ("fenced-json", json_looking),
];

/// The fence-stripped text itself, when it is an object with a `steps` key.
fn direct_plan(_raw: &str, stripped: &str) -> Option<String> {
    if !stripped.starts_with('{') {
        return None;
    }
    let v: Value = serde_json::from_str(stripped).ok()?;
    v.as_object()?.contains_key("steps").then(|| stripped.to_string())
}

fn envelope(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

fn envelope_output_text(raw: &str, _stripped: &str) -> Option<String> {
    envelope(raw)?
        .get("output_text")?
        .as_str()
        .map(str::to_string)
}

fn envelope_single_output(raw: &str, _stripped: &str) -> Option<String> {
    let v = envelope(raw)?;
    match v.get("output")?.as_array()?.as_slice() {
        [only] => only.as_str().map(str::to_string),
        _ => None,
    }
}

fn envelope_second_output(raw: &str, _stripped: &str) -> Option<String> {
    let v = envelope(raw)?;
    let output = v.get("output")?.as_array()?;
    if output.len() < 2 {
        return None;
    }
    output[1]
        .get("content")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

fn json_looking(_raw: &str, stripped: &str) -> Option<String> {
    stripped.starts_with('{').then(|| stripped.to_string())
}

/// Locate the plan text inside a response. Blank candidates are skipped.
pub fn extract_content(raw: &str) -> Option<String> {
    let stripped = strip_code_fence(raw);
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(raw, stripped).filter(|c| !c.trim().is_empty())?;
        tracing::trace!(strategy = name, "Plan content located");
        Some(found)
    })
}

/// Parse and validate a model response.
pub fn parse_plan(raw: &str) -> ParseResult<ActionPlan> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let content = extract_content(raw).ok_or(ParseError::InnerEmpty)?;
    validate(&content)
}

/// Validate located content against the plan schema.
pub fn validate(content: &str) -> ParseResult<ActionPlan> {
    let raw: RawPlan = serde_json::from_str(content).map_err(|e| ParseError::Json(e.to_string()))?;

    let done = match raw.done {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => return Err(ParseError::InvalidDone),
    };

    let mut steps = Vec::new();
    for s in raw.steps.unwrap_or_default() {
        let tool = s
            .tool
            .filter(|t| !t.trim().is_empty())
            .ok_or(ParseError::MissingTool)?;
        let args = s
            .args
            .filter(Value::is_object)
            .ok_or(ParseError::MissingArgs)?;
        let justification = s
            .human_readable_justification
            .filter(|j| !j.trim().is_empty())
            .ok_or(ParseError::MissingJustification)?;
        steps.push(Step {
            tool,
            args,
            justification,
        });
    }

    Ok(ActionPlan { steps, done })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAN: &str = r#"{"steps":[{"tool":"press","args":{"key":"enter"},"human_readable_justification":"Confirm"}],"done":null}"#;

    #[test]
    fn test_direct_plan() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, "press");
        assert_eq!(plan.steps[0].args, json!({"key": "enter"}));
        assert_eq!(plan.steps[0].justification, "Confirm");
        assert!(plan.done.is_none());
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_fenced_plan_matches_unwrapped() {
        let fenced = format!("```json\n{PLAN}\n```");
        assert_eq!(parse_plan(&fenced).unwrap(), parse_plan(PLAN).unwrap());

        let bare_fence = format!("  ```\n{PLAN}\n```  \n");
        assert_eq!(parse_plan(&bare_fence).unwrap(), parse_plan(PLAN).unwrap());
    }

    #[test]
    fn test_envelope_second_output() {
        let raw = json!({
            "output": [
                {"type": "reasoning"},
                {"type": "message", "content": [{"type": "output_text", "text": "{\"steps\":[],\"done\":\"ok\"}"}]}
            ]
        })
        .to_string();
        let plan = parse_plan(&raw).unwrap();
        assert!(plan.steps.is_empty());
        assert_eq!(plan.done.as_deref(), Some("ok"));
        assert!(plan.is_complete());
    }

    #[test]
    fn test_envelope_output_text_and_single_output() {
        let raw = json!({"output_text": PLAN, "output": []}).to_string();
        assert_eq!(parse_plan(&raw).unwrap().steps.len(), 1);

        let raw = json!({"output": [PLAN]}).to_string();
        assert_eq!(parse_plan(&raw).unwrap().steps.len(), 1);
    }

    #[test]
    fn test_json_without_steps_falls_back_to_content() {
        let plan = parse_plan(r#"{"done":"finished"}"#).unwrap();
        assert!(plan.is_complete());
    }

    #[test]
    fn test_args_must_be_object() {
        let raw = r#"{"steps":[{"tool":"press","args":"foo","human_readable_justification":"x"}],"done":null}"#;
        assert_eq!(parse_plan(raw), Err(ParseError::MissingArgs));

        let raw = r#"{"steps":[{"tool":"press","args":[1],"human_readable_justification":"x"}]}"#;
        assert_eq!(parse_plan(raw), Err(ParseError::MissingArgs));

        let raw = r#"{"steps":[{"tool":"press","human_readable_justification":"x"}]}"#;
        assert_eq!(parse_plan(raw), Err(ParseError::MissingArgs));
    }

    #[test]
    fn test_missing_tool_and_justification() {
        let raw = r#"{"steps":[{"tool":"  ","args":{},"human_readable_justification":"x"}]}"#;
        assert_eq!(parse_plan(raw), Err(ParseError::MissingTool));

        let raw = r#"{"steps":[{"tool":"sleep","args":{"secs":1}}]}"#;
        assert_eq!(parse_plan(raw), Err(ParseError::MissingJustification));
    }

    #[test]
    fn test_done_shapes() {
        assert!(parse_plan(r#"{"steps":[],"done":false}"#).unwrap().done.is_none());
        assert!(parse_plan(r#"{"steps":[],"done":""}"#).unwrap().done.is_none());
        assert!(parse_plan(r#"{"steps":[]}"#).unwrap().done.is_none());
        assert_eq!(parse_plan(r#"{"steps":[],"done":true}"#), Err(ParseError::InvalidDone));
        assert_eq!(parse_plan(r#"{"steps":[],"done":{"a":1}}"#), Err(ParseError::InvalidDone));
        assert_eq!(parse_plan(r#"{"steps":[],"done":3}"#), Err(ParseError::InvalidDone));
    }

    #[test]
    fn test_steps_take_priority_over_done() {
        let raw = r#"{"steps":[{"tool":"sleep","args":{"secs":0},"human_readable_justification":"wait"}],"done":"all set"}"#;
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.done.as_deref(), Some("all set"));
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_empty_and_non_json() {
        assert_eq!(parse_plan("   \n"), Err(ParseError::Empty));
        assert_eq!(parse_plan("I will click the button"), Err(ParseError::InnerEmpty));
        assert!(matches!(parse_plan("{not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```{}```"), "```{}```");
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}"), "{\"a\":1}");
    }
}
