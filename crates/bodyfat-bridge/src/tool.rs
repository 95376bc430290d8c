//! Tool invocation contract and result correlation.
//!
//! A tool call's result usually arrives out-of-band in the host
//! snapshot's `toolOutput`. Each call carries the server-assigned photo
//! id. An observed output counts as ours when it names the same photo,
//! or, when it names none, when the host's record of the call arguments
//! (`toolInput`) does. The analysis tool never echoes the photo id, so
//! the second rule is the common one.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool that anonymizes and analyzes an uploaded photo.
pub const PROCESS_PHOTO_TOOL: &str = "process_photo";

/// Argument key carrying the correlation id.
pub const PHOTO_ID_ARG: &str = "photo_id";

/// Errors from the tool invocation step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// The environment provides no tool channel; nothing was sent.
    #[error("host bridge unavailable: cannot call tool `{tool}` outside a host")]
    BridgeUnavailable {
        /// The tool that could not be called.
        tool: String,
    },

    /// The host rejected the call.
    #[error("tool call rejected: {0}")]
    Rejected(String),

    /// The tool ran and reported a failure.
    #[error("{0}")]
    ToolFailed(String),
}

/// One pending tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Tool name.
    pub name: String,
    /// JSON arguments.
    pub args: Value,
    /// Correlation id expected in the result.
    pub photo_id: String,
}

impl ToolCall {
    /// Build the call that processes `photo_id`.
    #[must_use]
    pub fn process_photo(name: &str, photo_id: &str) -> Self {
        Self {
            name: name.to_owned(),
            args: json!({ PHOTO_ID_ARG: photo_id }),
            photo_id: photo_id.to_owned(),
        }
    }
}

/// Confidence the analysis reports in its estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Low confidence.
    Low,
    /// Medium confidence.
    Medium,
    /// High confidence.
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

/// Quality the analysis assigns to the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoQuality {
    /// Poor.
    Poor,
    /// Fair.
    Fair,
    /// Good.
    Good,
    /// Excellent.
    Excellent,
}

impl fmt::Display for PhotoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Poor => "Poor",
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        })
    }
}

/// Structured result of a completed analysis.
///
/// Every field is optional on the wire. `photo_id` is filled in from
/// the correlation id when the payload leaves it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analyzed photo (the correlation id).
    #[serde(default)]
    pub photo_id: String,
    /// Stored analysis record.
    #[serde(default)]
    pub analysis_id: Option<String>,
    /// Estimated body fat percentage.
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    /// Confidence in the estimate.
    #[serde(default)]
    pub confidence: Option<Confidence>,
    /// Assessed photo quality.
    #[serde(default)]
    pub photo_quality: Option<PhotoQuality>,
    /// Short explanation of the estimate.
    #[serde(default)]
    pub reasoning: Option<String>,
    /// ISO-8601 creation time.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Whether faces were blurred before analysis.
    #[serde(default)]
    pub faces_anonymized: Option<bool>,
}

/// How an observed tool output relates to a pending call.
#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    /// The output is the result for our photo.
    Complete(AnalysisResult),
    /// The output is an error for our call.
    Failed(String),
    /// The output belongs to some other call, or there is none.
    Unrelated,
}

/// Match a structured tool output against the photo we are waiting on.
///
/// `tool_input` is the host's record of the last call's arguments. It
/// decides ownership of payloads that do not name a photo: errors, and
/// analysis results, which carry `analysis_id` and the estimate but no
/// photo id.
#[must_use]
pub fn correlate(photo_id: &str, tool_input: &Value, structured: Option<&Value>) -> Correlation {
    let Some(content) = structured else {
        return Correlation::Unrelated;
    };

    match content.get(PHOTO_ID_ARG).and_then(Value::as_str) {
        Some(named) if named == photo_id => return parse_result(photo_id, content),
        Some(_) => return Correlation::Unrelated,
        None => {}
    }

    if tool_input.get(PHOTO_ID_ARG).and_then(Value::as_str) != Some(photo_id) {
        return Correlation::Unrelated;
    }
    if let Some(error) = content.get("error").and_then(Value::as_str) {
        return Correlation::Failed(error.to_owned());
    }
    if is_analysis(content) {
        return parse_result(photo_id, content);
    }
    Correlation::Unrelated
}

/// Interpret the structured reply to our own call for `photo_id`.
///
/// The reply belongs to the call by construction, so any structured
/// content that is not an error completes the session. Content naming a
/// different photo is still rejected.
#[must_use]
pub fn correlate_ack(photo_id: &str, structured: Option<&Value>) -> Correlation {
    let Some(content) = structured else {
        return Correlation::Unrelated;
    };
    if let Some(error) = content.get("error").and_then(Value::as_str) {
        return Correlation::Failed(error.to_owned());
    }
    match content.get(PHOTO_ID_ARG).and_then(Value::as_str) {
        Some(named) if named != photo_id => Correlation::Unrelated,
        _ => parse_result(photo_id, content),
    }
}

/// Whether `content` looks like an analysis rather than some other
/// tool's structured output.
fn is_analysis(content: &Value) -> bool {
    ["analysis_id", "body_fat_percentage"]
        .iter()
        .any(|key| content.get(key).is_some_and(|v| !v.is_null()))
}

fn parse_result(photo_id: &str, content: &Value) -> Correlation {
    match serde_json::from_value::<AnalysisResult>(content.clone()) {
        Ok(mut result) => {
            if result.photo_id.is_empty() {
                photo_id.clone_into(&mut result.photo_id);
            }
            Correlation::Complete(result)
        }
        Err(e) => Correlation::Failed(format!("unreadable analysis result: {e}")),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn process_photo_call_carries_photo_id() {
        let call = ToolCall::process_photo(PROCESS_PHOTO_TOOL, "p1");
        assert_eq!(call.name, "process_photo");
        assert_eq!(call.args, json!({"photo_id": "p1"}));
        assert_eq!(call.photo_id, "p1");
    }

    #[test]
    fn matching_photo_id_completes() {
        let output = json!({"photo_id": "p1"});
        let Correlation::Complete(result) = correlate("p1", &Value::Null, Some(&output)) else {
            panic!("expected completion");
        };
        assert_eq!(result.photo_id, "p1");
        assert_eq!(result.body_fat_percentage, None);
    }

    #[test]
    fn full_result_is_parsed() {
        let output = json!({
            "photo_id": "p1",
            "analysis_id": "a1",
            "body_fat_percentage": 18.5,
            "confidence": "high",
            "photo_quality": "good",
            "reasoning": "Visible abdominal definition.",
            "created_at": "2025-01-01T00:00:00Z",
            "faces_anonymized": true
        });
        let Correlation::Complete(result) = correlate("p1", &Value::Null, Some(&output)) else {
            panic!("expected completion");
        };
        assert_eq!(result.confidence, Some(Confidence::High));
        assert_eq!(result.photo_quality, Some(PhotoQuality::Good));
        assert_eq!(result.analysis_id.as_deref(), Some("a1"));
    }

    #[test]
    fn other_photo_is_unrelated() {
        let output = json!({"photo_id": "p0"});
        assert_eq!(
            correlate("p1", &Value::Null, Some(&output)),
            Correlation::Unrelated
        );
        assert_eq!(correlate("p1", &Value::Null, None), Correlation::Unrelated);
    }

    #[test]
    fn error_for_our_call_fails() {
        let output = json!({"error": "Photo not found"});
        let input = json!({"photo_id": "p1"});
        assert_eq!(
            correlate("p1", &input, Some(&output)),
            Correlation::Failed("Photo not found".into())
        );
    }

    #[test]
    fn error_for_other_call_is_unrelated() {
        let output = json!({"error": "rate_limit_exceeded"});
        let input = json!({});
        assert_eq!(
            correlate("p1", &input, Some(&output)),
            Correlation::Unrelated
        );
    }

    #[test]
    fn unreadable_result_fails() {
        let output = json!({"photo_id": "p1", "confidence": "certain"});
        assert!(matches!(
            correlate("p1", &Value::Null, Some(&output)),
            Correlation::Failed(_)
        ));
    }

    /// Structured content exactly as the analysis tool formats it.
    fn analysis_payload() -> Value {
        json!({
            "analysis_id": "a1",
            "body_fat_percentage": 21.5,
            "confidence": "medium",
            "photo_quality": "fair",
            "reasoning": "Moderate definition.",
            "created_at": "2025-01-01T00:00:00",
            "faces_anonymized": true
        })
    }

    #[test]
    fn result_without_photo_id_matches_through_tool_input() {
        let input = json!({"photo_id": "p1"});
        let output = analysis_payload();
        let Correlation::Complete(result) = correlate("p1", &input, Some(&output)) else {
            panic!("expected completion");
        };
        assert_eq!(result.photo_id, "p1");
        assert_eq!(result.analysis_id.as_deref(), Some("a1"));
        assert_eq!(result.body_fat_percentage, Some(21.5));
        assert_eq!(result.confidence, Some(Confidence::Medium));
    }

    #[test]
    fn result_without_photo_id_for_other_call_is_unrelated() {
        let output = analysis_payload();
        assert_eq!(
            correlate("p1", &json!({"photo_id": "p0"}), Some(&output)),
            Correlation::Unrelated
        );
        assert_eq!(
            correlate("p1", &Value::Null, Some(&output)),
            Correlation::Unrelated
        );
    }

    #[test]
    fn non_analysis_output_for_our_input_keeps_waiting() {
        let input = json!({"photo_id": "p1"});
        let output = json!({"user_id": "u1", "max_files": 1});
        assert_eq!(
            correlate("p1", &input, Some(&output)),
            Correlation::Unrelated
        );
    }

    #[test]
    fn ack_without_photo_id_completes() {
        let output = analysis_payload();
        let Correlation::Complete(result) = correlate_ack("p1", Some(&output)) else {
            panic!("expected completion");
        };
        assert_eq!(result.photo_id, "p1");
        assert_eq!(result.photo_quality, Some(PhotoQuality::Fair));
    }

    #[test]
    fn ack_error_and_foreign_photo() {
        assert_eq!(
            correlate_ack("p1", Some(&json!({"error": "AI analysis produced invalid results"}))),
            Correlation::Failed("AI analysis produced invalid results".into())
        );
        assert_eq!(
            correlate_ack("p1", Some(&json!({"photo_id": "p0"}))),
            Correlation::Unrelated
        );
        assert_eq!(correlate_ack("p1", None), Correlation::Unrelated);
    }

    #[test]
    fn bridge_unavailable_message_names_the_bridge() {
        let err = InvocationError::BridgeUnavailable {
            tool: PROCESS_PHOTO_TOOL.into(),
        };
        assert!(err.to_string().contains("host bridge unavailable"));
    }
}
