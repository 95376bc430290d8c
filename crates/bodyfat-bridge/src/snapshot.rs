//! The host-owned state snapshot and the widget's durable state.
//!
//! [`HostSnapshot`] is owned by the host and replaced wholesale between
//! polls; the widget only ever holds copies. [`WidgetState`] is the
//! payload the widget persists through the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Host color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light scheme (the default when the host does not say).
    #[default]
    Light,
    /// Dark scheme.
    Dark,
}

impl Theme {
    /// Parse the host's theme string. Unknown values yield `None`.
    #[must_use]
    pub fn from_host(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Lowercase name, as the host spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// How the host is presenting the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Embedded in the conversation flow.
    #[default]
    #[serde(alias = "inline")]
    Normal,
    /// Picture-in-picture.
    Pip,
    /// Occupying the whole host viewport.
    Fullscreen,
}

impl DisplayMode {
    /// Parse the host's display mode string. Unknown values yield `None`.
    ///
    /// Hosts that call the embedded mode `inline` map to
    /// [`DisplayMode::Normal`].
    #[must_use]
    pub fn from_host(value: &str) -> Option<Self> {
        match value {
            "normal" | "inline" => Some(Self::Normal),
            "pip" => Some(Self::Pip),
            "fullscreen" => Some(Self::Fullscreen),
            _ => None,
        }
    }

    /// Lowercase name, as the host spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Pip => "pip",
            Self::Fullscreen => "fullscreen",
        }
    }
}

/// Arbitrary JSON state the widget persists through the host.
///
/// An empty state is an empty JSON object, never `null`, so keys can
/// always be merged in with [`with`](Self::with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetState(Value);

impl Default for WidgetState {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl WidgetState {
    /// Wrap a JSON value. `null` becomes the empty state.
    #[must_use]
    pub fn new(value: Value) -> Self {
        if value.is_null() {
            Self::default()
        } else {
            Self(value)
        }
    }

    /// The underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Look up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a top-level key holding a non-empty string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        non_empty_str(self.0.get(key))
    }

    /// Return a copy with `key` set to `value`.
    ///
    /// A non-object state is replaced by an object holding only `key`.
    #[must_use]
    pub fn with(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut map = match &self.0 {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        map.insert(key.to_owned(), value.into());
        Self(Value::Object(map))
    }

    /// `true` for `{}`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_some_and(Map::is_empty)
    }
}

/// A full copy of the host's exposed state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSnapshot {
    /// Arguments of the last tool invocation (opaque).
    pub tool_input: Value,
    /// Result of the most recently completed tool invocation.
    pub tool_output: Option<Value>,
    /// Last durable state written by this widget.
    pub widget_state: Option<WidgetState>,
    /// Host color scheme.
    pub theme: Theme,
    /// Host presentation mode.
    pub display_mode: DisplayMode,
}

impl HostSnapshot {
    /// The structured payload of the latest tool output.
    ///
    /// Hosts either expose the tool result envelope (with a
    /// `structuredContent` member) or the structured content directly;
    /// both shapes are accepted.
    #[must_use]
    pub fn structured_output(&self) -> Option<&Value> {
        structured_content(self.tool_output.as_ref()?)
    }

    /// A string field from the latest tool input.
    #[must_use]
    pub fn tool_input_str(&self, key: &str) -> Option<&str> {
        non_empty_str(self.tool_input.get(key))
    }
}

/// The structured payload of a tool result, in either envelope shape.
#[must_use]
pub fn structured_content(output: &Value) -> Option<&Value> {
    match output.get("structuredContent") {
        Some(content) if !content.is_null() => Some(content),
        _ if output.is_object() => Some(output),
        _ => None,
    }
}

/// The identity the upload endpoint expects in its caller header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Wrap a non-blank identifier.
    #[must_use]
    pub fn new(id: &str) -> Option<Self> {
        let id = id.trim();
        (!id.is_empty()).then(|| Self(id.to_owned()))
    }

    /// Resolve the caller from a host snapshot.
    ///
    /// The host propagates the user id through the widget state, the
    /// tool input, or the structured output of the tool that opened
    /// the widget, checked in that order.
    #[must_use]
    pub fn from_snapshot(snapshot: &HostSnapshot) -> Option<Self> {
        const KEY: &str = "user_id";
        snapshot
            .widget_state
            .as_ref()
            .and_then(|s| s.get_str(KEY))
            .or_else(|| snapshot.tool_input_str(KEY))
            .or_else(|| non_empty_str(snapshot.structured_output()?.get(KEY)))
            .and_then(Self::new)
    }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Typed view of the state the upload tool hands to the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadWidgetState {
    /// Caller identity for the upload endpoint.
    pub user_id: String,
    /// Host conversation session, when the host provides one.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Maximum number of files the widget accepts at once.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Accepted filename extensions, e.g. `.jpg`.
    #[serde(default)]
    pub accepted_types: Vec<String>,
}

const fn default_max_files() -> usize {
    1
}

impl UploadWidgetState {
    /// Read the upload state from wherever the host put it.
    ///
    /// Checks the same sources as [`CallerId::from_snapshot`].
    #[must_use]
    pub fn from_snapshot(snapshot: &HostSnapshot) -> Option<Self> {
        let candidates = [
            snapshot.widget_state.as_ref().map(WidgetState::as_value),
            Some(&snapshot.tool_input),
            snapshot.structured_output(),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|v| serde_json::from_value::<Self>(v.clone()).ok())
            .filter(|s| !s.user_id.trim().is_empty())
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_snapshot_is_light_normal_and_empty() {
        let snapshot = HostSnapshot::default();
        assert_eq!(snapshot.theme, Theme::Light);
        assert_eq!(snapshot.display_mode, DisplayMode::Normal);
        assert!(snapshot.tool_input.is_null());
        assert!(snapshot.tool_output.is_none());
        assert!(snapshot.widget_state.is_none());
    }

    #[test]
    fn snapshot_deserializes_host_shape() {
        let snapshot: HostSnapshot = serde_json::from_value(json!({
            "toolInput": {"photo_id": "p1"},
            "toolOutput": {"structuredContent": {"photo_id": "p1"}},
            "widgetState": {"user_id": "u1"},
            "theme": "dark",
            "displayMode": "inline",
        }))
        .unwrap();
        assert_eq!(snapshot.theme, Theme::Dark);
        assert_eq!(snapshot.display_mode, DisplayMode::Normal);
        assert_eq!(snapshot.tool_input_str("photo_id"), Some("p1"));
        assert_eq!(
            snapshot.structured_output(),
            Some(&json!({"photo_id": "p1"}))
        );
    }

    #[test]
    fn structured_output_accepts_bare_content() {
        let snapshot = HostSnapshot {
            tool_output: Some(json!({"photo_id": "p2"})),
            ..HostSnapshot::default()
        };
        assert_eq!(
            snapshot.structured_output().and_then(|v| v.get("photo_id")),
            Some(&json!("p2"))
        );
    }

    #[test]
    fn display_mode_from_host() {
        assert_eq!(DisplayMode::from_host("fullscreen"), Some(DisplayMode::Fullscreen));
        assert_eq!(DisplayMode::from_host("inline"), Some(DisplayMode::Normal));
        assert_eq!(DisplayMode::from_host("sideways"), None);
        assert_eq!(Theme::from_host("dark"), Some(Theme::Dark));
        assert_eq!(Theme::from_host("sepia"), None);
    }

    #[test]
    fn widget_state_null_is_empty_object() {
        let state = WidgetState::new(Value::Null);
        assert!(state.is_empty());
        assert_eq!(state.as_value(), &json!({}));
    }

    #[test]
    fn widget_state_with_merges_keys() {
        let state = WidgetState::new(json!({"user_id": "u1"})).with("photo_id", "p1");
        assert_eq!(state.get_str("user_id"), Some("u1"));
        assert_eq!(state.get_str("photo_id"), Some("p1"));
    }

    #[test]
    fn caller_prefers_widget_state() {
        let snapshot = HostSnapshot {
            tool_input: json!({"user_id": "from-input"}),
            widget_state: Some(WidgetState::new(json!({"user_id": "from-state"}))),
            ..HostSnapshot::default()
        };
        assert_eq!(
            CallerId::from_snapshot(&snapshot).unwrap().as_str(),
            "from-state"
        );
    }

    #[test]
    fn caller_falls_back_to_tool_output() {
        let snapshot = HostSnapshot {
            tool_output: Some(json!({"structuredContent": {"user_id": "u9", "max_files": 1}})),
            ..HostSnapshot::default()
        };
        assert_eq!(CallerId::from_snapshot(&snapshot).unwrap().as_str(), "u9");
    }

    #[test]
    fn caller_ignores_blank_ids() {
        let snapshot = HostSnapshot {
            tool_input: json!({"user_id": "   "}),
            ..HostSnapshot::default()
        };
        assert_eq!(CallerId::from_snapshot(&snapshot), None);
        assert_eq!(CallerId::from_snapshot(&HostSnapshot::default()), None);
    }

    #[test]
    fn upload_widget_state_reads_defaults() {
        let snapshot = HostSnapshot {
            tool_output: Some(json!({"structuredContent": {"user_id": "u1"}})),
            ..HostSnapshot::default()
        };
        let state = UploadWidgetState::from_snapshot(&snapshot).unwrap();
        assert_eq!(state.user_id, "u1");
        assert_eq!(state.max_files, 1);
        assert!(state.accepted_types.is_empty());
    }
}
