//! `window.openai` adapter.
//!
//! The host injects a global object exposing the current tool input and
//! output, the persisted widget state, theme and display mode, plus
//! `callTool` and `setWidgetState`. The object is not reactive, so this
//! module only offers point-in-time reads; the observer in
//! `bodyfat-bridge` turns them into a polled snapshot.
//!
//! Values cross the JS boundary as JSON text. Every read tolerates a
//! missing or malformed field by falling back to the snapshot default.

use bodyfat_bridge::{
    DisplayMode, HostBridge, HostSnapshot, InvocationError, Theme, ToolChannel, WidgetState,
};
use dioxus::logger::tracing;
use js_sys::{Function, JSON, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Name of the host global on `window`.
const HOST_GLOBAL: &str = "openai";

/// Errors from talking to the host object.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A host API call threw or rejected.
    #[error("host API error: {0}")]
    JsError(String),

    /// The host object lacks the named method.
    #[error("host method `{0}` is not available")]
    MissingMethod(&'static str),

    /// A value could not be converted to or from JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<JsValue> for HostError {
    fn from(value: JsValue) -> Self {
        Self::JsError(js_message(&value))
    }
}

/// Handle to the host's `window.openai` object.
#[derive(Debug, Clone)]
pub struct OpenAiHost {
    global: Object,
}

impl OpenAiHost {
    /// Look up the host object. `None` when running outside a host.
    #[must_use]
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let value = Reflect::get(&window, &JsValue::from_str(HOST_GLOBAL)).ok()?;
        if !value.is_object() {
            tracing::debug!("window.{HOST_GLOBAL} not found; running standalone");
            return None;
        }
        Some(Self {
            global: value.unchecked_into(),
        })
    }

    /// Whether the host exposes `callTool`.
    #[must_use]
    pub fn has_tool_channel(&self) -> bool {
        self.method("callTool").is_some()
    }

    fn field(&self, key: &str) -> Option<JsValue> {
        Reflect::get(&self.global, &JsValue::from_str(key))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }

    fn json_field(&self, key: &str) -> Option<Value> {
        let value = self.field(key)?;
        match from_js(&value) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!("ignoring unreadable host field {key}: {e}");
                None
            }
        }
    }

    fn string_field(&self, key: &str) -> Option<String> {
        self.field(key)?.as_string()
    }

    fn method(&self, name: &str) -> Option<Function> {
        self.field(name)
            .filter(JsValue::is_function)
            .map(|f| f.unchecked_into::<Function>())
    }

    fn try_set_widget_state(&self, state: &WidgetState) -> Result<(), HostError> {
        let set = self
            .method("setWidgetState")
            .ok_or(HostError::MissingMethod("setWidgetState"))?;
        let returned = set.call1(&self.global, &to_js(state.as_value())?)?;

        // Some hosts return a promise; surface a rejection in the log.
        if let Ok(promise) = returned.dyn_into::<Promise>() {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    tracing::warn!("setWidgetState rejected: {}", js_message(&e));
                }
            });
        }
        Ok(())
    }
}

impl HostBridge for OpenAiHost {
    fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            tool_input: self.json_field("toolInput").unwrap_or_default(),
            tool_output: self.json_field("toolOutput"),
            widget_state: self.json_field("widgetState").map(WidgetState::new),
            theme: self
                .string_field("theme")
                .and_then(|t| Theme::from_host(&t))
                .unwrap_or_default(),
            display_mode: self
                .string_field("displayMode")
                .and_then(|m| DisplayMode::from_host(&m))
                .unwrap_or_default(),
        }
    }

    fn set_widget_state(&self, state: &WidgetState) {
        if let Err(e) = self.try_set_widget_state(state) {
            tracing::warn!("failed to persist widget state: {e}");
        }
    }
}

impl ToolChannel for OpenAiHost {
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, InvocationError> {
        let Some(call) = self.method("callTool") else {
            return Err(InvocationError::BridgeUnavailable {
                tool: name.to_owned(),
            });
        };
        let args = to_js(&args).map_err(|e| InvocationError::Rejected(e.to_string()))?;
        let returned = call
            .call2(&self.global, &JsValue::from_str(name), &args)
            .map_err(|e| InvocationError::Rejected(js_message(&e)))?;
        let resolved = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(|e| InvocationError::Rejected(js_message(&e)))?;

        if resolved.is_undefined() || resolved.is_null() {
            return Ok(Value::Null);
        }
        from_js(&resolved).map_err(|e| InvocationError::Rejected(e.to_string()))
    }
}

/// Convert a JSON value into a JS value.
fn to_js(value: &Value) -> Result<JsValue, HostError> {
    let text = serde_json::to_string(value)?;
    Ok(JSON::parse(&text)?)
}

/// Convert a JS value into a JSON value.
fn from_js(value: &JsValue) -> Result<Value, HostError> {
    let text: String = JSON::stringify(value)?.into();
    Ok(serde_json::from_str(&text)?)
}

/// Best-effort human-readable text for a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return error.message().into();
    }
    format!("{value:?}")
}
