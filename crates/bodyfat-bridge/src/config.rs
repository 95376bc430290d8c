//! Widget configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::snapshot::HostSnapshot;
use crate::tool::PROCESS_PHOTO_TOOL;
use crate::types::PhotoType;
use crate::upload::upload_endpoint;
use crate::validate::ValidationPolicy;

/// API base used when neither the build nor the host supplies one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Key under which the host may override the API base at runtime.
pub const API_BASE_URL_KEY: &str = "api_base_url";

/// Tunables for one widget instance.
///
/// `Default` gives the production values. The API base can be baked in
/// at compile time through the `BODYFAT_API_BASE` environment variable
/// and overridden per mount by the host (see
/// [`with_host_overrides`](Self::with_host_overrides)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Base URL of the photo API, without a trailing `/upload`.
    pub api_base_url: String,

    /// Snapshot poll cadence in milliseconds.
    pub poll_interval_ms: u64,

    /// Size and type limits for selected files.
    pub validation: ValidationPolicy,

    /// Tool invoked with the uploaded photo's id.
    pub tool_name: String,

    /// Photo type preselected in the picker.
    pub default_photo_type: PhotoType,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base_url: option_env!("BODYFAT_API_BASE")
                .unwrap_or(DEFAULT_API_BASE_URL)
                .to_owned(),
            poll_interval_ms: 100,
            validation: ValidationPolicy::default(),
            tool_name: PROCESS_PHOTO_TOOL.to_owned(),
            default_photo_type: PhotoType::default(),
        }
    }
}

impl WidgetConfig {
    /// Poll cadence as a [`Duration`]. Never zero.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(if self.poll_interval_ms == 0 {
            1
        } else {
            self.poll_interval_ms
        })
    }

    /// Full URL of the upload endpoint.
    #[must_use]
    pub fn upload_endpoint(&self) -> String {
        upload_endpoint(&self.api_base_url)
    }

    /// Apply values the host supplied at mount.
    ///
    /// An `api_base_url` string in the widget state takes precedence
    /// over one in the tool input.
    #[must_use]
    pub fn with_host_overrides(mut self, snapshot: &HostSnapshot) -> Self {
        let base = snapshot
            .widget_state
            .as_ref()
            .and_then(|s| s.get_str(API_BASE_URL_KEY))
            .or_else(|| snapshot.tool_input_str(API_BASE_URL_KEY));
        if let Some(base) = base {
            tracing::debug!(api_base_url = base, "host overrides API base");
            base.clone_into(&mut self.api_base_url);
        }
        self
    }
}
