//! Session status line.

use bodyfat_bridge::SessionStatus;
use dioxus::prelude::*;

/// Props for the [`StatusBanner`] component.
#[derive(Props, Clone, PartialEq)]
pub struct StatusBannerProps {
    /// Session status, which picks the styling.
    status: SessionStatus,
    /// Text to show. Errors replace the status text.
    message: String,
}

/// One-line status, styled as progress, success or error.
#[component]
pub fn StatusBanner(props: StatusBannerProps) -> Element {
    let tone = match props.status {
        SessionStatus::Complete => "status success",
        s if s.is_failure() => "status error",
        SessionStatus::Ready => "status",
        _ => "status pending",
    };
    let role = if props.status.is_failure() {
        "alert"
    } else {
        "status"
    };

    rsx! {
        div { class: "{tone}", role: "{role}",
            p { "{props.message}" }
        }
    }
}
