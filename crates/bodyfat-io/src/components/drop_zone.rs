//! Photo drop target with a fallback file picker.

use bodyfat_bridge::{DragController, DragInput, FileCandidate, ValidationPolicy};
use dioxus::html::{FileData, HasFileData};
use dioxus::logger::tracing;
use dioxus::prelude::*;

/// Props for the [`PhotoDropZone`] component.
#[derive(Props, Clone, PartialEq)]
pub struct PhotoDropZoneProps {
    /// Limits shown in the hint and applied to the picker's `accept`.
    policy: ValidationPolicy,
    /// How many files to read from one drop or pick.
    #[props(default = 1)]
    max_files: usize,
    /// Dims the zone while a session is in flight. Drops are still
    /// accepted and replace the running session.
    #[props(default)]
    busy: bool,
    /// Extra filename extensions for the picker's `accept`.
    #[props(default)]
    extensions: Vec<String>,
    /// Called with the files read from a drop or pick.
    on_files: EventHandler<Vec<FileCandidate>>,
}

/// Read up to `limit` files into candidates, sniffing their type from
/// the content.
async fn read_candidates(files: Vec<FileData>, limit: usize) -> Result<Vec<FileCandidate>, String> {
    let mut candidates = Vec::new();
    for file in files.into_iter().take(limit.max(1)) {
        let name = file.name();
        let bytes = file
            .read_bytes()
            .await
            .map_err(|e| format!("Failed to read {name}: {e}"))?;
        candidates.push(FileCandidate::sniffed(name, bytes.to_vec()));
    }
    Ok(candidates)
}

/// A drag-and-drop zone with a file picker button.
///
/// Every drag event has its default action suppressed so the browser
/// never navigates to a dropped file. Files are forwarded unvalidated;
/// validation happens when the workflow starts a session.
#[component]
pub fn PhotoDropZone(props: PhotoDropZoneProps) -> Element {
    let mut drag = use_signal(DragController::new);
    let mut read_error = use_signal(|| Option::<String>::None);
    let limit = props.max_files;
    let on_files = props.on_files;

    // Shared by the picker and drop paths.
    let deliver = move |files: Vec<FileData>| async move {
        if files.is_empty() {
            return;
        }
        match read_candidates(files, limit).await {
            Ok(candidates) => {
                read_error.set(None);
                on_files.call(candidates);
            }
            Err(e) => {
                tracing::error!("{e}");
                read_error.set(Some(e));
            }
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        deliver(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        let outcome = drag.write().handle(DragInput::Drop(evt.files()));
        if outcome.prevent_default {
            evt.prevent_default();
        }
        if let Some(files) = outcome.dropped {
            deliver(files).await;
        }
    };

    let dragging = drag.read().is_dragging();
    let mut zone_class = String::from("drop-zone");
    if dragging {
        zone_class.push_str(" dragging");
    }
    if props.busy {
        zone_class.push_str(" busy");
    }
    let accept = props.policy.accept_with(&props.extensions);
    let summary = props.policy.summary();

    rsx! {
        div {
            class: "{zone_class}",
            ondragenter: move |evt: DragEvent| {
                if drag.write().handle::<FileData>(DragInput::Enter).prevent_default {
                    evt.prevent_default();
                }
            },
            ondragover: move |evt: DragEvent| {
                if drag.write().handle::<FileData>(DragInput::Over).prevent_default {
                    evt.prevent_default();
                }
            },
            ondragleave: move |evt: DragEvent| {
                if drag.write().handle::<FileData>(DragInput::Leave).prevent_default {
                    evt.prevent_default();
                }
            },
            ondrop: handle_drop,

            p { class: "drop-zone-title",
                if dragging { "Release to upload" } else { "Drop a photo here or" }
            }

            label { class: "button",
                input {
                    r#type: "file",
                    accept: "{accept}",
                    multiple: limit > 1,
                    class: "hidden",
                    onchange: handle_files,
                }
                "Choose photo"
            }

            p { class: "muted small", "{summary}" }

            if let Some(ref err) = read_error() {
                p { class: "error-text", "{err}" }
            }
        }
    }
}
