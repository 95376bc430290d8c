use bodyfat_bridge::{FileCandidate, HostBridge, PhotoType, UploadWidgetState, WidgetConfig};
use bodyfat_io::{
    AnalysisSummary, OpenAiHost, PhotoDropZone, PhotoPreview, PhotoTypePicker, StatusBanner,
    use_host_snapshot, use_photo_workflow, use_widget_state,
};
use dioxus::prelude::*;

const WIDGET_CSS: &str = include_str!("../assets/widget.css");

fn main() {
    dioxus::launch(app);
}

/// Root widget component.
///
/// Detects the host, mounts the snapshot observer, widget state store
/// and upload workflow, and lays the widget out for the host's theme
/// and display mode.
fn app() -> Element {
    let host = use_hook(OpenAiHost::detect);
    let config = use_hook(|| {
        let initial = host.as_ref().map(HostBridge::snapshot).unwrap_or_default();
        WidgetConfig::default().with_host_overrides(&initial)
    });

    let snapshot = use_host_snapshot(host.clone(), config.poll_interval());
    let state = use_widget_state(host.clone(), snapshot);
    let workflow = use_photo_workflow(&config, host.clone(), snapshot, state);

    // Memos so the 100 ms republish only re-renders on real changes.
    let theme = use_memo(move || snapshot.read().theme);
    let display_mode = use_memo(move || snapshot.read().display_mode);
    let upload_state = use_memo(move || UploadWidgetState::from_snapshot(&snapshot.read()));

    let (max_files, extensions) = upload_state()
        .map_or((1, Vec::new()), |s| (s.max_files, s.accepted_types));
    let standalone = host.is_none();
    let root_class = format!(
        "widget theme-{} mode-{}",
        theme().as_str(),
        display_mode().as_str()
    );

    let session = workflow.session(|session| {
        session.map(|s| {
            (
                s.status(),
                s.message(),
                s.preview_data_uri(),
                s.file().name().to_owned(),
                s.file().size(),
                s.result().cloned(),
            )
        })
    });

    let on_type = {
        let workflow = workflow.clone();
        move |photo_type: PhotoType| workflow.set_photo_type(photo_type)
    };
    let on_files = {
        let workflow = workflow.clone();
        move |files: Vec<FileCandidate>| workflow.select(files)
    };

    rsx! {
        style { dangerous_inner_html: WIDGET_CSS }

        div { class: "{root_class}",
            header {
                h1 { "Body fat estimate" }
                p { class: "muted small",
                    "Upload a photo. Faces are blurred before the photo is analyzed."
                }
            }

            PhotoTypePicker {
                selected: workflow.photo_type(),
                on_change: on_type,
            }

            PhotoDropZone {
                policy: workflow.policy(),
                max_files: max_files,
                busy: workflow.is_busy(),
                extensions: extensions,
                on_files: on_files,
            }

            if let Some((status, message, src, name, size, result)) = session {
                div { class: "session",
                    PhotoPreview { src: src, name: name, size: size }
                    div { class: "session-detail",
                        StatusBanner { status: status, message: message }
                        if let Some(result) = result {
                            AnalysisSummary { result: result }
                        }
                    }
                }
            }

            if standalone {
                p { class: "muted small",
                    "Running outside a host: uploads need a signed-in user and analysis is unavailable."
                }
            }
        }
    }
}
