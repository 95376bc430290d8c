use bodyfat_bridge::PhotoType;
use dioxus::prelude::*;

/// Props for the [`PhotoTypePicker`] component.
#[derive(Props, Clone, PartialEq)]
pub struct PhotoTypePickerProps {
    /// Currently selected type.
    selected: PhotoType,
    /// Called when the user picks a different type.
    on_change: EventHandler<PhotoType>,
}

/// Select box for the angle the photo was taken from.
#[component]
pub fn PhotoTypePicker(props: PhotoTypePickerProps) -> Element {
    let selected = props.selected;
    let on_change = props.on_change;

    rsx! {
        label { class: "photo-type",
            span { class: "muted small", "Photo type" }
            select {
                onchange: move |evt: FormEvent| {
                    if let Some(photo_type) = PhotoType::parse(&evt.value()) {
                        on_change.call(photo_type);
                    }
                },
                for photo_type in PhotoType::ALL {
                    option {
                        key: "{photo_type}",
                        value: photo_type.as_str(),
                        selected: photo_type == selected,
                        {photo_type.label()}
                    }
                }
            }
        }
    }
}
