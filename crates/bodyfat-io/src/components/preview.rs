use std::rc::Rc;

use bodyfat_bridge::types::format_size;
use dioxus::prelude::*;

/// Props for the [`PhotoPreview`] component.
#[derive(Props, Clone)]
pub struct PhotoPreviewProps {
    /// `data:` URI of the image, if it can be shown.
    src: Option<Rc<str>>,
    /// Original filename.
    name: String,
    /// Size in bytes.
    size: u64,
}

impl PartialEq for PhotoPreviewProps {
    fn eq(&self, other: &Self) -> bool {
        let same_src = match (&self.src, &other.src) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_src && self.name == other.name && self.size == other.size
    }
}

/// Thumbnail of the selected photo with its name and size.
#[component]
pub fn PhotoPreview(props: PhotoPreviewProps) -> Element {
    let size = format_size(props.size);

    rsx! {
        figure { class: "preview",
            if let Some(ref src) = props.src {
                img { src: "{src}", alt: "{props.name}" }
            }
            figcaption { class: "muted small", "{props.name} · {size}" }
        }
    }
}
