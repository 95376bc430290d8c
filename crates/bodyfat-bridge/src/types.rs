//! Shared types for the photo upload workflow.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Fallback MIME type for files whose format cannot be determined.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// A file the user offered to the widget, via drop or the file picker.
///
/// The bytes are reference-counted so that sessions, previews and the
/// upload request can share one buffer. `size` is tracked separately
/// from the buffer so validation can run on metadata alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    name: String,
    mime_type: String,
    size: u64,
    bytes: Rc<[u8]>,
}

impl FileCandidate {
    /// Create a candidate with an explicitly declared MIME type.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let bytes: Rc<[u8]> = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Create a candidate whose MIME type is inferred from content.
    ///
    /// The magic bytes win; the filename extension is only consulted
    /// when the content is not a recognized image format. Anything
    /// else is reported as `application/octet-stream` and will be
    /// rejected by the validator.
    #[must_use]
    pub fn sniffed(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = sniff_mime_type(&name, &bytes);
        Self::new(name, mime_type, bytes)
    }

    /// Create a metadata-only candidate with no content.
    ///
    /// Used where only the declared size and type matter, such as
    /// validating a file before reading it.
    #[must_use]
    pub fn descriptor(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            bytes: Rc::from(Vec::new()),
        }
    }

    /// Original filename as reported by the environment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared or sniffed MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Raw file content. Empty for [`descriptor`](Self::descriptor)
    /// candidates.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Infer a MIME type from magic bytes, falling back to the extension.
fn sniff_mime_type(name: &str, bytes: &[u8]) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_owned();
    }
    name.rsplit_once('.')
        .and_then(|(_, ext)| image::ImageFormat::from_extension(ext))
        .map_or_else(|| UNKNOWN_MIME_TYPE.to_owned(), |f| f.to_mime_type().to_owned())
}

/// Which angle a photo was taken from.
///
/// Sent to the upload endpoint as the `photo_type` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    /// Front-facing pose.
    #[default]
    Front,
    /// Side profile.
    Side,
    /// Back view.
    Back,
    /// Anything else.
    Other,
}

impl PhotoType {
    /// All photo types in selector order.
    pub const ALL: [Self; 4] = [Self::Front, Self::Side, Self::Back, Self::Other];

    /// Wire value for the `photo_type` form field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Side => "side",
            Self::Back => "back",
            Self::Other => "other",
        }
    }

    /// Display label for the selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Front => "Front",
            Self::Side => "Side",
            Self::Back => "Back",
            Self::Other => "Other",
        }
    }

    /// Parse a wire value, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for PhotoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Format a byte count the way validation messages present it.
///
/// Uses binary megabytes with one decimal, so the default 10 MiB limit
/// reads as `10.0 MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
