//! File validation before any network activity.
//!
//! [`validate`] is pure and synchronous: it looks only at the declared
//! size and MIME type of a [`FileCandidate`]. Every violated rule is
//! reported so the user sees all problems at once.

use serde::{Deserialize, Serialize};

use crate::types::{FileCandidate, format_size};

/// Default upload size limit: 10 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default MIME allow-list.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// A single violated validation rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The file is larger than the configured limit.
    #[error("{name} is {} which exceeds the {} limit", size_label(.size), size_label(.max))]
    TooLarge {
        /// Filename, for the message.
        name: String,
        /// Actual size in bytes.
        size: u64,
        /// Limit in bytes.
        max: u64,
    },

    /// The MIME type is not on the allow-list.
    #[error("{name} has unsupported type {mime_type}. Allowed: {}", allowed_labels(.allowed))]
    UnsupportedType {
        /// Filename, for the message.
        name: String,
        /// The rejected MIME type.
        mime_type: String,
        /// The allow-list at the time of validation.
        allowed: Vec<String>,
    },
}

/// Result of validating one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    /// `true` when no rule was violated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every violated rule, in check order (size, then type).
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// All error messages joined into one user-facing line.
    #[must_use]
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validate a file against a size limit and a MIME allow-list.
///
/// MIME comparison ignores ASCII case, and `image/jpg` is treated as
/// `image/jpeg`.
#[must_use]
pub fn validate<S: AsRef<str>>(
    file: &FileCandidate,
    max_size_bytes: u64,
    allowed_mime_types: &[S],
) -> ValidationOutcome {
    let mut errors = Vec::new();

    if file.size() > max_size_bytes {
        errors.push(ValidationError::TooLarge {
            name: file.name().to_owned(),
            size: file.size(),
            max: max_size_bytes,
        });
    }

    let mime = normalize_mime(file.mime_type());
    if !allowed_mime_types
        .iter()
        .any(|a| normalize_mime(a.as_ref()) == mime)
    {
        errors.push(ValidationError::UnsupportedType {
            name: file.name().to_owned(),
            mime_type: file.mime_type().to_owned(),
            allowed: allowed_mime_types
                .iter()
                .map(|a| a.as_ref().to_owned())
                .collect(),
        });
    }

    ValidationOutcome { errors }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // called from error formatting with field refs
fn size_label(bytes: &u64) -> String {
    format_size(*bytes)
}

fn normalize_mime(mime: &str) -> String {
    let mime = mime.trim().to_ascii_lowercase();
    if mime == "image/jpg" {
        "image/jpeg".to_owned()
    } else {
        mime
    }
}

/// Short labels for an allow-list: `image/jpeg` -> `JPEG`.
fn allowed_labels(allowed: &[String]) -> String {
    allowed
        .iter()
        .map(|m| {
            m.rsplit_once('/')
                .map_or(m.as_str(), |(_, sub)| sub)
                .to_ascii_uppercase()
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Size limit and MIME allow-list applied to every selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Largest accepted file, in bytes.
    pub max_size_bytes: u64,
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|&m| m.to_owned())
                .collect(),
        }
    }
}

impl ValidationPolicy {
    /// Validate a file against this policy.
    #[must_use]
    pub fn validate(&self, file: &FileCandidate) -> ValidationOutcome {
        validate(file, self.max_size_bytes, &self.allowed_mime_types)
    }

    /// Value for a file input's `accept` attribute.
    ///
    /// Keeps the picker's filter identical to the validator's.
    #[must_use]
    pub fn accept_attribute(&self) -> String {
        self.allowed_mime_types.join(",")
    }

    /// [`Self::accept_attribute`] extended with filename extensions the
    /// host asked for.
    ///
    /// Only extensions of an allowed image format are added, so the
    /// picker never offers a file the validator would reject.
    #[must_use]
    pub fn accept_with(&self, extensions: &[String]) -> String {
        let mut accept = self.accept_attribute();
        let mut seen: Vec<&str> = Vec::new();
        for ext in extensions.iter().map(String::as_str).map(str::trim) {
            if seen.contains(&ext) || !self.allows_extension(ext) {
                continue;
            }
            seen.push(ext);
            if !accept.is_empty() {
                accept.push(',');
            }
            accept.push_str(ext);
        }
        accept
    }

    fn allows_extension(&self, ext: &str) -> bool {
        image::ImageFormat::from_extension(ext.trim_start_matches('.')).is_some_and(|f| {
            self.allowed_mime_types
                .iter()
                .any(|m| m == f.to_mime_type())
        })
    }

    /// Human-readable summary, e.g. `JPEG, PNG, WEBP up to 10.0 MB`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} up to {}",
            allowed_labels(&self.allowed_mime_types),
            format_size(self.max_size_bytes)
        )
    }
}
