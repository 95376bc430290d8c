//! Dioxus UI components for the bodyfat widget.
//!
//! Provides the photo drop zone, photo type picker, preview thumbnail,
//! status banner and analysis summary.

mod drop_zone;
mod photo_type;
mod preview;
mod result;
mod status;

pub use drop_zone::PhotoDropZone;
pub use photo_type::PhotoTypePicker;
pub use preview::PhotoPreview;
pub use result::AnalysisSummary;
pub use status::StatusBanner;
