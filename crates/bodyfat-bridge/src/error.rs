//! Session-level error taxonomy.

use crate::tool::InvocationError;
use crate::upload::UploadError;
use crate::validate::ValidationError;

/// Why a session ended in a failure state.
///
/// Every failure inside the workflow is converted into one of these at
/// the orchestrator boundary and stored on the session; nothing
/// propagates into rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// The file was rejected before any network activity.
    #[error("{}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// The upload request failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The tool invocation failed or the tool channel is missing.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
