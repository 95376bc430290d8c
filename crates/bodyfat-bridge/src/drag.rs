//! Drag-and-drop state machine for the drop target.
//!
//! ```text
//! idle --enter--> dragging --leave--> idle
//!                 dragging --over---> dragging
//!      any  --drop--> idle  (+ emits dropped files)
//! ```
//!
//! Every input asks the caller to suppress the environment's default
//! handling. Without that, `dragover` does not mark the element as a
//! drop target and `drop` makes the browser navigate to the file.
//!
//! The controller is generic over the file handle type so the browser
//! layer can hand over its native file objects and read them after the
//! state has already returned to idle.

/// Pointer-drag state of the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    /// Nothing is being dragged over the target.
    #[default]
    Idle,
    /// Files are being dragged over the target.
    Dragging,
}

/// A normalized drag event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragInput<F> {
    /// `dragenter`
    Enter,
    /// `dragover`
    Over,
    /// `dragleave`
    Leave,
    /// `drop`, carrying the files extracted from the payload.
    Drop(Vec<F>),
}

/// What the caller must do after feeding an input to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "the caller must honor prevent_default and forward dropped files"]
pub struct DragOutcome<F> {
    /// Whether the environment's default handling must be suppressed.
    pub prevent_default: bool,
    /// Files to hand to the caller. `Some` only for drops, possibly empty.
    pub dropped: Option<Vec<F>>,
}

/// Tracks drag state and normalizes drops into a file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    /// A controller in the idle state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    /// Current drag state.
    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    /// `true` while files hover over the target.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging)
    }

    /// Apply one drag event.
    pub fn handle<F>(&mut self, input: DragInput<F>) -> DragOutcome<F> {
        let dropped = match input {
            DragInput::Enter => {
                self.state = DragState::Dragging;
                None
            }
            DragInput::Over => None,
            DragInput::Leave => {
                self.state = DragState::Idle;
                None
            }
            DragInput::Drop(files) => {
                self.state = DragState::Idle;
                Some(files)
            }
        };
        DragOutcome {
            prevent_default: true,
            dropped,
        }
    }
}
