//! Task-board application logic on top of the `ledgerbase` gateway SDK.
//!
//! Everything here is UI-toolkit agnostic: the board, the policy form
//! and the app lifecycle are plain state machines a rendering layer can
//! drive. Network access goes exclusively through `ledgerbase` clients.

/// App lifecycle: connect, deploy, ready, recover
pub mod app;

/// Drag-and-drop task board
pub mod board;

/// Access-policy form reconciliation
pub mod policy_form;

/// GraphQL operations for the task collection
pub mod queries;

/// Task model, schema and draft validation
pub mod todo;

use ledgerbase::GatewayError;

pub use app::{AppController, AppPhase};
pub use board::{BoardController, DragFeedback, DropZone, Notice, Severity, TaskCard, ZoneTint};
pub use policy_form::{FormPolicy, apply_policy_form, is_valid_address, removal_set};
pub use queries::TodoQueries;
pub use todo::{Todo, TodoDraft, TodoStatus, ValidationError};

/// Application-level error: either local input validation or a gateway
/// failure bubbled up unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
