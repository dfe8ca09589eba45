//! Drag-and-drop task board.
//!
//! The controller owns the task list, the drop-zone highlight state and a
//! queue of user-facing notices. Rendering layers call the `on_drag_*`
//! hooks and `complete_drag`, then redraw from `cards`, `feedback` and
//! `drain_notices`. Drops are optimistic in neither direction: the task
//! list only changes after the gateway confirms the mutation.

use crate::AppError;
use crate::queries::TodoQueries;
use crate::todo::{PLACEHOLDER_TODO_ID, Todo, TodoDraft, TodoStatus, placeholder_todo};

/// The three fixed drop targets under the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Delete,
    Ready,
    Done,
}

impl DropZone {
    /// DOM-style element id of the zone.
    pub fn id(self) -> &'static str {
        match self {
            DropZone::Delete => "delete",
            DropZone::Ready => "ready",
            DropZone::Done => "done",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "delete" => Some(DropZone::Delete),
            "ready" => Some(DropZone::Ready),
            "done" => Some(DropZone::Done),
            _ => None,
        }
    }
}

/// Highlight intensity of a drop zone while a drag is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneTint {
    /// No drag in flight.
    #[default]
    Idle,
    /// A drag is in flight but not over this zone.
    Armed,
    /// The dragged card is hovering over this zone.
    Engaged,
}

/// Current tint of the two actionable zones. The READY zone is a no-op
/// target and never highlights beyond Armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragFeedback {
    pub delete: ZoneTint,
    pub done: ZoneTint,
}

/// Pure mapping from hover position to zone tints.
pub fn drag_feedback(hover: Option<DropZone>) -> DragFeedback {
    match hover {
        None => DragFeedback::default(),
        Some(DropZone::Delete) => DragFeedback {
            delete: ZoneTint::Engaged,
            done: ZoneTint::Armed,
        },
        Some(DropZone::Done) => DragFeedback {
            delete: ZoneTint::Armed,
            done: ZoneTint::Engaged,
        },
        Some(DropZone::Ready) => DragFeedback {
            delete: ZoneTint::Armed,
            done: ZoneTint::Armed,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A one-shot message for the notification area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

/// One renderable card. The placeholder card is not draggable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub todo: Todo,
    pub draggable: bool,
}

pub struct BoardController {
    queries: TodoQueries,
    network: String,
    todos: Vec<Todo>,
    notices: Vec<Notice>,
    feedback: DragFeedback,
}

impl BoardController {
    pub fn new(queries: TodoQueries, network: impl Into<String>) -> Self {
        Self {
            queries,
            network: network.into(),
            todos: Vec::new(),
            notices: Vec::new(),
            feedback: DragFeedback::default(),
        }
    }

    /// Reload the task list from the deployment.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.todos = self.queries.fetch_todos().await?;
        log::debug!("board refreshed with {} task(s)", self.todos.len());
        Ok(())
    }

    /// Tasks currently on the board: READY only. DONE and DELETED rows
    /// stay in the collection but are never rendered.
    pub fn visible(&self) -> impl Iterator<Item = &Todo> {
        self.todos
            .iter()
            .filter(|t| t.status == TodoStatus::Ready)
    }

    /// Cards to render. An empty board shows one immutable sample card so
    /// the drag surface is never blank.
    pub fn cards(&self) -> Vec<TaskCard> {
        let cards: Vec<TaskCard> = self
            .visible()
            .map(|todo| TaskCard {
                todo: todo.clone(),
                draggable: true,
            })
            .collect();
        if cards.is_empty() {
            return vec![TaskCard {
                todo: placeholder_todo(),
                draggable: false,
            }];
        }
        cards
    }

    pub fn feedback(&self) -> DragFeedback {
        self.feedback
    }

    /// Take all queued notices, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Validate and persist a new task. Validation failures never reach
    /// the network; a committed task appears on the board immediately.
    pub async fn create(&mut self, draft: &TodoDraft) -> Result<(), AppError> {
        draft.validate()?;
        let todo = self.queries.create_todo(draft).await?;
        self.notices.push(Notice {
            message: format!(
                "The CREATE operation was committed on {}",
                self.network
            ),
            severity: Severity::Success,
        });
        self.todos.push(todo);
        Ok(())
    }

    pub fn on_drag_start(&mut self) {
        self.feedback = drag_feedback(Some(DropZone::Ready));
    }

    pub fn on_drag_over(&mut self, hover: Option<DropZone>) {
        self.feedback = drag_feedback(hover);
    }

    /// The status a drop would commit, or `None` when the drop is inert:
    /// the READY zone, the placeholder card, or an id not on the board.
    pub fn drop_intent(&self, id: &str, zone: DropZone) -> Option<TodoStatus> {
        if id == PLACEHOLDER_TODO_ID {
            return None;
        }
        if !self.todos.iter().any(|t| t.id == id) {
            return None;
        }
        match zone {
            DropZone::Ready => None,
            DropZone::Delete => Some(TodoStatus::Deleted),
            DropZone::Done => Some(TodoStatus::Done),
        }
    }

    /// Finish a drag. Feedback resets unconditionally; the task list only
    /// changes once the gateway commits the status update. A failed
    /// mutation leaves the card in place and queues an error notice, with
    /// no automatic retry.
    pub async fn complete_drag(&mut self, id: &str, zone: DropZone) -> Result<(), AppError> {
        self.feedback = DragFeedback::default();
        let Some(status) = self.drop_intent(id, zone) else {
            return Ok(());
        };

        match self.queries.update_todo_status(id, status).await {
            Ok(_) => {
                self.todos.retain(|t| t.id != id);
                self.notices.push(Notice {
                    message: format!(
                        "The {status} operation was committed on {}",
                        self.network
                    ),
                    severity: Severity::Success,
                });
                Ok(())
            }
            Err(e) => {
                self.notices.push(Notice {
                    message: format!("The {status} operation failed: {e}"),
                    severity: Severity::Error,
                });
                Err(e.into())
            }
        }
    }
}
