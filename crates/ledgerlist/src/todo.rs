//! Task model, collection schema and draft validation.

use serde::{Deserialize, Serialize};

/// GraphQL SDL deployed as the per-user database schema.
pub const TODO_SCHEMA: &str = "\
type Todo {
  id: UUID!
  title: String!
  description: String
  priority: Int!
  tags: [String!]
  status: String!
  image: File
}

type Query {
  todos: [Todo]
}
";

/// Allowed priority values, highest urgency first.
pub const PRIORITIES: [u8; 4] = [1, 2, 3, 4];

/// Id of the read-only sample card shown on an empty board.
pub const PLACEHOLDER_TODO_ID: &str = "abcdefg12345";

/// Lifecycle of a task. DELETED rows stay in the collection; the board
/// simply stops showing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    Ready,
    Done,
    Deleted,
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TodoStatus::Ready => "READY",
            TodoStatus::Done => "DONE",
            TodoStatus::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// Stored-file metadata attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFile {
    pub content_type: String,
    pub cid: String,
    pub size: u64,
    pub file_name: String,
    #[serde(rename = "fileURL")]
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: TodoStatus,
    #[serde(default)]
    pub image: Option<TodoFile>,
}

/// The sample card rendered when the collection is empty. Never persisted
/// and never draggable.
pub fn placeholder_todo() -> Todo {
    Todo {
        id: PLACEHOLDER_TODO_ID.to_string(),
        title: "Create your first To Do :D".to_string(),
        description: Some("Use the form above to add a task to your board.".to_string()),
        priority: 1,
        tags: Vec::new(),
        status: TodoStatus::Ready,
        image: None,
    }
}

/// Per-field problems found while validating a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Draft validation failure, carrying one entry per offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub fields: Vec<FieldError>,
}

/// User input for a new task, before it earns an id and a status.
#[derive(Debug, Clone, Default)]
pub struct TodoDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub tags: Vec<String>,
}

impl TodoDraft {
    /// Validate the draft. All fields are checked before returning so the
    /// form can mark every offending input at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut fields = Vec::new();

        if self.title.trim().is_empty() {
            fields.push(FieldError {
                field: "title",
                message: "Title is required".to_string(),
            });
        }
        if self
            .description
            .as_deref()
            .is_none_or(|d| d.trim().is_empty())
        {
            fields.push(FieldError {
                field: "description",
                message: "Description is required".to_string(),
            });
        }
        match self.priority {
            None => fields.push(FieldError {
                field: "priority",
                message: "Priority is required".to_string(),
            }),
            Some(p) if !PRIORITIES.contains(&p) => fields.push(FieldError {
                field: "priority",
                message: format!("Priority must be between 1 and {}", PRIORITIES.len()),
            }),
            Some(_) => {}
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                message: "Some fields are required".to_string(),
                fields,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, priority: Option<u8>) -> TodoDraft {
        TodoDraft {
            title: title.to_string(),
            description: Some("details".to_string()),
            priority,
            tags: Vec::new(),
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft("buy milk", Some(2)).validate().is_ok());
    }

    #[test]
    fn empty_title_and_missing_priority_are_both_reported() {
        let err = draft("  ", None).validate().unwrap_err();
        assert_eq!(err.message, "Some fields are required");
        let fields: Vec<&str> = err.fields.iter().map(|f| f.field).collect();
        assert_eq!(fields, ["title", "priority"]);
    }

    #[test]
    fn blank_description_is_rejected() {
        let mut d = draft("buy milk", Some(1));
        d.description = Some("   ".to_string());
        let err = d.validate().unwrap_err();
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields[0].field, "description");
    }

    #[test]
    fn out_of_range_priority_is_rejected() {
        let err = draft("buy milk", Some(9)).validate().unwrap_err();
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields[0].field, "priority");
    }

    #[test]
    fn todo_serde_uses_wire_field_names() {
        let json = serde_json::json!({
            "id": "t1",
            "title": "buy milk",
            "priority": 1,
            "status": "READY",
            "image": {
                "contentType": "image/png",
                "cid": "bafy123",
                "size": 42,
                "fileName": "receipt.png",
                "fileURL": "https://files.example.com/bafy123"
            }
        });
        let todo: Todo = serde_json::from_value(json).unwrap();
        assert_eq!(todo.status, TodoStatus::Ready);
        assert_eq!(todo.image.unwrap().file_url, "https://files.example.com/bafy123");
    }

    #[test]
    fn placeholder_is_ready_and_fixed() {
        let p = placeholder_todo();
        assert_eq!(p.id, PLACEHOLDER_TODO_ID);
        assert_eq!(p.status, TodoStatus::Ready);
    }
}
