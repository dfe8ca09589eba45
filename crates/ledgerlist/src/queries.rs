//! GraphQL operations for the task collection.
//!
//! Documents mirror the deployed schema's generated collection API:
//! `todoCollection` for reads, `todoCreate`/`todoUpdate` for writes.
//! Deletion is an update to the DELETED status, never a row removal.

use std::sync::Arc;

use ledgerbase::{GatewayError, GraphqlClient};
use serde::Deserialize;
use serde_json::json;

use crate::todo::{Todo, TodoDraft, TodoStatus};

pub const GET_TODOS: &str = "\
query GetTodos {
  todoCollection(first: 10) {
    edges {
      node {
        id
        title
        description
        priority
        tags
        status
        image {
          contentType
          cid
          size
          fileName
          fileURL
        }
      }
    }
  }
}";

pub const CREATE_TODO: &str = "\
mutation CreateTodo($input: TodoCreateInput!) {
  todoCreate(input: $input) {
    todo {
      id
      title
      description
      priority
      tags
      status
    }
  }
}";

pub const UPDATE_TODO: &str = "\
mutation UpdateTodo($id: UUID!, $input: TodoUpdateInput!) {
  todoUpdate(id: $id, input: $input) {
    todo {
      id
      title
      description
      priority
      tags
      status
    }
  }
}";

#[derive(Deserialize)]
struct TodoCollectionData {
    #[serde(rename = "todoCollection")]
    todo_collection: TodoConnection,
}

#[derive(Deserialize)]
struct TodoConnection {
    edges: Vec<TodoEdge>,
}

#[derive(Deserialize)]
struct TodoEdge {
    node: Todo,
}

#[derive(Deserialize)]
struct TodoPayload {
    todo: Todo,
}

#[derive(Deserialize)]
struct TodoCreateData {
    #[serde(rename = "todoCreate")]
    todo_create: TodoPayload,
}

#[derive(Deserialize)]
struct TodoUpdateData {
    #[serde(rename = "todoUpdate")]
    todo_update: TodoPayload,
}

/// Typed wrapper over the deployment's GraphQL endpoint.
#[derive(Clone)]
pub struct TodoQueries {
    client: Arc<GraphqlClient>,
}

impl TodoQueries {
    pub fn new(client: Arc<GraphqlClient>) -> Self {
        Self { client }
    }

    /// Fetch the first page of the collection, every status included.
    pub async fn fetch_todos(&self) -> Result<Vec<Todo>, GatewayError> {
        let data = self.client.execute(GET_TODOS, json!({})).await?;
        let parsed: TodoCollectionData = serde_json::from_value(data)?;
        Ok(parsed
            .todo_collection
            .edges
            .into_iter()
            .map(|edge| edge.node)
            .collect())
    }

    /// Persist a validated draft. New tasks always start READY.
    pub async fn create_todo(&self, draft: &TodoDraft) -> Result<Todo, GatewayError> {
        let variables = json!({
            "input": {
                "todo": {
                    "title": draft.title,
                    "description": draft.description,
                    "priority": draft.priority,
                    "tags": draft.tags,
                    "status": TodoStatus::Ready,
                }
            }
        });
        let data = self.client.execute(CREATE_TODO, variables).await?;
        let parsed: TodoCreateData = serde_json::from_value(data)?;
        Ok(parsed.todo_create.todo)
    }

    /// Move a task to `status`.
    pub async fn update_todo_status(
        &self,
        id: &str,
        status: TodoStatus,
    ) -> Result<Todo, GatewayError> {
        let variables = json!({
            "id": id,
            "input": { "todo": { "status": status } }
        });
        let data = self.client.execute(UPDATE_TODO, variables).await?;
        let parsed: TodoUpdateData = serde_json::from_value(data)?;
        Ok(parsed.todo_update.todo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_envelope_decodes() {
        let data = json!({
            "todoCollection": {
                "edges": [
                    { "node": { "id": "t1", "title": "a", "priority": 1, "status": "READY" } },
                    { "node": { "id": "t2", "title": "b", "priority": 2, "status": "DONE" } }
                ]
            }
        });
        let parsed: TodoCollectionData = serde_json::from_value(data).unwrap();
        assert_eq!(parsed.todo_collection.edges.len(), 2);
        assert_eq!(parsed.todo_collection.edges[1].node.status, TodoStatus::Done);
    }

    #[test]
    fn documents_target_the_collection_api() {
        assert!(GET_TODOS.contains("todoCollection(first: 10)"));
        assert!(CREATE_TODO.contains("todoCreate"));
        assert!(UPDATE_TODO.contains("todoUpdate"));
    }
}
