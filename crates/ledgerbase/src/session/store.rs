use async_trait::async_trait;

/// An error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization/Deserialization error: {0}")]
    Codec(String),
    #[error("Other session store error: {0}")]
    Other(String),
}

/// Trait for abstracting durable key-value session storage.
///
/// The contract mirrors browser local storage: string keys, string values,
/// last-writer-wins, no transactions. Concurrent writers (e.g. multiple
/// tabs sharing one file) are not coordinated.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Retrieves the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), SessionStoreError>;
}
