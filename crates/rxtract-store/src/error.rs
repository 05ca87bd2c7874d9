//! Storage error types.

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations, one variant per
/// operation site.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to initialize a storage backend.
    #[error("storage initialization failed: {0}")]
    Init(String),

    /// Cloud credentials are missing or malformed.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// Token exchange with the identity provider failed.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Image upload failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Document creation failed.
    #[error("document creation failed: {0}")]
    CreateDocument(String),

    /// Document update failed.
    #[error("document update failed: {0}")]
    UpdateDocument(String),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A stored document did not match the expected schema.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// HTTP transport error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Object-storage backend error.
    #[error("backend error: {0}")]
    Backend(opendal::Error),
}

impl StorageError {
    /// Creates a new initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Creates a new credentials error.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Creates a new token exchange error.
    pub fn token_exchange(msg: impl Into<String>) -> Self {
        Self::TokenExchange(msg.into())
    }

    /// Creates a new upload error.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Creates a new document creation error.
    pub fn create_document(msg: impl Into<String>) -> Self {
        Self::CreateDocument(msg.into())
    }

    /// Creates a new document update error.
    pub fn update_document(msg: impl Into<String>) -> Self {
        Self::UpdateDocument(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Creates a new malformed document error.
    pub fn malformed_document(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Returns true when the error is a missing document rather than an
    /// operational failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}
