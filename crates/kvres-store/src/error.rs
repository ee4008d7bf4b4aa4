use kvres_types::VersionError;

/// Errors from store client operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The key does not exist and no default was supplied.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// A conditional write lost the race to a newer version.
    #[error("obsolete version for {key}: supplied {supplied}, current {current}")]
    ObsoleteVersion {
        key: String,
        supplied: String,
        current: String,
    },

    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store could not produce the next version.
    #[error("version error: {0}")]
    Version(#[from] VersionError),

    /// Internal store failure, such as a poisoned lock.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns `true` for [`StoreError::ObsoleteVersion`].
    pub fn is_obsolete(&self) -> bool {
        matches!(self, StoreError::ObsoleteVersion { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
