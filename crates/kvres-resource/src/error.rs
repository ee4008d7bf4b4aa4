use kvres_store::StoreError;
use thiserror::Error;

/// Errors delivered through a [`Deferred`](crate::Deferred) result.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("merge still conflicting after {attempts} attempt(s)")]
    Conflict { attempts: u32 },

    #[error("store call panicked: {0}")]
    Panicked(String),

    #[error("store call cancelled: {0}")]
    Cancelled(String),
}

impl ResourceError {
    /// Returns `true` if the key was absent and no default was given.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::Store(e) if e.is_not_found())
    }

    /// Returns `true` if a conditional write lost to a newer version.
    pub fn is_obsolete(&self) -> bool {
        matches!(self, ResourceError::Store(e) if e.is_obsolete())
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_classify() {
        let nf = ResourceError::from(StoreError::NotFound { key: "\"k\"".into() });
        assert!(nf.is_not_found());
        assert!(!nf.is_obsolete());

        let stale = ResourceError::from(StoreError::ObsoleteVersion {
            key: "\"k\"".into(),
            supplied: "v{}".into(),
            current: "v{1:1}".into(),
        });
        assert!(stale.is_obsolete());
        assert!(!stale.is_not_found());
    }

    #[test]
    fn conflict_is_neither() {
        let err = ResourceError::Conflict { attempts: 3 };
        assert!(!err.is_not_found());
        assert!(!err.is_obsolete());
        assert!(err.to_string().contains('3'));
    }
}
