//! Store error types.

/// Errors surfaced by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
	/// The store refused a write; carries the store's own message.
	#[error("write rejected by store: {0}")]
	Rejected(String),
	#[error("invalid path `{0}`")]
	InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
