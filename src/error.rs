//! Error types shared by every container.
//!
//! Absence of a key is never an error: lookups return `Option`. Errors are
//! reserved for refused buffer growth and rejected construction parameters.

use thiserror::Error;

/// Main error type for the collections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// Growing the backing buffers failed. The container is left untouched.
    #[error("not enough memory to grow buffers {from} -> {to} slots")]
    OutOfMemory {
        /// Slot count before the attempted growth.
        from: usize,
        /// Slot count that could not be allocated.
        to: usize,
    },

    /// Construction parameters were rejected.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the parameters.
        message: String,
    },
}

impl CollectionError {
    pub fn out_of_memory(from: usize, to: usize) -> Self {
        Self::OutOfMemory { from, to }
    }

    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Short category label, handy for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "memory",
            Self::InvalidConfiguration { .. } => "config",
        }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, CollectionError>;
