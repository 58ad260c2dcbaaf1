use std::result::Result as StdResult;

use thiserror::Error;

use crate::core::id::{ContainerId, ControlId, ItemId};

/// Result type for model and navigation operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// The model contradicts itself, for example an item whose owner does not
    /// list it. Aborts the current operation without touching prior state.
    #[error("structural inconsistency: {0}")]
    Structural(String),

    /// Item id is not present in the arena.
    #[error("item not found: {0:?}")]
    ItemNotFound(ItemId),

    /// Container id is not present in the arena.
    #[error("container not found: {0:?}")]
    ContainerNotFound(ContainerId),

    /// Control id is not present in the arena.
    #[error("control not found: {0:?}")]
    ControlNotFound(ControlId),

    /// Invalid request against the model.
    #[error("invalid: {0}")]
    Invalid(String),

    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(String),

    /// Writing diagnostics failed.
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Is this a structural inconsistency in the model?
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Structural(_)
                | Self::ItemNotFound(_)
                | Self::ContainerNotFound(_)
                | Self::ControlNotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
