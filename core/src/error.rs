use thiserror::Error;

use crate::types::{Amount, EntityId, ResourceType, Tick};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "Insufficient balance: entity {entity_id} holds {available} of resource {resource_type}, \
         needs {requested}"
    )]
    InsufficientBalance {
        entity_id:     EntityId,
        resource_type: ResourceType,
        available:     Amount,
        requested:     Amount,
    },

    #[error("Tick regression on entity {entity_id}: checkpoint at {checkpoint}, mutation at {tick}")]
    TickRegression {
        entity_id:  EntityId,
        checkpoint: Tick,
        tick:       Tick,
    },

    #[error("Invalid stored number '{raw}'")]
    InvalidNumber { raw: String },

    #[error("Submission '{handle}' not found")]
    SubmissionNotFound { handle: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
