//! Layered error definitions
//!
//! Categorized by source: callback / transport / lifecycle / config

use thiserror::Error;

use crate::{ActorId, TransportRequest};

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Callback Errors =====
    /// Callback does not satisfy the invocable contract
    #[error("invalid callback: expected {expected}")]
    InvalidCallback { expected: &'static str },

    // ===== Transport Errors =====
    /// Transport refused a start/stop/command/bridge request
    #[error("transport rejected {request} for actor {actor_id}: {message}")]
    TransportRejected {
        actor_id: ActorId,
        request: TransportRequest,
        message: String,
    },

    /// Session unavailable
    #[error("not connected: {message}")]
    NotConnected { message: String },

    // ===== Lifecycle Errors =====
    /// The sensor's actor has been destroyed
    #[error("actor {actor_id} has been destroyed")]
    ActorDestroyed { actor_id: ActorId },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create transport rejection error
    pub fn transport_rejected(
        actor_id: ActorId,
        request: TransportRequest,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportRejected {
            actor_id,
            request,
            message: message.into(),
        }
    }

    /// Create not-connected error
    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::NotConnected {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the transport collaborator
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportRejected { .. } | Self::NotConnected { .. }
        )
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ContractError>;
