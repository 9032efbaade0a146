// Copyright 2023 The RocketMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unified error system for the RocketMQ client runtime.

mod network;
mod serialization;

use std::io;

pub use network::NetworkError;
pub use serialization::SerializationError;
use thiserror::Error;

/// Main error type for all client runtime operations.
///
/// # Examples
///
/// ```rust
/// use rocketmq_error::RocketMQError;
///
/// let err = RocketMQError::timeout("invoke_sync", 3000);
/// assert!(err.is_timeout());
///
/// let err = RocketMQError::remote(17, "topic not exist");
/// assert_eq!(err.remote_code(), Some(17));
/// ```
#[derive(Debug, Error)]
pub enum RocketMQError {
    // ============================================================================
    // Network Errors
    // ============================================================================
    /// Transport unavailable or broken
    #[error(transparent)]
    Network(#[from] NetworkError),

    // ============================================================================
    // Serialization Errors
    // ============================================================================
    /// Malformed frame or header
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    // ============================================================================
    // Invocation Errors
    // ============================================================================
    /// No response within the deadline
    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },

    /// The peer answered with a non-success status
    #[error("Remote error: code={code}, remark={remark}")]
    Remote { code: i32, remark: String },

    // ============================================================================
    // NameServer/Route Errors
    // ============================================================================
    /// Route information not found, default topic included
    #[error("Route information not found for topic '{topic}'")]
    RouteNotFound { topic: String },

    // ============================================================================
    // Client Errors
    // ============================================================================
    /// Client already started
    #[error("Client is already started")]
    ClientAlreadyStarted,

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Configuration parsing failed
    #[error("Configuration parse error for '{key}': {reason}")]
    ConfigParseFailed { key: &'static str, reason: String },

    // ============================================================================
    // System Errors
    // ============================================================================
    /// IO error from std::io
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Illegal argument
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl RocketMQError {
    /// Create a network connection failed error
    #[inline]
    pub fn network_connection_failed(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network(NetworkError::connection_failed(addr, reason))
    }

    /// Create a connection closed error
    #[inline]
    pub fn connection_closed(addr: impl Into<String>) -> Self {
        Self::Network(NetworkError::ConnectionClosed { addr: addr.into() })
    }

    /// Create a timeout error
    #[inline]
    pub fn timeout(operation: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout { operation, timeout_ms }
    }

    /// Create a remote error from a response code and its remark
    #[inline]
    pub fn remote(code: i32, remark: impl Into<String>) -> Self {
        Self::Remote {
            code,
            remark: remark.into(),
        }
    }

    /// Create a route not found error
    #[inline]
    pub fn route_not_found(topic: impl Into<String>) -> Self {
        Self::RouteNotFound { topic: topic.into() }
    }

    /// Create an illegal argument error
    #[inline]
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    /// Create a decode failure
    #[inline]
    pub fn decode_failed(format: &'static str, message: impl Into<String>) -> Self {
        Self::Serialization(SerializationError::decode_failed(format, message))
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Transport-level failures, including a connect attempt that timed out.
    #[inline]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Network(_) | Self::IO(_))
    }

    #[inline]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }

    pub fn remote_code(&self) -> Option<i32> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RocketMQError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(SerializationError::decode_failed("json", err.to_string()))
    }
}

impl From<config::ConfigError> for RocketMQError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigParseFailed {
            key: "config",
            reason: err.to_string(),
        }
    }
}

/// Result type alias for client runtime operations
pub type RocketMQResult<T> = std::result::Result<T, RocketMQError>;
