/*
Copyright 2024, Zep Software, Inc.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::time::Duration;

use thiserror::Error;

use crate::profile::ProfileId;

/// Base error type for engine operations
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Profile {id} not found")]
    ProfileNotFound { id: ProfileId },

    #[error("Graph recomputation exceeded the time bound of {}ms", .limit.as_millis())]
    Timeout { limit: Duration },

    #[error("Graph invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recomputation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ConnectError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ConnectError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            message: errors.to_string(),
        }
    }
}

/// Result type alias for engine operations
pub type ConnectResult<T> = Result<T, ConnectError>;
