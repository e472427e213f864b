// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module fallback service

use thiserror::Error;

/// Result type for fallback service operations
pub type Result<T> = std::result::Result<T, FallbackError>;

/// Errors that abort a fallback request.
///
/// An unresolved specifier or an unreadable file is *not* an error: those
/// are reported through [`ResolutionOutcome::NotFound`], a normal protocol
/// outcome. The variants here all surface to the sandbox as a failed call.
///
/// [`ResolutionOutcome::NotFound`]: crate::protocol::ResolutionOutcome::NotFound
#[derive(Debug, Error)]
pub enum FallbackError {
    /// Malformed fallback request (missing field or unrecognized resolve method)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// CommonJS re-export chasing failed
    #[error("error resolving re-export '{specifier}': {reason}")]
    Resolution {
        /// Re-export specifier that could not be chased
        specifier: String,
        /// Reason for failure
        reason: String,
    },

    /// Injected resolver failure, propagated unmodified
    #[error(transparent)]
    Resolver(#[from] anyhow::Error),
}

impl FallbackError {
    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a re-export resolution error
    pub fn resolution(specifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            specifier: specifier.into(),
            reason: reason.into(),
        }
    }
}
