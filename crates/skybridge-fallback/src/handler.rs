// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The fallback request handler.
//!
//! Orchestrates one resolution request end-to-end and is the only place
//! that talks to the injected resolver. The handler holds no state between
//! requests and never caches: content is re-read and re-classified every
//! time so hot reload always sees fresh sources.

use crate::error::Result;
use crate::exports::{collect_module_info, ModuleInfo};
use crate::normalize::{with_js_extension, PathNormalizer};
use crate::protocol::{FallbackRequest, ModuleContent, ModuleSource, ResolutionOutcome};
use crate::resolver::ResolveId;
use std::path::Path;
use std::sync::Arc;

/// Handles fallback requests against an injected resolver.
pub struct FallbackHandler {
    resolver: Arc<dyn ResolveId>,
    normalizer: PathNormalizer,
}

impl FallbackHandler {
    /// Creates a handler using the host platform's path conventions.
    pub fn new(resolver: Arc<dyn ResolveId>) -> Self {
        Self::with_normalizer(resolver, PathNormalizer::new())
    }

    /// Creates a handler with an explicit normalizer (tests pin the
    /// drive-letter behavior this way).
    pub fn with_normalizer(resolver: Arc<dyn ResolveId>, normalizer: PathNormalizer) -> Self {
        Self {
            resolver,
            normalizer,
        }
    }

    /// The normalizer this handler applies to incoming and outgoing paths.
    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Resolves one fallback request to its outcome.
    ///
    /// Unresolved specifiers and unreadable files are reported as
    /// [`ResolutionOutcome::NotFound`]; only protocol violations, re-export
    /// chasing failures and resolver errors surface as `Err`.
    pub async fn handle(&self, request: FallbackRequest) -> Result<ResolutionOutcome> {
        let FallbackRequest {
            resolve_method,
            referrer,
            specifier,
            raw_specifier,
        } = request;

        // the raw specifier is authoritative and never normalized
        let referrer = self.normalizer.normalize(&referrer);
        let specifier = self.normalizer.normalize(&specifier);

        let referrer = with_js_extension(&referrer).await;

        tracing::debug!(%resolve_method, %raw_specifier, %referrer, "resolving fallback request");

        let resolved = self
            .resolver
            .resolve_id(&raw_specifier, &referrer, resolve_method)
            .await?;
        let Some(mut resolved_id) = resolved else {
            tracing::debug!(%raw_specifier, "specifier did not resolve");
            return Ok(ResolutionOutcome::NotFound { reason: None });
        };

        // resolvers may append a disambiguating query suffix the sandbox
        // must never see
        if let Some(query) = resolved_id.rfind('?') {
            resolved_id.truncate(query);
        }

        let relative = raw_specifier.starts_with("./") || raw_specifier.starts_with("../");
        if !relative && resolved_id != raw_specifier && resolved_id != specifier {
            tracing::debug!(%resolved_id, "redirecting to canonical specifier");
            return Ok(ResolutionOutcome::Redirect {
                canonical_specifier: resolved_id,
            });
        }

        let code = match tokio::fs::read_to_string(&resolved_id).await {
            Ok(code) => code,
            Err(error) => {
                tracing::debug!(%resolved_id, %error, "resolved module is unreadable");
                return Ok(ResolutionOutcome::NotFound {
                    reason: Some(format!("Failed to read file {resolved_id}")),
                });
            }
        };

        let source = match collect_module_info(&code, Path::new(&resolved_id)).await? {
            ModuleInfo::Cjs { named_exports } => ModuleSource::Cjs {
                common_js_module: code,
                named_exports,
            },
            ModuleInfo::Esm => ModuleSource::Esm { es_module: code },
            ModuleInfo::Json => ModuleSource::Json { json: code },
        };

        // wire names never carry the leading separator
        let name = specifier
            .strip_prefix('/')
            .unwrap_or(&specifier)
            .to_string();

        Ok(ResolutionOutcome::Content(ModuleContent { name, source }))
    }
}
