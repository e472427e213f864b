// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The injected module resolution capability.
//!
//! The fallback service never walks `node_modules` itself: mapping a bare
//! specifier plus a referrer to a real file path is the host build tool's
//! job. The service only selects *which* of the host's two resolver
//! configurations to ask, based on how the sandbox performed the import.

use async_trait::async_trait;
use std::fmt;

/// How the sandboxed runtime reached the unresolved specifier.
///
/// The split exists because a single resolution algorithm cannot satisfy
/// both module systems at once: their main-entry and extension precedence
/// rules differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMethod {
    /// An ESM `import`: resolve with ES-module-first conditions.
    Import,
    /// A CommonJS `require()`: resolve with CJS-first conditions, meaning
    /// the `node` condition set, the package `main` field, and the
    /// extension search order `.cjs, .cts, .js, .ts, .jsx, .tsx, .json`.
    Require,
}

impl ResolveMethod {
    /// Parses the `X-Resolve-Method` header value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "import" => Some(Self::Import),
            "require" => Some(Self::Require),
            _ => None,
        }
    }

    /// The wire spelling of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Require => "require",
        }
    }
}

impl fmt::Display for ResolveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a module specifier against the host's package graph.
///
/// Implementors must honor the [`ResolveMethod`] contract: the `import`
/// variant uses ES-module-first resolution, the `require` variant
/// prioritizes CommonJS resolution rules. `Ok(None)` means the specifier
/// does not resolve, a normal outcome reported to the sandbox as 404.
/// `Err` is fatal for the request and propagates unmodified.
///
/// Resolvers may append a `?query` suffix to disambiguate virtual modules;
/// the handler strips it before the path reaches the sandbox.
#[async_trait]
pub trait ResolveId: Send + Sync {
    /// Maps `specifier`, as written in the module at `referrer`, to a file
    /// path.
    async fn resolve_id(
        &self,
        specifier: &str,
        referrer: &str,
        method: ResolveMethod,
    ) -> anyhow::Result<Option<String>>;
}
