// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static CommonJS export discovery with re-export chasing.
//!
//! The sandbox must know a CommonJS module's named exports before it can
//! execute it, so the export set is computed here by lexing, never by
//! running the code. Modules that delegate their whole surface to another
//! file (`module.exports = require('./impl')`) are chased recursively
//! through the filesystem.
//!
//! The export set is recomputed on every request. Caching would be wrong:
//! source files change between requests under hot reload.

use crate::classify::{classify, ModuleFormat};
use crate::error::{FallbackError, Result};
use skybridge_cjs_lexer as cjs_lexer;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Statically derived facts about one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleInfo {
    /// CommonJS module with its statically visible named exports, sorted.
    Cjs {
        /// Union of direct exports and every relative re-export target's
        /// exports, with the `default` marker removed.
        named_exports: Vec<String>,
    },
    /// ECMAScript module; its exports are not enumerated this way.
    Esm,
    /// JSON file
    Json,
}

/// Classifies `source` and, for CommonJS, computes its export set.
///
/// Re-export targets must be relative paths: chasing a bare specifier would
/// need a full resolver pass, which this static step deliberately does not
/// do. A non-relative target, a target with no `.cjs`/`.js` file on disk,
/// or a re-export cycle fails the request with
/// [`FallbackError::Resolution`].
pub async fn collect_module_info(source: &str, path: &Path) -> Result<ModuleInfo> {
    let mut visited: HashSet<PathBuf> = HashSet::new();
    if let Ok(canonical) = tokio::fs::canonicalize(path).await {
        visited.insert(canonical);
    }
    collect_inner(source, path, &mut visited).await
}

/// Recursive worker. The `visited` set spans the whole extraction call so a
/// re-export chain that returns to an already-seen file fails loudly
/// instead of recursing until the stack runs out.
fn collect_inner<'a>(
    source: &'a str,
    path: &'a Path,
    visited: &'a mut HashSet<PathBuf>,
) -> Pin<Box<dyn Future<Output = Result<ModuleInfo>> + Send + 'a>> {
    Box::pin(async move {
        match classify(source, path) {
            ModuleFormat::Json => return Ok(ModuleInfo::Json),
            ModuleFormat::Esm => return Ok(ModuleInfo::Esm),
            ModuleFormat::Cjs => {}
        }

        let analysis = cjs_lexer::parse(source);
        let mut named: BTreeSet<String> = analysis.exports.into_iter().collect();

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        for reexport in &analysis.reexports {
            if !reexport.starts_with("./") && !reexport.starts_with("../") {
                return Err(FallbackError::resolution(
                    reexport,
                    "re-export does not point to a relative path",
                ));
            }

            let target = dir.join(reexport);
            let Some(resolved) = resolve_reexport_target(&target).await else {
                return Err(FallbackError::resolution(
                    reexport,
                    "no .cjs or .js file at the re-export target",
                ));
            };

            let canonical = tokio::fs::canonicalize(&resolved)
                .await
                .unwrap_or_else(|_| resolved.clone());
            if !visited.insert(canonical) {
                return Err(FallbackError::resolution(reexport, "re-export cycle"));
            }

            tracing::debug!(path = %resolved.display(), "chasing re-export");
            let code = tokio::fs::read_to_string(&resolved).await.map_err(|error| {
                FallbackError::resolution(
                    reexport,
                    format!("failed to read {}: {error}", resolved.display()),
                )
            })?;

            // ESM and JSON targets contribute nothing: their exports are not
            // statically enumerable from here
            if let ModuleInfo::Cjs { named_exports } =
                collect_inner(&code, &resolved, visited).await?
            {
                named.extend(named_exports);
            }
        }

        // `default` marks the default-export slot, not a real named binding
        named.remove("default");

        Ok(ModuleInfo::Cjs {
            named_exports: named.into_iter().collect(),
        })
    })
}

/// Finds the file a relative re-export points at, probing `.cjs` then `.js`
/// when the specifier has no extension.
async fn resolve_reexport_target(target: &Path) -> Option<PathBuf> {
    let name = target.to_string_lossy();
    let candidates: Vec<PathBuf> = if name.ends_with(".cjs") || name.ends_with(".js") {
        vec![target.to_path_buf()]
    } else {
        vec![
            PathBuf::from(format!("{name}.cjs")),
            PathBuf::from(format!("{name}.js")),
        ]
    };

    for candidate in candidates {
        if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
            if metadata.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}
