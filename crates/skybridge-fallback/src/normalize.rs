// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Cross-platform specifier and path canonicalization.
//!
//! The sandbox assumes every absolute path begins with a path separator,
//! which is wrong on systems with drive-letter absolute paths (`C:/...`).
//! All compensation for that asymmetry lives here so the request handler
//! stays platform-agnostic.

use regex::Regex;
use std::sync::LazyLock;

/// Script extensions a referrer may be missing, in probe order.
pub const SCRIPT_EXTENSIONS: [&str; 4] = [".js", ".jsx", ".cjs", ".mjs"];

/// A spurious separator prepended to a drive-letter absolute path
static DRIVE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[A-Za-z]:/").expect("drive prefix pattern"));

/// Compensates for the sandbox's leading-separator convention on incoming
/// and outgoing paths.
///
/// Constructed with [`PathNormalizer::new`] the behavior follows the host
/// platform; [`PathNormalizer::with_drive_letter_paths`] pins it explicitly
/// so the quirk handling is testable anywhere.
#[derive(Debug, Clone, Copy)]
pub struct PathNormalizer {
    drive_letter_paths: bool,
}

impl PathNormalizer {
    /// A normalizer for the host platform.
    pub fn new() -> Self {
        Self {
            drive_letter_paths: cfg!(windows),
        }
    }

    /// A normalizer with the drive-letter compensation pinned on or off.
    pub fn with_drive_letter_paths(drive_letter_paths: bool) -> Self {
        Self { drive_letter_paths }
    }

    /// Removes the sandbox-imposed corruption from an incoming path.
    ///
    /// On drive-letter platforms an incoming absolute path carries a
    /// spurious leading separator (`/C:/...`). After a redirect the sandbox
    /// may additionally glue a stale prefix in front of the real location,
    /// so the fix keeps the suffix from the *last* occurrence of the
    /// drive-letter pattern. Elsewhere this is the identity function.
    pub fn normalize(&self, path: &str) -> String {
        if !self.drive_letter_paths {
            return path.to_string();
        }
        let Some(found) = DRIVE_PREFIX_RE.find(path) else {
            return path.to_string();
        };
        let prefix = found.as_str();
        match path.rfind(prefix) {
            // stale prefix glued in front: keep the real trailing path
            Some(last) if last > 0 => path[last + 1..].to_string(),
            // just the extra separator
            _ => path[1..].to_string(),
        }
    }

    /// Prepares an absolute path for emission back to the sandbox, which
    /// always expects a leading separator, even where absolute paths don't
    /// naturally start with one.
    pub fn emit_absolute(&self, path: &str) -> String {
        if self.drive_letter_paths {
            format!("/{path}")
        } else {
            path.to_string()
        }
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensures a referrer path carries a script extension.
///
/// Referrers routinely arrive extensionless: a module that was itself
/// resolved without an extension reports its original path when it imports
/// something. Relative resolution needs a real file, so probe each known
/// extension and take the first that names one. If nothing matches, the
/// input is returned unchanged and resolution fails downstream as a normal
/// not-found.
pub async fn with_js_extension(path: &str) -> String {
    let has_extension = SCRIPT_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
    if has_extension {
        return path.to_string();
    }

    for extension in SCRIPT_EXTENSIONS {
        let candidate = format!("{path}{extension}");
        if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
            if metadata.is_file() {
                return candidate;
            }
        }
    }

    path.to_string()
}
