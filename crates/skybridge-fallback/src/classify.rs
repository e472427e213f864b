// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module format classification.
//!
//! Decides whether a source blob is CommonJS, an ES module or JSON by
//! static pattern inspection; the code is never executed. This is a
//! heuristic, not a parser: unusual code shapes can misclassify, which is
//! an accepted limitation of this layer (swap in a stricter parser behind
//! [`classify`] if that ever stops being acceptable).

use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// Module format derived from a source blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// ECMAScript module
    Esm,
    /// CommonJS module
    Cjs,
    /// JSON file
    Json,
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Esm => "esm",
            Self::Cjs => "cjs",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// `require(...)` with a string-literal argument
static REQUIRE_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"`][^'"`]+['"`]\s*\)"#).expect("require call pattern")
});

/// `module.exports` anywhere, or `exports.aaa = ...`
static DOTTED_EXPORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bmodule\.exports|\bexports\.[a-zA-Z_$][0-9a-zA-Z_$]*\s*="#)
        .expect("dotted exports pattern")
});

/// `exports["aaa"] = ...`
static BRACKET_EXPORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexports\[(['"])[a-zA-Z_$][0-9a-zA-Z_$]*\1\]\s*="#)
        .expect("bracket exports pattern")
});

/// `Object.defineProperty(exports, "aaa", ...)`
static DEFINE_PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Object\.defineProperty\(\s*(?:module\.)?exports\s*,\s*(['"]).*?\1\s*,"#)
        .expect("defineProperty pattern")
});

/// Classifies a source blob without executing it.
///
/// JSON is decided by the file name alone; everything else is CommonJS if
/// any CJS idiom appears in the text, otherwise an ES module.
pub fn classify(source: &str, path: &Path) -> ModuleFormat {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        return ModuleFormat::Json;
    }

    if is_common_js(source) {
        return ModuleFormat::Cjs;
    }

    ModuleFormat::Esm
}

fn is_common_js(source: &str) -> bool {
    if REQUIRE_CALL_RE.is_match(source) {
        return true;
    }

    // exports such as `module.exports = ...` or `exports.aaa = ...`
    if DOTTED_EXPORTS_RE.is_match(source) {
        return true;
    }

    // exports such as `exports["aaa"] = ...`
    if BRACKET_EXPORTS_RE.is_match(source) {
        return true;
    }

    // exports such as `Object.defineProperty(exports, "aaa", ...)`
    if DEFINE_PROPERTY_RE.is_match(source) {
        return true;
    }

    false
}
