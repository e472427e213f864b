// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static discovery of CommonJS exports and re-exports.
//!
//! Sandboxed runtimes need the named exports of a CommonJS module *before*
//! executing it, so this crate lexes the source text and pattern-matches the
//! common export idioms instead of evaluating anything.
//!
//! ## Recognized export idioms
//!
//! ```text
//! exports.name = ...
//! module.exports.name = ...
//! exports["name"] = ...
//! Object.defineProperty(exports, "name", ...)
//! module.exports = { name: ..., shorthand, "str": ..., method() {} }
//! ```
//!
//! ## Recognized re-export idioms
//!
//! ```text
//! module.exports = require("./other")
//! Object.assign(module.exports, require("./other"), { extra: 1 })
//! module.exports = { ...require("./other") }
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use skybridge_cjs_lexer::parse;
//!
//! let analysis = parse("module.exports.foo = 1; exports.bar = 2;");
//! assert_eq!(analysis.exports, vec!["foo", "bar"]);
//! ```
//!
//! This is a heuristic lexer, not a JavaScript parser: exports constructed
//! through unusual code shapes (computed keys, helper functions, loops) are
//! not discovered. The `__esModule` interop marker is filtered out since it
//! never denotes a real named export.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod matcher;
mod scanner;

pub use scanner::{tokenize, TokenKind};

/// Result of statically lexing one CommonJS module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Names assigned through a recognized export idiom, in source order.
    /// May contain duplicates; callers union them as they see fit.
    pub exports: Vec<String>,
    /// Specifiers whose export surface is folded into this module's.
    pub reexports: Vec<String>,
}

/// Lexes `source` and collects every statically visible CommonJS export and
/// re-export.
pub fn parse(source: &str) -> Analysis {
    matcher::analyze(&scanner::tokenize(source))
}
