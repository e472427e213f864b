// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Pattern matching over the token stream for CommonJS export idioms.

use crate::scanner::{is_id_continue, TokenKind};
use crate::Analysis;

pub(crate) fn analyze(tokens: &[TokenKind]) -> Analysis {
    let mut analysis = Analysis::default();
    let mut i = 0;
    while i < tokens.len() {
        let next = match_exports_member(tokens, i, &mut analysis)
            .or_else(|| match_module_exports_assignment(tokens, i, &mut analysis))
            .or_else(|| match_define_property(tokens, i, &mut analysis))
            .or_else(|| match_object_assign(tokens, i, &mut analysis));
        i = next.unwrap_or(i + 1);
    }
    // `__esModule` is an interop marker, never a real named export
    analysis.exports.retain(|name| name != "__esModule");
    analysis
}

fn ident_at(tokens: &[TokenKind], i: usize, name: &str) -> bool {
    matches!(tokens.get(i), Some(TokenKind::Ident(n)) if n == name)
}

/// Matches `exports` or `module.exports` used as an assignment target or a
/// call argument. Rejects the match when the preceding token is a `.` so
/// that `foo.exports` is not mistaken for the module object.
///
/// Returns the index past the matched tokens and whether the `module.`
/// prefix was present.
fn exports_base(tokens: &[TokenKind], i: usize) -> Option<(usize, bool)> {
    if i > 0 && matches!(tokens[i - 1], TokenKind::Dot) {
        return None;
    }
    if ident_at(tokens, i, "module")
        && matches!(tokens.get(i + 1), Some(TokenKind::Dot))
        && ident_at(tokens, i + 2, "exports")
    {
        return Some((i + 3, true));
    }
    if ident_at(tokens, i, "exports") {
        return Some((i + 1, false));
    }
    None
}

/// `require("spec")`; returns the index past the closing paren.
fn match_require_call(tokens: &[TokenKind], i: usize) -> Option<usize> {
    if i > 0 && matches!(tokens[i - 1], TokenKind::Dot) {
        return None;
    }
    if ident_at(tokens, i, "require")
        && matches!(tokens.get(i + 1), Some(TokenKind::LParen))
        && matches!(tokens.get(i + 2), Some(TokenKind::Str(_)))
        && matches!(tokens.get(i + 3), Some(TokenKind::RParen))
    {
        Some(i + 4)
    } else {
        None
    }
}

fn require_specifier(tokens: &[TokenKind], require_index: usize) -> Option<String> {
    match tokens.get(require_index + 2) {
        Some(TokenKind::Str(spec)) => Some(spec.clone()),
        _ => None,
    }
}

/// `exports.name =`, `module.exports.name =`, `exports["name"] =`.
fn match_exports_member(
    tokens: &[TokenKind],
    i: usize,
    analysis: &mut Analysis,
) -> Option<usize> {
    let (j, _) = exports_base(tokens, i)?;
    match tokens.get(j)? {
        TokenKind::Dot => {
            if let (Some(TokenKind::Ident(name)), Some(TokenKind::Eq)) =
                (tokens.get(j + 1), tokens.get(j + 2))
            {
                analysis.exports.push(name.clone());
                return Some(j + 3);
            }
            None
        }
        TokenKind::LBracket => {
            if let (Some(TokenKind::Str(name)), Some(TokenKind::RBracket), Some(TokenKind::Eq)) =
                (tokens.get(j + 1), tokens.get(j + 2), tokens.get(j + 3))
            {
                if is_identifier_name(name) {
                    analysis.exports.push(name.clone());
                }
                return Some(j + 4);
            }
            None
        }
        _ => None,
    }
}

/// `module.exports = require("spec")` and `module.exports = { ... }`.
///
/// A bare `exports = ...` rebinds the local variable without changing the
/// module's export object, so only the `module.`-prefixed form counts.
fn match_module_exports_assignment(
    tokens: &[TokenKind],
    i: usize,
    analysis: &mut Analysis,
) -> Option<usize> {
    let (j, has_module) = exports_base(tokens, i)?;
    if !has_module || !matches!(tokens.get(j), Some(TokenKind::Eq)) {
        return None;
    }
    let value = j + 1;
    if let Some(end) = match_require_call(tokens, value) {
        if let Some(spec) = require_specifier(tokens, value) {
            analysis.reexports.push(spec);
        }
        return Some(end);
    }
    if matches!(tokens.get(value), Some(TokenKind::LBrace)) {
        return Some(scan_object_literal(tokens, value, analysis));
    }
    None
}

/// `Object.defineProperty(exports, "name", ...)`.
fn match_define_property(
    tokens: &[TokenKind],
    i: usize,
    analysis: &mut Analysis,
) -> Option<usize> {
    if i > 0 && matches!(tokens[i - 1], TokenKind::Dot) {
        return None;
    }
    if !(ident_at(tokens, i, "Object")
        && matches!(tokens.get(i + 1), Some(TokenKind::Dot))
        && ident_at(tokens, i + 2, "defineProperty")
        && matches!(tokens.get(i + 3), Some(TokenKind::LParen)))
    {
        return None;
    }
    let (j, _) = exports_base(tokens, i + 4)?;
    if !matches!(tokens.get(j), Some(TokenKind::Comma)) {
        return None;
    }
    if let (Some(TokenKind::Str(name)), Some(TokenKind::Comma)) =
        (tokens.get(j + 1), tokens.get(j + 2))
    {
        if is_identifier_name(name) {
            analysis.exports.push(name.clone());
        }
        return Some(j + 3);
    }
    None
}

/// `Object.assign(module.exports, require("a"), { b: 1 }, ...)`.
fn match_object_assign(
    tokens: &[TokenKind],
    i: usize,
    analysis: &mut Analysis,
) -> Option<usize> {
    if i > 0 && matches!(tokens[i - 1], TokenKind::Dot) {
        return None;
    }
    if !(ident_at(tokens, i, "Object")
        && matches!(tokens.get(i + 1), Some(TokenKind::Dot))
        && ident_at(tokens, i + 2, "assign")
        && matches!(tokens.get(i + 3), Some(TokenKind::LParen)))
    {
        return None;
    }
    let (mut j, _) = exports_base(tokens, i + 4)?;
    loop {
        match tokens.get(j) {
            None => return Some(j),
            Some(TokenKind::RParen) => return Some(j + 1),
            Some(TokenKind::Comma) => j += 1,
            Some(TokenKind::LBrace) => j = scan_object_literal(tokens, j, analysis),
            _ => {
                if let Some(end) = match_require_call(tokens, j) {
                    if let Some(spec) = require_specifier(tokens, j) {
                        analysis.reexports.push(spec);
                    }
                    j = end;
                } else {
                    j = skip_value(tokens, j);
                }
            }
        }
    }
}

/// Walks a `{ ... }` literal collecting identifier-shaped keys as exports
/// and `...require("spec")` spreads as re-exports. Returns the index past
/// the closing brace.
fn scan_object_literal(tokens: &[TokenKind], open: usize, analysis: &mut Analysis) -> usize {
    let mut i = open + 1;
    loop {
        match tokens.get(i) {
            None => return i,
            Some(TokenKind::RBrace) => return i + 1,
            Some(TokenKind::Comma) => i += 1,
            _ => i = scan_object_entry(tokens, i, analysis),
        }
    }
}

/// Consumes one object-literal entry, leaving `i` at the delimiting `,` or
/// the closing `}`.
fn scan_object_entry(tokens: &[TokenKind], i: usize, analysis: &mut Analysis) -> usize {
    // spread re-export: `...require("spec")`
    if matches!(tokens.get(i), Some(TokenKind::Ellipsis)) {
        if let Some(end) = match_require_call(tokens, i + 1) {
            if let Some(spec) = require_specifier(tokens, i + 1) {
                analysis.reexports.push(spec);
            }
            return end;
        }
        return skip_value(tokens, i + 1);
    }

    // accessor shorthand: `get name() { ... }`
    let mut key = i;
    if let Some(TokenKind::Ident(name)) = tokens.get(i) {
        if (name == "get" || name == "set")
            && matches!(tokens.get(i + 1), Some(TokenKind::Ident(_)))
        {
            key = i + 1;
        }
    }

    match tokens.get(key) {
        Some(TokenKind::Ident(name)) => match tokens.get(key + 1) {
            Some(TokenKind::Colon) => {
                analysis.exports.push(name.clone());
                skip_value(tokens, key + 2)
            }
            Some(TokenKind::Comma) | Some(TokenKind::RBrace) | None => {
                analysis.exports.push(name.clone());
                key + 1
            }
            Some(TokenKind::LParen) => {
                analysis.exports.push(name.clone());
                skip_value(tokens, key + 1)
            }
            _ => skip_value(tokens, key),
        },
        Some(TokenKind::Str(name)) => {
            if matches!(tokens.get(key + 1), Some(TokenKind::Colon)) {
                if is_identifier_name(name) {
                    analysis.exports.push(name.clone());
                }
                skip_value(tokens, key + 2)
            } else {
                skip_value(tokens, key)
            }
        }
        _ => skip_value(tokens, key),
    }
}

/// Skips a value expression, stopping at the first `,`, `}` or `)` that is
/// not nested inside brackets of its own.
fn skip_value(tokens: &[TokenKind], mut i: usize) -> usize {
    let mut depth = 0usize;
    while let Some(token) = tokens.get(i) {
        match token {
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket if depth == 0 => return i,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => depth -= 1,
            TokenKind::Comma if depth == 0 => return i,
            _ => {}
        }
        i += 1;
    }
    i
}

/// Whether a string key could have been written as a bare identifier.
fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let first_ok =
        first == '$' || first == '_' || unicode_xid::UnicodeXID::is_xid_start(first);
    first_ok && chars.all(is_id_continue)
}
