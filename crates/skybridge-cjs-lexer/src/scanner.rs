// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from CommonJS source text.

use unicode_xid::UnicodeXID;

/// A single lexical token.
///
/// Only the shapes the export matcher cares about are distinguished; the
/// remaining operators collapse into [`TokenKind::Punct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident(String),
    /// String literal (quotes stripped, escapes taken verbatim)
    Str(String),
    /// Template literal (contents not captured)
    Template,
    /// Numeric literal
    Number,
    /// Regular expression literal
    Regex,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// A single `=` (assignment); `==`, `=>`, `+=` etc. become [`TokenKind::Punct`]
    Eq,
    /// Any other operator, keyed by its first character
    Punct(char),
    /// End of input
    Eof,
}

/// Tokenizes CommonJS source text.
///
/// Comments are skipped and regex literals are detected from context so that
/// quotes or braces inside them never derail the export matcher.
pub fn tokenize(source: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(source);
    let mut tokens: Vec<TokenKind> = Vec::new();
    loop {
        let regex_allowed = allows_regex(tokens.last());
        match scanner.next_token(regex_allowed) {
            TokenKind::Eof => break,
            token => tokens.push(token),
        }
    }
    tokens
}

/// Whether a `/` following the given token starts a regex literal rather
/// than a division.
fn allows_regex(prev: Option<&TokenKind>) -> bool {
    match prev {
        None => true,
        Some(TokenKind::Ident(name)) => matches!(
            name.as_str(),
            "return"
                | "typeof"
                | "instanceof"
                | "in"
                | "of"
                | "new"
                | "delete"
                | "void"
                | "do"
                | "else"
                | "case"
                | "yield"
                | "await"
        ),
        Some(
            TokenKind::Str(_)
            | TokenKind::Template
            | TokenKind::Number
            | TokenKind::Regex
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace,
        ) => false,
        Some(_) => true,
    }
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
        }
    }

    fn next_token(&mut self, regex_allowed: bool) -> TokenKind {
        self.skip_whitespace_and_comments();

        let Some(ch) = self.advance() else {
            return TokenKind::Eof;
        };

        match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => self.scan_dot(),
            '=' => self.scan_equal(),
            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_template(),
            '/' if regex_allowed => self.scan_regex(),
            '0'..='9' => self.scan_number(),
            c if is_id_start(c) => self.scan_identifier(c),
            c => self.scan_operator(c),
        }
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, ch)| ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            match (self.peek(), self.peek_next()) {
                (Some('/'), Some('/')) => self.skip_line_comment(),
                (Some('/'), Some('*')) => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !matches!(self.peek(), None | Some('\n')) {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance();
        self.advance();
        while let Some(ch) = self.advance() {
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                return;
            }
        }
    }

    fn scan_dot(&mut self) -> TokenKind {
        if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return self.scan_number();
        }
        if self.peek() == Some('.') && self.peek_next() == Some('.') {
            self.advance();
            self.advance();
            return TokenKind::Ellipsis;
        }
        TokenKind::Dot
    }

    fn scan_equal(&mut self) -> TokenKind {
        match self.peek() {
            // `==` / `===`
            Some('=') => {
                while self.peek() == Some('=') {
                    self.advance();
                }
                TokenKind::Punct('=')
            }
            // `=>`
            Some('>') => {
                self.advance();
                TokenKind::Punct('=')
            }
            _ => TokenKind::Eq,
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                '\\' => {
                    if let Some(escaped) = self.advance() {
                        value.push(escaped);
                    }
                }
                c if c == quote => break,
                c => value.push(c),
            }
        }
        TokenKind::Str(value)
    }

    fn scan_template(&mut self) -> TokenKind {
        while let Some(ch) = self.advance() {
            match ch {
                '\\' => {
                    self.advance();
                }
                '`' => break,
                '$' if self.peek() == Some('{') => {
                    self.advance();
                    self.skip_interpolation();
                }
                _ => {}
            }
        }
        TokenKind::Template
    }

    /// Skips a `${...}` interpolation body, including nested braces, strings,
    /// templates and comments.
    fn skip_interpolation(&mut self) {
        let mut depth = 1usize;
        while depth > 0 {
            let Some(ch) = self.advance() else { return };
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                '\\' => {
                    self.advance();
                }
                '\'' | '"' => {
                    self.scan_string(ch);
                }
                '`' => {
                    self.scan_template();
                }
                '/' => match self.peek() {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => {
                        // skip_block_comment consumes the opener itself, but
                        // the `/` is already consumed here
                        self.advance();
                        while let Some(c) = self.advance() {
                            if c == '*' && self.peek() == Some('/') {
                                self.advance();
                                break;
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
                let consumed = self.advance();
                if matches!(consumed, Some('e') | Some('E'))
                    && matches!(self.peek(), Some('+') | Some('-'))
                {
                    self.advance();
                }
            } else {
                break;
            }
        }
        TokenKind::Number
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::new();
        name.push(first);
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Ident(name)
    }

    fn scan_regex(&mut self) -> TokenKind {
        let mut in_class = false;
        while let Some(ch) = self.advance() {
            match ch {
                '\\' => {
                    self.advance();
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                // a newline means this was not a regex after all; bail out
                '\n' => break,
                _ => {}
            }
        }
        while matches!(self.peek(), Some(c) if is_id_continue(c)) {
            self.advance();
        }
        TokenKind::Regex
    }

    fn scan_operator(&mut self, first: char) -> TokenKind {
        while matches!(self.peek(), Some(c) if is_operator_continue(c)) {
            self.advance();
        }
        TokenKind::Punct(first)
    }
}

fn is_id_start(ch: char) -> bool {
    ch == '$' || ch == '_' || UnicodeXID::is_xid_start(ch)
}

pub(crate) fn is_id_continue(ch: char) -> bool {
    ch == '$' || UnicodeXID::is_xid_continue(ch)
}

/// Characters that extend a multi-character operator (`+=`, `&&=`, `>>>`, ...).
fn is_operator_continue(ch: char) -> bool {
    matches!(
        ch,
        '+' | '-' | '*' | '%' | '&' | '|' | '^' | '<' | '>' | '=' | '!' | '?'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_member_assignment() {
        let tokens = tokenize("exports.foo = 1;");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("exports".into()),
                TokenKind::Dot,
                TokenKind::Ident("foo".into()),
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn compound_assignment_is_not_eq() {
        let tokens = tokenize("exports.foo += 1");
        assert!(!tokens.contains(&TokenKind::Eq));
        assert!(tokens.contains(&TokenKind::Punct('+')));
    }

    #[test]
    fn equality_and_arrow_are_not_eq() {
        assert!(!tokenize("a === b").contains(&TokenKind::Eq));
        assert!(!tokenize("a == b").contains(&TokenKind::Eq));
        assert!(!tokenize("() => 1").contains(&TokenKind::Eq));
    }

    #[test]
    fn skips_comments() {
        let tokens = tokenize("// exports.fake = 1\n/* exports.other = 2 */ exports.real = 3");
        assert_eq!(
            tokens
                .iter()
                .filter(|t| matches!(t, TokenKind::Ident(_)))
                .count(),
            2
        );
        assert!(tokens.contains(&TokenKind::Ident("real".into())));
    }

    #[test]
    fn string_contents_are_preserved() {
        let tokens = tokenize(r#"require('./a\'b')"#);
        assert!(tokens.contains(&TokenKind::Str("./a'b".into())));
    }

    #[test]
    fn regex_literal_does_not_leak_quotes() {
        // the quote inside the regex must not start a string
        let tokens = tokenize(r#"const re = /['"]/g; exports.ok = 1;"#);
        assert!(tokens.contains(&TokenKind::Regex));
        assert!(tokens.contains(&TokenKind::Ident("ok".into())));
    }

    #[test]
    fn division_is_not_a_regex() {
        let tokens = tokenize("const x = a / b / c;");
        assert!(!tokens.contains(&TokenKind::Regex));
    }

    #[test]
    fn template_interpolation_is_opaque() {
        let tokens = tokenize("const s = `a ${ { b: '}' } } c`; exports.after = 1;");
        assert!(tokens.contains(&TokenKind::Template));
        assert!(tokens.contains(&TokenKind::Ident("after".into())));
    }

    #[test]
    fn ellipsis_vs_dot() {
        let tokens = tokenize("...rest");
        assert_eq!(tokens[0], TokenKind::Ellipsis);
        let tokens = tokenize("a.b");
        assert_eq!(tokens[1], TokenKind::Dot);
    }
}
