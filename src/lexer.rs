//! Placeholder scanning for template sources.
//!
//! A template is a UTF-8 byte sequence made of literal runs and placeholders
//! of the form `${name}` or `${name:modifier}`. The lexer walks the source
//! once and yields tokens lazily; a `$` not immediately followed by `{` is
//! plain literal text. There is no escape sequence: a literal `${` is not
//! representable.

use crate::error::{Error, Result};
use memchr::{memchr, memchr_iter};

/// Location of a token in its template source.
///
/// `offset` and `len` are in bytes; `line` and `column` are 1-based and
/// refer to the first byte of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
    pub line: usize,
    pub column: usize,
}

/// A lexed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// A literal run, copied verbatim to the output
    Literal(&'a str),
    /// A `${name}` or `${name:modifier}` placeholder
    Placeholder { name: &'a str, modifier: Option<&'a str>, span: Span },
}

/// Lazy tokenizer over a single template source.
///
/// `template` is the template path, carried into errors for diagnostics.
pub struct Lexer<'a> {
    template: &'a str,
    source: &'a str,
    finger: usize,
    line: usize,
    line_start: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(template: &'a str, source: &'a str) -> Self {
        Self { template, source, finger: 0, line: 1, line_start: 0, failed: false }
    }

    /// Moves the finger forward, keeping the line bookkeeping current.
    fn advance_to(&mut self, to: usize) {
        let bytes = self.source.as_bytes();
        for newline in memchr_iter(b'\n', &bytes[self.finger..to]) {
            self.line += 1;
            self.line_start = self.finger + newline + 1;
        }
        self.finger = to;
    }

    fn span(&self, offset: usize, len: usize) -> Span {
        Span { offset, len, line: self.line, column: offset - self.line_start + 1 }
    }

    fn unterminated(&self, start: usize) -> Error {
        Error::UnterminatedPlaceholder {
            template: self.template.to_string(),
            span: self.span(start, self.source.len() - start),
        }
    }

    fn invalid_char(&self, at: usize) -> Error {
        let found = self.source[at..].chars().next().unwrap_or('\u{fffd}');
        Error::InvalidCharInName {
            template: self.template.to_string(),
            span: self.span(at, found.len_utf8()),
            found,
        }
    }

    /// Lexes the placeholder starting at the current finger, which must point
    /// at the `$` of a `${` sequence.
    fn lex_placeholder(&mut self) -> Result<Token<'a>> {
        let bytes = self.source.as_bytes();
        let start = self.finger;
        let name_start = start + 2;
        let name_end = scan_name(self.source, name_start);

        if name_end == name_start {
            return match bytes.get(name_start).copied() {
                None => Err(self.unterminated(start)),
                Some(b'}') | Some(b':') => Err(Error::EmptyName {
                    template: self.template.to_string(),
                    span: self.span(start, 2),
                }),
                Some(_) => Err(self.invalid_char(name_start)),
            };
        }
        let name = &self.source[name_start..name_end];

        let close = match bytes.get(name_end).copied() {
            None => return Err(self.unterminated(start)),
            Some(b'}') => name_end,
            Some(b':') => {
                let modifier_start = name_end + 1;
                let modifier_end = scan_name(self.source, modifier_start);
                if modifier_end == modifier_start {
                    return match bytes.get(modifier_start).copied() {
                        None => Err(self.unterminated(start)),
                        Some(_) => Err(self.invalid_char(modifier_start)),
                    };
                }
                match bytes.get(modifier_end).copied() {
                    None => return Err(self.unterminated(start)),
                    Some(b'}') => modifier_end,
                    Some(_) => return Err(self.invalid_char(modifier_end)),
                }
            }
            Some(_) => return Err(self.invalid_char(name_end)),
        };

        let modifier = if close > name_end {
            Some(&self.source[name_end + 1..close])
        } else {
            None
        };

        let end = close + 1;
        let span = self.span(start, end - start);
        self.advance_to(end);
        Ok(Token::Placeholder { name, modifier, span })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.finger >= self.source.len() {
            return None;
        }
        let bytes = self.source.as_bytes();

        let mut search = self.finger;
        loop {
            let dollar = match memchr(b'$', &bytes[search..]) {
                Some(found) => search + found,
                None => {
                    let literal = &self.source[self.finger..];
                    self.advance_to(self.source.len());
                    return Some(Ok(Token::Literal(literal)));
                }
            };

            // A '$' only opens a placeholder when followed by '{'.
            if bytes.get(dollar + 1) != Some(&b'{') {
                search = dollar + 1;
                continue;
            }

            // Flush the literal run up to the placeholder first.
            if dollar > self.finger {
                let literal = &self.source[self.finger..dollar];
                self.advance_to(dollar);
                return Some(Ok(Token::Literal(literal)));
            }

            let result = self.lex_placeholder();
            if result.is_err() {
                self.failed = true;
            }
            return Some(result);
        }
    }
}

/// Scans a run of `[A-Za-z0-9_]` starting at `start`, returning the end offset.
fn scan_name(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

/// Collects every token of a template source, stopping at the first error.
pub fn tokenize<'a>(template: &'a str, source: &'a str) -> Result<Vec<Token<'a>>> {
    Lexer::new(template, source).collect()
}
