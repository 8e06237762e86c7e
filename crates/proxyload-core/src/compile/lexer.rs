//! Token scanner for bundled ES modules.
//!
//! This is not a full JavaScript parser. It produces just enough structure
//! for the rewrite pass to find top-level `import`/`export` statements
//! reliably: strings, comments, template literals (including nested `${}`
//! substitutions) and regular-expression literals are consumed as opaque
//! units so their contents can never be mistaken for statements.

use std::fmt;

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Single- or double-quoted string literal (quotes included).
    Str,
    /// Template literal, substitutions included.
    Template,
    /// Regular-expression literal, flags included.
    Regex,
    /// Numeric literal.
    Number,
    /// Single punctuation character.
    Punct,
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == 1 && self.text.starts_with(c)
    }

    /// Contents of a string literal without its quotes.
    pub fn string_value(&self) -> Option<&'a str> {
        let text = self.text;
        (self.kind == TokenKind::Str && text.len() >= 2).then(|| &text[1..text.len() - 1])
    }
}

/// Malformed input (unterminated literal or comment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for SyntaxError {}

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Keywords whose parenthesized condition is followed by a statement.
const STATEMENT_HEADERS: &[&str] = &["if", "while", "for", "with"];

/// An open bracket awaiting its close.
#[derive(Debug, Clone, Copy)]
enum Group {
    /// `(`; `header` when it holds the condition of an `if`/`while`/`for`/`with`.
    Paren { header: bool },
    /// `{`; `block` for statement blocks, false for object literals and `${`.
    Brace { block: bool },
    Bracket,
}

/// Scan `source` into tokens. Comments and whitespace are dropped.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Last significant token (`=>` for the `>` of an arrow).
    prev: Option<(TokenKind, &'a str)>,
    /// Whether a `/` at the current position starts a regular expression.
    regex_ok: bool,
    groups: Vec<Group>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut pos = 0;
        if src.starts_with('\u{feff}') {
            pos = '\u{feff}'.len_utf8();
        }
        if src[pos..].starts_with("#!") {
            pos += src[pos..].find('\n').unwrap_or(src.len() - pos);
        }
        Self {
            src,
            bytes: src.as_bytes(),
            pos,
            prev: None,
            regex_ok: true,
            groups: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, offset: usize, message: &str) -> SyntaxError {
        SyntaxError {
            offset,
            message: message.to_string(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, SyntaxError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek(0) else {
            return Ok(None);
        };

        let kind = match c {
            b'"' | b'\'' => {
                self.scan_string(c)?;
                TokenKind::Str
            }
            b'`' => {
                self.scan_template()?;
                TokenKind::Template
            }
            b'/' if self.regex_ok => {
                self.scan_regex()?;
                TokenKind::Regex
            }
            b'0'..=b'9' => {
                self.scan_number();
                TokenKind::Number
            }
            b'.' if self.peek(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.scan_number();
                TokenKind::Number
            }
            c if is_ident_start(c) => {
                self.scan_ident();
                TokenKind::Ident
            }
            _ => {
                self.pos += 1;
                TokenKind::Punct
            }
        };

        let text = &self.src[start..self.pos];
        let (regex_ok, prev_text) = match kind {
            TokenKind::Punct => self.punct(text, start),
            TokenKind::Ident => (REGEX_PRECEDING_KEYWORDS.contains(&text), text),
            _ => (false, text),
        };
        self.regex_ok = regex_ok;
        self.prev = Some((kind, prev_text));
        Ok(Some(Token {
            kind,
            text,
            start,
            end: self.pos,
        }))
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    self.pos += self.src[self.pos..]
                        .find('\n')
                        .unwrap_or(self.src.len() - self.pos);
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => return Err(self.error(start, "unterminated block comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Track brackets for a punctuation token. Returns whether a regex may
    /// follow it, and the text to remember as the previous token.
    fn punct(&mut self, text: &'a str, start: usize) -> (bool, &'a str) {
        match text {
            "(" => {
                let header = matches!(
                    self.prev,
                    Some((TokenKind::Ident, word)) if STATEMENT_HEADERS.contains(&word)
                );
                self.groups.push(Group::Paren { header });
                (true, text)
            }
            "{" => {
                let block = self.brace_opens_block();
                self.groups.push(Group::Brace { block });
                (true, text)
            }
            "[" => {
                self.groups.push(Group::Bracket);
                (true, text)
            }
            // After `if (a)` or a block a statement starts; otherwise `/` divides.
            ")" => (
                matches!(self.groups.pop(), Some(Group::Paren { header: true })),
                text,
            ),
            "}" => (
                matches!(self.groups.pop(), Some(Group::Brace { block: true })),
                text,
            ),
            "]" => {
                self.groups.pop();
                (false, text)
            }
            ">" if start > 0
                && self.bytes[start - 1] == b'='
                && matches!(self.prev, Some((TokenKind::Punct, "="))) =>
            {
                (true, "=>")
            }
            _ => (true, text),
        }
    }

    /// Whether a `{` at the current position opens a statement block rather
    /// than an object literal.
    fn brace_opens_block(&self) -> bool {
        match self.prev {
            None => true,
            Some((TokenKind::Punct, p)) => match p {
                ";" | ")" | "}" | "=>" => true,
                "{" => matches!(self.groups.last(), Some(Group::Brace { block: true })),
                _ => false,
            },
            // `export default {` is an object literal.
            Some((TokenKind::Ident, word)) => {
                matches!(word, "else" | "do")
                    || (word != "default" && !REGEX_PRECEDING_KEYWORDS.contains(&word))
            }
            Some(_) => true,
        }
    }

    fn scan_string(&mut self, quote: u8) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            match c {
                b'\\' => self.pos += 2,
                b'\n' => break,
                c if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.error(start, "unterminated string literal"))
    }

    fn scan_template(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match (self.peek(0), self.peek(1)) {
                (None, _) => return Err(self.error(start, "unterminated template literal")),
                (Some(b'\\'), _) => self.pos += 2,
                (Some(b'`'), _) => {
                    self.pos += 1;
                    return Ok(());
                }
                (Some(b'$'), Some(b'{')) => {
                    self.pos += 2;
                    self.scan_substitution(start)?;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Consume tokens up to the `}` closing a `${` substitution.
    fn scan_substitution(&mut self, template_start: usize) -> Result<(), SyntaxError> {
        self.prev = Some((TokenKind::Punct, "{"));
        self.regex_ok = true;
        self.groups.push(Group::Brace { block: false });
        let mut depth = 1usize;
        loop {
            let Some(token) = self.next_token()? else {
                return Err(self.error(template_start, "unterminated template substitution"));
            };
            if token.is_punct('{') {
                depth += 1;
            } else if token.is_punct('}') {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    fn scan_regex(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(self.error(start, "unterminated regular expression")),
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
        Ok(())
    }

    fn scan_number(&mut self) {
        while self
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.')
        {
            self.pos += 1;
        }
    }

    fn scan_ident(&mut self) {
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80
}

fn is_ident_part(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
