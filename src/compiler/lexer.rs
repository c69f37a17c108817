use crate::compiler::span::Span;
use crate::compiler::token::{Token, TokenKind};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════
//  Error type
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error)]
#[error("lex error at {span}: {message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

const TAB_WIDTH: usize = 8;

// ═══════════════════════════════════════════════════════════════
//  Lexer
// ═══════════════════════════════════════════════════════════════

/// Indentation-aware tokenizer. Produces `Newline` at the end of every
/// logical line and `Indent`/`Dedent` pairs around nested suites; line
/// breaks inside brackets are insignificant.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    /// Tokenize the entire source into a Vec<Token>.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                self.lex_indentation(&mut tokens)?;
            }

            self.skip_inline_whitespace_and_comments()?;
            if self.is_at_end() {
                break;
            }

            if self.peek() == Some('\n') {
                let span = self.here();
                self.advance();
                if self.bracket_depth == 0 {
                    tokens.push(Token::new(TokenKind::Newline, span));
                    self.at_line_start = true;
                }
                continue;
            }

            tokens.push(self.next_token()?);
        }

        let end = self.here();
        if tokens
            .last()
            .map_or(false, |t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            tokens.push(Token::new(TokenKind::Newline, end));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, end));
        }
        tokens.push(Token::new(TokenKind::EOF, end));
        Ok(tokens)
    }

    /// Measure the indentation of the next non-blank line and emit the
    /// matching `Indent`/`Dedent` tokens. Blank and comment-only lines are
    /// consumed without affecting the indent stack.
    fn lex_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        loop {
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\r' | '\x0C' => {}
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                None => return Ok(()),
                Some('\n') => {
                    self.advance();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {}
            }

            let span = self.here();
            let current = self.indent_stack.last().copied().unwrap_or(0);
            if width > current {
                self.indent_stack.push(width);
                tokens.push(Token::new(TokenKind::Indent, span));
            } else {
                while self.indent_stack.last().map_or(false, |&top| top > width) {
                    self.indent_stack.pop();
                    tokens.push(Token::new(TokenKind::Dedent, span));
                }
                if self.indent_stack.last().copied().unwrap_or(0) != width {
                    return Err(LexError {
                        message: "unindent does not match any outer indentation level"
                            .to_string(),
                        span,
                    });
                }
            }
            self.at_line_start = false;
            return Ok(());
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;
        let c = self.advance();

        let kind = match c {
            '(' => {
                self.bracket_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RParen
            }
            '[' => {
                self.bracket_depth += 1;
                TokenKind::LBracket
            }
            ']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBracket
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Eq,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }

            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }

            '"' | '\'' => return self.lex_string(c, start, start_line, start_col),

            c if c.is_ascii_digit() => {
                return self.lex_number(start, start_line, start_col);
            }

            c if c.is_alphabetic() || c == '_' => {
                return self.lex_ident_or_keyword(start, start_line, start_col);
            }

            other => {
                return Err(LexError {
                    message: format!("unexpected character '{}'", other),
                    span: Span::new(start, self.pos, start_line, start_col),
                });
            }
        };

        Ok(Token::new(
            kind,
            Span::new(start, self.pos, start_line, start_col),
        ))
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn here(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.col)
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        c
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.peek() != Some('\n') {
            self.advance();
        }
    }

    /// Skip spaces, comments and explicit `\` line joins. Newlines are only
    /// skipped here while inside brackets.
    fn skip_inline_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\x0C' => {
                    self.advance();
                }
                '\n' if self.bracket_depth > 0 => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\\' => {
                    let span = self.here();
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.peek() != Some('\n') {
                        return Err(LexError {
                            message: "unexpected character after line continuation".to_string(),
                            span,
                        });
                    }
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn lex_string(
        &mut self,
        quote: char,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, LexError> {
        let triple = self.peek() == Some(quote) && self.peek_next() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    span: Span::new(start, self.pos, start_line, start_col),
                });
            }

            let c = self.advance();
            match c {
                c if c == quote && !triple => break,
                c if c == quote
                    && self.peek() == Some(quote)
                    && self.peek_next() == Some(quote) =>
                {
                    self.advance();
                    self.advance();
                    break;
                }
                '\n' if !triple => {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        span: Span::new(start, self.pos, start_line, start_col),
                    });
                }
                '\\' => {
                    if self.is_at_end() {
                        return Err(LexError {
                            message: "unterminated escape sequence".to_string(),
                            span: Span::new(start, self.pos, start_line, start_col),
                        });
                    }
                    let escaped = self.advance();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'a' => value.push('\x07'),
                        'b' => value.push('\x08'),
                        'f' => value.push('\x0C'),
                        'v' => value.push('\x0B'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        '"' => value.push('"'),
                        '\n' => {}
                        '0'..='7' => value.push(self.lex_octal_escape(
                            escaped,
                            start,
                            start_line,
                            start_col,
                        )?),
                        'x' => value.push(self.lex_hex_escape(2, start, start_line, start_col)?),
                        'u' => value.push(self.lex_hex_escape(4, start, start_line, start_col)?),
                        'U' => value.push(self.lex_hex_escape(8, start, start_line, start_col)?),
                        other => {
                            // Unknown escapes keep their backslash.
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                _ => value.push(c),
            }
        }

        Ok(Token::new(
            TokenKind::StringLit(value),
            Span::new(start, self.pos, start_line, start_col),
        ))
    }

    fn lex_hex_escape(
        &mut self,
        digits: usize,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<char, LexError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or_else(|| LexError {
                message: format!("truncated \\x/\\u escape: expected {} hex digits", digits),
                span: Span::new(start, self.pos, start_line, start_col),
            })?;
            self.advance();
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| LexError {
            message: format!("invalid code point U+{:X} in escape", code),
            span: Span::new(start, self.pos, start_line, start_col),
        })
    }

    /// `\ooo` escape: up to three octal digits, the first already consumed.
    fn lex_octal_escape(
        &mut self,
        first: char,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<char, LexError> {
        let mut code = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(digit) => {
                    self.advance();
                    code = code * 8 + digit;
                }
                None => break,
            }
        }
        char::from_u32(code).ok_or_else(|| LexError {
            message: format!("invalid octal escape \\{:o}", code),
            span: Span::new(start, self.pos, start_line, start_col),
        })
    }

    fn lex_number(
        &mut self,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, LexError> {
        // Already consumed first digit
        if self.source[start] == '0' {
            let radix = match self.peek() {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                return self.lex_radix_int(radix, start, start_line, start_col);
            }
        }
        self.skip_digits();

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().map_or(true, |c| c != '.') {
            is_float = true;
            self.advance();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let has_sign = matches!(self.peek_next(), Some('+') | Some('-'));
            let digit_at = if has_sign { self.pos + 2 } else { self.pos + 1 };
            if self
                .source
                .get(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
                if has_sign {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text: String = self.source[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        let span = Span::new(start, self.pos, start_line, start_col);

        if is_float {
            let value: f64 = text.parse().map_err(|_| LexError {
                message: format!("invalid float literal '{}'", text),
                span,
            })?;
            return Ok(Token::new(TokenKind::FloatLit(value), span));
        }

        let digits = text.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Token::new(TokenKind::IntLit("0".to_string()), span));
        }
        if digits.len() != text.len() {
            return Err(LexError {
                message: "leading zeros in decimal integer literals are not permitted"
                    .to_string(),
                span,
            });
        }
        Ok(Token::new(TokenKind::IntLit(text), span))
    }

    /// `0x`/`0o`/`0b` literal; the prefix is already consumed. Produces the
    /// decimal text of the value.
    fn lex_radix_int(
        &mut self,
        radix: u32,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, LexError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c == '_' {
                self.advance();
            } else if c.is_digit(radix) {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let span = Span::new(start, self.pos, start_line, start_col);
        let kind = match radix {
            16 => "hexadecimal",
            8 => "octal",
            _ => "binary",
        };
        if let Some(c) = self.peek().filter(|c| c.is_alphanumeric()) {
            return Err(LexError {
                message: format!("invalid digit '{}' in {} literal", c, kind),
                span,
            });
        }
        if digits.is_empty() {
            return Err(LexError {
                message: format!("invalid {} literal", kind),
                span,
            });
        }

        Ok(Token::new(TokenKind::IntLit(radix_to_decimal(&digits, radix)), span))
    }

    fn skip_digits(&mut self) {
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_digit() || c == '_')
        {
            self.advance();
        }
    }

    fn lex_ident_or_keyword(
        &mut self,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, LexError> {
        while self
            .peek()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text: String = self.source[start..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));

        Ok(Token::new(
            kind,
            Span::new(start, self.pos, start_line, start_col),
        ))
    }
}

/// Decimal text of `digits` read in `radix`. Integer literals are unbounded,
/// so the value is accumulated as little-endian decimal digits.
fn radix_to_decimal(digits: &str, radix: u32) -> String {
    let mut decimal: Vec<u32> = vec![0];
    for c in digits.chars() {
        let mut carry = c.to_digit(radix).unwrap_or(0);
        for d in decimal.iter_mut() {
            let v = *d * radix + carry;
            *d = v % 10;
            carry = v / 10;
        }
        while carry > 0 {
            decimal.push(carry % 10);
            carry /= 10;
        }
    }
    while decimal.len() > 1 && decimal.last() == Some(&0) {
        decimal.pop();
    }
    decimal
        .iter()
        .rev()
        .filter_map(|&d| char::from_digit(d, 10))
        .collect()
}

// ═══════════════════════════════════════════════════════════════
//  Unit tests
// ═══════════════════════════════════════════════════════════════
