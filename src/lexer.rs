//! Tokenizer with a lookahead deque and DFA-driven sub-lexers for floats
//! and strings.

use crate::error::AssemblerError;
use crate::interval::{CursorPosition, Interval};
use crate::tables;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Identifier,
    StringLit,
    HexLit,
    DecLit,
    OctLit,
    BinLit,
    FloatLit,
    Gpr,
    Fpr,
    Spr,
    CrField,
    Lt,
    Gt,
    Eq,
    So,
    Eol,
    Eof,
    Dot,
    Colon,
    Comma,
    LParen,
    RParen,
    Pipe,
    Caret,
    Ampersand,
    Lsh,
    Rsh,
    Plus,
    Minus,
    Star,
    Slash,
    Tilde,
    Grave,
    At,
    Invalid,
}

/// One lexed token. `span` is a half-open range of *character* indices into
/// the source (not bytes); use [`Lexer::text`] to recover the matched text.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Interval,
    pub line: usize,
    pub col: usize,
    /// Register/SPR/CR-field number for token kinds that carry one.
    pub aux: u32,
    pub invalid_reason: Option<&'static str>,
    pub invalid_span: Interval,
}

impl Token {
    fn new(kind: TokenKind, start: CursorPosition, span: Interval) -> Self {
        Token {
            kind,
            span,
            line: start.line,
            col: start.col,
            aux: 0,
            invalid_reason: None,
            invalid_span: span,
        }
    }

    fn invalid(start: CursorPosition, span: Interval, reason: &'static str) -> Self {
        Token {
            kind: TokenKind::Invalid,
            span,
            line: start.line,
            col: start.col,
            aux: 0,
            invalid_reason: Some(reason),
            invalid_span: span,
        }
    }
}

/// Which characters extend an identifier run. Switching modes invalidates
/// any cached lookahead, since already-lexed tokens may have been split on
/// rules that no longer apply.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentifierMode {
    Typical,
    Mnemonic,
    Directive,
}

struct CachedToken {
    token: Token,
    start: CursorPosition,
}

pub struct Lexer<'a> {
    #[allow(dead_code)]
    source: &'a str,
    chars: Vec<char>,
    line_starts: Vec<usize>,
    cursor: CursorPosition,
    mode: IdentifierMode,
    lookahead: VecDeque<CachedToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut line_starts = vec![0usize];
        for (i, &c) in chars.iter().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Lexer {
            source,
            chars,
            line_starts,
            cursor: CursorPosition::default(),
            mode: IdentifierMode::Typical,
            lookahead: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> IdentifierMode {
        self.mode
    }

    pub fn set_identifier_mode(&mut self, mode: IdentifierMode) {
        if mode == self.mode {
            return;
        }
        log::trace!("lexer identifier mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.cursor = self
            .lookahead
            .front()
            .map(|c| c.start)
            .unwrap_or(self.cursor);
        self.lookahead.clear();
    }

    fn fill_to(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            let start = self.cursor;
            let token = self.lex_single();
            self.lookahead.push_back(CachedToken { token, start });
        }
    }

    pub fn lookahead(&mut self) -> &Token {
        self.lookahead_n(0)
    }

    pub fn lookahead_n(&mut self, n: usize) -> &Token {
        self.fill_to(n);
        &self.lookahead[n].token
    }

    pub fn eat(&mut self) {
        self.lookahead.pop_front();
    }

    pub fn eat_and_reset(&mut self) {
        self.lookahead.clear();
    }

    /// Lex the next whitespace-delimited run explicitly as a float,
    /// bypassing the normal identifier/number path. The only caller is the
    /// `.float`/`.double` operand grammar.
    pub fn lookahead_float(&mut self) -> &Token {
        self.cursor = self
            .lookahead
            .front()
            .map(|c| c.start)
            .unwrap_or(self.cursor);
        self.lookahead.clear();

        self.skip_ws();
        let start = self.cursor;
        let (end_idx, result) = run_dfa(tables::FLOAT_DFA, &self.chars, self.cursor.index);
        while self.cursor.index < end_idx {
            self.advance();
        }
        let span = Interval::new(start.index, end_idx - start.index);
        let token = match result {
            Ok(()) => Token::new(TokenKind::FloatLit, start, span),
            Err(reason) => Token::invalid(start, span, reason),
        };
        self.lookahead.push_back(CachedToken { token, start });
        &self.lookahead.back().unwrap().token
    }

    pub fn text(&self, span: Interval) -> String {
        self.chars[span.begin..span.end().min(self.chars.len())]
            .iter()
            .collect()
    }

    pub fn line_text(&self, line: usize) -> String {
        let start = *self.line_starts.get(line).unwrap_or(&self.chars.len());
        let end = self
            .line_starts
            .get(line + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.chars.len());
        let end = end.max(start).min(self.chars.len());
        self.chars[start..end].iter().collect()
    }

    pub fn error_at(&self, line: usize, col: usize, span_len: usize, message: impl Into<String>) -> AssemblerError {
        AssemblerError::new(message.into(), self.line_text(line), line, col, span_len)
    }

    pub fn error_at_token(&self, tok: &Token, message: impl Into<String>) -> AssemblerError {
        self.error_at(tok.line, tok.col, tok.span.len.max(1), message)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.cursor.index).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.cursor.index + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.cursor.index += 1;
            if c == '\n' {
                self.cursor.line += 1;
                self.cursor.col = 0;
            } else {
                self.cursor.col += 1;
            }
        }
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => self.advance(),
                Some('#') => {
                    while !matches!(self.peek_char(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn finish(&mut self, kind: TokenKind, start: CursorPosition) -> Token {
        let span = Interval::new(start.index, self.cursor.index - start.index);
        Token::new(kind, start, span)
    }

    fn identifier_head(&self, c: char) -> bool {
        if c.is_ascii_alphabetic() || c == '_' {
            return true;
        }
        self.mode == IdentifierMode::Directive && c.is_ascii_digit()
    }

    fn identifier_extra(&self, c: char) -> bool {
        if c.is_ascii_alphanumeric() || c == '_' {
            return true;
        }
        self.mode == IdentifierMode::Mnemonic && matches!(c, '.' | '+' | '-')
    }

    fn lex_single(&mut self) -> Token {
        self.skip_ws();
        let start = self.cursor;

        let c = match self.peek_char() {
            None => return self.finish(TokenKind::Eof, start),
            Some(c) => c,
        };

        if c == '\n' {
            self.advance();
            return self.finish(TokenKind::Eol, start);
        }

        if self.identifier_head(c) {
            return self.lex_identifier(start);
        }

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }

        if c == '"' {
            return self.lex_string(start);
        }

        self.lex_punct(start)
    }

    fn lex_identifier(&mut self, start: CursorPosition) -> Token {
        self.advance();
        while let Some(c) = self.peek_char() {
            if self.identifier_extra(c) {
                self.advance();
            } else {
                break;
            }
        }
        let span = Interval::new(start.index, self.cursor.index - start.index);
        if self.mode != IdentifierMode::Typical {
            return Token::new(TokenKind::Identifier, start, span);
        }
        let text = self.text(span);
        let (kind, aux) = classify_alnum(&text);
        let mut tok = Token::new(kind, start, span);
        tok.aux = aux;
        tok
    }

    fn lex_number(&mut self, start: CursorPosition) -> Token {
        if self.peek_char() == Some('0') {
            self.advance();
            match self.peek_char() {
                Some('x') | Some('X') => {
                    self.advance();
                    while matches!(self.peek_char(), Some(c) if c.is_ascii_hexdigit()) {
                        self.advance();
                    }
                    return self.finish(TokenKind::HexLit, start);
                }
                Some('b') | Some('B') => {
                    self.advance();
                    while matches!(self.peek_char(), Some('0') | Some('1')) {
                        self.advance();
                    }
                    return self.finish(TokenKind::BinLit, start);
                }
                Some(c) if ('0'..='7').contains(&c) => {
                    while matches!(self.peek_char(), Some(c) if ('0'..='7').contains(&c)) {
                        self.advance();
                    }
                    return self.finish(TokenKind::OctLit, start);
                }
                _ => return self.finish(TokenKind::DecLit, start),
            }
        }
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        self.finish(TokenKind::DecLit, start)
    }

    fn lex_string(&mut self, start: CursorPosition) -> Token {
        self.advance(); // opening quote
        let (end_idx, result) = run_dfa(tables::STRING_DFA, &self.chars, self.cursor.index);
        while self.cursor.index < end_idx {
            self.advance();
        }
        let span = Interval::new(start.index, end_idx - start.index);
        match result {
            Ok(()) => Token::new(TokenKind::StringLit, start, span),
            Err(reason) => Token::invalid(start, span, reason),
        }
    }

    fn lex_punct(&mut self, start: CursorPosition) -> Token {
        let c = self.peek_char().unwrap();
        self.advance();
        let kind = match c {
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '&' => TokenKind::Ampersand,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '~' => TokenKind::Tilde,
            '`' => TokenKind::Grave,
            '@' => TokenKind::At,
            '<' if self.peek_char() == Some('<') => {
                self.advance();
                TokenKind::Lsh
            }
            '>' if self.peek_char() == Some('>') => {
                self.advance();
                TokenKind::Rsh
            }
            _ => {
                let span = Interval::new(start.index, self.cursor.index - start.index);
                return Token::invalid(start, span, "Unrecognized character");
            }
        };
        self.finish(kind, start)
    }

    #[cfg(test)]
    fn peek_next_char_for_test(&self) -> Option<char> {
        self.peek_char_at(0)
    }
}

fn reg_num(lower: &str, prefix: &str, max: u32) -> Option<u32> {
    let rest = lower.strip_prefix(prefix)?;
    if rest.is_empty() || rest.len() > 2 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = rest.parse().ok()?;
    if n <= max {
        Some(n)
    } else {
        None
    }
}

fn classify_alnum(text: &str) -> (TokenKind, u32) {
    let lower = text.to_ascii_lowercase();
    if let Some(n) = reg_num(&lower, "r", 31) {
        return (TokenKind::Gpr, n);
    }
    if let Some(n) = reg_num(&lower, "f", 31) {
        return (TokenKind::Fpr, n);
    }
    if lower == "sp" {
        return (TokenKind::Gpr, 1);
    }
    if lower == "rtoc" {
        return (TokenKind::Gpr, 2);
    }
    if let Some(n) = reg_num(&lower, "cr", 7) {
        return (TokenKind::CrField, n);
    }
    match lower.as_str() {
        "lt" => return (TokenKind::Lt, 0),
        "gt" => return (TokenKind::Gt, 0),
        "eq" => return (TokenKind::Eq, 0),
        "so" => return (TokenKind::So, 0),
        _ => {}
    }
    if let Some(&num) = tables::sprg_map().find(&lower) {
        return (TokenKind::Spr, num);
    }
    (TokenKind::Identifier, 0)
}

/// One state of a table-driven DFA: a prioritized list of
/// `(predicate, next_state)` edges, plus `None` if stopping here is a valid
/// acceptance point or `Some(reason)` if it is a failure.
pub struct DfaNode {
    pub edges: &'static [(fn(char) -> bool, usize)],
    pub failure: Option<&'static str>,
}

/// Walk `nodes` starting at state 0 against `chars[start..]`, consuming one
/// character per taken edge, until no edge matches. Returns the index just
/// past the last consumed character and `Ok(())` if that stopping state is
/// an acceptance state, or `Err(reason)` otherwise.
pub fn run_dfa(nodes: &'static [DfaNode], chars: &[char], start: usize) -> (usize, Result<(), &'static str>) {
    let mut state = 0usize;
    let mut idx = start;
    loop {
        let node = &nodes[state];
        let next = chars
            .get(idx)
            .copied()
            .and_then(|c| node.edges.iter().find(|(pred, _)| pred(c)).map(|(_, n)| *n));
        match next {
            Some(n) => {
                state = n;
                idx += 1;
            }
            None => {
                return match node.failure {
                    None => (idx, Ok(())),
                    Some(reason) => (idx, Err(reason)),
                };
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let kind = lexer.lookahead().kind;
            out.push(kind);
            if kind == TokenKind::Eof {
                break;
            }
            lexer.eat();
        }
        out
    }

    #[test]
    fn skips_comments_and_horizontal_whitespace() {
        let mut lexer = Lexer::new("   # a comment\nr3");
        assert_eq!(lexer.lookahead().kind, TokenKind::Eol);
        lexer.eat();
        assert_eq!(lexer.lookahead().kind, TokenKind::Gpr);
    }

    #[test]
    fn classifies_registers_and_aliases() {
        let mut lexer = Lexer::new("r3 f31 sp rtoc cr7 lt");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Gpr);
        assert_eq!(tok.aux, 3);
        lexer.eat();
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Fpr);
        assert_eq!(tok.aux, 31);
        lexer.eat();
        assert_eq!(lexer.lookahead().aux, 1);
        lexer.eat();
        assert_eq!(lexer.lookahead().aux, 2);
        lexer.eat();
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::CrField);
        assert_eq!(tok.aux, 7);
        lexer.eat();
        assert_eq!(lexer.lookahead().kind, TokenKind::Lt);
    }

    #[test]
    fn classifies_spr_alias() {
        let mut lexer = Lexer::new("lr");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Spr);
        assert_eq!(tok.aux, 8);
    }

    #[test]
    fn lexes_numeric_literals() {
        assert_eq!(
            kinds("0x1f 0b101 0777 123"),
            vec![
                TokenKind::HexLit,
                TokenKind::BinLit,
                TokenKind::OctLit,
                TokenKind::DecLit,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_shift_operators_and_rejects_lone_angle_bracket() {
        assert_eq!(kinds("<<"), vec![TokenKind::Lsh, TokenKind::Eof]);
        let mut lexer = Lexer::new("<");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Invalid);
        assert_eq!(tok.invalid_reason, Some("Unrecognized character"));
    }

    #[test]
    fn lexes_string_with_escapes() {
        let mut lexer = Lexer::new("\"a\\nb\"");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::StringLit);
        assert_eq!(lexer.text(tok.span), "\"a\\nb\"");
    }

    #[test]
    fn unterminated_string_is_invalid() {
        let mut lexer = Lexer::new("\"abc");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Invalid);
        assert_eq!(tok.invalid_reason, Some("Invalid string: No terminating \""));
    }

    #[test]
    fn lexes_string_with_octal_and_hex_escapes() {
        let mut lexer = Lexer::new("\"\\101\\x42\"");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::StringLit);
        assert_eq!(lexer.text(tok.span), "\"\\101\\x42\"");
    }

    #[test]
    fn string_with_bad_hex_escape_is_invalid() {
        let mut lexer = Lexer::new("\"\\x\"");
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Invalid);
        assert_eq!(tok.invalid_reason, Some("Invalid string: bad hex escape"));
    }

    #[test]
    fn directive_mode_allows_leading_digit() {
        let mut lexer = Lexer::new("4byte");
        lexer.set_identifier_mode(IdentifierMode::Directive);
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Identifier);
        assert_eq!(lexer.text(tok.span), "4byte");
    }

    #[test]
    fn mnemonic_mode_allows_predict_suffix() {
        let mut lexer = Lexer::new("bne+ 0");
        lexer.set_identifier_mode(IdentifierMode::Mnemonic);
        let tok = lexer.lookahead().clone();
        assert_eq!(tok.kind, TokenKind::Identifier);
        assert_eq!(lexer.text(tok.span), "bne+");
    }

    #[test]
    fn mode_switch_invalidates_lookahead() {
        let mut lexer = Lexer::new("4byte");
        // Without directive mode, '4' starts a decimal literal, not an identifier.
        assert_eq!(lexer.lookahead().kind, TokenKind::DecLit);
        lexer.set_identifier_mode(IdentifierMode::Directive);
        assert_eq!(lexer.lookahead().kind, TokenKind::Identifier);
    }

    #[test]
    fn lookahead_float_parses_exponent_form() {
        let mut lexer = Lexer::new("1.25e-2");
        let tok = lexer.lookahead_float().clone();
        assert_eq!(tok.kind, TokenKind::FloatLit);
        assert_eq!(lexer.text(tok.span), "1.25e-2");
    }

    #[test]
    fn lookahead_float_reports_missing_fraction_digit() {
        let mut lexer = Lexer::new("1.");
        let tok = lexer.lookahead_float().clone();
        assert_eq!(tok.kind, TokenKind::Invalid);
        assert_eq!(
            tok.invalid_reason,
            Some("Invalid float: No numeric value after decimal point")
        );
    }

    #[test]
    fn peek_helper_unused_branch_is_reachable() {
        let lexer = Lexer::new("x");
        assert_eq!(lexer.peek_next_char_for_test(), Some('x'));
    }
}
