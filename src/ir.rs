//! Single-pass IR generation: walks the token stream once, tracking the
//! write cursor and a symbol table, and producing a sequence of blocks of
//! unresolved chunks. Operand expressions that reference a label aren't
//! evaluated here — forward references are legal for labels — so codegen
//! (`crate::assembler`) resolves and encodes the IR in a second step, once
//! every symbol in the file is known.

use crate::error::AssemblerError;
use crate::interval::Interval;
use crate::lexer::{IdentifierMode, Lexer, TokenKind};
use crate::parser::{Expr, ParsedOperand, Parser, SymbolLookup};
use crate::tables::{self, ExtendedGekkoMnemonic, GekkoDirective, GekkoMnemonic};
use matches::debug_assert_matches;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MnemonicRef {
    Base(GekkoMnemonic),
    Extended(ExtendedGekkoMnemonic),
}

#[derive(Clone, Debug)]
pub enum DataItem {
    Expr { expr: Expr, width: usize, address: u32, span: Interval },
    Float { bits: u32, address: u32 },
    Double { bits: u64, address: u32 },
    Raw { bytes: Vec<u8>, address: u32 },
}

impl DataItem {
    pub fn address(&self) -> u32 {
        match self {
            DataItem::Expr { address, .. }
            | DataItem::Float { address, .. }
            | DataItem::Double { address, .. }
            | DataItem::Raw { address, .. } => *address,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DataItem::Expr { width, .. } => *width,
            DataItem::Float { .. } => 4,
            DataItem::Double { .. } => 8,
            DataItem::Raw { bytes, .. } => bytes.len(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Chunk {
    Inst {
        mnemonic: MnemonicRef,
        operands: Vec<ParsedOperand>,
        span: Interval,
        address: u32,
    },
    Data {
        items: Vec<DataItem>,
    },
    Pad {
        address: u32,
        len: usize,
    },
}

#[derive(Clone, Debug)]
pub struct IrBlock {
    pub base_address: u32,
    pub chunks: Vec<Chunk>,
}

#[derive(Clone, Debug, Default)]
pub struct GekkoIr {
    pub blocks: Vec<IrBlock>,
    pub symbols: HashMap<String, i64>,
    /// The full source text, kept around so codegen can turn a chunk's
    /// [`Interval`] back into a line/column for error reporting.
    pub source: String,
}

impl SymbolLookup for HashMap<String, i64> {
    fn lookup(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

struct IrGenerator<'a> {
    lexer: Lexer<'a>,
    cursor: u32,
    symbols: HashMap<String, i64>,
    blocks: Vec<IrBlock>,
}

impl<'a> IrGenerator<'a> {
    fn new(source: &'a str, base_address: u32) -> Self {
        IrGenerator {
            lexer: Lexer::new(source),
            cursor: base_address,
            symbols: HashMap::new(),
            blocks: vec![IrBlock {
                base_address,
                chunks: Vec::new(),
            }],
        }
    }

    fn err_here(&self, message: impl Into<String>) -> AssemblerError {
        let tok = self.lexer.lookahead().clone();
        self.lexer.error_at_token(&tok, message)
    }

    fn block_mut(&mut self) -> &mut IrBlock {
        self.blocks.last_mut().expect("at least one block always exists")
    }

    fn push_new_block(&mut self, base_address: u32) {
        log::debug!("splitting output block at {:#010x}", base_address);
        self.blocks.push(IrBlock {
            base_address,
            chunks: Vec::new(),
        });
    }

    fn push_data_item(&mut self, item: DataItem) {
        match self.block_mut().chunks.last_mut() {
            Some(Chunk::Data { items }) => items.push(item),
            _ => self.block_mut().chunks.push(Chunk::Data { items: vec![item] }),
        }
    }

    fn define_symbol(&mut self, name: String, value: i64) -> Result<(), AssemblerError> {
        if self.symbols.contains_key(&name) {
            return Err(self.err_here(format!("symbol `{}` already defined", name)));
        }
        self.symbols.insert(name, value);
        Ok(())
    }

    fn eval_now(&self, expr: &Expr) -> Result<i64, AssemblerError> {
        expr.eval(&self.symbols, self.cursor).map_err(|m| self.err_here(m))
    }

    fn run(mut self) -> Result<GekkoIr, AssemblerError> {
        loop {
            while self.lexer.lookahead().kind == TokenKind::Eol {
                self.lexer.eat();
            }
            if self.lexer.lookahead().kind == TokenKind::Eof {
                break;
            }
            self.parse_statement()?;
            match self.lexer.lookahead().kind {
                TokenKind::Eol | TokenKind::Eof => {}
                _ => return Err(self.err_here("expected end of line")),
            }
        }
        self.blocks.retain(|b| !b.chunks.is_empty());
        Ok(GekkoIr {
            blocks: self.blocks,
            symbols: self.symbols,
            source: String::new(),
        })
    }

    fn parse_statement(&mut self) -> Result<(), AssemblerError> {
        loop {
            if self.lexer.lookahead().kind == TokenKind::Identifier
                && self.lexer.lookahead_n(1).kind == TokenKind::Colon
            {
                let tok = self.lexer.lookahead().clone();
                let name = self.lexer.text(tok.span);
                self.lexer.eat();
                self.lexer.eat();
                self.define_symbol(name, self.cursor as i64)?;
                continue;
            }
            break;
        }

        match self.lexer.lookahead().kind {
            TokenKind::Dot => self.parse_directive(),
            TokenKind::Identifier => self.parse_instruction(),
            TokenKind::Eol | TokenKind::Eof => Ok(()),
            _ => Err(self.err_here("expected a label, a directive, or an instruction")),
        }
    }

    fn parse_instruction(&mut self) -> Result<(), AssemblerError> {
        self.lexer.set_identifier_mode(IdentifierMode::Mnemonic);
        let tok = self.lexer.lookahead().clone();
        let text = self.lexer.text(tok.span).to_ascii_lowercase();
        self.lexer.eat();
        self.lexer.set_identifier_mode(IdentifierMode::Typical);

        let (mnemonic, algo) = if let Some(&base) = tables::mnemonic_tokens().find(&text) {
            (MnemonicRef::Base(base), base.desc().parse_algorithm)
        } else if let Some(&ext) = tables::extended_mnemonic_tokens().find(&text) {
            (MnemonicRef::Extended(ext), ext.desc().parse_algorithm)
        } else {
            return Err(self.lexer.error_at_token(&tok, format!("unrecognized mnemonic `{}`", text)));
        };

        log::trace!("instruction {} at {:#010x}", text, self.cursor);

        let mut operands = {
            let mut parser = Parser::new(&mut self.lexer);
            parser.parse_operand_list(algo)?
        };

        if let Some(idx) = relative_branch_target_index(mnemonic, operands.len()) {
            if let Some(op) = operands.get_mut(idx) {
                if !matches!(op.expr, Expr::PcRelative(_)) {
                    op.expr = Expr::PcRelative(Box::new(op.expr.clone()));
                }
                debug_assert_matches!(op.expr, Expr::PcRelative(_));
            }
        }

        let address = self.cursor;
        self.block_mut().chunks.push(Chunk::Inst {
            mnemonic,
            operands,
            span: tok.span,
            address,
        });
        self.cursor += 4;
        Ok(())
    }

    fn parse_directive(&mut self) -> Result<(), AssemblerError> {
        self.lexer.eat(); // '.'
        self.lexer.set_identifier_mode(IdentifierMode::Directive);
        let tok = self.lexer.lookahead().clone();
        if tok.kind != TokenKind::Identifier {
            self.lexer.set_identifier_mode(IdentifierMode::Typical);
            return Err(self.lexer.error_at_token(&tok, "expected a directive name"));
        }
        let name = self.lexer.text(tok.span).to_ascii_lowercase();
        self.lexer.eat();
        self.lexer.set_identifier_mode(IdentifierMode::Typical);

        let directive = *tables::directives_map()
            .find(&name)
            .ok_or_else(|| self.lexer.error_at_token(&tok, format!("unknown directive `.{}`", name)))?;

        log::trace!("directive .{} at {:#010x}", name, self.cursor);

        match directive {
            GekkoDirective::Byte => self.parse_data_list(1),
            GekkoDirective::TwoByte => self.parse_data_list(2),
            GekkoDirective::FourByte => self.parse_data_list(4),
            GekkoDirective::EightByte => self.parse_data_list(8),
            GekkoDirective::Float => self.parse_float_list(false),
            GekkoDirective::Double => self.parse_float_list(true),
            GekkoDirective::Ascii => self.parse_string_literal(false),
            GekkoDirective::Asciz => self.parse_string_literal(true),
            GekkoDirective::Zeros | GekkoDirective::Skip => self.parse_fill(),
            GekkoDirective::Align => self.parse_align(false),
            GekkoDirective::Padalign => self.parse_align(true),
            GekkoDirective::Locate => self.parse_locate(),
            GekkoDirective::Defvar => self.parse_defvar(),
        }
    }

    fn parse_data_list(&mut self, width: usize) -> Result<(), AssemblerError> {
        loop {
            let start = self.lexer.lookahead().span.begin;
            let expr = {
                let mut parser = Parser::new(&mut self.lexer);
                parser.parse_expr()?
            };
            let end = self.lexer.lookahead().span.begin.max(start + 1);
            let span = Interval::new(start, end - start);
            let address = self.cursor;
            self.cursor += width as u32;
            self.push_data_item(DataItem::Expr { expr, width, address, span });
            if self.lexer.lookahead().kind == TokenKind::Comma {
                self.lexer.eat();
                continue;
            }
            break;
        }
        Ok(())
    }

    fn parse_float_list(&mut self, double: bool) -> Result<(), AssemblerError> {
        loop {
            let tok = self.lexer.lookahead_float().clone();
            if tok.kind != TokenKind::FloatLit {
                return Err(self.lexer.error_at_token(
                    &tok,
                    tok.invalid_reason.unwrap_or("expected a floating-point literal"),
                ));
            }
            let text = self.lexer.text(tok.span);
            let address = self.cursor;
            if double {
                let v: f64 = text.parse().map_err(|_| self.lexer.error_at_token(&tok, "malformed float literal"))?;
                self.cursor += 8;
                self.push_data_item(DataItem::Double { bits: v.to_bits(), address });
            } else {
                let v: f32 = text.parse().map_err(|_| self.lexer.error_at_token(&tok, "malformed float literal"))?;
                self.cursor += 4;
                self.push_data_item(DataItem::Float { bits: v.to_bits(), address });
            }
            self.lexer.eat();
            if self.lexer.lookahead().kind == TokenKind::Comma {
                self.lexer.eat();
                continue;
            }
            break;
        }
        Ok(())
    }

    fn parse_string_literal(&mut self, null_terminate: bool) -> Result<(), AssemblerError> {
        let tok = self.lexer.lookahead().clone();
        if tok.kind != TokenKind::StringLit {
            return Err(self.lexer.error_at_token(&tok, "expected a string literal"));
        }
        let raw = self.lexer.text(tok.span);
        self.lexer.eat();
        let mut bytes = decode_string_literal(&raw).map_err(|m| self.lexer.error_at_token(&tok, m))?;
        if null_terminate {
            bytes.push(0);
        }
        let address = self.cursor;
        self.cursor += bytes.len() as u32;
        self.push_data_item(DataItem::Raw { bytes, address });
        Ok(())
    }

    fn parse_fill(&mut self) -> Result<(), AssemblerError> {
        let expr = {
            let mut parser = Parser::new(&mut self.lexer);
            parser.parse_expr()?
        };
        let count = self.eval_now(&expr)?;
        if count < 0 {
            return Err(self.err_here("fill count cannot be negative"));
        }
        let address = self.cursor;
        self.cursor += count as u32;
        self.block_mut().chunks.push(Chunk::Pad {
            address,
            len: count as usize,
        });
        Ok(())
    }

    fn parse_align(&mut self, is_pad_align: bool) -> Result<(), AssemblerError> {
        let expr = {
            let mut parser = Parser::new(&mut self.lexer);
            parser.parse_expr()?
        };
        let align = self.eval_now(&expr)?;
        if align <= 0 || (align & (align - 1)) != 0 {
            return Err(self.err_here("alignment must be a positive power of two"));
        }
        let align = align as u32;
        let rem = self.cursor % align;
        let pad = if rem == 0 { 0 } else { align - rem };
        if pad > 0 {
            let address = self.cursor;
            self.cursor += pad;
            self.block_mut().chunks.push(Chunk::Pad {
                address,
                len: pad as usize,
            });
        }
        if is_pad_align {
            self.push_new_block(self.cursor);
        }
        Ok(())
    }

    fn parse_locate(&mut self) -> Result<(), AssemblerError> {
        let expr = {
            let mut parser = Parser::new(&mut self.lexer);
            parser.parse_expr()?
        };
        let addr = self.eval_now(&expr)?;
        if addr < 0 {
            return Err(self.err_here(".locate address cannot be negative"));
        }
        self.cursor = addr as u32;
        self.push_new_block(self.cursor);
        Ok(())
    }

    fn parse_defvar(&mut self) -> Result<(), AssemblerError> {
        let tok = self.lexer.lookahead().clone();
        if tok.kind != TokenKind::Identifier {
            return Err(self.err_here("expected a variable name"));
        }
        let name = self.lexer.text(tok.span);
        self.lexer.eat();
        if self.lexer.lookahead().kind != TokenKind::Comma {
            return Err(self.err_here("expected `,` after variable name"));
        }
        self.lexer.eat();
        let expr = {
            let mut parser = Parser::new(&mut self.lexer);
            parser.parse_expr()?
        };
        let value = self.eval_now(&expr)?;
        self.define_symbol(name, value)
    }
}

/// Branch instructions take a target address in source syntax but encode a
/// PC-relative displacement (the `ba`/`bla`/`bca`/`bcla` absolute forms are
/// the exception, and aren't in this set). Returns the index of the operand
/// that needs wrapping in [`Expr::PcRelative`], given how many operands this
/// particular call parsed (the conditional-branch family's leading CR field
/// is optional, so the target's index shifts).
fn relative_branch_target_index(mnemonic: MnemonicRef, operand_count: usize) -> Option<usize> {
    use ExtendedGekkoMnemonic as E;
    use GekkoMnemonic as M;
    match mnemonic {
        MnemonicRef::Base(m) if matches!(m, M::B | M::Bl) => Some(0),
        MnemonicRef::Base(m) if matches!(m, M::Bc | M::Bcl) => Some(2),
        MnemonicRef::Extended(e)
            if matches!(
                e,
                E::Blt
                    | E::BltPlus
                    | E::Ble
                    | E::BlePlus
                    | E::Beq
                    | E::BeqPlus
                    | E::Bge
                    | E::BgePlus
                    | E::Bgt
                    | E::BgtPlus
                    | E::Bne
                    | E::BnePlus
            ) =>
        {
            operand_count.checked_sub(1)
        }
        _ => None,
    }
}

fn decode_string_literal(raw: &str) -> Result<Vec<u8>, String> {
    let inner = &raw[1..raw.len().saturating_sub(1)];
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('a') => out.push(0x07),
            Some('b') => out.push(0x08),
            Some('f') => out.push(0x0C),
            Some('v') => out.push(0x0B),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('\'') => out.push(b'\''),
            Some('?') => out.push(b'?'),
            Some('x') => {
                let mut v: u32 = 0;
                let mut n = 0;
                while let Some(&c) = chars.peek() {
                    if let Some(d) = c.to_digit(16) {
                        v = v * 16 + d;
                        n += 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                if n == 0 {
                    return Err("bad hex escape".to_owned());
                }
                out.push(v as u8);
            }
            Some(c) if ('0'..='7').contains(&c) => {
                let mut v = c.to_digit(8).unwrap();
                let mut n = 1;
                while n < 3 {
                    match chars.peek() {
                        Some(&c) if ('0'..='7').contains(&c) => {
                            v = v * 8 + c.to_digit(8).unwrap();
                            chars.next();
                            n += 1;
                        }
                        _ => break,
                    }
                }
                out.push(v as u8);
            }
            _ => return Err("unsupported escape sequence".to_owned()),
        }
    }
    Ok(out)
}

pub fn generate(source: &str, base_address: u32) -> Result<GekkoIr, AssemblerError> {
    let mut ir = IrGenerator::new(source, base_address).run()?;
    ir.source = source.to_owned();
    Ok(ir)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_and_instructions_share_a_block() {
        let ir = generate("start:\n  add r3,r4,r5\n  b start\n", 0x1000).unwrap();
        assert_eq!(ir.symbols.get("start"), Some(&0x1000));
        assert_eq!(ir.blocks.len(), 1);
        assert_eq!(ir.blocks[0].chunks.len(), 2);
    }

    #[test]
    fn locate_starts_a_new_block() {
        let ir = generate("add r3,r4,r5\n.locate 0x2000\naddi r3,r3,1\n", 0x1000).unwrap();
        assert_eq!(ir.blocks.len(), 2);
        assert_eq!(ir.blocks[1].base_address, 0x2000);
    }

    #[test]
    fn align_does_not_split_but_padalign_does() {
        let ir = generate(".byte 1\n.align 4\n.byte 2\n.padalign 4\n.byte 3\n", 0).unwrap();
        assert_eq!(ir.blocks.len(), 2);
    }

    #[test]
    fn defvar_forward_reference_is_rejected() {
        let err = generate(".defvar a, b\n.defvar b, 1\n", 0).unwrap_err();
        assert!(err.message.contains("undefined symbol"));
    }

    #[test]
    fn ascii_directive_decodes_escapes() {
        let ir = generate(".ascii \"a\\tb\"\n", 0).unwrap();
        match &ir.blocks[0].chunks[0] {
            Chunk::Data { items } => match &items[0] {
                DataItem::Raw { bytes, .. } => assert_eq!(bytes, b"a\tb"),
                _ => panic!("expected raw data"),
            },
            _ => panic!("expected data chunk"),
        }
    }

    #[test]
    fn duplicate_symbol_is_an_error() {
        let err = generate("a:\na:\n", 0).unwrap_err();
        assert!(err.message.contains("already defined"));
    }

    #[test]
    fn plain_branch_target_is_wrapped_pc_relative() {
        let ir = generate("start:\n  b start\n", 0x1000).unwrap();
        match &ir.blocks[0].chunks[0] {
            Chunk::Inst { operands, .. } => {
                assert!(matches!(operands[0].expr, Expr::PcRelative(_)));
            }
            _ => panic!("expected an instruction chunk"),
        }
    }

    #[test]
    fn absolute_branch_target_is_left_untouched() {
        let ir = generate("start:\n  ba start\n", 0x1000).unwrap();
        match &ir.blocks[0].chunks[0] {
            Chunk::Inst { operands, .. } => {
                assert!(!matches!(operands[0].expr, Expr::PcRelative(_)));
            }
            _ => panic!("expected an instruction chunk"),
        }
    }
}
