//! Expression parsing and per-mnemonic operand-list grammars.
//!
//! Expressions are parsed into a tree rather than evaluated immediately:
//! operands may reference labels that haven't been seen yet, so evaluation
//! happens later, once the whole source has been walked and every symbol is
//! known (see `ir::GekkoIr::resolve`).

use crate::error::AssemblerError;
use crate::interval::Interval;
use crate::lexer::{IdentifierMode, Lexer, TokenKind};
use crate::tables::ParseAlg;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
}

/// An unevaluated operand expression.
#[derive(Clone, Debug)]
pub enum Expr {
    Const(i64),
    Symbol(String),
    /// `.`, the address of the current instruction/directive.
    CurrentAddress,
    /// `` `expr` ``: evaluates `expr` then subtracts the current address.
    PcRelative(Box<Expr>),
    /// `expr@ha`: the high 16 bits of `expr`, rounded for a following `@l` add.
    AddrHi(Box<Expr>),
    /// `expr@l`: the low 16 bits of `expr`, sign-extended on use.
    AddrLo(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// A symbol table mapping label/`.defvar` names to their resolved values.
pub trait SymbolLookup {
    fn lookup(&self, name: &str) -> Option<i64>;
}

impl Expr {
    /// Evaluate the tree given a symbol table and the address of the
    /// instruction or directive this expression is an operand of.
    pub fn eval(&self, symbols: &dyn SymbolLookup, current_address: u32) -> Result<i64, String> {
        match self {
            Expr::Const(v) => Ok(*v),
            Expr::Symbol(name) => symbols
                .lookup(name)
                .ok_or_else(|| format!("undefined symbol `{}`", name)),
            Expr::CurrentAddress => Ok(current_address as i64),
            Expr::PcRelative(inner) => Ok(inner.eval(symbols, current_address)? - current_address as i64),
            Expr::AddrHi(inner) => {
                let v = inner.eval(symbols, current_address)?;
                let v = v as i64 as i128;
                // Round so that adding the sign-extended low half back in
                // reproduces the original value (the classic `@ha`/`@l` pair).
                let adjusted = (v + 0x8000) >> 16;
                Ok((adjusted as i64) & 0xffff)
            }
            Expr::AddrLo(inner) => {
                let v = inner.eval(symbols, current_address)?;
                Ok(v & 0xffff)
            }
            Expr::Unary(op, inner) => {
                let v = inner.eval(symbols, current_address)?;
                Ok(match op {
                    UnaryOp::Neg => v.wrapping_neg(),
                    UnaryOp::Not => !v,
                })
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(symbols, current_address)?;
                let b = rhs.eval(symbols, current_address)?;
                Ok(match op {
                    BinOp::Or => a | b,
                    BinOp::Xor => a ^ b,
                    BinOp::And => a & b,
                    BinOp::Shl => a.wrapping_shl(b as u32),
                    BinOp::Shr => a.wrapping_shr(b as u32),
                    BinOp::Add => a.wrapping_add(b),
                    BinOp::Sub => a.wrapping_sub(b),
                    BinOp::Mul => a.wrapping_mul(b),
                    BinOp::Div => {
                        if b == 0 {
                            return Err("division by zero".to_owned());
                        }
                        a.wrapping_div(b)
                    }
                })
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParsedOperand {
    pub expr: Expr,
    pub span: Interval,
}

pub struct Parser<'a, 'b> {
    pub lexer: &'a mut Lexer<'b>,
}

impl<'a, 'b> Parser<'a, 'b> {
    pub fn new(lexer: &'a mut Lexer<'b>) -> Self {
        Parser { lexer }
    }

    fn err(&self, message: impl Into<String>) -> AssemblerError {
        let tok = self.lexer.lookahead();
        self.lexer.error_at_token(tok, message)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Interval, AssemblerError> {
        let tok = self.lexer.lookahead().clone();
        if tok.kind != kind {
            return Err(self.err(format!("expected {}", what)));
        }
        self.lexer.eat();
        Ok(tok.span)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, AssemblerError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, AssemblerError> {
        let mut lhs = self.parse_xor()?;
        while self.lexer.lookahead().kind == TokenKind::Pipe {
            self.lexer.eat();
            let rhs = self.parse_xor()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_xor(&mut self) -> Result<Expr, AssemblerError> {
        let mut lhs = self.parse_and()?;
        while self.lexer.lookahead().kind == TokenKind::Caret {
            self.lexer.eat();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Xor, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, AssemblerError> {
        let mut lhs = self.parse_shift()?;
        while self.lexer.lookahead().kind == TokenKind::Ampersand {
            self.lexer.eat();
            let rhs = self.parse_shift()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<Expr, AssemblerError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.lexer.lookahead().kind {
                TokenKind::Lsh => BinOp::Shl,
                TokenKind::Rsh => BinOp::Shr,
                _ => break,
            };
            self.lexer.eat();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, AssemblerError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.lexer.lookahead().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.lexer.eat();
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr, AssemblerError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.lexer.lookahead().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.lexer.eat();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, AssemblerError> {
        match self.lexer.lookahead().kind {
            TokenKind::Minus => {
                self.lexer.eat();
                let inner = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)))
            }
            TokenKind::Tilde => {
                self.lexer.eat();
                let inner = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)))
            }
            _ => self.parse_addr_fixup(),
        }
    }

    /// A primary expression optionally followed by `@ha` or `@l`.
    fn parse_addr_fixup(&mut self) -> Result<Expr, AssemblerError> {
        let primary = self.parse_primary()?;
        if self.lexer.lookahead().kind == TokenKind::At {
            self.lexer.eat();
            let tok = self.lexer.lookahead().clone();
            if tok.kind != TokenKind::Identifier {
                return Err(self.err("expected `ha` or `l` after `@`"));
            }
            let text = self.lexer.text(tok.span).to_ascii_lowercase();
            self.lexer.eat();
            return match text.as_str() {
                "ha" => Ok(Expr::AddrHi(Box::new(primary))),
                "l" => Ok(Expr::AddrLo(Box::new(primary))),
                _ => Err(self.err("expected `ha` or `l` after `@`")),
            };
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<Expr, AssemblerError> {
        let tok = self.lexer.lookahead().clone();
        match tok.kind {
            TokenKind::DecLit => {
                self.lexer.eat();
                let text = self.lexer.text(tok.span);
                let v: i64 = text.parse().map_err(|_| self.err("malformed decimal literal"))?;
                Ok(Expr::Const(v))
            }
            TokenKind::HexLit => {
                self.lexer.eat();
                let text = self.lexer.text(tok.span);
                let digits = &text[2..];
                let v = i64::from_str_radix(digits, 16).map_err(|_| self.err("malformed hex literal"))?;
                Ok(Expr::Const(v))
            }
            TokenKind::BinLit => {
                self.lexer.eat();
                let text = self.lexer.text(tok.span);
                let digits = &text[2..];
                let v = i64::from_str_radix(digits, 2).map_err(|_| self.err("malformed binary literal"))?;
                Ok(Expr::Const(v))
            }
            TokenKind::OctLit => {
                self.lexer.eat();
                let text = self.lexer.text(tok.span);
                let v = i64::from_str_radix(&text, 8).map_err(|_| self.err("malformed octal literal"))?;
                Ok(Expr::Const(v))
            }
            TokenKind::Gpr | TokenKind::Fpr | TokenKind::Spr | TokenKind::CrField => {
                self.lexer.eat();
                Ok(Expr::Const(tok.aux as i64))
            }
            TokenKind::Lt => {
                self.lexer.eat();
                Ok(Expr::Const(0))
            }
            TokenKind::Gt => {
                self.lexer.eat();
                Ok(Expr::Const(1))
            }
            TokenKind::Eq => {
                self.lexer.eat();
                Ok(Expr::Const(2))
            }
            TokenKind::So => {
                self.lexer.eat();
                Ok(Expr::Const(3))
            }
            TokenKind::Dot => {
                self.lexer.eat();
                Ok(Expr::CurrentAddress)
            }
            TokenKind::Identifier => {
                self.lexer.eat();
                Ok(Expr::Symbol(self.lexer.text(tok.span)))
            }
            TokenKind::Grave => {
                self.lexer.eat();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::Grave, "closing `` ` ``")?;
                Ok(Expr::PcRelative(Box::new(inner)))
            }
            TokenKind::LParen => {
                self.lexer.eat();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            _ => Err(self.err("expected an operand")),
        }
    }

    fn parse_one(&mut self) -> Result<ParsedOperand, AssemblerError> {
        let start = self.lexer.lookahead().span;
        let expr = self.parse_expr()?;
        let end = self.lexer.lookahead().span;
        Ok(ParsedOperand {
            expr,
            span: start.join(end),
        })
    }

    fn comma(&mut self) -> Result<(), AssemblerError> {
        self.expect(TokenKind::Comma, "`,`").map(|_| ())
    }

    /// `name, reg(idx)` style load/store form: evaluates to `[reg, idx]`,
    /// i.e. the base register operand precedes the offset in the returned
    /// list even though the source text writes the offset first.
    fn parse_offset_form(&mut self) -> Result<(ParsedOperand, ParsedOperand), AssemblerError> {
        let offset = self.parse_one()?;
        self.expect(TokenKind::LParen, "`(`")?;
        let base = self.parse_one()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok((base, offset))
    }

    /// Parse the operand list for `algo`, returning operands in the order
    /// the base instruction's fields expect them (not necessarily the order
    /// the user typed them in, for the offset forms).
    pub fn parse_operand_list(&mut self, algo: ParseAlg) -> Result<Vec<ParsedOperand>, AssemblerError> {
        let out = match algo {
            ParseAlg::None => Vec::new(),
            ParseAlg::NoneOrOp1 => {
                if self.at_statement_end() {
                    Vec::new()
                } else {
                    vec![self.parse_one()?]
                }
            }
            ParseAlg::Op1 => vec![self.parse_one()?],
            ParseAlg::Op1Or2 => {
                let first = self.parse_one()?;
                if self.lexer.lookahead().kind == TokenKind::Comma {
                    self.lexer.eat();
                    let second = self.parse_one()?;
                    vec![first, second]
                } else {
                    vec![first]
                }
            }
            ParseAlg::Op2 => {
                let a = self.parse_one()?;
                self.comma()?;
                let b = self.parse_one()?;
                vec![a, b]
            }
            ParseAlg::Op2Or3 => {
                let a = self.parse_one()?;
                self.comma()?;
                let b = self.parse_one()?;
                if self.lexer.lookahead().kind == TokenKind::Comma {
                    self.lexer.eat();
                    let c = self.parse_one()?;
                    vec![a, b, c]
                } else {
                    vec![a, b]
                }
            }
            ParseAlg::Op3 => {
                let a = self.parse_one()?;
                self.comma()?;
                let b = self.parse_one()?;
                self.comma()?;
                let c = self.parse_one()?;
                vec![a, b, c]
            }
            ParseAlg::Op4 => {
                let a = self.parse_one()?;
                self.comma()?;
                let b = self.parse_one()?;
                self.comma()?;
                let c = self.parse_one()?;
                self.comma()?;
                let e = self.parse_one()?;
                vec![a, b, c, e]
            }
            ParseAlg::Op5 => {
                let a = self.parse_one()?;
                self.comma()?;
                let b = self.parse_one()?;
                self.comma()?;
                let c = self.parse_one()?;
                self.comma()?;
                let e = self.parse_one()?;
                self.comma()?;
                let f = self.parse_one()?;
                vec![a, b, c, e, f]
            }
            ParseAlg::Op1Off1 => {
                let rt = self.parse_one()?;
                self.comma()?;
                let (base, offset) = self.parse_offset_form()?;
                vec![rt, base, offset]
            }
            ParseAlg::Op1Off1Op2 => {
                let rt = self.parse_one()?;
                self.comma()?;
                let (base, offset) = self.parse_offset_form()?;
                self.comma()?;
                let w = self.parse_one()?;
                self.comma()?;
                let i = self.parse_one()?;
                vec![rt, base, offset, w, i]
            }
        };
        Ok(out)
    }

    fn at_statement_end(&mut self) -> bool {
        matches!(self.lexer.lookahead().kind, TokenKind::Eol | TokenKind::Eof)
    }

    pub fn set_mode(&mut self, mode: IdentifierMode) {
        self.lexer.set_identifier_mode(mode);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct NoSymbols;
    impl SymbolLookup for NoSymbols {
        fn lookup(&self, _name: &str) -> Option<i64> {
            None
        }
    }

    struct OneSymbol(&'static str, i64);
    impl SymbolLookup for OneSymbol {
        fn lookup(&self, name: &str) -> Option<i64> {
            if name == self.0 {
                Some(self.1)
            } else {
                None
            }
        }
    }

    fn eval_str(src: &str) -> i64 {
        let mut lexer = Lexer::new(src);
        let mut parser = Parser::new(&mut lexer);
        let expr = parser.parse_expr().unwrap();
        expr.eval(&NoSymbols, 0).unwrap()
    }

    #[test]
    fn precedence_chain() {
        assert_eq!(eval_str("1 + 2 * 3"), 7);
        assert_eq!(eval_str("(1 + 2) * 3"), 9);
        assert_eq!(eval_str("1 << 4 | 1"), 17);
        assert_eq!(eval_str("~0 & 0xff"), 255);
        assert_eq!(eval_str("-5 + 2"), -3);
    }

    #[test]
    fn addr_fixups_reconstruct_original_value() {
        let mut lexer = Lexer::new("0x1234_5678".replace('_', "").as_str());
        let mut parser = Parser::new(&mut lexer);
        let expr = parser.parse_expr().unwrap();
        let hi = Expr::AddrHi(Box::new(expr.clone()));
        let lo = Expr::AddrLo(Box::new(expr));
        let hi_v = hi.eval(&NoSymbols, 0).unwrap();
        let lo_v = lo.eval(&NoSymbols, 0).unwrap();
        let reconstructed = (((hi_v as i64) << 16) + (lo_v as i16 as i64)) as u32;
        assert_eq!(reconstructed, 0x1234_5678);
    }

    #[test]
    fn symbol_resolves_against_table() {
        let mut lexer = Lexer::new("label");
        let mut parser = Parser::new(&mut lexer);
        let expr = parser.parse_expr().unwrap();
        assert_eq!(expr.eval(&OneSymbol("label", 42), 0).unwrap(), 42);
    }

    #[test]
    fn pc_relative_subtracts_current_address() {
        let mut lexer = Lexer::new("`0x1000`");
        let mut parser = Parser::new(&mut lexer);
        let expr = parser.parse_expr().unwrap();
        assert_eq!(expr.eval(&NoSymbols, 0x100).unwrap(), 0xF00);
    }
}
