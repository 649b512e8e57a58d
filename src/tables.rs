//! Static data: the float DFA, the mnemonic/extended-mnemonic/directive
//! tables, and the name dictionaries built from them.
//!
//! The mnemonic tables below cover a representative cross-section of the
//! Gekko/Broadway instruction set — every operand-encoding shape and every
//! quirk (SPR bit-swap, the GAS-compatibility zero field on the compare
//! family, extended-mnemonic operand transforms) appears at least once, but
//! this is not an exhaustive transcription of the full ~300-mnemonic ISA.

use crate::dict::{CaseInsensitiveDict, ExtendedMnemonicChars, MnemonicChars, Underscore};
use crate::lexer::DfaNode;
use crate::operand::{OperandDesc, MAX_OPERANDS};
use std::sync::OnceLock;

// ---------------------------------------------------------------------
// Float literal DFA
// ---------------------------------------------------------------------

fn is_sign(c: char) -> bool {
    c == '+' || c == '-'
}
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}
fn is_dot(c: char) -> bool {
    c == '.'
}
fn is_e(c: char) -> bool {
    c == 'e' || c == 'E'
}

const NO_VALUE: &str = "Invalid float: No numeric value";
const NO_FRACTION: &str = "Invalid float: No numeric value after decimal point";
const NO_EXPONENT: &str = "Invalid float: No numeric value following exponent signifier";

pub static FLOAT_DFA: &[DfaNode] = &[
    // 0: start
    DfaNode {
        edges: &[(is_sign, 1), (is_digit, 2), (is_dot, 4)],
        failure: Some(NO_VALUE),
    },
    // 1: sign consumed, nothing else yet
    DfaNode {
        edges: &[(is_digit, 2), (is_dot, 4)],
        failure: Some(NO_VALUE),
    },
    // 2: within integer-part digits (valid stop)
    DfaNode {
        edges: &[(is_digit, 2), (is_dot, 3), (is_e, 6)],
        failure: None,
    },
    // 3: decimal point consumed after integer digits, fraction digit required
    DfaNode {
        edges: &[(is_digit, 5)],
        failure: Some(NO_FRACTION),
    },
    // 4: decimal point consumed with no leading digits, fraction digit required
    DfaNode {
        edges: &[(is_digit, 5)],
        failure: Some(NO_FRACTION),
    },
    // 5: within fraction digits (valid stop)
    DfaNode {
        edges: &[(is_digit, 5), (is_e, 6)],
        failure: None,
    },
    // 6: exponent marker consumed, optional sign then digit required
    DfaNode {
        edges: &[(is_sign, 7), (is_digit, 8)],
        failure: Some(NO_EXPONENT),
    },
    // 7: exponent sign consumed, digit required
    DfaNode {
        edges: &[(is_digit, 8)],
        failure: Some(NO_EXPONENT),
    },
    // 8: within exponent digits (valid stop)
    DfaNode {
        edges: &[(is_digit, 8)],
        failure: None,
    },
];

// ---------------------------------------------------------------------
// String literal DFA
// ---------------------------------------------------------------------

fn is_quote(c: char) -> bool {
    c == '"'
}
fn is_backslash(c: char) -> bool {
    c == '\\'
}
fn is_newline(c: char) -> bool {
    c == '\n'
}
fn is_octal_digit(c: char) -> bool {
    ('0'..='7').contains(&c)
}
fn is_hex_marker(c: char) -> bool {
    c == 'x' || c == 'X'
}
fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}
fn is_known_escape(c: char) -> bool {
    matches!(
        c,
        '\'' | '"' | '?' | '\\' | 'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v'
    )
}
fn is_any(_: char) -> bool {
    true
}

const UNTERMINATED: &str = "Invalid string: No terminating \"";
const BAD_HEX_ESCAPE: &str = "Invalid string: bad hex escape";

pub static STRING_DFA: &[DfaNode] = &[
    // 0: base character
    DfaNode {
        edges: &[(is_quote, 7), (is_backslash, 1), (is_newline, 6), (is_any, 0)],
        failure: Some(UNTERMINATED),
    },
    // 1: escape start
    DfaNode {
        edges: &[
            (is_octal_digit, 2),
            (is_hex_marker, 4),
            (is_known_escape, 0),
            (is_newline, 6),
        ],
        failure: Some(UNTERMINATED),
    },
    // 2: octal escape, first digit consumed (1–3 digits total)
    DfaNode {
        edges: &[
            (is_octal_digit, 3),
            (is_quote, 7),
            (is_backslash, 1),
            (is_newline, 6),
            (is_any, 0),
        ],
        failure: Some(UNTERMINATED),
    },
    // 3: octal escape, second digit consumed (one more digit allowed)
    DfaNode {
        edges: &[
            (is_octal_digit, 0),
            (is_quote, 7),
            (is_backslash, 1),
            (is_newline, 6),
            (is_any, 0),
        ],
        failure: Some(UNTERMINATED),
    },
    // 4: hex escape start, at least one hex digit required
    DfaNode {
        edges: &[(is_hex_digit, 5)],
        failure: Some(BAD_HEX_ESCAPE),
    },
    // 5: hex escape continuation (valid to stop consuming more hex digits)
    DfaNode {
        edges: &[
            (is_hex_digit, 5),
            (is_quote, 7),
            (is_backslash, 1),
            (is_newline, 6),
            (is_any, 0),
        ],
        failure: Some(UNTERMINATED),
    },
    // 6: unterminated (hit a bare newline or end of input without a closing quote)
    DfaNode {
        edges: &[],
        failure: Some(UNTERMINATED),
    },
    // 7: accepted (closing quote consumed)
    DfaNode {
        edges: &[],
        failure: None,
    },
];

// ---------------------------------------------------------------------
// Operand field shapes shared across mnemonic families
// ---------------------------------------------------------------------

const RT: OperandDesc = OperandDesc::new(0x03E0_0000, 21, false); // rD/rS/frD/frS/crfD-adjacent/BO
const RA: OperandDesc = OperandDesc::new(0x001F_0000, 16, false); // rA/frA/BI
const RB: OperandDesc = OperandDesc::new(0x0000_F800, 11, false); // rB/frB/SH
const FRC: OperandDesc = OperandDesc::new(0x0000_07C0, 6, false);
const MB: OperandDesc = OperandDesc::new(0x0000_07C0, 6, false);
const ME: OperandDesc = OperandDesc::new(0x0000_003E, 1, false);
const SIMM: OperandDesc = OperandDesc::new(0x0000_FFFF, 0, true);
const UIMM: OperandDesc = OperandDesc::new(0x0000_FFFF, 0, false);
const D: OperandDesc = SIMM; // load/store displacement: same shape as SIMM
const LI: OperandDesc = OperandDesc::new(0x03FF_FFFC, 0, true); // 24-bit word-aligned branch target
const BD: OperandDesc = OperandDesc::new(0x0000_FFFC, 0, true); // 14-bit word-aligned cond. branch disp.
const CRFD: OperandDesc = OperandDesc::new(0x01C0_0000, 23, false);
const CMP_L: OperandDesc = OperandDesc::new(0x0040_0000, 22, false);
const SPR: OperandDesc = OperandDesc::new(0x001F_F800, 11, false); // combined 10-bit SPR field
const PSQ_OFFSET: OperandDesc = OperandDesc::new(0x0000_FFF0, 4, true);
const PSQ_W: OperandDesc = OperandDesc::new(0x0000_0008, 3, false);
const PSQ_I: OperandDesc = OperandDesc::new(0x0000_0007, 0, false);

// ---------------------------------------------------------------------
// Mnemonic table
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseAlg {
    None,
    Op1,
    NoneOrOp1,
    Op1Off1,
    Op2,
    Op1Or2,
    Op3,
    Op2Or3,
    Op4,
    Op5,
    Op1Off1Op2,
}

#[derive(Clone, Copy, Debug)]
pub enum MnemonicQuirk {
    None,
    /// The operand at this index is an SPR number and must be run through
    /// [`crate::tables::spr_bitswap`] before being placed in the word.
    SprBitswap { operand_index: usize },
    /// GAS-compatibility shorthand for the compare family: the full form
    /// takes `crfD, L, rA, rB`, but the assembly syntax only ever supplies
    /// `rA, rB` (crfD and L default to 0) or `crfD, rA, rB` (L defaults to
    /// 0); this inserts whichever fields were omitted.
    CmpCompat,
    /// `addis`'s immediate is a 16-bit signed field, but users write the
    /// high half of an address as if it were unsigned (e.g. `0x8000`);
    /// GAS's `addis` accepts values up to `0xffff` here and subtracts
    /// `0x10000` so the same bit pattern still lands in the signed field.
    AddisImmCompat { operand_index: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct MnemonicDesc {
    pub base_opcode: u32,
    pub operand_count: usize,
    pub operands: [OperandDesc; MAX_OPERANDS],
    pub parse_algorithm: ParseAlg,
    pub quirk: MnemonicQuirk,
}

const ZERO: OperandDesc = OperandDesc::new(0, 0, false);

const fn d0(base: u32, algo: ParseAlg) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 0,
        operands: [ZERO, ZERO, ZERO, ZERO, ZERO],
        parse_algorithm: algo,
        quirk: MnemonicQuirk::None,
    }
}

const fn d2(base: u32, a: OperandDesc, b: OperandDesc, algo: ParseAlg) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 2,
        operands: [a, b, ZERO, ZERO, ZERO],
        parse_algorithm: algo,
        quirk: MnemonicQuirk::None,
    }
}

const fn d3(base: u32, a: OperandDesc, b: OperandDesc, c: OperandDesc, algo: ParseAlg) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 3,
        operands: [a, b, c, ZERO, ZERO],
        parse_algorithm: algo,
        quirk: MnemonicQuirk::None,
    }
}

const fn d3q(
    base: u32,
    a: OperandDesc,
    b: OperandDesc,
    c: OperandDesc,
    algo: ParseAlg,
    quirk: MnemonicQuirk,
) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 3,
        operands: [a, b, c, ZERO, ZERO],
        parse_algorithm: algo,
        quirk,
    }
}

const fn d4(
    base: u32,
    a: OperandDesc,
    b: OperandDesc,
    c: OperandDesc,
    e: OperandDesc,
    algo: ParseAlg,
) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 4,
        operands: [a, b, c, e, ZERO],
        parse_algorithm: algo,
        quirk: MnemonicQuirk::None,
    }
}

const fn d4q(
    base: u32,
    a: OperandDesc,
    b: OperandDesc,
    c: OperandDesc,
    e: OperandDesc,
    algo: ParseAlg,
    quirk: MnemonicQuirk,
) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 4,
        operands: [a, b, c, e, ZERO],
        parse_algorithm: algo,
        quirk,
    }
}

const fn d5(
    base: u32,
    a: OperandDesc,
    b: OperandDesc,
    c: OperandDesc,
    e: OperandDesc,
    f: OperandDesc,
    algo: ParseAlg,
) -> MnemonicDesc {
    MnemonicDesc {
        base_opcode: base,
        operand_count: 5,
        operands: [a, b, c, e, f],
        parse_algorithm: algo,
        quirk: MnemonicQuirk::None,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum GekkoMnemonic {
    Add,
    AddDot,
    Addo,
    AddoDot,
    Subf,
    SubfDot,
    Subfo,
    SubfoDot,
    Neg,
    NegDot,
    Nego,
    NegoDot,
    Addi,
    Addic,
    AddicDot,
    Addis,
    Subfic,
    Mulli,
    And,
    AndDot,
    Or,
    OrDot,
    Xor,
    XorDot,
    Nand,
    NandDot,
    Nor,
    NorDot,
    AndiDot,
    AndisDot,
    Ori,
    Oris,
    Xori,
    Xoris,
    Cmp,
    Cmpi,
    Cmpl,
    Cmpli,
    Rlwinm,
    RlwinmDot,
    B,
    Ba,
    Bl,
    Bla,
    Bc,
    Bca,
    Bcl,
    Bcla,
    Bclr,
    Bclrl,
    Bcctr,
    Bcctrl,
    Lwz,
    Lwzu,
    Stw,
    Stwu,
    Lbz,
    Stb,
    Lhz,
    Sth,
    Lfd,
    Lfs,
    Stfd,
    Stfs,
    Fadd,
    FaddDot,
    Fsub,
    FsubDot,
    Fmul,
    FmulDot,
    Fdiv,
    FdivDot,
    Fcmpo,
    Fcmpu,
    Mtspr,
    Mfspr,
    Dcbz,
    DcbzL,
    PsqL,
    PsqLu,
    PsqSt,
    PsqStu,
    PsAdd,
    PsAddDot,
    PsSub,
    PsSubDot,
    PsMul,
    PsMulDot,
}

pub static MNEMONICS: &[MnemonicDesc] = &[
    d3(0x7C00_0214, RT, RA, RB, ParseAlg::Op3),          // Add
    d3(0x7C00_0215, RT, RA, RB, ParseAlg::Op3),          // AddDot
    d3(0x7C00_0614, RT, RA, RB, ParseAlg::Op3),          // Addo
    d3(0x7C00_0615, RT, RA, RB, ParseAlg::Op3),          // AddoDot
    d3(0x7C00_0050, RT, RA, RB, ParseAlg::Op3),          // Subf
    d3(0x7C00_0051, RT, RA, RB, ParseAlg::Op3),          // SubfDot
    d3(0x7C00_0450, RT, RA, RB, ParseAlg::Op3),          // Subfo
    d3(0x7C00_0451, RT, RA, RB, ParseAlg::Op3),          // SubfoDot
    d2(0x7C00_00D0, RT, RA, ParseAlg::Op2),              // Neg
    d2(0x7C00_00D1, RT, RA, ParseAlg::Op2),              // NegDot
    d2(0x7C00_04D0, RT, RA, ParseAlg::Op2),              // Nego
    d2(0x7C00_04D1, RT, RA, ParseAlg::Op2),              // NegoDot
    d3(0x3800_0000, RT, RA, SIMM, ParseAlg::Op3),        // Addi
    d3(0x3000_0000, RT, RA, SIMM, ParseAlg::Op3),        // Addic
    d3(0x3400_0000, RT, RA, SIMM, ParseAlg::Op3),        // AddicDot
    d3q(
        0x3C00_0000,
        RT,
        RA,
        SIMM,
        ParseAlg::Op3,
        MnemonicQuirk::AddisImmCompat { operand_index: 2 },
    ), // Addis
    d3(0x2000_0000, RT, RA, SIMM, ParseAlg::Op3),        // Subfic
    d3(0x1C00_0000, RT, RA, SIMM, ParseAlg::Op3),        // Mulli
    d3(0x7C00_0038, RT, RA, RB, ParseAlg::Op3),          // And
    d3(0x7C00_0039, RT, RA, RB, ParseAlg::Op3),          // AndDot
    d3(0x7C00_0378, RT, RA, RB, ParseAlg::Op3),          // Or
    d3(0x7C00_0379, RT, RA, RB, ParseAlg::Op3),          // OrDot
    d3(0x7C00_0278, RT, RA, RB, ParseAlg::Op3),          // Xor
    d3(0x7C00_0279, RT, RA, RB, ParseAlg::Op3),          // XorDot
    d3(0x7C00_03B8, RT, RA, RB, ParseAlg::Op3),          // Nand
    d3(0x7C00_03B9, RT, RA, RB, ParseAlg::Op3),          // NandDot
    d3(0x7C00_00F8, RT, RA, RB, ParseAlg::Op3),          // Nor
    d3(0x7C00_00F9, RT, RA, RB, ParseAlg::Op3),          // NorDot
    d3(0x7000_0000, RT, RA, UIMM, ParseAlg::Op3),        // AndiDot
    d3(0x7400_0000, RT, RA, UIMM, ParseAlg::Op3),        // AndisDot
    d3(0x6000_0000, RT, RA, UIMM, ParseAlg::Op3),        // Ori
    d3(0x6400_0000, RT, RA, UIMM, ParseAlg::Op3),        // Oris
    d3(0x6800_0000, RT, RA, UIMM, ParseAlg::Op3),        // Xori
    d3(0x6C00_0000, RT, RA, UIMM, ParseAlg::Op3),        // Xoris
    d4q(
        0x7C00_0000,
        CRFD,
        CMP_L,
        RA,
        RB,
        ParseAlg::Op2Or3,
        MnemonicQuirk::CmpCompat,
    ), // Cmp
    d4q(
        0x2C00_0000,
        CRFD,
        CMP_L,
        RA,
        SIMM,
        ParseAlg::Op2Or3,
        MnemonicQuirk::CmpCompat,
    ), // Cmpi
    d4q(
        0x7C00_0040,
        CRFD,
        CMP_L,
        RA,
        RB,
        ParseAlg::Op2Or3,
        MnemonicQuirk::CmpCompat,
    ), // Cmpl
    d4q(
        0x2800_0000,
        CRFD,
        CMP_L,
        RA,
        UIMM,
        ParseAlg::Op2Or3,
        MnemonicQuirk::CmpCompat,
    ), // Cmpli
    d5(0x5400_0000, RT, RA, RB, MB, ME, ParseAlg::Op5),  // Rlwinm (rS,rA,SH,MB,ME)
    d5(0x5400_0001, RT, RA, RB, MB, ME, ParseAlg::Op5),  // RlwinmDot
    d0(0x4800_0000, ParseAlg::Op1).with_operand(LI),     // B
    d0(0x4800_0002, ParseAlg::Op1).with_operand(LI),     // Ba
    d0(0x4800_0001, ParseAlg::Op1).with_operand(LI),     // Bl
    d0(0x4800_0003, ParseAlg::Op1).with_operand(LI),     // Bla
    d3(0x4000_0000, RT, RA, BD, ParseAlg::Op3),          // Bc (BO,BI,target)
    d3(0x4000_0002, RT, RA, BD, ParseAlg::Op3),          // Bca
    d3(0x4000_0001, RT, RA, BD, ParseAlg::Op3),          // Bcl
    d3(0x4000_0003, RT, RA, BD, ParseAlg::Op3),          // Bcla
    d2(0x4C00_0020, RT, RA, ParseAlg::Op2),              // Bclr (BO,BI)
    d2(0x4C00_0021, RT, RA, ParseAlg::Op2),              // Bclrl
    d2(0x4C00_0420, RT, RA, ParseAlg::Op2),              // Bcctr
    d2(0x4C00_0421, RT, RA, ParseAlg::Op2),              // Bcctrl
    d3(0x8000_0000, RT, RA, D, ParseAlg::Op1Off1),       // Lwz
    d3(0x8400_0000, RT, RA, D, ParseAlg::Op1Off1),       // Lwzu
    d3(0x9000_0000, RT, RA, D, ParseAlg::Op1Off1),       // Stw
    d3(0x9400_0000, RT, RA, D, ParseAlg::Op1Off1),       // Stwu
    d3(0x8800_0000, RT, RA, D, ParseAlg::Op1Off1),       // Lbz
    d3(0x9800_0000, RT, RA, D, ParseAlg::Op1Off1),       // Stb
    d3(0xA000_0000, RT, RA, D, ParseAlg::Op1Off1),       // Lhz
    d3(0xB000_0000, RT, RA, D, ParseAlg::Op1Off1),       // Sth
    d3(0xC800_0000, RT, RA, D, ParseAlg::Op1Off1),       // Lfd
    d3(0xC000_0000, RT, RA, D, ParseAlg::Op1Off1),       // Lfs
    d3(0xD800_0000, RT, RA, D, ParseAlg::Op1Off1),       // Stfd
    d3(0xD000_0000, RT, RA, D, ParseAlg::Op1Off1),       // Stfs
    d3(0xFC00_002A, RT, RA, RB, ParseAlg::Op3),          // Fadd
    d3(0xFC00_002B, RT, RA, RB, ParseAlg::Op3),          // FaddDot
    d3(0xFC00_0028, RT, RA, RB, ParseAlg::Op3),          // Fsub
    d3(0xFC00_0029, RT, RA, RB, ParseAlg::Op3),          // FsubDot
    d3(0xFC00_0032, RT, RA, FRC, ParseAlg::Op3),         // Fmul (frD,frA,frC)
    d3(0xFC00_0033, RT, RA, FRC, ParseAlg::Op3),         // FmulDot
    d3(0xFC00_0024, RT, RA, RB, ParseAlg::Op3),          // Fdiv
    d3(0xFC00_0025, RT, RA, RB, ParseAlg::Op3),          // FdivDot
    d3(0xFC00_0040, CRFD, RA, RB, ParseAlg::Op3),        // Fcmpo
    d3(0xFC00_0000, CRFD, RA, RB, ParseAlg::Op3),        // Fcmpu
    d3q(
        0x7C00_03A6,
        RT,
        SPR,
        ZERO,
        ParseAlg::Op2,
        MnemonicQuirk::SprBitswap { operand_index: 1 },
    ), // Mtspr (rS, SPR)
    d3q(
        0x7C00_02A6,
        RT,
        SPR,
        ZERO,
        ParseAlg::Op2,
        MnemonicQuirk::SprBitswap { operand_index: 1 },
    ), // Mfspr (rD, SPR)
    d2(0x7C00_07F4, RA, RB, ParseAlg::Op2),              // Dcbz
    d2(0x1000_07F4, RA, RB, ParseAlg::Op2),              // DcbzL
    d5(0xE000_0000, RT, RA, PSQ_OFFSET, PSQ_W, PSQ_I, ParseAlg::Op1Off1Op2), // PsqL
    d5(0xE400_0000, RT, RA, PSQ_OFFSET, PSQ_W, PSQ_I, ParseAlg::Op1Off1Op2), // PsqLu
    d5(0xF000_0000, RT, RA, PSQ_OFFSET, PSQ_W, PSQ_I, ParseAlg::Op1Off1Op2), // PsqSt
    d5(0xF400_0000, RT, RA, PSQ_OFFSET, PSQ_W, PSQ_I, ParseAlg::Op1Off1Op2), // PsqStu
    d3(0x1000_002A, RT, RA, RB, ParseAlg::Op3),          // PsAdd
    d3(0x1000_002B, RT, RA, RB, ParseAlg::Op3),          // PsAddDot
    d3(0x1000_0028, RT, RA, RB, ParseAlg::Op3),          // PsSub
    d3(0x1000_0029, RT, RA, RB, ParseAlg::Op3),          // PsSubDot
    d3(0x1000_0032, RT, RA, FRC, ParseAlg::Op3),         // PsMul
    d3(0x1000_0033, RT, RA, FRC, ParseAlg::Op3),         // PsMulDot
];

impl MnemonicDesc {
    /// Used only at table-construction time to attach a single operand to a
    /// `d0` skeleton (the branch family's bare `LI` field) without a
    /// dedicated `d1` constructor.
    const fn with_operand(mut self, a: OperandDesc) -> Self {
        self.operands[0] = a;
        self.operand_count = 1;
        self
    }
}

impl GekkoMnemonic {
    pub fn desc(self) -> &'static MnemonicDesc {
        &MNEMONICS[self as usize]
    }
}

/// Gekko's `mtspr`/`mfspr` store the 10-bit SPR number with its two 5-bit
/// halves swapped relative to their natural order.
pub fn spr_bitswap(v: u32) -> u32 {
    ((v & 0x1f) << 5) | ((v >> 5) & 0x1f)
}

// ---------------------------------------------------------------------
// Extended mnemonics
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub enum ExtendedTransform {
    /// Insert a literal value at this index before the base mnemonic's
    /// operand list is read.
    InsertConst(usize, u32),
    /// Insert two literal values (used by the branch-condition mnemonics,
    /// which synthesize both `BO` and `BI`).
    InsertConst2(usize, u32, usize, u32),
    /// Append a copy of the last operand (`mr`, `not`).
    DuplicateLast,
    /// Negate the value of the last operand (`subi`).
    NegateLast,
    /// Replace the (empty) user operand list outright (`nop`, `blr`, `bctr`).
    Constant(&'static [u32]),
    /// The conditional-branch mnemonics (`blt`, `bne`, ...): the user
    /// supplies either `target` (CR field defaults to `cr0`) or
    /// `crf, target`. Produces the base `bc` operand order `BO, BI, target`
    /// with `BI = 4*crf + cond_bit`.
    BranchCond { bo: u32, cond_bit: u32 },
    /// Pass the operand list through unchanged (`cmpw`, a plain rename of
    /// `cmp` that exists only to say "32-bit compare" out loud).
    Identity,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum ExtendedGekkoMnemonic {
    Mr,
    MrDot,
    Not,
    NotDot,
    Nop,
    Li,
    Lis,
    Subi,
    Blt,
    Ble,
    Beq,
    Bge,
    Bgt,
    Bne,
    Blr,
    Bctr,
    Mtlr,
    Mflr,
    Mtctr,
    Mfctr,
    /// Predict-taken (`+` suffix) forms; the `-` suffix is accepted as an
    /// alternate spelling of the bare mnemonic (predict-not-taken is the
    /// default and has no separate bit pattern here).
    BltPlus,
    BlePlus,
    BeqPlus,
    BgePlus,
    BgtPlus,
    BnePlus,
    Cmpw,
    Cmplw,
    Cmpwi,
    Cmplwi,
}

pub struct ExtendedMnemonicDesc {
    pub base: GekkoMnemonic,
    pub transform: ExtendedTransform,
    pub parse_algorithm: ParseAlg,
}

pub static EXTENDED_MNEMONICS: &[ExtendedMnemonicDesc] = &[
    ExtendedMnemonicDesc { base: GekkoMnemonic::Or, transform: ExtendedTransform::DuplicateLast, parse_algorithm: ParseAlg::Op2 }, // Mr
    ExtendedMnemonicDesc { base: GekkoMnemonic::OrDot, transform: ExtendedTransform::DuplicateLast, parse_algorithm: ParseAlg::Op2 }, // MrDot
    ExtendedMnemonicDesc { base: GekkoMnemonic::Nor, transform: ExtendedTransform::DuplicateLast, parse_algorithm: ParseAlg::Op2 }, // Not
    ExtendedMnemonicDesc { base: GekkoMnemonic::NorDot, transform: ExtendedTransform::DuplicateLast, parse_algorithm: ParseAlg::Op2 }, // NotDot
    ExtendedMnemonicDesc { base: GekkoMnemonic::Ori, transform: ExtendedTransform::Constant(&[0, 0, 0]), parse_algorithm: ParseAlg::None }, // Nop: ori 0,0,0
    ExtendedMnemonicDesc { base: GekkoMnemonic::Addi, transform: ExtendedTransform::InsertConst(1, 0), parse_algorithm: ParseAlg::Op2 }, // Li
    ExtendedMnemonicDesc { base: GekkoMnemonic::Addis, transform: ExtendedTransform::InsertConst(1, 0), parse_algorithm: ParseAlg::Op2 }, // Lis
    ExtendedMnemonicDesc { base: GekkoMnemonic::Addi, transform: ExtendedTransform::NegateLast, parse_algorithm: ParseAlg::Op3 }, // Subi
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 12, cond_bit: 0 }, parse_algorithm: ParseAlg::Op1Or2 }, // Blt (cr0 lt)
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 4, cond_bit: 1 }, parse_algorithm: ParseAlg::Op1Or2 }, // Ble (not gt)
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 12, cond_bit: 2 }, parse_algorithm: ParseAlg::Op1Or2 }, // Beq
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 4, cond_bit: 0 }, parse_algorithm: ParseAlg::Op1Or2 }, // Bge (not lt)
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 12, cond_bit: 1 }, parse_algorithm: ParseAlg::Op1Or2 }, // Bgt
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 4, cond_bit: 2 }, parse_algorithm: ParseAlg::Op1Or2 }, // Bne (not eq)
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bclr, transform: ExtendedTransform::InsertConst2(0, 20, 1, 0), parse_algorithm: ParseAlg::None }, // Blr
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bcctr, transform: ExtendedTransform::InsertConst2(0, 20, 1, 0), parse_algorithm: ParseAlg::None }, // Bctr
    ExtendedMnemonicDesc { base: GekkoMnemonic::Mtspr, transform: ExtendedTransform::InsertConst(1, 8), parse_algorithm: ParseAlg::Op1 }, // Mtlr
    ExtendedMnemonicDesc { base: GekkoMnemonic::Mfspr, transform: ExtendedTransform::InsertConst(1, 8), parse_algorithm: ParseAlg::Op1 }, // Mflr
    ExtendedMnemonicDesc { base: GekkoMnemonic::Mtspr, transform: ExtendedTransform::InsertConst(1, 9), parse_algorithm: ParseAlg::Op1 }, // Mtctr
    ExtendedMnemonicDesc { base: GekkoMnemonic::Mfspr, transform: ExtendedTransform::InsertConst(1, 9), parse_algorithm: ParseAlg::Op1 }, // Mfctr
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 20, cond_bit: 0 }, parse_algorithm: ParseAlg::Op1Or2 }, // BltPlus
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 12, cond_bit: 1 }, parse_algorithm: ParseAlg::Op1Or2 }, // BlePlus
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 20, cond_bit: 2 }, parse_algorithm: ParseAlg::Op1Or2 }, // BeqPlus
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 12, cond_bit: 0 }, parse_algorithm: ParseAlg::Op1Or2 }, // BgePlus
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 20, cond_bit: 1 }, parse_algorithm: ParseAlg::Op1Or2 }, // BgtPlus
    ExtendedMnemonicDesc { base: GekkoMnemonic::Bc, transform: ExtendedTransform::BranchCond { bo: 12, cond_bit: 2 }, parse_algorithm: ParseAlg::Op1Or2 }, // BnePlus
    ExtendedMnemonicDesc { base: GekkoMnemonic::Cmp, transform: ExtendedTransform::Identity, parse_algorithm: ParseAlg::Op2Or3 }, // Cmpw
    ExtendedMnemonicDesc { base: GekkoMnemonic::Cmpl, transform: ExtendedTransform::Identity, parse_algorithm: ParseAlg::Op2Or3 }, // Cmplw
    ExtendedMnemonicDesc { base: GekkoMnemonic::Cmpi, transform: ExtendedTransform::Identity, parse_algorithm: ParseAlg::Op2Or3 }, // Cmpwi
    ExtendedMnemonicDesc { base: GekkoMnemonic::Cmpli, transform: ExtendedTransform::Identity, parse_algorithm: ParseAlg::Op2Or3 }, // Cmplwi
];

impl ExtendedGekkoMnemonic {
    pub fn desc(self) -> &'static ExtendedMnemonicDesc {
        &EXTENDED_MNEMONICS[self as usize]
    }
}

// ---------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GekkoDirective {
    Byte,
    TwoByte,
    FourByte,
    EightByte,
    Float,
    Double,
    Ascii,
    Asciz,
    Zeros,
    Skip,
    Align,
    Padalign,
    Locate,
    Defvar,
}

// ---------------------------------------------------------------------
// Dictionaries
// ---------------------------------------------------------------------

static SPRG_MAP: OnceLock<CaseInsensitiveDict<u32, Underscore>> = OnceLock::new();
static DIRECTIVES_MAP: OnceLock<CaseInsensitiveDict<GekkoDirective, Underscore>> = OnceLock::new();
static MNEMONIC_TOKENS: OnceLock<CaseInsensitiveDict<GekkoMnemonic, MnemonicChars>> = OnceLock::new();
static EXTENDED_MNEMONIC_TOKENS: OnceLock<CaseInsensitiveDict<ExtendedGekkoMnemonic, ExtendedMnemonicChars>> =
    OnceLock::new();

pub fn sprg_map() -> &'static CaseInsensitiveDict<u32, Underscore> {
    SPRG_MAP.get_or_init(|| {
        let mut d = CaseInsensitiveDict::new();
        d.add("xer", 1);
        d.add("lr", 8);
        d.add("ctr", 9);
        d.add("dsisr", 18);
        d.add("dar", 19);
        d.add("dec", 22);
        d.add("sdr1", 25);
        d.add("srr0", 26);
        d.add("srr1", 27);
        d.add("sprg0", 272);
        d.add("sprg1", 273);
        d.add("sprg2", 274);
        d.add("sprg3", 275);
        d.add("ear", 282);
        d.add("tbl", 284);
        d.add("tbu", 285);
        d.add("hid0", 1008);
        d.add("hid1", 1009);
        d.add("hid2", 920);
        d.add("iabr", 1010);
        d.add("dabr", 1013);
        d.add("l2cr", 1017);
        d.add("wpar", 921);
        d.add("gqr0", 912);
        d.add("gqr1", 913);
        d.add("gqr2", 914);
        d.add("gqr3", 915);
        d.add("gqr4", 916);
        d.add("gqr5", 917);
        d.add("gqr6", 918);
        d.add("gqr7", 919);
        d.add("dma_u", 922);
        d.add("dma_l", 923);
        d.add("ummcr0", 936);
        d.add("upmc1", 937);
        d.add("upmc2", 938);
        d.add("usia", 939);
        d.add("ummcr1", 940);
        d.add("upmc3", 941);
        d.add("upmc4", 942);
        d.add("usda", 943);
        d.add("mmcr0", 952);
        d.add("pmc1", 953);
        d.add("pmc2", 954);
        d.add("sia", 955);
        d.add("mmcr1", 956);
        d.add("pmc3", 957);
        d.add("pmc4", 958);
        d.add("sda", 959);
        d.add("ictc", 1019);
        d.add("thrm1", 1020);
        d.add("thrm2", 1021);
        d.add("thrm3", 1022);
        for i in 0..4u32 {
            d.add(&format!("ibat{}u", i), 528 + i * 2);
            d.add(&format!("ibat{}l", i), 529 + i * 2);
            d.add(&format!("dbat{}u", i), 536 + i * 2);
            d.add(&format!("dbat{}l", i), 537 + i * 2);
        }
        d
    })
}

pub fn directives_map() -> &'static CaseInsensitiveDict<GekkoDirective, Underscore> {
    DIRECTIVES_MAP.get_or_init(|| {
        let mut d = CaseInsensitiveDict::new();
        d.add("byte", GekkoDirective::Byte);
        d.add("2byte", GekkoDirective::TwoByte);
        d.add("4byte", GekkoDirective::FourByte);
        d.add("8byte", GekkoDirective::EightByte);
        d.add("float", GekkoDirective::Float);
        d.add("double", GekkoDirective::Double);
        d.add("ascii", GekkoDirective::Ascii);
        d.add("asciz", GekkoDirective::Asciz);
        d.add("zeros", GekkoDirective::Zeros);
        d.add("skip", GekkoDirective::Skip);
        d.add("align", GekkoDirective::Align);
        d.add("padalign", GekkoDirective::Padalign);
        d.add("locate", GekkoDirective::Locate);
        d.add("defvar", GekkoDirective::Defvar);
        d
    })
}

pub fn mnemonic_tokens() -> &'static CaseInsensitiveDict<GekkoMnemonic, MnemonicChars> {
    MNEMONIC_TOKENS.get_or_init(|| {
        use GekkoMnemonic::*;
        let mut d = CaseInsensitiveDict::new();
        d.add("add", Add);
        d.add("add.", AddDot);
        d.add("addo", Addo);
        d.add("addo.", AddoDot);
        d.add("subf", Subf);
        d.add("subf.", SubfDot);
        d.add("subfo", Subfo);
        d.add("subfo.", SubfoDot);
        d.add("neg", Neg);
        d.add("neg.", NegDot);
        d.add("nego", Nego);
        d.add("nego.", NegoDot);
        d.add("addi", Addi);
        d.add("addic", Addic);
        d.add("addic.", AddicDot);
        d.add("addis", Addis);
        d.add("subfic", Subfic);
        d.add("mulli", Mulli);
        d.add("and", And);
        d.add("and.", AndDot);
        d.add("or", Or);
        d.add("or.", OrDot);
        d.add("xor", Xor);
        d.add("xor.", XorDot);
        d.add("nand", Nand);
        d.add("nand.", NandDot);
        d.add("nor", Nor);
        d.add("nor.", NorDot);
        d.add("andi.", AndiDot);
        d.add("andis.", AndisDot);
        d.add("ori", Ori);
        d.add("oris", Oris);
        d.add("xori", Xori);
        d.add("xoris", Xoris);
        d.add("cmp", Cmp);
        d.add("cmpi", Cmpi);
        d.add("cmpl", Cmpl);
        d.add("cmpli", Cmpli);
        d.add("rlwinm", Rlwinm);
        d.add("rlwinm.", RlwinmDot);
        d.add("b", B);
        d.add("ba", Ba);
        d.add("bl", Bl);
        d.add("bla", Bla);
        d.add("bc", Bc);
        d.add("bca", Bca);
        d.add("bcl", Bcl);
        d.add("bcla", Bcla);
        d.add("bclr", Bclr);
        d.add("bclrl", Bclrl);
        d.add("bcctr", Bcctr);
        d.add("bcctrl", Bcctrl);
        d.add("lwz", Lwz);
        d.add("lwzu", Lwzu);
        d.add("stw", Stw);
        d.add("stwu", Stwu);
        d.add("lbz", Lbz);
        d.add("stb", Stb);
        d.add("lhz", Lhz);
        d.add("sth", Sth);
        d.add("lfd", Lfd);
        d.add("lfs", Lfs);
        d.add("stfd", Stfd);
        d.add("stfs", Stfs);
        d.add("fadd", Fadd);
        d.add("fadd.", FaddDot);
        d.add("fsub", Fsub);
        d.add("fsub.", FsubDot);
        d.add("fmul", Fmul);
        d.add("fmul.", FmulDot);
        d.add("fdiv", Fdiv);
        d.add("fdiv.", FdivDot);
        d.add("fcmpo", Fcmpo);
        d.add("fcmpu", Fcmpu);
        d.add("mtspr", Mtspr);
        d.add("mfspr", Mfspr);
        d.add("dcbz", Dcbz);
        d.add("dcbz_l", DcbzL);
        d.add("psq_l", PsqL);
        d.add("psq_lu", PsqLu);
        d.add("psq_st", PsqSt);
        d.add("psq_stu", PsqStu);
        d.add("ps_add", PsAdd);
        d.add("ps_add.", PsAddDot);
        d.add("ps_sub", PsSub);
        d.add("ps_sub.", PsSubDot);
        d.add("ps_mul", PsMul);
        d.add("ps_mul.", PsMulDot);
        d
    })
}

pub fn extended_mnemonic_tokens() -> &'static CaseInsensitiveDict<ExtendedGekkoMnemonic, ExtendedMnemonicChars> {
    EXTENDED_MNEMONIC_TOKENS.get_or_init(|| {
        use ExtendedGekkoMnemonic::*;
        let mut d = CaseInsensitiveDict::new();
        d.add("mr", Mr);
        d.add("mr.", MrDot);
        d.add("not", Not);
        d.add("not.", NotDot);
        d.add("nop", Nop);
        d.add("li", Li);
        d.add("lis", Lis);
        d.add("subi", Subi);
        d.add("blt", Blt);
        d.add("blt-", Blt);
        d.add("blt+", BltPlus);
        d.add("ble", Ble);
        d.add("ble-", Ble);
        d.add("ble+", BlePlus);
        d.add("beq", Beq);
        d.add("beq-", Beq);
        d.add("beq+", BeqPlus);
        d.add("bge", Bge);
        d.add("bge-", Bge);
        d.add("bge+", BgePlus);
        d.add("bgt", Bgt);
        d.add("bgt-", Bgt);
        d.add("bgt+", BgtPlus);
        d.add("bne", Bne);
        d.add("bne-", Bne);
        d.add("bne+", BnePlus);
        d.add("blr", Blr);
        d.add("bctr", Bctr);
        d.add("mtlr", Mtlr);
        d.add("mflr", Mflr);
        d.add("mtctr", Mtctr);
        d.add("mfctr", Mfctr);
        d.add("cmpw", Cmpw);
        d.add("cmplw", Cmplw);
        d.add("cmpwi", Cmpwi);
        d.add("cmplwi", Cmplwi);
        d
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spr_bitswap_roundtrips_through_itself() {
        assert_eq!(spr_bitswap(spr_bitswap(8)), 8);
        assert_eq!(spr_bitswap(8), (8 & 0x1f) << 5);
    }

    #[test]
    fn mnemonic_count_matches_enum() {
        assert_eq!(MNEMONICS.len(), 88);
    }

    #[test]
    fn extended_mnemonic_count_matches_enum() {
        assert_eq!(EXTENDED_MNEMONICS.len(), 30);
    }

    #[test]
    fn mnemonic_dict_resolves_to_the_right_table_row() {
        let m = *mnemonic_tokens().find("ADD.").unwrap();
        assert_eq!(m, GekkoMnemonic::AddDot);
        assert_eq!(m.desc().base_opcode, 0x7C00_0215);
    }

    #[test]
    fn directive_dict_resolves_digit_leading_keys() {
        assert_eq!(directives_map().find("4byte"), Some(&GekkoDirective::FourByte));
    }

    #[test]
    fn spr_alias_lookup() {
        assert_eq!(sprg_map().find("lr"), Some(&8));
        assert_eq!(sprg_map().find("LR"), Some(&8));
    }

    #[test]
    fn float_dfa_accepts_plain_integer_float() {
        let chars: Vec<char> = "42".chars().collect();
        let (end, result) = crate::lexer::run_dfa(FLOAT_DFA, &chars, 0);
        assert_eq!(end, 2);
        assert_eq!(result, Ok(()));
    }
}
