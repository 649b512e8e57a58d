//! Resolves a [`crate::ir::GekkoIr`] against its symbol table and encodes
//! every chunk into big-endian bytes, producing the final code blocks.

use crate::error::AssemblerError;
use crate::interval::{self, Interval};
use crate::ir::{Chunk, DataItem, GekkoIr, MnemonicRef};
use crate::operand::FitFailure;
use crate::parser::ParsedOperand;
use crate::tables::{self, ExtendedTransform, MnemonicDesc, MnemonicQuirk};

/// One contiguous run of assembled bytes, starting at `block_address`.
/// A source file produces one `CodeBlock` per `.locate`/`.padalign`
/// boundary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodeBlock {
    pub block_address: u32,
    pub instructions: Vec<u8>,
}

impl CodeBlock {
    fn push_big_endian(&mut self, word: u32) {
        self.instructions.extend_from_slice(&word.to_be_bytes());
    }
}

pub fn assemble_ir(ir: &GekkoIr) -> Result<Vec<CodeBlock>, AssemblerError> {
    let mut out = Vec::with_capacity(ir.blocks.len());
    for block in &ir.blocks {
        let mut code = CodeBlock {
            block_address: block.base_address,
            instructions: Vec::new(),
        };
        for chunk in &block.chunks {
            encode_chunk(chunk, ir, &mut code)?;
        }
        log::debug!(
            "block {:#010x}: {} bytes",
            code.block_address,
            code.instructions.len()
        );
        out.push(code);
    }
    Ok(out)
}

fn encode_chunk(chunk: &Chunk, ir: &GekkoIr, code: &mut CodeBlock) -> Result<(), AssemblerError> {
    match chunk {
        Chunk::Pad { len, .. } => {
            code.instructions.resize(code.instructions.len() + len, 0);
            Ok(())
        }
        Chunk::Data { items } => {
            for item in items {
                encode_data_item(item, ir, code)?;
            }
            Ok(())
        }
        Chunk::Inst {
            mnemonic,
            operands,
            span,
            address,
        } => encode_instruction(*mnemonic, operands, *span, *address, ir, code),
    }
}

fn encode_data_item(item: &DataItem, ir: &GekkoIr, code: &mut CodeBlock) -> Result<(), AssemblerError> {
    match item {
        DataItem::Raw { bytes, .. } => code.instructions.extend_from_slice(bytes),
        DataItem::Float { bits, .. } => code.instructions.extend_from_slice(&bits.to_be_bytes()),
        DataItem::Double { bits, .. } => code.instructions.extend_from_slice(&bits.to_be_bytes()),
        DataItem::Expr { expr, width, address, span } => {
            let v = expr
                .eval(&ir.symbols, *address)
                .map_err(|m| span_error(ir, *span, m))?;
            let be = (v as u64).to_be_bytes();
            code.instructions.extend_from_slice(&be[8 - width..]);
        }
    }
    Ok(())
}

/// Turn a source span plus a bare message into a fully located error,
/// resolving line/col/source-line text from the IR's retained source text.
fn span_error(ir: &GekkoIr, span: Interval, message: String) -> AssemblerError {
    let (line, col, source_line) = interval::locate(&ir.source, span.begin);
    AssemblerError::new(message, source_line, line, col, span.len.max(1))
}

fn encode_instruction(
    mnemonic: MnemonicRef,
    operands: &[ParsedOperand],
    span: Interval,
    address: u32,
    ir: &GekkoIr,
    code: &mut CodeBlock,
) -> Result<(), AssemblerError> {
    let mut values: Vec<i64> = Vec::with_capacity(operands.len());
    for op in operands {
        let v = op
            .expr
            .eval(&ir.symbols, address)
            .map_err(|m| span_error(ir, span, m))?;
        values.push(v);
    }

    let (desc, values) = match mnemonic {
        MnemonicRef::Base(base) => (base.desc(), values),
        MnemonicRef::Extended(ext) => {
            let ext_desc = ext.desc();
            (ext_desc.base.desc(), apply_transform(ext_desc.transform, values))
        }
    };

    let values = apply_quirk(desc, values);

    if values.len() < desc.operand_count {
        return Err(span_error(
            ir,
            span,
            format!(
                "internal error: {} expects {} operands, got {}",
                "instruction",
                desc.operand_count,
                values.len()
            ),
        ));
    }

    let mut word = desc.base_opcode;
    for i in 0..desc.operand_count {
        let field = desc.operands[i];
        let raw = values[i] as u32;
        field.fits(raw).map_err(|f| fit_error(ir, f, span, raw))?;
        word |= field.fit(raw);
    }
    code.push_big_endian(word);
    Ok(())
}

fn fit_error(ir: &GekkoIr, failure: FitFailure, span: Interval, value: u32) -> AssemblerError {
    let message = match failure {
        FitFailure::OutOfRange => format!("operand value {:#x} does not fit this field", value),
        FitFailure::Misaligned => format!("operand value {:#x} is not aligned for this field", value),
    };
    span_error(ir, span, message)
}

fn apply_transform(transform: ExtendedTransform, mut values: Vec<i64>) -> Vec<i64> {
    match transform {
        ExtendedTransform::InsertConst(idx, v) => {
            values.insert(idx, v as i64);
        }
        ExtendedTransform::InsertConst2(i1, v1, i2, v2) => {
            values.insert(i1, v1 as i64);
            values.insert(i2, v2 as i64);
        }
        ExtendedTransform::DuplicateLast => {
            let last = *values.last().expect("extended mnemonic needs at least one operand");
            values.push(last);
        }
        ExtendedTransform::NegateLast => {
            if let Some(last) = values.last_mut() {
                *last = -*last;
            }
        }
        ExtendedTransform::Constant(consts) => {
            values = consts.iter().map(|&v| v as i64).collect();
        }
        ExtendedTransform::BranchCond { bo, cond_bit } => {
            let (crf, target) = if values.len() >= 2 {
                (values[0], values[1])
            } else {
                (0, values[0])
            };
            let bi = 4 * crf + cond_bit as i64;
            values = vec![bo as i64, bi, target];
        }
        ExtendedTransform::Identity => {}
    }
    values
}

fn apply_quirk(desc: &MnemonicDesc, mut values: Vec<i64>) -> Vec<i64> {
    match desc.quirk {
        MnemonicQuirk::None => {}
        MnemonicQuirk::SprBitswap { operand_index } => {
            if let Some(v) = values.get_mut(operand_index) {
                *v = tables::spr_bitswap(*v as u32) as i64;
            }
        }
        MnemonicQuirk::CmpCompat => match values.len() {
            2 => {
                values.insert(0, 0); // crfD
                values.insert(1, 0); // L
            }
            3 => values.insert(1, 0), // L
            _ => {}
        },
        MnemonicQuirk::AddisImmCompat { operand_index } => {
            if let Some(v) = values.get_mut(operand_index) {
                let masked = *v & 0xffff;
                *v = if masked >= 0x8000 { masked - 0x10000 } else { masked };
            }
        }
    }
    values
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::generate;

    fn assemble(src: &str, base: u32) -> Vec<CodeBlock> {
        let ir = generate(src, base).unwrap();
        assemble_ir(&ir).unwrap()
    }

    #[test]
    fn add_encodes_known_word() {
        let blocks = assemble("add r3,r4,r5\n", 0);
        assert_eq!(blocks[0].instructions, vec![0x7c, 0x64, 0x2a, 0x14]);
    }

    #[test]
    fn add_dot_sets_record_bit() {
        let blocks = assemble("add. r3,r4,r5\n", 0);
        assert_eq!(blocks[0].instructions, vec![0x7c, 0x64, 0x2a, 0x15]);
    }

    #[test]
    fn mr_expands_to_or_with_duplicated_operand() {
        let mr = assemble("mr r0,r4\n", 0);
        let or = assemble("or r0,r4,r4\n", 0);
        assert_eq!(mr[0].instructions, or[0].instructions);
    }

    #[test]
    fn li_expands_to_addi_with_zero_base() {
        let li = assemble("li r3,5\n", 0);
        let addi = assemble("addi r3,0,5\n", 0);
        assert_eq!(li[0].instructions, addi[0].instructions);
    }

    #[test]
    fn backward_branch_resolves_pc_relative_target() {
        let blocks = assemble("start:\n  nop\n  b start\n", 0x1000);
        let word = u32::from_be_bytes(blocks[0].instructions[4..8].try_into().unwrap());
        // opcode 18 (b), LI = -4 (back to `start`), AA=0, LK=0
        assert_eq!(word, 0x4800_0000 | (0x03FF_FFFCu32 & (-4i32 as u32)));
    }

    #[test]
    fn locate_emits_a_second_block_at_the_right_address() {
        let blocks = assemble("nop\n.locate 0x2000\nnop\n", 0x1000);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].block_address, 0x2000);
    }

    #[test]
    fn mtspr_bitswaps_the_spr_number() {
        // mtlr r3 == mtspr 8, r3 -- SPR 8 bit-swapped is ((8&0x1f)<<5)=0x100
        let blocks = assemble("mtlr r3\n", 0);
        let word = u32::from_be_bytes(blocks[0].instructions[0..4].try_into().unwrap());
        let spr_field = (word & 0x001F_F800) >> 11;
        assert_eq!(spr_field, tables::spr_bitswap(8));
    }

    #[test]
    fn out_of_range_immediate_is_an_error() {
        let ir = generate("addi r3,r4,0x10000\n", 0).unwrap();
        assert!(assemble_ir(&ir).is_err());
    }

    #[test]
    fn misaligned_branch_target_is_an_error() {
        // `start` sits at address 0, but `b` itself lands at address 1
        // (after the single data byte), so the target offset of -1 isn't
        // a multiple of 4.
        let ir = generate("start:\n.byte 0\nb start\n", 0).unwrap();
        assert!(assemble_ir(&ir).is_err());
    }

    #[test]
    fn error_points_at_the_offending_line() {
        let ir = generate("add r3,r4,r5\naddi r0,r1,0x8000\n", 0).unwrap();
        let err = assemble_ir(&ir).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.source_line.contains("addi"));
    }
}
