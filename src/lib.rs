//! Assembler for the Gekko/Broadway instruction set (the PowerPC 750-derived
//! CPU used by the Wii and GameCube).
//!
//! The pipeline is a single forward pass over the source text:
//!
//! | stage | module | does |
//! |---|---|---|
//! | tokenize | [`lexer`] | turn source text into a token stream, with lookahead |
//! | parse | [`parser`] | recursive-descent expression parser + per-mnemonic operand grammars |
//! | generate IR | [`ir`] | track the write cursor and symbol table, build unresolved chunks |
//! | assemble | [`assembler`] | resolve every expression and encode chunks into bytes |
//!
//! Labels may be referenced before they're defined; everything else
//! (`.defvar`, `.align`, `.skip`, `.locate`) must resolve against symbols
//! already seen by the time it's parsed.
//!
//! ```no_run
//! let blocks = gekko_assembler::assemble("start:\n  b start\n", 0x8000_0000).unwrap();
//! for block in blocks {
//!     println!("{:#010x}: {} bytes", block.block_address, block.instructions.len());
//! }
//! ```

pub mod assembler;
pub mod dict;
pub mod error;
pub mod interval;
pub mod ir;
pub mod lexer;
pub mod operand;
pub mod parser;
pub mod tables;

pub use assembler::CodeBlock;
pub use error::AssemblerError;

/// Assemble `source` into one or more [`CodeBlock`]s, as if the first byte
/// were written at `base_address`.
///
/// Returns the first error encountered; the assembler does not try to
/// recover and keep reporting further errors in the same source.
pub fn assemble(source: &str, base_address: u32) -> error::Result<Vec<CodeBlock>> {
    let ir = ir::generate(source, base_address)?;
    assembler::assemble_ir(&ir)
}

#[cfg(test)]
mod test;
