use byteorder::{BigEndian, WriteBytesExt};
use clap::{App, Arg};
use gekko_assembler::{assemble, CodeBlock};
use std::fs;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;

fn parse_base_address(s: &str) -> Result<u32, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

fn main() {
    pretty_env_logger::init();

    let matches = App::new("gasm")
        .about("Assembler for the Gekko/Broadway instruction set")
        .arg(Arg::with_name("input").required(true).help("assembly source file"))
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .required(true)
                .help("path to write the assembled bytes to"),
        )
        .arg(
            Arg::with_name("base_address")
                .short("b")
                .long("base-address")
                .takes_value(true)
                .default_value("0x0")
                .help("address of the first output byte"),
        )
        .get_matches();

    let input_path = matches.value_of("input").unwrap();
    let output_path = matches.value_of("output").unwrap();
    let base_address = match parse_base_address(matches.value_of("base_address").unwrap()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: invalid --base-address: {}", e);
            process::exit(1);
        }
    };

    let source = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: couldn't read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let blocks = match assemble(&source, base_address) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e.with_path(input_path));
            process::exit(1);
        }
    };

    if blocks.is_empty() {
        log::warn!("{} produced no output", input_path);
    }

    for block in &blocks {
        log::debug!(
            "block at {:#010x}: {} bytes",
            block.block_address,
            block.instructions.len()
        );
    }

    if let Err(e) = write_blocks(output_path, &blocks) {
        eprintln!("error: couldn't write {}: {}", output_path, e);
        process::exit(1);
    }
}

/// Writes every block, tagged with its address, so the host can patch each
/// run of bytes into memory independently instead of assuming one
/// contiguous image. Layout is a flat sequence of
/// `(address: u32 BE, length: u32 BE, bytes)` records.
fn write_blocks(output_path: &str, blocks: &[CodeBlock]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    for block in blocks {
        writer.write_u32::<BigEndian>(block.block_address)?;
        writer.write_u32::<BigEndian>(block.instructions.len() as u32)?;
        writer.write_all(&block.instructions)?;
    }
    writer.flush()
}
