//! End-to-end scenarios run against the public [`crate::assemble`] entry
//! point, rather than against an individual module in isolation.

use crate::assemble;

fn bytes(source: &str, base: u32) -> Vec<u8> {
    let blocks = assemble(source, base).unwrap();
    blocks.into_iter().flat_map(|b| b.instructions).collect()
}

#[test]
fn scenario_add_family() {
    assert_eq!(bytes("add r3, r4, r5\n", 0), vec![0x7c, 0x64, 0x2a, 0x14]);
    assert_eq!(bytes("add. r3, r4, r5\n", 0), vec![0x7c, 0x64, 0x2a, 0x15]);
    assert_eq!(bytes("addo r3, r4, r5\n", 0), vec![0x7c, 0x64, 0x2e, 0x14]);
    assert_eq!(bytes("addo. r3, r4, r5\n", 0), vec![0x7c, 0x64, 0x2e, 0x15]);
}

#[test]
fn scenario_branch_pc_relative_and_absolute() {
    assert_eq!(bytes("b 0x1000\n", 0), vec![0x48, 0x00, 0x10, 0x00]);
    assert_eq!(bytes("b 0x1000\n", 0x1000), vec![0x48, 0x00, 0x00, 0x00]);
    assert_eq!(bytes("ba 0x1000\n", 0), vec![0x48, 0x00, 0x10, 0x02]);
}

#[test]
fn scenario_conditional_branch_with_predict_bit() {
    assert_eq!(bytes("bne 0, 4\n", 0), vec![0x40, 0x82, 0x00, 0x04]);
    assert_eq!(bytes("bne+ 0, 4\n", 0), vec![0x41, 0x82, 0x00, 0x04]);
}

#[test]
fn scenario_mr_expands_to_or() {
    assert_eq!(bytes("mr r0, r4\n", 0), vec![0x7c, 0x80, 0x23, 0x78]);
}

#[test]
fn scenario_4byte_directive() {
    assert_eq!(
        bytes(".4byte 0x12345678, 0x9abcdef0\n", 0),
        vec![0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0]
    );
}

#[test]
fn scenario_float_directive() {
    assert_eq!(bytes(".float 1.25\n", 0), vec![0x3f, 0xa0, 0x00, 0x00]);
}

#[test]
fn scenario_ascii_directive() {
    assert_eq!(bytes(r#".ascii "a\nb""#, 0), vec![0x61, 0x0a, 0x62]);
}

#[test]
fn scenario_locate_splits_blocks() {
    let blocks = assemble(".locate 0x100\n.byte 1\n.locate 0x200\n.byte 2\n", 0).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].block_address, 0x100);
    assert_eq!(blocks[0].instructions, vec![0x01]);
    assert_eq!(blocks[1].block_address, 0x200);
    assert_eq!(blocks[1].instructions, vec![0x02]);
}

#[test]
fn scenario_ha_lo_address_fixup() {
    let src = ".defvar sym, 0x80001234\nlis r0, sym@ha\nori r0, r0, sym@l\n";
    assert_eq!(
        bytes(src, 0),
        vec![0x3c, 0x00, 0x80, 0x00, 0x60, 0x00, 0x12, 0x34]
    );
}

#[test]
fn boundary_signed_immediate() {
    assert!(assemble("addi r0, r1, 0x7fff\n", 0).is_ok());
    assert!(assemble("addi r0, r1, 0x8000\n", 0).is_err());
    assert!(assemble("addi r0, r1, -0x8000\n", 0).is_ok());
    assert!(assemble("addi r0, r1, -0x8001\n", 0).is_err());
}

#[test]
fn boundary_unsigned_immediate() {
    assert!(assemble("andi. r0, r1, 0xffff\n", 0).is_ok());
    assert!(assemble("andi. r0, r1, 0x10000\n", 0).is_err());
    assert!(assemble("andi. r0, r1, -1\n", 0).is_err());
    assert!(assemble("andi. r0, r1, 0\n", 0).is_ok());
}

#[test]
fn boundary_aligned_displacement() {
    assert!(assemble("psq_l f0, (1<<11)-1(r3), 0, 0\n", 0).is_ok());
    assert!(assemble("psq_l f0, 1<<11(r3), 0, 0\n", 0).is_err());
}

#[test]
fn boundary_cr_field() {
    assert!(assemble("cmpw 7, 0, 0\n", 0).is_ok());
    assert!(assemble("cmpw 8, 0, 0\n", 0).is_err());
}

#[test]
fn boundary_branch_displacement() {
    assert!(assemble("beq (1<<15)-4\n", 0).is_ok());
    assert!(assemble("beq 1<<15\n", 0).is_err());
}

#[test]
fn round_trip_extended_mnemonic_matches_base_transform() {
    let mtlr = bytes("mtlr r3\n", 0);
    let mtspr = bytes("mtspr 8, r3\n", 0);
    assert_eq!(mtlr, mtspr);

    let mflr = bytes("mflr r3\n", 0);
    let mfspr = bytes("mfspr r3, 8\n", 0);
    assert_eq!(mflr, mfspr);
}

#[test]
fn spr_alias_resolves_symbolic_name() {
    assert_eq!(bytes("mtspr lr, r3\n", 0), bytes("mtspr 8, r3\n", 0));
    assert_eq!(bytes("mtspr hid0, r3\n", 0), bytes("mtspr 1008, r3\n", 0));
}

#[test]
fn error_carries_line_and_column() {
    // lines are zero-based internally (`Display` adds one for humans), so
    // the second line of source is line 1.
    let err = assemble("add r3, r4, r5\naddi r0, r1, 0x8000\n", 0).unwrap_err();
    assert_eq!(err.line, 1);
}
