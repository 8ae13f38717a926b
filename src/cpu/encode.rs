//! Instruction encoders, the inverse of the format decoders in
//! [`super::decode`]. Handy for assembling small test programs by hand.

use super::decode::opcodes::*;

pub fn r_type(opcode: u32, rd: u8, funct3: u8, rs1: u8, rs2: u8, funct7: u8) -> u32 {
    ((funct7 as u32 & 0x7f) << 25)
        | ((rs2 as u32 & 0x1f) << 20)
        | ((rs1 as u32 & 0x1f) << 15)
        | ((funct3 as u32 & 0x7) << 12)
        | ((rd as u32 & 0x1f) << 7)
        | (opcode & 0x7f)
}

pub fn i_type(opcode: u32, rd: u8, funct3: u8, rs1: u8, imm: i32) -> u32 {
    ((imm as u32 & 0xfff) << 20)
        | ((rs1 as u32 & 0x1f) << 15)
        | ((funct3 as u32 & 0x7) << 12)
        | ((rd as u32 & 0x1f) << 7)
        | (opcode & 0x7f)
}

pub fn s_type(opcode: u32, funct3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7f) << 25)
        | ((rs2 as u32 & 0x1f) << 20)
        | ((rs1 as u32 & 0x1f) << 15)
        | ((funct3 as u32 & 0x7) << 12)
        | ((imm & 0x1f) << 7)
        | (opcode & 0x7f)
}

pub fn b_type(opcode: u32, funct3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3f) << 25)
        | ((rs2 as u32 & 0x1f) << 20)
        | ((rs1 as u32 & 0x1f) << 15)
        | ((funct3 as u32 & 0x7) << 12)
        | (((imm >> 1) & 0xf) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | (opcode & 0x7f)
}

pub fn u_type(opcode: u32, rd: u8, imm: u32) -> u32 {
    (imm & 0xffff_f000) | ((rd as u32 & 0x1f) << 7) | (opcode & 0x7f)
}

pub fn j_type(opcode: u32, rd: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3ff) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xff) << 12)
        | ((rd as u32 & 0x1f) << 7)
        | (opcode & 0x7f)
}

// A few mnemonics that come up constantly in programs.

pub fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_IMM, rd, 0x0, rs1, imm)
}

pub fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP, rd, 0x0, rs1, rs2, 0x00)
}

pub fn lui(rd: u8, imm: u32) -> u32 {
    u_type(LUI, rd, imm)
}

pub fn lbu(rd: u8, rs1: u8, off: i32) -> u32 {
    i_type(LOAD, rd, 0x4, rs1, off)
}

pub fn lw(rd: u8, rs1: u8, off: i32) -> u32 {
    i_type(LOAD, rd, 0x2, rs1, off)
}

pub fn sb(rs1: u8, rs2: u8, off: i32) -> u32 {
    s_type(STORE, 0x0, rs1, rs2, off)
}

pub fn sw(rs1: u8, rs2: u8, off: i32) -> u32 {
    s_type(STORE, 0x2, rs1, rs2, off)
}

pub fn beq(rs1: u8, rs2: u8, off: i32) -> u32 {
    b_type(BRANCH, 0x0, rs1, rs2, off)
}

pub fn bne(rs1: u8, rs2: u8, off: i32) -> u32 {
    b_type(BRANCH, 0x1, rs1, rs2, off)
}

pub fn jal(rd: u8, off: i32) -> u32 {
    j_type(JAL, rd, off)
}

pub fn jalr(rd: u8, rs1: u8, off: i32) -> u32 {
    i_type(JALR, rd, 0x0, rs1, off)
}

pub fn csrrw(rd: u8, csr: u16, rs1: u8) -> u32 {
    i_type(SYSTEM, rd, 0b001, rs1, csr as i32)
}

/// Flatten instruction words into a little-endian program image.
pub fn assemble(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
