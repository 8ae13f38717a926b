use super::alu::{sign_extend, to_unsigned32};
use thiserror::Error;

pub mod opcodes {
    pub const OP: u32 = 0b0110011;
    pub const OP_IMM: u32 = 0b0010011;
    pub const LOAD: u32 = 0b0000011;
    pub const STORE: u32 = 0b0100011;
    pub const BRANCH: u32 = 0b1100011;
    pub const JAL: u32 = 0b1101111;
    pub const JALR: u32 = 0b1100111;
    pub const LUI: u32 = 0b0110111;
    pub const AUIPC: u32 = 0b0010111;
    pub const MISC_MEM: u32 = 0b0001111;
    pub const SYSTEM: u32 = 0b1110011;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid opcode: 0x{inst:08x}")]
    InvalidOpcode { inst: u32 },
    #[error("invalid function: 0x{inst:08x}")]
    InvalidFunct { inst: u32 },
}

fn rd(inst: u32) -> u8 {
    ((inst >> 7) & 0x1f) as u8
}

fn rs1(inst: u32) -> u8 {
    ((inst >> 15) & 0x1f) as u8
}

fn rs2(inst: u32) -> u8 {
    ((inst >> 20) & 0x1f) as u8
}

fn funct3(inst: u32) -> u8 {
    ((inst >> 12) & 0x7) as u8
}

fn funct7(inst: u32) -> u8 {
    (inst >> 25) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RType {
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub funct7: u8,
}

impl RType {
    pub fn decode(inst: u32) -> Self {
        Self {
            rd: rd(inst),
            rs1: rs1(inst),
            rs2: rs2(inst),
            funct3: funct3(inst),
            funct7: funct7(inst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IType {
    pub rd: u8,
    pub rs1: u8,
    pub funct3: u8,
    pub imm: i32,
}

impl IType {
    pub fn decode(inst: u32) -> Self {
        Self {
            rd: rd(inst),
            rs1: rs1(inst),
            funct3: funct3(inst),
            imm: (inst as i32) >> 20,
        }
    }

    /// The sign-extended immediate as an unsigned word, for the bitwise
    /// immediate ops.
    pub fn uimm(&self) -> u32 {
        to_unsigned32(self.imm)
    }

    /// Shift amount for slli/srli/srai.
    pub fn shamt(&self) -> u8 {
        (self.imm & 0x1f) as u8
    }
}

/// I-type layout used by the SYSTEM opcode: the immediate is a raw CSR index
/// and `rs1` doubles as a 5-bit unsigned immediate for the `*i` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrType {
    pub rd: u8,
    pub rs1: u8,
    pub funct3: u8,
    pub csr: u16,
}

impl CsrType {
    pub fn decode(inst: u32) -> Self {
        Self {
            rd: rd(inst),
            rs1: rs1(inst),
            funct3: funct3(inst),
            csr: (inst >> 20) as u16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SType {
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub imm: i32,
}

impl SType {
    pub fn decode(inst: u32) -> Self {
        let imm4_0 = (inst >> 7) & 0x1f;
        let imm11_5 = (inst >> 25) & 0x7f;
        Self {
            rs1: rs1(inst),
            rs2: rs2(inst),
            funct3: funct3(inst),
            imm: sign_extend((imm11_5 << 5) | imm4_0, 12),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BType {
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub imm: i32,
}

impl BType {
    pub fn decode(inst: u32) -> Self {
        let imm11 = (inst >> 7) & 0x1;
        let imm4_1 = (inst >> 8) & 0xf;
        let imm10_5 = (inst >> 25) & 0x3f;
        let imm12 = (inst >> 31) & 0x1;
        Self {
            rs1: rs1(inst),
            rs2: rs2(inst),
            funct3: funct3(inst),
            imm: sign_extend(
                (imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1),
                13,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UType {
    pub rd: u8,
    pub imm: u32,
}

impl UType {
    pub fn decode(inst: u32) -> Self {
        Self {
            rd: rd(inst),
            imm: inst & 0xffff_f000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JType {
    pub rd: u8,
    pub imm: i32,
}

impl JType {
    pub fn decode(inst: u32) -> Self {
        let imm19_12 = (inst >> 12) & 0xff;
        let imm11 = (inst >> 20) & 0x1;
        let imm10_1 = (inst >> 21) & 0x3ff;
        let imm20 = (inst >> 31) & 0x1;
        Self {
            rd: rd(inst),
            imm: sign_extend(
                (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1),
                21,
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    // R-type
    Add { rd: u8, rs1: u8, rs2: u8 },
    Sub { rd: u8, rs1: u8, rs2: u8 },
    Xor { rd: u8, rs1: u8, rs2: u8 },
    Or { rd: u8, rs1: u8, rs2: u8 },
    And { rd: u8, rs1: u8, rs2: u8 },
    Sll { rd: u8, rs1: u8, rs2: u8 },
    Srl { rd: u8, rs1: u8, rs2: u8 },
    Sra { rd: u8, rs1: u8, rs2: u8 },
    Slt { rd: u8, rs1: u8, rs2: u8 },
    Sltu { rd: u8, rs1: u8, rs2: u8 },
    // I-type arithmetic
    Addi { rd: u8, rs1: u8, imm: i32 },
    Xori { rd: u8, rs1: u8, imm: u32 },
    Ori { rd: u8, rs1: u8, imm: u32 },
    Andi { rd: u8, rs1: u8, imm: u32 },
    Slli { rd: u8, rs1: u8, shamt: u8 },
    Srli { rd: u8, rs1: u8, shamt: u8 },
    Srai { rd: u8, rs1: u8, shamt: u8 },
    Slti { rd: u8, rs1: u8, imm: i32 },
    Sltiu { rd: u8, rs1: u8, imm: i32 },
    // Loads
    Lb { rd: u8, rs1: u8, off: i32 },
    Lh { rd: u8, rs1: u8, off: i32 },
    Lw { rd: u8, rs1: u8, off: i32 },
    Lbu { rd: u8, rs1: u8, off: i32 },
    Lhu { rd: u8, rs1: u8, off: i32 },
    // Stores
    Sb { rs1: u8, rs2: u8, off: i32 },
    Sh { rs1: u8, rs2: u8, off: i32 },
    Sw { rs1: u8, rs2: u8, off: i32 },
    // Branches
    Beq { rs1: u8, rs2: u8, off: i32 },
    Bne { rs1: u8, rs2: u8, off: i32 },
    Blt { rs1: u8, rs2: u8, off: i32 },
    Bge { rs1: u8, rs2: u8, off: i32 },
    Bltu { rs1: u8, rs2: u8, off: i32 },
    Bgeu { rs1: u8, rs2: u8, off: i32 },
    // Jumps
    Jal { rd: u8, off: i32 },
    Jalr { rd: u8, rs1: u8, off: i32 },
    // Upper immediates
    Lui { rd: u8, imm: u32 },
    Auipc { rd: u8, imm: u32 },
    Fence,
    // CSR access
    Csrrw { rd: u8, csr: u16, rs1: u8 },
    Csrrs { rd: u8, csr: u16, rs1: u8 },
    Csrrc { rd: u8, csr: u16, rs1: u8 },
    Csrrwi { rd: u8, csr: u16, uimm: u8 },
    Csrrsi { rd: u8, csr: u16, uimm: u8 },
    Csrrci { rd: u8, csr: u16, uimm: u8 },
}

pub fn decode(inst: u32) -> Result<Instr, DecodeError> {
    use opcodes::*;

    let opcode = inst & 0x7f;
    let f3 = funct3(inst);
    let f7 = funct7(inst);
    let instr = match opcode {
        OP => {
            let RType { rd, rs1, rs2, .. } = RType::decode(inst);
            match (f3, f7) {
                (0x0, 0x00) => Instr::Add { rd, rs1, rs2 },
                (0x0, 0x20) => Instr::Sub { rd, rs1, rs2 },
                (0x4, _) => Instr::Xor { rd, rs1, rs2 },
                (0x6, _) => Instr::Or { rd, rs1, rs2 },
                (0x7, _) => Instr::And { rd, rs1, rs2 },
                (0x1, _) => Instr::Sll { rd, rs1, rs2 },
                (0x5, 0x00) => Instr::Srl { rd, rs1, rs2 },
                (0x5, 0x20) => Instr::Sra { rd, rs1, rs2 },
                (0x2, _) => Instr::Slt { rd, rs1, rs2 },
                (0x3, _) => Instr::Sltu { rd, rs1, rs2 },
                _ => return Err(DecodeError::InvalidFunct { inst }),
            }
        }
        OP_IMM => {
            let i = IType::decode(inst);
            let (rd, rs1) = (i.rd, i.rs1);
            match (f3, f7) {
                (0x0, _) => Instr::Addi { rd, rs1, imm: i.imm },
                (0x4, _) => Instr::Xori { rd, rs1, imm: i.uimm() },
                (0x6, _) => Instr::Ori { rd, rs1, imm: i.uimm() },
                (0x7, _) => Instr::Andi { rd, rs1, imm: i.uimm() },
                (0x1, _) => Instr::Slli { rd, rs1, shamt: i.shamt() },
                (0x5, 0x00) => Instr::Srli { rd, rs1, shamt: i.shamt() },
                (0x5, 0x20) => Instr::Srai { rd, rs1, shamt: i.shamt() },
                (0x2, _) => Instr::Slti { rd, rs1, imm: i.imm },
                (0x3, _) => Instr::Sltiu { rd, rs1, imm: i.imm },
                _ => return Err(DecodeError::InvalidFunct { inst }),
            }
        }
        LOAD => {
            let IType { rd, rs1, imm: off, .. } = IType::decode(inst);
            match f3 {
                0x0 => Instr::Lb { rd, rs1, off },
                0x1 => Instr::Lh { rd, rs1, off },
                0x2 => Instr::Lw { rd, rs1, off },
                0x4 => Instr::Lbu { rd, rs1, off },
                0x5 => Instr::Lhu { rd, rs1, off },
                _ => return Err(DecodeError::InvalidFunct { inst }),
            }
        }
        STORE => {
            let SType { rs1, rs2, imm: off, .. } = SType::decode(inst);
            match f3 {
                0x0 => Instr::Sb { rs1, rs2, off },
                0x1 => Instr::Sh { rs1, rs2, off },
                0x2 => Instr::Sw { rs1, rs2, off },
                _ => return Err(DecodeError::InvalidFunct { inst }),
            }
        }
        BRANCH => {
            let BType { rs1, rs2, imm: off, .. } = BType::decode(inst);
            match f3 {
                0x0 => Instr::Beq { rs1, rs2, off },
                0x1 => Instr::Bne { rs1, rs2, off },
                0x4 => Instr::Blt { rs1, rs2, off },
                0x5 => Instr::Bge { rs1, rs2, off },
                0x6 => Instr::Bltu { rs1, rs2, off },
                0x7 => Instr::Bgeu { rs1, rs2, off },
                _ => return Err(DecodeError::InvalidFunct { inst }),
            }
        }
        JAL => {
            let j = JType::decode(inst);
            Instr::Jal { rd: j.rd, off: j.imm }
        }
        // jalr ignores funct3
        JALR => {
            let i = IType::decode(inst);
            Instr::Jalr {
                rd: i.rd,
                rs1: i.rs1,
                off: i.imm,
            }
        }
        LUI => {
            let u = UType::decode(inst);
            Instr::Lui { rd: u.rd, imm: u.imm }
        }
        AUIPC => {
            let u = UType::decode(inst);
            Instr::Auipc { rd: u.rd, imm: u.imm }
        }
        MISC_MEM => Instr::Fence,
        SYSTEM => {
            let CsrType { rd, rs1, csr, .. } = CsrType::decode(inst);
            match f3 {
                0b001 => Instr::Csrrw { rd, csr, rs1 },
                0b010 => Instr::Csrrs { rd, csr, rs1 },
                0b011 => Instr::Csrrc { rd, csr, rs1 },
                0b101 => Instr::Csrrwi { rd, csr, uimm: rs1 },
                0b110 => Instr::Csrrsi { rd, csr, uimm: rs1 },
                0b111 => Instr::Csrrci { rd, csr, uimm: rs1 },
                // ecall/ebreak and friends are not part of this machine
                _ => return Err(DecodeError::InvalidFunct { inst }),
            }
        }
        _ => return Err(DecodeError::InvalidOpcode { inst }),
    };
    Ok(instr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::encode;
    use proptest::prelude::*;

    #[test]
    fn decodes_known_words() {
        // addi a0, zero, 1
        assert_eq!(
            decode(0x0010_0513),
            Ok(Instr::Addi {
                rd: 10,
                rs1: 0,
                imm: 1
            })
        );
        // sub t2, t0, t1
        assert_eq!(
            decode(0x4062_83b3),
            Ok(Instr::Sub {
                rd: 7,
                rs1: 5,
                rs2: 6
            })
        );
        // beq zero, zero, -4
        assert_eq!(
            decode(0xfe00_0ee3),
            Ok(Instr::Beq {
                rs1: 0,
                rs2: 0,
                off: -4
            })
        );
        // lui a5, 0x10000
        assert_eq!(
            decode(0x1000_07b7),
            Ok(Instr::Lui {
                rd: 15,
                imm: 0x1000_0000
            })
        );
        // csrrs a0, mcycle(0xb00), zero
        assert_eq!(
            decode(0xb000_2573),
            Ok(Instr::Csrrs {
                rd: 10,
                csr: 0xb00,
                rs1: 0
            })
        );
    }

    #[test]
    fn bitwise_immediates_keep_the_sign_bits() {
        // xori a0, a0, -1  (not a0)
        assert_eq!(
            decode(0xfff5_4513),
            Ok(Instr::Xori {
                rd: 10,
                rs1: 10,
                imm: 0xffff_ffff
            })
        );
    }

    #[test]
    fn srai_is_told_apart_by_funct7() {
        let srai = encode::i_type(opcodes::OP_IMM, 1, 0x5, 2, 0x400 | 3);
        let srli = encode::i_type(opcodes::OP_IMM, 1, 0x5, 2, 3);
        assert_eq!(decode(srai), Ok(Instr::Srai { rd: 1, rs1: 2, shamt: 3 }));
        assert_eq!(decode(srli), Ok(Instr::Srli { rd: 1, rs1: 2, shamt: 3 }));
        let bogus = encode::i_type(opcodes::OP_IMM, 1, 0x5, 2, 0x200 | 3);
        assert!(decode(bogus).is_err());
    }

    #[test]
    fn rejects_unsupported_encodings() {
        assert_eq!(decode(0), Err(DecodeError::InvalidOpcode { inst: 0 }));
        assert_eq!(
            decode(0xffff_ffff),
            Err(DecodeError::InvalidOpcode { inst: 0xffff_ffff })
        );
        // ecall
        assert_eq!(
            decode(0x0000_0073),
            Err(DecodeError::InvalidFunct { inst: 0x0000_0073 })
        );
        // mul is RV32M, not here
        assert!(decode(encode::r_type(opcodes::OP, 1, 0, 2, 3, 0x01)).is_err());
        // sd has no RV32 meaning
        assert!(decode(encode::s_type(opcodes::STORE, 0x3, 1, 2, 0)).is_err());
    }

    proptest! {
        #[test]
        fn r_type_round_trips(rd in 0u8..32, rs1 in 0u8..32, rs2 in 0u8..32, f3 in 0u8..8, f7 in 0u8..128) {
            let inst = encode::r_type(opcodes::OP, rd, f3, rs1, rs2, f7);
            prop_assert_eq!(RType::decode(inst), RType { rd, rs1, rs2, funct3: f3, funct7: f7 });
        }

        #[test]
        fn i_type_round_trips(rd in 0u8..32, rs1 in 0u8..32, f3 in 0u8..8, imm in -2048i32..2048) {
            let inst = encode::i_type(opcodes::OP_IMM, rd, f3, rs1, imm);
            prop_assert_eq!(IType::decode(inst), IType { rd, rs1, funct3: f3, imm });
        }

        #[test]
        fn s_type_round_trips(rs1 in 0u8..32, rs2 in 0u8..32, f3 in 0u8..8, imm in -2048i32..2048) {
            let inst = encode::s_type(opcodes::STORE, f3, rs1, rs2, imm);
            prop_assert_eq!(SType::decode(inst), SType { rs1, rs2, funct3: f3, imm });
        }

        #[test]
        fn b_type_round_trips(rs1 in 0u8..32, rs2 in 0u8..32, f3 in 0u8..8, half in -2048i32..2048) {
            let imm = half * 2;
            let inst = encode::b_type(opcodes::BRANCH, f3, rs1, rs2, imm);
            prop_assert_eq!(BType::decode(inst), BType { rs1, rs2, funct3: f3, imm });
        }

        #[test]
        fn u_type_round_trips(rd in 0u8..32, upper in 0u32..(1 << 20)) {
            let imm = upper << 12;
            let inst = encode::u_type(opcodes::LUI, rd, imm);
            prop_assert_eq!(UType::decode(inst), UType { rd, imm });
        }

        #[test]
        fn j_type_round_trips(rd in 0u8..32, half in -(1i32 << 19)..(1i32 << 19)) {
            let imm = half * 2;
            let inst = encode::j_type(opcodes::JAL, rd, imm);
            prop_assert_eq!(JType::decode(inst), JType { rd, imm });
        }
    }
}
