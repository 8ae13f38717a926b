use super::Cpu;
use super::alu;
use super::decode::Instr;
use super::trap::{Trap, WithPc};
use crate::csr::CsrOp;
use crate::mem::Bus;

/// Retire one decoded instruction.
///
/// `pc` is the address the instruction was fetched from. `cpu.pc` has already
/// been advanced past it; only control transfers overwrite it again.
pub fn execute(cpu: &mut Cpu, bus: &mut Bus, instr: Instr, pc: u32) -> Result<(), Trap> {
    let r = |cpu: &Cpu, idx: u8| -> u32 { cpu.regs.read(idx) };
    let addr = |cpu: &Cpu, rs1: u8, off: i32| -> u32 { alu::add(cpu.regs.read(rs1), off as u32) };
    let target = |off: i32| -> u32 { pc.wrapping_add(off as u32) };

    match instr {
        Instr::Add { rd, rs1, rs2 } => {
            let v = alu::add(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }
        Instr::Sub { rd, rs1, rs2 } => {
            let v = alu::sub(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }
        Instr::Xor { rd, rs1, rs2 } => {
            let v = alu::xor(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }
        Instr::Or { rd, rs1, rs2 } => {
            let v = alu::or(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }
        Instr::And { rd, rs1, rs2 } => {
            let v = alu::and(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }
        Instr::Sll { rd, rs1, rs2 } => {
            let v = alu::shift_left(r(cpu, rs1), r(cpu, rs2) & 0x1f);
            cpu.regs.write(rd, v);
        }
        Instr::Srl { rd, rs1, rs2 } => {
            let v = alu::shift_right_logical(r(cpu, rs1), r(cpu, rs2) & 0x1f);
            cpu.regs.write(rd, v);
        }
        Instr::Sra { rd, rs1, rs2 } => {
            let v = alu::shift_right_arithmetic(r(cpu, rs1), r(cpu, rs2) & 0x1f);
            cpu.regs.write(rd, v);
        }
        Instr::Slt { rd, rs1, rs2 } => {
            let v = alu::less_than_signed(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }
        Instr::Sltu { rd, rs1, rs2 } => {
            let v = alu::less_than_unsigned(r(cpu, rs1), r(cpu, rs2));
            cpu.regs.write(rd, v);
        }

        Instr::Addi { rd, rs1, imm } => {
            let v = alu::add(r(cpu, rs1), alu::to_unsigned32(imm));
            cpu.regs.write(rd, v);
        }
        Instr::Xori { rd, rs1, imm } => {
            let v = alu::xor(r(cpu, rs1), imm);
            cpu.regs.write(rd, v);
        }
        Instr::Ori { rd, rs1, imm } => {
            let v = alu::or(r(cpu, rs1), imm);
            cpu.regs.write(rd, v);
        }
        Instr::Andi { rd, rs1, imm } => {
            let v = alu::and(r(cpu, rs1), imm);
            cpu.regs.write(rd, v);
        }
        Instr::Slli { rd, rs1, shamt } => {
            let v = alu::shift_left(r(cpu, rs1), shamt as u32);
            cpu.regs.write(rd, v);
        }
        Instr::Srli { rd, rs1, shamt } => {
            let v = alu::shift_right_logical(r(cpu, rs1), shamt as u32);
            cpu.regs.write(rd, v);
        }
        Instr::Srai { rd, rs1, shamt } => {
            let v = alu::shift_right_arithmetic(r(cpu, rs1), shamt as u32);
            cpu.regs.write(rd, v);
        }
        Instr::Slti { rd, rs1, imm } => {
            let v = alu::less_than_signed(r(cpu, rs1), alu::to_unsigned32(imm));
            cpu.regs.write(rd, v);
        }
        Instr::Sltiu { rd, rs1, imm } => {
            let v = alu::less_than_unsigned(r(cpu, rs1), alu::to_unsigned32(imm));
            cpu.regs.write(rd, v);
        }

        Instr::Lb { rd, rs1, off } => {
            let byte = bus.load8(addr(cpu, rs1, off)).with_pc(pc)?;
            cpu.regs.write(rd, alu::to_unsigned32(alu::to_signed8(byte as u32)));
        }
        Instr::Lh { rd, rs1, off } => {
            let half = bus.load16(addr(cpu, rs1, off)).with_pc(pc)?;
            cpu.regs.write(rd, alu::to_unsigned32(alu::to_signed16(half as u32)));
        }
        Instr::Lw { rd, rs1, off } => {
            let word = bus.load32(addr(cpu, rs1, off)).with_pc(pc)?;
            cpu.regs.write(rd, word);
        }
        Instr::Lbu { rd, rs1, off } => {
            let byte = bus.load8(addr(cpu, rs1, off)).with_pc(pc)?;
            cpu.regs.write(rd, byte as u32);
        }
        Instr::Lhu { rd, rs1, off } => {
            let half = bus.load16(addr(cpu, rs1, off)).with_pc(pc)?;
            cpu.regs.write(rd, half as u32);
        }

        Instr::Sb { rs1, rs2, off } => {
            let byte = (r(cpu, rs2) & 0xff) as u8;
            bus.store8(addr(cpu, rs1, off), byte).with_pc(pc)?;
        }
        Instr::Sh { rs1, rs2, off } => {
            let half = (r(cpu, rs2) & 0xffff) as u16;
            bus.store16(addr(cpu, rs1, off), half).with_pc(pc)?;
        }
        Instr::Sw { rs1, rs2, off } => {
            bus.store32(addr(cpu, rs1, off), r(cpu, rs2)).with_pc(pc)?;
        }

        Instr::Beq { rs1, rs2, off } => {
            if r(cpu, rs1) == r(cpu, rs2) {
                cpu.pc = target(off);
            }
        }
        Instr::Bne { rs1, rs2, off } => {
            if r(cpu, rs1) != r(cpu, rs2) {
                cpu.pc = target(off);
            }
        }
        Instr::Blt { rs1, rs2, off } => {
            if alu::less_than_signed(r(cpu, rs1), r(cpu, rs2)) == 1 {
                cpu.pc = target(off);
            }
        }
        Instr::Bge { rs1, rs2, off } => {
            if alu::less_than_signed(r(cpu, rs1), r(cpu, rs2)) == 0 {
                cpu.pc = target(off);
            }
        }
        Instr::Bltu { rs1, rs2, off } => {
            if alu::less_than_unsigned(r(cpu, rs1), r(cpu, rs2)) == 1 {
                cpu.pc = target(off);
            }
        }
        Instr::Bgeu { rs1, rs2, off } => {
            if alu::less_than_unsigned(r(cpu, rs1), r(cpu, rs2)) == 0 {
                cpu.pc = target(off);
            }
        }

        Instr::Jal { rd, off } => {
            cpu.regs.write(rd, pc.wrapping_add(4));
            cpu.pc = target(off);
        }
        Instr::Jalr { rd, rs1, off } => {
            // Read rs1 before linking, rd may alias it
            let dest = addr(cpu, rs1, off) & !1;
            cpu.regs.write(rd, pc.wrapping_add(4));
            cpu.pc = dest;
        }
        Instr::Lui { rd, imm } => cpu.regs.write(rd, imm),
        Instr::Auipc { rd, imm } => cpu.regs.write(rd, pc.wrapping_add(imm)),
        // Single hart, in order: nothing to order against
        Instr::Fence => {}

        Instr::Csrrw { rd, csr, rs1 } => {
            let operand = r(cpu, rs1);
            csr_rmw(cpu, CsrOp::Write, rd, csr, operand);
        }
        Instr::Csrrs { rd, csr, rs1 } => {
            let operand = r(cpu, rs1);
            csr_rmw(cpu, CsrOp::Set, rd, csr, operand);
        }
        Instr::Csrrc { rd, csr, rs1 } => {
            let operand = r(cpu, rs1);
            csr_rmw(cpu, CsrOp::Clear, rd, csr, operand);
        }
        Instr::Csrrwi { rd, csr, uimm } => csr_rmw(cpu, CsrOp::Write, rd, csr, uimm as u32),
        Instr::Csrrsi { rd, csr, uimm } => csr_rmw(cpu, CsrOp::Set, rd, csr, uimm as u32),
        Instr::Csrrci { rd, csr, uimm } => csr_rmw(cpu, CsrOp::Clear, rd, csr, uimm as u32),
    }

    Ok(())
}

fn csr_rmw(cpu: &mut Cpu, op: CsrOp, rd: u8, csr: u16, operand: u32) {
    let old = cpu.csrs.modify(op, csr, operand);
    cpu.regs.write(rd, old);
}
