use super::Cpu;
use crate::config::MachineConfig;
use crate::cpu::decode::DecodeError;
use crate::mem::MemError;
use thiserror::Error;

/// Fatal machine conditions. None of them is recoverable: once raised the
/// machine dumps its state to the UART and stops.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("unknown instruction at pc=0x{pc:08x} inst=0x{inst:08x}")]
    UnknownInstruction { pc: u32, inst: u32 },

    #[error("pc=0x{pc:08x} is outside DRAM")]
    AddressOutOfRange { pc: u32 },

    #[error("jump to null address")]
    NullJump,

    #[error("memory error at pc=0x{pc:08x}: {err}")]
    MemoryFault { pc: u32, err: MemError },
}

impl Trap {
    /// Diagnostic lines describing the trap and the machine state at the time.
    pub fn dump(&self, cpu: &Cpu, config: &MachineConfig) -> Vec<String> {
        let mut lines = Vec::with_capacity(40);
        match self {
            Trap::UnknownInstruction { .. } => {
                lines.push("* Unknown instruction encountered".to_string());
            }
            Trap::AddressOutOfRange { pc } => {
                lines.push("* PC exceeded DRAM size".to_string());
                lines.push(format!("PC: {pc}"));
                lines.push(format!("DRAM_BASE: {}", config.dram_base));
                lines.push(format!("DRAM_SIZE: {}", config.dram_size));
            }
            Trap::NullJump => lines.push("* Jump to null address".to_string()),
            Trap::MemoryFault { err, .. } => {
                lines.push("* Memory access out of range".to_string());
                lines.push(format!("addr: {:08x}", err.addr()));
            }
        }

        lines.push(format!("PC: {:08x}", cpu.pc));
        lines.push(format!("Prev PC: {:08x}", cpu.prev_pc));
        lines.push(format!("inst: {:08x}", cpu.last_inst));
        lines.push(format!("tick: {}", cpu.ticks));
        lines.push("--- Registers ---".to_string());
        for (i, value) in cpu.regs.iter().enumerate() {
            lines.push(format!("{i}: 0x{value:08x}"));
        }
        lines
    }
}

/// Trait for adding PC context to errors that can become Traps
pub trait WithPc<T> {
    fn with_pc(self, pc: u32) -> Result<T, Trap>;
}

impl<T> WithPc<T> for Result<T, MemError> {
    fn with_pc(self, pc: u32) -> Result<T, Trap> {
        self.map_err(|err| Trap::MemoryFault { pc, err })
    }
}

impl<T> WithPc<T> for Result<T, DecodeError> {
    fn with_pc(self, pc: u32) -> Result<T, Trap> {
        self.map_err(|err| match err {
            DecodeError::InvalidOpcode { inst } | DecodeError::InvalidFunct { inst } => {
                Trap::UnknownInstruction { pc, inst }
            }
        })
    }
}
