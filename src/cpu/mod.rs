pub mod alu;
pub mod decode;
pub mod encode;
pub mod exec;
pub mod regs;
pub mod trap;

use crate::config::{ConfigError, MachineConfig};
use crate::csr::CsrFile;
use crate::mem::{Bus, MemError};
use regs::RegisterFile;
use thiserror::Error;
use trap::{Trap, WithPc};

/// Stack pointer register index.
const SP: u8 = 2;

#[derive(Error, Debug)]
pub enum MachineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("program image of {len} bytes does not fit in {dram_size} bytes of DRAM")]
    ImageTooLarge { len: usize, dram_size: u32 },
    #[error(transparent)]
    Mem(#[from] MemError),
}

#[derive(Default)]
pub struct Cpu {
    pub regs: RegisterFile,
    pub pc: u32,
    pub csrs: CsrFile,
    /// Retired (or attempted) steps since reset
    pub ticks: u64,
    /// Address of the last fetched instruction
    pub prev_pc: u32,
    /// Last fetched instruction word
    pub last_inst: u32,
}

pub struct Machine {
    pub cpu: Cpu,
    pub bus: Bus,
    config: MachineConfig,
    image: Vec<u8>,
    halted: Option<Trap>,
}

impl Machine {
    /// Build a machine holding `image` and reset it.
    pub fn new(config: MachineConfig, image: Vec<u8>) -> Result<Self, MachineError> {
        config.validate()?;
        let mut machine = Self {
            cpu: Cpu {
                csrs: CsrFile::new(config.csrrc_mode),
                ..Cpu::default()
            },
            bus: Bus::new(&config),
            config,
            image: Vec::new(),
            halted: None,
        };
        machine.load_image(image)?;
        Ok(machine)
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Replace the program image and reset onto it.
    pub fn load_image(&mut self, image: Vec<u8>) -> Result<(), MachineError> {
        if image.len() > self.config.dram_size as usize {
            return Err(MachineError::ImageTooLarge {
                len: image.len(),
                dram_size: self.config.dram_size,
            });
        }
        self.image = image;
        self.reset()?;
        Ok(())
    }

    /// Zero DRAM, copy the image to `dram_base`, clear every register and CSR,
    /// point `sp` at `dram_size` and `pc` at `dram_base`, and clear the UART.
    pub fn reset(&mut self) -> Result<(), MemError> {
        self.bus.uart.clear();
        self.bus.dram.reload(&self.image)?;
        self.cpu.regs.reset();
        self.cpu.regs.write(SP, self.config.dram_size);
        self.cpu.csrs.reset();
        self.cpu.pc = self.config.dram_base;
        self.cpu.ticks = 0;
        self.cpu.prev_pc = 0;
        self.cpu.last_inst = 0;
        self.halted = None;
        tracing::info!(
            "reset: {} byte image at 0x{:08x}",
            self.image.len(),
            self.config.dram_base
        );
        Ok(())
    }

    /// Execute one instruction.
    ///
    /// A trap dumps the machine state to the UART and halts it for good; every
    /// later call returns the same trap without doing anything.
    pub fn tick(&mut self) -> Result<(), Trap> {
        if let Some(trap) = &self.halted {
            return Err(trap.clone());
        }
        self.step().inspect_err(|trap| self.halt(trap.clone()))
    }

    /// Run up to `n` ticks, stopping at the first trap. Returns the number of
    /// instructions retired.
    pub fn run_batch(&mut self, n: u32) -> Result<u32, Trap> {
        for done in 0..n {
            if let Err(trap) = self.tick() {
                tracing::debug!("batch stopped after {done} of {n} ticks");
                return Err(trap);
            }
        }
        Ok(n)
    }

    /// Run one batch of `config.batch_size` ticks.
    pub fn run_batch_default(&mut self) -> Result<u32, Trap> {
        self.run_batch(self.config.batch_size)
    }

    pub fn halted(&self) -> Option<&Trap> {
        self.halted.as_ref()
    }

    pub fn pc(&self) -> u32 {
        self.cpu.pc
    }

    pub fn ticks(&self) -> u64 {
        self.cpu.ticks
    }

    pub fn reg(&self, idx: u8) -> u32 {
        self.cpu.regs.read(idx)
    }

    pub fn csr(&self, idx: u16) -> u32 {
        self.cpu.csrs.read(idx)
    }

    pub fn uart(&self) -> &crate::device::Uart {
        &self.bus.uart
    }

    pub fn uart_mut(&mut self) -> &mut crate::device::Uart {
        &mut self.bus.uart
    }

    fn step(&mut self) -> Result<(), Trap> {
        self.cpu.ticks += 1;
        let pc = self.cpu.pc;
        self.check_pc(pc)?;
        self.cpu.regs.clear_zero();

        // Fetch
        let inst = self.bus.fetch(pc).with_pc(pc)?;
        self.cpu.prev_pc = pc;
        self.cpu.last_inst = inst;
        self.cpu.pc = pc.wrapping_add(4);

        // Decode
        let decoded = decode::decode(inst).with_pc(pc)?;
        crate::debug::trace(&self.cpu, inst);

        // Execute
        exec::execute(&mut self.cpu, &mut self.bus, decoded, pc)
    }

    /// The whole 4-byte fetch must land inside DRAM.
    fn check_pc(&self, pc: u32) -> Result<(), Trap> {
        if pc == 0 {
            return Err(Trap::NullJump);
        }
        let in_dram = pc
            .checked_sub(self.config.dram_base)
            .is_some_and(|off| off as u64 + 4 <= self.config.dram_size as u64);
        if !in_dram {
            return Err(Trap::AddressOutOfRange { pc });
        }
        Ok(())
    }

    fn halt(&mut self, trap: Trap) {
        tracing::error!(ticks = self.cpu.ticks, "machine halted: {trap}");
        for line in trap.dump(&self.cpu, &self.config) {
            self.bus.uart.push_line(line);
        }
        self.halted = Some(trap);
    }
}
