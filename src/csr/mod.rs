use crate::config::CsrClearMode;

pub const CSR_COUNT: usize = 4096;

/// Read-modify-write flavors of the Zicsr instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrOp {
    /// csrrw / csrrwi
    Write,
    /// csrrs / csrrsi
    Set,
    /// csrrc / csrrci
    Clear,
}

/// Flat bank of 4096 CSRs. No register is read-only and none has side effects.
pub struct CsrFile {
    regs: Box<[u32; CSR_COUNT]>,
    clear_mode: CsrClearMode,
}

impl Default for CsrFile {
    fn default() -> Self {
        Self::new(CsrClearMode::default())
    }
}

impl CsrFile {
    pub fn new(clear_mode: CsrClearMode) -> Self {
        Self {
            regs: Box::new([0; CSR_COUNT]),
            clear_mode,
        }
    }

    pub fn reset(&mut self) {
        self.regs.fill(0);
    }

    /// Only the low 12 bits of `csr` select a register.
    pub fn read(&self, csr: u16) -> u32 {
        self.regs[csr as usize & (CSR_COUNT - 1)]
    }

    pub fn write(&mut self, csr: u16, value: u32) {
        self.regs[csr as usize & (CSR_COUNT - 1)] = value;
    }

    /// Apply `op` with `operand` and return the value the CSR held before.
    pub fn modify(&mut self, op: CsrOp, csr: u16, operand: u32) -> u32 {
        let old = self.read(csr);
        let new = match op {
            CsrOp::Write => operand,
            CsrOp::Set => old | operand,
            CsrOp::Clear => match self.clear_mode {
                CsrClearMode::Literal => old & operand,
                CsrClearMode::Standard => old & !operand,
            },
        };
        self.write(csr, new);
        old
    }
}
