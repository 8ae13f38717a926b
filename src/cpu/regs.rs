/// The 32 integer registers. `x0` reads as zero and ignores writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u32; 32],
}

impl RegisterFile {
    pub fn read(&self, idx: u8) -> u32 {
        if idx == 0 { 0 } else { self.regs[idx as usize & 0x1f] }
    }

    pub fn write(&mut self, idx: u8, value: u32) {
        if idx != 0 {
            self.regs[idx as usize & 0x1f] = value;
        }
    }

    pub fn reset(&mut self) {
        self.regs = [0; 32];
    }

    /// Pin `x0` back to zero.
    pub fn clear_zero(&mut self) {
        self.regs[0] = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.regs.iter().copied()
    }
}
