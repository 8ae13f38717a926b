use crate::config::MachineConfig;
use crate::device::Uart;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    #[error("address out of range: 0x{0:08x}")]
    Oob(u32),
}

impl MemError {
    pub fn addr(&self) -> u32 {
        match self {
            MemError::Oob(addr) => *addr,
        }
    }
}

/// Byte-addressable DRAM mapped at `base`.
pub struct Dram {
    data: Vec<u8>,
    pub base: u32,
}

impl Dram {
    pub fn new(base: u32, bytes: usize) -> Self {
        Self {
            data: vec![0; bytes],
            base,
        }
    }

    fn check_oob(&self, addr: u32, size: usize) -> Result<usize, MemError> {
        let a = addr.checked_sub(self.base).ok_or(MemError::Oob(addr))? as usize;
        let end = a.checked_add(size).ok_or(MemError::Oob(addr))?;
        if end > self.data.len() {
            return Err(MemError::Oob(addr));
        }
        Ok(a)
    }

    pub fn read_u8(&self, addr: u32) -> Result<u8, MemError> {
        let off = self.check_oob(addr, 1)?;
        Ok(self.data[off])
    }

    pub fn read_u16(&self, addr: u32) -> Result<u16, MemError> {
        let off = self.check_oob(addr, 2)?;
        let b = &self.data[off..off + 2];
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, MemError> {
        // Misaligned accesses are fine, only the range is checked
        let off = self.check_oob(addr, 4)?;
        let b = &self.data[off..off + 4];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn write_u8(&mut self, addr: u32, v: u8) -> Result<(), MemError> {
        let off = self.check_oob(addr, 1)?;
        self.data[off] = v;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u32, v: u16) -> Result<(), MemError> {
        let off = self.check_oob(addr, 2)?;
        self.data[off..off + 2].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u32, v: u32) -> Result<(), MemError> {
        let off = self.check_oob(addr, 4)?;
        self.data[off..off + 4].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Zero all of DRAM, then copy `image` in at offset 0.
    pub fn reload(&mut self, image: &[u8]) -> Result<(), MemError> {
        self.data.fill(0);
        if image.len() > self.data.len() {
            return Err(MemError::Oob(self.base.wrapping_add(self.data.len() as u32)));
        }
        self.data[..image.len()].copy_from_slice(image);
        Ok(())
    }
}

/// Routes loads and stores to DRAM or to the device region below it.
pub struct Bus {
    pub dram: Dram,
    pub uart: Uart,
}

impl Bus {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            dram: Dram::new(config.dram_base, config.dram_size as usize),
            uart: Uart::new(config.uart_addr),
        }
    }

    fn is_device(&self, addr: u32) -> bool {
        addr < self.dram.base
    }

    /// Instruction fetch. Always goes to DRAM, never to a device.
    pub fn fetch(&self, pc: u32) -> Result<u32, MemError> {
        self.dram.read_u32(pc)
    }

    pub fn load8(&mut self, addr: u32) -> Result<u8, MemError> {
        if self.is_device(addr) {
            Ok(self.uart.load8(addr))
        } else {
            self.dram.read_u8(addr)
        }
    }

    pub fn load16(&mut self, addr: u32) -> Result<u16, MemError> {
        if self.is_device(addr) {
            let lo = self.uart.load8(addr) as u16;
            let hi = self.uart.load8(addr.wrapping_add(1)) as u16;
            Ok(lo | (hi << 8))
        } else {
            self.dram.read_u16(addr)
        }
    }

    pub fn load32(&mut self, addr: u32) -> Result<u32, MemError> {
        if self.is_device(addr) {
            let mut value = 0u32;
            for i in 0..4 {
                value |= (self.uart.load8(addr.wrapping_add(i)) as u32) << (8 * i);
            }
            Ok(value)
        } else {
            self.dram.read_u32(addr)
        }
    }

    pub fn store8(&mut self, addr: u32, value: u8) -> Result<(), MemError> {
        if self.is_device(addr) {
            self.uart.store8(addr, value);
            Ok(())
        } else {
            self.dram.write_u8(addr, value)
        }
    }

    pub fn store16(&mut self, addr: u32, value: u16) -> Result<(), MemError> {
        if self.is_device(addr) {
            for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
                self.uart.store8(addr.wrapping_add(i as u32), byte);
            }
            Ok(())
        } else {
            self.dram.write_u16(addr, value)
        }
    }

    pub fn store32(&mut self, addr: u32, value: u32) -> Result<(), MemError> {
        if self.is_device(addr) {
            for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
                self.uart.store8(addr.wrapping_add(i as u32), byte);
            }
            Ok(())
        } else {
            self.dram.write_u32(addr, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> Bus {
        Bus::new(&MachineConfig {
            dram_size: 64,
            ..MachineConfig::default()
        })
    }

    #[test]
    fn word_store_is_little_endian() {
        let mut bus = bus();
        bus.store32(0x8000_0000, 0x1234_5678).unwrap();
        assert_eq!(bus.load8(0x8000_0000).unwrap(), 0x78);
        assert_eq!(bus.load8(0x8000_0003).unwrap(), 0x12);
        assert_eq!(bus.load16(0x8000_0001).unwrap(), 0x3456);
        assert_eq!(bus.fetch(0x8000_0000).unwrap(), 0x1234_5678);
    }

    #[test]
    fn dram_rejects_accesses_past_the_end() {
        let mut bus = bus();
        assert_eq!(bus.load32(0x8000_003c).unwrap(), 0);
        assert_eq!(bus.load32(0x8000_003e), Err(MemError::Oob(0x8000_003e)));
        assert_eq!(bus.store8(0x8000_0040, 1), Err(MemError::Oob(0x8000_0040)));
        assert_eq!(bus.fetch(0x8000_0040), Err(MemError::Oob(0x8000_0040)));
    }

    #[test]
    fn low_addresses_route_to_the_uart() {
        let mut bus = bus();
        bus.store8(0x1000_0000, b'O').unwrap();
        bus.store8(0x1000_0000, b'K').unwrap();
        bus.store8(0x1000_0000, b'\n').unwrap();
        assert_eq!(bus.uart.lines(), ["OK", ""]);
        // DRAM is untouched by device stores
        assert_eq!(bus.load32(0x8000_0000).unwrap(), 0);
    }

    #[test]
    fn device_word_store_writes_each_byte_in_order() {
        let mut bus = bus();
        // Only the lowest byte hits the UART address itself
        bus.store32(0x1000_0000, 0x4443_4241).unwrap();
        assert_eq!(bus.uart.lines(), ["A"]);
        // Writing one byte below shifts the second byte onto the UART
        bus.store16(0x0fff_ffff, 0x4241).unwrap();
        assert_eq!(bus.uart.lines(), ["AB"]);
    }

    #[test]
    fn device_loads_read_queued_input() {
        let mut bus = bus();
        bus.uart.push_input(b"hi");
        assert_eq!(bus.load8(0x1000_0000).unwrap(), b'h');
        assert_eq!(bus.load8(0x0000_1234).unwrap(), 0);
        assert_eq!(bus.load8(0x1000_0000).unwrap(), b'i');
        assert_eq!(bus.load8(0x1000_0000).unwrap(), 0);
    }

    #[test]
    fn reload_zero_fills_before_copying() {
        let mut bus = bus();
        bus.store32(0x8000_0010, 0xdead_beef).unwrap();
        bus.dram.reload(&[1, 2, 3]).unwrap();
        assert_eq!(bus.load32(0x8000_0000).unwrap(), 0x0003_0201);
        assert_eq!(bus.load32(0x8000_0010).unwrap(), 0);
        assert!(bus.dram.reload(&[0; 65]).is_err());
    }
}
