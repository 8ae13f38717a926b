use thiserror::Error;

pub const DEFAULT_DRAM_BASE: u32 = 0x8000_0000;
pub const DEFAULT_DRAM_SIZE: u32 = 200_000;
pub const DEFAULT_UART_ADDR: u32 = 0x1000_0000;
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DRAM size must be at least 4 bytes, got {0}")]
    DramTooSmall(u32),
    #[error("DRAM base must not be 0")]
    NullDramBase,
    #[error("DRAM [0x{base:08x}, +0x{size:x}) does not fit in the 32-bit address space")]
    DramOverflow { base: u32, size: u32 },
    #[error("UART address 0x{uart:08x} must lie below DRAM base 0x{base:08x}")]
    UartInDram { uart: u32, base: u32 },
    #[error("batch size must be non-zero")]
    EmptyBatch,
}

/// How `csrrc`/`csrrci` combine the old CSR value with the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrClearMode {
    /// `csr = old & operand`. Default, for compatibility with existing guests.
    #[default]
    Literal,
    /// `csr = old & !operand`, the conventional RV32 meaning.
    Standard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub dram_base: u32,
    pub dram_size: u32,
    pub uart_addr: u32,
    /// Ticks per cooperative batch handed to the driver loop
    pub batch_size: u32,
    pub csrrc_mode: CsrClearMode,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            dram_base: DEFAULT_DRAM_BASE,
            dram_size: DEFAULT_DRAM_SIZE,
            uart_addr: DEFAULT_UART_ADDR,
            batch_size: DEFAULT_BATCH_SIZE,
            csrrc_mode: CsrClearMode::Literal,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dram_size < 4 {
            return Err(ConfigError::DramTooSmall(self.dram_size));
        }
        if self.dram_base == 0 {
            return Err(ConfigError::NullDramBase);
        }
        if self.dram_base.checked_add(self.dram_size).is_none() {
            return Err(ConfigError::DramOverflow {
                base: self.dram_base,
                size: self.dram_size,
            });
        }
        if self.uart_addr >= self.dram_base {
            return Err(ConfigError::UartInDram {
                uart: self.uart_addr,
                base: self.dram_base,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        Ok(())
    }

    /// One past the last DRAM address. Never overflows for a validated config.
    pub fn dram_end(&self) -> u64 {
        self.dram_base as u64 + self.dram_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(MachineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_dram_past_address_space() {
        let config = MachineConfig {
            dram_base: 0xffff_0000,
            dram_size: 0x1_0000,
            ..MachineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DramOverflow { .. })
        ));
    }

    #[test]
    fn rejects_uart_inside_dram() {
        let config = MachineConfig {
            uart_addr: DEFAULT_DRAM_BASE + 16,
            ..MachineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UartInDram { .. })
        ));
    }

    #[test]
    fn rejects_tiny_dram_and_empty_batch() {
        let tiny = MachineConfig {
            dram_size: 3,
            ..MachineConfig::default()
        };
        assert_eq!(tiny.validate(), Err(ConfigError::DramTooSmall(3)));

        let no_batch = MachineConfig {
            batch_size: 0,
            ..MachineConfig::default()
        };
        assert_eq!(no_batch.validate(), Err(ConfigError::EmptyBatch));
    }
}
