//! Builds the byte image that reset copies to the start of DRAM.
//!
//! Accepts either a raw flat binary or a statically linked 32-bit RISC-V ELF.

use crate::config::MachineConfig;
use goblin::elf::{
    Elf,
    header::{self, ELFCLASS32, ELFDATA2LSB, EM_RISCV, ET_DYN, ET_EXEC},
    program_header::PT_LOAD,
};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed ELF: {0}")]
    Elf(#[from] goblin::error::Error),
    #[error("unsupported ELF: {0}")]
    Unsupported(&'static str),
    #[error("segment outside file: off=0x{off:x} size=0x{size:x}")]
    SegmentOutsideFile { off: u64, size: u64 },
    #[error("segment outside DRAM: [0x{start:x},0x{end:x}) not within [0x{base:x},0x{dram_end:x})")]
    SegmentOutsideDram {
        start: u64,
        end: u64,
        base: u64,
        dram_end: u64,
    },
    #[error("image of {len} bytes does not fit in {dram_size} bytes of DRAM")]
    TooLarge { len: usize, dram_size: u32 },
}

pub fn load_image(path: impl AsRef<Path>, config: &MachineConfig) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let image = image_from_bytes(&bytes, config)?;
    tracing::info!("loaded {} ({} bytes)", path.display(), image.len());
    Ok(image)
}

/// Turn file contents into a DRAM image, sniffing for the ELF magic.
pub fn image_from_bytes(bytes: &[u8], config: &MachineConfig) -> Result<Vec<u8>, LoadError> {
    let image = if bytes.starts_with(header::ELFMAG) {
        elf_image(bytes, config)?
    } else {
        bytes.to_vec()
    };
    if image.len() > config.dram_size as usize {
        return Err(LoadError::TooLarge {
            len: image.len(),
            dram_size: config.dram_size,
        });
    }
    Ok(image)
}

fn elf_image(bytes: &[u8], config: &MachineConfig) -> Result<Vec<u8>, LoadError> {
    let elf = Elf::parse(bytes)?;

    // Basic sanity checks so we fail fast on bad inputs
    if elf.header.e_ident[header::EI_CLASS] != ELFCLASS32 {
        return Err(LoadError::Unsupported("expected 32-bit ELF"));
    }
    if elf.header.e_ident[header::EI_DATA] != ELFDATA2LSB {
        return Err(LoadError::Unsupported("expected little-endian ELF"));
    }
    if elf.header.e_machine != EM_RISCV {
        return Err(LoadError::Unsupported("expected RISC-V ELF"));
    }
    if elf.header.e_type != ET_EXEC && elf.header.e_type != ET_DYN {
        return Err(LoadError::Unsupported(
            "unsupported ELF type (want ET_EXEC or ET_DYN)",
        ));
    }
    if elf.entry != config.dram_base as u64 {
        tracing::warn!(
            "ELF entry 0x{:x} ignored, execution starts at 0x{:08x}",
            elf.entry,
            config.dram_base
        );
    }

    let base = config.dram_base as u64;
    let dram_end = config.dram_end();
    let mut image = Vec::new();

    for ph in elf.program_headers.iter().filter(|ph| ph.p_type == PT_LOAD) {
        let file_off = ph.p_offset;
        let file_sz = ph.p_filesz;
        let vaddr = ph.p_vaddr;

        let in_file = file_off
            .checked_add(file_sz)
            .is_some_and(|end| end <= bytes.len() as u64);
        if !in_file {
            return Err(LoadError::SegmentOutsideFile {
                off: file_off,
                size: file_sz,
            });
        }
        if ph.p_memsz < file_sz {
            return Err(LoadError::Unsupported("p_memsz smaller than p_filesz"));
        }

        let seg_end = vaddr.saturating_add(ph.p_memsz);
        if vaddr < base || seg_end > dram_end {
            return Err(LoadError::SegmentOutsideDram {
                start: vaddr,
                end: seg_end,
                base,
                dram_end,
            });
        }

        // Everything past p_filesz up to p_memsz is .bss and stays zero
        let start = (vaddr - base) as usize;
        let end = (seg_end - base) as usize;
        if image.len() < end {
            image.resize(end, 0);
        }
        let seg = &bytes[file_off as usize..(file_off + file_sz) as usize];
        image[start..start + seg.len()].copy_from_slice(seg);
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal ELF32 with a single PT_LOAD segment.
    fn elf32(vaddr: u32, code: &[u8], memsz: u32) -> Vec<u8> {
        let mut out = Vec::new();
        // e_ident
        out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&2u16.to_le_bytes()); // e_type = ET_EXEC
        out.extend_from_slice(&243u16.to_le_bytes()); // e_machine = EM_RISCV
        out.extend_from_slice(&1u32.to_le_bytes()); // e_version
        out.extend_from_slice(&vaddr.to_le_bytes()); // e_entry
        out.extend_from_slice(&52u32.to_le_bytes()); // e_phoff
        out.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
        out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        out.extend_from_slice(&52u16.to_le_bytes()); // e_ehsize
        out.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
        out.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
        out.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
        out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        out.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
        // program header
        out.extend_from_slice(&1u32.to_le_bytes()); // p_type = PT_LOAD
        out.extend_from_slice(&84u32.to_le_bytes()); // p_offset
        out.extend_from_slice(&vaddr.to_le_bytes()); // p_vaddr
        out.extend_from_slice(&vaddr.to_le_bytes()); // p_paddr
        out.extend_from_slice(&(code.len() as u32).to_le_bytes()); // p_filesz
        out.extend_from_slice(&memsz.to_le_bytes()); // p_memsz
        out.extend_from_slice(&5u32.to_le_bytes()); // p_flags = R|X
        out.extend_from_slice(&4u32.to_le_bytes()); // p_align
        out.extend_from_slice(code);
        out
    }

    #[test]
    fn flat_binary_is_copied_verbatim() {
        let image = image_from_bytes(&[0x13, 0x05, 0x10, 0x00], &MachineConfig::default()).unwrap();
        assert_eq!(image, [0x13, 0x05, 0x10, 0x00]);
    }

    #[test]
    fn elf_segment_lands_at_its_dram_offset() {
        let elf = elf32(0x8000_0008, &[1, 2, 3, 4], 8);
        let image = image_from_bytes(&elf, &MachineConfig::default()).unwrap();
        assert_eq!(image, [0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn elf_segment_below_dram_is_rejected() {
        let elf = elf32(0x1000, &[1, 2, 3, 4], 4);
        assert!(matches!(
            image_from_bytes(&elf, &MachineConfig::default()),
            Err(LoadError::SegmentOutsideDram { .. })
        ));
    }

    #[test]
    fn oversized_flat_binary_is_rejected() {
        let config = MachineConfig {
            dram_size: 4,
            ..MachineConfig::default()
        };
        assert!(matches!(
            image_from_bytes(&[0; 5], &config),
            Err(LoadError::TooLarge { len: 5, .. })
        ));
    }
}
