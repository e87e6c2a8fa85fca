//! Mini-ELF container parsing and segment loading.
//!
//! A Mini-ELF file starts with a 16-byte little-endian header, followed (at
//! `phdr_start`) by an array of 20-byte program headers. Each program header
//! names a byte range of the file and the virtual address it loads at.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use y86_core::{ProgramHeader, SegmentFlags, SegmentType, MEMSIZE};

use crate::errors::ElfError;

/// Magic number closing the file header (`"ELF\0"` little-endian).
pub const ELF_MAGIC: u32 = 0x0046_4C45;
/// Magic number closing every program header.
pub const PHDR_MAGIC: u32 = 0xDEAD_BEEF;
/// Encoded size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;
/// Encoded size of one program header in bytes.
pub const PHDR_SIZE: usize = 20;

/// Mini-ELF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// Format version.
    pub version: u16,
    /// Entry-point address.
    pub entry: u16,
    /// File offset of the first program header.
    pub phdr_start: u16,
    /// Number of program headers.
    pub num_phdr: u16,
    /// File offset of the symbol table, or 0 when absent.
    pub symtab: u16,
    /// File offset of the string table, or 0 when absent.
    pub strtab: u16,
    /// Magic number.
    pub magic: u32,
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl ElfHeader {
    /// Parses and validates the header at the start of `file`.
    ///
    /// # Errors
    ///
    /// Fails on inputs shorter than [`HEADER_SIZE`] or with a bad magic number.
    pub fn parse(file: &[u8]) -> Result<Self, ElfError> {
        let bytes = file
            .get(..HEADER_SIZE)
            .ok_or(ElfError::TruncatedHeader { len: file.len() })?;
        let header = Self {
            version: u16_at(bytes, 0),
            entry: u16_at(bytes, 2),
            phdr_start: u16_at(bytes, 4),
            num_phdr: u16_at(bytes, 6),
            symtab: u16_at(bytes, 8),
            strtab: u16_at(bytes, 10),
            magic: u32_at(bytes, 12),
        };
        if header.magic != ELF_MAGIC {
            return Err(ElfError::BadMagic {
                found: header.magic,
            });
        }
        Ok(header)
    }

    /// Re-encodes the header in its on-disk layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        for (at, field) in [
            self.version,
            self.entry,
            self.phdr_start,
            self.num_phdr,
            self.symtab,
            self.strtab,
        ]
        .into_iter()
        .enumerate()
        {
            bytes[at * 2..at * 2 + 2].copy_from_slice(&field.to_le_bytes());
        }
        bytes[12..].copy_from_slice(&self.magic.to_le_bytes());
        bytes
    }
}

/// Parses program header `index` from `file`.
///
/// # Errors
///
/// Fails when the header would be read from offset zero, runs past the end
/// of `file`, or carries a bad magic number.
pub fn parse_program_header(
    file: &[u8],
    header: &ElfHeader,
    index: usize,
) -> Result<ProgramHeader, ElfError> {
    let offset = usize::from(header.phdr_start) + index * PHDR_SIZE;
    if offset == 0 {
        return Err(ElfError::ZeroProgramHeaderOffset { index });
    }
    let bytes = file
        .get(offset..offset + PHDR_SIZE)
        .ok_or(ElfError::TruncatedProgramHeader { index, offset })?;
    let magic = u32_at(bytes, 16);
    if magic != PHDR_MAGIC {
        return Err(ElfError::BadProgramHeaderMagic {
            index,
            found: magic,
        });
    }
    Ok(ProgramHeader {
        offset: u32_at(bytes, 0),
        size: u32_at(bytes, 4),
        vaddr: u32_at(bytes, 8),
        segment_type: SegmentType::from_u16(u16_at(bytes, 12)),
        flags: SegmentFlags(u16_at(bytes, 14)),
    })
}

/// Copies the segment described by `phdr` from `file` into `memory`.
///
/// # Errors
///
/// Fails when the segment bytes run past the end of `file` or the segment
/// does not fit inside `memory`.
pub fn load_segment(
    file: &[u8],
    memory: &mut [u8],
    phdr: &ProgramHeader,
    index: usize,
) -> Result<(), ElfError> {
    let out_of_bounds = || ElfError::SegmentOutOfBounds {
        index,
        vaddr: phdr.vaddr,
        size: phdr.size,
    };
    let vaddr = usize::try_from(phdr.vaddr).map_err(|_| out_of_bounds())?;
    let size = usize::try_from(phdr.size).map_err(|_| out_of_bounds())?;
    if vaddr > MEMSIZE || vaddr.saturating_add(size) > memory.len() {
        return Err(out_of_bounds());
    }
    if size == 0 {
        return Ok(());
    }

    let offset = usize::try_from(phdr.offset).unwrap_or(usize::MAX);
    let source = offset
        .checked_add(size)
        .and_then(|end| file.get(offset..end))
        .ok_or(ElfError::SegmentOutOfFile {
            index,
            offset: phdr.offset,
            size: phdr.size,
        })?;
    memory[vaddr..vaddr + size].copy_from_slice(source);
    debug!(index, vaddr, size, kind = ?phdr.segment_type, "loaded segment");
    Ok(())
}

/// A parsed Mini-ELF image with its segments loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniElf {
    /// File header.
    pub header: ElfHeader,
    /// Program headers in file order.
    pub phdrs: Vec<ProgramHeader>,
    /// Simulated address space with every segment loaded.
    pub memory: Box<[u8]>,
}

impl MiniElf {
    /// Parses `file` and loads every segment into a fresh address space.
    ///
    /// Later segments overwrite earlier ones where they overlap.
    ///
    /// # Errors
    ///
    /// Returns the first header, program header, or segment error.
    pub fn from_bytes(file: &[u8]) -> Result<Self, ElfError> {
        let header = ElfHeader::parse(file)?;
        let phdrs = (0..usize::from(header.num_phdr))
            .map(|index| parse_program_header(file, &header, index))
            .collect::<Result<Vec<_>, _>>()?;
        let mut memory = y86_core::new_address_space();
        for (index, phdr) in phdrs.iter().enumerate() {
            load_segment(file, &mut memory, phdr, index)?;
        }
        Ok(Self {
            header,
            phdrs,
            memory,
        })
    }

    /// Reads and loads the Mini-ELF file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] when the file cannot be read, or any error
    /// from [`MiniElf::from_bytes`].
    pub fn open(path: &Path) -> Result<Self, ElfError> {
        fs::read(path)
            .map_err(|source| ElfError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|file| Self::from_bytes(&file))
            .inspect_err(|error| {
                warn!(path = %path.display(), %error, "rejected Mini-ELF input");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{load_segment, ElfHeader, MiniElf, ELF_MAGIC, HEADER_SIZE, PHDR_MAGIC};
    use crate::errors::ElfError;
    use y86_core::{new_address_space, ProgramHeader, SegmentFlags, SegmentType, MEMSIZE};

    fn header_bytes(entry: u16, phdr_start: u16, num_phdr: u16) -> Vec<u8> {
        ElfHeader {
            version: 1,
            entry,
            phdr_start,
            num_phdr,
            symtab: 0,
            strtab: 0,
            magic: ELF_MAGIC,
        }
        .to_bytes()
        .to_vec()
    }

    fn phdr_bytes(offset: u32, size: u32, vaddr: u32, kind: u16, flags: u16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(20);
        bytes.extend_from_slice(&offset.to_le_bytes());
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&vaddr.to_le_bytes());
        bytes.extend_from_slice(&kind.to_le_bytes());
        bytes.extend_from_slice(&flags.to_le_bytes());
        bytes.extend_from_slice(&PHDR_MAGIC.to_le_bytes());
        bytes
    }

    #[test]
    fn header_parses_little_endian_fields() {
        let bytes = [
            0x01, 0x00, 0x00, 0x01, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x45, 0x4C,
            0x46, 0x00,
        ];
        let header = ElfHeader::parse(&bytes).expect("valid header");
        assert_eq!(header.version, 1);
        assert_eq!(header.entry, 0x100);
        assert_eq!(header.phdr_start, 0x10);
        assert_eq!(header.num_phdr, 2);
        assert_eq!(header.to_bytes(), bytes);
    }

    #[test]
    fn header_rejects_bad_magic_and_short_input() {
        let mut bytes = header_bytes(0, 16, 0);
        bytes[15] = 0x01;
        assert!(matches!(
            ElfHeader::parse(&bytes),
            Err(ElfError::BadMagic { found: 0x0146_4C45 })
        ));
        assert!(matches!(
            ElfHeader::parse(&bytes[..HEADER_SIZE - 1]),
            Err(ElfError::TruncatedHeader { len: 15 })
        ));
    }

    #[test]
    fn image_loads_segments_at_virtual_addresses() {
        let mut file = header_bytes(0x100, 16, 2);
        file.extend(phdr_bytes(56, 2, 0x100, 1, 5));
        file.extend(phdr_bytes(58, 3, 0x200, 0, 4));
        file.extend([0x10, 0x00, b'h', b'i', 0]);

        let image = MiniElf::from_bytes(&file).expect("valid image");
        assert_eq!(image.phdrs.len(), 2);
        assert_eq!(image.phdrs[0].segment_type, SegmentType::Code);
        assert_eq!(image.phdrs[1].flags, SegmentFlags(4));
        assert_eq!(&image.memory[0x100..0x102], &[0x10, 0x00]);
        assert_eq!(&image.memory[0x200..0x203], b"hi\0");
        assert_eq!(image.memory.len(), MEMSIZE);
    }

    #[test]
    fn program_header_errors_are_specific() {
        let mut file = header_bytes(0, 0, 1);
        file.extend(phdr_bytes(0, 0, 0, 0, 0));
        assert!(matches!(
            MiniElf::from_bytes(&file),
            Err(ElfError::ZeroProgramHeaderOffset { index: 0 })
        ));

        let mut file = header_bytes(0, 16, 1);
        let mut phdr = phdr_bytes(36, 0, 0, 0, 0);
        phdr[16] = 0;
        file.extend(phdr);
        assert!(matches!(
            MiniElf::from_bytes(&file),
            Err(ElfError::BadProgramHeaderMagic { index: 0, .. })
        ));

        let file = header_bytes(0, 16, 1);
        assert!(matches!(
            MiniElf::from_bytes(&file),
            Err(ElfError::TruncatedProgramHeader {
                index: 0,
                offset: 16
            })
        ));
    }

    #[test]
    fn segments_must_fit_file_and_memory() {
        let mut memory = new_address_space();
        let file = vec![0u8; 40];
        let phdr = ProgramHeader {
            offset: 36,
            size: 8,
            vaddr: 0,
            segment_type: SegmentType::Data,
            flags: SegmentFlags(6),
        };
        assert!(matches!(
            load_segment(&file, &mut memory, &phdr, 3),
            Err(ElfError::SegmentOutOfFile { index: 3, .. })
        ));

        let phdr = ProgramHeader {
            offset: 0,
            size: 8,
            vaddr: (MEMSIZE - 4) as u32,
            ..phdr
        };
        assert!(matches!(
            load_segment(&file, &mut memory, &phdr, 1),
            Err(ElfError::SegmentOutOfBounds { index: 1, .. })
        ));

        let empty_at_end = ProgramHeader {
            size: 0,
            vaddr: MEMSIZE as u32,
            ..phdr
        };
        assert!(load_segment(&file, &mut memory, &empty_at_end, 0).is_ok());
    }
}
