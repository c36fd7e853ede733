use std::{
    ffi::OsStr,
    fmt, fs,
    path::{Component, Path},
};

use super::{DfsError, DfsResult};
use crate::file_info::{save_file_info, FileInfo};

pub const BYTES_PER_SECTOR: usize = 256;
pub const SECTORS_PER_TRACK: usize = 10;
pub const MIN_TRACKS: usize = 40;
pub const MAX_TRACKS: usize = 80;
pub const MIN_DISK_SIZE: usize = BYTES_PER_SECTOR * SECTORS_PER_TRACK * MIN_TRACKS;
pub const MAX_FILES: usize = 31;

const TRACK_SIZE: usize = BYTES_PER_SECTOR * SECTORS_PER_TRACK;
const CATALOGUE_SIZE: usize = 2 * BYTES_PER_SECTOR;
const ENTRY_SIZE: usize = 8;
const ROOT_DIR: char = '$';

// Sector 1, byte 6 of every entry holds the top bits of four fields.
const LOAD_HIGH_MASK: u8 = 0b0000_1100;
const LOAD_HIGH_SHIFT: u32 = 14;
const EXEC_HIGH_MASK: u8 = 0b1100_0000;
const EXEC_HIGH_SHIFT: u32 = 10;
const LENGTH_HIGH_MASK: u8 = 0b0011_0000;
const LENGTH_HIGH_SHIFT: u32 = 12;
const START_HIGH_MASK: u8 = 0b0000_0011;
const START_HIGH_SHIFT: u32 = 8;

const LOCKED_FLAG: u8 = 0b1000_0000;
const DIR_CHAR_MASK: u8 = 0b0111_1111;

const BOOT_OPTION_MASK: u8 = 0b1111_0000;
const SECTOR_COUNT_HIGH_MASK: u8 = 0b0000_1111;
const FILE_COUNT_SHIFT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootOption {
    #[default]
    None = 0,
    Load = 1,
    Run = 2,
    Exec = 3,
}

impl TryFrom<u8> for BootOption {
    type Error = DfsError;

    fn try_from(value: u8) -> DfsResult<Self> {
        match value {
            0 => Ok(BootOption::None),
            1 => Ok(BootOption::Load),
            2 => Ok(BootOption::Run),
            3 => Ok(BootOption::Exec),
            _ => Err(DfsError::InvalidBootOption(value)),
        }
    }
}

pub fn bcd_to_number(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

fn u16_le(buffer: &[u8], offset: usize) -> u32 {
    u16::from_le_bytes([buffer[offset], buffer[offset + 1]]) as u32
}

/// Combines a 16 bit little-endian field with the high bits stored in the shared byte.
pub fn packed_field(low: u32, mixed: u8, mask: u8, shift: u32) -> u32 {
    low | ((mixed & mask) as u32) << shift
}

fn catalogue_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b == 0 { ' ' } else { b as char })
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
struct CatalogueHeader {
    title: String,
    cycle_num: u8,
    boot_option: BootOption,
    num_files: usize,
    num_sectors: usize,
    num_tracks: usize,
}

impl CatalogueHeader {
    fn parse(buffer: &[u8]) -> DfsResult<Self> {
        if buffer.len() < MIN_DISK_SIZE {
            return Err(DfsError::Truncated {
                expected: MIN_DISK_SIZE,
                actual: buffer.len(),
            });
        }
        let sector0 = &buffer[0..ENTRY_SIZE];
        let sector1 = &buffer[BYTES_PER_SECTOR..BYTES_PER_SECTOR + ENTRY_SIZE];

        let title = catalogue_text(sector0) + &catalogue_text(&sector1[0..4]);
        let cycle_num = bcd_to_number(sector1[4]);
        let num_files = (sector1[5] >> FILE_COUNT_SHIFT) as usize;
        let boot_nibble = (sector1[6] & BOOT_OPTION_MASK) >> 4;
        let num_sectors = ((sector1[6] & SECTOR_COUNT_HIGH_MASK) as usize) << 8 | sector1[7] as usize;

        if num_sectors != MIN_TRACKS * SECTORS_PER_TRACK && num_sectors != MAX_TRACKS * SECTORS_PER_TRACK {
            return Err(DfsError::InvalidTrackCount {
                tracks: num_sectors as f64 / SECTORS_PER_TRACK as f64,
            });
        }
        let boot_option = BootOption::try_from(boot_nibble)?;

        Ok(Self {
            title,
            cycle_num,
            boot_option,
            num_files,
            num_sectors,
            num_tracks: num_sectors / SECTORS_PER_TRACK,
        })
    }
}

/// One catalogue slot: the name half from sector 0 and the address half from sector 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub name: String,
    pub dir: char,
    pub is_locked: bool,
    pub load_address: u32,
    pub execution_address: u32,
    pub length: u32,
    pub start_sector: u16,
}

impl CatalogueEntry {
    /// `buffer` must hold at least the two catalogue sectors and `index` must be below [`MAX_FILES`].
    pub(crate) fn parse(buffer: &[u8], index: usize) -> Self {
        let sector0_offset = (index + 1) * ENTRY_SIZE;
        let name_part = &buffer[sector0_offset..sector0_offset + ENTRY_SIZE];
        let sector1_offset = sector0_offset + BYTES_PER_SECTOR;
        let addr_part = &buffer[sector1_offset..sector1_offset + ENTRY_SIZE];

        let mixed = addr_part[6];
        Self {
            name: String::from_utf8_lossy(&name_part[0..7]).trim().to_string(),
            dir: (name_part[7] & DIR_CHAR_MASK) as char,
            is_locked: name_part[7] & LOCKED_FLAG != 0,
            load_address: packed_field(u16_le(addr_part, 0), mixed, LOAD_HIGH_MASK, LOAD_HIGH_SHIFT),
            execution_address: packed_field(u16_le(addr_part, 2), mixed, EXEC_HIGH_MASK, EXEC_HIGH_SHIFT),
            length: packed_field(u16_le(addr_part, 4), mixed, LENGTH_HIGH_MASK, LENGTH_HIGH_SHIFT),
            start_sector: packed_field(addr_part[7] as u32, mixed, START_HIGH_MASK, START_HIGH_SHIFT) as u16,
        }
    }
}

impl fmt::Display for CatalogueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:<7} {:08X} {:08X} {:>8} {} {}",
            self.dir,
            self.name,
            self.load_address,
            self.execution_address,
            self.length,
            if self.is_locked { "L/" } else { " /" },
            self.start_sector
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub dir: char,
    pub is_locked: bool,
    pub load_address: u32,
    pub execution_address: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DfsDiskSide {
    pub title: String,
    pub cycle_num: u8,
    pub boot_option: BootOption,
    files: Vec<File>,
}

impl DfsDiskSide {
    pub fn new(title: impl Into<String>, cycle_num: u8) -> Self {
        Self {
            title: title.into(),
            cycle_num,
            ..Default::default()
        }
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn add_file(&mut self, file: File) -> DfsResult<()> {
        if self.files.len() >= MAX_FILES {
            return Err(DfsError::TooManyFiles);
        }
        self.files.push(file);
        Ok(())
    }

    /// Writes every file below `directory_path` together with a `.inf` sidecar.
    /// Files outside `$` go into a subdirectory named after their directory letter.
    ///
    /// Nothing is written if any entry's name or directory letter would leave `directory_path`.
    pub fn extract_files(&self, directory_path: &Path) -> DfsResult<()> {
        for file in &self.files {
            check_plain_name(file, &file.name)?;
            if file.dir != ROOT_DIR {
                check_plain_name(file, &file.dir.to_string())?;
            }
        }
        for file in &self.files {
            let file_path = if file.dir == ROOT_DIR {
                directory_path.join(&file.name)
            } else {
                let dir_path = directory_path.join(file.dir.to_string());
                fs::create_dir_all(&dir_path)?;
                dir_path.join(&file.name)
            };
            fs::write(&file_path, &file.data)?;
            save_file_info(&file_path, &FileInfo::new(file.name.clone(), file.load_address, file.execution_address))?;
            log::debug!("extracted {}.{} ({} bytes)", file.dir, file.name, file.data.len());
        }
        Ok(())
    }
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == OsStr::new(name)
    )
}

fn check_plain_name(file: &File, name: &str) -> DfsResult<()> {
    if is_plain_name(name) {
        Ok(())
    } else {
        Err(DfsError::UnsafeFileName {
            entry: format!("{}.{}", file.dir, file.name),
            name: name.to_string(),
        })
    }
}

pub fn parse_single_sided_disk_image(buffer: &[u8]) -> DfsResult<DfsDiskSide> {
    let header = CatalogueHeader::parse(buffer)?;
    let mut side = DfsDiskSide::new(header.title, header.cycle_num);
    side.boot_option = header.boot_option;

    for index in 0..header.num_files.min(MAX_FILES) {
        let entry = CatalogueEntry::parse(&buffer[..CATALOGUE_SIZE], index);
        log::trace!("{entry}");
        let start_sector = entry.start_sector as usize;
        if start_sector < 2 || start_sector > header.num_sectors {
            return Err(DfsError::InvalidStartSector {
                start_sector: entry.start_sector,
                index,
                name: entry.name,
            });
        }

        let file_offset = start_sector * BYTES_PER_SECTOR;
        let mut file_end = file_offset + entry.length as usize;
        if file_end > buffer.len() {
            log::warn!(
                "{}.{} extends past the end of the image ({file_end} > {}), truncating",
                entry.dir,
                entry.name,
                buffer.len()
            );
            file_end = buffer.len();
        }
        let data = buffer.get(file_offset..file_end).unwrap_or_default().to_vec();

        side.add_file(File {
            name: entry.name,
            dir: entry.dir,
            is_locked: entry.is_locked,
            load_address: entry.load_address,
            execution_address: entry.execution_address,
            data,
        })?;
    }
    Ok(side)
}

/// Splits a track-interleaved image (even tracks side 0, odd tracks side 1) and parses both sides.
pub fn parse_double_sided_disk_image(buffer: &[u8]) -> DfsResult<[DfsDiskSide; 2]> {
    let header = CatalogueHeader::parse(buffer)?;
    let expected = TRACK_SIZE * header.num_tracks * 2;
    if buffer.len() != expected {
        return Err(DfsError::DoubleSidedLength {
            expected,
            actual: buffer.len(),
        });
    }

    let mut sides = [Vec::with_capacity(expected / 2), Vec::with_capacity(expected / 2)];
    for (track_num, track) in buffer.chunks(TRACK_SIZE).enumerate() {
        sides[track_num % 2].extend_from_slice(track);
    }
    let [side0, side1] = sides;
    Ok([parse_single_sided_disk_image(&side0)?, parse_single_sided_disk_image(&side1)?])
}

pub fn parse_disk_image(buffer: &[u8], double_sided: bool) -> DfsResult<Vec<DfsDiskSide>> {
    if double_sided {
        Ok(parse_double_sided_disk_image(buffer)?.into())
    } else {
        Ok(vec![parse_single_sided_disk_image(buffer)?])
    }
}
