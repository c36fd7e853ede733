//! Load/execution addresses kept next to files on the local filesystem,
//! either as a `.inf` sidecar or embedded in the filename (`NAME,LLLLLLLL,EEEEEEEE`).
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;

pub const BASIC_LOAD_ADDR: u32 = 0xFFFF_0E00;
pub const BASIC_EXEC_ADDR: u32 = 0xFFFF_2B80;

lazy_static! {
    static ref LOAD_EXEC_FILENAME: Regex = Regex::new(r"^(.+),([0-9A-Fa-f]{8}),([0-9A-Fa-f]{8})$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub original_filename: String,
    pub load_addr: u32,
    pub exec_addr: u32,
}

impl FileInfo {
    pub fn new(original_filename: impl Into<String>, load_addr: u32, exec_addr: u32) -> Self {
        Self {
            original_filename: original_filename.into(),
            load_addr,
            exec_addr,
        }
    }

    /// Metadata assumed for files that carry none: a BASIC program.
    pub fn basic_default(original_filename: impl Into<String>) -> Self {
        Self::new(original_filename, BASIC_LOAD_ADDR, BASIC_EXEC_ADDR)
    }

    /// `NAME,LLLLLLLL,EEEEEEEE`
    pub fn to_filename_suffix(&self) -> String {
        format!("{},{:08X},{:08X}", self.original_filename, self.load_addr, self.exec_addr)
    }

    /// Returns `None` unless `filename` has the `NAME,LLLLLLLL,EEEEEEEE` shape.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let caps = LOAD_EXEC_FILENAME.captures(filename)?;
        Some(Self {
            original_filename: caps[1].to_string(),
            load_addr: u32::from_str_radix(&caps[2], 16).ok()?,
            exec_addr: u32::from_str_radix(&caps[3], 16).ok()?,
        })
    }

    fn to_inf_line(&self) -> String {
        format!("{:<10} {:08X} {:08X}\n", self.original_filename, self.load_addr, self.exec_addr)
    }

    fn parse_inf(content: &str) -> Option<Self> {
        let mut fields = content.split_whitespace();
        let original_filename = fields.next()?.to_string();
        let load_addr = u32::from_str_radix(fields.next()?, 16).ok()?;
        let exec_addr = u32::from_str_radix(fields.next()?, 16).ok()?;
        Some(Self {
            original_filename,
            load_addr,
            exec_addr,
        })
    }
}

pub fn is_load_exec_filename(filename: &str) -> bool {
    LOAD_EXEC_FILENAME.is_match(filename)
}

pub fn inf_path(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    file_name.push(".inf");
    path.with_file_name(file_name)
}

/// Writes `<path>.inf`.
pub fn save_file_info(path: &Path, info: &FileInfo) -> io::Result<()> {
    fs::write(inf_path(path), info.to_inf_line())
}

/// Reads `<path>.inf`; `Ok(None)` when there is no sidecar.
pub fn load_file_info(path: &Path) -> io::Result<Option<FileInfo>> {
    let inf = inf_path(path);
    if !inf.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&inf)?;
    match FileInfo::parse_inf(&content) {
        Some(info) => Ok(Some(info)),
        None => Err(io::Error::new(io::ErrorKind::InvalidData, format!("malformed metadata in {}", inf.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inf_line_format() {
        let info = FileInfo::new("!BOOT", 0x3FFFF, 0x3FFFF);
        assert_eq!("!BOOT      0003FFFF 0003FFFF\n", info.to_inf_line());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MYFILE");
        assert_eq!(None, load_file_info(&path).unwrap());

        let info = FileInfo::new("MYFILE", 0xFFFF1900, 0xFFFF8023);
        save_file_info(&path, &info).unwrap();
        assert!(dir.path().join("MYFILE.inf").exists());
        assert_eq!(Some(info), load_file_info(&path).unwrap());
    }

    #[test]
    fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BROKEN");
        fs::write(dir.path().join("BROKEN.inf"), "BROKEN nothex").unwrap();
        let err = load_file_info(&path).unwrap_err();
        assert_eq!(io::ErrorKind::InvalidData, err.kind());
    }

    #[test]
    fn test_filename_suffix() {
        let info = FileInfo::new("GAME", 0x1900, 0x8023);
        assert_eq!("GAME,00001900,00008023", info.to_filename_suffix());
        assert_eq!(Some(info), FileInfo::from_filename("GAME,00001900,00008023"));
        assert!(is_load_exec_filename("GAME,ffff0e00,FFFF2B80"));
        assert!(!is_load_exec_filename("GAME"));
        assert!(!is_load_exec_filename("GAME,1900,8023"));
        assert_eq!(None, FileInfo::from_filename("GAME,1900,8023"));
    }

    #[test]
    fn test_basic_default() {
        let info = FileInfo::basic_default("PROG");
        assert_eq!(0xFFFF0E00, info.load_addr);
        assert_eq!(0xFFFF2B80, info.exec_addr);
    }
}
