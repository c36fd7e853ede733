use super::{standard_tx_message, DirectoryHandles, FileServer, FUNC_OBJECT_INFO};
use crate::com::Driver;
use crate::{EconetError, EconetResult};

// Object info ARG values
//    0x01 = read creation date
//    0x02 = read load and execution addresses (8 bytes)
//    0x03 = read size (3 bytes)
//    0x04 = read type/access byte
//    0x05 = read all file attributes
//    0x06 = access/cycle/dir. name of given dir
const ARG_ACCESS: u8 = 0x04;
const ARG_DIR_INFO: u8 = 0x06;

pub const ACCESS_PUBLIC_READ: u8 = 0x01;
pub const ACCESS_PUBLIC_WRITE: u8 = 0x02;
pub const ACCESS_OWNER_READ: u8 = 0x04;
pub const ACCESS_OWNER_WRITE: u8 = 0x08;
pub const ACCESS_LOCKED: u8 = 0x10;
pub const ACCESS_DIRECTORY: u8 = 0x20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessInfo {
    pub file_exists: bool,
    pub access: Option<String>,
}

impl AccessInfo {
    pub fn is_dir(&self) -> bool {
        self.access.as_deref().map_or(false, |a| a.contains('D'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirInfo {
    pub dir_name: String,
    pub is_owner: bool,
    pub cycle_num: u8,
}

/// Renders an access byte as e.g. `DLWR/R`.
pub fn access_byte_to_string(access_byte: u8) -> String {
    let flag = |mask: u8, ch: char| if access_byte & mask != 0 { Some(ch) } else { None };
    [
        flag(ACCESS_DIRECTORY, 'D'),
        flag(ACCESS_LOCKED, 'L'),
        flag(ACCESS_OWNER_WRITE, 'W'),
        flag(ACCESS_OWNER_READ, 'R'),
        Some('/'),
        flag(ACCESS_PUBLIC_WRITE, 'W'),
        flag(ACCESS_PUBLIC_READ, 'R'),
    ]
    .into_iter()
    .flatten()
    .collect()
}

impl FileServer {
    fn object_info(&self, driver: &mut Driver, arg: u8, path: &str, handles: &DirectoryHandles) -> EconetResult<Vec<u8>> {
        let mut payload = vec![arg];
        payload.extend_from_slice(format!("{path}\r").as_bytes());
        let msg = standard_tx_message(self.options.reply_port, FUNC_OBJECT_INFO, handles, &payload);
        let reply = self.exchange(driver, None, &msg, "object info command (0x12)")?.check("Object info")?;
        Ok(reply.data)
    }

    /// Reads name, ownership and cycle number of a directory.
    pub fn read_dir_access_object_info(&self, driver: &mut Driver, dir_path: &str, handles: &DirectoryHandles) -> EconetResult<DirInfo> {
        let data = self.object_info(driver, ARG_DIR_INFO, dir_path, handles)?;
        if data.len() < 15 {
            return Err(EconetError::malformed(
                self.station,
                format!("success but not enough data ({} bytes)", data.len()),
            ));
        }
        Ok(DirInfo {
            dir_name: String::from_utf8_lossy(&data[3..13]).trim().to_string(),
            is_owner: data[13] == 0,
            cycle_num: data[14],
        })
    }

    /// Reads whether an object exists and, if so, its access string.
    pub fn read_access_object_info(&self, driver: &mut Driver, path: &str, handles: &DirectoryHandles) -> EconetResult<AccessInfo> {
        let data = self.object_info(driver, ARG_ACCESS, path, handles)?;
        let Some(&exists) = data.first() else {
            return Err(EconetError::malformed(self.station, "success but not enough data (0 bytes)"));
        };
        if exists == 0 {
            return Ok(AccessInfo {
                file_exists: false,
                access: None,
            });
        }
        if data.len() < 3 {
            return Err(EconetError::malformed(
                self.station,
                format!("success but not enough data ({} bytes)", data.len()),
            ));
        }
        Ok(AccessInfo {
            file_exists: true,
            access: Some(access_byte_to_string(data[1])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_byte_to_string() {
        assert_eq!("WR/R", access_byte_to_string(0x08 | 0x04 | 0x01));
        assert_eq!("/", access_byte_to_string(0));
        assert_eq!("WR/WR", access_byte_to_string(0x0F));
    }

    #[test]
    fn test_access_byte_dir_locked() {
        let access = access_byte_to_string(0x20 | 0x10 | 0x08 | 0x04 | 0x01);
        assert!(access.starts_with('D'));
        assert!(access.contains('L'));
        assert_eq!("DLWR/R", access);
    }
}
