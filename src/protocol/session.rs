use super::{DirectoryHandles, FileServer};
use crate::com::Driver;
use crate::ecopath::parse_file_specifier;
use crate::{EconetError, EconetResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginResult {
    pub directory_handles: DirectoryHandles,
    pub boot_option: u8,
}

impl FileServer {
    /// Logs on. No session exists yet so all handles in the request are zero.
    pub fn i_am(&self, driver: &mut Driver, username: &str, password: Option<&str>) -> EconetResult<LoginResult> {
        let command = match password {
            Some(password) if !password.is_empty() => format!("I AM {username} {password}"),
            _ => format!("I AM {username}"),
        };
        let reply = self.execute_cli_command(driver, &command, &DirectoryHandles::default())?;
        if reply.data.len() < 4 {
            return Err(EconetError::malformed(
                self.station,
                format!("success but not enough data ({} bytes)", reply.data.len()),
            ));
        }
        log::info!("logged on to station {} as {username}", self.station);
        Ok(LoginResult {
            directory_handles: DirectoryHandles {
                user_root: reply.data[1],
                current: reply.data[0],
                library: reply.data[2],
            },
            boot_option: reply.data[3],
        })
    }

    /// Changes the current directory and returns the handle of the new one.
    pub fn dir(&self, driver: &mut Driver, path: &str, handles: &DirectoryHandles) -> EconetResult<u8> {
        parse_file_specifier(path)?;
        let reply = self.execute_cli_command(driver, &format!("DIR {path}"), handles)?;
        reply
            .data
            .first()
            .copied()
            .ok_or_else(|| EconetError::malformed(self.station, "success but not enough data (0 bytes)"))
    }
}
