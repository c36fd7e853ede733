//! Operations that are a single `*` command with no reply payload of interest.

use super::{DirectoryHandles, FileServer};
use crate::com::Driver;
use crate::ecopath::parse_file_specifier;
use crate::EconetResult;

impl FileServer {
    pub fn bye(&self, driver: &mut Driver, handles: &DirectoryHandles) -> EconetResult<()> {
        self.execute_cli_command(driver, "BYE", handles)?;
        Ok(())
    }

    pub fn cdir(&self, driver: &mut Driver, dir_name: &str, handles: &DirectoryHandles) -> EconetResult<()> {
        parse_file_specifier(dir_name)?;
        self.execute_cli_command(driver, &format!("CDIR {dir_name}"), handles)?;
        Ok(())
    }

    pub fn delete_file(&self, driver: &mut Driver, file_path: &str, handles: &DirectoryHandles) -> EconetResult<()> {
        parse_file_specifier(file_path)?;
        self.execute_cli_command(driver, &format!("DELETE {file_path}"), handles)?;
        Ok(())
    }

    pub fn access(&self, driver: &mut Driver, file_path: &str, access_string: &str, handles: &DirectoryHandles) -> EconetResult<()> {
        parse_file_specifier(file_path)?;
        self.execute_cli_command(driver, &format!("ACCESS {file_path} {access_string}"), handles)?;
        Ok(())
    }

    pub fn new_user(&self, driver: &mut Driver, username: &str, handles: &DirectoryHandles) -> EconetResult<()> {
        self.execute_cli_command(driver, &format!("NEWUSER {username}"), handles)?;
        Ok(())
    }

    pub fn remove_user(&self, driver: &mut Driver, username: &str, handles: &DirectoryHandles) -> EconetResult<()> {
        self.execute_cli_command(driver, &format!("REMUSER {username}"), handles)?;
        Ok(())
    }

    /// An empty password is sent as `""`.
    pub fn change_password(&self, driver: &mut Driver, old_password: &str, new_password: &str, handles: &DirectoryHandles) -> EconetResult<()> {
        let command = format!("PASS {} {}", quote_empty(old_password), quote_empty(new_password));
        self.execute_cli_command(driver, &command, handles)?;
        Ok(())
    }

    /// `level` defaults to `N` (normal user).
    pub fn set_privileged(&self, driver: &mut Driver, username: &str, level: Option<&str>, handles: &DirectoryHandles) -> EconetResult<()> {
        let level = level.filter(|l| !l.is_empty()).unwrap_or("N");
        self.execute_cli_command(driver, &format!("PRIV {username} {level}"), handles)?;
        Ok(())
    }
}

fn quote_empty(password: &str) -> &str {
    if password.is_empty() {
        "\"\""
    } else {
        password
    }
}
