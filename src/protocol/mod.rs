use serde::{Deserialize, Serialize};
use web_time::Duration;

pub mod transfer_state;
pub use transfer_state::*;

pub mod fs_date;
pub use fs_date::*;

pub mod simple_cli;

pub mod session;
pub use session::*;

pub mod load;
pub use load::*;

pub mod save;
pub use save::*;

pub mod examine;
pub use examine::*;

pub mod object_info;
pub use object_info::*;

pub mod notify;


use crate::com::{Driver, EconetEvent, EventQueue, ResponseMatcher};
use crate::{EconetError, EconetResult, ProtocolOptions};

pub const FS_CONTROL_BYTE: u8 = 0x80;
pub const FS_PORT: u8 = 0x99;
pub const DEFAULT_REPLY_PORT: u8 = 0x90;

pub const FUNC_CLI: u8 = 0x00;
pub const FUNC_SAVE: u8 = 0x01;
pub const FUNC_LOAD: u8 = 0x02;
pub const FUNC_EXAMINE: u8 = 0x03;
pub const FUNC_OBJECT_INFO: u8 = 0x12;

/// Directories the server has open for the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryHandles {
    pub user_root: u8,
    pub current: u8,
    pub library: u8,
}

impl DirectoryHandles {
    pub fn new(user_root: u8, current: u8, library: u8) -> Self {
        Self { user_root, current, library }
    }
}

/// `[reply_port, function_code, user_root, current, library] ++ data`
pub fn standard_tx_message(reply_port: u8, function_code: u8, handles: &DirectoryHandles, data: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(5 + data.len());
    msg.extend_from_slice(&[reply_port, function_code, handles.user_root, handles.current, handles.library]);
    msg.extend_from_slice(data);
    msg
}

pub fn strip_crs(text: &str) -> String {
    text.replace('\r', "")
}

/// Decodes a reply payload the server sent as (CR-terminated) text.
pub fn reply_text(data: &[u8]) -> String {
    strip_crs(&String::from_utf8_lossy(data))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    pub control_byte: u8,
    pub port: u8,
    pub command_code: u8,
    pub result_code: u8,
    pub data: Vec<u8>,
}

impl ServerReply {
    /// Decodes a fileserver reply; the data frame needs its 6-byte header.
    pub fn from_event(event: EconetEvent, station: u8, what: &str) -> EconetResult<Self> {
        let EconetEvent::RxTransmit(rx) = event else {
            return Err(EconetError::UnexpectedResponse {
                station,
                what: what.to_string(),
            });
        };
        if rx.scout_frame.len() < 6 || rx.data_frame.len() < 6 {
            return Err(EconetError::malformed(
                station,
                format!("{what} reply too short ({} bytes)", rx.data_frame.len()),
            ));
        }
        Ok(Self {
            control_byte: rx.scout_frame[4],
            port: rx.scout_frame[5],
            command_code: rx.data_frame[4],
            result_code: rx.data_frame[5],
            data: rx.data_frame[6..].to_vec(),
        })
    }

    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Fails with the server's message when the result code is non-zero.
    pub fn check(self, operation: &'static str) -> EconetResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(EconetError::ProtocolRejection {
                operation,
                result_code: self.result_code,
                message: reply_text(&self.data),
            })
        }
    }
}

/// A fileserver on the network together with the engine tunables used to talk to it.
#[derive(Debug, Clone)]
pub struct FileServer {
    pub station: u8,
    pub network: u8,
    pub options: ProtocolOptions,
}

impl FileServer {
    pub fn new(station: u8) -> Self {
        Self::with_options(station, ProtocolOptions::default())
    }

    pub fn with_options(station: u8, options: ProtocolOptions) -> Self {
        Self { station, network: 0, options }
    }

    pub fn reply_matcher(&self, control_byte: Option<u8>, ports: &[u8]) -> ResponseMatcher {
        ResponseMatcher::new(self.station, self.network, control_byte, ports)
    }

    pub(crate) fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.options.reply_timeout_ms)
    }

    /// Sends a request to the fileserver port under the fileserver control byte.
    pub(crate) fn send_request(&self, driver: &mut Driver, msg: &[u8], what: &str) -> EconetResult<()> {
        driver.transmit(self.station, self.network, FS_CONTROL_BYTE, FS_PORT, msg, what)
    }

    pub(crate) fn wait_for_reply(&self, driver: &mut Driver, queue: &EventQueue, timeout: Duration, what: &str) -> EconetResult<ServerReply> {
        let event = driver.queue_wait(queue, timeout, what)?;
        ServerReply::from_event(event, self.station, what)
    }

    /// Registers a reply queue, transmits `msg` and waits for the single reply.
    pub(crate) fn exchange(&self, driver: &mut Driver, control_byte: Option<u8>, msg: &[u8], what: &str) -> EconetResult<ServerReply> {
        self.exchange_within(driver, control_byte, msg, self.reply_timeout(), what)
    }

    pub(crate) fn exchange_within(&self, driver: &mut Driver, control_byte: Option<u8>, msg: &[u8], timeout: Duration, what: &str) -> EconetResult<ServerReply> {
        let matcher = self.reply_matcher(control_byte, &[self.options.reply_port]);
        driver.with_queue(matcher, |driver, queue| {
            self.send_request(driver, msg, what)?;
            self.wait_for_reply(driver, queue, timeout, what)
        })
    }

    /// Runs a `*` command (function code 0) and returns the successful reply.
    pub fn execute_cli_command(&self, driver: &mut Driver, command: &str, handles: &DirectoryHandles) -> EconetResult<ServerReply> {
        log::debug!("station {}: {command}", self.station);
        let msg = standard_tx_message(self.options.reply_port, FUNC_CLI, handles, format!("{command}\r").as_bytes());
        let reply = self.exchange(driver, Some(FS_CONTROL_BYTE), &msg, "command")?;
        reply.check("Command")
    }
}

pub(crate) fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        done * 100 / total
    }
}
