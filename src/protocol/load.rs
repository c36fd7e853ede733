use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use web_time::Duration;

use super::{decode_fs_date, percent, standard_tx_message, DirectoryHandles, FileServer, ServerReply, TransferState, FS_CONTROL_BYTE, FUNC_LOAD};
use crate::com::{Driver, EconetEvent, EventQueue};
use crate::{EconetError, EconetResult};

const METADATA_LEN: usize = 14;
const FILENAME_LEN: usize = 12;
const DATA_HEADER_LEN: usize = 4;

/// A downloaded file together with the metadata the server reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub load_addr: u32,
    pub exec_addr: u32,
    /// Size announced in the metadata reply.
    pub size: usize,
    pub access: u8,
    pub date: u16,
    pub actual_filename: String,
    pub actual_size: usize,
    pub data: Vec<u8>,
}

impl LoadResult {
    pub fn modified(&self) -> Option<NaiveDate> {
        decode_fs_date(self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadMetadata {
    load_addr: u32,
    exec_addr: u32,
    size: usize,
    access: u8,
    date: u16,
    actual_filename: String,
}

impl LoadMetadata {
    fn parse(data: &[u8], station: u8) -> EconetResult<Self> {
        if data.len() < METADATA_LEN {
            return Err(EconetError::malformed(
                station,
                format!("LOAD succeeded but not enough data ({} bytes)", data.len()),
            ));
        }
        let name_end = data.len().min(METADATA_LEN + FILENAME_LEN);
        let actual_filename = data[METADATA_LEN..name_end]
            .iter()
            .take_while(|&&b| b < 0x80 && b != b'\r' && b != 0)
            .map(|&b| b as char)
            .collect::<String>()
            .trim()
            .to_string();
        Ok(Self {
            load_addr: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            exec_addr: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            size: data[8] as usize | (data[9] as usize) << 8 | (data[10] as usize) << 16,
            access: data[11],
            date: u16::from_le_bytes([data[12], data[13]]),
            actual_filename,
        })
    }
}

#[derive(Debug)]
enum LoadState {
    RequestMetadata,
    AwaitMetadata,
    AwaitDataOrStatus(LoadMetadata),
    Done(LoadMetadata),
}

/// Download state machine: one queue watches the reply port and the data port.
struct LoadTransfer<'a> {
    server: &'a FileServer,
    filename: &'a str,
    handles: &'a DirectoryHandles,
    state: LoadState,
    data: Vec<u8>,
}

impl<'a> LoadTransfer<'a> {
    fn update(&mut self, driver: &mut Driver, queue: &EventQueue, transfer_state: &Arc<Mutex<TransferState>>) -> EconetResult<()> {
        let server = self.server;
        let station = server.station;
        let options = &server.options;
        match std::mem::replace(&mut self.state, LoadState::RequestMetadata) {
            LoadState::RequestMetadata => {
                // The data port travels in the user root slot of the header.
                let header_handles = DirectoryHandles {
                    user_root: options.load_data_port,
                    ..*self.handles
                };
                let msg = standard_tx_message(options.reply_port, FUNC_LOAD, &header_handles, format!("{}\r", self.filename).as_bytes());
                server.send_request(driver, &msg, "LOAD command")?;
                self.state = LoadState::AwaitMetadata;
            }
            LoadState::AwaitMetadata => {
                let event = driver.queue_wait(queue, server.reply_timeout(), "LOAD reply")?;
                if event_port(&event) != Some(options.reply_port) {
                    return Err(EconetError::UnexpectedResponse {
                        station,
                        what: "LOAD reply".to_string(),
                    });
                }
                let reply = ServerReply::from_event(event, station, "LOAD reply")?.check("Load")?;
                let metadata = LoadMetadata::parse(&reply.data, station)?;
                if let Ok(mut state) = transfer_state.lock() {
                    state.start(&metadata.actual_filename, metadata.size);
                    state.current_state = "Receiving data...";
                }
                self.state = LoadState::AwaitDataOrStatus(metadata);
            }
            LoadState::AwaitDataOrStatus(metadata) => {
                let event = driver.queue_wait(queue, Duration::from_millis(options.load_timeout_ms), "LOAD data")?;
                if event_port(&event) == Some(options.reply_port) {
                    ServerReply::from_event(event, station, "LOAD status")?.check("Load")?;
                    self.state = LoadState::Done(metadata);
                    return Ok(());
                }
                let EconetEvent::RxTransmit(rx) = event else {
                    return Err(EconetError::UnexpectedResponse {
                        station,
                        what: "LOAD data".to_string(),
                    });
                };
                if rx.data_frame.len() < DATA_HEADER_LEN {
                    return Err(EconetError::malformed(
                        station,
                        format!("LOAD data frame too short ({} bytes)", rx.data_frame.len()),
                    ));
                }
                self.data.extend_from_slice(&rx.data_frame[DATA_HEADER_LEN..]);
                log::debug!(
                    "Loading {}/{} bytes [{}%]",
                    self.data.len(),
                    metadata.size,
                    percent(self.data.len(), metadata.size)
                );
                if let Ok(mut state) = transfer_state.lock() {
                    state.bytes_transfered = self.data.len();
                }
                self.state = LoadState::AwaitDataOrStatus(metadata);
            }
            LoadState::Done(metadata) => {
                self.state = LoadState::Done(metadata);
            }
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, LoadState::Done(_))
    }

    fn into_result(self) -> EconetResult<LoadResult> {
        let LoadState::Done(metadata) = self.state else {
            return Err(EconetError::UnexpectedResponse {
                station: self.server.station,
                what: "LOAD completion".to_string(),
            });
        };
        if self.data.len() != metadata.size {
            return Err(EconetError::malformed(
                self.server.station,
                format!("LOAD delivered {} bytes but {} were announced", self.data.len(), metadata.size),
            ));
        }
        Ok(LoadResult {
            load_addr: metadata.load_addr,
            exec_addr: metadata.exec_addr,
            size: metadata.size,
            access: metadata.access,
            date: metadata.date,
            actual_filename: metadata.actual_filename,
            actual_size: self.data.len(),
            data: self.data,
        })
    }
}

fn event_port(event: &EconetEvent) -> Option<u8> {
    match event {
        EconetEvent::RxTransmit(rx) => rx.port(),
        _ => None,
    }
}

impl FileServer {
    /// Downloads `filename` (function code 2).
    pub fn load(&self, driver: &mut Driver, filename: &str, handles: &DirectoryHandles, transfer_state: &Arc<Mutex<TransferState>>) -> EconetResult<LoadResult> {
        let matcher = self.reply_matcher(Some(FS_CONTROL_BYTE), &[self.options.reply_port, self.options.load_data_port]);
        let mut transfer = LoadTransfer {
            server: self,
            filename,
            handles,
            state: LoadState::RequestMetadata,
            data: Vec::new(),
        };
        let result = driver.with_queue(matcher, |driver, queue| {
            while !transfer.is_finished() {
                transfer.update(driver, queue, transfer_state)?;
            }
            Ok(())
        });
        if let Ok(mut state) = transfer_state.lock() {
            state.is_finished = true;
            if result.is_err() {
                state.errors += 1;
            }
        }
        result?;
        transfer.into_result()
    }
}
