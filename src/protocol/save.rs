use std::cmp::min;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use web_time::Duration;

use super::{decode_fs_date, percent, standard_tx_message, DirectoryHandles, FileServer, TransferState, FS_CONTROL_BYTE, FUNC_SAVE};
use crate::com::{Driver, EconetEvent, EventQueue};
use crate::{EconetError, EconetResult};

const MAX_FILE_LEN: usize = 0xFF_FFFF;
const STATUS_FRAME_LEN: usize = 9;

/// Final status of a completed SAVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveResult {
    pub command_code: u8,
    pub access_byte: u8,
    pub date: u16,
}

impl SaveResult {
    pub fn modified(&self) -> Option<NaiveDate> {
        decode_fs_date(self.date)
    }
}

#[derive(Debug)]
enum SaveState {
    Negotiate,
    AwaitNegotiation,
    SendData { data_port: u8, block_size: usize, offset: usize },
    AwaitAck { data_port: u8, block_size: usize, offset: usize },
    AwaitStatus,
    Done(SaveResult),
}

/// Upload state machine. Replies arrive on the reply port, block
/// acknowledgements on the ack port; both queues exist before the first transmit.
struct SaveTransfer<'a> {
    server: &'a FileServer,
    data: &'a [u8],
    remote_filename: &'a str,
    load_addr: u32,
    exec_addr: u32,
    handles: &'a DirectoryHandles,
    state: SaveState,
}

impl<'a> SaveTransfer<'a> {
    fn update(&mut self, driver: &mut Driver, reply_queue: &EventQueue, ack_queue: &EventQueue, transfer_state: &Arc<Mutex<TransferState>>) -> EconetResult<()> {
        let server = self.server;
        let station = server.station;
        let options = &server.options;
        match self.state {
            SaveState::Negotiate => {
                let msg = self.negotiation_message();
                server.send_request(driver, &msg, "SAVE command")?;
                self.state = SaveState::AwaitNegotiation;
            }
            SaveState::AwaitNegotiation => {
                let reply = server.wait_for_reply(driver, reply_queue, server.reply_timeout(), "SAVE reply")?.check("Save")?;
                if reply.data.len() < 3 {
                    return Err(EconetError::malformed(
                        station,
                        format!("SAVE succeeded but not enough data ({} bytes)", reply.data.len()),
                    ));
                }
                let data_port = reply.data[0];
                let block_size = u16::from_le_bytes([reply.data[1], reply.data[2]]) as usize;
                if block_size == 0 {
                    return Err(EconetError::malformed(station, "SAVE negotiated a block size of 0"));
                }
                log::debug!("SAVE data port 0x{data_port:02X}, block size {block_size}");
                if let Ok(mut state) = transfer_state.lock() {
                    state.start(self.remote_filename, self.data.len());
                    state.current_state = "Sending data...";
                }
                self.state = if self.data.is_empty() {
                    SaveState::AwaitStatus
                } else {
                    SaveState::SendData { data_port, block_size, offset: 0 }
                };
            }
            SaveState::SendData { data_port, block_size, offset } => {
                let end = min(offset + block_size, self.data.len());
                self.send_block(driver, data_port, &self.data[offset..end], transfer_state)?;
                log::debug!("Saving {end}/{} bytes [{}%]", self.data.len(), percent(end, self.data.len()));
                if let Ok(mut state) = transfer_state.lock() {
                    state.bytes_transfered = end;
                }
                self.state = if end < self.data.len() {
                    SaveState::AwaitAck { data_port, block_size, offset: end }
                } else {
                    SaveState::AwaitStatus
                };
            }
            SaveState::AwaitAck { data_port, block_size, offset } => {
                // An acknowledgement carries no payload of interest: it only means "send more".
                driver.queue_wait(ack_queue, Duration::from_millis(options.save_ack_timeout_ms), "data ack")?;
                self.state = SaveState::SendData { data_port, block_size, offset };
            }
            SaveState::AwaitStatus => {
                let event = driver.queue_wait(reply_queue, server.reply_timeout(), "save status")?;
                self.state = SaveState::Done(self.parse_status(event)?);
            }
            SaveState::Done(_) => {}
        }
        Ok(())
    }

    fn negotiation_message(&self) -> Vec<u8> {
        let options = &self.server.options;
        let len = self.data.len() as u32;
        let mut payload = Vec::with_capacity(11 + self.remote_filename.len() + 1);
        payload.extend_from_slice(&self.load_addr.to_le_bytes());
        payload.extend_from_slice(&self.exec_addr.to_le_bytes());
        payload.extend_from_slice(&len.to_le_bytes()[0..3]);
        payload.extend_from_slice(format!("{}\r", self.remote_filename).as_bytes());
        // The ack port travels in the user root slot of the header.
        let header_handles = DirectoryHandles {
            user_root: options.save_ack_port,
            ..*self.handles
        };
        standard_tx_message(options.reply_port, FUNC_SAVE, &header_handles, &payload)
    }

    fn send_block(&self, driver: &mut Driver, data_port: u8, block: &[u8], transfer_state: &Arc<Mutex<TransferState>>) -> EconetResult<()> {
        let server = self.server;
        let options = &server.options;
        let mut last_error = String::new();
        for attempt in 1..=options.save_max_attempts {
            let result = driver.try_transmit(server.station, server.network, FS_CONTROL_BYTE, data_port, block);
            if result.success {
                return Ok(());
            }
            log::warn!(
                "SAVE block to station {} failed (attempt {attempt}/{}): {}",
                server.station,
                options.save_max_attempts,
                result.description
            );
            if let Ok(mut state) = transfer_state.lock() {
                state.errors += 1;
            }
            last_error = result.description;
            if attempt < options.save_max_attempts {
                std::thread::sleep(Duration::from_millis(options.save_retry_backoff_ms));
            }
        }
        Err(EconetError::TransportSendFailure {
            station: server.station,
            what: "SAVE data".to_string(),
            description: last_error,
        })
    }

    fn parse_status(&self, event: EconetEvent) -> EconetResult<SaveResult> {
        let station = self.server.station;
        let EconetEvent::RxTransmit(rx) = event else {
            return Err(EconetError::UnexpectedResponse {
                station,
                what: "save status".to_string(),
            });
        };
        if rx.data_frame.len() < STATUS_FRAME_LEN {
            return Err(EconetError::malformed(
                station,
                format!("SAVE status too short ({} bytes)", rx.data_frame.len()),
            ));
        }
        let frame = &rx.data_frame;
        let result_code = frame[5];
        if result_code != 0 {
            return Err(EconetError::SaveFailed { result_code });
        }
        Ok(SaveResult {
            command_code: frame[4],
            access_byte: frame[6],
            date: u16::from_le_bytes([frame[7], frame[8]]),
        })
    }
}

impl FileServer {
    /// Uploads `data` as `remote_filename` (function code 1).
    #[allow(clippy::too_many_arguments)]
    pub fn save(
        &self,
        driver: &mut Driver,
        data: &[u8],
        remote_filename: &str,
        load_addr: u32,
        exec_addr: u32,
        handles: &DirectoryHandles,
        transfer_state: &Arc<Mutex<TransferState>>,
    ) -> EconetResult<SaveResult> {
        if data.len() > MAX_FILE_LEN {
            return Err(EconetError::validation(format!(
                "File too large to save: {} bytes (maximum {MAX_FILE_LEN})",
                data.len()
            )));
        }
        let mut transfer = SaveTransfer {
            server: self,
            data,
            remote_filename,
            load_addr,
            exec_addr,
            handles,
            state: SaveState::Negotiate,
        };
        let reply_matcher = self.reply_matcher(Some(FS_CONTROL_BYTE), &[self.options.reply_port]);
        let ack_matcher = self.reply_matcher(Some(FS_CONTROL_BYTE), &[self.options.save_ack_port]);
        let result = driver.with_queue(reply_matcher, |driver, reply_queue| {
            driver.with_queue(ack_matcher, |driver, ack_queue| {
                loop {
                    if let SaveState::Done(result) = transfer.state {
                        return Ok(result);
                    }
                    transfer.update(driver, reply_queue, ack_queue, transfer_state)?;
                }
            })
        });
        if let Ok(mut state) = transfer_state.lock() {
            state.is_finished = true;
        }
        result
    }
}

