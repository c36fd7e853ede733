use web_time::{Duration, Instant};

use super::{standard_tx_message, DirectoryHandles, FileServer, FS_CONTROL_BYTE, FUNC_EXAMINE};
use crate::com::Driver;
use crate::{EconetError, EconetResult};

/// ARG values for EXAMINE:
/// 0 = all info, machine readable; 1 = all info, human readable;
/// 2 = file title only; 3 = access + file title.
const ARG_HUMAN_READABLE: u8 = 0x01;
const ENTRIES_PER_REQUEST: u8 = 0x0b;
const FILLER_RECORD: &[u8] = &[0x80];

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub load_address: String,
    pub exec_address: String,
    pub size_bytes: usize,
    pub access: String,
    pub date: String,
}

impl FileRecord {
    pub fn is_dir(&self) -> bool {
        self.access.contains('D')
    }

    /// Parses `"<name> <load> <exec> <size> <access> <date> <id>"`.
    fn parse(record: &str, station: u8) -> EconetResult<Self> {
        let fields: Vec<&str> = record.split_whitespace().collect();
        let [name, load_address, exec_address, size, access, date, id] = fields[..] else {
            return Err(EconetError::malformed(station, format!("unexpected EXAMINE record '{record}'")));
        };
        let size_bytes = usize::from_str_radix(size, 16)
            .map_err(|_| EconetError::malformed(station, format!("invalid size '{size}' in EXAMINE record '{record}'")))?;
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            load_address: load_address.to_string(),
            exec_address: exec_address.to_string(),
            size_bytes,
            access: access.to_string(),
            date: date.to_string(),
        })
    }
}

fn parse_records(data: &[u8], station: u8) -> EconetResult<Vec<FileRecord>> {
    data.split(|&b| b == 0)
        .filter(|record| !record.is_empty() && *record != FILLER_RECORD)
        .map(|record| FileRecord::parse(&String::from_utf8_lossy(record), station))
        .collect()
}

impl FileServer {
    /// Lists a directory (function code 3), paging through it until the server returns no entries.
    pub fn examine_dir(&self, driver: &mut Driver, dir_path: &str, handles: &DirectoryHandles) -> EconetResult<Vec<FileRecord>> {
        let budget = Duration::from_millis(self.options.examine_budget_ms);
        let start_time = Instant::now();
        let mut results = Vec::new();
        let mut start_index: u8 = 0;

        loop {
            let remaining = budget.saturating_sub(start_time.elapsed());
            if remaining.is_zero() {
                return Err(EconetError::Timeout {
                    what: format!("EXAMINE of '{dir_path}'"),
                    timeout_ms: budget.as_millis(),
                });
            }

            let mut payload = vec![ARG_HUMAN_READABLE, start_index, ENTRIES_PER_REQUEST];
            payload.extend_from_slice(format!("{dir_path}\r").as_bytes());
            let msg = standard_tx_message(self.options.reply_port, FUNC_EXAMINE, handles, &payload);

            // a page never waits past the overall budget
            let page_timeout = remaining.min(self.reply_timeout());
            let reply = self
                .exchange_within(driver, Some(FS_CONTROL_BYTE), &msg, page_timeout, "examine command")?
                .check("Examine")?;
            if reply.data.len() < 2 {
                return Err(EconetError::malformed(
                    self.station,
                    format!("EXAMINE succeeded but not enough data ({} bytes)", reply.data.len()),
                ));
            }

            let entries_returned = reply.data[0];
            if entries_returned == 0 {
                break;
            }
            results.extend(parse_records(&reply.data[2..], self.station)?);
            start_index = start_index.wrapping_add(entries_returned);
        }

        log::debug!("EXAMINE '{dir_path}': {} entries", results.len());
        Ok(results)
    }
}
