use web_time::Instant;

/// Progress of a LOAD or SAVE, shared with whoever renders it.
#[derive(Debug, Clone)]
pub struct TransferState {
    pub current_state: &'static str,
    pub file_name: String,
    pub file_size: usize,
    pub bytes_transfered: usize,
    pub errors: usize,
    pub is_finished: bool,
    start_time: Instant,
}

impl Default for TransferState {
    fn default() -> Self {
        Self {
            current_state: "",
            file_name: String::new(),
            file_size: 0,
            bytes_transfered: 0,
            errors: 0,
            is_finished: false,
            start_time: Instant::now(),
        }
    }
}

impl TransferState {
    pub fn start(&mut self, file_name: &str, file_size: usize) {
        *self = Self {
            file_name: file_name.to_string(),
            file_size,
            ..Default::default()
        };
    }

    pub fn get_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_millis() as u64;
        if elapsed == 0 {
            return 0;
        }
        self.bytes_transfered as u64 * 1000 / elapsed
    }
}
