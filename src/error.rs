use std::io;

pub type EconetResult<T> = Result<T, EconetError>;

#[derive(Debug, thiserror::Error)]
pub enum EconetError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to send {what} to station {station}: {description}")]
    TransportSendFailure { station: u8, what: String, description: String },

    #[error("Timed out waiting for {what} after {timeout_ms}ms")]
    Timeout { what: String, timeout_ms: u128 },

    #[error("Unexpected response from station {station} while waiting for {what}")]
    UnexpectedResponse { station: u8, what: String },

    #[error("Malformed response from station {station}: {detail}")]
    MalformedResponse { station: u8, detail: String },

    /// The server answered with a non-zero result code. Displays the server's text only.
    #[error("{message}")]
    ProtocolRejection { operation: &'static str, result_code: u8, message: String },

    #[error("Save failed (result code 0x{result_code:02X})")]
    SaveFailed { result_code: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EconetError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EconetError::Validation(msg.into())
    }

    pub fn malformed(station: u8, detail: impl Into<String>) -> Self {
        EconetError::MalformedResponse {
            station,
            detail: detail.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EconetError::Timeout { .. })
    }
}
