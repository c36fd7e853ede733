use std::error::Error;
use std::time::Duration;

#[cfg(test)]
pub mod test_com;
#[cfg(test)]
pub use test_com::*;


pub mod driver;
pub use driver::*;

pub mod matcher;
pub use matcher::*;

pub type TransportResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Link to the serial Econet bridge. Delivery order is preserved per sender.
pub trait Transport: Send {
    fn get_name(&self) -> &'static str;

    /// Hands one frame to the bridge for transmission. `extra_scout` carries
    /// additional scout bytes for immediate operations (empty otherwise).
    fn transmit(&mut self, station: u8, network: u8, control_byte: u8, port: u8, data: &[u8], extra_scout: &[u8]) -> TransportResult<TxResult>;

    /// Blocks for at most `timeout` for the next inbound event.
    fn read_event(&mut self, timeout: Duration) -> TransportResult<Option<EconetEvent>>;

    fn disconnect(&mut self) -> TransportResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub success: bool,
    pub description: String,
}

impl TxResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            description: "OK".to_string(),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            success: false,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EconetEvent {
    RxTransmit(RxTransmitEvent),
    /// Raw frame seen while the bridge is in monitor mode.
    RxData(Vec<u8>),
    Error(String),
}

/// A scout frame `[dst_stn, dst_net, src_stn, src_net, control, port]` and the
/// data frame that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxTransmitEvent {
    pub scout_frame: Vec<u8>,
    pub data_frame: Vec<u8>,
}

impl RxTransmitEvent {
    pub fn source_station(&self) -> Option<u8> {
        self.scout_frame.get(2).copied()
    }

    pub fn source_network(&self) -> Option<u8> {
        self.scout_frame.get(3).copied()
    }

    pub fn control_byte(&self) -> Option<u8> {
        self.scout_frame.get(4).copied()
    }

    pub fn port(&self) -> Option<u8> {
        self.scout_frame.get(5).copied()
    }
}
