use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{EconetEvent, RxTransmitEvent, Transport, TransportResult, TxResult};

pub const TEST_LOCAL_STATION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub station: u8,
    pub network: u8,
    pub control_byte: u8,
    pub port: u8,
    pub data: Vec<u8>,
    pub extra_scout: Vec<u8>,
    /// Number of events handed out before this transmission happened.
    pub events_delivered: usize,
}

#[derive(Default)]
pub struct TestLink {
    /// Events with the number of transmissions that must happen before they are visible.
    scripted: VecDeque<(usize, EconetEvent)>,
    pub transmissions: Vec<Transmission>,
    pub events_delivered: usize,
    pub failed_attempts: usize,
    fail_ports: HashMap<u8, usize>,
}

/// Scripted in-memory bridge. Clones share the same link so a test can keep
/// one handle while the driver owns the other.
#[derive(Clone, Default)]
pub struct TestTransport {
    link: Arc<Mutex<TestLink>>,
}

impl TestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event that becomes readable once `after_tx` frames were transmitted.
    pub fn push_event(&self, after_tx: usize, event: EconetEvent) {
        self.link.lock().unwrap().scripted.push_back((after_tx, event));
    }

    pub fn push_transmit(&self, after_tx: usize, scout_frame: Vec<u8>, data_frame: Vec<u8>) {
        self.push_event(after_tx, EconetEvent::RxTransmit(RxTransmitEvent { scout_frame, data_frame }));
    }

    /// Makes the next `count` transmits to `port` fail.
    pub fn fail_port(&self, port: u8, count: usize) {
        self.link.lock().unwrap().fail_ports.insert(port, count);
    }

    pub fn transmissions(&self) -> Vec<Transmission> {
        self.link.lock().unwrap().transmissions.clone()
    }

    pub fn failed_attempts(&self) -> usize {
        self.link.lock().unwrap().failed_attempts
    }

    pub fn pending_events(&self) -> usize {
        self.link.lock().unwrap().scripted.len()
    }
}

impl Transport for TestTransport {
    fn get_name(&self) -> &'static str {
        "Test_Transport"
    }

    fn transmit(&mut self, station: u8, network: u8, control_byte: u8, port: u8, data: &[u8], extra_scout: &[u8]) -> TransportResult<TxResult> {
        let mut link = self.link.lock().unwrap();
        if let Some(remaining) = link.fail_ports.get_mut(&port) {
            if *remaining > 0 {
                *remaining -= 1;
                link.failed_attempts += 1;
                return Ok(TxResult::failed("not listening"));
            }
        }
        let events_delivered = link.events_delivered;
        link.transmissions.push(Transmission {
            station,
            network,
            control_byte,
            port,
            data: data.to_vec(),
            extra_scout: extra_scout.to_vec(),
            events_delivered,
        });
        Ok(TxResult::ok())
    }

    fn read_event(&mut self, _timeout: Duration) -> TransportResult<Option<EconetEvent>> {
        let mut link = self.link.lock().unwrap();
        let sent = link.transmissions.len();
        match link.scripted.front() {
            Some((after_tx, _)) if *after_tx <= sent => {
                link.events_delivered += 1;
                Ok(link.scripted.pop_front().map(|(_, event)| event))
            }
            _ => Ok(None),
        }
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

/// Scout frame as sent by `station` on network 0 to the test station.
pub fn scout_from(station: u8, control_byte: u8, port: u8) -> Vec<u8> {
    vec![TEST_LOCAL_STATION, 0, station, 0, control_byte, port]
}

/// Fileserver reply data frame: 4 address bytes, command code, result code, payload.
pub fn reply_frame(station: u8, command_code: u8, result_code: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![TEST_LOCAL_STATION, 0, station, 0, command_code, result_code];
    frame.extend_from_slice(payload);
    frame
}

/// Raw data frame: 4 address bytes followed by payload.
pub fn data_frame(station: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![TEST_LOCAL_STATION, 0, station, 0];
    frame.extend_from_slice(payload);
    frame
}
