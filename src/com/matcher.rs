use super::EconetEvent;

/// Accepts the inbound transmissions an exchange is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMatcher {
    pub source_station: u8,
    pub source_network: u8,
    /// `None` accepts any control byte.
    pub control_byte: Option<u8>,
    pub ports: Vec<u8>,
}

impl ResponseMatcher {
    pub fn new(source_station: u8, source_network: u8, control_byte: Option<u8>, ports: &[u8]) -> Self {
        Self {
            source_station,
            source_network,
            control_byte,
            ports: ports.to_vec(),
        }
    }

    pub fn matches(&self, event: &EconetEvent) -> bool {
        let EconetEvent::RxTransmit(rx) = event else {
            return false;
        };
        let scout = &rx.scout_frame;
        if scout.len() < 6 {
            return false;
        }
        scout[2] == self.source_station
            && scout[3] == self.source_network
            && self.control_byte.map_or(true, |cb| scout[4] == cb)
            && self.ports.contains(&scout[5])
    }
}
