use std::collections::VecDeque;

use web_time::{Duration, Instant};

use super::{EconetEvent, ResponseMatcher, Transport, TxResult};
use crate::{EconetError, EconetResult};

/// Handle to an event queue registered with a [`Driver`].
#[derive(Debug, PartialEq, Eq)]
pub struct EventQueue {
    id: usize,
}

struct QueueSlot {
    id: usize,
    matcher: ResponseMatcher,
    events: VecDeque<EconetEvent>,
}

/// Owns the transport and routes inbound events to registered queues.
///
/// A queue only sees events read after it was created, so an exchange must
/// create its queue before transmitting the request that triggers the reply.
pub struct Driver {
    transport: Box<dyn Transport>,
    queues: Vec<QueueSlot>,
    next_queue_id: usize,
}

impl Driver {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            queues: Vec::new(),
            next_queue_id: 0,
        }
    }

    pub fn get_name(&self) -> &'static str {
        self.transport.get_name()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn queue_create(&mut self, matcher: ResponseMatcher) -> EventQueue {
        let id = self.next_queue_id;
        self.next_queue_id += 1;
        self.queues.push(QueueSlot {
            id,
            matcher,
            events: VecDeque::new(),
        });
        EventQueue { id }
    }

    pub fn queue_destroy(&mut self, queue: EventQueue) {
        self.queues.retain(|slot| slot.id != queue.id);
    }

    /// Runs `f` with a fresh queue and destroys the queue on every exit path.
    pub fn with_queue<R>(&mut self, matcher: ResponseMatcher, f: impl FnOnce(&mut Driver, &EventQueue) -> EconetResult<R>) -> EconetResult<R> {
        let queue = self.queue_create(matcher);
        let result = f(self, &queue);
        self.queue_destroy(queue);
        result
    }

    /// Returns the first event in `queue`, reading from the transport until one
    /// arrives or `timeout` elapses.
    pub fn queue_wait(&mut self, queue: &EventQueue, timeout: Duration, description: &str) -> EconetResult<EconetEvent> {
        let start = Instant::now();
        loop {
            if let Some(event) = self.queue_shift(queue) {
                return Ok(event);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(EconetError::Timeout {
                    what: description.to_string(),
                    timeout_ms: timeout.as_millis(),
                });
            }
            match self.transport.read_event(timeout - elapsed) {
                Ok(Some(event)) => self.dispatch(event),
                Ok(None) => {}
                Err(err) => {
                    log::error!("transport error while waiting for {description}: {err}");
                    return Err(transport_error(err.as_ref()));
                }
            }
        }
    }

    /// Pops an already delivered event without touching the transport.
    pub fn queue_shift(&mut self, queue: &EventQueue) -> Option<EconetEvent> {
        self.queues.iter_mut().find(|slot| slot.id == queue.id).and_then(|slot| slot.events.pop_front())
    }

    fn dispatch(&mut self, event: EconetEvent) {
        if let EconetEvent::Error(description) = &event {
            log::error!("ERROR: {description}");
            return;
        }
        let mut delivered = false;
        for slot in &mut self.queues {
            if slot.matcher.matches(&event) {
                slot.events.push_back(event.clone());
                delivered = true;
            }
        }
        if !delivered {
            log::trace!("dropping unmatched event {event:?}");
        }
    }

    /// Transmits once and reports the outcome; transport errors become a failed result.
    pub fn try_transmit(&mut self, station: u8, network: u8, control_byte: u8, port: u8, data: &[u8]) -> TxResult {
        self.try_transmit_with_scout(station, network, control_byte, port, data, &[])
    }

    pub fn try_transmit_with_scout(&mut self, station: u8, network: u8, control_byte: u8, port: u8, data: &[u8], extra_scout: &[u8]) -> TxResult {
        log::debug!("tx station {station}.{network} control 0x{control_byte:02X} port 0x{port:02X} #{}", data.len());
        match self.transport.transmit(station, network, control_byte, port, data, extra_scout) {
            Ok(result) => result,
            Err(err) => TxResult::failed(err.to_string()),
        }
    }

    /// Transmits once; a failed hand-off is a [`EconetError::TransportSendFailure`].
    pub fn transmit(&mut self, station: u8, network: u8, control_byte: u8, port: u8, data: &[u8], what: &str) -> EconetResult<()> {
        check_tx(self.try_transmit(station, network, control_byte, port, data), station, what)
    }

    pub fn transmit_with_scout(&mut self, station: u8, network: u8, control_byte: u8, port: u8, data: &[u8], extra_scout: &[u8], what: &str) -> EconetResult<()> {
        check_tx(
            self.try_transmit_with_scout(station, network, control_byte, port, data, extra_scout),
            station,
            what,
        )
    }

    pub fn disconnect(&mut self) -> EconetResult<()> {
        self.queues.clear();
        self.transport.disconnect().map_err(|err| transport_error(err.as_ref()))
    }
}

fn transport_error(err: &(dyn std::error::Error + Send + Sync)) -> EconetError {
    EconetError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}

fn check_tx(result: TxResult, station: u8, what: &str) -> EconetResult<()> {
    if result.success {
        Ok(())
    } else {
        Err(EconetError::TransportSendFailure {
            station,
            what: what.to_string(),
            description: result.description,
        })
    }
}
