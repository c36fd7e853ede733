use crate::com::Driver;
use crate::EconetResult;

const NOTIFY_CONTROL_BYTE: u8 = 0x85;
const NOTIFY_PORT: u8 = 0x00;

/// Sends `message` to the screen of `station`, one character per immediate operation.
pub fn notify(driver: &mut Driver, station: u8, message: &str) -> EconetResult<()> {
    for ch in message.bytes() {
        driver.transmit_with_scout(station, 0, NOTIFY_CONTROL_BYTE, NOTIFY_PORT, &[ch], &[0x00, 0x00, ch, 0x00], "notify")?;
    }
    Ok(())
}
