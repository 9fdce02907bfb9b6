//! MFRC522 badge reader adapter
//!
//! Wraps the `mfrc522` driver behind [`BadgeReader`]. If the chip does not
//! come up at boot the adapter stays in place and simply never sees a card.

use gate_core::badge::BadgeUid;
use gate_core::sensors::{BadgeReader, SensorError};
use log::{debug, info, warn};
use mfrc522::comm::Interface;
use mfrc522::{Initialized, Mfrc522};

const SENSOR: &str = "MFRC522";

pub struct Mfrc522Reader<COMM: Interface> {
    device: Option<Mfrc522<COMM, Initialized>>,
}

impl<COMM: Interface> Mfrc522Reader<COMM> {
    /// Soft-resets and configures the chip. Failure is logged, not returned.
    pub fn new(comm: COMM) -> Self {
        let device = match Mfrc522::new(comm).init() {
            Ok(mut device) => {
                match device.version() {
                    Ok(version) => info!("{} ready, version {:#04x}", SENSOR, version),
                    Err(_) => warn!("{} ready but version register unreadable", SENSOR),
                }
                Some(device)
            }
            Err(_) => {
                warn!("{} initialization failed, badge reads disabled", SENSOR);
                None
            }
        };
        Self { device }
    }

    pub fn is_ready(&self) -> bool {
        self.device.is_some()
    }
}

impl<COMM: Interface> BadgeReader for Mfrc522Reader<COMM> {
    fn poll(&mut self) -> Result<Option<BadgeUid>, SensorError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(None);
        };

        // No card answers REQA with a timeout, which is the common case
        let Ok(atqa) = device.new_card_present() else {
            return Ok(None);
        };

        let uid = match device.select(&atqa) {
            Ok(uid) => uid,
            Err(_) => {
                debug!("Card answered REQA but select failed");
                return Ok(None);
            }
        };

        BadgeUid::from_bytes(uid.as_bytes())
            .map(Some)
            .map_err(|_| SensorError::ReadFailed {
                sensor: SENSOR,
                operation: "select card",
                details: "UID length out of range",
            })
    }

    fn end_session(&mut self) -> Result<(), SensorError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };

        device.hlta().map_err(|_| SensorError::ReadFailed {
            sensor: SENSOR,
            operation: "halt card",
            details: "HLTA not acknowledged",
        })?;
        device.stop_crypto1().map_err(|_| SensorError::ReadFailed {
            sensor: SENSOR,
            operation: "stop crypto",
            details: "register write failed",
        })
    }
}
