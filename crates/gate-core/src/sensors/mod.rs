mod hcsr04;
mod occupancy;

use thiserror_no_std::Error;

use crate::badge::BadgeUid;
use crate::config::SLOT_COUNT;

pub use hcsr04::HcSr04;
pub use occupancy::OccupancyBank;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} read failed while trying to {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} timed out while trying to {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// Ultrasonic ranging: one trigger, one echo measurement.
pub trait RangeSensor {
    /// Echo pulse width in microseconds, `None` when nothing answered.
    fn measure_echo(&mut self) -> Result<Option<u32>, SensorError>;
}

/// RFID reader that is polled once per loop iteration.
pub trait BadgeReader {
    /// Single non-blocking check for a card. `Ok(None)` covers both "no card"
    /// and "card present but unreadable".
    fn poll(&mut self) -> Result<Option<BadgeUid>, SensorError>;

    /// Halt the card and stop crypto so the next tap is read fresh.
    fn end_session(&mut self) -> Result<(), SensorError>;
}

/// The bank of binary slot sensors.
pub trait OccupancySensors {
    fn read(&mut self) -> Result<SlotOccupancy, SensorError>;
}

/// Snapshot of which parking slots are taken.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupancy {
    occupied: [bool; SLOT_COUNT],
}

impl SlotOccupancy {
    pub const fn new(occupied: [bool; SLOT_COUNT]) -> Self {
        Self { occupied }
    }

    /// `slot` is zero based.
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied.get(slot).copied().unwrap_or(false)
    }

    pub fn available_count(&self) -> usize {
        self.occupied.iter().filter(|taken| !**taken).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.occupied.iter().copied()
    }
}
