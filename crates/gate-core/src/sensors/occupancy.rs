use embedded_hal::digital::InputPin;

use super::{OccupancySensors, SensorError, SlotOccupancy};
use crate::config::SLOT_COUNT;

/// Four IR obstacle sensors, one per slot. A high input means the slot is
/// taken.
pub struct OccupancyBank<P> {
    pins: [P; SLOT_COUNT],
}

impl<P: InputPin> OccupancyBank<P> {
    pub fn new(pins: [P; SLOT_COUNT]) -> Self {
        Self { pins }
    }
}

impl<P: InputPin> OccupancySensors for OccupancyBank<P> {
    fn read(&mut self) -> Result<SlotOccupancy, SensorError> {
        let mut occupied = [false; SLOT_COUNT];
        for (slot, pin) in occupied.iter_mut().zip(self.pins.iter_mut()) {
            *slot = pin.is_high().map_err(|_| SensorError::ReadFailed {
                sensor: "IR slot sensor",
                operation: "sample slot input",
                details: "GPIO error",
            })?;
        }
        Ok(SlotOccupancy::new(occupied))
    }
}
