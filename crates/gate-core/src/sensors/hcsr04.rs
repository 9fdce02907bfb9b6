use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use super::{RangeSensor, SensorError};

/// Longest wait for either edge of the echo pulse. Past roughly four metres
/// the module stops answering anyway.
const ECHO_TIMEOUT: Duration = Duration::from_millis(30);

const SENSOR: &str = "HC-SR04";

/// HC-SR04 style ultrasonic ranger driven by a trigger and an echo pin.
///
/// Measurement busy-waits on the echo pin: the whole loop stalls for the
/// pulse width, bounded by [`ECHO_TIMEOUT`].
pub struct HcSr04<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
    timeout: Duration,
}

impl<T: OutputPin, E: InputPin, D: DelayNs> HcSr04<T, E, D> {
    pub fn new(trigger: T, echo: E, delay: D) -> Self {
        Self {
            trigger,
            echo,
            delay,
            timeout: ECHO_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 2 us low to settle, then a 10 us high pulse.
    fn send_trigger(&mut self) -> Result<(), SensorError> {
        let pin_error = |_| SensorError::ReadFailed {
            sensor: SENSOR,
            operation: "drive trigger pin",
            details: "GPIO error",
        };

        self.trigger.set_low().map_err(pin_error)?;
        self.delay.delay_us(2);
        self.trigger.set_high().map_err(pin_error)?;
        self.delay.delay_us(10);
        self.trigger.set_low().map_err(pin_error)
    }

    /// Spin until the echo pin reaches `level`. Returns `false` on timeout.
    fn wait_for_echo(&mut self, level: bool, since: Instant) -> Result<bool, SensorError> {
        loop {
            let high = self.echo.is_high().map_err(|_| SensorError::ReadFailed {
                sensor: SENSOR,
                operation: "sample echo pin",
                details: "GPIO error",
            })?;
            if high == level {
                return Ok(true);
            }
            if since.elapsed() > self.timeout {
                return Ok(false);
            }
        }
    }
}

impl<T: OutputPin, E: InputPin, D: DelayNs> RangeSensor for HcSr04<T, E, D> {
    fn measure_echo(&mut self) -> Result<Option<u32>, SensorError> {
        // A late echo from the previous ping would otherwise be timed from
        // its middle.
        let idle = Instant::now();
        if !self.wait_for_echo(false, idle)? {
            debug!("{}: echo still high from a previous ping", SENSOR);
            return Ok(None);
        }

        self.send_trigger()?;

        let start = Instant::now();
        if !self.wait_for_echo(true, start)? {
            debug!("{}: no echo before timeout", SENSOR);
            return Ok(None);
        }

        let rise = Instant::now();
        if !self.wait_for_echo(false, rise)? {
            debug!("{}: echo pulse longer than timeout", SENSOR);
            return Ok(None);
        }

        let width = rise.elapsed().as_micros();
        Ok(Some(u32::try_from(width).unwrap_or(u32::MAX)))
    }
}
