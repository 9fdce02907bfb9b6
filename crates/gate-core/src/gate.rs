//! Gate actuation
//!
//! The gate arm is a hobby servo with no position feedback: it is told an
//! angle and assumed to get there.

use embedded_hal::pwm::SetDutyCycle;
use log::info;
use thiserror_no_std::Error;

/// Servo frame length at 50 Hz.
const SERVO_PERIOD_US: u16 = 20_000;
/// Pulse width for 0 degrees.
const SERVO_MIN_PULSE_US: u16 = 544;
/// Pulse width for 180 degrees.
const SERVO_MAX_PULSE_US: u16 = 2400;
const SERVO_MAX_ANGLE: u16 = 180;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("{actuator} rejected the command: {details}")]
    CommandFailed {
        actuator: &'static str,
        details: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePosition {
    Closed,
    Open,
}

impl GatePosition {
    pub const fn angle_degrees(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 90,
        }
    }
}

pub trait GateActuator {
    fn move_to(&mut self, position: GatePosition) -> Result<(), ActuatorError>;
}

/// Positional servo on a 50 Hz PWM channel.
pub struct Servo<P> {
    pwm: P,
}

impl<P: SetDutyCycle> Servo<P> {
    /// The channel must already be configured for a 20 ms period.
    pub fn new(pwm: P) -> Self {
        Self { pwm }
    }

    /// Angles above 180 degrees are clamped.
    pub fn write_angle(&mut self, degrees: u8) -> Result<(), ActuatorError> {
        let pulse_us = pulse_width_us(degrees);
        self.pwm
            .set_duty_cycle_fraction(pulse_us, SERVO_PERIOD_US)
            .map_err(|_| ActuatorError::CommandFailed {
                actuator: "servo",
                details: "PWM duty update failed",
            })
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> GateActuator for Servo<P> {
    fn move_to(&mut self, position: GatePosition) -> Result<(), ActuatorError> {
        info!(
            "Gate servo -> {:?} ({} deg)",
            position,
            position.angle_degrees()
        );
        self.write_angle(position.angle_degrees())
    }
}

/// Linear map of 0..=180 degrees onto the pulse range.
fn pulse_width_us(degrees: u8) -> u16 {
    let degrees = u16::from(degrees).min(SERVO_MAX_ANGLE);
    let span = u32::from(SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US);
    let offset = span * u32::from(degrees) / u32::from(SERVO_MAX_ANGLE);
    // offset <= span, which fits u16
    SERVO_MIN_PULSE_US + offset as u16
}
