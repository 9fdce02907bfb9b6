//! Echo-to-distance conversion and presence zones
//!
//! The controller never looks at raw echo timings directly: it goes through a
//! [`DistanceConversion`], so a smoothing or outlier filter can be slotted in
//! without touching the state machine. The stock [`HalfRoundTrip`]
//! conversion uses a single sample, unfiltered.

/// Speed of sound in centimetres per microsecond.
const SOUND_CM_PER_US: f32 = 0.034;

/// Turns an echo pulse width into a distance.
pub trait DistanceConversion {
    /// `echo_us` is `None` when the sensor saw no echo before its timeout.
    fn distance_cm(&mut self, echo_us: Option<u32>) -> Option<u16>;
}

/// `duration * 0.034 / 2`, truncated to whole centimetres.
#[derive(Debug, Default, Clone, Copy)]
pub struct HalfRoundTrip;

impl DistanceConversion for HalfRoundTrip {
    fn distance_cm(&mut self, echo_us: Option<u32>) -> Option<u16> {
        let echo_us = echo_us.filter(|us| *us > 0)?;
        // float-to-int casts saturate, so very long echoes clamp to u16::MAX
        Some((echo_us as f32 * SOUND_CM_PER_US / 2.0) as u16)
    }
}

/// Where the nearest object sits relative to the two thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// `0 < d <= near`: the access phase runs.
    Near,
    /// `near < d <= far`: present, but too far to badge.
    Approach,
    /// `d > far`, or no usable reading.
    Far,
}

impl Zone {
    pub fn classify(distance_cm: Option<u16>, near_cm: u16, far_cm: u16) -> Self {
        match distance_cm {
            None | Some(0) => Self::Far,
            Some(d) if d <= near_cm => Self::Near,
            Some(d) if d <= far_cm => Self::Approach,
            Some(_) => Self::Far,
        }
    }

    /// Anything within the far threshold.
    pub const fn is_present(self) -> bool {
        matches!(self, Self::Near | Self::Approach)
    }
}
