//! Compile-time configuration for the gate controller
//!
//! Every tunable of the control loop lives in [`GateConfig`]. The firmware
//! builds its configuration from [`GateConfig::DEFAULT`] at compile time; the
//! simulator and tests override individual fields through the `with_*`
//! helpers.

use embassy_time::Duration;
use thiserror_no_std::Error;

use crate::badge::BadgeUid;

/// Number of parking slots watched by the occupancy sensors.
pub const SLOT_COUNT: usize = 4;

/// The single badge accepted when no override is supplied at build time.
pub const DEFAULT_AUTHORIZED_BADGE: &str = "77 B6 0E 17";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("near threshold must be non-zero")]
    ZeroNearThreshold,
    #[error("near threshold {near} cm must be below far threshold {far} cm")]
    ThresholdOrder { near: u16, far: u16 },
    #[error("{name} must be non-zero")]
    ZeroInterval { name: &'static str },
    #[error("authorized badge is not a normalized UID")]
    MalformedBadge,
}

/// Thresholds, delays and the authorized credential for one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Distance at or below which the access phase runs.
    pub near_threshold_cm: u16,
    /// Distance above which nothing is considered present.
    pub far_threshold_cm: u16,
    /// Inactivity before an armed gate is closed.
    pub close_delay: Duration,
    /// Cadence of the parking slot status refresh.
    pub status_interval: Duration,
    /// Pause between loop iterations.
    pub loop_period: Duration,
    /// How long the gate is held open after an unlock.
    pub open_dwell: Duration,
    /// How long an acceptance or rejection message stays up.
    pub notice_hold: Duration,
    /// Normalized UID of the accepted badge, e.g. `"77 B6 0E 17"`.
    pub authorized_badge: &'static str,
}

impl GateConfig {
    pub const DEFAULT: Self = Self {
        near_threshold_cm: 10,
        far_threshold_cm: 20,
        close_delay: Duration::from_millis(5000),
        status_interval: Duration::from_millis(2000),
        loop_period: Duration::from_millis(500),
        open_dwell: Duration::from_millis(5000),
        notice_hold: Duration::from_millis(2000),
        authorized_badge: DEFAULT_AUTHORIZED_BADGE,
    };

    pub const fn with_thresholds(mut self, near_cm: u16, far_cm: u16) -> Self {
        self.near_threshold_cm = near_cm;
        self.far_threshold_cm = far_cm;
        self
    }

    pub const fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    pub const fn with_open_dwell(mut self, dwell: Duration) -> Self {
        self.open_dwell = dwell;
        self
    }

    pub const fn with_notice_hold(mut self, hold: Duration) -> Self {
        self.notice_hold = hold;
        self
    }

    pub const fn with_authorized_badge(mut self, badge: &'static str) -> Self {
        self.authorized_badge = badge;
        self
    }

    /// Check the invariants the controller relies on.
    ///
    /// The authorized badge must already be in normalized form (uppercase,
    /// two digits per byte, single spaces), since matching is an exact
    /// string comparison.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near_threshold_cm == 0 {
            return Err(ConfigError::ZeroNearThreshold);
        }
        if self.near_threshold_cm >= self.far_threshold_cm {
            return Err(ConfigError::ThresholdOrder {
                near: self.near_threshold_cm,
                far: self.far_threshold_cm,
            });
        }

        let intervals = [
            ("close delay", self.close_delay),
            ("status interval", self.status_interval),
            ("loop period", self.loop_period),
        ];
        for (name, interval) in intervals {
            if interval.as_ticks() == 0 {
                return Err(ConfigError::ZeroInterval { name });
            }
        }

        match BadgeUid::parse(self.authorized_badge) {
            Ok(uid) if uid.normalized().as_str() == self.authorized_badge => Ok(()),
            _ => Err(ConfigError::MalformedBadge),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
