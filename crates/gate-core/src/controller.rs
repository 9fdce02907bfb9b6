//! The gate control loop as a deterministic state machine
//!
//! [`GateController::step`] runs one loop iteration: ranging, access control,
//! inactivity auto-close and status refresh, in that order. The caller
//! supplies the current time and a [`SensorInputs`] source, and gets back the
//! [`Outputs`] to apply to the actuators. Nothing in here sleeps; the open
//! dwell and message hold are deadlines compared against `now`.

use embassy_time::{Duration, Instant};
use log::{debug, info};

use crate::badge::BadgeUid;
use crate::config::GateConfig;
use crate::display::Screen;
use crate::gate::GatePosition;
use crate::ranging::{DistanceConversion, HalfRoundTrip, Zone};
use crate::sensors::SlotOccupancy;

/// Sampled peripheral inputs, read lazily by the controller.
///
/// The badge reader is only polled in the near zone and the slot sensors only
/// when a status refresh is due.
pub trait SensorInputs {
    fn echo_micros(&mut self) -> Option<u32>;
    /// Poll the reader once, ending the card session after a read.
    fn poll_badge(&mut self) -> Option<BadgeUid>;
    fn occupancy(&mut self) -> SlotOccupancy;
}

/// Badge toggle state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    /// Gate closed, next valid badge opens it.
    #[default]
    Locked,
    /// Gate opened by a badge, next valid badge closes it.
    Unlocked,
}

impl Lock {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Locked => Self::Unlocked,
            Self::Unlocked => Self::Locked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVerdict {
    /// Matched; carries the lock state after toggling.
    Accepted(Lock),
    Rejected,
}

/// What one iteration wants done to the outside world.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    /// Presence indicator LED, rewritten every iteration.
    pub indicator: bool,
    pub gate: Option<GatePosition>,
    /// Last screen drawn this iteration, if any.
    pub screen: Option<Screen>,
    pub verdict: Option<BadgeVerdict>,
}

pub struct GateController<C = HalfRoundTrip> {
    config: GateConfig,
    conversion: C,
    lock: Lock,
    distance_cm: Option<u16>,
    zone: Zone,
    /// Last time anything was within the far threshold; `None` once the
    /// auto-close has fired.
    open_time: Option<Instant>,
    last_refresh: Instant,
    dwell_until: Option<Instant>,
    notice_until: Option<Instant>,
}

impl GateController<HalfRoundTrip> {
    pub fn new(config: GateConfig, boot: Instant) -> Self {
        Self::with_conversion(config, HalfRoundTrip, boot)
    }
}

impl<C: DistanceConversion> GateController<C> {
    pub fn with_conversion(config: GateConfig, conversion: C, boot: Instant) -> Self {
        Self {
            config,
            conversion,
            lock: Lock::Locked,
            distance_cm: None,
            zone: Zone::Far,
            open_time: None,
            last_refresh: boot,
            dwell_until: None,
            notice_until: None,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn lock(&self) -> Lock {
        self.lock
    }

    pub fn distance_cm(&self) -> Option<u16> {
        self.distance_cm
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn open_time(&self) -> Option<Instant> {
        self.open_time
    }

    pub fn last_refresh(&self) -> Instant {
        self.last_refresh
    }

    /// Time left on the post-unlock dwell.
    pub fn dwell_remaining(&self, now: Instant) -> Duration {
        remaining(self.dwell_until, now)
    }

    /// Run one loop iteration at `now`.
    pub fn step<I: SensorInputs>(&mut self, now: Instant, inputs: &mut I) -> Outputs {
        let mut outputs = Outputs::default();

        let zone = self.ranging_phase(now, inputs);
        outputs.indicator = zone.is_present();

        if zone == Zone::Near {
            self.access_phase(now, inputs, &mut outputs);
        }
        if zone == Zone::Far {
            self.timeout_phase(now, &mut outputs);
        }
        self.status_phase(now, inputs, &mut outputs);

        outputs
    }

    fn ranging_phase<I: SensorInputs>(&mut self, now: Instant, inputs: &mut I) -> Zone {
        let echo = inputs.echo_micros();
        self.distance_cm = self.conversion.distance_cm(echo);
        let zone = Zone::classify(
            self.distance_cm,
            self.config.near_threshold_cm,
            self.config.far_threshold_cm,
        );

        if zone != self.zone {
            debug!("Zone {:?} -> {:?} ({:?} cm)", self.zone, zone, self.distance_cm);
        }
        self.zone = zone;

        if zone.is_present() {
            self.open_time = Some(now);
        }
        zone
    }

    fn access_phase<I: SensorInputs>(
        &mut self,
        now: Instant,
        inputs: &mut I,
        outputs: &mut Outputs,
    ) {
        // The gate dwell and a showing verdict both hold off the next read.
        let dwelling = deadline_pending(&mut self.dwell_until, now);
        let noticing = deadline_pending(&mut self.notice_until, now);
        if dwelling || noticing {
            return;
        }

        outputs.screen = Some(Screen::Prompt);

        let Some(uid) = inputs.poll_badge() else {
            return;
        };

        let verdict = if uid.matches(self.config.authorized_badge) {
            let position = match self.lock {
                Lock::Locked => {
                    self.dwell_until = Some(now + self.config.open_dwell);
                    GatePosition::Open
                }
                Lock::Unlocked => GatePosition::Closed,
            };
            self.lock = self.lock.toggled();
            outputs.gate = Some(position);
            outputs.screen = Some(Screen::Accepted);
            BadgeVerdict::Accepted(self.lock)
        } else {
            outputs.screen = Some(Screen::Rejected);
            BadgeVerdict::Rejected
        };

        info!("Badge {} -> {:?}", uid.normalized(), verdict);
        self.notice_until = Some(now + self.config.notice_hold);
        outputs.verdict = Some(verdict);
    }

    fn timeout_phase(&mut self, now: Instant, outputs: &mut Outputs) {
        let Some(armed) = self.open_time else {
            return;
        };
        if deadline_pending(&mut self.dwell_until, now) {
            return;
        }
        if now.saturating_duration_since(armed) > self.config.close_delay {
            info!(
                "No presence for {} ms, closing gate",
                self.config.close_delay.as_millis()
            );
            outputs.gate = Some(GatePosition::Closed);
            self.open_time = None;
        }
    }

    fn status_phase<I: SensorInputs>(
        &mut self,
        now: Instant,
        inputs: &mut I,
        outputs: &mut Outputs,
    ) {
        if now.saturating_duration_since(self.last_refresh) < self.config.status_interval {
            return;
        }
        // A showing verdict keeps the screen; the refresh runs once it expires.
        if deadline_pending(&mut self.notice_until, now) {
            return;
        }
        self.last_refresh = now;

        let occupancy = inputs.occupancy();
        debug!("Slot refresh: {} available", occupancy.available_count());
        outputs.screen = Some(Screen::Slots(occupancy));
    }
}

/// Whether `deadline` is still in the future; clears it once it has passed.
fn deadline_pending(deadline: &mut Option<Instant>, now: Instant) -> bool {
    match *deadline {
        Some(until) if now < until => true,
        Some(_) => {
            *deadline = None;
            false
        }
        None => false,
    }
}

fn remaining(deadline: Option<Instant>, now: Instant) -> Duration {
    deadline.map_or(Duration::from_ticks(0), |until| {
        until.saturating_duration_since(now)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const MATCHING: [u8; 4] = [0x77, 0xB6, 0x0E, 0x17];
    const STRANGER: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

    /// Treats the echo value as a distance in centimetres.
    struct Centimetres;

    impl DistanceConversion for Centimetres {
        fn distance_cm(&mut self, echo_us: Option<u32>) -> Option<u16> {
            echo_us.map(|cm| cm as u16)
        }
    }

    #[derive(Default)]
    struct ScriptedInputs {
        distance: Option<u32>,
        taps: VecDeque<BadgeUid>,
        slots: SlotOccupancy,
        polls: usize,
        slot_reads: usize,
    }

    impl ScriptedInputs {
        fn at(distance: u32) -> Self {
            Self {
                distance: Some(distance),
                ..Self::default()
            }
        }

        fn tap(&mut self, bytes: &[u8]) {
            self.taps.push_back(BadgeUid::from_bytes(bytes).unwrap());
        }
    }

    impl SensorInputs for ScriptedInputs {
        fn echo_micros(&mut self) -> Option<u32> {
            self.distance
        }

        fn poll_badge(&mut self) -> Option<BadgeUid> {
            self.polls += 1;
            self.taps.pop_front()
        }

        fn occupancy(&mut self) -> SlotOccupancy {
            self.slot_reads += 1;
            self.slots
        }
    }

    fn controller(config: GateConfig) -> GateController<Centimetres> {
        GateController::with_conversion(config, Centimetres, ms(0))
    }

    fn ms(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    #[test]
    fn test_distance_drives_the_right_branch() {
        for d in 1..=40 {
            let mut gate = controller(GateConfig::DEFAULT);
            let mut inputs = ScriptedInputs::at(d);

            let out = gate.step(ms(100), &mut inputs);

            if d <= 10 {
                assert_eq!(inputs.polls, 1, "d = {d}");
                assert_eq!(out.screen, Some(Screen::Prompt), "d = {d}");
            } else {
                assert_eq!(inputs.polls, 0, "d = {d}");
                assert_eq!(out.screen, None, "d = {d}");
            }

            if d <= 20 {
                assert!(out.indicator, "d = {d}");
                assert_eq!(gate.open_time(), Some(ms(100)), "d = {d}");
            } else {
                assert!(!out.indicator, "d = {d}");
                assert_eq!(gate.open_time(), None, "d = {d}");
            }
            assert_eq!(out.gate, None, "d = {d}");
        }
    }

    #[test]
    fn test_missing_echo_counts_as_far() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::default();

        let out = gate.step(ms(0), &mut inputs);

        assert_eq!(gate.zone(), Zone::Far);
        assert!(!out.indicator);
        assert_eq!(inputs.polls, 0);
    }

    #[test]
    fn test_matching_badge_toggles_lock_in_two_cycles() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);
        assert_eq!(gate.lock(), Lock::Locked);

        inputs.tap(&MATCHING);
        let out = gate.step(ms(0), &mut inputs);
        assert_eq!(out.gate, Some(GatePosition::Open));
        assert_eq!(out.screen, Some(Screen::Accepted));
        assert_eq!(out.verdict, Some(BadgeVerdict::Accepted(Lock::Unlocked)));
        assert_eq!(gate.lock(), Lock::Unlocked);

        // past both the dwell and the message hold
        inputs.tap(&MATCHING);
        let out = gate.step(ms(6000), &mut inputs);
        assert_eq!(out.gate, Some(GatePosition::Closed));
        assert_eq!(out.verdict, Some(BadgeVerdict::Accepted(Lock::Locked)));
        assert_eq!(gate.lock(), Lock::Locked);
    }

    #[test]
    fn test_rejected_badge_changes_nothing() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);

        inputs.tap(&STRANGER);
        let out = gate.step(ms(0), &mut inputs);

        assert_eq!(out.verdict, Some(BadgeVerdict::Rejected));
        assert_eq!(out.screen, Some(Screen::Rejected));
        assert_eq!(out.gate, None);
        assert_eq!(gate.lock(), Lock::Locked);
    }

    #[test]
    fn test_message_hold_pauses_prompt_and_polling() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);

        inputs.tap(&STRANGER);
        gate.step(ms(0), &mut inputs);
        assert_eq!(inputs.polls, 1);

        inputs.tap(&MATCHING);
        let out = gate.step(ms(500), &mut inputs);
        assert_eq!(out.screen, None);
        assert_eq!(inputs.polls, 1);

        // hold is 2000 ms; at 2500 the prompt returns and the queued tap is read
        let out = gate.step(ms(2500), &mut inputs);
        assert_eq!(inputs.polls, 2);
        assert_eq!(out.verdict, Some(BadgeVerdict::Accepted(Lock::Unlocked)));
    }

    #[test]
    fn test_dwell_blocks_rereads_but_not_status() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);

        inputs.tap(&MATCHING);
        gate.step(ms(0), &mut inputs);
        inputs.tap(&MATCHING);

        for t in (500..5000).step_by(500) {
            let out = gate.step(ms(t), &mut inputs);
            assert_eq!(out.gate, None, "t = {t}");
        }
        // slot refreshes kept running through the dwell
        assert_eq!(inputs.slot_reads, 2);
        assert_eq!(inputs.polls, 1);
        assert_eq!(gate.lock(), Lock::Unlocked);

        let out = gate.step(ms(5000), &mut inputs);
        assert_eq!(inputs.polls, 2);
        assert_eq!(out.gate, Some(GatePosition::Closed));
    }

    #[test]
    fn test_auto_close_fires_once_after_delay() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(15);
        gate.step(ms(0), &mut inputs);

        inputs.distance = Some(50);
        let mut closes = 0;
        for t in (500..=12_000).step_by(500) {
            let out = gate.step(ms(t), &mut inputs);
            if out.gate == Some(GatePosition::Closed) {
                assert_eq!(t, 5500, "delay must be strictly exceeded");
                closes += 1;
            }
        }

        assert_eq!(closes, 1);
        assert_eq!(gate.open_time(), None);
    }

    #[test]
    fn test_auto_close_needs_arming() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(100);

        for t in (0..=20_000).step_by(500) {
            assert_eq!(gate.step(ms(t), &mut inputs).gate, None);
        }
    }

    #[test]
    fn test_presence_rearms_auto_close() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(15);
        gate.step(ms(0), &mut inputs);

        inputs.distance = Some(50);
        let out = gate.step(ms(6000), &mut inputs);
        assert_eq!(out.gate, Some(GatePosition::Closed));

        inputs.distance = Some(12);
        gate.step(ms(7000), &mut inputs);
        assert_eq!(gate.open_time(), Some(ms(7000)));

        inputs.distance = Some(50);
        assert_eq!(gate.step(ms(12_000), &mut inputs).gate, None);
        let out = gate.step(ms(12_500), &mut inputs);
        assert_eq!(out.gate, Some(GatePosition::Closed));
    }

    #[test]
    fn test_auto_close_does_not_touch_lock() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);
        inputs.tap(&MATCHING);
        gate.step(ms(0), &mut inputs);

        inputs.distance = Some(50);
        let out = gate.step(ms(6000), &mut inputs);

        assert_eq!(out.gate, Some(GatePosition::Closed));
        assert_eq!(gate.lock(), Lock::Unlocked);
    }

    #[test]
    fn test_dwell_holds_gate_open_against_auto_close() {
        let config = GateConfig::DEFAULT.with_close_delay(Duration::from_millis(1000));
        let mut gate = controller(config);
        let mut inputs = ScriptedInputs::at(5);
        inputs.tap(&MATCHING);
        gate.step(ms(0), &mut inputs);

        inputs.distance = Some(50);
        for t in (500..5000).step_by(500) {
            assert_eq!(gate.step(ms(t), &mut inputs).gate, None, "t = {t}");
        }
        assert_eq!(gate.dwell_remaining(ms(4500)), Duration::from_millis(500));
        let out = gate.step(ms(5000), &mut inputs);
        assert_eq!(out.gate, Some(GatePosition::Closed));
        assert_eq!(gate.dwell_remaining(ms(5000)), Duration::from_ticks(0));
    }

    #[test]
    fn test_status_refreshes_once_per_interval() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(100);
        inputs.slots = SlotOccupancy::new([false, true, false, false]);

        let mut refreshes = std::vec::Vec::new();
        for t in (0..=10_000).step_by(500) {
            if let Some(Screen::Slots(slots)) = gate.step(ms(t), &mut inputs).screen {
                assert_eq!(slots, inputs.slots);
                refreshes.push(t);
            }
        }

        assert_eq!(refreshes, [2000, 4000, 6000, 8000, 10_000]);
        assert_eq!(inputs.slot_reads, 5);
        assert_eq!(gate.last_refresh(), ms(10_000));
    }

    #[test]
    fn test_status_refresh_tolerates_uneven_steps() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(100);

        for t in [700, 1900, 2100, 2600, 3900, 4150, 6000] {
            gate.step(ms(t), &mut inputs);
        }

        // 2100 (>= 2000 since boot), 4150 (>= 2000 since 2100), 6000 falls short
        assert_eq!(inputs.slot_reads, 2);
        assert_eq!(gate.last_refresh(), ms(4150));
    }

    #[test]
    fn test_status_refresh_still_replaces_prompt() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);

        let out = gate.step(ms(2000), &mut inputs);

        assert_eq!(inputs.polls, 1);
        assert!(matches!(out.screen, Some(Screen::Slots(_))));
    }

    #[test]
    fn test_verdict_on_refresh_boundary_is_shown_for_full_hold() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);

        inputs.tap(&STRANGER);
        let out = gate.step(ms(2000), &mut inputs);
        assert_eq!(out.verdict, Some(BadgeVerdict::Rejected));
        assert_eq!(out.screen, Some(Screen::Rejected));
        assert_eq!(inputs.slot_reads, 0);

        for t in [2500, 3000, 3500] {
            assert_eq!(gate.step(ms(t), &mut inputs).screen, None, "t = {t}");
        }
        assert_eq!(inputs.slot_reads, 0);
        assert_eq!(gate.last_refresh(), ms(0));

        // the postponed refresh wins over the prompt on the first free iteration
        let out = gate.step(ms(4000), &mut inputs);
        assert!(matches!(out.screen, Some(Screen::Slots(_))));
        assert_eq!(inputs.slot_reads, 1);
        assert_eq!(gate.last_refresh(), ms(4000));
    }

    #[test]
    fn test_verdict_between_refreshes_postpones_next_one() {
        let mut gate = controller(GateConfig::DEFAULT);
        let mut inputs = ScriptedInputs::at(5);

        inputs.tap(&MATCHING);
        let out = gate.step(ms(1500), &mut inputs);
        assert_eq!(out.screen, Some(Screen::Accepted));

        // the 2000 ms refresh is held back until the message has been up 2000 ms
        assert_eq!(gate.step(ms(2000), &mut inputs).screen, None);
        assert_eq!(gate.step(ms(3000), &mut inputs).screen, None);
        let out = gate.step(ms(3500), &mut inputs);
        assert!(matches!(out.screen, Some(Screen::Slots(_))));
        assert_eq!(inputs.slot_reads, 1);
    }

    #[test]
    fn test_remaining_time() {
        assert_eq!(remaining(None, ms(10)), Duration::from_ticks(0));
        assert_eq!(remaining(Some(ms(500)), ms(200)), Duration::from_millis(300));
        assert_eq!(remaining(Some(ms(500)), ms(900)), Duration::from_ticks(0));
    }
}
