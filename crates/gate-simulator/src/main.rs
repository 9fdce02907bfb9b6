//! Desktop simulator for the parking gate controller.
//!
//! Runs the real `gate-core` loop against scripted peripherals and a
//! simulated millisecond clock, printing the 16x2 display whenever it
//! changes. Nothing sleeps: a full scenario plays out instantly.
//!
//! # Scenario
//!
//! | Time (s) | Event                                          |
//! |----------|------------------------------------------------|
//! | 1        | Car approaches to 15 cm (LED on)               |
//! | 2        | Car pulls up to 6 cm, prompt shown             |
//! | 3        | Unknown badge tapped, rejected                 |
//! | 6.5      | Authorized badge tapped, gate opens            |
//! | 12       | Car drives through, slot 2 taken               |
//! | 17       | Gate auto-closes after 5 s of nothing in range |
//! | 22.5     | Badge tapped again, lock flips back to locked  |
//! | 26       | Car leaves, slot 4 freed                       |
//!
//! Set `RUST_LOG=debug` to see every phase decision.

use core::convert::Infallible;

use embassy_time::Instant;
use log::info;

use gate_core::app::{Actuators, GateApp, GatePeripherals};
use gate_core::badge::BadgeUid;
use gate_core::config::{DEFAULT_AUTHORIZED_BADGE, GateConfig, SLOT_COUNT};
use gate_core::display::{ROWS, TextGrid};
use gate_core::gate::{ActuatorError, GateActuator, GatePosition};
use gate_core::sensors::{
    BadgeReader, OccupancySensors, RangeSensor, SensorError, SlotOccupancy,
};

// ---------------------------------------------------------------------------
// Scenario constants
// ---------------------------------------------------------------------------

/// Simulated run length.
const RUN_MS: u64 = 32_000;

/// A badge the gate does not know.
const STRANGER_BADGE: &str = "DE AD BE EF";

/// Echo microseconds per centimetre of distance (sound speed round trip).
const ECHO_US_PER_CM: u32 = 59;

#[derive(Debug, Clone, Copy)]
enum Event {
    /// Object in front of the sensor at this many centimetres.
    Distance(u32),
    /// Nothing in front of the sensor.
    Clear,
    /// Card held to the reader (hex UID).
    Tap(&'static str),
    Park(usize),
    Depart(usize),
}

const SCRIPT: &[(u64, Event)] = &[
    (0, Event::Park(0)),
    (0, Event::Park(3)),
    (1_000, Event::Distance(15)),
    (2_000, Event::Distance(6)),
    (3_000, Event::Tap(STRANGER_BADGE)),
    (6_500, Event::Tap(DEFAULT_AUTHORIZED_BADGE)),
    (12_000, Event::Clear),
    (12_000, Event::Park(1)),
    (22_000, Event::Distance(5)),
    (22_500, Event::Tap(DEFAULT_AUTHORIZED_BADGE)),
    (26_000, Event::Clear),
    (26_000, Event::Depart(3)),
];

// ---------------------------------------------------------------------------
// Scripted peripherals
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedRange {
    distance_cm: Option<u32>,
}

impl RangeSensor for ScriptedRange {
    fn measure_echo(&mut self) -> Result<Option<u32>, SensorError> {
        Ok(self.distance_cm.map(|cm| cm * ECHO_US_PER_CM))
    }
}

/// Holds at most one card; it is consumed by the first poll.
#[derive(Default)]
struct ScriptedReader {
    card: Option<BadgeUid>,
}

impl BadgeReader for ScriptedReader {
    fn poll(&mut self) -> Result<Option<BadgeUid>, SensorError> {
        Ok(self.card.take())
    }

    fn end_session(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedSlots {
    occupied: [bool; SLOT_COUNT],
}

impl OccupancySensors for ScriptedSlots {
    fn read(&mut self) -> Result<SlotOccupancy, SensorError> {
        Ok(SlotOccupancy::new(self.occupied))
    }
}

struct SimGate {
    position: GatePosition,
}

impl GateActuator for SimGate {
    fn move_to(&mut self, position: GatePosition) -> Result<(), ActuatorError> {
        self.position = position;
        Ok(())
    }
}

#[derive(Default)]
struct SimLed {
    lit: bool,
}

impl embedded_hal::digital::ErrorType for SimLed {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lit = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.lit = true;
        Ok(())
    }
}

type SimApp = GateApp<ScriptedRange, ScriptedReader, ScriptedSlots, SimGate, SimLed, TextGrid>;

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

fn apply(app: &mut SimApp, event: Event) {
    let inputs = app.inputs_mut();
    match event {
        Event::Distance(cm) => inputs.range.distance_cm = Some(cm),
        Event::Clear => inputs.range.distance_cm = None,
        Event::Tap(uid) => match BadgeUid::parse(uid) {
            Ok(uid) => inputs.reader.card = Some(uid),
            Err(e) => log::warn!("Scenario badge {:?} is malformed: {}", uid, e),
        },
        Event::Park(slot) => inputs.slots.occupied[slot] = true,
        Event::Depart(slot) => inputs.slots.occupied[slot] = false,
    }
}

fn print_frame(now_ms: u64, app: &SimApp) {
    let actuators = app.actuators();
    println!(
        "t={:>6} ms  gate={:<6} lock={:<8} led={}",
        now_ms,
        format!("{:?}", actuators.gate.position),
        format!("{:?}", app.lock()),
        if actuators.indicator.lit { "on" } else { "off" },
    );
    println!("  +----------------+");
    for row in 0..ROWS as usize {
        println!("  |{}|", actuators.display.row(row));
    }
    println!("  +----------------+");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let started: Result<SimApp, _> = GateApp::start(
        GateConfig::DEFAULT,
        Instant::from_millis(0),
        GatePeripherals {
            range: ScriptedRange::default(),
            reader: ScriptedReader::default(),
            slots: ScriptedSlots::default(),
        },
        Actuators {
            gate: SimGate {
                position: GatePosition::Closed,
            },
            indicator: SimLed::default(),
            display: TextGrid::new(),
        },
    );
    let mut app = match started {
        Ok(app) => app,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let step_ms = app.loop_period().as_millis();
    let mut script = SCRIPT.iter().peekable();
    let mut last_frame = None;
    let mut now_ms = 0;

    info!("Simulating {} ms in {} ms steps", RUN_MS, step_ms);

    while now_ms <= RUN_MS {
        while let Some(&(_, event)) = script.next_if(|(at, _)| *at <= now_ms) {
            info!("t={} ms: {:?}", now_ms, event);
            apply(&mut app, event);
        }

        app.run_once(Instant::from_millis(now_ms));

        let frame = (
            app.actuators().display.clone(),
            app.actuators().gate.position,
            app.actuators().indicator.lit,
        );
        if last_frame.as_ref() != Some(&frame) {
            print_frame(now_ms, &app);
            last_frame = Some(frame);
        }

        now_ms += step_ms;
    }
}
