//! Binds the controller to real (or simulated) peripherals
//!
//! [`GateApp`] owns the controller, the input peripherals and the actuators.
//! Every peripheral failure is logged and absorbed here: a failed echo reads
//! as "nothing in range", a failed badge poll as "no card", a failed slot
//! read as "all free", and a failed actuator command is simply dropped. The
//! loop never stops. The one hard failure is a configuration that does not
//! validate, which [`GateApp::start`] refuses.

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{OutputPin, PinState};
use log::{error, info, warn};

use crate::badge::BadgeUid;
use crate::config::{ConfigError, GateConfig};
use crate::controller::{GateController, Lock, Outputs, SensorInputs};
use crate::display::CharDisplay;
use crate::gate::{GateActuator, GatePosition};
use crate::ranging::{DistanceConversion, HalfRoundTrip};
use crate::sensors::{BadgeReader, OccupancySensors, RangeSensor, SlotOccupancy};

/// The input side of the gate.
pub struct GatePeripherals<R, B, O> {
    pub range: R,
    pub reader: B,
    pub slots: O,
}

impl<R, B, O> SensorInputs for GatePeripherals<R, B, O>
where
    R: RangeSensor,
    B: BadgeReader,
    O: OccupancySensors,
{
    fn echo_micros(&mut self) -> Option<u32> {
        self.range.measure_echo().unwrap_or_else(|e| {
            warn!("Ranging failed: {}", e);
            None
        })
    }

    fn poll_badge(&mut self) -> Option<BadgeUid> {
        let uid = match self.reader.poll() {
            Ok(Some(uid)) => uid,
            Ok(None) => return None,
            Err(e) => {
                warn!("Badge poll failed: {}", e);
                return None;
            }
        };

        if let Err(e) = self.reader.end_session() {
            warn!("Ending badge session failed: {}", e);
        }
        Some(uid)
    }

    fn occupancy(&mut self) -> SlotOccupancy {
        self.slots.read().unwrap_or_else(|e| {
            warn!("Slot sensors failed: {}", e);
            SlotOccupancy::default()
        })
    }
}

/// The output side of the gate.
pub struct Actuators<G, L, D> {
    pub gate: G,
    pub indicator: L,
    pub display: D,
}

impl<G, L, D> Actuators<G, L, D>
where
    G: GateActuator,
    L: OutputPin,
    D: CharDisplay,
{
    pub fn apply(&mut self, outputs: &Outputs) {
        if self
            .indicator
            .set_state(PinState::from(outputs.indicator))
            .is_err()
        {
            warn!("Indicator pin write failed");
        }

        if let Some(position) = outputs.gate {
            self.move_gate(position);
        }

        if let Some(screen) = outputs.screen {
            if let Err(e) = screen.render(&mut self.display) {
                warn!("Rendering {:?} failed: {}", screen, e);
            }
        }
    }

    fn move_gate(&mut self, position: GatePosition) {
        if let Err(e) = self.gate.move_to(position) {
            warn!("Gate command {:?} failed: {}", position, e);
        }
    }
}

pub struct GateApp<R, B, O, G, L, D, C = HalfRoundTrip> {
    controller: GateController<C>,
    inputs: GatePeripherals<R, B, O>,
    actuators: Actuators<G, L, D>,
}

impl<R, B, O, G, L, D> GateApp<R, B, O, G, L, D, HalfRoundTrip>
where
    R: RangeSensor,
    B: BadgeReader,
    O: OccupancySensors,
    G: GateActuator,
    L: OutputPin,
    D: CharDisplay,
{
    /// Closes the gate, blanks the display and arms the controller at `boot`.
    ///
    /// Refuses an inconsistent configuration before touching any actuator.
    pub fn start(
        config: GateConfig,
        boot: Instant,
        inputs: GatePeripherals<R, B, O>,
        actuators: Actuators<G, L, D>,
    ) -> Result<Self, ConfigError> {
        let controller = GateController::new(config, boot);
        Self::with_controller(controller, inputs, actuators)
    }
}

impl<R, B, O, G, L, D, C> GateApp<R, B, O, G, L, D, C>
where
    R: RangeSensor,
    B: BadgeReader,
    O: OccupancySensors,
    G: GateActuator,
    L: OutputPin,
    D: CharDisplay,
    C: DistanceConversion,
{
    pub fn with_controller(
        controller: GateController<C>,
        inputs: GatePeripherals<R, B, O>,
        mut actuators: Actuators<G, L, D>,
    ) -> Result<Self, ConfigError> {
        controller.config().validate().map_err(|e| {
            error!("Gate configuration rejected: {}", e);
            e
        })?;

        actuators.move_gate(GatePosition::Closed);
        if let Err(e) = actuators.display.clear() {
            warn!("Clearing display failed: {}", e);
        }
        info!(
            "Gate ready: near {} cm, far {} cm",
            controller.config().near_threshold_cm,
            controller.config().far_threshold_cm
        );

        Ok(Self {
            controller,
            inputs,
            actuators,
        })
    }

    /// One loop iteration. Returns what was applied, for tracing.
    pub fn run_once(&mut self, now: Instant) -> Outputs {
        let outputs = self.controller.step(now, &mut self.inputs);
        self.actuators.apply(&outputs);
        outputs
    }

    pub fn loop_period(&self) -> Duration {
        self.controller.config().loop_period
    }

    pub fn lock(&self) -> Lock {
        self.controller.lock()
    }

    pub fn controller(&self) -> &GateController<C> {
        &self.controller
    }

    pub fn inputs_mut(&mut self) -> &mut GatePeripherals<R, B, O> {
        &mut self.inputs
    }

    pub fn actuators(&self) -> &Actuators<G, L, D> {
        &self.actuators
    }
}
