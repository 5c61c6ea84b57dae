// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Device state machine.
//!
//! All mutations of the device state go through [`DeviceMachine::handle`].
//! The machine performs no I/O: it returns the publications the caller has
//! to make after the transition.

use std::fmt;

use super::command::DeviceCommand;
use super::policy::decide;
use super::response::{DeviceError, DeviceResult};
use super::sensor::SensorModel;
use super::state::{Actuation, DeviceState, Mode, Thresholds, UpdatePeriod};

/// Inputs that can change the device state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Sampling timer fired.
    Tick,
    /// Mode assertion received from the bus.
    ModeAsserted(Mode),
    /// Pump override received from the bus.
    OverrideReceived(Actuation),
    /// Operator selected a mode.
    OperatorSetMode(Mode),
    /// Operator pressed the pump button.
    OperatorTogglePump,
    /// Operator edited the threshold band.
    OperatorSetThresholds { low: u8, high: u8 },
    /// Operator edited the sampling period.
    OperatorSetUpdatePeriod(u64),
}

impl DeviceEvent {
    /// Map an operator command to its event. `GetSnapshot` has none.
    pub fn from_command(cmd: DeviceCommand) -> Option<Self> {
        match cmd {
            DeviceCommand::GetSnapshot => None,
            DeviceCommand::SetMode(mode) => Some(Self::OperatorSetMode(mode)),
            DeviceCommand::TogglePump => Some(Self::OperatorTogglePump),
            DeviceCommand::SetUpdatePeriod(secs) => Some(Self::OperatorSetUpdatePeriod(secs)),
            DeviceCommand::SetThresholds { low, high } => {
                Some(Self::OperatorSetThresholds { low, high })
            }
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tick => write!(f, "Tick"),
            Self::ModeAsserted(mode) => write!(f, "ModeAsserted({mode})"),
            Self::OverrideReceived(act) => write!(f, "OverrideReceived({act})"),
            Self::OperatorSetMode(mode) => write!(f, "OperatorSetMode({mode})"),
            Self::OperatorTogglePump => write!(f, "OperatorTogglePump"),
            Self::OperatorSetThresholds { low, high } => {
                write!(f, "OperatorSetThresholds({low}, {high})")
            }
            Self::OperatorSetUpdatePeriod(secs) => write!(f, "OperatorSetUpdatePeriod({secs}s)"),
        }
    }
}

/// Publication requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PublishReading(super::state::Reading),
    PublishMode(Mode),
    PublishPump(Actuation),
}

/// The device state machine.
#[derive(Debug)]
pub struct DeviceMachine {
    state: DeviceState,
    sensor: SensorModel,
}

impl DeviceMachine {
    pub fn new(state: DeviceState, sensor: SensorModel) -> Self {
        Self { state, sensor }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Apply an event. On error the state is left untouched.
    pub fn handle(&mut self, event: DeviceEvent) -> DeviceResult<Vec<Effect>> {
        let before = self.state.actuation;
        let mut effects = Vec::new();

        match event {
            DeviceEvent::Tick => {
                let state = &mut self.state;
                state.reading = self.sensor.next_reading(state.reading, state.actuation);
                state.actuation =
                    decide(state.mode, state.reading, &state.thresholds, state.actuation);
                effects.push(Effect::PublishReading(state.reading));
            }
            DeviceEvent::ModeAsserted(mode) => {
                self.state.mode = mode;
            }
            DeviceEvent::OverrideReceived(actuation) => {
                if self.state.mode != Mode::Manual {
                    return Err(DeviceError::invalid_state(format!(
                        "pump override '{actuation}' ignored in {} mode",
                        self.state.mode
                    )));
                }
                self.state.actuation = actuation;
            }
            DeviceEvent::OperatorSetMode(mode) => {
                self.state.mode = mode;
                effects.push(Effect::PublishMode(mode));
            }
            DeviceEvent::OperatorTogglePump => {
                if self.state.mode != Mode::Manual {
                    return Err(DeviceError::invalid_state(
                        "pump can only be toggled in Manual mode",
                    ));
                }
                self.state.actuation = self.state.actuation.toggled();
            }
            DeviceEvent::OperatorSetThresholds { low, high } => {
                if self.state.mode != Mode::Automatic {
                    return Err(DeviceError::invalid_state(
                        "thresholds can only be edited in Automatic mode",
                    ));
                }
                self.state.thresholds = Thresholds::new(low, high)?;
            }
            DeviceEvent::OperatorSetUpdatePeriod(secs) => {
                self.state.update_period = UpdatePeriod::from_secs(secs)?;
            }
        }

        if self.state.actuation != before {
            effects.push(Effect::PublishPump(self.state.actuation));
        }
        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sensor::SensorRanges;
    use crate::device::state::Reading;

    fn machine_with(mode: Mode, reading: i32, actuation: Actuation) -> DeviceMachine {
        let state = DeviceState {
            mode,
            reading: Reading::clamped(reading),
            actuation,
            ..DeviceState::default()
        };
        DeviceMachine::new(state, SensorModel::seeded(3, SensorRanges::default()))
    }

    #[test]
    fn test_tick_publishes_reading() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        let effects = machine.handle(DeviceEvent::Tick).unwrap();
        let reading = machine.state().reading;
        assert_eq!(effects, vec![Effect::PublishReading(reading)]);
        assert!(reading.value() < 50);
    }

    #[test]
    fn test_manual_tick_never_actuates() {
        let mut machine = machine_with(Mode::Manual, 10, Actuation::Inactive);
        for _ in 0..10 {
            machine.handle(DeviceEvent::Tick).unwrap();
            assert_eq!(machine.state().actuation, Actuation::Inactive);
        }
        assert_eq!(machine.state().reading.value(), 0);
    }

    #[test]
    fn test_automatic_cycle_with_hysteresis() {
        let mut machine = machine_with(Mode::Automatic, 25, Actuation::Inactive);

        let effects = machine.handle(DeviceEvent::Tick).unwrap();
        assert_eq!(machine.state().actuation, Actuation::Active);
        assert!(effects.contains(&Effect::PublishPump(Actuation::Active)));

        // Pump stays on across the band until the reading passes the high mark.
        let mut ticks = 0;
        while machine.state().reading.value() <= 70 {
            assert_eq!(machine.state().actuation, Actuation::Active);
            machine.handle(DeviceEvent::Tick).unwrap();
            ticks += 1;
            assert!(ticks < 50, "reading never rose above 70");
        }
        assert_eq!(machine.state().actuation, Actuation::Inactive);
    }

    #[test]
    fn test_override_applies_in_manual() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);

        let effects = machine
            .handle(DeviceEvent::OverrideReceived(Actuation::Active))
            .unwrap();
        assert_eq!(machine.state().actuation, Actuation::Active);
        assert_eq!(effects, vec![Effect::PublishPump(Actuation::Active)]);

        machine
            .handle(DeviceEvent::OverrideReceived(Actuation::Inactive))
            .unwrap();
        assert_eq!(machine.state().actuation, Actuation::Inactive);
    }

    #[test]
    fn test_override_rejected_in_automatic() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        machine
            .handle(DeviceEvent::OverrideReceived(Actuation::Active))
            .unwrap();
        machine
            .handle(DeviceEvent::ModeAsserted(Mode::Automatic))
            .unwrap();

        for _ in 0..3 {
            let result = machine.handle(DeviceEvent::OverrideReceived(Actuation::Inactive));
            assert!(matches!(result, Err(DeviceError::InvalidState(_))));
            assert_eq!(machine.state().actuation, Actuation::Active);
        }
    }

    #[test]
    fn test_remote_mode_is_not_republished() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        let effects = machine
            .handle(DeviceEvent::ModeAsserted(Mode::Automatic))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(machine.state().mode, Mode::Automatic);
    }

    #[test]
    fn test_operator_mode_is_published() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        let effects = machine
            .handle(DeviceEvent::OperatorSetMode(Mode::Automatic))
            .unwrap();
        assert_eq!(effects, vec![Effect::PublishMode(Mode::Automatic)]);
    }

    #[test]
    fn test_toggle_only_in_manual() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        let effects = machine.handle(DeviceEvent::OperatorTogglePump).unwrap();
        assert_eq!(effects, vec![Effect::PublishPump(Actuation::Active)]);

        machine
            .handle(DeviceEvent::OperatorSetMode(Mode::Automatic))
            .unwrap();
        assert!(machine.handle(DeviceEvent::OperatorTogglePump).is_err());
        assert_eq!(machine.state().actuation, Actuation::Active);
    }

    #[test]
    fn test_thresholds_retained_on_rejection() {
        let mut machine = machine_with(Mode::Automatic, 50, Actuation::Inactive);
        machine
            .handle(DeviceEvent::OperatorSetThresholds { low: 20, high: 80 })
            .unwrap();

        let result = machine.handle(DeviceEvent::OperatorSetThresholds { low: 60, high: 40 });
        assert!(matches!(result, Err(DeviceError::InvalidThreshold(_))));
        assert_eq!(machine.state().thresholds, Thresholds::new(20, 80).unwrap());
    }

    #[test]
    fn test_thresholds_locked_in_manual() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        let result = machine.handle(DeviceEvent::OperatorSetThresholds { low: 20, high: 80 });
        assert!(matches!(result, Err(DeviceError::InvalidState(_))));
        assert_eq!(machine.state().thresholds, Thresholds::default());
    }

    #[test]
    fn test_thresholds_survive_mode_round_trip() {
        let mut machine = machine_with(Mode::Automatic, 50, Actuation::Inactive);
        machine
            .handle(DeviceEvent::OperatorSetThresholds { low: 40, high: 60 })
            .unwrap();
        machine.handle(DeviceEvent::ModeAsserted(Mode::Manual)).unwrap();
        machine
            .handle(DeviceEvent::ModeAsserted(Mode::Automatic))
            .unwrap();
        assert_eq!(machine.state().thresholds, Thresholds::new(40, 60).unwrap());
    }

    #[test]
    fn test_update_period_validation() {
        let mut machine = machine_with(Mode::Manual, 50, Actuation::Inactive);
        machine
            .handle(DeviceEvent::OperatorSetUpdatePeriod(10))
            .unwrap();
        assert_eq!(machine.state().update_period.secs(), 10);
        assert!(machine
            .handle(DeviceEvent::OperatorSetUpdatePeriod(0))
            .is_err());
        assert_eq!(machine.state().update_period.secs(), 10);
    }
}
