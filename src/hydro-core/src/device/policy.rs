// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Pump control policy.

use super::state::{Actuation, Mode, Reading, Thresholds};

/// Decide the next pump state.
///
/// Manual mode never actuates on its own. Automatic mode switches the pump
/// on below the low threshold and off above the high one; inside the band
/// the current state is kept so the pump does not chatter at a boundary.
pub fn decide(
    mode: Mode,
    reading: Reading,
    thresholds: &Thresholds,
    current: Actuation,
) -> Actuation {
    match mode {
        Mode::Manual => current,
        Mode::Automatic => {
            let value = reading.value();
            if value < thresholds.low() {
                Actuation::Active
            } else if value > thresholds.high() {
                Actuation::Inactive
            } else {
                current
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> Thresholds {
        Thresholds::new(30, 70).unwrap()
    }

    #[test]
    fn test_manual_is_noop() {
        for value in 0..=100 {
            let reading = Reading::clamped(value);
            for current in [Actuation::Active, Actuation::Inactive] {
                assert_eq!(decide(Mode::Manual, reading, &band(), current), current);
            }
        }
    }

    #[test]
    fn test_automatic_below_low_activates() {
        for value in 0..30 {
            assert_eq!(
                decide(Mode::Automatic, Reading::clamped(value), &band(), Actuation::Inactive),
                Actuation::Active
            );
        }
    }

    #[test]
    fn test_automatic_above_high_deactivates() {
        for value in 71..=100 {
            assert_eq!(
                decide(Mode::Automatic, Reading::clamped(value), &band(), Actuation::Active),
                Actuation::Inactive
            );
        }
    }

    #[test]
    fn test_automatic_band_keeps_current() {
        for value in 30..=70 {
            let reading = Reading::clamped(value);
            assert_eq!(
                decide(Mode::Automatic, reading, &band(), Actuation::Active),
                Actuation::Active
            );
            assert_eq!(
                decide(Mode::Automatic, reading, &band(), Actuation::Inactive),
                Actuation::Inactive
            );
        }
    }
}
