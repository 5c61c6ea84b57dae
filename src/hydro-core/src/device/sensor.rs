// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Simulated moisture sensor.
//!
//! While the pump runs the soil gets wetter, otherwise it dries out. Each
//! step draws the change uniformly from a configured range.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::state::{Actuation, Reading, READING_MAX};

/// Step ranges used by the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRanges {
    /// Increase per tick while the pump is active.
    pub rise: RangeInclusive<u8>,
    /// Decrease per tick while the pump is inactive.
    pub fall: RangeInclusive<u8>,
}

impl SensorRanges {
    pub fn new(rise: RangeInclusive<u8>, fall: RangeInclusive<u8>) -> Result<Self, String> {
        for (name, range) in [("rise", &rise), ("fall", &fall)] {
            if range.is_empty() || *range.start() == 0 || *range.end() > READING_MAX {
                return Err(format!(
                    "{name} range {}..={} must be non-empty and within 1..={READING_MAX}",
                    range.start(),
                    range.end()
                ));
            }
        }
        Ok(Self { rise, fall })
    }
}

impl Default for SensorRanges {
    fn default() -> Self {
        Self {
            rise: 5..=25,
            fall: 5..=10,
        }
    }
}

pub struct SensorModel {
    ranges: SensorRanges,
    rng: StdRng,
}

impl SensorModel {
    /// Deterministic model for reproducible runs and tests.
    pub fn seeded(seed: u64, ranges: SensorRanges) -> Self {
        Self {
            ranges,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy(ranges: SensorRanges) -> Self {
        Self {
            ranges,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn ranges(&self) -> &SensorRanges {
        &self.ranges
    }

    /// Compute the reading after one tick.
    pub fn next_reading(&mut self, current: Reading, actuation: Actuation) -> Reading {
        let current = i32::from(current.value());
        match actuation {
            Actuation::Active => {
                let step = self.rng.gen_range(self.ranges.rise.clone());
                Reading::clamped(current + i32::from(step))
            }
            Actuation::Inactive => {
                let step = self.rng.gen_range(self.ranges.fall.clone());
                Reading::clamped(current - i32::from(step))
            }
        }
    }
}

impl std::fmt::Debug for SensorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorModel")
            .field("ranges", &self.ranges)
            .finish_non_exhaustive()
    }
}
