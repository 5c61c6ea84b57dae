// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Topic filter matching.
//!
//! Filters follow the MQTT conventions: levels are separated by `/`,
//! `+` matches exactly one level and `#` matches any remaining levels
//! (including none) and may only appear as the last level.

use super::{BusError, BusResult};

/// Check that `topic` is a concrete topic suitable for publishing.
pub fn validate_topic(topic: &str) -> BusResult<()> {
    if topic.is_empty() {
        return Err(BusError::invalid_topic(topic, "topic is empty"));
    }
    if topic.contains(['+', '#']) {
        return Err(BusError::invalid_topic(
            topic,
            "wildcards are not allowed when publishing",
        ));
    }
    Ok(())
}

/// Check that `filter` is a well-formed subscription filter.
pub fn validate_filter(filter: &str) -> BusResult<()> {
    if filter.is_empty() {
        return Err(BusError::invalid_topic(filter, "filter is empty"));
    }
    let levels: Vec<&str> = filter.split('/').collect();
    for (idx, level) in levels.iter().enumerate() {
        match *level {
            "#" if idx + 1 != levels.len() => {
                return Err(BusError::invalid_topic(filter, "'#' must be the last level"));
            }
            "#" | "+" => {}
            other if other.contains(['+', '#']) => {
                return Err(BusError::invalid_topic(
                    filter,
                    "wildcards must occupy a whole level",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Return true when `topic` matches the subscription `filter`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
