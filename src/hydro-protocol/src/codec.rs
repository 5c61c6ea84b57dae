// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Line codec shared by the broker and the control listener.

use serde::Serialize;

use crate::types::{ControlCommand, Frame};

/// Upper bound on a single protocol line, newline included.
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Serialize `value` as one JSON line terminated by `\n`.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

pub fn parse_frame(input: &str) -> Result<Frame, serde_json::Error> {
    serde_json::from_str(input.trim())
}

pub fn parse_control(input: &str) -> Result<ControlCommand, serde_json::Error> {
    serde_json::from_str(input.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControlResponse;
    use hydro_core::device::state::DeviceState;

    #[test]
    fn test_frame_wire_shape() {
        let frame = Frame::Publish {
            topic: "iot/device/sensor".into(),
            payload: "42".into(),
        };
        let line = encode_line(&frame).unwrap();
        assert_eq!(
            line,
            "{\"op\":\"publish\",\"topic\":\"iot/device/sensor\",\"payload\":\"42\"}\n"
        );
        assert_eq!(parse_frame(&line).unwrap(), frame);
    }

    #[test]
    fn test_parse_subscribe() {
        let frame = parse_frame(r#"{"op":"subscribe","filter":"iot/+/mode"}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Subscribe {
                filter: "iot/+/mode".into()
            }
        );
    }

    #[test]
    fn test_parse_frame_rejects_unknown_op() {
        assert!(parse_frame(r#"{"op":"retain","topic":"a"}"#).is_err());
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"{"op":"publish","topic":"a"}"#).is_err());
    }

    #[test]
    fn test_parse_control_commands() {
        assert_eq!(
            parse_control(r#"{"cmd":"get_state"}"#).unwrap(),
            ControlCommand::GetState
        );
        assert_eq!(
            parse_control(r#"{"cmd":"set_thresholds","low":20,"high":80}"#).unwrap(),
            ControlCommand::SetThresholds { low: 20, high: 80 }
        );
        assert_eq!(
            parse_control("{\"cmd\":\"toggle_pump\"}\r\n").unwrap(),
            ControlCommand::TogglePump
        );
        assert!(parse_control(r#"{"cmd":"set_thresholds","low":-1,"high":80}"#).is_err());
    }

    #[test]
    fn test_response_encoding() {
        let ok = encode_line(&ControlResponse::ok(DeviceState::default().snapshot())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&ok).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["state"]["mode"], "Manual");
        assert_eq!(value["state"]["reading"], 50);
        assert!(value["error"].is_null());

        let err = encode_line(&ControlResponse::err("nope")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "nope");
    }
}
