// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Line I/O helpers for the JSON-lines protocols.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use hydro_protocol::encode_line;

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

/// Read one `\n`-terminated line of at most `max_bytes`.
///
/// Returns `Ok(None)` on a clean EOF. Not cancel-safe: a partially read
/// line is lost if the future is dropped.
pub async fn read_limited_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<String>> {
    let mut line = Vec::with_capacity(256);
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if line.is_empty() {
                return Ok(None);
            }
            let text = String::from_utf8(line)
                .map_err(|e| invalid_data(format!("line is not valid UTF-8: {e}")))?;
            return Ok(Some(text));
        }

        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            let chunk = &available[..=pos];
            if line.len() + chunk.len() > max_bytes {
                return Err(invalid_data(format!(
                    "line exceeds maximum size of {max_bytes} bytes"
                )));
            }
            line.extend_from_slice(chunk);
            reader.consume(pos + 1);
            let text = String::from_utf8(line)
                .map_err(|e| invalid_data(format!("line is not valid UTF-8: {e}")))?;
            return Ok(Some(text));
        }

        if line.len() + available.len() > max_bytes {
            return Err(invalid_data(format!(
                "line exceeds maximum size of {max_bytes} bytes"
            )));
        }

        line.extend_from_slice(available);
        let consumed = available.len();
        reader.consume(consumed);
    }
}

/// Serialize `value` as a JSON line, write it and flush.
pub async fn write_json_line<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = encode_line(value).map_err(|e| invalid_data(e.to_string()))?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
