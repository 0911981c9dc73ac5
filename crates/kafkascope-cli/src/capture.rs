//! Capture inputs: JSON-lines segment logs and raw stream dumps.

use anyhow::{Context, Result};
use kafkascope_kafka::{ConnectionKey, Direction, FrameId};
use serde::Deserialize;
use std::path::Path;

/// One captured TCP payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub connection: ConnectionKey,
    pub direction: Direction,
    pub frame: FrameId,
    pub data: Vec<u8>,
}

#[derive(Deserialize)]
struct SegmentLine {
    connection: String,
    direction: Direction,
    frame: FrameId,
    data: String,
}

/// Parse a JSON-lines capture. Blank lines and `#` comments are skipped.
pub fn parse_capture(contents: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed: SegmentLine = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid segment", index + 1))?;
        let data = hex::decode(parsed.data.trim())
            .with_context(|| format!("line {}: invalid hex payload", index + 1))?;
        segments.push(Segment {
            connection: ConnectionKey::new(parsed.connection),
            direction: parsed.direction,
            frame: parsed.frame,
            data,
        });
    }
    Ok(segments)
}

pub fn read_capture(path: &Path) -> Result<Vec<Segment>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture {}", path.display()))?;
    parse_capture(&contents).with_context(|| format!("In {}", path.display()))
}

/// Two one-direction dumps of a single connection, client side first.
pub fn read_streams(connection: &str, client: &Path, server: &Path) -> Result<Vec<Segment>> {
    let connection = ConnectionKey::new(connection);
    let client_data = std::fs::read(client)
        .with_context(|| format!("Failed to read client stream {}", client.display()))?;
    let server_data = std::fs::read(server)
        .with_context(|| format!("Failed to read server stream {}", server.display()))?;

    Ok(vec![
        Segment {
            connection: connection.clone(),
            direction: Direction::Request,
            frame: 0,
            data: client_data,
        },
        Segment {
            connection,
            direction: Direction::Response,
            frame: 1,
            data: server_data,
        },
    ])
}
