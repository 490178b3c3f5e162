//! SSE frame type and block parsing

use serde::{Deserialize, Serialize};

/// Marker that starts a comment line
pub const COMMENT_MARKER: char = ':';

/// One field/value block of the event stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// `event` field, last occurrence wins
    pub event: Option<String>,
    /// `data` lines joined with `\n`
    pub data: String,
    /// `id` field, last occurrence wins
    pub id: Option<String>,
    /// `retry` field in milliseconds
    pub retry: Option<u64>,
}

impl Frame {
    /// Frame carrying only a data payload
    pub fn data(data: impl Into<String>) -> Self {
        Frame {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parse a complete block (the text between two blank lines)
    ///
    /// Returns `None` for a pure heartbeat: a block made of exactly one
    /// comment line.
    pub fn parse_block(block: &str) -> Option<Frame> {
        let lines: Vec<&str> = block
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        if lines.len() == 1 && lines[0].starts_with(COMMENT_MARKER) {
            return None;
        }

        let mut frame = Frame::default();
        let mut data_lines: Vec<&str> = Vec::new();

        for line in lines {
            if line.starts_with(COMMENT_MARKER) {
                continue;
            }

            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.strip_prefix(' ').unwrap_or(value);

            match field {
                "event" => frame.event = Some(value.to_string()),
                "data" => data_lines.push(value),
                "id" => frame.id = Some(value.to_string()),
                "retry" => {
                    if let Ok(ms) = value.parse::<u64>() {
                        frame.retry = Some(ms);
                    }
                }
                _ => {}
            }
        }

        frame.data = data_lines.join("\n");
        Some(frame)
    }

    /// Whether this frame is the backend's advisory `error` event
    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some("error")
    }
}
