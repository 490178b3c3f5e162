//! Incremental SSE frame parser

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Frame;
use bytes::BytesMut;
use tracing::trace;

/// Maximum size of a single pending block (8MB)
pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Splits an incrementally delivered byte stream into frames
///
/// Bytes are buffered until a blank line completes a block, so a block may
/// arrive across any number of chunks and a chunk may carry any number of
/// blocks. Text is decoded per complete block, never per chunk.
pub struct FrameParser {
    buffer: BytesMut,
    /// Bytes of `buffer` already scanned for a blank line
    scanned: usize,
    /// Start of the line currently being scanned
    line_start: usize,
    max_frame_size: usize,
    heartbeats: u64,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            scanned: 0,
            line_start: 0,
            max_frame_size,
            heartbeats: 0,
        }
    }

    /// Add data to the parser buffer
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to parse the next complete frame from the buffer
    ///
    /// Heartbeats and empty blocks are consumed silently. Returns `Ok(None)`
    /// once no complete block is left.
    pub fn parse(&mut self) -> ProtocolResult<Option<Frame>> {
        while let Some(block) = self.next_block() {
            if block.trim().is_empty() {
                continue;
            }

            match Frame::parse_block(&block) {
                Some(frame) => return Ok(Some(frame)),
                None => {
                    self.heartbeats += 1;
                    trace!("Heartbeat");
                }
            }
        }

        if self.buffer.len() > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: self.buffer.len(),
                max: self.max_frame_size,
            });
        }

        Ok(None)
    }

    /// Parse every complete frame currently buffered
    pub fn drain(&mut self) -> ProtocolResult<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.parse()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// End of stream: discard the trailing partial block
    ///
    /// Returns the number of bytes dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.scanned = 0;
        self.line_start = 0;
        dropped
    }

    /// Bytes waiting for a block terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Heartbeat blocks seen so far
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats
    }

    /// Split off the next block terminated by a blank line
    fn next_block(&mut self) -> Option<String> {
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let newline = self.scanned + offset;
            let line = &self.buffer[self.line_start..newline];
            let blank = line.is_empty() || line == b"\r";

            if !blank {
                self.line_start = newline + 1;
                self.scanned = newline + 1;
                continue;
            }

            // Block is everything before the blank line, minus the newline
            // that ended its last line.
            let block_len = self.line_start.saturating_sub(1);
            let raw = self.buffer.split_to(newline + 1);
            self.scanned = 0;
            self.line_start = 0;

            return Some(String::from_utf8_lossy(&raw[..block_len]).into_owned());
        }

        self.scanned = self.buffer.len();
        None
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
