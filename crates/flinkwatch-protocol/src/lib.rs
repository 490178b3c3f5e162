//! Watch stream protocol
//!
//! The backend pushes deployment changes as Server-Sent Events.
//!
//! ## Frame Format
//! ```text
//! : heartbeat              # comment, keeps the connection alive
//! event: <name>            # optional event name
//! id: <uid>-<version>      # optional frame id
//! retry: <ms>              # optional reconnect hint
//! data: <json>             # payload, may span several data lines
//!                          # blank line terminates the frame
//! ```
//!
//! ## Payload
//! ```text
//! {"type": "ADDED" | "MODIFIED" | "DELETED", "deployment": {...}}
//! ```

pub mod decoder;
pub mod error;
pub mod frame;
pub mod parser;

pub use decoder::{decode, Disposition};
pub use error::{ProtocolError, ProtocolResult};
pub use frame::Frame;
pub use parser::FrameParser;
