//! Session module - model conversation state
//!
//! Holds the message types sent to providers and the per-agent
//! [`Transcript`] that makes the turn-by-turn exchange with the model
//! explicit instead of leaving it inside the provider.
//!
//! # Example
//!
//! ```
//! use helmsman::session::{Message, Transcript};
//!
//! let mut transcript = Transcript::new();
//! transcript.push(Message::assistant("Hi there!"));
//! assert_eq!(transcript.len(), 1);
//! ```

pub mod types;

pub use types::{Message, Role, ToolCall, Transcript};
