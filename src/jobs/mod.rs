//! Jobs module - message jobs from event to persisted reply
//!
//! - [`MessageJob`]: one user message to answer
//! - [`JobController`]: runs a job through its named steps, with the
//!   apology write as the failure path
//! - [`Dispatcher`]: one task per job, cancellation by message id
//!
//! # Steps
//!
//! ```text
//! wait-for-db-sync → get-conversation → get-recent-messages → build-context
//!     → [generate-title → update-conversation-title] → run-network
//!     → update-assistant-message
//! ```

mod controller;
mod dispatcher;
mod types;

pub use controller::{JobController, APOLOGY};
pub use dispatcher::Dispatcher;
pub use types::{JobSettings, MessageJob};
