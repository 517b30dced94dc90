//! Message processing pipeline.
//!
//! Every message from the target channel flows through:
//! 1. `ReactionProcessor::process()` — image attachments → emoji reactions
//! 2. `CommandHandler::handle()` — `!` commands, after image handling
//!
//! Failures are contained per attachment; a message never aborts the loop.

pub mod commands;
pub mod processor;
pub mod types;

pub use commands::{Command, CommandHandler};
pub use processor::ReactionProcessor;
pub use types::{AttachmentOutcome, ProcessReport, ProcessorConfig};
