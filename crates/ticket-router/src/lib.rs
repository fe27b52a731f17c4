//! Command routing, authorization, and request logging for the ticket bot.
//!
//! Inbound messages flow through a middleware chain composed once at startup
//! (request logger, then authorization gate) into [`TicketCommandHandler`],
//! which classifies the text and runs the matching ticket operation.

pub mod command;
pub mod config;
pub mod gate;
pub mod handler;
pub mod pipeline;
pub mod request_logger;

pub use command::*;
pub use config::*;
pub use gate::*;
pub use handler::*;
pub use pipeline::*;
pub use request_logger::*;
