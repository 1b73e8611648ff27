//! Command/reply messages exchanged between a controlling API and a remote
//! agent, with per-service command validation.
//!
//! A transport decodes a [`Cmd`], calls [`Cmd::validate`], hands the command
//! to a service handler and sends back the [`Reply`] built by [`Cmd::reply`].

pub mod communication;
pub mod config;
pub mod utils;

pub use communication::{
    commands, services, Cmd, CommandRegistry, Dispatcher, JsonProtocol, LogFile, LogLevel,
    Reply, ServiceData, ServiceHandler, StatusData,
};
pub use config::Settings;
pub use utils::error_handling::{ProtoError, ProtoResult};
