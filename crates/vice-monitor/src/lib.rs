//! Client for the VICE binary remote monitor.
//!
//! VICE listens on a TCP port (6502 by default) when started with
//! `-binarymonitor`. Every request carries a client-chosen id that the
//! response echoes; responses with id `0xFFFFFFFF` are events VICE sends on
//! its own (machine stopped, resumed, ...) and are skipped.
//!
//! Only one request is ever in flight.

mod client;
mod error;
#[cfg(feature = "test-utils")]
mod fake;
pub mod protocol;
mod registers;

pub use client::{BankInfo, MonitorClient, Target};
pub use error::MonitorError;
#[cfg(feature = "test-utils")]
pub use fake::{FakeTarget, Request};
pub use protocol::Command;
pub use registers::{CpuState, Register, RegisterDirectory, RegisterInfo, RegisterValue};
