//! II/64 cartridge line interface.
//!
//! The host machine sees the cartridge as three signal lines and a byte-wide
//! shift register. Bits 0-1 carry data, bit 2 is the clock. Every change the
//! host makes to a line arrives as a one-byte event on a pipe, and whenever
//! the host samples the cartridge outputs it sends a poll and expects one
//! status byte back.
//!
//! Bytes cross the interface two bits per clock pulse, most significant pair
//! first, in both directions at once.

mod clock;
mod engine;
mod error;
mod event;
#[cfg(feature = "test-utils")]
mod harness;
mod lines;
mod link;

pub use clock::{Clock, MonotonicClock};
#[cfg(feature = "test-utils")]
pub use clock::ManualClock;
pub use engine::WireEngine;
pub use error::{HandshakeStage, WireError};
pub use event::WireEvent;
#[cfg(feature = "test-utils")]
pub use harness::{HostScript, LoopbackHost, ScriptedLink};
pub use lines::{CLOCK, DATA, Edge, LINE_MASK, Lines};
pub use link::{PipeLink, WireLink};
