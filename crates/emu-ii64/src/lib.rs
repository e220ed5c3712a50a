//! II/64 development cartridge.
//!
//! The II/64 let an Apple IIe drive a Commodore 64: the Apple talks to the
//! cartridge through three signal lines, the cartridge reads and writes C64
//! memory, starts code, and reports CPU state. Here the Apple runs in MAME,
//! which forwards line activity over a pair of FIFOs, and the C64 runs in
//! VICE, reached through its binary monitor.

pub mod cart;
pub mod command;
pub mod config;
pub mod launch;
pub mod logger;

pub use cart::{CartError, CartState, Cartridge};
pub use command::CartCommand;
pub use config::{BridgeConfig, CartConfig, ConfigError, LaunchConfig};
