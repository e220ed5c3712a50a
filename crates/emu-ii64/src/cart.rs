//! Command dispatcher.
//!
//! One cycle: handshake, command byte, command body. A reset from the Apple
//! anywhere in a cycle abandons it and hard-resets the C64. An NMI outside
//! the handshake abandons it and waits for the next handshake. Unknown
//! command bytes are logged and skipped. Everything else is fatal.

use std::io::{Read, Write};

use ii64_wire::{Clock, WireEngine, WireError, WireLink};
use thiserror::Error;
use vice_monitor::{MonitorClient, MonitorError, Register, Target};

use crate::command::CartCommand;
use crate::config::CartConfig;

#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error("unknown cartridge command 0x{0:02x}")]
    UnknownCommand(u8),
}

/// Where the dispatcher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    Idle,
    Handshaking,
    AwaitingCommand,
    Executing(CartCommand),
    ResetHandling,
    NmiRecovery,
}

/// What to do after a cycle ends early.
enum Recovery {
    Continue,
    Shutdown,
}

/// The cartridge: Apple-side wire engine plus C64-side monitor client.
pub struct Cartridge<L, C, S> {
    wire: WireEngine<L, C>,
    monitor: MonitorClient<S>,
    target: Target,
    config: CartConfig,
    state: CartState,
}

impl<L: WireLink, C: Clock, S: Read + Write> Cartridge<L, C, S> {
    pub fn new(
        wire: WireEngine<L, C>,
        monitor: MonitorClient<S>,
        target: Target,
        config: CartConfig,
    ) -> Self {
        Self {
            wire,
            monitor,
            target,
            config,
            state: CartState::Idle,
        }
    }

    /// Look up the C64's registers and bank, then let it run.
    pub fn attach(
        wire: WireEngine<L, C>,
        mut monitor: MonitorClient<S>,
        config: CartConfig,
    ) -> Result<Self, CartError> {
        let target = monitor.bootstrap()?;
        monitor.resume()?;
        Ok(Self::new(wire, monitor, target, config))
    }

    #[must_use]
    pub fn state(&self) -> CartState {
        self.state
    }

    #[must_use]
    pub fn wire(&self) -> &WireEngine<L, C> {
        &self.wire
    }

    #[must_use]
    pub fn monitor(&self) -> &MonitorClient<S> {
        &self.monitor
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Serve commands until the Apple side closes its pipe.
    pub fn run(&mut self) -> Result<(), CartError> {
        loop {
            if let Err(e) = self.cycle() {
                if let Recovery::Shutdown = self.recover(e)? {
                    return Ok(());
                }
            }
            self.state = CartState::Idle;
        }
    }

    fn recover(&mut self, err: CartError) -> Result<Recovery, CartError> {
        match err {
            CartError::Wire(WireError::HostClosed) => {
                log::info!("host closed the event pipe");
                Ok(Recovery::Shutdown)
            }
            CartError::Wire(WireError::Reset) => {
                log::info!("reset detected");
                self.state = CartState::ResetHandling;
                self.monitor.hard_reset()?;
                Ok(Recovery::Continue)
            }
            CartError::Wire(WireError::Nmi) => {
                log::warn!("NMI outside handshake in state {:?}", self.state);
                self.state = CartState::NmiRecovery;
                Ok(Recovery::Continue)
            }
            CartError::UnknownCommand(code) => {
                log::warn!("unknown command 0x{code:02x}");
                Ok(Recovery::Continue)
            }
            fatal => Err(fatal),
        }
    }

    /// Handshake, read a command byte and carry the command out.
    pub fn cycle(&mut self) -> Result<(), CartError> {
        self.state = CartState::Handshaking;
        self.wire.handshake()?;

        self.state = CartState::AwaitingCommand;
        let command = CartCommand::try_from(self.wire.get_byte()?)?;
        log::debug!("command: {command}");

        self.state = CartState::Executing(command);
        match command {
            CartCommand::ReadRange => self.read_range(),
            CartCommand::WriteRange => self.write_range(),
            CartCommand::Execute => self.execute(),
            CartCommand::Status => self.status(),
        }
    }

    fn get_range(&mut self) -> Result<(u16, u16), CartError> {
        let start = self.wire.get_word()?;
        let end = self.wire.get_word()?;
        log::debug!("start {start:04x}, end {end:04x}");
        Ok((start, end))
    }

    fn read_range(&mut self) -> Result<(), CartError> {
        let (start, end) = self.get_range()?;
        let data = self.monitor.read_memory(start, end, self.target.bank)?;
        for &b in &data {
            self.wire.put_byte(b)?;
        }
        log::debug!("{}", hex(&data));

        if self.config.auto_resume {
            self.monitor.resume()?;
        }
        Ok(())
    }

    fn write_range(&mut self) -> Result<(), CartError> {
        let (start, end) = self.get_range()?;
        let data = (start..=end)
            .map(|_| self.wire.get_byte())
            .collect::<Result<Vec<u8>, WireError>>()?;
        log::debug!("{}", hex(&data));

        self.monitor
            .write_memory(start, end, self.target.bank, &data)?;
        if self.config.auto_resume {
            self.monitor.resume()?;
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<(), CartError> {
        let start = self.wire.get_word()?;
        log::debug!("start {start:04x}");

        let pc = self.target.registers.id(Register::Pc);
        self.monitor.set_register(pc, start)?;
        self.monitor.resume()?;
        Ok(())
    }

    fn status(&mut self) -> Result<(), CartError> {
        let values = if self.config.single_step {
            self.monitor.step_and_get_registers()?
        } else {
            self.monitor.get_registers()?
        };
        let cpu = self.target.registers.decode(&values)?;
        log::debug!("{cpu:04x?}");
        for b in cpu.status_bytes() {
            self.wire.put_byte(b)?;
        }

        // Stepping and then running straight on would defeat the step
        if self.config.auto_resume && !self.config.single_step {
            self.monitor.resume()?;
        }
        Ok(())
    }
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
