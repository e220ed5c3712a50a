//! Request/response client.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::MonitorError;
use crate::protocol::{
    self, BodyReader, Command, MAIN_MEMSPACE, RESPONSE_HEADER_LEN, ResponseHeader, UNSOLICITED_ID,
};
use crate::registers::{RegisterDirectory, RegisterInfo, RegisterValue};

/// Name of the bank the CPU sees.
const DEFAULT_BANK: &str = "default";

/// Memory accesses may trigger I/O side effects. The cartridge cannot
/// avoid them on real hardware either.
const SIDE_EFFECTS: u8 = 1;

/// Reset kind for a power-cycle style reset.
const HARD_RESET: u8 = 1;

/// One entry of the target's bank list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankInfo {
    pub id: u16,
    pub name: String,
}

/// Everything resolved about the target at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub registers: RegisterDirectory,
    pub bank: u16,
}

/// Binary monitor client over any byte stream.
pub struct MonitorClient<S> {
    stream: S,
    next_id: u32,
    /// Set while a request has been sent and its response not yet taken.
    pending: Option<u32>,
}

impl MonitorClient<TcpStream> {
    /// Connect to a running VICE.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, MonitorError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> MonitorClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            next_id: 0,
            pending: None,
        }
    }

    #[must_use]
    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Id of a request whose response never arrived, if any.
    #[must_use]
    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    /// Send one request and wait for its response body.
    ///
    /// Unsolicited events arriving in between are read and dropped.
    pub fn request(&mut self, command: Command, body: &[u8]) -> Result<Vec<u8>, MonitorError> {
        if let Some(id) = self.pending {
            return Err(MonitorError::RequestOutstanding(id));
        }
        let id = self.next_id;
        if id == UNSOLICITED_ID {
            return Err(MonitorError::IdsExhausted);
        }
        self.next_id += 1;

        log::trace!("request {id:#010x}: {command:?}, {} byte body", body.len());
        self.stream
            .write_all(&protocol::encode_request(id, command, body))?;
        self.stream.flush()?;
        self.pending = Some(id);

        loop {
            let header = self.read_header()?;
            let body = self.read_body(header.body_len)?;

            if header.request_id == UNSOLICITED_ID {
                log::trace!(
                    "dropping event 0x{:02x}, {} bytes",
                    header.response_type,
                    body.len()
                );
                continue;
            }
            if header.request_id != id {
                return Err(MonitorError::RequestMismatch {
                    expected: id,
                    found: header.request_id,
                });
            }
            if header.error != 0 {
                return Err(MonitorError::ErrorCode {
                    command,
                    code: header.error,
                });
            }
            if header.response_type != command.response_type() {
                return Err(MonitorError::UnexpectedResponse {
                    command,
                    found: header.response_type,
                });
            }

            self.pending = None;
            return Ok(body);
        }
    }

    fn read_header(&mut self) -> Result<ResponseHeader, MonitorError> {
        let mut bytes = [0u8; RESPONSE_HEADER_LEN];
        self.stream.read_exact(&mut bytes)?;
        ResponseHeader::parse(&bytes)
    }

    fn read_body(&mut self, len: u32) -> Result<Vec<u8>, MonitorError> {
        let mut body = vec![0u8; len as usize];
        self.stream.read_exact(&mut body)?;
        Ok(body)
    }

    // === Operations ===

    /// All registers in a memory space, by VICE name.
    pub fn enumerate_registers(
        &mut self,
        memspace: u8,
    ) -> Result<HashMap<String, RegisterInfo>, MonitorError> {
        let body = self.request(Command::RegistersAvailable, &[memspace])?;
        let mut reader = BodyReader::new(Command::RegistersAvailable, &body);
        let count = reader.u16()?;

        let mut regs = HashMap::with_capacity(usize::from(count));
        for _ in 0..count {
            let mut item = reader.item()?;
            let id = item.u8()?;
            let bits = item.u8()?;
            let name_len = usize::from(item.u8()?);
            let name = item.bytes(name_len)?;
            let name = String::from_utf8_lossy(name).into_owned();
            regs.insert(name, RegisterInfo { id, bits });
        }
        Ok(regs)
    }

    pub fn enumerate_banks(&mut self) -> Result<Vec<BankInfo>, MonitorError> {
        let body = self.request(Command::BanksAvailable, &[])?;
        let mut reader = BodyReader::new(Command::BanksAvailable, &body);
        let count = reader.u16()?;

        let mut banks = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let mut item = reader.item()?;
            let id = item.u16()?;
            let name_len = usize::from(item.u8()?);
            let name = String::from_utf8_lossy(item.bytes(name_len)?).into_owned();
            banks.push(BankInfo { id, name });
        }
        Ok(banks)
    }

    /// Resolve the CPU registers and the default bank.
    pub fn bootstrap(&mut self) -> Result<Target, MonitorError> {
        let registers = RegisterDirectory::resolve(&self.enumerate_registers(MAIN_MEMSPACE)?)?;
        let bank = self
            .enumerate_banks()?
            .into_iter()
            .find(|b| b.name == DEFAULT_BANK)
            .ok_or(MonitorError::BankNotFound(DEFAULT_BANK))?
            .id;
        log::debug!("target registers {registers:?}, bank {bank}");
        Ok(Target { registers, bank })
    }

    /// Leave the monitor and let the target run.
    pub fn resume(&mut self) -> Result<(), MonitorError> {
        self.request(Command::Exit, &[])?;
        Ok(())
    }

    /// Read `start..=end` from `bank`.
    pub fn read_memory(&mut self, start: u16, end: u16, bank: u16) -> Result<Vec<u8>, MonitorError> {
        let body = self.request(Command::MemoryGet, &memory_header(start, end, bank))?;
        let mut reader = BodyReader::new(Command::MemoryGet, &body);
        let len = reader.u16()?;
        let data = reader.remaining();
        // The length is 16 bits wide, so a full 64K read reports 0
        if data.len() as u16 != len || data.len() > 0x1_0000 {
            return Err(reader.malformed("length does not match data"));
        }
        Ok(data.to_vec())
    }

    /// Write `data` to `start..=end` in `bank`.
    pub fn write_memory(
        &mut self,
        start: u16,
        end: u16,
        bank: u16,
        data: &[u8],
    ) -> Result<(), MonitorError> {
        let mut body = memory_header(start, end, bank).to_vec();
        body.extend_from_slice(data);
        self.request(Command::MemorySet, &body)?;
        Ok(())
    }

    pub fn set_register(&mut self, id: u8, value: u16) -> Result<(), MonitorError> {
        let [lo, hi] = value.to_le_bytes();
        // One item: size 3 (id + 16-bit value)
        let body = [MAIN_MEMSPACE, 1, 0, 3, id, lo, hi];
        self.request(Command::RegistersSet, &body)?;
        Ok(())
    }

    /// Execute `count` instructions, stepping into subroutines.
    pub fn step(&mut self, count: u16) -> Result<(), MonitorError> {
        let [lo, hi] = count.to_le_bytes();
        self.request(Command::AdvanceInstructions, &[0, lo, hi])?;
        Ok(())
    }

    pub fn get_registers(&mut self) -> Result<Vec<RegisterValue>, MonitorError> {
        let body = self.request(Command::RegistersGet, &[MAIN_MEMSPACE])?;
        let mut reader = BodyReader::new(Command::RegistersGet, &body);
        let count = reader.u16()?;

        let mut values = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let mut item = reader.item()?;
            let id = item.u8()?;
            let value = match item.remaining().len() {
                1 => u16::from(item.u8()?),
                2 => item.u16()?,
                _ => return Err(item.malformed("register value neither 8 nor 16 bits")),
            };
            values.push(RegisterValue { id, value });
        }
        Ok(values)
    }

    /// Single-step one instruction, then dump registers.
    pub fn step_and_get_registers(&mut self) -> Result<Vec<RegisterValue>, MonitorError> {
        self.step(1)?;
        self.get_registers()
    }

    pub fn hard_reset(&mut self) -> Result<(), MonitorError> {
        self.request(Command::Reset, &[HARD_RESET])?;
        Ok(())
    }
}

/// `side_effects | start | end | memspace | bank`
fn memory_header(start: u16, end: u16, bank: u16) -> [u8; 8] {
    let [s_lo, s_hi] = start.to_le_bytes();
    let [e_lo, e_hi] = end.to_le_bytes();
    let [b_lo, b_hi] = bank.to_le_bytes();
    [SIDE_EFFECTS, s_lo, s_hi, e_lo, e_hi, MAIN_MEMSPACE, b_lo, b_hi]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_header_layout() {
        assert_eq!(
            memory_header(0x1000, 0x1003, 0x0002),
            [0x01, 0x00, 0x10, 0x03, 0x10, 0x00, 0x02, 0x00]
        );
    }

    #[test]
    fn closed_stream_is_io_error() {
        let stream = std::io::Cursor::new(Vec::new());
        let mut client = MonitorClient::new(stream);
        assert!(matches!(client.resume(), Err(MonitorError::Io(_))));
        // The failed exchange stays outstanding
        assert_eq!(client.pending(), Some(0));
        assert!(matches!(
            client.resume(),
            Err(MonitorError::RequestOutstanding(0))
        ));
    }
}
