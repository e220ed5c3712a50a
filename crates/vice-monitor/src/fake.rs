//! In-memory VICE stand-in.
//!
//! Parses request frames as they are written and queues the responses a
//! C64 target would send. Only available in test builds.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::protocol::{
    Command, REQUEST_HEADER_LEN, ResponseHeader, UNSOLICITED_ID, decode_request_header,
};

/// VICE error codes.
const ERR_INVALID_LENGTH: u8 = 0x80;
const ERR_INVALID_PARAMETER: u8 = 0x81;
const ERR_INVALID_COMMAND: u8 = 0x83;

/// Response types of the events VICE sends when the machine stops or resumes.
const EVENT_STOPPED: u8 = 0x62;
const EVENT_RESUMED: u8 = 0x63;

/// A request as the target received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: u32,
    pub command: Command,
    pub body: Vec<u8>,
}

struct FakeRegister {
    name: &'static str,
    id: u8,
    bits: u8,
    value: u16,
}

pub struct FakeTarget {
    memory: Vec<u8>,
    registers: Vec<FakeRegister>,
    banks: Vec<(u16, &'static str)>,
    inbound: Vec<u8>,
    outbound: VecDeque<u8>,
    requests: Vec<Request>,
    /// Unsolicited events to send ahead of the next response.
    queued_events: usize,
    /// Upper bound on bytes handed out per `read` call.
    max_read: usize,
    /// Response id override for the next response.
    wrong_id: Option<u32>,
    fail_next: Option<u8>,
    running: bool,
}

impl FakeTarget {
    /// A stopped C64 with VICE's register and bank layout.
    #[must_use]
    pub fn c64() -> Self {
        let reg = |name: &'static str, id: u8, bits: u8, value: u16| FakeRegister {
            name,
            id,
            bits,
            value,
        };
        Self {
            memory: vec![0; 0x10000],
            registers: vec![
                reg("A", 0x00, 8, 0x00),
                reg("X", 0x01, 8, 0x00),
                reg("Y", 0x02, 8, 0x0A),
                reg("PC", 0x03, 16, 0xE5CF),
                reg("SP", 0x04, 8, 0xF3),
                reg("FL", 0x05, 8, 0x22),
                reg("LIN", 0x35, 16, 0x0000),
                reg("CYC", 0x36, 16, 0x0000),
                reg("00", 0x37, 8, 0x2F),
                reg("01", 0x38, 8, 0x37),
            ],
            banks: vec![(0, "default"), (1, "cpu"), (2, "ram"), (3, "rom"), (4, "io")],
            inbound: Vec::new(),
            outbound: VecDeque::new(),
            requests: Vec::new(),
            queued_events: 0,
            max_read: usize::MAX,
            wrong_id: None,
            fail_next: None,
            running: false,
        }
    }

    /// Same target without a bank called "default".
    #[must_use]
    pub fn without_default_bank() -> Self {
        let mut target = Self::c64();
        target.banks.retain(|&(_, name)| name != "default");
        target
    }

    /// Same target without one of its registers.
    #[must_use]
    pub fn without_register(name: &str) -> Self {
        let mut target = Self::c64();
        target.registers.retain(|r| r.name != name);
        target
    }

    pub fn poke(&mut self, addr: u16, data: &[u8]) {
        let start = usize::from(addr);
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    #[must_use]
    pub fn peek(&self, addr: u16, len: usize) -> &[u8] {
        let start = usize::from(addr);
        &self.memory[start..start + len]
    }

    #[must_use]
    pub fn register(&self, name: &str) -> Option<u16> {
        self.registers
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value)
    }

    pub fn set_register(&mut self, name: &str, value: u16) {
        if let Some(r) = self.registers.iter_mut().find(|r| r.name == name) {
            r.value = value;
        }
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.requests.iter().map(|r| r.command).collect()
    }

    /// Whether the last run/stop command left the machine running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Send `count` unsolicited events before the next response.
    pub fn queue_events(&mut self, count: usize) {
        self.queued_events += count;
    }

    /// Hand out at most `max` bytes per read.
    pub fn set_max_read(&mut self, max: usize) {
        self.max_read = max.max(1);
    }

    /// Answer the next request with the wrong request id.
    pub fn answer_with_id(&mut self, id: u32) {
        self.wrong_id = Some(id);
    }

    /// Fail the next request with a VICE error code.
    pub fn fail_next(&mut self, code: u8) {
        self.fail_next = Some(code);
    }

    /// Push raw bytes onto the response stream.
    pub fn inject_raw(&mut self, bytes: &[u8]) {
        self.outbound.extend(bytes);
    }

    fn respond(&mut self, response_type: u8, error: u8, request_id: u32, body: &[u8]) {
        let header = ResponseHeader {
            body_len: body.len() as u32,
            response_type,
            error,
            request_id,
        };
        self.outbound.extend(header.encode());
        self.outbound.extend(body);
    }

    fn process_inbound(&mut self) {
        loop {
            if self.inbound.len() < REQUEST_HEADER_LEN {
                return;
            }
            let mut header = [0u8; REQUEST_HEADER_LEN];
            header.copy_from_slice(&self.inbound[..REQUEST_HEADER_LEN]);
            let Some((body_len, id, code)) = decode_request_header(&header) else {
                // Not a frame start: VICE drops the byte and resyncs
                self.inbound.remove(0);
                continue;
            };
            let frame_len = REQUEST_HEADER_LEN + body_len as usize;
            if self.inbound.len() < frame_len {
                return;
            }
            let body = self.inbound[REQUEST_HEADER_LEN..frame_len].to_vec();
            self.inbound.drain(..frame_len);
            self.handle(id, code, body);
        }
    }

    fn handle(&mut self, id: u32, code: u8, body: Vec<u8>) {
        for _ in 0..std::mem::take(&mut self.queued_events) {
            self.respond(EVENT_STOPPED, 0, UNSOLICITED_ID, &[0xCF, 0xE5]);
        }
        let reply_id = self.wrong_id.take().unwrap_or(id);

        let Ok(command) = Command::try_from(code) else {
            self.respond(code, ERR_INVALID_COMMAND, reply_id, &[]);
            return;
        };
        self.requests.push(Request {
            id,
            command,
            body: body.clone(),
        });

        if let Some(error) = self.fail_next.take() {
            self.respond(command.response_type(), error, reply_id, &[]);
            return;
        }

        let result = match command {
            Command::MemoryGet => self.memory_get(&body),
            Command::MemorySet => self.memory_set(&body),
            Command::RegistersGet => Ok(self.register_dump()),
            Command::RegistersSet => self.registers_set(&body),
            Command::AdvanceInstructions => {
                self.running = false;
                Ok(Vec::new())
            }
            Command::BanksAvailable => Ok(self.bank_list()),
            Command::RegistersAvailable => Ok(self.register_list()),
            Command::Exit => {
                self.running = true;
                Ok(Vec::new())
            }
            Command::Reset => {
                self.set_register("PC", 0xFCE2);
                Ok(Vec::new())
            }
        };

        match result {
            Ok(reply) => {
                self.respond(command.response_type(), 0, reply_id, &reply);
                if command == Command::Exit {
                    self.respond(EVENT_RESUMED, 0, UNSOLICITED_ID, &[0xCF, 0xE5]);
                }
            }
            Err(error) => self.respond(command.response_type(), error, reply_id, &[]),
        }
    }

    /// `(start, end)` of a memory command, checked against the body length.
    fn memory_range(body: &[u8], min_len: usize) -> Result<(usize, usize), u8> {
        if body.len() < min_len {
            return Err(ERR_INVALID_LENGTH);
        }
        let start = usize::from(u16::from_le_bytes([body[1], body[2]]));
        let end = usize::from(u16::from_le_bytes([body[3], body[4]]));
        if end < start {
            return Err(ERR_INVALID_PARAMETER);
        }
        Ok((start, end))
    }

    fn memory_get(&mut self, body: &[u8]) -> Result<Vec<u8>, u8> {
        let (start, end) = Self::memory_range(body, 8)?;
        self.running = false;
        let data = &self.memory[start..=end];
        let mut reply = (data.len() as u16).to_le_bytes().to_vec();
        reply.extend_from_slice(data);
        Ok(reply)
    }

    fn memory_set(&mut self, body: &[u8]) -> Result<Vec<u8>, u8> {
        let (start, end) = Self::memory_range(body, 8)?;
        let data = &body[8..];
        if data.len() != end - start + 1 {
            return Err(ERR_INVALID_LENGTH);
        }
        self.running = false;
        self.memory[start..=end].copy_from_slice(data);
        Ok(Vec::new())
    }

    fn registers_set(&mut self, body: &[u8]) -> Result<Vec<u8>, u8> {
        if body.len() < 3 {
            return Err(ERR_INVALID_LENGTH);
        }
        let count = usize::from(u16::from_le_bytes([body[1], body[2]]));
        let mut pos = 3;
        for _ in 0..count {
            let item = body.get(pos..pos + 4).ok_or(ERR_INVALID_LENGTH)?;
            if item[0] != 3 {
                return Err(ERR_INVALID_LENGTH);
            }
            let value = u16::from_le_bytes([item[2], item[3]]);
            let reg = self
                .registers
                .iter_mut()
                .find(|r| r.id == item[1])
                .ok_or(ERR_INVALID_PARAMETER)?;
            reg.value = value;
            pos += 4;
        }
        self.running = false;
        Ok(self.register_dump())
    }

    /// 8-bit registers go out as 1-byte values, 16-bit ones as 2 bytes.
    fn register_dump(&self) -> Vec<u8> {
        let mut out = (self.registers.len() as u16).to_le_bytes().to_vec();
        for r in &self.registers {
            if r.bits == 8 {
                out.extend_from_slice(&[2, r.id, r.value as u8]);
            } else {
                let [lo, hi] = r.value.to_le_bytes();
                out.extend_from_slice(&[3, r.id, lo, hi]);
            }
        }
        out
    }

    fn register_list(&self) -> Vec<u8> {
        let mut out = (self.registers.len() as u16).to_le_bytes().to_vec();
        for r in &self.registers {
            out.push(3 + r.name.len() as u8);
            out.extend_from_slice(&[r.id, r.bits, r.name.len() as u8]);
            out.extend_from_slice(r.name.as_bytes());
        }
        out
    }

    fn bank_list(&self) -> Vec<u8> {
        let mut out = (self.banks.len() as u16).to_le_bytes().to_vec();
        for &(id, name) in &self.banks {
            out.push(3 + name.len() as u8);
            out.extend_from_slice(&id.to_le_bytes());
            out.push(name.len() as u8);
            out.extend_from_slice(name.as_bytes());
        }
        out
    }
}

impl Read for FakeTarget {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.outbound.len()).min(self.max_read);
        for (slot, byte) in buf.iter_mut().zip(self.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for FakeTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inbound.extend_from_slice(buf);
        self.process_inbound();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
