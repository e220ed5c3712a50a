//! Transport between the host and the wire engine.

use std::io::{self, Read, Write};

/// Source of host events and sink for status bytes.
pub trait WireLink {
    /// Block until the next event byte. `Ok(None)` means the host has gone.
    fn next_event(&mut self) -> io::Result<Option<u8>>;

    /// Answer a poll.
    fn send_status(&mut self, status: u8) -> io::Result<()>;
}

/// A pair of byte pipes: events in, status out.
#[derive(Debug)]
pub struct PipeLink<R, W> {
    events: R,
    status: W,
}

impl<R: Read, W: Write> PipeLink<R, W> {
    pub fn new(events: R, status: W) -> Self {
        Self { events, status }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.events, self.status)
    }
}

impl<R: Read, W: Write> WireLink for PipeLink<R, W> {
    fn next_event(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.events.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn send_status(&mut self, status: u8) -> io::Result<()> {
        self.status.write_all(&[status])?;
        // The host blocks on this byte
        self.status.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_reads_one_event_at_a_time() {
        let mut link = PipeLink::new(&b"Y_"[..], Vec::new());
        assert_eq!(link.next_event().ok(), Some(Some(b'Y')));
        assert_eq!(link.next_event().ok(), Some(Some(b'_')));
        assert_eq!(link.next_event().ok(), Some(None));
    }

    #[test]
    fn status_bytes_written_in_order() {
        let mut link = PipeLink::new(&b""[..], Vec::new());
        link.send_status(b'4').expect("status");
        link.send_status(b'7').expect("status");
        let (_, out) = link.into_inner();
        assert_eq!(out, b"47");
    }
}
