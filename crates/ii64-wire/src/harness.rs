//! Stand-ins for the host side of the pipe.
//!
//! Only available in test builds.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::clock::ManualClock;
use crate::event::WireEvent;
use crate::lines::{CLOCK, DATA};
use crate::link::WireLink;

/// Decode status bytes from `HostScript::receive_byte` pulses into bytes.
///
/// Each pulse polls once while the clock output is high; four consecutive
/// polls carry one byte, most significant pair first.
fn decode_status(status: &[u8]) -> Vec<u8> {
    status
        .chunks_exact(4)
        .map(|pulses| {
            pulses
                .iter()
                .fold(0u8, |acc, &s| (acc << 2) | (s.wrapping_sub(b'0') & DATA))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ScriptedLink
// ---------------------------------------------------------------------------

/// Replays a fixed list of events and records every status byte.
///
/// Running out of events reads as the host closing the pipe.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    events: VecDeque<(Duration, u8)>,
    status: Vec<u8>,
    clock: Option<ManualClock>,
}

impl ScriptedLink {
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = u8>) -> Self {
        Self {
            events: events.into_iter().map(|e| (Duration::ZERO, e)).collect(),
            status: Vec::new(),
            clock: None,
        }
    }

    /// Advance `clock` by each event's delay as the event is delivered.
    #[must_use]
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Append an event delivered `delay` after the previous one.
    pub fn push_after(&mut self, delay: Duration, code: u8) {
        self.events.push_back((delay, code));
    }

    /// Status bytes sent so far.
    #[must_use]
    pub fn status(&self) -> &[u8] {
        &self.status
    }

    /// Bytes shifted out to the host, assuming every poll came from a
    /// receive pulse.
    #[must_use]
    pub fn received_bytes(&self) -> Vec<u8> {
        decode_status(&self.status)
    }

    /// Events not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl WireLink for ScriptedLink {
    fn next_event(&mut self) -> io::Result<Option<u8>> {
        let Some((delay, code)) = self.events.pop_front() else {
            return Ok(None);
        };
        if let Some(clock) = &self.clock {
            clock.advance(delay);
        }
        Ok(Some(code))
    }

    fn send_status(&mut self, status: u8) -> io::Result<()> {
        self.status.push(status);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HostScript
// ---------------------------------------------------------------------------

/// Builds the event sequence a well-behaved host would send.
///
/// Line events are only emitted when a level actually changes.
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    input: u8,
    events: Vec<u8>,
}

impl HostScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_events(self) -> Vec<u8> {
        self.events
    }

    /// Append a raw event code.
    #[must_use]
    pub fn event(mut self, code: u8) -> Self {
        self.events.push(code);
        self
    }

    fn push(&mut self, event: WireEvent) {
        self.events.push(event.code());
    }

    fn set_line(&mut self, bit: u8, high: bool) {
        let mask = 1 << bit;
        if (self.input & mask != 0) == high {
            return;
        }
        self.input ^= mask;
        self.push(if high {
            WireEvent::Rise(bit)
        } else {
            WireEvent::Fall(bit)
        });
    }

    fn set_data(&mut self, pair: u8) {
        self.set_line(0, pair & 0b01 != 0);
        self.set_line(1, pair & 0b10 != 0);
    }

    fn pulse(&mut self, poll: bool) {
        self.set_line(2, true);
        if poll {
            self.push(WireEvent::Poll(0));
        }
        self.set_line(2, false);
    }

    /// Lines to `010`, pulse NMI, then raise bit 0.
    #[must_use]
    pub fn handshake(mut self) -> Self {
        self.set_line(2, false);
        self.set_data(0b10);
        self.push(WireEvent::NmiAssert);
        self.push(WireEvent::NmiDeassert);
        self.set_line(0, true);
        self
    }

    /// NMI pulse with the lines left as they are.
    #[must_use]
    pub fn nmi(mut self) -> Self {
        self.push(WireEvent::NmiAssert);
        self.push(WireEvent::NmiDeassert);
        self
    }

    #[must_use]
    pub fn reset(mut self) -> Self {
        self.push(WireEvent::Reset);
        self
    }

    #[must_use]
    pub fn send_byte(mut self, value: u8) -> Self {
        for shift in [6, 4, 2, 0] {
            self.set_data((value >> shift) & DATA);
            self.pulse(false);
        }
        self
    }

    #[must_use]
    pub fn send_word(self, value: u16) -> Self {
        let [lo, hi] = value.to_le_bytes();
        self.send_byte(lo).send_byte(hi)
    }

    #[must_use]
    pub fn send_bytes(self, values: &[u8]) -> Self {
        values.iter().fold(self, |script, &b| script.send_byte(b))
    }

    /// Clock one byte out of the cartridge, polling on each pulse.
    #[must_use]
    pub fn receive_byte(mut self) -> Self {
        for _ in 0..4 {
            self.pulse(true);
        }
        self
    }

    #[must_use]
    pub fn receive_bytes(self, count: usize) -> Self {
        (0..count).fold(self, |script, _| script.receive_byte())
    }
}

// ---------------------------------------------------------------------------
// LoopbackHost
// ---------------------------------------------------------------------------

/// Host that drives the clock itself and feeds the data pairs it polls from
/// the cartridge back onto its own data inputs, one byte (four pulses) later.
#[derive(Debug, Default)]
pub struct LoopbackHost {
    pending: VecDeque<u8>,
    mirrored: VecDeque<u8>,
    input: u8,
    pulses_left: usize,
}

impl LoopbackHost {
    /// Closes the pipe after `pulses` clock pulses.
    #[must_use]
    pub fn new(pulses: usize) -> Self {
        Self {
            pulses_left: pulses,
            ..Self::default()
        }
    }

    fn drive(&mut self, bit: u8, high: bool) {
        let mask = 1 << bit;
        if (self.input & mask != 0) != high {
            self.input ^= mask;
            self.pending.push_back(if high {
                WireEvent::Rise(bit).code()
            } else {
                WireEvent::Fall(bit).code()
            });
        }
    }
}

impl WireLink for LoopbackHost {
    fn next_event(&mut self) -> io::Result<Option<u8>> {
        if self.pending.is_empty() {
            if self.pulses_left == 0 {
                return Ok(None);
            }
            self.pulses_left -= 1;
            // A byte echoes only once all four of its pairs have been polled
            let echo = if self.mirrored.len() >= 4 {
                self.mirrored.pop_front()
            } else {
                None
            };
            if let Some(pair) = echo {
                self.drive(0, pair & 0b01 != 0);
                self.drive(1, pair & 0b10 != 0);
            }
            self.drive(2, true);
            self.pending.push_back(WireEvent::Poll(0).code());
            self.drive(2, false);
        }
        Ok(self.pending.pop_front())
    }

    fn send_status(&mut self, status: u8) -> io::Result<()> {
        let lines = status.wrapping_sub(b'0');
        if lines & CLOCK != 0 {
            self.mirrored.push_back(lines & DATA);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_only_emits_changes() {
        let events = HostScript::new().send_byte(0x00).into_events();
        // Data stays low: four bare clock pulses
        assert_eq!(events, b"YXYXYXYX");
    }

    #[test]
    fn script_handshake_events() {
        let events = HostScript::new().handshake().into_events();
        assert_eq!(events, b"[_^]");
    }

    #[test]
    fn decode_groups_of_four() {
        assert_eq!(decode_status(b"67546777"), vec![0xB4, 0xBF]);
    }

    #[test]
    fn scripted_link_advances_clock() {
        let clock = ManualClock::new();
        let mut link = ScriptedLink::new([b'@']).with_clock(clock.clone());
        link.push_after(Duration::from_millis(300), b'@');
        link.next_event().expect("event");
        assert_eq!(crate::Clock::now(&clock), Duration::ZERO);
        link.next_event().expect("event");
        assert_eq!(crate::Clock::now(&clock), Duration::from_millis(300));
        assert_eq!(link.next_event().ok(), Some(None));
    }

    fn pulse_events(host: &mut LoopbackHost, status: u8) -> Vec<u8> {
        let mut events = Vec::new();
        while let Some(code) = host.next_event().expect("event") {
            events.push(code);
            if code == WireEvent::Poll(0).code() {
                host.send_status(status).expect("status");
            }
            if code == WireEvent::Fall(2).code() {
                break;
            }
        }
        events
    }

    #[test]
    fn loopback_echoes_a_whole_byte_later() {
        let clock = [
            WireEvent::Rise(2).code(),
            WireEvent::Poll(0).code(),
            WireEvent::Fall(2).code(),
        ];
        let mut host = LoopbackHost::new(5);
        // Output pairs 11, 00, 00, 00 with the clock high
        for status in [b'7', b'4', b'4', b'4'] {
            assert_eq!(pulse_events(&mut host, status), clock);
        }

        let fifth = pulse_events(&mut host, b'4');
        assert_eq!(
            fifth[..2],
            [WireEvent::Rise(0).code(), WireEvent::Rise(1).code()]
        );
        assert_eq!(fifth[2..], clock);
        assert_eq!(host.next_event().ok(), Some(None));
    }
}
