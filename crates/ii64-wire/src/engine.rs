//! Wire protocol engine.
//!
//! Every wait consumes events in arrival order and applies their side
//! effects (line levels, NMI latch, reset debounce, poll answers) until the
//! wanted edge shows up. Resets and NMIs surface as `WireError::Reset` and
//! `WireError::Nmi` from whichever wait is in progress.

use std::time::Duration;

use crate::clock::Clock;
use crate::error::{HandshakeStage, WireError};
use crate::event::WireEvent;
use crate::lines::{CLOCK, Edge, Lines};
use crate::link::WireLink;

/// Line pattern the host presents when it releases the handshake NMI.
const HANDSHAKE_NMI: u8 = 0b010;

/// Line pattern after the host raises bit 0.
const HANDSHAKE_STROBE: u8 = 0b011;

/// Cartridge side of the line interface.
pub struct WireEngine<L, C> {
    link: L,
    clock: C,
    lines: Lines,
    reset_window: Duration,
}

impl<L: WireLink, C: Clock> WireEngine<L, C> {
    /// A reset accepted at time `t` suppresses further resets until
    /// `t + reset_window`.
    pub fn new(link: L, clock: C, reset_window: Duration) -> Self {
        Self {
            link,
            clock,
            lines: Lines::new(),
            reset_window,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &Lines {
        &self.lines
    }

    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Process events until the `mask` bits of the input see `edge`.
    pub fn wait_edge(&mut self, mask: u8, edge: Edge) -> Result<(), WireError> {
        while !self.process_event(Some((mask, edge)))? {}
        Ok(())
    }

    /// Process events until something interrupts. Never returns a completed
    /// wait, so the result is always the interrupting condition.
    pub fn wait_interrupt(&mut self) -> WireError {
        loop {
            if let Err(e) = self.process_event(None) {
                return e;
            }
        }
    }

    /// Consume one event. Returns true if it was the awaited edge.
    fn process_event(&mut self, wanted: Option<(u8, Edge)>) -> Result<bool, WireError> {
        let Some(code) = self.link.next_event()? else {
            return Err(WireError::HostClosed);
        };

        match WireEvent::try_from(code)? {
            WireEvent::Reset => {
                if self.lines.accept_reset(self.clock.now(), self.reset_window) {
                    return Err(WireError::Reset);
                }
                log::trace!("reset suppressed");
            }
            WireEvent::Poll(_) => {
                self.link.send_status(b'0' + self.lines.output())?;
            }
            WireEvent::Fall(bit) => {
                let (old, new) = self.lines.set_input(bit, false);
                return Ok(wanted.is_some_and(|(mask, edge)| edge.matches(mask, old, new)));
            }
            WireEvent::Rise(bit) => {
                let (old, new) = self.lines.set_input(bit, true);
                return Ok(wanted.is_some_and(|(mask, edge)| edge.matches(mask, old, new)));
            }
            WireEvent::NmiAssert => self.lines.latch_nmi(),
            WireEvent::NmiDeassert => {
                if self.lines.release_nmi() {
                    return Err(WireError::Nmi);
                }
            }
        }
        Ok(false)
    }

    /// Synchronise with the host before a command.
    ///
    /// The host releases an NMI with lines at `010`, then raises bit 0 to
    /// `011`. Each time the cartridge echoes the lines back on its outputs.
    pub fn handshake(&mut self) -> Result<(), WireError> {
        match self.wait_interrupt() {
            WireError::Nmi => {}
            other => return Err(other),
        }
        self.expect_input(HandshakeStage::Nmi, HANDSHAKE_NMI)?;
        self.lines.mirror_input();

        self.wait_edge(0b001, Edge::Rising)?;
        self.expect_input(HandshakeStage::Strobe, HANDSHAKE_STROBE)?;
        self.lines.mirror_input();
        Ok(())
    }

    fn expect_input(&self, stage: HandshakeStage, expected: u8) -> Result<(), WireError> {
        let found = self.lines.input();
        if found == expected {
            Ok(())
        } else {
            Err(WireError::Handshake {
                stage,
                expected,
                found,
            })
        }
    }

    /// One clock pulse: two bits in, two bits out.
    pub fn shift2(&mut self) -> Result<(), WireError> {
        self.wait_edge(CLOCK, Edge::Rising)?;
        self.lines.drive_output(CLOCK, true);
        self.lines.shift_pair();

        self.wait_edge(CLOCK, Edge::Falling)?;
        self.lines.drive_output(CLOCK, false);
        Ok(())
    }

    /// Shift in one byte from the host.
    pub fn get_byte(&mut self) -> Result<u8, WireError> {
        for _ in 0..4 {
            self.shift2()?;
        }
        Ok(self.lines.shift_register())
    }

    /// Shift one byte out to the host.
    pub fn put_byte(&mut self, value: u8) -> Result<(), WireError> {
        self.lines.load_shift(value);
        for _ in 0..4 {
            self.shift2()?;
        }
        Ok(())
    }

    /// Shift in a little-endian 16-bit value.
    pub fn get_word(&mut self) -> Result<u16, WireError> {
        let lo = self.get_byte()?;
        let hi = self.get_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::harness::{HostScript, ScriptedLink};
    use crate::lines::DATA;

    const WINDOW: Duration = Duration::from_secs(1);

    fn engine(events: Vec<u8>) -> WireEngine<ScriptedLink, ManualClock> {
        WireEngine::new(ScriptedLink::new(events), ManualClock::new(), WINDOW)
    }

    #[test]
    fn poll_reports_output_levels() {
        let mut wire = engine(vec![b'a', b'b', b'c']);
        assert!(matches!(wire.wait_interrupt(), WireError::HostClosed));
        assert_eq!(wire.link().status(), b"000");
    }

    #[test]
    fn wait_ignores_unrelated_lines() {
        // Data lines toggle, then the clock rises
        let mut wire = engine(vec![b']', b'[', b'\\', b'Y']);
        wire.wait_edge(CLOCK, Edge::Rising).expect("clock edge");
        assert_eq!(wire.lines().input(), 0b110);
        assert_eq!(wire.link().remaining(), 0);
    }

    #[test]
    fn falling_edge_needs_line_high_first() {
        // Bit 2 is already low, so X is not a falling edge until after Y
        let mut wire = engine(vec![b'X', b'Y', b'X', b'a']);
        wire.wait_edge(CLOCK, Edge::Falling).expect("clock edge");
        assert_eq!(wire.link().remaining(), 1);
    }

    #[test]
    fn nmi_latched_during_wait() {
        let mut wire = engine(vec![b'_', b'Y']);
        wire.wait_edge(CLOCK, Edge::Rising).expect("clock edge");
        assert!(wire.lines().nmi_latched());
    }

    #[test]
    fn nmi_release_without_assert_ignored() {
        let mut wire = engine(vec![b'^', b'Y']);
        wire.wait_edge(CLOCK, Edge::Rising).expect("clock edge");
    }

    #[test]
    fn nmi_interrupts_edge_wait() {
        let mut wire = engine(vec![b'_', b'^', b'Y']);
        assert!(matches!(
            wire.wait_edge(CLOCK, Edge::Rising),
            Err(WireError::Nmi)
        ));
        assert!(!wire.lines().nmi_latched());
    }

    #[test]
    fn reset_interrupts_edge_wait() {
        let mut wire = engine(vec![b'@', b'Y']);
        assert!(matches!(
            wire.wait_edge(CLOCK, Edge::Rising),
            Err(WireError::Reset)
        ));
    }

    #[test]
    fn unknown_event_is_fatal() {
        let mut wire = engine(vec![b'Q']);
        let err = wire.wait_interrupt();
        assert!(matches!(err, WireError::UnknownEvent(b'Q')));
        assert!(err.is_fatal());
    }

    #[test]
    fn handshake_mirrors_lines() {
        let events = HostScript::new().handshake().into_events();
        let mut wire = engine(events);
        wire.handshake().expect("handshake");
        assert_eq!(wire.lines().input(), 0b011);
        assert_eq!(wire.lines().output(), 0b011);
    }

    #[test]
    fn handshake_rejects_wrong_nmi_pattern() {
        // Lines at 110 when the NMI is released
        let mut wire = engine(vec![b'[', b'Y', b'_', b'^']);
        assert!(matches!(
            wire.handshake(),
            Err(WireError::Handshake {
                stage: HandshakeStage::Nmi,
                expected: 0b010,
                found: 0b110,
            })
        ));
    }

    #[test]
    fn handshake_rejects_wrong_strobe_pattern() {
        // Clock comes up before bit 0 rises
        let mut wire = engine(vec![b'[', b'_', b'^', b'Y', b']']);
        assert!(matches!(
            wire.handshake(),
            Err(WireError::Handshake {
                stage: HandshakeStage::Strobe,
                expected: 0b011,
                found: 0b111,
            })
        ));
    }

    #[test]
    fn get_byte_msb_pair_first() {
        let events = HostScript::new().send_byte(0b1101_0010).into_events();
        let mut wire = engine(events);
        assert_eq!(wire.get_byte().expect("byte"), 0b1101_0010);
        assert_eq!(wire.lines().output() & CLOCK, 0);
    }

    #[test]
    fn get_word_little_endian() {
        let events = HostScript::new().send_word(0x0801).into_events();
        let mut wire = engine(events);
        assert_eq!(wire.get_word().expect("word"), 0x0801);
    }

    #[test]
    fn put_byte_drives_pairs() {
        let events = HostScript::new().receive_byte().into_events();
        let mut wire = engine(events);
        wire.put_byte(0xB4).expect("byte");
        // Clock output high during each poll, data pairs 10 11 01 00
        assert_eq!(wire.link().status(), b"6754");
        assert_eq!(wire.link().received_bytes(), vec![0xB4]);
        assert_eq!(wire.lines().output() & DATA, 0b00);
    }
}
