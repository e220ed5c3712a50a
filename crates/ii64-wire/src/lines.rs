//! Signal line state.
//!
//! Input and output levels are tracked separately: the host drives the
//! inputs, the cartridge drives the outputs. A line the host reads back
//! is whatever the cartridge last drove, regardless of what the host is
//! driving on its side.

use std::time::Duration;

/// Clock line (bit 2).
pub const CLOCK: u8 = 0b100;

/// Both data lines (bits 0-1).
pub const DATA: u8 = 0b011;

/// All three lines.
pub const LINE_MASK: u8 = 0b111;

/// Direction of a line transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Some masked bit was high and now all masked bits are low.
    Falling,
    /// All masked bits were low and now some masked bit is high.
    Rising,
}

impl Edge {
    /// Whether the input change `old -> new` is this edge on the `mask` bits.
    ///
    /// An empty mask never matches.
    #[must_use]
    pub const fn matches(self, mask: u8, old: u8, new: u8) -> bool {
        match self {
            Self::Falling => old & mask != 0 && new & mask == 0,
            Self::Rising => old & mask == 0 && new & mask != 0,
        }
    }
}

/// Line levels, shift register and latched interrupt state.
///
/// Only the wire engine mutates this; everyone else gets a shared reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lines {
    input: u8,
    output: u8,
    shift: u8,
    nmi_latched: bool,
    /// Resets arriving at or before this instant are debounced away.
    reset_suppress_until: Option<Duration>,
}

impl Lines {
    /// All lines low, shift register clear, nothing latched.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels the host is driving (0-7).
    #[must_use]
    pub fn input(&self) -> u8 {
        self.input
    }

    /// Levels the cartridge is driving (0-7).
    #[must_use]
    pub fn output(&self) -> u8 {
        self.output
    }

    /// Byte being shifted: bits out leave the top, bits in enter the bottom.
    #[must_use]
    pub fn shift_register(&self) -> u8 {
        self.shift
    }

    /// True between an NMI assert and its matching deassert.
    #[must_use]
    pub fn nmi_latched(&self) -> bool {
        self.nmi_latched
    }

    /// Resets arriving before this time are ignored.
    #[must_use]
    pub fn reset_suppress_until(&self) -> Option<Duration> {
        self.reset_suppress_until
    }

    /// Set one input bit. Returns the input levels before and after.
    pub(crate) fn set_input(&mut self, bit: u8, high: bool) -> (u8, u8) {
        let old = self.input;
        let mask = (1 << bit) & LINE_MASK;
        if high {
            self.input |= mask;
        } else {
            self.input &= !mask;
        }
        (old, self.input)
    }

    /// Drive the masked output bits high or low.
    pub(crate) fn drive_output(&mut self, mask: u8, high: bool) {
        if high {
            self.output |= mask & LINE_MASK;
        } else {
            self.output &= !mask;
        }
    }

    /// Drive every output to the level the host is driving.
    pub(crate) fn mirror_input(&mut self) {
        self.output = self.input;
    }

    pub(crate) fn load_shift(&mut self, value: u8) {
        self.shift = value;
    }

    /// Move one bit pair each way: the top pair of the shift register goes
    /// out on the data lines, the host's data lines come in at the bottom.
    pub(crate) fn shift_pair(&mut self) {
        let bits_in = self.input & DATA;
        let bits_out = (self.shift >> 6) & DATA;
        self.output = (self.output & !DATA) | bits_out;
        self.shift = (self.shift << 2) | bits_in;
    }

    pub(crate) fn latch_nmi(&mut self) {
        self.nmi_latched = true;
    }

    /// Clear the NMI latch. Returns whether it was set.
    pub(crate) fn release_nmi(&mut self) -> bool {
        std::mem::replace(&mut self.nmi_latched, false)
    }

    /// Accept a reset at `now` unless it falls inside the suppression window
    /// of the last accepted one.
    pub(crate) fn accept_reset(&mut self, now: Duration, window: Duration) -> bool {
        if self.reset_suppress_until.is_some_and(|until| now <= until) {
            return false;
        }
        self.reset_suppress_until = Some(now + window);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_start_low() {
        let lines = Lines::new();
        assert_eq!(lines.input(), 0);
        assert_eq!(lines.output(), 0);
        assert_eq!(lines.shift_register(), 0);
        assert!(!lines.nmi_latched());
    }

    #[test]
    fn set_input_reports_transition() {
        let mut lines = Lines::new();
        assert_eq!(lines.set_input(2, true), (0b000, 0b100));
        assert_eq!(lines.set_input(0, true), (0b100, 0b101));
        assert_eq!(lines.set_input(2, false), (0b101, 0b001));
        // Driving a line to its current level is not a transition
        assert_eq!(lines.set_input(0, true), (0b001, 0b001));
    }

    #[test]
    fn output_independent_of_input() {
        let mut lines = Lines::new();
        lines.set_input(1, true);
        assert_eq!(lines.output(), 0);
        lines.drive_output(CLOCK, true);
        assert_eq!(lines.input(), 0b010);
        assert_eq!(lines.output(), 0b100);
        lines.mirror_input();
        assert_eq!(lines.output(), 0b010);
    }

    #[test]
    fn edges() {
        assert!(Edge::Rising.matches(CLOCK, 0b011, 0b111));
        assert!(!Edge::Rising.matches(CLOCK, 0b100, 0b101));
        assert!(Edge::Falling.matches(CLOCK, 0b110, 0b010));
        assert!(!Edge::Falling.matches(CLOCK, 0b010, 0b000));
        assert!(!Edge::Rising.matches(0, 0b000, 0b111));
    }

    #[test]
    fn shift_pair_moves_both_ways() {
        let mut lines = Lines::new();
        lines.load_shift(0b1001_0110);
        lines.set_input(0, true);
        lines.drive_output(CLOCK, true);
        lines.shift_pair();
        // Top pair 10 out, input pair 01 in
        assert_eq!(lines.output(), 0b110);
        assert_eq!(lines.shift_register(), 0b0101_1001);
    }

    #[test]
    fn nmi_latch_releases_once() {
        let mut lines = Lines::new();
        assert!(!lines.release_nmi());
        lines.latch_nmi();
        assert!(lines.release_nmi());
        assert!(!lines.release_nmi());
    }

    #[test]
    fn reset_debounce_window() {
        let window = Duration::from_secs(1);
        let mut lines = Lines::new();
        assert!(lines.accept_reset(Duration::ZERO, window));
        assert!(!lines.accept_reset(Duration::from_millis(500), window));
        assert!(!lines.accept_reset(Duration::from_secs(1), window));
        assert!(lines.accept_reset(Duration::from_millis(1001), window));
        assert_eq!(
            lines.reset_suppress_until(),
            Some(Duration::from_millis(2001))
        );
    }
}
