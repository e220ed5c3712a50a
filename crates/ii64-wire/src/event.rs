//! Event codes arriving on the host pipe.
//!
//! | Code          | Event                                   |
//! |---------------|-----------------------------------------|
//! | `@` (0x40)    | Reset pulse                             |
//! | `X` `Z` `\`   | Line 2, 1, 0 driven low                 |
//! | `Y` `[` `]`   | Line 2, 1, 0 driven high                |
//! | `^` (0x5E)    | NMI released                            |
//! | `_` (0x5F)    | NMI asserted                            |
//! | `a` `b` `c`   | Host samples the outputs (poll)         |

use crate::error::WireError;

/// One decoded host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEvent {
    Reset,
    /// Host reads the outputs through one of its three ports.
    Poll(u8),
    /// Input bit driven low.
    Fall(u8),
    /// Input bit driven high.
    Rise(u8),
    NmiAssert,
    NmiDeassert,
}

/// Input bit addressed by a line event code.
const fn line_bit(code: u8) -> u8 {
    2 - ((code >> 1) & 0b11)
}

impl WireEvent {
    /// The byte the host sends for this event.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Reset => 0x40,
            Self::Poll(port) => 0x61 + (port % 3),
            Self::Fall(bit) => 0x58 + 2 * (2 - (bit % 3)),
            Self::Rise(bit) => 0x59 + 2 * (2 - (bit % 3)),
            Self::NmiAssert => 0x5F,
            Self::NmiDeassert => 0x5E,
        }
    }
}

impl TryFrom<u8> for WireEvent {
    type Error = WireError;

    fn try_from(code: u8) -> Result<Self, WireError> {
        match code {
            0x40 => Ok(Self::Reset),
            0x61..=0x63 => Ok(Self::Poll(code - 0x61)),
            0x58 | 0x5A | 0x5C => Ok(Self::Fall(line_bit(code))),
            0x59 | 0x5B | 0x5D => Ok(Self::Rise(line_bit(code))),
            0x5F => Ok(Self::NmiAssert),
            0x5E => Ok(Self::NmiDeassert),
            _ => Err(WireError::UnknownEvent(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_codes_map_to_bits() {
        assert_eq!(WireEvent::try_from(b'X').ok(), Some(WireEvent::Fall(2)));
        assert_eq!(WireEvent::try_from(b'Y').ok(), Some(WireEvent::Rise(2)));
        assert_eq!(WireEvent::try_from(b'Z').ok(), Some(WireEvent::Fall(1)));
        assert_eq!(WireEvent::try_from(b'[').ok(), Some(WireEvent::Rise(1)));
        assert_eq!(WireEvent::try_from(b'\\').ok(), Some(WireEvent::Fall(0)));
        assert_eq!(WireEvent::try_from(b']').ok(), Some(WireEvent::Rise(0)));
    }

    #[test]
    fn control_codes() {
        assert_eq!(WireEvent::try_from(b'@').ok(), Some(WireEvent::Reset));
        assert_eq!(WireEvent::try_from(b'_').ok(), Some(WireEvent::NmiAssert));
        assert_eq!(WireEvent::try_from(b'^').ok(), Some(WireEvent::NmiDeassert));
        assert_eq!(WireEvent::try_from(b'c').ok(), Some(WireEvent::Poll(2)));
    }

    #[test]
    fn every_valid_code_encodes_back() {
        for code in 0..=u8::MAX {
            if let Ok(event) = WireEvent::try_from(code) {
                assert_eq!(event.code(), code, "{event:?}");
            }
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert!(matches!(
            WireEvent::try_from(0x41),
            Err(WireError::UnknownEvent(0x41))
        ));
        assert!(WireEvent::try_from(0x00).is_err());
        assert!(WireEvent::try_from(0x60).is_err());
    }
}
