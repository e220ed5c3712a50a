//! Wire errors and interrupt conditions.

use std::fmt;
use std::io;

use thiserror::Error;

/// Which half of the handshake saw the wrong line pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    /// Lines sampled when the NMI was released.
    Nmi,
    /// Lines sampled after bit 0 rose.
    Strobe,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nmi => write!(f, "after NMI"),
            Self::Strobe => write!(f, "after strobe"),
        }
    }
}

/// Anything that stops a wait before its edge arrives.
///
/// `Reset`, `Nmi` and `HostClosed` are control flow for the caller to act
/// on. The rest mean the two sides have lost sync.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("reset pulse from host")]
    Reset,
    #[error("NMI from host")]
    Nmi,
    #[error("host closed the event pipe")]
    HostClosed,
    #[error("unknown wire event 0x{0:02x}")]
    UnknownEvent(u8),
    #[error("handshake {stage}: expected lines {expected:03b}, found {found:03b}")]
    Handshake {
        stage: HandshakeStage,
        expected: u8,
        found: u8,
    },
    #[error("wire pipe: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// True for conditions no local recovery can fix.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownEvent(_) | Self::Handshake { .. } | Self::Io(_)
        )
    }
}
