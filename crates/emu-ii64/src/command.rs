//! Cartridge command set.

use std::fmt;

use crate::cart::CartError;

/// Commands the Apple can send after a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartCommand {
    /// `start:u16 end:u16` in; `end - start + 1` bytes out.
    ReadRange = 0,
    /// `start:u16 end:u16` then `end - start + 1` data bytes in.
    WriteRange = 1,
    /// `start:u16` in; C64 jumps there.
    Execute = 2,
    /// Seven register bytes out: SP, P, PCL, PCH, A, X, Y.
    Status = 3,
}

impl TryFrom<u8> for CartCommand {
    type Error = CartError;

    fn try_from(code: u8) -> Result<Self, CartError> {
        match code {
            0 => Ok(Self::ReadRange),
            1 => Ok(Self::WriteRange),
            2 => Ok(Self::Execute),
            3 => Ok(Self::Status),
            other => Err(CartError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for CartCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadRange => "read range",
            Self::WriteRange => "write range",
            Self::Execute => "execute",
            Self::Status => "status",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        for code in 0..=3u8 {
            let command = CartCommand::try_from(code).expect("known");
            assert_eq!(command as u8, code);
        }
    }

    #[test]
    fn unknown_codes() {
        assert!(matches!(
            CartCommand::try_from(4),
            Err(CartError::UnknownCommand(4))
        ));
        assert!(CartCommand::try_from(0xFF).is_err());
    }
}
