//! Monitor protocol errors. All of them mean the session cannot continue.

use std::io;

use thiserror::Error;

use crate::protocol::Command;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("bad response header: start 0x{stx:02x}, api 0x{api:02x}")]
    BadHeader { stx: u8, api: u8 },
    #[error("response body of {0} bytes is implausibly large")]
    BodyTooLarge(u32),
    #[error("response for request {found:#010x}, expected {expected:#010x}")]
    RequestMismatch { expected: u32, found: u32 },
    #[error("{command:?} failed with error code 0x{code:02x}")]
    ErrorCode { command: Command, code: u8 },
    #[error("{command:?} answered with response type 0x{found:02x}")]
    UnexpectedResponse { command: Command, found: u8 },
    #[error("malformed {command:?} response: {reason}")]
    Malformed {
        command: Command,
        reason: &'static str,
    },
    #[error("request {0:#010x} still outstanding")]
    RequestOutstanding(u32),
    #[error("request ids exhausted")]
    IdsExhausted,
    #[error("target has no {0} register")]
    MissingRegister(&'static str),
    #[error("target has no memory bank named {0:?}")]
    BankNotFound(&'static str),
    #[error("monitor connection: {0}")]
    Io(#[from] io::Error),
}
