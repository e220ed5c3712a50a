//! 6502 register directory.
//!
//! VICE numbers its registers per machine, so the ids for the six CPU
//! registers are looked up by name once at startup.

use std::collections::HashMap;

use crate::error::MonitorError;
use crate::protocol::Command;

/// A 6502 register the cartridge cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Pc,
    A,
    X,
    Y,
    Sp,
    Flags,
}

impl Register {
    pub const ALL: [Self; 6] = [Self::Pc, Self::A, Self::X, Self::Y, Self::Sp, Self::Flags];

    /// Name VICE reports for this register.
    #[must_use]
    pub const fn vice_name(self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::A => "A",
            Self::X => "X",
            Self::Y => "Y",
            Self::Sp => "SP",
            Self::Flags => "FL",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Id and width of one target register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    pub id: u8,
    /// 8 or 16.
    pub bits: u8,
}

/// One entry of a register dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterValue {
    pub id: u8,
    pub value: u16,
}

/// Register snapshot in cartridge terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuState {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub flags: u8,
}

impl CpuState {
    /// Order the status command shifts registers out to the host.
    #[must_use]
    pub fn status_bytes(&self) -> [u8; 7] {
        let [pc_lo, pc_hi] = self.pc.to_le_bytes();
        [self.sp, self.flags, pc_lo, pc_hi, self.a, self.x, self.y]
    }
}

/// Target ids for all six CPU registers. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDirectory {
    entries: [RegisterInfo; 6],
}

impl RegisterDirectory {
    /// Pick the six CPU registers out of the target's full list.
    pub fn resolve(available: &HashMap<String, RegisterInfo>) -> Result<Self, MonitorError> {
        let mut entries = [RegisterInfo { id: 0, bits: 0 }; 6];
        for reg in Register::ALL {
            entries[reg.index()] = *available
                .get(reg.vice_name())
                .ok_or(MonitorError::MissingRegister(reg.vice_name()))?;
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn info(&self, reg: Register) -> RegisterInfo {
        self.entries[reg.index()]
    }

    #[must_use]
    pub fn id(&self, reg: Register) -> u8 {
        self.info(reg).id
    }

    /// Decode a register dump. Registers the dump is missing are an error,
    /// extra ones are ignored.
    pub fn decode(&self, values: &[RegisterValue]) -> Result<CpuState, MonitorError> {
        let by_id: HashMap<u8, u16> = values.iter().map(|v| (v.id, v.value)).collect();
        let get = |reg: Register| {
            by_id
                .get(&self.id(reg))
                .copied()
                .ok_or(MonitorError::Malformed {
                    command: Command::RegistersGet,
                    reason: "register missing from dump",
                })
        };
        Ok(CpuState {
            pc: get(Register::Pc)?,
            a: get(Register::A)? as u8,
            x: get(Register::X)? as u8,
            y: get(Register::Y)? as u8,
            sp: get(Register::Sp)? as u8,
            flags: get(Register::Flags)? as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vice_registers() -> HashMap<String, RegisterInfo> {
        [
            ("A", 0, 8),
            ("X", 1, 8),
            ("Y", 2, 8),
            ("PC", 3, 16),
            ("SP", 4, 8),
            ("FL", 5, 8),
            ("LIN", 0x35, 16),
            ("CYC", 0x36, 16),
        ]
        .into_iter()
        .map(|(name, id, bits)| (name.to_string(), RegisterInfo { id, bits }))
        .collect()
    }

    #[test]
    fn resolves_all_six() {
        let dir = RegisterDirectory::resolve(&vice_registers()).expect("resolve");
        assert_eq!(dir.id(Register::Pc), 3);
        assert_eq!(dir.info(Register::Pc).bits, 16);
        assert_eq!(dir.id(Register::Flags), 5);
    }

    #[test]
    fn missing_register_fails() {
        let mut regs = vice_registers();
        regs.remove("FL");
        assert!(matches!(
            RegisterDirectory::resolve(&regs),
            Err(MonitorError::MissingRegister("FL"))
        ));
    }

    #[test]
    fn decode_dump() {
        let dir = RegisterDirectory::resolve(&vice_registers()).expect("resolve");
        let dump = [
            RegisterValue { id: 0, value: 0x11 },
            RegisterValue { id: 1, value: 0x22 },
            RegisterValue { id: 2, value: 0x33 },
            RegisterValue { id: 3, value: 0xE5CF },
            RegisterValue { id: 4, value: 0xF6 },
            RegisterValue { id: 5, value: 0x24 },
            RegisterValue { id: 0x35, value: 0x0100 },
        ];
        let cpu = dir.decode(&dump).expect("decode");
        assert_eq!(cpu.pc, 0xE5CF);
        assert_eq!(cpu.status_bytes(), [0xF6, 0x24, 0xCF, 0xE5, 0x11, 0x22, 0x33]);
    }

    #[test]
    fn decode_rejects_short_dump() {
        let dir = RegisterDirectory::resolve(&vice_registers()).expect("resolve");
        let dump = [RegisterValue { id: 3, value: 0x0801 }];
        assert!(dir.decode(&dump).is_err());
    }
}
