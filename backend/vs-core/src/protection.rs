//! Copy protection circuits found on some VS System boards.
//!
//! Each of these behaves like a 32-step shift register: every qualifying read returns the next
//! byte of a fixed sequence, and the sequence wraps around after 32 reads. Games verify the
//! sequence and refuse to run (or misbehave in subtle ways) if it does not match.

use bincode::{Decode, Encode};
use crc::Crc;
use std::fmt::{Display, Formatter};

const CRC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

pub const PROTECTION_RESET_ADDRESS: u16 = 0x5E00;
pub const PROTECTION_READ_ADDRESS: u16 = 0x5E01;
pub const PROTECTION_WINDOW_START: u16 = 0x5400;
pub const PROTECTION_WINDOW_END: u16 = 0x57FF;

const PROTECTION_TABLE_LEN: usize = 32;

// TKO Boxing
const TKO_BOXING_TABLE: [u8; PROTECTION_TABLE_LEN] = [
    0xFF, 0xBF, 0xB7, 0x97, 0x97, 0x17, 0x57, 0x4F, 0x6F, 0x6B, 0xEB, 0xA9, 0xB1, 0x90, 0x94, 0x14,
    0x56, 0x4E, 0x6F, 0x6B, 0xEB, 0xA9, 0xB1, 0x90, 0xD4, 0x5C, 0x3E, 0x26, 0x87, 0x83, 0x13, 0x00,
];

// RBI Baseball
const RBI_BASEBALL_TABLE: [u8; PROTECTION_TABLE_LEN] = [
    0x00, 0x00, 0x00, 0x00, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x6F, 0x00, 0x00, 0x00, 0x00, 0x94, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

// Super Xevious
const SUPER_XEVIOUS_TABLE: [u8; PROTECTION_TABLE_LEN] = [
    0x05, 0x01, 0x89, 0x37, 0x05, 0x00, 0xD1, 0x3E, 0x05, 0x01, 0x89, 0x37, 0x05, 0x00, 0xD1, 0x3E,
    0x05, 0x01, 0x89, 0x37, 0x05, 0x00, 0xD1, 0x3E, 0x05, 0x01, 0x89, 0x37, 0x05, 0x00, 0xD1, 0x3E,
];

/// CRC-32 of the PRG ROM; identifies which game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct GameIdentity(pub u32);

impl GameIdentity {
    #[must_use]
    pub fn from_prg_rom(prg_rom: &[u8]) -> Self {
        Self(CRC.checksum(prg_rom))
    }
}

impl Display for GameIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Where the game reads its protection circuit from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionPort {
    /// A single register at $5E01
    Register,
    /// Any address in $5400-$57FF
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ProtectionChip {
    TkoBoxing,
    RbiBaseball,
    SuperXevious,
}

impl ProtectionChip {
    #[must_use]
    pub fn from_identity(identity: GameIdentity) -> Option<Self> {
        match identity.0 {
            0xEB2DBA63 | 0x98CFE016 => Some(Self::TkoBoxing),
            0x135ADF7C => Some(Self::RbiBaseball),
            0xF9D3B0A3 | 0x66BB838F | 0x9924980A => Some(Self::SuperXevious),
            _ => None,
        }
    }

    #[must_use]
    pub fn table(self) -> &'static [u8; PROTECTION_TABLE_LEN] {
        match self {
            Self::TkoBoxing => &TKO_BOXING_TABLE,
            Self::RbiBaseball => &RBI_BASEBALL_TABLE,
            Self::SuperXevious => &SUPER_XEVIOUS_TABLE,
        }
    }

    #[must_use]
    pub fn port(self) -> ProtectionPort {
        match self {
            Self::TkoBoxing | Self::RbiBaseball => ProtectionPort::Register,
            Self::SuperXevious => ProtectionPort::Window,
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ProtectionCircuit {
    chip: Option<ProtectionChip>,
    counter: u8,
}

impl ProtectionCircuit {
    #[must_use]
    pub fn new(identity: GameIdentity) -> Self {
        let chip = ProtectionChip::from_identity(identity);
        if let Some(chip) = chip {
            log::info!("Detected {chip:?} protection circuit for PRG CRC32 {identity}");
        }

        Self { chip, counter: 0 }
    }

    #[must_use]
    pub fn chip(&self) -> Option<ProtectionChip> {
        self.chip
    }

    /// Whether reads through the given port hit this circuit.
    #[must_use]
    pub fn responds_to(&self, port: ProtectionPort) -> bool {
        self.chip.is_some_and(|chip| chip.port() == port)
    }

    /// Read the next byte of the sequence. Returns None without advancing if no circuit is
    /// present.
    pub fn read(&mut self) -> Option<u8> {
        let chip = self.chip?;
        let value = chip.table()[(self.counter & 0x1F) as usize];
        log::trace!("Protection read at step {}: {value:02X}", self.counter & 0x1F);
        self.counter = self.counter.wrapping_add(1);
        Some(value)
    }

    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    #[must_use]
    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn set_counter(&mut self, counter: u8) {
        self.counter = counter;
    }
}
