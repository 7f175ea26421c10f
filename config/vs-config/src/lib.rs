//! Configuration types for the VS System control peripheral.
//!
//! These are plain values handed to the control manager at construction or reset time. Nothing in
//! the core reads configuration from global state.

use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The 8 DIP switches on a VS System board, bit N = switch N+1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VsDipSwitches(pub u8);

impl VsDipSwitches {
    #[inline]
    #[must_use]
    pub fn switch(self, i: u8) -> bool {
        debug_assert!(i < 8);
        self.0 & (1 << i) != 0
    }

    #[must_use]
    pub fn with_switch(self, i: u8, on: bool) -> Self {
        debug_assert!(i < 8);
        if on { Self(self.0 | (1 << i)) } else { Self(self.0 & !(1 << i)) }
    }
}

impl Display for VsDipSwitches {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{:08b}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VsConfigError {
    #[error("invalid DIP switch value '{0}'; expected decimal, 0x-prefixed hex, or %-prefixed binary")]
    InvalidDipSwitches(String),
}

impl FromStr for VsDipSwitches {
    type Err = VsConfigError;

    /// Accepts `60`, `0x3C`, `$3C`, `%00111100`, or `0b00111100`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = if let Some(hex) =
            trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix('$'))
        {
            u8::from_str_radix(hex, 16)
        } else if let Some(bin) =
            trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix('%'))
        {
            u8::from_str_radix(&bin.replace('_', ""), 2)
        } else {
            trimmed.parse()
        };

        parsed.map(Self).map_err(|_| VsConfigError::InvalidDipSwitches(s.into()))
    }
}

/// Physical harness variants used by different VS System cabinets to wire the two pads to the
/// board's controller inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VsWiringVariant {
    /// Select and Start swapped on each pad
    A,
    /// Ports swapped, Select/Start crossed between the pads
    B,
    /// Ports swapped, one pad's Start doubles as the other pad's Select
    C,
    /// Same as B with Select inverted on both pads
    D,
    /// P1 B crossed with P2 A, Select/Start swapped on each pad
    E,
}

impl VsWiringVariant {
    pub const ALL: [Self; 5] = [Self::A, Self::B, Self::C, Self::D, Self::E];

    #[must_use]
    pub fn swaps_ports(self) -> bool {
        matches!(self, Self::B | Self::C | Self::D)
    }
}

impl Display for VsWiringVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::A => "Type A",
            Self::B => "Type B",
            Self::C => "Type C",
            Self::D => "Type D",
            Self::E => "Type E",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VsControllerType {
    None,
    #[default]
    StandardController,
    Zapper,
    VsZapper,
}

impl VsControllerType {
    /// VS cabinets use a light gun with a serial protocol that differs from the home console
    /// Zapper, so a configured Zapper is always created as a VS Zapper.
    #[must_use]
    pub fn for_vs_system(self) -> Self {
        match self {
            Self::Zapper => Self::VsZapper,
            other => other,
        }
    }
}

impl Display for VsControllerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::StandardController => "Standard controller",
            Self::Zapper => "Zapper",
            Self::VsZapper => "VS Zapper",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VsControlConfig {
    pub dip_switches: VsDipSwitches,
    /// None for cabinets wired like a standard NES (no remapping)
    pub wiring_variant: Option<VsWiringVariant>,
    /// Device types for ports 1-4; ignored in dual-board mode, which always uses 4 standard
    /// controllers
    pub port_types: [VsControllerType; 4],
}

impl Default for VsControlConfig {
    fn default() -> Self {
        Self {
            dip_switches: VsDipSwitches::default(),
            wiring_variant: None,
            port_types: [
                VsControllerType::StandardController,
                VsControllerType::StandardController,
                VsControllerType::None,
                VsControllerType::None,
            ],
        }
    }
}
