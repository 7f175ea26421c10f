//! Synchronization between the two boards of a dual-board VS System cabinet.
//!
//! Dual-board games (e.g. VS Tennis, VS Mahjong) run on two boards that share 2KB of work RAM and
//! can interrupt each other. Bit 1 of each board's `$4016` writes drives the other board's /IRQ
//! line, and on the primary board it also selects which board currently owns the shared RAM.
//!
//! Controllers 3 and 4 are physically wired to the secondary board's controller inputs 1 and 2.

use crate::control::DeviceRegistry;
use crate::num::GetBit;
use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum BoardRole {
    Primary,
    Secondary,
}

impl BoardRole {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn companion(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Handshake bit value written at reset.
    #[inline]
    #[must_use]
    pub fn initial_handshake_bit(self) -> u8 {
        match self {
            Self::Primary => 0x00,
            Self::Secondary => 0x02,
        }
    }
}

impl Display for BoardRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqSource {
    External,
}

impl IrqSource {
    fn to_low_pull_bit(self) -> u8 {
        match self {
            Self::External => 0x01,
        }
    }
}

/// IRQ sources that other parts of the cabinet can pull low on a board's CPU.
///
/// Writes are immediately visible to the owning board the next time it polls its interrupt lines.
#[derive(Debug, Default)]
pub struct IrqLines {
    low_pulls: AtomicU8,
}

impl IrqLines {
    pub fn set_irq_source(&self, source: IrqSource) {
        self.low_pulls.fetch_or(source.to_low_pull_bit(), Ordering::AcqRel);
    }

    pub fn clear_irq_source(&self, source: IrqSource) {
        self.low_pulls.fetch_and(!source.to_low_pull_bit(), Ordering::AcqRel);
    }

    #[must_use]
    pub fn has_irq_source(&self, source: IrqSource) -> bool {
        self.low_pulls.load(Ordering::Acquire) & source.to_low_pull_bit() != 0
    }

    #[must_use]
    pub fn irq_low(&self) -> bool {
        self.low_pulls.load(Ordering::Acquire) != 0
    }
}

/// The parts of one board that are reachable from the other board.
#[derive(Debug)]
pub struct BoardLink {
    registry: Arc<DeviceRegistry>,
    irq: IrqLines,
}

impl BoardLink {
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn irq(&self) -> &IrqLines {
        &self.irq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum SharedRamOwner {
    Primary,
    Secondary,
}

/// The association between the two boards of a cabinet. Owned by the cabinet; boards only hold
/// weak references to it.
#[derive(Debug)]
pub struct CabinetLink {
    boards: [BoardLink; 2],
    // True if the primary board owns the shared work RAM
    primary_owns_shared_ram: AtomicBool,
}

impl CabinetLink {
    #[must_use]
    pub fn new(
        primary_registry: Arc<DeviceRegistry>,
        secondary_registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            boards: [
                BoardLink { registry: primary_registry, irq: IrqLines::default() },
                BoardLink { registry: secondary_registry, irq: IrqLines::default() },
            ],
            primary_owns_shared_ram: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn board(&self, role: BoardRole) -> &BoardLink {
        &self.boards[role.index()]
    }

    #[must_use]
    pub fn shared_ram_owner(&self) -> SharedRamOwner {
        if self.primary_owns_shared_ram.load(Ordering::Acquire) {
            SharedRamOwner::Primary
        } else {
            SharedRamOwner::Secondary
        }
    }

    fn update_memory_access(&self, handshake_bit: u8) {
        self.primary_owns_shared_ram.store(handshake_bit.bit(1), Ordering::Release);
    }
}

/// One board's side of the dual-board handshake.
#[derive(Debug, Clone)]
pub struct SyncBridge {
    role: BoardRole,
    link: Weak<CabinetLink>,
    handshake_bit: u8,
}

impl SyncBridge {
    #[must_use]
    pub fn new(role: BoardRole, link: Weak<CabinetLink>) -> Self {
        Self { role, link, handshake_bit: role.initial_handshake_bit() }
    }

    #[must_use]
    pub fn handshake_bit(&self) -> u8 {
        self.handshake_bit
    }

    #[must_use]
    pub fn link(&self) -> Option<Arc<CabinetLink>> {
        self.link.upgrade()
    }

    /// Apply the reset value for this board's role, including its side effects.
    pub fn reset(&mut self) {
        self.update_handshake_bit(self.role.initial_handshake_bit());
    }

    /// Handle a `$4016` write. Only bit 1 is relevant; rewriting the current value does nothing.
    pub fn write(&mut self, value: u8) {
        let handshake_bit = value & 0x02;
        if handshake_bit != self.handshake_bit {
            self.update_handshake_bit(handshake_bit);
        }
    }

    /// Restore the handshake bit from a save state. The companion's IRQ line and the shared RAM
    /// owner are derived from the bit, so they are re-applied as well.
    pub fn restore_handshake_bit(&mut self, handshake_bit: u8) {
        self.update_handshake_bit(handshake_bit & 0x02);
    }

    fn update_handshake_bit(&mut self, handshake_bit: u8) {
        self.handshake_bit = handshake_bit;

        let Some(link) = self.link.upgrade() else {
            log::warn!("Cabinet was dropped while the {} board is still running", self.role);
            return;
        };

        if self.role == BoardRole::Primary {
            link.update_memory_access(handshake_bit);
        }

        let companion_irq = link.board(self.role.companion()).irq();
        if handshake_bit != 0 {
            log::debug!("{} board released companion IRQ", self.role);
            companion_irq.clear_irq_source(IrqSource::External);
        } else {
            // Low asserts /IRQ on the other CPU
            log::debug!("{} board asserted companion IRQ", self.role);
            companion_irq.set_irq_source(IrqSource::External);
        }
    }

    /// Copy the raw state of the primary board's ports 2 and 3 into this board's ports 0 and 1.
    ///
    /// Missing boards or devices are skipped; the local device keeps its previous state.
    pub fn forward_inputs(&self, local: &DeviceRegistry) {
        if self.role != BoardRole::Secondary {
            return;
        }

        let Some(link) = self.link.upgrade() else { return };
        let primary = link.board(BoardRole::Primary).registry();

        for port in 0..2 {
            let Some(source) = primary.device(port + 2) else { continue };
            let Some(target) = local.device(port) else { continue };

            // Source lock is released before the target is locked
            let raw_state = source.lock().raw_state();
            target.lock().set_raw_state(raw_state);
        }
    }
}
