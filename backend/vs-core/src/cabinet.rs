//! Dual-board cabinets.

use crate::control::DeviceRegistry;
use crate::manager::VsControlManager;
use crate::protection::GameIdentity;
use crate::sync::{BoardRole, CabinetLink, SharedRamOwner};
use std::sync::Arc;
use vs_config::VsControlConfig;

/// Owns the link between the two boards of a dual-board cabinet.
///
/// The boards' control managers only hold weak references to the link, so the cabinet must be
/// kept alive for as long as either board is running. If it is dropped early, handshake writes
/// and controller forwarding silently stop having cross-board effects.
#[derive(Debug)]
pub struct VsCabinet {
    link: Arc<CabinetLink>,
}

/// The two boards of a dual-board cabinet, each of which can be moved to its own thread.
#[derive(Debug)]
pub struct DualBoards {
    pub primary: VsControlManager,
    pub secondary: VsControlManager,
}

impl VsCabinet {
    #[must_use]
    pub fn new_dual(
        identity: GameIdentity,
        primary_config: VsControlConfig,
        secondary_config: VsControlConfig,
    ) -> (Self, DualBoards) {
        let primary_registry = Arc::new(DeviceRegistry::new());
        let secondary_registry = Arc::new(DeviceRegistry::new());
        let link = Arc::new(CabinetLink::new(
            Arc::clone(&primary_registry),
            Arc::clone(&secondary_registry),
        ));

        let primary = VsControlManager::new_dual(
            identity,
            primary_config,
            BoardRole::Primary,
            primary_registry,
            Arc::downgrade(&link),
        );
        let secondary = VsControlManager::new_dual(
            identity,
            secondary_config,
            BoardRole::Secondary,
            secondary_registry,
            Arc::downgrade(&link),
        );

        log::info!("Created dual-board cabinet for PRG CRC32 {identity}");

        (Self { link }, DualBoards { primary, secondary })
    }

    /// Whether the given board's external IRQ source is currently asserted by its companion.
    #[must_use]
    pub fn irq_low(&self, role: BoardRole) -> bool {
        self.link.board(role).irq().irq_low()
    }

    #[must_use]
    pub fn shared_ram_owner(&self) -> SharedRamOwner {
        self.link.shared_ram_owner()
    }
}
