//! The VS System control manager: register decoding for one board.
//!
//! Register map (`$4016-$5FFF`):
//! * `$4016` read: controller port 1 serial bit, DIP switches 1-2 in bits 3-4, bit 7 set on the
//!   secondary board of a dual-board cabinet
//! * `$4016` write: bit 0 controller strobe, bit 1 dual-board handshake, bit 2 PRG/CHR select
//! * `$4017` read: controller port 2 serial bit, DIP switches 3-8 in bits 2-7
//! * `$5E00` read/write: reset the protection circuit's sequence
//! * `$5E01` read: next protection byte (TKO Boxing, RBI Baseball)
//! * `$5400-$57FF` read: next protection byte (Super Xevious)
//!
//! Everything else is handled by the base control manager.

#[cfg(test)]
mod tests;

use crate::control::{
    ControlManager, ControlManagerState, DeviceHandle, DeviceRegistry, JOY1_ADDRESS, JOY2_ADDRESS,
};
use crate::input::{ControlDevice, VsInputs};
use crate::num::GetBit;
use crate::protection::{
    GameIdentity, PROTECTION_READ_ADDRESS, PROTECTION_RESET_ADDRESS, PROTECTION_WINDOW_END,
    PROTECTION_WINDOW_START, ProtectionCircuit, ProtectionPort,
};
use crate::remap;
use crate::sync::{BoardRole, CabinetLink, IrqSource, SharedRamOwner, SyncBridge};
use bincode::{Decode, Encode};
use std::sync::{Arc, Weak};
use vs_config::VsControlConfig;

pub const VS_REGISTERS_START: u16 = 0x4016;
pub const VS_REGISTERS_END: u16 = 0x5FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsRegister {
    Joy1,
    Joy2,
    ProtectionReset,
    ProtectionRead,
    ProtectionWindow,
    Other,
}

impl VsRegister {
    #[must_use]
    pub fn from_address(address: u16) -> Self {
        match address {
            JOY1_ADDRESS => Self::Joy1,
            JOY2_ADDRESS => Self::Joy2,
            PROTECTION_RESET_ADDRESS => Self::ProtectionReset,
            PROTECTION_READ_ADDRESS => Self::ProtectionRead,
            PROTECTION_WINDOW_START..=PROTECTION_WINDOW_END => Self::ProtectionWindow,
            _ => Self::Other,
        }
    }
}

/// Manager state that is persisted in save states.
///
/// The game identity and wiring variant are not included; they come from the loaded ROM and the
/// current configuration.
#[derive(Debug, Clone, Encode, Decode)]
pub struct VsControlSnapshot {
    pub select_bit: u8,
    pub refresh_state: bool,
    pub protection_counter: u8,
    /// Only present on dual-board cabinets
    pub handshake_bit: Option<u8>,
    pub base: ControlManagerState,
}

#[derive(Debug)]
pub struct VsControlManager {
    base: ControlManager,
    config: VsControlConfig,
    identity: GameIdentity,
    role: BoardRole,
    protection: ProtectionCircuit,
    select_bit: u8,
    refresh_state: bool,
    sync: Option<SyncBridge>,
    forwarding_inputs: bool,
}

impl VsControlManager {
    /// Create the manager for a single-board cabinet.
    #[must_use]
    pub fn new(identity: GameIdentity, config: VsControlConfig) -> Self {
        Self::create(identity, config, BoardRole::Primary, ControlManager::new(), None)
    }

    pub(crate) fn new_dual(
        identity: GameIdentity,
        config: VsControlConfig,
        role: BoardRole,
        registry: Arc<DeviceRegistry>,
        link: Weak<CabinetLink>,
    ) -> Self {
        let sync = SyncBridge::new(role, link);
        Self::create(identity, config, role, ControlManager::with_registry(registry), Some(sync))
    }

    fn create(
        identity: GameIdentity,
        config: VsControlConfig,
        role: BoardRole,
        base: ControlManager,
        sync: Option<SyncBridge>,
    ) -> Self {
        let mut manager = Self {
            base,
            config,
            identity,
            role,
            protection: ProtectionCircuit::new(identity),
            select_bit: 0,
            refresh_state: false,
            sync,
            forwarding_inputs: false,
        };
        manager.reset(false);
        manager
    }

    #[must_use]
    pub fn identity(&self) -> GameIdentity {
        self.identity
    }

    #[must_use]
    pub fn role(&self) -> BoardRole {
        self.role
    }

    #[must_use]
    pub fn is_dual_system(&self) -> bool {
        self.sync.is_some()
    }

    #[must_use]
    pub fn config(&self) -> &VsControlConfig {
        &self.config
    }

    pub fn reload_config(&mut self, config: VsControlConfig) {
        let port_types_changed = config.port_types != self.config.port_types;
        self.config = config;

        if port_types_changed {
            self.update_control_devices();
        }
    }

    /// PRG/CHR bank select bit from the last `$4016` write, used by the VS System mapper.
    #[must_use]
    pub fn prg_chr_select_bit(&self) -> u8 {
        self.select_bit
    }

    /// Whether the other board is currently asserting this board's external IRQ source.
    #[must_use]
    pub fn external_irq(&self) -> bool {
        self.sync
            .as_ref()
            .and_then(SyncBridge::link)
            .is_some_and(|link| link.board(self.role).irq().has_irq_source(IrqSource::External))
    }

    /// Which board currently owns the shared work RAM; None on single-board cabinets.
    #[must_use]
    pub fn shared_ram_owner(&self) -> Option<SharedRamOwner> {
        self.sync.as_ref().and_then(SyncBridge::link).map(|link| link.shared_ram_owner())
    }

    #[must_use]
    pub fn control_device(&self, port: u8) -> Option<DeviceHandle> {
        self.base.control_device(port)
    }

    pub fn reset(&mut self, soft_reset: bool) {
        self.base.reset(soft_reset);
        self.protection.reset_counter();

        if !soft_reset {
            self.select_bit = 0;
            self.refresh_state = false;
            self.update_control_devices();
        }

        if let Some(sync) = &mut self.sync {
            sync.reset();

            if !soft_reset && self.role == BoardRole::Secondary {
                log::debug!("Secondary board will receive controller 3/4 input from primary board");
                self.forwarding_inputs = true;
            }
        }

        log::debug!("Reset {} board control manager (soft={soft_reset})", self.role);
    }

    fn update_control_devices(&self) {
        if self.sync.is_some() {
            // Dual-board cabinets always have 4 standard controllers; ports 2 and 3 of the primary
            // board feed ports 0 and 1 of the secondary board
            log::debug!("Registering 4 standard controllers on {} board", self.role);
            self.base.registry().replace_all((0..4).map(ControlDevice::standard));
        } else {
            self.base.update_control_devices(self.config.port_types);
        }
    }

    /// Capture this frame's host input.
    pub fn update_inputs(&mut self, inputs: &VsInputs) {
        match &self.sync {
            Some(sync) if self.forwarding_inputs => {
                // Ports 0 and 1 are wired to the primary board's ports 2 and 3 rather than to the
                // host; if forwarding fails they keep their previous state
                self.base.update_port_inputs(inputs, 2..4);
                sync.forward_inputs(self.base.registry());
            }
            _ => self.base.update_inputs(inputs),
        }
    }

    pub fn read(&mut self, address: u16) -> u8 {
        match VsRegister::from_address(address) {
            VsRegister::Joy1 => {
                let dip_switches = self.config.dip_switches;
                let role_bit = match self.role {
                    BoardRole::Primary => 0x00,
                    BoardRole::Secondary => 0x80,
                };

                self.base.read(address)
                    | (u8::from(dip_switches.switch(0)) << 3)
                    | (u8::from(dip_switches.switch(1)) << 4)
                    | role_bit
            }
            VsRegister::Joy2 => {
                // DIP switches 3-8 map directly to bits 2-7
                (self.base.read(address) & 0x01) | (self.config.dip_switches.0 & 0xFC)
            }
            VsRegister::ProtectionReset => {
                self.protection.reset_counter();
                0
            }
            VsRegister::ProtectionRead => {
                if self.protection.responds_to(ProtectionPort::Register) {
                    self.protection.read().unwrap_or(0)
                } else {
                    0
                }
            }
            VsRegister::ProtectionWindow => {
                if self.protection.responds_to(ProtectionPort::Window) {
                    self.protection.read().unwrap_or(0)
                } else {
                    self.base.read(address)
                }
            }
            VsRegister::Other => self.base.read(address),
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match VsRegister::from_address(address) {
            VsRegister::Joy1 => {
                let previous_refresh_state = self.refresh_state;
                self.refresh_state = value.bit(0);

                // Rewire before the base manager latches the controllers on the strobe falling edge
                if previous_refresh_state && !self.refresh_state {
                    self.remap_controller_buttons();
                }

                self.select_bit = (value >> 2) & 0x01;

                if let Some(sync) = &mut self.sync {
                    sync.write(value);
                }

                self.base.write(address, value);
            }
            VsRegister::ProtectionReset => {
                self.protection.reset_counter();
            }
            VsRegister::ProtectionRead => {}
            VsRegister::ProtectionWindow => {
                if !self.protection.responds_to(ProtectionPort::Window) {
                    self.base.write(address, value);
                }
            }
            VsRegister::Joy2 | VsRegister::Other => {
                self.base.write(address, value);
            }
        }
    }

    fn remap_controller_buttons(&self) {
        let Some(variant) = self.config.wiring_variant else { return };

        let (Some(port_0), Some(port_1)) =
            (self.base.control_device(0), self.base.control_device(1))
        else {
            return;
        };

        if Arc::ptr_eq(&port_0, &port_1) {
            log::warn!("Ports 0 and 1 share a device; not applying {variant} wiring");
            return;
        }

        let mut port_0 = port_0.lock();
        let mut port_1 = port_1.lock();
        remap::apply(variant, &mut port_0, &mut port_1);
    }

    #[must_use]
    pub fn snapshot(&self) -> VsControlSnapshot {
        VsControlSnapshot {
            select_bit: self.select_bit,
            refresh_state: self.refresh_state,
            protection_counter: self.protection.counter(),
            handshake_bit: self.sync.as_ref().map(SyncBridge::handshake_bit),
            base: self.base.save_state(),
        }
    }

    pub fn restore(&mut self, snapshot: VsControlSnapshot) {
        self.select_bit = snapshot.select_bit & 0x01;
        self.refresh_state = snapshot.refresh_state;
        self.protection.set_counter(snapshot.protection_counter);

        match (&mut self.sync, snapshot.handshake_bit) {
            (Some(sync), Some(handshake_bit)) => sync.restore_handshake_bit(handshake_bit),
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("Save state is from a different cabinet type; ignoring handshake bit");
            }
            (None, None) => {}
        }

        self.base.load_state(snapshot.base);
    }
}
