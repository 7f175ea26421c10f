//! Base controller management: the device registry and the standard `$4016`/`$4017` serial
//! polling registers.

use crate::input::{ControlDevice, VsInputs};
use crate::num::GetBit;
use bincode::{Decode, Encode};
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::Arc;
use vs_config::VsControllerType;

pub const JOY1_ADDRESS: u16 = 0x4016;
pub const JOY2_ADDRESS: u16 = 0x4017;

pub type DeviceHandle = Arc<Mutex<ControlDevice>>;

/// The list of devices registered on a board.
///
/// In dual-board cabinets the companion board reads from this registry while this board may be
/// rebuilding it, so the list is only ever touched under its lock. Lookups clone the handle out
/// and release the lock immediately.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    // Ports are fixed at device creation, so they are kept next to the handle and lookups never
    // need to lock a device while holding the list lock
    devices: Mutex<Vec<(u8, DeviceHandle)>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole device list in a single critical section.
    pub fn replace_all(&self, devices: impl IntoIterator<Item = ControlDevice>) {
        let handles: Vec<_> = devices
            .into_iter()
            .map(|device| (device.port(), Arc::new(Mutex::new(device))))
            .collect();
        *self.devices.lock() = handles;
    }

    #[must_use]
    pub fn device(&self, port: u8) -> Option<DeviceHandle> {
        self.devices
            .lock()
            .iter()
            .find(|(device_port, _)| *device_port == port)
            .map(|(_, handle)| Arc::clone(handle))
    }

    #[must_use]
    pub fn handles(&self) -> Vec<DeviceHandle> {
        self.devices.lock().iter().map(|(_, handle)| Arc::clone(handle)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ControlManagerState {
    strobe: bool,
    devices: Vec<ControlDevice>,
}

#[derive(Debug)]
pub struct ControlManager {
    registry: Arc<DeviceRegistry>,
    strobe: bool,
}

impl ControlManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(DeviceRegistry::new()))
    }

    /// Create a manager around a registry that is also reachable from elsewhere (e.g. the other
    /// board of a dual-board cabinet).
    #[must_use]
    pub fn with_registry(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry, strobe: false }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn control_device(&self, port: u8) -> Option<DeviceHandle> {
        self.registry.device(port)
    }

    /// Rebuild the device list from the configured port types.
    pub fn update_control_devices(&self, port_types: [VsControllerType; 4]) {
        self.registry.replace_all(
            (0..4_u8).filter_map(|port| ControlDevice::new(port, port_types[port as usize])),
        );
    }

    pub fn update_inputs(&self, inputs: &VsInputs) {
        self.update_port_inputs(inputs, 0..4);
    }

    /// Capture host input only for devices on the given ports.
    pub fn update_port_inputs(&self, inputs: &VsInputs, ports: Range<u8>) {
        for handle in self.registry.handles() {
            let mut device = handle.lock();
            if ports.contains(&device.port()) {
                device.set_input(inputs);
            }
        }
    }

    pub fn reset(&mut self, soft_reset: bool) {
        if !soft_reset {
            self.strobe = false;
        }
    }

    pub fn read(&mut self, address: u16) -> u8 {
        let port = match address {
            JOY1_ADDRESS => 0,
            JOY2_ADDRESS => 1,
            _ => return 0,
        };

        self.registry.device(port).map_or(0, |handle| handle.lock().read())
    }

    pub fn write(&mut self, address: u16, value: u8) {
        if address != JOY1_ADDRESS {
            return;
        }

        // All ports share the strobe line
        self.strobe = value.bit(0);
        for handle in self.registry.handles() {
            handle.lock().write_strobe(self.strobe);
        }
    }

    #[must_use]
    pub fn save_state(&self) -> ControlManagerState {
        let devices = self.registry.handles().iter().map(|handle| handle.lock().clone()).collect();
        ControlManagerState { strobe: self.strobe, devices }
    }

    /// Restore device state into the devices currently registered on the same ports. Saved devices
    /// without a matching port, or of a different type, are dropped.
    pub fn load_state(&mut self, state: ControlManagerState) {
        self.strobe = state.strobe;

        for saved in state.devices {
            let Some(handle) = self.registry.device(saved.port()) else {
                log::warn!("Save state contains a device on port {} which is empty", saved.port());
                continue;
            };

            let mut device = handle.lock();
            if device.controller_type() == saved.controller_type() {
                *device = saved;
            } else {
                log::warn!(
                    "Save state device on port {} does not match the connected device ({} vs. {})",
                    saved.port(),
                    saved.controller_type(),
                    device.controller_type()
                );
            }
        }
    }
}

impl Default for ControlManager {
    fn default() -> Self {
        Self::new()
    }
}
