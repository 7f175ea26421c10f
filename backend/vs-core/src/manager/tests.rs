use super::*;
use crate::cabinet::{DualBoards, VsCabinet};
use crate::input::{RawDeviceState, VsButton, VsJoypadState};
use crate::protection::ProtectionChip;
use crate::serialize;
use test_log::test;
use vs_config::{VsControllerType, VsDipSwitches, VsWiringVariant};

const TKO_BOXING: GameIdentity = GameIdentity(0x98CFE016);
const RBI_BASEBALL: GameIdentity = GameIdentity(0x135ADF7C);
const SUPER_XEVIOUS: GameIdentity = GameIdentity(0xF9D3B0A3);
const UNPROTECTED: GameIdentity = GameIdentity(0x0BADF00D);

fn new_manager(identity: GameIdentity) -> VsControlManager {
    VsControlManager::new(identity, VsControlConfig::default())
}

fn with_variant(variant: VsWiringVariant) -> VsControlManager {
    VsControlManager::new(
        UNPROTECTED,
        VsControlConfig { wiring_variant: Some(variant), ..VsControlConfig::default() },
    )
}

fn new_dual() -> (VsCabinet, DualBoards) {
    VsCabinet::new_dual(UNPROTECTED, VsControlConfig::default(), VsControlConfig::default())
}

fn set_port_input(manager: &VsControlManager, port: u8, state: VsJoypadState) {
    let handle = manager.control_device(port).unwrap();
    handle.lock().as_standard_mut().unwrap().set_input(state);
}

fn port_state(manager: &VsControlManager, port: u8) -> VsJoypadState {
    manager.control_device(port).unwrap().lock().as_standard().unwrap().state()
}

// Strobe the controllers and shift out all 8 buttons from the given port register
fn poll(manager: &mut VsControlManager, address: u16) -> u8 {
    manager.write(JOY1_ADDRESS, 0x01);
    manager.write(JOY1_ADDRESS, 0x00);
    (0..8).fold(0, |byte, i| byte | ((manager.read(address) & 0x01) << i))
}

#[test]
fn register_decoding() {
    assert_eq!(VsRegister::from_address(0x4016), VsRegister::Joy1);
    assert_eq!(VsRegister::from_address(0x4017), VsRegister::Joy2);
    assert_eq!(VsRegister::from_address(0x5E00), VsRegister::ProtectionReset);
    assert_eq!(VsRegister::from_address(0x5E01), VsRegister::ProtectionRead);
    assert_eq!(VsRegister::from_address(0x5400), VsRegister::ProtectionWindow);
    assert_eq!(VsRegister::from_address(0x57FF), VsRegister::ProtectionWindow);
    assert_eq!(VsRegister::from_address(0x53FF), VsRegister::Other);
    assert_eq!(VsRegister::from_address(0x5800), VsRegister::Other);
    assert_eq!(VsRegister::from_address(0x4020), VsRegister::Other);
}

#[test]
fn protection_register_cycles() {
    let mut manager = new_manager(TKO_BOXING);
    let table = ProtectionChip::TkoBoxing.table();

    let reads: Vec<_> = (0..64).map(|_| manager.read(0x5E01)).collect();
    assert_eq!(reads[..32], table[..]);
    assert_eq!(reads[32..], table[..]);

    manager.read(0x5E01);
    manager.read(0x5E01);
    assert_eq!(manager.read(0x5E00), 0);
    assert_eq!(manager.read(0x5E01), table[0]);
    assert_eq!(manager.read(0x5E01), table[1]);

    manager.write(0x5E00, 0xFF);
    assert_eq!(manager.read(0x5E01), table[0]);

    // Writes to the read register are ignored
    manager.write(0x5E01, 0xFF);
    assert_eq!(manager.read(0x5E01), table[1]);
}

#[test]
fn rbi_baseball_uses_its_own_table() {
    let mut manager = new_manager(RBI_BASEBALL);
    let reads: Vec<_> = (0..32).map(|_| manager.read(0x5E01)).collect();
    assert_eq!(reads[..], ProtectionChip::RbiBaseball.table()[..]);
}

#[test]
fn super_xevious_reads_from_window() {
    let mut manager = new_manager(SUPER_XEVIOUS);
    let table = ProtectionChip::SuperXevious.table();

    assert_eq!(manager.read(0x54FF), table[0]);
    assert_eq!(manager.read(0x5678), table[1]);
    assert_eq!(manager.read(0x578F), table[2]);
    assert_eq!(manager.read(0x5567), table[3]);

    // $5E01 is not wired for this circuit and does not advance it
    assert_eq!(manager.read(0x5E01), 0);
    assert_eq!(manager.read(0x5400), table[4]);

    // Outside the window
    assert_eq!(manager.read(0x5800), 0);
    assert_eq!(manager.snapshot().protection_counter, 5);
}

#[test]
fn unprotected_game_never_advances_counter() {
    let mut manager = new_manager(UNPROTECTED);

    for address in [0x5E01, 0x5400, 0x5555, 0x57FF, 0x5E01] {
        assert_eq!(manager.read(address), 0);
    }
    assert_eq!(manager.snapshot().protection_counter, 0);

    // TKO Boxing's circuit is not reachable through the Super Xevious window either
    let mut manager = new_manager(TKO_BOXING);
    assert_eq!(manager.read(0x5400), 0);
    assert_eq!(manager.snapshot().protection_counter, 0);
}

#[test]
fn dip_switches_in_input_registers() {
    let mut manager = VsControlManager::new(
        UNPROTECTED,
        VsControlConfig { dip_switches: VsDipSwitches(0xFF), ..VsControlConfig::default() },
    );
    // Bit 0 is the controller's serial output
    assert_eq!(manager.read(0x4016) & 0xFE, 0x18);
    assert_eq!(manager.read(0x4017) & 0xFE, 0xFC);

    manager.reload_config(VsControlConfig {
        dip_switches: VsDipSwitches(0b1010_0110),
        ..VsControlConfig::default()
    });
    // Switch 2 -> bit 4, switch 1 off
    assert_eq!(manager.read(0x4016) & 0xFE, 0x10);
    assert_eq!(manager.read(0x4017) & 0xFE, 0b1010_0100);
}

#[test]
fn input_registers_include_controller_bit() {
    let mut manager = new_manager(UNPROTECTED);
    set_port_input(&manager, 0, VsJoypadState { a: true, ..VsJoypadState::default() });
    set_port_input(&manager, 1, VsJoypadState { a: true, ..VsJoypadState::default() });

    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);
    assert_eq!(manager.read(0x4016), 0x01);
    assert_eq!(manager.read(0x4017), 0x01);
    assert_eq!(manager.read(0x4016), 0x00);
}

#[test]
fn select_bit_follows_4016_bit_2() {
    let mut manager = new_manager(UNPROTECTED);
    assert_eq!(manager.prg_chr_select_bit(), 0);

    manager.write(0x4016, 0x04);
    assert_eq!(manager.prg_chr_select_bit(), 1);

    // Other registers do not touch it
    manager.write(0x4017, 0x00);
    manager.write(0x4800, 0x00);
    assert_eq!(manager.prg_chr_select_bit(), 1);

    manager.write(0x4016, 0x03);
    assert_eq!(manager.prg_chr_select_bit(), 0);
}

#[test]
fn no_remap_without_falling_edge() {
    let mut manager = with_variant(VsWiringVariant::A);
    let input = VsJoypadState { start: true, ..VsJoypadState::default() };
    set_port_input(&manager, 0, input);

    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x01);
    assert_eq!(port_state(&manager, 0), input);

    let remapped = VsJoypadState { select: true, ..VsJoypadState::default() };
    manager.write(0x4016, 0x00);
    assert_eq!(port_state(&manager, 0), remapped);

    // 0 -> 0 is not a falling edge either
    set_port_input(&manager, 0, input);
    manager.write(0x4016, 0x00);
    assert_eq!(port_state(&manager, 0), input);

    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);
    assert_eq!(port_state(&manager, 0), remapped);
}

#[test]
fn remap_applies_before_latch() {
    let mut manager = with_variant(VsWiringVariant::A);
    let input = VsJoypadState { select: true, up: true, ..VsJoypadState::default() };
    set_port_input(&manager, 0, input);

    let bits = poll(&mut manager, 0x4016);
    assert_eq!(VsJoypadState::from_bits(bits), VsJoypadState {
        start: true,
        up: true,
        ..VsJoypadState::default()
    });
}

#[test]
fn remap_is_idempotent_across_polls() {
    for variant in VsWiringVariant::ALL {
        let mut manager = with_variant(variant);
        let input = VsJoypadState { start: true, b: true, ..VsJoypadState::default() };
        set_port_input(&manager, 0, input);
        set_port_input(&manager, 1, VsJoypadState { select: true, ..VsJoypadState::default() });

        let first = (poll(&mut manager, 0x4016), poll(&mut manager, 0x4017));
        let second = (poll(&mut manager, 0x4016), poll(&mut manager, 0x4017));
        assert_eq!(first, second, "{variant}");
    }
}

#[test]
fn variant_c_through_registers() {
    let mut manager = with_variant(VsWiringVariant::C);
    let d0 = manager.control_device(0).unwrap();
    let d1 = manager.control_device(1).unwrap();

    // Original device 1 plays port 0 and holds Start; original device 0 plays port 1
    set_port_input(&manager, 0, VsJoypadState::default());
    let input = VsJoypadState { start: true, select: true, ..VsJoypadState::default() };
    set_port_input(&manager, 1, input);

    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);

    assert!(Arc::ptr_eq(&d0, &manager.control_device(0).unwrap()));
    assert!(Arc::ptr_eq(&d1, &manager.control_device(1).unwrap()));
    assert_eq!(port_state(&manager, 1), VsJoypadState::default());
    assert_eq!(port_state(&manager, 0), VsJoypadState { select: true, ..VsJoypadState::default() });

    // Port 1 Select comes only from port 0 Start
    set_port_input(&manager, 0, VsJoypadState { select: true, ..VsJoypadState::default() });
    set_port_input(&manager, 1, VsJoypadState { start: true, ..VsJoypadState::default() });
    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);
    assert!(port_state(&manager, 0).select);
}

#[test]
fn remap_skipped_when_port_has_no_standard_controller() {
    let mut manager = VsControlManager::new(UNPROTECTED, VsControlConfig {
        wiring_variant: Some(VsWiringVariant::A),
        port_types: [
            VsControllerType::StandardController,
            VsControllerType::Zapper,
            VsControllerType::None,
            VsControllerType::None,
        ],
        ..VsControlConfig::default()
    });
    let input = VsJoypadState { start: true, ..VsJoypadState::default() };
    set_port_input(&manager, 0, input);

    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);
    assert_eq!(port_state(&manager, 0), input);

    manager.reload_config(VsControlConfig {
        wiring_variant: Some(VsWiringVariant::A),
        port_types: [
            VsControllerType::StandardController,
            VsControllerType::None,
            VsControllerType::None,
            VsControllerType::None,
        ],
        ..VsControlConfig::default()
    });
    set_port_input(&manager, 0, input);
    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);
    assert_eq!(port_state(&manager, 0), input);
}

#[test]
fn zapper_is_created_as_vs_zapper() {
    let manager = VsControlManager::new(UNPROTECTED, VsControlConfig {
        port_types: [
            VsControllerType::Zapper,
            VsControllerType::StandardController,
            VsControllerType::None,
            VsControllerType::None,
        ],
        ..VsControlConfig::default()
    });

    let port_0 = manager.control_device(0).unwrap();
    assert_eq!(port_0.lock().controller_type(), VsControllerType::VsZapper);
}

#[test]
fn save_state_round_trip() {
    let mut manager = new_manager(TKO_BOXING);
    let table = ProtectionChip::TkoBoxing.table();

    manager.write(0x4016, 0x05);
    manager.write(0x4016, 0x04);
    for _ in 0..17 {
        manager.read(0x5E01);
    }

    let mut bytes = Vec::new();
    serialize::save_state(&manager, &mut bytes).unwrap();

    let mut restored = new_manager(TKO_BOXING);
    serialize::load_state(&mut restored, bytes.as_slice()).unwrap();

    let snapshot = restored.snapshot();
    assert_eq!(snapshot.select_bit, 1);
    assert!(!snapshot.refresh_state);
    assert_eq!(snapshot.protection_counter, 17);
    assert_eq!(snapshot.handshake_bit, None);
    assert_eq!(restored.prg_chr_select_bit(), 1);

    assert_eq!(restored.read(0x5E01), table[17]);
    assert_eq!(restored.read(0x5E01), table[18]);
}

#[test]
fn save_state_restores_controller_state() {
    let mut manager = new_manager(UNPROTECTED);
    set_port_input(&manager, 1, VsJoypadState { right: true, ..VsJoypadState::default() });

    let mut bytes = Vec::new();
    serialize::save_state(&manager, &mut bytes).unwrap();

    set_port_input(&manager, 1, VsJoypadState::default());
    serialize::load_state(&mut manager, bytes.as_slice()).unwrap();
    assert!(port_state(&manager, 1).right);
}

#[test]
fn soft_reset_keeps_select_bit_but_not_counter() {
    let mut manager = new_manager(TKO_BOXING);
    manager.write(0x4016, 0x05);
    manager.read(0x5E01);
    manager.read(0x5E01);

    manager.reset(true);
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.select_bit, 1);
    assert!(snapshot.refresh_state);
    assert_eq!(snapshot.protection_counter, 0);

    manager.reset(false);
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.select_bit, 0);
    assert!(!snapshot.refresh_state);
}

#[test]
fn single_board_has_no_sync() {
    let mut manager = new_manager(UNPROTECTED);
    assert!(!manager.is_dual_system());
    assert_eq!(manager.role(), BoardRole::Primary);
    assert_eq!(manager.shared_ram_owner(), None);

    manager.write(0x4016, 0x00);
    manager.write(0x4016, 0x02);
    assert!(!manager.external_irq());
    assert_eq!(manager.read(0x4016) & 0x80, 0);
}

#[test]
fn secondary_board_reports_role_bit() {
    let (_cabinet, DualBoards { mut primary, mut secondary }) = new_dual();
    assert_eq!(primary.read(0x4016) & 0x80, 0);
    assert_eq!(secondary.read(0x4016) & 0x80, 0x80);
}

#[test]
fn dual_system_always_has_four_standard_controllers() {
    let config = VsControlConfig {
        port_types: [
            VsControllerType::Zapper,
            VsControllerType::None,
            VsControllerType::None,
            VsControllerType::None,
        ],
        ..VsControlConfig::default()
    };
    let (_cabinet, DualBoards { primary, .. }) = VsCabinet::new_dual(UNPROTECTED, config, config);

    for port in 0..4 {
        let device = primary.control_device(port).unwrap();
        assert_eq!(device.lock().controller_type(), VsControllerType::StandardController);
    }
}

#[test]
fn reset_asserts_secondary_irq() {
    let (cabinet, DualBoards { primary, secondary }) = new_dual();

    // Primary resets with the handshake bit low, secondary with it high
    assert!(secondary.external_irq());
    assert!(!primary.external_irq());
    assert!(cabinet.irq_low(BoardRole::Secondary));
    assert_eq!(primary.shared_ram_owner(), Some(SharedRamOwner::Secondary));
}

fn count_irq_edges(
    primary: &mut VsControlManager,
    secondary: &VsControlManager,
    writes: &[u8],
) -> usize {
    let mut irq = secondary.external_irq();
    let mut edges = 0;
    for &value in writes {
        primary.write(0x4016, value);
        let new_irq = secondary.external_irq();
        if new_irq != irq {
            edges += 1;
            irq = new_irq;
        }
    }
    edges
}

#[test]
fn handshake_repeated_write_has_one_edge() {
    let (_cabinet, DualBoards { mut primary, secondary }) = new_dual();
    assert!(secondary.external_irq());

    assert_eq!(count_irq_edges(&mut primary, &secondary, &[0x02, 0x02]), 1);
    assert!(!secondary.external_irq());
    assert_eq!(primary.shared_ram_owner(), Some(SharedRamOwner::Primary));
}

#[test]
fn handshake_toggle_has_two_edges() {
    let (_cabinet, DualBoards { mut primary, secondary }) = new_dual();
    primary.write(0x4016, 0x02);

    // Starting from released: 1 (no change), 0 (assert), 1 (release)
    assert_eq!(count_irq_edges(&mut primary, &secondary, &[0x02, 0x00, 0x02]), 2);

    // Other bits do not matter
    assert_eq!(count_irq_edges(&mut primary, &secondary, &[0x03, 0x06, 0x07]), 0);
}

#[test]
fn secondary_handshake_drives_primary_irq() {
    let (cabinet, DualBoards { mut primary, mut secondary }) = new_dual();

    secondary.write(0x4016, 0x00);
    assert!(primary.external_irq());
    // Only the primary board decides shared RAM ownership
    assert_eq!(cabinet.shared_ram_owner(), SharedRamOwner::Secondary);

    secondary.write(0x4016, 0x02);
    assert!(!primary.external_irq());
}

#[test]
fn controllers_3_and_4_forward_to_secondary() {
    let (_cabinet, DualBoards { mut primary, mut secondary }) = new_dual();

    let mut inputs = VsInputs::default();
    inputs.joypads[2] = VsJoypadState { up: true, a: true, ..VsJoypadState::default() };
    inputs.joypads[3] = VsJoypadState { left: true, ..VsJoypadState::default() };
    primary.update_inputs(&inputs);

    // Host input for the secondary board's ports 0/1 is ignored
    let mut secondary_inputs = VsInputs::default();
    secondary_inputs.joypads[0].b = true;
    secondary.update_inputs(&secondary_inputs);

    let expected = VsJoypadState { up: true, a: true, ..VsJoypadState::default() };
    let port_0 = secondary.control_device(0).unwrap();
    assert_eq!(port_0.lock().raw_state(), RawDeviceState(expected.to_bits()));
    assert_eq!(port_state(&secondary, 0), expected);
    assert_eq!(port_state(&secondary, 1), VsJoypadState { left: true, ..VsJoypadState::default() });

    assert_eq!(VsJoypadState::from_bits(poll(&mut secondary, 0x4016)), expected);
}

#[test]
fn primary_does_not_forward() {
    let (_cabinet, DualBoards { mut primary, secondary }) = new_dual();

    let mut inputs = VsInputs::default();
    inputs.joypads[0] = VsJoypadState { start: true, ..VsJoypadState::default() };
    primary.update_inputs(&inputs);

    assert!(port_state(&primary, 0).start);
    assert_eq!(port_state(&secondary, 0), VsJoypadState::default());
}

#[test]
fn forwarding_fails_open_without_cabinet() {
    let (cabinet, DualBoards { mut primary, mut secondary }) = new_dual();

    let mut inputs = VsInputs::default();
    inputs.joypads[2].a = true;
    primary.update_inputs(&inputs);
    secondary.update_inputs(&VsInputs::default());
    assert!(port_state(&secondary, 0).a);

    drop(cabinet);

    inputs.joypads[2].a = false;
    primary.update_inputs(&inputs);
    secondary.update_inputs(&VsInputs::default());
    // Keeps the last forwarded state
    assert!(port_state(&secondary, 0).a);

    // Handshake writes still update local state
    primary.write(0x4016, 0x02);
    assert_eq!(primary.snapshot().handshake_bit, Some(0x02));
}

#[test]
fn dual_save_state_restores_handshake() {
    let (cabinet, DualBoards { mut primary, secondary }) = new_dual();
    primary.write(0x4016, 0x02);

    let mut bytes = Vec::new();
    serialize::save_state(&primary, &mut bytes).unwrap();

    primary.write(0x4016, 0x00);
    assert!(secondary.external_irq());

    serialize::load_state(&mut primary, bytes.as_slice()).unwrap();
    assert_eq!(primary.snapshot().handshake_bit, Some(0x02));
    assert!(!secondary.external_irq());
    assert_eq!(cabinet.shared_ram_owner(), SharedRamOwner::Primary);
}

#[test]
fn raw_state_is_captured_input_not_rewired_state() {
    // Forwarding copies the buttons as pressed; each board applies its own wiring
    let mut manager = with_variant(VsWiringVariant::A);
    set_port_input(&manager, 0, VsJoypadState { start: true, ..VsJoypadState::default() });
    manager.write(0x4016, 0x01);
    manager.write(0x4016, 0x00);

    let port_0 = manager.control_device(0).unwrap();
    let device = port_0.lock();
    assert_eq!(device.raw_state(), RawDeviceState(1 << VsButton::Start.bit_index()));
    assert!(device.as_standard().unwrap().is_pressed(VsButton::Select));
}
