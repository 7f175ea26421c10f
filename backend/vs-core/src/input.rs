//! Controller devices that can be plugged into a VS System board.

use bincode::{Decode, Encode};
use vs_config::VsControllerType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VsButton {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl VsButton {
    pub const ALL: [Self; 8] = [
        Self::A,
        Self::B,
        Self::Select,
        Self::Start,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
    ];

    /// Position of this button in the controller's serial bitstream.
    #[inline]
    #[must_use]
    pub fn bit_index(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Select => 2,
            Self::Start => 3,
            Self::Up => 4,
            Self::Down => 5,
            Self::Left => 6,
            Self::Right => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VsJoypadState {
    pub up: bool,
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

impl VsJoypadState {
    #[inline]
    #[must_use]
    pub fn button(self, button: VsButton) -> bool {
        match button {
            VsButton::A => self.a,
            VsButton::B => self.b,
            VsButton::Select => self.select,
            VsButton::Start => self.start,
            VsButton::Up => self.up,
            VsButton::Down => self.down,
            VsButton::Left => self.left,
            VsButton::Right => self.right,
        }
    }

    #[inline]
    pub fn set_button(&mut self, button: VsButton, pressed: bool) {
        let field = match button {
            VsButton::A => &mut self.a,
            VsButton::B => &mut self.b,
            VsButton::Select => &mut self.select,
            VsButton::Start => &mut self.start,
            VsButton::Up => &mut self.up,
            VsButton::Down => &mut self.down,
            VsButton::Left => &mut self.left,
            VsButton::Right => &mut self.right,
        };
        *field = pressed;
    }

    #[must_use]
    pub fn with_button(mut self, button: VsButton, pressed: bool) -> Self {
        self.set_button(button, pressed);
        self
    }

    /// Pack into the order that the controller shifts buttons out: A, B, Select, Start, Up,
    /// Down, Left, Right.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        VsButton::ALL
            .into_iter()
            .fold(0, |bits, button| bits | (u8::from(self.button(button)) << button.bit_index()))
    }

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        VsButton::ALL.into_iter().fold(Self::default(), |state, button| {
            state.with_button(button, bits & (1 << button.bit_index()) != 0)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VsZapperState {
    pub fire: bool,
    // Whether the light sensor is currently pointed at a bright pixel; the frontend determines this
    // from the rendered frame
    pub light_sensed: bool,
}

/// Host input for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VsInputs {
    pub joypads: [VsJoypadState; 4],
    pub zapper: VsZapperState,
}

/// Raw captured device state, copied verbatim between boards in dual-board cabinets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct RawDeviceState(pub u8);

#[derive(Debug, Clone, Encode, Decode)]
pub struct StandardController {
    // Buttons as last captured from the host
    input: VsJoypadState,
    // Buttons as the board sees them after harness wiring is applied
    state: VsJoypadState,
    shift_register: u8,
    strobe: bool,
}

impl StandardController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: VsJoypadState::default(),
            state: VsJoypadState::default(),
            shift_register: 0xFF,
            strobe: false,
        }
    }

    #[must_use]
    pub fn input(&self) -> VsJoypadState {
        self.input
    }

    #[must_use]
    pub fn state(&self) -> VsJoypadState {
        self.state
    }

    pub fn set_input(&mut self, input: VsJoypadState) {
        self.input = input;
        self.state = input;
    }

    /// Discard any rewiring applied since the last input capture.
    pub fn restore_input(&mut self) {
        self.state = self.input;
    }

    #[inline]
    #[must_use]
    pub fn is_pressed(&self, button: VsButton) -> bool {
        self.state.button(button)
    }

    #[inline]
    pub fn set_bit(&mut self, button: VsButton) {
        self.state.set_button(button, true);
    }

    #[inline]
    pub fn clear_bit(&mut self, button: VsButton) {
        self.state.set_button(button, false);
    }

    #[inline]
    pub fn invert_bit(&mut self, button: VsButton) {
        let pressed = self.state.button(button);
        self.state.set_button(button, !pressed);
    }

    pub fn swap_buttons(&mut self, first: VsButton, second: VsButton) {
        let first_pressed = self.state.button(first);
        let second_pressed = self.state.button(second);
        self.state.set_button(first, second_pressed);
        self.state.set_button(second, first_pressed);
    }

    pub fn swap_buttons_with(
        &mut self,
        button: VsButton,
        other: &mut Self,
        other_button: VsButton,
    ) {
        let pressed = self.state.button(button);
        let other_pressed = other.state.button(other_button);
        self.state.set_button(button, other_pressed);
        other.state.set_button(other_button, pressed);
    }

    fn write_strobe(&mut self, strobe: bool) {
        // Buttons are latched on the strobe falling edge
        if self.strobe && !strobe {
            self.shift_register = self.state.to_bits();
        }
        self.strobe = strobe;
    }

    fn read(&mut self) -> u8 {
        if self.strobe {
            // Shift register continuously reloads while strobe is high
            return u8::from(self.state.a);
        }

        let bit = self.shift_register & 0x01;
        // Reads return 1 after all 8 buttons have been shifted out
        self.shift_register = (self.shift_register >> 1) | 0x80;
        bit
    }
}

impl Default for StandardController {
    fn default() -> Self {
        Self::new()
    }
}

/// The VS System light gun, which reports through a serial protocol instead of the parallel bits
/// used by the home console Zapper.
#[derive(Debug, Clone, Encode, Decode)]
pub struct VsZapper {
    input: VsZapperState,
    shift_register: u8,
    strobe: bool,
}

impl VsZapper {
    #[must_use]
    pub fn new() -> Self {
        Self { input: VsZapperState::default(), shift_register: 0, strobe: false }
    }

    #[must_use]
    pub fn input(&self) -> VsZapperState {
        self.input
    }

    pub fn set_input(&mut self, input: VsZapperState) {
        self.input = input;
    }

    // Bit 4 is always set; the game checks it to detect that a gun is connected
    fn latch(&self) -> u8 {
        0x10 | (u8::from(self.input.light_sensed) << 6) | (u8::from(self.input.fire) << 7)
    }

    fn write_strobe(&mut self, strobe: bool) {
        if self.strobe && !strobe {
            self.shift_register = self.latch();
        }
        self.strobe = strobe;
    }

    fn read(&mut self) -> u8 {
        if self.strobe {
            self.shift_register = self.latch();
        }

        let bit = self.shift_register & 0x01;
        self.shift_register >>= 1;
        bit
    }
}

impl Default for VsZapper {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub enum ControlDeviceKind {
    Standard(StandardController),
    VsZapper(VsZapper),
}

/// A device plugged into one of the board's controller ports.
#[derive(Debug, Clone, Encode, Decode)]
pub struct ControlDevice {
    port: u8,
    kind: ControlDeviceKind,
}

impl ControlDevice {
    /// Create the device for the given controller type, or None if the port should be left empty.
    #[must_use]
    pub fn new(port: u8, controller_type: VsControllerType) -> Option<Self> {
        let kind = match controller_type.for_vs_system() {
            VsControllerType::None => return None,
            VsControllerType::StandardController => {
                ControlDeviceKind::Standard(StandardController::new())
            }
            VsControllerType::Zapper | VsControllerType::VsZapper => {
                ControlDeviceKind::VsZapper(VsZapper::new())
            }
        };

        Some(Self { port, kind })
    }

    #[must_use]
    pub fn standard(port: u8) -> Self {
        Self { port, kind: ControlDeviceKind::Standard(StandardController::new()) }
    }

    #[inline]
    #[must_use]
    pub fn port(&self) -> u8 {
        self.port
    }

    #[must_use]
    pub fn controller_type(&self) -> VsControllerType {
        match self.kind {
            ControlDeviceKind::Standard(_) => VsControllerType::StandardController,
            ControlDeviceKind::VsZapper(_) => VsControllerType::VsZapper,
        }
    }

    /// The standard-button view of this device, or None if it is not a standard controller.
    #[must_use]
    pub fn as_standard(&self) -> Option<&StandardController> {
        match &self.kind {
            ControlDeviceKind::Standard(controller) => Some(controller),
            ControlDeviceKind::VsZapper(_) => None,
        }
    }

    #[must_use]
    pub fn as_standard_mut(&mut self) -> Option<&mut StandardController> {
        match &mut self.kind {
            ControlDeviceKind::Standard(controller) => Some(controller),
            ControlDeviceKind::VsZapper(_) => None,
        }
    }

    #[must_use]
    pub fn raw_state(&self) -> RawDeviceState {
        match &self.kind {
            ControlDeviceKind::Standard(controller) => RawDeviceState(controller.input.to_bits()),
            ControlDeviceKind::VsZapper(zapper) => RawDeviceState(
                u8::from(zapper.input.fire) | (u8::from(zapper.input.light_sensed) << 1),
            ),
        }
    }

    pub fn set_raw_state(&mut self, raw: RawDeviceState) {
        match &mut self.kind {
            ControlDeviceKind::Standard(controller) => {
                controller.set_input(VsJoypadState::from_bits(raw.0));
            }
            ControlDeviceKind::VsZapper(zapper) => {
                zapper.set_input(VsZapperState {
                    fire: raw.0 & 0x01 != 0,
                    light_sensed: raw.0 & 0x02 != 0,
                });
            }
        }
    }

    /// Capture this frame's host input for the device's port.
    pub fn set_input(&mut self, inputs: &VsInputs) {
        match &mut self.kind {
            ControlDeviceKind::Standard(controller) => {
                if let Some(&joypad) = inputs.joypads.get(self.port as usize) {
                    controller.set_input(joypad);
                }
            }
            ControlDeviceKind::VsZapper(zapper) => zapper.set_input(inputs.zapper),
        }
    }

    pub fn write_strobe(&mut self, strobe: bool) {
        match &mut self.kind {
            ControlDeviceKind::Standard(controller) => controller.write_strobe(strobe),
            ControlDeviceKind::VsZapper(zapper) => zapper.write_strobe(strobe),
        }
    }

    /// Shift out the next serial bit.
    pub fn read(&mut self) -> u8 {
        match &mut self.kind {
            ControlDeviceKind::Standard(controller) => controller.read(),
            ControlDeviceKind::VsZapper(zapper) => zapper.read(),
        }
    }
}
