//! Controller rewiring for the different VS System cabinet harnesses.
//!
//! Cabinets were wired to the board in several incompatible ways. Games expect the wiring of the
//! cabinet they shipped in, so the buttons seen by the board have to be rearranged to match.
//!
//! The rewiring starts from the captured host input every time it runs, so applying it any number
//! of times between two input captures gives the same result.

use crate::input::{ControlDevice, StandardController, VsButton};
use vs_config::VsWiringVariant;

/// Apply the wiring variant to the devices on ports 0 and 1. Does nothing unless both ports hold a
/// standard controller.
pub fn apply(variant: VsWiringVariant, port_0: &mut ControlDevice, port_1: &mut ControlDevice) {
    let (Some(c0), Some(c1)) = (port_0.as_standard_mut(), port_1.as_standard_mut()) else {
        return;
    };

    log::debug!("Applying {variant} controller wiring");

    c0.restore_input();
    c1.restore_input();

    match variant {
        VsWiringVariant::A => {
            c0.swap_buttons(VsButton::Select, VsButton::Start);
            c1.swap_buttons(VsButton::Select, VsButton::Start);
        }
        VsWiringVariant::B => {
            let (c0, c1) = (c1, c0);
            cross_select_start(c0, c1);
        }
        VsWiringVariant::C => {
            let (c0, c1) = (c1, c0);

            // Port 0 Start is wired to both its own Start and port 1 Select
            if c0.is_pressed(VsButton::Start) {
                c1.set_bit(VsButton::Select);
            } else {
                c1.clear_bit(VsButton::Select);
            }

            c0.clear_bit(VsButton::Start);
            c0.clear_bit(VsButton::Select);
        }
        VsWiringVariant::D => {
            let (c0, c1) = (c1, c0);
            cross_select_start(c0, c1);
            c0.invert_bit(VsButton::Select);
            c1.invert_bit(VsButton::Select);
        }
        VsWiringVariant::E => {
            c0.swap_buttons_with(VsButton::B, c1, VsButton::A);
            c0.swap_buttons(VsButton::Select, VsButton::Start);
            c1.swap_buttons(VsButton::Select, VsButton::Start);
        }
    }
}

fn cross_select_start(c0: &mut StandardController, c1: &mut StandardController) {
    c1.swap_buttons_with(VsButton::Select, c0, VsButton::Start);
    c0.swap_buttons_with(VsButton::Select, c1, VsButton::Start);
}
