//! Emulation of the VS System control and protection peripheral.
//!
//! The VS System is an arcade platform built from one or two NES-class boards. Each board exposes
//! its controller ports, DIP switches, copy protection chips, and (on dual-board cabinets) an
//! inter-board handshake through registers in the `$4016-$5FFF` range of its CPU address space.
//!
//! * [`VsControlManager`] is the register-level interface for one board
//! * [`VsCabinet`] owns the link between the two boards of a dual-board cabinet
//! * [`serialize`] saves and restores manager state

pub mod cabinet;
pub mod control;
pub mod input;
pub mod manager;
mod num;
pub mod protection;
pub mod remap;
pub mod serialize;
pub mod sync;

pub use cabinet::VsCabinet;
pub use input::{VsButton, VsInputs, VsJoypadState};
pub use manager::VsControlManager;
pub use protection::GameIdentity;
pub use sync::BoardRole;
