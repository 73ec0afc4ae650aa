//! Game Boy (DMG) emulation core: SM83 CPU, memory bus, interval timer, and
//! scanline PPU, composed into a cycle-stepped machine.
//!
//! The crate has no frontend. A host drives [`api::GameBoy::step`] in a loop,
//! reads the frame buffer when [`api::GameBoy::frame_ready`] reports a
//! completed frame, and maps the 2-bit color IDs to actual pixels itself.

pub mod api;
mod bus;
pub mod cartridge;
mod interrupts;
mod memory;
mod ppu;
pub mod sm83;
mod timer;

pub use api::GameBoy;
pub use ppu::{FRAME_BUFFER_LEN, PpuFrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use sm83::InterruptType;
