//! Interrupt enable/flag registers (IE at $FFFF, IF at $FF0F)

use crate::sm83::InterruptType;
use bincode::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct InterruptRegisters {
    enabled: u8,
    flags: u8,
}

impl InterruptRegisters {
    pub fn new() -> Self {
        // Post-boot-ROM state: IE cleared, IF=$E1 (VBlank already pending)
        Self { enabled: 0x00, flags: 0x01 }
    }

    // IE reads back exactly as written, all 8 bits
    pub fn read_ie(&self) -> u8 {
        self.enabled
    }

    pub fn write_ie(&mut self, value: u8) {
        self.enabled = value;
    }

    // Only 5 flag bits exist; the upper 3 read as 1
    pub fn read_if(&self) -> u8 {
        self.flags | 0xE0
    }

    pub fn write_if(&mut self, value: u8) {
        self.flags = value & 0x1F;
    }

    pub fn set_flag(&mut self, interrupt_type: InterruptType) {
        log::trace!("Interrupt flag set: {interrupt_type:?}");

        self.flags |= interrupt_type.register_mask();
    }

    pub fn clear_flag(&mut self, interrupt_type: InterruptType) {
        log::trace!("Interrupt flag cleared: {interrupt_type:?}");

        self.flags &= !interrupt_type.register_mask();
    }
}

impl Default for InterruptRegisters {
    fn default() -> Self {
        Self::new()
    }
}
