//! Memory bus / address mapping
//!
//! `Bus` is a borrowing view over the components the system owns; one is
//! assembled for each CPU step. All CPU-visible reads and writes funnel
//! through here, which is what keeps the I/O byte array, the timer, and the
//! interrupt registers consistent with what the PPU observes on its tick.

use crate::cartridge::CartridgePort;
use crate::interrupts::InterruptRegisters;
use crate::memory::Memory;
use crate::sm83::InterruptType;
use crate::sm83::bus::BusInterface;
use crate::timer::Timer;

pub struct Bus<'a> {
    pub memory: &'a mut Memory,
    pub timer: &'a mut Timer,
    pub interrupt_registers: &'a mut InterruptRegisters,
    pub cartridge: &'a mut dyn CartridgePort,
}

impl Bus<'_> {
    fn read_io_register(&self, address: u16) -> u8 {
        log::trace!("I/O register read: {address:04X}");

        match address & 0x7F {
            0x04 => self.timer.read_div(),
            0x05 => self.timer.read_tima(),
            0x06 => self.timer.read_tma(),
            0x07 => self.timer.read_tac(),
            0x0F => self.interrupt_registers.read_if(),
            // Everything else, the PPU registers included, is plain byte
            // storage; the PPU keeps LY and the live STAT bits up to date
            _ => self.memory.read_io(address),
        }
    }

    fn write_io_register(&mut self, address: u16, value: u8) {
        log::trace!("I/O register write: {address:04X} {value:02X}");

        match address & 0x7F {
            0x04 => self.timer.write_div(self.interrupt_registers),
            0x05 => self.timer.write_tima(value),
            0x06 => self.timer.write_tma(value),
            0x07 => self.timer.write_tac(value),
            0x0F => self.interrupt_registers.write_if(value),
            _ => self.memory.write_io(address, value),
        }
    }
}

impl BusInterface for Bus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            // Cartridge ROM and external RAM
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cartridge.read(address),
            0x8000..=0x9FFF => self.memory.read_vram(address),
            // WRAM, including the Echo RAM mirror at $E000-$FDFF
            0xC000..=0xFDFF => self.memory.read_wram(address),
            0xFE00..=0xFE9F => self.memory.read_oam(address),
            // Unusable memory
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00..=0xFF7F => self.read_io_register(address),
            0xFF80..=0xFFFE => self.memory.read_hram(address),
            0xFFFF => self.interrupt_registers.read_ie(),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cartridge.write(address, value),
            0x8000..=0x9FFF => self.memory.write_vram(address, value),
            0xC000..=0xFDFF => self.memory.write_wram(address, value),
            0xFE00..=0xFE9F => self.memory.write_oam(address, value),
            // Unusable memory
            0xFEA0..=0xFEFF => {}
            0xFF00..=0xFF7F => self.write_io_register(address, value),
            0xFF80..=0xFFFE => self.memory.write_hram(address, value),
            0xFFFF => self.interrupt_registers.write_ie(value),
        }
    }

    fn read_ie_register(&self) -> u8 {
        self.interrupt_registers.read_ie()
    }

    fn read_if_register(&self) -> u8 {
        self.interrupt_registers.read_if()
    }

    fn acknowledge_interrupt(&mut self, interrupt_type: InterruptType) {
        self.interrupt_registers.clear_flag(interrupt_type);
    }
}
