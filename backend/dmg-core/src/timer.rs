//! Game Boy interval timer (DIV/TIMA/TMA/TAC)
//!
//! TIMA increments are driven by a falling-edge detector on one bit of the
//! free-running 16-bit system counter ANDed with the enable bit, which is what
//! produces the obscure DIV-write and disable quirks. The detector is stepped
//! every T-cycle so those edges land exactly where hardware puts them.

use crate::interrupts::InterruptRegisters;
use crate::sm83::InterruptType;
use bincode::{Decode, Encode};
use dotmatrix_common::num::{GetBit, U16Ext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
enum ClockSelect {
    Zero,
    One,
    Two,
    Three,
}

impl ClockSelect {
    fn from_byte(byte: u8) -> Self {
        match byte & 0x3 {
            0x0 => Self::Zero,
            0x1 => Self::One,
            0x2 => Self::Two,
            0x3 => Self::Three,
            _ => unreachable!("value & 0x3 is always <= 0x3"),
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    fn counter_bit(self) -> u8 {
        match self {
            // 4096 Hz
            Self::Zero => 9,
            // 262144 Hz
            Self::One => 3,
            // 65536 Hz
            Self::Two => 5,
            // 16384 Hz
            Self::Three => 7,
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Timer {
    system_counter: u16,
    enabled: bool,
    counter: u8,
    modulo: u8,
    clock_select: ClockSelect,
    previous_signal: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            system_counter: 0,
            enabled: false,
            counter: 0,
            modulo: 0,
            clock_select: ClockSelect::Zero,
            previous_signal: false,
        }
    }

    /// Advance the timer by the given number of M-cycles (4 T-cycles each).
    pub fn tick_m_cycles(&mut self, m_cycles: u32, interrupt_registers: &mut InterruptRegisters) {
        for _ in 0..4 * m_cycles {
            self.tick_t_cycle(interrupt_registers);
        }
    }

    fn tick_t_cycle(&mut self, interrupt_registers: &mut InterruptRegisters) {
        // The 16-bit system counter always ticks, even with the timer disabled
        self.system_counter = self.system_counter.wrapping_add(1);

        self.detect_falling_edge(interrupt_registers);
    }

    fn detect_falling_edge(&mut self, interrupt_registers: &mut InterruptRegisters) {
        let signal = self.system_counter.bit(self.clock_select.counter_bit()) && self.enabled;

        if self.previous_signal && !signal {
            let (counter, overflow) = self.counter.overflowing_add(1);
            self.counter = if overflow {
                interrupt_registers.set_flag(InterruptType::Timer);
                self.modulo
            } else {
                counter
            };
        }

        self.previous_signal = signal;
    }

    // DIV: Divider; the high byte of the system counter
    pub fn read_div(&self) -> u8 {
        self.system_counter.msb()
    }

    pub fn write_div(&mut self, interrupt_registers: &mut InterruptRegisters) {
        // Writing any value resets the whole counter. The selected bit may
        // drop from 1 to 0 here, and that edge counts like any other
        self.system_counter = 0;

        self.detect_falling_edge(interrupt_registers);
    }

    // TIMA: Timer counter
    pub fn read_tima(&self) -> u8 {
        self.counter
    }

    pub fn write_tima(&mut self, value: u8) {
        self.counter = value;
    }

    // TMA: Timer modulo
    pub fn read_tma(&self) -> u8 {
        self.modulo
    }

    pub fn write_tma(&mut self, value: u8) {
        self.modulo = value;
    }

    // TAC: Timer control. Writes take effect at the next T-cycle's signal
    // computation; the open bits read 1
    pub fn read_tac(&self) -> u8 {
        0xF8 | (u8::from(self.enabled) << 2) | self.clock_select.to_bits()
    }

    pub fn write_tac(&mut self, value: u8) {
        self.enabled = value.bit(2);
        self.clock_select = ClockSelect::from_byte(value);
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
