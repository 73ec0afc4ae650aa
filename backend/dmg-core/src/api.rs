//! Public interface: the composed machine and its main loop

use crate::bus::Bus;
use crate::cartridge::{CartridgePort, NoCartridge};
use crate::interrupts::InterruptRegisters;
use crate::memory::Memory;
use crate::ppu::{Ppu, PpuFrameBuffer};
use crate::sm83::bus::BusInterface;
use crate::sm83::{InterruptType, Sm83};
use crate::timer::Timer;

pub use crate::sm83::ExecutionError;

/// The composed DMG machine. Owns every component; time advances only through
/// [`GameBoy::step`].
pub struct GameBoy {
    cpu: Sm83,
    ppu: Ppu,
    timer: Timer,
    memory: Memory,
    interrupt_registers: InterruptRegisters,
    cartridge: Box<dyn CartridgePort>,
}

impl GameBoy {
    /// Create a machine with an empty cartridge slot (reads 0, writes float).
    #[must_use]
    pub fn new() -> Self {
        Self::with_cartridge(Box::new(NoCartridge))
    }

    /// Create a machine with the given cartridge on the bus. All state starts
    /// at the post-boot-ROM DMG values.
    #[must_use]
    pub fn with_cartridge(cartridge: Box<dyn CartridgePort>) -> Self {
        Self {
            cpu: Sm83::new(),
            ppu: Ppu::new(),
            timer: Timer::new(),
            memory: Memory::new(),
            interrupt_registers: InterruptRegisters::new(),
            cartridge,
        }
    }

    /// Execute one CPU step, then advance the timer and the PPU by the
    /// M-cycles it consumed. Returns that M-cycle count (0 while stopped).
    ///
    /// # Errors
    ///
    /// Propagates [`ExecutionError`] from the CPU; the failure is permanent.
    pub fn step(&mut self) -> Result<u32, ExecutionError> {
        self.ppu.clear_frame_complete();

        let m_cycles = self.cpu.step(&mut Bus {
            memory: &mut self.memory,
            timer: &mut self.timer,
            interrupt_registers: &mut self.interrupt_registers,
            cartridge: self.cartridge.as_mut(),
        })?;

        // The timer has to see these cycles before the next CPU step so that
        // any interrupt it raises is visible at the next service check
        self.timer.tick_m_cycles(m_cycles, &mut self.interrupt_registers);
        self.ppu.tick_m_cycles(m_cycles, &mut self.memory, &mut self.interrupt_registers);

        Ok(m_cycles)
    }

    /// The rendered frame: one palette-resolved 2-bit color ID per pixel.
    #[must_use]
    pub fn frame_buffer(&self) -> &PpuFrameBuffer {
        self.ppu.frame_buffer()
    }

    /// True if LY transitioned into VBlank (143 -> 144) during the last step.
    #[must_use]
    pub fn frame_ready(&self) -> bool {
        self.ppu.frame_complete()
    }

    /// Entry point for external subsystems (joypad, serial) to flag an
    /// interrupt. Only sets the IF bit; servicing follows the normal rules.
    pub fn request_interrupt(&mut self, interrupt_type: InterruptType) {
        self.interrupt_registers.set_flag(interrupt_type);
    }

    /// End STOP mode. On hardware a joypad event does this; the joypad is a
    /// frontend concern.
    pub fn resume_from_stop(&mut self) {
        self.cpu.exit_stop();
    }

    pub fn cpu(&self) -> &Sm83 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Sm83 {
        &mut self.cpu
    }

    /// Read through the bus exactly as the CPU would.
    pub fn read_memory(&mut self, address: u16) -> u8 {
        self.bus_view().read(address)
    }

    /// Write through the bus exactly as the CPU would.
    pub fn write_memory(&mut self, address: u16, value: u8) {
        self.bus_view().write(address, value);
    }

    /// Read two bytes through the bus as a little-endian 16-bit value.
    pub fn read_memory_u16(&mut self, address: u16) -> u16 {
        self.bus_view().read_u16(address)
    }

    fn bus_view(&mut self) -> Bus<'_> {
        Bus {
            memory: &mut self.memory,
            timer: &mut self.timer,
            interrupt_registers: &mut self.interrupt_registers,
            cartridge: self.cartridge.as_mut(),
        }
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCartridge {
        rom: Vec<u8>,
    }

    impl TestCartridge {
        // Build a 32 KiB image with `program` placed at the $0100 entry point
        fn with_program(program: &[u8]) -> Box<Self> {
            let mut rom = vec![0; 0x8000];
            rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
            Box::new(Self { rom })
        }
    }

    impl CartridgePort for TestCartridge {
        fn read(&mut self, address: u16) -> u8 {
            self.rom.get(address as usize).copied().unwrap_or(0)
        }

        fn write(&mut self, _address: u16, _value: u8) {}
    }

    #[test]
    fn reset_state_matches_post_boot_dmg() {
        let mut gb = GameBoy::new();

        let registers = gb.cpu().registers().clone();
        assert_eq!(registers.af(), 0x01B0);
        assert_eq!(registers.bc(), 0x0013);
        assert_eq!(registers.de(), 0x00D8);
        assert_eq!(registers.hl(), 0x014D);
        assert_eq!(registers.sp, 0xFFFE);
        assert_eq!(registers.pc, 0x0100);
        assert!(!registers.ime);

        assert_eq!(gb.read_memory(0xFF40), 0x91);
        assert_eq!(gb.read_memory(0xFF41), 0x85);
        assert_eq!(gb.read_memory(0xFF47), 0xFC);
        assert_eq!(gb.read_memory(0xFF0F), 0xE1);
        assert_eq!(gb.read_memory(0xFFFF), 0x00);
        assert_eq!(gb.read_memory(0xFF04), 0x00);
    }

    #[test]
    fn add_a_c_ignores_carry_in() {
        // ADD A, C
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0x81]));
        {
            let registers = gb.cpu_mut().registers_mut();
            registers.a = 0x14;
            registers.c = 0x22;
            registers.f = 0x10_u8.into();
        }

        let m_cycles = gb.step().unwrap();

        assert_eq!(m_cycles, 1);
        assert_eq!(gb.cpu().registers().a, 0x36);
        assert_eq!(u8::from(gb.cpu().registers().f), 0x00);
    }

    #[test]
    fn adc_a_c_honors_carry_in() {
        // ADC A, C
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0x89]));
        {
            let registers = gb.cpu_mut().registers_mut();
            registers.a = 0x50;
            registers.c = 0x30;
            registers.f = 0x10_u8.into();
        }

        gb.step().unwrap();

        assert_eq!(gb.cpu().registers().a, 0x81);
        assert_eq!(u8::from(gb.cpu().registers().f), 0x00);
    }

    #[test]
    fn halt_with_pending_interrupt_and_ime_clear_triggers_halt_bug() {
        // HALT; INC B
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0x76, 0x04]));
        gb.write_memory(0xFFFF, 0x01);
        gb.write_memory(0xFF0F, 0x01);

        gb.step().unwrap();
        assert!(!gb.cpu().is_halted());

        // The byte after HALT is fetched twice: PC stuck, then INC B again
        gb.step().unwrap();
        assert_eq!(gb.cpu().registers().pc, 0x0101);
        assert_eq!(gb.cpu().registers().b, 0x01);

        gb.step().unwrap();
        assert_eq!(gb.cpu().registers().pc, 0x0102);
        assert_eq!(gb.cpu().registers().b, 0x02);
    }

    #[test]
    fn ldh_round_trips_through_hram() {
        // LDH ($80), A; LD A, $00; LDH A, ($80)
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[
            0xE0, 0x80, 0x3E, 0x00, 0xF0, 0x80,
        ]));
        gb.cpu_mut().registers_mut().a = 0xAB;

        assert_eq!(gb.step().unwrap(), 3);
        assert_eq!(gb.read_memory(0xFF80), 0xAB);

        gb.step().unwrap();
        assert_eq!(gb.cpu().registers().a, 0x00);

        assert_eq!(gb.step().unwrap(), 3);
        assert_eq!(gb.cpu().registers().a, 0xAB);
    }

    #[test]
    fn ei_enables_interrupts_after_one_instruction() {
        // EI; NOP; NOP
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0xFB, 0x00, 0x00]));
        gb.write_memory(0xFF0F, 0x00);
        gb.write_memory(0xFFFF, 0x10);
        gb.request_interrupt(InterruptType::Joypad);

        // EI itself does not enable
        gb.step().unwrap();
        assert!(!gb.cpu().registers().ime);

        // The following instruction still executes normally
        gb.step().unwrap();
        assert_eq!(gb.cpu().registers().pc, 0x0102);
        assert!(gb.cpu().registers().ime);

        // Now the interrupt is serviced: 5 M-cycles, vector, IF bit cleared
        let m_cycles = gb.step().unwrap();
        assert_eq!(m_cycles, 5);
        assert_eq!(gb.cpu().registers().pc, 0x0060);
        assert!(!gb.cpu().registers().ime);
        assert_eq!(gb.read_memory(0xFF0F) & 0x10, 0x00);

        // The interrupted PC was pushed little-endian
        assert_eq!(gb.cpu().registers().sp, 0xFFFC);
        assert_eq!(gb.read_memory_u16(0xFFFC), 0x0102);
    }

    #[test]
    fn interrupt_priority_favors_the_lowest_bit() {
        // EI; NOP
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0xFB, 0x00]));
        gb.write_memory(0xFF0F, 0x00);
        gb.write_memory(0xFFFF, 0x1F);
        gb.request_interrupt(InterruptType::Timer);
        gb.request_interrupt(InterruptType::LcdStatus);

        gb.step().unwrap();
        gb.step().unwrap();
        gb.step().unwrap();

        assert_eq!(gb.cpu().registers().pc, 0x0048);
        // The LCD STAT flag was consumed; the timer flag is still pending
        assert_eq!(gb.read_memory(0xFF0F) & 0x1F, 0x04);
    }

    #[test]
    fn timer_interrupt_wakes_halted_cpu() {
        // HALT; INC B
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0x76, 0x04]));
        gb.write_memory(0xFF0F, 0x00);
        gb.write_memory(0xFFFF, 0x04);
        // TIMA one increment away from overflow, fastest clock (bit 3)
        gb.write_memory(0xFF05, 0xFF);
        gb.write_memory(0xFF06, 0x00);
        gb.write_memory(0xFF07, 0x05);

        gb.step().unwrap();
        assert!(gb.cpu().is_halted());

        // Each halted step burns 1 M-cycle; the first falling edge of bit 3
        // arrives within a few of them and overflows TIMA
        let mut guard = 0;
        while gb.cpu().is_halted() {
            gb.step().unwrap();
            guard += 1;
            assert!(guard < 20, "timer interrupt never woke the CPU");
        }

        assert_ne!(gb.read_memory(0xFF0F) & 0x04, 0x00);
        // IME is clear, so the CPU resumed without vectoring
        gb.step().unwrap();
        assert_eq!(gb.cpu().registers().b, 0x01);
    }

    #[test]
    fn stop_freezes_the_machine_until_resumed() {
        // STOP $00; INC B
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0x10, 0x00, 0x04]));
        gb.write_memory(0xFF0F, 0x00);

        gb.step().unwrap();
        assert!(gb.cpu().is_stopped());
        // STOP resets DIV
        assert_eq!(gb.read_memory(0xFF04), 0x00);

        // Nothing advances while stopped
        assert_eq!(gb.step().unwrap(), 0);
        assert_eq!(gb.step().unwrap(), 0);
        assert_eq!(gb.cpu().registers().pc, 0x0102);

        gb.resume_from_stop();
        gb.step().unwrap();
        assert_eq!(gb.cpu().registers().b, 0x01);
    }

    #[test]
    fn invalid_opcode_is_a_permanent_fault() {
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0xDD]));

        let err = gb.step().unwrap_err();
        assert_eq!(err, ExecutionError::InvalidOpcode { opcode: 0xDD, pc: 0x0100 });

        // The fault latches
        let err = gb.step().unwrap_err();
        assert_eq!(err, ExecutionError::InvalidOpcode { opcode: 0xDD, pc: 0x0100 });
    }

    #[test]
    fn frames_span_exactly_70224_t_cycles() {
        // Empty cartridge slot: the CPU executes NOPs forever
        let mut gb = GameBoy::new();
        gb.write_memory(0xFF0F, 0x00);

        let mut total_m_cycles: u64 = 0;
        while !gb.frame_ready() {
            total_m_cycles += u64::from(gb.step().unwrap());
        }
        // From reset, LY reaches 144 after 144 lines of 456 dots
        assert_eq!(total_m_cycles, 144 * 114);

        let mut frame_m_cycles: u64 = 0;
        loop {
            frame_m_cycles += u64::from(gb.step().unwrap());
            if gb.frame_ready() {
                break;
            }
        }
        // A whole frame is 154 lines = 70224 dots = 17556 M-cycles
        assert_eq!(frame_m_cycles, 154 * 114);
    }

    #[test]
    fn conditional_branch_timing() {
        // JR NZ, +2 (not taken); JR NC, +0 (taken)
        let mut gb = GameBoy::with_cartridge(TestCartridge::with_program(&[0x20, 0x02, 0x30, 0x00]));
        gb.write_memory(0xFF0F, 0x00);
        {
            let registers = gb.cpu_mut().registers_mut();
            // Z set, C clear
            registers.f = 0x80_u8.into();
        }

        assert_eq!(gb.step().unwrap(), 2);
        assert_eq!(gb.cpu().registers().pc, 0x0102);

        assert_eq!(gb.step().unwrap(), 3);
        assert_eq!(gb.cpu().registers().pc, 0x0104);
    }
}
