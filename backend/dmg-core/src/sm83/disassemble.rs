//! Instruction mnemonics, decoded arithmetically from opcode bits.
//!
//! Used by the step-loop trace log and by lockup diagnostics; also handy for
//! external harnesses that want to label a failing opcode.

const R_NAMES: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const RR_NAMES: [&str; 4] = ["BC", "DE", "HL", "SP"];
const PUSH_RR_NAMES: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC_NAMES: [&str; 4] = ["NZ", "Z", "NC", "C"];

fn r_src(opcode: u8) -> &'static str {
    R_NAMES[(opcode & 0x7) as usize]
}

fn r_dst(opcode: u8) -> &'static str {
    R_NAMES[((opcode >> 3) & 0x7) as usize]
}

fn rr(opcode: u8) -> &'static str {
    RR_NAMES[((opcode >> 4) & 0x3) as usize]
}

fn push_rr(opcode: u8) -> &'static str {
    PUSH_RR_NAMES[((opcode >> 4) & 0x3) as usize]
}

fn cc(opcode: u8) -> &'static str {
    CC_NAMES[((opcode >> 3) & 0x3) as usize]
}

#[must_use]
pub fn instruction_str(opcode: u8) -> String {
    match opcode {
        0x00 => "NOP".into(),
        0x01 | 0x11 | 0x21 | 0x31 => format!("LD {}, u16", rr(opcode)),
        0x02 => "LD (BC), A".into(),
        0x03 | 0x13 | 0x23 | 0x33 => format!("INC {}", rr(opcode)),
        0x0B | 0x1B | 0x2B | 0x3B => format!("DEC {}", rr(opcode)),
        0x09 | 0x19 | 0x29 | 0x39 => format!("ADD HL, {}", rr(opcode)),
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            format!("INC {}", r_dst(opcode))
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            format!("DEC {}", r_dst(opcode))
        }
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            format!("LD {}, u8", r_dst(opcode))
        }
        0x07 => "RLCA".into(),
        0x08 => "LD (u16), SP".into(),
        0x0A => "LD A, (BC)".into(),
        0x0F => "RRCA".into(),
        0x10 => "STOP".into(),
        0x12 => "LD (DE), A".into(),
        0x17 => "RLA".into(),
        0x18 => "JR i8".into(),
        0x1A => "LD A, (DE)".into(),
        0x1F => "RRA".into(),
        0x20 | 0x28 | 0x30 | 0x38 => format!("JR {}, i8", cc(opcode)),
        0x22 => "LD (HL+), A".into(),
        0x27 => "DAA".into(),
        0x2A => "LD A, (HL+)".into(),
        0x2F => "CPL".into(),
        0x32 => "LD (HL-), A".into(),
        0x37 => "SCF".into(),
        0x3A => "LD A, (HL-)".into(),
        0x3F => "CCF".into(),
        0x76 => "HALT".into(),
        0x40..=0x7F => format!("LD {}, {}", r_dst(opcode), r_src(opcode)),
        0x80..=0x87 => format!("ADD A, {}", r_src(opcode)),
        0x88..=0x8F => format!("ADC A, {}", r_src(opcode)),
        0x90..=0x97 => format!("SUB A, {}", r_src(opcode)),
        0x98..=0x9F => format!("SBC A, {}", r_src(opcode)),
        0xA0..=0xA7 => format!("AND A, {}", r_src(opcode)),
        0xA8..=0xAF => format!("XOR A, {}", r_src(opcode)),
        0xB0..=0xB7 => format!("OR A, {}", r_src(opcode)),
        0xB8..=0xBF => format!("CP A, {}", r_src(opcode)),
        0xC1 | 0xD1 | 0xE1 | 0xF1 => format!("POP {}", push_rr(opcode)),
        0xC5 | 0xD5 | 0xE5 | 0xF5 => format!("PUSH {}", push_rr(opcode)),
        0xC0 | 0xC8 | 0xD0 | 0xD8 => format!("RET {}", cc(opcode)),
        0xC2 | 0xCA | 0xD2 | 0xDA => format!("JP {}, u16", cc(opcode)),
        0xC4 | 0xCC | 0xD4 | 0xDC => format!("CALL {}, u16", cc(opcode)),
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            format!("RST ${:02X}", opcode & 0x38)
        }
        0xC3 => "JP u16".into(),
        0xC6 => "ADD A, u8".into(),
        0xC9 => "RET".into(),
        0xCB => "PREFIX CB".into(),
        0xCD => "CALL u16".into(),
        0xCE => "ADC A, u8".into(),
        0xD6 => "SUB A, u8".into(),
        0xD9 => "RETI".into(),
        0xDE => "SBC A, u8".into(),
        0xE0 => "LDH (u8), A".into(),
        0xE2 => "LD ($FF00+C), A".into(),
        0xE6 => "AND A, u8".into(),
        0xE8 => "ADD SP, i8".into(),
        0xE9 => "JP HL".into(),
        0xEA => "LD (u16), A".into(),
        0xEE => "XOR A, u8".into(),
        0xF0 => "LDH A, (u8)".into(),
        0xF2 => "LD A, ($FF00+C)".into(),
        0xF3 => "DI".into(),
        0xF6 => "OR A, u8".into(),
        0xF8 => "LD HL, SP+i8".into(),
        0xF9 => "LD SP, HL".into(),
        0xFA => "LD A, (u16)".into(),
        0xFB => "EI".into(),
        0xFE => "CP A, u8".into(),
        0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
            "INVALID".into()
        }
    }
}

#[must_use]
pub fn cb_instruction_str(opcode: u8) -> String {
    let bit = (opcode >> 3) & 0x7;
    match opcode {
        0x00..=0x07 => format!("RLC {}", r_src(opcode)),
        0x08..=0x0F => format!("RRC {}", r_src(opcode)),
        0x10..=0x17 => format!("RL {}", r_src(opcode)),
        0x18..=0x1F => format!("RR {}", r_src(opcode)),
        0x20..=0x27 => format!("SLA {}", r_src(opcode)),
        0x28..=0x2F => format!("SRA {}", r_src(opcode)),
        0x30..=0x37 => format!("SWAP {}", r_src(opcode)),
        0x38..=0x3F => format!("SRL {}", r_src(opcode)),
        0x40..=0x7F => format!("BIT {bit}, {}", r_src(opcode)),
        0x80..=0xBF => format!("RES {bit}, {}", r_src(opcode)),
        0xC0..=0xFF => format!("SET {bit}, {}", r_src(opcode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_register_grids() {
        assert_eq!(instruction_str(0x41), "LD B, C");
        assert_eq!(instruction_str(0x7E), "LD A, (HL)");
        assert_eq!(instruction_str(0x81), "ADD A, C");
        assert_eq!(instruction_str(0x96), "SUB A, (HL)");
        assert_eq!(instruction_str(0xF7), "RST $30");
        assert_eq!(instruction_str(0xDA), "JP C, u16");
        assert_eq!(instruction_str(0xDD), "INVALID");
    }

    #[test]
    fn decodes_cb_grid() {
        assert_eq!(cb_instruction_str(0x11), "RL C");
        assert_eq!(cb_instruction_str(0x7E), "BIT 7, (HL)");
        assert_eq!(cb_instruction_str(0x87), "RES 0, A");
        assert_eq!(cb_instruction_str(0xFE), "SET 7, (HL)");
    }
}
