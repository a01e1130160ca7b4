use std::fmt;

/// A decoded CHIP-8 instruction, operands already pulled out of the opcode.
///
/// `x`/`y` are register numbers (0x0-0xf), `kk` an immediate byte, `nnn` a
/// 12-bit address and `n` a 4-bit row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 0nnn, machine code routine; ignored
    Sys(u16),
    /// 1nnn
    Jp(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SeByte(u8, u8),
    /// 4xkk
    SneByte(u8, u8),
    /// 5xy0
    SeReg(u8, u8),
    /// 6xkk
    LdByte(u8, u8),
    /// 7xkk
    AddByte(u8, u8),
    /// 8xy0
    LdReg(u8, u8),
    /// 8xy1
    Or(u8, u8),
    /// 8xy2
    And(u8, u8),
    /// 8xy3
    Xor(u8, u8),
    /// 8xy4
    AddReg(u8, u8),
    /// 8xy5
    Sub(u8, u8),
    /// 8xy6
    Shr(u8),
    /// 8xy7
    Subn(u8, u8),
    /// 8xyE
    Shl(u8),
    /// 9xy0
    SneReg(u8, u8),
    /// Annn
    LdI(u16),
    /// Bnnn
    JpV0(u16),
    /// Cxkk
    Rnd(u8, u8),
    /// Dxyn
    Drw(u8, u8, u8),
    /// Ex9E
    Skp(u8),
    /// ExA1
    Sknp(u8),
    /// Fx07
    LdVxDt(u8),
    /// Fx0A
    LdKey(u8),
    /// Fx15
    LdDtVx(u8),
    /// Fx18
    LdStVx(u8),
    /// Fx1E
    AddI(u8),
    /// Fx29
    LdF(u8),
    /// Fx33
    LdB(u8),
    /// Fx55
    Store(u8),
    /// Fx65
    Load(u8),
}

impl Instruction {
    /// Decode a raw opcode. Encodings with no defined meaning give `None`.
    pub fn decode(opcode: u16) -> Option<Instruction> {
        use Instruction::*;

        let nibbles = [
            (opcode >> 12) as u8 & 0xf,
            (opcode >> 8) as u8 & 0xf,
            (opcode >> 4) as u8 & 0xf,
            opcode as u8 & 0xf,
        ];
        let nnn = opcode & 0x0fff;
        let kk = opcode as u8;

        let inst = match nibbles {
            [0x0, 0x0, 0xe, 0x0] => Cls,
            [0x0, 0x0, 0xe, 0xe] => Ret,
            [0x0, _, _, _] => Sys(nnn),
            [0x1, _, _, _] => Jp(nnn),
            [0x2, _, _, _] => Call(nnn),
            [0x3, x, _, _] => SeByte(x, kk),
            [0x4, x, _, _] => SneByte(x, kk),
            // the low nibble of 5XYN and 9XYN is don't-care
            [0x5, x, y, _] => SeReg(x, y),
            [0x6, x, _, _] => LdByte(x, kk),
            [0x7, x, _, _] => AddByte(x, kk),
            [0x8, x, y, 0x0] => LdReg(x, y),
            [0x8, x, y, 0x1] => Or(x, y),
            [0x8, x, y, 0x2] => And(x, y),
            [0x8, x, y, 0x3] => Xor(x, y),
            [0x8, x, y, 0x4] => AddReg(x, y),
            [0x8, x, y, 0x5] => Sub(x, y),
            [0x8, x, _, 0x6] => Shr(x),
            [0x8, x, y, 0x7] => Subn(x, y),
            [0x8, x, _, 0xe] => Shl(x),
            [0x9, x, y, _] => SneReg(x, y),
            [0xa, _, _, _] => LdI(nnn),
            [0xb, _, _, _] => JpV0(nnn),
            [0xc, x, _, _] => Rnd(x, kk),
            [0xd, x, y, n] => Drw(x, y, n),
            [0xe, x, 0x9, 0xe] => Skp(x),
            [0xe, x, 0xa, 0x1] => Sknp(x),
            [0xf, x, 0x0, 0x7] => LdVxDt(x),
            [0xf, x, 0x0, 0xa] => LdKey(x),
            [0xf, x, 0x1, 0x5] => LdDtVx(x),
            [0xf, x, 0x1, 0x8] => LdStVx(x),
            [0xf, x, 0x1, 0xe] => AddI(x),
            [0xf, x, 0x2, 0x9] => LdF(x),
            [0xf, x, 0x3, 0x3] => LdB(x),
            [0xf, x, 0x5, 0x5] => Store(x),
            [0xf, x, 0x6, 0x5] => Load(x),
            _ => return None,
        };
        Some(inst)
    }
}

/// Cowgod-style mnemonics, used for disassembly and trace logs
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Sys(a) => write!(f, "SYS  {:#05x}", a),
            Jp(a) => write!(f, "JP   {:#05x}", a),
            Call(a) => write!(f, "CALL {:#05x}", a),
            SeByte(x, kk) => write!(f, "SE   V{:X}, {:#04x}", x, kk),
            SneByte(x, kk) => write!(f, "SNE  V{:X}, {:#04x}", x, kk),
            SeReg(x, y) => write!(f, "SE   V{:X}, V{:X}", x, y),
            LdByte(x, kk) => write!(f, "LD   V{:X}, {:#04x}", x, kk),
            AddByte(x, kk) => write!(f, "ADD  V{:X}, {:#04x}", x, kk),
            LdReg(x, y) => write!(f, "LD   V{:X}, V{:X}", x, y),
            Or(x, y) => write!(f, "OR   V{:X}, V{:X}", x, y),
            And(x, y) => write!(f, "AND  V{:X}, V{:X}", x, y),
            Xor(x, y) => write!(f, "XOR  V{:X}, V{:X}", x, y),
            AddReg(x, y) => write!(f, "ADD  V{:X}, V{:X}", x, y),
            Sub(x, y) => write!(f, "SUB  V{:X}, V{:X}", x, y),
            Shr(x) => write!(f, "SHR  V{:X}", x),
            Subn(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Shl(x) => write!(f, "SHL  V{:X}", x),
            SneReg(x, y) => write!(f, "SNE  V{:X}, V{:X}", x, y),
            LdI(a) => write!(f, "LD   I, {:#05x}", a),
            JpV0(a) => write!(f, "JP   V0, {:#05x}", a),
            Rnd(x, kk) => write!(f, "RND  V{:X}, {:#04x}", x, kk),
            Drw(x, y, n) => write!(f, "DRW  V{:X}, V{:X}, {}", x, y, n),
            Skp(x) => write!(f, "SKP  V{:X}", x),
            Sknp(x) => write!(f, "SKNP V{:X}", x),
            LdVxDt(x) => write!(f, "LD   V{:X}, DT", x),
            LdKey(x) => write!(f, "LD   V{:X}, K", x),
            LdDtVx(x) => write!(f, "LD   DT, V{:X}", x),
            LdStVx(x) => write!(f, "LD   ST, V{:X}", x),
            AddI(x) => write!(f, "ADD  I, V{:X}", x),
            LdF(x) => write!(f, "LD   F, V{:X}", x),
            LdB(x) => write!(f, "LD   B, V{:X}", x),
            Store(x) => write!(f, "LD   [I], V{:X}", x),
            Load(x) => write!(f, "LD   V{:X}, [I]", x),
        }
    }
}

/// Pair each opcode in a program with its address and mnemonic, assuming
/// the program is loaded at `origin`. A trailing odd byte is dropped.
pub fn disassemble(program: &[u8], origin: u16) -> Vec<(u16, u16, Option<Instruction>)> {
    program
        .chunks_exact(2)
        .enumerate()
        .map(|(i, word)| {
            let opcode = ((word[0] as u16) << 8) | word[1] as u16;
            (
                origin.wrapping_add(2 * i as u16),
                opcode,
                Instruction::decode(opcode),
            )
        })
        .collect()
}
