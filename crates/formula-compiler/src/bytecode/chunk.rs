//! Bytecode chunk for one compiled expression.
//!
//! Operands follow their opcode big-endian. Branch offsets are relative to
//! the end of the branch instruction.

use std::fmt::Write as _;

use super::OpCode;

/// The instruction stream of a compiled expression, with per-byte line info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    code: Vec<u8>,
    /// Source line of each byte in `code`.
    lines: Vec<u32>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chunk expected to grow to `size` bytes.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            code: Vec::with_capacity(size),
            lines: Vec::with_capacity(size),
        }
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op.into(), line);
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_u16(&mut self, value: u16, line: u32) {
        self.extend(&value.to_be_bytes(), line);
    }

    pub fn write_i32(&mut self, value: i32, line: u32) {
        self.extend(&value.to_be_bytes(), line);
    }

    fn extend(&mut self, bytes: &[u8], line: u32) {
        self.code.extend_from_slice(bytes);
        self.lines.resize(self.code.len(), line);
    }

    /// Fill in the operand of a short branch once its target is known.
    pub fn patch_i8(&mut self, at: usize, offset: i8) {
        self.code[at] = offset.to_be_bytes()[0];
    }

    /// Fill in the operand of a long branch once its target is known.
    pub fn patch_i32(&mut self, at: usize, offset: i32) {
        self.code[at..at + 4].copy_from_slice(&offset.to_be_bytes());
    }

    /// Offset the next written byte will land at.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.code.get(offset..offset + 2)?.try_into().ok()?;
        Some(u16::from_be_bytes(bytes))
    }

    pub fn read_i32(&self, offset: usize) -> Option<i32> {
        let bytes: [u8; 4] = self.code.get(offset..offset + 4)?.try_into().ok()?;
        Some(i32::from_be_bytes(bytes))
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.read_byte(offset).and_then(OpCode::from_u8)
    }

    /// Walk the chunk instruction by instruction.
    ///
    /// Undecodable bytes are skipped one at a time.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            chunk: self,
            offset: 0,
        }
    }

    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions().map(|(_, op)| op).collect()
    }

    /// Absolute target of the branch at `offset`.
    pub fn branch_target(&self, offset: usize) -> Option<usize> {
        let op = self.read_op(offset)?;
        if !op.is_branch() {
            return None;
        }
        let end = offset + 1 + op.operand_size();
        let relative = if op.operand_size() == 1 {
            i64::from(self.read_byte(offset + 1)? as i8)
        } else {
            i64::from(self.read_i32(offset + 1)?)
        };
        usize::try_from(end as i64 + relative).ok()
    }

    /// Listing with one instruction per line, prefixed by the source line
    /// whenever it changes.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut last_line = None;
        for (offset, op) in self.instructions() {
            let line = self.line_at(offset);
            if line != last_line {
                if let Some(line) = line {
                    let _ = writeln!(out, "; line {line}");
                }
                last_line = line;
            }
            let _ = write!(out, "{offset:04} {}", op.name());
            let _ = match (op.is_branch(), op.operand_size()) {
                (true, _) => match self.branch_target(offset) {
                    Some(target) => write!(out, " -> {target:04}"),
                    None => Ok(()),
                },
                (false, 1) => write!(out, " {}", self.read_byte(offset + 1).unwrap_or(0)),
                (false, 2) => write!(out, " #{}", self.read_u16(offset + 1).unwrap_or(0)),
                (false, 3) => write!(
                    out,
                    " #{} argc={}",
                    self.read_u16(offset + 1).unwrap_or(0),
                    self.read_byte(offset + 3).unwrap_or(0)
                ),
                _ => Ok(()),
            };
            out.push('\n');
        }
        out
    }

    /// Panic with both listings unless the chunk decodes to exactly
    /// `expected`. Operand values are not compared.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        if actual != expected {
            let names = |ops: &[OpCode]| ops.iter().map(|op| op.name()).collect::<Vec<_>>();
            panic!(
                "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}\n{}",
                names(expected),
                names(&actual),
                self.disassemble()
            );
        }
    }
}

/// Iterator over `(offset, opcode)` pairs of a chunk.
pub struct Instructions<'c> {
    chunk: &'c BytecodeChunk,
    offset: usize,
}

impl Iterator for Instructions<'_> {
    type Item = (usize, OpCode);

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.chunk.len() {
            let at = self.offset;
            match self.chunk.read_op(at) {
                Some(op) => {
                    self.offset += 1 + op.operand_size();
                    return Some((at, op));
                }
                None => self.offset += 1,
            }
        }
        None
    }
}
