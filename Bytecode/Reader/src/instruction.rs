/// A raw 32 bit instruction word. Operand meaning depends on the operation,
/// which is only known through an [`OpcodeTable`](crate::opcode::OpcodeTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
	/// Bias applied to `D` by jump instructions.
	pub const JUMP_BIAS: u32 = 0x8000;

	#[must_use]
	pub const fn from_ad(opcode: u8, a: u8, d: u16) -> Self {
		Self(opcode as u32 | (a as u32) << 8 | (d as u32) << 16)
	}

	#[must_use]
	pub const fn from_abc(opcode: u8, a: u8, b: u8, c: u8) -> Self {
		Self(opcode as u32 | (a as u32) << 8 | (c as u32) << 16 | (b as u32) << 24)
	}

	#[must_use]
	pub const fn opcode(self) -> u8 {
		(self.0 & 0xFF) as u8
	}

	#[must_use]
	pub const fn a(self) -> u8 {
		(self.0 >> 8 & 0xFF) as u8
	}

	#[must_use]
	pub const fn b(self) -> u8 {
		(self.0 >> 24) as u8
	}

	#[must_use]
	pub const fn c(self) -> u8 {
		(self.0 >> 16 & 0xFF) as u8
	}

	#[must_use]
	pub const fn d(self) -> u16 {
		(self.0 >> 16) as u16
	}

	/// The instruction index a jump at `pc` lands on, or `None` when it
	/// would leave the function.
	#[must_use]
	pub fn jump_target(self, pc: usize, len: usize) -> Option<usize> {
		let target = (pc + 1 + usize::from(self.d())).checked_sub(Self::JUMP_BIAS as usize)?;

		(target < len).then_some(target)
	}
}
