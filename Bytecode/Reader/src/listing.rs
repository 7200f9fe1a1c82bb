use core::fmt::{Display, Formatter, Result};

use crate::{
	constant::{Constant, Number},
	instruction::Instruction,
	opcode::{Operand, OpcodeTable, Shape},
	prototype::Prototype,
};

/// Renders every prototype of a chunk as an annotated instruction listing,
/// children before their parent like the dump itself.
pub struct Listing<'inner> {
	prototype: &'inner Prototype,
	table: &'inner OpcodeTable,
}

impl<'inner> Listing<'inner> {
	#[must_use]
	pub const fn new(prototype: &'inner Prototype, table: &'inner OpcodeTable) -> Self {
		Self { prototype, table }
	}

	fn fmt_operand(
		prototype: &Prototype,
		operand: Operand,
		value: u16,
		pc: usize,
		f: &mut Formatter,
	) -> Result {
		match operand {
			Operand::None => Ok(()),
			Operand::Jump => {
				let target = (pc + 1 + usize::from(value)).wrapping_sub(Instruction::JUMP_BIAS as usize);

				write!(f, " => {target:04}")
			}
			Operand::SignedLiteral => write!(f, " {}", value as i16),
			Operand::String => match prototype.string(value) {
				Some(string) => write!(f, " \"{}\"", string.escape_ascii()),
				None => write!(f, " str#{value}"),
			},
			Operand::Number => match prototype.number(value) {
				Some(Number::Integer(integer)) => write!(f, " {integer}"),
				Some(Number::Float(float)) => write!(f, " {float:?}"),
				None => write!(f, " num#{value}"),
			},
			Operand::Primitive => match value {
				0 => write!(f, " nil"),
				1 => write!(f, " false"),
				_ => write!(f, " true"),
			},
			Operand::Function => match prototype.child(value) {
				Some((child, _)) => write!(f, " function#{child}"),
				None => write!(f, " kgc#{value}"),
			},
			Operand::Table | Operand::Cdata => match prototype.constant(value) {
				Some(Constant::Table(table)) => {
					write!(f, " table[{}, {}]", table.array.len(), table.hash.len())
				}
				Some(Constant::Signed(signed)) => write!(f, " {signed}LL"),
				Some(Constant::Unsigned(unsigned)) => write!(f, " {unsigned}ULL"),
				Some(Constant::Complex(real, imaginary)) => write!(f, " {real}+{imaginary}i"),
				_ => write!(f, " kgc#{value}"),
			},
			Operand::Upvalue => write!(f, " uv{value}"),
			Operand::Destination | Operand::Variable | Operand::Base | Operand::Literal => {
				write!(f, " {value}")
			}
		}
	}

	fn fmt_instruction(&self, prototype: &Prototype, pc: usize, f: &mut Formatter) -> Result {
		let instruction = prototype.instructions[pc];

		write!(f, "{pc:04}")?;

		if let Some(line) = prototype.line(pc) {
			write!(f, " [{line:>4}]")?;
		}

		let Some(operation) = self.table.decode(instruction.opcode()) else {
			return writeln!(f, "  ??? {:#010X}", instruction.0);
		};

		write!(f, "  {:<7}", operation.name())?;

		match operation.shape() {
			Shape::AD(a, d) => {
				Self::fmt_operand(prototype, a, instruction.a().into(), pc, f)?;
				Self::fmt_operand(prototype, d, instruction.d(), pc, f)?;
			}
			Shape::ABC(a, b, c) => {
				Self::fmt_operand(prototype, a, instruction.a().into(), pc, f)?;
				Self::fmt_operand(prototype, b, instruction.b().into(), pc, f)?;
				Self::fmt_operand(prototype, c, instruction.c().into(), pc, f)?;
			}
		}

		writeln!(f)
	}

	fn fmt_prototype(&self, prototype: &Prototype, path: &mut alloc::vec::Vec<usize>, f: &mut Formatter) -> Result {
		for (index, child) in prototype.children.iter().enumerate() {
			path.push(index);

			self.fmt_prototype(child, path, f)?;

			path.pop();
		}

		write!(f, "-- function")?;

		path.iter().try_for_each(|index| write!(f, ".{index}"))?;

		writeln!(
			f,
			" ({} parameters{}, frame {}, {} upvalues)",
			prototype.parameters,
			if prototype.flags.is_variadic() { ", variadic" } else { "" },
			prototype.frame_size,
			prototype.upvalues.len(),
		)?;

		(0..prototype.instructions.len()).try_for_each(|pc| self.fmt_instruction(prototype, pc, f))?;

		writeln!(f)
	}
}

impl Display for Listing<'_> {
	fn fmt(&self, f: &mut Formatter) -> Result {
		let mut path = alloc::vec::Vec::new();

		self.fmt_prototype(self.prototype, &mut path, f)
	}
}
