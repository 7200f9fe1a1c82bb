use alloc::{string::String, sync::Arc, vec::Vec};

use crate::{
	constant::{Constant, Number, Table, TableValue},
	error::{MalformedBytecode, Reason},
	header::{Header, HeaderFlags, MAGIC},
	instruction::Instruction,
	opcode::{OpcodeTable, Version},
	prototype::{
		DebugInfo, InternalName, Prototype, PrototypeFlags, Upvalue, Variable, VariableName,
	},
	reader::Reader,
};

/// A decoded dump: its header and the prototype of the main chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
	pub header: Header,
	pub root: Prototype,
}

struct Counts {
	upvalues: usize,
	constants: usize,
	numbers: usize,
	instructions: usize,
	debug: usize,
	first_line: u32,
	line_count: u32,
}

/// Decodes dumps for the dialect of one [`OpcodeTable`].
pub struct Parser<'table> {
	table: &'table OpcodeTable,
	flags: HeaderFlags,
	stack: Vec<Prototype>,
}

impl<'table> Parser<'table> {
	#[must_use]
	pub const fn new(table: &'table OpcodeTable) -> Self {
		Self {
			table,
			flags: HeaderFlags(0),
			stack: Vec::new(),
		}
	}

	fn read_header(&mut self, reader: &mut Reader) -> Result<Header, MalformedBytecode> {
		if reader.bytes(MAGIC.len())? != MAGIC {
			return Err(MalformedBytecode {
				offset: 0,
				reason: Reason::BadMagic,
			});
		}

		let format = reader.byte()?;
		let version = Version::from_format(format).ok_or_else(|| MalformedBytecode {
			offset: 3,
			reason: Reason::UnknownVersion(format),
		})?;

		let expected = self.table.version();

		if version != expected {
			return Err(MalformedBytecode {
				offset: 3,
				reason: Reason::VersionMismatch {
					expected,
					found: version,
				},
			});
		}

		self.flags = HeaderFlags(reader.uleb128()?);

		let name = if self.flags.is_stripped() {
			None
		} else {
			let len = reader.uleb128_usize()?;

			Some(reader.string(len)?)
		};

		Ok(Header {
			version,
			flags: self.flags,
			name,
		})
	}

	fn read_counts(&self, reader: &mut Reader) -> Result<(PrototypeFlags, u8, u8, Counts), MalformedBytecode> {
		let flags = PrototypeFlags(reader.byte()?);
		let parameters = reader.byte()?;
		let frame_size = reader.byte()?;
		let upvalues = usize::from(reader.byte()?);
		let constants = reader.uleb128_usize()?;
		let numbers = reader.uleb128_usize()?;
		let instructions = reader.uleb128_usize()?;

		let mut counts = Counts {
			upvalues,
			constants,
			numbers,
			instructions,
			debug: 0,
			first_line: 0,
			line_count: 0,
		};

		if !self.flags.is_stripped() {
			counts.debug = reader.uleb128_usize()?;

			if counts.debug != 0 {
				counts.first_line = reader.uleb128()?;
				counts.line_count = reader.uleb128()?;
			}
		}

		Ok((flags, parameters, frame_size, counts))
	}

	fn read_instructions(
		&self,
		reader: &mut Reader,
		count: usize,
	) -> Result<Vec<Instruction>, MalformedBytecode> {
		if count.saturating_mul(4) > reader.remaining() {
			return Err(reader.error(Reason::Truncated));
		}

		let big_endian = self.flags.is_big_endian();

		(0..count)
			.map(|_| reader.u32(big_endian).map(Instruction))
			.collect()
	}

	fn read_upvalues(&self, reader: &mut Reader, count: usize) -> Result<Vec<Upvalue>, MalformedBytecode> {
		let big_endian = self.flags.is_big_endian();

		(0..count)
			.map(|_| reader.u16(big_endian).map(Upvalue::from_raw))
			.collect()
	}

	fn read_table_value(reader: &mut Reader) -> Result<TableValue, MalformedBytecode> {
		let tag = reader.uleb128_usize()?;
		let value = match tag {
			0 => TableValue::Nil,
			1 => TableValue::False,
			2 => TableValue::True,
			3 => TableValue::Integer(reader.uleb128()? as i32),
			4 => TableValue::Number(f64::from_bits(Self::read_wide(reader)?)),
			_ => TableValue::String(reader.string(tag - 5)?),
		};

		Ok(value)
	}

	fn read_table(reader: &mut Reader) -> Result<Table, MalformedBytecode> {
		let array_len = reader.uleb128_usize()?;
		let hash_len = reader.uleb128_usize()?;

		let mut table = Table {
			array: Vec::with_capacity(array_len.min(reader.remaining())),
			hash: Vec::with_capacity(hash_len.min(reader.remaining())),
		};

		for _ in 0..array_len {
			table.array.push(Self::read_table_value(reader)?);
		}

		for _ in 0..hash_len {
			let key = Self::read_table_value(reader)?;
			let value = Self::read_table_value(reader)?;

			table.hash.push((key, value));
		}

		Ok(table)
	}

	fn read_wide(reader: &mut Reader) -> Result<u64, MalformedBytecode> {
		let low = reader.uleb128()?;
		let high = reader.uleb128()?;

		Ok(u64::from(high) << 32 | u64::from(low))
	}

	fn read_constants(
		&mut self,
		reader: &mut Reader,
		count: usize,
		children: &mut Vec<Prototype>,
	) -> Result<Vec<Constant>, MalformedBytecode> {
		let mut constants = Vec::with_capacity(count.min(reader.remaining()));

		for _ in 0..count {
			let offset = reader.offset();
			let tag = reader.uleb128_usize()?;
			let constant = match tag {
				0 => {
					let child = self.stack.pop().ok_or(MalformedBytecode {
						offset,
						reason: Reason::MissingChild,
					})?;

					let index = u16::try_from(children.len()).map_err(|_| MalformedBytecode {
						offset,
						reason: Reason::Overflow,
					})?;

					children.push(child);

					Constant::Child(index)
				}
				1 => Constant::Table(Self::read_table(reader)?),
				2 => Constant::Signed(Self::read_wide(reader)? as i64),
				3 => Constant::Unsigned(Self::read_wide(reader)?),
				4 => {
					let real = f64::from_bits(Self::read_wide(reader)?);
					let imaginary = f64::from_bits(Self::read_wide(reader)?);

					Constant::Complex(real, imaginary)
				}
				_ => Constant::String(reader.string(tag - 5)?),
			};

			constants.push(constant);
		}

		constants.reverse();

		Ok(constants)
	}

	fn read_numbers(reader: &mut Reader, count: usize) -> Result<Vec<Number>, MalformedBytecode> {
		let mut numbers = Vec::with_capacity(count.min(reader.remaining()));

		for _ in 0..count {
			let (low, is_float) = reader.uleb128_33()?;
			let number = if is_float {
				let high = reader.uleb128()?;

				Number::from_parts(low, high)
			} else {
				Number::Integer(low as i32)
			};

			numbers.push(number);
		}

		Ok(numbers)
	}

	fn read_lines(&self, reader: &mut Reader, counts: &Counts) -> Result<Vec<u32>, MalformedBytecode> {
		let big_endian = self.flags.is_big_endian();
		let mut lines = Vec::with_capacity(counts.instructions.min(reader.remaining()));

		for _ in 0..counts.instructions {
			let delta = if counts.line_count < 256 {
				u32::from(reader.byte()?)
			} else if counts.line_count < 65536 {
				u32::from(reader.u16(big_endian)?)
			} else {
				reader.u32(big_endian)?
			};

			lines.push(counts.first_line.wrapping_add(delta));
		}

		Ok(lines)
	}

	fn read_variables(reader: &mut Reader) -> Result<Vec<Variable>, MalformedBytecode> {
		let mut variables = Vec::new();
		let mut last = 0_u32;

		loop {
			if reader.is_empty() {
				break;
			}

			let name = match reader.byte()? {
				0 => break,
				tag if tag < 7 => InternalName::from_tag(tag)
					.map(VariableName::Internal)
					.ok_or_else(|| reader.error(Reason::DebugOverrun))?,
				first => {
					let mut name = alloc::vec![first];

					name.extend_from_slice(reader.c_string()?);

					VariableName::Named(Arc::from(String::from_utf8_lossy(&name).as_ref()))
				}
			};

			let start = last.wrapping_add(reader.uleb128()?);
			let end = start.wrapping_add(reader.uleb128()?);

			last = start;

			variables.push(Variable { name, start, end });
		}

		Ok(variables)
	}

	fn read_debug(
		&self,
		reader: &mut Reader,
		counts: &Counts,
		upvalues: usize,
	) -> Result<Option<DebugInfo>, MalformedBytecode> {
		if counts.debug == 0 {
			return Ok(None);
		}

		let mut reader = reader.sub_reader(counts.debug)?;
		let lines = self.read_lines(&mut reader, counts)?;
		let upvalue_names = (0..upvalues)
			.map(|_| {
				reader
					.c_string()
					.map(|name| Arc::from(String::from_utf8_lossy(name).as_ref()))
			})
			.collect::<Result<_, _>>()?;

		let variables = Self::read_variables(&mut reader)?;

		Ok(Some(DebugInfo {
			first_line: counts.first_line,
			line_count: counts.line_count,
			lines,
			upvalue_names,
			variables,
		}))
	}

	fn read_prototype(&mut self, reader: &mut Reader) -> Result<Prototype, MalformedBytecode> {
		let (flags, parameters, frame_size, counts) = self.read_counts(reader)?;

		let instructions = self.read_instructions(reader, counts.instructions)?;
		let upvalues = self.read_upvalues(reader, counts.upvalues)?;

		let mut children = Vec::new();

		let mut constants = self.read_constants(reader, counts.constants, &mut children)?;
		let numbers = Self::read_numbers(reader, counts.numbers)?;
		let debug = self.read_debug(reader, &counts, counts.upvalues)?;

		// Children were popped most recent first.
		let count = children.len();

		children.reverse();

		for constant in &mut constants {
			if let Constant::Child(index) = constant {
				*index = (count - 1 - usize::from(*index)) as u16;
			}
		}

		Ok(Prototype {
			flags,
			parameters,
			frame_size,
			instructions,
			upvalues,
			constants,
			numbers,
			children,
			debug,
		})
	}

	fn read_prototypes(&mut self, reader: &mut Reader) -> Result<(), MalformedBytecode> {
		loop {
			let len = reader.uleb128_usize()?;

			if len == 0 {
				return Ok(());
			}

			let mut inner = reader.sub_reader(len)?;
			let prototype = self.read_prototype(&mut inner)?;

			if !inner.is_empty() {
				return Err(inner.error(Reason::LengthMismatch {
					declared: len,
					consumed: len - inner.remaining(),
				}));
			}

			tracing::trace!(
				instructions = prototype.instructions.len(),
				children = prototype.children.len(),
				"read prototype"
			);

			self.stack.push(prototype);
		}
	}

	/// Decodes a whole dump.
	///
	/// # Errors
	///
	/// Returns [`MalformedBytecode`] if the container does not match the
	/// format of the selected table, is truncated, or is inconsistent.
	pub fn parse(&mut self, data: &[u8]) -> Result<Chunk, MalformedBytecode> {
		let mut reader = Reader::new(data);

		self.stack.clear();

		let header = self.read_header(&mut reader)?;

		self.read_prototypes(&mut reader)?;

		let root = self.stack.pop().ok_or_else(|| reader.error(Reason::Empty))?;

		if !self.stack.is_empty() {
			let count = self.stack.len();

			self.stack.clear();

			return Err(reader.error(Reason::DanglingPrototypes(count)));
		}

		tracing::debug!(version = %header.version, "parsed chunk");

		Ok(Chunk { header, root })
	}
}
