use luajit_reader::{
	header::{HeaderFlags, MAGIC},
	instruction::Instruction,
	opcode::{OpcodeTable, Operation, Version},
	prototype::{PrototypeFlags, Upvalue},
};

fn write_uleb128(out: &mut Vec<u8>, mut value: u32) {
	loop {
		let byte = (value & 0x7F) as u8;

		value >>= 7;

		if value == 0 {
			out.push(byte);

			return;
		}

		out.push(byte | 0x80);
	}
}

fn write_uleb128_33(out: &mut Vec<u8>, value: u32, is_float: bool) {
	let mut first = ((value & 0x3F) << 1) as u8 | u8::from(is_float);
	let rest = value >> 6;

	if rest != 0 {
		first |= 0x80;
	}

	out.push(first);

	if rest != 0 {
		write_uleb128(out, rest);
	}
}

/// A garbage collected constant, listed in operand order.
pub enum Kgc {
	Child,
	String(&'static str),
	Signed(i64),
	Unsigned(u64),
}

pub enum Knum {
	Integer(i32),
	Float(f64),
}

enum Name {
	Named(&'static str),
	Internal(u8),
}

struct Variable {
	name: Name,
	start: u32,
	end: u32,
}

/// Writes one prototype and its children in the dump format.
pub struct Proto {
	table: OpcodeTable,
	flags: u8,
	parameters: u8,
	frame_size: u8,
	instructions: Vec<Instruction>,
	upvalues: Vec<(u16, &'static str)>,
	constants: Vec<Kgc>,
	numbers: Vec<Knum>,
	variables: Vec<Variable>,
	children: Vec<Proto>,
}

impl Proto {
	pub fn new(version: Version) -> Self {
		Self {
			table: OpcodeTable::new(version),
			flags: 0,
			parameters: 0,
			frame_size: 2,
			instructions: Vec::new(),
			upvalues: Vec::new(),
			constants: Vec::new(),
			numbers: Vec::new(),
			variables: Vec::new(),
			children: Vec::new(),
		}
	}

	/// The main chunk of a script, which takes `...`.
	pub fn main(version: Version) -> Self {
		Self::new(version).variadic()
	}

	pub fn variadic(mut self) -> Self {
		self.flags |= PrototypeFlags::VARIADIC;
		self
	}

	pub fn parameters(mut self, count: u8) -> Self {
		self.parameters = count;
		self
	}

	pub fn frame(mut self, size: u8) -> Self {
		self.frame_size = size;
		self
	}

	pub fn constant(mut self, constant: Kgc) -> Self {
		self.constants.push(constant);
		self
	}

	pub fn string(self, value: &'static str) -> Self {
		self.constant(Kgc::String(value))
	}

	pub fn number(mut self, number: Knum) -> Self {
		self.numbers.push(number);
		self
	}

	/// Adds a closure, referenced by a [`Kgc::Child`] at the next constant
	/// index.
	pub fn child(mut self, child: Proto) -> Self {
		self.flags |= PrototypeFlags::HAS_CHILD;
		self.children.push(child);
		self.constant(Kgc::Child)
	}

	/// Captures a register of the enclosing function.
	pub fn capture_local(mut self, slot: u16, name: &'static str) -> Self {
		self.upvalues.push((slot | Upvalue::LOCAL, name));
		self
	}

	/// Captures an upvalue of the enclosing function.
	pub fn capture_upvalue(mut self, index: u16, name: &'static str) -> Self {
		self.upvalues.push((index, name));
		self
	}

	/// Names a register from position `start` up to `end`, positions counting
	/// the implicit function header.
	pub fn variable(mut self, name: &'static str, start: u32, end: u32) -> Self {
		self.variables.push(Variable {
			name: Name::Named(name),
			start,
			end,
		});
		self
	}

	pub fn internal(mut self, tag: u8, start: u32, end: u32) -> Self {
		self.variables.push(Variable {
			name: Name::Internal(tag),
			start,
			end,
		});
		self
	}

	fn opcode(&self, operation: Operation) -> u8 {
		self.table
			.encode(operation)
			.unwrap_or_else(|| panic!("{operation:?} is not in the table"))
	}

	pub fn ad(mut self, operation: Operation, a: u8, d: u16) -> Self {
		let opcode = self.opcode(operation);

		self.instructions.push(Instruction::from_ad(opcode, a, d));
		self
	}

	pub fn abc(mut self, operation: Operation, a: u8, b: u8, c: u8) -> Self {
		let opcode = self.opcode(operation);

		self.instructions
			.push(Instruction::from_abc(opcode, a, b, c));
		self
	}

	/// Adds a jump like instruction landing on instruction `target`.
	pub fn jump(self, operation: Operation, a: u8, target: usize) -> Self {
		let pc = self.instructions.len();
		let d = (target + Instruction::JUMP_BIAS as usize - pc - 1) as u16;

		self.ad(operation, a, d)
	}

	pub fn raw(mut self, word: u32) -> Self {
		self.instructions.push(Instruction(word));
		self
	}

	/// The position right after the last instruction added so far.
	pub fn position(&self) -> u32 {
		self.instructions.len() as u32 + 1
	}

	fn write_constant(out: &mut Vec<u8>, constant: &Kgc) {
		let write_wide = |out: &mut Vec<u8>, value: u64| {
			write_uleb128(out, value as u32);
			write_uleb128(out, (value >> 32) as u32);
		};

		match *constant {
			Kgc::Child => out.push(0),
			Kgc::Signed(value) => {
				out.push(2);
				write_wide(out, value as u64);
			}
			Kgc::Unsigned(value) => {
				out.push(3);
				write_wide(out, value);
			}
			Kgc::String(value) => {
				write_uleb128(out, value.len() as u32 + 5);
				out.extend_from_slice(value.as_bytes());
			}
		}
	}

	fn write_debug(&self, out: &mut Vec<u8>) {
		// One line per instruction, all on line 1 after the first.
		for _ in &self.instructions {
			out.push(1);
		}

		for &(_, name) in &self.upvalues {
			out.extend_from_slice(name.as_bytes());
			out.push(0);
		}

		let mut last = 0;

		for variable in &self.variables {
			match variable.name {
				Name::Named(name) => {
					out.extend_from_slice(name.as_bytes());
					out.push(0);
				}
				Name::Internal(tag) => out.push(tag),
			}

			write_uleb128(out, variable.start - last);
			write_uleb128(out, variable.end - variable.start);

			last = variable.start;
		}

		out.push(0);
	}

	fn write_body(&self, out: &mut Vec<u8>, stripped: bool) {
		out.push(self.flags);
		out.push(self.parameters);
		out.push(self.frame_size);
		out.push(self.upvalues.len() as u8);

		write_uleb128(out, self.constants.len() as u32);
		write_uleb128(out, self.numbers.len() as u32);
		write_uleb128(out, self.instructions.len() as u32);

		let mut debug = Vec::new();

		if !stripped {
			self.write_debug(&mut debug);

			write_uleb128(out, debug.len() as u32);
			write_uleb128(out, 1);
			write_uleb128(out, 2);
		}

		for instruction in &self.instructions {
			out.extend_from_slice(&instruction.0.to_le_bytes());
		}

		for &(raw, _) in &self.upvalues {
			out.extend_from_slice(&raw.to_le_bytes());
		}

		// Operand 0 is the last constant stored.
		for constant in self.constants.iter().rev() {
			Self::write_constant(out, constant);
		}

		for number in &self.numbers {
			match *number {
				Knum::Integer(value) => write_uleb128_33(out, value as u32, false),
				Knum::Float(value) => {
					let bits = value.to_bits();

					write_uleb128_33(out, bits as u32, true);
					write_uleb128(out, (bits >> 32) as u32);
				}
			}
		}

		out.extend_from_slice(&debug);
	}

	fn write(&self, out: &mut Vec<u8>, stripped: bool) {
		for child in &self.children {
			child.write(out, stripped);
		}

		let mut body = Vec::new();

		self.write_body(&mut body, stripped);

		write_uleb128(out, body.len() as u32);
		out.extend_from_slice(&body);
	}
}

/// Builds a whole dump around a main prototype.
pub struct Dump {
	version: Version,
	stripped: bool,
	two_slot_frame: bool,
}

impl Dump {
	pub const fn new(version: Version) -> Self {
		Self {
			version,
			stripped: false,
			two_slot_frame: false,
		}
	}

	pub const fn stripped(mut self) -> Self {
		self.stripped = true;
		self
	}

	pub const fn two_slot_frame(mut self) -> Self {
		self.two_slot_frame = true;
		self
	}

	pub fn finish(&self, root: &Proto) -> Vec<u8> {
		let mut flags = 0;

		if self.stripped {
			flags |= HeaderFlags::STRIPPED;
		}

		if self.two_slot_frame {
			flags |= HeaderFlags::TWO_SLOT_FRAME;
		}

		let mut out = MAGIC.to_vec();

		out.push(self.version.format());
		write_uleb128(&mut out, flags);

		if !self.stripped {
			let name = b"=test";

			write_uleb128(&mut out, name.len() as u32);
			out.extend_from_slice(name);
		}

		root.write(&mut out, self.stripped);
		out.push(0);

		out
	}
}
