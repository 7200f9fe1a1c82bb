use alloc::{boxed::Box, vec::Vec};
use control_flow_graph::{Block, GenericLoop, NumericLoop, Warp};
use lua_tree::{
	expression::{BinaryOperator, Call, Constant, Expression, UnaryOperator},
	statement::{SetList, Statement},
};
use luajit_reader::{instruction::Instruction, opcode::Operation};

use crate::{
	error::BuildError,
	layout::{Layout, is_iterator_jump, is_test},
	operands::Operands,
};

/// The decoded instruction stream of one prototype.
pub struct Code<'data> {
	pub operations: Vec<Operation>,
	pub instructions: &'data [Instruction],
	pub operands: Operands<'data>,
	pub layout: Layout,
}

impl Code<'_> {
	fn jump_target(&self, pc: usize) -> Result<usize, BuildError> {
		self.instructions[pc]
			.jump_target(pc, self.instructions.len())
			.ok_or(BuildError::BadJump { pc })
	}

	fn jump_block(&self, pc: usize) -> Result<u16, BuildError> {
		self.layout.block_at(self.jump_target(pc)?)
	}
}

#[derive(Clone, Copy)]
enum Form {
	VariableNumber,
	NumberVariable,
	VariableVariable,
}

const fn arithmetic(operation: Operation) -> Option<(BinaryOperator, Form)> {
	let result = match operation {
		Operation::AddVN => (BinaryOperator::Add, Form::VariableNumber),
		Operation::SubVN => (BinaryOperator::Sub, Form::VariableNumber),
		Operation::MulVN => (BinaryOperator::Mul, Form::VariableNumber),
		Operation::DivVN => (BinaryOperator::Div, Form::VariableNumber),
		Operation::ModVN => (BinaryOperator::Mod, Form::VariableNumber),
		Operation::AddNV => (BinaryOperator::Add, Form::NumberVariable),
		Operation::SubNV => (BinaryOperator::Sub, Form::NumberVariable),
		Operation::MulNV => (BinaryOperator::Mul, Form::NumberVariable),
		Operation::DivNV => (BinaryOperator::Div, Form::NumberVariable),
		Operation::ModNV => (BinaryOperator::Mod, Form::NumberVariable),
		Operation::AddVV => (BinaryOperator::Add, Form::VariableVariable),
		Operation::SubVV => (BinaryOperator::Sub, Form::VariableVariable),
		Operation::MulVV => (BinaryOperator::Mul, Form::VariableVariable),
		Operation::DivVV => (BinaryOperator::Div, Form::VariableVariable),
		Operation::ModVV => (BinaryOperator::Mod, Form::VariableVariable),
		Operation::Pow => (BinaryOperator::Pow, Form::VariableVariable),
		_ => return None,
	};

	Some(result)
}

const fn unsupported(instruction: Instruction, pc: usize) -> BuildError {
	BuildError::UnsupportedOpcode {
		opcode: instruction.opcode(),
		pc,
	}
}

const fn consumes_results(operation: Operation) -> bool {
	matches!(
		operation,
		Operation::CallM | Operation::CallMT | Operation::RetM | Operation::TSetM
	)
}

/// Decodes the instructions of one block into statements and a warp.
pub struct BlockBuilder {
	statements: Vec<Statement>,
	results: Option<(Expression, usize)>,
	close: Option<u16>,
	has_loop_hint: bool,
}

impl BlockBuilder {
	pub const fn new() -> Self {
		Self {
			statements: Vec::new(),
			results: None,
			close: None,
			has_loop_hint: false,
		}
	}

	fn take_results(&mut self, pc: usize) -> Result<Expression, BuildError> {
		self.results
			.take()
			.map(|(expression, _)| expression)
			.ok_or(BuildError::MissingResults { pc })
	}

	fn add_assign(&mut self, destination: Expression, source: Expression) {
		self.statements.push(Statement::single(destination, source));
	}

	/// Places a value producing `count - 1` results, or variable results
	/// when `count` is 0, into the registers starting at `base`.
	fn add_results(
		&mut self,
		code: &Code,
		pc: usize,
		base: u16,
		count: u16,
		mut expression: Expression,
	) {
		match count {
			0 => {
				expression.set_multiple(true);

				self.results = Some((expression, pc));
			}
			1 => {
				if !matches!(expression, Expression::Vararg { .. }) {
					self.statements.push(Statement::Call(expression));
				}
			}
			2 => {
				expression.set_multiple(false);

				let destination = Expression::Slot(code.operands.write(base, pc));

				self.add_assign(destination, expression);
			}
			_ => {
				expression.set_multiple(true);

				let destinations = code.operands.writes(base..base + count - 1, pc);

				self.statements
					.push(Statement::assign(destinations, alloc::vec![expression]));
			}
		}
	}

	fn handle_test(
		&mut self,
		code: &Code,
		blocks: &mut [Block],
		pc: usize,
	) -> Result<Warp, BuildError> {
		let operation = code.operations[pc];
		let instruction = code.instructions[pc];
		let operands = &code.operands;
		let a = u16::from(instruction.a());
		let d = instruction.d();

		let compare = |operator, rhs| Expression::binary(operator, operands.read(a, pc), rhs);

		let condition = match operation {
			Operation::IsLt => compare(BinaryOperator::Lt, operands.read(d, pc)),
			Operation::IsGe => compare(BinaryOperator::Ge, operands.read(d, pc)),
			Operation::IsLe => compare(BinaryOperator::Le, operands.read(d, pc)),
			Operation::IsGt => compare(BinaryOperator::Gt, operands.read(d, pc)),
			Operation::IsEqV => compare(BinaryOperator::Eq, operands.read(d, pc)),
			Operation::IsNeV => compare(BinaryOperator::Ne, operands.read(d, pc)),
			Operation::IsEqS => compare(BinaryOperator::Eq, operands.string(d, pc)?),
			Operation::IsNeS => compare(BinaryOperator::Ne, operands.string(d, pc)?),
			Operation::IsEqN => compare(BinaryOperator::Eq, operands.number(d, pc)?),
			Operation::IsNeN => compare(BinaryOperator::Ne, operands.number(d, pc)?),
			Operation::IsEqP => compare(BinaryOperator::Eq, Operands::primitive(d, pc)?),
			Operation::IsNeP => compare(BinaryOperator::Ne, Operands::primitive(d, pc)?),
			Operation::IsT | Operation::IsTC => operands.read(d, pc),
			Operation::IsF | Operation::IsFC => {
				Expression::unary(UnaryOperator::Not, operands.read(d, pc))
			}
			_ => return Err(unsupported(instruction, pc)),
		};

		let mut taken = code.jump_block(pc + 1)?;
		let fallthrough = code.layout.block_at(pc + 2)?;

		if matches!(operation, Operation::IsTC | Operation::IsFC) {
			let copy = code.layout.copies[pc];
			let block = &mut blocks[usize::from(copy)];
			let destination = Expression::Slot(operands.write(a, pc));

			block
				.statements
				.push(Statement::single(destination, operands.read(d, pc)));

			block.warp = Warp::Jump(taken);
			taken = copy;
		}

		Ok(Warp::branch(condition, taken, fallthrough))
	}

	fn handle_iterator(&self, code: &Code, pc: usize, target: usize) -> Result<Warp, BuildError> {
		let control = code.instructions[target];
		let base = u16::from(control.a());
		let count = u16::from(control.b());

		if base < 3 || count < 2 {
			return Err(BuildError::BadOperand { pc: target });
		}

		let variables = (base..base + count - 1)
			.map(|slot| code.operands.write(slot, pc))
			.collect();

		let iterators = code.operands.reads(base - 3..base, pc);

		Ok(Warp::GenericFor(Box::new(GenericLoop {
			variables,
			iterators,
			body: code.layout.block_at(pc + 1)?,
			exit: code.layout.block_at(target + 2)?,
		})))
	}

	fn handle_numeric(&self, code: &Code, pc: usize) -> Result<Warp, BuildError> {
		let base = u16::from(code.instructions[pc].a());
		let operands = &code.operands;

		Ok(Warp::NumericFor(Box::new(NumericLoop {
			variable: operands.write(base + 3, pc),
			start: operands.read(base, pc),
			limit: operands.read(base + 1, pc),
			step: operands.read(base + 2, pc),
			body: code.layout.block_at(pc + 1)?,
			exit: code.jump_block(pc)?,
		})))
	}

	fn handle_call(
		&mut self,
		code: &Code,
		pc: usize,
		fixed: u16,
		variable: bool,
	) -> Result<Call, BuildError> {
		let base = u16::from(code.instructions[pc].a());
		let first = base + code.operands.frame_offset();
		let mut arguments = code.operands.reads(first..first + fixed, pc);

		if variable {
			arguments.push(self.take_results(pc)?);
		}

		Ok(Call {
			function: code.operands.read(base, pc),
			arguments,
			multiple: true,
		})
	}

	fn handle_return(&mut self, code: &Code, pc: usize) -> Result<(), BuildError> {
		let operation = code.operations[pc];
		let instruction = code.instructions[pc];
		let a = u16::from(instruction.a());
		let d = instruction.d();
		let operands = &code.operands;

		let values = match operation {
			Operation::Ret0 => Vec::new(),
			Operation::Ret1 => alloc::vec![operands.read(a, pc)],
			Operation::Ret => operands.reads(a..a + d.saturating_sub(1), pc),
			Operation::RetM => {
				let mut values = operands.reads(a..a + d, pc);

				values.push(self.take_results(pc)?);
				values
			}
			Operation::CallT | Operation::CallMT => {
				let variable = operation == Operation::CallMT;
				let fixed = if variable { d } else { d.saturating_sub(1) };
				let call = self.handle_call(code, pc, fixed, variable)?;

				alloc::vec![Expression::Call(Box::new(call))]
			}
			_ => return Err(unsupported(instruction, pc)),
		};

		self.statements.push(Statement::returns(values));

		Ok(())
	}

	fn handle_table_store(&mut self, code: &Code, pc: usize) -> Result<(), BuildError> {
		let operation = code.operations[pc];
		let instruction = code.instructions[pc];
		let operands = &code.operands;
		let a = u16::from(instruction.a());
		let b = u16::from(instruction.b());
		let c = u16::from(instruction.c());

		let key = match operation {
			Operation::TSetV | Operation::TSetR => operands.read(c, pc),
			Operation::TSetS => operands.string(c, pc)?,
			Operation::TSetB => Expression::Constant(Constant::Integer(c.into())),
			_ => return Err(unsupported(instruction, pc)),
		};

		let destination = Expression::index(operands.read(b, pc), key);

		self.add_assign(destination, operands.read(a, pc));

		Ok(())
	}

	/// Decodes an instruction that neither ends the block nor branches.
	fn handle_plain(&mut self, code: &Code, pc: usize) -> Result<(), BuildError> {
		let operation = code.operations[pc];
		let instruction = code.instructions[pc];
		let operands = &code.operands;
		let a = u16::from(instruction.a());
		let b = u16::from(instruction.b());
		let c = u16::from(instruction.c());
		let d = instruction.d();

		if let Some((operator, form)) = arithmetic(operation) {
			let (lhs, rhs) = match form {
				Form::VariableNumber => (operands.read(b, pc), operands.number(c, pc)?),
				Form::NumberVariable => (operands.number(c, pc)?, operands.read(b, pc)),
				Form::VariableVariable => (operands.read(b, pc), operands.read(c, pc)),
			};

			let destination = Expression::Slot(operands.write(a, pc));

			self.add_assign(destination, Expression::binary(operator, lhs, rhs));

			return Ok(());
		}

		let source = match operation {
			Operation::IsType | Operation::IsNum => return Ok(()),
			Operation::Mov => operands.read(d, pc),
			Operation::Not => Expression::unary(UnaryOperator::Not, operands.read(d, pc)),
			Operation::Unm => Expression::unary(UnaryOperator::Negate, operands.read(d, pc)),
			Operation::Len => Expression::unary(UnaryOperator::Length, operands.read(d, pc)),
			Operation::Cat => {
				if c < b {
					return Err(BuildError::BadOperand { pc });
				}

				operands
					.reads(b..c + 1, pc)
					.into_iter()
					.rev()
					.reduce(|rhs, lhs| Expression::binary(BinaryOperator::Concat, lhs, rhs))
					.ok_or(BuildError::BadOperand { pc })?
			}
			Operation::KStr => operands.string(d, pc)?,
			Operation::KCdata => operands.cdata(d, pc)?,
			Operation::KShort => {
				Expression::Constant(Constant::Integer(i32::from(d as i16)))
			}
			Operation::KNum => operands.number(d, pc)?,
			Operation::KPri => Operands::primitive(d, pc)?,
			Operation::KNil => {
				if d < a {
					return Err(BuildError::BadOperand { pc });
				}

				let destinations = operands.writes(a..d + 1, pc);

				self.statements
					.push(Statement::assign(destinations, alloc::vec![Expression::NIL]));

				return Ok(());
			}
			Operation::UGet => Expression::Upvalue(d),
			Operation::USetV | Operation::USetS | Operation::USetN | Operation::USetP => {
				let source = match operation {
					Operation::USetV => operands.read(d, pc),
					Operation::USetS => operands.string(d, pc)?,
					Operation::USetN => operands.number(d, pc)?,
					_ => Operands::primitive(d, pc)?,
				};

				self.add_assign(Expression::Upvalue(a), source);

				return Ok(());
			}
			Operation::FNew => operands.function(d, pc)?,
			Operation::TNew => Expression::Table(Box::default()),
			Operation::TDup => operands.template(d, pc)?,
			Operation::GGet => Expression::Global(operands.name(d, pc)?),
			Operation::GSet => {
				let destination = Expression::Global(operands.name(d, pc)?);

				self.add_assign(destination, operands.read(a, pc));

				return Ok(());
			}
			Operation::TGetV | Operation::TGetR => {
				Expression::index(operands.read(b, pc), operands.read(c, pc))
			}
			Operation::TGetS => Expression::index(operands.read(b, pc), operands.string(c, pc)?),
			Operation::TGetB => Expression::index(
				operands.read(b, pc),
				Expression::Constant(Constant::Integer(c.into())),
			),
			Operation::TSetV | Operation::TSetS | Operation::TSetB | Operation::TSetR => {
				return self.handle_table_store(code, pc);
			}
			Operation::TSetM => {
				let table = a.checked_sub(1).ok_or(BuildError::BadOperand { pc })?;
				let start = operands.raw_number(d, pc)?.low_bits() as i32;
				let values = self.take_results(pc)?;

				self.statements.push(Statement::SetList(Box::new(SetList {
					table: operands.read(table, pc),
					start: start.into(),
					values,
				})));

				return Ok(());
			}
			Operation::Call | Operation::CallM => {
				let variable = operation == Operation::CallM;
				let fixed = if variable { c } else { c.saturating_sub(1) };
				let call = self.handle_call(code, pc, fixed, variable)?;

				self.add_results(code, pc, a, b, Expression::Call(Box::new(call)));

				return Ok(());
			}
			Operation::VArg => {
				self.add_results(code, pc, a, b, Expression::Vararg { multiple: true });

				return Ok(());
			}
			_ => return Err(unsupported(instruction, pc)),
		};

		let destination = Expression::Slot(operands.write(a, pc));

		self.add_assign(destination, source);

		Ok(())
	}

	/// Decodes the instructions in `start..end` into the block `id`.
	pub fn run(
		&mut self,
		code: &Code,
		blocks: &mut [Block],
		id: u16,
		start: usize,
		end: usize,
	) -> Result<(), BuildError> {
		self.statements.clear();
		self.results = None;
		self.close = None;
		self.has_loop_hint = false;

		let mut warp = None;
		let mut pc = start;

		while pc < end {
			let operation = code.operations[pc];

			if let Some((_, producer)) = &self.results {
				if !consumes_results(operation) {
					return Err(BuildError::DanglingResults { pc: *producer });
				}
			}

			match operation {
				operation if is_test(operation) => {
					warp = Some(self.handle_test(code, blocks, pc)?);

					// The paired jump is part of the test.
					pc += 1;
				}
				Operation::Jmp | Operation::IsNext => {
					let target = code.jump_target(pc)?;

					warp = Some(if is_iterator_jump(&code.operations, target) {
						self.handle_iterator(code, pc, target)?
					} else {
						Warp::Jump(code.layout.block_at(target)?)
					});
				}
				Operation::IterC | Operation::IterN => {}
				Operation::IterL | Operation::ForL => warp = Some(Warp::Jump(code.jump_block(pc)?)),
				Operation::ForI => warp = Some(self.handle_numeric(code, pc)?),
				Operation::Loop => self.has_loop_hint = true,
				Operation::UClo => {
					self.close = Some(u16::from(code.instructions[pc].a()));

					warp = Some(Warp::Jump(code.jump_block(pc)?));
				}
				Operation::Ret
				| Operation::Ret0
				| Operation::Ret1
				| Operation::RetM
				| Operation::CallT
				| Operation::CallMT => {
					self.handle_return(code, pc)?;

					warp = Some(Warp::End);
				}
				_ => self.handle_plain(code, pc)?,
			}

			pc += 1;
		}

		if let Some((_, producer)) = self.results.take() {
			return Err(BuildError::DanglingResults { pc: producer });
		}

		let warp = match warp {
			Some(warp) => warp,
			None if end < code.instructions.len() => Warp::Jump(code.layout.block_at(end)?),
			None => Warp::End,
		};

		let block = &mut blocks[usize::from(id)];

		block.statements.append(&mut self.statements);
		block.warp = warp;
		block.close = self.close;
		block.has_loop_hint = self.has_loop_hint;

		Ok(())
	}
}
