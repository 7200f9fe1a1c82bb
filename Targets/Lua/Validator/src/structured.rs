use alloc::{format, string::String, vec::Vec};
use lua_tree::{
	expression::Expression,
	function::{Function, UpvalueSource},
	slot::SlotRef,
	statement::{Sequence, Statement},
};
use set::Set;

/// Tracks the variables in scope while walking a function in order.
struct Scope<'function> {
	function: &'function Function<Sequence>,
	declared: Set,
	stack: Vec<u32>,
	loops: usize,
}

impl<'function> Scope<'function> {
	fn new(function: &'function Function<Sequence>) -> Self {
		Self {
			function,
			declared: Set::new(),
			stack: Vec::new(),
			loops: 0,
		}
	}

	fn name(&self, slot: SlotRef) -> String {
		match self.function.slots.get(slot).and_then(|web| web.name.as_deref()) {
			Some(name) => String::from(name),
			None => format!("slot {}", slot.index),
		}
	}

	fn declare(&mut self, slot: SlotRef) {
		let web = slot.web as usize;

		if slot.is_resolved() && !self.declared.grow_insert(web) {
			self.stack.push(slot.web);
		}
	}

	fn check_slot(&self, slot: SlotRef) -> Result<(), String> {
		if slot.is_resolved() && self.declared.contains(slot.web as usize) {
			Ok(())
		} else {
			Err(format!("{} is used without a declaration", self.name(slot)))
		}
	}

	fn check_closure(&self, child: u16) -> Result<(), String> {
		let Some(child) = self.function.children.get(usize::from(child)) else {
			return Err(format!("closure names missing child {child}"));
		};

		for upvalue in &child.upvalues {
			if let (UpvalueSource::Local(index), Some(web)) = (upvalue.source, upvalue.link) {
				self.check_slot(SlotRef {
					index,
					web,
					variable: None,
				})?;
			}
		}

		Ok(())
	}

	fn check_expression(&self, expression: &Expression) -> Result<(), String> {
		let mut result = Ok(());

		expression.for_each(&mut |expression| {
			if result.is_err() {
				return;
			}

			result = match expression {
				Expression::Slot(slot) => self.check_slot(*slot),
				Expression::Function(function) => self.check_closure(function.child),
				_ => Ok(()),
			};
		});

		result
	}

	fn check_all<'a, I>(&self, expressions: I) -> Result<(), String>
	where
		I: IntoIterator<Item = &'a Expression>,
	{
		expressions
			.into_iter()
			.try_for_each(|expression| self.check_expression(expression))
	}

	/// Checks `sequence` in a scope of its own, declaring `variables` first.
	fn check_block(&mut self, sequence: &Sequence, variables: &[SlotRef]) -> Result<(), String> {
		let mark = self.stack.len();

		variables.iter().for_each(|&variable| self.declare(variable));

		let result = sequence
			.list
			.iter()
			.try_for_each(|statement| self.check_statement(statement));

		self.leave(mark);

		result
	}

	fn leave(&mut self, mark: usize) {
		for web in self.stack.drain(mark..) {
			self.declared.remove(web as usize);
		}
	}

	fn check_loop(&mut self, sequence: &Sequence, variables: &[SlotRef]) -> Result<(), String> {
		self.loops += 1;

		let result = self.check_block(sequence, variables);

		self.loops -= 1;

		result
	}

	fn check_statement(&mut self, statement: &Statement) -> Result<(), String> {
		match statement {
			Statement::Assign(assign) => {
				self.check_all(&assign.sources)?;
				self.check_all(&assign.destinations)
			}
			Statement::Local(local) => {
				self.check_all(&local.values)?;

				local.names.iter().for_each(|&name| self.declare(name));

				Ok(())
			}
			Statement::LocalFunction(local) => {
				self.declare(local.name);
				self.check_closure(local.function.child)
			}
			Statement::Call(call) => self.check_expression(call),
			Statement::Return(data) => self.check_all(&data.values),
			Statement::Break if self.loops == 0 => Err(String::from("break outside of a loop")),
			Statement::Break | Statement::Error(_) => Ok(()),
			Statement::If(data) => {
				self.check_expression(&data.condition)?;
				self.check_block(&data.then, &[])?;

				for else_if in &data.else_ifs {
					self.check_expression(&else_if.condition)?;
					self.check_block(&else_if.code, &[])?;
				}

				data.otherwise
					.as_ref()
					.map_or(Ok(()), |otherwise| self.check_block(otherwise, &[]))
			}
			Statement::While(data) => {
				self.check_expression(&data.condition)?;
				self.check_loop(&data.code, &[])
			}
			Statement::RepeatUntil(data) => {
				// The condition sees the locals of the body.
				let mark = self.stack.len();

				self.loops += 1;

				let result = data
					.code
					.list
					.iter()
					.try_for_each(|statement| self.check_statement(statement))
					.and_then(|()| self.check_expression(&data.condition));

				self.loops -= 1;
				self.leave(mark);

				result
			}
			Statement::NumericFor(data) => {
				self.check_all([&data.start, &data.limit, &data.step])?;
				self.check_loop(&data.code, core::slice::from_ref(&data.variable))
			}
			Statement::GenericFor(data) => {
				self.check_all(&data.iterators)?;
				self.check_loop(&data.code, &data.variables)
			}
			Statement::SetList(set_list) => {
				self.check_expression(&set_list.table)?;
				self.check_expression(&set_list.values)
			}
			Statement::Do(sequence) => self.check_block(sequence, &[]),
		}
	}
}

/// Checks scoping and `break` placement of one function, not its children.
pub fn check_function(function: &Function<Sequence>) -> Result<(), String> {
	let mut scope = Scope::new(function);

	scope.check_block(&function.body, &function.parameters)
}
