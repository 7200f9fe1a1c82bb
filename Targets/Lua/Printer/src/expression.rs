use std::io::{Result, Write};

use lua_tree::{
	expression::{
		Binary, Call, Constant, Expression, FunctionLiteral, Index, Method, TableConstructor,
		Unary, UnaryOperator, is_identifier,
	},
	function::Function,
	slot::SlotRef,
	statement::Sequence,
};

use crate::{LuaPrinter, print::Print};

const PRIMARY: u8 = u8::MAX;

pub fn fmt_delimited<T, I>(items: I, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()>
where
	T: Print,
	I: IntoIterator<Item = T>,
{
	let mut iter = items.into_iter();

	if let Some(first) = iter.next() {
		first.print(printer, out)?;

		iter.try_for_each(|item| {
			write!(out, ", ")?;
			item.print(printer, out)
		})
	} else {
		Ok(())
	}
}

/// Whether a call or vararg must be wrapped to keep only its first value.
fn is_truncated(expression: &Expression) -> bool {
	matches!(
		expression,
		Expression::Call(_) | Expression::Method(_) | Expression::Vararg { .. }
	) && !expression.is_multiple()
}

/// Writes an expression list. When `expands` is set, the last item would
/// otherwise spread into every remaining value.
pub fn fmt_list(
	items: &[Expression],
	expands: bool,
	printer: &mut LuaPrinter<'_>,
	out: &mut dyn Write,
) -> Result<()> {
	let Some((last, rest)) = items.split_last() else {
		return Ok(());
	};

	for item in rest {
		item.print(printer, out)?;

		write!(out, ", ")?;
	}

	print_value(last, expands, printer, out)
}

fn print_value(
	expression: &Expression,
	expands: bool,
	printer: &mut LuaPrinter<'_>,
	out: &mut dyn Write,
) -> Result<()> {
	if expands && is_truncated(expression) {
		print_wrapped(expression, printer, out)
	} else {
		expression.print(printer, out)
	}
}

fn print_wrapped(expression: &Expression, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
	write!(out, "(")?;

	expression.print(printer, out)?;

	write!(out, ")")
}

fn is_negative(constant: &Constant) -> bool {
	match *constant {
		Constant::Integer(value) => value < 0,
		Constant::Number(value) => !value.is_nan() && value.is_sign_negative(),
		Constant::Signed(value) => value < 0,
		Constant::Complex(real, imaginary) => real == 0.0 && imaginary.is_sign_negative(),
		_ => false,
	}
}

fn precedence(expression: &Expression) -> u8 {
	match expression {
		Expression::Binary(binary) => binary.operator.precedence(),
		Expression::Unary(_) => UnaryOperator::PRECEDENCE,
		Expression::Constant(constant) if is_negative(constant) => UnaryOperator::PRECEDENCE,
		_ => PRIMARY,
	}
}

/// Whether the expression can be called or indexed without parentheses.
const fn is_prefix(expression: &Expression) -> bool {
	matches!(
		expression,
		Expression::Slot(_)
			| Expression::Upvalue(_)
			| Expression::Global(_)
			| Expression::Index(_)
			| Expression::Call(_)
			| Expression::Method(_)
	)
}

/// Whether the printed form of the expression opens with a parenthesis.
pub fn starts_with_parenthesis(expression: &Expression) -> bool {
	match expression {
		Expression::Call(call) => starts_with_parenthesis(&call.function),
		Expression::Method(method) => starts_with_parenthesis(&method.object),
		Expression::Index(index) => starts_with_parenthesis(&index.table),
		expression => !is_prefix(expression),
	}
}

fn print_prefix(expression: &Expression, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
	if is_prefix(expression) {
		expression.print(printer, out)
	} else {
		print_wrapped(expression, printer, out)
	}
}

fn print_operand(
	expression: &Expression,
	wrap: bool,
	printer: &mut LuaPrinter<'_>,
	out: &mut dyn Write,
) -> Result<()> {
	if wrap {
		print_wrapped(expression, printer, out)
	} else {
		expression.print(printer, out)
	}
}

fn write_number(value: f64, out: &mut dyn Write) -> Result<()> {
	if value.is_nan() {
		write!(out, "(0 / 0)")
	} else if value.is_infinite() {
		if value.is_sign_negative() {
			write!(out, "-math.huge")
		} else {
			write!(out, "math.huge")
		}
	} else if value != 0.0 && !(1e-5..1e16).contains(&value.abs()) {
		write!(out, "{value:e}")
	} else {
		write!(out, "{value}")
	}
}

pub fn write_string(bytes: &[u8], out: &mut dyn Write) -> Result<()> {
	write!(out, "\"")?;

	for chunk in bytes.utf8_chunks() {
		for character in chunk.valid().chars() {
			match character {
				'"' => write!(out, "\\\"")?,
				'\\' => write!(out, "\\\\")?,
				'\n' => write!(out, "\\n")?,
				'\r' => write!(out, "\\r")?,
				'\t' => write!(out, "\\t")?,
				'\x07' => write!(out, "\\a")?,
				'\x08' => write!(out, "\\b")?,
				'\x0B' => write!(out, "\\v")?,
				'\x0C' => write!(out, "\\f")?,
				character if character.is_ascii_control() => {
					write!(out, "\\{:03}", u32::from(character))?;
				}
				character => write!(out, "{character}")?,
			}
		}

		for byte in chunk.invalid() {
			write!(out, "\\{byte:03}")?;
		}
	}

	write!(out, "\"")
}

fn write_name(name: &[u8], out: &mut dyn Write) -> Result<()> {
	out.write_all(name)
}

impl Print for Constant {
	fn print(&self, _printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		match self {
			Self::Nil => write!(out, "nil"),
			Self::Boolean(value) => write!(out, "{value}"),
			Self::Integer(value) => write!(out, "{value}"),
			Self::Number(value) => write_number(*value, out),
			Self::String(bytes) => write_string(bytes, out),
			Self::Signed(value) => write!(out, "{value}LL"),
			Self::Unsigned(value) => write!(out, "{value}ULL"),
			Self::Complex(real, imaginary) => {
				if *real != 0.0 {
					write!(out, "(")?;
					write_number(*real, out)?;
					write!(out, " + ")?;
				}

				write_number(*imaginary, out)?;
				write!(out, "i")?;

				if *real == 0.0 {
					Ok(())
				} else {
					write!(out, ")")
				}
			}
		}
	}
}

impl Print for SlotRef {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		match printer.slot_name(*self) {
			Some(name) => write!(out, "{name}"),
			None => write!(out, "slot{}", self.index),
		}
	}
}

impl Print for Index {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { table, key } = self;

		print_prefix(table, printer, out)?;

		match key {
			Expression::Constant(Constant::String(name)) if is_identifier(name) => {
				write!(out, ".")?;
				write_name(name, out)
			}
			key => {
				write!(out, "[")?;
				key.print(printer, out)?;
				write!(out, "]")
			}
		}
	}
}

impl Print for Call {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			function,
			arguments,
			..
		} = self;

		print_prefix(function, printer, out)?;

		write!(out, "(")?;
		fmt_list(arguments, true, printer, out)?;
		write!(out, ")")
	}
}

impl Print for Method {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			object,
			name,
			arguments,
			..
		} = self;

		print_prefix(object, printer, out)?;

		write!(out, ":")?;
		write_name(name, out)?;

		write!(out, "(")?;
		fmt_list(arguments, true, printer, out)?;
		write!(out, ")")
	}
}

impl Print for Binary {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { operator, lhs, rhs } = self;
		let own = operator.precedence();
		let is_right = operator.is_right_associative();

		let lhs_precedence = precedence(lhs);
		let wrap_lhs = lhs_precedence < own || (lhs_precedence == own && is_right);

		let wrap_rhs = match rhs {
			Expression::Binary(inner) if inner.operator == *operator && operator.is_associative() => false,
			rhs => {
				let rhs_precedence = precedence(rhs);

				rhs_precedence < own || (rhs_precedence == own && !is_right)
			}
		};

		print_operand(lhs, wrap_lhs, printer, out)?;

		write!(out, " {} ", operator.symbol())?;

		print_operand(rhs, wrap_rhs, printer, out)
	}
}

impl Print for Unary {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { operator, source } = self;

		// `--` would open a comment.
		let is_spaced = *operator == UnaryOperator::Negate
			&& match source {
				Expression::Unary(inner) => inner.operator == UnaryOperator::Negate,
				Expression::Constant(constant) => is_negative(constant),
				_ => false,
			};

		write!(out, "{}", operator.symbol())?;

		if is_spaced {
			write!(out, " ")?;
		}

		print_operand(source, precedence(source) < UnaryOperator::PRECEDENCE, printer, out)
	}
}

impl Print for TableConstructor {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { entries, tail } = self;

		if entries.is_empty() && tail.is_none() {
			return write!(out, "{{}}");
		}

		write!(out, "{{ ")?;

		let mut next = 1;

		for (position, entry) in entries.iter().enumerate() {
			if position != 0 {
				write!(out, ", ")?;
			}

			match &entry.key {
				Expression::Constant(Constant::Integer(index)) if i64::from(*index) == next => {
					let is_last = tail.is_none() && position + 1 == entries.len();

					next += 1;

					print_value(&entry.value, is_last, printer, out)?;
				}
				Expression::Constant(Constant::String(name)) if is_identifier(name) => {
					write_name(name, out)?;
					write!(out, " = ")?;

					entry.value.print(printer, out)?;
				}
				key => {
					write!(out, "[")?;
					key.print(printer, out)?;
					write!(out, "] = ")?;

					entry.value.print(printer, out)?;
				}
			}
		}

		if let Some(tail) = tail {
			if !entries.is_empty() {
				write!(out, ", ")?;
			}

			tail.print(printer, out)?;
		}

		write!(out, " }}")
	}
}

/// Writes the parameter list and body of `function`, closing with `end`.
/// When `is_method` is set the first parameter is left implicit.
pub fn print_function_body(
	function: &Function<Sequence>,
	is_method: bool,
	printer: &mut LuaPrinter<'_>,
	out: &mut dyn Write,
) -> Result<()> {
	let skip = usize::from(is_method);
	let parameters = function.parameters.get(skip..).unwrap_or_default();

	write!(out, "(")?;

	fmt_delimited(parameters, printer, out)?;

	if function.is_variadic {
		if !parameters.is_empty() {
			write!(out, ", ")?;
		}

		write!(out, "...")?;
	}

	writeln!(out, ")")?;

	printer.indent();
	function.body.print(printer, out)?;
	printer.outdent();

	printer.tab(out)?;
	write!(out, "end")
}

impl Print for FunctionLiteral {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Some(child) = printer.child(*self) else {
			return write!(out, "nil --[[ missing function {} ]]", self.child);
		};

		write!(out, "function")?;

		printer.enter(child);

		let result = print_function_body(child, false, printer, out);

		printer.leave();

		result
	}
}

impl Print for Expression {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		match self {
			Self::Constant(constant) => constant.print(printer, out),
			Self::Slot(slot) => slot.print(printer, out),
			Self::Upvalue(index) => match printer.upvalue_name(*index) {
				Some(name) => write!(out, "{name}"),
				None => write!(out, "upvalue{index}"),
			},
			Self::Global(name) => {
				if is_identifier(name) {
					write_name(name, out)
				} else {
					write!(out, "_G[")?;
					write_string(name, out)?;
					write!(out, "]")
				}
			}
			Self::Index(index) => index.print(printer, out),
			Self::Call(call) => call.print(printer, out),
			Self::Method(method) => method.print(printer, out),
			Self::Binary(binary) => binary.print(printer, out),
			Self::Unary(unary) => unary.print(printer, out),
			Self::Table(table) => table.print(printer, out),
			Self::Function(literal) => literal.print(printer, out),
			Self::Vararg { .. } => write!(out, "..."),
		}
	}
}
