use std::io::{Result, Write};

use lua_tree::{
	expression::{Constant, Expression, is_identifier},
	function::Function,
	statement::{
		Assign, GenericFor, If, LocalDeclaration, LocalFunction, NumericFor, RepeatUntil, Return,
		Sequence, SetList, Statement, While,
	},
};

use crate::{
	LuaPrinter,
	expression::{fmt_delimited, fmt_list, print_function_body, starts_with_parenthesis},
	print::Print,
};

fn print_block(sequence: &Sequence, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
	printer.indent();

	let result = sequence.print(printer, out);

	printer.outdent();

	result
}

/// Whether `expression` can follow `function` in a declaration.
fn is_name_path(expression: &Expression) -> bool {
	match expression {
		Expression::Slot(_) | Expression::Upvalue(_) => true,
		Expression::Global(name) => is_identifier(name),
		Expression::Index(index) => {
			matches!(&index.key, Expression::Constant(Constant::String(name)) if is_identifier(name))
				&& is_name_path(&index.table)
		}
		_ => false,
	}
}

fn is_self(function: &Function<Sequence>) -> bool {
	function
		.parameters
		.first()
		.and_then(|&parameter| function.slots.get(parameter))
		.and_then(|web| web.name.as_deref())
		== Some("self")
}

fn print_declaration<'tree>(
	destination: &Expression,
	child: &'tree Function<Sequence>,
	printer: &mut LuaPrinter<'tree>,
	out: &mut dyn Write,
) -> Result<()> {
	printer.tab(out)?;
	write!(out, "function ")?;

	let method = match destination {
		Expression::Index(index) if is_self(child) => match &index.key {
			Expression::Constant(Constant::String(name)) => Some((&index.table, name)),
			_ => None,
		},
		_ => None,
	};

	if let Some((table, name)) = method {
		table.print(printer, out)?;

		write!(out, ":")?;
		out.write_all(name)?;
	} else {
		destination.print(printer, out)?;
	}

	printer.enter(child);

	let result = print_function_body(child, method.is_some(), printer, out);

	printer.leave();

	result?;

	writeln!(out)
}

impl Print for Assign {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			destinations,
			sources,
		} = self;

		if let ([destination], [Expression::Function(literal)]) = (&destinations[..], &sources[..])
			&& is_name_path(destination)
			&& let Some(child) = printer.child(*literal)
		{
			return print_declaration(destination, child, printer, out);
		}

		printer.begin(out)?;

		fmt_delimited(destinations, printer, out)?;

		write!(out, " = ")?;

		fmt_list(sources, destinations.len() > sources.len(), printer, out)?;

		writeln!(out)
	}
}

impl Print for LocalDeclaration {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { names, values } = self;

		printer.tab(out)?;
		write!(out, "local ")?;

		fmt_delimited(names, printer, out)?;

		if !values.is_empty() {
			write!(out, " = ")?;

			fmt_list(values, names.len() > values.len(), printer, out)?;
		}

		writeln!(out)
	}
}

impl Print for LocalFunction {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { name, function } = self;

		printer.tab(out)?;
		write!(out, "local function ")?;

		name.print(printer, out)?;

		let Some(child) = printer.child(*function) else {
			return writeln!(out, "() end --[[ missing function {} ]]", function.child);
		};

		printer.enter(child);

		let result = print_function_body(child, false, printer, out);

		printer.leave();

		result?;

		writeln!(out)
	}
}

fn write_return(data: &Return, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
	write!(out, "return")?;

	if !data.values.is_empty() {
		write!(out, " ")?;

		fmt_list(&data.values, true, printer, out)?;
	}

	Ok(())
}

impl Print for If {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			condition,
			then,
			else_ifs,
			otherwise,
		} = self;

		printer.tab(out)?;
		write!(out, "if ")?;

		condition.print(printer, out)?;

		writeln!(out, " then")?;

		print_block(then, printer, out)?;

		for else_if in else_ifs {
			printer.tab(out)?;
			write!(out, "elseif ")?;

			else_if.condition.print(printer, out)?;

			writeln!(out, " then")?;

			print_block(&else_if.code, printer, out)?;
		}

		if let Some(otherwise) = otherwise {
			printer.tab(out)?;
			writeln!(out, "else")?;

			print_block(otherwise, printer, out)?;
		}

		printer.tab(out)?;
		writeln!(out, "end")
	}
}

impl Print for While {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { condition, code } = self;

		printer.tab(out)?;
		write!(out, "while ")?;

		condition.print(printer, out)?;

		writeln!(out, " do")?;

		print_block(code, printer, out)?;

		printer.tab(out)?;
		writeln!(out, "end")
	}
}

impl Print for RepeatUntil {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self { code, condition } = self;

		printer.tab(out)?;
		writeln!(out, "repeat")?;

		print_block(code, printer, out)?;

		printer.tab(out)?;
		write!(out, "until ")?;

		condition.print(printer, out)?;

		writeln!(out)
	}
}

impl Print for NumericFor {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			variable,
			start,
			limit,
			step,
			code,
		} = self;

		printer.tab(out)?;
		write!(out, "for ")?;

		variable.print(printer, out)?;

		write!(out, " = ")?;

		start.print(printer, out)?;

		write!(out, ", ")?;

		limit.print(printer, out)?;

		if !matches!(step, Expression::Constant(Constant::Integer(1))) {
			write!(out, ", ")?;

			step.print(printer, out)?;
		}

		writeln!(out, " do")?;

		print_block(code, printer, out)?;

		printer.tab(out)?;
		writeln!(out, "end")
	}
}

impl Print for GenericFor {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			variables,
			iterators,
			code,
		} = self;

		printer.tab(out)?;
		write!(out, "for ")?;

		fmt_delimited(variables, printer, out)?;

		write!(out, " in ")?;

		fmt_list(iterators, true, printer, out)?;

		writeln!(out, " do")?;

		print_block(code, printer, out)?;

		printer.tab(out)?;
		writeln!(out, "end")
	}
}

impl Print for SetList {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Self {
			table,
			start,
			values,
		} = self;

		printer.tab(out)?;
		writeln!(out, "do")?;

		printer.indent();
		printer.tab(out)?;
		write!(out, "local list = {{ ")?;

		values.print(printer, out)?;

		writeln!(out, " }}")?;

		printer.tab(out)?;
		writeln!(out, "for index = 1, table.maxn(list) do")?;

		printer.indent();
		printer.tab(out)?;

		table.print(printer, out)?;

		match start - 1 {
			0 => writeln!(out, "[index] = list[index]")?,
			offset => writeln!(out, "[index + {offset}] = list[index]")?,
		}

		printer.outdent();
		printer.tab(out)?;
		writeln!(out, "end")?;

		printer.outdent();
		printer.tab(out)?;
		writeln!(out, "end")
	}
}

fn print_error(detail: &str, printer: &LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
	let mut lines = detail.lines();

	printer.tab(out)?;
	writeln!(out, "-- Decompilation error: {}", lines.next().unwrap_or_default())?;

	lines.try_for_each(|line| {
		printer.tab(out)?;
		writeln!(out, "-- {line}")
	})
}

impl Print for Statement {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		match self {
			Self::Assign(assign) => assign.print(printer, out),
			Self::Local(local) => local.print(printer, out),
			Self::LocalFunction(local) => local.print(printer, out),
			Self::Call(call) => {
				printer.begin(out)?;

				call.print(printer, out)?;

				writeln!(out)
			}
			Self::Return(data) => {
				printer.tab(out)?;

				write_return(data, printer, out)?;

				writeln!(out)
			}
			Self::Break => {
				printer.tab(out)?;
				writeln!(out, "break")
			}
			Self::If(data) => data.print(printer, out),
			Self::While(data) => data.print(printer, out),
			Self::RepeatUntil(data) => data.print(printer, out),
			Self::NumericFor(data) => data.print(printer, out),
			Self::GenericFor(data) => data.print(printer, out),
			Self::SetList(set_list) => set_list.print(printer, out),
			Self::Do(sequence) => {
				printer.tab(out)?;
				writeln!(out, "do")?;

				print_block(sequence, printer, out)?;

				printer.tab(out)?;
				writeln!(out, "end")
			}
			Self::Error(detail) => print_error(detail, printer, out),
		}
	}
}

/// Whether the statement opens with a parenthesis when printed.
fn starts_with_parenthesis_statement(statement: &Statement) -> bool {
	match statement {
		Statement::Call(call) => starts_with_parenthesis(call),
		Statement::Assign(assign) => assign.destinations.first().is_some_and(starts_with_parenthesis),
		_ => false,
	}
}

impl Print for Sequence {
	fn print(&self, printer: &mut LuaPrinter<'_>, out: &mut dyn Write) -> Result<()> {
		let Some((last, rest)) = self.list.split_last() else {
			return Ok(());
		};

		for (position, statement) in rest.iter().enumerate() {
			printer.set_separate(position != 0 && starts_with_parenthesis_statement(statement));

			// Only the last statement of a block may leave it.
			match statement {
				Statement::Return(data) => {
					printer.tab(out)?;
					write!(out, "do ")?;

					write_return(data, printer, out)?;

					writeln!(out, " end")?;
				}
				Statement::Break => {
					printer.tab(out)?;
					writeln!(out, "do break end")?;
				}
				statement => statement.print(printer, out)?,
			}
		}

		printer.set_separate(!rest.is_empty() && starts_with_parenthesis_statement(last));

		last.print(printer, out)
	}
}
