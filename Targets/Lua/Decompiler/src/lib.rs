mod error;

pub mod config;
pub mod fallback;

use std::io::Write;

use control_flow_builder::ControlFlowBuilder;
use control_flow_graph::Graph;
use control_flow_liveness::{DefinitionMarker, LocalMarker};
use control_flow_structurer::Structurer;
use data_flow_eliminator::{TemporaryEliminator, UpvalueEliminator};
use lua_printer::LuaPrinter;
use lua_tree::{
	function::Function,
	statement::{Sequence, Statement},
};
use lua_validator::{InvariantViolation, Validator};
use luajit_reader::{
	Chunk, Parser,
	opcode::{OpcodeTable, Version},
};

pub use self::error::{ConfigError, Error};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
	/// Turn elimination failures and invariant violations into error
	/// markers in the output instead of failing the file.
	pub recover: bool,
}

/// One pipeline instance. The opcode table is chosen when it is made and
/// never changes afterwards.
pub struct Decompiler {
	table: OpcodeTable,
	options: Options,
}

impl Decompiler {
	#[must_use]
	pub const fn new(version: Version, options: Options) -> Self {
		Self {
			table: OpcodeTable::new(version),
			options,
		}
	}

	#[must_use]
	pub const fn table(&self) -> &OpcodeTable {
		&self.table
	}

	#[must_use]
	pub const fn options(&self) -> Options {
		self.options
	}

	/// # Errors
	///
	/// Returns [`Error::MalformedBytecode`] if `data` is not a dump of the
	/// selected version.
	pub fn parse(&self, data: &[u8]) -> Result<Chunk, Error> {
		Parser::new(&self.table).parse(data).map_err(Error::from)
	}

	/// Builds the warped shape of every function in `chunk`.
	///
	/// # Errors
	///
	/// Returns [`Error::Build`] for opcodes missing from the table and
	/// instruction streams that cannot be split into blocks.
	pub fn build(&self, chunk: &Chunk) -> Result<Function<Graph>, Error> {
		ControlFlowBuilder::new(&self.table, chunk.header.flags)
			.run(&chunk.root)
			.map_err(Error::from)
	}

	fn check(
		&self,
		result: Result<(), InvariantViolation>,
		markers: &mut Vec<Statement>,
	) -> Result<(), Error> {
		match result {
			Err(error) if self.options.recover => {
				tracing::warn!(%error, "downgraded invariant violation");

				markers.push(Statement::Error(error.to_string()));

				Ok(())
			}
			result => result.map_err(Error::from),
		}
	}

	/// Runs every stage from the warped shape to the structured one.
	///
	/// # Errors
	///
	/// Returns the first failure of a stage that is not downgraded by
	/// [`Options::recover`].
	pub fn run(&self, mut function: Function<Graph>) -> Result<Function<Sequence>, Error> {
		let mut validator = Validator::new();
		let mut markers = Vec::new();

		self.check(validator.run_warped(&function), &mut markers)?;

		lua_mutator::pre_pass(&mut function);

		let mut local_marker = LocalMarker::new();

		function.for_each_mut(&mut |function| local_marker.run(function));

		UpvalueEliminator::new().run(&mut function);
		TemporaryEliminator::new(self.options.recover).run(&mut function)?;

		lua_mutator::value_pass(&mut function);

		let mut structurer = Structurer::new();
		let mut function = function.try_map(&mut |graph| structurer.run(graph))?;

		let mut definition_marker = DefinitionMarker::new();

		function.for_each_mut(&mut |function| definition_marker.run(function));

		lua_mutator::primary_pass(&mut function);

		self.check(validator.run_structured(&function), &mut markers)?;

		if !markers.is_empty() {
			markers.append(&mut function.body.list);

			function.body.list = markers;
		}

		Ok(function)
	}

	/// Decompiles a whole dump into its structured tree.
	///
	/// # Errors
	///
	/// Returns the first failure of any stage, see [`Self::run`].
	pub fn decompile(&self, data: &[u8]) -> Result<Function<Sequence>, Error> {
		let chunk = self.parse(data)?;
		let function = self.build(&chunk)?;

		tracing::debug!(children = function.children.len(), "built chunk");

		self.run(function)
	}

	/// Decompiles a whole dump and writes it to `out` as Lua source.
	///
	/// # Errors
	///
	/// Returns the first failure of any stage or of writing to `out`.
	pub fn decompile_to(&self, data: &[u8], out: &mut dyn Write) -> Result<(), Error> {
		let function = self.decompile(data)?;

		write(&function, out)?;

		Ok(())
	}
}

/// Writes a structured tree as Lua source.
///
/// # Errors
///
/// Returns any IO errors that the `out` produces during the process.
pub fn write(function: &Function<Sequence>, out: &mut dyn Write) -> std::io::Result<()> {
	LuaPrinter::new().print(function, out)
}
