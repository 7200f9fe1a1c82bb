#![no_std]

extern crate alloc;

mod block_builder;
mod error;
mod layout;
mod operands;

use alloc::{sync::Arc, vec::Vec};
use control_flow_graph::{Block, Graph, dominator::reverse_post_order};
use lua_tree::{
	function::{Function, Upvalue, UpvalueSource},
	slot::SlotTable,
};
use luajit_reader::{
	header::HeaderFlags,
	opcode::{OpcodeTable, Operation},
	prototype::{self, Prototype},
};
use set::Set;

use self::{
	block_builder::{BlockBuilder, Code},
	layout::LayoutFinder,
	operands::Operands,
};

pub use self::error::BuildError;

/// Maps interpreter and JIT variants onto the operation they stand for.
/// Forms whose operand names a trace rather than a jump are rejected.
const fn normalize(operation: Operation) -> Option<Operation> {
	let operation = match operation {
		Operation::IForL => Operation::ForL,
		Operation::IIterL => Operation::IterL,
		Operation::ILoop => Operation::Loop,
		Operation::JForI => Operation::ForI,
		Operation::JForL
		| Operation::JIterL
		| Operation::JLoop
		| Operation::FuncF
		| Operation::IFuncF
		| Operation::JFuncF
		| Operation::FuncV
		| Operation::IFuncV
		| Operation::JFuncV
		| Operation::FuncC
		| Operation::FuncCW => return None,
		operation => operation,
	};

	Some(operation)
}

/// Decodes prototypes into their warped shape.
pub struct ControlFlowBuilder<'table> {
	table: &'table OpcodeTable,
	two_slot_frame: bool,

	layout_finder: LayoutFinder,
	block_builder: BlockBuilder,
}

impl<'table> ControlFlowBuilder<'table> {
	#[must_use]
	pub const fn new(table: &'table OpcodeTable, flags: HeaderFlags) -> Self {
		Self {
			table,
			two_slot_frame: flags.has_two_slot_frame(),

			layout_finder: LayoutFinder::new(),
			block_builder: BlockBuilder::new(),
		}
	}

	fn decode(&self, prototype: &Prototype) -> Result<Vec<Operation>, BuildError> {
		prototype
			.instructions
			.iter()
			.enumerate()
			.map(|(pc, instruction)| {
				let opcode = instruction.opcode();

				self.table
					.decode(opcode)
					.and_then(normalize)
					.ok_or(BuildError::UnsupportedOpcode { opcode, pc })
			})
			.collect()
	}

	fn build_graph(&mut self, code: &Code) -> Result<Graph, BuildError> {
		let starts = &code.layout.starts;
		let mut blocks: Vec<Block> = starts
			.iter()
			.map(|&(pc, _)| Block::new(pc.try_into().unwrap_or(u32::MAX)))
			.collect();

		let ends = starts
			.iter()
			.filter(|(_, is_copy)| !is_copy)
			.map(|&(pc, _)| pc)
			.skip(1)
			.chain(core::iter::once(code.instructions.len()));

		let blocks_iter = starts
			.iter()
			.enumerate()
			.filter(|(_, (_, is_copy))| !is_copy);

		for ((id, &(start, _)), end) in blocks_iter.zip(ends) {
			let id = u16::try_from(id).map_err(|_| BuildError::TooManyBlocks)?;

			self.block_builder
				.run(code, &mut blocks, id, start, end)?;
		}

		let mut graph = Graph { blocks };

		graph.compute_predecessors();

		let mut reachable = Set::new();

		if !graph.is_empty() {
			for id in reverse_post_order(&graph.successor_lists(), 0) {
				reachable.grow_insert(id.into());
			}
		}

		for id in graph.block_ids() {
			graph.block_mut(id).is_unreachable = !reachable.contains(id.into());
		}

		Ok(graph)
	}

	fn build(&mut self, prototype: &Prototype, depth: u16) -> Result<Function<Graph>, BuildError> {
		let children = prototype
			.children
			.iter()
			.map(|child| self.build(child, depth + 1))
			.collect::<Result<Vec<_>, _>>()?;

		let operations = self.decode(prototype)?;
		let layout = self
			.layout_finder
			.run(&operations, &prototype.instructions)?;

		let (operands, variables) = Operands::new(prototype, self.two_slot_frame);
		let code = Code {
			operations,
			instructions: &prototype.instructions,
			operands,
			layout,
		};

		let body = self.build_graph(&code)?;
		let parameters = (0..u16::from(prototype.parameters))
			.map(|slot| code.operands.parameter(slot))
			.collect();

		let upvalue_names = prototype
			.debug
			.as_ref()
			.map_or(&[][..], |debug| &debug.upvalue_names);

		let upvalues = prototype
			.upvalues
			.iter()
			.enumerate()
			.map(|(index, upvalue)| Upvalue {
				source: match upvalue.source {
					prototype::UpvalueSource::Local(slot) => UpvalueSource::Local(slot),
					prototype::UpvalueSource::Upvalue(index) => UpvalueSource::Upvalue(index),
				},
				name: upvalue_names.get(index).map(Arc::clone),
				link: None,
			})
			.collect();

		tracing::debug!(depth, blocks = body.len(), "built function");

		Ok(Function {
			parameters,
			is_variadic: prototype.flags.is_variadic(),
			frame_size: prototype.frame_size.into(),
			depth,
			line: prototype.debug.as_ref().map_or(0, |debug| debug.first_line),
			upvalues,
			variables,
			slots: SlotTable::new(),
			body,
			children,
		})
	}

	/// Builds the warped shape of `prototype` and every nested prototype.
	///
	/// # Errors
	///
	/// Returns an error when an opcode is missing from the table or the
	/// instruction stream cannot be split into blocks.
	pub fn run(&mut self, prototype: &Prototype) -> Result<Function<Graph>, BuildError> {
		self.build(prototype, 0)
	}
}
