use alloc::{sync::Arc, vec::Vec};

/// A reference to a register. `web` is assigned by liveness analysis and
/// groups every definition and use of one variable; `variable` points into
/// the debug names of the function when the reference falls in a named scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
	pub index: u16,
	pub web: u32,
	pub variable: Option<u16>,
}

impl SlotRef {
	pub const UNRESOLVED: u32 = u32::MAX;

	#[must_use]
	pub const fn new(index: u16) -> Self {
		Self {
			index,
			web: Self::UNRESOLVED,
			variable: None,
		}
	}

	#[must_use]
	pub const fn with_variable(mut self, variable: Option<u16>) -> Self {
		self.variable = variable;
		self
	}

	#[must_use]
	pub const fn is_resolved(self) -> bool {
		self.web != Self::UNRESOLVED
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
	Temporary,
	Local,
	/// Captured by a child closure and not yet reconciled with its upvalue.
	UpvalueLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Web {
	pub slot: u16,
	pub kind: SlotKind,
	pub name: Option<Arc<str>>,
	/// The name was made up rather than read from debug information.
	pub is_generated: bool,
	pub definitions: u32,
	pub reads: u32,
}

impl Web {
	#[must_use]
	pub const fn new(slot: u16) -> Self {
		Self {
			slot,
			kind: SlotKind::Temporary,
			name: None,
			is_generated: false,
			definitions: 0,
			reads: 0,
		}
	}
}

/// Every variable of a function, indexed by web.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotTable {
	pub webs: Vec<Web>,
}

impl SlotTable {
	#[must_use]
	pub const fn new() -> Self {
		Self { webs: Vec::new() }
	}

	#[must_use]
	pub fn get(&self, slot: SlotRef) -> Option<&Web> {
		self.webs.get(usize::try_from(slot.web).ok()?)
	}

	#[must_use]
	pub fn kind(&self, slot: SlotRef) -> SlotKind {
		self.get(slot).map_or(SlotKind::Temporary, |web| web.kind)
	}

	#[must_use]
	pub fn is_local(&self, slot: SlotRef) -> bool {
		self.kind(slot) != SlotKind::Temporary
	}
}
