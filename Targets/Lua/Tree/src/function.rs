use alloc::{sync::Arc, vec::Vec};

use crate::slot::{SlotRef, SlotTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvalueSource {
	/// A register of the enclosing function.
	Local(u16),
	/// An upvalue of the enclosing function.
	Upvalue(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upvalue {
	pub source: UpvalueSource,
	pub name: Option<Arc<str>>,
	/// The web of the enclosing function captured when the closure is made.
	pub link: Option<u32>,
}

/// A function at any stage of decompilation. The body starts as a control
/// flow graph and ends as a structured sequence.
#[derive(Debug, Clone)]
pub struct Function<B> {
	pub parameters: Vec<SlotRef>,
	pub is_variadic: bool,
	pub frame_size: u16,
	pub depth: u16,
	pub line: u32,

	pub upvalues: Vec<Upvalue>,
	pub variables: Vec<Arc<str>>,
	pub slots: SlotTable,

	pub body: B,
	pub children: Vec<Function<B>>,
}

impl<B> Function<B> {
	/// Replaces the body of this function and all of its children.
	pub fn try_map<C, E, M>(self, map: &mut M) -> Result<Function<C>, E>
	where
		M: FnMut(B) -> Result<C, E>,
	{
		let Self {
			parameters,
			is_variadic,
			frame_size,
			depth,
			line,
			upvalues,
			variables,
			slots,
			body,
			children,
		} = self;

		let children = children
			.into_iter()
			.map(|child| child.try_map(map))
			.collect::<Result<Vec<_>, E>>()?;

		Ok(Function {
			parameters,
			is_variadic,
			frame_size,
			depth,
			line,
			upvalues,
			variables,
			slots,
			body: map(body)?,
			children,
		})
	}

	/// Calls `handler` on this function and then on its children, depth first.
	pub fn for_each_mut<H: FnMut(&mut Self)>(&mut self, handler: &mut H) {
		handler(self);

		self.children
			.iter_mut()
			.for_each(|child| child.for_each_mut(handler));
	}

	/// The fallible form of [`Self::for_each_mut`].
	pub fn try_for_each_mut<E, H>(&mut self, handler: &mut H) -> Result<(), E>
	where
		H: FnMut(&mut Self) -> Result<(), E>,
	{
		handler(self)?;

		self.children
			.iter_mut()
			.try_for_each(|child| child.try_for_each_mut(handler))
	}

	/// Calls `handler` on the children first, so a parent sees finished children.
	pub fn try_for_each_post_mut<E, H>(&mut self, handler: &mut H) -> Result<(), E>
	where
		H: FnMut(&mut Self) -> Result<(), E>,
	{
		self.children
			.iter_mut()
			.try_for_each(|child| child.try_for_each_post_mut(handler))?;

		handler(self)
	}
}
