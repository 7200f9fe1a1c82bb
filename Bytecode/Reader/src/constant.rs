use alloc::{sync::Arc, vec::Vec};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
	Integer(i32),
	Float(f64),
}

impl Number {
	#[must_use]
	pub fn from_parts(low: u32, high: u32) -> Self {
		Self::Float(f64::from_bits(u64::from(high) << 32 | u64::from(low)))
	}

	/// Truncates to the 32 bit integer used as the start index of `TSETM`.
	#[must_use]
	pub fn low_bits(self) -> u32 {
		match self {
			Self::Integer(integer) => integer as u32,
			Self::Float(float) => float.to_bits() as u32,
		}
	}
}

/// A constant that may appear inside a template table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableValue {
	Nil,
	False,
	True,
	Integer(i32),
	Number(f64),
	String(Arc<[u8]>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
	/// Array part; index 0 is the unused `t[0]` slot and is usually nil.
	pub array: Vec<TableValue>,
	pub hash: Vec<(TableValue, TableValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
	/// Index into [`Prototype::children`](crate::prototype::Prototype::children).
	Child(u16),
	Table(Table),
	Signed(i64),
	Unsigned(u64),
	Complex(f64, f64),
	String(Arc<[u8]>),
}
