use alloc::sync::Arc;

use crate::opcode::Version;

pub const MAGIC: [u8; 3] = [0x1B, b'L', b'J'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFlags(pub u32);

impl HeaderFlags {
	pub const BIG_ENDIAN: u32 = 0x01;
	pub const STRIPPED: u32 = 0x02;
	pub const FFI: u32 = 0x04;
	pub const TWO_SLOT_FRAME: u32 = 0x08;

	#[must_use]
	pub const fn is_big_endian(self) -> bool {
		self.0 & Self::BIG_ENDIAN != 0
	}

	#[must_use]
	pub const fn is_stripped(self) -> bool {
		self.0 & Self::STRIPPED != 0
	}

	#[must_use]
	pub const fn uses_ffi(self) -> bool {
		self.0 & Self::FFI != 0
	}

	/// Frames keep the function and frame link in two slots, so call
	/// arguments start one slot later.
	#[must_use]
	pub const fn has_two_slot_frame(self) -> bool {
		self.0 & Self::TWO_SLOT_FRAME != 0
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
	pub version: Version,
	pub flags: HeaderFlags,
	pub name: Option<Arc<[u8]>>,
}
