use alloc::sync::Arc;

use crate::error::{MalformedBytecode, Reason};

pub struct Reader<'data> {
	data: &'data [u8],
	position: usize,
	base: usize,
}

impl<'data> Reader<'data> {
	pub const fn new(data: &'data [u8]) -> Self {
		Self::with_base(data, 0)
	}

	pub const fn with_base(data: &'data [u8], base: usize) -> Self {
		Self {
			data,
			position: 0,
			base,
		}
	}

	pub const fn offset(&self) -> usize {
		self.base + self.position
	}

	pub const fn remaining(&self) -> usize {
		self.data.len() - self.position
	}

	pub const fn is_empty(&self) -> bool {
		self.remaining() == 0
	}

	pub const fn error(&self, reason: Reason) -> MalformedBytecode {
		MalformedBytecode {
			offset: self.offset(),
			reason,
		}
	}

	pub fn byte(&mut self) -> Result<u8, MalformedBytecode> {
		let byte = *self
			.data
			.get(self.position)
			.ok_or_else(|| self.error(Reason::Truncated))?;

		self.position += 1;

		Ok(byte)
	}

	pub fn bytes(&mut self, len: usize) -> Result<&'data [u8], MalformedBytecode> {
		if len > self.remaining() {
			return Err(self.error(Reason::Truncated));
		}

		let bytes = &self.data[self.position..self.position + len];

		self.position += len;

		Ok(bytes)
	}

	pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'data>, MalformedBytecode> {
		let base = self.offset();
		let data = self.bytes(len)?;

		Ok(Reader::with_base(data, base))
	}

	pub fn string(&mut self, len: usize) -> Result<Arc<[u8]>, MalformedBytecode> {
		self.bytes(len).map(Arc::from)
	}

	/// Reads a NUL terminated string, not including the terminator.
	pub fn c_string(&mut self) -> Result<&'data [u8], MalformedBytecode> {
		let rest = &self.data[self.position..];
		let len = rest
			.iter()
			.position(|&byte| byte == 0)
			.ok_or_else(|| MalformedBytecode {
				offset: self.base + self.data.len(),
				reason: Reason::Truncated,
			})?;

		let bytes = &rest[..len];

		self.position += len + 1;

		Ok(bytes)
	}

	pub fn u16(&mut self, big_endian: bool) -> Result<u16, MalformedBytecode> {
		let bytes = self.bytes(2)?;
		let bytes = [bytes[0], bytes[1]];

		Ok(if big_endian {
			u16::from_be_bytes(bytes)
		} else {
			u16::from_le_bytes(bytes)
		})
	}

	pub fn u32(&mut self, big_endian: bool) -> Result<u32, MalformedBytecode> {
		let bytes = self.bytes(4)?;
		let bytes = [bytes[0], bytes[1], bytes[2], bytes[3]];

		Ok(if big_endian {
			u32::from_be_bytes(bytes)
		} else {
			u32::from_le_bytes(bytes)
		})
	}

	pub fn uleb128(&mut self) -> Result<u32, MalformedBytecode> {
		let start = self.offset();
		let mut value = 0_u32;
		let mut shift = 0;

		loop {
			let byte = self.byte()?;

			if shift > 28 || (shift == 28 && byte & 0x70 != 0) {
				return Err(MalformedBytecode {
					offset: start,
					reason: Reason::Overflow,
				});
			}

			value |= u32::from(byte & 0x7F) << shift;
			shift += 7;

			if byte < 0x80 {
				return Ok(value);
			}
		}
	}

	pub fn uleb128_usize(&mut self) -> Result<usize, MalformedBytecode> {
		self.uleb128().map(|value| value as usize)
	}

	/// Reads the 33 bit form used by numeric constants, where the lowest bit
	/// of the first byte is a tag and is returned separately.
	pub fn uleb128_33(&mut self) -> Result<(u32, bool), MalformedBytecode> {
		let start = self.offset();
		let first = self.byte()?;
		let tag = first & 1 != 0;
		let mut value = u32::from(first >> 1);

		if value >= 0x40 {
			let mut shift = 6;

			value &= 0x3F;

			loop {
				let byte = self.byte()?;

				if shift > 27 {
					return Err(MalformedBytecode {
						offset: start,
						reason: Reason::Overflow,
					});
				}

				value |= u32::from(byte & 0x7F) << shift;
				shift += 7;

				if byte < 0x80 {
					break;
				}
			}
		}

		Ok((value, tag))
	}
}
