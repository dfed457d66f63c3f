// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of Parity.

// Parity is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Parity is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Parity.  If not, see <http://www.gnu.org/licenses/>.

//! A resizable byte block with a single cursor, and the substrate every
//! other component in this crate is built on. Not internally
//! synchronized: callers serialize mutation of a given record through
//! the per-record write lock (see `revise`).

use crate::error::{Error, Result};
use crate::varint::{marker, stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	ReadOnly,
	ReadWrite,
}

#[derive(Debug, Clone)]
pub struct MemFile {
	block: Vec<u8>,
	cursor: usize,
	mode: Mode,
	bookmarks: Vec<usize>,
}

impl MemFile {
	pub fn open(block: Vec<u8>, mode: Mode) -> MemFile {
		MemFile { block, cursor: 0, mode, bookmarks: Vec::new() }
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn size(&self) -> usize {
		self.block.len()
	}

	pub fn tell(&self) -> usize {
		self.cursor
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.block
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.block
	}

	pub fn seek(&mut self, abs: usize) -> Result<()> {
		if abs > self.block.len() {
			return Err(Error::OutOfBounds { index: abs, len: self.block.len() });
		}
		self.cursor = abs;
		Ok(())
	}

	pub fn skip(&mut self, rel: i64) -> Result<()> {
		let target = self.cursor as i64 + rel;
		if target < 0 {
			return Err(Error::OutOfBounds { index: 0, len: self.block.len() });
		}
		self.seek(target as usize)
	}

	pub fn seek_to_end(&mut self) {
		self.cursor = self.block.len();
	}

	pub fn remain(&self) -> usize {
		self.block.len() - self.cursor
	}

	pub fn read(&mut self, n: usize) -> Result<&[u8]> {
		let start = self.cursor;
		let end = start.checked_add(n).filter(|&e| e <= self.block.len())
			.ok_or(Error::OutOfBounds { index: start + n, len: self.block.len() })?;
		self.cursor = end;
		Ok(&self.block[start..end])
	}

	pub fn peek(&self, n: usize) -> Result<&[u8]> {
		let end = self.cursor.checked_add(n).filter(|&e| e <= self.block.len())
			.ok_or(Error::OutOfBounds { index: self.cursor + n, len: self.block.len() })?;
		Ok(&self.block[self.cursor..end])
	}

	/// Peek `n` bytes at an arbitrary absolute offset, without touching the cursor.
	pub fn peek_at(&self, pos: usize, n: usize) -> Result<&[u8]> {
		let end = pos.checked_add(n).filter(|&e| e <= self.block.len())
			.ok_or(Error::OutOfBounds { index: pos + n, len: self.block.len() })?;
		Ok(&self.block[pos..end])
	}

	pub fn write(&mut self, data: &[u8]) -> Result<()> {
		self.require_write()?;
		let end = self.cursor + data.len();
		if end > self.block.len() {
			self.block.resize(end, 0);
		}
		self.block[self.cursor..end].copy_from_slice(data);
		self.cursor = end;
		Ok(())
	}

	/// Reserve `n` bytes at the cursor, shifting the tail right. The
	/// cursor stays at the start of the new gap.
	pub fn inplace_insert(&mut self, n: usize) -> Result<()> {
		self.require_write()?;
		if n == 0 {
			return Ok(());
		}
		self.block.resize(self.block.len() + n, 0);
		let len = self.block.len();
		self.block.copy_within(self.cursor..len - n, self.cursor + n);
		self.block[self.cursor..self.cursor + n].fill(0);
		Ok(())
	}

	/// Delete `n` bytes at the cursor, shifting the tail left.
	pub fn inplace_remove(&mut self, n: usize) -> Result<()> {
		self.require_write()?;
		if self.cursor + n > self.block.len() {
			return Err(Error::OutOfBounds { index: self.cursor + n, len: self.block.len() });
		}
		self.block.copy_within(self.cursor + n.., self.cursor);
		self.block.truncate(self.block.len() - n);
		Ok(())
	}

	/// Truncate the last `n` bytes of the block.
	pub fn cut(&mut self, n: usize) -> Result<()> {
		self.require_write()?;
		if n > self.block.len() {
			return Err(Error::OutOfBounds { index: n, len: self.block.len() });
		}
		self.block.truncate(self.block.len() - n);
		self.cursor = self.cursor.min(self.block.len());
		Ok(())
	}

	pub fn save_position(&mut self) {
		self.bookmarks.push(self.cursor);
	}

	pub fn restore_position(&mut self) -> Result<()> {
		let pos = self.bookmarks.pop().ok_or(Error::Internal("restore_position without matching save".into()))?;
		self.cursor = pos;
		Ok(())
	}

	fn require_write(&self) -> Result<()> {
		match self.mode {
			Mode::ReadWrite => Ok(()),
			Mode::ReadOnly => Err(Error::IllegalOperation("write on read-only MemFile")),
		}
	}

	// -- stream VarInt helpers --------------------------------------------------

	pub fn read_uintvar_stream(&mut self) -> Result<u64> {
		let (value, consumed) = stream::decode(self.peek(self.remain().min(10))?)?;
		self.cursor += consumed;
		Ok(value)
	}

	pub fn peek_uintvar_stream(&self) -> Result<u64> {
		let (value, _) = stream::decode(self.peek(self.remain().min(10))?)?;
		Ok(value)
	}

	pub fn skip_uintvar_stream(&mut self) -> Result<()> {
		let (_, consumed) = stream::decode(self.peek(self.remain().min(10))?)?;
		self.cursor += consumed;
		Ok(())
	}

	pub fn write_uintvar_stream(&mut self, value: u64) -> Result<()> {
		let bytes = stream::encode(value);
		self.write(&bytes)
	}

	/// Overwrite the stream VarInt at the cursor with `new_value`,
	/// growing or shrinking the buffer as needed. Returns the signed
	/// byte shift so enclosing cursors can be corrected.
	pub fn update_uintvar_stream(&mut self, new_value: u64) -> Result<i64> {
		self.require_write()?;
		let old = self.peek(self.remain().min(10))?;
		let (_, old_len) = stream::decode(old)?;
		let (encoded, shift) = stream::update_in_place(old_len, new_value);
		if shift > 0 {
			self.inplace_insert(shift as usize)?;
		} else if shift < 0 {
			self.inplace_remove((-shift) as usize)?;
		}
		let start = self.cursor;
		self.block[start..start + encoded.len()].copy_from_slice(&encoded);
		self.cursor += encoded.len();
		Ok(shift)
	}

	// -- marker VarInt helpers ---------------------------------------------------

	pub fn read_uintvar_marker(&mut self) -> Result<u64> {
		let header = self.peek(1)?;
		let len = marker::payload_len(header[0])?;
		let (value, consumed) = marker::decode(self.peek(1 + len)?)?;
		self.cursor += consumed;
		Ok(value)
	}

	pub fn write_uintvar_marker(&mut self, value: u64) -> Result<()> {
		let bytes = marker::encode(value);
		self.write(&bytes)
	}

	pub fn update_uintvar_marker(&mut self, new_value: u64) -> Result<i64> {
		self.require_write()?;
		let header = self.peek(1)?;
		let old_len = 1 + marker::payload_len(header[0])?;
		let encoded = marker::encode(new_value);
		let shift = encoded.len() as i64 - old_len as i64;
		if shift > 0 {
			self.inplace_insert(shift as usize)?;
		} else if shift < 0 {
			self.inplace_remove((-shift) as usize)?;
		}
		let start = self.cursor;
		self.block[start..start + encoded.len()].copy_from_slice(&encoded);
		self.cursor += encoded.len();
		Ok(shift)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn rw(data: &[u8]) -> MemFile {
		MemFile::open(data.to_vec(), Mode::ReadWrite)
	}

	#[test]
	fn read_write_roundtrip() {
		let mut f = rw(b"hello world");
		assert_eq!(f.read(5).unwrap(), b"hello");
		assert_eq!(f.tell(), 5);
		f.seek(0).unwrap();
		f.write(b"HELLO").unwrap();
		assert_eq!(f.as_slice(), b"HELLO world");
	}

	#[test]
	fn inplace_insert_shifts_tail_right() {
		let mut f = rw(b"abcXdef");
		f.seek(3).unwrap();
		f.inplace_insert(3).unwrap();
		assert_eq!(f.tell(), 3);
		f.write(b"123").unwrap();
		assert_eq!(f.as_slice(), b"abc123Xdef");
	}

	#[test]
	fn inplace_remove_shifts_tail_left() {
		let mut f = rw(b"abcXYZdef");
		f.seek(3).unwrap();
		f.inplace_remove(3).unwrap();
		assert_eq!(f.as_slice(), b"abcdef");
	}

	#[test]
	fn save_restore_position_is_stack_disciplined() {
		let mut f = rw(b"0123456789");
		f.seek(2).unwrap();
		f.save_position();
		f.seek(7).unwrap();
		f.save_position();
		f.seek(1).unwrap();
		f.restore_position().unwrap();
		assert_eq!(f.tell(), 7);
		f.restore_position().unwrap();
		assert_eq!(f.tell(), 2);
		assert!(f.restore_position().is_err());
	}

	#[test]
	fn read_only_rejects_writes() {
		let mut f = MemFile::open(b"abc".to_vec(), Mode::ReadOnly);
		assert!(f.write(b"x").is_err());
		assert!(f.inplace_insert(1).is_err());
	}

	#[test]
	fn stream_varint_update_in_place_reports_shift() {
		let mut f = rw(&[0u8; 0]);
		f.write_uintvar_stream(5).unwrap();
		f.write(b"tail").unwrap();
		f.seek(0).unwrap();
		let shift = f.update_uintvar_stream(100_000).unwrap();
		assert!(shift > 0);
		f.seek(f.tell()).unwrap();
		assert_eq!(&f.as_slice()[f.tell()..], b"tail");
	}

	#[test]
	fn cut_truncates_tail() {
		let mut f = rw(b"0123456789");
		f.cut(4).unwrap();
		assert_eq!(f.as_slice(), b"012345");
	}
}
