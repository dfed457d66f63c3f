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

use crate::error::{Error, Result};
use crate::insert::Inserter;
use crate::iter::column::ColumnIt;
use crate::iter::object::ObjectIt;
use crate::layout;
use crate::memfile::MemFile;
use crate::scalar;
use crate::types::{self, marker, AbstractClass, ContainerKind, FieldType};

/// A forward cursor over an array's elements.
///
/// `remove()` physically collapses the removed slot (spec.md §4.4: "a
/// shrinking-only collapse"), so there is never a tombstone/empty-slot
/// marker to skip over on the next `next()` -- unlike the description
/// in spec.md's prose, which allows for an empty-slot representation
/// this port does not need because removal always compacts immediately.
pub struct ArrayIt<'a> {
	mf: &'a mut MemFile,
	class: AbstractClass,
	body_start: usize,
	position: Option<usize>,
	repositioned: bool,
}

impl<'a> ArrayIt<'a> {
	pub fn open(mf: &'a mut MemFile, at: usize) -> Result<ArrayIt<'a>> {
		let m = *mf.peek_at(at, 1)?.first().unwrap();
		match types::container_kind(m)? {
			Some(ContainerKind::Array) => {}
			_ => return Err(Error::UnsupportedContainer("expected array marker")),
		}
		let class = types::abstract_class(m)?;
		Ok(ArrayIt { mf, class, body_start: at + 1, position: None, repositioned: false })
	}

	pub fn class(&self) -> AbstractClass {
		self.class
	}

	/// Reopen an array already known to be positioned at `slot_offset`
	/// (the marker byte of one of its elements), skipping the forward
	/// scan. Used by the path evaluator (spec.md §4.6) to hand a
	/// resolved slot back to `Find` without re-walking from the start.
	pub fn at(mf: &'a mut MemFile, container_at: usize, slot_offset: usize) -> Result<ArrayIt<'a>> {
		let mut it = ArrayIt::open(mf, container_at)?;
		it.position = Some(slot_offset);
		Ok(it)
	}

	/// The marker offset of the slot this iterator is currently
	/// positioned at.
	pub fn slot_offset(&self) -> Result<usize> {
		self.pos()
	}

	fn rewind(&mut self) {
		self.position = None;
		self.repositioned = false;
	}

	/// Advance to the next slot; `false` once the terminator is reached.
	pub fn next(&mut self) -> Result<bool> {
		let probe = if self.repositioned {
			self.repositioned = false;
			self.position.ok_or(Error::Internal("repositioned without a position".into()))?
		} else {
			match self.position {
				None => self.body_start,
				Some(p) => layout::field_end(self.mf, p)?,
			}
		};
		let m = *self.mf.peek_at(probe, 1)?.first().unwrap();
		if m == marker::ARRAY_END {
			self.position = None;
			Ok(false)
		} else {
			self.position = Some(probe);
			Ok(true)
		}
	}

	fn pos(&self) -> Result<usize> {
		self.position.ok_or(Error::IllegalState("array iterator is not positioned at a slot"))
	}

	pub fn field_type(&self) -> Result<FieldType> {
		layout::peek_field_type(self.mf, self.pos()?)
	}

	pub fn as_bool(&self) -> Result<bool> {
		scalar::as_bool(self.mf, self.pos()?)
	}

	pub fn as_u64(&self) -> Result<u64> {
		scalar::as_u64(self.mf, self.pos()?)
	}

	pub fn as_i64(&self) -> Result<i64> {
		scalar::as_i64(self.mf, self.pos()?)
	}

	pub fn as_f32(&self) -> Result<f32> {
		scalar::as_f32(self.mf, self.pos()?)
	}

	pub fn as_str(&self) -> Result<String> {
		scalar::as_str(self.mf, self.pos()?)
	}

	pub fn as_binary(&self) -> Result<(String, Vec<u8>)> {
		scalar::as_binary(self.mf, self.pos()?)
	}

	pub fn open_array(&mut self) -> Result<ArrayIt<'_>> {
		let pos = self.pos()?;
		ArrayIt::open(self.mf, pos)
	}

	pub fn open_object(&mut self) -> Result<ObjectIt<'_>> {
		let pos = self.pos()?;
		ObjectIt::open(self.mf, pos)
	}

	pub fn open_column(&mut self) -> Result<ColumnIt<'_>> {
		let pos = self.pos()?;
		ColumnIt::open(self.mf, pos)
	}

	/// Collapse the current slot; the iterator is left positioned at
	/// whatever now occupies that offset (the next surviving element,
	/// or the terminator on the next `next()` call).
	pub fn remove(&mut self) -> Result<()> {
		let pos = self.pos()?;
		let end = layout::field_end(self.mf, pos)?;
		self.mf.seek(pos)?;
		self.mf.inplace_remove(end - pos)?;
		self.position = Some(pos);
		self.repositioned = true;
		Ok(())
	}

	/// True iff this array has exactly one element and that element is
	/// an object or column (spec.md §3/§4.4 "Unit arrays").
	pub fn is_unit(&mut self) -> Result<bool> {
		self.rewind();
		let mut count = 0usize;
		let mut first_is_container = false;
		while self.next()? {
			count += 1;
			if count == 1 {
				first_is_container = matches!(self.field_type()?, FieldType::Object(_) | FieldType::Column(..));
			}
			if count > 1 {
				break;
			}
		}
		self.rewind();
		Ok(count == 1 && first_is_container)
	}

	pub fn is_empty(&mut self) -> Result<bool> {
		self.rewind();
		let has_any = self.next()?;
		self.rewind();
		Ok(!has_any)
	}

	/// Seek the underlying cursor to the terminator byte without
	/// reading element values.
	pub fn fast_forward(&mut self) -> Result<()> {
		let mut probe = match self.position {
			None => self.body_start,
			Some(p) => layout::field_end(self.mf, p)?,
		};
		loop {
			let m = *self.mf.peek_at(probe, 1)?.first().unwrap();
			if m == marker::ARRAY_END {
				break;
			}
			probe = layout::field_end(self.mf, probe)?;
		}
		self.mf.seek(probe)?;
		self.position = None;
		self.repositioned = false;
		Ok(())
	}

	/// Open an inserter at the array's tail, consuming the terminator so
	/// appended elements land before it; the caller must `close()` the
	/// returned inserter to rewrite the terminator.
	pub fn inserter(&mut self) -> Result<Inserter<'_>> {
		self.fast_forward()?;
		let tail = self.mf.tell();
		Inserter::resume_array(self.mf, tail)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::memfile::Mode;
	use crate::types::BASE_LIST_CLASS;

	fn build(f: impl FnOnce(&mut Inserter)) -> MemFile {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut a = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			f(&mut a);
			a.close().unwrap();
		}
		mf
	}

	#[test]
	fn iterates_in_insertion_order() {
		let mut mf = build(|a| {
			a.u8(1).unwrap();
			a.true_().unwrap();
			a.null().unwrap();
		});
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(it.next().unwrap());
		assert_eq!(it.as_u64().unwrap(), 1);
		assert!(it.next().unwrap());
		assert!(it.as_bool().unwrap());
		assert!(it.next().unwrap());
		assert!(matches!(it.field_type().unwrap(), FieldType::Null));
		assert!(!it.next().unwrap());
	}

	#[test]
	fn remove_collapses_slot_and_keeps_order() {
		let mut mf = build(|a| {
			a.u8(1).unwrap();
			a.u8(2).unwrap();
			a.u8(3).unwrap();
		});
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		it.next().unwrap();
		it.next().unwrap();
		assert_eq!(it.as_u64().unwrap(), 2);
		it.remove().unwrap();
		let mut values = Vec::new();
		loop {
			if !it.next().unwrap() {
				break;
			}
			values.push(it.as_u64().unwrap());
		}
		assert_eq!(values, vec![3]);
		// And a fresh iterator sees [1, 3].
		let mut fresh = ArrayIt::open(&mut mf, 0).unwrap();
		let mut all = Vec::new();
		while fresh.next().unwrap() {
			all.push(fresh.as_u64().unwrap());
		}
		assert_eq!(all, vec![1, 3]);
	}

	#[test]
	fn is_unit_true_for_single_object_element() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut a = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			{
				let mut obj = a.object().unwrap();
				{
					let mut v = obj.key("k").unwrap();
					v.string("v").unwrap();
				}
				obj.close().unwrap();
			}
			a.close().unwrap();
		}
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(it.is_unit().unwrap());
	}

	#[test]
	fn is_unit_false_for_multi_element_array() {
		let mut mf = build(|a| {
			a.u8(1).unwrap();
			a.u8(2).unwrap();
		});
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(!it.is_unit().unwrap());
	}

	#[test]
	fn nested_array_lifetime_is_scoped_by_the_borrow() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut a = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			{
				let mut inner = a.array().unwrap();
				inner.u8(9).unwrap();
				inner.close().unwrap();
			}
			a.close().unwrap();
		}
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(it.next().unwrap());
		{
			let mut sub = it.open_array().unwrap();
			assert!(sub.next().unwrap());
			assert_eq!(sub.as_u64().unwrap(), 9);
		}
		assert!(!it.next().unwrap());
	}

	#[test]
	fn out_of_range_accessor_is_type_mismatch() {
		let mut mf = build(|a| {
			a.null().unwrap();
		});
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		it.next().unwrap();
		assert!(it.as_u64().is_err());
	}
}
