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

//! Like `ArrayIt`, but each position is a `(name, value)` property
//! rather than a bare slot.

use crate::error::{Error, Result};
use crate::insert::{Inserter, ObjectInserter};
use crate::iter::column::ColumnIt;
use crate::layout;
use crate::memfile::MemFile;
use crate::scalar;
use crate::types::{self, marker, AbstractClass, ContainerKind, FieldType};

pub struct ObjectIt<'a> {
	mf: &'a mut MemFile,
	class: AbstractClass,
	body_start: usize,
	/// (name start offset, value start offset) of the current property.
	position: Option<(usize, usize)>,
	repositioned: bool,
}

impl<'a> ObjectIt<'a> {
	pub fn open(mf: &'a mut MemFile, at: usize) -> Result<ObjectIt<'a>> {
		let m = *mf.peek_at(at, 1)?.first().unwrap();
		match types::container_kind(m)? {
			Some(ContainerKind::Object) => {}
			_ => return Err(Error::UnsupportedContainer("expected object marker")),
		}
		let class = types::abstract_class(m)?;
		Ok(ObjectIt { mf, class, body_start: at + 1, position: None, repositioned: false })
	}

	pub fn class(&self) -> AbstractClass {
		self.class
	}

	/// Reopen an object already known to have a property whose name
	/// starts at `name_start`, skipping the linear scan. Used by the
	/// path evaluator (spec.md §4.6) to hand a resolved property back
	/// to `Find`.
	pub fn at(mf: &'a mut MemFile, container_at: usize, name_start: usize) -> Result<ObjectIt<'a>> {
		let mut it = ObjectIt::open(mf, container_at)?;
		let (name_len, len_size) = layout::peek_stream_varint(it.mf, name_start)?;
		let value_start = name_start + len_size + name_len as usize;
		it.position = Some((name_start, value_start));
		Ok(it)
	}

	/// The offset of the current property's name (its length-prefix byte).
	pub fn name_offset(&self) -> Result<usize> {
		Ok(self.pos()?.0)
	}

	/// The marker offset of the current property's value.
	pub fn prop_value_offset(&self) -> Result<usize> {
		Ok(self.pos()?.1)
	}

	fn rewind(&mut self) {
		self.position = None;
		self.repositioned = false;
	}

	fn prop_end(&mut self, name_start: usize) -> Result<usize> {
		let (name_len, len_size) = layout::peek_stream_varint(self.mf, name_start)?;
		let value_start = name_start + len_size + name_len as usize;
		layout::field_end(self.mf, value_start)
	}

	pub fn next(&mut self) -> Result<bool> {
		let probe = if self.repositioned {
			self.repositioned = false;
			self.position.ok_or(Error::Internal("repositioned without a position".into()))?.0
		} else {
			match self.position {
				None => self.body_start,
				Some((name_start, _)) => self.prop_end(name_start)?,
			}
		};
		let m = *self.mf.peek_at(probe, 1)?.first().unwrap();
		if m == marker::OBJECT_END {
			self.position = None;
			return Ok(false);
		}
		let (name_len, len_size) = layout::peek_stream_varint(self.mf, probe)?;
		let value_start = probe + len_size + name_len as usize;
		self.position = Some((probe, value_start));
		Ok(true)
	}

	fn pos(&self) -> Result<(usize, usize)> {
		self.position.ok_or(Error::IllegalState("object iterator is not positioned at a property"))
	}

	pub fn prop_name(&self) -> Result<String> {
		let (name_start, _) = self.pos()?;
		let (len, len_size) = layout::peek_stream_varint(self.mf, name_start)?;
		let bytes = self.mf.peek_at(name_start + len_size, len as usize)?;
		std::str::from_utf8(bytes).map(|s| s.to_string()).map_err(|_| Error::corrupted("property name is not valid utf-8", bytes))
	}

	pub fn prop_type(&self) -> Result<FieldType> {
		let (_, value_start) = self.pos()?;
		layout::peek_field_type(self.mf, value_start)
	}

	pub fn as_bool(&self) -> Result<bool> {
		scalar::as_bool(self.mf, self.pos()?.1)
	}

	pub fn as_u64(&self) -> Result<u64> {
		scalar::as_u64(self.mf, self.pos()?.1)
	}

	pub fn as_i64(&self) -> Result<i64> {
		scalar::as_i64(self.mf, self.pos()?.1)
	}

	pub fn as_f32(&self) -> Result<f32> {
		scalar::as_f32(self.mf, self.pos()?.1)
	}

	pub fn as_str(&self) -> Result<String> {
		scalar::as_str(self.mf, self.pos()?.1)
	}

	pub fn as_binary(&self) -> Result<(String, Vec<u8>)> {
		scalar::as_binary(self.mf, self.pos()?.1)
	}

	pub fn open_array(&mut self) -> Result<super::ArrayIt<'_>> {
		let (_, v) = self.pos()?;
		super::ArrayIt::open(self.mf, v)
	}

	pub fn open_object(&mut self) -> Result<ObjectIt<'_>> {
		let (_, v) = self.pos()?;
		ObjectIt::open(self.mf, v)
	}

	pub fn open_column(&mut self) -> Result<ColumnIt<'_>> {
		let (_, v) = self.pos()?;
		ColumnIt::open(self.mf, v)
	}

	/// Collapse the current property (name and value together).
	pub fn remove(&mut self) -> Result<()> {
		let (name_start, _) = self.pos()?;
		let end = self.prop_end(name_start)?;
		self.mf.seek(name_start)?;
		self.mf.inplace_remove(end - name_start)?;
		self.position = Some((name_start, name_start));
		self.repositioned = true;
		Ok(())
	}

	/// Find a property by name via a linear scan from the start
	/// (spec.md §4.6 "a linear scan compares name bytes").
	pub fn find(&mut self, name: &str) -> Result<bool> {
		self.rewind();
		while self.next()? {
			if self.prop_name()? == name {
				return Ok(true);
			}
		}
		Ok(false)
	}

	pub fn fast_forward(&mut self) -> Result<()> {
		let mut probe = match self.position {
			None => self.body_start,
			Some((name_start, _)) => self.prop_end(name_start)?,
		};
		loop {
			let m = *self.mf.peek_at(probe, 1)?.first().unwrap();
			if m == marker::OBJECT_END {
				break;
			}
			let (name_len, len_size) = layout::peek_stream_varint(self.mf, probe)?;
			probe = layout::field_end(self.mf, probe + len_size + name_len as usize)?;
		}
		self.mf.seek(probe)?;
		self.position = None;
		self.repositioned = false;
		Ok(())
	}

	pub fn inserter(&mut self) -> Result<ObjectInserter<'_>> {
		self.fast_forward()?;
		let tail = self.mf.tell();
		ObjectInserter::open(self.mf, tail, self.class)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::memfile::Mode;
	use crate::types::BASE_OBJECT_CLASS;

	fn build() -> MemFile {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut obj = ObjectInserter::open(&mut mf, 0, BASE_OBJECT_CLASS).unwrap();
			{
				let mut v = obj.key("a").unwrap();
				v.u8(1).unwrap();
			}
			{
				let mut v = obj.key("b").unwrap();
				v.true_().unwrap();
			}
			obj.close().unwrap();
		}
		mf
	}

	#[test]
	fn iterates_properties_in_order() {
		let mut mf = build();
		let mut it = ObjectIt::open(&mut mf, 0).unwrap();
		assert!(it.next().unwrap());
		assert_eq!(it.prop_name().unwrap(), "a");
		assert_eq!(it.as_u64().unwrap(), 1);
		assert!(it.next().unwrap());
		assert_eq!(it.prop_name().unwrap(), "b");
		assert!(it.as_bool().unwrap());
		assert!(!it.next().unwrap());
	}

	#[test]
	fn find_locates_property_by_name() {
		let mut mf = build();
		let mut it = ObjectIt::open(&mut mf, 0).unwrap();
		assert!(it.find("b").unwrap());
		assert!(it.as_bool().unwrap());
		assert!(!it.find("missing").unwrap());
	}

	#[test]
	fn remove_collapses_property() {
		let mut mf = build();
		{
			let mut it = ObjectIt::open(&mut mf, 0).unwrap();
			assert!(it.find("a").unwrap());
			it.remove().unwrap();
		}
		let mut it = ObjectIt::open(&mut mf, 0).unwrap();
		assert!(it.next().unwrap());
		assert_eq!(it.prop_name().unwrap(), "b");
		assert!(!it.next().unwrap());
	}
}
