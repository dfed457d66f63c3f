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

//! Homogeneous primitive sequences: `marker [count:varint] [capacity:varint] T[capacity]`.
//!
//! Grounded closely on `original_source/src/jak_carbon_column_it.c`
//! (`carbon_column_it_create`, `carbon_column_it_tell`,
//! `carbon_column_it_values_info`): the header is read with the stream
//! VarInt, and every per-element offset is computed from `count`
//! rather than cached, so a count-width change (which shifts
//! everything after it) never leaves a stale offset behind.

use std::convert::TryInto;

use crate::error::{Error, Result};
use crate::layout;
use crate::memfile::MemFile;
use crate::types::{self, AbstractClass, ColumnType, ContainerKind};

pub struct ColumnIt<'a> {
	mf: &'a mut MemFile,
	marker_offset: usize,
	pub(crate) ty: ColumnType,
	class: AbstractClass,
}

impl<'a> ColumnIt<'a> {
	pub fn open(mf: &'a mut MemFile, at: usize) -> Result<ColumnIt<'a>> {
		let m = *mf.peek_at(at, 1)?.first().unwrap();
		let ty = match types::container_kind(m)? {
			Some(ContainerKind::Column(ty)) => ty,
			_ => return Err(Error::UnsupportedContainer("expected column marker")),
		};
		let class = types::abstract_class(m)?;
		Ok(ColumnIt { mf, marker_offset: at, ty, class })
	}

	pub fn element_type(&self) -> ColumnType {
		self.ty
	}

	pub fn class(&self) -> AbstractClass {
		self.class
	}

	pub(crate) fn header_offset(&self) -> usize {
		self.marker_offset + 1
	}

	pub fn values_info(&mut self) -> Result<(u32, u32)> {
		self.mf.seek(self.header_offset())?;
		let count = self.mf.read_uintvar_stream()? as u32;
		let capacity = self.mf.read_uintvar_stream()? as u32;
		Ok((count, capacity))
	}

	pub fn count(&mut self) -> Result<u32> {
		Ok(self.values_info()?.0)
	}

	pub(crate) fn payload_start(&mut self) -> Result<usize> {
		self.mf.seek(self.header_offset())?;
		self.mf.read_uintvar_stream()?;
		self.mf.read_uintvar_stream()?;
		Ok(self.mf.tell())
	}

	/// Byte offset of element `index` (spec.md §4.4 `carbon_column_it_tell`).
	pub fn element_offset(&mut self, index: u32) -> Result<usize> {
		let (count, _) = self.values_info()?;
		if index >= count {
			return Err(Error::OutOfBounds { index: index as usize, len: count as usize });
		}
		let start = self.payload_start()?;
		Ok(start + index as usize * self.ty.width())
	}

	/// The record-level extent of the whole column, used by `pack()`
	/// and by promotion to excise the old bytes.
	pub fn column_span(&mut self) -> Result<(usize, usize)> {
		let (_, capacity) = self.values_info()?;
		let start = self.payload_start()?;
		Ok((self.marker_offset, start + capacity as usize * self.ty.width()))
	}

	pub fn is_null(&mut self, index: u32) -> Result<bool> {
		let off = self.element_offset(index)?;
		let width = self.ty.width();
		let bytes = self.mf.peek_at(off, width)?;
		Ok(bytes == &self.ty.null_sentinel()[..width])
	}

	pub fn as_u64(&mut self, index: u32) -> Result<u64> {
		let off = self.element_offset(index)?;
		Ok(match self.ty {
			ColumnType::U8 => self.mf.peek_at(off, 1)?[0] as u64,
			ColumnType::U16 => u16::from_le_bytes(self.mf.peek_at(off, 2)?.try_into().unwrap()) as u64,
			ColumnType::U32 => u32::from_le_bytes(self.mf.peek_at(off, 4)?.try_into().unwrap()) as u64,
			ColumnType::U64 => u64::from_le_bytes(self.mf.peek_at(off, 8)?.try_into().unwrap()),
			_ => return Err(Error::TypeMismatch { expected: "unsigned column", found: "other column type" }),
		})
	}

	pub fn as_i64(&mut self, index: u32) -> Result<i64> {
		let off = self.element_offset(index)?;
		Ok(match self.ty {
			ColumnType::I8 => self.mf.peek_at(off, 1)?[0] as i8 as i64,
			ColumnType::I16 => i16::from_le_bytes(self.mf.peek_at(off, 2)?.try_into().unwrap()) as i64,
			ColumnType::I32 => i32::from_le_bytes(self.mf.peek_at(off, 4)?.try_into().unwrap()) as i64,
			ColumnType::I64 => i64::from_le_bytes(self.mf.peek_at(off, 8)?.try_into().unwrap()),
			_ => return Err(Error::TypeMismatch { expected: "signed column", found: "other column type" }),
		})
	}

	pub fn as_f32(&mut self, index: u32) -> Result<f32> {
		let off = self.element_offset(index)?;
		if self.ty != ColumnType::Float32 {
			return Err(Error::TypeMismatch { expected: "float32 column", found: "other column type" });
		}
		Ok(f32::from_le_bytes(self.mf.peek_at(off, 4)?.try_into().unwrap()))
	}

	pub fn as_bool(&mut self, index: u32) -> Result<bool> {
		let off = self.element_offset(index)?;
		if self.ty != ColumnType::Bool {
			return Err(Error::TypeMismatch { expected: "bool column", found: "other column type" });
		}
		Ok(self.mf.peek_at(off, 1)?[0] == 0x01)
	}

	/// Shift trailing elements left, decrement `count`, and zero-fill
	/// the freed tail slot so `capacity` and the column's byte footprint
	/// are unchanged (spec.md §4.4 `ColumnIt::remove`).
	pub fn remove(&mut self, index: u32) -> Result<()> {
		let (count, _) = self.values_info()?;
		if index >= count {
			return Err(Error::OutOfBounds { index: index as usize, len: count as usize });
		}
		let width = self.ty.width();
		let start = self.payload_start()?;
		let elem_off = start + index as usize * width;
		let trailing_len = (count as usize - index as usize - 1) * width;
		if trailing_len > 0 {
			let trailing = self.mf.peek_at(elem_off + width, trailing_len)?.to_vec();
			self.mf.seek(elem_off)?;
			self.mf.write(&trailing)?;
		}
		let last_off = start + (count as usize - 1) * width;
		self.mf.seek(last_off)?;
		self.mf.write(&vec![0u8; width])?;
		self.mf.seek(self.header_offset())?;
		self.mf.update_uintvar_stream((count - 1) as u64)?;
		Ok(())
	}

	pub fn update_set_null(&mut self, index: u32) -> Result<()> {
		let off = self.element_offset(index)?;
		let width = self.ty.width();
		let sentinel = self.ty.null_sentinel();
		self.mf.seek(off)?;
		self.mf.write(&sentinel[..width])
	}

	/// Writes `true`/`false` in place when the column is already a bool
	/// column. Returns `Error::TypeMismatch` otherwise so the caller
	/// (the `Reviser`, spec.md §4.5) knows to promote the column to an
	/// array rather than attempting the write itself.
	pub fn update_set_bool(&mut self, index: u32, value: bool) -> Result<()> {
		if self.ty != ColumnType::Bool {
			return Err(Error::TypeMismatch { expected: "bool column", found: "non-bool column (promotion required)" });
		}
		let off = self.element_offset(index)?;
		self.mf.seek(off)?;
		self.mf.write(&[if value { 0x01 } else { 0x00 }])
	}

	/// Trim unused capacity down to `count` (spec.md §4.7 `pack()`).
	/// A no-op on a zero-count column (spec.md §9 open question).
	pub fn pack(&mut self) -> Result<()> {
		let (count, capacity) = self.values_info()?;
		if count == 0 || count == capacity {
			return Ok(());
		}
		let width = self.ty.width();
		let start = self.payload_start()?;
		let tail = start + count as usize * width;
		let unused = (capacity as usize - count as usize) * width;
		self.mf.seek(tail)?;
		self.mf.inplace_remove(unused)?;
		self.mf.seek(self.header_offset())?;
		self.mf.read_uintvar_stream()?;
		self.mf.update_uintvar_stream(count as u64)?;
		Ok(())
	}
}

/// The typed value an existing column element carries, used by
/// promotion (`crate::promote`) to re-express a column as an array
/// without losing per-width null information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue {
	Null,
	U64(u64),
	I64(i64),
	F32(f32),
	Bool(bool),
}

pub fn read_column_values(it: &mut ColumnIt<'_>) -> Result<Vec<ColumnValue>> {
	let (count, _) = it.values_info()?;
	let mut out = Vec::with_capacity(count as usize);
	for i in 0..count {
		if it.is_null(i)? {
			out.push(ColumnValue::Null);
			continue;
		}
		out.push(match it.ty {
			ColumnType::U8 | ColumnType::U16 | ColumnType::U32 | ColumnType::U64 => ColumnValue::U64(it.as_u64(i)?),
			ColumnType::I8 | ColumnType::I16 | ColumnType::I32 | ColumnType::I64 => ColumnValue::I64(it.as_i64(i)?),
			ColumnType::Float32 => ColumnValue::F32(it.as_f32(i)?),
			ColumnType::Bool => ColumnValue::Bool(it.as_bool(i)?),
		});
	}
	Ok(out)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::insert::ColumnInserter;
	use crate::memfile::Mode;
	use crate::types::BASE_LIST_CLASS;

	fn build_u8_column(values: &[u8], capacity: u32) -> MemFile {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut col = ColumnInserter::open(&mut mf, 0, ColumnType::U8, BASE_LIST_CLASS, capacity).unwrap();
			for &v in values {
				col.push_u8(v).unwrap();
			}
			col.close().unwrap();
		}
		mf
	}

	#[test]
	fn values_info_reports_count_and_capacity() {
		let mut mf = build_u8_column(&[1, 2, 3], 8);
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		assert_eq!(it.values_info().unwrap(), (3, 8));
	}

	#[test]
	fn element_access_matches_insertion_order() {
		let mut mf = build_u8_column(&[10, 20, 30], 3);
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		assert_eq!(it.as_u64(0).unwrap(), 10);
		assert_eq!(it.as_u64(1).unwrap(), 20);
		assert_eq!(it.as_u64(2).unwrap(), 30);
		assert!(it.as_u64(3).is_err());
	}

	#[test]
	fn remove_shifts_and_preserves_capacity_footprint() {
		let mut mf = build_u8_column(&[1, 2, 3, 4], 4);
		{
			let mut it = ColumnIt::open(&mut mf, 0).unwrap();
			it.remove(1).unwrap();
			assert_eq!(it.values_info().unwrap(), (3, 4));
			assert_eq!(it.as_u64(0).unwrap(), 1);
			assert_eq!(it.as_u64(1).unwrap(), 3);
			assert_eq!(it.as_u64(2).unwrap(), 4);
		}
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		let (_, end) = it.column_span().unwrap();
		assert_eq!(end, mf.size());
	}

	#[test]
	fn update_set_bool_on_numeric_column_signals_promotion() {
		let mut mf = build_u8_column(&[1, 2, 3], 4);
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		assert!(it.update_set_bool(0, true).is_err());
	}

	#[test]
	fn update_set_null_writes_sentinel() {
		let mut mf = build_u8_column(&[1, 2, 3], 4);
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		it.update_set_null(1).unwrap();
		assert!(it.is_null(1).unwrap());
	}

	#[test]
	fn pack_on_zero_count_column_is_noop() {
		let mut mf = build_u8_column(&[], 4);
		let before = mf.size();
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		it.pack().unwrap();
		assert_eq!(mf.size(), before);
	}

	#[test]
	fn pack_trims_unused_capacity() {
		let mut mf = build_u8_column(&[1, 2], 8);
		let mut it = ColumnIt::open(&mut mf, 0).unwrap();
		it.pack().unwrap();
		assert_eq!(it.values_info().unwrap(), (2, 2));
	}
}
