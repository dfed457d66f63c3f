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

//! Column-to-array promotion: the mutator that fires when a revise
//! writes a value into a column element it cannot represent (spec.md
//! §4.4's "most subtle mutator"), for example `update_set_true` on a
//! `u8` column.
//!
//! The promoted array is assembled in a scratch buffer first and then
//! spliced over the column's byte span in one shot, rather than
//! growing the column's existing payload piecemeal -- a column and an
//! array don't share a header shape, so there is no incremental path
//! between them.

use crate::error::Result;
use crate::insert::Inserter;
use crate::iter::column::{read_column_values, ColumnIt, ColumnValue};
use crate::memfile::{MemFile, Mode};
use crate::types::ColumnType;

fn write_scalar(a: &mut Inserter, ty: ColumnType, value: ColumnValue) -> Result<()> {
	match value {
		ColumnValue::Null => a.null(),
		ColumnValue::Bool(b) => {
			if b {
				a.true_()
			} else {
				a.false_()
			}
		}
		ColumnValue::U64(n) => match ty {
			ColumnType::U8 => a.u8(n as u8),
			ColumnType::U16 => a.u16(n as u16),
			ColumnType::U32 => a.u32(n as u32),
			_ => a.u64(n),
		},
		ColumnValue::I64(n) => match ty {
			ColumnType::I8 => a.i8(n as i8),
			ColumnType::I16 => a.i16(n as i16),
			ColumnType::I32 => a.i32(n as i32),
			_ => a.i64(n),
		},
		ColumnValue::F32(f) => a.float(f),
	}
}

/// Replace the column whose marker sits at `column_marker_offset` with
/// an equivalent array, substituting `override_value` at `index`. The
/// returned value is the number of bytes the record grew or shrank by,
/// so callers tracking other cached offsets into the same record can
/// correct them.
///
/// `flatten` is set when this column is itself the sole element of a
/// record's unit-wrapped root array (spec.md §3 "Unit arrays"): the
/// wrapper already supplies the array framing, so the promoted values
/// are spliced in bare, without a second array marker/terminator of
/// their own, turning the wrapper directly into an N-element array
/// instead of nesting one more array inside it.
pub fn column_to_array(mf: &mut MemFile, column_marker_offset: usize, index: u32, override_value: ColumnValue, flatten: bool) -> Result<i64> {
	let (ty, class, values, span) = {
		let mut it = ColumnIt::open(mf, column_marker_offset)?;
		let ty = it.element_type();
		let class = it.class();
		let mut values = read_column_values(&mut it)?;
		if (index as usize) < values.len() {
			values[index as usize] = override_value;
		}
		let span = it.column_span()?;
		(ty, class, values, span)
	};

	let mut scratch = MemFile::open(Vec::new(), Mode::ReadWrite);
	if flatten {
		let mut a = Inserter::resume_array(&mut scratch, 0)?;
		for v in values {
			write_scalar(&mut a, ty, v)?;
		}
		a.abandon();
	} else {
		let mut a = Inserter::open_array(&mut scratch, 0, class)?;
		for v in values {
			write_scalar(&mut a, ty, v)?;
		}
		a.close()?;
	}
	let replacement = scratch.into_bytes();

	let (start, end) = span;
	let old_len = end - start;
	mf.seek(start)?;
	mf.inplace_remove(old_len)?;
	mf.seek(start)?;
	mf.inplace_insert(replacement.len())?;
	mf.seek(start)?;
	mf.write(&replacement)?;
	Ok(replacement.len() as i64 - old_len as i64)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::insert::ColumnInserter;
	use crate::iter::array::ArrayIt;
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
	fn promotion_preserves_order_and_applies_override() {
		let mut mf = build_u8_column(&[1, 2, 3], 4);
		column_to_array(&mut mf, 0, 1, ColumnValue::Bool(true), false).unwrap();
		let mut it = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(it.next().unwrap());
		assert_eq!(it.as_u64().unwrap(), 1);
		assert!(it.next().unwrap());
		assert!(it.as_bool().unwrap());
		assert!(it.next().unwrap());
		assert_eq!(it.as_u64().unwrap(), 3);
		assert!(!it.next().unwrap());
	}

	#[test]
	fn promotion_of_column_after_other_elements_shifts_nothing_before_it() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut outer = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			outer.true_().unwrap();
			{
				let mut col = outer.column(ColumnType::U8, 2).unwrap();
				col.push_u8(9).unwrap();
				col.close().unwrap();
			}
			outer.close().unwrap();
		}
		let mut outer = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(outer.next().unwrap());
		assert!(outer.as_bool().unwrap());
		assert!(outer.next().unwrap());
		let marker_offset = {
			let mut sub = outer.open_column().unwrap();
			sub.column_span().unwrap().0
		};
		drop(outer);
		column_to_array(&mut mf, marker_offset, 0, ColumnValue::Null, false).unwrap();
		let mut fresh = ArrayIt::open(&mut mf, 0).unwrap();
		assert!(fresh.next().unwrap());
		assert!(fresh.as_bool().unwrap());
		assert!(fresh.next().unwrap());
		let mut inner = fresh.open_array().unwrap();
		assert!(inner.next().unwrap());
		assert!(matches!(inner.field_type().unwrap(), crate::types::FieldType::Null));
	}

	#[test]
	fn flattened_promotion_merges_directly_into_the_wrapping_root_array() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut root = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			{
				let mut col = root.column(ColumnType::U8, 4).unwrap();
				col.push_u8(1).unwrap();
				col.push_u8(2).unwrap();
				col.push_u8(3).unwrap();
				col.push_u8(4).unwrap();
				col.close().unwrap();
			}
			root.close().unwrap();
		}
		let marker_offset = {
			let mut root = ArrayIt::open(&mut mf, 0).unwrap();
			assert!(root.next().unwrap());
			let mut col = root.open_column().unwrap();
			col.column_span().unwrap().0
		};
		column_to_array(&mut mf, marker_offset, 2, ColumnValue::Bool(true), true).unwrap();

		let mut root = ArrayIt::open(&mut mf, 0).unwrap();
		let mut seen = Vec::new();
		while root.next().unwrap() {
			seen.push(root.field_type().unwrap());
		}
		assert_eq!(seen.len(), 4, "the promoted values become the root array's own elements, not a nested array");
		assert!(matches!(seen[2], crate::types::FieldType::True));
	}
}
