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

//! Typed projection over a resolved dot-path.
//!
//! Grounded on `original_source/src/jak_carbon_find.c`: `find_open`
//! resolves a path and, on success, hands back typed accessors that
//! read the matched slot directly rather than re-walking the path for
//! every field access.

use crate::error::{Error, Result};
use crate::iter::array::ArrayIt;
use crate::iter::column::ColumnIt;
use crate::iter::object::ObjectIt;
use crate::memfile::MemFile;
use crate::path::{self, PathStatus, Resolved};
use crate::types::FieldType;

/// A resolved dot-path, positioned at the matched slot.
pub enum Find<'a> {
	Array(ArrayIt<'a>),
	Object(ObjectIt<'a>),
	Column(ColumnIt<'a>, u32),
}

impl<'a> Find<'a> {
	/// Parse and resolve `dot_path` against the record rooted at `root`.
	/// Returns the path status alongside the projection so a caller can
	/// distinguish "not found" from a hard error.
	pub fn open(mf: &'a mut MemFile, root: usize, dot_path: &str) -> Result<(PathStatus, Option<Find<'a>>)> {
		let segments = path::parse(dot_path)?;
		let (status, resolved) = path::evaluate(mf, root, &segments)?;
		if status != PathStatus::Resolved {
			return Ok((status, None));
		}
		let found = match resolved.expect("Resolved status always carries a Resolved value") {
			Resolved::Array { container, slot } => Find::Array(ArrayIt::at(mf, container, slot)?),
			Resolved::Object { container, name } => Find::Object(ObjectIt::at(mf, container, name)?),
			Resolved::Column { container, index } => Find::Column(ColumnIt::open(mf, container)?, index),
		};
		Ok((PathStatus::Resolved, Some(found)))
	}

	pub fn field_type(&mut self) -> Result<FieldType> {
		match self {
			Find::Array(it) => it.field_type(),
			Find::Object(it) => it.prop_type(),
			Find::Column(it, idx) => column_field_type(it, *idx),
		}
	}

	pub fn is_null(&mut self) -> Result<bool> {
		Ok(match self {
			Find::Array(it) => matches!(it.field_type()?, FieldType::Null),
			Find::Object(it) => matches!(it.prop_type()?, FieldType::Null),
			Find::Column(it, idx) => it.is_null(*idx)?,
		})
	}

	pub fn as_bool(&mut self) -> Result<bool> {
		match self {
			Find::Array(it) => it.as_bool(),
			Find::Object(it) => it.as_bool(),
			Find::Column(it, idx) => {
				reject_null(it, *idx)?;
				it.as_bool(*idx)
			}
		}
	}

	pub fn as_u64(&mut self) -> Result<u64> {
		match self {
			Find::Array(it) => it.as_u64(),
			Find::Object(it) => it.as_u64(),
			Find::Column(it, idx) => {
				reject_null(it, *idx)?;
				it.as_u64(*idx)
			}
		}
	}

	pub fn as_i64(&mut self) -> Result<i64> {
		match self {
			Find::Array(it) => it.as_i64(),
			Find::Object(it) => it.as_i64(),
			Find::Column(it, idx) => {
				reject_null(it, *idx)?;
				it.as_i64(*idx)
			}
		}
	}

	pub fn as_f32(&mut self) -> Result<f32> {
		match self {
			Find::Array(it) => it.as_f32(),
			Find::Object(it) => it.as_f32(),
			Find::Column(it, idx) => {
				reject_null(it, *idx)?;
				it.as_f32(*idx)
			}
		}
	}

	pub fn as_str(&mut self) -> Result<String> {
		match self {
			Find::Array(it) => it.as_str(),
			Find::Object(it) => it.as_str(),
			Find::Column(..) => Err(Error::TypeMismatch { expected: "string", found: "column element" }),
		}
	}

	pub fn open_array(&mut self) -> Result<ArrayIt<'_>> {
		match self {
			Find::Array(it) => it.open_array(),
			Find::Object(it) => it.open_array(),
			Find::Column(..) => Err(Error::UnsupportedContainer("column elements are scalar")),
		}
	}

	pub fn open_object(&mut self) -> Result<ObjectIt<'_>> {
		match self {
			Find::Array(it) => it.open_object(),
			Find::Object(it) => it.open_object(),
			Find::Column(..) => Err(Error::UnsupportedContainer("column elements are scalar")),
		}
	}

	pub fn open_column(&mut self) -> Result<ColumnIt<'_>> {
		match self {
			Find::Array(it) => it.open_column(),
			Find::Object(it) => it.open_column(),
			Find::Column(..) => Err(Error::UnsupportedContainer("a column element is not itself a container")),
		}
	}
}

fn column_field_type(it: &mut ColumnIt<'_>, idx: u32) -> Result<FieldType> {
	use crate::types::ColumnType;
	if it.is_null(idx)? {
		return Ok(FieldType::Null);
	}
	Ok(match it.element_type() {
		ColumnType::U8 => FieldType::U8,
		ColumnType::U16 => FieldType::U16,
		ColumnType::U32 => FieldType::U32,
		ColumnType::U64 => FieldType::U64,
		ColumnType::I8 => FieldType::I8,
		ColumnType::I16 => FieldType::I16,
		ColumnType::I32 => FieldType::I32,
		ColumnType::I64 => FieldType::I64,
		ColumnType::Float32 => FieldType::Float32,
		ColumnType::Bool => {
			if it.as_bool(idx)? {
				FieldType::True
			} else {
				FieldType::False
			}
		}
	})
}

fn reject_null(it: &mut ColumnIt<'_>, idx: u32) -> Result<()> {
	if it.is_null(idx)? {
		return Err(Error::IllegalState("column element is null"));
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::insert::Inserter;
	use crate::memfile::Mode;
	use crate::types::{ColumnType, BASE_LIST_CLASS};

	fn record() -> MemFile {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut root = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			{
				let mut obj = root.object().unwrap();
				{
					let mut v = obj.key("a").unwrap();
					v.u8(1).unwrap();
				}
				{
					let mut v = obj.key("b").unwrap();
					let mut arr = v.array().unwrap();
					arr.true_().unwrap();
					arr.false_().unwrap();
					arr.null().unwrap();
					arr.close().unwrap();
				}
				{
					let mut v = obj.key("c").unwrap();
					let mut col = v.column(ColumnType::U8, 3).unwrap();
					col.push_u8(10).unwrap();
					col.push_u8(0xff).unwrap();
					col.push_u8(30).unwrap();
					col.close().unwrap();
				}
				obj.close().unwrap();
			}
			root.close().unwrap();
		}
		mf
	}

	#[test]
	fn finds_scalar_object_property() {
		let mut mf = record();
		let (status, found) = Find::open(&mut mf, 0, "a").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(found.unwrap().as_u64().unwrap(), 1);
	}

	#[test]
	fn finds_array_element_by_index() {
		let mut mf = record();
		let (status, found) = Find::open(&mut mf, 0, "b.[0]").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert!(found.unwrap().as_bool().unwrap());
	}

	#[test]
	fn column_element_reports_null_sentinel() {
		let mut mf = record();
		let (_, found) = Find::open(&mut mf, 0, "c.[1]").unwrap();
		let mut found = found.unwrap();
		assert!(found.is_null().unwrap());
		assert!(found.as_u64().is_err());
	}

	#[test]
	fn column_non_null_element_reads_through() {
		let mut mf = record();
		let (_, found) = Find::open(&mut mf, 0, "c.[2]").unwrap();
		let mut found = found.unwrap();
		assert!(!found.is_null().unwrap());
		assert_eq!(found.as_u64().unwrap(), 30);
	}

	fn bare_column_record() -> MemFile {
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
		mf
	}

	#[test]
	fn bare_column_payload_is_reachable_by_plain_index() {
		let mut mf = bare_column_record();
		let (status, found) = Find::open(&mut mf, 0, "[0]").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(found.unwrap().as_u64().unwrap(), 1);

		let (status, found) = Find::open(&mut mf, 0, "[3]").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(found.unwrap().as_u64().unwrap(), 4);
	}

	#[test]
	fn missing_path_reports_status_without_error() {
		let mut mf = record();
		let (status, found) = Find::open(&mut mf, 0, "nope").unwrap();
		assert_eq!(status, PathStatus::NoSuchKey);
		assert!(found.is_none());
	}
}
