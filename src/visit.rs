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

//! The seam a printer plugs into.
//!
//! Grounded on `original_source/src/ark-js/carbon/carbon-printers.c`,
//! which drives pretty/compact printing entirely through
//! `carbon_array_it_*`/`carbon_object_it_*`/`carbon_find_*` calls with
//! no private access to the underlying bytes. Printers themselves are
//! out of scope here; `Visit` is just the trait they would implement,
//! and `walk_array`/`walk_object`/`walk_column` is the driver that
//! descends a record and calls it -- built only on the iterators in
//! `crate::iter`, never on raw byte offsets.

use crate::error::Result;
use crate::iter::array::ArrayIt;
use crate::iter::column::ColumnIt;
use crate::iter::object::ObjectIt;
use crate::memfile::MemFile;
use crate::scalar;
use crate::types::{AbstractClass, ColumnType, FieldType};

pub trait Visit {
	fn visit_null(&mut self);
	fn visit_bool(&mut self, v: bool);
	fn visit_u64(&mut self, v: u64);
	fn visit_i64(&mut self, v: i64);
	fn visit_f32(&mut self, v: f32);
	fn visit_str(&mut self, v: &str);
	fn visit_binary(&mut self, mime: Option<&str>, v: &[u8]);
	fn enter_array(&mut self, class: AbstractClass, unit: bool);
	fn exit_array(&mut self);
	fn enter_object(&mut self, class: AbstractClass);
	fn exit_object(&mut self);
}

/// Descend the array at `at`, calling `visitor` for every slot
/// encountered. The entry point for walking a record's root payload.
pub fn walk_array(mf: &mut MemFile, at: usize, visitor: &mut dyn Visit) -> Result<()> {
	let (class, unit) = {
		let mut it = ArrayIt::open(mf, at)?;
		(it.class(), it.is_unit()?)
	};
	visitor.enter_array(class, unit);
	let mut slots = Vec::new();
	{
		let mut it = ArrayIt::open(mf, at)?;
		while it.next()? {
			slots.push((it.slot_offset()?, it.field_type()?));
		}
	}
	for (slot, field_type) in slots {
		visit_field(mf, slot, field_type, visitor)?;
	}
	visitor.exit_array();
	Ok(())
}

pub fn walk_object(mf: &mut MemFile, at: usize, visitor: &mut dyn Visit) -> Result<()> {
	let class = ObjectIt::open(mf, at)?.class();
	visitor.enter_object(class);
	let mut props = Vec::new();
	{
		let mut it = ObjectIt::open(mf, at)?;
		while it.next()? {
			props.push((it.prop_value_offset()?, it.prop_type()?));
		}
	}
	for (value_offset, field_type) in props {
		visit_field(mf, value_offset, field_type, visitor)?;
	}
	visitor.exit_object();
	Ok(())
}

fn visit_field(mf: &mut MemFile, at: usize, field_type: FieldType, visitor: &mut dyn Visit) -> Result<()> {
	match field_type {
		FieldType::Null => visitor.visit_null(),
		FieldType::True => visitor.visit_bool(true),
		FieldType::False => visitor.visit_bool(false),
		FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => {
			visitor.visit_u64(scalar::as_u64(mf, at)?)
		}
		FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 => {
			visitor.visit_i64(scalar::as_i64(mf, at)?)
		}
		FieldType::Float32 => visitor.visit_f32(scalar::as_f32(mf, at)?),
		FieldType::String => visitor.visit_str(&scalar::as_str(mf, at)?),
		FieldType::Binary => {
			let (mime, data) = scalar::as_binary(mf, at)?;
			visitor.visit_binary(Some(&mime), &data);
		}
		FieldType::BinaryCustom => {
			let (tag, data) = scalar::as_binary(mf, at)?;
			visitor.visit_binary(Some(&tag), &data);
		}
		FieldType::Array(_) => walk_array(mf, at, visitor)?,
		FieldType::Object(_) => walk_object(mf, at, visitor)?,
		FieldType::Column(ty, class) => walk_column(mf, at, ty, class, visitor)?,
	}
	Ok(())
}

fn walk_column(mf: &mut MemFile, at: usize, ty: ColumnType, class: AbstractClass, visitor: &mut dyn Visit) -> Result<()> {
	visitor.enter_array(class, false);
	let mut it = ColumnIt::open(mf, at)?;
	let (count, _) = it.values_info()?;
	for i in 0..count {
		if it.is_null(i)? {
			visitor.visit_null();
			continue;
		}
		match ty {
			ColumnType::U8 | ColumnType::U16 | ColumnType::U32 | ColumnType::U64 => visitor.visit_u64(it.as_u64(i)?),
			ColumnType::I8 | ColumnType::I16 | ColumnType::I32 | ColumnType::I64 => visitor.visit_i64(it.as_i64(i)?),
			ColumnType::Float32 => visitor.visit_f32(it.as_f32(i)?),
			ColumnType::Bool => visitor.visit_bool(it.as_bool(i)?),
		}
	}
	visitor.exit_array();
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::insert::Inserter;
	use crate::memfile::Mode;
	use crate::types::BASE_LIST_CLASS;

	#[derive(Default)]
	struct Recorder {
		events: Vec<String>,
	}

	impl Visit for Recorder {
		fn visit_null(&mut self) {
			self.events.push("null".into());
		}
		fn visit_bool(&mut self, v: bool) {
			self.events.push(format!("bool:{}", v));
		}
		fn visit_u64(&mut self, v: u64) {
			self.events.push(format!("u64:{}", v));
		}
		fn visit_i64(&mut self, v: i64) {
			self.events.push(format!("i64:{}", v));
		}
		fn visit_f32(&mut self, v: f32) {
			self.events.push(format!("f32:{}", v));
		}
		fn visit_str(&mut self, v: &str) {
			self.events.push(format!("str:{}", v));
		}
		fn visit_binary(&mut self, mime: Option<&str>, v: &[u8]) {
			self.events.push(format!("binary:{:?}:{}", mime, v.len()));
		}
		fn enter_array(&mut self, _class: AbstractClass, unit: bool) {
			self.events.push(format!("enter_array:{}", unit));
		}
		fn exit_array(&mut self) {
			self.events.push("exit_array".into());
		}
		fn enter_object(&mut self, _class: AbstractClass) {
			self.events.push("enter_object".into());
		}
		fn exit_object(&mut self) {
			self.events.push("exit_object".into());
		}
	}

	#[test]
	fn walks_mixed_record_in_order() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut root = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			root.u8(1).unwrap();
			{
				let mut col = root.column(ColumnType::Bool, 2).unwrap();
				col.push_bool(true).unwrap();
				col.push_bool(false).unwrap();
				col.close().unwrap();
			}
			root.close().unwrap();
		}
		let mut recorder = Recorder::default();
		walk_array(&mut mf, 0, &mut recorder).unwrap();
		assert_eq!(
			recorder.events,
			vec![
				"enter_array:false".to_string(),
				"u64:1".to_string(),
				"enter_array:false".to_string(),
				"bool:true".to_string(),
				"bool:false".to_string(),
				"exit_array".to_string(),
				"exit_array".to_string(),
			]
		);
	}
}
