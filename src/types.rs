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

//! The marker alphabet: one byte in front of every array slot and
//! object property that names both its concrete type and, for
//! containers, its abstract-type class.
//!
//! The byte layout is this port's own closed alphabet (spec.md §6 only
//! requires that ports "pin them to stable values"; it does not dictate
//! the numbers). Containers are laid out as `base + class_offset`, where
//! `class_offset` is 0..=3, so `derive`/`abstract_class`/`container_kind`
//! are simple arithmetic rather than table lookups.
//!
//! `original_source/src/jakson/carbon/jak_carbon_revise.c` confirms
//! (via its exhaustive `switch` over `CARBON_FIELD_*` constants) that
//! every container kind -- the array, each of the ten column types, and
//! the object -- carries all four of its class's marker variants; this
//! port follows that shape rather than spec.md §6's rough "sixteen
//! list-container markers" paraphrase.

use crate::error::{Error, Result};

pub mod marker {
	pub const NULL: u8 = 0x00;
	pub const TRUE: u8 = 0x01;
	pub const FALSE: u8 = 0x02;
	pub const STRING: u8 = 0x03;
	pub const U8: u8 = 0x10;
	pub const U16: u8 = 0x11;
	pub const U32: u8 = 0x12;
	pub const U64: u8 = 0x13;
	pub const I8: u8 = 0x14;
	pub const I16: u8 = 0x15;
	pub const I32: u8 = 0x16;
	pub const I64: u8 = 0x17;
	pub const FLOAT32: u8 = 0x18;
	pub const BINARY: u8 = 0x19;
	pub const BINARY_CUSTOM: u8 = 0x1a;

	pub const ARRAY_BASE: u8 = 0x20;
	pub const OBJECT_BASE: u8 = 0x30;
	pub const COLUMN_U8_BASE: u8 = 0x40;
	pub const COLUMN_U16_BASE: u8 = 0x44;
	pub const COLUMN_U32_BASE: u8 = 0x48;
	pub const COLUMN_U64_BASE: u8 = 0x4c;
	pub const COLUMN_I8_BASE: u8 = 0x50;
	pub const COLUMN_I16_BASE: u8 = 0x54;
	pub const COLUMN_I32_BASE: u8 = 0x58;
	pub const COLUMN_I64_BASE: u8 = 0x5c;
	pub const COLUMN_FLOAT32_BASE: u8 = 0x60;
	pub const COLUMN_BOOL_BASE: u8 = 0x64;

	pub const ARRAY_END: u8 = 0x70;
	pub const OBJECT_END: u8 = 0x71;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
	U8,
	U16,
	U32,
	U64,
	I8,
	I16,
	I32,
	I64,
	Float32,
	Bool,
}

impl ColumnType {
	pub fn width(self) -> usize {
		match self {
			ColumnType::U8 | ColumnType::I8 | ColumnType::Bool => 1,
			ColumnType::U16 | ColumnType::I16 => 2,
			ColumnType::U32 | ColumnType::I32 | ColumnType::Float32 => 4,
			ColumnType::U64 | ColumnType::I64 => 8,
		}
	}

	fn base(self) -> u8 {
		match self {
			ColumnType::U8 => marker::COLUMN_U8_BASE,
			ColumnType::U16 => marker::COLUMN_U16_BASE,
			ColumnType::U32 => marker::COLUMN_U32_BASE,
			ColumnType::U64 => marker::COLUMN_U64_BASE,
			ColumnType::I8 => marker::COLUMN_I8_BASE,
			ColumnType::I16 => marker::COLUMN_I16_BASE,
			ColumnType::I32 => marker::COLUMN_I32_BASE,
			ColumnType::I64 => marker::COLUMN_I64_BASE,
			ColumnType::Float32 => marker::COLUMN_FLOAT32_BASE,
			ColumnType::Bool => marker::COLUMN_BOOL_BASE,
		}
	}

	fn from_base(base: u8) -> Option<ColumnType> {
		match base {
			marker::COLUMN_U8_BASE => Some(ColumnType::U8),
			marker::COLUMN_U16_BASE => Some(ColumnType::U16),
			marker::COLUMN_U32_BASE => Some(ColumnType::U32),
			marker::COLUMN_U64_BASE => Some(ColumnType::U64),
			marker::COLUMN_I8_BASE => Some(ColumnType::I8),
			marker::COLUMN_I16_BASE => Some(ColumnType::I16),
			marker::COLUMN_I32_BASE => Some(ColumnType::I32),
			marker::COLUMN_I64_BASE => Some(ColumnType::I64),
			marker::COLUMN_FLOAT32_BASE => Some(ColumnType::Float32),
			marker::COLUMN_BOOL_BASE => Some(ColumnType::Bool),
			_ => None,
		}
	}

	/// Per-width null sentinel used by column scalar accessors (spec.md §4.6).
	pub fn null_sentinel(self) -> [u8; 8] {
		match self {
			ColumnType::U8 => [0xff, 0, 0, 0, 0, 0, 0, 0],
			ColumnType::U16 => [0xff, 0xff, 0, 0, 0, 0, 0, 0],
			ColumnType::U32 => [0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0],
			ColumnType::U64 => [0xff; 8],
			ColumnType::I8 => [0x80, 0, 0, 0, 0, 0, 0, 0],
			ColumnType::I16 => i16::MIN.to_le_bytes_8(),
			ColumnType::I32 => i32::MIN.to_le_bytes_8(),
			ColumnType::I64 => i64::MIN.to_le_bytes_8(),
			ColumnType::Float32 => f32::NAN.to_le_bytes_8(),
			ColumnType::Bool => [0x02, 0, 0, 0, 0, 0, 0, 0],
		}
	}
}

trait ToLeBytes8 {
	fn to_le_bytes_8(self) -> [u8; 8];
}
impl ToLeBytes8 for i16 {
	fn to_le_bytes_8(self) -> [u8; 8] {
		let b = self.to_le_bytes();
		[b[0], b[1], 0, 0, 0, 0, 0, 0]
	}
}
impl ToLeBytes8 for i32 {
	fn to_le_bytes_8(self) -> [u8; 8] {
		let b = self.to_le_bytes();
		[b[0], b[1], b[2], b[3], 0, 0, 0, 0]
	}
}
impl ToLeBytes8 for i64 {
	fn to_le_bytes_8(self) -> [u8; 8] {
		self.to_le_bytes()
	}
}
impl ToLeBytes8 for f32 {
	fn to_le_bytes_8(self) -> [u8; 8] {
		let b = self.to_le_bytes();
		[b[0], b[1], b[2], b[3], 0, 0, 0, 0]
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
	Array,
	Object,
	Column(ColumnType),
}

/// The semantic refinement of a container, independent of its kind.
/// List containers (array, column-of-T) use the first four variants;
/// object containers use the last four. `is_base` / `derive` enforce
/// that a marker never mixes the two families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractClass {
	UnsortedMultiset,
	SortedMultiset,
	UnsortedSet,
	SortedSet,
	UnsortedMultimap,
	SortedMultimap,
	UnsortedMap,
	SortedMap,
}

impl AbstractClass {
	fn list_offset(self) -> Option<u8> {
		match self {
			AbstractClass::UnsortedMultiset => Some(0),
			AbstractClass::SortedMultiset => Some(1),
			AbstractClass::UnsortedSet => Some(2),
			AbstractClass::SortedSet => Some(3),
			_ => None,
		}
	}

	fn object_offset(self) -> Option<u8> {
		match self {
			AbstractClass::UnsortedMultimap => Some(0),
			AbstractClass::SortedMultimap => Some(1),
			AbstractClass::UnsortedMap => Some(2),
			AbstractClass::SortedMap => Some(3),
			_ => None,
		}
	}

	fn from_list_offset(offset: u8) -> AbstractClass {
		match offset {
			0 => AbstractClass::UnsortedMultiset,
			1 => AbstractClass::SortedMultiset,
			2 => AbstractClass::UnsortedSet,
			_ => AbstractClass::SortedSet,
		}
	}

	fn from_object_offset(offset: u8) -> AbstractClass {
		match offset {
			0 => AbstractClass::UnsortedMultimap,
			1 => AbstractClass::SortedMultimap,
			2 => AbstractClass::UnsortedMap,
			_ => AbstractClass::SortedMap,
		}
	}

	/// Whether duplicate keys/elements are forbidden in a committed
	/// container of this class (spec.md §9 open-question resolution:
	/// only the plain `sorted-map`/`sorted-set` classes reject dupes).
	pub fn rejects_duplicates(self) -> bool {
		matches!(self, AbstractClass::SortedSet | AbstractClass::SortedMap)
	}

	pub fn is_sorted(self) -> bool {
		matches!(
			self,
			AbstractClass::SortedMultiset
				| AbstractClass::SortedSet
				| AbstractClass::SortedMultimap
				| AbstractClass::SortedMap
		)
	}
}

/// Default ("base") refinement for list containers.
pub const BASE_LIST_CLASS: AbstractClass = AbstractClass::UnsortedMultiset;
/// Default ("base") refinement for object containers.
pub const BASE_OBJECT_CLASS: AbstractClass = AbstractClass::UnsortedMultimap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
	Null,
	True,
	False,
	String,
	U8,
	U16,
	U32,
	U64,
	I8,
	I16,
	I32,
	I64,
	Float32,
	Binary,
	BinaryCustom,
	Array(AbstractClass),
	Object(AbstractClass),
	Column(ColumnType, AbstractClass),
}

/// The kind of container a marker names, regardless of class. Returns
/// `None` for scalar markers.
pub fn container_kind(m: u8) -> Result<Option<ContainerKind>> {
	if (marker::ARRAY_BASE..marker::ARRAY_BASE + 4).contains(&m) {
		return Ok(Some(ContainerKind::Array));
	}
	if (marker::OBJECT_BASE..marker::OBJECT_BASE + 4).contains(&m) {
		return Ok(Some(ContainerKind::Object));
	}
	for &base in &[
		marker::COLUMN_U8_BASE,
		marker::COLUMN_U16_BASE,
		marker::COLUMN_U32_BASE,
		marker::COLUMN_U64_BASE,
		marker::COLUMN_I8_BASE,
		marker::COLUMN_I16_BASE,
		marker::COLUMN_I32_BASE,
		marker::COLUMN_I64_BASE,
		marker::COLUMN_FLOAT32_BASE,
		marker::COLUMN_BOOL_BASE,
	] {
		if (base..base + 4).contains(&m) {
			return Ok(Some(ContainerKind::Column(ColumnType::from_base(base).unwrap())));
		}
	}
	match m {
		marker::NULL
		| marker::TRUE
		| marker::FALSE
		| marker::STRING
		| marker::U8
		| marker::U16
		| marker::U32
		| marker::U64
		| marker::I8
		| marker::I16
		| marker::I32
		| marker::I64
		| marker::FLOAT32
		| marker::BINARY
		| marker::BINARY_CUSTOM => Ok(None),
		_ => Err(Error::corrupted("unknown field marker", &[m])),
	}
}

pub fn is_traversable(m: u8) -> Result<bool> {
	Ok(container_kind(m)?.is_some())
}

pub fn abstract_class(m: u8) -> Result<AbstractClass> {
	match container_kind(m)?.ok_or_else(|| Error::UnsupportedContainer("marker is not a container"))? {
		ContainerKind::Array => Ok(AbstractClass::from_list_offset(m - marker::ARRAY_BASE)),
		ContainerKind::Object => Ok(AbstractClass::from_object_offset(m - marker::OBJECT_BASE)),
		ContainerKind::Column(ct) => Ok(AbstractClass::from_list_offset(m - ct.base())),
	}
}

pub fn is_base(m: u8) -> Result<bool> {
	let class = abstract_class(m)?;
	Ok(class == BASE_LIST_CLASS || class == BASE_OBJECT_CLASS)
}

/// The canonical marker byte for `kind` refined to `class`. Errors if
/// `class` belongs to the wrong family (e.g. a map class on an array).
pub fn derive(kind: ContainerKind, class: AbstractClass) -> Result<u8> {
	match kind {
		ContainerKind::Array => class
			.list_offset()
			.map(|o| marker::ARRAY_BASE + o)
			.ok_or(Error::IllegalOperation("object abstract class applied to an array")),
		ContainerKind::Column(ct) => class
			.list_offset()
			.map(|o| ct.base() + o)
			.ok_or(Error::IllegalOperation("object abstract class applied to a column")),
		ContainerKind::Object => class
			.object_offset()
			.map(|o| marker::OBJECT_BASE + o)
			.ok_or(Error::IllegalOperation("list abstract class applied to an object")),
	}
}

pub fn field_type(m: u8) -> Result<FieldType> {
	Ok(match m {
		marker::NULL => FieldType::Null,
		marker::TRUE => FieldType::True,
		marker::FALSE => FieldType::False,
		marker::STRING => FieldType::String,
		marker::U8 => FieldType::U8,
		marker::U16 => FieldType::U16,
		marker::U32 => FieldType::U32,
		marker::U64 => FieldType::U64,
		marker::I8 => FieldType::I8,
		marker::I16 => FieldType::I16,
		marker::I32 => FieldType::I32,
		marker::I64 => FieldType::I64,
		marker::FLOAT32 => FieldType::Float32,
		marker::BINARY => FieldType::Binary,
		marker::BINARY_CUSTOM => FieldType::BinaryCustom,
		_ => match container_kind(m)?.ok_or_else(|| Error::corrupted("unknown field marker", &[m]))? {
			ContainerKind::Array => FieldType::Array(abstract_class(m)?),
			ContainerKind::Object => FieldType::Object(abstract_class(m)?),
			ContainerKind::Column(ct) => FieldType::Column(ct, abstract_class(m)?),
		},
	})
}

pub fn is_string(t: FieldType) -> bool {
	matches!(t, FieldType::String)
}
pub fn is_integer(t: FieldType) -> bool {
	matches!(
		t,
		FieldType::U8
			| FieldType::U16 | FieldType::U32
			| FieldType::U64 | FieldType::I8
			| FieldType::I16 | FieldType::I32
			| FieldType::I64
	)
}
pub fn is_unsigned(t: FieldType) -> bool {
	matches!(t, FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64)
}
pub fn is_signed(t: FieldType) -> bool {
	matches!(t, FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64)
}
pub fn is_float(t: FieldType) -> bool {
	matches!(t, FieldType::Float32)
}
pub fn is_number(t: FieldType) -> bool {
	is_integer(t) || is_float(t)
}
pub fn is_boolean(t: FieldType) -> bool {
	matches!(t, FieldType::True | FieldType::False)
}
pub fn is_null(t: FieldType) -> bool {
	matches!(t, FieldType::Null)
}
pub fn is_binary(t: FieldType) -> bool {
	matches!(t, FieldType::Binary | FieldType::BinaryCustom)
}
pub fn is_array(t: FieldType) -> bool {
	matches!(t, FieldType::Array(_))
}
pub fn is_object(t: FieldType) -> bool {
	matches!(t, FieldType::Object(_))
}
pub fn is_column(t: FieldType) -> bool {
	matches!(t, FieldType::Column(..))
}
