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

//! The recursive "how big is the value starting here" walk shared by
//! every iterator, the path evaluator, and `pack()`.
//!
//! The iterators themselves only ever cache one offset: the start of
//! the slot they are positioned at. Advancing past it is always
//! recomputed from the bytes, rather than a parent iterator handing a
//! raw pointer to a child and trusting it to stay valid -- the
//! replacement for the source's raw-pointer parent/child aliasing
//! (spec.md §9 "Cyclic references in iterators").

use crate::error::{Error, Result};
use crate::memfile::MemFile;
use crate::types::{self, marker, ContainerKind, FieldType};

/// Advance `mf`'s cursor past the field whose marker byte sits at the
/// current cursor position, leaving the cursor just after the value.
pub fn skip_field(mf: &mut MemFile) -> Result<()> {
	let m = mf.read(1)?[0];
	match m {
		marker::NULL | marker::TRUE | marker::FALSE => Ok(()),
		marker::U8 | marker::I8 => {
			mf.read(1)?;
			Ok(())
		}
		marker::U16 | marker::I16 => {
			mf.read(2)?;
			Ok(())
		}
		marker::U32 | marker::I32 | marker::FLOAT32 => {
			mf.read(4)?;
			Ok(())
		}
		marker::U64 | marker::I64 => {
			mf.read(8)?;
			Ok(())
		}
		marker::STRING => {
			let len = mf.read_uintvar_stream()?;
			mf.read(len as usize)?;
			Ok(())
		}
		marker::BINARY => {
			let mime_len = mf.read_uintvar_stream()?;
			mf.read(mime_len as usize)?;
			let data_len = mf.read_uintvar_stream()?;
			mf.read(data_len as usize)?;
			Ok(())
		}
		marker::BINARY_CUSTOM => {
			let tag_len = mf.read_uintvar_stream()?;
			mf.read(tag_len as usize)?;
			let data_len = mf.read_uintvar_stream()?;
			mf.read(data_len as usize)?;
			Ok(())
		}
		_ => match types::container_kind(m)?.ok_or_else(|| Error::corrupted("unknown field marker", &[m]))? {
			ContainerKind::Array => skip_array_body(mf),
			ContainerKind::Object => skip_object_body(mf),
			ContainerKind::Column(ct) => {
				let capacity = {
					mf.read_uintvar_stream()?; // count
					mf.read_uintvar_stream()?
				};
				mf.read(capacity as usize * ct.width())?;
				Ok(())
			}
		},
	}
}

fn skip_array_body(mf: &mut MemFile) -> Result<()> {
	loop {
		let next = mf.peek(1)?[0];
		if next == marker::ARRAY_END {
			mf.read(1)?;
			return Ok(());
		}
		skip_field(mf)?;
	}
}

fn skip_object_body(mf: &mut MemFile) -> Result<()> {
	loop {
		let next = mf.peek(1)?[0];
		if next == marker::OBJECT_END {
			mf.read(1)?;
			return Ok(());
		}
		let name_len = mf.read_uintvar_stream()?;
		mf.read(name_len as usize)?;
		skip_field(mf)?;
	}
}

/// The exclusive end offset of the field starting at `start`, without
/// disturbing `mf`'s current cursor.
pub fn field_end(mf: &mut MemFile, start: usize) -> Result<usize> {
	mf.save_position();
	mf.seek(start)?;
	skip_field(mf)?;
	let end = mf.tell();
	mf.restore_position()?;
	Ok(end)
}

/// The field type of the marker at `pos`, without disturbing the cursor.
pub fn peek_field_type(mf: &MemFile, pos: usize) -> Result<FieldType> {
	let m = *mf.peek_at(pos, 1)?.first().unwrap();
	types::field_type(m)
}

/// Decode a stream VarInt at an arbitrary offset, without touching the cursor.
pub fn peek_stream_varint(mf: &MemFile, pos: usize) -> Result<(u64, usize)> {
	let available = mf.size().saturating_sub(pos).min(10);
	crate::varint::stream::decode(mf.peek_at(pos, available)?)
}
