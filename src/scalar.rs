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

//! Scalar field reads keyed only by a marker offset.
//!
//! `ArrayIt`/`ObjectIt`'s typed accessors delegate here once they've
//! resolved their current position to an absolute offset; `visit::walk`
//! also calls these directly since it has no positioned iterator of its
//! own to hand a slot to, only the offset the outer walk already read.

use std::convert::TryInto;

use crate::error::{Error, Result};
use crate::layout;
use crate::memfile::MemFile;
use crate::types::marker;

fn marker_byte(mf: &MemFile, at: usize) -> Result<u8> {
	Ok(*mf.peek_at(at, 1)?.first().unwrap())
}

pub fn as_bool(mf: &MemFile, at: usize) -> Result<bool> {
	match marker_byte(mf, at)? {
		marker::TRUE => Ok(true),
		marker::FALSE => Ok(false),
		_ => Err(Error::TypeMismatch { expected: "bool", found: "non-bool field" }),
	}
}

pub fn as_u64(mf: &MemFile, at: usize) -> Result<u64> {
	Ok(match marker_byte(mf, at)? {
		marker::U8 => mf.peek_at(at + 1, 1)?[0] as u64,
		marker::U16 => u16::from_le_bytes(mf.peek_at(at + 1, 2)?.try_into().unwrap()) as u64,
		marker::U32 => u32::from_le_bytes(mf.peek_at(at + 1, 4)?.try_into().unwrap()) as u64,
		marker::U64 => u64::from_le_bytes(mf.peek_at(at + 1, 8)?.try_into().unwrap()),
		_ => return Err(Error::TypeMismatch { expected: "unsigned integer", found: "other field" }),
	})
}

pub fn as_i64(mf: &MemFile, at: usize) -> Result<i64> {
	Ok(match marker_byte(mf, at)? {
		marker::I8 => mf.peek_at(at + 1, 1)?[0] as i8 as i64,
		marker::I16 => i16::from_le_bytes(mf.peek_at(at + 1, 2)?.try_into().unwrap()) as i64,
		marker::I32 => i32::from_le_bytes(mf.peek_at(at + 1, 4)?.try_into().unwrap()) as i64,
		marker::I64 => i64::from_le_bytes(mf.peek_at(at + 1, 8)?.try_into().unwrap()),
		_ => return Err(Error::TypeMismatch { expected: "signed integer", found: "other field" }),
	})
}

pub fn as_f32(mf: &MemFile, at: usize) -> Result<f32> {
	match marker_byte(mf, at)? {
		marker::FLOAT32 => Ok(f32::from_le_bytes(mf.peek_at(at + 1, 4)?.try_into().unwrap())),
		_ => Err(Error::TypeMismatch { expected: "float32", found: "other field" }),
	}
}

pub fn as_str(mf: &MemFile, at: usize) -> Result<String> {
	if marker_byte(mf, at)? != marker::STRING {
		return Err(Error::TypeMismatch { expected: "string", found: "other field" });
	}
	let (len, len_size) = layout::peek_stream_varint(mf, at + 1)?;
	let bytes = mf.peek_at(at + 1 + len_size, len as usize)?;
	std::str::from_utf8(bytes).map(|s| s.to_string()).map_err(|_| Error::corrupted("string field is not valid utf-8", bytes))
}

pub fn as_binary(mf: &MemFile, at: usize) -> Result<(String, Vec<u8>)> {
	if marker_byte(mf, at)? != marker::BINARY {
		return Err(Error::TypeMismatch { expected: "binary", found: "other field" });
	}
	let mut cursor = at + 1;
	let (mime_len, n) = layout::peek_stream_varint(mf, cursor)?;
	cursor += n;
	let mime = std::str::from_utf8(mf.peek_at(cursor, mime_len as usize)?).unwrap_or("").to_string();
	cursor += mime_len as usize;
	let (data_len, n2) = layout::peek_stream_varint(mf, cursor)?;
	cursor += n2;
	Ok((mime, mf.peek_at(cursor, data_len as usize)?.to_vec()))
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::insert::Inserter;
	use crate::memfile::Mode;
	use crate::types::BASE_LIST_CLASS;

	#[test]
	fn reads_scalars_at_an_arbitrary_offset() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		{
			let mut a = Inserter::open_array(&mut mf, 0, BASE_LIST_CLASS).unwrap();
			a.u8(9).unwrap();
			a.true_().unwrap();
			a.string("hi").unwrap();
			a.close().unwrap();
		}
		assert_eq!(as_u64(&mf, 1).unwrap(), 9);
		assert!(as_bool(&mf, 3).unwrap());
		assert_eq!(as_str(&mf, 4).unwrap(), "hi");
	}
}
