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

//! Two coexisting variable-length unsigned integer encodings.
//!
//! `stream` is the classic continuation-bit, little-endian LEB128 shape:
//! compact, but a reader must inspect every byte before it knows the
//! encoded length. `marker` trades space for random-access-friendly
//! rewrites: a single leading byte in `{c, d, i, l}` names the width of
//! the fixed payload that follows, so `update_in_place` can grow or
//! shrink a value without touching neighbouring bytes unless the width
//! class itself changes.

use std::convert::TryInto;

use crate::error::{Error, Result};

pub mod stream {
	use super::*;

	/// Encode `value` as a stream VarInt: 7 payload bits per byte, high
	/// bit set on every byte but the last.
	pub fn encode(value: u64) -> Vec<u8> {
		let mut out = Vec::with_capacity(size_of(value));
		let mut v = value;
		loop {
			let mut byte = (v & 0x7f) as u8;
			v >>= 7;
			if v != 0 {
				byte |= 0x80;
				out.push(byte);
			} else {
				out.push(byte);
				break;
			}
		}
		out
	}

	/// Decode a stream VarInt from the front of `bytes`, returning the
	/// value and the number of bytes consumed.
	pub fn decode(bytes: &[u8]) -> Result<(u64, usize)> {
		let mut value: u64 = 0;
		let mut shift: u32 = 0;
		for (i, &byte) in bytes.iter().enumerate() {
			if shift >= 64 {
				return Err(Error::corrupted("stream varint overflow", bytes));
			}
			let payload = (byte & 0x7f) as u64;
			value |= payload.checked_shl(shift).ok_or_else(|| {
				Error::corrupted("stream varint overflow", bytes)
			})?;
			if byte & 0x80 == 0 {
				return Ok((value, i + 1));
			}
			shift += 7;
		}
		Err(Error::corrupted("truncated stream varint", bytes))
	}

	/// Minimum number of bytes `encode(value)` would produce.
	pub fn size_of(value: u64) -> usize {
		let mut v = value;
		let mut n = 1;
		while v >= 0x80 {
			v >>= 7;
			n += 1;
		}
		n
	}

	/// Re-encode `new_value` in place of an existing stream VarInt that
	/// was `old_len` bytes long, returning the signed byte shift the
	/// caller must apply to every cursor positioned after the edit.
	pub fn update_in_place(old_len: usize, new_value: u64) -> (Vec<u8>, i64) {
		let encoded = encode(new_value);
		let shift = encoded.len() as i64 - old_len as i64;
		(encoded, shift)
	}
}

pub mod marker {
	use super::*;

	pub const MARKER_8: u8 = b'c';
	pub const MARKER_16: u8 = b'd';
	pub const MARKER_32: u8 = b'i';
	pub const MARKER_64: u8 = b'l';

	/// Smallest marker width that can hold `value`.
	pub fn width_for(value: u64) -> u8 {
		if value <= u8::MAX as u64 {
			MARKER_8
		} else if value <= u16::MAX as u64 {
			MARKER_16
		} else if value <= u32::MAX as u64 {
			MARKER_32
		} else {
			MARKER_64
		}
	}

	pub fn payload_len(width: u8) -> Result<usize> {
		match width {
			MARKER_8 => Ok(1),
			MARKER_16 => Ok(2),
			MARKER_32 => Ok(4),
			MARKER_64 => Ok(8),
			_ => Err(Error::corrupted("unknown marker-varint width byte", &[width])),
		}
	}

	/// Encode `value` with the smallest width class that fits it:
	/// `[width_byte][payload...]`.
	pub fn encode(value: u64) -> Vec<u8> {
		let width = width_for(value);
		let mut out = vec![width];
		match width {
			MARKER_8 => out.push(value as u8),
			MARKER_16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
			MARKER_32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
			MARKER_64 => out.extend_from_slice(&value.to_le_bytes()),
			_ => unreachable!(),
		}
		out
	}

	/// Decode a marker VarInt from the front of `bytes`, returning the
	/// value and total bytes consumed (width byte + payload).
	pub fn decode(bytes: &[u8]) -> Result<(u64, usize)> {
		let width = *bytes.first().ok_or_else(|| Error::corrupted("truncated marker varint", bytes))?;
		let len = payload_len(width)?;
		let payload = bytes.get(1..1 + len).ok_or_else(|| Error::corrupted("truncated marker varint", bytes))?;
		let value = match width {
			MARKER_8 => payload[0] as u64,
			MARKER_16 => u16::from_le_bytes(payload.try_into().unwrap()) as u64,
			MARKER_32 => u32::from_le_bytes(payload.try_into().unwrap()) as u64,
			MARKER_64 => u64::from_le_bytes(payload.try_into().unwrap()),
			_ => unreachable!(),
		};
		Ok((value, 1 + len))
	}

	/// Total encoded size (width byte + payload) for `value`.
	pub fn size_of(value: u64) -> usize {
		1 + match width_for(value) {
			MARKER_8 => 1,
			MARKER_16 => 2,
			MARKER_32 => 4,
			MARKER_64 => 8,
			_ => unreachable!(),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn stream_round_trip_all_widths() {
		for &v in &[0u64, 1, 127, 128, 16383, 16384, u32::MAX as u64 - 1, u32::MAX as u64, u64::MAX] {
			let enc = stream::encode(v);
			let (dec, consumed) = stream::decode(&enc).unwrap();
			assert_eq!(dec, v);
			assert_eq!(consumed, enc.len());
			assert_eq!(enc.len(), stream::size_of(v));
		}
	}

	#[test]
	fn stream_encoded_lengths_match_spec_boundaries() {
		let cases: &[(u64, usize)] = &[
			(0, 1),
			(127, 1),
			(128, 2),
			(16383, 2),
			(16384, 3),
			(u32::MAX as u64 - 1, 5),
			(u32::MAX as u64, 5),
			(u64::MAX, 10),
		];
		for &(v, expected_len) in cases {
			assert_eq!(stream::encode(v).len(), expected_len, "value {}", v);
		}
	}

	#[test]
	fn stream_decode_truncated_is_corrupted() {
		let enc = stream::encode(16384);
		assert!(stream::decode(&enc[..1]).is_err());
	}

	#[test]
	fn marker_round_trip_all_widths() {
		for &v in &[0u64, 255, 256, u16::MAX as u64, u16::MAX as u64 + 1, u32::MAX as u64, u32::MAX as u64 + 1, u64::MAX] {
			let enc = marker::encode(v);
			let (dec, consumed) = marker::decode(&enc).unwrap();
			assert_eq!(dec, v);
			assert_eq!(consumed, enc.len());
		}
	}

	#[test]
	fn marker_picks_smallest_width() {
		assert_eq!(marker::encode(5)[0], marker::MARKER_8);
		assert_eq!(marker::encode(300)[0], marker::MARKER_16);
		assert_eq!(marker::encode(100_000)[0], marker::MARKER_32);
		assert_eq!(marker::encode(u64::from(u32::MAX) + 1)[0], marker::MARKER_64);
	}

	#[test]
	fn marker_unknown_width_is_corrupted() {
		assert!(marker::decode(&[b'z', 0]).is_err());
	}

	#[test]
	fn marker_update_in_place_reports_shift() {
		let (encoded, shift) = stream::update_in_place(1, 100_000);
		assert_eq!(shift, encoded.len() as i64 - 1);
	}
}
