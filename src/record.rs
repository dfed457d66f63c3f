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

//! Building a record from scratch: write the key header, fill in the
//! root array through an `Inserter`, and let `finish()` compute the
//! commit hash and hand back a `Record`.

use crate::error::Result;
use crate::insert::Inserter;
use crate::key::{self, Key};
use crate::memfile::{MemFile, Mode};
use crate::revise::Record;
use crate::types::BASE_LIST_CLASS;

pub struct RecordBuilder {
	mf: MemFile,
	key: Key,
}

impl RecordBuilder {
	pub fn new(key: Key) -> Result<RecordBuilder> {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		mf.write(&key.encode())?;
		if key.has_commit() {
			mf.write(&[0u8; 8])?;
		}
		Ok(RecordBuilder { mf, key })
	}

	/// Open the root array inserter at the record's current tail. Must
	/// be `close()`d before `finish()` is called.
	pub fn array(&mut self) -> Result<Inserter<'_>> {
		let at = self.mf.tell();
		Inserter::open_array(&mut self.mf, at, BASE_LIST_CLASS)
	}

	/// Patch in the commit hash (if the key carries one) and hand back a
	/// read/write-ready `Record`.
	pub fn finish(mut self) -> Result<Record> {
		let (_, key_len) = Key::decode(self.mf.as_slice())?;
		if self.key.has_commit() {
			let payload_start = key_len + 8;
			let hash = key::commit_hash(&self.mf.as_slice()[payload_start..]);
			self.mf.seek(key_len)?;
			self.mf.write(&hash.to_le_bytes())?;
		}
		Record::open(self.mf.into_bytes())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn finish_produces_a_readable_record_with_commit_hash() {
		let mut builder = RecordBuilder::new(Key::Unsigned(1)).unwrap();
		{
			let mut root = builder.array().unwrap();
			{
				let mut obj = root.object().unwrap();
				{
					let mut v = obj.key("a").unwrap();
					v.u8(9).unwrap();
				}
				obj.close().unwrap();
			}
			root.close().unwrap();
		}
		let record = builder.finish().unwrap();
		assert_eq!(record.key().unwrap(), Key::Unsigned(1));
		assert!(record.commit_hash().unwrap().is_some());
		let (_, value) = record.find_u64("a").unwrap();
		assert_eq!(value, Some(9));
	}

	#[test]
	fn keyless_record_carries_no_commit_slot() {
		let mut builder = RecordBuilder::new(Key::None).unwrap();
		builder.array().unwrap().close().unwrap();
		let record = builder.finish().unwrap();
		assert_eq!(record.commit_hash().unwrap(), None);
		assert!(record.is_empty().unwrap());
	}
}
