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

//! `Record`: the multi-reader/single-writer handle around one record's
//! bytes, and `Reviser`: the mutation session it hands out.
//!
//! Grounded on `original_source/src/jakson/carbon/jak_carbon_revise.c`'s
//! "begin/commit/abort" shape: `revise()` takes the per-record write
//! lock and clones the latest bytes into a scratch buffer; `end()`
//! recomputes the commit hash and publishes the scratch buffer as the
//! new latest version; `abort()` drops it. Readers never block on a
//! revision in progress -- `Record::snapshot` hands out an `Arc` clone
//! of whatever was last published, so a reader started before a commit
//! keeps seeing the pre-commit bytes even if the commit lands mid-read
//! (spec.md §5 "a reader opened against the latest version observes a
//! point-in-time snapshot").

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::error::{Error, Result};
use crate::iter::array::ArrayIt;
use crate::iter::column::{read_column_values, ColumnIt, ColumnValue};
use crate::iter::object::ObjectIt;
use crate::key::{self, Key};
use crate::layout;
use crate::memfile::{MemFile, Mode};
use crate::path::{self, PathStatus, Resolved};
use crate::promote;
use crate::types::{self, marker, ContainerKind, FieldType};
use crate::visit::{self, Visit};
use crate::find::Find;

pub struct Record {
	write_lock: Mutex<()>,
	latest: RwLock<Arc<Vec<u8>>>,
}

impl Record {
	/// Wrap an already-encoded `KeyHeader Commit? Array` record. Fails
	/// only if the key header itself is malformed; the payload is not
	/// otherwise validated until something reads it.
	pub fn open(bytes: Vec<u8>) -> Result<Record> {
		key::decode_header(&bytes)?;
		Ok(Record { write_lock: Mutex::new(()), latest: RwLock::new(Arc::new(bytes)) })
	}

	pub fn snapshot(&self) -> Arc<Vec<u8>> {
		self.latest.read().clone()
	}

	pub fn key(&self) -> Result<Key> {
		let bytes = self.snapshot();
		let (key, _, _) = key::decode_header(&bytes)?;
		Ok(key)
	}

	pub fn commit_hash(&self) -> Result<Option<u64>> {
		let bytes = self.snapshot();
		let (_, commit, _) = key::decode_header(&bytes)?;
		Ok(commit)
	}

	fn with_root<T>(&self, f: impl FnOnce(&mut MemFile, usize) -> Result<T>) -> Result<T> {
		let bytes = self.snapshot();
		let (_, _, start) = key::decode_header(&bytes)?;
		let mut mf = MemFile::open((*bytes).clone(), Mode::ReadOnly);
		f(&mut mf, start)
	}

	pub fn is_empty(&self) -> Result<bool> {
		self.with_root(|mf, start| ArrayIt::open(mf, start)?.is_empty())
	}

	pub fn is_unit(&self) -> Result<bool> {
		self.with_root(|mf, start| ArrayIt::open(mf, start)?.is_unit())
	}

	pub fn find_field_type(&self, dot_path: &str) -> Result<(PathStatus, Option<FieldType>)> {
		self.with_root(|mf, start| {
			let (status, found) = Find::open(mf, start, dot_path)?;
			Ok((status, found.map(|mut f| f.field_type()).transpose()?))
		})
	}

	pub fn find_bool(&self, dot_path: &str) -> Result<(PathStatus, Option<bool>)> {
		self.with_root(|mf, start| {
			let (status, found) = Find::open(mf, start, dot_path)?;
			Ok((status, found.map(|mut f| f.as_bool()).transpose()?))
		})
	}

	pub fn find_u64(&self, dot_path: &str) -> Result<(PathStatus, Option<u64>)> {
		self.with_root(|mf, start| {
			let (status, found) = Find::open(mf, start, dot_path)?;
			Ok((status, found.map(|mut f| f.as_u64()).transpose()?))
		})
	}

	pub fn find_i64(&self, dot_path: &str) -> Result<(PathStatus, Option<i64>)> {
		self.with_root(|mf, start| {
			let (status, found) = Find::open(mf, start, dot_path)?;
			Ok((status, found.map(|mut f| f.as_i64()).transpose()?))
		})
	}

	pub fn find_f32(&self, dot_path: &str) -> Result<(PathStatus, Option<f32>)> {
		self.with_root(|mf, start| {
			let (status, found) = Find::open(mf, start, dot_path)?;
			Ok((status, found.map(|mut f| f.as_f32()).transpose()?))
		})
	}

	pub fn find_str(&self, dot_path: &str) -> Result<(PathStatus, Option<String>)> {
		self.with_root(|mf, start| {
			let (status, found) = Find::open(mf, start, dot_path)?;
			Ok((status, found.map(|mut f| f.as_str()).transpose()?))
		})
	}

	pub fn walk(&self, visitor: &mut dyn Visit) -> Result<()> {
		self.with_root(|mf, start| visit::walk_array(mf, start, visitor))
	}

	/// Open a revision session. Blocks until any concurrent reviser on
	/// this record finishes (spec.md §4.7 "the per-record write lock").
	pub fn revise(&self) -> Reviser<'_> {
		let guard = self.write_lock.lock();
		let bytes = (*self.snapshot()).clone();
		Reviser { record: self, _guard: guard, mf: MemFile::open(bytes, Mode::ReadWrite), committed: false }
	}
}

/// A single mutation session. Holds the write lock for its whole
/// lifetime; its edits are invisible to readers until `end()` publishes
/// them into `Record::latest`.
pub struct Reviser<'a> {
	record: &'a Record,
	_guard: MutexGuard<'a, ()>,
	mf: MemFile,
	committed: bool,
}

impl<'a> Reviser<'a> {
	fn payload_start(&self) -> Result<usize> {
		let (_, _, start) = key::decode_header(self.mf.as_slice())?;
		Ok(start)
	}

	/// Whether `container` (a column's own marker offset) is the sole
	/// element of the record's root array, i.e. the column sits directly
	/// inside a unit-wrapped payload rather than beside sibling elements
	/// or nested under an object.
	fn is_root_unit_column(&mut self, container: usize) -> Result<bool> {
		let start = self.payload_start()?;
		if container != start + 1 {
			return Ok(false);
		}
		ArrayIt::open(&mut self.mf, start)?.is_unit()
	}

	pub fn key(&self) -> Result<Key> {
		let (key, _) = Key::decode(self.mf.as_slice())?;
		Ok(key)
	}

	fn set_key(&mut self, new_key: Key) -> Result<()> {
		let (old_key, old_len) = Key::decode(self.mf.as_slice())?;
		if old_key.has_commit() != new_key.has_commit() {
			return Err(Error::IllegalOperation("changing a key's commit-bearing kind mid-revision is not supported"));
		}
		let encoded = new_key.encode();
		self.mf.seek(0)?;
		self.mf.inplace_remove(old_len)?;
		self.mf.seek(0)?;
		self.mf.inplace_insert(encoded.len())?;
		self.mf.seek(0)?;
		self.mf.write(&encoded)
	}

	pub fn set_key_unsigned(&mut self, v: u64) -> Result<()> {
		self.set_key(Key::Unsigned(v))
	}

	pub fn set_key_signed(&mut self, v: i64) -> Result<()> {
		self.set_key(Key::Signed(v))
	}

	pub fn set_key_string(&mut self, s: &str) -> Result<()> {
		self.set_key(Key::Str(s.to_string()))
	}

	/// Replace an existing auto key with a freshly generated one.
	pub fn generate_auto_key(&mut self) -> Result<()> {
		let (old_key, _) = Key::decode(self.mf.as_slice())?;
		if !matches!(old_key, Key::Auto(_)) {
			return Err(Error::IllegalOperation("generate_auto_key requires the record to already carry an auto key"));
		}
		self.set_key(Key::auto())
	}

	pub fn iterator_open(&mut self) -> Result<ArrayIt<'_>> {
		let start = self.payload_start()?;
		ArrayIt::open(&mut self.mf, start)
	}

	pub fn find_open(&mut self, dot_path: &str) -> Result<(PathStatus, Option<Find<'_>>)> {
		let start = self.payload_start()?;
		Find::open(&mut self.mf, start, dot_path)
	}

	fn resolve(&mut self, dot_path: &str) -> Result<Resolved> {
		let start = self.payload_start()?;
		let segments = path::parse(dot_path)?;
		let (status, resolved) = path::evaluate(&mut self.mf, start, &segments)?;
		if status != PathStatus::Resolved {
			return Err(Error::IllegalState("dot-path did not resolve to an existing slot"));
		}
		Ok(resolved.expect("Resolved status always carries a Resolved value"))
	}

	/// Physically remove whatever `dot_path` names: a collapsed array
	/// slot, a collapsed object property, or a shifted-and-shrunk column
	/// element.
	pub fn remove(&mut self, dot_path: &str) -> Result<()> {
		match self.resolve(dot_path)? {
			Resolved::Array { container, slot } => ArrayIt::at(&mut self.mf, container, slot)?.remove(),
			Resolved::Object { container, name } => ObjectIt::at(&mut self.mf, container, name)?.remove(),
			Resolved::Column { container, index } => ColumnIt::open(&mut self.mf, container)?.remove(index),
		}
	}

	fn set_bool(&mut self, dot_path: &str, value: bool) -> Result<()> {
		let byte = if value { marker::TRUE } else { marker::FALSE };
		match self.resolve(dot_path)? {
			Resolved::Array { slot, .. } => replace_field(&mut self.mf, slot, &[byte]),
			Resolved::Object { container, name } => {
				let value_off = ObjectIt::at(&mut self.mf, container, name)?.prop_value_offset()?;
				replace_field(&mut self.mf, value_off, &[byte])
			}
			Resolved::Column { container, index } => {
				let promotion_needed = {
					let mut it = ColumnIt::open(&mut self.mf, container)?;
					match it.update_set_bool(index, value) {
						Ok(()) => false,
						Err(Error::TypeMismatch { .. }) => true,
						Err(e) => return Err(e),
					}
				};
				if promotion_needed {
					let flatten = self.is_root_unit_column(container)?;
					promote::column_to_array(&mut self.mf, container, index, ColumnValue::Bool(value), flatten)?;
				}
				Ok(())
			}
		}
	}

	pub fn update_set_true(&mut self, dot_path: &str) -> Result<()> {
		self.set_bool(dot_path, true)
	}

	pub fn update_set_false(&mut self, dot_path: &str) -> Result<()> {
		self.set_bool(dot_path, false)
	}

	/// Recursively trim unused column capacity throughout the record
	/// (spec.md §4.7). Children are packed last-to-first within each
	/// container: packing an earlier child can shrink the buffer and
	/// shift every offset after it, so processing back-to-front means a
	/// sibling is always packed before its own cached offset could be
	/// invalidated by a later sibling's shrink.
	pub fn pack(&mut self) -> Result<()> {
		let start = self.payload_start()?;
		pack_array(&mut self.mf, start)
	}

	/// Drop any bytes trailing the top-level array's terminator. There is
	/// no persistent overshoot region in this port's single contiguous
	/// byte image, so in practice this only ever finds zero bytes to cut;
	/// it is kept as a safety net against a future writer that appends
	/// past the terminator before handing the buffer to `Reviser`.
	pub fn shrink(&mut self) -> Result<()> {
		let start = self.payload_start()?;
		let end = {
			let mut it = ArrayIt::open(&mut self.mf, start)?;
			it.fast_forward()?;
			self.mf.tell()
		};
		let total = self.mf.size();
		if end < total {
			self.mf.seek(end)?;
			self.mf.cut(total - end)?;
		}
		Ok(())
	}

	/// Validate, recompute the commit hash, and publish the session's
	/// bytes as the record's new latest version.
	pub fn end(mut self) -> Result<Option<u64>> {
		let start = self.payload_start()?;
		check_no_duplicates(&mut self.mf, start)?;
		let (key, key_len) = Key::decode(self.mf.as_slice())?;
		let commit = if key.has_commit() {
			let hash = key::commit_hash(&self.mf.as_slice()[start..]);
			self.mf.seek(key_len)?;
			self.mf.write(&hash.to_le_bytes())?;
			Some(hash)
		} else {
			None
		};
		*self.record.latest.write() = Arc::new(self.mf.as_slice().to_vec());
		self.committed = true;
		Ok(commit)
	}

	/// Discard every edit made in this session.
	pub fn abort(mut self) {
		self.committed = true;
	}
}

impl<'a> Drop for Reviser<'a> {
	fn drop(&mut self) {
		if !self.committed {
			log::trace!("reviser dropped without end() or abort(); edits discarded");
		}
	}
}

fn replace_field(mf: &mut MemFile, at: usize, new_bytes: &[u8]) -> Result<()> {
	let end = layout::field_end(mf, at)?;
	mf.seek(at)?;
	mf.inplace_remove(end - at)?;
	mf.seek(at)?;
	mf.inplace_insert(new_bytes.len())?;
	mf.seek(at)?;
	mf.write(new_bytes)
}

fn pack_array(mf: &mut MemFile, at: usize) -> Result<()> {
	let children = {
		let mut it = ArrayIt::open(mf, at)?;
		let mut children = Vec::new();
		while it.next()? {
			children.push((it.slot_offset()?, it.field_type()?));
		}
		children
	};
	for (slot, field_type) in children.into_iter().rev() {
		pack_field(mf, slot, field_type)?;
	}
	Ok(())
}

fn pack_object(mf: &mut MemFile, at: usize) -> Result<()> {
	let children = {
		let mut it = ObjectIt::open(mf, at)?;
		let mut children = Vec::new();
		while it.next()? {
			children.push((it.prop_value_offset()?, it.prop_type()?));
		}
		children
	};
	for (value_off, field_type) in children.into_iter().rev() {
		pack_field(mf, value_off, field_type)?;
	}
	Ok(())
}

fn pack_field(mf: &mut MemFile, at: usize, field_type: FieldType) -> Result<()> {
	match field_type {
		FieldType::Array(_) => pack_array(mf, at),
		FieldType::Object(_) => pack_object(mf, at),
		FieldType::Column(..) => ColumnIt::open(mf, at)?.pack(),
		_ => Ok(()),
	}
}

/// Recursively reject duplicate elements/keys in any `sorted-set` or
/// `sorted-map` container reachable from `at` (spec.md §9 open-question
/// resolution: only those two classes, never the multiset/multimap or
/// unsorted-set/map variants, enforce uniqueness). Array and column
/// elements are compared by their raw encoded bytes; object keys are
/// compared as strings, since neither container has a narrower notion
/// of "value" than its own byte encoding.
fn check_no_duplicates(mf: &mut MemFile, at: usize) -> Result<()> {
	let m = *mf.peek_at(at, 1)?.first().unwrap();
	match types::container_kind(m)?.ok_or_else(|| Error::corrupted("duplicate check expected a container marker", &[m]))? {
		ContainerKind::Array => check_array_duplicates(mf, at),
		ContainerKind::Object => check_object_duplicates(mf, at),
		ContainerKind::Column(_) => check_column_duplicates(mf, at),
	}
}

fn check_array_duplicates(mf: &mut MemFile, at: usize) -> Result<()> {
	let (class, children) = {
		let mut it = ArrayIt::open(mf, at)?;
		let class = it.class();
		let mut children = Vec::new();
		while it.next()? {
			children.push((it.slot_offset()?, it.field_type()?));
		}
		(class, children)
	};
	if class.rejects_duplicates() {
		let mut seen: Vec<Vec<u8>> = Vec::with_capacity(children.len());
		for &(slot, _) in &children {
			let end = layout::field_end(mf, slot)?;
			let bytes = mf.peek_at(slot, end - slot)?.to_vec();
			if seen.contains(&bytes) {
				return Err(Error::IllegalState("sorted-set array contains a duplicate element"));
			}
			seen.push(bytes);
		}
	}
	for (slot, field_type) in children {
		if matches!(field_type, FieldType::Array(_) | FieldType::Object(_) | FieldType::Column(..)) {
			check_no_duplicates(mf, slot)?;
		}
	}
	Ok(())
}

fn check_object_duplicates(mf: &mut MemFile, at: usize) -> Result<()> {
	let (class, children) = {
		let mut it = ObjectIt::open(mf, at)?;
		let class = it.class();
		let mut children = Vec::new();
		while it.next()? {
			children.push((it.prop_name()?, it.prop_value_offset()?, it.prop_type()?));
		}
		(class, children)
	};
	if class.rejects_duplicates() {
		let mut seen = std::collections::HashSet::with_capacity(children.len());
		for (name, _, _) in &children {
			if !seen.insert(name.clone()) {
				return Err(Error::IllegalState("sorted-map object contains a duplicate key"));
			}
		}
	}
	for (_, value_off, field_type) in children {
		if matches!(field_type, FieldType::Array(_) | FieldType::Object(_) | FieldType::Column(..)) {
			check_no_duplicates(mf, value_off)?;
		}
	}
	Ok(())
}

fn check_column_duplicates(mf: &mut MemFile, at: usize) -> Result<()> {
	let mut it = ColumnIt::open(mf, at)?;
	if !it.class().rejects_duplicates() {
		return Ok(());
	}
	let values = read_column_values(&mut it)?;
	let mut seen: Vec<ColumnValue> = Vec::with_capacity(values.len());
	for v in values {
		if seen.contains(&v) {
			return Err(Error::IllegalState("sorted-set column contains a duplicate element"));
		}
		seen.push(v);
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::insert::Inserter;
	use crate::types::{ColumnType, BASE_LIST_CLASS};

	fn simple_record() -> Record {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		mf.write(&Key::Unsigned(1).encode()).unwrap();
		mf.write(&0u64.to_le_bytes()).unwrap();
		{
			let at = mf.tell();
			let mut root = Inserter::open_array(&mut mf, at, BASE_LIST_CLASS).unwrap();
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
				obj.close().unwrap();
			}
			root.close().unwrap();
		}
		Record::open(mf.into_bytes()).unwrap()
	}

	#[test]
	fn find_reads_through_a_fresh_snapshot() {
		let record = simple_record();
		let (status, value) = record.find_u64("a").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(value, Some(1));
	}

	#[test]
	fn revise_remove_changes_commit_hash() {
		let record = simple_record();
		let before = record.commit_hash().unwrap();
		{
			let mut rev = record.revise();
			rev.remove("b.[0]").unwrap();
			rev.end().unwrap();
		}
		let after = record.commit_hash().unwrap();
		assert_ne!(before, after);
		let (_, value) = record.find_bool("b.[0]").unwrap();
		assert_eq!(value, Some(false));
	}

	#[test]
	fn revise_promotes_column_on_incompatible_write() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		mf.write(&Key::None.encode()).unwrap();
		{
			let at = mf.tell();
			let mut root = Inserter::open_array(&mut mf, at, BASE_LIST_CLASS).unwrap();
			{
				let mut obj = root.object().unwrap();
				{
					let mut v = obj.key("c").unwrap();
					let mut col = v.column(ColumnType::U8, 2).unwrap();
					col.push_u8(9).unwrap();
					col.push_u8(10).unwrap();
					col.close().unwrap();
				}
				obj.close().unwrap();
			}
			root.close().unwrap();
		}
		let record = Record::open(mf.into_bytes()).unwrap();
		{
			let mut rev = record.revise();
			rev.update_set_true("c.[0]").unwrap();
			rev.end().unwrap();
		}
		let (status, value) = record.find_bool("c.[0]").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(value, Some(true));
	}

	#[test]
	fn revise_promotes_bare_root_column_and_flattens_into_payload() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		mf.write(&Key::None.encode()).unwrap();
		{
			let at = mf.tell();
			let mut root = Inserter::open_array(&mut mf, at, BASE_LIST_CLASS).unwrap();
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
		let record = Record::open(mf.into_bytes()).unwrap();
		{
			let mut rev = record.revise();
			rev.update_set_true("[2]").unwrap();
			rev.end().unwrap();
		}
		let (status, value) = record.find_bool("[2]").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(value, Some(true));
		let (status, value) = record.find_u64("[0]").unwrap();
		assert_eq!(status, PathStatus::Resolved);
		assert_eq!(value, Some(1));
	}

	#[test]
	fn abort_discards_edits() {
		let record = simple_record();
		let before = record.commit_hash().unwrap();
		{
			let mut rev = record.revise();
			rev.remove("a").unwrap();
			rev.abort();
		}
		assert_eq!(record.commit_hash().unwrap(), before);
		let (status, _) = record.find_u64("a").unwrap();
		assert_eq!(status, PathStatus::Resolved);
	}

	#[test]
	fn pack_trims_column_capacity_in_place() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		mf.write(&Key::None.encode()).unwrap();
		{
			let at = mf.tell();
			let mut root = Inserter::open_array(&mut mf, at, BASE_LIST_CLASS).unwrap();
			{
				let mut obj = root.object().unwrap();
				{
					let mut v = obj.key("c").unwrap();
					let mut col = v.column(ColumnType::U8, 8).unwrap();
					col.push_u8(1).unwrap();
					col.push_u8(2).unwrap();
					col.close().unwrap();
				}
				obj.close().unwrap();
			}
			root.close().unwrap();
		}
		let record = Record::open(mf.into_bytes()).unwrap();
		let before = record.snapshot().len();
		{
			let mut rev = record.revise();
			rev.pack().unwrap();
			rev.end().unwrap();
		}
		assert!(record.snapshot().len() < before);
		let (_, value) = record.find_u64("c.[1]").unwrap();
		assert_eq!(value, Some(2));
	}

	#[test]
	fn end_rejects_duplicate_in_sorted_set() {
		let mut mf = MemFile::open(Vec::new(), Mode::ReadWrite);
		mf.write(&Key::None.encode()).unwrap();
		{
			let at = mf.tell();
			let mut root = Inserter::open_array(&mut mf, at, BASE_LIST_CLASS).unwrap();
			{
				let mut inner = root.array_with_class(types::AbstractClass::SortedSet).unwrap();
				inner.u8(1).unwrap();
				inner.u8(1).unwrap();
				inner.close().unwrap();
			}
			root.close().unwrap();
		}
		let record = Record::open(mf.into_bytes()).unwrap();
		let mut rev = record.revise();
		assert!(rev.end().is_err());
	}
}
