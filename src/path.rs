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

//! Dot-path parsing and resolution.
//!
//! Grounded on `original_source/src/ark-js/carbon/carbon-path.c`'s
//! `traverse_array`/`traverse_object`/`traverse_column` trio: each
//! level opens its own iterator as a reborrow of the caller's
//! `&mut MemFile`, reads what it needs, then drops that iterator
//! before recursing -- at which point the original `&mut MemFile`
//! reference is usable again, the same reborrow discipline
//! `iter::mod` uses for nested containers (spec.md §9).

use crate::error::{Error, Result};
use crate::iter::array::ArrayIt;
use crate::iter::column::ColumnIt;
use crate::iter::object::ObjectIt;
use crate::memfile::MemFile;
use crate::types::{self, FieldType};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
	Key(String),
	Index(u32),
}

/// `path := segment ("." segment)*; segment := key | "[" index "]"`
/// (spec.md §6 "Dot-path grammar"). A key segment is any run of bytes
/// containing neither `.` nor `[`.
pub fn parse(path: &str) -> Result<Vec<Segment>> {
	if path.is_empty() {
		return Err(Error::DotPathParse("path must not be empty".into()));
	}
	path.split('.')
		.map(|part| {
			if part.is_empty() {
				Err(Error::DotPathParse("empty segment between dots".into()))
			} else if let Some(inner) = part.strip_prefix('[') {
				let inner = inner.strip_suffix(']').ok_or_else(|| Error::DotPathParse(format!("unterminated index segment: {}", part)))?;
				let idx: u32 = inner.parse().map_err(|_| Error::DotPathParse(format!("invalid array index: {}", inner)))?;
				Ok(Segment::Index(idx))
			} else if part.contains('[') || part.contains(']') {
				Err(Error::DotPathParse(format!("invalid key segment: {}", part)))
			} else {
				Ok(Segment::Key(part.to_string()))
			}
		})
		.collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
	Resolved,
	EmptyDoc,
	NoSuchKey,
	NoSuchIndex,
	NotTraversable,
	NotAnObject,
	NoContainer,
	NoNesting,
	Internal,
}

/// Where a resolved path landed: which container, and which slot
/// within it. `Find` (spec.md §4.6) reopens the concrete iterator from
/// these offsets to read or mutate the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
	/// The containing array, and the marker offset of the matched slot.
	Array { container: usize, slot: usize },
	/// The containing object, and the offset of the matched property's name.
	Object { container: usize, name: usize },
	/// The containing column, and the matched element's index.
	Column { container: usize, index: u32 },
}

fn traversable(t: FieldType) -> bool {
	types::is_array(t) || types::is_object(t) || types::is_column(t)
}

/// Resolve `segments` against the array at `root`, the record's root
/// container (spec.md §2: "Record-payload == Array").
pub fn evaluate(mf: &mut MemFile, root: usize, segments: &[Segment]) -> Result<(PathStatus, Option<Resolved>)> {
	if segments.is_empty() {
		return Ok((PathStatus::Internal, None));
	}
	traverse_array(mf, root, segments, 0, true)
}

fn traverse_array(mf: &mut MemFile, at: usize, segments: &[Segment], pos: usize, is_record: bool) -> Result<(PathStatus, Option<Resolved>)> {
	// Everything this level needs out of its iterator, decided while
	// `it` is alive and dropped before any recursive call so the next
	// level can reborrow `mf` fresh.
	enum Next {
		Done(PathStatus, Option<Resolved>),
		Array(usize),
		Object(usize),
		Column(usize),
		/// Unit-array transparency into a wrapped column: the *current*
		/// segment addresses an element inside the column, not a slot of
		/// the one-element wrapper (mirrors the `Key` transparency below,
		/// which likewise reuses the current segment rather than
		/// consuming one to select the wrapper's sole slot). Only a
		/// record's root array degenerates this way (spec.md §3 "Unit
		/// arrays" names object or column, never a plain nested array, as
		/// the sole-element case).
		ColumnHere(usize),
	}

	let next = {
		let mut it = ArrayIt::open(mf, at)?;
		let is_unit = it.is_unit()?;
		if !it.next()? {
			Next::Done(PathStatus::EmptyDoc, None)
		} else {
			match &segments[pos] {
				Segment::Index(requested) => {
					if is_unit && is_record && types::is_column(it.field_type()?) {
						Next::ColumnHere(it.slot_offset()?)
					} else {
						let mut current = 0u32;
						while current < *requested {
							if !it.next()? {
								break;
							}
							current += 1;
						}
						if current != *requested {
							Next::Done(PathStatus::NoSuchIndex, None)
						} else {
							let elem_type = it.field_type()?;
							let next_pos = pos + 1;
							if next_pos == segments.len() {
								Next::Done(PathStatus::Resolved, Some(Resolved::Array { container: at, slot: it.slot_offset()? }))
							} else if !traversable(elem_type) {
								Next::Done(PathStatus::NotTraversable, None)
							} else {
								match (&segments[next_pos], elem_type) {
									(Segment::Index(_), FieldType::Array(_)) => Next::Array(it.slot_offset()?),
									(Segment::Index(_), FieldType::Column(..)) => Next::Column(it.slot_offset()?),
									(Segment::Index(_), _) => Next::Done(PathStatus::NoContainer, None),
									(Segment::Key(_), FieldType::Object(_)) => Next::Object(it.slot_offset()?),
									(Segment::Key(_), _) => Next::Done(PathStatus::NotAnObject, None),
								}
							}
						}
					}
				}
				Segment::Key(_) => {
					let elem_type = it.field_type()?;
					if !matches!(elem_type, FieldType::Object(_)) {
						Next::Done(PathStatus::NotAnObject, None)
					} else if is_unit && is_record {
						Next::Object(it.slot_offset()?)
					} else {
						Next::Done(PathStatus::NoSuchKey, None)
					}
				}
			}
		}
	};

	match next {
		Next::Done(status, resolved) => Ok((status, resolved)),
		Next::Array(sub_at) => {
			let next_pos = if matches!(segments[pos], Segment::Key(_)) { pos } else { pos + 1 };
			traverse_array(mf, sub_at, segments, next_pos, false)
		}
		Next::Object(sub_at) => {
			let next_pos = if matches!(segments[pos], Segment::Key(_)) { pos } else { pos + 1 };
			traverse_object(mf, sub_at, segments, next_pos)
		}
		Next::Column(sub_at) => {
			let next_pos = if matches!(segments[pos], Segment::Key(_)) { pos } else { pos + 1 };
			traverse_column(mf, sub_at, segments, next_pos)
		}
		Next::ColumnHere(sub_at) => traverse_column(mf, sub_at, segments, pos),
	}
}

fn traverse_object(mf: &mut MemFile, at: usize, segments: &[Segment], pos: usize) -> Result<(PathStatus, Option<Resolved>)> {
	enum Next {
		Done(PathStatus, Option<Resolved>),
		Array(usize),
		Object(usize),
		Column(usize),
	}

	let needle = match &segments[pos] {
		Segment::Key(k) => k.clone(),
		Segment::Index(_) => return Ok((PathStatus::Internal, None)),
	};

	let next = {
		let mut it = ObjectIt::open(mf, at)?;
		if !it.next()? {
			Next::Done(PathStatus::EmptyDoc, None)
		} else {
			loop {
				if it.prop_name()? == needle {
					let next_pos = pos + 1;
					if next_pos == segments.len() {
						break Next::Done(PathStatus::Resolved, Some(Resolved::Object { container: at, name: it.name_offset()? }));
					}
					let prop_type = it.prop_type()?;
					if !traversable(prop_type) {
						break Next::Done(PathStatus::NotTraversable, None);
					}
					break match (prop_type, &segments[next_pos]) {
						(FieldType::Object(_), Segment::Key(_)) => Next::Object(it.prop_value_offset()?),
						(FieldType::Array(_), Segment::Index(_)) => Next::Array(it.prop_value_offset()?),
						(FieldType::Column(..), Segment::Index(_)) => Next::Column(it.prop_value_offset()?),
						(_, Segment::Index(_)) => Next::Done(PathStatus::NoContainer, None),
						(_, Segment::Key(_)) => Next::Done(PathStatus::NotAnObject, None),
					};
				}
				if !it.next()? {
					break Next::Done(PathStatus::NoSuchKey, None);
				}
			}
		}
	};

	match next {
		Next::Done(status, resolved) => Ok((status, resolved)),
		Next::Array(sub_at) => traverse_array(mf, sub_at, segments, pos + 1, false),
		Next::Object(sub_at) => traverse_object(mf, sub_at, segments, pos + 1),
		Next::Column(sub_at) => traverse_column(mf, sub_at, segments, pos + 1),
	}
}

fn traverse_column(mf: &mut MemFile, at: usize, segments: &[Segment], pos: usize) -> Result<(PathStatus, Option<Resolved>)> {
	if pos + 1 != segments.len() {
		return Ok((PathStatus::NoNesting, None));
	}
	let requested = match &segments[pos] {
		Segment::Index(i) => *i,
		Segment::Key(_) => return Ok((PathStatus::Internal, None)),
	};
	let mut it = ColumnIt::open(mf, at)?;
	let (count, _) = it.values_info()?;
	if requested >= count {
		return Ok((PathStatus::NoSuchIndex, None));
	}
	Ok((PathStatus::Resolved, Some(Resolved::Column { container: at, index: requested })))
}
