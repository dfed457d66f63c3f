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

//! A schema-less, self-describing columnar binary document format.
//!
//! A record is a byte string: a key header, an optional commit hash, and
//! a payload that is always an array (see [`record`] and [`key`]).
//! Containers nest arrays, objects, and fixed-width columns; every
//! container and element carries its own type marker, so a record can be
//! read without any externally supplied schema.
//!
//! [`RecordBuilder`] constructs a record from scratch. [`Record`] is the
//! read side: typed point lookups through [`Record::find_u64`] and
//! friends, or a full traversal via [`Record::walk`]. [`Record::revise`]
//! opens a [`Reviser`], the single mutation session type; edits only
//! become visible to other readers once [`Reviser::end`] commits them.

pub mod display;
pub mod error;
pub mod find;
pub mod insert;
pub mod iter;
pub mod key;
pub mod layout;
pub mod memfile;
pub mod parallel;
pub mod path;
pub mod promote;
pub mod record;
pub mod revise;
pub mod scalar;
pub mod types;
pub mod varint;
pub mod visit;

pub use error::{Error, Result};
pub use find::Find;
pub use key::Key;
pub use path::{PathStatus, Resolved, Segment};
pub use record::RecordBuilder;
pub use revise::{Record, Reviser};
pub use types::{AbstractClass, ColumnType, ContainerKind, FieldType};
pub use visit::Visit;
