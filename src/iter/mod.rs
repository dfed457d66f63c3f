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

//! Forward cursors over the three container kinds.
//!
//! Every iterator caches exactly one offset -- the start of the slot it
//! is positioned at -- and recomputes the next slot's start from the
//! bytes on every `next()`. Nested containers are opened as a reborrow
//! of the parent's `MemFile` (`&mut self.mf` with an elided lifetime),
//! so the borrow checker enforces "closing a parent closes every
//! descendant" (spec.md §4.4) instead of a runtime generation counter.

pub mod array;
pub mod column;
pub mod object;

pub use array::ArrayIt;
pub use column::ColumnIt;
pub use object::ObjectIt;
