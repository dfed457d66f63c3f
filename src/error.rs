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

//! Error taxonomy for the binary record engine.
//!
//! Every fallible operation returns `Result<T>`; there are no exceptions
//! and no panics on inputs that can be produced by malformed records.
//! `NotImplemented` and `Internal` are the only two kinds that represent
//! invariant violations rather than expected, reachable failure modes.

use std::fmt;

use crate::display;

#[derive(Debug)]
pub enum Error {
	NullArgument(&'static str),
	Corrupted(String),
	TypeMismatch { expected: &'static str, found: &'static str },
	OutOfBounds { index: usize, len: usize },
	IllegalOperation(&'static str),
	IllegalState(&'static str),
	NotImplemented(&'static str),
	UnsupportedContainer(&'static str),
	DotPathParse(String),
	Outdated,
	Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub fn corrupted(msg: impl Into<String>, bytes: &[u8]) -> Error {
		Error::Corrupted(format!("{}: {}", msg.into(), display::hex(bytes)))
	}

	/// True for the two kinds the spec considers fatal invariant violations
	/// rather than errors reachable through malformed but otherwise
	/// well-typed input.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Error::NotImplemented(_) | Error::Internal(_))
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::NullArgument(what) => write!(f, "null argument: {}", what),
			Error::Corrupted(detail) => write!(f, "corrupted record: {}", detail),
			Error::TypeMismatch { expected, found } =>
				write!(f, "type mismatch: expected {}, found {}", expected, found),
			Error::OutOfBounds { index, len } =>
				write!(f, "index {} out of bounds (len {})", index, len),
			Error::IllegalOperation(what) => write!(f, "illegal operation: {}", what),
			Error::IllegalState(what) => write!(f, "illegal state: {}", what),
			Error::NotImplemented(what) => write!(f, "not implemented: {}", what),
			Error::UnsupportedContainer(what) => write!(f, "unsupported container: {}", what),
			Error::DotPathParse(detail) => write!(f, "dot-path parse error: {}", detail),
			Error::Outdated => write!(f, "revise attempted on a non-latest record version"),
			Error::Internal(detail) => write!(f, "internal invariant violation: {}", detail),
		}
	}
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn fatal_kinds_are_exactly_two() {
		assert!(Error::Internal("x".into()).is_fatal());
		assert!(Error::NotImplemented("x").is_fatal());
		assert!(!Error::Outdated.is_fatal());
		assert!(!Error::OutOfBounds { index: 0, len: 0 }.is_fatal());
	}

	#[test]
	fn corrupted_includes_hex_dump() {
		let e = Error::corrupted("bad marker", &[0xff, 0x00]);
		assert!(format!("{}", e).contains("ff00"));
	}
}
