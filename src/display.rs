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

//! Debug-formatting helpers shared by the error and corruption paths.

/// Render a byte slice as a short hex string, truncated for log/error output.
pub fn hex(data: &[u8]) -> String {
	const MAX: usize = 32;
	if data.len() > MAX {
		format!("{}…({} bytes)", hex::encode(&data[..MAX]), data.len())
	} else {
		hex::encode(data)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn short_slice_is_exact() {
		assert_eq!(hex(&[0x01, 0xab, 0xff]), "01abff");
	}

	#[test]
	fn long_slice_is_truncated() {
		let data = vec![0u8; 40];
		let rendered = hex(&data);
		assert!(rendered.ends_with("…(40 bytes)"));
	}
}
