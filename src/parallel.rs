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

//! Fixed-width bulk kernels used by batch builders (column fills,
//! sorted-set dedup prep, and the like). Every operation here takes a
//! `Mode` hint; `Mode::Multi` runs on a scoped `rayon` pool, `Mode::Single`
//! runs the equivalent serial iterator chain. The two must always produce
//! the same output for the same input -- callers are free to flip the
//! hint for debugging without observing a behavior change.

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Single-thread vs multi-thread dispatch hint. Multi-thread variants
/// partition the input across `rayon`'s work-stealing pool rather than
/// the original `T+1`-chunk-by-hand scheme; the pool's own load balancing
/// subsumes the "residual chunk on the caller thread" idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Single,
	Multi,
}

/// Visit every element in place. Order of visitation is unspecified under
/// `Mode::Multi`; use `map`/`gather`/`scatter` when the result must come
/// back in input order.
pub fn for_each<T, F>(data: &mut [T], mode: Mode, f: F)
where
	T: Send,
	F: Fn(usize, &mut T) + Sync,
{
	match mode {
		Mode::Single => {
			for (i, item) in data.iter_mut().enumerate() {
				f(i, item);
			}
		}
		Mode::Multi => {
			data.par_iter_mut().enumerate().for_each(|(i, item)| f(i, item));
		}
	}
}

/// Transform every element, preserving input order (spec: "stable
/// partition").
pub fn map<T, U, F>(data: &[T], mode: Mode, f: F) -> Vec<U>
where
	T: Sync,
	U: Send,
	F: Fn(usize, &T) -> U + Sync,
{
	match mode {
		Mode::Single => data.iter().enumerate().map(|(i, item)| f(i, item)).collect(),
		Mode::Multi => data.par_iter().enumerate().map(|(i, item)| f(i, item)).collect(),
	}
}

/// Collect `data[indices[i]]` for each `i`, in the order `indices` gives
/// them. `OutOfBounds` surfaces the first bad index found; under
/// `Mode::Multi` "first" means first in the output position, not first
/// discovered by whichever worker got there first.
pub fn gather<T>(data: &[T], indices: &[usize], mode: Mode) -> Result<Vec<T>>
where
	T: Copy + Sync + Send,
{
	let fetch = |idx: &usize| -> Result<T> {
		data.get(*idx).copied().ok_or(Error::OutOfBounds { index: *idx, len: data.len() })
	};
	match mode {
		Mode::Single => indices.iter().map(fetch).collect(),
		Mode::Multi => indices.par_iter().map(fetch).collect(),
	}
}

/// Resolve byte offsets (`base + index * stride`) without touching the
/// underlying values -- the address-only half of a gather, used when the
/// caller wants to batch-compute positions before a separate read pass.
pub fn gather_addr(base: usize, stride: usize, indices: &[usize], mode: Mode) -> Vec<usize> {
	let addr = |idx: &usize| base + idx * stride;
	match mode {
		Mode::Single => indices.iter().map(addr).collect(),
		Mode::Multi => indices.par_iter().map(addr).collect(),
	}
}

/// Write `values[i]` into `dst[indices[i]]`. The caller is responsible for
/// `indices` being pairwise distinct under `Mode::Multi`; this is not
/// checked, matching the "no shared-mutable state across workers" model --
/// colliding indices are a caller bug, not a race this kernel guards
/// against.
pub fn scatter<T>(dst: &mut [T], indices: &[usize], values: &[T], mode: Mode) -> Result<()>
where
	T: Copy + Send + Sync,
{
	if indices.len() != values.len() {
		return Err(Error::IllegalOperation("scatter: indices and values must be the same length"));
	}
	for idx in indices {
		if *idx >= dst.len() {
			return Err(Error::OutOfBounds { index: *idx, len: dst.len() });
		}
	}
	match mode {
		Mode::Single => {
			for (idx, value) in indices.iter().zip(values.iter()) {
				dst[*idx] = *value;
			}
		}
		Mode::Multi => {
			// Indices are bounds-checked above; caller guarantees they are
			// pairwise distinct, so concurrent writes land in disjoint cells.
			let ptr = dst.as_mut_ptr() as usize;
			let len = dst.len();
			indices.par_iter().zip(values.par_iter()).for_each(|(idx, value)| {
				debug_assert!(*idx < len);
				unsafe {
					*(ptr as *mut T).add(*idx) = *value;
				}
			});
		}
	}
	Ok(())
}

/// Reorder `data` according to `permutation` (`permutation[i]` is the
/// source index that should land at position `i`), implemented as the
/// gather/scatter decomposition: gather the permuted values into a fresh
/// buffer, then scatter them back over the original.
pub fn shuffle<T>(data: &mut [T], permutation: &[usize], mode: Mode) -> Result<()>
where
	T: Copy + Send + Sync,
{
	if permutation.len() != data.len() {
		return Err(Error::IllegalOperation("shuffle: permutation length must match data length"));
	}
	let gathered = gather(data, permutation, mode)?;
	let positions: Vec<usize> = (0..data.len()).collect();
	scatter(data, &positions, &gathered, mode)
}

/// Indices of elements matching `pred`, in input order (spec: "stable
/// partition", same guarantee as `map`/`gather`/`scatter`).
pub fn filter_early<T, F>(data: &[T], mode: Mode, pred: F) -> Vec<usize>
where
	T: Sync,
	F: Fn(usize, &T) -> bool + Sync,
{
	match mode {
		Mode::Single => data.iter().enumerate().filter(|(i, item)| pred(*i, item)).map(|(i, _)| i).collect(),
		Mode::Multi => data.par_iter().enumerate().filter(|(i, item)| pred(*i, item)).map(|(i, _)| i).collect(),
	}
}

/// Indices of elements matching `pred`, one `Vec` per chunk in the order
/// `rayon` happened to schedule them -- callers that need a single global,
/// input-ordered list should use `filter_early` instead. `base_offset` is
/// applied to every returned index up front so a caller driving several
/// `filter_late` calls over sub-slices of one larger buffer can request
/// positions already relative to that buffer.
pub fn filter_late<T, F>(data: &[T], base_offset: usize, mode: Mode, pred: F) -> Vec<usize>
where
	T: Sync,
	F: Fn(usize, &T) -> bool + Sync,
{
	let local = match mode {
		Mode::Single => data
			.iter()
			.enumerate()
			.filter(|(i, item)| pred(*i, item))
			.map(|(i, _)| i)
			.collect::<Vec<_>>(),
		Mode::Multi => data
			.par_iter()
			.enumerate()
			.filter(|(i, item)| pred(*i, item))
			.map(|(i, _)| i)
			.collect::<Vec<_>>(),
	};
	local.into_iter().map(|i| i + base_offset).collect()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn for_each_visits_every_element_both_modes() {
		let mut single = vec![1u32, 2, 3, 4];
		for_each(&mut single, Mode::Single, |_, v| *v *= 2);
		assert_eq!(single, vec![2, 4, 6, 8]);

		let mut multi = vec![1u32, 2, 3, 4];
		for_each(&mut multi, Mode::Multi, |_, v| *v *= 2);
		assert_eq!(multi, vec![2, 4, 6, 8]);
	}

	#[test]
	fn map_preserves_order_both_modes() {
		let data = vec![10u32, 20, 30];
		assert_eq!(map(&data, Mode::Single, |i, v| v + i as u32), vec![10, 21, 32]);
		assert_eq!(map(&data, Mode::Multi, |i, v| v + i as u32), vec![10, 21, 32]);
	}

	#[test]
	fn gather_collects_in_index_order() {
		let data = vec![5u32, 6, 7, 8];
		let got = gather(&data, &[3, 0, 2], Mode::Single).unwrap();
		assert_eq!(got, vec![8, 5, 7]);
		let got = gather(&data, &[3, 0, 2], Mode::Multi).unwrap();
		assert_eq!(got, vec![8, 5, 7]);
	}

	#[test]
	fn gather_rejects_out_of_bounds_index() {
		let data = vec![1u32, 2];
		assert!(gather(&data, &[5], Mode::Single).is_err());
	}

	#[test]
	fn gather_addr_resolves_offsets() {
		let addrs = gather_addr(100, 4, &[0, 1, 2], Mode::Single);
		assert_eq!(addrs, vec![100, 104, 108]);
		let addrs = gather_addr(100, 4, &[0, 1, 2], Mode::Multi);
		assert_eq!(addrs, vec![100, 104, 108]);
	}

	#[test]
	fn scatter_writes_into_named_slots() {
		let mut dst = vec![0u32; 4];
		scatter(&mut dst, &[3, 1], &[9, 7], Mode::Single).unwrap();
		assert_eq!(dst, vec![0, 7, 0, 9]);

		let mut dst = vec![0u32; 4];
		scatter(&mut dst, &[3, 1], &[9, 7], Mode::Multi).unwrap();
		assert_eq!(dst, vec![0, 7, 0, 9]);
	}

	#[test]
	fn scatter_rejects_mismatched_lengths() {
		let mut dst = vec![0u32; 2];
		assert!(scatter(&mut dst, &[0], &[1, 2], Mode::Single).is_err());
	}

	#[test]
	fn shuffle_applies_permutation_both_modes() {
		let mut data = vec![10u32, 20, 30];
		shuffle(&mut data, &[2, 0, 1], Mode::Single).unwrap();
		assert_eq!(data, vec![30, 10, 20]);

		let mut data = vec![10u32, 20, 30];
		shuffle(&mut data, &[2, 0, 1], Mode::Multi).unwrap();
		assert_eq!(data, vec![30, 10, 20]);
	}

	#[test]
	fn filter_early_preserves_input_order_both_modes() {
		let data = vec![1u32, 2, 3, 4, 5];
		let idx = filter_early(&data, Mode::Single, |_, v| v % 2 == 0);
		assert_eq!(idx, vec![1, 3]);
		let idx = filter_early(&data, Mode::Multi, |_, v| v % 2 == 0);
		assert_eq!(idx, vec![1, 3]);
	}

	#[test]
	fn filter_late_applies_base_offset() {
		let data = vec![1u32, 2, 3, 4];
		let mut idx = filter_late(&data, 100, Mode::Single, |_, v| v % 2 == 0);
		idx.sort_unstable();
		assert_eq!(idx, vec![101, 103]);
	}
}
