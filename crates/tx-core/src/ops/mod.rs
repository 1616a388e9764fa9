//! Derived operators. Each computes its shape and elements from its children
//! without allocating; most are lvalues when their child is.

pub mod assign;
pub mod elementwise;
pub mod fftshift;
pub mod flatten;
pub mod generator;
pub mod hermitian;
pub mod interleaved;
pub mod permute;
pub mod remap;
pub mod repmat;
pub mod reverse;
pub mod slice;

pub use assign::{assign, Assign};
pub use elementwise::{add, map, mul, sequenced, sub, zip_with, Map, Sequenced, ZipWith};
pub use fftshift::{fftshift_1d, fftshift_2d, ifftshift_1d, ifftshift_2d, FftShift};
pub use flatten::{flatten, Flatten};
pub use generator::{from_fn, linspace, range, Generator, Range};
pub use hermitian::{hermitian, Hermitian};
pub use interleaved::{interleaved, planar, Interleaved, Planar};
pub use permute::{inverse_permutation, permute, reduction_permutation, Permute};
pub use remap::{remap, remap_dims, Remap};
pub use repmat::{repmat, repmat_uniform, RepMat};
pub use reverse::{reverse, reverse_dims, Reverse};
pub use slice::{slice, slice_strided, Slice, SliceEnd};
