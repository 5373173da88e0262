//! Low-level null-bitmap primitives shared by `cpandas-core`'s columns.

mod bitmap;

pub use bitmap::Bitmap;
