//! Bundle archive format implementations.
//!
//! Each format implements [`BundleReader`](crate::traits::BundleReader):
//! - `jar` - zip archives carrying `META-INF/MANIFEST.MF`

pub mod jar;

pub use jar::JarReader;
