//! 索引层：rank 位向量、小波树、SA-IS、BWT 与分块 FM 索引。

pub mod bwt;
pub mod chunk;
pub mod fm;
pub mod rank;
pub mod sa;
pub mod wavelet;

pub use chunk::{Direction, IndexChunk, Interval};
pub use fm::{FMIndex, IndexMeta};
