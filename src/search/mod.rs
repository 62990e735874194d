//! 查询层：标签解析、质量查找表、动态规划匹配与结果缓存。

pub mod cache;
pub mod cell;
pub mod context;
pub mod lookup;
pub mod mapping;
pub mod matcher;
pub mod tag;
pub mod terminal;

pub use cache::{CacheStats, ResultCache};
pub use context::SearchContext;
pub use mapping::{ModificationMatch, PeptideProteinMapping, Variant, VariantMatch, VariantSite};
pub use matcher::{MatchStats, TagMatcher};
pub use tag::{Tag, TagComponent, TagElement};
