use thiserror::Error;

/// 索引构建、配置与查询过程中的错误。
#[derive(Debug, Error)]
pub enum Error {
    /// rank / access 越界：索引损坏或调用方违反约定。
    #[error("position {index} out of range for structure of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// 第二遍读取的蛋白数少于第一遍计数。
    #[error("protein source exhausted early: expected {expected} proteins, found {found}")]
    SourceExhausted { expected: usize, found: usize },

    /// 第二遍读取的蛋白数多于第一遍计数。
    #[error("protein source yielded more than the {expected} proteins counted in the first pass")]
    SourceOverrun { expected: usize },

    /// 蛋白来源中没有任何序列。
    #[error("protein source contains no sequences")]
    EmptySource,

    #[error("modification '{name}' uses a pattern spanning {length} positions (at most 62 are supported)")]
    PatternTooLong { name: String, length: usize },

    #[error("fixed modifications '{first}' and '{second}' target the same site '{site}'")]
    ConflictingFixedModification {
        first: String,
        second: String,
        site: String,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// 标签中出现了无法处理的组件。
    #[error("unsupported tag: {0}")]
    UnsupportedTag(String),

    /// 结果缓存的互斥锁被毒化（持锁线程 panic）。
    #[error("result cache mutex poisoned")]
    CachePoisoned,

    /// 构建被取消或失败后，索引不可查询。
    #[error("index is not usable (construction was cancelled)")]
    IndexNotUsable,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
