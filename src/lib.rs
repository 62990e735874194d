//! # pepmap-rust
//!
//! 基于 FM 索引的蛋白质数据库肽段 / 序列标签映射工具。
//!
//! 本 crate 提供：
//!
//! - **索引构建**：蛋白库分块，SA-IS 构建后缀数组，BWT 存入 Huffman 形小波树，正反双向索引
//! - **肽段映射**：按氨基酸匹配策略（I/L 等价、B/J/Z/X 模糊码）映射肽段，可容忍插入、缺失与替换
//! - **标签映射**：`<质量>序列<质量>` 形式的序列标签，质量缺口按容差闭合，支持固定 / 可变 / 末端修饰
//! - **结果缓存**：记忆 “缺口-序列-缺口” 标签的反向遍历结果
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use pepmap_rust::index::FMIndex;
//! use pepmap_rust::io::protein::VecProteinSource;
//! use pepmap_rust::params::{SearchSettings, SequenceMatching};
//! use pepmap_rust::search::Tag;
//! use pepmap_rust::util::cancel::NeverCancel;
//!
//! let mut proteins = VecProteinSource::from_pairs([("P1", "TESTMRITESTCKTESTK")]);
//! let index = FMIndex::build(&mut proteins, SearchSettings::default(), &NeverCancel)?;
//!
//! let matching = SequenceMatching::default();
//! for hit in index.map_peptide("ITESTCK", &matching)? {
//!     println!("{} {} {}", hit.accession, hit.peptide, hit.index);
//! }
//!
//! let tag: Tag = "<501.27>TEST<231.10>".parse()?;
//! let hits = index.map_tag(&tag, &matching)?;
//! println!("{} tag mapping(s)", hits.len());
//! # Ok::<(), pepmap_rust::Error>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`io`]：FASTA 蛋白库解析与蛋白来源
//! - [`index`]：索引构建（rank 位向量、小波树、后缀数组、BWT、分块 FM 索引）
//! - [`params`]：质量容差、匹配策略、修饰与变异设置
//! - [`search`]：标签、查找表、匹配引擎与缓存
//! - [`util`]：氨基酸字母表与取消信号

pub mod error;
pub mod index;
pub mod io;
pub mod params;
pub mod search;
pub mod util;

pub use error::{Error, Result};
