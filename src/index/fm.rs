use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::chunk::{ChunkText, Direction, IndexChunk};
use crate::io::protein::ProteinSource;
use crate::params::matching::SequenceMatching;
use crate::params::settings::SearchSettings;
use crate::search::cache::CacheStats;
use crate::search::context::SearchContext;
use crate::search::mapping::PeptideProteinMapping;
use crate::search::matcher::TagMatcher;
use crate::search::tag::Tag;
use crate::util::cancel::Cancellation;

/// 索引文件附带的构建信息。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub source_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 分块的蛋白 FM 索引：
/// - 蛋白按输入顺序装入分块，每块不超过 `chunk_byte_budget` 字节（单个超大蛋白独占一块）。
/// - 每块同时持有正向与反向文本的索引，查询在各块上独立执行后按块顺序拼接。
/// - 修饰、容差与变异设置在构建时固定，查询时只选择序列匹配策略。
#[derive(Debug, Serialize, Deserialize)]
pub struct FMIndex {
    #[serde(with = "settings_as_json")]
    settings: SearchSettings,
    chunks: Vec<IndexChunk>,
    protein_count: usize,
    usable: bool,
    meta: Option<IndexMeta>,
    #[serde(skip)]
    context: Option<SearchContext>,
}

/// 设置中含内部标记的枚举，二进制格式下以 JSON 字符串保存。
mod settings_as_json {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::params::settings::SearchSettings;

    pub fn serialize<S: Serializer>(settings: &SearchSettings, serializer: S) -> Result<S::Ok, S::Error> {
        let json = serde_json::to_string(settings).map_err(S::Error::custom)?;
        serializer.serialize_str(&json)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SearchSettings, D::Error> {
        let json = String::deserialize(deserializer)?;
        serde_json::from_str(&json).map_err(D::Error::custom)
    }
}

impl FMIndex {
    /// 两遍构建：第一遍按字节预算规划分块，第二遍逐块读取并建索引。
    ///
    /// 被取消时返回 `Ok`，但索引不可查询（`is_usable() == false`）。
    pub fn build(source: &mut dyn ProteinSource, settings: SearchSettings, cancel: &dyn Cancellation) -> Result<Self> {
        let context = SearchContext::new(settings.clone())?;
        let budget = settings.chunk_byte_budget;

        source.rewind()?;
        let mut plan: Vec<(usize, usize)> = Vec::new(); // (蛋白数, 字节数)
        let (mut count, mut bytes, mut total) = (0usize, 0usize, 0usize);
        while let Some(protein) = source.next_protein()? {
            let cost = protein.sequence.len() + 1;
            if count > 0 && bytes + cost > budget {
                plan.push((count, bytes));
                count = 0;
                bytes = 0;
            }
            count += 1;
            bytes += cost;
            total += 1;
        }
        if count > 0 {
            plan.push((count, bytes));
        }
        if total == 0 {
            return Err(Error::EmptySource);
        }
        info!("planned {} chunk(s) for {} proteins", plan.len(), total);

        let mut index = Self {
            settings,
            chunks: Vec::with_capacity(plan.len()),
            protein_count: total,
            usable: false,
            meta: None,
            context: Some(context),
        };

        source.rewind()?;
        let mut found = 0usize;
        for (i, &(proteins, bytes)) in plan.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("index construction cancelled after {} of {} chunk(s)", i, plan.len());
                return Ok(index);
            }
            let mut text = ChunkText::with_capacity(bytes);
            for _ in 0..proteins {
                let protein = source
                    .next_protein()?
                    .ok_or(Error::SourceExhausted { expected: total, found })?;
                text.push_protein(&protein.accession, &protein.sequence);
                found += 1;
            }
            match IndexChunk::build(text, index.settings.sampling_shift, cancel)? {
                Some(chunk) => index.chunks.push(chunk),
                None => {
                    warn!("index construction cancelled after {} of {} chunk(s)", i, plan.len());
                    return Ok(index);
                }
            }
            info!("chunk {}/{} built: {} proteins, {} bytes", i + 1, plan.len(), proteins, bytes);
        }
        if source.next_protein()?.is_some() {
            return Err(Error::SourceOverrun { expected: total });
        }

        index.usable = true;
        info!("index ready: {} proteins in {} chunk(s)", total, index.chunks.len());
        Ok(index)
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn protein_count(&self) -> usize {
        self.protein_count
    }

    pub fn chunks(&self) -> &[IndexChunk] {
        &self.chunks
    }

    pub fn meta(&self) -> Option<&IndexMeta> {
        self.meta.as_ref()
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = Some(meta);
    }

    fn context(&self) -> Result<&SearchContext> {
        if !self.usable {
            return Err(Error::IndexNotUsable);
        }
        self.context.as_ref().ok_or(Error::IndexNotUsable)
    }

    /// 精确模式在所有分块中的出现次数（不区分蛋白）。
    pub fn count_occurrences(&self, pattern: &[u8]) -> Result<usize> {
        self.context()?;
        let mut total = 0;
        for chunk in &self.chunks {
            if let Some(iv) = chunk.backward_search(pattern, Direction::Forward)? {
                total += iv.size();
            }
        }
        Ok(total)
    }

    pub fn map_peptide(&self, peptide: &str, matching: &SequenceMatching) -> Result<Vec<PeptideProteinMapping>> {
        let ctx = self.context()?;
        let mut out = Vec::new();
        for chunk in &self.chunks {
            out.extend(TagMatcher::new(chunk, ctx, matching).map_peptide(peptide)?);
        }
        debug!("peptide {}: {} mapping(s)", peptide, out.len());
        Ok(out)
    }

    pub fn map_tag(&self, tag: &Tag, matching: &SequenceMatching) -> Result<Vec<PeptideProteinMapping>> {
        let ctx = self.context()?;
        let mut out = Vec::new();
        for chunk in &self.chunks {
            out.extend(TagMatcher::new(chunk, ctx, matching).map_tag(tag)?);
        }
        debug!("tag {}: {} mapping(s)", tag, out.len());
        Ok(out)
    }

    /// 各分块结果缓存的汇总。
    pub fn cache_stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for chunk in &self.chunks {
            stats += chunk.cache().stats()?;
        }
        Ok(stats)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    /// 读取索引并重建查询所需的派生表；结果缓存从空开始。
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let r = BufReader::new(File::open(path)?);
        let mut idx: Self = bincode::deserialize_from(r)?;
        idx.context = Some(SearchContext::new(idx.settings.clone())?);
        Ok(idx)
    }
}
