use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::params::mass::{MassTolerance, MassUnit};
use crate::params::matching::SequenceMatching;
use crate::search::cell::CachedPass;
use crate::search::tag::TagElement;

/// 每个分块一份的结果缓存：记忆 “质量 / 序列 / 质量” 形标签的反向遍历结果。
///
/// 只追加、不淘汰、先写者胜。互斥锁只在读写映射表时持有。
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, Arc<CachedPass>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl std::ops::AddAssign for CacheStats {
    fn add_assign(&mut self, rhs: Self) {
        self.hits += rhs.hits;
        self.misses += rhs.misses;
        self.entries += rhs.entries;
    }
}

impl ResultCache {
    /// 仅对恰好三段 [缺口, 序列, 缺口] 的标签给出键：策略前缀 + 序列 + 尾部质量（5 位小数）。
    pub fn key(elements: &[TagElement], matching: &SequenceMatching, tolerance: &MassTolerance) -> Option<String> {
        match elements {
            [TagElement::Gap(_), TagElement::Run(run), TagElement::Gap(trailing)] => {
                let unit = match tolerance.unit {
                    MassUnit::Da => "da",
                    MassUnit::Ppm => "ppm",
                };
                Some(format!(
                    "{}|{}{}|{}|{:.5}",
                    matching.cache_prefix(),
                    tolerance.value,
                    unit,
                    String::from_utf8_lossy(run),
                    trailing
                ))
            }
            _ => None,
        }
    }

    /// `Ok(None)` 为未命中；命中空结果表示该标签已被证明无匹配。
    pub fn lookup(&self, key: &str) -> Result<Option<Arc<CachedPass>>> {
        let found = {
            let map = self.entries.lock().map_err(|_| Error::CachePoisoned)?;
            map.get(key).cloned()
        };
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    /// 插入快照；键已存在时保留旧值。
    pub fn store(&self, key: String, pass: CachedPass) -> Result<()> {
        let mut map = self.entries.lock().map_err(|_| Error::CachePoisoned)?;
        map.entry(key).or_insert_with(|| Arc::new(pass));
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries.lock().map_err(|_| Error::CachePoisoned)?.len();
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::chunk::Interval;
    use crate::search::cell::SearchCell;

    fn elements() -> Vec<TagElement> {
        vec![TagElement::Gap(501.27), TagElement::Run(b"TEST".to_vec()), TagElement::Gap(231.1)]
    }

    #[test]
    fn key_only_for_gap_run_gap() {
        let m = SequenceMatching::default();
        let tol = MassTolerance::da(0.02);
        let key = ResultCache::key(&elements(), &m, &tol).unwrap();
        assert!(key.ends_with("|TEST|231.10000"), "{}", key);
        let other = vec![TagElement::Run(b"TEST".to_vec()), TagElement::Gap(1.0)];
        assert!(ResultCache::key(&other, &m, &tol).is_none());
    }

    #[test]
    fn first_writer_wins() {
        let cache = ResultCache::default();
        assert!(cache.lookup("k").unwrap().is_none());

        let first = CachedPass {
            cells: vec![SearchCell::root(Interval::new(0, 1))],
            leaves: vec![0],
        };
        cache.store("k".to_string(), first).unwrap();
        cache.store("k".to_string(), CachedPass::default()).unwrap();

        let got = cache.lookup("k").unwrap().unwrap();
        assert_eq!(got.leaves, vec![0]);
        let stats = cache.stats().unwrap();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn empty_entry_is_a_hit() {
        let cache = ResultCache::default();
        cache.store("none".to_string(), CachedPass::default()).unwrap();
        let got = cache.lookup("none").unwrap().unwrap();
        assert!(got.is_empty());
    }
}
