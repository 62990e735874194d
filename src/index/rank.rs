use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 带 rank 索引的定长位向量。
///
/// 每个 64 位字前缀存一个累计 popcount，rank 查询为一次查表加一次部分字的
/// popcount，O(1)。索引占用 O(N) 位。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankBitVec {
    len: usize,
    bits: Vec<u64>,
    /// cumulative[w] = 字 w 之前的置位数
    cumulative: Vec<u64>,
}

impl RankBitVec {
    /// 分配 `len` 位的全零位向量；置位后需调用 [`build_index`](Self::build_index)。
    pub fn with_len(len: usize) -> Self {
        let words = (len + 63) / 64;
        Self {
            len,
            bits: vec![0; words],
            cumulative: vec![0; words + 1],
        }
    }

    /// 由布尔序列一次性构建（已建索引）。
    pub fn from_bools<I: IntoIterator<Item = bool>>(values: I) -> Self {
        let mut words: Vec<u64> = Vec::new();
        let mut len = 0usize;
        for v in values {
            if len & 63 == 0 {
                words.push(0);
            }
            if v {
                words[len >> 6] |= 1u64 << (len & 63);
            }
            len += 1;
        }
        let mut bv = Self {
            len,
            cumulative: vec![0; words.len() + 1],
            bits: words,
        };
        bv.build_index();
        bv
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 置位；rank 查询前须调用 `build_index`。
    pub fn set(&mut self, pos: usize) -> Result<()> {
        if pos >= self.len {
            return Err(Error::OutOfRange { index: pos, len: self.len });
        }
        self.bits[pos >> 6] |= 1u64 << (pos & 63);
        Ok(())
    }

    pub fn build_index(&mut self) {
        let mut acc = 0u64;
        for (w, word) in self.bits.iter().enumerate() {
            self.cumulative[w] = acc;
            acc += u64::from(word.count_ones());
        }
        let last = self.bits.len();
        self.cumulative[last] = acc;
    }

    /// 原始位值。
    pub fn is_set(&self, pos: usize) -> Result<bool> {
        if pos >= self.len {
            return Err(Error::OutOfRange { index: pos, len: self.len });
        }
        Ok(self.get_unchecked(pos))
    }

    /// [0, pos] 内置位（`ones == true`）或未置位的个数。
    pub fn rank(&self, pos: usize, ones: bool) -> Result<usize> {
        if pos >= self.len {
            return Err(Error::OutOfRange { index: pos, len: self.len });
        }
        let set = self.rank_ones_before(pos + 1);
        Ok(if ones { set } else { pos + 1 - set })
    }

    /// [0, pos) 内的置位数，pos 可等于 len。
    #[inline]
    pub(crate) fn rank_ones_before(&self, pos: usize) -> usize {
        debug_assert!(pos <= self.len);
        let word = pos >> 6;
        let offset = pos & 63;
        let base = self.cumulative[word] as usize;
        if offset == 0 {
            return base;
        }
        let mask = (1u64 << offset) - 1;
        base + (self.bits[word] & mask).count_ones() as usize
    }

    #[inline]
    pub(crate) fn rank_zeros_before(&self, pos: usize) -> usize {
        pos - self.rank_ones_before(pos)
    }

    #[inline]
    pub(crate) fn get_unchecked(&self, pos: usize) -> bool {
        (self.bits[pos >> 6] >> (pos & 63)) & 1 != 0
    }

    /// 置位总数。
    pub fn count_ones(&self) -> usize {
        self.cumulative[self.bits.len()] as usize
    }
}
