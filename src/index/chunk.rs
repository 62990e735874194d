use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::bwt::{build_bwt, reverse_text, sample_sa};
use crate::index::sa::build_sa;
use crate::index::wavelet::{SymbolMask, WaveletTree};
use crate::search::cache::ResultCache;
use crate::util::aa::{SENTINEL, SEPARATOR};
use crate::util::cancel::Cancellation;

/// BWT 行区间 [left, right]（闭区间）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub left: usize,
    pub right: usize,
}

impl Interval {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.right + 1 - self.left
    }
}

/// 使用哪一个索引：正向文本（向左扩展）或反向文本（等价于向右扩展）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// 分块文本的累加器：每个蛋白前置一个分隔符，结尾补分隔符与终止符。
#[derive(Debug, Default)]
pub struct ChunkText {
    text: Vec<u8>,
    boundaries: Vec<u64>,
    accessions: Vec<String>,
}

impl ChunkText {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            text: Vec::with_capacity(bytes + 2),
            ..Self::default()
        }
    }

    pub fn push_protein(&mut self, accession: &str, sequence: &[u8]) {
        self.text.push(SEPARATOR);
        self.boundaries.push(self.text.len() as u64);
        self.accessions.push(accession.to_string());
        self.text.extend_from_slice(sequence);
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessions.is_empty()
    }

    pub fn protein_count(&self) -> usize {
        self.accessions.len()
    }

    fn finish(mut self) -> (Vec<u8>, Vec<u64>, Vec<String>) {
        self.text.push(SEPARATOR);
        self.text.push(SENTINEL);
        (self.text, self.boundaries, self.accessions)
    }
}

/// 一个密封的索引分块：正反两个方向的 BWT 小波树、less 表、采样 SA 与蛋白边界。
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IndexChunk {
    text_len: usize,
    sampling_shift: u32,
    suffix_array_sampled: Vec<u32>,
    reverse_suffix_array_sampled: Vec<u32>,
    bwt_forward: WaveletTree,
    bwt_reverse: WaveletTree,
    less_forward: Vec<usize>,
    less_reverse: Vec<usize>,
    protein_boundaries: Vec<u64>,
    accessions: Vec<String>,
    #[serde(skip)]
    cache: ResultCache,
}

fn excluded_symbols() -> SymbolMask {
    SymbolMask::from_symbols(&[SEPARATOR, SENTINEL])
}

struct DirectionParts {
    sampled: Vec<u32>,
    wavelet: WaveletTree,
    less: Vec<usize>,
}

fn build_direction(text: &[u8], shift: u32) -> DirectionParts {
    let sa = build_sa(text);
    let bwt = build_bwt(text, &sa);
    let sampled = sample_sa(&sa, shift);
    drop(sa);
    let wavelet = WaveletTree::build(&bwt, excluded_symbols());
    let less = wavelet.create_less_table();
    DirectionParts { sampled, wavelet, less }
}

impl IndexChunk {
    /// 构建一个分块。被取消时返回 `Ok(None)`。
    pub fn build(chunk: ChunkText, sampling_shift: u32, cancel: &dyn Cancellation) -> Result<Option<Self>> {
        let (text, boundaries, accessions) = chunk.finish();
        if text.len() >= u32::MAX as usize {
            return Err(Error::InvalidParameter(format!(
                "chunk of {} bytes exceeds the 32-bit suffix array range",
                text.len()
            )));
        }
        let n = text.len();

        let forward = build_direction(&text, sampling_shift);
        debug!("chunk forward index built: {} symbols, {} proteins", n, accessions.len());
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let rev = reverse_text(&text);
        drop(text);
        let reverse = build_direction(&rev, sampling_shift);
        debug!("chunk reverse index built: {} symbols", n);

        Ok(Some(Self {
            text_len: n,
            sampling_shift,
            suffix_array_sampled: forward.sampled,
            reverse_suffix_array_sampled: reverse.sampled,
            bwt_forward: forward.wavelet,
            bwt_reverse: reverse.wavelet,
            less_forward: forward.less,
            less_reverse: reverse.less,
            protein_boundaries: boundaries,
            accessions,
            cache: ResultCache::default(),
        }))
    }

    #[inline]
    fn wavelet(&self, dir: Direction) -> &WaveletTree {
        match dir {
            Direction::Forward => &self.bwt_forward,
            Direction::Reverse => &self.bwt_reverse,
        }
    }

    #[inline]
    fn less(&self, dir: Direction) -> &[usize] {
        match dir {
            Direction::Forward => &self.less_forward,
            Direction::Reverse => &self.less_reverse,
        }
    }

    pub fn full_interval(&self) -> Interval {
        Interval::new(0, self.text_len.saturating_sub(1))
    }

    /// 反向搜索一步：在区间前（对反向索引而言是后）追加一个符号。
    pub fn extend(&self, interval: Interval, symbol: u8, dir: Direction) -> Result<Option<Interval>> {
        let wt = self.wavelet(dir);
        Ok(wt
            .single_range_query(interval.left, interval.right, symbol)?
            .map(|r| {
                let base = self.less(dir)[symbol as usize & 0x7F];
                Interval::new(base + r.before, base + r.through - 1)
            }))
    }

    /// 精确查找 `pattern` 在原文本中的出现区间。正向索引从模式末尾向前扩展，反向索引从头向后扩展。
    pub fn backward_search(&self, pattern: &[u8], dir: Direction) -> Result<Option<Interval>> {
        let ordered: Vec<u8> = match dir {
            Direction::Forward => pattern.iter().rev().copied().collect(),
            Direction::Reverse => pattern.to_vec(),
        };
        let mut interval = self.full_interval();
        for c in ordered {
            match self.extend(interval, c, dir)? {
                Some(iv) => interval = iv,
                None => return Ok(None),
            }
        }
        Ok(Some(interval))
    }

    /// 对区间内出现的每个残基符号（不含分隔符与终止符）做一步扩展。
    pub fn range_extend(&self, interval: Interval, dir: Direction) -> Result<Vec<(u8, Interval)>> {
        let less = self.less(dir);
        Ok(self
            .wavelet(dir)
            .range_query(interval.left, interval.right)?
            .into_iter()
            .map(|r| {
                let base = less[r.symbol as usize];
                (r.symbol, Interval::new(base + r.before, base + r.through - 1))
            })
            .collect())
    }

    /// LF 映射：行 `row` 的后缀前移一位后所在的行。
    pub fn lf(&self, row: usize, dir: Direction) -> Result<usize> {
        let wt = self.wavelet(dir);
        let c = wt.access(row)?;
        Ok(self.less(dir)[c as usize] + wt.rank(row, c)? - 1)
    }

    /// 由正向 BWT 行恢复其文本位置：LF 回退到采样行，再加上步数。
    pub fn resolve_text_position(&self, row: usize) -> Result<usize> {
        if row >= self.text_len {
            return Err(Error::OutOfRange { index: row, len: self.text_len });
        }
        let mask = (1usize << self.sampling_shift) - 1;
        let mut r = row;
        let mut steps = 0usize;
        while r & mask != 0 {
            r = self.lf(r, Direction::Forward)?;
            steps += 1;
        }
        let sampled = self.suffix_array_sampled[r >> self.sampling_shift] as usize;
        Ok((sampled + steps) % self.text_len)
    }

    /// 文本位置 -> (蛋白序号, 蛋白内 0 起偏移)。落在首个蛋白之前返回 None。
    pub fn resolve_protein(&self, position: usize) -> Option<(usize, usize)> {
        let pos = position as u64;
        let idx = self.protein_boundaries.partition_point(|&b| b <= pos);
        if idx == 0 {
            return None;
        }
        let start = self.protein_boundaries[idx - 1];
        Some((idx - 1, (pos - start) as usize))
    }

    pub fn accession(&self, protein: usize) -> Option<&str> {
        self.accessions.get(protein).map(String::as_str)
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn set_text_len(&mut self, len: usize) {
        self.text_len = len;
    }

    pub fn protein_count(&self) -> usize {
        self.accessions.len()
    }

    // ── 结构字段的读写，供外部持久化使用 ────────────────

    pub fn sampling_shift(&self) -> u32 {
        self.sampling_shift
    }

    pub fn set_sampling_shift(&mut self, shift: u32) {
        self.sampling_shift = shift;
    }

    pub fn suffix_array_sampled(&self) -> &[u32] {
        &self.suffix_array_sampled
    }

    pub fn set_suffix_array_sampled(&mut self, sampled: Vec<u32>) {
        self.suffix_array_sampled = sampled;
    }

    pub fn reverse_suffix_array_sampled(&self) -> &[u32] {
        &self.reverse_suffix_array_sampled
    }

    pub fn set_reverse_suffix_array_sampled(&mut self, sampled: Vec<u32>) {
        self.reverse_suffix_array_sampled = sampled;
    }

    pub fn bwt_forward(&self) -> &WaveletTree {
        &self.bwt_forward
    }

    pub fn set_bwt_forward(&mut self, wt: WaveletTree) {
        self.bwt_forward = wt;
    }

    pub fn bwt_reverse(&self) -> &WaveletTree {
        &self.bwt_reverse
    }

    pub fn set_bwt_reverse(&mut self, wt: WaveletTree) {
        self.bwt_reverse = wt;
    }

    pub fn less_forward(&self) -> &[usize] {
        &self.less_forward
    }

    pub fn set_less_forward(&mut self, less: Vec<usize>) {
        self.less_forward = less;
    }

    pub fn less_reverse(&self) -> &[usize] {
        &self.less_reverse
    }

    pub fn set_less_reverse(&mut self, less: Vec<usize>) {
        self.less_reverse = less;
    }

    pub fn protein_boundaries(&self) -> &[u64] {
        &self.protein_boundaries
    }

    pub fn set_protein_boundaries(&mut self, boundaries: Vec<u64>) {
        self.protein_boundaries = boundaries;
    }

    pub fn accessions(&self) -> &[String] {
        &self.accessions
    }

    pub fn set_accessions(&mut self, accessions: Vec<String>) {
        self.accessions = accessions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa::{build_sa, inverse_sa};
    use crate::util::cancel::NeverCancel;

    fn chunk_of(proteins: &[(&str, &[u8])], shift: u32) -> (IndexChunk, Vec<u8>) {
        let mut ct = ChunkText::with_capacity(64);
        for (acc, seq) in proteins {
            ct.push_protein(acc, seq);
        }
        let mut text = ct.text.clone();
        text.push(SEPARATOR);
        text.push(SENTINEL);
        let chunk = IndexChunk::build(ct, shift, &NeverCancel).unwrap().unwrap();
        (chunk, text)
    }

    fn count_occurrences(text: &[u8], pat: &[u8]) -> usize {
        text.windows(pat.len()).filter(|w| *w == pat).count()
    }

    fn search(chunk: &IndexChunk, pat: &[u8], dir: Direction) -> Option<Interval> {
        chunk.backward_search(pat, dir).unwrap()
    }

    #[test]
    fn text_layout_and_boundaries() {
        let (chunk, text) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"PEPTIDE")], 3);
        assert_eq!(text, b"/MPEPTIDEK/PEPTIDE/\x7F".to_vec());
        assert_eq!(chunk.protein_boundaries(), &[1, 11]);
        assert_eq!(chunk.text_len(), text.len());
    }

    #[test]
    fn every_position_round_trips() {
        let (chunk, text) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"PEPTIDEPEPTIDE"), ("P3", b"ACDXBK")], 2);
        let isa = inverse_sa(&build_sa(&text));
        for (p, &row) in isa.iter().enumerate() {
            assert_eq!(chunk.resolve_text_position(row as usize).unwrap(), p);
        }
    }

    #[test]
    fn backward_search_counts_occurrences() {
        let (chunk, text) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"PEPTIDEPEPTIDE")], 3);
        for pat in [&b"PEPTIDE"[..], b"PEP", b"E", b"K/", b"DEP", b"TIDEK"] {
            let iv = search(&chunk, pat, Direction::Forward).unwrap();
            assert_eq!(iv.size(), count_occurrences(&text, pat), "pattern {:?}", pat);
        }
        assert!(search(&chunk, b"KM", Direction::Forward).is_none());
    }

    #[test]
    fn reverse_index_agrees_with_forward() {
        let (chunk, text) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"ACDEF")], 1);
        for pat in [&b"TIDE"[..], b"DEF", b"EK", b"/A"] {
            let fwd = search(&chunk, pat, Direction::Forward).unwrap();
            let rev = search(&chunk, pat, Direction::Reverse).unwrap();
            assert_eq!(rev.size(), count_occurrences(&text, pat));
            assert_eq!(rev.size(), fwd.size());
        }
        assert!(search(&chunk, b"KA", Direction::Reverse).is_none());
    }

    #[test]
    fn less_tables_count_smaller_symbols() {
        let (chunk, text) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"WYV")], 3);
        let rev_text = reverse_text(&text);
        for c in 0..128usize {
            let fwd = text.iter().filter(|&&b| (b as usize) < c).count();
            let rev = rev_text.iter().filter(|&&b| (b as usize) < c).count();
            assert_eq!(chunk.less_forward()[c], fwd);
            assert_eq!(chunk.less_reverse()[c], rev);
        }
    }

    #[test]
    fn resolve_protein_uses_greatest_boundary() {
        let (chunk, _) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"PEPTIDE")], 3);
        assert_eq!(chunk.resolve_protein(0), None);
        assert_eq!(chunk.resolve_protein(1), Some((0, 0)));
        assert_eq!(chunk.resolve_protein(3), Some((0, 2)));
        // 恰好等于边界时归属该蛋白
        assert_eq!(chunk.resolve_protein(11), Some((1, 0)));
        assert_eq!(chunk.accession(1), Some("P2"));
    }

    #[test]
    fn range_extend_skips_separators() {
        let (chunk, _) = chunk_of(&[("P1", b"AK"), ("P2", b"CK")], 0);
        let k = chunk.extend(chunk.full_interval(), b'K', Direction::Forward).unwrap().unwrap();
        let next: Vec<u8> = chunk
            .range_extend(k, Direction::Forward)
            .unwrap()
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(next, b"AC".to_vec());
    }

    #[test]
    fn chunk_reassembled_from_fields() {
        let (src, _) = chunk_of(&[("P1", b"MPEPTIDEK"), ("P2", b"PEPTIDE")], 2);
        let mut copy = IndexChunk::default();
        copy.set_text_len(src.text_len());
        copy.set_sampling_shift(src.sampling_shift());
        copy.set_suffix_array_sampled(src.suffix_array_sampled().to_vec());
        copy.set_reverse_suffix_array_sampled(src.reverse_suffix_array_sampled().to_vec());
        copy.set_bwt_forward(src.bwt_forward().clone());
        copy.set_bwt_reverse(src.bwt_reverse().clone());
        copy.set_less_forward(src.less_forward().to_vec());
        copy.set_less_reverse(src.less_reverse().to_vec());
        copy.set_protein_boundaries(src.protein_boundaries().to_vec());
        copy.set_accessions(src.accessions().to_vec());

        let iv = search(&copy, b"PEPTIDE", Direction::Forward).unwrap();
        assert_eq!(Some(iv), search(&src, b"PEPTIDE", Direction::Forward));
        let mut proteins: Vec<usize> = (iv.left..=iv.right)
            .map(|row| copy.resolve_protein(copy.resolve_text_position(row).unwrap()).unwrap().0)
            .collect();
        proteins.sort_unstable();
        assert_eq!(proteins, vec![0, 1]);
        assert_eq!(search(&copy, b"EDIT", Direction::Reverse), None);
        assert!(search(&copy, b"TIDE", Direction::Reverse).is_some());
    }

    #[test]
    fn cancelled_build_returns_none() {
        let flag = std::sync::atomic::AtomicBool::new(true);
        let mut ct = ChunkText::with_capacity(8);
        ct.push_protein("P1", b"PEPTIDE");
        assert!(IndexChunk::build(ct, 3, &flag).unwrap().is_none());
    }
}
