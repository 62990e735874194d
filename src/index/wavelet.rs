use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::rank::RankBitVec;
use crate::util::aa::ALPHABET_SIZE;

/// 128 个 ASCII 符号的位集合。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMask([u64; 2]);

impl SymbolMask {
    pub fn from_symbols(symbols: &[u8]) -> Self {
        let mut mask = Self::default();
        for &s in symbols {
            mask.insert(s);
        }
        mask
    }

    #[inline]
    pub fn insert(&mut self, symbol: u8) {
        let s = symbol as usize & 0x7F;
        self.0[s >> 6] |= 1u64 << (s & 63);
    }

    #[inline]
    pub fn contains(&self, symbol: u8) -> bool {
        let s = symbol as usize;
        s < ALPHABET_SIZE && (self.0[s >> 6] >> (s & 63)) & 1 != 0
    }

    #[inline]
    pub fn intersects_complement_of(&self, other: &SymbolMask) -> bool {
        (self.0[0] & !other.0[0]) != 0 || (self.0[1] & !other.0[1]) != 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum Child {
    Leaf(u8),
    Node(u32),
}

/// 树节点：位为 1 表示该位置的符号进入右子树。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WaveletNode {
    bits: RankBitVec,
    right_symbols: SymbolMask,
    left: Child,
    right: Child,
    continue_left: bool,
    continue_right: bool,
}

/// 一个符号在区间内的出现范围：`[before, through)` 为该符号的局部秩区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolRange {
    pub symbol: u8,
    /// 区间左端之前该符号的出现次数
    pub before: usize,
    /// 到区间右端（含）为止该符号的出现次数
    pub through: usize,
}

/// Huffman 形（按频率平衡划分）的小波树，节点以 arena 存放。
///
/// 每个内部节点将其局部字母表按字典序切成左右两半，切点使两侧频率之和
/// 尽量相等；字母表大小为 1 时直接成为叶子。`excluded` 标记分隔符与终止符，
/// 仅含排除符号的子树在 `range_query` 中被跳过。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveletTree {
    len: usize,
    root: Option<Child>,
    nodes: Vec<WaveletNode>,
    alphabet: SymbolMask,
    excluded: SymbolMask,
}

impl WaveletTree {
    pub fn build(seq: &[u8], excluded: SymbolMask) -> Self {
        let mut freq = vec![0usize; ALPHABET_SIZE];
        for &c in seq {
            freq[c as usize & 0x7F] += 1;
        }
        let symbols: Vec<(u8, usize)> = freq
            .iter()
            .enumerate()
            .filter(|(_, &f)| f > 0)
            .map(|(c, &f)| (c as u8, f))
            .collect();
        let alphabet = SymbolMask::from_symbols(&symbols.iter().map(|&(c, _)| c).collect::<Vec<_>>());

        let mut tree = Self {
            len: seq.len(),
            root: None,
            nodes: Vec::new(),
            alphabet,
            excluded,
        };
        if !symbols.is_empty() {
            let root = tree.build_node(&symbols, seq.to_vec());
            tree.root = Some(root);
        }
        tree
    }

    fn build_node(&mut self, symbols: &[(u8, usize)], seq: Vec<u8>) -> Child {
        if symbols.len() == 1 {
            return Child::Leaf(symbols[0].0);
        }
        let split = balanced_split(symbols);
        let (left_symbols, right_symbols) = symbols.split_at(split);
        let right_mask = SymbolMask::from_symbols(&right_symbols.iter().map(|&(c, _)| c).collect::<Vec<_>>());
        let left_mask = SymbolMask::from_symbols(&left_symbols.iter().map(|&(c, _)| c).collect::<Vec<_>>());

        let bits = RankBitVec::from_bools(seq.iter().map(|&c| right_mask.contains(c)));
        let mut left_seq = Vec::with_capacity(bits.len() - bits.count_ones());
        let mut right_seq = Vec::with_capacity(bits.count_ones());
        for &c in &seq {
            if right_mask.contains(c) {
                right_seq.push(c);
            } else {
                left_seq.push(c);
            }
        }
        drop(seq);

        let id = self.nodes.len();
        self.nodes.push(WaveletNode {
            bits,
            right_symbols: right_mask,
            left: Child::Leaf(0),
            right: Child::Leaf(0),
            continue_left: left_mask.intersects_complement_of(&self.excluded),
            continue_right: right_mask.intersects_complement_of(&self.excluded),
        });
        let left = self.build_node(left_symbols, left_seq);
        let right = self.build_node(right_symbols, right_seq);
        self.nodes[id].left = left;
        self.nodes[id].right = right;
        Child::Node(id as u32)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `symbol` 在 [0, pos) 中的出现次数，pos <= len。
    fn rank_before(&self, pos: usize, symbol: u8) -> usize {
        if pos == 0 || !self.alphabet.contains(symbol) {
            return 0;
        }
        let mut child = match self.root {
            Some(c) => c,
            None => return 0,
        };
        let mut p = pos;
        loop {
            match child {
                Child::Leaf(s) => return if s == symbol { p } else { 0 },
                Child::Node(id) => {
                    let node = &self.nodes[id as usize];
                    if node.right_symbols.contains(symbol) {
                        p = node.bits.rank_ones_before(p);
                        child = node.right;
                    } else {
                        p = node.bits.rank_zeros_before(p);
                        child = node.left;
                    }
                    if p == 0 {
                        return 0;
                    }
                }
            }
        }
    }

    /// [0, index] 内 `symbol` 的出现次数。
    pub fn rank(&self, index: usize, symbol: u8) -> Result<usize> {
        if index >= self.len {
            return Err(Error::OutOfRange { index, len: self.len });
        }
        Ok(self.rank_before(index + 1, symbol))
    }

    /// 位置 `index` 处的符号。
    pub fn access(&self, index: usize) -> Result<u8> {
        if index >= self.len {
            return Err(Error::OutOfRange { index, len: self.len });
        }
        let mut child = self.root.ok_or(Error::OutOfRange { index, len: 0 })?;
        let mut p = index;
        loop {
            match child {
                Child::Leaf(s) => return Ok(s),
                Child::Node(id) => {
                    let node = &self.nodes[id as usize];
                    if node.bits.get_unchecked(p) {
                        p = node.bits.rank_ones_before(p);
                        child = node.right;
                    } else {
                        p = node.bits.rank_zeros_before(p);
                        child = node.left;
                    }
                }
            }
        }
    }

    /// 将 [left, right] 收窄到 BWT 符号等于 `symbol` 的行，返回其局部秩范围；
    /// 为空时返回 None。
    pub fn single_range_query(&self, left: usize, right: usize, symbol: u8) -> Result<Option<SymbolRange>> {
        if right >= self.len {
            return Err(Error::OutOfRange { index: right, len: self.len });
        }
        if left > right {
            return Ok(None);
        }
        let before = self.rank_before(left, symbol);
        let through = self.rank_before(right + 1, symbol);
        Ok((through > before).then_some(SymbolRange { symbol, before, through }))
    }

    /// 枚举 [left, right] 中出现的每个非排除符号及其局部秩范围（按字典序）。
    pub fn range_query(&self, left: usize, right: usize) -> Result<Vec<SymbolRange>> {
        if right >= self.len {
            return Err(Error::OutOfRange { index: right, len: self.len });
        }
        let mut out = Vec::new();
        if left > right {
            return Ok(out);
        }
        let root = match self.root {
            Some(c) => c,
            None => return Ok(out),
        };
        // (child, [lo, hi) 局部区间, 原始 lo 之前的计数意义相同)
        let mut stack: Vec<(Child, usize, usize)> = vec![(root, left, right + 1)];
        while let Some((child, lo, hi)) = stack.pop() {
            match child {
                Child::Leaf(s) => {
                    if !self.excluded.contains(s) {
                        out.push(SymbolRange { symbol: s, before: lo, through: hi });
                    }
                }
                Child::Node(id) => {
                    let node = &self.nodes[id as usize];
                    let ones_lo = node.bits.rank_ones_before(lo);
                    let ones_hi = node.bits.rank_ones_before(hi);
                    // 右子树先入栈，保证左子树（字典序较小）先输出
                    if node.continue_right && ones_hi > ones_lo {
                        stack.push((node.right, ones_lo, ones_hi));
                    }
                    let zeros_lo = lo - ones_lo;
                    let zeros_hi = hi - ones_hi;
                    if node.continue_left && zeros_hi > zeros_lo {
                        stack.push((node.left, zeros_lo, zeros_hi));
                    }
                }
            }
        }
        Ok(out)
    }

    /// less[c] = 全文中字典序严格小于 c 的符号个数（128 个槽位）。
    pub fn create_less_table(&self) -> Vec<usize> {
        let mut less = vec![0usize; ALPHABET_SIZE];
        let mut acc = 0usize;
        for c in 0..ALPHABET_SIZE {
            less[c] = acc;
            acc += self.rank_before(self.len, c as u8);
        }
        less
    }
}

/// 按字典序切分，使左右两侧的频率和之差最小；两侧均非空。
fn balanced_split(symbols: &[(u8, usize)]) -> usize {
    let total: usize = symbols.iter().map(|&(_, f)| f).sum();
    let mut best = 1usize;
    let mut best_diff = usize::MAX;
    let mut acc = 0usize;
    for (i, &(_, f)) in symbols[..symbols.len() - 1].iter().enumerate() {
        acc += f;
        let diff = acc.abs_diff(total - acc);
        if diff < best_diff {
            best_diff = diff;
            best = i + 1;
        }
    }
    best
}
