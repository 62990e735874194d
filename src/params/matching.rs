use serde::{Deserialize, Serialize};

use crate::util::aa;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingType {
    /// 逐字符相等
    String,
    /// 模糊码 B/J/Z/X 与其成员互相匹配
    AminoAcid,
    /// 在 AminoAcid 的基础上 I 与 L 等价
    IndistinguishableAminoAcids,
}

/// 单次查询的序列匹配策略。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceMatching {
    pub matching_type: MatchingType,
    /// 匹配中 X 所占比例的上限（严格小于）
    pub limit_x: f64,
    /// 一条标签肽段上可变修饰的最大个数
    pub max_ptms_per_tag_peptide: usize,
}

impl Default for SequenceMatching {
    fn default() -> Self {
        Self {
            matching_type: MatchingType::IndistinguishableAminoAcids,
            limit_x: 0.25,
            max_ptms_per_tag_peptide: 3,
        }
    }
}

impl SequenceMatching {
    pub fn new(matching_type: MatchingType, limit_x: f64) -> Self {
        Self { matching_type, limit_x, ..Self::default() }
    }

    pub fn string() -> Self {
        Self::new(MatchingType::String, 0.25)
    }

    /// 长度为 `len` 的序列中允许的 X 个数：满足 x / len < limit_x 的最大 x。
    pub fn max_x(&self, len: usize) -> usize {
        if self.matching_type == MatchingType::String {
            return 0;
        }
        let bound = (self.limit_x * len as f64).ceil() as i64 - 1;
        bound.max(0) as usize
    }

    /// 查询残基 `residue` 可匹配的蛋白符号（不含 X 通配展开）。
    pub fn alternatives(&self, residue: u8) -> Vec<u8> {
        let mut alts = vec![residue];
        if self.matching_type == MatchingType::String {
            return alts;
        }
        let mut push = |c: u8| {
            if !alts.contains(&c) {
                alts.push(c);
            }
        };
        for &m in aa::ambiguity_members(residue) {
            push(m);
        }
        for code in aa::ambiguity_codes_containing(residue) {
            push(code);
        }
        if self.matching_type == MatchingType::IndistinguishableAminoAcids {
            match residue {
                b'I' => push(b'L'),
                b'L' => push(b'I'),
                _ => {}
            }
        }
        alts
    }

    /// 查询中的 X 是否可匹配任意残基。
    pub fn expands_query_x(&self) -> bool {
        self.matching_type != MatchingType::String
    }

    /// 写入缓存键的策略前缀。
    pub fn cache_prefix(&self) -> String {
        let kind = match self.matching_type {
            MatchingType::String => 's',
            MatchingType::AminoAcid => 'a',
            MatchingType::IndistinguishableAminoAcids => 'i',
        };
        format!("{}{:.3}p{}", kind, self.limit_x, self.max_ptms_per_tag_peptide)
    }
}
