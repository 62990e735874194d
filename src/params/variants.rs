use serde::{Deserialize, Serialize};

use crate::util::aa::ALPHABET_SIZE;

/// 已使用的编辑次数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EditCounts {
    pub insertions: u8,
    pub deletions: u8,
    pub substitutions: u8,
}

impl EditCounts {
    #[inline]
    pub fn total(&self) -> usize {
        self.insertions as usize + self.deletions as usize + self.substitutions as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insertion,
    Deletion,
    Substitution,
}

/// 变异容忍预算：一个总预算，或插入/缺失/替换各自独立的预算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VariantBudget {
    Generic {
        max_variants: usize,
    },
    Specific {
        max_insertions: usize,
        max_deletions: usize,
        max_substitutions: usize,
    },
}

impl Default for VariantBudget {
    fn default() -> Self {
        VariantBudget::Specific {
            max_insertions: 0,
            max_deletions: 0,
            max_substitutions: 0,
        }
    }
}

impl VariantBudget {
    pub fn total(&self) -> usize {
        match *self {
            VariantBudget::Generic { max_variants } => max_variants,
            VariantBudget::Specific {
                max_insertions,
                max_deletions,
                max_substitutions,
            } => max_insertions + max_deletions + max_substitutions,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, VariantBudget::Generic { .. })
    }

    /// 在已有编辑 `counts` 的基础上能否再做一次 `kind`。
    pub fn allows(&self, counts: &EditCounts, kind: EditKind) -> bool {
        match *self {
            VariantBudget::Generic { max_variants } => counts.total() < max_variants,
            VariantBudget::Specific {
                max_insertions,
                max_deletions,
                max_substitutions,
            } => match kind {
                EditKind::Insertion => (counts.insertions as usize) < max_insertions,
                EditKind::Deletion => (counts.deletions as usize) < max_deletions,
                EditKind::Substitution => (counts.substitutions as usize) < max_substitutions,
            },
        }
    }
}

/// 128×128 的替换许可矩阵：allowed(original, substituted)。
///
/// JSON 中写作预设名 `"all"`、`"single_base"`、`"none"`，或替换对列表 `[["I","V"], ...]`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatrixSpec", into = "MatrixSpec")]
pub struct SubstitutionMatrix {
    rows: Vec<[u64; 2]>,
}

impl Default for SubstitutionMatrix {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MatrixSpec {
    Preset(String),
    Pairs(Vec<(char, char)>),
}

impl TryFrom<MatrixSpec> for SubstitutionMatrix {
    type Error = String;

    fn try_from(spec: MatrixSpec) -> std::result::Result<Self, String> {
        match spec {
            MatrixSpec::Preset(name) => match name.as_str() {
                "all" => Ok(Self::all()),
                "single_base" => Ok(Self::single_base()),
                "none" => Ok(Self::none()),
                other => Err(format!("unknown substitution matrix '{}'", other)),
            },
            MatrixSpec::Pairs(pairs) => {
                let mut m = Self::none();
                for (original, substituted) in pairs {
                    if !original.is_ascii() || !substituted.is_ascii() {
                        return Err(format!("invalid substitution {} -> {}", original, substituted));
                    }
                    m.add(original.to_ascii_uppercase() as u8, substituted.to_ascii_uppercase() as u8);
                }
                Ok(m)
            }
        }
    }
}

impl From<SubstitutionMatrix> for MatrixSpec {
    fn from(m: SubstitutionMatrix) -> Self {
        for (name, preset) in [
            ("none", SubstitutionMatrix::none()),
            ("all", SubstitutionMatrix::all()),
            ("single_base", SubstitutionMatrix::single_base()),
        ] {
            if m == preset {
                return MatrixSpec::Preset(name.to_string());
            }
        }
        let mut pairs = Vec::new();
        for o in 0..ALPHABET_SIZE as u8 {
            for s in 0..ALPHABET_SIZE as u8 {
                if m.allowed(o, s) {
                    pairs.push((o as char, s as char));
                }
            }
        }
        MatrixSpec::Pairs(pairs)
    }
}

/// 标准遗传密码，密码子顺序为 TCAG × TCAG × TCAG。
const GENETIC_CODE: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

impl SubstitutionMatrix {
    pub fn none() -> Self {
        Self { rows: vec![[0; 2]; ALPHABET_SIZE] }
    }

    /// 任意两个不同残基之间均可替换。
    pub fn all() -> Self {
        let mut m = Self::none();
        for &a in crate::util::aa::STANDARD_RESIDUES.iter() {
            for &b in crate::util::aa::STANDARD_RESIDUES.iter() {
                if a != b {
                    m.add(a, b);
                }
            }
        }
        m
    }

    /// 单个核苷酸突变可达的氨基酸替换。
    pub fn single_base() -> Self {
        let mut m = Self::none();
        for codon in 0..64usize {
            let from = GENETIC_CODE[codon];
            if from == b'*' {
                continue;
            }
            for shift in [0usize, 2, 4] {
                for base in 0..4usize {
                    let other = (codon & !(3 << shift)) | (base << shift);
                    let to = GENETIC_CODE[other];
                    if to != b'*' && to != from {
                        m.add(from, to);
                    }
                }
            }
        }
        m
    }

    pub fn add(&mut self, original: u8, substituted: u8) {
        let s = substituted as usize & 0x7F;
        self.rows[original as usize & 0x7F][s >> 6] |= 1u64 << (s & 63);
    }

    #[inline]
    pub fn allowed(&self, original: u8, substituted: u8) -> bool {
        let (o, s) = (original as usize, substituted as usize);
        if o >= ALPHABET_SIZE || s >= ALPHABET_SIZE {
            return false;
        }
        (self.rows[o][s >> 6] >> (s & 63)) & 1 != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantSettings {
    #[serde(default)]
    pub budget: VariantBudget,
    /// 仅在 Specific 预算下生效；Generic 允许任意替换
    #[serde(default)]
    pub substitution_matrix: SubstitutionMatrix,
}

impl VariantSettings {
    pub fn generic(max_variants: usize) -> Self {
        Self {
            budget: VariantBudget::Generic { max_variants },
            substitution_matrix: SubstitutionMatrix::all(),
        }
    }

    pub fn specific(max_insertions: usize, max_deletions: usize, max_substitutions: usize) -> Self {
        Self {
            budget: VariantBudget::Specific {
                max_insertions,
                max_deletions,
                max_substitutions,
            },
            substitution_matrix: SubstitutionMatrix::all(),
        }
    }

    pub fn substitution_allowed(&self, original: u8, substituted: u8) -> bool {
        self.budget.is_generic() || self.substitution_matrix.allowed(original, substituted)
    }
}
