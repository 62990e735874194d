use std::fmt;

use serde::{Deserialize, Serialize};

/// 肽段上的一个修饰：名称、是否可变、1 起位点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationMatch {
    pub name: String,
    pub variable: bool,
    pub site: usize,
}

/// 相对参考蛋白的单残基变异。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    Insertion { residue: char },
    Deletion { residue: char },
    Substitution { original: char, substituted: char },
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Insertion { residue } => write!(f, "ins{}", residue),
            Variant::Deletion { residue } => write!(f, "del{}", residue),
            Variant::Substitution { original, substituted } => write!(f, "{}>{}", original, substituted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSite {
    /// 查询序列上的 1 起位置
    pub site: usize,
    pub variant: Variant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMatch {
    pub variants: Vec<VariantSite>,
    /// 插入数减缺失数
    pub length_delta: i32,
    /// 按文本顺序的编辑脚本：`-` 匹配，`*` 插入，大写为替换后的残基，小写为缺失的残基
    pub edit_script: String,
}

/// 一条肽段到蛋白的映射结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideProteinMapping {
    pub accession: String,
    pub peptide: String,
    /// 蛋白上的 1 起起始位置
    pub index: usize,
    pub modifications: Vec<ModificationMatch>,
    pub variant_match: Option<VariantMatch>,
}

impl PeptideProteinMapping {
    /// 制表符分隔的一行输出：accession, peptide, index, modifications, variants。
    pub fn to_tsv(&self) -> String {
        let mods = if self.modifications.is_empty() {
            "-".to_string()
        } else {
            self.modifications
                .iter()
                .map(|m| format!("{}@{}{}", m.name, m.site, if m.variable { "" } else { "(fixed)" }))
                .collect::<Vec<_>>()
                .join(";")
        };
        let variants = match &self.variant_match {
            Some(vm) if !vm.variants.is_empty() => vm
                .variants
                .iter()
                .map(|v| format!("{}:{}", v.site, v.variant))
                .collect::<Vec<_>>()
                .join(";"),
            _ => "-".to_string(),
        };
        format!("{}\t{}\t{}\t{}\t{}", self.accession, self.peptide, self.index, mods, variants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_line() {
        let m = PeptideProteinMapping {
            accession: "P1".to_string(),
            peptide: "PEPTADE".to_string(),
            index: 2,
            modifications: vec![ModificationMatch {
                name: "Oxidation of M".to_string(),
                variable: true,
                site: 1,
            }],
            variant_match: Some(VariantMatch {
                variants: vec![VariantSite {
                    site: 5,
                    variant: Variant::Substitution { original: 'I', substituted: 'A' },
                }],
                length_delta: 0,
                edit_script: "----A--".to_string(),
            }),
        };
        assert_eq!(m.to_tsv(), "P1\tPEPTADE\t2\tOxidation of M@1\t5:I>A");
    }
}
