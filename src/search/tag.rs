use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::aa;

/// 标签组件：氨基酸序列、质量缺口，或逐位置给出残基集合的模式（不支持搜索）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagComponent {
    AminoAcidSequence(String),
    MassGap(f64),
    AminoAcidPattern(Vec<String>),
}

/// 由序列与质量缺口交替组成的查询。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub components: Vec<TagComponent>,
}

/// 规范化后的标签元素。
#[derive(Debug, Clone, PartialEq)]
pub enum TagElement {
    Run(Vec<u8>),
    Gap(f64),
}

impl Tag {
    pub fn new(components: Vec<TagComponent>) -> Self {
        Self { components }
    }

    /// 校验并规范化：合并相邻序列、累加相邻缺口。
    pub fn elements(&self) -> Result<Vec<TagElement>> {
        if self.components.is_empty() {
            return Err(Error::UnsupportedTag("empty tag".to_string()));
        }
        let mut out: Vec<TagElement> = Vec::with_capacity(self.components.len());
        for component in &self.components {
            match component {
                TagComponent::AminoAcidSequence(seq) => {
                    let mut residues = Vec::with_capacity(seq.len());
                    for b in seq.bytes() {
                        let up = b.to_ascii_uppercase();
                        if !aa::is_residue(up) {
                            return Err(Error::UnsupportedTag(format!(
                                "'{}' is not an amino acid in '{}'",
                                b as char, seq
                            )));
                        }
                        residues.push(up);
                    }
                    if residues.is_empty() {
                        continue;
                    }
                    match out.last_mut() {
                        Some(TagElement::Run(prev)) => prev.extend_from_slice(&residues),
                        _ => out.push(TagElement::Run(residues)),
                    }
                }
                TagComponent::MassGap(mass) => {
                    if !mass.is_finite() || *mass <= 0.0 {
                        return Err(Error::UnsupportedTag(format!("mass gap {} is not positive", mass)));
                    }
                    match out.last_mut() {
                        Some(TagElement::Gap(prev)) => *prev += mass,
                        _ => out.push(TagElement::Gap(*mass)),
                    }
                }
                TagComponent::AminoAcidPattern(_) => {
                    return Err(Error::UnsupportedTag("amino acid patterns cannot be mapped".to_string()));
                }
            }
        }
        if !out.iter().any(|e| matches!(e, TagElement::Run(_))) {
            return Err(Error::UnsupportedTag("tag has no amino acid sequence".to_string()));
        }
        Ok(out)
    }
}

/// 文本形式：质量缺口写在尖括号内，例如 `<501.27>TEST<231.10>`。
impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut components = Vec::new();
        let mut seq = String::new();
        let mut chars = s.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '<' => {
                    if !seq.is_empty() {
                        components.push(TagComponent::AminoAcidSequence(std::mem::take(&mut seq)));
                    }
                    let mut num = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '>' {
                            closed = true;
                            break;
                        }
                        num.push(c);
                    }
                    if !closed {
                        return Err(Error::UnsupportedTag(format!("unterminated mass gap in '{}'", s)));
                    }
                    let mass: f64 = num
                        .trim()
                        .parse()
                        .map_err(|_| Error::UnsupportedTag(format!("bad mass '{}' in '{}'", num, s)))?;
                    components.push(TagComponent::MassGap(mass));
                }
                c if c.is_whitespace() => {}
                c => seq.push(c),
            }
        }
        if !seq.is_empty() {
            components.push(TagComponent::AminoAcidSequence(seq));
        }
        Ok(Tag::new(components))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.components {
            match c {
                TagComponent::AminoAcidSequence(s) => write!(f, "{}", s)?,
                TagComponent::MassGap(m) => write!(f, "<{}>", m)?,
                TagComponent::AminoAcidPattern(p) => write!(f, "[{}]", p.join("|"))?,
            }
        }
        Ok(())
    }
}
