use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::aa::{self, ALPHABET_SIZE, RESIDUES};

/// 修饰作用位点的类别。带 `Residue` 后缀的末端类别同时限定末端残基。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationCategory {
    Residue,
    ProteinNTerm,
    ProteinNTermResidue,
    PeptideNTerm,
    PeptideNTermResidue,
    ProteinCTerm,
    ProteinCTermResidue,
    PeptideCTerm,
    PeptideCTermResidue,
}

impl ModificationCategory {
    pub fn is_terminal(self) -> bool {
        self != ModificationCategory::Residue
    }

    pub fn is_residue_specific(self) -> bool {
        matches!(
            self,
            Self::Residue
                | Self::ProteinNTermResidue
                | Self::PeptideNTermResidue
                | Self::ProteinCTermResidue
                | Self::PeptideCTermResidue
        )
    }
}

/// 一个翻译后修饰的定义。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub name: String,
    /// 单同位素质量偏移（Da）
    pub mass: f64,
    #[serde(default)]
    pub variable: bool,
    pub category: ModificationCategory,
    /// 修饰位点上允许的残基
    #[serde(default)]
    pub residues: String,
    /// 修饰位点周围的序列模式，每个位置一个残基集合；目前只接受空模式
    #[serde(default)]
    pub pattern: Vec<String>,
}

impl Modification {
    pub fn fixed(name: &str, mass: f64, category: ModificationCategory, residues: &str) -> Self {
        Self {
            name: name.to_string(),
            mass,
            variable: false,
            category,
            residues: residues.to_string(),
            pattern: Vec::new(),
        }
    }

    pub fn variable(name: &str, mass: f64, category: ModificationCategory, residues: &str) -> Self {
        Self { variable: true, ..Self::fixed(name, mass, category, residues) }
    }

    pub fn targets(&self, residue: u8) -> bool {
        self.residues.as_bytes().contains(&residue)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern.len() > 62 {
            return Err(Error::PatternTooLong {
                name: self.name.clone(),
                length: self.pattern.len(),
            });
        }
        if !self.pattern.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "modification '{}': pattern modifications are not supported",
                self.name
            )));
        }
        if !self.mass.is_finite() {
            return Err(Error::InvalidParameter(format!("modification '{}' has a non-finite mass", self.name)));
        }
        if self.category.is_residue_specific() && self.residues.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "modification '{}' is residue specific but targets no residue",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModificationSettings {
    pub modifications: Vec<Modification>,
}

impl ModificationSettings {
    pub fn new(modifications: Vec<Modification>) -> Self {
        Self { modifications }
    }
}

/// 残基在质量缺口中的一种质量取值，带所用的固定/可变修饰（指向修饰表的下标）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassOption {
    pub mass: f64,
    pub fixed: Option<usize>,
    pub variable: Option<usize>,
}

/// 末端候选修饰：类别内的固定与可变修饰下标。
#[derive(Debug, Clone, Default)]
pub struct TerminalSlots {
    pub fixed: Vec<usize>,
    pub variable: Vec<usize>,
}

/// 查询用的修饰表：每个残基的质量选项，以及按类别分组的末端修饰。
#[derive(Debug, Clone)]
pub struct ModificationTables {
    modifications: Vec<Modification>,
    residue_masses: Vec<Vec<MassOption>>,
    terminal: Vec<(ModificationCategory, TerminalSlots)>,
}

const TERMINAL_CATEGORIES: [ModificationCategory; 8] = [
    ModificationCategory::ProteinNTerm,
    ModificationCategory::ProteinNTermResidue,
    ModificationCategory::PeptideNTerm,
    ModificationCategory::PeptideNTermResidue,
    ModificationCategory::ProteinCTerm,
    ModificationCategory::ProteinCTermResidue,
    ModificationCategory::PeptideCTerm,
    ModificationCategory::PeptideCTermResidue,
];

impl ModificationTables {
    pub fn new(settings: &ModificationSettings) -> Result<Self> {
        let modifications = settings.modifications.clone();
        for m in &modifications {
            m.validate()?;
        }

        // 每个残基最多一个固定修饰
        let mut fixed_on: Vec<Option<usize>> = vec![None; ALPHABET_SIZE];
        for (i, m) in modifications.iter().enumerate() {
            if m.variable || m.category != ModificationCategory::Residue {
                continue;
            }
            for &r in m.residues.as_bytes() {
                let slot = &mut fixed_on[r as usize & 0x7F];
                if let Some(prev) = *slot {
                    return Err(Error::ConflictingFixedModification {
                        first: modifications[prev].name.clone(),
                        second: m.name.clone(),
                        site: (r as char).to_string(),
                    });
                }
                *slot = Some(i);
            }
        }

        let mut residue_masses = vec![Vec::new(); ALPHABET_SIZE];
        for &r in RESIDUES.iter() {
            let Some(base) = aa::monoisotopic_mass(r) else {
                continue;
            };
            let fixed = fixed_on[r as usize];
            let fixed_mass = base + fixed.map_or(0.0, |i| modifications[i].mass);
            let options = &mut residue_masses[r as usize];
            options.push(MassOption { mass: fixed_mass, fixed, variable: None });
            for (i, m) in modifications.iter().enumerate() {
                if m.variable && m.category == ModificationCategory::Residue && m.targets(r) {
                    options.push(MassOption {
                        mass: fixed_mass + m.mass,
                        fixed,
                        variable: Some(i),
                    });
                }
            }
        }

        let mut terminal = Vec::with_capacity(TERMINAL_CATEGORIES.len());
        for category in TERMINAL_CATEGORIES {
            let mut slots = TerminalSlots::default();
            for (i, m) in modifications.iter().enumerate() {
                if m.category != category {
                    continue;
                }
                if m.variable {
                    slots.variable.push(i);
                } else {
                    slots.fixed.push(i);
                }
            }
            terminal.push((category, slots));
        }
        check_terminal_conflicts(&modifications, &terminal)?;

        Ok(Self { modifications, residue_masses, terminal })
    }

    pub fn modification(&self, index: usize) -> &Modification {
        &self.modifications[index]
    }

    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    /// 残基的所有质量取值，首项为（含固定修饰的）基础质量。
    pub fn mass_options(&self, residue: u8) -> &[MassOption] {
        &self.residue_masses[residue as usize & 0x7F]
    }

    /// 含固定修饰的基础质量。
    pub fn base_mass(&self, residue: u8) -> Option<f64> {
        self.mass_options(residue).first().map(|o| o.mass)
    }

    pub fn terminal(&self, category: ModificationCategory) -> &TerminalSlots {
        // TERMINAL_CATEGORIES 覆盖全部末端类别
        self.terminal
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(&EMPTY_SLOTS, |(_, s)| s)
    }

    /// 所有正质量残基取值（去重），用于质量可达性表。
    pub fn all_residue_masses(&self) -> Vec<f64> {
        let mut masses: Vec<f64> = aa::STANDARD_RESIDUES
            .iter()
            .flat_map(|&r| self.mass_options(r).iter().map(|o| o.mass))
            .filter(|&m| m > 0.0)
            .collect();
        masses.sort_by(f64::total_cmp);
        masses.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        masses
    }
}

static EMPTY_SLOTS: TerminalSlots = TerminalSlots { fixed: Vec::new(), variable: Vec::new() };

fn check_terminal_conflicts(
    modifications: &[Modification],
    terminal: &[(ModificationCategory, TerminalSlots)],
) -> Result<()> {
    for (category, slots) in terminal {
        if category.is_residue_specific() {
            let mut seen: Vec<Option<usize>> = vec![None; ALPHABET_SIZE];
            for &i in &slots.fixed {
                for &r in modifications[i].residues.as_bytes() {
                    let slot = &mut seen[r as usize & 0x7F];
                    if let Some(prev) = *slot {
                        return Err(conflict(modifications, prev, i, &format!("{:?} {}", category, r as char)));
                    }
                    *slot = Some(i);
                }
            }
        } else if slots.fixed.len() > 1 {
            return Err(conflict(modifications, slots.fixed[0], slots.fixed[1], &format!("{:?}", category)));
        }
    }
    Ok(())
}

fn conflict(modifications: &[Modification], first: usize, second: usize, site: &str) -> Error {
    Error::ConflictingFixedModification {
        first: modifications[first].name.clone(),
        second: modifications[second].name.clone(),
        site: site.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbamidomethyl() -> Modification {
        Modification::fixed("Carbamidomethylation of C", 57.02146, ModificationCategory::Residue, "C")
    }

    fn oxidation() -> Modification {
        Modification::variable("Oxidation of M", 15.99491, ModificationCategory::Residue, "M")
    }

    #[test]
    fn fixed_modification_replaces_base_mass() {
        let tables = ModificationTables::new(&ModificationSettings::new(vec![carbamidomethyl(), oxidation()])).unwrap();
        let c = tables.mass_options(b'C');
        assert_eq!(c.len(), 1);
        assert!((c[0].mass - 160.03065).abs() < 1e-6);
        assert_eq!(c[0].fixed, Some(0));

        let m = tables.mass_options(b'M');
        assert_eq!(m.len(), 2);
        assert_eq!(m[1].variable, Some(1));
        assert!((m[1].mass - 147.0354).abs() < 1e-4);
    }

    #[test]
    fn conflicting_fixed_modifications_fail() {
        let other = Modification::fixed("Other C", 42.0, ModificationCategory::Residue, "CK");
        let err = ModificationTables::new(&ModificationSettings::new(vec![carbamidomethyl(), other])).unwrap_err();
        assert!(matches!(err, Error::ConflictingFixedModification { .. }));

        let a = Modification::fixed("Acetyl", 42.01, ModificationCategory::PeptideNTerm, "");
        let b = Modification::fixed("Formyl", 27.99, ModificationCategory::PeptideNTerm, "");
        assert!(ModificationTables::new(&ModificationSettings::new(vec![a, b])).is_err());
    }

    #[test]
    fn pattern_modifications_are_rejected() {
        let mut m = oxidation();
        m.pattern = vec!["M".to_string(); 63];
        assert!(matches!(m.validate(), Err(Error::PatternTooLong { length: 63, .. })));
        m.pattern.truncate(2);
        assert!(matches!(m.validate(), Err(Error::InvalidParameter(_))));
        let err = ModificationTables::new(&ModificationSettings::new(vec![m])).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn terminal_slots_are_grouped() {
        let acetyl = Modification::variable("Acetylation of protein N-term", 42.01056, ModificationCategory::ProteinNTerm, "");
        let tables = ModificationTables::new(&ModificationSettings::new(vec![acetyl])).unwrap();
        assert_eq!(tables.terminal(ModificationCategory::ProteinNTerm).variable, vec![0]);
        assert!(tables.terminal(ModificationCategory::PeptideCTerm).fixed.is_empty());
    }
}
