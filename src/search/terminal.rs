use crate::params::modification::{ModificationCategory, ModificationTables};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminus {
    N,
    C,
}

/// 闭合边界缺口时采用的末端修饰。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalMatch {
    pub terminus: Terminus,
    pub protein: Option<usize>,
    pub peptide: Option<usize>,
}

/// 一种末端修饰组合及其总质量偏移。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalCandidate {
    pub protein: Option<usize>,
    pub peptide: Option<usize>,
    pub delta: f64,
    pub variable_count: usize,
}

/// 一个末端类别族（蛋白或肽段）按尝试顺序排列的选择：
/// 固定且限定残基、固定不限残基、无修饰、可变且限定残基、可变不限残基。
fn tiered_choices(
    tables: &ModificationTables,
    residue_category: ModificationCategory,
    any_category: ModificationCategory,
    residue: Option<u8>,
) -> Vec<Option<usize>> {
    let targets = |i: usize| residue.map_or(false, |r| tables.modification(i).targets(r));
    let specific = tables.terminal(residue_category);
    let agnostic = tables.terminal(any_category);

    let mut out = Vec::new();
    out.extend(specific.fixed.iter().filter(|&&i| targets(i)).map(|&i| Some(i)));
    out.extend(agnostic.fixed.iter().map(|&i| Some(i)));
    out.push(None);
    out.extend(specific.variable.iter().filter(|&&i| targets(i)).map(|&i| Some(i)));
    out.extend(agnostic.variable.iter().map(|&i| Some(i)));
    out
}

/// 边界缺口闭合时依次尝试的末端修饰组合。
///
/// `residue` 为末端残基（X 占位时为 None，此时只考虑不限残基的修饰）；
/// `at_protein_terminus` 表示肽段是否紧邻蛋白末端，只有此时才尝试蛋白末端修饰。
pub fn terminal_candidates(
    tables: &ModificationTables,
    terminus: Terminus,
    residue: Option<u8>,
    at_protein_terminus: bool,
) -> Vec<TerminalCandidate> {
    use ModificationCategory::*;
    let (protein_res, protein_any, peptide_res, peptide_any) = match terminus {
        Terminus::N => (ProteinNTermResidue, ProteinNTerm, PeptideNTermResidue, PeptideNTerm),
        Terminus::C => (ProteinCTermResidue, ProteinCTerm, PeptideCTermResidue, PeptideCTerm),
    };
    let protein = if at_protein_terminus {
        tiered_choices(tables, protein_res, protein_any, residue)
    } else {
        vec![None]
    };
    let peptide = tiered_choices(tables, peptide_res, peptide_any, residue);

    let mass_of = |m: Option<usize>| m.map_or(0.0, |i| tables.modification(i).mass);
    let variable = |m: Option<usize>| m.map_or(0, |i| usize::from(tables.modification(i).variable));

    let mut out = Vec::with_capacity(protein.len() * peptide.len());
    for &p in &protein {
        for &q in &peptide {
            out.push(TerminalCandidate {
                protein: p,
                peptide: q,
                delta: mass_of(p) + mass_of(q),
                variable_count: variable(p) + variable(q),
            });
        }
    }
    out
}

/// 一端所有末端修饰组合可能贡献的质量偏移（含 0），升序。
///
/// 蛋白末端与肽段末端修饰各至多取一个，因此结果是两组偏移的两两之和。
pub fn terminal_deltas(tables: &ModificationTables, terminus: Terminus) -> Vec<f64> {
    use ModificationCategory::*;
    let (protein, peptide) = match terminus {
        Terminus::N => ([ProteinNTermResidue, ProteinNTerm], [PeptideNTermResidue, PeptideNTerm]),
        Terminus::C => ([ProteinCTermResidue, ProteinCTerm], [PeptideCTermResidue, PeptideCTerm]),
    };
    let masses = |categories: [ModificationCategory; 2]| {
        let mut out = vec![0.0];
        for category in categories {
            let slots = tables.terminal(category);
            out.extend(slots.fixed.iter().chain(&slots.variable).map(|&i| tables.modification(i).mass));
        }
        out
    };
    let peptide = masses(peptide);
    let mut deltas: Vec<f64> = masses(protein)
        .iter()
        .flat_map(|p| peptide.iter().map(move |q| p + q))
        .collect();
    deltas.sort_by(f64::total_cmp);
    deltas.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::modification::{Modification, ModificationSettings};

    fn tables(mods: Vec<Modification>) -> ModificationTables {
        ModificationTables::new(&ModificationSettings::new(mods)).unwrap()
    }

    #[test]
    fn no_modifications_gives_single_empty_candidate() {
        let t = tables(vec![]);
        let c = terminal_candidates(&t, Terminus::N, Some(b'K'), true);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].delta, 0.0);
        assert_eq!(c[0].protein, None);
    }

    #[test]
    fn fixed_before_none_before_variable() {
        use ModificationCategory::*;
        let t = tables(vec![
            Modification::variable("Pyro-glu from Q", -17.02655, PeptideNTermResidue, "Q"),
            Modification::fixed("TMT on peptide N-term", 229.16293, PeptideNTerm, ""),
            Modification::variable("Acetyl on peptide N-term", 42.01056, PeptideNTerm, ""),
        ]);
        let c = terminal_candidates(&t, Terminus::N, Some(b'Q'), false);
        let order: Vec<Option<usize>> = c.iter().map(|c| c.peptide).collect();
        assert_eq!(order, vec![Some(1), None, Some(0), Some(2)]);

        // 末端残基不是 Q 时不尝试 pyro-glu
        let c = terminal_candidates(&t, Terminus::N, Some(b'E'), false);
        assert!(c.iter().all(|c| c.peptide != Some(0)));
    }

    #[test]
    fn protein_and_peptide_modifications_combine() {
        use ModificationCategory::*;
        let t = tables(vec![
            Modification::variable("Acetylation of protein N-term", 42.01056, ProteinNTerm, ""),
            Modification::variable("Carbamyl on peptide N-term", 43.00581, PeptideNTerm, ""),
        ]);
        let inside = terminal_candidates(&t, Terminus::N, Some(b'M'), false);
        assert_eq!(inside.len(), 2);
        let at_start = terminal_candidates(&t, Terminus::N, Some(b'M'), true);
        assert_eq!(at_start.len(), 4);
        let both = at_start.iter().find(|c| c.protein.is_some() && c.peptide.is_some()).unwrap();
        assert_eq!(both.variable_count, 2);
        assert!((both.delta - 85.01637).abs() < 1e-6);
        // C 端类别不会出现在 N 端候选中
        assert_eq!(terminal_candidates(&t, Terminus::C, Some(b'K'), true).len(), 1);
    }

    #[test]
    fn deltas_cover_every_terminal_modification() {
        use ModificationCategory::*;
        let mut mods: Vec<Modification> = (0..10)
            .map(|i| Modification::variable(&format!("Protein N-term {}", i), 10.0 + i as f64, ProteinNTerm, ""))
            .collect();
        mods.push(Modification::variable("Amidation of peptide C-term", -0.98402, PeptideCTerm, ""));
        mods.push(Modification::variable("Carbamyl on peptide N-term", 43.00581, PeptideNTerm, ""));
        let t = tables(mods);

        // N 端：(1 + 10) 个蛋白偏移 × (1 + 1) 个肽段偏移
        let n = terminal_deltas(&t, Terminus::N);
        assert_eq!(n.len(), 22);
        assert_eq!(n[0], 0.0);
        assert!(n.iter().any(|&d| (d - 62.00581).abs() < 1e-9));

        // C 端只含酰胺化，且不受 N 端修饰数量影响
        let c = terminal_deltas(&t, Terminus::C);
        assert_eq!(c.len(), 2);
        assert!((c[0] + 0.98402).abs() < 1e-9);
    }
}
