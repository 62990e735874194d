use crate::error::Result;
use crate::params::modification::ModificationTables;
use crate::params::settings::SearchSettings;
use crate::search::lookup::{MassLookup, XLookup};
use crate::search::terminal::{terminal_deltas, Terminus};
use crate::util::aa::STANDARD_RESIDUES;

/// 由索引级配置派生、在所有查询间共享的只读表。
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub settings: SearchSettings,
    pub tables: ModificationTables,
    pub lookup: MassLookup,
    pub x_lookup: XLookup,
    /// N 端与 C 端修饰可能贡献的质量偏移（含 0），升序
    n_terminal_deltas: Vec<f64>,
    c_terminal_deltas: Vec<f64>,
    pub min_residue_mass: f64,
}

impl SearchContext {
    pub fn new(settings: SearchSettings) -> Result<Self> {
        settings.validate()?;
        let tables = ModificationTables::new(&settings.modifications)?;
        let masses = tables.all_residue_masses();
        let lookup = MassLookup::build(&masses, settings.lookup_max_mass);
        let x_residues: Vec<(u8, f64)> = STANDARD_RESIDUES
            .iter()
            .filter_map(|&r| tables.base_mass(r).map(|m| (r, m)))
            .collect();
        let x_lookup = XLookup::build(&x_residues, settings.max_x_per_tag);
        let n_terminal_deltas = terminal_deltas(&tables, Terminus::N);
        let c_terminal_deltas = terminal_deltas(&tables, Terminus::C);
        let min_residue_mass = masses.first().copied().unwrap_or(0.0);
        Ok(Self {
            settings,
            tables,
            lookup,
            x_lookup,
            n_terminal_deltas,
            c_terminal_deltas,
            min_residue_mass,
        })
    }

    pub fn terminal_deltas(&self, terminus: Terminus) -> &[f64] {
        match terminus {
            Terminus::N => &self.n_terminal_deltas,
            Terminus::C => &self.c_terminal_deltas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_tables() {
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        assert!((ctx.min_residue_mass - 57.02146).abs() < 1e-9);
        assert_eq!(ctx.terminal_deltas(Terminus::N), &[0.0]);
        assert_eq!(ctx.terminal_deltas(Terminus::C), &[0.0]);
        assert_eq!(ctx.x_lookup.max_x(), 3);
    }
}
