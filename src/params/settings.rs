use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::params::mass::MassTolerance;
use crate::params::modification::{ModificationSettings, ModificationTables};
use crate::params::variants::VariantSettings;

/// 索引级搜索配置：构建时确定，随索引一起保存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub tolerance: MassTolerance,
    pub modifications: ModificationSettings,
    pub variants: VariantSettings,
    /// 单个质量缺口中允许的蛋白 X 个数
    pub max_x_per_tag: usize,
    /// 质量可达性表覆盖的最大质量（Da）
    pub lookup_max_mass: f64,
    /// 每个分块的文本字节预算
    pub chunk_byte_budget: usize,
    /// 后缀数组采样步长为 2^sampling_shift
    pub sampling_shift: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            tolerance: MassTolerance::default(),
            modifications: ModificationSettings::default(),
            variants: VariantSettings::default(),
            max_x_per_tag: 3,
            lookup_max_mass: 1000.0,
            chunk_byte_budget: 100 * 1024 * 1024,
            sampling_shift: 3,
        }
    }
}

impl SearchSettings {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let settings: Self = serde_json::from_reader(std::io::BufReader::new(f))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 配置错误在构建前即失败，不拖到查询阶段。
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.value > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "mass tolerance must be positive, got {}",
                self.tolerance.value
            )));
        }
        if self.sampling_shift > 16 {
            return Err(Error::InvalidParameter(format!(
                "sampling shift {} is outside 0..=16",
                self.sampling_shift
            )));
        }
        if self.chunk_byte_budget == 0 {
            return Err(Error::InvalidParameter("chunk byte budget must be positive".to_string()));
        }
        if !(self.lookup_max_mass > 0.0) {
            return Err(Error::InvalidParameter("lookup max mass must be positive".to_string()));
        }
        if self.max_x_per_tag > 6 {
            return Err(Error::InvalidParameter(format!(
                "at most 6 X per mass gap are supported, got {}",
                self.max_x_per_tag
            )));
        }
        ModificationTables::new(&self.modifications)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::modification::{Modification, ModificationCategory};

    #[test]
    fn defaults_are_valid() {
        SearchSettings::default().validate().unwrap();
    }

    #[test]
    fn loads_partial_json() {
        let json = r#"{
            "tolerance": { "value": 10.0, "unit": "ppm" },
            "modifications": [
                { "name": "Oxidation of M", "mass": 15.99491, "variable": true,
                  "category": "residue", "residues": "M" }
            ],
            "variants": { "budget": { "mode": "generic", "max_variants": 1 } }
        }"#;
        let s = SearchSettings::from_json_str(json).unwrap();
        assert_eq!(s.tolerance, MassTolerance::ppm(10.0));
        assert_eq!(s.modifications.modifications.len(), 1);
        assert_eq!(s.variants.budget.total(), 1);
        assert_eq!(s.max_x_per_tag, 3);
    }

    #[test]
    fn invalid_settings_fail_fast() {
        let mut s = SearchSettings::default();
        s.tolerance.value = 0.0;
        assert!(s.validate().is_err());

        let mut s = SearchSettings::default();
        s.sampling_shift = 20;
        assert!(s.validate().is_err());

        let mut s = SearchSettings::default();
        let mut m = Modification::variable("Long", 1.0, ModificationCategory::Residue, "K");
        m.pattern = vec!["K".to_string(); 70];
        s.modifications.modifications.push(m);
        assert!(matches!(s.validate(), Err(Error::PatternTooLong { .. })));
    }

    #[test]
    fn json_round_trip() {
        let s = SearchSettings::default();
        let back = SearchSettings::from_json_str(&s.to_json().unwrap()).unwrap();
        assert_eq!(back, s);
    }
}
