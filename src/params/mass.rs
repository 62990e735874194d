use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    Da,
    Ppm,
}

/// 质量容差：绝对值（Da）或相对值（ppm）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassTolerance {
    pub value: f64,
    pub unit: MassUnit,
}

impl Default for MassTolerance {
    fn default() -> Self {
        Self { value: 0.02, unit: MassUnit::Da }
    }
}

impl MassTolerance {
    pub fn da(value: f64) -> Self {
        Self { value, unit: MassUnit::Da }
    }

    pub fn ppm(value: f64) -> Self {
        Self { value, unit: MassUnit::Ppm }
    }

    /// 把质量差换算到容差单位：Da 原样返回，ppm 为 diff / reference * 1e6。
    #[inline]
    pub fn compute_mass_value(&self, diff: f64, reference: f64) -> f64 {
        match self.unit {
            MassUnit::Da => diff,
            MassUnit::Ppm => diff / reference * 1e6,
        }
    }

    /// [`compute_mass_value`](Self::compute_mass_value) 的逆：容差值换算为 Da。
    #[inline]
    pub fn compute_inverse_mass_value(&self, tolerance: f64, reference: f64) -> f64 {
        match self.unit {
            MassUnit::Da => tolerance,
            MassUnit::Ppm => tolerance * reference / 1e6,
        }
    }

    /// 在参考质量处的绝对容差（Da）。
    #[inline]
    pub fn absolute_at(&self, reference: f64) -> f64 {
        self.compute_inverse_mass_value(self.value, reference)
    }

    #[inline]
    pub fn within(&self, measured: f64, reference: f64) -> bool {
        self.compute_mass_value((measured - reference).abs(), reference) <= self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn da_is_identity() {
        let tol = MassTolerance::da(0.5);
        assert_eq!(tol.compute_mass_value(0.3, 1000.0), 0.3);
        assert_eq!(tol.compute_inverse_mass_value(0.3, 1000.0), 0.3);
        assert!(tol.within(100.4, 100.0));
        assert!(!tol.within(100.6, 100.0));
    }

    #[test]
    fn ppm_is_symmetric_with_absolute_window() {
        let tol = MassTolerance::ppm(10.0);
        let reference = 1500.0;
        let window = tol.absolute_at(reference);
        assert!((window - 0.015).abs() < 1e-12);
        for diff in [0.0_f64, 0.005, 0.0149, 0.0151, 0.02, -0.01, -0.016] {
            let inside = tol.compute_mass_value(diff.abs(), reference) <= tol.value;
            assert_eq!(inside, diff.abs() <= window, "diff {}", diff);
        }
        let v = tol.compute_mass_value(0.012, reference);
        assert!((tol.compute_inverse_mass_value(v, reference) - 0.012).abs() < 1e-12);
    }

    #[test]
    fn unit_serializes_lowercase() {
        let json = serde_json::to_string(&MassTolerance::ppm(5.0)).unwrap();
        assert_eq!(json, r#"{"value":5.0,"unit":"ppm"}"#);
    }
}
