//! 质量缺口的可达性表与 X 组合表。

/// 可达性表的分辨率（Da）。
const RESOLUTION: f64 = 0.01;

/// 残基质量（可重复）之和的可达性位图，覆盖 [0, max_mass]。
///
/// 每个桶代表一个宽 `RESOLUTION` 的质量区间；加上一个残基质量时把结果区间
/// 覆盖到的两个桶都置位，因此位图是真实可达集合的超集，只会漏剪，不会错剪。
/// 超过 `max_mass` 的质量一律视为可达。
#[derive(Debug, Clone)]
pub struct MassLookup {
    max_mass: f64,
    bins: usize,
    bits: Vec<u64>,
}

impl MassLookup {
    pub fn build(residue_masses: &[f64], max_mass: f64) -> Self {
        let bins = (max_mass / RESOLUTION).ceil() as usize + 2;
        let mut bits = vec![0u64; (bins + 63) / 64];
        let steps: Vec<usize> = residue_masses
            .iter()
            .filter(|&&m| m > 0.0)
            .map(|&m| (m / RESOLUTION).floor() as usize)
            .collect();
        bits[0] |= 1;
        for b in 0..bins {
            if (bits[b >> 6] >> (b & 63)) & 1 == 0 {
                continue;
            }
            for &q in &steps {
                for target in [b + q, b + q + 1] {
                    if target < bins {
                        bits[target >> 6] |= 1u64 << (target & 63);
                    }
                }
            }
        }
        Self { max_mass, bins, bits }
    }

    pub fn max_mass(&self) -> f64 {
        self.max_mass
    }

    /// `mass ± tolerance` 内是否可能存在残基质量组合。
    pub fn may_reach(&self, mass: f64, tolerance: f64) -> bool {
        if mass - tolerance > self.max_mass {
            return true;
        }
        if mass + tolerance < 0.0 {
            return false;
        }
        let lo = ((mass - tolerance).max(0.0) / RESOLUTION).floor() as usize;
        let hi = (((mass + tolerance) / RESOLUTION).floor() as usize).min(self.bins - 1);
        (lo..=hi).any(|b| (self.bits[b >> 6] >> (b & 63)) & 1 != 0)
    }
}

/// k 个 X 所能代表的标准残基多重集合，按总质量排序（k = 1..=max_x）。
#[derive(Debug, Clone, Default)]
pub struct XLookup {
    tables: Vec<Vec<(f64, Vec<u8>)>>,
}

impl XLookup {
    pub fn build(residues: &[(u8, f64)], max_x: usize) -> Self {
        let mut tables = vec![Vec::new(); max_x + 1];
        let mut current = Vec::with_capacity(max_x);
        for k in 1..=max_x {
            let mut combos = Vec::new();
            enumerate_multisets(residues, k, 0, 0.0, &mut current, &mut combos);
            combos.sort_by(|a: &(f64, Vec<u8>), b| a.0.total_cmp(&b.0));
            tables[k] = combos;
        }
        Self { tables }
    }

    pub fn max_x(&self) -> usize {
        self.tables.len().saturating_sub(1)
    }

    /// 总质量落在 [mass - tolerance, mass + tolerance] 内的 k 残基组合（二分查找）。
    pub fn compute_mapping_ranges(&self, k: usize, mass: f64, tolerance: f64) -> &[(f64, Vec<u8>)] {
        let Some(table) = self.tables.get(k) else {
            return &[];
        };
        let lo = table.partition_point(|(m, _)| *m < mass - tolerance);
        let hi = table.partition_point(|(m, _)| *m <= mass + tolerance);
        &table[lo..hi.max(lo)]
    }

    pub fn reachable(&self, k: usize, mass: f64, tolerance: f64) -> bool {
        !self.compute_mapping_ranges(k, mass, tolerance).is_empty()
    }
}

fn enumerate_multisets(
    residues: &[(u8, f64)],
    k: usize,
    start: usize,
    mass: f64,
    current: &mut Vec<u8>,
    out: &mut Vec<(f64, Vec<u8>)>,
) {
    if current.len() == k {
        out.push((mass, current.clone()));
        return;
    }
    for i in start..residues.len() {
        let (r, m) = residues[i];
        current.push(r);
        enumerate_multisets(residues, k, i, mass + m, current, out);
        current.pop();
    }
}

/// 多重集合的全部不同排列（字典序）。
pub fn distinct_permutations(multiset: &[u8]) -> Vec<Vec<u8>> {
    let mut perm = multiset.to_vec();
    perm.sort_unstable();
    let mut out = vec![perm.clone()];
    while next_permutation(&mut perm) {
        out.push(perm.clone());
    }
    out
}

fn next_permutation(v: &mut [u8]) -> bool {
    if v.len() < 2 {
        return false;
    }
    let mut i = v.len() - 1;
    while i > 0 && v[i - 1] >= v[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = v.len() - 1;
    while v[j] <= v[i - 1] {
        j -= 1;
    }
    v.swap(i - 1, j);
    v[i..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::aa::{monoisotopic_mass, STANDARD_RESIDUES};

    fn standard() -> Vec<(u8, f64)> {
        STANDARD_RESIDUES
            .iter()
            .filter_map(|&r| monoisotopic_mass(r).map(|m| (r, m)))
            .collect()
    }

    #[test]
    fn lookup_contains_residue_sums() {
        let masses: Vec<f64> = standard().iter().map(|&(_, m)| m).collect();
        let lookup = MassLookup::build(&masses, 1000.0);
        let g = monoisotopic_mass(b'G').unwrap();
        let w = monoisotopic_mass(b'W').unwrap();
        assert!(lookup.may_reach(0.0, 0.02));
        assert!(lookup.may_reach(g, 0.02));
        assert!(lookup.may_reach(3.0 * g + w, 0.02));
        // 低于最轻残基且不为 0 的质量不可达
        assert!(!lookup.may_reach(30.0, 0.02));
        assert!(!lookup.may_reach(-1.0, 0.02));
        // 超出覆盖范围视为可达
        assert!(lookup.may_reach(5000.0, 0.02));
    }

    #[test]
    fn x_lookup_ranges() {
        let x = XLookup::build(&standard(), 2);
        let t = monoisotopic_mass(b'T').unwrap();
        let singles = x.compute_mapping_ranges(1, t, 0.01);
        assert_eq!(singles.len(), 1);
        assert_eq!(singles[0].1, vec![b'T']);

        // I 与 L 同质量
        let il = x.compute_mapping_ranges(1, monoisotopic_mass(b'L').unwrap(), 0.01);
        assert_eq!(il.len(), 2);

        let gg = 2.0 * monoisotopic_mass(b'G').unwrap();
        let pairs = x.compute_mapping_ranges(2, gg, 0.001);
        assert!(pairs.iter().any(|(_, c)| c == &vec![b'G', b'G']));
        assert!(!x.reachable(2, 10.0, 0.5));
        assert!(x.compute_mapping_ranges(3, t, 0.1).is_empty());
    }

    #[test]
    fn permutations_are_distinct() {
        assert_eq!(distinct_permutations(b"AB"), vec![b"AB".to_vec(), b"BA".to_vec()]);
        assert_eq!(distinct_permutations(b"AAB").len(), 3);
        assert_eq!(distinct_permutations(b"G"), vec![b"G".to_vec()]);
    }
}
