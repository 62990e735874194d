/// 蛋白之间的分隔符，同时标记每个蛋白区域的起止。
pub const SEPARATOR: u8 = b'/';
/// 文本末尾唯一的终止符，字典序大于所有其它符号。
pub const SENTINEL: u8 = 0x7F;
/// 字母表上限（ASCII）。
pub const ALPHABET_SIZE: usize = 128;

/// 二十种标准残基，按字节序排列。
pub const STANDARD_RESIDUES: [u8; 20] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y',
];

/// 所有可出现在索引文本中的残基符号（含罕见氨基酸与模糊码）。
pub const RESIDUES: [u8; 26] = [
    b'A', b'B', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'J', b'K', b'L', b'M', b'N', b'O', b'P',
    b'Q', b'R', b'S', b'T', b'U', b'V', b'W', b'X', b'Y', b'Z',
];

/// 单同位素残基质量（Da）。模糊码与非残基返回 None。
pub fn monoisotopic_mass(residue: u8) -> Option<f64> {
    let mass = match residue {
        b'A' => 71.03711,
        b'C' => 103.00919,
        b'D' => 115.02694,
        b'E' => 129.04259,
        b'F' => 147.06841,
        b'G' => 57.02146,
        b'H' => 137.05891,
        b'I' => 113.08406,
        b'K' => 128.09496,
        b'L' => 113.08406,
        b'M' => 131.04049,
        b'N' => 114.04293,
        b'O' => 237.14773,
        b'P' => 97.05276,
        b'Q' => 128.05858,
        b'R' => 156.10111,
        b'S' => 87.03203,
        b'T' => 101.04768,
        b'U' => 150.95364,
        b'V' => 99.06841,
        b'W' => 186.07931,
        b'Y' => 163.06333,
        _ => return None,
    };
    Some(mass)
}

/// 模糊码 B/J/Z 对应的具体残基；X 不在此列（可代表任何残基）。
pub fn ambiguity_members(code: u8) -> &'static [u8] {
    match code {
        b'B' => b"DN",
        b'J' => b"IL",
        b'Z' => b"EQ",
        _ => &[],
    }
}

/// 成员中包含 `residue` 的模糊码（总是包含 X）。
pub fn ambiguity_codes_containing(residue: u8) -> Vec<u8> {
    let mut codes = Vec::with_capacity(2);
    for code in [b'B', b'J', b'Z'] {
        if ambiguity_members(code).contains(&residue) {
            codes.push(code);
        }
    }
    if residue != b'X' {
        codes.push(b'X');
    }
    codes
}

#[inline]
pub fn is_residue(b: u8) -> bool {
    b.is_ascii_uppercase()
}

/// 将蛋白序列规范化为索引文本符号：大写，非字母映射为 X。
pub fn normalize_protein(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        match b {
            b'\n' | b'\r' | b' ' | b'\t' | b'*' => {}
            _ => {
                let up = b.to_ascii_uppercase();
                out.push(if up.is_ascii_uppercase() { up } else { b'X' });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masses_of_standard_residues() {
        for &r in &STANDARD_RESIDUES {
            assert!(monoisotopic_mass(r).is_some(), "missing mass for {}", r as char);
        }
        assert_eq!(monoisotopic_mass(b'I'), monoisotopic_mass(b'L'));
        assert!(monoisotopic_mass(b'X').is_none());
        assert!(monoisotopic_mass(SEPARATOR).is_none());
    }

    #[test]
    fn ambiguity_groups() {
        assert_eq!(ambiguity_members(b'B'), b"DN");
        assert_eq!(ambiguity_codes_containing(b'L'), vec![b'J', b'X']);
        assert_eq!(ambiguity_codes_containing(b'A'), vec![b'X']);
        assert!(ambiguity_codes_containing(b'X').is_empty());
    }

    #[test]
    fn normalize_uppercases_and_masks() {
        assert_eq!(normalize_protein(b"mpe ptide\n1k"), b"MPEPTIDEXK".to_vec());
    }

    #[test]
    fn sentinel_is_maximal() {
        for &r in &RESIDUES {
            assert!(SENTINEL > r);
        }
        assert!(SENTINEL > SEPARATOR);
        assert!((SENTINEL as usize) < ALPHABET_SIZE);
    }
}
