/// 根据后缀数组构建 BWT。
/// bwt[i] = text[sa[i] - 1]；sa[i] == 0 时取文本末尾符号。
pub fn build_bwt(text: &[u8], sa: &[u32]) -> Vec<u8> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut bwt = Vec::with_capacity(n);
    for &p in sa {
        let i = p as usize;
        let prev = if i == 0 { text[n - 1] } else { text[i - 1] };
        bwt.push(prev);
    }
    bwt
}

/// 以 2^shift 为步长采样后缀数组：sampled[i >> shift] = sa[i]（i 为步长整数倍）。
pub fn sample_sa(sa: &[u32], shift: u32) -> Vec<u32> {
    let stride = 1usize << shift;
    sa.iter().step_by(stride).copied().collect()
}

/// 反向文本：去掉终止符后逆序，再补回终止符。
pub fn reverse_text(text: &[u8]) -> Vec<u8> {
    match text.split_last() {
        Some((&last, body)) => {
            let mut rev: Vec<u8> = body.iter().rev().copied().collect();
            rev.push(last);
            rev
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa::build_sa;

    #[test]
    fn bwt_of_small_text() {
        let text = b"/AB/\x7F";
        let sa = build_sa(text);
        // 后缀顺序：/AB/$ (0), /$ (3), AB/$ (1), B/$ (2), $ (4)
        assert_eq!(sa, vec![0, 3, 1, 2, 4]);
        assert_eq!(build_bwt(text, &sa), b"\x7FB/A/".to_vec());
    }

    #[test]
    fn sampling_keeps_every_stride_row() {
        let sa: Vec<u32> = (0..20).rev().collect();
        assert_eq!(sample_sa(&sa, 0), sa);
        assert_eq!(sample_sa(&sa, 2), vec![19, 15, 11, 7, 3]);
    }

    #[test]
    fn reverse_keeps_sentinel_last() {
        assert_eq!(reverse_text(b"/AB/\x7F"), b"/BA/\x7F".to_vec());
        assert!(reverse_text(b"").is_empty());
    }
}
