/// 构建后缀数组（SA-IS，诱导排序，O(n)）。
///
/// 输入为任意字节文本；内部将每个符号 +1 并在末尾追加一个虚拟的最小终止符 0，
/// 因此结果与按字典序（较短前缀更小）直接排序所有后缀一致。
/// 单个分块的长度须小于 `u32::MAX`。
pub fn build_sa(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut s: Vec<u32> = Vec::with_capacity(n + 1);
    s.extend(text.iter().map(|&b| u32::from(b) + 1));
    s.push(0);
    let sa = sais(&s, 257);
    // 第一个后缀永远是虚拟终止符本身
    sa.into_iter().skip(1).collect()
}

const EMPTY: u32 = u32::MAX;

/// `s` 必须以唯一且最小的 0 结尾，符号取值 < k。
fn sais(s: &[u32], k: usize) -> Vec<u32> {
    let n = s.len();
    let mut sa = vec![EMPTY; n];
    if n == 1 {
        sa[0] = 0;
        return sa;
    }

    // true = S 型后缀
    let mut stype = vec![false; n];
    stype[n - 1] = true;
    for i in (0..n - 1).rev() {
        stype[i] = s[i] < s[i + 1] || (s[i] == s[i + 1] && stype[i + 1]);
    }

    let counts = bucket_counts(s, k);

    // 1. LMS 位置放入各桶尾，诱导排序 LMS 子串
    let mut tails = bucket_tails(&counts);
    for i in 1..n {
        if is_lms(&stype, i) {
            let c = s[i] as usize;
            tails[c] -= 1;
            sa[tails[c]] = i as u32;
        }
    }
    induce(s, &mut sa, &stype, &counts);

    // 2. 压缩已排序的 LMS 位置并命名
    let mut m = 0usize;
    for i in 0..n {
        let p = sa[i] as usize;
        if is_lms(&stype, p) {
            sa[m] = p as u32;
            m += 1;
        }
    }
    for x in sa[m..].iter_mut() {
        *x = EMPTY;
    }
    let mut names = 0u32;
    let mut prev: Option<usize> = None;
    for i in 0..m {
        let pos = sa[i] as usize;
        let differs = match prev {
            None => true,
            Some(p) => !lms_substrings_equal(s, &stype, p, pos),
        };
        if differs {
            names += 1;
            prev = Some(pos);
        }
        sa[m + pos / 2] = names - 1;
    }

    let lms_positions: Vec<usize> = (1..n).filter(|&i| is_lms(&stype, i)).collect();
    let reduced: Vec<u32> = sa[m..].iter().copied().filter(|&x| x != EMPTY).collect();
    debug_assert_eq!(reduced.len(), m);

    // 3. 递归（名称不唯一时）得到 LMS 后缀的顺序
    let reduced_sa = if (names as usize) < m {
        sais(&reduced, names as usize)
    } else {
        let mut direct = vec![0u32; m];
        for (i, &name) in reduced.iter().enumerate() {
            direct[name as usize] = i as u32;
        }
        direct
    };

    // 4. 按正确顺序放置 LMS 后缀，再次诱导
    sa.fill(EMPTY);
    let mut tails = bucket_tails(&counts);
    for &r in reduced_sa.iter().rev() {
        let p = lms_positions[r as usize];
        let c = s[p] as usize;
        tails[c] -= 1;
        sa[tails[c]] = p as u32;
    }
    induce(s, &mut sa, &stype, &counts);
    sa
}

#[inline]
fn is_lms(stype: &[bool], i: usize) -> bool {
    i > 0 && i < stype.len() && stype[i] && !stype[i - 1]
}

fn lms_substrings_equal(s: &[u32], stype: &[bool], a: usize, b: usize) -> bool {
    let n = s.len();
    if a == n - 1 || b == n - 1 {
        return a == b;
    }
    let mut i = 0usize;
    loop {
        let (x, y) = (a + i, b + i);
        if s[x] != s[y] || stype[x] != stype[y] {
            return false;
        }
        if i > 0 {
            let (lx, ly) = (is_lms(stype, x), is_lms(stype, y));
            if lx || ly {
                return lx && ly;
            }
        }
        i += 1;
    }
}

fn bucket_counts(s: &[u32], k: usize) -> Vec<usize> {
    let mut counts = vec![0usize; k];
    for &c in s {
        counts[c as usize] += 1;
    }
    counts
}

fn bucket_heads(counts: &[usize]) -> Vec<usize> {
    let mut heads = Vec::with_capacity(counts.len());
    let mut acc = 0usize;
    for &c in counts {
        heads.push(acc);
        acc += c;
    }
    heads
}

fn bucket_tails(counts: &[usize]) -> Vec<usize> {
    let mut tails = Vec::with_capacity(counts.len());
    let mut acc = 0usize;
    for &c in counts {
        acc += c;
        tails.push(acc);
    }
    tails
}

fn induce(s: &[u32], sa: &mut [u32], stype: &[bool], counts: &[usize]) {
    let n = s.len();
    // L 型：从左向右
    let mut heads = bucket_heads(counts);
    for i in 0..n {
        let j = sa[i];
        if j == EMPTY || j == 0 {
            continue;
        }
        let j = j as usize - 1;
        if !stype[j] {
            let c = s[j] as usize;
            sa[heads[c]] = j as u32;
            heads[c] += 1;
        }
    }
    // S 型：从右向左
    let mut tails = bucket_tails(counts);
    for i in (0..n).rev() {
        let j = sa[i];
        if j == EMPTY || j == 0 {
            continue;
        }
        let j = j as usize - 1;
        if stype[j] {
            let c = s[j] as usize;
            tails[c] -= 1;
            sa[tails[c]] = j as u32;
        }
    }
}

/// 逆后缀数组：isa[sa[i]] = i。
pub fn inverse_sa(sa: &[u32]) -> Vec<u32> {
    let mut isa = vec![0u32; sa.len()];
    for (i, &p) in sa.iter().enumerate() {
        isa[p as usize] = i as u32;
    }
    isa
}
