use std::collections::HashMap;

use crate::index::chunk::Interval;
use crate::params::variants::EditCounts;
use crate::search::terminal::TerminalMatch;

/// 到达一个单元所做的操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOp {
    /// 搜索起点（整个区间）
    Root,
    /// 由反向遍历结果重映射到正向索引的衔接点
    Junction,
    Match,
    Insertion,
    Deletion,
    Substitution,
    /// 蛋白末端的分隔符，携带蛋白末端修饰
    Terminus,
}

/// 质量缺口中 X 占位的解析信息，记录在闭合该缺口的单元上。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XClosure {
    pub residual: f64,
    pub count: usize,
    pub tolerance: f64,
}

/// 动态规划的一个状态。所有单元存放在 [`CellArena`] 中，通过下标指向父单元。
#[derive(Debug, Clone)]
pub struct SearchCell {
    pub interval: Interval,
    pub parent: Option<usize>,
    pub op: CellOp,
    /// 结果肽段中显示的残基
    pub residue: u8,
    /// 在索引中实际扩展的符号；插入与起点为 0
    pub bwt_symbol: u8,
    /// 当前质量缺口内累计的质量
    pub mass: f64,
    pub edits: EditCounts,
    pub modification_count: usize,
    pub fixed_modification: Option<usize>,
    pub variable_modification: Option<usize>,
    pub terminal: Option<TerminalMatch>,
    pub element: usize,
    pub x_placeholder: bool,
    pub x_closure: Option<XClosure>,
    /// Junction 单元对应的反向遍历叶子
    pub junction: Option<usize>,
}

impl SearchCell {
    pub fn root(interval: Interval) -> Self {
        Self {
            interval,
            parent: None,
            op: CellOp::Root,
            residue: 0,
            bwt_symbol: 0,
            mass: 0.0,
            edits: EditCounts::default(),
            modification_count: 0,
            fixed_modification: None,
            variable_modification: None,
            terminal: None,
            element: 0,
            x_placeholder: false,
            x_closure: None,
            junction: None,
        }
    }

    /// 以 `self`（下标 `parent`）为父的新单元：继承累计量，清空单元自身的标注。
    pub fn child(&self, parent: usize, op: CellOp, interval: Interval, element: usize) -> Self {
        Self {
            interval,
            parent: Some(parent),
            op,
            residue: 0,
            bwt_symbol: 0,
            mass: 0.0,
            edits: self.edits,
            modification_count: self.modification_count,
            fixed_modification: None,
            variable_modification: None,
            terminal: None,
            element,
            x_placeholder: false,
            x_closure: None,
            junction: None,
        }
    }

    /// 该单元在编辑脚本中的字符：`-` 匹配，`*` 插入，大写为替换后的残基，小写为缺失的残基。
    pub fn edit_char(&self) -> Option<char> {
        match self.op {
            CellOp::Match => Some('-'),
            CellOp::Insertion => Some('*'),
            CellOp::Substitution => Some(self.residue as char),
            CellOp::Deletion => Some((self.residue + 32) as char),
            CellOp::Root | CellOp::Junction | CellOp::Terminus => None,
        }
    }
}

/// 一次遍历的可缓存快照：自包含的单元列表（父指针已重编号）与叶子下标。
#[derive(Debug, Clone, Default)]
pub struct CachedPass {
    pub cells: Vec<SearchCell>,
    pub leaves: Vec<usize>,
}

impl CachedPass {
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CellArena {
    cells: Vec<SearchCell>,
}

impl CellArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: SearchCell) -> usize {
        self.cells.push(cell);
        self.cells.len() - 1
    }

    #[inline]
    pub fn get(&self, id: usize) -> &SearchCell {
        &self.cells[id]
    }

    #[inline]
    pub fn get_mut(&mut self, id: usize) -> &mut SearchCell {
        &mut self.cells[id]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 从叶子到根的下标序列。
    pub fn path(&self, leaf: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            out.push(id);
            cur = self.cells[id].parent;
        }
        out
    }

    /// 复制叶子及其全部祖先，父指针按新位置重编号。
    pub fn extract(&self, leaves: &[usize]) -> CachedPass {
        let mut keep: Vec<usize> = Vec::new();
        let mut remap: HashMap<usize, usize> = HashMap::new();
        for &leaf in leaves {
            let mut cur = Some(leaf);
            while let Some(id) = cur {
                if remap.contains_key(&id) {
                    break;
                }
                remap.insert(id, 0);
                keep.push(id);
                cur = self.cells[id].parent;
            }
        }
        // 父单元总是先于子单元入栈，按下标排序即可保持拓扑序
        keep.sort_unstable();
        for (new, &old) in keep.iter().enumerate() {
            remap.insert(old, new);
        }
        let cells = keep
            .iter()
            .map(|&old| {
                let mut c = self.cells[old].clone();
                c.parent = c.parent.and_then(|p| remap.get(&p).copied());
                c
            })
            .collect();
        let leaves = leaves.iter().filter_map(|l| remap.get(l).copied()).collect();
        CachedPass { cells, leaves }
    }

    /// 导入一个快照，返回其叶子在本 arena 中的下标。
    pub fn import(&mut self, pass: &CachedPass) -> Vec<usize> {
        let offset = self.cells.len();
        self.cells.extend(pass.cells.iter().map(|c| {
            let mut c = c.clone();
            c.parent = c.parent.map(|p| p + offset);
            c
        }));
        pass.leaves.iter().map(|&l| l + offset).collect()
    }
}
