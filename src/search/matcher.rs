use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::{Error, Result};
use crate::index::chunk::{Direction, IndexChunk, Interval};
use crate::params::matching::SequenceMatching;
use crate::params::variants::{EditCounts, EditKind};
use crate::search::cache::ResultCache;
use crate::search::cell::{CellArena, CellOp, SearchCell, XClosure};
use crate::search::context::SearchContext;
use crate::search::lookup::distinct_permutations;
use crate::search::mapping::{ModificationMatch, PeptideProteinMapping, Variant, VariantMatch, VariantSite};
use crate::search::tag::{Tag, TagElement};
use crate::search::terminal::{terminal_candidates, TerminalCandidate, TerminalMatch, Terminus};
use crate::util::aa::{self, SEPARATOR};

/// 单次查询的统计。
#[derive(Debug, Clone, Default)]
pub struct MatchStats {
    /// 每个标签元素上闭合的缺口单元数
    pub closed_gap_cells: Vec<usize>,
    /// 因质量不可达而剪掉的缺口单元数
    pub pruned_gap_cells: usize,
    pub cache_hit: bool,
    pub cells: usize,
}

#[derive(Debug, Clone, Copy)]
struct RunEntry {
    cell: usize,
    origin: usize,
    x: usize,
}

type RunKey = (usize, usize, usize, usize, EditCounts, usize);

#[derive(Debug, Clone, Copy)]
struct GapEntry {
    cell: usize,
    mass: f64,
    x: usize,
}

/// 回溯得到的肽段信息（X 尚未展开）。
struct ResolvedPath {
    peptide: Vec<u8>,
    leading_separator: bool,
    modifications: Vec<ModificationMatch>,
    variant_match: Option<VariantMatch>,
    edits: usize,
    x_groups: Vec<(Vec<usize>, XClosure)>,
}

struct Candidate {
    mapping: PeptideProteinMapping,
    edits: usize,
}

/// 在一个索引分块上执行肽段/标签匹配的动态规划引擎。
///
/// 标签以最长的序列段为枢轴：先在反向索引上从枢轴向右扩展（追加），
/// 把每个叶子的路径在正向索引上重新做一次反向搜索得到衔接区间，
/// 再在正向索引上从枢轴向左扩展（前置）。
pub struct TagMatcher<'a> {
    chunk: &'a IndexChunk,
    ctx: &'a SearchContext,
    matching: &'a SequenceMatching,
    arena: CellArena,
    stats: MatchStats,
}

impl<'a> TagMatcher<'a> {
    pub fn new(chunk: &'a IndexChunk, ctx: &'a SearchContext, matching: &'a SequenceMatching) -> Self {
        Self {
            chunk,
            ctx,
            matching,
            arena: CellArena::new(),
            stats: MatchStats::default(),
        }
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// 映射一条不带质量信息的肽段序列（仅正向索引）。
    pub fn map_peptide(&mut self, peptide: &str) -> Result<Vec<PeptideProteinMapping>> {
        let query: Vec<u8> = peptide.bytes().map(|b| b.to_ascii_uppercase()).collect();
        if query.is_empty() || !query.iter().all(|&b| aa::is_residue(b)) {
            return Err(Error::InvalidParameter(format!("'{}' is not a peptide sequence", peptide)));
        }
        self.stats = MatchStats {
            closed_gap_cells: vec![0],
            ..MatchStats::default()
        };
        let root = self.arena.push(SearchCell::root(self.chunk.full_interval()));
        let reversed: Vec<u8> = query.iter().rev().copied().collect();
        let leaves = self.process_run(&[root], &reversed, Direction::Forward, 0)?;
        self.finish(&leaves)
    }

    pub fn map_tag(&mut self, tag: &Tag) -> Result<Vec<PeptideProteinMapping>> {
        let elements = tag.elements()?;
        self.stats = MatchStats {
            closed_gap_cells: vec![0; elements.len()],
            ..MatchStats::default()
        };
        let pivot = pivot_of(&elements);

        let key = ResultCache::key(&elements, self.matching, &self.ctx.settings.tolerance);
        let reverse_leaves = match key {
            Some(key) => match self.chunk.cache().lookup(&key)? {
                Some(pass) => {
                    self.stats.cache_hit = true;
                    self.arena.import(&pass)
                }
                None => {
                    let leaves = self.reverse_pass(&elements, pivot)?;
                    self.chunk.cache().store(key, self.arena.extract(&leaves))?;
                    leaves
                }
            },
            None => self.reverse_pass(&elements, pivot)?,
        };
        if reverse_leaves.is_empty() {
            self.stats.cells = self.arena.len();
            return Ok(Vec::new());
        }

        let mut frontier = Vec::with_capacity(reverse_leaves.len());
        for &leaf in &reverse_leaves {
            if let Some(junction) = self.remap(leaf)? {
                frontier.push(junction);
            }
        }
        for element in (0..pivot).rev() {
            if frontier.is_empty() {
                break;
            }
            frontier = self.process_element(&elements, element, &frontier, Direction::Forward)?;
        }
        self.finish(&frontier)
    }

    fn finish(&mut self, leaves: &[usize]) -> Result<Vec<PeptideProteinMapping>> {
        let mappings = self.emit(leaves)?;
        self.stats.cells = self.arena.len();
        debug!(
            "{} cells, {} leaves, {} mappings (cache hit: {})",
            self.stats.cells,
            leaves.len(),
            mappings.len(),
            self.stats.cache_hit
        );
        Ok(mappings)
    }

    fn reverse_pass(&mut self, elements: &[TagElement], pivot: usize) -> Result<Vec<usize>> {
        let root = self.arena.push(SearchCell::root(self.chunk.full_interval()));
        let mut frontier = vec![root];
        for element in pivot..elements.len() {
            frontier = self.process_element(elements, element, &frontier, Direction::Reverse)?;
            if frontier.is_empty() {
                break;
            }
        }
        Ok(frontier)
    }

    fn process_element(
        &mut self,
        elements: &[TagElement],
        element: usize,
        frontier: &[usize],
        dir: Direction,
    ) -> Result<Vec<usize>> {
        match &elements[element] {
            TagElement::Run(run) => match dir {
                Direction::Reverse => self.process_run(frontier, run, dir, element),
                Direction::Forward => {
                    let reversed: Vec<u8> = run.iter().rev().copied().collect();
                    self.process_run(frontier, &reversed, dir, element)
                }
            },
            TagElement::Gap(mass) => {
                let terminus = match dir {
                    Direction::Forward if element == 0 => Some(Terminus::N),
                    Direction::Reverse if element + 1 == elements.len() => Some(Terminus::C),
                    _ => None,
                };
                self.process_gap(frontier, *mass, element, dir, terminus)
            }
        }
    }

    /// 把反向索引上的叶子路径在正向索引上重新搜索，得到衔接单元。
    fn remap(&mut self, leaf: usize) -> Result<Option<usize>> {
        let mut interval = self.chunk.full_interval();
        // 叶到根恰为文本从右到左
        for id in self.arena.path(leaf) {
            let symbol = self.arena.get(id).bwt_symbol;
            if symbol == 0 {
                continue;
            }
            match self.chunk.extend(interval, symbol, Direction::Forward)? {
                Some(iv) => interval = iv,
                None => return Ok(None),
            }
        }
        let source = self.arena.get(leaf);
        let mut junction = source.child(leaf, CellOp::Junction, interval, source.element);
        junction.parent = None;
        junction.junction = Some(leaf);
        Ok(Some(self.arena.push(junction)))
    }

    // ── 序列段 ──────────────────────────────────────────

    /// 按处理顺序消耗 `run`。槽位 j 表示已消耗 j 个查询残基；缺失停留在原槽位。
    fn process_run(&mut self, frontier: &[usize], run: &[u8], dir: Direction, element: usize) -> Result<Vec<usize>> {
        let ctx = self.ctx;
        let variants = &ctx.settings.variants;
        let budget = variants.budget;
        let p = run.len();
        let max_x = self.matching.max_x(p);
        let counts_x = self.matching.expands_query_x();

        let mut slots: Vec<Vec<RunEntry>> = vec![Vec::new(); p + 1];
        let mut seen: HashSet<RunKey> = HashSet::new();
        for &cell in frontier {
            slots[0].push(RunEntry { cell, origin: cell, x: 0 });
        }

        for j in 0..p {
            let q = run[j];
            let alternatives = self.matching.alternatives(q);
            let wildcard = q == b'X' && self.matching.expands_query_x();
            let mut i = 0;
            while i < slots[j].len() {
                let entry = slots[j][i];
                i += 1;
                let (interval, edits) = {
                    let c = self.arena.get(entry.cell);
                    (c.interval, c.edits)
                };

                if wildcard {
                    if entry.x < max_x {
                        for (symbol, iv) in self.chunk.range_extend(interval, dir)? {
                            let cell = self.run_cell(entry.cell, CellOp::Match, symbol, symbol, iv, edits, element);
                            self.push_run(&mut slots, &mut seen, j + 1, entry.origin, entry.x + 1, cell);
                        }
                    }
                } else {
                    for &alt in &alternatives {
                        let x = entry.x + usize::from(counts_x && (alt == b'X' || q == b'X'));
                        if x > max_x {
                            continue;
                        }
                        if let Some(iv) = self.chunk.extend(interval, alt, dir)? {
                            let cell = self.run_cell(entry.cell, CellOp::Match, alt, alt, iv, edits, element);
                            self.push_run(&mut slots, &mut seen, j + 1, entry.origin, x, cell);
                        }
                    }
                }

                if budget.allows(&edits, EditKind::Insertion) {
                    let mut e = edits;
                    e.insertions += 1;
                    let cell = self.run_cell(entry.cell, CellOp::Insertion, q, 0, interval, e, element);
                    self.push_run(&mut slots, &mut seen, j + 1, entry.origin, entry.x, cell);
                }

                let substitute = !wildcard && budget.allows(&edits, EditKind::Substitution);
                let delete = j > 0 && budget.allows(&edits, EditKind::Deletion);
                if substitute || delete {
                    for (symbol, iv) in self.chunk.range_extend(interval, dir)? {
                        if substitute && !alternatives.contains(&symbol) && variants.substitution_allowed(symbol, q) {
                            let mut e = edits;
                            e.substitutions += 1;
                            let cell = self.run_cell(entry.cell, CellOp::Substitution, q, symbol, iv, e, element);
                            self.push_run(&mut slots, &mut seen, j + 1, entry.origin, entry.x, cell);
                        }
                        if delete && symbol != q {
                            let mut e = edits;
                            e.deletions += 1;
                            let cell = self.run_cell(entry.cell, CellOp::Deletion, symbol, symbol, iv, e, element);
                            self.push_run(&mut slots, &mut seen, j, entry.origin, entry.x, cell);
                        }
                    }
                }
            }
        }

        Ok(slots
            .pop()
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.cell)
            .collect())
    }

    fn run_cell(
        &self,
        parent: usize,
        op: CellOp,
        residue: u8,
        bwt_symbol: u8,
        interval: Interval,
        edits: EditCounts,
        element: usize,
    ) -> SearchCell {
        let mut cell = self.arena.get(parent).child(parent, op, interval, element);
        cell.residue = residue;
        cell.bwt_symbol = bwt_symbol;
        cell.edits = edits;
        cell
    }

    fn push_run(
        &mut self,
        slots: &mut [Vec<RunEntry>],
        seen: &mut HashSet<RunKey>,
        slot: usize,
        origin: usize,
        x: usize,
        cell: SearchCell,
    ) {
        let key = (slot, origin, cell.interval.left, cell.interval.right, cell.edits, x);
        if !seen.insert(key) {
            return;
        }
        let id = self.arena.push(cell);
        slots[slot].push(RunEntry { cell: id, origin, x });
    }

    // ── 质量缺口 ────────────────────────────────────────

    fn process_gap(
        &mut self,
        frontier: &[usize],
        gap: f64,
        element: usize,
        dir: Direction,
        terminus: Option<Terminus>,
    ) -> Result<Vec<usize>> {
        let ctx = self.ctx;
        let tol_abs = ctx.settings.tolerance.absolute_at(gap);
        let no_delta = [0.0];
        let deltas: &[f64] = match terminus {
            Some(t) => ctx.terminal_deltas(t),
            None => &no_delta,
        };
        let lowest_delta = deltas.first().copied().unwrap_or(0.0);
        let max_ptms = self.matching.max_ptms_per_tag_peptide;

        let mut closed = Vec::new();
        let mut work: Vec<GapEntry> = frontier
            .iter()
            .map(|&cell| GapEntry { cell, mass: 0.0, x: 0 })
            .collect();

        while let Some(entry) = work.pop() {
            let (interval, modification_count) = {
                let c = self.arena.get(entry.cell);
                (c.interval, c.modification_count)
            };
            for (symbol, iv) in self.chunk.range_extend(interval, dir)? {
                if symbol == b'X' {
                    if entry.x >= ctx.settings.max_x_per_tag {
                        continue;
                    }
                    let mut cell = self.arena.get(entry.cell).child(entry.cell, CellOp::Match, iv, element);
                    cell.residue = b'X';
                    cell.bwt_symbol = b'X';
                    cell.x_placeholder = true;
                    cell.mass = entry.mass;
                    let id = self.arena.push(cell);
                    let next = GapEntry { cell: id, mass: entry.mass, x: entry.x + 1 };
                    self.settle(next, gap, tol_abs, deltas, dir, terminus, &mut work, &mut closed)?;
                    continue;
                }

                let members = aa::ambiguity_members(symbol);
                // 蛋白上的模糊码按其具体成员计算质量
                let residues: &[u8] = if members.is_empty() { std::slice::from_ref(&symbol) } else { members };
                for &residue in residues {
                    for option in ctx.tables.mass_options(residue) {
                        if option.mass <= 0.0 {
                            continue;
                        }
                        let adds = usize::from(option.variable.is_some());
                        if modification_count + adds > max_ptms {
                            continue;
                        }
                        let mass = entry.mass + option.mass;
                        if gap - mass - lowest_delta < -tol_abs {
                            self.stats.pruned_gap_cells += 1;
                            continue;
                        }
                        let mut cell = self.arena.get(entry.cell).child(entry.cell, CellOp::Match, iv, element);
                        cell.residue = residue;
                        cell.bwt_symbol = symbol;
                        cell.mass = mass;
                        cell.fixed_modification = option.fixed;
                        cell.variable_modification = option.variable;
                        cell.modification_count += adds;
                        let id = self.arena.push(cell);
                        let next = GapEntry { cell: id, mass, x: entry.x };
                        self.settle(next, gap, tol_abs, deltas, dir, terminus, &mut work, &mut closed)?;
                    }
                }
            }
        }
        Ok(closed)
    }

    /// 新单元要么闭合缺口，要么（剩余质量仍可能由残基组成时）继续扩展，否则剪枝。
    fn settle(
        &mut self,
        entry: GapEntry,
        gap: f64,
        tol_abs: f64,
        deltas: &[f64],
        dir: Direction,
        terminus: Option<Terminus>,
        work: &mut Vec<GapEntry>,
        closed: &mut Vec<usize>,
    ) -> Result<()> {
        let element = self.arena.get(entry.cell).element;
        if let Some(leaf) = self.try_close(entry, gap, tol_abs, dir, terminus)? {
            self.stats.closed_gap_cells[element] += 1;
            closed.push(leaf);
            return Ok(());
        }
        let residual = gap - entry.mass;
        let ctx = self.ctx;
        let extendable = deltas.iter().any(|&d| {
            let r = residual - d;
            r >= ctx.min_residue_mass - tol_abs && ctx.lookup.may_reach(r, tol_abs)
        });
        if extendable {
            work.push(entry);
        } else {
            self.stats.pruned_gap_cells += 1;
        }
        Ok(())
    }

    fn try_close(
        &mut self,
        entry: GapEntry,
        gap: f64,
        tol_abs: f64,
        dir: Direction,
        terminus: Option<Terminus>,
    ) -> Result<Option<usize>> {
        let ctx = self.ctx;
        let tolerance = ctx.settings.tolerance;
        let (interval, residue, modification_count, element) = {
            let c = self.arena.get(entry.cell);
            let residue = (!c.x_placeholder).then_some(c.residue);
            (c.interval, residue, c.modification_count, c.element)
        };

        let mut protein_interval = None;
        let candidates = match terminus {
            None => vec![TerminalCandidate {
                protein: None,
                peptide: None,
                delta: 0.0,
                variable_count: 0,
            }],
            Some(t) => {
                protein_interval = self.chunk.extend(interval, SEPARATOR, dir)?;
                terminal_candidates(&ctx.tables, t, residue, protein_interval.is_some())
            }
        };

        for candidate in candidates {
            if modification_count + candidate.variable_count > self.matching.max_ptms_per_tag_peptide {
                continue;
            }
            let target = gap - entry.mass - candidate.delta;
            let closes = if entry.x == 0 {
                tolerance.within(entry.mass + candidate.delta, gap)
            } else {
                ctx.x_lookup.reachable(entry.x, target, tol_abs)
            };
            if !closes {
                continue;
            }
            let terminal = terminus.map(|t| TerminalMatch {
                terminus: t,
                protein: candidate.protein,
                peptide: candidate.peptide,
            });
            {
                let c = self.arena.get_mut(entry.cell);
                c.modification_count += candidate.variable_count;
                if entry.x > 0 {
                    c.x_closure = Some(XClosure {
                        residual: target,
                        count: entry.x,
                        tolerance: tol_abs,
                    });
                }
            }
            if candidate.protein.is_some() {
                let Some(iv) = protein_interval else {
                    continue;
                };
                let mut separator = self.arena.get(entry.cell).child(entry.cell, CellOp::Terminus, iv, element);
                separator.residue = SEPARATOR;
                separator.bwt_symbol = SEPARATOR;
                separator.terminal = terminal;
                return Ok(Some(self.arena.push(separator)));
            }
            self.arena.get_mut(entry.cell).terminal = terminal;
            return Ok(Some(entry.cell));
        }
        Ok(None)
    }

    // ── 回溯与输出 ──────────────────────────────────────

    /// 叶子路径上的单元，按文本从左到右排列。
    fn text_order(&self, leaf: usize) -> Vec<usize> {
        let mut order = Vec::new();
        let mut junction = None;
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let c = self.arena.get(id);
            match c.op {
                CellOp::Root => break,
                CellOp::Junction => {
                    junction = c.junction;
                    break;
                }
                _ => order.push(id),
            }
            cur = c.parent;
        }
        if let Some(reverse_leaf) = junction {
            let mut tail: Vec<usize> = self
                .arena
                .path(reverse_leaf)
                .into_iter()
                .filter(|&id| self.arena.get(id).op != CellOp::Root)
                .collect();
            tail.reverse();
            order.extend(tail);
        }
        order
    }

    fn resolve_path(&self, order: &[usize]) -> ResolvedPath {
        let tables = &self.ctx.tables;
        let modification = |index: usize, site: usize| {
            let m = tables.modification(index);
            ModificationMatch {
                name: m.name.clone(),
                variable: m.variable,
                site,
            }
        };

        let mut peptide = Vec::with_capacity(order.len());
        let mut modifications = Vec::new();
        let mut variants = Vec::new();
        let mut terminals: Vec<TerminalMatch> = Vec::new();
        let mut x_slots: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut closures: Vec<(usize, XClosure)> = Vec::new();
        let mut leading_separator = false;
        let mut length_delta = 0i32;

        for (k, &id) in order.iter().enumerate() {
            let c = self.arena.get(id);
            match c.op {
                CellOp::Terminus => leading_separator |= k == 0,
                CellOp::Deletion => {
                    length_delta -= 1;
                    variants.push(VariantSite {
                        site: peptide.len() + 1,
                        variant: Variant::Deletion { residue: c.residue as char },
                    });
                }
                CellOp::Insertion => {
                    length_delta += 1;
                    peptide.push(c.residue);
                    variants.push(VariantSite {
                        site: peptide.len(),
                        variant: Variant::Insertion { residue: c.residue as char },
                    });
                }
                CellOp::Substitution => {
                    peptide.push(c.residue);
                    variants.push(VariantSite {
                        site: peptide.len(),
                        variant: Variant::Substitution {
                            original: c.bwt_symbol as char,
                            substituted: c.residue as char,
                        },
                    });
                }
                CellOp::Match => {
                    peptide.push(c.residue);
                    let site = peptide.len();
                    if c.x_placeholder {
                        x_slots.entry(c.element).or_default().push(site - 1);
                    }
                    for m in [c.fixed_modification, c.variable_modification].into_iter().flatten() {
                        modifications.push(modification(m, site));
                    }
                }
                CellOp::Root | CellOp::Junction => {}
            }
            if let Some(t) = c.terminal {
                terminals.push(t);
            }
            if let Some(closure) = c.x_closure {
                closures.push((c.element, closure));
            }
        }

        for t in terminals {
            let site = match t.terminus {
                Terminus::N => 1,
                Terminus::C => peptide.len(),
            };
            for m in [t.protein, t.peptide].into_iter().flatten() {
                modifications.push(modification(m, site));
            }
        }
        modifications.sort_by_key(|m| m.site);

        let x_groups = closures
            .into_iter()
            .filter_map(|(element, closure)| x_slots.remove(&element).map(|slots| (slots, closure)))
            .collect();
        let edits = variants.len();
        let variant_match = (!variants.is_empty()).then(|| VariantMatch {
            variants,
            length_delta,
            edit_script: order.iter().filter_map(|&id| self.arena.get(id).edit_char()).collect(),
        });

        ResolvedPath {
            peptide,
            leading_separator,
            modifications,
            variant_match,
            edits,
            x_groups,
        }
    }

    /// 把质量缺口中的 X 占位替换为所有符合剩余质量的残基排列。
    fn expand_x(&self, resolved: &ResolvedPath) -> Vec<String> {
        let mut peptides = vec![resolved.peptide.clone()];
        for (slots, closure) in &resolved.x_groups {
            let combos = self
                .ctx
                .x_lookup
                .compute_mapping_ranges(closure.count, closure.residual, closure.tolerance);
            let mut next = Vec::new();
            for p in &peptides {
                for (_, combo) in combos {
                    for perm in distinct_permutations(combo) {
                        let mut q = p.clone();
                        for (&slot, &r) in slots.iter().zip(perm.iter()) {
                            q[slot] = r;
                        }
                        next.push(q);
                    }
                }
            }
            peptides = next;
        }
        peptides
            .into_iter()
            .map(|p| String::from_utf8_lossy(&p).into_owned())
            .collect()
    }

    fn emit(&self, leaves: &[usize]) -> Result<Vec<PeptideProteinMapping>> {
        let mut candidates: Vec<Candidate> = Vec::new();
        for &leaf in leaves {
            let order = self.text_order(leaf);
            let resolved = self.resolve_path(&order);
            let peptides = self.expand_x(&resolved);
            let interval = self.arena.get(leaf).interval;
            for row in interval.left..=interval.right {
                let mut position = self.chunk.resolve_text_position(row)?;
                if resolved.leading_separator {
                    position += 1;
                }
                let Some((protein, offset)) = self.chunk.resolve_protein(position) else {
                    continue;
                };
                let Some(accession) = self.chunk.accession(protein) else {
                    continue;
                };
                for peptide in &peptides {
                    candidates.push(Candidate {
                        mapping: PeptideProteinMapping {
                            accession: accession.to_string(),
                            peptide: peptide.clone(),
                            index: offset + 1,
                            modifications: resolved.modifications.clone(),
                            variant_match: resolved.variant_match.clone(),
                        },
                        edits: resolved.edits,
                    });
                }
            }
        }

        // 编辑少的优先；同蛋白同肽段且起点相差不超过编辑预算的视为重复
        candidates.sort_by_key(|c| c.edits);
        let threshold = self.ctx.settings.variants.budget.total();
        let mut kept: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut out = Vec::new();
        for c in candidates {
            let key = (c.mapping.accession.clone(), c.mapping.peptide.clone());
            let starts = kept.entry(key).or_default();
            if starts.iter().any(|&s| s.abs_diff(c.mapping.index) <= threshold) {
                continue;
            }
            starts.push(c.mapping.index);
            out.push(c.mapping);
        }
        Ok(out)
    }
}

/// 最长的序列段（并列时取最左）。
fn pivot_of(elements: &[TagElement]) -> usize {
    let mut best = 0;
    let mut best_len = 0;
    for (i, e) in elements.iter().enumerate() {
        if let TagElement::Run(run) = e {
            if run.len() > best_len {
                best = i;
                best_len = run.len();
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::chunk::ChunkText;
    use crate::params::modification::{Modification, ModificationCategory};
    use crate::params::settings::SearchSettings;
    use crate::params::variants::VariantSettings;
    use crate::params::MatchingType;
    use crate::search::tag::TagComponent;
    use crate::util::aa::monoisotopic_mass;
    use crate::util::cancel::NeverCancel;

    fn chunk(proteins: &[(&str, &str)]) -> IndexChunk {
        let mut ct = ChunkText::with_capacity(128);
        for (acc, seq) in proteins {
            ct.push_protein(acc, seq.as_bytes());
        }
        IndexChunk::build(ct, 2, &NeverCancel).unwrap().unwrap()
    }

    fn mass(residues: &str) -> f64 {
        residues.bytes().map(|r| monoisotopic_mass(r).unwrap()).sum()
    }

    fn tag(left: f64, run: &str, right: f64) -> Tag {
        Tag::new(vec![
            TagComponent::MassGap(left),
            TagComponent::AminoAcidSequence(run.to_string()),
            TagComponent::MassGap(right),
        ])
    }

    #[test]
    fn pivot_is_longest_run() {
        let elements = vec![
            TagElement::Run(b"AB".to_vec()),
            TagElement::Gap(1.0),
            TagElement::Run(b"ABC".to_vec()),
        ];
        assert_eq!(pivot_of(&elements), 2);
    }

    #[test]
    fn exact_peptide() {
        let c = chunk(&[("P1", "MPEPTIDEK")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let m = SequenceMatching::default();
        let hits = TagMatcher::new(&c, &ctx, &m).map_peptide("PEPTIDE").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].accession, "P1");
        assert_eq!(hits[0].index, 2);
        assert!(hits[0].modifications.is_empty());
        assert!(hits[0].variant_match.is_none());
    }

    #[test]
    fn indistinguishable_leucine() {
        let c = chunk(&[("P1", "MPEPTIDEK")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let il = SequenceMatching::default();
        assert_eq!(TagMatcher::new(&c, &ctx, &il).map_peptide("PEPTLDE").unwrap().len(), 1);
        let exact = SequenceMatching::string();
        assert!(TagMatcher::new(&c, &ctx, &exact).map_peptide("PEPTLDE").unwrap().is_empty());
    }

    #[test]
    fn query_x_limited_by_share() {
        let c = chunk(&[("P1", "MPEPTIDEK")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let m = SequenceMatching::new(MatchingType::AminoAcid, 0.25);
        // 7 个残基允许 1 个 X
        let one = TagMatcher::new(&c, &ctx, &m).map_peptide("PEPXIDE").unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].peptide, "PEPTIDE");
        assert!(TagMatcher::new(&c, &ctx, &m).map_peptide("PXPXIDE").unwrap().is_empty());
    }

    #[test]
    fn protein_x_stays_in_peptide() {
        let c = chunk(&[("P1", "ECTQDRXKTAFTEAVLLP")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let m = SequenceMatching::new(MatchingType::AminoAcid, 0.25);
        let hits = TagMatcher::new(&c, &ctx, &m).map_peptide("DRAKTAF").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peptide, "DRXKTAF");
        assert_eq!(hits[0].index, 5);
    }

    #[test]
    fn substitution_inside_reverse_run() {
        let c = chunk(&[("P1", "TESTMRITESTCKTESTK")]);
        let mut settings = SearchSettings::default();
        settings.variants = VariantSettings::specific(0, 0, 1);
        let ctx = SearchContext::new(settings).unwrap();
        let m = SequenceMatching::default();

        // 唯一的序列段即枢轴，替换发生在反向遍历中
        let hits = TagMatcher::new(&c, &ctx, &m).map_tag(&tag(mass("TMRI"), "TEAT", mass("CK"))).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peptide, "TMRITEATCK");
        assert_eq!(hits[0].index, 4);
        let vm = hits[0].variant_match.as_ref().unwrap();
        assert_eq!(vm.variants[0].site, 7);
        assert_eq!(vm.variants[0].variant, Variant::Substitution { original: 'S', substituted: 'A' });
        assert_eq!(vm.edit_script, "------A---");
    }

    #[test]
    fn insertion_and_deletion_sites() {
        let c = chunk(&[("P1", "MPEPTIDEK")]);
        let mut settings = SearchSettings::default();
        settings.variants = VariantSettings::specific(1, 1, 0);
        let ctx = SearchContext::new(settings).unwrap();
        let m = SequenceMatching::string();

        // 查询多出一个 W：插入位于查询第 4 位
        let ins = TagMatcher::new(&c, &ctx, &m).map_peptide("PEPWTIDE").unwrap();
        let vm = ins.iter().find_map(|h| h.variant_match.clone()).unwrap();
        assert_eq!(vm.length_delta, 1);
        assert_eq!(vm.variants[0].site, 4);
        assert_eq!(vm.variants[0].variant, Variant::Insertion { residue: 'W' });
        assert_eq!(vm.edit_script, "---*----");

        // 查询缺少 T：缺失记录在其后的查询位置
        let del = TagMatcher::new(&c, &ctx, &m).map_peptide("PEPIDE").unwrap();
        let hit = del.iter().find(|h| h.variant_match.is_some()).unwrap();
        assert_eq!(hit.index, 2);
        let vm = hit.variant_match.as_ref().unwrap();
        assert_eq!(vm.length_delta, -1);
        assert_eq!(vm.variants[0].site, 4);
        assert_eq!(vm.variants[0].variant, Variant::Deletion { residue: 'T' });
        assert_eq!(vm.edit_script, "---t---");
    }

    #[test]
    fn tag_maps_across_both_gaps() {
        let c = chunk(&[("P1", "TESTMRITESTCKTESTK")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let m = SequenceMatching::default();
        let t = tag(mass("LRMT"), "TEST", mass("CK"));
        let mut matcher = TagMatcher::new(&c, &ctx, &m);
        let hits = matcher.map_tag(&t).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peptide, "TMRITESTCK");
        assert_eq!(hits[0].index, 4);
        assert!(hits[0].modifications.is_empty());
        assert!(!matcher.stats().cache_hit);
    }

    #[test]
    fn fixed_modification_is_mandatory_in_gaps() {
        let c = chunk(&[("P1", "TESTMRITESTCKTESTK")]);
        let mut settings = SearchSettings::default();
        settings.modifications.modifications.push(Modification::fixed(
            "Carbamidomethylation of C",
            57.02146,
            ModificationCategory::Residue,
            "C",
        ));
        let ctx = SearchContext::new(settings).unwrap();
        let m = SequenceMatching::default();

        let plain = tag(mass("LRMT"), "TEST", mass("CK"));
        assert!(TagMatcher::new(&c, &ctx, &m).map_tag(&plain).unwrap().is_empty());

        let modified = tag(mass("LRMT"), "TEST", mass("CK") + 57.02146);
        let hits = TagMatcher::new(&c, &ctx, &m).map_tag(&modified).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].modifications.len(), 1);
        assert_eq!(hits[0].modifications[0].site, 9);
        assert!(!hits[0].modifications[0].variable);
    }

    #[test]
    fn variable_modification_site() {
        let c = chunk(&[("P1", "TESTMRITESTCKTESTK")]);
        let mut settings = SearchSettings::default();
        settings.modifications.modifications.push(Modification::variable(
            "Oxidation of M",
            15.99491,
            ModificationCategory::Residue,
            "M",
        ));
        let ctx = SearchContext::new(settings).unwrap();
        let m = SequenceMatching::default();
        let t = tag(mass("LRMT") + 15.99491, "TEST", mass("CK"));
        let hits = TagMatcher::new(&c, &ctx, &m).map_tag(&t).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].modifications[0].name, "Oxidation of M");
        assert_eq!(hits[0].modifications[0].site, 2);
        assert!(hits[0].modifications[0].variable);
    }

    #[test]
    fn protein_x_in_gap_is_resolved_by_mass() {
        let c = chunk(&[("P1", "MPEPXIDEK")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let m = SequenceMatching::default();
        let t = Tag::new(vec![
            TagComponent::MassGap(mass("PEPT")),
            TagComponent::AminoAcidSequence("IDEK".to_string()),
        ]);
        let hits = TagMatcher::new(&c, &ctx, &m).map_tag(&t).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peptide, "PEPTIDEK");
        assert_eq!(hits[0].index, 2);
    }

    #[test]
    fn protein_n_term_modification_uses_separator() {
        let c = chunk(&[("P1", "MPEPTIDEK")]);
        let mut settings = SearchSettings::default();
        settings.modifications.modifications.push(Modification::variable(
            "Acetylation of protein N-term",
            42.01056,
            ModificationCategory::ProteinNTerm,
            "",
        ));
        let ctx = SearchContext::new(settings).unwrap();
        let m = SequenceMatching::default();
        let t = Tag::new(vec![
            TagComponent::MassGap(mass("MP") + 42.01056),
            TagComponent::AminoAcidSequence("EPTIDEK".to_string()),
        ]);
        let hits = TagMatcher::new(&c, &ctx, &m).map_tag(&t).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peptide, "MPEPTIDEK");
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[0].modifications[0].site, 1);
        assert_eq!(hits[0].modifications[0].name, "Acetylation of protein N-term");
    }

    #[test]
    fn unreachable_gap_never_closes() {
        let c = chunk(&[("P1", "TESTMRITESTCKTESTK")]);
        let ctx = SearchContext::new(SearchSettings::default()).unwrap();
        let m = SequenceMatching::default();
        let t = tag(30.0, "TEST", mass("CK"));
        let mut matcher = TagMatcher::new(&c, &ctx, &m);
        assert!(matcher.map_tag(&t).unwrap().is_empty());
        assert_eq!(matcher.stats().closed_gap_cells[0], 0);
        assert_eq!(matcher.stats().closed_gap_cells[2], 1);
        assert!(matcher.stats().pruned_gap_cells > 0);
    }
}
