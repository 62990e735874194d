use crate::error::Result;
use crate::util::aa;

/// 一条蛋白记录：登录号与大写残基序列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protein {
    pub accession: String,
    pub sequence: Vec<u8>,
}

impl Protein {
    pub fn new(accession: impl Into<String>, sequence: &[u8]) -> Self {
        Self {
            accession: accession.into(),
            sequence: aa::normalize_protein(sequence),
        }
    }
}

/// 蛋白来源：索引构建会读两遍（计数、构建），两遍的顺序必须一致。
pub trait ProteinSource {
    /// 回到第一条记录。
    fn rewind(&mut self) -> Result<()>;

    fn next_protein(&mut self) -> Result<Option<Protein>>;
}

/// 内存中的蛋白列表。
#[derive(Debug, Clone, Default)]
pub struct VecProteinSource {
    proteins: Vec<Protein>,
    cursor: usize,
}

impl VecProteinSource {
    pub fn new(proteins: Vec<Protein>) -> Self {
        Self { proteins, cursor: 0 }
    }

    /// 由 (登录号, 序列) 对构建。
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(acc, seq)| Protein::new(acc, seq.as_bytes()))
                .collect(),
        )
    }
}

impl ProteinSource for VecProteinSource {
    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next_protein(&mut self) -> Result<Option<Protein>> {
        let next = self.proteins.get(self.cursor).cloned();
        if next.is_some() {
            self.cursor += 1;
        }
        Ok(next)
    }
}
