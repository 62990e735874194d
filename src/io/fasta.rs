use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::protein::{Protein, ProteinSource};

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

impl FastaRecord {
    /// UniProt 风格 `db|ACCESSION|NAME` 取中间字段，否则取整个 id。
    pub fn accession(&self) -> &str {
        let mut fields = self.id.split('|');
        match (fields.next(), fields.next()) {
            (Some(_), Some(acc)) if !acc.is_empty() => acc,
            _ => &self.id,
        }
    }
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            peek_header: None,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // 找到头行
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(rest) = self.buf.strip_prefix('>') {
                    break rest.trim().to_string();
                }
            }
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // 读取序列行
        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if let Some(rest) = self.buf.strip_prefix('>') {
                self.peek_header = Some(rest.trim().to_string());
                break;
            }
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => seq.push(b.to_ascii_uppercase()),
                }
            }
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}

/// 基于 FASTA 文件的蛋白来源；`rewind` 重新打开文件。
pub struct FastaProteinSource {
    path: PathBuf,
    reader: FastaReader<BufReader<File>>,
}

impl FastaProteinSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = FastaReader::new(BufReader::new(File::open(&path)?));
        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProteinSource for FastaProteinSource {
    fn rewind(&mut self) -> Result<()> {
        self.reader = FastaReader::new(BufReader::new(File::open(&self.path)?));
        Ok(())
    }

    fn next_protein(&mut self) -> Result<Option<Protein>> {
        Ok(self
            .reader
            .next_record()?
            .map(|rec| Protein::new(rec.accession(), &rec.seq)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_simple_fasta() {
        let data = b">sp|P12345|TEST_HUMAN first\nMPeptIDEK\n>P2\nAAA\n";
        let cursor = Cursor::new(&data[..]);
        let mut r = FastaReader::new(cursor);

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "sp|P12345|TEST_HUMAN");
        assert_eq!(r1.accession(), "P12345");
        assert_eq!(r1.desc.as_deref(), Some("first"));
        assert_eq!(r1.seq, b"MPEPTIDEK");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.accession(), "P2");
        assert_eq!(r2.desc, None);
        assert_eq!(r2.seq, b"AAA");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn parse_fasta_with_crlf_and_whitespace() {
        let data = b">P1 desc\r\nAC g t n\r\n acgt\r\n>P2 \r\n K K K \r\n";
        let cursor = Cursor::new(&data[..]);
        let mut r = FastaReader::new(cursor);

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "P1");
        assert_eq!(r1.desc.as_deref(), Some("desc"));
        assert_eq!(r1.seq, b"ACGTNACGT");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "P2");
        assert_eq!(r2.seq, b"KKK");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn parse_fasta_with_leading_empty_lines() {
        let data = b"\n\n>P1\nACGT\n";
        let cursor = Cursor::new(&data[..]);
        let mut r = FastaReader::new(cursor);

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "P1");
        assert_eq!(r1.seq, b"ACGT");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn protein_source_reads_twice() {
        let dir = std::env::temp_dir().join(format!("pepmap-fasta-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("db.fasta");
        std::fs::write(&path, ">tr|Q1|A\nMPEP*\n>Q2\nKK\n").unwrap();

        let mut src = FastaProteinSource::open(&path).unwrap();
        let p1 = src.next_protein().unwrap().unwrap();
        assert_eq!(p1.accession, "Q1");
        assert_eq!(p1.sequence, b"MPEP".to_vec());
        assert_eq!(src.next_protein().unwrap().unwrap().accession, "Q2");
        assert!(src.next_protein().unwrap().is_none());

        src.rewind().unwrap();
        assert_eq!(src.next_protein().unwrap().unwrap().accession, "Q1");
        std::fs::remove_dir_all(&dir).ok();
    }
}
