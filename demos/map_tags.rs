//! 演示如何在 library 模式下使用 pepmap-rust 映射肽段与序列标签。
//!
//! 运行方式：
//! ```bash
//! cargo run --example map_tags
//! ```

use pepmap_rust::index::FMIndex;
use pepmap_rust::io::protein::VecProteinSource;
use pepmap_rust::params::{Modification, ModificationCategory, SearchSettings, SequenceMatching, VariantSettings};
use pepmap_rust::search::Tag;
use pepmap_rust::util::cancel::NeverCancel;

fn main() -> pepmap_rust::Result<()> {
    // 1. 蛋白库与设置
    let mut proteins = VecProteinSource::from_pairs([
        ("sp|P00001|TEST_HUMAN", "TESTMRITESTCKTESTK"),
        ("sp|P00002|PEPT_HUMAN", "MPEPTIDEKPEPTLDER"),
    ]);
    let mut settings = SearchSettings::default();
    settings.modifications.modifications.push(Modification::variable(
        "Oxidation of M",
        15.99491,
        ModificationCategory::Residue,
        "M",
    ));
    settings.variants = VariantSettings::specific(0, 0, 1);

    // 2. 构建索引
    let index = FMIndex::build(&mut proteins, settings, &NeverCancel)?;
    println!("索引构建完成：{} 个蛋白，{} 个分块", index.protein_count(), index.chunks().len());

    // 3. 肽段映射（I/L 等价，允许一次替换）
    let matching = SequenceMatching::default();
    for peptide in ["PEPTIDE", "PEPTADE"] {
        println!("\n肽段 {}:", peptide);
        for hit in index.map_peptide(peptide, &matching)? {
            println!("  {}", hit.to_tsv());
        }
    }

    // 4. 标签映射：TMRI 的质量（含 M 氧化）+ TEST + CK 的质量
    let tag: Tag = "<517.26400>TEST<231.10415>".parse()?;
    println!("\n标签 {}:", tag);
    for hit in index.map_tag(&tag, &matching)? {
        println!("  {}", hit.to_tsv());
    }

    // 5. 再次查询同一标签命中缓存
    index.map_tag(&tag, &matching)?;
    let stats = index.cache_stats()?;
    println!("\n缓存：命中 {}，未命中 {}，条目 {}", stats.hits, stats.misses, stats.entries);
    Ok(())
}
