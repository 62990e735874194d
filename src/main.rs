use std::io::{BufRead, BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rayon::prelude::*;

use pepmap_rust::index::{FMIndex, IndexMeta};
use pepmap_rust::io::fasta::FastaProteinSource;
use pepmap_rust::params::{MatchingType, SearchSettings, SequenceMatching};
use pepmap_rust::search::{PeptideProteinMapping, Tag};
use pepmap_rust::util::cancel::NeverCancel;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "pepmap", author, version, about = "FM-index peptide and sequence-tag mapper", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an index of a protein FASTA database
    Index {
        /// Protein FASTA file
        fasta: String,
        /// Search settings (JSON); defaults are used if omitted
        #[arg(short, long)]
        params: Option<String>,
        /// Output index path
        #[arg(short, long, default_value = "proteins.pmi")]
        output: String,
    },
    /// Map peptide sequences (one per line) against an index
    MapPeptides {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Map sequence tags such as `<501.27>TEST<231.10>` (one per line) against an index
    MapTags {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Index built by `pepmap index`
    #[arg(short = 'i', long = "index")]
    index: String,
    /// Query file, one query per line; `#` starts a comment
    input: String,
    #[arg(short, long, value_enum, default_value_t = MatchingArg::Indistinguishable)]
    matching: MatchingArg,
    /// Maximal share of X in a matched sequence
    #[arg(long = "limit-x", default_value_t = 0.25)]
    limit_x: f64,
    /// Maximal number of variable modifications per tag peptide
    #[arg(long = "max-ptms", default_value_t = 3)]
    max_ptms: usize,
    /// Worker threads (0 = all cores)
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
    /// Output TSV path (stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MatchingArg {
    String,
    AminoAcid,
    Indistinguishable,
}

impl From<MatchingArg> for MatchingType {
    fn from(m: MatchingArg) -> Self {
        match m {
            MatchingArg::String => MatchingType::String,
            MatchingArg::AminoAcid => MatchingType::AminoAcid,
            MatchingArg::Indistinguishable => MatchingType::IndistinguishableAminoAcids,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Index { fasta, params, output } => run_index(&fasta, params.as_deref(), &output),
        Commands::MapPeptides { query } => run_map(&query, |index, line, matching| {
            Ok(index.map_peptide(line, matching)?)
        }),
        Commands::MapTags { query } => run_map(&query, |index, line, matching| {
            let tag: Tag = line.parse()?;
            Ok(index.map_tag(&tag, matching)?)
        }),
    }
}

fn run_index(fasta: &str, params: Option<&str>, output: &str) -> Result<()> {
    let settings = match params {
        Some(path) => SearchSettings::from_json_file(path)
            .with_context(|| format!("cannot read search settings '{}'", path))?,
        None => SearchSettings::default(),
    };
    let mut source = FastaProteinSource::open(fasta)
        .with_context(|| format!("cannot open protein FASTA '{}'", fasta))?;

    let mut index = FMIndex::build(&mut source, settings, &NeverCancel)?;
    index.set_meta(IndexMeta {
        source_file: Some(fasta.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });

    index
        .save_to_file(output)
        .with_context(|| format!("cannot write index to '{}'", output))?;
    info!(
        "index saved: {} ({} proteins, {} chunk(s))",
        output,
        index.protein_count(),
        index.chunks().len()
    );
    Ok(())
}

fn read_queries(path: &str) -> Result<Vec<String>> {
    let f = std::fs::File::open(path).with_context(|| format!("cannot open query file '{}'", path))?;
    let mut queries = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        queries.push(line.to_string());
    }
    Ok(queries)
}

fn run_map<F>(args: &QueryArgs, map: F) -> Result<()>
where
    F: Fn(&FMIndex, &str, &SequenceMatching) -> Result<Vec<PeptideProteinMapping>> + Sync,
{
    let index = FMIndex::load_from_file(&args.index)
        .with_context(|| format!("cannot load index '{}'", args.index))?;
    if let Some(meta) = index.meta() {
        info!(
            "index built from {} at {}",
            meta.source_file.as_deref().unwrap_or("?"),
            meta.build_timestamp.as_deref().unwrap_or("?")
        );
    }
    let queries = read_queries(&args.input)?;
    info!("{} queries loaded from {}", queries.len(), args.input);

    let mut matching = SequenceMatching::new(args.matching.into(), args.limit_x);
    matching.max_ptms_per_tag_peptide = args.max_ptms;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .context("failed to build thread pool")?;
    let results: Vec<Result<Vec<PeptideProteinMapping>>> = pool.install(|| {
        queries
            .par_iter()
            .map(|q| map(&index, q, &matching).with_context(|| format!("query '{}'", q)))
            .collect()
    });

    let mut out: Box<dyn Write> = match &args.output {
        Some(p) => Box::new(BufWriter::new(
            std::fs::File::create(p).with_context(|| format!("cannot create output '{}'", p))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    writeln!(out, "query\taccession\tpeptide\tindex\tmodifications\tvariants")?;
    let mut mapped = 0usize;
    for (query, result) in queries.iter().zip(results) {
        let hits = result?;
        if !hits.is_empty() {
            mapped += 1;
        }
        for hit in hits {
            writeln!(out, "{}\t{}", query, hit.to_tsv())?;
        }
    }
    out.flush()?;

    let stats = index.cache_stats()?;
    info!(
        "{}/{} queries mapped; cache: {} hits, {} misses, {} entries",
        mapped,
        queries.len(),
        stats.hits,
        stats.misses,
        stats.entries
    );
    Ok(())
}
