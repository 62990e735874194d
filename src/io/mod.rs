pub mod fasta;
pub mod protein;
