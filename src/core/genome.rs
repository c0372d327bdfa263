use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use anyhow::{anyhow, Result};
pub use bio_types::genome::Position;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::core::allele::PileAllele;

/// A single 1-based position on a contig. Derived ordering is lexicographic
/// by contig; use [ContigRank] wherever the VCF header's contig order matters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Getters, Serialize, Deserialize)]
pub struct GenomePosition {
    contig: String,
    position: Position,
}

impl GenomePosition {
    pub fn new(contig: impl Into<String>, position: Position) -> Self {
        Self { contig: contig.into(), position }
    }
}

impl Display for GenomePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.contig, self.position)
    }
}

/// A candidate position with its reference allele and, when resolvable, the
/// single putatively de novo alternate allele of the child genotype.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Getters, Serialize, Deserialize)]
pub struct ReferencePosition {
    position: GenomePosition,
    ref_allele: PileAllele,
    alt_allele: Option<PileAllele>,
}

impl ReferencePosition {
    pub fn try_new(position: GenomePosition, reference: &[u8], alt: Option<&[u8]>) -> Result<Self> {
        let ref_allele = PileAllele::from_vcf(reference);
        if !ref_allele.is_snp() {
            return Err(anyhow!("reference allele at {} is not a single base", position));
        }
        let alt_allele = match alt {
            None => return Err(anyhow!("no single non-reference allele at {}", position)),
            Some(alt) => {
                let allele = PileAllele::from_vcf(alt);
                if !allele.is_snp() {
                    return Err(anyhow!("alternate allele at {} is not a single base", position));
                }
                Some(allele)
            }
        };
        Ok(Self { position, ref_allele, alt_allele })
    }

    pub fn contig(&self) -> &str {
        self.position.contig()
    }
}

impl Display for ReferencePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.alt_allele {
            Some(alt) => write!(f, "{} {}>{}", self.position, self.ref_allele, alt),
            None => write!(f, "{} {}>?", self.position, self.ref_allele),
        }
    }
}

/// Contig order as declared by the VCF header, used for the final result
/// sort so that e.g. chr2 precedes chr10 whenever the header says so.
pub struct ContigRank {
    ranks: HashMap<String, usize>,
}

impl ContigRank {
    pub fn new(contigs: impl IntoIterator<Item = String>) -> Self {
        let ranks = contigs.into_iter().enumerate().map(|(rank, contig)| (contig, rank)).collect();
        Self { ranks }
    }

    pub fn key(&self, position: &GenomePosition) -> (usize, Position) {
        let rank = self.ranks.get(position.contig()).copied().unwrap_or(usize::MAX);
        (rank, *position.position())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::dna::Nucleotide;

    use super::*;

    #[test]
    fn reference_position_rejects_indels() {
        let pos = || GenomePosition::new("chr1", 100);
        assert!(ReferencePosition::try_new(pos(), b"AT", Some(b"A")).is_err());
        assert!(ReferencePosition::try_new(pos(), b"A", Some(b"AT")).is_err());
        assert!(ReferencePosition::try_new(pos(), b"A", None).is_err());

        let ok = ReferencePosition::try_new(pos(), b"A", Some(b"G")).unwrap();
        assert_eq!(*ok.ref_allele(), PileAllele::Snp(Nucleotide::A));
        assert_eq!(*ok.alt_allele(), Some(PileAllele::Snp(Nucleotide::G)));
    }

    #[test]
    fn contig_rank_follows_header_order() {
        let rank = ContigRank::new(["chr1", "chr2", "chr10"].map(String::from));
        let key = |contig: &str, pos| rank.key(&GenomePosition::new(contig, pos));

        assert!(key("chr2", 500) < key("chr10", 1));
        assert!(key("chr1", 2) < key("chr1", 10));
        assert!(key("chr10", 1) < key("chrUn", 1));
    }
}
