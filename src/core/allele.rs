use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::dna::Nucleotide;
use crate::core::phred;
use crate::core::read::PileRead;

/// An allele a read can support at a pileup position. Indels are represented
/// only far enough to be recognized and rejected; every candidate surviving
/// parsing is a SNV.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum PileAllele {
    Snp(Nucleotide),
    Indel(u32),
}

impl PileAllele {
    pub fn from_vcf(allele: &[u8]) -> Self {
        match allele.len() {
            1 => PileAllele::Snp(Nucleotide::from(allele[0])),
            len => PileAllele::Indel(len as u32),
        }
    }

    pub fn is_snp(&self) -> bool {
        matches!(self, PileAllele::Snp(_))
    }

    /// Does the read call this allele at the given read offset?
    pub fn supported(&self, read: &impl PileRead, offset: usize) -> bool {
        match self {
            PileAllele::Snp(nuc) => Nucleotide::from(read.base(offset)) == *nuc,
            PileAllele::Indel(_) => false,
        }
    }

    /// Weighted depth contribution of a supporting read at the given offset.
    pub fn weighted_depth(&self, read: &impl PileRead, offset: usize) -> f64 {
        match self {
            PileAllele::Snp(_) => phred::accuracy(read.base_qual(offset)) * phred::accuracy(read.mapq()),
            PileAllele::Indel(_) => 0.0,
        }
    }
}

impl Display for PileAllele {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PileAllele::Snp(nuc) => write!(f, "{}", nuc),
            PileAllele::Indel(len) => write!(f, "<{}bp>", len),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::read::MockRead;

    use super::*;

    #[test]
    fn from_vcf() {
        assert_eq!(PileAllele::from_vcf(b"A"), PileAllele::Snp(Nucleotide::A));
        assert_eq!(PileAllele::from_vcf(b"t"), PileAllele::Snp(Nucleotide::T));
        assert_eq!(PileAllele::from_vcf(b"AT"), PileAllele::Indel(2));
        assert!(!PileAllele::from_vcf(b"ATTG").is_snp());
    }

    #[test]
    fn supported() {
        let mut read = MockRead::new();
        read.expect_base().return_const(b'G');

        assert!(PileAllele::Snp(Nucleotide::G).supported(&read, 3));
        assert!(!PileAllele::Snp(Nucleotide::A).supported(&read, 3));
        assert!(!PileAllele::Indel(2).supported(&read, 3));
    }

    #[test]
    fn weighted_depth() {
        let mut read = MockRead::new();
        read.expect_base_qual().return_const(20u8);
        read.expect_mapq().return_const(10u8);

        let weight = PileAllele::Snp(Nucleotide::A).weighted_depth(&read, 0);
        assert!((weight - 0.99 * 0.9).abs() < 1e-12);
        assert_eq!(PileAllele::Indel(2).weighted_depth(&read, 0), 0.0);
    }
}
