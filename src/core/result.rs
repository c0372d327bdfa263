use serde::{Deserialize, Serialize};

use crate::core::allele::PileAllele;
use crate::core::genome::ReferencePosition;
use crate::core::pileup::Pileup;

/// Neighborhood evidence gathered around one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaplotypeResult {
    pub other_variants: u32,
    pub other_triallelics: u32,
    pub other_biallelics: u32,
    pub adjacent_de_novos: u32,
    pub other_de_novos: u32,
    pub concordances: Vec<f64>,
}

/// Pileup metrics of one sample at a candidate site, framed on the child's
/// A1/A2 alleles so that parental columns line up with the child's.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    pub weighted_depth: f64,
    pub a1_weighted_depth: f64,
    pub a2_weighted_depth: f64,
    pub a1_raw_depth: u32,
    pub a2_raw_depth: u32,
    pub weighted_minor_allele_fraction: f64,
    pub a1_clipped_reads: u32,
    pub a2_clipped_reads: u32,
    pub a1_apparent_mismap_reads: u32,
    pub a2_apparent_mismap_reads: u32,
    pub a1_unmapped_mate_reads: u32,
    pub a2_unmapped_mate_reads: u32,
    pub a1_end_of_read_reads: u32,
    pub a2_end_of_read_reads: u32,
}

impl Sample {
    pub fn framed(id: &str, pileup: &Pileup, a1: Option<PileAllele>, a2: Option<PileAllele>) -> Self {
        let weighted = |allele: Option<PileAllele>| allele.map_or(0.0, |a| pileup.weighted_of(a));
        let raw = |allele: Option<PileAllele>| allele.map_or(0, |a| pileup.raw_depth(a));
        let clipped = |allele: Option<PileAllele>| allele.map_or(0, |a| pileup.clipped_of(a));
        let mismap = |allele: Option<PileAllele>| allele.map_or(0, |a| pileup.apparent_mismap_of(a));
        let widowed = |allele: Option<PileAllele>| allele.map_or(0, |a| pileup.unmapped_mate_of(a));
        let ending = |allele: Option<PileAllele>| allele.map_or(0, |a| pileup.end_of_read_of(a));

        let biallelic = weighted(a1) + weighted(a2);
        let minor_fraction = match biallelic {
            depth if depth > 0.0 => weighted(a2) / depth,
            _ => 0.0,
        };

        Self {
            id: id.to_string(),
            weighted_depth: pileup.total_weighted(),
            a1_weighted_depth: weighted(a1),
            a2_weighted_depth: weighted(a2),
            a1_raw_depth: raw(a1),
            a2_raw_depth: raw(a2),
            weighted_minor_allele_fraction: minor_fraction,
            a1_clipped_reads: clipped(a1),
            a2_clipped_reads: clipped(a2),
            a1_apparent_mismap_reads: mismap(a1),
            a2_apparent_mismap_reads: mismap(a2),
            a1_unmapped_mate_reads: widowed(a1),
            a2_unmapped_mate_reads: widowed(a2),
            a1_end_of_read_reads: ending(a1),
            a2_end_of_read_reads: ending(a2),
        }
    }
}

/// Everything known about one evaluated candidate: the site, the
/// neighborhood evidence, per-sample pileup metrics, and the final
/// supernovo verdict. Annotation fields are filled by the external
/// annotator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeNovoResult {
    pub pos: ReferencePosition,
    pub hap: HaplotypeResult,
    pub de_novo_allele: Option<PileAllele>,
    pub dn_is_ref: Option<bool>,
    pub super_novo: bool,
    pub snpeff_gene: Option<String>,
    pub snpeff_impact: Option<String>,
    pub samples: Vec<Sample>,
}
