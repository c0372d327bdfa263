use std::collections::HashSet;

use derive_more::Constructor;
use log::warn;

use crate::core::allele::PileAllele;
use crate::core::genome::ReferencePosition;
use crate::core::pileup::{BiAllele, Depth, Pileup};

/// All tunable thresholds, passed explicitly into the classifier and the
/// evaluators; there is no process-wide configuration.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Minimum weighted biallelic depth to call a variant.
    pub min_depth: f64,
    /// Minimum raw per-allele depth for both A1 and A2.
    pub min_allelic_depth: f64,
    /// Minimum weighted minor-allele fraction.
    pub min_allelic_frac: f64,
    /// Parental allelic fraction at or below which calls count as miscalls.
    pub max_miscall_frac: f64,
    /// Parental raw depth at or below which calls count as miscalls.
    pub max_miscall_weight: f64,
    /// Parental AD (from the VCF) above which a candidate is assumed inherited.
    pub vcf_max_parent_ad: i32,
    /// Minimum parental weighted depth for a supernovo call.
    pub min_parental_depth: f64,
    /// Per-allele raw depth floor (paired with the fraction test) for a
    /// neighboring de novo.
    pub min_other_dn_allelic_depth: f64,
    /// Per-allele raw depth floor for a neighboring de novo that fails the
    /// fraction test.
    pub min_other_dn_allelic_depth_independent: f64,
    /// Minimum haplotype concordance for a neighbor to count as de novo.
    pub min_haplotype_concordance: f64,
    /// Up/downstream distance scanned for variants on overlapping reads.
    pub haplotype_search_distance: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_depth: 10.0,
            min_allelic_depth: 4.0,
            min_allelic_frac: 0.10,
            max_miscall_frac: 0.05,
            max_miscall_weight: 1.0,
            vcf_max_parent_ad: 4,
            min_parental_depth: 10.0,
            min_other_dn_allelic_depth: 1.5,
            min_other_dn_allelic_depth_independent: 3.0,
            min_haplotype_concordance: 0.75,
            haplotype_search_distance: 150,
        }
    }
}

/// Threshold predicates over pileups. Free-standing so the variant and
/// haplotype evaluators can share one instance without referencing each
/// other.
#[derive(Clone, Copy, Debug, Constructor)]
pub struct Classifier {
    config: Config,
}

impl Classifier {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn looks_variant(&self, pileup: &Pileup) -> bool {
        let depth = pileup.depth();
        depth.bi_alleles().len() == 2
            && depth.weighted_biallelic_depth() >= self.config.min_depth
            && self.passes_allelic_frac(depth)
            && self.passes_allelic_depth(pileup, self.config.min_allelic_depth)
    }

    pub fn passes_allelic_frac(&self, depth: &Depth) -> bool {
        depth.weighted_minor_allele_fraction() >= self.config.min_allelic_frac
    }

    pub fn passes_allelic_depth(&self, pileup: &Pileup, min_depth: f64) -> bool {
        [BiAllele::A1, BiAllele::A2]
            .into_iter()
            .all(|which| f64::from(pileup.allelic_raw_depth(which)) >= min_depth)
    }

    /// Alleles with enough raw support to be more than sequencing miscalls.
    pub fn possible_alleles(&self, pileup: &Pileup) -> HashSet<PileAllele> {
        pileup
            .alleles()
            .filter(|&allele| {
                f64::from(pileup.raw_depth(allele)) > self.config.max_miscall_weight
                    || pileup.raw_fraction(allele) > self.config.max_miscall_frac
            })
            .collect()
    }

    pub fn more_than_two_viable(&self, pileup: &Pileup) -> bool {
        self.possible_alleles(pileup).len() > 2
    }

    pub fn looks_biallelic(&self, pileup: &Pileup) -> bool {
        self.looks_variant(pileup) && !self.more_than_two_viable(pileup)
    }

    /// The single child allele absent from both parents' possible-allele
    /// sets. More than one such allele is ambiguous: the site is dropped,
    /// with a warning when parental evidence was actually present.
    pub fn dn_allele(&self, child: &Pileup, parents: Option<(&Pileup, &Pileup)>) -> Option<PileAllele> {
        let parental: HashSet<PileAllele> = match parents {
            Some((p1, p2)) => {
                self.possible_alleles(p1).into_iter().chain(self.possible_alleles(p2)).collect()
            }
            None => HashSet::new(),
        };
        let novel: Vec<PileAllele> =
            child.depth().bi_alleles().into_iter().filter(|allele| !parental.contains(allele)).collect();
        match novel.as_slice() {
            [allele] => Some(*allele),
            [] => None,
            _ => {
                if parents.is_some() {
                    warn!("Multiple alleles at {} appear de novo for child", child.position());
                }
                None
            }
        }
    }

    pub fn looks_denovo(&self, child: &Pileup, parents: Option<(&Pileup, &Pileup)>) -> bool {
        self.dn_allele(child, parents).is_some()
    }

    /// De novo allele at a candidate site. In trio mode this is the standard
    /// parental-difference rule; in solo mode the reference allele is known,
    /// so the de novo allele is the non-reference member of the child's
    /// biallelic pair.
    pub fn dn_allele_at(
        &self,
        pos: &ReferencePosition,
        child: &Pileup,
        parents: Option<(&Pileup, &Pileup)>,
    ) -> Option<PileAllele> {
        if parents.is_some() {
            return self.dn_allele(child, parents);
        }
        let novel: Vec<PileAllele> = child
            .depth()
            .bi_alleles()
            .into_iter()
            .filter(|allele| allele != pos.ref_allele())
            .collect();
        match novel.as_slice() {
            [allele] => Some(*allele),
            [] => None,
            _ => {
                warn!("Multiple non-reference alleles at {} appear de novo for child", pos);
                None
            }
        }
    }
}
