use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bio_types::genome::Position;

use crate::core::classify::Classifier;
use crate::core::genome::GenomePosition;
use crate::core::pileup::{BiAllele, Pileup, PileupCache, ReadSource};
use crate::core::read::ReadId;
use crate::core::result::HaplotypeResult;

/// Scans the neighborhood of a candidate for other variant sites and scores
/// how consistently reads spanning both positions sort onto the candidate's
/// two haplotypes.
pub struct HaplotypeEvaluator<'a, S: ReadSource> {
    classifier: &'a Classifier,
    child: &'a PileupCache<S>,
    parents: Option<(&'a PileupCache<S>, &'a PileupCache<S>)>,
}

type RangePileups = BTreeMap<GenomePosition, Arc<Pileup>>;

impl<'a, S: ReadSource> HaplotypeEvaluator<'a, S> {
    pub fn new(
        classifier: &'a Classifier,
        child: &'a PileupCache<S>,
        parents: Option<(&'a PileupCache<S>, &'a PileupCache<S>)>,
    ) -> Self {
        Self { classifier, child, parents }
    }

    pub fn evaluate(&self, child_pile: &Pileup) -> HaplotypeResult {
        let pos = child_pile.position();
        let distance = self.classifier.config().haplotype_search_distance;
        let start = GenomePosition::new(pos.contig().as_str(), pos.position().saturating_sub(distance).max(1));
        let stop = GenomePosition::new(pos.contig().as_str(), pos.position() + distance);

        let mut other_variants = 0;
        let mut other_triallelics = 0;
        let mut other_biallelics = 0;
        let mut concordances = Vec::new();
        let mut other_denovo_positions: HashSet<Position> = HashSet::new();

        // Parental windows are fetched only if some neighbor actually needs
        // a de novo check.
        let mut p1_range: Option<RangePileups> = None;
        let mut p2_range: Option<RangePileups> = None;

        for (search_position, search_pile) in self.child.get_range(&start, &stop) {
            if search_position == *pos {
                continue;
            }
            let search_depth = search_pile.depth();
            if search_depth.bi_alleles().len() != 2 {
                continue;
            }
            let conc = concordance(child_pile, &search_pile);

            if self.classifier.looks_variant(&search_pile) {
                other_variants += 1;
                if self.classifier.more_than_two_viable(&search_pile) {
                    other_triallelics += 1;
                } else {
                    other_biallelics += 1;
                    if let Some(conc) = conc {
                        concordances.push(conc);
                    }
                }
            }

            let config = self.classifier.config();
            let passes_depth = (self.classifier.passes_allelic_frac(search_depth)
                && self.classifier.passes_allelic_depth(&search_pile, config.min_other_dn_allelic_depth))
                || self
                    .classifier
                    .passes_allelic_depth(&search_pile, config.min_other_dn_allelic_depth_independent);
            if passes_depth
                && conc.unwrap_or(0.0) >= config.min_haplotype_concordance
                && self.neighbor_looks_denovo(&search_position, &search_pile, &start, &stop, &mut p1_range, &mut p2_range)
            {
                other_denovo_positions.insert(*search_position.position());
            }
        }

        let adjacent_de_novos = adjacent_run(&other_denovo_positions, *pos.position());
        let other_de_novos = other_denovo_positions.len() as u32 - adjacent_de_novos;
        HaplotypeResult {
            other_variants,
            other_triallelics,
            other_biallelics,
            adjacent_de_novos,
            other_de_novos,
            concordances,
        }
    }

    fn neighbor_looks_denovo(
        &self,
        position: &GenomePosition,
        pileup: &Pileup,
        start: &GenomePosition,
        stop: &GenomePosition,
        p1_range: &mut Option<RangePileups>,
        p2_range: &mut Option<RangePileups>,
    ) -> bool {
        match self.parents {
            None => self.classifier.looks_denovo(pileup, None),
            Some((p1, p2)) => {
                let r1 = p1_range.get_or_insert_with(|| p1.get_range(start, stop));
                let r2 = p2_range.get_or_insert_with(|| p2.get_range(start, stop));
                match (r1.get(position), r2.get(position)) {
                    (Some(q1), Some(q2)) => self.classifier.looks_denovo(pileup, Some((q1, q2))),
                    _ => false,
                }
            }
        }
    }
}

/// Number of de novo positions in the contiguous runs touching `position`
/// from either side.
fn adjacent_run(positions: &HashSet<Position>, position: Position) -> u32 {
    let mut adjacent = 0;
    let mut up = position + 1;
    while positions.contains(&up) {
        adjacent += 1;
        up += 1;
    }
    let mut down = position;
    while let Some(next) = down.checked_sub(1) {
        if !positions.contains(&next) {
            break;
        }
        adjacent += 1;
        down = next;
    }
    adjacent
}

/// Agreement between the candidate's two read-backed haplotypes and the
/// allele calls of a neighboring pileup, on the reads spanning both sites.
/// The A1/A2 labeling at either site is arbitrary, so the best of the cis
/// and trans pairings is taken. Undefined when no read spans both sites.
pub fn concordance(base: &Pileup, search: &Pileup) -> Option<f64> {
    let h1 = base.allelic_records(BiAllele::A1);
    let h2 = base.allelic_records(BiAllele::A2);
    let s1 = search.allelic_records(BiAllele::A1);
    let s2 = search.allelic_records(BiAllele::A2);

    let n1 = spanning(h1, search);
    let n2 = spanning(h2, search);
    if n1 == 0 && n2 == 0 {
        return None;
    }

    let fraction = |haplotype: Option<&HashSet<ReadId>>, calls: Option<&HashSet<ReadId>>, n: usize| match n {
        0 => 1.0,
        n => intersection(haplotype, calls) as f64 / n as f64,
    };

    let cis = fraction(h1, s1, n1).min(fraction(h2, s2, n2));
    let trans = fraction(h1, s2, n1).min(fraction(h2, s1, n2));
    Some(cis.max(trans))
}

fn spanning(haplotype: Option<&HashSet<ReadId>>, search: &Pileup) -> usize {
    haplotype.map_or(0, |ids| ids.iter().filter(|&&id| search.contains_read(id)).count())
}

fn intersection(left: Option<&HashSet<ReadId>>, right: Option<&HashSet<ReadId>>) -> usize {
    match (left, right) {
        (Some(left), Some(right)) => left.intersection(right).count(),
        _ => 0,
    }
}
