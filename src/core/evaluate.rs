use crate::core::classify::Classifier;
use crate::core::genome::ReferencePosition;
use crate::core::haplotype::HaplotypeEvaluator;
use crate::core::pileup::{BiAllele, PileupCache, ReadSource};
use crate::core::result::{DeNovoResult, Sample};

/// One BAM-backed sample: its VCF sample id and its pileup cache.
pub struct BamSample<S: ReadSource> {
    pub id: String,
    pub pileups: PileupCache<S>,
}

impl<S: ReadSource> BamSample<S> {
    pub fn new(id: impl Into<String>, pileups: PileupCache<S>) -> Self {
        Self { id: id.into(), pileups }
    }
}

/// Evaluates candidate positions against the child pileup (and, in trio
/// mode, both parents), producing one [DeNovoResult] per site that looks
/// variant.
pub struct Evaluator<S: ReadSource> {
    classifier: Classifier,
    child: BamSample<S>,
    parents: Option<(BamSample<S>, BamSample<S>)>,
}

impl<S: ReadSource> Evaluator<S> {
    pub fn new(classifier: Classifier, child: BamSample<S>, parents: Option<(BamSample<S>, BamSample<S>)>) -> Self {
        Self { classifier, child, parents }
    }

    pub fn is_trio(&self) -> bool {
        self.parents.is_some()
    }

    pub fn evaluate(&self, pos: &ReferencePosition) -> Option<DeNovoResult> {
        let child_pile = self.child.pileups.get(pos.position());
        if !self.classifier.looks_variant(&child_pile) {
            return None;
        }

        let parent_caches = self.parents.as_ref().map(|(p1, p2)| (&p1.pileups, &p2.pileups));
        let hap = HaplotypeEvaluator::new(&self.classifier, &self.child.pileups, parent_caches)
            .evaluate(&child_pile);

        let depth = child_pile.depth();
        let (a1, a2) = (depth.allele(BiAllele::A1), depth.allele(BiAllele::A2));

        let parent_piles = self
            .parents
            .as_ref()
            .map(|(p1, p2)| (p1.pileups.get(pos.position()), p2.pileups.get(pos.position())));
        let de_novo_allele = self.classifier.dn_allele_at(
            pos,
            &child_pile,
            parent_piles.as_ref().map(|(q1, q2)| (q1.as_ref(), q2.as_ref())),
        );
        let dn_is_ref = de_novo_allele.map(|allele| allele == *pos.ref_allele());

        let config = self.classifier.config();
        let parents_deep = parent_piles.as_ref().map_or(true, |(q1, q2)| {
            q1.total_weighted() >= config.min_parental_depth && q2.total_weighted() >= config.min_parental_depth
        });
        let concordant = hap.concordances.iter().all(|&c| c >= config.min_haplotype_concordance);
        let super_novo = self.classifier.looks_biallelic(&child_pile)
            && de_novo_allele.is_some()
            && parents_deep
            && concordant
            && hap.adjacent_de_novos == 0;

        let mut samples = vec![Sample::framed(&self.child.id, &child_pile, a1, a2)];
        if let (Some((p1, p2)), Some((q1, q2))) = (&self.parents, &parent_piles) {
            samples.push(Sample::framed(&p1.id, q1, a1, a2));
            samples.push(Sample::framed(&p2.id, q2, a1, a2));
        }

        Some(DeNovoResult {
            pos: pos.clone(),
            hap,
            de_novo_allele,
            dn_is_ref,
            super_novo,
            snpeff_gene: None,
            snpeff_impact: None,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use bio_types::genome::Position;

    use crate::core::allele::PileAllele;
    use crate::core::classify::{Classifier, Config};
    use crate::core::dna::Nucleotide;
    use crate::core::genome::GenomePosition;
    use crate::core::pileup::{PileupCache, ReadSource};
    use crate::core::read::MockRead;

    use super::*;

    struct FnSource<F>(F);

    impl<F> ReadSource for FnSource<F>
    where
        F: Fn(&str, Position, Position) -> Vec<MockRead> + Sync,
    {
        type Read = MockRead;

        fn fetch(&self, contig: &str, start: Position, stop: Position) -> Vec<MockRead> {
            (self.0)(contig, start, stop)
        }
    }

    /// Reads covering position 1000 only.
    fn reads_at_candidate(groups: &[(std::ops::Range<u64>, u8)]) -> Vec<MockRead> {
        let mut reads = Vec::new();
        for (ids, base) in groups {
            for id in ids.clone() {
                let mut read = MockRead::new();
                read.expect_id().return_const(id);
                read.expect_is_duplicate().return_const(false);
                read.expect_is_mate_unmapped().return_const(false);
                read.expect_is_clipped().return_const(false);
                read.expect_match_fraction().return_const(Some(1.0));
                read.expect_offset_at()
                    .returning(|position| (position == 1000).then(|| 50usize));
                read.expect_base().return_const(*base);
                read.expect_base_qual().return_const(30u8);
                read.expect_mapq().return_const(60u8);
                read.expect_alignment_start().return_const(950u64);
                read.expect_alignment_end().return_const(1050u64);
                reads.push(read);
            }
        }
        reads
    }

    fn sample<F>(id: &str, source: F) -> BamSample<FnSource<F>>
    where
        F: Fn(&str, Position, Position) -> Vec<MockRead> + Sync,
    {
        BamSample::new(id, PileupCache::new(FnSource(source), 512))
    }

    fn candidate() -> ReferencePosition {
        ReferencePosition::try_new(GenomePosition::new("chr1", 1000), b"A", Some(b"G")).unwrap()
    }

    #[test]
    fn solo_obvious_het_is_supernovo() {
        let classifier = Classifier::new(Config::default());
        let child = sample("CHILD", |_: &str, _, _| {
            reads_at_candidate(&[(1..21, b'A'), (21..41, b'G')])
        });
        let evaluator = Evaluator::new(classifier, child, None);

        let result = evaluator.evaluate(&candidate()).expect("looks variant");
        assert_eq!(result.de_novo_allele, Some(PileAllele::Snp(Nucleotide::G)));
        assert_eq!(result.dn_is_ref, Some(false));
        assert!(result.super_novo);
        assert!(result.hap.concordances.is_empty());

        let child = &result.samples[0];
        assert_eq!(child.id, "CHILD");
        assert_eq!(child.a1_raw_depth, 20);
        assert_eq!(child.a2_raw_depth, 20);
        assert!((child.weighted_depth - 39.96).abs() < 0.01);
        assert!((child.weighted_minor_allele_fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn shallow_site_yields_no_result() {
        let classifier = Classifier::new(Config::default());
        let child = sample("CHILD", |_: &str, _, _| {
            reads_at_candidate(&[(1..5, b'A'), (5..9, b'G')])
        });
        let evaluator = Evaluator::new(classifier, child, None);

        assert!(evaluator.evaluate(&candidate()).is_none());
    }

    #[test]
    fn parental_miscall_survives_as_denovo() {
        let classifier = Classifier::new(Config::default());
        let child = sample("CHILD", |_: &str, _, _| {
            reads_at_candidate(&[(1..21, b'A'), (21..41, b'G')])
        });
        let p1 = sample("MOTHER", |_: &str, _, _| {
            reads_at_candidate(&[(101..136, b'A'), (136..137, b'G')])
        });
        let p2 = sample("FATHER", |_: &str, _, _| reads_at_candidate(&[(201..237, b'A')]));
        let evaluator = Evaluator::new(classifier, child, Some((p1, p2)));

        let result = evaluator.evaluate(&candidate()).expect("looks variant");
        assert_eq!(result.de_novo_allele, Some(PileAllele::Snp(Nucleotide::G)));
        assert!(result.super_novo);
        assert_eq!(result.samples.len(), 3);

        // parent columns are framed on the child's alleles
        let mother = &result.samples[1];
        assert_eq!(mother.id, "MOTHER");
        assert_eq!(mother.a1_raw_depth, 35);
        assert_eq!(mother.a2_raw_depth, 1);
    }

    #[test]
    fn inherited_site_is_not_supernovo() {
        let classifier = Classifier::new(Config::default());
        let child = sample("CHILD", |_: &str, _, _| {
            reads_at_candidate(&[(1..21, b'A'), (21..41, b'G')])
        });
        let p1 = sample("MOTHER", |_: &str, _, _| {
            reads_at_candidate(&[(101..119, b'A'), (119..137, b'G')])
        });
        let p2 = sample("FATHER", |_: &str, _, _| reads_at_candidate(&[(201..237, b'A')]));
        let evaluator = Evaluator::new(classifier, child, Some((p1, p2)));

        let result = evaluator.evaluate(&candidate()).expect("looks variant");
        assert_eq!(result.de_novo_allele, None);
        assert!(!result.super_novo);
    }

    #[test]
    fn thin_parental_coverage_blocks_supernovo() {
        let classifier = Classifier::new(Config::default());
        let child = sample("CHILD", |_: &str, _, _| {
            reads_at_candidate(&[(1..21, b'A'), (21..41, b'G')])
        });
        let p1 = sample("MOTHER", |_: &str, _, _| reads_at_candidate(&[(101..106, b'A')]));
        let p2 = sample("FATHER", |_: &str, _, _| reads_at_candidate(&[(201..237, b'A')]));
        let evaluator = Evaluator::new(classifier, child, Some((p1, p2)));

        let result = evaluator.evaluate(&candidate()).expect("looks variant");
        assert_eq!(result.de_novo_allele, Some(PileAllele::Snp(Nucleotide::G)));
        assert!(!result.super_novo);
    }
}
