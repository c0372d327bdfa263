use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

pub use cache::{HtsReadSource, PileupCache, ReadSource};
pub use depth::{BiAllele, Depth};

use crate::core::allele::PileAllele;
use crate::core::dna::Nucleotide;
use crate::core::genome::GenomePosition;
use crate::core::read::{PileRead, ReadId};

mod cache;
mod depth;

/// Reads whose `=`-fraction falls below this are treated as mismapped.
const MIN_MATCH_FRACTION: f64 = 0.5;

/// Immutable summary of all non-duplicate reads overlapping one position.
/// Weighted depth excludes clipped, apparently mismapped, and mate-unmapped
/// reads; the diagnostic counters include every overlapping read.
#[derive(Debug)]
pub struct Pileup {
    position: GenomePosition,
    records: HashMap<PileAllele, HashSet<ReadId>>,
    weighted: HashMap<PileAllele, f64>,
    clipped: HashMap<PileAllele, u32>,
    apparent_mismap: HashMap<PileAllele, u32>,
    unmapped_mate: HashMap<PileAllele, u32>,
    end_of_read: HashMap<PileAllele, u32>,
    depth: OnceLock<Depth>,
}

impl Pileup {
    pub fn position(&self) -> &GenomePosition {
        &self.position
    }

    pub fn alleles(&self) -> impl Iterator<Item = PileAllele> + '_ {
        self.records.keys().copied()
    }

    pub fn records_of(&self, allele: PileAllele) -> Option<&HashSet<ReadId>> {
        self.records.get(&allele)
    }

    pub fn raw_depth(&self, allele: PileAllele) -> u32 {
        self.records.get(&allele).map_or(0, |ids| ids.len() as u32)
    }

    pub fn total_raw_depth(&self) -> u32 {
        self.records.values().map(|ids| ids.len() as u32).sum()
    }

    pub fn raw_fraction(&self, allele: PileAllele) -> f64 {
        match self.total_raw_depth() {
            0 => 0.0,
            total => f64::from(self.raw_depth(allele)) / f64::from(total),
        }
    }

    pub fn weighted_of(&self, allele: PileAllele) -> f64 {
        self.weighted.get(&allele).copied().unwrap_or(0.0)
    }

    pub fn total_weighted(&self) -> f64 {
        self.weighted.values().sum()
    }

    pub fn clipped_of(&self, allele: PileAllele) -> u32 {
        self.clipped.get(&allele).copied().unwrap_or(0)
    }

    pub fn apparent_mismap_of(&self, allele: PileAllele) -> u32 {
        self.apparent_mismap.get(&allele).copied().unwrap_or(0)
    }

    pub fn unmapped_mate_of(&self, allele: PileAllele) -> u32 {
        self.unmapped_mate.get(&allele).copied().unwrap_or(0)
    }

    pub fn end_of_read_of(&self, allele: PileAllele) -> u32 {
        self.end_of_read.get(&allele).copied().unwrap_or(0)
    }

    /// Does any allele at this position carry the given read?
    pub fn contains_read(&self, id: ReadId) -> bool {
        self.records.values().any(|ids| ids.contains(&id))
    }

    pub(crate) fn weighted_alleles(&self) -> impl Iterator<Item = (PileAllele, f64)> + '_ {
        self.weighted.iter().map(|(allele, weight)| (*allele, *weight))
    }

    /// The two dominant alleles by weighted depth, computed once on demand.
    pub fn depth(&self) -> &Depth {
        self.depth.get_or_init(|| Depth::of(self))
    }

    /// Read ids supporting the major (A1) or minor (A2) allele.
    pub fn allelic_records(&self, which: BiAllele) -> Option<&HashSet<ReadId>> {
        self.depth().allele(which).and_then(|allele| self.records_of(allele))
    }

    pub fn allelic_raw_depth(&self, which: BiAllele) -> u32 {
        self.depth().allele(which).map_or(0, |allele| self.raw_depth(allele))
    }
}

impl PartialEq for Pileup {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.records == other.records
            && self.weighted == other.weighted
            && self.clipped == other.clipped
            && self.apparent_mismap == other.apparent_mismap
            && self.unmapped_mate == other.unmapped_mate
            && self.end_of_read == other.end_of_read
    }
}

pub struct PileupBuilder {
    position: GenomePosition,
    queried: Vec<PileAllele>,
    records: HashMap<PileAllele, HashSet<ReadId>>,
    weighted: HashMap<PileAllele, f64>,
    clipped: HashMap<PileAllele, u32>,
    apparent_mismap: HashMap<PileAllele, u32>,
    unmapped_mate: HashMap<PileAllele, u32>,
    end_of_read: HashMap<PileAllele, u32>,
}

impl PileupBuilder {
    pub fn new(position: GenomePosition) -> Self {
        Self::with_queried(position, Vec::new())
    }

    /// Builder that labels supporting reads with one of the queried alleles
    /// when possible. For SNVs the labeling collapses to the base the read
    /// carries at the covered offset.
    pub fn with_queried(position: GenomePosition, queried: Vec<PileAllele>) -> Self {
        Self {
            position,
            queried,
            records: HashMap::new(),
            weighted: HashMap::new(),
            clipped: HashMap::new(),
            apparent_mismap: HashMap::new(),
            unmapped_mate: HashMap::new(),
            end_of_read: HashMap::new(),
        }
    }

    pub fn add(&mut self, read: &impl PileRead) {
        if read.is_duplicate() {
            return;
        }
        let position = *self.position.position();
        let offset = match read.offset_at(position) {
            Some(offset) => offset,
            None => return,
        };
        let allele = self
            .queried
            .iter()
            .copied()
            .find(|allele| allele.supported(read, offset))
            .unwrap_or_else(|| PileAllele::Snp(Nucleotide::from(read.base(offset))));
        self.records.entry(allele).or_default().insert(read.id());

        let mut weigh = true;
        if read.is_clipped() {
            *self.clipped.entry(allele).or_insert(0) += 1;
            weigh = false;
        }
        if read.match_fraction().map_or(false, |frac| frac < MIN_MATCH_FRACTION) {
            *self.apparent_mismap.entry(allele).or_insert(0) += 1;
            weigh = false;
        }
        if read.is_mate_unmapped() {
            *self.unmapped_mate.entry(allele).or_insert(0) += 1;
            weigh = false;
        }
        if read.alignment_start() == position || read.alignment_end() == position {
            *self.end_of_read.entry(allele).or_insert(0) += 1;
        }
        if weigh {
            *self.weighted.entry(allele).or_insert(0.0) += allele.weighted_depth(read, offset);
        }
    }

    pub fn add_all<'a, R: PileRead + 'a>(&mut self, reads: impl IntoIterator<Item = &'a R>) {
        for read in reads {
            self.add(read);
        }
    }

    pub fn build(self) -> Pileup {
        Pileup {
            position: self.position,
            records: self.records,
            weighted: self.weighted,
            clipped: self.clipped,
            apparent_mismap: self.apparent_mismap,
            unmapped_mate: self.unmapped_mate,
            end_of_read: self.end_of_read,
            depth: OnceLock::new(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::core::read::MockRead;

    use super::*;

    pub struct ReadSpec {
        pub id: ReadId,
        pub base: u8,
        pub base_qual: u8,
        pub mapq: u8,
        pub clipped: bool,
        pub match_fraction: Option<f64>,
        pub mate_unmapped: bool,
        pub offset: Option<usize>,
        pub start: u64,
        pub end: u64,
    }

    impl ReadSpec {
        pub fn clean(id: ReadId, base: u8) -> Self {
            Self {
                id,
                base,
                base_qual: 30,
                mapq: 60,
                clipped: false,
                match_fraction: Some(1.0),
                mate_unmapped: false,
                offset: Some(7),
                start: 900,
                end: 1100,
            }
        }

        pub fn mock(self) -> MockRead {
            let mut read = MockRead::new();
            read.expect_id().return_const(self.id);
            read.expect_is_duplicate().return_const(false);
            read.expect_is_mate_unmapped().return_const(self.mate_unmapped);
            read.expect_is_clipped().return_const(self.clipped);
            read.expect_match_fraction().return_const(self.match_fraction);
            read.expect_offset_at().return_const(self.offset);
            read.expect_base().return_const(self.base);
            read.expect_base_qual().return_const(self.base_qual);
            read.expect_mapq().return_const(self.mapq);
            read.expect_alignment_start().return_const(self.start);
            read.expect_alignment_end().return_const(self.end);
            read
        }
    }

    /// A well-behaved read covering the pileup position.
    pub fn read(id: ReadId, base: u8, base_qual: u8, mapq: u8) -> MockRead {
        ReadSpec { base_qual, mapq, ..ReadSpec::clean(id, base) }.mock()
    }

    /// Pileup at `position` from the given (base, count) groups, with read
    /// ids assigned sequentially from `first_id`.
    pub fn pileup(position: GenomePosition, bases: &[(u8, usize)], first_id: ReadId) -> Pileup {
        let mut builder = PileupBuilder::new(position);
        let mut id = first_id;
        for &(base, count) in bases {
            for _ in 0..count {
                builder.add(&read(id, base, 30, 60));
                id += 1;
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::read::MockRead;

    use super::testutil::{read, ReadSpec};
    use super::*;

    fn pos() -> GenomePosition {
        GenomePosition::new("chr1", 1000)
    }

    const A: PileAllele = PileAllele::Snp(Nucleotide::A);
    const G: PileAllele = PileAllele::Snp(Nucleotide::G);

    #[test]
    fn balanced_het() {
        // 20 reads A + 20 reads G, BQ=30, MQ=60, no diagnostics triggered
        let mut builder = PileupBuilder::new(pos());
        for id in 0..20 {
            builder.add(&read(id, b'A', 30, 60));
        }
        for id in 20..40 {
            builder.add(&read(id, b'G', 30, 60));
        }
        let pileup = builder.build();

        assert_eq!(pileup.raw_depth(A), 20);
        assert_eq!(pileup.raw_depth(G), 20);
        assert_eq!(pileup.total_raw_depth(), 40);

        let expected = 20.0 * 0.999 * (1.0 - 10f64.powf(-6.0));
        assert!((pileup.weighted_of(A) - expected).abs() < 1e-9);
        assert!((pileup.total_weighted() - 2.0 * expected).abs() < 1e-9);
        assert!((pileup.total_weighted() - 39.96).abs() < 0.01);

        let depth = pileup.depth();
        assert_eq!(depth.bi_alleles().len(), 2);
        assert!((depth.weighted_minor_allele_fraction() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn duplicates_and_uncovered_are_ignored() {
        let mut builder = PileupBuilder::new(pos());

        let mut duplicate = MockRead::new();
        duplicate.expect_is_duplicate().return_const(true);
        builder.add(&duplicate);

        let mut uncovered = MockRead::new();
        uncovered.expect_is_duplicate().return_const(false);
        uncovered.expect_offset_at().return_const(Option::<usize>::None);
        builder.add(&uncovered);

        assert_eq!(builder.build().total_raw_depth(), 0);
    }

    #[test]
    fn diagnostics_exclude_weight_but_keep_raw_counts() {
        let mut builder = PileupBuilder::new(pos());
        builder.add(&ReadSpec { clipped: true, ..ReadSpec::clean(1, b'A') }.mock());
        builder.add(&ReadSpec { match_fraction: Some(0.4), ..ReadSpec::clean(2, b'A') }.mock());
        builder.add(&ReadSpec { mate_unmapped: true, ..ReadSpec::clean(3, b'A') }.mock());
        builder.add(&ReadSpec::clean(4, b'A').mock());
        let pileup = builder.build();

        assert_eq!(pileup.raw_depth(A), 4);
        assert_eq!(pileup.clipped_of(A), 1);
        assert_eq!(pileup.apparent_mismap_of(A), 1);
        assert_eq!(pileup.unmapped_mate_of(A), 1);
        // only the clean read contributes weight
        assert!((pileup.weighted_of(A) - 0.999 * (1.0 - 10f64.powf(-6.0))).abs() < 1e-9);
    }

    #[test]
    fn unjudgeable_cigar_is_not_mismapped() {
        // M-style alignment: match_fraction is None, the read keeps its weight
        let mut builder = PileupBuilder::new(pos());
        builder.add(&ReadSpec { match_fraction: None, ..ReadSpec::clean(1, b'A') }.mock());
        let pileup = builder.build();

        assert_eq!(pileup.apparent_mismap_of(A), 0);
        assert!(pileup.weighted_of(A) > 0.0);
    }

    #[test]
    fn end_of_read_is_diagnostic_only() {
        let mut builder = PileupBuilder::new(pos());
        builder.add(&ReadSpec { start: 1000, end: 1100, ..ReadSpec::clean(1, b'A') }.mock());
        builder.add(&ReadSpec { start: 900, end: 1000, ..ReadSpec::clean(2, b'A') }.mock());
        builder.add(&ReadSpec::clean(3, b'A').mock());
        let pileup = builder.build();

        assert_eq!(pileup.end_of_read_of(A), 2);
        assert_eq!(pileup.raw_depth(A), 3);
        assert!((pileup.weighted_of(A) - 3.0 * 0.999 * (1.0 - 10f64.powf(-6.0))).abs() < 1e-9);
    }

    #[test]
    fn queried_alleles_label_supporting_reads() {
        let mut builder = PileupBuilder::with_queried(pos(), vec![A, G]);
        builder.add(&read(1, b'A', 30, 60));
        builder.add(&read(2, b'G', 30, 60));
        builder.add(&read(3, b'T', 30, 60));
        let pileup = builder.build();

        assert_eq!(pileup.raw_depth(A), 1);
        assert_eq!(pileup.raw_depth(G), 1);
        assert_eq!(pileup.raw_depth(PileAllele::Snp(Nucleotide::T)), 1);
    }

    #[test]
    fn raw_counts_sum_to_unique_reads() {
        let pileup = testutil::pileup(pos(), &[(b'A', 12), (b'G', 5), (b'T', 1)], 0);
        assert_eq!(pileup.total_raw_depth(), 18);

        let mut all = HashSet::new();
        for allele in pileup.alleles().collect::<Vec<_>>() {
            all.extend(pileup.records_of(allele).unwrap().iter().copied());
        }
        assert_eq!(all.len(), 18);
    }

    #[test]
    fn weights_bounded_by_raw_counts() {
        let pileup = testutil::pileup(pos(), &[(b'A', 12), (b'G', 5)], 0);
        for allele in [A, G] {
            assert!(pileup.weighted_of(allele) <= f64::from(pileup.raw_depth(allele)));
        }
    }

    #[test]
    fn same_read_contributes_to_one_allele_once() {
        let mut builder = PileupBuilder::new(pos());
        builder.add(&read(1, b'A', 30, 60));
        builder.add(&read(1, b'A', 30, 60));
        let pileup = builder.build();

        assert_eq!(pileup.raw_depth(A), 1);
    }
}
