use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use bio_types::genome::AbstractInterval;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use rust_htslib::bcf;
use rust_htslib::bcf::header::{HeaderRecord, HeaderView};
use rust_htslib::bcf::record::GenotypeAllele;
use rust_htslib::bcf::Read;
use thread_local::ThreadLocal;

use crate::core::classify::Config;
use crate::core::genome::{GenomePosition, ReferencePosition};
use crate::core::workload::{genome_bins, GenomeBin, BIN_SIZE};

/// Streams candidate de novo positions out of the input VCF: genome bins are
/// parsed in parallel, each worker thread holding its own indexed reader.
pub struct CandidateParser {
    vcf: PathBuf,
    child: String,
    parents: Option<(String, String)>,
    max_parent_ad: i32,
    readers: ThreadLocal<RefCell<BinReader>>,
}

struct BinReader {
    reader: bcf::IndexedReader,
    child: usize,
    parents: Option<(usize, usize)>,
}

impl CandidateParser {
    pub fn new(vcf: PathBuf, child: String, parents: Option<(String, String)>, config: &Config) -> Self {
        Self { vcf, child, parents, max_parent_ad: config.vcf_max_parent_ad, readers: ThreadLocal::new() }
    }

    /// (name, length) of every contig declared by the VCF header, in rid
    /// order.
    pub fn contigs(&self) -> Result<Vec<(String, u64)>> {
        let reader = bcf::Reader::from_path(&self.vcf)
            .with_context(|| format!("failed to open VCF {}", self.vcf.display()))?;
        let header = reader.header();

        let mut lengths = HashMap::new();
        for record in header.header_records() {
            if let HeaderRecord::Contig { values, .. } = record {
                if let (Some(id), Some(length)) = (values.get("ID"), values.get("length")) {
                    if let Ok(length) = length.parse::<u64>() {
                        lengths.insert(id.clone(), length);
                    }
                }
            }
        }

        let mut contigs = Vec::with_capacity(header.contig_count() as usize);
        for rid in 0..header.contig_count() {
            let name = String::from_utf8_lossy(header.rid2name(rid)?).into_owned();
            let length = *lengths
                .get(&name)
                .with_context(|| format!("VCF header declares no length for contig {}", name))?;
            contigs.push((name, length));
        }
        Ok(contigs)
    }

    /// All candidate positions of the VCF, deduplicated across bin
    /// boundaries.
    pub fn parse(&self) -> Result<HashSet<ReferencePosition>> {
        let contigs = self.contigs()?;
        let bins = genome_bins(&contigs, BIN_SIZE);
        info!("Parsing variants from vcf across {} genome bins", bins.len());

        let progress: Mutex<HashMap<String, u64>> = Mutex::new(HashMap::new());
        let parsed: Result<Vec<HashSet<ReferencePosition>>> =
            bins.par_iter().map(|bin| self.parse_bin(bin, &progress)).collect();

        let mut candidates = HashSet::new();
        for set in parsed? {
            candidates.extend(set);
        }
        info!("Parsed {} candidate positions", candidates.len());
        Ok(candidates)
    }

    fn parse_bin(
        &self,
        bin: &GenomeBin,
        progress: &Mutex<HashMap<String, u64>>,
    ) -> Result<HashSet<ReferencePosition>> {
        let cell = self.reader();
        let mut ctx = cell.borrow_mut();
        let child = ctx.child;
        let parents = ctx.parents;
        let reader = &mut ctx.reader;

        let range = bin.interval().range();
        if reader.fetch(*bin.rid(), range.start, Some(range.end)).is_err() {
            warn!("VCF query failed for bin {}:{}-{}", bin.interval().contig(), range.start, range.end);
            return Ok(HashSet::new());
        }

        let contig = bin.interval().contig();
        let mut candidates = HashSet::new();
        let mut record = reader.empty_record();
        while let Some(outcome) = reader.read(&mut record) {
            outcome.with_context(|| {
                format!("failed to read VCF record in {}:{}-{}", contig, range.start, range.end)
            })?;
            self.log_progress(progress, contig);
            if let Some(candidate) = self.keep_candidate(&record, contig, child, parents) {
                candidates.insert(candidate);
            }
        }
        Ok(candidates)
    }

    fn keep_candidate(
        &self,
        record: &bcf::Record,
        contig: &str,
        child: usize,
        parents: Option<(usize, usize)>,
    ) -> Option<ReferencePosition> {
        let position = record.pos() + 1;
        let mut genotypes = match record.genotypes() {
            Ok(genotypes) => genotypes,
            Err(error) => {
                warn!("failed to decode genotypes at {}:{}: {}", contig, position, error);
                return None;
            }
        };
        let genotype: Vec<GenotypeAllele> = genotypes.get(child).iter().copied().collect();
        let alleles = record.alleles();

        if !single_non_ref(&genotype, &alleles) {
            debug!("skipping {}:{}: child genotype is not a single non-ref SNV", contig, position);
            return None;
        }
        let alt_index = match dn_alt_index(&genotype) {
            Some(index) => index,
            None => {
                error!(
                    "Failed to generate position for variant at {}:{}: no single non-reference allele",
                    contig, position
                );
                return None;
            }
        };
        if let Some(parents) = parents {
            if let Ok(ad) = record.format(b"AD").integer() {
                if seen_in_parent_vcf(&ad, parents, alt_index, self.max_parent_ad) {
                    debug!("skipping {}:{}: de novo allele has parental support in vcf", contig, position);
                    return None;
                }
            }
        }

        let genome_position = GenomePosition::new(contig, position as u64);
        match ReferencePosition::try_new(genome_position, alleles[0], alleles.get(alt_index).copied()) {
            Ok(reference) => Some(reference),
            Err(error) => {
                error!("Failed to generate position for variant at {}:{}: {}", contig, position, error);
                None
            }
        }
    }

    fn log_progress(&self, progress: &Mutex<HashMap<String, u64>>, contig: &str) {
        let mut counts = progress.lock().unwrap();
        let count = counts.entry(contig.to_string()).or_insert(0);
        if *count % 10_000 == 0 && *count != 0 {
            info!("Parsed {} positions on contig {}", count, contig);
        }
        *count += 1;
    }

    fn reader(&self) -> &RefCell<BinReader> {
        self.readers.get_or(|| {
            let reader = bcf::IndexedReader::from_path(&self.vcf).unwrap_or_else(|_| {
                panic!(
                    "Failed to open VCF {}\n\
                    Possible reasons: VCF was not indexed (tabix); you don't have read permissions",
                    self.vcf.display()
                )
            });
            let header = reader.header();
            let child = sample_index(header, &self.child).unwrap_or_else(|error| panic!("{}", error));
            let parents = self.parents.as_ref().map(|(p1, p2)| {
                (
                    sample_index(header, p1).unwrap_or_else(|error| panic!("{}", error)),
                    sample_index(header, p2).unwrap_or_else(|error| panic!("{}", error)),
                )
            });
            RefCell::new(BinReader { reader, child, parents })
        })
    }
}

fn sample_index(header: &HeaderView, id: &str) -> Result<usize> {
    header
        .samples()
        .iter()
        .position(|sample| *sample == id.as_bytes())
        .with_context(|| format!("sample {} is not present in the VCF", id))
}

fn called_indices(genotype: &[GenotypeAllele]) -> Vec<i32> {
    genotype
        .iter()
        .filter_map(|allele| match allele {
            GenotypeAllele::Unphased(index) | GenotypeAllele::Phased(index) => Some(*index),
            GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
        })
        .collect()
}

/// Haploid, or het with exactly one non-reference allele, and every called
/// allele a single base.
fn single_non_ref(genotype: &[GenotypeAllele], alleles: &[&[u8]]) -> bool {
    let called = called_indices(genotype);
    if called.len() != genotype.len() {
        return false;
    }
    let shape_ok = match called.as_slice() {
        [_] => true,
        [first, second] => first != second && (*first == 0 || *second == 0),
        _ => false,
    };
    shape_ok
        && called.iter().all(|&index| alleles.get(index as usize).map_or(false, |allele| allele.len() == 1))
}

fn dn_alt_index(genotype: &[GenotypeAllele]) -> Option<usize> {
    called_indices(genotype).into_iter().find(|&index| index != 0).map(|index| index as usize)
}

/// The putative de novo allele already has real support in a parental VCF
/// genotype: assume it is inherited.
fn seen_in_parent_vcf(ad: &[&[i32]], parents: (usize, usize), alt_index: usize, max_ad: i32) -> bool {
    [parents.0, parents.1].into_iter().any(|sample| {
        ad.get(sample).and_then(|counts| counts.get(alt_index)).map_or(false, |&count| count > max_ad)
    })
}
