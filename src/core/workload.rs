use bio_types::genome::Interval;
use derive_getters::Getters;

/// Bin size used to split contigs into parallel parsing workloads.
pub const BIN_SIZE: u64 = 100_000;

/// One unit of candidate-parsing work: a 0-based half-open window on a
/// single VCF contig.
#[derive(Clone, PartialEq, Eq, Debug, Getters)]
pub struct GenomeBin {
    rid: u32,
    interval: Interval,
}

/// Split every contig of the VCF header into bins of at most `binsize`
/// base pairs. `contigs` must be ordered by rid.
pub fn genome_bins(contigs: &[(String, u64)], binsize: u64) -> Vec<GenomeBin> {
    assert!(binsize > 0, "Binsize must be > 0");
    let mut bins = Vec::new();
    for (rid, (contig, length)) in contigs.iter().enumerate() {
        let mut start = 0;
        while start < *length {
            let end = (start + binsize).min(*length);
            bins.push(GenomeBin { rid: rid as u32, interval: Interval::new(contig.clone(), start..end) });
            start = end;
        }
    }
    bins
}
