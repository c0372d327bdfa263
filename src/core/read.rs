use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bio_types::genome::Position;
#[cfg(test)]
use mockall::mock;
use rust_htslib::bam::record::{Cigar, Record};

/// Stable identity of a sequenced read. Derived from the read name and the
/// first-in-pair flag only, so the same read receives the same id in every
/// BAM it appears in and read sets from different pileups compose by set
/// algebra.
pub type ReadId = u64;

pub fn read_id(name: &[u8], first_in_pair: bool) -> ReadId {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    first_in_pair.hash(&mut hasher);
    hasher.finish()
}

/// An aligned read as seen by the pileup builder.
pub trait PileRead {
    fn id(&self) -> ReadId;
    fn is_duplicate(&self) -> bool;
    fn is_mate_unmapped(&self) -> bool;
    /// CIGAR contains any soft/hard clip operation.
    fn is_clipped(&self) -> bool;
    /// Fraction of read bases the aligner reported as matching (`=`) the
    /// reference. None when the CIGAR carries no `=`/`X` operations at all
    /// (plain `M` alignments carry no match/mismatch signal).
    fn match_fraction(&self) -> Option<f64>;
    /// Offset into the read sequence covering the given 1-based reference
    /// position; None when the position is not covered by an aligned base.
    fn offset_at(&self, position: Position) -> Option<usize>;
    fn base(&self, offset: usize) -> u8;
    fn base_qual(&self, offset: usize) -> u8;
    fn mapq(&self) -> u8;
    /// 1-based position of the first aligned base.
    fn alignment_start(&self) -> Position;
    /// 1-based position of the last aligned base.
    fn alignment_end(&self) -> Position;
}

#[cfg(test)]
mock! {
    pub Read {}

    impl PileRead for Read {
        fn id(&self) -> ReadId;
        fn is_duplicate(&self) -> bool;
        fn is_mate_unmapped(&self) -> bool;
        fn is_clipped(&self) -> bool;
        fn match_fraction(&self) -> Option<f64>;
        fn offset_at(&self, position: Position) -> Option<usize>;
        fn base(&self, offset: usize) -> u8;
        fn base_qual(&self, offset: usize) -> u8;
        fn mapq(&self) -> u8;
        fn alignment_start(&self) -> Position;
        fn alignment_end(&self) -> Position;
    }
}

impl PileRead for Record {
    #[inline]
    fn id(&self) -> ReadId {
        read_id(self.qname(), self.is_first_in_template())
    }

    #[inline]
    fn is_duplicate(&self) -> bool {
        Record::is_duplicate(self)
    }

    #[inline]
    fn is_mate_unmapped(&self) -> bool {
        Record::is_mate_unmapped(self)
    }

    fn is_clipped(&self) -> bool {
        self.cigar().iter().any(|op| matches!(*op, Cigar::SoftClip(_) | Cigar::HardClip(_)))
    }

    fn match_fraction(&self) -> Option<f64> {
        let mut explicit = false;
        let mut matched = 0u32;
        for op in self.cigar().iter() {
            match *op {
                Cigar::Equal(len) => {
                    explicit = true;
                    matched += len;
                }
                Cigar::Diff(_) => explicit = true,
                _ => {}
            }
        }
        match explicit {
            true => Some(f64::from(matched) / self.seq_len() as f64),
            false => None,
        }
    }

    fn offset_at(&self, position: Position) -> Option<usize> {
        debug_assert!(position > 0);
        self.cigar().read_pos(position as u32 - 1, false, false).ok().flatten().map(|x| x as usize)
    }

    #[inline]
    fn base(&self, offset: usize) -> u8 {
        self.seq().as_bytes()[offset]
    }

    #[inline]
    fn base_qual(&self, offset: usize) -> u8 {
        self.qual()[offset]
    }

    #[inline]
    fn mapq(&self) -> u8 {
        Record::mapq(self)
    }

    #[inline]
    fn alignment_start(&self) -> Position {
        (self.pos() + 1) as Position
    }

    #[inline]
    fn alignment_end(&self) -> Position {
        // end_pos is 0-based exclusive, i.e. exactly the 1-based inclusive end
        self.cigar().end_pos() as Position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_id_is_stable_and_pair_aware() {
        assert_eq!(read_id(b"read-1", true), read_id(b"read-1", true));
        assert_ne!(read_id(b"read-1", true), read_id(b"read-1", false));
        assert_ne!(read_id(b"read-1", true), read_id(b"read-2", true));
    }
}
