use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use bio_types::genome::Position;
use log::warn;
use rust_htslib::bam::{IndexedReader, Read as BamRead, Record};
use thread_local::ThreadLocal;

use crate::core::genome::GenomePosition;
use crate::core::read::PileRead;

use super::{Pileup, PileupBuilder};

/// Supplier of reads overlapping a genomic window. The HTS implementation
/// keeps one indexed reader per worker thread; tests substitute synthetic
/// sources.
pub trait ReadSource: Sync {
    type Read: PileRead;

    /// All reads overlapping the 1-based inclusive window on `contig`.
    fn fetch(&self, contig: &str, start: Position, stop: Position) -> Vec<Self::Read>;
}

pub struct HtsReadSource {
    bam: PathBuf,
    readers: ThreadLocal<RefCell<IndexedReader>>,
}

impl HtsReadSource {
    pub fn new(bam: PathBuf) -> Self {
        Self { bam, readers: ThreadLocal::new() }
    }

    fn reader(&self) -> &RefCell<IndexedReader> {
        self.readers.get_or(|| {
            let reader = IndexedReader::from_path(&self.bam).unwrap_or_else(|_| {
                panic!(
                    "Failed to open file {}\n\
                    Possible reasons: BAM file was not indexed (samtools index); you don't have read permissions",
                    self.bam.display()
                )
            });
            RefCell::new(reader)
        })
    }
}

impl ReadSource for HtsReadSource {
    type Read = Record;

    fn fetch(&self, contig: &str, start: Position, stop: Position) -> Vec<Record> {
        let mut reader = self.reader().borrow_mut();
        // No such contig in the BAM file
        if !reader.header().target_names().contains(&contig.as_bytes()) {
            return vec![];
        }
        reader.fetch((contig, start as i64 - 1, stop as i64)).unwrap_or_else(|_| {
            panic!("Failed to fetch reads for {}:{}-{} (HTS file corrupted?)", contig, start, stop)
        });

        let mut reads = Vec::new();
        let mut record = Record::new();
        while let Some(outcome) = reader.read(&mut record) {
            match outcome {
                Ok(()) => reads.push(record.clone()),
                Err(error) => warn!("skipping malformed read in {}: {}", self.bam.display(), error),
            }
        }
        reads
    }
}

type Slot = Arc<OnceLock<Arc<Pileup>>>;

struct Slots {
    map: HashMap<GenomePosition, Slot>,
    order: VecDeque<GenomePosition>,
}

/// Bounded per-BAM memo of pileups. Concurrent `get` calls for one position
/// coalesce into a single build; published pileups are immutable and shared.
pub struct PileupCache<S: ReadSource> {
    source: S,
    capacity: usize,
    slots: Mutex<Slots>,
}

impl<S: ReadSource> PileupCache<S> {
    /// `capacity` should hold at least one full haplotype window, i.e.
    /// 2 × haplotype_search_distance + 1 entries.
    pub fn new(source: S, capacity: usize) -> Self {
        assert!(capacity > 0, "pileup cache capacity must be > 0");
        Self { source, capacity, slots: Mutex::new(Slots { map: HashMap::new(), order: VecDeque::new() }) }
    }

    pub fn get(&self, position: &GenomePosition) -> Arc<Pileup> {
        let slot = self.slot(position);
        slot.get_or_init(|| Arc::new(self.build(position))).clone()
    }

    /// Pileups for every position in the inclusive window, produced by a
    /// single overlapping-range scan. Positions already cached are reused;
    /// only the missing ones are built.
    pub fn get_range(
        &self,
        start: &GenomePosition,
        stop: &GenomePosition,
    ) -> BTreeMap<GenomePosition, Arc<Pileup>> {
        assert_eq!(start.contig(), stop.contig(), "range pileup query must stay on one contig");
        assert!(start.position() <= stop.position());

        let contig = start.contig().as_str();
        let positions: Vec<GenomePosition> =
            (*start.position()..=*stop.position()).map(|p| GenomePosition::new(contig, p)).collect();

        let slots: Vec<Slot> = {
            let mut guard = self.slots.lock().unwrap();
            let slots = positions
                .iter()
                .map(|position| match guard.map.get(position) {
                    Some(slot) => slot.clone(),
                    None => {
                        let slot: Slot = Arc::new(OnceLock::new());
                        guard.map.insert(position.clone(), slot.clone());
                        guard.order.push_back(position.clone());
                        slot
                    }
                })
                .collect();
            Self::evict(&mut guard, self.capacity);
            slots
        };

        let missing: Vec<usize> =
            slots.iter().enumerate().filter(|(_, slot)| slot.get().is_none()).map(|(i, _)| i).collect();
        if !missing.is_empty() {
            let reads = self.source.fetch(contig, *start.position(), *stop.position());
            let mut builders: BTreeMap<Position, PileupBuilder> = missing
                .iter()
                .map(|&i| (*positions[i].position(), PileupBuilder::new(positions[i].clone())))
                .collect();
            for read in &reads {
                for (_, builder) in builders.range_mut(read.alignment_start()..=read.alignment_end()) {
                    builder.add(read);
                }
            }
            for i in missing {
                let builder = builders.remove(positions[i].position()).unwrap();
                let built = Arc::new(builder.build());
                slots[i].get_or_init(move || built);
            }
        }

        positions
            .into_iter()
            .zip(slots)
            .map(|(position, slot)| {
                let pileup = slot.get_or_init(|| Arc::new(self.build(&position))).clone();
                (position, pileup)
            })
            .collect()
    }

    fn slot(&self, position: &GenomePosition) -> Slot {
        let mut guard = self.slots.lock().unwrap();
        if let Some(slot) = guard.map.get(position) {
            return slot.clone();
        }
        let slot: Slot = Arc::new(OnceLock::new());
        guard.map.insert(position.clone(), slot.clone());
        guard.order.push_back(position.clone());
        Self::evict(&mut guard, self.capacity);
        slot
    }

    /// Oldest completed entries go first; in-flight builds keep their slot
    /// so concurrent gets for the same key still coalesce.
    fn evict(slots: &mut Slots, capacity: usize) {
        let mut scanned = slots.order.len();
        while slots.map.len() > capacity && scanned > 0 {
            scanned -= 1;
            let candidate = match slots.order.pop_front() {
                Some(candidate) => candidate,
                None => break,
            };
            let filled = slots.map.get(&candidate).map_or(true, |slot| slot.get().is_some());
            if filled {
                slots.map.remove(&candidate);
            } else {
                slots.order.push_back(candidate);
            }
        }
    }

    fn build(&self, position: &GenomePosition) -> Pileup {
        let mut builder = PileupBuilder::new(position.clone());
        let reads = self.source.fetch(position.contig(), *position.position(), *position.position());
        builder.add_all(&reads);
        builder.build()
    }
}
