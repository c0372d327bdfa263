use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use log::{error, info};
use rayon::prelude::*;

use crate::core::annotate::Annotator;
use crate::core::candidates::CandidateParser;
use crate::core::evaluate::Evaluator;
use crate::core::genome::ContigRank;
use crate::core::io::snapshot::{self, Results};
use crate::core::io::table;
use crate::core::pileup::ReadSource;
use crate::core::result::DeNovoResult;

const SER_EXTENSION: &str = ".SuperNovoResultList.ser.gz";
const VCF_EXTENSION: &str = ".DeNovoResults.vcf.gz";
const SUMMARY_EXTENSION: &str = ".summary.txt";

const CHECKPOINT_EVERY: Duration = Duration::from_secs(600);
const CHECKPOINT_TICK: Duration = Duration::from_secs(1);

/// All artifact locations derived from the main output path.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputPaths {
    pub table: PathBuf,
    pub summary: PathBuf,
    pub annotated_vcf: PathBuf,
    pub snapshot: PathBuf,
    pub checkpoint: PathBuf,
}

impl OutputPaths {
    pub fn new(output: &Path) -> Self {
        let stem = output.with_extension("");
        let stemmed = |extension: &str| PathBuf::from(format!("{}{}", stem.display(), extension));
        Self {
            table: output.to_path_buf(),
            summary: PathBuf::from(format!("{}{}", output.display(), SUMMARY_EXTENSION)),
            annotated_vcf: stemmed(VCF_EXTENSION),
            snapshot: stemmed(SER_EXTENSION),
            checkpoint: PathBuf::from(format!("{}{}_CHUNKED", stem.display(), SER_EXTENSION)),
        }
    }
}

/// The staged, resumable pipeline: load prior results, parse candidates,
/// evaluate the remainder in parallel under a periodic checkpointer, then
/// annotate and write every output.
pub fn run<S: ReadSource>(
    evaluator: Evaluator<S>,
    parser: CandidateParser,
    annotator: &dyn Annotator,
    output: &Path,
) -> Result<()> {
    let paths = OutputPaths::new(output);
    let previous = load_previous(&paths);

    let started = Instant::now();
    let candidates = parser.parse()?;
    info!("Parsed variants in {} seconds", started.elapsed().as_secs());

    let mut results = previous;
    if !results.is_empty() {
        let prior = results.len();
        results.retain(|position, _| candidates.contains(position));
        info!(
            "Dropped {} results (of {} total) from previously computed that are no longer retained from vcf",
            prior - results.len(),
            prior
        );
        info!("{} variants previously evaluated", results.len());
    }
    let remaining: Vec<_> =
        candidates.iter().filter(|position| !results.contains_key(*position)).cloned().collect();
    info!("Evaluating {} variants for de novo mutations", remaining.len());

    let results = Arc::new(Mutex::new(results));
    let finished = Arc::new(AtomicBool::new(false));
    let checkpointer = spawn_checkpointer(paths.checkpoint.clone(), results.clone(), finished.clone());

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} {msg}")
        .progress_chars("##-")
        .on_finish(ProgressFinish::AndLeave);
    let pbar = ProgressBar::new(remaining.len() as u64).with_style(style);

    remaining.into_par_iter().for_each(|position| {
        let result = evaluator.evaluate(&position);
        results.lock().unwrap().insert(position, result);
        pbar.inc(1);
    });
    pbar.finish_with_message("Finished");

    finished.store(true, Ordering::SeqCst);
    checkpointer.join().expect("checkpointer thread panicked");

    let results = Arc::try_unwrap(results).expect("evaluation workers still alive").into_inner().unwrap();
    info!("Finished evaluating {} variants for de novo mutations", results.len());
    snapshot::write(&paths.snapshot, &results)
        .with_context(|| format!("failed to write snapshot {}", paths.snapshot.display()))?;

    let ranks = ContigRank::new(parser.contigs()?.into_iter().map(|(contig, _)| contig));
    let mut emitted: Vec<DeNovoResult> = results.into_values().flatten().collect();
    emitted.sort_by_key(|result| ranks.key(result.pos.position()));

    annotator.annotate(&mut emitted)?;

    let trio = evaluator.is_trio();
    let saveto = BufWriter::new(
        File::create(&paths.table)
            .with_context(|| format!("failed to create output {}", paths.table.display()))?,
    );
    table::write_results(saveto, &emitted, trio)
        .with_context(|| format!("failed to write output {}", paths.table.display()))?;

    let summary = BufWriter::new(
        File::create(&paths.summary)
            .with_context(|| format!("failed to create summary {}", paths.summary.display()))?,
    );
    table::write_summary(summary, &emitted)
        .with_context(|| format!("failed to write summary {}", paths.summary.display()))?;

    info!("Wrote {} results to {}", emitted.len(), paths.table.display());
    Ok(())
}

/// A prior final snapshot wins over a chunked checkpoint; unreadable
/// snapshots are ignored and computation restarts from scratch.
fn load_previous(paths: &OutputPaths) -> Results {
    for path in [&paths.snapshot, &paths.checkpoint] {
        if !path.exists() {
            continue;
        }
        info!("Previous serialized output already exists, loading {}...", path.display());
        match snapshot::read(path) {
            Ok(results) => {
                info!("Serialized output loaded: {} previously evaluated variants", results.len());
                return results;
            }
            Err(cause) => error!("Error loading serialized results, regenerating: {:#}", cause),
        }
    }
    Results::new()
}

/// Ticks while evaluation runs; rewrites the chunked snapshot whenever ten
/// minutes have passed since the last one. A failed rewrite is logged and
/// retried at the next tick.
fn spawn_checkpointer(
    path: PathBuf,
    results: Arc<Mutex<Results>>,
    finished: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last = Instant::now();
        while !finished.load(Ordering::SeqCst) {
            if last.elapsed() > CHECKPOINT_EVERY {
                let current = results.lock().unwrap().clone();
                if let Err(cause) = snapshot::checkpoint(&path, &current) {
                    error!("Failed to overwrite chunked output, chunking may not be reloadable: {:#}", cause);
                }
                last = Instant::now();
            }
            thread::sleep(CHECKPOINT_TICK);
        }
    })
}
