use anyhow::Result;
use clap::ArgMatches;
use log::info;

use crate::core::candidates::CandidateParser;
use crate::core::classify::Classifier;
use crate::core::evaluate::{BamSample, Evaluator};
use crate::core::pileup::{HtsReadSource, PileupCache};
use crate::core::run;

pub mod args;
pub mod parse;
mod validate;

pub fn run(matches: &ArgMatches) -> Result<()> {
    let config = parse::config(matches);
    let classifier = Classifier::new(config);

    let child = parse::child(matches);
    let parents = parse::parents(matches);
    let output = parse::output(matches);

    // one haplotype window must stay resident per cache
    let capacity = config.haplotype_search_distance as usize * 2 + 1;
    let cache = |bam| PileupCache::new(HtsReadSource::new(bam), capacity);

    let parser = CandidateParser::new(
        parse::vcf(matches),
        child.id.clone(),
        parents.as_ref().map(|(p1, p2)| (p1.id.clone(), p2.id.clone())),
        &config,
    );

    let child = BamSample::new(child.id, cache(child.bam));
    let parents = parents.map(|(p1, p2)| (BamSample::new(p1.id, cache(p1.bam)), BamSample::new(p2.id, cache(p2.bam))));
    match &parents {
        Some(_) => info!("Evaluating trio for de novo variants"),
        None => info!("Evaluating single sample for de novo variants"),
    }
    let evaluator = Evaluator::new(classifier, child, parents);

    let annotator = parse::annotator(matches).build();
    run::run(evaluator, parser, annotator.as_ref(), &output)
}
