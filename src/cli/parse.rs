use std::path::PathBuf;

use clap::ArgMatches;

use crate::core::annotate::AnnotatorConfig;
use crate::core::classify::Config;

use super::args;

pub struct SampleArgs {
    pub bam: PathBuf,
    pub id: String,
}

pub fn threads(matches: &ArgMatches) -> usize {
    matches.value_of(args::core::THREADS).unwrap().parse().unwrap()
}

pub fn vcf(matches: &ArgMatches) -> PathBuf {
    PathBuf::from(matches.value_of(args::core::VCF).unwrap())
}

pub fn output(matches: &ArgMatches) -> PathBuf {
    PathBuf::from(matches.value_of(args::core::OUTPUT).unwrap())
}

pub fn child(matches: &ArgMatches) -> SampleArgs {
    SampleArgs {
        bam: PathBuf::from(matches.value_of(args::core::CHILD_BAM).unwrap()),
        id: matches.value_of(args::core::CHILD_ID).unwrap().to_string(),
    }
}

/// Parents for a trio run, None for --solo. Anything in between is refused.
pub fn parents(matches: &ArgMatches) -> Option<(SampleArgs, SampleArgs)> {
    let solo = matches.is_present(args::core::SOLO);
    let parental = [
        args::core::PARENT1_BAM,
        args::core::PARENT1_ID,
        args::core::PARENT2_BAM,
        args::core::PARENT2_ID,
    ];
    let provided = parental.iter().filter(|name| matches.is_present(name)).count();
    match (solo, provided) {
        (true, 0) => None,
        (false, 4) => Some((
            SampleArgs {
                bam: PathBuf::from(matches.value_of(args::core::PARENT1_BAM).unwrap()),
                id: matches.value_of(args::core::PARENT1_ID).unwrap().to_string(),
            },
            SampleArgs {
                bam: PathBuf::from(matches.value_of(args::core::PARENT2_BAM).unwrap()),
                id: matches.value_of(args::core::PARENT2_ID).unwrap().to_string(),
            },
        )),
        _ => panic!(
            "Provide either --{} or all of --{}/--{}/--{}/--{}",
            args::core::SOLO,
            args::core::PARENT1_BAM,
            args::core::PARENT1_ID,
            args::core::PARENT2_BAM,
            args::core::PARENT2_ID
        ),
    }
}

pub fn config(matches: &ArgMatches) -> Config {
    let numeric = |name: &str| matches.value_of(name).unwrap().parse().unwrap();
    Config {
        min_depth: numeric(args::thresholds::MIN_DEPTH),
        min_allelic_depth: numeric(args::thresholds::MIN_ALLELIC_DEPTH),
        min_allelic_frac: numeric(args::thresholds::MIN_ALLELIC_FRAC),
        max_miscall_frac: numeric(args::thresholds::MAX_MISCALL_FRAC),
        max_miscall_weight: numeric(args::thresholds::MAX_MISCALL_WEIGHT),
        vcf_max_parent_ad: matches.value_of(args::thresholds::VCF_MAX_PARENT_AD).unwrap().parse().unwrap(),
        min_parental_depth: numeric(args::thresholds::MIN_PARENTAL_DEPTH),
        min_other_dn_allelic_depth: numeric(args::thresholds::MIN_OTHER_DN_ALLELIC_DEPTH),
        min_other_dn_allelic_depth_independent: numeric(args::thresholds::MIN_OTHER_DN_ALLELIC_DEPTH_INDEPENDENT),
        min_haplotype_concordance: numeric(args::thresholds::MIN_HAPLOTYPE_CONCORDANCE),
        haplotype_search_distance: matches
            .value_of(args::thresholds::HAPLOTYPE_SEARCH_DISTANCE)
            .unwrap()
            .parse()
            .unwrap(),
    }
}

pub fn annotator(matches: &ArgMatches) -> AnnotatorConfig {
    AnnotatorConfig {
        snpeff_jar: matches.value_of(args::core::SNPEFF).map(PathBuf::from),
        annovar_dir: matches.value_of(args::core::ANNOVAR_DIR).map(PathBuf::from),
        genome: matches.value_of(args::core::GENOME).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use clap::App;

    use super::*;

    fn matches(argv: &[&str]) -> ArgMatches {
        App::new("test").args(args::all()).get_matches_from(argv.iter().copied())
    }

    const REQUIRED: &[&str] = &[
        "test",
        "--vcf",
        "Cargo.toml",
        "--childBam",
        "Cargo.toml",
        "--childID",
        "CHILD",
        "--output",
        "out.tsv",
        "--solo",
    ];

    #[test]
    fn defaults_match_the_documented_thresholds() {
        let matches = matches(REQUIRED);
        let config = config(&matches);

        assert_eq!(config.min_depth, 10.0);
        assert_eq!(config.min_allelic_depth, 4.0);
        assert_eq!(config.min_allelic_frac, 0.1);
        assert_eq!(config.max_miscall_frac, 0.05);
        assert_eq!(config.max_miscall_weight, 1.0);
        assert_eq!(config.vcf_max_parent_ad, 4);
        assert_eq!(config.min_parental_depth, 10.0);
        assert_eq!(config.min_other_dn_allelic_depth, 1.5);
        assert_eq!(config.min_other_dn_allelic_depth_independent, 3.0);
        assert_eq!(config.min_haplotype_concordance, 0.75);
        assert_eq!(config.haplotype_search_distance, 150);
    }

    #[test]
    fn solo_mode_has_no_parents() {
        let matches = matches(REQUIRED);
        assert!(parents(&matches).is_none());
        assert_eq!(child(&matches).id, "CHILD");
    }

    #[test]
    #[should_panic(expected = "--solo")]
    fn missing_parents_without_solo_is_refused() {
        let argv: Vec<&str> = REQUIRED.iter().copied().filter(|arg| *arg != "--solo").collect();
        let matches = matches(&argv);
        parents(&matches);
    }
}
