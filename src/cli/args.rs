use clap::Arg;

use super::validate;

pub mod core {
    use super::*;

    pub const VCF: &str = "vcf";
    pub const CHILD_BAM: &str = "childBam";
    pub const CHILD_ID: &str = "childID";
    pub const PARENT1_BAM: &str = "parent1Bam";
    pub const PARENT1_ID: &str = "parent1ID";
    pub const PARENT2_BAM: &str = "parent2Bam";
    pub const PARENT2_ID: &str = "parent2ID";
    pub const SOLO: &str = "solo";
    pub const OUTPUT: &str = "output";
    pub const GENOME: &str = "genome";
    pub const SNPEFF: &str = "snpEff";
    pub const ANNOVAR_DIR: &str = "annovarDir";
    pub const THREADS: &str = "threads";

    pub const SECTION_NAME: &str = "Core";

    pub fn args() -> Vec<Arg<'static>> {
        let args = vec![
            Arg::new(VCF)
                .short('v')
                .long(VCF)
                .required(true)
                .takes_value(true)
                .validator(validate::path)
                .long_help("Indexed VCF/gVCF with candidate variants to query."),
            Arg::new(CHILD_BAM)
                .long(CHILD_BAM)
                .required(true)
                .takes_value(true)
                .validator(validate::path)
                .long_help("Indexed BAM/CRAM of the child."),
            Arg::new(CHILD_ID)
                .long(CHILD_ID)
                .required(true)
                .takes_value(true)
                .long_help("Sample ID of the child; must match a VCF sample column."),
            Arg::new(PARENT1_BAM)
                .long(PARENT1_BAM)
                .takes_value(true)
                .validator(validate::path)
                .conflicts_with(SOLO)
                .requires_all(&[PARENT1_ID, PARENT2_BAM, PARENT2_ID])
                .long_help("Indexed BAM/CRAM of parent 1 (trio mode)."),
            Arg::new(PARENT1_ID)
                .long(PARENT1_ID)
                .takes_value(true)
                .conflicts_with(SOLO)
                .long_help("Sample ID of parent 1; must match a VCF sample column."),
            Arg::new(PARENT2_BAM)
                .long(PARENT2_BAM)
                .takes_value(true)
                .validator(validate::path)
                .conflicts_with(SOLO)
                .long_help("Indexed BAM/CRAM of parent 2 (trio mode)."),
            Arg::new(PARENT2_ID)
                .long(PARENT2_ID)
                .takes_value(true)
                .conflicts_with(SOLO)
                .long_help("Sample ID of parent 2; must match a VCF sample column."),
            Arg::new(SOLO)
                .short('1')
                .long(SOLO)
                .takes_value(false)
                .long_help(
                    "Run the analysis on a single sample; otherwise parental information \
                    must be provided for a trio analysis.",
                ),
            Arg::new(OUTPUT)
                .short('o')
                .long(OUTPUT)
                .required(true)
                .takes_value(true)
                .long_help("Output file for parsed de novo variants."),
            Arg::new(GENOME)
                .long(GENOME)
                .takes_value(true)
                .long_help("Genome build argument passed through to snpEff/annovar."),
            Arg::new(SNPEFF)
                .short('s')
                .long(SNPEFF)
                .takes_value(true)
                .validator(validate::path)
                .long_help("Path to the snpEff jar."),
            Arg::new(ANNOVAR_DIR)
                .short('a')
                .long(ANNOVAR_DIR)
                .takes_value(true)
                .validator(validate::path)
                .long_help("Directory where annovar is located."),
            Arg::new(THREADS)
                .short('t')
                .long(THREADS)
                .takes_value(true)
                .validator(validate::numeric(1usize, usize::MAX))
                .default_value("1")
                .long_help("Maximum number of worker threads to spawn at once."),
        ];
        args.into_iter().map(|arg| arg.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub mod thresholds {
    use super::*;

    pub const VCF_MAX_PARENT_AD: &str = "vcfMaxParentAD";
    pub const MIN_DEPTH: &str = "minDepth";
    pub const MIN_ALLELIC_DEPTH: &str = "minAllelicDepth";
    pub const MIN_ALLELIC_FRAC: &str = "minAllelicFrac";
    pub const MIN_PARENTAL_DEPTH: &str = "minParentalDepth";
    pub const MIN_OTHER_DN_ALLELIC_DEPTH: &str = "minOtherDNAllelicDepth";
    pub const MIN_OTHER_DN_ALLELIC_DEPTH_INDEPENDENT: &str = "minOtherDNAllelicDepthIndependent";
    pub const MAX_MISCALL_FRAC: &str = "maxMiscallFrac";
    pub const MAX_MISCALL_WEIGHT: &str = "maxMiscallWeight";
    pub const MIN_HAPLOTYPE_CONCORDANCE: &str = "minHaplotypeConcordance";
    pub const HAPLOTYPE_SEARCH_DISTANCE: &str = "haplotypeSearchDistance";

    pub const SECTION_NAME: &str = "Thresholds";

    pub fn args() -> Vec<Arg<'static>> {
        let args = vec![
            Arg::new(VCF_MAX_PARENT_AD)
                .long(VCF_MAX_PARENT_AD)
                .takes_value(true)
                .validator(validate::numeric(0i32, i32::MAX))
                .default_value("4")
                .long_help(
                    "Maximum AD (allelic depth) value from the VCF for the de novo allele in \
                    a parent. Variants with parental AD above this value are assumed inherited.",
                ),
            Arg::new(MIN_DEPTH)
                .long(MIN_DEPTH)
                .takes_value(true)
                .validator(validate::numeric(0f64, f64::MAX))
                .default_value("10")
                .long_help("Minimum weighted biallelic depth to consider calling a variant."),
            Arg::new(MIN_ALLELIC_DEPTH)
                .long(MIN_ALLELIC_DEPTH)
                .takes_value(true)
                .validator(validate::numeric(0f64, f64::MAX))
                .default_value("4")
                .long_help("Minimum raw depth of both biallelic alleles to consider calling a variant."),
            Arg::new(MIN_ALLELIC_FRAC)
                .long(MIN_ALLELIC_FRAC)
                .takes_value(true)
                .validator(validate::numeric(0f64, 1f64))
                .default_value("0.1")
                .long_help("Minimum weighted minor-allele fraction to consider calling a variant."),
            Arg::new(MAX_MISCALL_FRAC)
                .long(MAX_MISCALL_FRAC)
                .takes_value(true)
                .validator(validate::numeric(0f64, 1f64))
                .default_value("0.05")
                .long_help(
                    "Maximum parental allelic fraction treated as miscalled bases. Variants whose \
                    de novo allele exceeds this fraction in a parent are assumed inherited.",
                ),
            Arg::new(MAX_MISCALL_WEIGHT)
                .long(MAX_MISCALL_WEIGHT)
                .takes_value(true)
                .validator(validate::numeric(0f64, f64::MAX))
                .default_value("1.0")
                .long_help(
                    "Maximum parental depth treated as miscalled bases. Variants whose de novo \
                    allele exceeds this depth in a parent are assumed inherited.",
                ),
            Arg::new(MIN_PARENTAL_DEPTH)
                .long(MIN_PARENTAL_DEPTH)
                .takes_value(true)
                .validator(validate::numeric(0f64, f64::MAX))
                .default_value("10")
                .long_help("Minimum parental weighted depth to consider a de novo variant supernovo."),
            Arg::new(MIN_OTHER_DN_ALLELIC_DEPTH)
                .long(MIN_OTHER_DN_ALLELIC_DEPTH)
                .takes_value(true)
                .validator(validate::numeric(0f64, f64::MAX))
                .default_value("1.5")
                .long_help("Minimum allelic depth to count a local variant in the other-DNs-in-region count."),
            Arg::new(MIN_OTHER_DN_ALLELIC_DEPTH_INDEPENDENT)
                .long(MIN_OTHER_DN_ALLELIC_DEPTH_INDEPENDENT)
                .takes_value(true)
                .validator(validate::numeric(0f64, f64::MAX))
                .default_value("3.0")
                .long_help(
                    "Minimum allelic depth to count a local variant in the other-DNs-in-region \
                    count when it fails minAllelicFrac.",
                ),
            Arg::new(MIN_HAPLOTYPE_CONCORDANCE)
                .long(MIN_HAPLOTYPE_CONCORDANCE)
                .takes_value(true)
                .validator(validate::numeric(0f64, 1f64))
                .default_value("0.75")
                .long_help(
                    "Minimum concordance with inherited variant haplotypes in the region. \
                    Concordance is the ratio of allele calls of local variants concordant with \
                    the most likely haplotype of the de novo variant to all calls for local \
                    variants on overlapping reads.",
                ),
            Arg::new(HAPLOTYPE_SEARCH_DISTANCE)
                .long(HAPLOTYPE_SEARCH_DISTANCE)
                .takes_value(true)
                .validator(validate::numeric(1u64, u64::MAX))
                .default_value("150")
                .long_help(
                    "Distance to search up and down stream for variants on reads that overlap a \
                    potential de novo variant. Typically the read length, or greater for a more \
                    exhaustive search.",
                ),
        ];
        args.into_iter().map(|arg| arg.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub fn all() -> Vec<Arg<'static>> {
    core::args().into_iter().chain(thresholds::args().into_iter()).collect()
}
