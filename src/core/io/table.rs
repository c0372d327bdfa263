use std::collections::HashMap;
use std::io::{self, Write};

use itertools::Itertools;

use crate::core::result::{DeNovoResult, Sample};

const MISSING: &str = ".";

const POS_FIELDS: &[&str] = &["contig", "position", "ref", "alt"];
const HAP_FIELDS: &[&str] = &[
    "other_variants",
    "other_triallelics",
    "other_biallelics",
    "adjacent_de_novos",
    "other_de_novos",
    "concordances",
];
const CALL_FIELDS: &[&str] = &["super_novo", "de_novo_allele", "dn_is_ref", "snpeff_gene", "snpeff_impact"];
const SAMPLE_FIELDS: &[&str] = &[
    "id",
    "weighted_depth",
    "a1_weighted_depth",
    "a2_weighted_depth",
    "a1_raw_depth",
    "a2_raw_depth",
    "weighted_minor_allele_fraction",
    "a1_clipped_reads",
    "a2_clipped_reads",
    "a1_apparent_mismap_reads",
    "a2_apparent_mismap_reads",
    "a1_unmapped_mate_reads",
    "a2_unmapped_mate_reads",
    "a1_end_of_read_reads",
    "a2_end_of_read_reads",
];

fn sample_prefixes(trio: bool) -> &'static [&'static str] {
    match trio {
        true => &["child", "parent1", "parent2"],
        false => &["child"],
    }
}

/// Tab-delimited result table. Nested records flatten to `<outer>_<inner>`
/// columns; absent optional values render as `.`.
pub fn write_results<W: Write>(saveto: W, results: &[DeNovoResult], trio: bool) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(saveto);
    writer.write_record(header(trio))?;
    for result in results {
        writer.write_record(row(result, trio))?;
    }
    writer.flush()?;
    Ok(())
}

fn header(trio: bool) -> Vec<String> {
    let mut columns = Vec::new();
    columns.extend(POS_FIELDS.iter().map(|field| format!("pos_{}", field)));
    columns.extend(HAP_FIELDS.iter().map(|field| format!("hap_{}", field)));
    columns.extend(CALL_FIELDS.iter().map(|field| field.to_string()));
    for prefix in sample_prefixes(trio) {
        columns.extend(SAMPLE_FIELDS.iter().map(|field| format!("{}_{}", prefix, field)));
    }
    columns
}

fn row(result: &DeNovoResult, trio: bool) -> Vec<String> {
    let pos = &result.pos;
    let hap = &result.hap;

    let mut cells = vec![
        pos.contig().to_string(),
        pos.position().position().to_string(),
        pos.ref_allele().to_string(),
        match pos.alt_allele() {
            Some(allele) => allele.to_string(),
            None => MISSING.to_string(),
        },
        hap.other_variants.to_string(),
        hap.other_triallelics.to_string(),
        hap.other_biallelics.to_string(),
        hap.adjacent_de_novos.to_string(),
        hap.other_de_novos.to_string(),
        match hap.concordances.is_empty() {
            true => MISSING.to_string(),
            false => hap.concordances.iter().map(|conc| format!("{:.4}", conc)).join(","),
        },
        result.super_novo.to_string(),
        result.de_novo_allele.map_or(MISSING.to_string(), |allele| allele.to_string()),
        result.dn_is_ref.map_or(MISSING.to_string(), |is_ref| is_ref.to_string()),
        result.snpeff_gene.clone().unwrap_or_else(|| MISSING.to_string()),
        result.snpeff_impact.clone().unwrap_or_else(|| MISSING.to_string()),
    ];
    for index in 0..sample_prefixes(trio).len() {
        match result.samples.get(index) {
            Some(sample) => cells.extend(sample_cells(sample)),
            None => cells.extend(std::iter::repeat(MISSING.to_string()).take(SAMPLE_FIELDS.len())),
        }
    }
    cells
}

fn sample_cells(sample: &Sample) -> Vec<String> {
    vec![
        sample.id.clone(),
        format!("{:.4}", sample.weighted_depth),
        format!("{:.4}", sample.a1_weighted_depth),
        format!("{:.4}", sample.a2_weighted_depth),
        sample.a1_raw_depth.to_string(),
        sample.a2_raw_depth.to_string(),
        format!("{:.4}", sample.weighted_minor_allele_fraction),
        sample.a1_clipped_reads.to_string(),
        sample.a2_clipped_reads.to_string(),
        sample.a1_apparent_mismap_reads.to_string(),
        sample.a2_apparent_mismap_reads.to_string(),
        sample.a1_unmapped_mate_reads.to_string(),
        sample.a2_unmapped_mate_reads.to_string(),
        sample.a1_end_of_read_reads.to_string(),
        sample.a2_end_of_read_reads.to_string(),
    ]
}

/// `key<TAB>count` summary over supernovo-flagged results, in first-seen
/// order. Annotation categories appear only when annotations are present.
pub fn write_summary<W: Write>(mut saveto: W, results: &[DeNovoResult]) -> io::Result<()> {
    let mut counts = OrderedCounts::default();
    for result in results.iter().filter(|result| result.super_novo) {
        counts.add("supernovo".to_string());
        if let Some(gene) = &result.snpeff_gene {
            counts.add(format!("{}_AnyImpact", gene));
        }
        if let Some(impact) = &result.snpeff_impact {
            counts.add(impact.clone());
            if impact == "MODERATE" || impact == "HIGH" {
                counts.add("supernovo_damaging".to_string());
                if let Some(gene) = &result.snpeff_gene {
                    counts.add(gene.clone());
                }
                if !result.dn_is_ref.unwrap_or(false) {
                    counts.add("supernovo_damaging_nonref".to_string());
                }
            }
        }
    }
    for (key, count) in counts.entries {
        writeln!(saveto, "{}\t{}", key, count)?;
    }
    Ok(())
}

#[derive(Default)]
struct OrderedCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl OrderedCounts {
    fn add(&mut self, key: String) {
        match self.index.get(&key) {
            Some(&at) => self.entries[at].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::allele::PileAllele;
    use crate::core::dna::Nucleotide;
    use crate::core::genome::{GenomePosition, ReferencePosition};
    use crate::core::result::HaplotypeResult;

    use super::*;

    fn sample(id: &str) -> Sample {
        Sample {
            id: id.to_string(),
            weighted_depth: 39.96,
            a1_weighted_depth: 19.98,
            a2_weighted_depth: 19.98,
            a1_raw_depth: 20,
            a2_raw_depth: 20,
            weighted_minor_allele_fraction: 0.5,
            a1_clipped_reads: 0,
            a2_clipped_reads: 1,
            a1_apparent_mismap_reads: 0,
            a2_apparent_mismap_reads: 0,
            a1_unmapped_mate_reads: 0,
            a2_unmapped_mate_reads: 2,
            a1_end_of_read_reads: 3,
            a2_end_of_read_reads: 0,
        }
    }

    fn solo_result() -> DeNovoResult {
        DeNovoResult {
            pos: ReferencePosition::try_new(GenomePosition::new("chr1", 1000), b"A", Some(b"G"))
                .unwrap(),
            hap: HaplotypeResult {
                other_variants: 2,
                other_triallelics: 1,
                other_biallelics: 1,
                adjacent_de_novos: 0,
                other_de_novos: 0,
                concordances: vec![1.0, 0.75],
            },
            de_novo_allele: Some(PileAllele::Snp(Nucleotide::G)),
            dn_is_ref: Some(false),
            super_novo: true,
            snpeff_gene: None,
            snpeff_impact: None,
            samples: vec![sample("CHILD")],
        }
    }

    #[test]
    fn solo_table_layout() {
        let mut saveto = Vec::new();
        write_results(&mut saveto, &[solo_result()], false).unwrap();
        let table = String::from_utf8(saveto).unwrap();

        let expected = "pos_contig\tpos_position\tpos_ref\tpos_alt\t\
                        hap_other_variants\thap_other_triallelics\thap_other_biallelics\t\
                        hap_adjacent_de_novos\thap_other_de_novos\thap_concordances\t\
                        super_novo\tde_novo_allele\tdn_is_ref\tsnpeff_gene\tsnpeff_impact\t\
                        child_id\tchild_weighted_depth\tchild_a1_weighted_depth\tchild_a2_weighted_depth\t\
                        child_a1_raw_depth\tchild_a2_raw_depth\tchild_weighted_minor_allele_fraction\t\
                        child_a1_clipped_reads\tchild_a2_clipped_reads\t\
                        child_a1_apparent_mismap_reads\tchild_a2_apparent_mismap_reads\t\
                        child_a1_unmapped_mate_reads\tchild_a2_unmapped_mate_reads\t\
                        child_a1_end_of_read_reads\tchild_a2_end_of_read_reads\n\
                        chr1\t1000\tA\tG\t\
                        2\t1\t1\t0\t0\t1.0000,0.7500\t\
                        true\tG\tfalse\t.\t.\t\
                        CHILD\t39.9600\t19.9800\t19.9800\t20\t20\t0.5000\t\
                        0\t1\t0\t0\t0\t2\t3\t0\n";
        assert_eq!(table, expected);
    }

    #[test]
    fn trio_table_has_three_sample_groups() {
        let mut result = solo_result();
        result.samples.push(sample("MOTHER"));
        result.samples.push(sample("FATHER"));

        let mut saveto = Vec::new();
        write_results(&mut saveto, &[result], true).unwrap();
        let table = String::from_utf8(saveto).unwrap();

        let header = table.lines().next().unwrap();
        assert!(header.contains("parent1_id"));
        assert!(header.contains("parent2_a2_end_of_read_reads"));
        assert_eq!(header.split('\t').count(), 15 + 3 * SAMPLE_FIELDS.len());
    }

    #[test]
    fn summary_counts_supernovo_results() {
        let mut plain = solo_result();
        plain.snpeff_gene = Some("SCN1A".to_string());
        plain.snpeff_impact = Some("HIGH".to_string());

        let mut modifier = solo_result();
        modifier.snpeff_gene = Some("TTN".to_string());
        modifier.snpeff_impact = Some("MODIFIER".to_string());

        let mut rejected = solo_result();
        rejected.super_novo = false;

        let mut saveto = Vec::new();
        write_summary(&mut saveto, &[plain, modifier, rejected]).unwrap();
        let summary = String::from_utf8(saveto).unwrap();

        let expected = "supernovo\t2\n\
                        SCN1A_AnyImpact\t1\n\
                        HIGH\t1\n\
                        supernovo_damaging\t1\n\
                        SCN1A\t1\n\
                        supernovo_damaging_nonref\t1\n\
                        TTN_AnyImpact\t1\n\
                        MODIFIER\t1\n";
        assert_eq!(summary, expected);
    }

    #[test]
    fn unannotated_summary_is_counts_only() {
        let mut saveto = Vec::new();
        write_summary(&mut saveto, &[solo_result(), solo_result()]).unwrap();
        assert_eq!(String::from_utf8(saveto).unwrap(), "supernovo\t2\n");
    }
}
