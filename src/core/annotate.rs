use std::path::PathBuf;

use anyhow::Result;
use log::info;

use crate::core::result::DeNovoResult;

/// Functional annotation is an external collaborator: given the final
/// result list it fills `snpeff_gene`/`snpeff_impact` and produces the
/// annotated VCF next to the main output. The core only defines the
/// contract.
pub trait Annotator: Sync {
    fn annotate(&self, results: &mut [DeNovoResult]) -> Result<()>;
}

/// Used when no annotator is configured: results keep empty annotation
/// fields and the summary omits gene/impact categories.
pub struct NoopAnnotator;

impl Annotator for NoopAnnotator {
    fn annotate(&self, results: &mut [DeNovoResult]) -> Result<()> {
        info!("No annotator configured; leaving {} results unannotated", results.len());
        Ok(())
    }
}

/// Paths handed through to the external SnpEff/Annovar step.
#[derive(Clone, Debug, Default)]
pub struct AnnotatorConfig {
    pub snpeff_jar: Option<PathBuf>,
    pub annovar_dir: Option<PathBuf>,
    pub genome: Option<String>,
}

impl AnnotatorConfig {
    pub fn build(self) -> Box<dyn Annotator> {
        if self.snpeff_jar.is_some() || self.annovar_dir.is_some() {
            info!(
                "Functional annotation is delegated to the external SnpEff/Annovar step (genome: {})",
                self.genome.as_deref().unwrap_or("unspecified")
            );
        }
        Box::new(NoopAnnotator)
    }
}
