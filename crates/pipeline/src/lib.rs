//! Discovery pipeline: clean → validate → enrich → score.
//!
//! Every stage is stateless. A stage that fails is logged and recorded in
//! the report; the remaining stages still run on what is left.

mod cleaner;
mod enricher;
mod error;
mod scorer;
mod sections;
mod validator;

pub use cleaner::{
    clean_basic_info, clean_content, clean_date, clean_engagement, clean_metadata, clean_network,
    clean_number, clean_score, clean_text, clean_url, DataCleaner,
};
pub use enricher::{DataEnricher, Enrichment};
pub use error::PipelineError;
pub use scorer::{DimensionScores, ProspectScore, ProspectScorer};
pub use sections::{BASIC_INFO, CONTENT, ENGAGEMENT, ENRICHED, NETWORK};
pub use validator::{DataValidator, SectionReport, ValidationReport};

use outreach_core::data_object::DataObject;
use serde::Serialize;

/// Outcome of running one object through every stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub object: DataObject,
    pub validation: ValidationReport,
    /// `None` when scoring failed.
    pub score: Option<ProspectScore>,
    pub stage_errors: Vec<PipelineError>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiscoveryPipeline {
    cleaner: DataCleaner,
    validator: DataValidator,
    enricher: DataEnricher,
    scorer: ProspectScorer,
}

impl DiscoveryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `object` through the pipeline.
    ///
    /// Objects that carry a scrape error or no data are rejected up front.
    pub fn process(&self, mut object: DataObject) -> Result<PipelineReport, PipelineError> {
        if let Some(err) = &object.error {
            return Err(PipelineError::InvalidObject(err.clone()));
        }
        if object.data.is_empty() {
            return Err(PipelineError::InvalidObject("no data".to_string()));
        }

        let mut stage_errors = self.cleaner.clean(&mut object);
        for e in &stage_errors {
            tracing::warn!(url = %object.url, error = %e, "Cleaning stage dropped a section");
        }

        let validation = self.validator.validate(&object);
        if !validation.is_valid {
            tracing::debug!(
                url = %object.url,
                errors = validation.error_count(),
                "Object failed validation",
            );
        }

        if let Err(e) = self.enricher.enrich(&mut object) {
            tracing::error!(url = %object.url, error = %e, "Enrichment stage failed");
            stage_errors.push(e);
        }

        let score = match self.scorer.score(&object) {
            Ok(score) => Some(score),
            Err(e) => {
                tracing::error!(url = %object.url, error = %e, "Scoring stage failed");
                stage_errors.push(e);
                None
            }
        };

        Ok(PipelineReport { object, validation, score, stage_errors })
    }

    /// Process objects one after another. Rejected objects are logged and
    /// skipped.
    pub fn process_batch(&self, objects: Vec<DataObject>) -> Vec<PipelineReport> {
        let total = objects.len();
        let reports: Vec<PipelineReport> = objects
            .into_iter()
            .filter_map(|object| {
                let url = object.url.clone();
                match self.process(object) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Skipping object");
                        None
                    }
                }
            })
            .collect();
        tracing::info!(total, processed = reports.len(), "Pipeline batch finished");
        reports
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use outreach_core::platform::Platform;
    use serde_json::json;

    use super::*;

    fn object(data: serde_json::Value) -> DataObject {
        DataObject::with_data(
            Platform::Twitter,
            "https://twitter.com/jane",
            data.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn rejects_failed_and_empty_objects() {
        let pipeline = DiscoveryPipeline::new();
        let failed = DataObject::failed(Platform::Twitter, "u", "timeout");
        assert_matches!(
            pipeline.process(failed),
            Err(PipelineError::InvalidObject(msg)) if msg == "timeout"
        );
        let empty = DataObject::new(Platform::Twitter, "u");
        assert_matches!(pipeline.process(empty), Err(PipelineError::InvalidObject(_)));
    }

    #[test]
    fn runs_every_stage() {
        let report = DiscoveryPipeline::new()
            .process(object(json!({
                "basic_info": {
                    "username": "jane", "name": "<b>Jane</b>", "bio": "Writes code",
                    "followers": "1,200 followers", "following": 300
                },
                "engagement": {"likes": 60, "shares": 12, "engagement_rate": 0.05}
            })))
            .unwrap();

        assert!(report.stage_errors.is_empty());
        assert!(report.validation.is_valid, "{:?}", report.validation);
        let info = report.object.section(BASIC_INFO).unwrap();
        assert_eq!(info["name"], json!("Jane"));
        assert_eq!(info["followers"], json!(1200));
        let enriched = report.object.section(ENRICHED).unwrap();
        assert_eq!(enriched["growth_rate"], json!(4.0));
        assert!(report.score.is_some());
    }

    #[test]
    fn malformed_section_is_logged_and_processing_continues() {
        let report = DiscoveryPipeline::new()
            .process(object(json!({
                "content": "not a list",
                "engagement": {"likes": 5}
            })))
            .unwrap();

        assert_matches!(
            report.stage_errors.as_slice(),
            [PipelineError::MalformedSection { section: "content", .. }]
        );
        assert!(report.object.section(CONTENT).is_none());
        assert!(report.score.is_some());
    }

    #[test]
    fn batch_skips_rejected_objects() {
        let reports = DiscoveryPipeline::new().process_batch(vec![
            object(json!({"engagement": {"likes": 1}})),
            DataObject::failed(Platform::Reddit, "u", "blocked"),
            object(json!({"basic_info": {"username": "a"}})),
        ]);
        assert_eq!(reports.len(), 2);
    }
}
