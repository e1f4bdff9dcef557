//! Validation Audit
//!
//! Kept in its own test binary so the process-wide tally is not shared
//! with any other test.
#![cfg(feature = "test-hooks")]

use std::collections::BTreeMap;

use barcodeforge_core::pipeline::audit;
use barcodeforge_core::{GenerateInput, GenerateRequest, GenerationPipeline, PipelineError, StyleSpec, Symbology};

#[tokio::test]
async fn each_generate_validates_exactly_once() {
    let pipeline: GenerationPipeline = GenerationPipeline::default();
    let before = audit::validations();

    let accepted = pipeline.generate(&GenerateRequest::raw(Symbology::Code128, "ABC")).await;
    assert!(accepted.is_ok());
    assert_eq!(audit::validations() - before, 1);

    let rejected = pipeline.generate(&GenerateRequest::raw(Symbology::Ean8, "x")).await;
    assert!(matches!(rejected, Err(PipelineError::Validation(_))));
    assert_eq!(audit::validations() - before, 2);

    // Composition fails before there is any data to validate
    let incomplete = GenerateRequest {
        symbology: Symbology::Ean13,
        input: GenerateInput::Fields {
            fields: BTreeMap::from([("prefix".to_string(), "400".to_string())]),
        },
        style: StyleSpec::default(),
        preset: None,
    };
    let composed = pipeline.generate(&incomplete).await;
    assert!(matches!(composed, Err(PipelineError::Compose(_))));
    assert_eq!(audit::validations() - before, 2);
}
