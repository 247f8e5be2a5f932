//! Completion tracker
//!
//! Derives the completed step set, the 0-100 completion percentage and the
//! per-step field errors from a document. Output depends only on the
//! document and the catalog, so two deeply-equal documents always produce
//! identical results.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::document::Document;
use crate::steps::{selected_modalities, FieldError, Requirement, StepCatalog, StepDef};

/// Result of evaluating a document against the step catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Completed steps that apply to this draft; always a subset of the catalog
    pub completed_steps: BTreeSet<String>,
    pub percentage: u8,
    /// Steps counted in the denominator
    pub applicable_steps: Vec<String>,
    /// Applicable steps required for publishing that are not yet complete
    pub missing_required: Vec<String>,
    /// Field errors for every applicable step that is not complete
    pub step_errors: BTreeMap<String, Vec<FieldError>>,
}

impl Completion {
    pub fn is_publishable(&self) -> bool {
        self.missing_required.is_empty()
    }
}

/// Evaluate a document against step definitions
pub fn evaluate(document: &Document, steps: &[StepDef]) -> Completion {
    let modalities = selected_modalities(document);

    let mut completed_steps = BTreeSet::new();
    let mut applicable_steps = Vec::new();
    let mut missing_required = Vec::new();
    let mut step_errors = BTreeMap::new();
    let mut done_weight: u64 = 0;
    let mut total_weight: u64 = 0;

    for step in steps.iter().filter(|s| s.applies_to(&modalities)) {
        applicable_steps.push(step.id.clone());
        total_weight += u64::from(step.weight);

        if step.is_complete(document) {
            completed_steps.insert(step.id.clone());
            done_weight += u64::from(step.weight);
            continue;
        }

        if step.effective_requirement(&modalities) == Requirement::Required {
            missing_required.push(step.id.clone());
        }
        step_errors.insert(step.id.clone(), step.errors(document));
    }

    Completion {
        completed_steps,
        percentage: percentage(done_weight, total_weight),
        applicable_steps,
        missing_required,
        step_errors,
    }
}

/// `round(done / total * 100)`, half rounded up, in integer arithmetic
pub fn percentage(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total);
    ((done * 200 + total) / (total * 2)) as u8
}

/// Catalog-bound evaluator shared by the reconciler and the API
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    catalog: Arc<StepCatalog>,
}

impl CompletionTracker {
    pub fn new(catalog: Arc<StepCatalog>) -> Self {
        Self { catalog }
    }

    pub fn evaluate(&self, document: &Document) -> Completion {
        evaluate(document, self.catalog.steps())
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{Block, Rule};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn tracker() -> CompletionTracker {
        CompletionTracker::new(Arc::new(StepCatalog::property_wizard()))
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 17), 0);
        assert_eq!(percentage(1, 17), 6); // 5.88
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(17, 17), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_empty_document_completes_nothing() {
        let completion = tracker().evaluate(&Document::new());
        assert!(completion.completed_steps.is_empty());
        assert_eq!(completion.percentage, 0);
        assert_eq!(completion.applicable_steps.len(), 17);
        assert!(!completion.is_publishable());
    }

    #[test]
    fn test_single_location_step() {
        let completion = tracker().evaluate(&doc(json!({"location": {"city": "Rio"}})));
        assert_eq!(
            completion.completed_steps,
            BTreeSet::from(["content-location".to_string()])
        );
        assert_eq!(completion.percentage, 6);
    }

    #[test]
    fn test_modalities_shrink_denominator() {
        // Sale-only: the six short-term-rental steps drop out (11 remain)
        let d = doc(json!({
            "type": {
                "internal_name": "Casa Azul",
                "property_type": "casa",
                "accommodation_type": "casa",
                "modalities": ["buy_sell"]
            },
            "location": {"city": "Rio"},
            "ical": {"url": "https://example.test/cal.ics"}
        }));

        let completion = tracker().evaluate(&d);

        assert_eq!(completion.applicable_steps.len(), 11);
        assert!(!completion.completed_steps.contains("settings-ical"));
        assert_eq!(completion.completed_steps.len(), 2);
        assert_eq!(completion.percentage, percentage(2, 11));
    }

    #[test]
    fn test_missing_required_follows_modalities() {
        let sale_only = doc(json!({"type": {"modalities": ["buy_sell"]}}));
        let missing = tracker().evaluate(&sale_only).missing_required;
        assert!(missing.contains(&"content-type".to_string()));
        assert!(!missing.contains(&"financial-contract".to_string()));
        assert!(!missing.contains(&"settings-rules".to_string()));
        assert!(!missing.contains(&"financial-pricing".to_string()));

        let short_term = doc(json!({"type": {"modalities": ["short_term_rental"]}}));
        let missing = tracker().evaluate(&short_term).missing_required;
        assert!(missing.contains(&"content-rooms".to_string()));
        assert!(missing.contains(&"financial-pricing".to_string()));
    }

    #[test]
    fn test_deterministic_for_equal_documents() {
        let a = doc(json!({
            "location": {"city": "Rio", "state": "RJ"},
            "rooms": {"rooms": [{"kind": "suite"}]}
        }));
        // Same content, different insertion order
        let b = doc(json!({
            "rooms": {"rooms": [{"kind": "suite"}]},
            "location": {"state": "RJ", "city": "Rio"}
        }));
        assert_eq!(a, b);
        assert_eq!(tracker().evaluate(&a), tracker().evaluate(&b));
    }

    #[test]
    fn test_weights() {
        let steps = vec![
            StepDef::new("a", Block::Content, "A", "a", Rule::touched("a")).weight(3),
            StepDef::new("b", Block::Content, "B", "b", Rule::touched("b")).weight(1),
        ];
        let completion = evaluate(&doc(json!({"a": {"x": 1}})), &steps);
        assert_eq!(completion.percentage, 75);
    }

    #[test]
    fn test_completed_steps_subset_of_catalog() {
        let d = doc(json!({
            "location": {"city": "Rio"},
            "extra_section": {"anything": true},
            "type": {"modalities": ["short_term_rental", "residential_rental"]}
        }));
        let catalog = StepCatalog::property_wizard();
        let completion = evaluate(&d, catalog.steps());
        for id in &completion.completed_steps {
            assert!(catalog.step(id).is_some());
        }
        // Both modalities together cover every step
        assert_eq!(completion.applicable_steps.len(), 17);
    }

    #[test]
    fn test_step_errors_explain_incomplete_steps() {
        let d = doc(json!({
            "type": {"internal_name": "Casa Azul", "modalities": ["buy_sell"]},
            "location": {"city": "Rio"},
            "residential_pricing": {"sale_price": -5}
        }));
        let completion = tracker().evaluate(&d);

        assert!(!completion.step_errors.contains_key("content-location"));
        // Steps that do not apply to a sale-only listing are not diagnosed
        assert!(!completion.step_errors.contains_key("financial-pricing"));

        let type_fields: Vec<&str> = completion.step_errors["content-type"]
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(type_fields, vec!["type.property_type", "type.accommodation_type"]);

        let pricing = &completion.step_errors["financial-residential-pricing"];
        assert!(pricing.contains(&FieldError::new(
            "residential_pricing.sale_price",
            "must be greater than 0"
        )));

        // Every applicable step is either complete or explained
        for id in &completion.applicable_steps {
            assert_ne!(
                completion.completed_steps.contains(id),
                completion.step_errors.contains_key(id)
            );
        }
    }

    #[test]
    fn test_out_of_range_value_keeps_step_incomplete() {
        let d = doc(json!({
            "type": {"modalities": ["residential_rental"]},
            "residential_pricing": {"monthly_rent": 2500, "min_rental_days": 0}
        }));
        let completion = tracker().evaluate(&d);

        assert!(!completion.completed_steps.contains("financial-residential-pricing"));
        assert_eq!(
            completion.step_errors["financial-residential-pricing"],
            vec![FieldError::new("residential_pricing.min_rental_days", "must be at least 1")]
        );

        let fixed = doc(json!({
            "type": {"modalities": ["residential_rental"]},
            "residential_pricing": {"monthly_rent": 2500, "min_rental_days": 30}
        }));
        let completion = tracker().evaluate(&fixed);
        assert!(completion.completed_steps.contains("financial-residential-pricing"));
        assert!(!completion.step_errors.contains_key("financial-residential-pricing"));
    }
}
