//! Wizard step definitions
//!
//! A step is static configuration: which sections it reads, how much it
//! weighs in the completion percentage, which listing modalities it applies
//! to, a declarative rule deciding whether it is complete, and value checks
//! on fields it may hold.

mod catalog;
mod checks;
mod rules;

pub use catalog::{property_wizard_steps, StepCatalog};
pub use checks::{FieldCheck, FieldError};
pub use rules::Rule;

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Wizard block a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Content,
    Financial,
    Settings,
}

/// How strongly a step is needed before publishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Optional,
    Recommended,
    Required,
}

/// Listing modality selected in the `type` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    ShortTermRental,
    ResidentialRental,
    BuySell,
}

impl Modality {
    pub const ALL: [Modality; 3] = [
        Modality::ShortTermRental,
        Modality::ResidentialRental,
        Modality::BuySell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::ShortTermRental => "short_term_rental",
            Modality::ResidentialRental => "residential_rental",
            Modality::BuySell => "buy_sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

/// Path holding the selected modalities
pub const MODALITIES_PATH: &str = "type.modalities";

/// Modalities selected in a document; unknown entries are ignored
pub fn selected_modalities(document: &Document) -> Vec<Modality> {
    let mut selected = Vec::new();
    let items = crate::document::lookup(document, MODALITIES_PATH).and_then(|v| v.as_array());
    for modality in items
        .into_iter()
        .flatten()
        .filter_map(|item| item.as_str().and_then(Modality::parse))
    {
        if !selected.contains(&modality) {
            selected.push(modality);
        }
    }
    selected
}

/// One wizard step
#[derive(Debug, Clone, Serialize)]
pub struct StepDef {
    pub id: String,
    pub block: Block,
    pub title: String,
    /// Sections this step reads
    pub sections: Vec<String>,
    pub requirement: Requirement,
    pub weight: u32,
    /// Modalities the step applies to; empty means all
    pub modalities: Vec<Modality>,
    pub rule: Rule,
    /// Constraints on field values, applied once the field is set
    pub checks: Vec<FieldCheck>,
}

impl StepDef {
    pub fn new(id: &str, block: Block, title: &str, section: &str, rule: Rule) -> Self {
        Self {
            id: id.to_string(),
            block,
            title: title.to_string(),
            sections: vec![section.to_string()],
            requirement: Requirement::Optional,
            weight: 1,
            modalities: Vec::new(),
            rule,
            checks: Vec::new(),
        }
    }

    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn only_for(mut self, modalities: &[Modality]) -> Self {
        self.modalities = modalities.to_vec();
        self
    }

    pub fn check(mut self, check: FieldCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Pure completion predicate; missing subtrees are simply "not complete"
    pub fn is_complete(&self, document: &Document) -> bool {
        self.rule.is_satisfied(document)
            && self.checks.iter().all(|c| c.violation(document).is_none())
    }

    /// Why the step is incomplete; empty exactly when it is complete
    pub fn errors(&self, document: &Document) -> Vec<FieldError> {
        let mut errors = self.rule.diagnose(document);
        for violation in self.checks.iter().filter_map(|c| c.violation(document)) {
            if !errors.contains(&violation) {
                errors.push(violation);
            }
        }
        if errors.is_empty() && !self.is_complete(document) {
            let section = self.sections.first().map(String::as_str).unwrap_or(self.id.as_str());
            errors.push(FieldError::new(section, "is incomplete"));
        }
        errors
    }

    /// Whether the step counts for a draft with these modalities selected
    ///
    /// No selection means every step applies.
    pub fn applies_to(&self, selected: &[Modality]) -> bool {
        selected.is_empty()
            || self.modalities.is_empty()
            || selected.iter().any(|m| self.modalities.contains(m))
    }

    /// Requirement level after modality adjustments
    ///
    /// Short-term rentals need every content step; sale-only listings relax
    /// the contract and house-rules steps.
    pub fn effective_requirement(&self, selected: &[Modality]) -> Requirement {
        if self.block == Block::Content && selected.contains(&Modality::ShortTermRental) {
            return Requirement::Required;
        }

        let sale_only = selected.len() == 1 && selected[0] == Modality::BuySell;
        if sale_only {
            match self.id.as_str() {
                "financial-contract" => return Requirement::Recommended,
                "settings-rules" => return Requirement::Optional,
                _ => {}
            }
        }

        self.requirement
    }
}
