//! Property wizard step catalog
//!
//! 17 steps in three blocks. Each step owns exactly one section of the
//! draft document.

use std::collections::BTreeSet;

use pwz_common::Error;

use super::{Block, FieldCheck, Modality, Requirement, Rule, StepDef};

const STR: Modality = Modality::ShortTermRental;
const RES: Modality = Modality::ResidentialRental;
const SALE: Modality = Modality::BuySell;

/// The configured steps, in wizard order
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<StepDef>,
    sections: BTreeSet<String>,
}

impl StepCatalog {
    /// Build a catalog, rejecting duplicate step ids, all-zero weights and
    /// checks on fields outside the step's own sections
    pub fn try_new(steps: Vec<StepDef>) -> Result<Self, Error> {
        let mut ids = BTreeSet::new();
        for step in &steps {
            if !ids.insert(step.id.as_str()) {
                return Err(Error::Config(format!("Duplicate step id: {}", step.id)));
            }
            if step.sections.is_empty() {
                return Err(Error::Config(format!("Step {} reads no section", step.id)));
            }
            for check in &step.checks {
                let section = check.path().split('.').next().unwrap_or_default();
                if !step.sections.iter().any(|s| s == section) {
                    return Err(Error::Config(format!(
                        "Step {} checks {} outside its sections",
                        step.id,
                        check.path()
                    )));
                }
            }
        }
        if !steps.is_empty() && steps.iter().all(|s| s.weight == 0) {
            return Err(Error::Config("Every step has weight 0".to_string()));
        }

        let sections = section_names(&steps);
        Ok(Self { steps, sections })
    }

    /// The standard property wizard
    pub fn property_wizard() -> Self {
        let steps = property_wizard_steps();
        let sections = section_names(&steps);
        Self { steps, sections }
    }

    pub fn steps(&self) -> &[StepDef] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Section names owned by some step
    pub fn sections(&self) -> &BTreeSet<String> {
        &self.sections
    }

    pub fn is_known_section(&self, name: &str) -> bool {
        self.sections.contains(name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn section_names(steps: &[StepDef]) -> BTreeSet<String> {
    steps
        .iter()
        .flat_map(|s| s.sections.iter().cloned())
        .collect()
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::property_wizard()
    }
}

/// Step definitions for the property wizard
pub fn property_wizard_steps() -> Vec<StepDef> {
    use Block::{Content, Financial, Settings};
    use Requirement::{Optional, Recommended, Required};

    vec![
        // Content
        StepDef::new(
            "content-type",
            Content,
            "Type and identification",
            "type",
            Rule::AllOf(vec![
                Rule::present("type.internal_name"),
                Rule::present("type.property_type"),
                Rule::present("type.accommodation_type"),
            ]),
        )
        .requirement(Required),
        StepDef::new(
            "content-location",
            Content,
            "Location",
            "location",
            Rule::present("location.city"),
        )
        .requirement(Required),
        StepDef::new(
            "content-rooms",
            Content,
            "Rooms",
            "rooms",
            Rule::non_empty("rooms.rooms"),
        )
        .requirement(Recommended),
        StepDef::new(
            "content-photos",
            Content,
            "Photo tour",
            "photos",
            Rule::non_empty("photos.photos"),
        )
        .requirement(Recommended),
        StepDef::new(
            "content-location-amenities",
            Content,
            "Location amenities",
            "location_amenities",
            Rule::non_empty("location_amenities.amenities"),
        ),
        StepDef::new(
            "content-property-amenities",
            Content,
            "Accommodation amenities",
            "property_amenities",
            Rule::non_empty("property_amenities.amenities"),
        )
        .requirement(Recommended),
        StepDef::new(
            "content-description",
            Content,
            "Description",
            "description",
            Rule::present("description.text"),
        )
        .requirement(Required),
        // Financial
        StepDef::new(
            "financial-contract",
            Financial,
            "Owner relationship",
            "contract",
            Rule::present("contract.owner_id"),
        )
        .requirement(Required),
        StepDef::new(
            "financial-residential-pricing",
            Financial,
            "Rental and sale prices",
            "residential_pricing",
            Rule::AnyOf(vec![
                Rule::positive("residential_pricing.monthly_rent"),
                Rule::positive("residential_pricing.sale_price"),
            ]),
        )
        .only_for(&[RES, SALE])
        .check(FieldCheck::positive("residential_pricing.monthly_rent"))
        .check(FieldCheck::positive("residential_pricing.sale_price"))
        .check(FieldCheck::at_least("residential_pricing.min_rental_days", 1.0)),
        StepDef::new(
            "financial-fees",
            Financial,
            "Seasonal fees",
            "fees",
            Rule::touched("fees"),
        )
        .requirement(Recommended)
        .only_for(&[STR]),
        StepDef::new(
            "financial-pricing",
            Financial,
            "Nightly pricing",
            "pricing",
            Rule::positive("pricing.base_price"),
        )
        .requirement(Required)
        .only_for(&[STR])
        .check(FieldCheck::at_least("pricing.min_nights", 1.0)),
        StepDef::new(
            "financial-derived-pricing",
            Financial,
            "Derived prices",
            "derived_pricing",
            Rule::touched("derived_pricing"),
        )
        .requirement(Recommended)
        .only_for(&[STR])
        .check(FieldCheck::between("derived_pricing.weekly_discount", 0.0, 100.0))
        .check(FieldCheck::between("derived_pricing.monthly_discount", 0.0, 100.0))
        .check(FieldCheck::at_least("derived_pricing.cleaning_fee", 0.0))
        .check(FieldCheck::between("derived_pricing.service_fee_percent", 0.0, 50.0))
        .check(FieldCheck::at_least("derived_pricing.security_deposit", 0.0)),
        // Settings
        StepDef::new(
            "settings-rules",
            Settings,
            "House rules",
            "rules",
            Rule::touched("rules"),
        )
        .requirement(Required),
        StepDef::new(
            "settings-booking",
            Settings,
            "Booking settings",
            "booking",
            Rule::touched("booking"),
        )
        .requirement(Optional)
        .only_for(&[STR])
        .check(FieldCheck::between("booking.response_time_hours", 1.0, 168.0)),
        StepDef::new(
            "settings-tags",
            Settings,
            "Tags and groups",
            "tags",
            Rule::non_empty("tags.tags"),
        ),
        StepDef::new(
            "settings-ical",
            Settings,
            "Calendar sync",
            "ical",
            Rule::touched("ical"),
        )
        .only_for(&[STR])
        .check(FieldCheck::between("ical.sync_frequency_minutes", 5.0, 1440.0)),
        StepDef::new(
            "settings-otas",
            Settings,
            "Channel integrations",
            "otas",
            Rule::touched("otas"),
        )
        .only_for(&[STR])
        .check(FieldCheck::between("otas.sync_frequency_minutes", 5.0, 1440.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_wizard_has_seventeen_steps() {
        let catalog = StepCatalog::property_wizard();
        assert_eq!(catalog.len(), 17);
        assert_eq!(catalog.sections().len(), 17);
        assert!(catalog.is_known_section("location"));
        assert!(!catalog.is_known_section("wizard_meta"));
    }

    #[test]
    fn test_property_wizard_is_valid() {
        assert!(StepCatalog::try_new(property_wizard_steps()).is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut steps = property_wizard_steps();
        let first = steps[0].clone();
        steps.push(first);
        assert!(StepCatalog::try_new(steps).is_err());
    }

    #[test]
    fn test_check_outside_sections_rejected() {
        let mut steps = property_wizard_steps();
        steps[0] = steps[0]
            .clone()
            .check(FieldCheck::positive("pricing.base_price"));
        assert!(StepCatalog::try_new(steps).is_err());
    }

    #[test]
    fn test_zero_weights_rejected() {
        let steps = property_wizard_steps()
            .into_iter()
            .map(|s| s.weight(0))
            .collect();
        assert!(StepCatalog::try_new(steps).is_err());
    }

    #[test]
    fn test_step_lookup() {
        let catalog = StepCatalog::property_wizard();
        let step = catalog.step("financial-pricing").unwrap();
        assert_eq!(step.sections, vec!["pricing".to_string()]);
        assert_eq!(step.modalities, vec![Modality::ShortTermRental]);
        assert!(catalog.step("publish").is_none());
    }
}
