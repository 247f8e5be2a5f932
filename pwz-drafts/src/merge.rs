//! Section merger
//!
//! Recursive deep merge of a sparse section payload into a draft document:
//! - key present in `incoming` with `null` -> explicit `null` in the result
//! - object into object -> recurse
//! - array -> replaces the existing value wholesale (no element-wise merge)
//! - scalar -> replaces the existing value
//! - key only in `base` -> preserved untouched
//!
//! Per key, the last applied payload wins. Absence of a key never clears it.

use serde_json::Value;

use crate::document::Document;

/// Merge `incoming` into `base`, returning a new document
pub fn merge(base: &Document, incoming: &Document) -> Document {
    let mut result = base.clone();
    merge_into(&mut result, incoming);
    result
}

/// Merge `incoming` into a possibly-absent or non-object base value
///
/// A missing, `null` or non-object base behaves as `{}`.
pub fn merge_value(base: Option<&Value>, incoming: &Document) -> Document {
    match base {
        Some(Value::Object(map)) => merge(map, incoming),
        _ => merge(&Document::new(), incoming),
    }
}

/// In-place variant of [`merge`]
pub fn merge_into(target: &mut Document, incoming: &Document) {
    for (key, value) in incoming {
        match value {
            Value::Object(nested) => match target.get_mut(key) {
                Some(Value::Object(existing)) => merge_into(existing, nested),
                _ => {
                    let mut fresh = Document::new();
                    merge_into(&mut fresh, nested);
                    target.insert(key.clone(), Value::Object(fresh));
                }
            },
            // Null, arrays and scalars all replace whatever was there
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_incoming_is_noop() {
        let base = doc(json!({"location": {"city": "Rio"}, "tags": {"list": ["a"]}}));
        assert_eq!(merge(&base, &Document::new()), base);
    }

    #[test]
    fn test_merge_into_absent_base() {
        let incoming = doc(json!({"location": {"city": "Rio"}}));
        assert_eq!(merge_value(None, &incoming), incoming);
        assert_eq!(merge_value(Some(&Value::Null), &incoming), incoming);
    }

    #[test]
    fn test_nested_objects_recurse() {
        let base = doc(json!({"location": {"city": "Rio", "state": "RJ"}}));
        let incoming = doc(json!({"location": {"city": "Niterói", "zip": "24000"}}));

        let merged = merge(&base, &incoming);

        assert_eq!(
            Value::Object(merged),
            json!({"location": {"city": "Niterói", "state": "RJ", "zip": "24000"}})
        );
    }

    #[test]
    fn test_null_is_explicit_clear_not_removal() {
        let base = doc(json!({"location": {"city": "Rio", "complement": "apt 3"}}));
        let incoming = doc(json!({"location": {"complement": null}}));

        let merged = merge(&base, &incoming);

        let location = merged["location"].as_object().unwrap();
        assert!(location.contains_key("complement"));
        assert_eq!(location["complement"], Value::Null);
        assert_eq!(location["city"], json!("Rio"));
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let base = doc(json!({"tags": {"list": ["a"]}}));
        let step1 = merge(&base, &doc(json!({"tags": {"list": ["b", "c"]}})));
        assert_eq!(step1["tags"]["list"], json!(["b", "c"]));

        let step2 = merge(&step1, &doc(json!({"tags": {"list": []}})));
        assert_eq!(step2["tags"]["list"], json!([]));
    }

    #[test]
    fn test_array_of_objects_is_not_merged_by_index() {
        let base = doc(json!({"photos": {"items": [{"url": "a.jpg", "caption": "front"}]}}));
        let incoming = doc(json!({"photos": {"items": [{"url": "b.jpg"}]}}));

        let merged = merge(&base, &incoming);

        assert_eq!(merged["photos"]["items"], json!([{"url": "b.jpg"}]));
    }

    #[test]
    fn test_object_replaces_scalar_and_scalar_replaces_object() {
        let base = doc(json!({"rules": {"pets": "no", "smoking": {"allowed": false}}}));
        let incoming = doc(json!({"rules": {"pets": {"allowed": true}, "smoking": "no"}}));

        let merged = merge(&base, &incoming);

        assert_eq!(merged["rules"]["pets"], json!({"allowed": true}));
        assert_eq!(merged["rules"]["smoking"], json!("no"));
    }

    #[test]
    fn test_other_sections_untouched() {
        let base = doc(json!({
            "location": {"city": "Rio"},
            "rooms": {"bedrooms": 2},
            "photos": {"items": ["x.jpg"]}
        }));
        let incoming = doc(json!({"rooms": {"bathrooms": 1}}));

        let merged = merge(&base, &incoming);

        assert_eq!(merged["location"], base["location"]);
        assert_eq!(merged["photos"], base["photos"]);
        assert_eq!(merged["rooms"], json!({"bedrooms": 2, "bathrooms": 1}));
    }

    #[test]
    fn test_idempotent() {
        let base = doc(json!({"location": {"city": "Rio"}, "rooms": {"list": [1]}}));
        let incoming = doc(json!({
            "rooms": {"list": [2, 3], "beds": null},
            "fees": {"cleaning": 80}
        }));

        let once = merge(&base, &incoming);
        let twice = merge(&once, &incoming);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_last_applied_wins_per_key() {
        let base = Document::new();
        let a = doc(json!({"pricing": {"base": 100, "currency": "BRL"}}));
        let b = doc(json!({"pricing": {"base": 120}}));

        let ab = merge(&merge(&base, &a), &b);
        let ba = merge(&merge(&base, &b), &a);

        assert_eq!(ab["pricing"]["base"], json!(120));
        assert_eq!(ba["pricing"]["base"], json!(100));
        assert_eq!(ab["pricing"]["currency"], json!("BRL"));
    }

    #[test]
    fn test_nested_empty_object_creates_section() {
        let merged = merge(&Document::new(), &doc(json!({"booking": {}})));
        assert_eq!(merged["booking"], json!({}));
    }
}
