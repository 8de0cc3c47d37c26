//! Interpretations of a countries document, tried in a fixed order.
//!
//! The remote format is not fixed, so each strategy is independent: the first one that
//! accepts the document wins. Strict strategies reject the whole document on any bad record.
//! Loose strategies need an array made only of objects; objects missing required keys are
//! dropped and the rest kept.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CatalogError;
use crate::models::{parse_id, Country};

type Strategy = fn(&[u8]) -> Option<Vec<Country>>;

pub const STRATEGIES: [(&str, Strategy); 4] = [
    ("wrapped", wrapped_strict),
    ("array", array_strict),
    ("wrapped-loose", wrapped_loose),
    ("array-loose", array_loose),
];

pub fn decode_countries(body: &[u8]) -> Result<Vec<Country>, CatalogError> {
    for (name, strategy) in STRATEGIES {
        if let Some(countries) = strategy(body) {
            debug!(strategy = name, count = countries.len(), "decoded countries document");
            return Ok(countries);
        }
    }
    Err(CatalogError::Parse)
}

#[derive(Deserialize)]
struct Wrapped {
    countries: Vec<Country>,
}

fn wrapped_strict(body: &[u8]) -> Option<Vec<Country>> {
    serde_json::from_slice::<Wrapped>(body)
        .ok()
        .map(|w| w.countries)
}

fn array_strict(body: &[u8]) -> Option<Vec<Country>> {
    serde_json::from_slice(body).ok()
}

fn wrapped_loose(body: &[u8]) -> Option<Vec<Country>> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let entries = value.as_object()?.get("countries")?.as_array()?;
    extract_all(entries)
}

fn array_loose(body: &[u8]) -> Option<Vec<Country>> {
    let value: Value = serde_json::from_slice(body).ok()?;
    extract_all(value.as_array()?)
}

/// Only an array made entirely of maps is accepted; maps missing required keys are dropped.
fn extract_all(entries: &[Value]) -> Option<Vec<Country>> {
    let maps = entries
        .iter()
        .map(Value::as_object)
        .collect::<Option<Vec<_>>>()?;
    let countries: Vec<Country> = maps.into_iter().filter_map(country_from_map).collect();
    let dropped = entries.len() - countries.len();
    if dropped > 0 {
        debug!(dropped, "skipped incomplete country records");
    }
    Some(countries)
}

/// Builds a country from an untyped map, or `None` when a required key is missing or mistyped.
fn country_from_map(map: &Map<String, Value>) -> Option<Country> {
    let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);
    let strings = |key: &str| -> Option<Vec<String>> {
        map.get(key)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect()
    };

    Some(Country {
        id: parse_id(map.get("id")),
        name: text("name")?,
        capital: text("capital")?,
        currency: text("currency")?,
        currency_code: text("currencyCode")?,
        language: text("language")?,
        time_zone: text("timeZone")?,
        visa_required: map.get("visaRequired").and_then(Value::as_bool)?,
        visa_office: text("visaOffice"),
        required_documents: strings("requiredDocuments"),
        attractions: strings("attractions").unwrap_or_default(),
        useful_info: text("usefulInfo")?,
        flag: text("flag")?,
        image_url: text("imageURL"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIXED_ID: &str = "6f1c2a9e-3b7d-4e5f-9a0b-1c2d3e4f5a6b";

    fn full_record() -> Value {
        json!({
            "name": "Japan",
            "capital": "Tokyo",
            "currency": "Yen (JPY)",
            "currencyCode": "JPY",
            "language": "Japanese",
            "timeZone": "UTC+9 (JST)",
            "visaRequired": true,
            "visaOffice": "Embassy of Japan",
            "requiredDocuments": ["Passport", "Photo"],
            "attractions": ["Mount Fuji", "Kyoto"],
            "usefulInfo": "Cash is still common.",
            "flag": "🇯🇵",
            "imageURL": "https://example.com/japan.jpg"
        })
    }

    fn with_id(mut record: Value) -> Value {
        record["id"] = json!(FIXED_ID);
        record
    }

    fn without(mut record: Value, key: &str) -> Value {
        record.as_object_mut().unwrap().remove(key);
        record
    }

    fn strategy(name: &str) -> Strategy {
        STRATEGIES.iter().find(|(n, _)| *n == name).unwrap().1
    }

    fn document_for(name: &str, records: Vec<Value>) -> Vec<u8> {
        let doc = if name.starts_with("wrapped") {
            json!({ "countries": records })
        } else {
            Value::Array(records)
        };
        serde_json::to_vec(&doc).unwrap()
    }

    #[test]
    fn every_strategy_keeps_a_supplied_id_and_fills_all_fields() {
        for (name, strategy) in STRATEGIES {
            let body = document_for(name, vec![with_id(full_record())]);
            let countries = strategy(&body).unwrap_or_else(|| panic!("{name} rejected record"));

            assert_eq!(countries.len(), 1, "{name}");
            let japan = &countries[0];
            assert_eq!(japan.id.to_string(), FIXED_ID, "{name}");
            assert_eq!(japan.currency_code, "JPY");
            assert!(japan.visa_required);
            assert_eq!(japan.visa_office.as_deref(), Some("Embassy of Japan"));
            assert_eq!(
                japan.required_documents,
                Some(vec!["Passport".to_string(), "Photo".to_string()])
            );
            assert_eq!(japan.attractions, vec!["Mount Fuji", "Kyoto"]);
            assert_eq!(japan.image_url.as_deref(), Some("https://example.com/japan.jpg"));
        }
    }

    #[test]
    fn every_strategy_assigns_an_id_when_absent() {
        for (name, strategy) in STRATEGIES {
            let body = document_for(name, vec![full_record(), full_record()]);
            let countries = strategy(&body).unwrap();
            assert_eq!(countries.len(), 2, "{name}");
            assert_ne!(countries[0].id, countries[1].id, "{name}");
        }
    }

    #[test]
    fn optional_fields_default_when_missing() {
        let mut record = full_record();
        for key in ["visaOffice", "requiredDocuments", "attractions", "imageURL"] {
            record = without(record, key);
        }
        let body = document_for("wrapped", vec![record]);

        let countries = decode_countries(&body).unwrap();
        assert_eq!(countries[0].visa_office, None);
        assert_eq!(countries[0].required_documents, None);
        assert!(countries[0].attractions.is_empty());
        assert_eq!(countries[0].image_url, None);
    }

    #[test]
    fn wrapped_strict_wins_for_a_clean_document() {
        let body = document_for("wrapped", vec![full_record()]);
        assert!(strategy("wrapped")(&body).is_some());
        assert_eq!(decode_countries(&body).unwrap().len(), 1);
    }

    #[test]
    fn one_bad_record_fails_strict_but_loose_keeps_the_rest() {
        let records = vec![
            full_record(),
            without(full_record(), "capital"),
            full_record(),
            without(full_record(), "visaRequired"),
            full_record(),
        ];

        let wrapped = document_for("wrapped", records.clone());
        assert!(strategy("wrapped")(&wrapped).is_none());
        assert_eq!(decode_countries(&wrapped).unwrap().len(), 3);

        let array = document_for("array", records);
        assert!(strategy("array")(&array).is_none());
        assert_eq!(decode_countries(&array).unwrap().len(), 3);
    }

    #[test]
    fn mistyped_required_field_drops_the_record() {
        let mut bad = full_record();
        bad["visaRequired"] = json!("yes");
        let body = document_for("array", vec![bad, full_record()]);

        assert_eq!(decode_countries(&body).unwrap().len(), 1);
    }

    #[test]
    fn arrays_with_non_map_entries_are_parse_failures() {
        for body in [
            &br#"{"countries": [1, "x", null]}"#[..],
            &br#"[1, 2, 3]"#[..],
        ] {
            assert!(matches!(decode_countries(body), Err(CatalogError::Parse)));
        }

        let mixed = document_for("array", vec![full_record(), json!(42)]);
        assert!(strategy("array-loose")(&mixed).is_none());
        assert!(matches!(decode_countries(&mixed), Err(CatalogError::Parse)));
    }

    #[test]
    fn mistyped_optional_field_in_a_strict_record_reads_as_absent() {
        let mut record = full_record();
        record["attractions"] = json!("nope");
        record["visaOffice"] = json!(7);
        record["requiredDocuments"] = json!([1, 2]);
        record["imageURL"] = json!(false);
        let body = document_for("wrapped", vec![record]);

        let countries = strategy("wrapped")(&body).unwrap();
        assert_eq!(countries.len(), 1);
        assert!(countries[0].attractions.is_empty());
        assert_eq!(countries[0].visa_office, None);
        assert_eq!(countries[0].required_documents, None);
        assert_eq!(countries[0].image_url, None);
    }

    #[test]
    fn all_records_invalid_is_an_empty_success() {
        let body = document_for("wrapped", vec![without(full_record(), "flag")]);
        assert!(decode_countries(&body).unwrap().is_empty());
    }

    #[test]
    fn unrecognised_documents_are_parse_failures() {
        for body in [
            &b"not json at all"[..],
            &br#"{"data": []}"#[..],
            &br#"{"countries": {"name": "France"}}"#[..],
            &br#""countries""#[..],
        ] {
            assert!(matches!(decode_countries(body), Err(CatalogError::Parse)));
        }
    }

    #[test]
    fn malformed_id_is_replaced() {
        let mut record = full_record();
        record["id"] = json!("not-a-uuid");
        let countries = decode_countries(&document_for("array", vec![record])).unwrap();
        assert_eq!(countries.len(), 1);
    }
}
