//! Field accessors over opaque clinical resources.
//!
//! Certificate inputs arrive as untyped JSON resources; these helpers
//! centralize the (fairly forgiving) navigation the extraction tables
//! share. Everything returns `Option` — the builders decide which absent
//! fields are hard failures.

use serde_json::Value;

/// `name[0].text`, falling back to `given` joined with `family`.
pub fn human_name(patient: &Value) -> Option<String> {
    let name = patient.get("name")?.as_array()?.first()?;
    if let Some(text) = name.get("text").and_then(Value::as_str) {
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let family = name.get("family").and_then(Value::as_str).unwrap_or_default();
    let full = format!("{given} {family}");
    let full = full.trim();
    (!full.is_empty()).then(|| full.to_string())
}

pub fn birth_date(patient: &Value) -> Option<&str> {
    patient.get("birthDate").and_then(Value::as_str)
}

pub fn gender(patient: &Value) -> Option<&str> {
    patient.get("gender").and_then(Value::as_str)
}

/// `identifier[index].value`.
pub fn identifier_value(resource: &Value, index: usize) -> Option<&str> {
    resource
        .get("identifier")?
        .as_array()?
        .get(index)?
        .get("value")
        .and_then(Value::as_str)
}

/// The value of the identifier typed `TAX`, falling back to the first
/// identifier.
pub fn tax_or_first_identifier(patient: &Value) -> Option<&str> {
    let identifiers = patient.get("identifier")?.as_array()?;
    identifiers
        .iter()
        .find(|id| {
            id.get("type")
                .and_then(|t| t.get("coding"))
                .and_then(Value::as_array)
                .is_some_and(|codings| {
                    codings
                        .iter()
                        .any(|c| c.get("code").and_then(Value::as_str) == Some("TAX"))
                })
        })
        .and_then(|id| id.get("value").and_then(Value::as_str))
        .or_else(|| identifiers.first()?.get("value").and_then(Value::as_str))
}

/// Extension whose url equals `url` exactly.
pub fn extension_by_url<'a>(resource: &'a Value, url: &str) -> Option<&'a Value> {
    resource
        .get("extension")?
        .as_array()?
        .iter()
        .find(|e| e.get("url").and_then(Value::as_str) == Some(url))
}

/// Extension whose url contains `fragment` (profiles move hosts more
/// often than path tails).
pub fn extension_by_url_fragment<'a>(resource: &'a Value, fragment: &str) -> Option<&'a Value> {
    resource
        .get("extension")?
        .as_array()?
        .iter()
        .find(|e| {
            e.get("url")
                .and_then(Value::as_str)
                .is_some_and(|u| u.contains(fragment))
        })
}

/// The `code` of a coding that may be a single object or an array of
/// codings.
pub fn coding_code(value: &Value) -> Option<&str> {
    let coding = value.get("coding")?;
    let coding = match coding {
        Value::Array(items) => items.first()?,
        other => other,
    };
    coding.get("code").and_then(Value::as_str)
}

/// `vaccineCode.coding[0].code`.
pub fn vaccine_code(immunization: &Value) -> Option<&str> {
    coding_code(immunization.get("vaccineCode")?)
}

pub fn lot_number(immunization: &Value) -> Option<&str> {
    immunization.get("lotNumber").and_then(Value::as_str)
}

pub fn occurrence_date_time(immunization: &Value) -> Option<&str> {
    immunization.get("occurrenceDateTime").and_then(Value::as_str)
}

pub fn expiration_date(immunization: &Value) -> Option<&str> {
    immunization.get("expirationDate").and_then(Value::as_str)
}

/// `protocolApplied[0].doseNumberPositiveInt`, defaulting to 1.
pub fn dose_number(immunization: &Value) -> i64 {
    immunization
        .get("protocolApplied")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .and_then(|p| p.get("doseNumberPositiveInt"))
        .and_then(Value::as_i64)
        .unwrap_or(1)
}

/// `protocolApplied[0].targetDisease[0].coding[0].code`.
pub fn target_disease(immunization: &Value) -> Option<&str> {
    let disease = immunization
        .get("protocolApplied")?
        .as_array()?
        .first()?
        .get("targetDisease")?
        .as_array()?
        .first()?;
    coding_code(disease)
}

/// `manufacturer.reference` (a Reference, not the Organization itself).
pub fn manufacturer_reference(immunization: &Value) -> Option<&str> {
    immunization
        .get("manufacturer")?
        .get("reference")
        .and_then(Value::as_str)
}

/// `performer.reference`, accepting the array form
/// (`performer[0].actor.reference`) as well.
pub fn performer_reference(immunization: &Value) -> Option<&str> {
    let performer = immunization.get("performer")?;
    match performer {
        Value::Array(items) => {
            let first = items.first()?;
            first
                .get("actor")
                .and_then(|a| a.get("reference"))
                .or_else(|| first.get("reference"))
                .and_then(Value::as_str)
        }
        other => other.get("reference").and_then(Value::as_str),
    }
}

/// `contact[0].name[0]` given + family, trimmed to `None` when empty.
pub fn guardian_name(patient: &Value) -> Option<String> {
    let name = patient
        .get("contact")?
        .as_array()?
        .first()?
        .get("name")?;
    let name = match name {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let family = name.get("family").and_then(Value::as_str).unwrap_or_default();
    let full = format!("{given} {family}");
    let full = full.trim();
    (!full.is_empty()).then(|| full.to_string())
}

/// `contact[0].relationship` coding code; the relationship may be a
/// CodeableConcept or a list of them.
pub fn guardian_relationship(patient: &Value) -> Option<&str> {
    let relationship = patient
        .get("contact")?
        .as_array()?
        .first()?
        .get("relationship")?;
    let relationship = match relationship {
        Value::Array(items) => items.first()?,
        other => other,
    };
    coding_code(relationship)
}

/// Date part of an ISO timestamp (`YYYY-MM-DD`).
pub fn date_only(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}
