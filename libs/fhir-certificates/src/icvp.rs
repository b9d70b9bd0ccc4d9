//! WHO ICVP (International Certificate of Vaccination or Prophylaxis)
//! QuestionnaireResponse.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::clinical;
use crate::template::{
    set_answer, set_nested_answer, with_nested_items, Answer, AnswerValue, Item,
};
use crate::{CertificateError, Result};

const QUESTIONNAIRE: &str = "http://smart.who.int/icvp/Questionnaire/ICVP";
const GENDER_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0001";
const ISO3166_SYSTEM: &str = "urn:iso:std:iso:3166";
const ID_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
const RELATIONSHIP_SYSTEM: &str =
    "http://smart.who.int/trust-phw/CodeSystem/DVCRelationshipStatus";
const PREQUAL_PRODUCT_SYSTEM: &str =
    "http://smart.who.int/pcmt-vaxprequal/CodeSystem/PreQualProductIDs";

const PRODUCT_ID_EXTENSION_FRAGMENT: &str = "StructureDefinition/ProductID";
const NATIONALITY_EXTENSION_FRAGMENT: &str = "/StructureDefinition/patient-nationality";

fn template() -> Vec<Item> {
    vec![
        Item::leaf("name", Answer::string("")),
        Item::leaf("dob", Answer::date("")),
        Item::leaf("sex", Answer::coding(GENDER_SYSTEM, "")),
        Item::leaf("nid", Answer::string("")),
        Item::leaf("nationality", Answer::coding(ISO3166_SYSTEM, "")),
        // National-id type stays at its questionnaire default; the
        // extraction table never overwrites it.
        Item::leaf("ndt", Answer::coding(ID_TYPE_SYSTEM, "NI")),
        Item::group(
            "guardian",
            vec![
                Item::leaf("guardianName", Answer::string("")),
                Item::leaf(
                    "guardianRelationship",
                    Answer::coding(RELATIONSHIP_SYSTEM, "Guardian"),
                ),
            ],
        ),
        Item::group(
            "vaccineDetails",
            vec![
                Item::leaf("productID", Answer::coding(PREQUAL_PRODUCT_SYSTEM, "")),
                Item::leaf("date", Answer::date("")),
                Item::leaf("clinicianName", Answer::string("")),
                Item::leaf("batchNo.text", Answer::string("")),
                Item::leaf("issuer", Answer::string("")),
                Item::group(
                    "validityPeriod",
                    vec![
                        Item::leaf("startDate", Answer::date("")),
                        Item::leaf("endDate", Answer::date("")),
                    ],
                ),
            ],
        ),
    ]
}

/// Build the ICVP QuestionnaireResponse from the clinical resources.
pub fn build(patient: &Value, immunization: &Value) -> Result<Value> {
    let name =
        clinical::human_name(patient).ok_or_else(|| CertificateError::missing("Patient.name"))?;
    let dob = clinical::birth_date(patient)
        .ok_or_else(|| CertificateError::missing("Patient.birthDate"))?;
    let product_id = clinical::extension_by_url_fragment(immunization, PRODUCT_ID_EXTENSION_FRAGMENT)
        .and_then(|e| e.get("valueCoding"))
        .and_then(|c| c.get("code"))
        .and_then(Value::as_str)
        .ok_or_else(|| CertificateError::missing("Immunization ProductID extension"))?;
    let occurrence = clinical::occurrence_date_time(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.occurrenceDateTime"))?;
    let batch = clinical::lot_number(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.lotNumber"))?;

    let date = clinical::date_only(occurrence);
    let nationality = clinical::extension_by_url_fragment(patient, NATIONALITY_EXTENSION_FRAGMENT)
        .and_then(|e| e.get("valueCodeableConcept"))
        .and_then(clinical::coding_code);

    let mut items = template();
    items = set_answer(items, "name", Some(name.into()));
    items = set_answer(items, "dob", Some(dob.into()));
    items = set_answer(items, "sex", clinical::gender(patient).map(AnswerValue::from));
    items = set_answer(
        items,
        "nid",
        clinical::tax_or_first_identifier(patient).map(AnswerValue::from),
    );
    items = set_answer(items, "nationality", nationality.map(AnswerValue::from));
    items = set_nested_answer(
        items,
        "guardian",
        clinical::guardian_name(patient).map(AnswerValue::from),
        "guardianName",
    );
    items = set_nested_answer(
        items,
        "guardian",
        clinical::guardian_relationship(patient).map(AnswerValue::from),
        "guardianRelationship",
    );

    items = set_nested_answer(items, "vaccineDetails", Some(product_id.into()), "productID");
    items = set_nested_answer(items, "vaccineDetails", Some(date.into()), "date");
    items = set_nested_answer(
        items,
        "vaccineDetails",
        clinical::performer_reference(immunization).map(AnswerValue::from),
        "clinicianName",
    );
    items = set_nested_answer(items, "vaccineDetails", Some(batch.into()), "batchNo.text");
    items = set_nested_answer(
        items,
        "vaccineDetails",
        clinical::manufacturer_reference(immunization).map(AnswerValue::from),
        "issuer",
    );

    let expiration = clinical::expiration_date(immunization)
        .map(clinical::date_only)
        .map(AnswerValue::from);
    items = with_nested_items(items, "vaccineDetails", |details| {
        let details = set_nested_answer(details, "validityPeriod", Some(date.into()), "startDate");
        set_nested_answer(details, "validityPeriod", expiration, "endDate")
    });

    Ok(json!({
        "resourceType": "QuestionnaireResponse",
        "id": Uuid::new_v4().to_string(),
        "text": {
            "status": "generated",
            "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\"></div>"
        },
        "questionnaire": QUESTIONNAIRE,
        "status": "completed",
        "item": serde_json::to_value(&items)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Value {
        json!({
            "resourceType": "Patient",
            "name": [{"text": "Sergio Castillo"}],
            "birthDate": "1990-05-12",
            "gender": "male",
            "identifier": [
                {"value": "passport-1"},
                {"type": {"coding": [{"code": "TAX"}]}, "value": "1892265-2"}
            ],
            "extension": [{
                "url": "http://hl7.org/fhir/StructureDefinition/patient-nationality",
                "valueCodeableConcept": {"coding": [{"code": "CHL"}]}
            }]
        })
    }

    fn immunization() -> Value {
        json!({
            "resourceType": "Immunization",
            "occurrenceDateTime": "2024-03-01T09:30:00Z",
            "expirationDate": "2025-03-01",
            "lotNumber": "A1234",
            "performer": {"reference": "Practitioner/juan-castro"},
            "manufacturer": {"reference": "Organization/min-salud"},
            "extension": [{
                "url": "http://smart.who.int/icvp/StructureDefinition/ProductID",
                "valueCoding": {"code": "YellowFever-123"}
            }]
        })
    }

    fn find<'a>(items: &'a Value, link_id: &str) -> Option<&'a Value> {
        items.as_array().unwrap().iter().find(|i| i["linkId"] == link_id)
    }

    #[test]
    fn builds_complete_response() {
        let payload = build(&patient(), &immunization()).unwrap();
        assert_eq!(payload["questionnaire"], QUESTIONNAIRE);

        let items = &payload["item"];
        assert_eq!(find(items, "name").unwrap()["answer"][0]["valueString"], "Sergio Castillo");
        assert_eq!(find(items, "nid").unwrap()["answer"][0]["valueString"], "1892265-2");
        assert_eq!(
            find(items, "nationality").unwrap()["answer"][0]["valueCoding"]["code"],
            "CHL"
        );
        // untouched questionnaire default
        assert_eq!(find(items, "ndt").unwrap()["answer"][0]["valueCoding"]["code"], "NI");
        // guardian group was never populated and is pruned
        assert!(find(items, "guardian").is_none());

        let details = find(items, "vaccineDetails").unwrap();
        assert_eq!(
            find(&details["item"], "productID").unwrap()["answer"][0]["valueCoding"]["code"],
            "YellowFever-123"
        );
        // occurrence timestamp is reduced to its date part
        assert_eq!(find(&details["item"], "date").unwrap()["answer"][0]["valueDate"], "2024-03-01");
        assert_eq!(
            find(&details["item"], "batchNo.text").unwrap()["answer"][0]["valueString"],
            "A1234"
        );
        let validity = find(&details["item"], "validityPeriod").unwrap();
        assert_eq!(
            find(&validity["item"], "endDate").unwrap()["answer"][0]["valueDate"],
            "2025-03-01"
        );
    }

    #[test]
    fn missing_product_id_extension_fails() {
        let mut immunization = immunization();
        immunization.as_object_mut().unwrap().remove("extension");
        let err = build(&patient(), &immunization).unwrap_err();
        assert!(matches!(err, CertificateError::IncompleteClinicalData { .. }));
    }

    #[test]
    fn patient_without_identifier_omits_nid() {
        let mut patient = patient();
        patient.as_object_mut().unwrap().remove("identifier");
        let payload = build(&patient, &immunization()).unwrap();
        assert!(find(&payload["item"], "nid").is_none());
        let serialized = serde_json::to_string(&payload["item"]).unwrap();
        assert!(!serialized.contains("null"));
    }
}
