//! WHO DVC (Digital Vaccination Certificate) QuestionnaireResponse.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::clinical;
use crate::template::{
    set_answer, set_nested_answer, with_nested_items, Answer, AnswerValue, Item,
};
use crate::{CertificateError, Result};

const QUESTIONNAIRE: &str = "http://smart.who.int/icvp/Questionnaire/Questionnaire-DVCModel";
const GENDER_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0001";
const ISO3166_SYSTEM: &str = "urn:iso:std:iso:3166";
const RELATIONSHIP_SYSTEM: &str = "http://smart.who.int/icvp/CodeSystem/DVCRelationshipStatus";
const DOSE_NUMBER_SYSTEM: &str = "http://smart.who.int/icvp/CodeSystem/doseNumber";
const ICD11_SYSTEM: &str = "http://id.who.int/icd/release/11/mms";

fn template() -> Vec<Item> {
    vec![
        Item::leaf("name", Answer::string("")),
        Item::leaf("dob", Answer::date("")),
        Item::leaf("sex", Answer::coding(GENDER_SYSTEM, "")),
        Item::leaf("nationality", Answer::coding(ISO3166_SYSTEM, "")),
        Item::leaf("nid", Answer::string("")),
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
                Item::leaf("doseNumber", Answer::coding(DOSE_NUMBER_SYSTEM, "Primary")),
                Item::leaf("disease", Answer::coding(ICD11_SYSTEM, "")),
                Item::leaf("vaccineClassification", Answer::coding(ICD11_SYSTEM, "")),
                Item::leaf("vaccineTradeItem", Answer::string("")),
                Item::leaf("date", Answer::date("")),
                Item::leaf("clinicianName", Answer::string("")),
                Item::leaf("issuer", Answer::string("")),
                Item::leaf("manufacturerId", Answer::string("")),
                Item::leaf("manufacturer", Answer::string("")),
                Item::leaf("batchNo", Answer::string("")),
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

/// Build the DVC QuestionnaireResponse from the clinical resources.
pub fn build(patient: &Value, immunization: &Value, organization: &Value) -> Result<Value> {
    let name =
        clinical::human_name(patient).ok_or_else(|| CertificateError::missing("Patient.name"))?;
    let dob = clinical::birth_date(patient)
        .ok_or_else(|| CertificateError::missing("Patient.birthDate"))?;
    let disease = clinical::target_disease(immunization).ok_or_else(|| {
        CertificateError::missing("Immunization.protocolApplied.targetDisease")
    })?;
    let classification = clinical::vaccine_code(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.vaccineCode"))?;
    let date = clinical::occurrence_date_time(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.occurrenceDateTime"))?;
    let manufacturer = organization
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| CertificateError::missing("Organization.name"))?;
    let batch = clinical::lot_number(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.lotNumber"))?;

    let nationality = patient
        .get("address")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(|a| a.get("country"))
        .and_then(Value::as_str);

    let mut items = template();
    items = set_answer(items, "name", Some(name.into()));
    items = set_answer(items, "dob", Some(dob.into()));
    items = set_answer(items, "sex", clinical::gender(patient).map(AnswerValue::from));
    items = set_answer(items, "nationality", nationality.map(AnswerValue::from));
    items = set_answer(
        items,
        "nid",
        clinical::identifier_value(patient, 1).map(AnswerValue::from),
    );
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

    items = set_nested_answer(
        items,
        "vaccineDetails",
        Some(clinical::dose_number(immunization).into()),
        "doseNumber",
    );
    items = set_nested_answer(items, "vaccineDetails", Some(disease.into()), "disease");
    items = set_nested_answer(
        items,
        "vaccineDetails",
        Some(classification.into()),
        "vaccineClassification",
    );
    items = set_nested_answer(
        items,
        "vaccineDetails",
        clinical::identifier_value(immunization, 0).map(AnswerValue::from),
        "vaccineTradeItem",
    );
    items = set_nested_answer(items, "vaccineDetails", Some(date.into()), "date");
    items = set_nested_answer(items, "vaccineDetails", None, "clinicianName");
    items = set_nested_answer(
        items,
        "vaccineDetails",
        clinical::manufacturer_reference(immunization).map(AnswerValue::from),
        "issuer",
    );
    items = set_nested_answer(
        items,
        "vaccineDetails",
        clinical::identifier_value(organization, 0).map(AnswerValue::from),
        "manufacturerId",
    );
    items = set_nested_answer(items, "vaccineDetails", Some(manufacturer.into()), "manufacturer");
    items = set_nested_answer(items, "vaccineDetails", Some(batch.into()), "batchNo");

    let expiration = clinical::expiration_date(immunization).map(AnswerValue::from);
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
