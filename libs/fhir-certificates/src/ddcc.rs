//! WHO DDCC (Digital Documentation of COVID-19 Certificates) payload.
//!
//! Produces the DDCCSubmitHealthEventRequest batch bundle: a Parameters
//! resource wrapping the core-data-set QuestionnaireResponse, addressed
//! at the `$generateHealthCertificate` operation.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::clinical;
use crate::template::{set_answer, Answer, AnswerValue, Item};
use crate::{CertificateError, Result};

const SUBMIT_REQUEST_PROFILE: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCSubmitHealthEventRequest";
const PARAMETERS_PROFILE: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCGenerateHealthCertificateParameters";
const QUESTIONNAIRE_RESPONSE_PROFILE: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCQuestionnaireResponse";
const QUESTIONNAIRE: &str =
    "http://worldhealthorganization.github.io/ddcc/DDCCVSCoreDataSetQuestionnaire";

const BRAND_EXTENSION: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCEventBrand";
const COUNTRY_EXTENSION: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCCountryOfEvent";
const MA_HOLDER_EXTENSION: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCVaccineMarketAuthorization";

const GENDER_SYSTEM: &str = "http://hl7.org/fhir/administrative-gender";
const ICD11_SYSTEM: &str = "http://id.who.int/icd11/mms";
const EXAMPLE_CODE_SYSTEM: &str =
    "http://worldhealthorganization.github.io/ddcc/CodeSystem/DDCC-Example-Test-CodeSystem";
const ISO3166_SYSTEM: &str = "urn:iso:std:iso:3166";

fn template() -> Vec<Item> {
    vec![
        Item::leaf("name", Answer::string("")),
        Item::leaf("birthDate", Answer::date("")),
        Item::leaf("identifier", Answer::string("")),
        Item::leaf("sex", Answer::coding(GENDER_SYSTEM, "")),
        Item::leaf("vaccine", Answer::coding(ICD11_SYSTEM, "")),
        Item::leaf("brand", Answer::coding(EXAMPLE_CODE_SYSTEM, "")),
        Item::leaf("lot", Answer::string("")),
        Item::leaf("date", Answer::date("")),
        Item::leaf("dose", Answer::integer(1)),
        Item::leaf("ma_holder", Answer::coding(EXAMPLE_CODE_SYSTEM, "")),
        Item::leaf("country", Answer::coding(ISO3166_SYSTEM, "")),
        Item::leaf("centre", Answer::string("")),
        Item::leaf("pha", Answer::string("")),
        Item::leaf("hcid", Answer::string("")),
    ]
}

/// Build the DDCC submission payload from the clinical resources.
pub fn build(patient: &Value, immunization: &Value, organization: &Value) -> Result<Value> {
    let name =
        clinical::human_name(patient).ok_or_else(|| CertificateError::missing("Patient.name"))?;
    let birth_date = clinical::birth_date(patient)
        .ok_or_else(|| CertificateError::missing("Patient.birthDate"))?;
    let vaccine = clinical::vaccine_code(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.vaccineCode"))?;
    let lot = clinical::lot_number(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.lotNumber"))?;
    let date = clinical::occurrence_date_time(immunization)
        .ok_or_else(|| CertificateError::missing("Immunization.occurrenceDateTime"))?;
    let pha = organization
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| CertificateError::missing("Organization.id"))?;
    let hcid = immunization
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| CertificateError::missing("Immunization.id"))?;

    let brand = clinical::extension_by_url(immunization, BRAND_EXTENSION)
        .and_then(|e| e.get("valueCoding"))
        .and_then(|c| c.get("code"))
        .and_then(Value::as_str);
    let country = clinical::extension_by_url(immunization, COUNTRY_EXTENSION)
        .and_then(|e| e.get("valueCode"))
        .and_then(Value::as_str);
    let ma_holder = clinical::extension_by_url(immunization, MA_HOLDER_EXTENSION)
        .and_then(|e| e.get("valueCoding"))
        .and_then(|c| c.get("code"))
        .and_then(Value::as_str);

    let mut items = template();
    items = set_answer(items, "name", Some(name.into()));
    items = set_answer(items, "birthDate", Some(birth_date.into()));
    items = set_answer(items, "identifier", clinical::identifier_value(patient, 0).map(AnswerValue::from));
    items = set_answer(items, "sex", clinical::gender(patient).map(AnswerValue::from));
    items = set_answer(items, "vaccine", Some(vaccine.into()));
    items = set_answer(items, "brand", brand.map(AnswerValue::from));
    items = set_answer(items, "lot", Some(lot.into()));
    items = set_answer(items, "date", Some(date.into()));
    items = set_answer(items, "dose", Some(clinical::dose_number(immunization).into()));
    items = set_answer(items, "ma_holder", ma_holder.map(AnswerValue::from));
    items = set_answer(items, "country", country.map(AnswerValue::from));
    items = set_answer(items, "centre", None);
    items = set_answer(items, "pha", Some(pha.into()));
    items = set_answer(items, "hcid", Some(hcid.into()));

    let id = Uuid::new_v4().to_string();
    let today = Utc::now().format("%Y-%m-%d").to_string();
    Ok(json!({
        "resourceType": "Bundle",
        "id": id,
        "meta": { "profile": [SUBMIT_REQUEST_PROFILE] },
        "type": "batch",
        "entry": [{
            "fullUrl": format!("urn:uuid:{id}"),
            "resource": {
                "resourceType": "Parameters",
                "id": format!("{id}-params"),
                "meta": { "profile": [PARAMETERS_PROFILE] },
                "parameter": [{
                    "name": "response",
                    "resource": {
                        "resourceType": "QuestionnaireResponse",
                        "id": format!("{id}-response"),
                        "meta": { "profile": [QUESTIONNAIRE_RESPONSE_PROFILE] },
                        "questionnaire": QUESTIONNAIRE,
                        "status": "completed",
                        "authored": today,
                        "item": serde_json::to_value(&items)?,
                    }
                }]
            },
            "request": {
                "method": "POST",
                "url": "QuestionnaireResponse/$generateHealthCertificate"
            }
        }]
    }))
}
