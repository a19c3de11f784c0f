//! Built-in chunk processors.
//!
//! The `patients` processor is a dry-run validator: it classifies each
//! record through the shared field validators without touching any remote
//! system, which is how a migration file is vetted before the real push.
//! Production processors that construct payloads and submit them register
//! here alongside it.

use std::sync::Arc;

use async_trait::async_trait;
use fhirmig_core::validate::{
    validate_boolean, validate_date, validate_email, validate_phone_number, validate_postal_code,
    validate_required, validate_state_code,
};
use fhirmig_core::{Record, RecordError, RecordOutcome};
use fhirmig_engine::{Chunk, ChunkContext, ChunkError, ChunkProcessor, Mode, ProcessorRegistry};

const SEX_CODES: &[&str] = &["M", "MALE", "F", "FEMALE", "OTH", "OTHER", "UNK", "UNKNOWN"];

/// Builds the registry of processors this binary ships with.
pub fn default_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    registry.register("patients", Arc::new(ValidatePatientsProcessor));
    registry
}

/// Validates patient rows chunk by chunk, without remote submission.
#[derive(Debug)]
pub struct ValidatePatientsProcessor;

#[async_trait]
impl ChunkProcessor for ValidatePatientsProcessor {
    async fn process(&self, ctx: &ChunkContext, chunk: &Chunk) -> Result<(), ChunkError> {
        tracing::info!(
            chunk = %ctx.display(),
            records = chunk.record_count(),
            "Validating patients"
        );
        for record in chunk.records() {
            ctx.classify(&record.id, validate_patient(record, ctx.mode))
                .await;
        }
        Ok(())
    }
}

fn validate_patient(record: &Record, mode: Mode) -> Result<RecordOutcome, RecordError> {
    if record.fields.is_empty() {
        return Ok(RecordOutcome::Ignored("record has no payload fields".into()));
    }

    let field = |name: &str| record.field_str(name).unwrap_or_default();

    validate_required(field("First Name"), "First Name").map_err(RecordError::new)?;
    validate_required(field("Last Name"), "Last Name").map_err(RecordError::new)?;
    let dob = validate_required(field("Date of Birth"), "Date of Birth")
        .map_err(RecordError::new)?;
    validate_date(&dob, "Date of Birth").map_err(RecordError::new)?;

    let sex = field("Sex at Birth");
    if !sex.is_empty() && !SEX_CODES.contains(&sex.to_uppercase().as_str()) {
        return Err(RecordError::new(format!("Invalid Sex at Birth: {sex}")));
    }

    validate_state_code(field("State"), "State").map_err(RecordError::new)?;
    validate_postal_code(field("Postal Code"), "Postal Code").map_err(RecordError::new)?;
    validate_phone_number(field("Mobile Phone Number"), "Mobile Phone Number")
        .map_err(RecordError::new)?;
    validate_phone_number(field("Home Phone Number"), "Home Phone Number")
        .map_err(RecordError::new)?;
    validate_email(field("Email"), "Email").map_err(RecordError::new)?;
    validate_boolean(field("Mobile Text Consent"), "Mobile Text Consent")
        .map_err(RecordError::new)?;

    match mode {
        Mode::Create => Ok(RecordOutcome::Created("passed validation".into())),
        Mode::Update => Ok(RecordOutcome::Updated("revalidated for update".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: &str) -> Record {
        Record::new(id)
            .with_field("First Name", "Ada")
            .with_field("Last Name", "Lovelace")
            .with_field("Date of Birth", "12/10/1815")
    }

    #[test]
    fn test_complete_patient_passes() {
        let outcome = validate_patient(&patient("r1"), Mode::Create).unwrap();
        assert_eq!(outcome, RecordOutcome::Created("passed validation".into()));
    }

    #[test]
    fn test_update_mode_reports_updated() {
        let outcome = validate_patient(&patient("r1"), Mode::Update).unwrap();
        assert!(matches!(outcome, RecordOutcome::Updated(_)));
    }

    #[test]
    fn test_empty_record_is_ignored() {
        let outcome = validate_patient(&Record::new("r1"), Mode::Create).unwrap();
        assert!(matches!(outcome, RecordOutcome::Ignored(_)));
    }

    #[test]
    fn test_missing_name_errors() {
        let record = Record::new("r1").with_field("Date of Birth", "1990-01-01");
        let err = validate_patient(&record, Mode::Create).unwrap_err();
        assert_eq!(err.message, "Data is missing First Name");
    }

    #[test]
    fn test_bad_date_errors() {
        let record = patient("r1").with_field("Date of Birth", "soon");
        let err = validate_patient(&record, Mode::Create).unwrap_err();
        assert!(err.message.contains("Date of Birth"));
    }

    #[test]
    fn test_bad_sex_code_errors() {
        let record = patient("r1").with_field("Sex at Birth", "X");
        let err = validate_patient(&record, Mode::Create).unwrap_err();
        assert_eq!(err.message, "Invalid Sex at Birth: X");
    }

    #[test]
    fn test_optional_contact_fields_validated() {
        let record = patient("r1").with_field("Mobile Phone Number", "123");
        assert!(validate_patient(&record, Mode::Create).is_err());

        let record = patient("r2").with_field("Email", "not-an-email");
        assert!(validate_patient(&record, Mode::Create).is_err());

        let record = patient("r3")
            .with_field("Mobile Phone Number", "+1 617 555 0199")
            .with_field("Email", "ada@example.org")
            .with_field("State", "ma")
            .with_field("Postal Code", "02139-4301")
            .with_field("Mobile Text Consent", "T");
        assert!(validate_patient(&record, Mode::Create).is_ok());
    }

    #[test]
    fn test_default_registry_knows_patients() {
        let registry = default_registry();
        assert!(registry.get("patients").is_ok());
        assert!(registry.get("plan_command").is_err());
    }
}
