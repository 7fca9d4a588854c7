//! Regression coverage for the resident aggregate.

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn resident() -> Resident {
    let registered = Utc
        .with_ymd_and_hms(2024, 1, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp");
    Resident::new(ResidentDraft {
        id: ResidentId::new("R1").expect("valid id"),
        name: "Maria Clara".to_owned(),
        email: " Maria@Example.PH ".to_owned(),
        phone: String::new(),
        address: String::new(),
        date_registered: registered,
    })
}

#[rstest]
#[case("")]
#[case("   ")]
fn resident_id_rejects_blank(#[case] raw: &str) {
    assert_eq!(ResidentId::new(raw), Err(ResidentValidationError::EmptyId));
}

#[rstest]
fn resident_id_rejects_inner_whitespace() {
    assert_eq!(
        ResidentId::new("R 1"),
        Err(ResidentValidationError::IdContainsWhitespace)
    );
}

#[rstest]
fn new_resident_starts_unverified_and_unsaved(resident: Resident) {
    assert_eq!(resident.verification_status(), VerificationStatus::NonVerified);
    assert!(resident.qr_code().is_none());
    assert!(resident.audit_trail().is_empty());
    assert_eq!(resident.revision(), 0);
    assert_eq!(resident.email(), "maria@example.ph");
}

#[rstest]
fn status_labels_round_trip_through_from_str() {
    for status in VerificationStatus::ALL {
        let parsed: VerificationStatus = status.as_str().parse().expect("known label");
        assert_eq!(parsed, status);
    }
    assert!("pending".parse::<VerificationStatus>().is_err());
}

#[rstest]
fn status_serialises_kebab_case() {
    let value = serde_json::to_value(VerificationStatus::SemiVerified).expect("serialise");
    assert_eq!(value, "semi-verified");
}

#[rstest]
fn next_walks_the_progression_once() {
    assert_eq!(
        VerificationStatus::NonVerified.next(),
        Some(VerificationStatus::DetailsUpdated)
    );
    assert_eq!(VerificationStatus::Verified.next(), None);
}

#[rstest]
fn profile_update_keeps_unset_fields(mut resident: Resident) {
    resident.apply_profile_update(ProfileUpdate {
        phone: Some("09171234567".to_owned()),
        occupation: Some("Teacher".to_owned()),
        ..ProfileUpdate::default()
    })
    .expect("valid update");

    assert_eq!(resident.phone(), "09171234567");
    assert_eq!(resident.occupation(), Some("Teacher"));
    assert_eq!(resident.name(), "Maria Clara");
    assert_eq!(resident.address(), "");
}

#[rstest]
fn profile_update_never_touches_verification_facts(mut resident: Resident) {
    resident.qr_code = Some(PermanentId::from_raw("BRG_R1_20240101".to_owned()));
    resident.verification_status = VerificationStatus::DetailsUpdated;

    resident.apply_profile_update(ProfileUpdate {
        name: Some("Maria C. Ibarra".to_owned()),
        date_registered: Some(Utc::now()),
        ..ProfileUpdate::default()
    })
    .expect("valid update");

    assert_eq!(
        resident.qr_code().map(PermanentId::as_str),
        Some("BRG_R1_20240101")
    );
    assert_eq!(
        resident.verification_status(),
        VerificationStatus::DetailsUpdated
    );
}

#[rstest]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
#[case(-1.0)]
fn profile_update_rejects_unusable_income(mut resident: Resident, #[case] income: f64) {
    let before = resident.clone();

    let result = resident.apply_profile_update(ProfileUpdate {
        phone: Some("09171234567".to_owned()),
        monthly_income: Some(income),
        ..ProfileUpdate::default()
    });

    assert_eq!(result, Err(ResidentValidationError::InvalidMonthlyIncome));
    assert_eq!(resident, before);
}

#[rstest]
fn government_id_submission_starts_unverified(mut resident: Resident) {
    resident
        .submit_government_id("PhilSys", " 1234-5678 ", Utc::now())
        .expect("valid submission");

    let entry = resident.government_ids().get("philsys").expect("entry stored");
    assert_eq!(entry.number(), "1234-5678");
    assert!(!entry.is_verified());
    assert!(!resident.has_verified_government_id());
}

#[rstest]
fn marking_unknown_government_id_fails(mut resident: Resident) {
    let result = resident.mark_government_id_verified("passport");
    assert_eq!(
        result,
        Err(ResidentValidationError::UnknownGovernmentId {
            kind: "passport".to_owned()
        })
    );
}

#[rstest]
fn resubmission_resets_review_state(mut resident: Resident) {
    resident
        .submit_government_id("passport", "P1", Utc::now())
        .expect("submit");
    resident
        .mark_government_id_verified("passport")
        .expect("verify");
    assert!(resident.has_verified_government_id());

    resident
        .submit_government_id("passport", "P2", Utc::now())
        .expect("resubmit");
    assert!(!resident.has_verified_government_id());
}

#[rstest]
#[case("", "123", ResidentValidationError::EmptyGovernmentIdKind)]
#[case("sss", "  ", ResidentValidationError::EmptyGovernmentIdNumber)]
fn government_id_submission_validates_inputs(
    mut resident: Resident,
    #[case] kind: &str,
    #[case] number: &str,
    #[case] expected: ResidentValidationError,
) {
    let result = resident.submit_government_id(kind, number, Utc::now());
    assert_eq!(result, Err(expected));
    assert!(resident.government_ids().is_empty());
}
