//! Regression coverage for the verification state machine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::{
    AuditError, LocationPin, ProfileUpdate, ResidentDraft, ResidentId, pin_location,
};

#[fixture]
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn fresh(t0: DateTime<Utc>) -> Resident {
    Resident::new(ResidentDraft {
        id: ResidentId::new("R1").expect("valid id"),
        name: "Andres Bonifacio".to_owned(),
        email: "a@b.com".to_owned(),
        phone: String::new(),
        address: String::new(),
        date_registered: t0,
    })
}

fn with_status(mut resident: Resident, status: VerificationStatus) -> Resident {
    resident.verification_status = status;
    resident
}

fn fill_contact_details(resident: &mut Resident) {
    resident.apply_profile_update(ProfileUpdate {
        phone: Some("09171234567".to_owned()),
        address: Some("Tondo, Manila".to_owned()),
        ..ProfileUpdate::default()
    })
    .expect("valid update");
}

fn manila_pin() -> LocationPin {
    LocationPin {
        lat: 14.5995,
        lng: 120.9842,
        address: "123 Main St".to_owned(),
        accuracy: None,
    }
}

#[rstest]
fn incomplete_details_leave_resident_non_verified(mut fresh: Resident, t0: DateTime<Utc>) {
    let outcome = evaluate(&mut fresh, t0).expect("evaluate");

    assert!(outcome.is_none());
    assert_eq!(fresh.verification_status(), VerificationStatus::NonVerified);
    assert!(fresh.audit_trail().is_empty());
}

#[rstest]
fn completed_details_advance_with_one_entry(mut fresh: Resident, t0: DateTime<Utc>) {
    evaluate(&mut fresh, t0).expect("first evaluate");
    fill_contact_details(&mut fresh);

    let transition = evaluate(&mut fresh, t0 + Duration::minutes(1))
        .expect("evaluate")
        .expect("guard satisfied");

    assert_eq!(transition.from, VerificationStatus::NonVerified);
    assert_eq!(transition.to, VerificationStatus::DetailsUpdated);
    assert_eq!(fresh.verification_status(), VerificationStatus::DetailsUpdated);
    assert_eq!(fresh.audit_trail().len(), 1);
    let entry = fresh.audit_trail().last().expect("entry");
    assert_eq!(entry.previous_status(), Some(VerificationStatus::NonVerified));
    assert_eq!(entry.new_status(), Some(VerificationStatus::DetailsUpdated));
    assert_eq!(entry.action(), AuditAction::DetailsUpdated);
}

#[rstest]
fn whitespace_only_details_do_not_satisfy_guard(mut fresh: Resident, t0: DateTime<Utc>) {
    fresh.apply_profile_update(ProfileUpdate {
        phone: Some("   ".to_owned()),
        address: Some("Tondo".to_owned()),
        ..ProfileUpdate::default()
    })
    .expect("valid update");

    assert!(evaluate(&mut fresh, t0).expect("evaluate").is_none());
    assert_eq!(pending_requirements(&fresh), vec![Requirement::Phone]);
}

#[rstest]
fn evaluate_never_skips_a_state(mut fresh: Resident, t0: DateTime<Utc>) {
    fill_contact_details(&mut fresh);
    fresh
        .submit_government_id("philsys", "1234", t0)
        .expect("submit");
    fresh.mark_government_id_verified("philsys").expect("verify");
    pin_location(&mut fresh, manila_pin(), t0).expect("pin");

    let first = evaluate(&mut fresh, t0).expect("evaluate").expect("advance");
    assert_eq!(first.to, VerificationStatus::DetailsUpdated);

    let second = evaluate(&mut fresh, t0).expect("evaluate").expect("advance");
    assert_eq!(second.to, VerificationStatus::SemiVerified);
    assert_eq!(fresh.audit_trail().len(), 2);
}

#[rstest]
fn evaluate_is_idempotent_without_new_facts(mut fresh: Resident, t0: DateTime<Utc>) {
    fill_contact_details(&mut fresh);
    evaluate(&mut fresh, t0).expect("evaluate");
    let snapshot = fresh.clone();

    for minutes in 1..=3 {
        let outcome = evaluate(&mut fresh, t0 + Duration::minutes(minutes)).expect("evaluate");
        assert!(outcome.is_none());
    }
    assert_eq!(fresh, snapshot);
}

#[rstest]
fn details_updated_needs_location_and_verified_id(fresh: Resident, t0: DateTime<Utc>) {
    let mut resident = with_status(fresh, VerificationStatus::DetailsUpdated);
    fill_contact_details(&mut resident);

    assert!(evaluate(&mut resident, t0).expect("evaluate").is_none());
    assert_eq!(
        pending_requirements(&resident),
        vec![Requirement::VerifiedGovernmentId, Requirement::HouseLocation]
    );

    pin_location(&mut resident, manila_pin(), t0).expect("pin");
    assert!(evaluate(&mut resident, t0).expect("evaluate").is_none());

    resident
        .submit_government_id("passport", "P1234567", t0)
        .expect("submit");
    assert!(evaluate(&mut resident, t0).expect("evaluate").is_none());

    resident.mark_government_id_verified("passport").expect("verify");
    let transition = evaluate(&mut resident, t0)
        .expect("evaluate")
        .expect("advance");
    assert_eq!(transition.to, VerificationStatus::SemiVerified);
    assert_eq!(transition.entry.action(), AuditAction::SemiVerified);
}

#[rstest]
fn semi_verified_never_advances_automatically(fresh: Resident, t0: DateTime<Utc>) {
    let mut resident = with_status(fresh, VerificationStatus::SemiVerified);

    assert!(evaluate(&mut resident, t0).expect("evaluate").is_none());
    assert_eq!(
        pending_requirements(&resident),
        vec![Requirement::OfficialApproval]
    );
}

#[rstest]
fn approve_from_semi_verified_records_approver(fresh: Resident, t0: DateTime<Utc>) {
    let mut resident = with_status(fresh, VerificationStatus::SemiVerified);

    let transition = approve(&mut resident, "Official Santos", t0).expect("approve");

    assert_eq!(transition.to, VerificationStatus::Verified);
    assert_eq!(resident.verification_status(), VerificationStatus::Verified);
    let entry = resident.audit_trail().last().expect("entry");
    assert_eq!(entry.approved_by(), Some("Official Santos"));
    assert_eq!(entry.previous_status(), Some(VerificationStatus::SemiVerified));

    let second = approve(&mut resident, "Official Santos", t0);
    assert_eq!(
        second,
        Err(VerificationError::InvalidTransition {
            from: VerificationStatus::Verified
        })
    );
    assert_eq!(resident.audit_trail().len(), 1);
}

#[rstest]
#[case(VerificationStatus::NonVerified)]
#[case(VerificationStatus::DetailsUpdated)]
#[case(VerificationStatus::Verified)]
fn approve_fails_outside_semi_verified(
    fresh: Resident,
    t0: DateTime<Utc>,
    #[case] status: VerificationStatus,
) {
    let mut resident = with_status(fresh, status);
    let before = resident.clone();

    let result = approve(&mut resident, "Official Santos", t0);

    assert_eq!(result, Err(VerificationError::InvalidTransition { from: status }));
    assert_eq!(resident, before);
}

#[rstest]
#[case("")]
#[case("   ")]
fn approve_requires_named_approver(fresh: Resident, t0: DateTime<Utc>, #[case] actor: &str) {
    let mut resident = with_status(fresh, VerificationStatus::SemiVerified);

    let result = approve(&mut resident, actor, t0);

    assert_eq!(result, Err(VerificationError::MissingApprover));
    assert_eq!(resident.verification_status(), VerificationStatus::SemiVerified);
    assert!(resident.audit_trail().is_empty());
}

#[rstest]
fn skewed_clock_is_rejected_without_status_change(mut fresh: Resident, t0: DateTime<Utc>) {
    fill_contact_details(&mut fresh);
    evaluate(&mut fresh, t0).expect("evaluate");
    fresh
        .submit_government_id("philsys", "1234", t0)
        .expect("submit");
    fresh.mark_government_id_verified("philsys").expect("verify");
    pin_location(&mut fresh, manila_pin(), t0).expect("pin");

    let skewed = t0 - Duration::seconds(30);
    let result = evaluate(&mut fresh, skewed);

    assert_eq!(
        result,
        Err(VerificationError::OutOfOrderAudit(AuditError::OutOfOrder {
            last: t0,
            attempted: skewed,
        }))
    );
    assert_eq!(fresh.verification_status(), VerificationStatus::DetailsUpdated);
    assert_eq!(fresh.audit_trail().len(), 1);
}
