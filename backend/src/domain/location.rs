//! Household location pins used as a verification input.
//!
//! Pinning replaces the resident's location and reports that the location
//! guard is now satisfied. It never changes the verification status itself;
//! the state machine picks the new fact up on its next evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resident::Resident;

/// Validation errors raised while pinning or confirming a location.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("latitude must be within [-90, 90] (got {lat})")]
    LatitudeOutOfRange { lat: f64 },
    #[error("longitude must be within [-180, 180] (got {lng})")]
    LongitudeOutOfRange { lng: f64 },
    #[error("location address must not be empty")]
    EmptyAddress,
    #[error("location accuracy must be finite and non-negative (got {accuracy})")]
    InvalidAccuracy { accuracy: f64 },
    #[error("no household location has been pinned")]
    NoLocationPinned,
    #[error("confirming official must not be empty")]
    MissingVerifier,
}

impl LocationError {
    /// Whether the error concerns the pin itself rather than who confirmed it.
    pub fn is_invalid_location(&self) -> bool {
        !matches!(self, Self::MissingVerifier)
    }
}

/// Guard inputs a mutation has just satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardSignal {
    /// A valid household location is now present.
    LocationSatisfied,
}

/// A geocoded pin submitted by the resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPin {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// Authoritative household location for a resident.
///
/// ## Invariants
/// - `lat` is finite and within `[-90, 90]`.
/// - `lng` is finite and within `[-180, 180]`.
/// - `address` is non-empty once trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "HouseLocationDto", into = "HouseLocationDto")]
pub struct HouseLocation {
    lat: f64,
    lng: f64,
    address: String,
    accuracy: Option<f64>,
    timestamp: DateTime<Utc>,
    verified_by: Option<String>,
    verification_date: Option<DateTime<Utc>>,
}

impl HouseLocation {
    /// Validate a pin and stamp it with `timestamp`.
    pub fn new(pin: LocationPin, timestamp: DateTime<Utc>) -> Result<Self, LocationError> {
        let LocationPin {
            lat,
            lng,
            address,
            accuracy,
        } = pin;

        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(LocationError::LatitudeOutOfRange { lat });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(LocationError::LongitudeOutOfRange { lng });
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(LocationError::EmptyAddress);
        }
        if let Some(accuracy) = accuracy.filter(|value| !value.is_finite() || *value < 0.0) {
            return Err(LocationError::InvalidAccuracy { accuracy });
        }

        Ok(Self {
            lat,
            lng,
            address: address.to_owned(),
            accuracy,
            timestamp,
            verified_by: None,
            verification_date: None,
        })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    /// Reported GPS accuracy in metres.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// When the pin was placed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn verified_by(&self) -> Option<&str> {
        self.verified_by.as_deref()
    }

    pub fn verification_date(&self) -> Option<DateTime<Utc>> {
        self.verification_date
    }
}

/// Replace the resident's household location with a validated pin.
///
/// The resident is left untouched on error.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use resident_id::domain::{
///     GuardSignal, LocationPin, Resident, ResidentDraft, ResidentId, VerificationStatus,
///     pin_location,
/// };
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
/// let mut resident = Resident::new(ResidentDraft {
///     id: ResidentId::new("R1").unwrap(),
///     name: "Juan".into(),
///     email: "juan@example.ph".into(),
///     phone: String::new(),
///     address: String::new(),
///     date_registered: now,
/// });
/// let pin = LocationPin {
///     lat: 14.5995,
///     lng: 120.9842,
///     address: "123 Main St".into(),
///     accuracy: None,
/// };
/// let signal = pin_location(&mut resident, pin, now).unwrap();
/// assert_eq!(signal, GuardSignal::LocationSatisfied);
/// assert_eq!(resident.verification_status(), VerificationStatus::NonVerified);
/// ```
pub fn pin_location(
    resident: &mut Resident,
    pin: LocationPin,
    now: DateTime<Utc>,
) -> Result<GuardSignal, LocationError> {
    let location = HouseLocation::new(pin, now)?;
    resident.house_location = Some(location);
    Ok(GuardSignal::LocationSatisfied)
}

/// Record that an official checked the current household pin.
pub fn confirm_location(
    resident: &mut Resident,
    official: &str,
    now: DateTime<Utc>,
) -> Result<(), LocationError> {
    let official = official.trim();
    if official.is_empty() {
        return Err(LocationError::MissingVerifier);
    }
    let location = resident
        .house_location
        .as_mut()
        .ok_or(LocationError::NoLocationPinned)?;
    location.verified_by = Some(official.to_owned());
    location.verification_date = Some(now);
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HouseLocationDto {
    lat: f64,
    lng: f64,
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification_date: Option<DateTime<Utc>>,
}

impl From<HouseLocation> for HouseLocationDto {
    fn from(value: HouseLocation) -> Self {
        Self {
            lat: value.lat,
            lng: value.lng,
            address: value.address,
            accuracy: value.accuracy,
            timestamp: value.timestamp,
            verified_by: value.verified_by,
            verification_date: value.verification_date,
        }
    }
}

impl TryFrom<HouseLocationDto> for HouseLocation {
    type Error = LocationError;

    fn try_from(value: HouseLocationDto) -> Result<Self, Self::Error> {
        let mut location = HouseLocation::new(
            LocationPin {
                lat: value.lat,
                lng: value.lng,
                address: value.address,
                accuracy: value.accuracy,
            },
            value.timestamp,
        )?;
        location.verified_by = value.verified_by;
        location.verification_date = value.verification_date;
        Ok(location)
    }
}
