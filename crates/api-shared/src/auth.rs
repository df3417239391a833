//! Caller identity.
//!
//! Authentication happens upstream of this service. By the time a request arrives the gateway has
//! resolved the caller and forwards it in two headers:
//! - [`ACTOR_ID_HEADER`]: canonical 32-hex id of the caller
//! - [`ACTOR_ROLE_HEADER`]: `patient` or `doctor`
//!
//! This module only parses those values and answers role questions.

use std::fmt;
use std::str::FromStr;
use triage_types::{DoctorId, PatientId};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// Identity headers missing or malformed.
    #[error("{0}")]
    Unauthenticated(String),
    /// Identity is valid but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(AuthError::Unauthenticated(format!("unknown actor role '{other}'"))),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    Patient(PatientId),
    Doctor(DoctorId),
}

impl Actor {
    /// Builds an actor from raw header values.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] if either value is missing, the role is unknown or
    /// the id is not canonical.
    pub fn from_headers(id: Option<&str>, role: Option<&str>) -> Result<Self, AuthError> {
        let id = id
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::Unauthenticated(format!("missing {ACTOR_ID_HEADER} header")))?;
        let role: Role = role
            .ok_or_else(|| {
                AuthError::Unauthenticated(format!("missing {ACTOR_ROLE_HEADER} header"))
            })?
            .parse()?;

        let invalid = |_| AuthError::Unauthenticated(format!("invalid actor id '{id}'"));
        Ok(match role {
            Role::Patient => Actor::Patient(PatientId::parse(id).map_err(invalid)?),
            Role::Doctor => Actor::Doctor(DoctorId::parse(id).map_err(invalid)?),
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Patient(_) => Role::Patient,
            Actor::Doctor(_) => Role::Doctor,
        }
    }

    /// The doctor's id, or [`AuthError::Forbidden`] for any other role.
    pub fn require_doctor(&self) -> Result<DoctorId, AuthError> {
        match self {
            Actor::Doctor(id) => Ok(*id),
            Actor::Patient(_) => Err(AuthError::Forbidden(
                "this action is reserved for doctors".into(),
            )),
        }
    }

    /// Doctors see every consultation; patients only their own.
    pub fn ensure_can_view(&self, owner: PatientId) -> Result<(), AuthError> {
        match self {
            Actor::Doctor(_) => Ok(()),
            Actor::Patient(id) if *id == owner => Ok(()),
            Actor::Patient(_) => Err(AuthError::Forbidden(
                "consultation belongs to another patient".into(),
            )),
        }
    }

    /// Resolves who a new consultation is for.
    ///
    /// A patient always files for themselves; naming someone else is forbidden. A doctor files on
    /// behalf of a patient and must name them.
    pub fn consultation_owner(&self, requested: Option<PatientId>) -> Result<PatientId, AuthError> {
        match (self, requested) {
            (Actor::Patient(id), None) => Ok(*id),
            (Actor::Patient(id), Some(other)) if other == *id => Ok(*id),
            (Actor::Patient(_), Some(_)) => Err(AuthError::Forbidden(
                "patients can only open consultations for themselves".into(),
            )),
            (Actor::Doctor(_), Some(patient)) => Ok(patient),
            (Actor::Doctor(_), None) => Err(AuthError::Forbidden(
                "doctors must name the patient (patientId)".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn parses_both_roles() {
        assert_eq!(
            Actor::from_headers(Some(ID), Some("doctor")).unwrap().role(),
            Role::Doctor
        );
        assert_eq!(
            Actor::from_headers(Some(ID), Some(" Patient ")).unwrap().role(),
            Role::Patient
        );
    }

    #[test]
    fn missing_or_malformed_identity_is_unauthenticated() {
        for (id, role) in [
            (None, Some("doctor")),
            (Some(ID), None),
            (Some("   "), Some("doctor")),
            (Some(ID), Some("nurse")),
            (Some("0123456789ABCDEF0123456789ABCDEF"), Some("doctor")),
            (Some("01234567-89ab-cdef-0123-456789abcdef"), Some("patient")),
        ] {
            assert!(matches!(
                Actor::from_headers(id, role),
                Err(AuthError::Unauthenticated(_))
            ));
        }
    }

    #[test]
    fn only_doctors_pass_the_doctor_gate() {
        let patient = Actor::Patient(PatientId::from_u128(1));
        let doctor = Actor::Doctor(DoctorId::from_u128(2));
        assert!(matches!(patient.require_doctor(), Err(AuthError::Forbidden(_))));
        assert_eq!(doctor.require_doctor().unwrap(), DoctorId::from_u128(2));
    }

    #[test]
    fn patients_see_only_their_own_consultations() {
        let me = PatientId::from_u128(1);
        let patient = Actor::Patient(me);
        assert!(patient.ensure_can_view(me).is_ok());
        assert!(patient.ensure_can_view(PatientId::from_u128(9)).is_err());
        assert!(Actor::Doctor(DoctorId::from_u128(2))
            .ensure_can_view(PatientId::from_u128(9))
            .is_ok());
    }

    #[test]
    fn consultation_owner_rules() {
        let me = PatientId::from_u128(1);
        let other = PatientId::from_u128(2);
        let patient = Actor::Patient(me);
        let doctor = Actor::Doctor(DoctorId::from_u128(3));

        assert_eq!(patient.consultation_owner(None).unwrap(), me);
        assert_eq!(patient.consultation_owner(Some(me)).unwrap(), me);
        assert!(patient.consultation_owner(Some(other)).is_err());
        assert_eq!(doctor.consultation_owner(Some(other)).unwrap(), other);
        assert!(doctor.consultation_owner(None).is_err());
    }
}
