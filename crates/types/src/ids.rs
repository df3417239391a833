//! Canonical identifiers.
//!
//! Every record in the triage engine is keyed by a UUID held in canonical form: **32 lowercase
//! hexadecimal characters** with no hyphens (`Uuid::simple()`). Identifiers arriving from outside
//! (REST bodies, path segments, catalog files) must already be canonical; anything else is
//! rejected rather than normalised, so the same record can never be addressed by two spellings.
//!
//! Each kind of identifier gets its own newtype so a symptom id can never be passed where a
//! disease id is expected.
//!
//! Consultation records are stored under a sharded directory derived from the id:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`, see [`ConsultationId::sharded_dir`].

use crate::TypesError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Returns true if `input` is a canonical identifier (32 lowercase hex characters).
pub fn is_canonical(input: &str) -> bool {
    input.len() == 32
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

macro_rules! canonical_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Builds an identifier from a raw 128-bit value. Mostly useful for fixtures.
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// Parses an identifier that must already be in canonical form.
            ///
            /// # Errors
            ///
            /// Returns [`TypesError::InvalidId`] for hyphenated, uppercase, short or non-hex input.
            pub fn parse(input: &str) -> Result<Self, TypesError> {
                if !is_canonical(input) {
                    return Err(TypesError::InvalidId {
                        kind: $kind,
                        value: input.to_owned(),
                    });
                }
                Uuid::parse_str(input)
                    .map(Self)
                    .map_err(|_| TypesError::InvalidId {
                        kind: $kind,
                        value: input.to_owned(),
                    })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

canonical_id!(
    /// Identifier of a catalog symptom.
    SymptomId,
    "symptom"
);
canonical_id!(
    /// Identifier of a catalog disease.
    DiseaseId,
    "disease"
);
canonical_id!(
    /// Identifier of a catalog recommendation.
    RecommendationId,
    "recommendation"
);
canonical_id!(
    /// Identifier of a consultation record.
    ConsultationId,
    "consultation"
);
canonical_id!(
    /// Identifier of a patient, as resolved by the identity layer.
    PatientId,
    "patient"
);
canonical_id!(
    /// Identifier of a doctor, as resolved by the identity layer.
    DoctorId,
    "doctor"
);

impl ConsultationId {
    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first two pairs of hex
    /// characters of the canonical id.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}
