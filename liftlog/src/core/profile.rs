//! User profile and typed profile edits.
//!
//! Each editable field has its own input contract. Text input is parsed into
//! a [`ProfileEdit`] first, then applied to a [`UserProfile`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::set_input::lenient_number;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub weight_unit: WeightUnit,
    pub height_unit: HeightUnit,
    /// Body weight in `weight_unit`, one decimal.
    pub weight: Option<f64>,
    /// Height in `height_unit`.
    pub height: Option<u32>,
    pub sex: Option<Sex>,
    /// Argon2 hash of the password in PHC string form, salted per hash.
    /// Plaintext is never stored.
    pub password_hash: Option<String>,
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightUnit {
    #[default]
    Cm,
    Ft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// The editable profile fields. Unknown names are free-form `Other` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileField {
    Birthdate,
    Units,
    Weight,
    Height,
    Name,
    Sex,
    Password,
    Other(String),
}

impl FromStr for ProfileField {
    type Err = ProfileError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let field = match raw.trim() {
            "birthdate" => ProfileField::Birthdate,
            "units" => ProfileField::Units,
            "weight" => ProfileField::Weight,
            "height" => ProfileField::Height,
            "name" => ProfileField::Name,
            "sex" => ProfileField::Sex,
            "password" => ProfileField::Password,
            "" => return Err(ProfileError::EmptyFieldName),
            other => ProfileField::Other(other.strip_prefix("other:").unwrap_or(other).to_string()),
        };
        Ok(field)
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileField::Birthdate => f.write_str("birthdate"),
            ProfileField::Units => f.write_str("units"),
            ProfileField::Weight => f.write_str("weight"),
            ProfileField::Height => f.write_str("height"),
            ProfileField::Name => f.write_str("name"),
            ProfileField::Sex => f.write_str("sex"),
            ProfileField::Password => f.write_str("password"),
            ProfileField::Other(key) => write!(f, "other:{key}"),
        }
    }
}

/// A parsed, typed change to one profile field.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEdit {
    Birthdate(NaiveDate),
    Units {
        weight: WeightUnit,
        height: Option<HeightUnit>,
    },
    Weight(f64),
    Height(u32),
    Name(String),
    Sex(Sex),
    /// PHC string of the new password. Hashed at parse time.
    PasswordHash(String),
    Other { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile field name must not be empty")]
    EmptyFieldName,
    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: &'static str,
    },
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl ProfileEdit {
    /// Parse `value` under the input contract of `field`.
    pub fn parse(field: &ProfileField, value: &str) -> Result<Self, ProfileError> {
        let invalid = |reason: &'static str| ProfileError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason,
        };
        let trimmed = value.trim();
        let edit = match field {
            ProfileField::Birthdate => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(ProfileEdit::Birthdate)
                .map_err(|_| invalid("expected YYYY-MM-DD"))?,
            ProfileField::Units => parse_units(trimmed).ok_or_else(|| invalid("expected kg|lbs[,cm|ft]"))?,
            ProfileField::Weight => {
                let weight = lenient_number(trimmed).ok_or_else(|| invalid("expected a number"))?;
                ProfileEdit::Weight((weight * 10.0).round() / 10.0)
            }
            ProfileField::Height => {
                let height = lenient_number(trimmed).ok_or_else(|| invalid("expected a number"))?;
                ProfileEdit::Height(height.trunc() as u32)
            }
            ProfileField::Name => {
                if trimmed.is_empty() {
                    return Err(invalid("must not be blank"));
                }
                ProfileEdit::Name(trimmed.to_string())
            }
            ProfileField::Sex => match trimmed.to_ascii_lowercase().as_str() {
                "male" => ProfileEdit::Sex(Sex::Male),
                "female" => ProfileEdit::Sex(Sex::Female),
                "other" => ProfileEdit::Sex(Sex::Other),
                _ => return Err(invalid("expected male|female|other")),
            },
            ProfileField::Password => {
                if value.is_empty() {
                    return Err(invalid("must not be empty"));
                }
                ProfileEdit::PasswordHash(hash_password(value)?)
            }
            ProfileField::Other(key) => ProfileEdit::Other {
                key: key.clone(),
                value: value.to_string(),
            },
        };
        Ok(edit)
    }
}

fn hash_password(password: &str) -> Result<String, ProfileError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| ProfileError::Hashing(err.to_string()))?;
    Ok(hash.to_string())
}

fn parse_units(raw: &str) -> Option<ProfileEdit> {
    let lowered = raw.to_ascii_lowercase();
    let mut parts = lowered.split(',').map(str::trim);
    let weight = match parts.next()? {
        "kg" => WeightUnit::Kg,
        "lb" | "lbs" => WeightUnit::Lbs,
        _ => return None,
    };
    let height = match parts.next() {
        None => None,
        Some("cm") => Some(HeightUnit::Cm),
        Some("ft") => Some(HeightUnit::Ft),
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(ProfileEdit::Units { weight, height })
}

impl UserProfile {
    pub fn apply(&mut self, edit: ProfileEdit) {
        match edit {
            ProfileEdit::Birthdate(date) => self.birthdate = Some(date),
            ProfileEdit::Units { weight, height } => {
                self.weight_unit = weight;
                if let Some(height) = height {
                    self.height_unit = height;
                }
            }
            ProfileEdit::Weight(weight) => self.weight = Some(weight),
            ProfileEdit::Height(height) => self.height = Some(height),
            ProfileEdit::Name(name) => self.name = Some(name),
            ProfileEdit::Sex(sex) => self.sex = Some(sex),
            ProfileEdit::PasswordHash(hash) => self.password_hash = Some(hash),
            ProfileEdit::Other { key, value } => {
                self.other.insert(key, value);
            }
        }
    }

    /// Whether `password` matches the stored hash. False when no password is
    /// set or the stored hash cannot be parsed.
    pub fn verify_password(&self, password: &str) -> bool {
        let Some(stored) = self.password_hash.as_deref() else {
            return false;
        };
        PasswordHash::new(stored).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}
