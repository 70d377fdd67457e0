//! Lenient parsing and validation of user-entered set fields.
//!
//! Input arrives as free text. Anything with a leading number is accepted
//! (`"100kg"` reads as 100); blank or non-numeric text counts as missing.
//! Missing fields are either rejected or, once the user confirms, saved as 0.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::types::{MissingFieldPolicy, SetField, SetValues};

static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))").unwrap());

/// Raw, possibly incomplete values for one set as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetDraft {
    pub kgs: String,
    pub reps: String,
    pub sets: String,
    pub rest: u32,
}

/// A blank field at a given set position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingField {
    pub set_index: usize,
    pub field: SetField,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set {} {}", self.set_index, self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("incomplete fields ({}); confirm to save them as 0", describe(.missing))]
    Incomplete { missing: Vec<MissingField> },
}

fn describe(missing: &[MissingField]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SetDraft {
    /// Pre-fill a draft from existing values.
    pub fn from_values(values: SetValues) -> Self {
        Self {
            kgs: values.kgs.to_string(),
            reps: values.reps.to_string(),
            sets: values.sets.to_string(),
            rest: values.rest,
        }
    }

    /// An empty draft, as produced by "add set".
    pub fn blank(rest: u32) -> Self {
        Self {
            rest,
            ..Self::default()
        }
    }

    pub fn missing_fields(&self) -> Vec<SetField> {
        let mut missing = Vec::new();
        if lenient_number(&self.kgs).is_none() {
            missing.push(SetField::Kgs);
        }
        if lenient_number(&self.reps).is_none() {
            missing.push(SetField::Reps);
        }
        if lenient_number(&self.sets).is_none() {
            missing.push(SetField::Sets);
        }
        missing
    }

    /// Turn the draft into concrete values according to `policy`.
    ///
    /// `set_index` only labels the error.
    pub fn resolve(
        &self,
        set_index: usize,
        policy: MissingFieldPolicy,
    ) -> Result<SetValues, ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() && policy == MissingFieldPolicy::Reject {
            return Err(ValidationError::Incomplete {
                missing: missing
                    .into_iter()
                    .map(|field| MissingField { set_index, field })
                    .collect(),
            });
        }
        Ok(SetValues {
            kgs: lenient_number(&self.kgs).unwrap_or(0.0),
            reps: lenient_count(&self.reps),
            sets: lenient_count(&self.sets),
            rest: self.rest,
        })
    }
}

/// Resolve every draft of an exercise, reporting all blank fields at once.
pub fn resolve_all(
    drafts: &[SetDraft],
    policy: MissingFieldPolicy,
) -> Result<Vec<SetValues>, ValidationError> {
    let mut missing = Vec::new();
    let mut resolved = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.iter().enumerate() {
        match draft.resolve(index, policy) {
            Ok(values) => resolved.push(values),
            Err(ValidationError::Incomplete { missing: fields }) => missing.extend(fields),
        }
    }
    if !missing.is_empty() {
        return Err(ValidationError::Incomplete { missing });
    }
    Ok(resolved)
}

/// Leading-number parse: `" 7.5 kg"` → 7.5, `"abc"` → `None`. Negatives clamp to 0.
pub fn lenient_number(raw: &str) -> Option<f64> {
    let captures = NUMBER_PREFIX.captures(raw)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.max(0.0))
}

fn lenient_count(raw: &str) -> u32 {
    // `as` saturates for out-of-range floats.
    lenient_number(raw).map_or(0, |value| value.trunc() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kgs: &str, reps: &str, sets: &str, rest: u32) -> SetDraft {
        SetDraft {
            kgs: kgs.to_string(),
            reps: reps.to_string(),
            sets: sets.to_string(),
            rest,
        }
    }

    #[test]
    fn lenient_number_reads_leading_digits() {
        assert_eq!(lenient_number("100kg"), Some(100.0));
        assert_eq!(lenient_number(" 7.5 "), Some(7.5));
        assert_eq!(lenient_number(".5"), Some(0.5));
        assert_eq!(lenient_number("-20"), Some(0.0));
        assert_eq!(lenient_number("0"), Some(0.0));
        assert_eq!(lenient_number(""), None);
        assert_eq!(lenient_number("heavy"), None);
    }

    #[test]
    fn resolve_truncates_counts() {
        let values = draft("62.5", "8.9", "3 sets", 75)
            .resolve(0, MissingFieldPolicy::Reject)
            .expect("resolve");
        assert_eq!(
            values,
            SetValues {
                kgs: 62.5,
                reps: 8,
                sets: 3,
                rest: 75,
            }
        );
    }

    #[test]
    fn reject_reports_each_blank_field() {
        let err = draft("", "5", "x", 60)
            .resolve(2, MissingFieldPolicy::Reject)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Incomplete {
                missing: vec![
                    MissingField {
                        set_index: 2,
                        field: SetField::Kgs,
                    },
                    MissingField {
                        set_index: 2,
                        field: SetField::Sets,
                    },
                ],
            }
        );
        assert!(err.to_string().contains("set 2 kgs"));
    }

    #[test]
    fn default_to_zero_fills_blanks_but_keeps_rest() {
        let values = draft("", "", "", 45)
            .resolve(0, MissingFieldPolicy::DefaultToZero)
            .expect("resolve");
        assert_eq!(
            values,
            SetValues {
                kgs: 0.0,
                reps: 0,
                sets: 0,
                rest: 45,
            }
        );
    }

    #[test]
    fn resolve_all_collects_across_sets() {
        let drafts = vec![draft("100", "5", "3", 90), SetDraft::blank(60)];
        let err = resolve_all(&drafts, MissingFieldPolicy::Reject).unwrap_err();
        let ValidationError::Incomplete { missing } = err;
        assert_eq!(missing.len(), 3);
        assert!(missing.iter().all(|field| field.set_index == 1));

        let resolved = resolve_all(&drafts, MissingFieldPolicy::DefaultToZero).expect("resolve");
        assert_eq!(resolved[1].rest, 60);
        assert_eq!(resolved[1].sets, 0);
    }

    #[test]
    fn from_values_round_trips_through_resolve() {
        let values = SetValues {
            kgs: 100.0,
            reps: 5,
            sets: 3,
            rest: 90,
        };
        let resolved = SetDraft::from_values(values)
            .resolve(0, MissingFieldPolicy::Reject)
            .expect("resolve");
        assert_eq!(resolved, values);
    }
}
