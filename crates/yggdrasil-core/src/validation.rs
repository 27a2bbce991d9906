use crate::record::{canonical_key, EntityRecord};
use crate::types::{Attribute, Stage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_NAME_LEN: usize = 128;

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f]").unwrap());

/// Why a single record was excluded from construction. Rejections are
/// collected in the report; only a uniqueness conflict aborts the build.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("record has an empty canonical name")]
    EmptyName,

    #[error("name exceeds {MAX_NAME_LEN} characters")]
    NameTooLong,

    #[error("name contains control characters")]
    InvalidName,

    #[error("level '{value}' is not a known stage")]
    UnknownLevel { value: String },

    #[error("duplicate of an earlier identical record")]
    Duplicate,
}

/// A record that passed validation, with level and attribute mapped onto
/// the closed enumerations and references normalized to canonical keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidRecord {
    pub key: String,
    pub name: String,
    pub name_jp: Option<String>,
    pub stage: Stage,
    pub types: Vec<String>,
    pub attribute: Attribute,
    pub moves: Vec<String>,
    pub profile: Option<String>,
    pub evolves_from: Vec<String>,
    pub related: Vec<String>,
}

impl ValidRecord {
    /// Payload equality for duplicate detection; the display-name casing
    /// is not an attribute conflict.
    pub fn same_payload(&self, other: &ValidRecord) -> bool {
        self.stage == other.stage
            && self.types == other.types
            && self.attribute == other.attribute
            && self.moves == other.moves
            && self.profile == other.profile
            && self.name_jp == other.name_jp
            && self.evolves_from == other.evolves_from
            && self.related == other.related
    }
}

pub struct RecordValidator;

impl RecordValidator {
    pub fn validate(record: &EntityRecord, missing: &mut MissingFieldCounts) -> Result<ValidRecord, RejectReason> {
        let key = record.canonical_key();
        if key.is_empty() {
            return Err(RejectReason::EmptyName);
        }
        if record.name.len() > MAX_NAME_LEN {
            return Err(RejectReason::NameTooLong);
        }
        if CONTROL_CHARS.is_match(&record.name) {
            return Err(RejectReason::InvalidName);
        }

        let stage: Stage = record
            .level
            .parse()
            .map_err(|_| RejectReason::UnknownLevel {
                value: record.level.clone(),
            })?;

        let attribute = Attribute::parse_lossy(record.attribute.as_deref());
        if !attribute.is_known() {
            missing.attribute += 1;
        }

        let types: Vec<String> = record
            .types
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if types.is_empty() {
            missing.types += 1;
        }

        let moves: Vec<String> = record
            .moves
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if moves.is_empty() {
            missing.moves += 1;
        }

        if record.profile.as_deref().map_or(true, |p| p.trim().is_empty()) {
            missing.profile += 1;
        }
        if record.name_jp.is_none() {
            missing.name_jp += 1;
        }

        let normalize_refs = |refs: &[String]| -> Vec<String> {
            let mut out: Vec<String> = Vec::new();
            for r in refs {
                let k = canonical_key(r);
                // self-references and repeats are source noise
                if !k.is_empty() && k != key && !out.contains(&k) {
                    out.push(k);
                }
            }
            out
        };

        let evolves_from = normalize_refs(&record.evolves_from);
        let related = normalize_refs(&record.related);

        Ok(ValidRecord {
            key,
            name: record.name.trim().to_string(),
            name_jp: record.name_jp.clone(),
            stage,
            types,
            attribute,
            moves,
            profile: record.profile.clone().filter(|p| !p.trim().is_empty()),
            evolves_from,
            related,
        })
    }
}

/// Per-field missing-value counters for the validation report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFieldCounts {
    pub attribute: usize,
    pub types: usize,
    pub moves: usize,
    pub profile: usize,
    pub name_jp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub name: String,
    pub reason: RejectReason,
}

/// Structured outcome of the construction-time validation pass.
/// Rejections are surfaced here rather than aborting the rebuild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
    pub missing: MissingFieldCounts,
    /// Entities referenced by evolution/related links but absent from the
    /// record set; materialized as placeholder nodes.
    pub placeholders: usize,
    /// References dropped because placeholder creation was disabled.
    pub dangling_refs: usize,
}

impl ValidationReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn reject(&mut self, name: &str, reason: RejectReason) {
        self.rejected.push(RejectedRecord {
            name: name.to_string(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_record_maps_enumerations() {
        let mut missing = MissingFieldCounts::default();
        let record = EntityRecord::new("Agumon", "Rookie")
            .with_types(&["Reptile"])
            .with_attribute("Vaccine")
            .with_moves(&["Pepper Breath"]);
        let valid = RecordValidator::validate(&record, &mut missing).unwrap();

        assert_eq!(valid.key, "agumon");
        assert_eq!(valid.stage, Stage::Rookie);
        assert_eq!(valid.attribute, Attribute::Vaccine);
        assert_eq!(missing.attribute, 0);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut missing = MissingFieldCounts::default();
        let record = EntityRecord::new("   ", "Rookie");
        assert_eq!(
            RecordValidator::validate(&record, &mut missing).unwrap_err(),
            RejectReason::EmptyName
        );
    }

    #[test]
    fn unknown_level_is_rejected() {
        let mut missing = MissingFieldCounts::default();
        let record = EntityRecord::new("Weirdmon", "Armor");
        assert!(matches!(
            RecordValidator::validate(&record, &mut missing).unwrap_err(),
            RejectReason::UnknownLevel { .. }
        ));
    }

    #[test]
    fn missing_optional_fields_downgrade_and_count() {
        let mut missing = MissingFieldCounts::default();
        let record = EntityRecord::new("Numemon", "Champion");
        let valid = RecordValidator::validate(&record, &mut missing).unwrap();

        assert_eq!(valid.attribute, Attribute::Unknown);
        assert_eq!(missing.attribute, 1);
        assert_eq!(missing.types, 1);
        assert_eq!(missing.moves, 1);
        assert_eq!(missing.profile, 1);
    }

    #[test]
    fn payload_comparison_ignores_display_casing() {
        let mut missing = MissingFieldCounts::default();
        let a = RecordValidator::validate(&EntityRecord::new("Agumon", "Rookie"), &mut missing)
            .unwrap();
        let b = RecordValidator::validate(&EntityRecord::new("AGUMON", "Rookie"), &mut missing)
            .unwrap();
        let c = RecordValidator::validate(&EntityRecord::new("Agumon", "Champion"), &mut missing)
            .unwrap();
        assert!(a.same_payload(&b));
        assert!(!a.same_payload(&c));
    }

    #[test]
    fn self_and_repeated_references_are_dropped() {
        let mut missing = MissingFieldCounts::default();
        let record = EntityRecord::new("Agumon", "Rookie")
            .evolves_from("Koromon")
            .evolves_from("koromon")
            .evolves_from("Agumon");
        let valid = RecordValidator::validate(&record, &mut missing).unwrap();
        assert_eq!(valid.evolves_from, vec!["koromon"]);
    }
}
