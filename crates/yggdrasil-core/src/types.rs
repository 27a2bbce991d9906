use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense node index, assigned in deterministic order during construction.
pub type NodeId = u32;
pub type EdgeId = u64;

/// Evolution stage, ordered 1-6. The closed enumeration every record's
/// level must map to; anything else fails validation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Stage {
    BabyI,
    BabyII,
    Rookie,
    Champion,
    Ultimate,
    Mega,
}

impl Stage {
    /// Number of ordered stages; also the depth bound for chain enumeration.
    pub const COUNT: usize = 6;

    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::BabyI => 1,
            Stage::BabyII => 2,
            Stage::Rookie => 3,
            Stage::Champion => 4,
            Stage::Ultimate => 5,
            Stage::Mega => 6,
        }
    }

    pub fn all() -> [Stage; Stage::COUNT] {
        [
            Stage::BabyI,
            Stage::BabyII,
            Stage::Rookie,
            Stage::Champion,
            Stage::Ultimate,
            Stage::Mega,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::BabyI => "Baby I",
            Stage::BabyII => "Baby II",
            Stage::Rookie => "Rookie",
            Stage::Champion => "Champion",
            Stage::Ultimate => "Ultimate",
            Stage::Mega => "Mega",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Baby" alone is what the translation table emits for records that
        // don't distinguish Baby I from Baby II.
        match s.trim().to_lowercase().as_str() {
            "baby i" | "baby 1" | "baby" => Ok(Stage::BabyI),
            "baby ii" | "baby 2" => Ok(Stage::BabyII),
            "rookie" => Ok(Stage::Rookie),
            "champion" => Ok(Stage::Champion),
            "ultimate" => Ok(Stage::Ultimate),
            "mega" => Ok(Stage::Mega),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}

/// Fixed attribute enumeration. Missing or unrecognized values downgrade to
/// `Unknown` instead of failing validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Vaccine,
    Virus,
    Data,
    Free,
    Unknown,
}

impl Attribute {
    pub fn parse_lossy(value: Option<&str>) -> Self {
        match value {
            Some(s) => s.parse().unwrap_or(Attribute::Unknown),
            None => Attribute::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Attribute::Unknown)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Attribute::Vaccine => "Vaccine",
            Attribute::Virus => "Virus",
            Attribute::Data => "Data",
            Attribute::Free => "Free",
            Attribute::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vaccine" => Ok(Attribute::Vaccine),
            "virus" => Ok(Attribute::Virus),
            "data" => Ok(Attribute::Data),
            "free" => Ok(Attribute::Free),
            "unknown" => Ok(Attribute::Unknown),
            other => Err(format!("unknown attribute: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Digimon,
    Level,
    Type,
    Attribute,
    Move,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Digimon => "digimon",
            NodeKind::Level => "level",
            NodeKind::Type => "type",
            NodeKind::Attribute => "attribute",
            NodeKind::Move => "move",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    HasLevel,
    HasType,
    HasAttribute,
    CanUse,
    EvolvesFrom,
    RelatedTo,
    SharesType,
    SharesAttribute,
    SharesLevel,
    SharesMove,
}

impl EdgeKind {
    /// Derived edges are recomputed from population statistics on every
    /// rebuild; they never come from source data.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            EdgeKind::SharesType
                | EdgeKind::SharesAttribute
                | EdgeKind::SharesLevel
                | EdgeKind::SharesMove
        )
    }

    /// Edges between two Digimon nodes, as opposed to entity-to-category.
    pub fn is_entity_edge(&self) -> bool {
        matches!(self, EdgeKind::EvolvesFrom | EdgeKind::RelatedTo) || self.is_derived()
    }

    /// Derived shares-* edges are undirected (stored once with from < to).
    pub fn is_directed(&self) -> bool {
        !self.is_derived()
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKind::HasLevel => "has_level",
            EdgeKind::HasType => "has_type",
            EdgeKind::HasAttribute => "has_attribute",
            EdgeKind::CanUse => "can_use",
            EdgeKind::EvolvesFrom => "evolves_from",
            EdgeKind::RelatedTo => "related_to",
            EdgeKind::SharesType => "shares_type",
            EdgeKind::SharesAttribute => "shares_attribute",
            EdgeKind::SharesLevel => "shares_level",
            EdgeKind::SharesMove => "shares_move",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "has_level" => Ok(EdgeKind::HasLevel),
            "has_type" => Ok(EdgeKind::HasType),
            "has_attribute" => Ok(EdgeKind::HasAttribute),
            "can_use" => Ok(EdgeKind::CanUse),
            "evolves_from" => Ok(EdgeKind::EvolvesFrom),
            "related_to" => Ok(EdgeKind::RelatedTo),
            "shares_type" => Ok(EdgeKind::SharesType),
            "shares_attribute" => Ok(EdgeKind::SharesAttribute),
            "shares_level" => Ok(EdgeKind::SharesLevel),
            "shares_move" => Ok(EdgeKind::SharesMove),
            other => Err(format!("unknown edge kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering_matches_ordinals() {
        let all = Stage::all();
        for pair in all.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
    }

    #[test]
    fn stage_parses_translation_table_forms() {
        assert_eq!("Baby I".parse::<Stage>().unwrap(), Stage::BabyI);
        assert_eq!("baby".parse::<Stage>().unwrap(), Stage::BabyI);
        assert_eq!("Baby II".parse::<Stage>().unwrap(), Stage::BabyII);
        assert_eq!("MEGA".parse::<Stage>().unwrap(), Stage::Mega);
        assert!("Armor".parse::<Stage>().is_err());
    }

    #[test]
    fn attribute_downgrades_to_unknown() {
        assert_eq!(Attribute::parse_lossy(Some("Vaccine")), Attribute::Vaccine);
        assert_eq!(Attribute::parse_lossy(Some("Variable")), Attribute::Unknown);
        assert_eq!(Attribute::parse_lossy(None), Attribute::Unknown);
    }

    #[test]
    fn derived_edges_are_undirected_entity_edges() {
        assert!(EdgeKind::SharesType.is_derived());
        assert!(!EdgeKind::SharesType.is_directed());
        assert!(EdgeKind::SharesType.is_entity_edge());
        assert!(EdgeKind::EvolvesFrom.is_entity_edge());
        assert!(EdgeKind::EvolvesFrom.is_directed());
        assert!(!EdgeKind::HasLevel.is_entity_edge());
    }

    #[test]
    fn edge_kind_round_trips_through_display() {
        for kind in [
            EdgeKind::HasLevel,
            EdgeKind::CanUse,
            EdgeKind::EvolvesFrom,
            EdgeKind::SharesMove,
        ] {
            assert_eq!(kind.to_string().parse::<EdgeKind>().unwrap(), kind);
        }
    }
}
