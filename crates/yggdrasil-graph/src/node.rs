use serde::{Deserialize, Serialize};
use yggdrasil_core::{Attribute, NodeId, NodeKind, Stage, ValidRecord};

/// Payload carried by Digimon nodes. Category nodes have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub stage: Option<Stage>,
    pub types: Vec<String>,
    pub attribute: Attribute,
    pub moves: Vec<String>,
    pub profile: Option<String>,
    pub name_jp: Option<String>,
    /// True for entities only referenced by others, never loaded
    /// themselves. Placeholders join the evolution sub-graph but carry no
    /// category memberships.
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub entity: Option<EntityData>,
}

impl GraphNode {
    pub fn digimon(id: NodeId, record: &ValidRecord) -> Self {
        Self {
            id,
            kind: NodeKind::Digimon,
            name: record.name.clone(),
            entity: Some(EntityData {
                stage: Some(record.stage),
                types: record.types.clone(),
                attribute: record.attribute,
                moves: record.moves.clone(),
                profile: record.profile.clone(),
                name_jp: record.name_jp.clone(),
                placeholder: false,
            }),
        }
    }

    pub fn placeholder(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: NodeKind::Digimon,
            name: name.into(),
            entity: Some(EntityData {
                stage: None,
                types: Vec::new(),
                attribute: Attribute::Unknown,
                moves: Vec::new(),
                profile: None,
                name_jp: None,
                placeholder: true,
            }),
        }
    }

    pub fn category(id: NodeId, kind: NodeKind, name: impl Into<String>) -> Self {
        debug_assert!(kind != NodeKind::Digimon);
        Self {
            id,
            kind,
            name: name.into(),
            entity: None,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.kind == NodeKind::Digimon
    }

    pub fn is_placeholder(&self) -> bool {
        self.entity.as_ref().is_some_and(|e| e.placeholder)
    }
}
