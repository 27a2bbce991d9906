use serde::{Deserialize, Serialize};

/// One translated Digimon record as supplied by the entity store.
///
/// Level and attribute arrive as raw translated strings; they are mapped
/// onto the closed enumerations during validation, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Canonical English name, the unique key after case-normalization.
    pub name: String,
    #[serde(default)]
    pub name_jp: Option<String>,
    pub level: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub moves: Vec<String>,
    #[serde(default)]
    pub profile: Option<String>,
    /// Names of the entities this one evolves from.
    #[serde(default)]
    pub evolves_from: Vec<String>,
    /// Names of loosely related entities.
    #[serde(default)]
    pub related: Vec<String>,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_jp: None,
            level: level.into(),
            types: Vec::new(),
            attribute: None,
            moves: Vec::new(),
            profile: None,
            evolves_from: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_moves(mut self, moves: &[&str]) -> Self {
        self.moves = moves.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_name_jp(mut self, name_jp: impl Into<String>) -> Self {
        self.name_jp = Some(name_jp.into());
        self
    }

    pub fn evolves_from(mut self, name: impl Into<String>) -> Self {
        self.evolves_from.push(name.into());
        self
    }

    pub fn related_to(mut self, name: impl Into<String>) -> Self {
        self.related.push(name.into());
        self
    }

    pub fn canonical_key(&self) -> String {
        canonical_key(&self.name)
    }
}

/// Case-normalized lookup key: trimmed, inner whitespace collapsed,
/// lowercased. Display names keep their original form.
pub fn canonical_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_normalizes_case_and_whitespace() {
        assert_eq!(canonical_key("  Agumon "), "agumon");
        assert_eq!(canonical_key("Metal  Greymon"), "metal greymon");
        assert_eq!(canonical_key("AGUMON"), canonical_key("agumon"));
    }

    #[test]
    fn builder_methods_fill_optional_fields() {
        let record = EntityRecord::new("Agumon", "Rookie")
            .with_types(&["Reptile"])
            .with_attribute("Vaccine")
            .with_moves(&["Pepper Breath"])
            .evolves_from("Koromon");

        assert_eq!(record.types, vec!["Reptile"]);
        assert_eq!(record.attribute.as_deref(), Some("Vaccine"));
        assert_eq!(record.evolves_from, vec!["Koromon"]);
        assert!(record.profile.is_none());
    }
}
