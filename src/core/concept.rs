//! # Nós do Grafo — Identidade `(tipo, id)`
//!
//! Um nó é o átomo mais simples do grafo de conhecimento: um nome tipado.
//! A identidade de um nó é o par `(AtomType, id)` — re-adicionar o mesmo
//! par é um no-op no [`KnowledgeBase`](super::KnowledgeBase).
//!
//! | Tipo | Forma textual | Exemplo |
//! |------|---------------|---------|
//! | `Concept` | `ConceptNode` | `(ConceptNode Poverty)` |
//! | `Predicate` | `PredicateNode` | `(PredicateNode poverty_index)` |
//! | `Number` | `NumberNode` | `(NumberNode 0.8)` |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tipo de um nó do grafo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtomType {
    /// Conceito de domínio: regiões, políticas, tópicos, classificações.
    Concept,
    /// Predicado — nome de propriedade ou relação.
    Predicate,
    /// Valor literal (numérico ou textual) de uma propriedade.
    Number,
}

impl AtomType {
    /// Tag usada na forma textual (`ConceptNode`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            AtomType::Concept => "ConceptNode",
            AtomType::Predicate => "PredicateNode",
            AtomType::Number => "NumberNode",
        }
    }

    /// Inverso de [`tag()`](AtomType::tag).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ConceptNode" => Some(AtomType::Concept),
            "PredicateNode" => Some(AtomType::Predicate),
            "NumberNode" => Some(AtomType::Number),
            _ => None,
        }
    }
}

/// Chave de identidade de um nó.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    /// Tipo do nó.
    pub atom_type: AtomType,
    /// Nome do nó, único dentro do tipo.
    pub id: String,
}

impl NodeKey {
    pub fn new(atom_type: AtomType, id: impl Into<String>) -> Self {
        Self { atom_type, id: id.into() }
    }

    /// Atalho para `ConceptNode`.
    pub fn concept(id: impl Into<String>) -> Self {
        Self::new(AtomType::Concept, id)
    }

    /// Atalho para `PredicateNode`.
    pub fn predicate(id: impl Into<String>) -> Self {
        Self::new(AtomType::Predicate, id)
    }

    /// Atalho para `NumberNode`.
    pub fn number(value: impl Into<String>) -> Self {
        Self::new(AtomType::Number, value)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.atom_type.tag(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for t in [AtomType::Concept, AtomType::Predicate, AtomType::Number] {
            assert_eq!(AtomType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(AtomType::from_tag("VariableNode"), None);
    }

    #[test]
    fn test_identity_includes_type() {
        assert_ne!(NodeKey::concept("Poverty"), NodeKey::predicate("Poverty"));
        assert_eq!(NodeKey::concept("Poverty"), NodeKey::concept(String::from("Poverty")));
    }
}
