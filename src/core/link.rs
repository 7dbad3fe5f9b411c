//! # Link — Relação Tipada Entre Nós
//!
//! Um [`Link`] relaciona **dois ou mais** nós. Links não precisam ser
//! únicos: duplicatas são toleradas no store, mas as consultas
//! deduplicam os resultados.
//!
//! ## Tipos de Relação ([`LinkType`])
//!
//! | Tipo | Descrição | Exemplo |
//! |------|-----------|---------|
//! | `Inheritance` | "é um" | `Inheritance(Region_Nairobi, High_Poverty_Region)` |
//! | `Similarity` | "≈", com peso | `Similarity(Poverty, Unemployment, 0.7)` |
//! | `Evaluation` | predicado aplicado | `Evaluation(poverty_index, Region_Nairobi, 0.8)` |
//! | `Reference` | fonte cita conceito | `Reference(Source_PDF_1, Topic_Poverty)` |
//! | `Causal` | causa → efeito | `Causal(Education, Economic_Development)` |
//! | `Implication` | regra se-então | `Implication(High_Poverty_Region, High_Priority)` |

use serde::{Deserialize, Serialize};

use super::concept::NodeKey;
use crate::error::{ensure_unit, EngineError, EngineResult};

/// Tipo de relação entre nós.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkType {
    Inheritance,
    Similarity,
    Evaluation,
    Reference,
    Causal,
    Implication,
}

impl LinkType {
    /// Todos os tipos, em ordem estável.
    pub const ALL: [LinkType; 6] = [
        LinkType::Inheritance,
        LinkType::Similarity,
        LinkType::Evaluation,
        LinkType::Reference,
        LinkType::Causal,
        LinkType::Implication,
    ];

    /// Tag usada na forma textual (`InheritanceLink`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            LinkType::Inheritance => "InheritanceLink",
            LinkType::Similarity => "SimilarityLink",
            LinkType::Evaluation => "EvaluationLink",
            LinkType::Reference => "ReferenceLink",
            LinkType::Causal => "CausalLink",
            LinkType::Implication => "ImplicationLink",
        }
    }

    /// Inverso de [`tag()`](LinkType::tag).
    pub fn from_tag(tag: &str) -> Option<Self> {
        LinkType::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Label legível em PT-BR, usado em logs e explicações.
    pub fn label(&self) -> &'static str {
        match self {
            LinkType::Inheritance => "é um",
            LinkType::Similarity => "≈",
            LinkType::Evaluation => "avalia",
            LinkType::Reference => "referencia",
            LinkType::Causal => "causa",
            LinkType::Implication => "⇒",
        }
    }
}

/// Relação tipada sobre dois ou mais nós, com peso opcional.
///
/// O peso (quando presente) está sempre em `[0, 1]` — é a similaridade
/// de um `SimilarityLink` ou a força de um `CausalLink`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Tipo da relação.
    pub link_type: LinkType,
    /// Argumentos posicionais (≥ 2).
    pub args: Vec<NodeKey>,
    /// Peso opcional em `[0, 1]`.
    pub weight: Option<f64>,
}

impl Link {
    /// Cria um link validado.
    ///
    /// # Erros
    ///
    /// - menos de 2 argumentos;
    /// - algum argumento com id vazio;
    /// - peso fora de `[0, 1]`.
    pub fn new(link_type: LinkType, args: Vec<NodeKey>, weight: Option<f64>) -> EngineResult<Self> {
        if args.len() < 2 {
            return Err(EngineError::InvalidInput(format!(
                "{} exige ao menos 2 argumentos, recebeu {}",
                link_type.tag(),
                args.len()
            )));
        }
        if let Some(empty) = args.iter().find(|a| a.id.trim().is_empty()) {
            return Err(EngineError::InvalidInput(format!(
                "{} com argumento {} de id vazio",
                link_type.tag(),
                empty.atom_type.tag()
            )));
        }
        let weight = weight.map(|w| ensure_unit("weight", w)).transpose()?;
        Ok(Self { link_type, args, weight })
    }

    /// Primeiro argumento (sujeito/causa/fonte).
    pub fn head(&self) -> &NodeKey {
        &self.args[0]
    }

    /// Segundo argumento (objeto/efeito/alvo).
    pub fn target(&self) -> &NodeKey {
        &self.args[1]
    }

    /// `true` se algum argumento é o nó dado.
    pub fn mentions(&self, key: &NodeKey) -> bool {
        self.args.iter().any(|a| a == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_requires_two_args() {
        let err = Link::new(LinkType::Inheritance, vec![NodeKey::concept("A")], None);
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_link_rejects_bad_weight_and_empty_id() {
        let args = vec![NodeKey::concept("A"), NodeKey::concept("B")];
        assert!(Link::new(LinkType::Similarity, args.clone(), Some(1.5)).is_err());
        assert!(Link::new(
            LinkType::Similarity,
            vec![NodeKey::concept("A"), NodeKey::concept("  ")],
            None
        )
        .is_err());
        let ok = Link::new(LinkType::Similarity, args, Some(0.9)).unwrap();
        assert_eq!(ok.head().id, "A");
        assert_eq!(ok.target().id, "B");
    }

    #[test]
    fn test_tags_round_trip() {
        for t in LinkType::ALL {
            assert_eq!(LinkType::from_tag(t.tag()), Some(t));
        }
    }
}
