//! # Registros de Ingestão
//!
//! Formato tipado dos dados que chegam ao motor vindos das camadas externas
//! (cadastro de regiões e políticas, fontes de dados, análise de documentos).
//! O motor só consome a **saída** dessas camadas: texto já extraído,
//! conceitos, entidades e relações.
//!
//! Cada variante de [`FactRecord`] vira um conjunto de átomos no grafo; veja
//! [`ingest`](super::ingest::ingest).
//!
//! ## Formato JSON
//!
//! ```text
//! {"kind": "region", "id": "Region_Turkana", "properties": {"poverty_index": 0.79}}
//! {"kind": "similarity", "a": "Poverty", "b": "Unemployment", "weight": 0.7}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Propriedades livres de uma entidade (`chave = valor`).
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Registro de ingestão.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactRecord {
    Region {
        id: String,
        #[serde(default)]
        properties: Properties,
    },
    Policy {
        id: String,
        #[serde(default)]
        properties: Properties,
    },
    /// Regra `condition ⇒ action`; também entra na tabela de regras.
    PolicyRule {
        id: String,
        condition: String,
        action: String,
        #[serde(default = "default_rule_confidence")]
        confidence: f64,
    },
    DataSource {
        id: String,
        #[serde(default)]
        properties: Properties,
        #[serde(default)]
        topics: Vec<String>,
    },
    Similarity {
        a: String,
        b: String,
        weight: f64,
    },
    /// Relação causal; também entra no grafo causal.
    Causal {
        cause: String,
        effect: String,
        strength: f64,
        confidence: f64,
        #[serde(default)]
        evidence: Vec<String>,
        #[serde(default)]
        mechanism: Option<String>,
    },
    /// Saída de uma análise de documento.
    Document {
        source_id: String,
        analysis: DocumentAnalysis,
    },
}

fn default_rule_confidence() -> f64 {
    1.0
}

/// Conceito extraído de um documento.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedConcept {
    pub text: String,
    #[serde(default)]
    pub importance: Option<f64>,
}

/// Entidade nomeada (ex: `{"text": "Nairobi", "kind": "LOC"}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub text: String,
    pub kind: String,
}

/// Tripla sujeito–predicado–objeto.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Resultado consolidado da análise de um documento.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    #[serde(default)]
    pub concepts: Vec<ExtractedConcept>,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
}

/// Contagens de uma ingestão.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub nodes_created: usize,
    pub links_created: usize,
    pub concepts: usize,
    pub entities: usize,
    pub topics: usize,
    pub relationships: usize,
    pub rules_registered: usize,
    pub causal_relations: usize,
}

/// Nível de pobreza de uma região, derivado do `poverty_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PovertyLevel {
    High,
    Medium,
    Low,
}

impl PovertyLevel {
    /// `> 0.7` alto, `> 0.4` médio, senão baixo.
    pub fn from_index(poverty_index: f64) -> Self {
        if poverty_index > 0.7 {
            PovertyLevel::High
        } else if poverty_index > 0.4 {
            PovertyLevel::Medium
        } else {
            PovertyLevel::Low
        }
    }

    /// Conceito de classificação no grafo.
    pub fn category(&self) -> &'static str {
        match self {
            PovertyLevel::High => "High_Poverty_Region",
            PovertyLevel::Medium => "Medium_Poverty_Region",
            PovertyLevel::Low => "Low_Poverty_Region",
        }
    }

    /// Aceita "high", "medium", "low" (sem diferenciar maiúsculas).
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_lowercase().as_str() {
            "high" => Some(PovertyLevel::High),
            "medium" => Some(PovertyLevel::Medium),
            "low" => Some(PovertyLevel::Low),
            _ => None,
        }
    }
}

/// Normaliza texto livre para um id de conceito.
///
/// NFC → espaços viram `_` → só alfanuméricos e `_` → cada palavra
/// capitalizada.
///
/// ```text
/// "economic hardship!"  → "Economic_Hardship"
/// "São Paulo"           → "São_Paulo"
/// ```
pub fn normalize_concept_name(text: &str) -> String {
    let cleaned: String = text
        .nfc()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    cleaned
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("_")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Id do conceito de tópico: `Topic_<Nome_Normalizado>`.
pub fn topic_id(topic: &str) -> String {
    format!("Topic_{}", normalize_concept_name(topic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_concept_name() {
        assert_eq!(normalize_concept_name("economic hardship!"), "Economic_Hardship");
        assert_eq!(normalize_concept_name("HIGH poverty"), "High_Poverty");
        assert_eq!(normalize_concept_name("São Paulo"), "São_Paulo");
        assert_eq!(normalize_concept_name("!!!"), "");
        // forma decomposta (a + acento combinante) vira a composta
        assert_eq!(normalize_concept_name("Sa\u{0303}o"), "São");
    }

    #[test]
    fn test_topic_id() {
        assert_eq!(topic_id("resource allocation"), "Topic_Resource_Allocation");
    }

    #[test]
    fn test_poverty_level() {
        assert_eq!(PovertyLevel::from_index(0.71), PovertyLevel::High);
        assert_eq!(PovertyLevel::from_index(0.7), PovertyLevel::Medium);
        assert_eq!(PovertyLevel::from_index(0.4), PovertyLevel::Low);
        assert_eq!(PovertyLevel::parse("HIGH"), Some(PovertyLevel::High));
        assert_eq!(PovertyLevel::parse("extreme"), None);
    }

    #[test]
    fn test_fact_record_json() {
        let r: FactRecord = serde_json::from_str(
            r#"{"kind": "region", "id": "Region_Turkana", "properties": {"poverty_index": 0.79}}"#,
        )
        .unwrap();
        match r {
            FactRecord::Region { id, properties } => {
                assert_eq!(id, "Region_Turkana");
                assert_eq!(properties["poverty_index"], serde_json::json!(0.79));
            }
            other => panic!("variante inesperada: {other:?}"),
        }
        let rule: FactRecord = serde_json::from_str(
            r#"{"kind": "policy_rule", "id": "r1", "condition": "A", "action": "B"}"#,
        )
        .unwrap();
        assert!(matches!(rule, FactRecord::PolicyRule { confidence, .. } if confidence == 1.0));
    }
}
