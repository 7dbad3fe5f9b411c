//! # Ingestão e Consultas de Domínio
//!
//! Traduz [`FactRecord`]s em átomos do grafo e oferece as consultas de
//! domínio (regiões por nível de pobreza, fontes por tópico, políticas).
//!
//! ## Mapeamento
//!
//! | Registro | Átomos |
//! |----------|--------|
//! | `Region` | `Inheritance(id, Region)`, propriedades, `Inheritance(id, <Nível>_Poverty_Region)` |
//! | `Policy` | `Inheritance(id, Policy)`, propriedades |
//! | `PolicyRule` | `Implication(condition, action)` com peso = confiança |
//! | `DataSource` | `Inheritance(id, DataSource)`, propriedades, `Reference(id, Topic_x)` |
//! | `Similarity` | `Similarity(a, b)` com peso |
//! | `Causal` | `Causal(cause, effect)` com peso = strength |
//! | `Document` | conceitos, entidades, tópicos e relações extraídas |
//!
//! Uma propriedade `chave = valor` vira
//! `Evaluation(PredicateNode chave, ConceptNode id, NumberNode|ConceptNode valor)`.

use serde::Serialize;

use super::facts::{
    normalize_concept_name, topic_id, DocumentAnalysis, FactRecord, IngestStats, PovertyLevel,
    Properties,
};
use crate::causal::CausalRelation;
use crate::core::{AtomType, KnowledgeBase, LinkType, NodeKey, Pattern};
use crate::error::EngineResult;

/// Conceitos centrais do domínio.
const CORE_CONCEPTS: [&str; 17] = [
    "Poverty",
    "Economic_Hardship",
    "Unemployment",
    "Income_Inequality",
    "Resource_Allocation",
    "Priority",
    "Development",
    "Infrastructure",
    "Education",
    "Health",
    "Environment",
    "Deforestation",
    "Corruption",
    "Governance",
    "Policy",
    "Budget",
    "Funding",
];

const CORE_SIMILARITIES: [(&str, &str, f64); 10] = [
    ("Poverty", "Economic_Hardship", 0.9),
    ("Poverty", "Unemployment", 0.7),
    ("Poverty", "Income_Inequality", 0.8),
    ("Resource_Allocation", "Budget", 0.85),
    ("Resource_Allocation", "Funding", 0.9),
    ("Development", "Infrastructure", 0.8),
    ("Development", "Education", 0.75),
    ("Environment", "Deforestation", 0.9),
    ("Governance", "Policy", 0.85),
    ("Governance", "Corruption", 0.6),
];

const CORE_CAUSAL_LINKS: [(&str, &str, f64); 6] = [
    ("Poverty", "Priority", 0.9),
    ("High_Poverty", "Requires_Allocation", 0.85),
    ("Deforestation", "Environmental_Risk", 0.8),
    ("Corruption", "Reduced_Effectiveness", 0.7),
    ("Education", "Economic_Development", 0.75),
    ("Infrastructure", "Economic_Growth", 0.8),
];

/// Confiança das relações causais do conhecimento semente.
const SEED_CAUSAL_CONFIDENCE: f64 = 0.7;

/// Contagens da semeadura de domínio.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedStats {
    pub concepts: usize,
    pub similarities: usize,
    pub causal_links: usize,
}

/// Contadores de domínio do grafo.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    pub regions: usize,
    pub policies: usize,
    pub data_sources: usize,
    pub nodes: usize,
    pub links: usize,
}

/// Aplica um registro ao grafo.
///
/// Só toca o grafo; o registro de regras e relações causais fica com o
/// [`CognitiveEngine`](crate::engine::CognitiveEngine).
///
/// # Erros
///
/// [`EngineError::InvalidInput`](crate::error::EngineError::InvalidInput) para ids vazios ou pesos fora de `[0, 1]`.
pub fn ingest(kb: &mut KnowledgeBase, record: &FactRecord) -> EngineResult<IngestStats> {
    let nodes_before = kb.node_count();
    let links_before = kb.link_count();
    let mut stats = IngestStats::default();

    match record {
        FactRecord::Region { id, properties } => {
            add_entity(kb, id, "Region", properties)?;
            let poverty_index = properties
                .get("poverty_index")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0);
            let level = PovertyLevel::from_index(poverty_index);
            kb.add_concept_link(LinkType::Inheritance, id, level.category(), None)?;
            tracing::info!(region = %id, level = ?level, "Ingestão: região adicionada");
        }
        FactRecord::Policy { id, properties } => {
            add_entity(kb, id, "Policy", properties)?;
            tracing::info!(policy = %id, "Ingestão: política adicionada");
        }
        FactRecord::PolicyRule { id, condition, action, confidence } => {
            kb.add_concept_link(LinkType::Implication, condition, action, Some(*confidence))?;
            tracing::info!(rule = %id, "Ingestão: regra de política adicionada");
        }
        FactRecord::DataSource { id, properties, topics } => {
            add_entity(kb, id, "DataSource", properties)?;
            for topic in topics {
                let topic = topic_id(topic);
                kb.add_concept_link(LinkType::Reference, id, &topic, None)?;
                stats.topics += 1;
            }
            tracing::info!(source = %id, topics = topics.len(), "Ingestão: fonte de dados adicionada");
        }
        FactRecord::Similarity { a, b, weight } => {
            kb.add_concept_link(LinkType::Similarity, a, b, Some(*weight))?;
        }
        FactRecord::Causal { cause, effect, strength, .. } => {
            kb.add_concept_link(LinkType::Causal, cause, effect, Some(*strength))?;
        }
        FactRecord::Document { source_id, analysis } => {
            ingest_document(kb, source_id, analysis, &mut stats)?;
        }
    }

    stats.nodes_created = kb.node_count() - nodes_before;
    stats.links_created = kb.link_count() - links_before;
    Ok(stats)
}

/// `Inheritance(id, category)` mais as propriedades.
fn add_entity(
    kb: &mut KnowledgeBase,
    id: &str,
    category: &str,
    properties: &Properties,
) -> EngineResult<()> {
    kb.add_node(AtomType::Concept, id)?;
    kb.add_concept_link(LinkType::Inheritance, id, category, None)?;
    for (key, value) in properties {
        set_property(kb, id, key, value)?;
    }
    Ok(())
}

fn set_property(
    kb: &mut KnowledgeBase,
    id: &str,
    key: &str,
    value: &serde_json::Value,
) -> EngineResult<()> {
    let value_node = match value {
        serde_json::Value::Null => return Ok(()),
        serde_json::Value::Number(n) => NodeKey::number(n.to_string()),
        serde_json::Value::String(s) if s.trim().is_empty() => return Ok(()),
        serde_json::Value::String(s) => NodeKey::concept(s.clone()),
        other => NodeKey::concept(other.to_string()),
    };
    kb.add_link(
        LinkType::Evaluation,
        vec![NodeKey::predicate(key), NodeKey::concept(id), value_node],
        None,
    )?;
    Ok(())
}

fn ingest_document(
    kb: &mut KnowledgeBase,
    source_id: &str,
    analysis: &DocumentAnalysis,
    stats: &mut IngestStats,
) -> EngineResult<()> {
    kb.add_node(AtomType::Concept, source_id)?;
    kb.add_concept_link(LinkType::Inheritance, source_id, "DataSource", None)?;

    for concept in &analysis.concepts {
        let Some(id) = normalized(&concept.text) else { continue };
        kb.add_concept_link(LinkType::Reference, source_id, &id, None)?;
        let importance = concept.importance.unwrap_or(0.5);
        kb.add_link(
            LinkType::Evaluation,
            vec![
                NodeKey::predicate("importance"),
                NodeKey::concept(&id),
                NodeKey::number(importance.to_string()),
            ],
            None,
        )?;
        stats.concepts += 1;
    }

    for entity in &analysis.entities {
        let Some(id) = normalized(&entity.text) else { continue };
        let category = format!("Entity_{}", entity.kind);
        kb.add_concept_link(LinkType::Inheritance, &id, &category, None)?;
        kb.add_concept_link(LinkType::Reference, source_id, &id, None)?;
        stats.entities += 1;
    }

    for topic in &analysis.topics {
        if normalized(topic).is_none() {
            continue;
        }
        let topic = topic_id(topic);
        kb.add_concept_link(LinkType::Inheritance, &topic, "Topic", None)?;
        kb.add_concept_link(LinkType::Reference, source_id, &topic, None)?;
        stats.topics += 1;
    }

    for rel in &analysis.relationships {
        let (Some(subject), Some(predicate), Some(object)) =
            (normalized(&rel.subject), normalized(&rel.predicate), normalized(&rel.object))
        else {
            continue;
        };
        kb.add_link(
            LinkType::Evaluation,
            vec![
                NodeKey::predicate(predicate),
                NodeKey::concept(subject),
                NodeKey::concept(object),
            ],
            None,
        )?;
        stats.relationships += 1;
    }

    tracing::info!(
        source = %source_id,
        concepts = stats.concepts,
        entities = stats.entities,
        topics = stats.topics,
        relationships = stats.relationships,
        "Ingestão: documento convertido em átomos"
    );
    Ok(())
}

/// Nome normalizado, ou `None` (com aviso) se nada sobrar.
fn normalized(text: &str) -> Option<String> {
    let id = normalize_concept_name(text);
    if id.trim_matches('_').is_empty() {
        tracing::warn!(text = %text, "Ingestão: termo descartado após normalização");
        None
    } else {
        Some(id)
    }
}

// ════════════════════════════════════════════════════════════════════
// CONHECIMENTO SEMENTE
// ════════════════════════════════════════════════════════════════════

/// Semeia conceitos, similaridades e links causais do domínio.
pub fn seed_domain_knowledge(kb: &mut KnowledgeBase) -> EngineResult<SeedStats> {
    let mut stats = SeedStats::default();
    for concept in CORE_CONCEPTS {
        if kb.add_node(AtomType::Concept, concept)? {
            stats.concepts += 1;
        }
    }
    for (a, b, weight) in CORE_SIMILARITIES {
        kb.add_concept_link(LinkType::Similarity, a, b, Some(weight))?;
        stats.similarities += 1;
    }
    for (cause, effect, strength) in CORE_CAUSAL_LINKS {
        kb.add_concept_link(LinkType::Causal, cause, effect, Some(strength))?;
        stats.causal_links += 1;
    }
    tracing::info!(
        concepts = stats.concepts,
        similarities = stats.similarities,
        causal_links = stats.causal_links,
        "Ingestão: conhecimento de domínio semeado"
    );
    Ok(stats)
}

/// As relações causais da semente, para o grafo causal.
pub fn domain_causal_relations() -> EngineResult<Vec<CausalRelation>> {
    CORE_CAUSAL_LINKS
        .iter()
        .map(|(cause, effect, strength)| {
            CausalRelation::new(*cause, *effect, *strength, SEED_CAUSAL_CONFIDENCE)
                .map(|r| r.with_mechanism("Domain knowledge"))
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════
// CONSULTAS DE DOMÍNIO
// ════════════════════════════════════════════════════════════════════

/// Ids `x` com `Inheritance(x, category)`.
pub fn members_of(kb: &KnowledgeBase, category: &str) -> EngineResult<Vec<String>> {
    kb.query_ids(&Pattern::link(LinkType::Inheritance).var("x").concept(category), "x")
}

/// Regiões de um nível de pobreza.
pub fn regions_by_poverty_level(
    kb: &KnowledgeBase,
    level: PovertyLevel,
) -> EngineResult<Vec<String>> {
    members_of(kb, level.category())
}

/// Fontes que referenciam um tópico.
pub fn sources_for_topic(kb: &KnowledgeBase, topic: &str) -> EngineResult<Vec<String>> {
    kb.query_ids(
        &Pattern::link(LinkType::Reference).var("source").concept(topic_id(topic)),
        "source",
    )
}

pub fn policies(kb: &KnowledgeBase) -> EngineResult<Vec<String>> {
    members_of(kb, "Policy")
}

/// Categorias de uma entidade (`Inheritance(id, $c)`), na ordem de inserção.
pub fn categories_of(kb: &KnowledgeBase, id: &str) -> EngineResult<Vec<String>> {
    kb.query_ids(&Pattern::link(LinkType::Inheritance).concept(id).var("c"), "c")
}

/// `true` se `id` é uma região registrada.
pub fn is_region(kb: &KnowledgeBase, id: &str) -> EngineResult<bool> {
    kb.matches(&Pattern::link(LinkType::Inheritance).concept(id).concept("Region"))
}

/// Valor mais recente de uma propriedade.
pub fn property(kb: &KnowledgeBase, id: &str, key: &str) -> EngineResult<Option<String>> {
    let values = kb.query_ids(
        &Pattern::link(LinkType::Evaluation)
            .node(AtomType::Predicate, key)
            .concept(id)
            .var("value"),
        "value",
    )?;
    Ok(values.into_iter().last())
}

pub fn knowledge_stats(kb: &KnowledgeBase) -> EngineResult<KnowledgeStats> {
    Ok(KnowledgeStats {
        regions: members_of(kb, "Region")?.len(),
        policies: policies(kb)?.len(),
        data_sources: members_of(kb, "DataSource")?.len(),
        nodes: kb.node_count(),
        links: kb.link_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::knowledge::facts::{ExtractedConcept, ExtractedEntity, ExtractedRelationship};
    use serde_json::json;

    fn region(id: &str, poverty: f64) -> FactRecord {
        FactRecord::Region {
            id: id.into(),
            properties: Properties::from([
                ("poverty_index".to_string(), json!(poverty)),
                ("name".to_string(), json!(id.trim_start_matches("Region_"))),
            ]),
        }
    }

    #[test]
    fn test_region_classification() {
        let mut kb = KnowledgeBase::new();
        ingest(&mut kb, &region("Region_Turkana", 0.79)).unwrap();
        ingest(&mut kb, &region("Region_Nakuru", 0.5)).unwrap();
        ingest(&mut kb, &region("Region_Nairobi", 0.2)).unwrap();

        assert_eq!(regions_by_poverty_level(&kb, PovertyLevel::High).unwrap(), vec!["Region_Turkana"]);
        assert_eq!(regions_by_poverty_level(&kb, PovertyLevel::Medium).unwrap(), vec!["Region_Nakuru"]);
        assert!(is_region(&kb, "Region_Nairobi").unwrap());
        assert_eq!(property(&kb, "Region_Turkana", "poverty_index").unwrap().as_deref(), Some("0.79"));
        assert_eq!(property(&kb, "Region_Turkana", "name").unwrap().as_deref(), Some("Turkana"));
        assert_eq!(
            categories_of(&kb, "Region_Turkana").unwrap(),
            vec!["Region", "High_Poverty_Region"]
        );
    }

    /// Re-ingerir a mesma região não cria nós novos.
    #[test]
    fn test_reingest_is_node_idempotent() {
        let mut kb = KnowledgeBase::new();
        let first = ingest(&mut kb, &region("Region_Turkana", 0.79)).unwrap();
        assert!(first.nodes_created > 0);
        let again = ingest(&mut kb, &region("Region_Turkana", 0.79)).unwrap();
        assert_eq!(again.nodes_created, 0);
        assert_eq!(knowledge_stats(&kb).unwrap().regions, 1);
    }

    #[test]
    fn test_data_source_topics() {
        let mut kb = KnowledgeBase::new();
        let stats = ingest(
            &mut kb,
            &FactRecord::DataSource {
                id: "Source_PDF_123".into(),
                properties: Properties::from([("title".to_string(), json!("Poverty Impact Study"))]),
                topics: vec!["poverty".into(), "resource allocation".into()],
            },
        )
        .unwrap();
        assert_eq!(stats.topics, 2);
        assert_eq!(sources_for_topic(&kb, "Poverty").unwrap(), vec!["Source_PDF_123"]);
        assert_eq!(sources_for_topic(&kb, "resource allocation").unwrap(), vec!["Source_PDF_123"]);
        assert!(sources_for_topic(&kb, "health").unwrap().is_empty());
    }

    #[test]
    fn test_document_analysis() {
        let mut kb = KnowledgeBase::new();
        let analysis = DocumentAnalysis {
            concepts: vec![
                ExtractedConcept { text: "cash transfers".into(), importance: Some(0.9) },
                ExtractedConcept { text: "???".into(), importance: None },
            ],
            entities: vec![ExtractedEntity { text: "Turkana".into(), kind: "LOC".into() }],
            topics: vec!["poverty".into()],
            relationships: vec![ExtractedRelationship {
                subject: "drought".into(),
                predicate: "worsens".into(),
                object: "food security".into(),
            }],
        };
        let stats = ingest(
            &mut kb,
            &FactRecord::Document { source_id: "Doc_1".into(), analysis },
        )
        .unwrap();
        assert_eq!((stats.concepts, stats.entities, stats.topics, stats.relationships), (1, 1, 1, 1));
        assert_eq!(members_of(&kb, "Entity_LOC").unwrap(), vec!["Turkana"]);
        assert_eq!(members_of(&kb, "Topic").unwrap(), vec!["Topic_Poverty"]);
        assert_eq!(property(&kb, "Drought", "Worsens").unwrap().as_deref(), Some("Food_Security"));
        assert_eq!(property(&kb, "Cash_Transfers", "importance").unwrap().as_deref(), Some("0.9"));
    }

    #[test]
    fn test_invalid_weight_is_rejected() {
        let mut kb = KnowledgeBase::new();
        let r = ingest(&mut kb, &FactRecord::Similarity { a: "A".into(), b: "B".into(), weight: 1.5 });
        assert!(matches!(r, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_seed_domain_knowledge() {
        let mut kb = KnowledgeBase::new();
        let stats = seed_domain_knowledge(&mut kb).unwrap();
        assert_eq!(stats, SeedStats { concepts: 17, similarities: 10, causal_links: 6 });
        assert_eq!(kb.get_related("Poverty", 5), vec!["Economic_Hardship", "Unemployment", "Income_Inequality"]);
        assert_eq!(kb.stats().links_by_type["CausalLink"], 6);
        assert_eq!(domain_causal_relations().unwrap().len(), 6);

        let again = seed_domain_knowledge(&mut kb).unwrap();
        assert_eq!(again.concepts, 0);
    }
}
