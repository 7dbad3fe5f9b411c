//! # Módulo Knowledge — Ingestão de Domínio
//!
//! Ponte entre os dados do mundo (regiões, políticas, fontes, documentos já
//! analisados) e o grafo de conhecimento:
//!
//! - [`facts`] — registros tipados de ingestão e normalização de nomes
//! - [`ingest`] — conversão em átomos, conhecimento semente e consultas de domínio

pub mod facts;
pub mod ingest;

pub use facts::{
    normalize_concept_name, topic_id, DocumentAnalysis, ExtractedConcept, ExtractedEntity,
    ExtractedRelationship, FactRecord, IngestStats, PovertyLevel, Properties,
};
pub use ingest::{KnowledgeStats, SeedStats};
