//! # Módulo Reasoning — Cadeias Explicáveis e Confiança
//!
//! - [`chain`] — [`ReasoningChain`] (append-only) → [`FinalizedChain`]
//! - [`confidence`] — [`ConfidenceScorer`] e [`ConfidenceScore`]
//!
//! O fluxo de uma consulta termina aqui: o motor de inferência produz
//! passos, a cadeia os organiza e o pontuador dá o veredito final.

pub mod chain;
pub mod confidence;

pub use chain::{
    ChainEdge, ChainGraph, ChainNode, ChainNodeKind, ChainSummary, FinalizedChain, ReasoningChain,
    ReasoningStep,
};
pub use confidence::{
    AlternativeRanking, ConfidenceLevel, ConfidenceScore, ConfidenceScorer, DecisionInput,
    EvidenceItem, RankedAlternative,
};
