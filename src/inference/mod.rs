//! # Módulo Inference — Regras e Encadeamento
//!
//! Camada de inferência lógica do motor:
//!
//! - [`rules`] — a [`RuleTable`] (regras como dados, índice bidirecional),
//!   aplicação de regra e explicação por evidência
//! - [`engine`] — o [`InferenceEngine`]: forward/backward chaining,
//!   abdução, analogia e inferência probabilística
//!
//! ## Exemplo
//!
//! ```text
//! Premissa: High_Poverty_Region ⟨1.00, 0.90⟩
//! Regra:    poverty_implies_priority ⟨0.85, 0.90⟩
//! ⊢         High_Priority ⟨0.85, 0.81⟩
//! ```

pub mod engine;
pub mod rules;

pub use engine::{case_similarity, Case, FeatureValue, InferenceEngine, InferenceResult};
pub use rules::{
    explain_with_evidence, EvidenceExplanation, FactSet, NotAppliedReason, Rule, RuleApplication,
    RuleTable, SupportLevel, SupportingFact,
};
