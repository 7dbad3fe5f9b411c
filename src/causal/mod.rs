//! # Módulo Causal — Relações de Causa e Efeito
//!
//! - [`relation`] — [`CausalRelation`] e [`Observation`]
//! - [`engine`] — o [`CausalGraph`]: descoberta por correlação, busca de
//!   cadeias, estimativa de efeito, contrafactuais e explicação de resultados
//!
//! ```text
//! Poverty ──0.75──▶ Low_Education ──0.70──▶ Unemployment
//!    ▲                                          │
//!    └──────────────────0.80────────────────────┘
//! ```

pub mod engine;
pub mod relation;

pub use engine::{
    CausalEdge, CausalEffect, CausalExplanation, CausalFactor, CausalGraph, CausalGraphView,
    CounterfactualAnalysis, CounterfactualEffect, EffectMethod,
};
pub use relation::{CausalRelation, Observation};
