//! # Módulo Core — Grafo de Conhecimento e Cálculo de Verdade
//!
//! Tipos fundamentais sobre os quais todo o motor é construído:
//!
//! - [`TruthValue`] — par (strength, confidence) e seus operadores
//! - [`NodeKey`] / [`AtomType`] — identidade tipada de um nó
//! - [`Link`] / [`LinkType`] — relação tipada sobre 2+ nós
//! - [`Atom`] — nó ou link, com forma textual para exportação
//! - [`Pattern`] — consulta tipada com variáveis
//! - [`KnowledgeBase`] — o store
//!
//! ## Exemplo
//!
//! ```text
//! let mut kb = KnowledgeBase::new();
//! kb.add_concept_link(LinkType::Inheritance, "Region_A", "High_Poverty_Region", None)?;
//! let pobres = kb.query_ids(
//!     &Pattern::link(LinkType::Inheritance).var("r").concept("High_Poverty_Region"),
//!     "r",
//! )?;
//! ```

pub mod atom;
pub mod concept;
pub mod knowledge_base;
pub mod link;
pub mod pattern;
pub mod truth_value;

pub use atom::Atom;
pub use concept::{AtomType, NodeKey};
pub use knowledge_base::{ImportReport, KbStats, KnowledgeBase};
pub use link::{Link, LinkType};
pub use pattern::{Binding, Pattern, Term};
pub use truth_value::TruthValue;
