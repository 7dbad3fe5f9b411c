//! # NLU — Análise de Consultas
//!
//! Camada leve de compreensão de texto usada pelo orquestrador. Não há
//! modelo de linguagem aqui: tudo é feito por famílias de termos e
//! expressões regulares sobre o texto normalizado (NFC + lowercase).
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`analysis`] | Normalização, flags de requisito e complexidade |
//! | [`intent`] | Intenção da consulta (calculate, explain, ...) |

pub mod analysis;
pub mod intent;

pub use analysis::{Complexity, QueryAnalysis, QueryContext, QueryText};
pub use intent::Intent;
