//! # Análise de Consultas
//!
//! Transforma texto livre em uma [`QueryAnalysis`]: palavras-chave,
//! intenção, flags de requisito e complexidade. É a primeira metade da
//! máquina de estados do orquestrador (`analyze → route`).
//!
//! ## Normalização
//!
//! ```text
//! "  Why does DROUGHT lead to Poverty?! "
//!   ├── NFC + lowercase + trim
//!   ├── split em whitespace
//!   └── pontuação das bordas removida de cada palavra
//!   → ["why", "does", "drought", "lead", "to", "poverty"]
//! ```
//!
//! ## Casamento de Termos
//!
//! | Termo | Regra | Exemplo |
//! |-------|-------|---------|
//! | ≤ 4 chars | palavra inteira | `how` não casa em `show` |
//! | > 4 chars | prefixo de palavra | `document` casa em `documents` |
//! | frase | sequência de palavras inteiras | `show me` |
//!
//! ## Complexidade
//!
//! ```text
//! Simple ──documents/explanation/comparison──→ Moderate
//!        ──multi_hop───────────────────────────→ Complex
//! ≥3 requisitos, ou ≥2 + ≥3 conjunções ("and"/"or") → VeryComplex
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::intent::Intent;

/// Contexto opcional que acompanha uma consulta (fatos, ids, filtros).
pub type QueryContext = BTreeMap<String, serde_json::Value>;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "what", "how", "why", "when", "where", "which", "who",
];

const MAX_KEYWORDS: usize = 5;

const CALCULATION_TERMS: &[&str] = &["calculate", "compute", "score", "priority", "value"];
const DOCUMENT_TERMS: &[&str] = &[
    "document", "pdf", "source", "paper", "research", "policy", "policies", "mention",
    "reference",
];
const EXPLANATION_TERMS: &[&str] = &["why", "how", "explain", "reason", "because", "rationale"];
const COMPARISON_TERMS: &[&str] = &["compare", "difference", "versus", "vs", "better", "worse"];

static RE_MULTI_HOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:leads? to|causes|results? in|relationship between|impact on|effects? of|consequences?)\b|\bif\b.*\bthen\b",
    )
    .expect("padrão multi-hop válido")
});

// ════════════════════════════════════════════════════════════════════
// Texto normalizado
// ════════════════════════════════════════════════════════════════════

/// Consulta normalizada, pronta para casamento de termos.
#[derive(Clone, Debug)]
pub struct QueryText {
    words: Vec<String>,
    /// Palavras unidas por um espaço, com espaços nas bordas.
    padded: String,
}

impl QueryText {
    pub fn new(query: &str) -> Self {
        let lowered: String = query.nfc().collect::<String>().to_lowercase();
        let words: Vec<String> = lowered
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let padded = format!(" {} ", words.join(" "));
        Self { words, padded }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Texto normalizado (palavras separadas por um espaço).
    pub fn normalized(&self) -> &str {
        self.padded.trim()
    }

    /// Verifica um termo ou frase segundo as regras da tabela do módulo.
    pub fn contains_term(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        if term.contains(' ') {
            return self.padded.contains(&format!(" {term} "));
        }
        self.words.iter().any(|w| word_matches(w, term))
    }

    /// Índice da primeira palavra onde `phrase` começa, casando cada
    /// palavra da frase pela regra de termo único.
    pub fn position_of(&self, phrase: &str) -> Option<usize> {
        let parts: Vec<&str> = phrase.split_whitespace().collect();
        if parts.is_empty() || parts.len() > self.words.len() {
            return None;
        }
        (0..=self.words.len() - parts.len()).find(|&start| {
            parts
                .iter()
                .zip(&self.words[start..])
                .all(|(part, word)| word_matches(word, part))
        })
    }

    pub fn contains_any(&self, terms: &[&str]) -> bool {
        terms.iter().any(|t| self.contains_term(t))
    }

    /// Número de conjunções ("and"/"or") como palavras inteiras.
    pub fn conjunction_count(&self) -> usize {
        self.words
            .iter()
            .filter(|w| w.as_str() == "and" || w.as_str() == "or")
            .count()
    }

    fn is_multi_hop(&self) -> bool {
        RE_MULTI_HOP.is_match(self.normalized())
    }

    /// Até 5 palavras com mais de 2 chars que não são stop words.
    pub fn keywords(&self) -> Vec<String> {
        self.words
            .iter()
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(&w.as_str()))
            .take(MAX_KEYWORDS)
            .cloned()
            .collect()
    }
}

/// Termos curtos exigem a palavra inteira; longos casam como prefixo.
fn word_matches(word: &str, term: &str) -> bool {
    if term.chars().count() <= 4 {
        word == term
    } else {
        word.starts_with(term)
    }
}

// ════════════════════════════════════════════════════════════════════
// Análise
// ════════════════════════════════════════════════════════════════════

/// Complexidade da consulta, em ordem crescente.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Consulta direta ou cálculo simples.
    Simple,
    /// Exige algum raciocínio.
    Moderate,
    /// Raciocínio multi-hop.
    Complex,
    /// Vários requisitos simultâneos.
    VeryComplex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
            Complexity::VeryComplex => "very_complex",
        }
    }
}

/// Resultado de [`QueryAnalysis::analyze`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub query: String,
    pub keywords: Vec<String>,
    pub intent: Intent,
    pub complexity: Complexity,
    pub requires_reasoning: bool,
    pub requires_explanation: bool,
    pub requires_documents: bool,
    pub requires_calculation: bool,
    pub requires_comparison: bool,
    pub requires_multi_hop: bool,
    /// Chaves do contexto recebido, em ordem.
    #[serde(default)]
    pub context_keys: Vec<String>,
}

impl QueryAnalysis {
    /// Analisa uma consulta. Nunca falha: texto vazio vira uma análise
    /// `Simple`/`General` sem flags.
    pub fn analyze(query: &str, context: Option<&QueryContext>) -> Self {
        let text = QueryText::new(query);

        let requires_calculation = text.contains_any(CALCULATION_TERMS);
        let requires_documents = text.contains_any(DOCUMENT_TERMS);
        let requires_explanation = text.contains_any(EXPLANATION_TERMS);
        let requires_comparison = text.contains_any(COMPARISON_TERMS);
        let requires_multi_hop = text.is_multi_hop();

        let mut complexity = Complexity::Simple;
        if requires_documents || requires_explanation || requires_comparison {
            complexity = complexity.max(Complexity::Moderate);
        }
        if requires_multi_hop {
            complexity = complexity.max(Complexity::Complex);
        }
        let requires_reasoning = requires_explanation || requires_comparison || requires_multi_hop;

        let mut analysis = Self {
            query: query.to_string(),
            keywords: text.keywords(),
            intent: Intent::detect(&text),
            complexity,
            requires_reasoning,
            requires_explanation,
            requires_documents,
            requires_calculation,
            requires_comparison,
            requires_multi_hop,
            context_keys: context.map(|c| c.keys().cloned().collect()).unwrap_or_default(),
        };

        let flags = analysis.requirement_count();
        if flags >= 3 || (flags >= 2 && text.conjunction_count() >= 3) {
            analysis.complexity = Complexity::VeryComplex;
            analysis.requires_reasoning = true;
        }

        tracing::debug!(
            complexity = analysis.complexity.as_str(),
            intent = analysis.intent.as_str(),
            flags,
            "Análise: consulta classificada"
        );
        analysis
    }

    /// Quantas das cinco flags de requisito estão ativas
    /// (cálculo, documentos, explicação, comparação, multi-hop).
    pub fn requirement_count(&self) -> usize {
        [
            self.requires_calculation,
            self.requires_documents,
            self.requires_explanation,
            self.requires_comparison,
            self.requires_multi_hop,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_text_normalization() {
        let text = QueryText::new("  Why does DROUGHT lead to Poverty?! ");
        assert_eq!(text.words(), ["why", "does", "drought", "lead", "to", "poverty"]);
        assert_eq!(text.normalized(), "why does drought lead to poverty");
    }

    #[test]
    fn test_contains_term_rules() {
        let text = QueryText::new("Show me documents about policies");
        assert!(!text.contains_term("how"));
        assert!(text.contains_term("document"));
        assert!(text.contains_term("show me"));
        assert!(!text.contains_term("me documents about policy"));
        assert!(text.contains_term("policies"));
        assert!(!text.contains_term(""));
    }

    #[test]
    fn test_position_of() {
        let text = QueryText::new("Does economic development reduce poverty?");
        assert_eq!(text.position_of("economic development"), Some(1));
        assert_eq!(text.position_of("poverty"), Some(4));
        assert_eq!(text.position_of("development economic"), None);
        assert_eq!(text.position_of(""), None);
    }

    #[test]
    fn test_keywords_skip_stop_words_and_limit() {
        let a = QueryAnalysis::analyze(
            "What is the poverty rate and drought impact in Turkana county today",
            None,
        );
        assert_eq!(a.keywords, ["poverty", "rate", "and", "drought", "impact"]);
    }

    #[test]
    fn test_documents_query() {
        let a = QueryAnalysis::analyze("What documents mention poverty?", None);
        assert!(a.requires_documents);
        assert_eq!(a.intent, Intent::Search);
        assert_eq!(a.complexity, Complexity::Moderate);
        assert!(!a.requires_reasoning);
    }

    #[test]
    fn test_simple_calculation() {
        let a = QueryAnalysis::analyze("Calculate allocation score for Turkana", None);
        assert!(a.requires_calculation);
        assert_eq!(a.complexity, Complexity::Simple);
        assert_eq!(a.requirement_count(), 1);
    }

    #[test]
    fn test_multi_hop_patterns() {
        for q in [
            "Drought leads to crop failure",
            "What causes unemployment?",
            "Impact on school attendance",
            "If rainfall drops then what happens",
            "relationship between water and health",
        ] {
            let a = QueryAnalysis::analyze(q, None);
            assert!(a.requires_multi_hop, "{q}");
            assert!(a.complexity >= Complexity::Complex, "{q}");
            assert!(a.requires_reasoning);
        }
        assert!(!QueryAnalysis::analyze("Poverty in Turkana", None).requires_multi_hop);
    }

    #[test]
    fn test_very_complex_by_flag_count() {
        // explicação + comparação + documentos
        let a = QueryAnalysis::analyze("Why do policy documents compare regions?", None);
        assert_eq!(a.requirement_count(), 3);
        assert_eq!(a.complexity, Complexity::VeryComplex);
    }

    #[test]
    fn test_very_complex_by_conjunctions() {
        let q = "Explain water and health and schools or roads versus clinics";
        let a = QueryAnalysis::analyze(q, None);
        assert_eq!(a.requirement_count(), 2);
        assert_eq!(a.complexity, Complexity::VeryComplex);

        let fewer = QueryAnalysis::analyze("Explain water and health versus clinics", None);
        assert_eq!(fewer.complexity, Complexity::Moderate);
    }

    #[test]
    fn test_context_keys_echoed() {
        let mut ctx = QueryContext::new();
        ctx.insert("region".into(), serde_json::json!("Region_Turkana"));
        ctx.insert("facts".into(), serde_json::json!({}));
        let a = QueryAnalysis::analyze("poverty", Some(&ctx));
        assert_eq!(a.context_keys, ["facts", "region"]);
    }

    #[test]
    fn test_empty_query() {
        let a = QueryAnalysis::analyze("   ", None);
        assert_eq!(a.intent, Intent::General);
        assert_eq!(a.complexity, Complexity::Simple);
        assert!(a.keywords.is_empty());
    }
}
