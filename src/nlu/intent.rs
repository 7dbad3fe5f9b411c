//! # Detecção de Intenção da Consulta
//!
//! A [`Intent`] diz **o que** o usuário quer fazer com a consulta. É
//! detectada por famílias de termos, verificadas em ordem fixa; a
//! primeira família com algum termo presente vence:
//!
//! | Ordem | Intent | Termos |
//! |-------|--------|--------|
//! | 1 | [`Calculate`](Intent::Calculate) | calculate, compute, score |
//! | 2 | [`Explain`](Intent::Explain) | explain, why, how, reason |
//! | 3 | [`Compare`](Intent::Compare) | compare, difference, versus, vs |
//! | 4 | [`Analyze`](Intent::Analyze) | analyze, analysis, assess |
//! | 5 | [`Search`](Intent::Search) | find, search, "what documents", "which sources", "show me" |
//! | 6 | [`Recommend`](Intent::Recommend) | recommend, suggest, should |
//! | — | [`General`](Intent::General) | nenhuma das anteriores |
//!
//! A regra de casamento de termos está em
//! [`QueryText::contains_term`](super::analysis::QueryText::contains_term).

use serde::{Deserialize, Serialize};

use super::analysis::QueryText;

/// Intenção detectada em uma consulta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Calculate,
    Explain,
    Compare,
    Analyze,
    Search,
    Recommend,
    /// Default quando nenhuma família casa.
    General,
}

/// Famílias na ordem de prioridade.
const INTENT_FAMILIES: &[(Intent, &[&str])] = &[
    (Intent::Calculate, &["calculate", "compute", "score"]),
    (Intent::Explain, &["explain", "why", "how", "reason"]),
    (Intent::Compare, &["compare", "difference", "versus", "vs"]),
    (Intent::Analyze, &["analyze", "analysis", "assess"]),
    (
        Intent::Search,
        &["find", "search", "what documents", "which sources", "show me"],
    ),
    (Intent::Recommend, &["recommend", "suggest", "should"]),
];

impl Intent {
    /// Detecta a intenção de um texto já normalizado.
    pub fn detect(text: &QueryText) -> Self {
        INTENT_FAMILIES
            .iter()
            .find(|(_, terms)| text.contains_any(terms))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Calculate => "calculate",
            Intent::Explain => "explain",
            Intent::Compare => "compare",
            Intent::Analyze => "analyze",
            Intent::Search => "search",
            Intent::Recommend => "recommend",
            Intent::General => "general",
        }
    }

    /// `Compare` e `Analyze` têm rota própria no orquestrador.
    pub fn is_analytical(&self) -> bool {
        matches!(self, Intent::Compare | Intent::Analyze)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(query: &str) -> Intent {
        Intent::detect(&QueryText::new(query))
    }

    #[test]
    fn test_each_family() {
        assert_eq!(detect("Calculate the allocation for Turkana"), Intent::Calculate);
        assert_eq!(detect("Why is Turkana a priority?"), Intent::Explain);
        assert_eq!(detect("Turkana vs Nairobi"), Intent::Compare);
        assert_eq!(detect("Assess the drought response"), Intent::Analyze);
        assert_eq!(detect("Show me the sources on water"), Intent::Search);
        assert_eq!(detect("Which region should get funding"), Intent::Recommend);
        assert_eq!(detect("Turkana poverty index"), Intent::General);
    }

    #[test]
    fn test_family_order_wins() {
        // calculate vem antes de explain
        assert_eq!(detect("Explain how to compute the score"), Intent::Calculate);
        // explain vem antes de compare
        assert_eq!(detect("Why is the difference so large?"), Intent::Explain);
    }

    #[test]
    fn test_short_terms_need_whole_words() {
        // "show" não contém a palavra "how"; "vs" não casa dentro de "vsat"
        assert_eq!(detect("show the vsat links"), Intent::General);
        // termos longos casam como prefixo de palavra
        assert_eq!(detect("analyzed regions"), Intent::Analyze);
    }

    #[test]
    fn test_display() {
        assert_eq!(Intent::Recommend.to_string(), "recommend");
        assert!(Intent::Compare.is_analytical());
        assert!(!Intent::Search.is_analytical());
    }
}
