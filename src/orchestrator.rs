//! # Orquestrador de Consultas
//!
//! O [`Orchestrator`] decide **qual caminho de raciocínio** atende uma
//! consulta. É uma máquina de estados de uma única transição:
//!
//! ```text
//! texto + contexto
//!   ├── analyze → QueryAnalysis (intenção, flags, complexidade)
//!   └── route   → RoutingDecision + justificativa
//! ```
//!
//! ## Tabela de Roteamento (primeira regra que casa vence)
//!
//! | # | Condição | Rota |
//! |---|----------|------|
//! | 1 | requer documentos | `Cognitive` |
//! | 2 | requer multi-hop | `Cognitive` |
//! | 3 | `Simple` + cálculo | `FastPath` |
//! | 4 | explicação + cálculo | `HybridFastPath` |
//! | 5 | intent compare/analyze sem explicação | `Analysis` |
//! | 6 | intent compare/analyze com explicação | `HybridAnalysis` |
//! | 7 | `Complex` ou `VeryComplex` | `Cognitive` |
//! | 8 | `Moderate` + raciocínio | `Cognitive` |
//! | 9 | default | `FastPath` |
//!
//! Documentos e multi-hop sempre escalam para o motor cognitivo,
//! independentemente da intenção detectada.
//!
//! ## Concorrência
//!
//! Os contadores são atômicos: o orquestrador é `Send + Sync` e pode ser
//! compartilhado por `&` entre handlers concorrentes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::nlu::{Complexity, QueryAnalysis, QueryContext};

/// Caminho escolhido para uma consulta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Motor cognitivo (grafo de conhecimento + inferência).
    Cognitive,
    /// Motor rápido de cálculo.
    FastPath,
    /// Caminho leve de análise/comparação.
    Analysis,
    /// Cálculo rápido + explicação cognitiva.
    HybridFastPath,
    /// Análise + explicação cognitiva.
    HybridAnalysis,
}

impl RoutingDecision {
    pub const ALL: [RoutingDecision; 5] = [
        RoutingDecision::Cognitive,
        RoutingDecision::FastPath,
        RoutingDecision::Analysis,
        RoutingDecision::HybridFastPath,
        RoutingDecision::HybridAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingDecision::Cognitive => "cognitive",
            RoutingDecision::FastPath => "fast_path",
            RoutingDecision::Analysis => "analysis",
            RoutingDecision::HybridFastPath => "hybrid_fast_path",
            RoutingDecision::HybridAnalysis => "hybrid_analysis",
        }
    }

    /// Rotas que envolvem o motor cognitivo.
    pub fn uses_cognitive(&self) -> bool {
        matches!(
            self,
            RoutingDecision::Cognitive
                | RoutingDecision::HybridFastPath
                | RoutingDecision::HybridAnalysis
        )
    }

    fn base_rationale(&self) -> &'static str {
        match self {
            RoutingDecision::Cognitive => {
                "Complex reasoning needed - using cognitive reasoning engine"
            }
            RoutingDecision::FastPath => "Simple calculation - using fast-path engine",
            RoutingDecision::Analysis => "Analysis required - using lightweight analysis path",
            RoutingDecision::HybridFastPath => {
                "Calculation with explanation - combining fast-path and cognitive engine"
            }
            RoutingDecision::HybridAnalysis => {
                "Analysis with reasoning - combining analysis path and cognitive engine"
            }
        }
    }

    fn index(&self) -> usize {
        match self {
            RoutingDecision::Cognitive => 0,
            RoutingDecision::FastPath => 1,
            RoutingDecision::Analysis => 2,
            RoutingDecision::HybridFastPath => 3,
            RoutingDecision::HybridAnalysis => 4,
        }
    }
}

impl std::fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub routing: RoutingDecision,
    pub rationale: String,
    pub analysis: QueryAnalysis,
}

/// Snapshot dos contadores de roteamento.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoutingStats {
    pub total_queries: u64,
    pub by_route: BTreeMap<String, u64>,
    /// Percentual por rota; vazio enquanto `total_queries == 0`.
    pub percentages: BTreeMap<String, f64>,
}

// ════════════════════════════════════════════════════════════════════
// Orquestrador
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct Orchestrator {
    total: AtomicU64,
    per_route: [AtomicU64; 5],
}

impl Orchestrator {
    pub fn new() -> Self {
        tracing::info!("Orquestrador: inicializado");
        Self::default()
    }

    /// Analisa e roteia uma consulta, atualizando as estatísticas.
    pub fn route_query(&self, query: &str, context: Option<&QueryContext>) -> RoutingResult {
        let analysis = QueryAnalysis::analyze(query, context);
        let routing = Self::route(&analysis);

        self.total.fetch_add(1, Ordering::Relaxed);
        self.per_route[routing.index()].fetch_add(1, Ordering::Relaxed);

        let rationale = Self::rationale(routing, &analysis);
        tracing::info!(
            routing = routing.as_str(),
            complexity = analysis.complexity.as_str(),
            intent = analysis.intent.as_str(),
            "Orquestrador: consulta roteada"
        );
        RoutingResult {
            routing,
            rationale,
            analysis,
        }
    }

    /// Tabela de roteamento; a ordem dos `if` é a precedência.
    pub fn route(analysis: &QueryAnalysis) -> RoutingDecision {
        let intent = analysis.intent;

        if analysis.requires_documents {
            return RoutingDecision::Cognitive;
        }
        if analysis.requires_multi_hop {
            return RoutingDecision::Cognitive;
        }
        if analysis.complexity == Complexity::Simple && analysis.requires_calculation {
            return RoutingDecision::FastPath;
        }
        if analysis.requires_explanation && analysis.requires_calculation {
            return RoutingDecision::HybridFastPath;
        }
        if intent.is_analytical() && !analysis.requires_explanation {
            return RoutingDecision::Analysis;
        }
        if intent.is_analytical() && analysis.requires_explanation {
            return RoutingDecision::HybridAnalysis;
        }
        if analysis.complexity >= Complexity::Complex {
            return RoutingDecision::Cognitive;
        }
        if analysis.complexity == Complexity::Moderate && analysis.requires_reasoning {
            return RoutingDecision::Cognitive;
        }
        RoutingDecision::FastPath
    }

    /// Justificativa legível: texto da rota + motivos específicos.
    pub fn rationale(routing: RoutingDecision, analysis: &QueryAnalysis) -> String {
        let mut reasons = Vec::new();
        if analysis.requires_documents {
            reasons.push("document search");
        }
        if analysis.requires_explanation {
            reasons.push("explanation");
        }
        if analysis.requires_multi_hop {
            reasons.push("multi-hop reasoning");
        }

        let base = routing.base_rationale();
        if reasons.is_empty() {
            base.to_string()
        } else {
            format!("{base} ({})", reasons.join(", "))
        }
    }

    pub fn stats(&self) -> RoutingStats {
        let total = self.total.load(Ordering::Relaxed);
        let mut stats = RoutingStats {
            total_queries: total,
            ..RoutingStats::default()
        };
        for route in RoutingDecision::ALL {
            let count = self.per_route[route.index()].load(Ordering::Relaxed);
            stats.by_route.insert(route.as_str().to_string(), count);
            if total > 0 {
                stats
                    .percentages
                    .insert(route.as_str().to_string(), count as f64 / total as f64 * 100.0);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::Intent;

    fn route(query: &str) -> RoutingResult {
        Orchestrator::new().route_query(query, None)
    }

    #[test]
    fn test_documents_route_to_cognitive() {
        let r = route("What documents mention poverty?");
        assert_eq!(r.routing, RoutingDecision::Cognitive);
        assert!(r.analysis.requires_documents);
        assert_eq!(r.rationale, format!("{} (document search)", r.routing.base_rationale()));
    }

    #[test]
    fn test_documents_beat_calculation() {
        let r = route("Calculate the value from research papers");
        assert_eq!(r.analysis.intent, Intent::Calculate);
        assert!(r.analysis.requires_calculation);
        assert!(r.analysis.requires_documents);
        assert_eq!(r.routing, RoutingDecision::Cognitive);
    }

    #[test]
    fn test_multi_hop_beats_compare_intent() {
        let r = route("Compare drought that leads to poverty");
        assert_eq!(r.analysis.intent, Intent::Compare);
        assert_eq!(r.routing, RoutingDecision::Cognitive);
    }

    #[test]
    fn test_simple_calculation_fast_path() {
        let r = route("Calculate allocation score for Turkana");
        assert_eq!(r.routing, RoutingDecision::FastPath);
        assert_eq!(r.rationale, "Simple calculation - using fast-path engine");
    }

    #[test]
    fn test_explained_calculation_is_hybrid() {
        let r = route("Explain the priority score for Turkana");
        assert_eq!(r.routing, RoutingDecision::HybridFastPath);
        assert!(r.routing.uses_cognitive());
    }

    #[test]
    fn test_analysis_routes() {
        assert_eq!(route("Compare Turkana versus Nairobi").routing, RoutingDecision::Analysis);
        assert_eq!(
            route("Analyze Turkana because of the gaps").routing,
            RoutingDecision::HybridAnalysis
        );
    }

    #[test]
    fn test_moderate_reasoning_and_default() {
        assert_eq!(route("Why is Turkana poor?").routing, RoutingDecision::Cognitive);
        assert_eq!(route("Turkana population").routing, RoutingDecision::FastPath);
        assert!(!RoutingDecision::FastPath.uses_cognitive());
    }

    #[test]
    fn test_stats_percentages() {
        let orchestrator = Orchestrator::new();
        assert!(orchestrator.stats().percentages.is_empty());

        orchestrator.route_query("What documents mention poverty?", None);
        orchestrator.route_query("Turkana population", None);
        orchestrator.route_query("Calculate allocation score", None);
        orchestrator.route_query("Why is Turkana poor?", None);

        let stats = orchestrator.stats();
        assert_eq!(stats.total_queries, 4);
        assert_eq!(stats.by_route["cognitive"], 2);
        assert_eq!(stats.by_route["fast_path"], 2);
        assert_eq!(stats.by_route["analysis"], 0);
        assert!((stats.percentages["cognitive"] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_routing_counts() {
        let orchestrator = std::sync::Arc::new(Orchestrator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let o = orchestrator.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        o.route_query("Turkana population", None);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(orchestrator.stats().total_queries, 100);
    }
}
