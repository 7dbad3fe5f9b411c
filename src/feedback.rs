//! # Ciclo de Aprendizado
//!
//! O [`LearningLoop`] acumula avaliações de respostas e extrai sinais
//! simples de desempenho:
//!
//! ```text
//! QueryFeedback (nota 1–5, útil?, tempo de resposta)
//!   ├── desempenho por rota (média de nota, % útil, tempo médio)
//!   ├── sugestões (rota mal avaliada, rota lenta)
//!   ├── palavras-chave frequentes em respostas bem avaliadas (nota ≥ 4)
//!   └── dica de rota por padrão de consulta (3 primeiras palavras)
//! ```
//!
//! Nada aqui altera o roteamento automaticamente: as saídas são
//! informativas para quem opera o motor.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::nlu::QueryText;
use crate::orchestrator::RoutingDecision;

/// Nota média abaixo da qual a rota é sinalizada.
const LOW_RATING: f64 = 3.0;
/// Amostras mínimas antes de julgar a nota de uma rota.
const MIN_RATING_SAMPLES: usize = 5;
/// Tempo médio (ms) acima do qual a rota é considerada lenta.
const SLOW_RESPONSE_MS: f64 = 3000.0;
/// Nota mínima para uma resposta contar como bem avaliada.
const GOOD_RATING: u8 = 4;
const PATTERN_WORDS: usize = 3;
const MIN_PATTERN_SAMPLES: usize = 3;
const PATTERN_SUCCESS_RATE: f64 = 0.7;
const GOOD_DATA_SAMPLES: usize = 50;

/// Avaliação de uma resposta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryFeedback")]
pub struct QueryFeedback {
    pub query: String,
    pub routing: RoutingDecision,
    /// 1 a 5.
    pub rating: u8,
    pub helpful: bool,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawQueryFeedback {
    query: String,
    routing: RoutingDecision,
    rating: u8,
    helpful: bool,
    response_time_ms: u64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RawQueryFeedback> for QueryFeedback {
    type Error = EngineError;

    fn try_from(raw: RawQueryFeedback) -> Result<Self, Self::Error> {
        let mut feedback =
            QueryFeedback::new(raw.query, raw.routing, raw.rating, raw.helpful, raw.response_time_ms)?;
        feedback.timestamp = raw.timestamp;
        Ok(feedback)
    }
}

impl QueryFeedback {
    /// Rejeita notas fora de `1..=5` com [`EngineError::InvalidInput`].
    pub fn new(
        query: impl Into<String>,
        routing: RoutingDecision,
        rating: u8,
        helpful: bool,
        response_time_ms: u64,
    ) -> EngineResult<Self> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::InvalidInput(format!(
                "nota {rating} fora de 1..=5"
            )));
        }
        Ok(Self {
            query: query.into(),
            routing,
            rating,
            helpful,
            response_time_ms,
            timestamp: Utc::now(),
        })
    }

    fn is_success(&self) -> bool {
        self.rating >= GOOD_RATING || self.helpful
    }
}

/// Desempenho agregado de uma rota.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutePerformance {
    pub routing: RoutingDecision,
    pub count: usize,
    pub mean_rating: f64,
    pub helpful_ratio: f64,
    pub mean_response_time_ms: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

/// Sugestão de melhoria legível.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suggestion {
    pub severity: Severity,
    pub routing: RoutingDecision,
    pub issue: String,
    pub advice: String,
}

impl std::fmt::Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.routing, self.issue, self.advice)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LearningSummary {
    pub total_feedback: usize,
    pub mean_rating: Option<f64>,
    pub helpful_ratio: f64,
    pub routes: Vec<RoutePerformance>,
    pub top_keywords: Vec<(String, usize)>,
    pub suggestions: Vec<Suggestion>,
    /// `"good"` a partir de 50 avaliações, senão `"improving"`.
    pub data_quality: &'static str,
}

// ════════════════════════════════════════════════════════════════════
// LearningLoop
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct LearningLoop {
    history: Vec<QueryFeedback>,
    keyword_counts: BTreeMap<String, usize>,
}

impl LearningLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstrói o ciclo a partir de um histórico salvo.
    pub fn from_history(history: Vec<QueryFeedback>) -> Self {
        let mut learning = Self::new();
        for feedback in history {
            learning.count_keywords(&feedback);
            learning.history.push(feedback);
        }
        tracing::info!(feedback = learning.history.len(), "Aprendizado: histórico restaurado");
        learning
    }

    fn count_keywords(&mut self, feedback: &QueryFeedback) {
        if feedback.rating >= GOOD_RATING {
            for keyword in QueryText::new(&feedback.query).keywords() {
                *self.keyword_counts.entry(keyword).or_insert(0) += 1;
            }
        }
    }

    pub fn record(&mut self, feedback: QueryFeedback) {
        self.count_keywords(&feedback);
        tracing::info!(
            routing = feedback.routing.as_str(),
            rating = feedback.rating,
            helpful = feedback.helpful,
            "Aprendizado: avaliação registrada"
        );
        self.history.push(feedback);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history(&self) -> &[QueryFeedback] {
        &self.history
    }

    /// Desempenho por rota, na ordem de [`RoutingDecision::ALL`]; rotas
    /// sem avaliações ficam de fora.
    pub fn route_performance(&self) -> Vec<RoutePerformance> {
        RoutingDecision::ALL
            .iter()
            .filter_map(|route| {
                let samples: Vec<&QueryFeedback> =
                    self.history.iter().filter(|f| f.routing == *route).collect();
                if samples.is_empty() {
                    return None;
                }
                let n = samples.len() as f64;
                Some(RoutePerformance {
                    routing: *route,
                    count: samples.len(),
                    mean_rating: samples.iter().map(|f| f.rating as f64).sum::<f64>() / n,
                    helpful_ratio: samples.iter().filter(|f| f.helpful).count() as f64 / n,
                    mean_response_time_ms: samples
                        .iter()
                        .map(|f| f.response_time_ms as f64)
                        .sum::<f64>()
                        / n,
                })
            })
            .collect()
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        let mut out = Vec::new();
        for perf in self.route_performance() {
            if perf.count >= MIN_RATING_SAMPLES && perf.mean_rating < LOW_RATING {
                out.push(Suggestion {
                    severity: Severity::High,
                    routing: perf.routing,
                    issue: format!(
                        "Low mean rating: {:.2} over {} queries",
                        perf.mean_rating, perf.count
                    ),
                    advice: format!(
                        "Review the {} routing criteria or improve the underlying path",
                        perf.routing
                    ),
                });
            }
            if perf.mean_response_time_ms > SLOW_RESPONSE_MS {
                out.push(Suggestion {
                    severity: Severity::Medium,
                    routing: perf.routing,
                    issue: format!(
                        "Slow response time: {:.0} ms on average",
                        perf.mean_response_time_ms
                    ),
                    advice: "Optimize processing or add caching".to_string(),
                });
            }
        }
        out
    }

    /// Palavras-chave mais frequentes em consultas bem avaliadas.
    /// Empates em ordem alfabética.
    pub fn top_keywords(&self, limit: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .keyword_counts
            .iter()
            .map(|(k, c)| (k.clone(), *c))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Sugere a rota que mais deu certo para consultas que começam com
    /// as mesmas três palavras. `None` sem dados suficientes.
    pub fn suggest_route(&self, query: &str) -> Option<RoutingDecision> {
        let pattern = query_pattern(query);
        let matching: Vec<&QueryFeedback> = self
            .history
            .iter()
            .filter(|f| query_pattern(&f.query) == pattern)
            .collect();
        if matching.len() < MIN_PATTERN_SAMPLES {
            return None;
        }

        let mut best: Option<(RoutingDecision, f64)> = None;
        for route in RoutingDecision::ALL {
            let samples: Vec<&&QueryFeedback> =
                matching.iter().filter(|f| f.routing == route).collect();
            if samples.is_empty() {
                continue;
            }
            let rate =
                samples.iter().filter(|f| f.is_success()).count() as f64 / samples.len() as f64;
            if best.map_or(true, |(_, r)| rate > r) {
                best = Some((route, rate));
            }
        }
        best.filter(|(_, rate)| *rate > PATTERN_SUCCESS_RATE)
            .map(|(route, _)| route)
    }

    pub fn summary(&self) -> LearningSummary {
        let total = self.history.len();
        let mean_rating = (total > 0).then(|| {
            self.history.iter().map(|f| f.rating as f64).sum::<f64>() / total as f64
        });
        let helpful_ratio = if total == 0 {
            0.0
        } else {
            self.history.iter().filter(|f| f.helpful).count() as f64 / total as f64
        };
        LearningSummary {
            total_feedback: total,
            mean_rating,
            helpful_ratio,
            routes: self.route_performance(),
            top_keywords: self.top_keywords(10),
            suggestions: self.suggestions(),
            data_quality: if total >= GOOD_DATA_SAMPLES {
                "good"
            } else {
                "improving"
            },
        }
    }
}

fn query_pattern(query: &str) -> String {
    QueryText::new(query)
        .words()
        .iter()
        .take(PATTERN_WORDS)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fb(query: &str, routing: RoutingDecision, rating: u8, ms: u64) -> QueryFeedback {
        QueryFeedback::new(query, routing, rating, rating >= 4, ms).unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(QueryFeedback::new("q", RoutingDecision::FastPath, 0, true, 10).is_err());
        assert!(QueryFeedback::new("q", RoutingDecision::FastPath, 6, true, 10).is_err());
        assert!(QueryFeedback::new("q", RoutingDecision::FastPath, 5, true, 10).is_ok());
    }

    #[test]
    fn test_deserialize_checks_rating() {
        let original = fb("why is poverty high", RoutingDecision::Cognitive, 5, 120);
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(serde_json::from_str::<QueryFeedback>(&json).unwrap(), original);

        let bad = json.replace("\"rating\":5", "\"rating\":9");
        assert!(serde_json::from_str::<QueryFeedback>(&bad).is_err());
    }

    #[test]
    fn test_from_history_rebuilds_patterns() {
        let mut live = LearningLoop::new();
        for _ in 0..3 {
            live.record(fb("why is poverty rising", RoutingDecision::Cognitive, 5, 100));
        }
        live.record(fb("turkana population total", RoutingDecision::FastPath, 2, 10));

        let restored = LearningLoop::from_history(live.history().to_vec());
        assert_eq!(restored.len(), 4);
        assert_eq!(restored.top_keywords(10), live.top_keywords(10));
        assert_eq!(
            restored.suggest_route("why is poverty so high"),
            Some(RoutingDecision::Cognitive)
        );
        assert_eq!(restored.summary(), live.summary());
    }

    #[test]
    fn test_route_performance() {
        let mut ll = LearningLoop::new();
        ll.record(fb("a", RoutingDecision::Cognitive, 5, 100));
        ll.record(fb("b", RoutingDecision::Cognitive, 3, 300));
        ll.record(fb("c", RoutingDecision::FastPath, 4, 10));

        let perf = ll.route_performance();
        assert_eq!(perf.len(), 2);
        assert_eq!(perf[0].routing, RoutingDecision::Cognitive);
        assert_eq!(perf[0].count, 2);
        assert!((perf[0].mean_rating - 4.0).abs() < 1e-9);
        assert!((perf[0].helpful_ratio - 0.5).abs() < 1e-9);
        assert!((perf[0].mean_response_time_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_rating_needs_enough_samples() {
        let mut ll = LearningLoop::new();
        for _ in 0..4 {
            ll.record(fb("poverty", RoutingDecision::Analysis, 1, 50));
        }
        assert!(ll.suggestions().is_empty());

        ll.record(fb("poverty", RoutingDecision::Analysis, 2, 50));
        let suggestions = ll.suggestions();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].severity, Severity::High);
        assert!(suggestions[0].to_string().starts_with("[analysis] Low mean rating"));
    }

    #[test]
    fn test_slow_route_suggestion() {
        let mut ll = LearningLoop::new();
        ll.record(fb("q", RoutingDecision::Cognitive, 5, 4500));
        let suggestions = ll.suggestions();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].severity, Severity::Medium);
    }

    #[test]
    fn test_keywords_only_from_good_ratings() {
        let mut ll = LearningLoop::new();
        ll.record(fb("drought poverty Turkana", RoutingDecision::Cognitive, 5, 10));
        ll.record(fb("poverty rates", RoutingDecision::Cognitive, 4, 10));
        ll.record(fb("irrelevant flood", RoutingDecision::Cognitive, 2, 10));

        let top = ll.top_keywords(3);
        assert_eq!(top[0], ("poverty".to_string(), 2));
        assert_eq!(top[1], ("drought".to_string(), 1));
        assert!(top.iter().all(|(k, _)| k != "flood"));
    }

    #[test]
    fn test_suggest_route_by_pattern() {
        let mut ll = LearningLoop::new();
        ll.record(fb("why is poverty high in Turkana", RoutingDecision::Cognitive, 5, 10));
        ll.record(fb("why is poverty high in Nairobi", RoutingDecision::Cognitive, 4, 10));
        assert_eq!(ll.suggest_route("why is poverty growing"), None);

        ll.record(fb("why is poverty rising in Kisumu", RoutingDecision::FastPath, 1, 10));
        assert_eq!(
            ll.suggest_route("Why is poverty growing?"),
            Some(RoutingDecision::Cognitive)
        );
        assert_eq!(ll.suggest_route("how many regions"), None);
    }

    #[test]
    fn test_summary() {
        let empty = LearningLoop::new().summary();
        assert_eq!(empty.total_feedback, 0);
        assert_eq!(empty.mean_rating, None);
        assert_eq!(empty.data_quality, "improving");

        let mut ll = LearningLoop::new();
        ll.record(fb("a", RoutingDecision::FastPath, 5, 10));
        ll.record(fb("b", RoutingDecision::FastPath, 3, 10));
        let summary = ll.summary();
        assert_eq!(summary.total_feedback, 2);
        assert_eq!(summary.mean_rating, Some(4.0));
        assert!((summary.helpful_ratio - 0.5).abs() < 1e-9);
    }
}
