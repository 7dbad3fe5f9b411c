//! # Pontuação de Confiança
//!
//! Agrega sinais heterogêneos (tamanho da cadeia, TVs, evidências,
//! completude de dados) num único [`ConfidenceScore`] com nível qualitativo.
//!
//! ## Níveis
//!
//! | Score | Nível |
//! |-------|-------|
//! | ≥ 0.9 | `very_high` |
//! | ≥ 0.7 | `high` |
//! | ≥ 0.5 | `medium` |
//! | ≥ 0.3 | `low` |
//! | < 0.3 | `very_low` |
//!
//! ## Cadeias de raciocínio
//!
//! ```text
//! chain_length  1 → 1.0 | ≤3 → 0.9 | ≤5 → 0.7 | >5 → 0.5     peso 0.3
//! truth_values  média das confidences (passo sem TV conta 0.5)  peso 0.5
//! evidence      min(1, passos_com_evidência / passos)         peso 0.2
//! ```
//!
//! Componentes sem peso configurado usam 0.33. Uma cadeia **sem nenhuma
//! evidência** tem o score limitado a 0.69: nunca passa de `medium`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::chain::ReasoningStep;
use crate::core::TruthValue;

/// Peso de um componente sem peso configurado.
const DEFAULT_WEIGHT: f64 = 0.33;

/// Teto do score de uma cadeia sem evidência (abaixo de `high`).
const NO_EVIDENCE_CAP: f64 = 0.69;

/// TV assumido para passos sem TV.
const MISSING_STEP_CONFIDENCE: f64 = 0.5;

/// Nível qualitativo, em ordem crescente.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            ConfidenceLevel::VeryHigh
        } else if score >= 0.7 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else if score >= 0.3 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryLow => "very_low",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::VeryHigh => "very_high",
        }
    }

    /// Forma de título: "Very High".
    pub fn title(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryLow => "Very Low",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
            ConfidenceLevel::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score agregado com detalhamento por componente.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfidenceScore {
    pub overall: f64,
    pub level: ConfidenceLevel,
    pub components: BTreeMap<String, f64>,
    pub explanation: String,
}

impl ConfidenceScore {
    fn new(overall: f64, components: BTreeMap<String, f64>, explanation: String) -> Self {
        let overall = overall.clamp(0.0, 1.0);
        Self {
            overall,
            level: ConfidenceLevel::from_score(overall),
            components,
            explanation,
        }
    }

    /// Score nulo (`very_low`) com uma explicação.
    pub fn none(component: &str, explanation: &str) -> Self {
        Self::new(
            0.0,
            BTreeMap::from([(component.to_string(), 0.0)]),
            explanation.to_string(),
        )
    }

    pub fn percentage(&self) -> f64 {
        (self.overall * 1000.0).round() / 10.0
    }
}

/// Item de evidência avaliado por [`ConfidenceScorer::score_evidence`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Tipo da fonte (ex: "policy", "data_source", "property").
    pub kind: String,
    pub description: String,
    /// Relevância em `[0, 1]`, quando conhecida.
    #[serde(default)]
    pub relevance: Option<f64>,
}

impl EvidenceItem {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self { kind: kind.into(), description: description.into(), relevance: None }
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance.clamp(0.0, 1.0));
        self
    }
}

/// Dados de uma decisão para [`ConfidenceScorer::score_decision`].
///
/// Campos `None` contam como ausentes na completude.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Número de passos de raciocínio que sustentam a decisão.
    pub reasoning_steps: Option<usize>,
    pub evidence: Option<Vec<EvidenceItem>>,
    pub alternatives: Option<Vec<String>>,
    /// Consenso externo (ex: votação), em `[0, 1]`.
    pub consensus: Option<f64>,
}

/// Alternativa pontuada por [`ConfidenceScorer::compare_alternatives`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedAlternative {
    pub rank: usize,
    pub label: String,
    pub score: ConfidenceScore,
}

/// Ranking de alternativas.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlternativeRanking {
    pub total: usize,
    pub ranked: Vec<RankedAlternative>,
    pub best: Option<RankedAlternative>,
    pub highest: f64,
    pub lowest: f64,
}

/// Pontuador de confiança, com pesos por componente de cadeia.
#[derive(Clone, Debug)]
pub struct ConfidenceScorer {
    weights: BTreeMap<String, f64>,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                ("chain_length".to_string(), 0.3),
                ("truth_values".to_string(), 0.5),
                ("evidence".to_string(), 0.2),
            ]),
        }
    }
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    fn weight(&self, component: &str) -> f64 {
        self.weights.get(component).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Pontua uma cadeia de passos. Cadeia vazia: `very_low`.
    pub fn score_chain(&self, steps: &[ReasoningStep]) -> ConfidenceScore {
        if steps.is_empty() {
            return ConfidenceScore::none("chain_length", "No reasoning chain provided");
        }
        let n = steps.len();
        let length = match n {
            1 => 1.0,
            2..=3 => 0.9,
            4..=5 => 0.7,
            _ => 0.5,
        };
        let truth_values = steps
            .iter()
            .map(|s| s.truth_value.map_or(MISSING_STEP_CONFIDENCE, |tv| tv.confidence()))
            .sum::<f64>()
            / n as f64;
        let with_evidence = steps.iter().filter(|s| !s.evidence.is_empty()).count();
        let evidence = (with_evidence as f64 / n as f64).min(1.0);

        let components = BTreeMap::from([
            ("chain_length".to_string(), length),
            ("truth_values".to_string(), truth_values),
            ("evidence".to_string(), evidence),
        ]);
        let mut overall: f64 = components.iter().map(|(k, v)| v * self.weight(k)).sum();
        if with_evidence == 0 {
            overall = overall.min(NO_EVIDENCE_CAP);
        }
        let level = ConfidenceLevel::from_score(overall);
        ConfidenceScore::new(overall, components, chain_explanation(level, n))
    }

    /// Qualidade de um conjunto de evidências: quantidade, diversidade
    /// de tipos e relevância média.
    pub fn score_evidence(&self, items: &[EvidenceItem]) -> ConfidenceScore {
        if items.is_empty() {
            return ConfidenceScore::none("evidence_count", "No evidence provided");
        }
        let quantity = match items.len() {
            5.. => 1.0,
            3..=4 => 0.8,
            _ => 0.6,
        };
        let kinds: BTreeSet<&str> = items.iter().map(|e| e.kind.as_str()).collect();
        let diversity = (kinds.len() as f64 / 3.0).min(1.0);
        let relevance = if items.iter().any(|e| e.relevance.is_some()) {
            items.iter().map(|e| e.relevance.unwrap_or(0.5)).sum::<f64>() / items.len() as f64
        } else {
            0.7
        };
        let components = BTreeMap::from([
            ("quantity".to_string(), quantity),
            ("diversity".to_string(), diversity),
            ("relevance".to_string(), relevance),
        ]);
        let overall = mean(&components);
        ConfidenceScore::new(
            overall,
            components,
            format!(
                "Based on {} evidence items from {} different sources",
                items.len(),
                kinds.len()
            ),
        )
    }

    /// Confiança numa decisão: completude, qualidade do raciocínio,
    /// suporte de evidência e consenso (se houver).
    pub fn score_decision(&self, decision: &DecisionInput) -> ConfidenceScore {
        let present = [
            decision.reasoning_steps.is_some(),
            decision.evidence.is_some(),
            decision.alternatives.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        let mut components = BTreeMap::from([
            ("data_completeness".to_string(), present as f64 / 3.0),
            (
                "reasoning_quality".to_string(),
                (decision.reasoning_steps.unwrap_or(0) as f64 / 3.0).min(1.0),
            ),
            (
                "evidence_support".to_string(),
                match decision.evidence.as_deref() {
                    Some(items) if !items.is_empty() => self.score_evidence(items).overall,
                    _ => 0.3,
                },
            ),
        ]);
        if let Some(consensus) = decision.consensus {
            components.insert("consensus".to_string(), consensus.clamp(0.0, 1.0));
        }

        let overall = mean(&components);
        let level = ConfidenceLevel::from_score(overall);
        let weak: Vec<&str> = components
            .iter()
            .filter(|(_, v)| **v < 0.5)
            .map(|(k, _)| k.as_str())
            .collect();
        let explanation = if weak.is_empty() {
            format!("{} confidence - all factors are strong", level.title())
        } else {
            format!("{} confidence - weaker in: {}", level.title(), weak.join(", "))
        };
        ConfidenceScore::new(overall, components, explanation)
    }

    /// `(strength + confidence) / 2`.
    pub fn score_from_truth_value(&self, tv: &TruthValue) -> ConfidenceScore {
        ConfidenceScore::new(
            (tv.strength() + tv.confidence()) / 2.0,
            BTreeMap::from([
                ("strength".to_string(), tv.strength()),
                ("confidence".to_string(), tv.confidence()),
            ]),
            format!(
                "Truth value: strength={:.2}, confidence={:.2}",
                tv.strength(),
                tv.confidence()
            ),
        )
    }

    /// Ranqueia alternativas por [`score_decision`](Self::score_decision).
    /// Empates mantêm a ordem de entrada.
    pub fn compare_alternatives(&self, alternatives: &[(String, DecisionInput)]) -> AlternativeRanking {
        let mut scored: Vec<(String, ConfidenceScore)> = alternatives
            .iter()
            .map(|(label, input)| (label.clone(), self.score_decision(input)))
            .collect();
        scored.sort_by(|a, b| b.1.overall.total_cmp(&a.1.overall));
        let ranked: Vec<RankedAlternative> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (label, score))| RankedAlternative { rank: i + 1, label, score })
            .collect();
        AlternativeRanking {
            total: ranked.len(),
            best: ranked.first().cloned(),
            highest: ranked.first().map_or(0.0, |r| r.score.overall),
            lowest: ranked.last().map_or(0.0, |r| r.score.overall),
            ranked,
        }
    }
}

fn mean(components: &BTreeMap<String, f64>) -> f64 {
    if components.is_empty() {
        0.0
    } else {
        components.values().sum::<f64>() / components.len() as f64
    }
}

fn chain_explanation(level: ConfidenceLevel, steps: usize) -> String {
    match level {
        ConfidenceLevel::VeryHigh => {
            format!("Very high confidence based on {steps}-step reasoning with strong evidence")
        }
        ConfidenceLevel::High => format!("High confidence based on {steps}-step reasoning"),
        ConfidenceLevel::Medium => format!("Moderate confidence based on {steps}-step reasoning"),
        ConfidenceLevel::Low => format!(
            "Low confidence - reasoning chain has {steps} steps which may introduce uncertainty"
        ),
        ConfidenceLevel::VeryLow => {
            "Very low confidence - insufficient evidence or weak reasoning".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::chain::ReasoningChain;
    use proptest::prelude::*;

    fn tv(s: f64, c: f64) -> TruthValue {
        TruthValue::new(s, c).unwrap()
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.29), ConfidenceLevel::VeryLow);
        assert!(ConfidenceLevel::High > ConfidenceLevel::Medium);
    }

    #[test]
    fn test_single_confident_step_with_evidence_is_high() {
        let mut chain = ReasoningChain::new("High_Priority");
        chain.add_step("A", "High_Priority", "Deduction", Some(tv(0.9, 0.9)), vec!["census".into()]);
        let score = ConfidenceScorer::new().score_chain(chain.steps());
        // 1.0 × 0.3 + 0.9 × 0.5 + 1.0 × 0.2
        assert!((score.overall - 0.95).abs() < 1e-9);
        assert!(score.level >= ConfidenceLevel::High);
    }

    #[test]
    fn test_chain_without_evidence_is_at_most_medium() {
        let mut chain = ReasoningChain::new("G");
        chain.add_step("A", "G", "Deduction", Some(tv(1.0, 1.0)), vec![]);
        let score = ConfidenceScorer::new().score_chain(chain.steps());
        assert!(score.level <= ConfidenceLevel::Medium);
        assert_eq!(score.components["evidence"], 0.0);
    }

    #[test]
    fn test_empty_chain_is_very_low() {
        let score = ConfidenceScorer::new().score_chain(&[]);
        assert_eq!(score.level, ConfidenceLevel::VeryLow);
        assert_eq!(score.explanation, "No reasoning chain provided");
    }

    #[test]
    fn test_long_chain_with_missing_truth_values() {
        let mut chain = ReasoningChain::new("G");
        for i in 0..6 {
            chain.add_step(format!("P{i}"), format!("P{}", i + 1), "Deduction", None, vec!["x".into()]);
        }
        let score = ConfidenceScorer::new().score_chain(chain.steps());
        assert_eq!(score.components["chain_length"], 0.5);
        assert_eq!(score.components["truth_values"], 0.5);
        // 0.15 + 0.25 + 0.2
        assert!((score.overall - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_score_evidence() {
        let scorer = ConfidenceScorer::new();
        let items = vec![
            EvidenceItem::new("policy", "Cash transfers").with_relevance(0.9),
            EvidenceItem::new("data_source", "Census 2019"),
            EvidenceItem::new("property", "poverty_index = 0.8").with_relevance(0.7),
        ];
        let score = scorer.score_evidence(&items);
        assert_eq!(score.components["quantity"], 0.8);
        assert_eq!(score.components["diversity"], 1.0);
        assert!((score.components["relevance"] - 0.7).abs() < 1e-9);
        assert_eq!(score.explanation, "Based on 3 evidence items from 3 different sources");
        assert_eq!(scorer.score_evidence(&[]).level, ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_score_decision_reports_weak_components() {
        let scorer = ConfidenceScorer::new();
        let sparse = scorer.score_decision(&DecisionInput::default());
        assert_eq!(sparse.components["data_completeness"], 0.0);
        assert_eq!(sparse.components["evidence_support"], 0.3);
        assert!(sparse.explanation.contains("weaker in"));

        let full = scorer.score_decision(&DecisionInput {
            reasoning_steps: Some(3),
            evidence: Some(vec![EvidenceItem::new("a", ""); 5]),
            alternatives: Some(vec!["b".into()]),
            consensus: Some(0.9),
        });
        assert!(full.explanation.ends_with("all factors are strong"));
        assert!(full.overall > sparse.overall);
    }

    #[test]
    fn test_compare_alternatives() {
        let scorer = ConfidenceScorer::new();
        let ranking = scorer.compare_alternatives(&[
            ("weak".into(), DecisionInput::default()),
            ("strong".into(), DecisionInput { reasoning_steps: Some(3), ..Default::default() }),
        ]);
        assert_eq!(ranking.total, 2);
        assert_eq!(ranking.best.as_ref().unwrap().label, "strong");
        assert_eq!(ranking.ranked[1].rank, 2);
        assert!(ranking.highest >= ranking.lowest);
        assert!(scorer.compare_alternatives(&[]).best.is_none());
    }

    #[test]
    fn test_score_from_truth_value() {
        let score = ConfidenceScorer::new().score_from_truth_value(&tv(0.8, 0.6));
        assert!((score.overall - 0.7).abs() < 1e-9);
        assert_eq!(score.level, ConfidenceLevel::High);
    }

    proptest! {
        /// Sem evidência, nenhuma cadeia passa de `medium`.
        #[test]
        fn prop_no_evidence_caps_level(confs in prop::collection::vec(0.0f64..=1.0, 1..8)) {
            let mut chain = ReasoningChain::new("G");
            for c in &confs {
                chain.add_step("p", "q", "Deduction", Some(TruthValue::new(0.5, *c).unwrap()), vec![]);
            }
            let score = ConfidenceScorer::new().score_chain(chain.steps());
            prop_assert!(score.level <= ConfidenceLevel::Medium);
            prop_assert!((0.0..=1.0).contains(&score.overall));
        }
    }
}
