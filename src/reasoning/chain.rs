//! # Cadeias de Raciocínio
//!
//! Uma [`ReasoningChain`] é construída passo a passo (só acrescenta) e então
//! consumida por [`finalize`](ReasoningChain::finalize), que produz uma
//! [`FinalizedChain`] imutável com a confiança calculada **uma única vez**.
//!
//! ```text
//! ReasoningChain ──add_step()──▶ ReasoningChain ──finalize(&scorer)──▶ FinalizedChain
//!   (mutável)                                      (consome self)        (somente leitura)
//! ```
//!
//! Depois de `finalize` não existe mais valor mutável: recalcular ou
//! acrescentar passos simplesmente não compila.
//!
//! ## Nível de cada passo
//!
//! | Confidence do TV | Nível |
//! |------------------|-------|
//! | ≥ 0.8 | high |
//! | ≥ 0.6 | medium |
//! | < 0.6 | low |
//! | sem TV | medium |

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::confidence::{ConfidenceScore, ConfidenceScorer};
use crate::core::TruthValue;
use crate::inference::SupportLevel;

/// Um passo de inferência.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReasoningStep {
    /// Posição 1-based na cadeia.
    pub index: usize,
    pub premise: String,
    pub conclusion: String,
    pub rule: String,
    pub truth_value: Option<TruthValue>,
    pub evidence: Vec<String>,
    pub level: SupportLevel,
}

fn step_level(truth_value: Option<&TruthValue>) -> SupportLevel {
    match truth_value.map(TruthValue::confidence) {
        Some(c) if c >= 0.8 => SupportLevel::High,
        Some(c) if c >= 0.6 => SupportLevel::Medium,
        Some(_) => SupportLevel::Low,
        None => SupportLevel::Medium,
    }
}

/// Cadeia em construção.
#[derive(Clone, Debug)]
pub struct ReasoningChain {
    goal: String,
    steps: Vec<ReasoningStep>,
}

impl ReasoningChain {
    pub fn new(goal: impl Into<String>) -> Self {
        let goal = goal.into();
        tracing::debug!(goal = %goal, "Cadeia: iniciada");
        Self { goal, steps: Vec::new() }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Acrescenta um passo e devolve uma referência a ele.
    pub fn add_step(
        &mut self,
        premise: impl Into<String>,
        conclusion: impl Into<String>,
        rule: impl Into<String>,
        truth_value: Option<TruthValue>,
        evidence: Vec<String>,
    ) -> &ReasoningStep {
        let step = ReasoningStep {
            index: self.steps.len() + 1,
            premise: premise.into(),
            conclusion: conclusion.into(),
            rule: rule.into(),
            level: step_level(truth_value.as_ref()),
            truth_value,
            evidence,
        };
        tracing::debug!(
            step = step.index,
            premise = %step.premise,
            conclusion = %step.conclusion,
            "Cadeia: passo adicionado"
        );
        self.steps.push(step);
        &self.steps[self.steps.len() - 1]
    }

    pub fn add_deduction(
        &mut self,
        premise: impl Into<String>,
        conclusion: impl Into<String>,
        truth_value: TruthValue,
        evidence: Vec<String>,
    ) -> &ReasoningStep {
        self.add_step(premise, conclusion, "Deduction", Some(truth_value), evidence)
    }

    pub fn add_abduction(
        &mut self,
        observation: impl Into<String>,
        hypothesis: impl Into<String>,
        truth_value: TruthValue,
        evidence: Vec<String>,
    ) -> &ReasoningStep {
        self.add_step(observation, hypothesis, "Abduction", Some(truth_value), evidence)
    }

    pub fn add_induction(
        &mut self,
        instances: impl Into<String>,
        generalization: impl Into<String>,
        truth_value: TruthValue,
        evidence: Vec<String>,
    ) -> &ReasoningStep {
        self.add_step(instances, generalization, "Induction", Some(truth_value), evidence)
    }

    /// Fecha a cadeia: calcula a confiança e congela os passos.
    pub fn finalize(self, scorer: &ConfidenceScorer) -> FinalizedChain {
        let confidence = scorer.score_chain(&self.steps);
        tracing::debug!(
            goal = %self.goal,
            steps = self.steps.len(),
            level = %confidence.level,
            "Cadeia: finalizada"
        );
        FinalizedChain {
            id: Uuid::new_v4(),
            goal: self.goal,
            steps: self.steps,
            confidence,
            finalized_at: Utc::now(),
        }
    }
}

/// Cadeia finalizada, somente leitura.
#[derive(Clone, Debug, Serialize)]
pub struct FinalizedChain {
    id: Uuid,
    goal: String,
    steps: Vec<ReasoningStep>,
    confidence: ConfidenceScore,
    finalized_at: DateTime<Utc>,
}

/// Resumo serializável de uma cadeia finalizada.
#[derive(Clone, Debug, Serialize)]
pub struct ChainSummary {
    pub id: Uuid,
    pub goal: String,
    pub total_steps: usize,
    pub confidence: ConfidenceScore,
    pub steps: Vec<ReasoningStep>,
    /// Premissas e objetivo unidos por " → ".
    pub path: String,
    pub finalized_at: DateTime<Utc>,
}

/// Tipo de nó no grafo de uma cadeia.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainNodeKind {
    Start,
    Step,
    Goal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainNode {
    pub id: String,
    pub label: String,
    pub kind: ChainNodeKind,
    pub rule: Option<String>,
    pub level: Option<SupportLevel>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub confidence: Option<f64>,
}

/// Cadeia como grafo `start → step_1 → … → goal`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainGraph {
    pub nodes: Vec<ChainNode>,
    pub edges: Vec<ChainEdge>,
    pub total_steps: usize,
    pub level: String,
}

impl FinalizedChain {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    /// Confiança calculada na finalização.
    pub fn confidence(&self) -> &ConfidenceScore {
        &self.confidence
    }

    pub fn finalized_at(&self) -> DateTime<Utc> {
        self.finalized_at
    }

    /// Caminho "premissa → premissa → objetivo".
    pub fn path(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.premise.as_str())
            .chain(std::iter::once(self.goal.as_str()))
            .collect::<Vec<_>>()
            .join(" → ")
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            id: self.id,
            goal: self.goal.clone(),
            total_steps: self.steps.len(),
            confidence: self.confidence.clone(),
            steps: self.steps.clone(),
            path: self.path(),
            finalized_at: self.finalized_at,
        }
    }

    /// Explicação em texto (markdown leve) para o usuário final.
    pub fn to_text_explanation(&self) -> String {
        let mut lines = vec![format!("**Reasoning Chain: {}**", self.goal), String::new()];
        for step in &self.steps {
            lines.push(format!("**Step {}:** {}", step.index, step.premise));
            lines.push(format!("  ↓ (using: {})", step.rule));
            lines.push(format!("  → {}", step.conclusion));
            if let Some(tv) = step.truth_value {
                lines.push(format!("  Confidence: {:.2}", tv.confidence()));
            }
            if !step.evidence.is_empty() {
                lines.push(format!("  Evidence: {}", step.evidence.join(", ")));
            }
            lines.push(String::new());
        }
        lines.push(format!(
            "**Overall Confidence:** {} ({:.2})",
            self.confidence.level, self.confidence.overall
        ));
        lines.join("\n")
    }

    pub fn to_graph(&self) -> ChainGraph {
        let mut nodes = vec![ChainNode {
            id: "start".into(),
            label: "Start".into(),
            kind: ChainNodeKind::Start,
            rule: None,
            level: None,
        }];
        let mut edges = Vec::with_capacity(self.steps.len() + 1);
        let mut previous = "start".to_string();
        for step in &self.steps {
            let id = format!("step_{}", step.index);
            nodes.push(ChainNode {
                id: id.clone(),
                label: step.conclusion.clone(),
                kind: ChainNodeKind::Step,
                rule: Some(step.rule.clone()),
                level: Some(step.level),
            });
            edges.push(ChainEdge {
                from: previous,
                to: id.clone(),
                label: step.rule.clone(),
                confidence: Some(step.truth_value.map_or(0.5, |tv| tv.confidence())),
            });
            previous = id;
        }
        nodes.push(ChainNode {
            id: "goal".into(),
            label: self.goal.clone(),
            kind: ChainNodeKind::Goal,
            rule: None,
            level: None,
        });
        edges.push(ChainEdge {
            from: previous,
            to: "goal".into(),
            label: "conclusion".into(),
            confidence: None,
        });
        ChainGraph {
            nodes,
            edges,
            total_steps: self.steps.len(),
            level: self.confidence.level.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ConfidenceLevel;

    fn tv(s: f64, c: f64) -> TruthValue {
        TruthValue::new(s, c).unwrap()
    }

    fn sample() -> ReasoningChain {
        let mut chain = ReasoningChain::new("High_Priority");
        chain.add_step(
            "Region_Turkana",
            "High_Poverty_Region",
            "Classification",
            Some(tv(0.9, 0.85)),
            vec!["poverty_index = 0.79".into()],
        );
        chain.add_deduction("High_Poverty_Region", "High_Priority", tv(0.77, 0.69), vec![]);
        chain
    }

    #[test]
    fn test_step_levels() {
        let mut chain = sample();
        assert_eq!(chain.steps()[0].level, SupportLevel::High);
        assert_eq!(chain.steps()[1].level, SupportLevel::Medium);
        assert_eq!(chain.add_abduction("x", "y", tv(0.5, 0.3), vec![]).level, SupportLevel::Low);
        assert_eq!(chain.add_step("x", "y", "Custom", None, vec![]).level, SupportLevel::Medium);
        assert_eq!(chain.steps()[2].rule, "Abduction");
        assert_eq!(chain.steps()[3].index, 4);
    }

    #[test]
    fn test_finalize_caches_confidence() {
        let finalized = sample().finalize(&ConfidenceScorer::new());
        let summary = finalized.summary();
        assert_eq!(summary.total_steps, 2);
        assert_eq!(summary.path, "Region_Turkana → High_Poverty_Region → High_Priority");
        assert_eq!(&summary.confidence, finalized.confidence());
        assert_eq!(summary.id, finalized.id());
    }

    #[test]
    fn test_empty_chain_finalizes_very_low() {
        let finalized = ReasoningChain::new("Nothing").finalize(&ConfidenceScorer::new());
        assert_eq!(finalized.confidence().level, ConfidenceLevel::VeryLow);
        assert_eq!(finalized.path(), "Nothing");
    }

    #[test]
    fn test_text_explanation() {
        let text = sample().finalize(&ConfidenceScorer::new()).to_text_explanation();
        assert!(text.starts_with("**Reasoning Chain: High_Priority**"));
        assert!(text.contains("**Step 2:** High_Poverty_Region"));
        assert!(text.contains("  ↓ (using: Deduction)"));
        assert!(text.contains("  Evidence: poverty_index = 0.79"));
        assert!(text.contains("**Overall Confidence:**"));
    }

    #[test]
    fn test_graph_shape() {
        let graph = sample().finalize(&ConfidenceScorer::new()).to_graph();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "step_1", "step_2", "goal"]);
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.edges[2].label, "conclusion");
        assert_eq!(graph.edges[0].confidence, Some(0.85));
    }
}
