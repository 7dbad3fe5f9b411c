//! # Tabela de Regras — Implicações como Dados
//!
//! Uma [`Rule`] é uma implicação `condição ⇒ conclusão` com um
//! [`TruthValue`]. As regras são **dados**: vivem numa [`RuleTable`]
//! mutável e podem ser adicionadas em tempo de execução (ex: regras de
//! política vindas da ingestão).
//!
//! ## Índice Bidirecional
//!
//! ```text
//! by_condition:  "High_Poverty_Region" → [poverty_implies_priority]   (forward chaining)
//! by_conclusion: "High_Priority"       → [poverty_implies_priority]   (backward chaining)
//! ```
//!
//! ## Regras Padrão
//!
//! | Nome | Condição | Conclusão | TV |
//! |------|----------|-----------|----|
//! | `poverty_implies_priority` | High_Poverty_Region | High_Priority | ⟨0.85, 0.90⟩ |
//! | `impact_boosts_priority` | High_Impact_Project | Increased_Priority | ⟨0.80, 0.85⟩ |
//! | `corruption_reduces_allocation` | High_Corruption_Risk | Reduced_Allocation | ⟨0.75, 0.80⟩ |
//! | `deforestation_needs_intervention` | High_Deforestation | Environmental_Intervention_Needed | ⟨0.80, 0.85⟩ |
//!
//! ## Concorrência
//!
//! Duas chamadas simultâneas a `add_rule` com o mesmo nome: vence a última.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::TruthValue;
use crate::error::{EngineError, EngineResult};

/// Fatos conhecidos com seus graus de verdade, em ordem estável.
pub type FactSet = BTreeMap<String, TruthValue>;

/// Implicação `condition ⇒ conclusion`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct Rule {
    pub name: String,
    pub condition: String,
    pub conclusion: String,
    pub truth_value: TruthValue,
    pub description: String,
}

/// Forma crua; a desserialização valida via [`Rule::new`].
#[derive(Deserialize)]
struct RawRule {
    name: String,
    condition: String,
    conclusion: String,
    truth_value: TruthValue,
    #[serde(default)]
    description: String,
}

impl TryFrom<RawRule> for Rule {
    type Error = EngineError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        Rule::new(raw.name, raw.condition, raw.conclusion, raw.truth_value, raw.description)
    }
}

impl Rule {
    /// Cria uma regra; nome, condição e conclusão não podem ser vazios.
    pub fn new(
        name: impl Into<String>,
        condition: impl Into<String>,
        conclusion: impl Into<String>,
        truth_value: TruthValue,
        description: impl Into<String>,
    ) -> EngineResult<Self> {
        let rule = Self {
            name: name.into(),
            condition: condition.into(),
            conclusion: conclusion.into(),
            truth_value,
            description: description.into(),
        };
        for (field, value) in [
            ("name", &rule.name),
            ("condition", &rule.condition),
            ("conclusion", &rule.conclusion),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::InvalidInput(format!("regra com {field} vazio")));
            }
        }
        Ok(rule)
    }
}

/// Motivo de uma regra não ter sido aplicada.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotAppliedReason {
    /// Nenhuma regra com esse nome.
    UnknownRule,
    /// A condição não consta como verdadeira na evidência.
    ConditionNotMet,
}

/// Resultado estruturado de [`RuleTable::apply_rule`] — nunca um erro.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleApplication {
    Applied {
        rule: String,
        condition: String,
        conclusion: String,
        truth_value: TruthValue,
        explanation: String,
    },
    NotApplied {
        rule: String,
        reason: NotAppliedReason,
    },
}

impl RuleApplication {
    pub fn is_applied(&self) -> bool {
        matches!(self, RuleApplication::Applied { .. })
    }

    /// TV da regra, se aplicada.
    pub fn truth_value(&self) -> Option<TruthValue> {
        match self {
            RuleApplication::Applied { truth_value, .. } => Some(*truth_value),
            RuleApplication::NotApplied { .. } => None,
        }
    }
}

/// Nível qualitativo de um fato de evidência.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    High,
    Medium,
    Low,
}

impl SupportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportLevel::High => "high",
            SupportLevel::Medium => "medium",
            SupportLevel::Low => "low",
        }
    }

    fn of(tv: &TruthValue) -> Self {
        if tv.is_confident() {
            SupportLevel::High
        } else if tv.confidence() > 0.5 {
            SupportLevel::Medium
        } else {
            SupportLevel::Low
        }
    }
}

/// Fato de evidência avaliado.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupportingFact {
    pub fact: String,
    pub truth_value: TruthValue,
    pub level: SupportLevel,
}

/// Conclusão explicada pela conjunção de suas evidências.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvidenceExplanation {
    pub conclusion: String,
    pub truth_value: TruthValue,
    pub level: SupportLevel,
    pub evidence: Vec<SupportingFact>,
    pub explanation: String,
}

/// Combina as evidências de uma conclusão por conjunção.
///
/// Sem evidência: ⟨0.5, 0.0⟩ e "No evidence provided".
pub fn explain_with_evidence(
    conclusion: &str,
    evidence: &[(String, TruthValue)],
) -> EvidenceExplanation {
    let Some(((_, first), rest)) = evidence.split_first() else {
        return EvidenceExplanation {
            conclusion: conclusion.to_string(),
            truth_value: TruthValue::unknown(),
            level: SupportLevel::Low,
            evidence: Vec::new(),
            explanation: "No evidence provided".to_string(),
        };
    };
    let overall = rest.iter().fold(*first, |acc, (_, tv)| acc.conjunction(tv));
    let facts: Vec<SupportingFact> = evidence
        .iter()
        .map(|(fact, tv)| SupportingFact {
            fact: fact.clone(),
            truth_value: *tv,
            level: SupportLevel::of(tv),
        })
        .collect();
    let explanation = facts
        .iter()
        .map(|f| format!("{} (confidence: {}, {})", f.fact, f.level.as_str(), f.truth_value))
        .collect::<Vec<_>>()
        .join(" AND ");
    EvidenceExplanation {
        conclusion: conclusion.to_string(),
        truth_value: overall,
        level: SupportLevel::of(&overall),
        evidence: facts,
        explanation,
    }
}

/// Tabela mutável de regras com índice por condição e por conclusão.
#[derive(Clone, Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
    by_condition: HashMap<String, Vec<usize>>,
    by_conclusion: HashMap<String, Vec<usize>>,
}

impl RuleTable {
    /// Tabela vazia.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tabela com as quatro regras de política padrão.
    pub fn with_default_rules() -> EngineResult<Self> {
        let mut table = Self::new();
        let defaults = [
            (
                "poverty_implies_priority",
                "High_Poverty_Region",
                "High_Priority",
                (0.85, 0.90),
                "Regions with high poverty should receive high priority",
            ),
            (
                "impact_boosts_priority",
                "High_Impact_Project",
                "Increased_Priority",
                (0.80, 0.85),
                "Projects with high expected impact raise allocation priority",
            ),
            (
                "corruption_reduces_allocation",
                "High_Corruption_Risk",
                "Reduced_Allocation",
                (0.75, 0.80),
                "High corruption risk reduces recommended allocation",
            ),
            (
                "deforestation_needs_intervention",
                "High_Deforestation",
                "Environmental_Intervention_Needed",
                (0.80, 0.85),
                "High deforestation calls for environmental intervention",
            ),
        ];
        for (name, condition, conclusion, (s, c), description) in defaults {
            table.add_rule(Rule::new(
                name,
                condition,
                conclusion,
                TruthValue::new(s, c)?,
                description,
            )?);
        }
        tracing::info!(rules = table.len(), "Regras: tabela padrão carregada");
        Ok(table)
    }

    /// Adiciona (ou substitui, pelo nome) uma regra.
    ///
    /// Retorna a regra anterior com o mesmo nome, se havia.
    pub fn add_rule(&mut self, rule: Rule) -> Option<Rule> {
        tracing::debug!(rule = %rule.name, condition = %rule.condition, conclusion = %rule.conclusion, "Regras: regra registrada");
        match self.by_name.get(&rule.name).copied() {
            Some(index) => {
                let previous = std::mem::replace(&mut self.rules[index], rule);
                self.rebuild_index();
                Some(previous)
            }
            None => {
                let index = self.rules.len();
                self.index_rule(index, &rule);
                self.rules.push(rule);
                None
            }
        }
    }

    /// Remove uma regra pelo nome.
    ///
    /// # Erros
    ///
    /// [`EngineError::UnknownRule`] se o nome não existir.
    pub fn remove_rule(&mut self, name: &str) -> EngineResult<Rule> {
        let index = self
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownRule(name.to_string()))?;
        let removed = self.rules.remove(index);
        self.rebuild_index();
        Ok(removed)
    }

    fn index_rule(&mut self, index: usize, rule: &Rule) {
        self.by_name.insert(rule.name.clone(), index);
        self.by_condition.entry(rule.condition.clone()).or_default().push(index);
        self.by_conclusion.entry(rule.conclusion.clone()).or_default().push(index);
    }

    fn rebuild_index(&mut self) {
        self.by_name.clear();
        self.by_condition.clear();
        self.by_conclusion.clear();
        let rules = std::mem::take(&mut self.rules);
        for (index, rule) in rules.iter().enumerate() {
            self.index_rule(index, rule);
        }
        self.rules = rules;
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.by_name.get(name).and_then(|&i| self.rules.get(i))
    }

    /// Regras em ordem de registro.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Regras cuja condição é `condition` (ordem de registro).
    pub fn rules_for_condition(&self, condition: &str) -> Vec<&Rule> {
        self.lookup(&self.by_condition, condition)
    }

    /// Regras cuja conclusão é `conclusion` (ordem de registro).
    pub fn rules_for_conclusion(&self, conclusion: &str) -> Vec<&Rule> {
        self.lookup(&self.by_conclusion, conclusion)
    }

    fn lookup(&self, index: &HashMap<String, Vec<usize>>, key: &str) -> Vec<&Rule> {
        index
            .get(key)
            .map(|ids| ids.iter().filter_map(|&i| self.rules.get(i)).collect())
            .unwrap_or_default()
    }

    /// Aplica uma regra contra evidência booleana.
    ///
    /// Nunca falha: regra desconhecida ou condição ausente resultam em
    /// [`RuleApplication::NotApplied`].
    pub fn apply_rule(&self, name: &str, evidence: &BTreeMap<String, bool>) -> RuleApplication {
        let Some(rule) = self.rule(name) else {
            tracing::warn!(rule = %name, "Regras: regra desconhecida");
            return RuleApplication::NotApplied {
                rule: name.to_string(),
                reason: NotAppliedReason::UnknownRule,
            };
        };
        if evidence.get(&rule.condition).copied().unwrap_or(false) {
            RuleApplication::Applied {
                rule: rule.name.clone(),
                condition: rule.condition.clone(),
                conclusion: rule.conclusion.clone(),
                truth_value: rule.truth_value,
                explanation: rule.description.clone(),
            }
        } else {
            RuleApplication::NotApplied {
                rule: rule.name.clone(),
                reason: NotAppliedReason::ConditionNotMet,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(s: f64, c: f64) -> TruthValue {
        TruthValue::new(s, c).unwrap()
    }

    #[test]
    fn test_deserialize_rejects_empty_fields() {
        let rule = Rule::new("r", "A", "B", tv(0.9, 0.8), "desc").unwrap();
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(serde_json::from_str::<Rule>(&json).unwrap(), rule);

        let empty = r#"{"name":"r","condition":" ","conclusion":"B","truth_value":{"strength":0.9,"confidence":0.8},"description":""}"#;
        assert!(serde_json::from_str::<Rule>(empty).is_err());
    }

    #[test]
    fn test_default_rules_indexed_both_ways() {
        let table = RuleTable::with_default_rules().unwrap();
        assert_eq!(table.len(), 4);
        let fwd = table.rules_for_condition("High_Poverty_Region");
        assert_eq!(fwd[0].name, "poverty_implies_priority");
        let bwd = table.rules_for_conclusion("Reduced_Allocation");
        assert_eq!(bwd[0].name, "corruption_reduces_allocation");
        assert_eq!(table.rule("poverty_implies_priority").unwrap().truth_value, tv(0.85, 0.9));
    }

    #[test]
    fn test_apply_rule() {
        let table = RuleTable::with_default_rules().unwrap();
        let evidence = BTreeMap::from([("High_Poverty_Region".to_string(), true)]);

        let applied = table.apply_rule("poverty_implies_priority", &evidence);
        assert!(applied.is_applied());
        assert_eq!(applied.truth_value(), Some(tv(0.85, 0.9)));

        let unmet = table.apply_rule("impact_boosts_priority", &evidence);
        assert_eq!(
            unmet,
            RuleApplication::NotApplied {
                rule: "impact_boosts_priority".into(),
                reason: NotAppliedReason::ConditionNotMet
            }
        );
    }

    /// Regra desconhecida não é erro: vira um resultado estruturado.
    #[test]
    fn test_unknown_rule_is_not_applied() {
        let table = RuleTable::new();
        let r = table.apply_rule("nope", &BTreeMap::new());
        assert!(matches!(
            r,
            RuleApplication::NotApplied { reason: NotAppliedReason::UnknownRule, .. }
        ));
    }

    /// Mesmo nome: a última escrita vence e o índice acompanha.
    #[test]
    fn test_add_rule_replaces_by_name() {
        let mut table = RuleTable::with_default_rules().unwrap();
        let previous = table.add_rule(
            Rule::new("poverty_implies_priority", "Extreme_Poverty", "High_Priority", tv(0.9, 0.9), "")
                .unwrap(),
        );
        assert!(previous.is_some());
        assert_eq!(table.len(), 4);
        assert!(table.rules_for_condition("High_Poverty_Region").is_empty());
        assert_eq!(table.rules_for_condition("Extreme_Poverty").len(), 1);
    }

    #[test]
    fn test_remove_rule() {
        let mut table = RuleTable::with_default_rules().unwrap();
        table.remove_rule("impact_boosts_priority").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rules_for_conclusion("Reduced_Allocation").len(), 1);
        assert!(matches!(table.remove_rule("impact_boosts_priority"), Err(EngineError::UnknownRule(_))));
    }

    #[test]
    fn test_rule_rejects_empty_fields() {
        assert!(Rule::new("r", "", "B", tv(0.5, 0.5), "").is_err());
    }

    #[test]
    fn test_explain_with_evidence() {
        let e = explain_with_evidence(
            "High_Priority",
            &[("poverty".into(), tv(0.9, 0.8)), ("policy".into(), tv(0.8, 0.6))],
        );
        assert!((e.truth_value.strength() - 0.72).abs() < 1e-9);
        assert!((e.truth_value.confidence() - 0.6).abs() < 1e-9);
        assert_eq!(e.evidence[0].level, SupportLevel::High);
        assert_eq!(e.evidence[1].level, SupportLevel::Medium);
        assert!(e.explanation.contains(" AND "));
        assert!(e.explanation.contains("confidence: high"));

        let empty = explain_with_evidence("X", &[]);
        assert_eq!(empty.truth_value, TruthValue::unknown());
        assert_eq!(empty.explanation, "No evidence provided");
    }
}
