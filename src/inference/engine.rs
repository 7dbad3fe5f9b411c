//! # Motor de Inferência Probabilística
//!
//! Deriva conclusões a partir de fatos com [`TruthValue`] usando as regras
//! de uma [`RuleTable`]. O motor é **sem estado**: recebe a tabela por
//! referência (o chamador segura o read guard pela chamada inteira, o que
//! garante um snapshot consistente).
//!
//! ## Estratégias
//!
//! | Estratégia | Direção | Composição | Limite |
//! |------------|---------|------------|--------|
//! | [`forward_chaining`](InferenceEngine::forward_chaining) | fatos → conclusões | dedução | `max_steps` |
//! | [`backward_chaining`](InferenceEngine::backward_chaining) | objetivo → fatos | dedução | `max_depth` (≤ 32) |
//! | [`abductive`](InferenceEngine::abductive) | observação → causas | abdução | — |
//! | [`analogical`](InferenceEngine::analogical) | caso → caso | similaridade > 0.7 | — |
//! | [`probabilistic_inference`](InferenceEngine::probabilistic_inference) | evidência → consulta | conjunção | — |
//!
//! ## Encadeamento para frente
//!
//! ```text
//! conjunto = premissas
//! repetir até max_steps:
//!   para cada regra (ordem de registro):
//!     se condição ∈ conjunto e conclusão ∉ conjunto:
//!       conjunto[conclusão] = dedução(conjunto[condição], regra.tv)
//!   nada novo? pare
//! ```
//!
//! Conclusões entram no conjunto assim que derivadas, então uma mesma
//! iteração pode encadear várias regras. Cada resultado carrega o caminho
//! completo desde a premissa de origem.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::rules::{FactSet, RuleTable};
use crate::config::MAX_DEPTH_CAP;
use crate::core::TruthValue;

/// Limiar de similaridade para transferência analógica.
const ANALOGY_THRESHOLD: f64 = 0.7;

/// Strength fixa da solução transferida por analogia.
const ANALOGY_STRENGTH: f64 = 0.8;

/// Resultado de uma inferência, com proveniência completa.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub conclusion: String,
    pub truth_value: TruthValue,
    /// Fatos percorridos, da premissa de origem até a conclusão.
    pub inference_path: Vec<String>,
    pub premises_used: Vec<String>,
    pub rules_applied: Vec<String>,
    /// Iteração (forward) ou número de regras encadeadas (backward).
    pub depth: usize,
}

impl InferenceResult {
    fn known(fact: &str, truth_value: TruthValue) -> Self {
        Self {
            conclusion: fact.to_string(),
            truth_value,
            inference_path: vec![fact.to_string()],
            premises_used: Vec::new(),
            rules_applied: Vec::new(),
            depth: 0,
        }
    }
}

/// Valor de uma característica de um caso.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Caso rotulado por características, usado na inferência analógica.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub features: BTreeMap<String, FeatureValue>,
    /// Solução conhecida (só o caso-fonte precisa ter).
    pub solution: Option<String>,
}

impl Case {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn feature(mut self, name: impl Into<String>, value: FeatureValue) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }
}

/// Similaridade média sobre as características em comum.
///
/// - numérica: `1 − |a − b| / max(|a|, |b|, 1)`
/// - demais: 1.0 se iguais, 0.0 caso contrário
///
/// Sem características em comum: 0.0.
pub fn case_similarity(a: &Case, b: &Case) -> f64 {
    let scores: Vec<f64> = a
        .features
        .iter()
        .filter_map(|(name, va)| b.features.get(name).map(|vb| (va, vb)))
        .map(|pair| match pair {
            (FeatureValue::Number(x), FeatureValue::Number(y)) => {
                let scale = x.abs().max(y.abs()).max(1.0);
                1.0 - (x - y).abs() / scale
            }
            (x, y) if x == y => 1.0,
            _ => 0.0,
        })
        .collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Motor de inferência — struct sem estado.
pub struct InferenceEngine;

impl InferenceEngine {
    /// Encadeamento para frente até o ponto fixo ou `max_steps` iterações.
    ///
    /// Sempre termina: cada iteração ou acrescenta um fato novo ao conjunto
    /// (finito, limitado pelas conclusões das regras) ou encerra o laço.
    pub fn forward_chaining(
        rules: &RuleTable,
        premises: &[(String, TruthValue)],
        max_steps: usize,
    ) -> Vec<InferenceResult> {
        let mut working: HashMap<String, TruthValue> = HashMap::new();
        // fato → (caminho, regras) desde a premissa de origem
        let mut provenance: HashMap<String, (Vec<String>, Vec<String>)> = HashMap::new();
        for (fact, tv) in premises {
            working.entry(fact.clone()).or_insert(*tv);
            provenance
                .entry(fact.clone())
                .or_insert_with(|| (vec![fact.clone()], Vec::new()));
        }

        let mut results = Vec::new();
        for step in 0..max_steps {
            let before = results.len();
            for rule in rules.rules() {
                if working.contains_key(&rule.conclusion) {
                    continue;
                }
                let Some(premise_tv) = working.get(&rule.condition).copied() else {
                    continue;
                };
                let (mut path, mut applied) =
                    provenance.get(&rule.condition).cloned().unwrap_or_default();
                path.push(rule.conclusion.clone());
                applied.push(rule.name.clone());

                let tv = premise_tv.deduction(&rule.truth_value);
                working.insert(rule.conclusion.clone(), tv);
                provenance.insert(rule.conclusion.clone(), (path.clone(), applied.clone()));
                results.push(InferenceResult {
                    conclusion: rule.conclusion.clone(),
                    truth_value: tv,
                    premises_used: vec![path[0].clone()],
                    inference_path: path,
                    rules_applied: applied,
                    depth: step + 1,
                });
            }
            if results.len() == before {
                break;
            }
        }
        tracing::debug!(inferences = results.len(), "Inferência: forward chaining concluído");
        results
    }

    /// Encadeamento para trás: prova `goal` a partir de `known`.
    ///
    /// Retorna `None` se nenhuma cadeia de regras sustenta o objetivo dentro
    /// de `max_depth` (limitado a [`MAX_DEPTH_CAP`]).
    pub fn backward_chaining(
        rules: &RuleTable,
        goal: &str,
        known: &FactSet,
        max_depth: usize,
    ) -> Option<InferenceResult> {
        Self::prove(rules, goal, known, max_depth.min(MAX_DEPTH_CAP))
    }

    fn prove(
        rules: &RuleTable,
        goal: &str,
        known: &FactSet,
        depth_left: usize,
    ) -> Option<InferenceResult> {
        if let Some(tv) = known.get(goal) {
            return Some(InferenceResult::known(goal, *tv));
        }
        if depth_left == 0 {
            return None;
        }
        rules.rules_for_conclusion(goal).into_iter().find_map(|rule| {
            let sub = Self::prove(rules, &rule.condition, known, depth_left - 1)?;
            let mut inference_path = sub.inference_path;
            inference_path.push(goal.to_string());
            let mut premises_used = sub.premises_used;
            premises_used.push(rule.condition.clone());
            let mut rules_applied = sub.rules_applied;
            rules_applied.push(rule.name.clone());
            Some(InferenceResult {
                conclusion: goal.to_string(),
                truth_value: sub.truth_value.deduction(&rule.truth_value),
                inference_path,
                premises_used,
                rules_applied,
                depth: sub.depth + 1,
            })
        })
    }

    /// Abdução: ranqueia causas candidatas para uma observação.
    ///
    /// A observação usa o TV conhecido ou ⟨1.0, 0.8⟩. Ordenação estável por
    /// strength decrescente.
    pub fn abductive(
        rules: &RuleTable,
        observation: &str,
        candidates: &[String],
        known: &FactSet,
    ) -> Vec<InferenceResult> {
        let observed = known
            .get(observation)
            .copied()
            .unwrap_or_else(TruthValue::observed);
        let mut hypotheses: Vec<InferenceResult> = candidates
            .iter()
            .flat_map(|cause| {
                rules
                    .rules_for_condition(cause)
                    .into_iter()
                    .filter(|rule| rule.conclusion == observation)
                    .map(move |rule| InferenceResult {
                        conclusion: cause.clone(),
                        truth_value: rule.truth_value.abduction(&observed),
                        inference_path: vec![observation.to_string(), cause.clone()],
                        premises_used: vec![observation.to_string()],
                        rules_applied: vec![rule.name.clone()],
                        depth: 1,
                    })
            })
            .collect();
        hypotheses.sort_by(|a, b| {
            b.truth_value
                .strength()
                .total_cmp(&a.truth_value.strength())
        });
        hypotheses
    }

    /// Analogia: transfere a solução de `source` para `target` quando a
    /// similaridade passa de 0.7. Resultado com TV ⟨0.8, similaridade⟩.
    pub fn analogical(source: &Case, target: &Case) -> Option<InferenceResult> {
        let similarity = case_similarity(source, target);
        if similarity <= ANALOGY_THRESHOLD {
            return None;
        }
        source.solution.as_ref()?;
        let truth_value = TruthValue::new(ANALOGY_STRENGTH, similarity.clamp(0.0, 1.0)).ok()?;
        Some(InferenceResult {
            conclusion: format!("Solution_for_{}", target.id),
            truth_value,
            inference_path: vec![format!("Similar_to_{}", source.id)],
            premises_used: vec![source.id.clone()],
            rules_applied: vec!["Analogical_Transfer".to_string()],
            depth: 1,
        })
    }

    /// Combina por conjunção toda evidência cujo nome contém `query`
    /// (sem diferenciar maiúsculas). Sem evidência relevante: ⟨0.5, 0.1⟩.
    pub fn probabilistic_inference(evidence: &FactSet, query: &str) -> TruthValue {
        let needle = query.to_lowercase();
        evidence
            .iter()
            .filter(|(fact, _)| fact.to_lowercase().contains(&needle))
            .map(|(_, tv)| *tv)
            .reduce(|acc, tv| acc.conjunction(&tv))
            .unwrap_or_else(TruthValue::vague)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::rules::Rule;

    fn tv(s: f64, c: f64) -> TruthValue {
        TruthValue::new(s, c).unwrap()
    }

    fn chain_table() -> RuleTable {
        let mut t = RuleTable::new();
        t.add_rule(Rule::new("ab", "A", "B", tv(0.9, 0.9), "").unwrap());
        t.add_rule(Rule::new("bc", "B", "C", tv(0.8, 0.8), "").unwrap());
        t
    }

    #[test]
    fn test_forward_chaining_tracks_full_path() {
        let results =
            InferenceEngine::forward_chaining(&chain_table(), &[("A".into(), tv(1.0, 0.9))], 10);
        assert_eq!(results.len(), 2);
        let c = &results[1];
        assert_eq!(c.conclusion, "C");
        assert_eq!(c.inference_path, vec!["A", "B", "C"]);
        assert_eq!(c.rules_applied, vec!["ab", "bc"]);
        assert_eq!(c.premises_used, vec!["A"]);
        assert!((c.truth_value.strength() - 0.72).abs() < 1e-9);
    }

    #[test]
    fn test_forward_chaining_skips_known_conclusions() {
        let results = InferenceEngine::forward_chaining(
            &chain_table(),
            &[("A".into(), tv(1.0, 0.9)), ("B".into(), tv(0.1, 0.1))],
            10,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].conclusion, "C");
        assert!((results[0].truth_value.strength() - 0.08).abs() < 1e-9);
    }

    /// Regras cíclicas não impedem a terminação.
    #[test]
    fn test_forward_chaining_terminates_on_cycles() {
        let mut t = chain_table();
        t.add_rule(Rule::new("ca", "C", "A", tv(0.5, 0.5), "").unwrap());
        let results = InferenceEngine::forward_chaining(&t, &[("B".into(), tv(1.0, 1.0))], 3);
        assert_eq!(results.len(), 2);
        assert!(InferenceEngine::forward_chaining(&t, &[("B".into(), tv(1.0, 1.0))], 0).is_empty());
    }

    #[test]
    fn test_backward_chaining() {
        let known = FactSet::from([("A".to_string(), tv(1.0, 0.9))]);
        let r = InferenceEngine::backward_chaining(&chain_table(), "C", &known, 5).unwrap();
        assert_eq!(r.inference_path, vec!["A", "B", "C"]);
        assert_eq!(r.rules_applied, vec!["ab", "bc"]);
        assert_eq!(r.depth, 2);

        let known_goal = InferenceEngine::backward_chaining(&chain_table(), "A", &known, 5).unwrap();
        assert_eq!(known_goal.depth, 0);
    }

    #[test]
    fn test_backward_chaining_respects_depth() {
        let known = FactSet::from([("A".to_string(), tv(1.0, 0.9))]);
        assert!(InferenceEngine::backward_chaining(&chain_table(), "C", &known, 1).is_none());
        assert!(InferenceEngine::backward_chaining(&chain_table(), "Z", &known, 5).is_none());
    }

    #[test]
    fn test_backward_chaining_cycle_fails_closed() {
        let mut t = RuleTable::new();
        t.add_rule(Rule::new("xy", "X", "Y", tv(0.9, 0.9), "").unwrap());
        t.add_rule(Rule::new("yx", "Y", "X", tv(0.9, 0.9), "").unwrap());
        assert!(InferenceEngine::backward_chaining(&t, "X", &FactSet::new(), 1000).is_none());
    }

    #[test]
    fn test_abductive_ranks_by_strength() {
        let mut t = RuleTable::new();
        t.add_rule(Rule::new("weak", "Drought", "Food_Insecurity", tv(0.5, 0.9), "").unwrap());
        t.add_rule(Rule::new("strong", "Poverty", "Food_Insecurity", tv(0.9, 0.9), "").unwrap());
        let ranked = InferenceEngine::abductive(
            &t,
            "Food_Insecurity",
            &["Drought".into(), "Poverty".into(), "Flood".into()],
            &FactSet::new(),
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].conclusion, "Poverty");
        // 0.9 × 1.0 × 0.8 ; min(0.9, 0.8) × 0.7
        assert!((ranked[0].truth_value.strength() - 0.72).abs() < 1e-9);
        assert!((ranked[0].truth_value.confidence() - 0.56).abs() < 1e-9);
    }

    #[test]
    fn test_case_similarity() {
        let a = Case::new("a")
            .feature("poverty", FeatureValue::Number(0.8))
            .feature("climate", FeatureValue::Text("arid".into()));
        let b = Case::new("b")
            .feature("poverty", FeatureValue::Number(0.6))
            .feature("climate", FeatureValue::Text("humid".into()))
            .feature("coastal", FeatureValue::Flag(true));
        // (1 − 0.2/1) + 0 / 2
        assert!((case_similarity(&a, &b) - 0.4).abs() < 1e-9);
        assert_eq!(case_similarity(&a, &Case::new("c")), 0.0);
    }

    #[test]
    fn test_analogical_transfer() {
        let source = Case::new("Kisumu")
            .feature("poverty", FeatureValue::Number(0.8))
            .feature("rural", FeatureValue::Flag(true))
            .solution("Cash_Transfers");
        let target = Case::new("Turkana")
            .feature("poverty", FeatureValue::Number(0.75))
            .feature("rural", FeatureValue::Flag(true));
        let r = InferenceEngine::analogical(&source, &target).unwrap();
        assert_eq!(r.conclusion, "Solution_for_Turkana");
        assert_eq!(r.inference_path, vec!["Similar_to_Kisumu"]);
        assert_eq!(r.truth_value.strength(), 0.8);
        assert!(r.truth_value.confidence() > 0.7);

        let no_solution = Case { solution: None, ..source };
        assert!(InferenceEngine::analogical(&no_solution, &target).is_none());
    }

    #[test]
    fn test_probabilistic_inference() {
        let evidence = FactSet::from([
            ("High_Poverty".to_string(), tv(0.9, 0.8)),
            ("poverty_trend".to_string(), tv(0.8, 0.6)),
            ("Rainfall".to_string(), tv(0.1, 0.9)),
        ]);
        let combined = InferenceEngine::probabilistic_inference(&evidence, "POVERTY");
        assert!((combined.strength() - 0.72).abs() < 1e-9);
        assert!((combined.confidence() - 0.6).abs() < 1e-9);
        let none = InferenceEngine::probabilistic_inference(&evidence, "corruption");
        assert_eq!((none.strength(), none.confidence()), (0.5, 0.1));
    }
}
