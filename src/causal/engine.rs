//! # Grafo Causal — Descoberta, Cadeias e Efeitos
//!
//! Lista de adjacência `causa → [CausalRelation]`. Ciclos são permitidos:
//! toda busca é limitada em profundidade e evita revisitar nós **no mesmo
//! caminho**.
//!
//! ## Descoberta por correlação
//!
//! [`CausalGraph::discover`] é um **detector de correlação**, não um
//! algoritmo de descoberta causal: não controla confundidores nem verifica
//! precedência temporal. Para cada par de variáveis com `|r| > 0.6`:
//!
//! ```text
//! strength   = |r|
//! confidence = min(0.7, n_observações / 10)
//! ```
//!
//! Um par gera **uma** relação, orientada pela ordem em que as variáveis
//! aparecem nos dados. A correlação é simétrica; a direção é convenção.
//!
//! ## Estimativa de efeito
//!
//! ```text
//! aresta direta?     → strength × intervenção,          conf da aresta      (direct)
//! senão, cadeia mais curta → Π strengths, min(conf) × 0.8                   (indirect)
//! senão              → 0.0, 0.0                                             (none)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::relation::{CausalRelation, Observation};
use crate::config::MAX_DEPTH_CAP;

/// Mínimo de observações para tentar a descoberta.
const MIN_OBSERVATIONS: usize = 3;

/// `|r|` acima disso sugere relação.
const CORRELATION_THRESHOLD: f64 = 0.6;

/// Teto de confiança de uma relação descoberta.
const DISCOVERY_MAX_CONFIDENCE: f64 = 0.7;

/// Penalidade de confiança para efeitos indiretos.
const INDIRECT_PENALTY: f64 = 0.8;

/// Como um efeito foi estimado.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMethod {
    Direct,
    Indirect,
    None,
}

/// Efeito estimado de `cause` sobre `effect`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CausalEffect {
    pub cause: String,
    pub effect: String,
    pub estimated_effect: f64,
    pub confidence: f64,
    pub method: EffectMethod,
    /// Caminho usado (vazio quando não há caminho).
    pub chain: Vec<String>,
}

impl CausalEffect {
    /// Texto curto do método, ex: "Indirect through 3 steps".
    pub fn method_description(&self) -> String {
        match self.method {
            EffectMethod::Direct => "Direct causal relation".to_string(),
            EffectMethod::Indirect => format!("Indirect through {} steps", self.chain.len()),
            EffectMethod::None => "No causal path found".to_string(),
        }
    }
}

/// Efeito contrafactual sobre uma variável.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterfactualEffect {
    pub actual: f64,
    pub counterfactual: f64,
    pub change: f64,
    pub confidence: f64,
}

/// Resultado de [`CausalGraph::counterfactual`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterfactualAnalysis {
    pub intervention: BTreeMap<String, f64>,
    pub effects: BTreeMap<String, CounterfactualEffect>,
}

/// Causa presente no contexto que explica um resultado.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CausalFactor {
    pub cause: String,
    pub strength: f64,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub value: serde_json::Value,
}

/// Resultado de [`CausalGraph::explain_outcome`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CausalExplanation {
    pub outcome: String,
    pub factors: Vec<CausalFactor>,
    pub primary_cause: Option<CausalFactor>,
}

/// Aresta na visão serializável do grafo.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CausalEdge {
    pub from: String,
    pub to: String,
    pub strength: f64,
    pub confidence: f64,
}

/// Nós e arestas do grafo, para visualização.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CausalGraphView {
    pub nodes: Vec<String>,
    pub edges: Vec<CausalEdge>,
}

/// Grafo causal em lista de adjacência.
#[derive(Clone, Debug, Default)]
pub struct CausalGraph {
    adjacency: BTreeMap<String, Vec<CausalRelation>>,
    edges: usize,
}

impl CausalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra uma relação. Arestas repetidas são aceitas.
    pub fn add(&mut self, relation: CausalRelation) {
        tracing::debug!(
            cause = %relation.cause,
            effect = %relation.effect,
            strength = relation.strength,
            "Causal: relação registrada"
        );
        self.adjacency.entry(relation.cause.clone()).or_default().push(relation);
        self.edges += 1;
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges == 0
    }

    /// Todas as relações, agrupadas por causa em ordem alfabética.
    pub fn relations(&self) -> impl Iterator<Item = &CausalRelation> {
        self.adjacency.values().flatten()
    }

    /// Efeitos diretos de `cause`, em ordem de registro.
    pub fn effects_of(&self, cause: &str) -> &[CausalRelation] {
        self.adjacency.get(cause).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Primeira aresta `cause → effect`, se houver.
    pub fn direct_edge(&self, cause: &str, effect: &str) -> Option<&CausalRelation> {
        self.effects_of(cause).iter().find(|r| r.effect == effect)
    }

    // ════════════════════════════════════════════════════════════════
    // DESCOBERTA
    // ════════════════════════════════════════════════════════════════

    /// Propõe relações a partir de dados observacionais (não registra).
    ///
    /// Menos de 3 observações: lista vazia e um aviso.
    pub fn discover(data: &[Observation]) -> Vec<CausalRelation> {
        if data.len() < MIN_OBSERVATIONS {
            tracing::warn!(observations = data.len(), "Causal: dados insuficientes para descoberta");
            return Vec::new();
        }

        let mut variables: Vec<&str> = Vec::new();
        for obs in data {
            for name in obs.variables() {
                if !variables.contains(&name) {
                    variables.push(name);
                }
            }
        }
        let pairs: Vec<(&str, &str)> = variables
            .iter()
            .enumerate()
            .flat_map(|(i, a)| variables[i + 1..].iter().map(move |b| (*a, *b)))
            .collect();

        let confidence = (data.len() as f64 / 10.0).min(DISCOVERY_MAX_CONFIDENCE);
        let relations: Vec<CausalRelation> = pairs
            .par_iter()
            .filter_map(|&(a, b)| {
                let r = correlation(data, a, b);
                // NaN/∞ nos dados não viram relação
                if !r.is_finite() || r.abs() <= CORRELATION_THRESHOLD {
                    return None;
                }
                CausalRelation::new(a, b, r.abs().min(1.0), confidence)
                    .ok()
                    .map(|rel| {
                        rel.with_evidence(format!("Correlation: {r:.2}"))
                            .with_mechanism("Statistical association")
                    })
            })
            .collect();

        tracing::info!(
            observations = data.len(),
            variables = variables.len(),
            relations = relations.len(),
            "Causal: descoberta concluída"
        );
        relations
    }

    // ════════════════════════════════════════════════════════════════
    // CADEIAS
    // ════════════════════════════════════════════════════════════════

    /// Todos os caminhos `start → … → end` com até `max_depth` arestas.
    ///
    /// DFS iterativa com pilha explícita; um nó não se repete dentro do
    /// mesmo caminho. `start == end` devolve a cadeia trivial `[[start]]`.
    pub fn infer_chains(&self, start: &str, end: &str, max_depth: usize) -> Vec<Vec<String>> {
        let max_depth = max_depth.min(MAX_DEPTH_CAP);
        let mut chains = Vec::new();

        let mut stack: Vec<Vec<&str>> = vec![vec![start]];
        while let Some(path) = stack.pop() {
            let Some(&current) = path.last() else { continue };
            if current == end {
                chains.push(path.iter().map(|s| s.to_string()).collect());
                continue;
            }
            if path.len() > max_depth {
                continue;
            }
            // ordem reversa na pilha = ordem de registro na visita
            for relation in self.effects_of(current).iter().rev() {
                let next = relation.effect.as_str();
                if !path.contains(&next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    stack.push(extended);
                }
            }
        }
        tracing::debug!(start, end, chains = chains.len(), "Causal: cadeias encontradas");
        chains
    }

    // ════════════════════════════════════════════════════════════════
    // EFEITOS
    // ════════════════════════════════════════════════════════════════

    /// Estima o efeito de `cause` sobre `effect`.
    ///
    /// `intervention` escala apenas o efeito direto (1.0 se ausente).
    pub fn estimate_effect(
        &self,
        cause: &str,
        effect: &str,
        intervention: Option<f64>,
        max_depth: usize,
    ) -> CausalEffect {
        let base = |estimated_effect, confidence, method, chain| CausalEffect {
            cause: cause.to_string(),
            effect: effect.to_string(),
            estimated_effect,
            confidence,
            method,
            chain,
        };

        if let Some(edge) = self.direct_edge(cause, effect) {
            return base(
                edge.strength * intervention.unwrap_or(1.0),
                edge.confidence,
                EffectMethod::Direct,
                vec![cause.to_string(), effect.to_string()],
            );
        }

        let chains = self.infer_chains(cause, effect, max_depth);
        // a cadeia trivial [cause] (cause == effect) não é um efeito
        let Some(shortest) = chains
            .into_iter()
            .filter(|chain| chain.len() > 1)
            .min_by_key(Vec::len)
        else {
            return base(0.0, 0.0, EffectMethod::None, Vec::new());
        };

        let (strength, confidence) = shortest.windows(2).fold((1.0, 1.0), |(s, c), hop| {
            match self.direct_edge(&hop[0], &hop[1]) {
                Some(edge) => (s * edge.strength, f64::min(c, edge.confidence)),
                None => (s, c),
            }
        });
        base(strength, confidence * INDIRECT_PENALTY, EffectMethod::Indirect, shortest)
    }

    /// "E se?" — propaga `Δ = (hipotético − real) × strength` a cada efeito
    /// direto das causas intervindas.
    ///
    /// Causas sem valor real são ignoradas. Um efeito alcançado por várias
    /// causas acumula as mudanças e fica com a menor confiança.
    pub fn counterfactual(
        &self,
        actual: &BTreeMap<String, f64>,
        intervention: &BTreeMap<String, f64>,
    ) -> CounterfactualAnalysis {
        let mut effects: BTreeMap<String, CounterfactualEffect> = BTreeMap::new();
        for (cause, hypothetical) in intervention {
            let Some(real) = actual.get(cause) else { continue };
            for edge in self.effects_of(cause) {
                let change = (hypothetical - real) * edge.strength;
                let entry = effects.entry(edge.effect.clone()).or_insert_with(|| {
                    let base = actual.get(&edge.effect).copied().unwrap_or(0.0);
                    CounterfactualEffect {
                        actual: base,
                        counterfactual: base,
                        change: 0.0,
                        confidence: edge.confidence,
                    }
                });
                entry.change += change;
                entry.counterfactual = entry.actual + entry.change;
                entry.confidence = entry.confidence.min(edge.confidence);
            }
        }
        CounterfactualAnalysis { intervention: intervention.clone(), effects }
    }

    /// Explica `outcome` pelas causas presentes (verdadeiras) no contexto,
    /// ranqueadas por `strength × confidence`.
    pub fn explain_outcome(
        &self,
        outcome: &str,
        context: &BTreeMap<String, serde_json::Value>,
    ) -> CausalExplanation {
        let mut factors: Vec<CausalFactor> = self
            .relations()
            .filter(|r| r.effect == outcome)
            .filter_map(|r| {
                let value = context.get(&r.cause).filter(|v| is_truthy(v))?;
                Some(CausalFactor {
                    cause: r.cause.clone(),
                    strength: r.strength,
                    confidence: r.confidence,
                    evidence: r.evidence.clone(),
                    value: value.clone(),
                })
            })
            .collect();
        factors.sort_by(|a, b| (b.strength * b.confidence).total_cmp(&(a.strength * a.confidence)));
        CausalExplanation {
            outcome: outcome.to_string(),
            primary_cause: factors.first().cloned(),
            factors,
        }
    }

    /// Visão serializável: nós ordenados e todas as arestas.
    pub fn graph_view(&self) -> CausalGraphView {
        let nodes: BTreeSet<&str> = self
            .relations()
            .flat_map(|r| [r.cause.as_str(), r.effect.as_str()])
            .collect();
        CausalGraphView {
            nodes: nodes.into_iter().map(str::to_string).collect(),
            edges: self
                .relations()
                .map(|r| CausalEdge {
                    from: r.cause.clone(),
                    to: r.effect.clone(),
                    strength: r.strength,
                    confidence: r.confidence,
                })
                .collect(),
        }
    }
}

/// Correlação de Pearson entre duas variáveis, sobre as observações que
/// têm ambas. Menos de 2 pares ou variância nula: 0.0.
fn correlation(data: &[Observation], a: &str, b: &str) -> f64 {
    let pairs: Vec<(f64, f64)> = data
        .iter()
        .filter_map(|obs| Some((obs.get(a)?, obs.get(b)?)))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Veracidade no estilo JSON: null, false, 0, "", [] e {} são falsos.
fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
