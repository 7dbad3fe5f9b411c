//! # Motor Cognitivo — Fachada de Serviço
//!
//! O [`CognitiveEngine`] é o objeto de serviço de longa duração que a
//! camada externa usa. Construído uma vez por processo e compartilhado
//! por referência (`Arc<CognitiveEngine>`), ele é dono de todo o estado:
//!
//! ```text
//! CognitiveEngine
//!   ├── kb:      Arc<RwLock<KnowledgeBase>>   grafo de conhecimento
//!   ├── rules:   Arc<RwLock<RuleTable>>       regras de política
//!   ├── causal:  Arc<RwLock<CausalGraph>>     relações causa → efeito
//!   ├── scorer:  ConfidenceScorer             (imutável)
//!   ├── orchestrator: Orchestrator            (contadores atômicos)
//!   └── learning: Mutex<LearningLoop>
//! ```
//!
//! ## Pontos de Entrada
//!
//! | Chamada | Entrada | Saída |
//! |---------|---------|-------|
//! | [`ingest_fact`](CognitiveEngine::ingest_fact) | [`FactRecord`] | [`IngestStats`] |
//! | [`explain_priority`](CognitiveEngine::explain_priority) | id da região | [`PriorityExplanation`] |
//! | [`route_query`](CognitiveEngine::route_query) | texto + contexto | [`RoutingResult`] |
//! | [`reason_with_rules`](CognitiveEngine::reason_with_rules) | premissas + objetivo | [`ReasoningOutcome`] |
//! | [`causal_effect`](CognitiveEngine::causal_effect) | causa, efeito, intervenção | [`CausalEffect`] |
//!
//! ## Locks
//!
//! Sempre na ordem **kb → rules → causal**. Cada inferência segura os
//! guards de leitura durante a chamada inteira, então enxerga um snapshot
//! consistente. Métodos públicos nunca chamam outro método público com
//! um guard ainda vivo (os locks do `parking_lot` não são reentrantes).

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::causal::{
    CausalEffect, CausalExplanation, CausalGraph, CausalGraphView, CausalRelation,
    CounterfactualAnalysis, Observation,
};
use crate::config::EngineConfig;
use crate::core::{KnowledgeBase, LinkType, Pattern, TruthValue};
use crate::error::{EngineError, EngineResult};
use crate::feedback::{LearningLoop, LearningSummary, QueryFeedback};
use crate::inference::{FactSet, InferenceEngine, InferenceResult, Rule, RuleApplication, RuleTable};
use crate::knowledge::ingest::{self, KnowledgeStats, SeedStats};
use crate::knowledge::{normalize_concept_name, FactRecord, IngestStats, PovertyLevel};
use crate::nlu::{QueryContext, QueryText};
use crate::orchestrator::{Orchestrator, RoutingDecision, RoutingResult, RoutingStats};
use crate::persistence::{self, EngineSnapshot, SaveReport};
use crate::reasoning::{
    AlternativeRanking, ChainSummary, ConfidenceLevel, ConfidenceScore, ConfidenceScorer,
    DecisionInput, EvidenceItem, ReasoningChain,
};

/// Objetivo das explicações de prioridade.
const PRIORITY_GOAL: &str = "High_Priority";
/// TV atribuído à classificação de pobreza de uma região.
const CLASSIFICATION_TV: (f64, f64) = (0.9, 0.85);
/// Tópicos cujas fontes e políticas contam como evidência de prioridade.
const PRIORITY_TOPICS: [&str; 2] = ["poverty", "allocation"];

// ════════════════════════════════════════════════════════════════════
// TIPOS DE ENTRADA E SAÍDA
// ════════════════════════════════════════════════════════════════════

/// Premissa `(afirmação, strength, confidence)` para
/// [`reason_with_rules`](CognitiveEngine::reason_with_rules).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Premise {
    pub statement: String,
    pub strength: f64,
    pub confidence: f64,
}

impl Premise {
    pub fn new(statement: impl Into<String>, strength: f64, confidence: f64) -> Self {
        Self {
            statement: statement.into(),
            strength,
            confidence,
        }
    }

    fn truth_value(&self) -> EngineResult<TruthValue> {
        TruthValue::new(self.strength, self.confidence)
    }
}

/// Como a cadeia de [`ReasoningOutcome`] foi construída.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Regras da tabela derivam o objetivo a partir das premissas.
    RuleChain,
    /// Premissas compostas em sequência por dedução.
    PremiseComposition,
    /// Sem premissas.
    None,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReasoningOutcome {
    pub derivation: Derivation,
    pub summary: ChainSummary,
    pub text_explanation: String,
}

/// Resposta de [`explain_priority`](CognitiveEngine::explain_priority).
#[derive(Clone, Debug, Serialize)]
pub struct PriorityExplanation {
    pub region: String,
    pub reasoning_chain: ChainSummary,
    pub evidence: Vec<EvidenceItem>,
    pub evidence_confidence: ConfidenceScore,
    /// Confiança da cadeia; `very_low` quando não há cadeia.
    pub confidence: ConfidenceScore,
    pub text_explanation: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegionProfile {
    pub region: String,
    pub poverty_index: Option<f64>,
    pub poverty_level: Option<PovertyLevel>,
    pub priority_steps: usize,
    pub priority_confidence: ConfidenceLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegionComparison {
    pub profiles: Vec<RegionProfile>,
    /// Região com maior `poverty_index`; `None` se faltar dado ou houver empate.
    pub higher_need: Option<String>,
    pub ranking: AlternativeRanking,
}

/// Fontes encontradas para um termo da consulta.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentMatch {
    pub term: String,
    pub sources: Vec<String>,
    pub related_concepts: Vec<String>,
}

/// Resposta da parte cognitiva de [`handle_query`](CognitiveEngine::handle_query).
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryAnswer {
    Priority(PriorityExplanation),
    Causal(CausalEffect),
    Documents { matches: Vec<DocumentMatch> },
    Inferences { results: Vec<InferenceResult> },
    Comparison(RegionComparison),
    /// A rota não envolve o motor cognitivo; quem responde é o caminho externo.
    Delegated {
        route: RoutingDecision,
        keywords: Vec<String>,
    },
    NoAnswer { reason: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryResponse {
    pub routing: RoutingResult,
    pub answer: QueryAnswer,
}

// ════════════════════════════════════════════════════════════════════
// MOTOR
// ════════════════════════════════════════════════════════════════════

pub struct CognitiveEngine {
    kb: Arc<RwLock<KnowledgeBase>>,
    rules: Arc<RwLock<RuleTable>>,
    causal: Arc<RwLock<CausalGraph>>,
    scorer: ConfidenceScorer,
    orchestrator: Orchestrator,
    learning: Mutex<LearningLoop>,
    config: EngineConfig,
}

impl CognitiveEngine {
    /// Motor vazio com as regras de política padrão.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Ok(Self::from_parts(
            config,
            KnowledgeBase::new(),
            RuleTable::with_default_rules()?,
            CausalGraph::new(),
            LearningLoop::new(),
        ))
    }

    /// Restaura o estado salvo em `config.data_dir`.
    ///
    /// Sem `engine_state.json`, usa as regras padrão e um grafo causal vazio.
    pub fn load(config: EngineConfig) -> anyhow::Result<Self> {
        let loaded = persistence::load(&config)?;
        let (rules, causal, learning) = match loaded.snapshot {
            Some(snapshot) => {
                let mut rules = RuleTable::new();
                for rule in snapshot.rules {
                    rules.add_rule(rule);
                }
                let mut causal = CausalGraph::new();
                for relation in snapshot.causal_relations {
                    causal.add(relation);
                }
                (rules, causal, LearningLoop::from_history(snapshot.feedback))
            }
            None => (RuleTable::with_default_rules()?, CausalGraph::new(), LearningLoop::new()),
        };
        tracing::info!(
            nodes = loaded.kb.node_count(),
            links = loaded.kb.link_count(),
            rules = rules.len(),
            causal = causal.edge_count(),
            feedback = learning.len(),
            "Motor: estado carregado"
        );
        Ok(Self::from_parts(config, loaded.kb, rules, causal, learning))
    }

    fn from_parts(
        config: EngineConfig,
        kb: KnowledgeBase,
        rules: RuleTable,
        causal: CausalGraph,
        learning: LearningLoop,
    ) -> Self {
        Self {
            kb: Arc::new(RwLock::new(kb)),
            rules: Arc::new(RwLock::new(rules)),
            causal: Arc::new(RwLock::new(causal)),
            scorer: ConfidenceScorer::new(),
            orchestrator: Orchestrator::new(),
            learning: Mutex::new(learning),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Grava grafo, regras, relações causais e histórico de avaliações.
    pub fn save(&self) -> anyhow::Result<SaveReport> {
        let kb = self.kb.read();
        let rules = self.rules.read();
        let causal = self.causal.read();
        let snapshot = EngineSnapshot {
            rules: rules.rules().to_vec(),
            causal_relations: causal.relations().cloned().collect(),
            feedback: self.learning.lock().history().to_vec(),
        };
        persistence::save(&self.config, &kb, &snapshot)
    }

    // ════════════════════════════════════════════════════════════
    // INGESTÃO
    // ════════════════════════════════════════════════════════════

    /// Semeia o conhecimento de domínio no grafo e no grafo causal.
    pub fn seed_domain(&self) -> EngineResult<SeedStats> {
        let relations = ingest::domain_causal_relations()?;
        let mut kb = self.kb.write();
        let stats = ingest::seed_domain_knowledge(&mut kb)?;
        let mut causal = self.causal.write();
        for relation in relations {
            causal.add(relation);
        }
        Ok(stats)
    }

    /// Aplica um registro ao grafo. `PolicyRule` também entra na tabela de
    /// regras e `Causal` no grafo causal.
    ///
    /// Tudo é validado antes de qualquer escrita.
    pub fn ingest_fact(&self, record: &FactRecord) -> EngineResult<IngestStats> {
        let rule = match record {
            FactRecord::PolicyRule { id, condition, action, confidence } => Some(Rule::new(
                id.as_str(),
                condition.as_str(),
                action.as_str(),
                TruthValue::new(*confidence, *confidence)?,
                "Policy rule",
            )?),
            _ => None,
        };
        let relation = match record {
            FactRecord::Causal { cause, effect, strength, confidence, evidence, mechanism } => {
                let mut relation =
                    CausalRelation::new(cause.as_str(), effect.as_str(), *strength, *confidence)?;
                for item in evidence {
                    relation = relation.with_evidence(item.as_str());
                }
                if let Some(mechanism) = mechanism {
                    relation = relation.with_mechanism(mechanism.as_str());
                }
                Some(relation)
            }
            _ => None,
        };

        let mut kb = self.kb.write();
        let mut stats = ingest::ingest(&mut kb, record)?;
        if let Some(rule) = rule {
            self.rules.write().add_rule(rule);
            stats.rules_registered = 1;
        }
        if let Some(relation) = relation {
            self.causal.write().add(relation);
            stats.causal_relations = 1;
        }
        Ok(stats)
    }

    /// Adiciona (ou substitui, pelo nome) uma regra.
    pub fn add_rule(&self, rule: Rule) -> Option<Rule> {
        self.rules.write().add_rule(rule)
    }

    pub fn remove_rule(&self, name: &str) -> EngineResult<Rule> {
        self.rules.write().remove_rule(name)
    }

    pub fn apply_rule(&self, name: &str, evidence: &BTreeMap<String, bool>) -> RuleApplication {
        self.rules.read().apply_rule(name, evidence)
    }

    /// Registra a relação no grafo causal e como link `Causal` no grafo.
    pub fn add_causal_relation(&self, relation: CausalRelation) -> EngineResult<()> {
        let mut kb = self.kb.write();
        kb.add_concept_link(
            LinkType::Causal,
            &relation.cause,
            &relation.effect,
            Some(relation.strength),
        )?;
        self.causal.write().add(relation);
        Ok(())
    }

    /// Descobre relações por correlação. Com `register`, cada uma entra no
    /// grafo causal.
    pub fn discover_causal_relations(
        &self,
        data: &[Observation],
        register: bool,
    ) -> EngineResult<Vec<CausalRelation>> {
        let found = CausalGraph::discover(data);
        if register {
            for relation in &found {
                self.add_causal_relation(relation.clone())?;
            }
        }
        tracing::info!(found = found.len(), register, "Causal: descoberta concluída");
        Ok(found)
    }

    // ════════════════════════════════════════════════════════════
    // EXPLICAÇÃO DE PRIORIDADE
    // ════════════════════════════════════════════════════════════

    /// Por que uma região tem (ou não) alta prioridade.
    ///
    /// ```text
    /// Region_X ──Classification──▶ High_Poverty_Region ──poverty_implies_priority──▶ High_Priority
    /// ```
    ///
    /// Região desconhecida ou sem classificação: cadeia vazia, `very_low`.
    pub fn explain_priority(&self, region_id: &str) -> EngineResult<PriorityExplanation> {
        let kb = self.kb.read();
        let rules = self.rules.read();
        self.explain_priority_in(&kb, &rules, region_id)
    }

    fn explain_priority_in(
        &self,
        kb: &KnowledgeBase,
        rules: &RuleTable,
        region_id: &str,
    ) -> EngineResult<PriorityExplanation> {
        let evidence = priority_evidence(kb, region_id)?;
        let mut chain = ReasoningChain::new(format!("{PRIORITY_GOAL} for {region_id}"));

        if ingest::is_region(kb, region_id)? {
            let (s, c) = CLASSIFICATION_TV;
            let classification_tv = TruthValue::new(s, c)?;
            let classifications: Vec<String> = ingest::categories_of(kb, region_id)?
                .into_iter()
                .filter(|category| category.ends_with("_Poverty_Region"))
                .collect();
            let known: FactSet = classifications
                .iter()
                .map(|category| (category.clone(), classification_tv))
                .collect();
            let index_evidence: Vec<String> = ingest::property(kb, region_id, "poverty_index")?
                .map(|v| format!("poverty_index = {v}"))
                .into_iter()
                .collect();

            let proof = InferenceEngine::backward_chaining(
                rules,
                PRIORITY_GOAL,
                &known,
                self.config.backward_max_depth,
            );
            match proof.as_ref().and_then(|r| r.inference_path.first().map(|start| (r, start))) {
                Some((result, start)) => {
                    chain.add_step(
                        region_id,
                        start.as_str(),
                        "Classification",
                        Some(classification_tv),
                        index_evidence,
                    );
                    append_rule_steps(&mut chain, rules, result, classification_tv, None)?;
                }
                None => {
                    if let Some(first) = classifications.first() {
                        chain.add_step(
                            region_id,
                            first.as_str(),
                            "Classification",
                            Some(classification_tv),
                            index_evidence,
                        );
                    }
                }
            }
        }

        let finalized = chain.finalize(&self.scorer);
        tracing::info!(
            region = %region_id,
            steps = finalized.steps().len(),
            level = %finalized.confidence().level,
            "Motor: prioridade explicada"
        );
        Ok(PriorityExplanation {
            region: region_id.to_string(),
            evidence_confidence: self.scorer.score_evidence(&evidence),
            confidence: finalized.confidence().clone(),
            text_explanation: finalized.to_text_explanation(),
            reasoning_chain: finalized.summary(),
            evidence,
        })
    }

    /// Compara duas regiões pela necessidade (índice de pobreza) e pela
    /// confiança das respectivas explicações de prioridade.
    ///
    /// As duas regiões são lidas sob os mesmos guards: um único snapshot.
    pub fn compare_regions(&self, a: &str, b: &str) -> EngineResult<RegionComparison> {
        let kb = self.kb.read();
        let rules = self.rules.read();
        let mut profiles = Vec::with_capacity(2);
        let mut inputs = Vec::with_capacity(2);
        for region in [a, b] {
            let explanation = self.explain_priority_in(&kb, &rules, region)?;
            let poverty_index = ingest::property(&kb, region, "poverty_index")?
                .and_then(|v| v.parse::<f64>().ok());
            inputs.push((
                region.to_string(),
                DecisionInput {
                    reasoning_steps: Some(explanation.reasoning_chain.total_steps),
                    evidence: Some(explanation.evidence.clone()),
                    alternatives: Some(vec![a.to_string(), b.to_string()]),
                    consensus: None,
                },
            ));
            profiles.push(RegionProfile {
                region: region.to_string(),
                poverty_index,
                poverty_level: poverty_index.map(PovertyLevel::from_index),
                priority_steps: explanation.reasoning_chain.total_steps,
                priority_confidence: explanation.confidence.level,
            });
        }

        let higher_need = match (profiles[0].poverty_index, profiles[1].poverty_index) {
            (Some(x), Some(y)) if x > y => Some(a.to_string()),
            (Some(x), Some(y)) if y > x => Some(b.to_string()),
            _ => None,
        };
        Ok(RegionComparison {
            profiles,
            higher_need,
            ranking: self.scorer.compare_alternatives(&inputs),
        })
    }

    // ════════════════════════════════════════════════════════════
    // RACIOCÍNIO COM REGRAS
    // ════════════════════════════════════════════════════════════

    /// Cadeia de raciocínio de `premises` até `goal`.
    ///
    /// 1. Se as regras derivam `goal` das premissas → [`Derivation::RuleChain`]
    /// 2. Senão, compõe as premissas por dedução a partir de ⟨1, 1⟩ →
    ///    [`Derivation::PremiseComposition`]
    /// 3. Sem premissas → cadeia vazia, `very_low`
    ///
    /// # Erros
    ///
    /// [`EngineError::InvalidInput`] para premissas fora de `[0, 1]`.
    pub fn reason_with_rules(
        &self,
        premises: &[Premise],
        goal: &str,
    ) -> EngineResult<ReasoningOutcome> {
        let validated: Vec<(&Premise, TruthValue)> = premises
            .iter()
            .map(|p| p.truth_value().map(|tv| (p, tv)))
            .collect::<EngineResult<_>>()?;

        let rules = self.rules.read();
        let mut chain = ReasoningChain::new(goal);

        let derivation = if validated.is_empty() {
            Derivation::None
        } else {
            let known: FactSet = validated
                .iter()
                .map(|(p, tv)| (p.statement.clone(), *tv))
                .collect();
            match InferenceEngine::backward_chaining(
                &rules,
                goal,
                &known,
                self.config.backward_max_depth,
            ) {
                Some(result) if !result.rules_applied.is_empty() => {
                    let start = result.inference_path.first().cloned().unwrap_or_default();
                    let start_tv = known.get(&start).copied().unwrap_or_else(TruthValue::certain);
                    append_rule_steps(
                        &mut chain,
                        &rules,
                        &result,
                        start_tv,
                        Some(format!("{start} {start_tv}")),
                    )?;
                    Derivation::RuleChain
                }
                _ => {
                    let mut cumulative = TruthValue::certain();
                    for (premise, tv) in &validated {
                        cumulative = cumulative.deduction(tv);
                        chain.add_step(
                            premise.statement.as_str(),
                            goal,
                            "PLN Deduction",
                            Some(cumulative),
                            vec![format!("{} {tv}", premise.statement)],
                        );
                    }
                    Derivation::PremiseComposition
                }
            }
        };

        let finalized = chain.finalize(&self.scorer);
        Ok(ReasoningOutcome {
            derivation,
            text_explanation: finalized.to_text_explanation(),
            summary: finalized.summary(),
        })
    }

    /// Encadeamento para frente a partir das premissas.
    pub fn forward_inference(&self, premises: &[Premise]) -> EngineResult<Vec<InferenceResult>> {
        let facts: Vec<(String, TruthValue)> = premises
            .iter()
            .map(|p| p.truth_value().map(|tv| (p.statement.clone(), tv)))
            .collect::<EngineResult<_>>()?;
        let rules = self.rules.read();
        Ok(InferenceEngine::forward_chaining(&rules, &facts, self.config.forward_max_steps))
    }

    // ════════════════════════════════════════════════════════════
    // CAUSAL
    // ════════════════════════════════════════════════════════════

    pub fn causal_effect(&self, cause: &str, effect: &str, intervention: Option<f64>) -> CausalEffect {
        self.causal
            .read()
            .estimate_effect(cause, effect, intervention, self.config.causal_max_depth)
    }

    pub fn causal_chains(&self, start: &str, end: &str) -> Vec<Vec<String>> {
        self.causal
            .read()
            .infer_chains(start, end, self.config.causal_max_depth)
    }

    pub fn counterfactual(
        &self,
        actual: &BTreeMap<String, f64>,
        intervention: &BTreeMap<String, f64>,
    ) -> CounterfactualAnalysis {
        self.causal.read().counterfactual(actual, intervention)
    }

    pub fn explain_outcome(
        &self,
        outcome: &str,
        context: &BTreeMap<String, serde_json::Value>,
    ) -> CausalExplanation {
        self.causal.read().explain_outcome(outcome, context)
    }

    pub fn causal_graph(&self) -> CausalGraphView {
        self.causal.read().graph_view()
    }

    // ════════════════════════════════════════════════════════════
    // CONSULTAS
    // ════════════════════════════════════════════════════════════

    pub fn route_query(&self, text: &str, context: Option<&QueryContext>) -> RoutingResult {
        self.orchestrator.route_query(text, context)
    }

    /// Roteia e, para rotas cognitivas, responde com a parte cognitiva.
    ///
    /// A resposta cognitiva é a primeira que se aplica:
    ///
    /// | # | Condição | Resposta |
    /// |---|----------|----------|
    /// | 1 | região mencionada (ou `context.region`) | explicação de prioridade |
    /// | 2 | multi-hop com dois nós causais mencionados | efeito causal |
    /// | 3 | consulta de documentos | fontes por termo |
    /// | 4 | `context.facts` com premissas | forward chaining |
    /// | 5 | — | `NoAnswer` |
    ///
    /// Na rota `Analysis`, duas regiões mencionadas viram uma comparação.
    pub fn handle_query(
        &self,
        text: &str,
        context: Option<&QueryContext>,
    ) -> EngineResult<QueryResponse> {
        let routing = self.route_query(text, context);
        let query = QueryText::new(text);

        let answer = match routing.routing {
            route if route.uses_cognitive() => {
                self.cognitive_answer(&query, &routing, context)?
            }
            RoutingDecision::Analysis => {
                let regions = self.mentioned_regions(&query)?;
                match regions.as_slice() {
                    [a, b, ..] => QueryAnswer::Comparison(self.compare_regions(a, b)?),
                    _ => QueryAnswer::Delegated {
                        route: routing.routing,
                        keywords: routing.analysis.keywords.clone(),
                    },
                }
            }
            route => QueryAnswer::Delegated {
                route,
                keywords: routing.analysis.keywords.clone(),
            },
        };
        Ok(QueryResponse { routing, answer })
    }

    fn cognitive_answer(
        &self,
        query: &QueryText,
        routing: &RoutingResult,
        context: Option<&QueryContext>,
    ) -> EngineResult<QueryAnswer> {
        let context_region = context
            .and_then(|c| c.get("region"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        let region = match context_region {
            Some(region) => Some(region),
            None => self.mentioned_regions(query)?.into_iter().next(),
        };
        if let Some(region) = region {
            return Ok(QueryAnswer::Priority(self.explain_priority(&region)?));
        }

        if routing.analysis.requires_multi_hop {
            if let [cause, effect, ..] = self.mentioned_causal_nodes(query).as_slice() {
                return Ok(QueryAnswer::Causal(self.causal_effect(cause, effect, None)));
            }
        }

        if routing.analysis.requires_documents {
            let matches = self.document_matches(&routing.analysis.keywords)?;
            if !matches.is_empty() {
                return Ok(QueryAnswer::Documents { matches });
            }
        }

        if let Some(facts) = context.and_then(|c| c.get("facts")) {
            match serde_json::from_value::<Vec<Premise>>(facts.clone()) {
                Ok(premises) if !premises.is_empty() => {
                    let results = self.forward_inference(&premises)?;
                    if !results.is_empty() {
                        return Ok(QueryAnswer::Inferences { results });
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Motor: context.facts ignorado, formato inválido");
                }
            }
        }

        Ok(QueryAnswer::NoAnswer {
            reason: "No knowledge in the graph matched the query".to_string(),
        })
    }

    /// Regiões citadas na consulta, na ordem em que aparecem.
    fn mentioned_regions(&self, query: &QueryText) -> EngineResult<Vec<String>> {
        let kb = self.kb.read();
        let mut found: Vec<(usize, String)> = ingest::members_of(&kb, "Region")?
            .into_iter()
            .filter_map(|id| {
                let name = id.trim_start_matches("Region_").replace('_', " ").to_lowercase();
                let pos = query.position_of(&name)?;
                Some((pos, id))
            })
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }

    /// Nós do grafo causal citados na consulta, na ordem em que aparecem.
    fn mentioned_causal_nodes(&self, query: &QueryText) -> Vec<String> {
        let view = self.causal.read().graph_view();
        let mut found: Vec<(usize, String)> = view
            .nodes
            .into_iter()
            .filter_map(|node| {
                let name = node.replace('_', " ").to_lowercase();
                query.position_of(&name).map(|pos| (pos, node))
            })
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, node)| node).collect()
    }

    fn document_matches(&self, keywords: &[String]) -> EngineResult<Vec<DocumentMatch>> {
        let kb = self.kb.read();
        let mut matches = Vec::new();
        for keyword in keywords {
            let concept = normalize_concept_name(keyword);
            let mut sources = ingest::sources_for_topic(&kb, keyword)?;
            let referencing = kb.query_ids(
                &Pattern::link(LinkType::Reference).var("source").concept(concept.as_str()),
                "source",
            )?;
            for source in referencing {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
            if sources.is_empty() {
                continue;
            }
            matches.push(DocumentMatch {
                term: keyword.clone(),
                sources,
                related_concepts: kb.get_related(&concept, self.config.related_max_results),
            });
        }
        Ok(matches)
    }

    // ════════════════════════════════════════════════════════════
    // ESTATÍSTICAS E APRENDIZADO
    // ════════════════════════════════════════════════════════════

    pub fn routing_stats(&self) -> RoutingStats {
        self.orchestrator.stats()
    }

    pub fn knowledge_stats(&self) -> EngineResult<KnowledgeStats> {
        ingest::knowledge_stats(&self.kb.read())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Registra a avaliação de uma resposta.
    ///
    /// # Erros
    ///
    /// [`EngineError::InvalidInput`] para nota fora de `1..=5`.
    pub fn record_feedback(
        &self,
        query: &str,
        routing: RoutingDecision,
        rating: u8,
        helpful: bool,
        response_time_ms: u64,
    ) -> EngineResult<()> {
        let feedback = QueryFeedback::new(query, routing, rating, helpful, response_time_ms)?;
        self.learning.lock().record(feedback);
        Ok(())
    }

    pub fn suggest_route(&self, query: &str) -> Option<RoutingDecision> {
        self.learning.lock().suggest_route(query)
    }

    pub fn learning_summary(&self) -> LearningSummary {
        self.learning.lock().summary()
    }
}

/// Acrescenta um passo por regra aplicada em `result`, com o TV
/// acumulado por dedução a partir de `start_tv`.
///
/// `first_evidence` vai no primeiro passo; os demais levam a descrição
/// da regra.
fn append_rule_steps(
    chain: &mut ReasoningChain,
    rules: &RuleTable,
    result: &InferenceResult,
    start_tv: TruthValue,
    first_evidence: Option<String>,
) -> EngineResult<()> {
    let mut cumulative = start_tv;
    for (i, name) in result.rules_applied.iter().enumerate() {
        let rule = rules.rule(name).ok_or_else(|| {
            EngineError::Internal(format!("regra {name} sumiu durante a inferência"))
        })?;
        let (Some(premise), Some(conclusion)) =
            (result.inference_path.get(i), result.inference_path.get(i + 1))
        else {
            return Err(EngineError::Internal(format!(
                "caminho de inferência incompleto para {}",
                result.conclusion
            )));
        };
        cumulative = cumulative.deduction(&rule.truth_value);

        let mut evidence = Vec::new();
        if i == 0 {
            evidence.extend(first_evidence.clone());
        }
        if !rule.description.is_empty() {
            evidence.push(rule.description.clone());
        }
        chain.add_step(premise.as_str(), conclusion.as_str(), name.as_str(), Some(cumulative), evidence);
    }
    Ok(())
}

/// Índice de pobreza, fontes e políticas ligadas a pobreza/alocação.
fn priority_evidence(kb: &KnowledgeBase, region_id: &str) -> EngineResult<Vec<EvidenceItem>> {
    let mut evidence = Vec::new();
    if let Some(index) = ingest::property(kb, region_id, "poverty_index")? {
        evidence.push(
            EvidenceItem::new("statistic", format!("{region_id} poverty_index = {index}"))
                .with_relevance(0.9),
        );
    }

    let mut seen_sources: Vec<String> = Vec::new();
    for topic in PRIORITY_TOPICS {
        for source in ingest::sources_for_topic(kb, topic)? {
            if seen_sources.contains(&source) {
                continue;
            }
            evidence.push(
                EvidenceItem::new("data_source", format!("{source} covers {topic}"))
                    .with_relevance(0.7),
            );
            seen_sources.push(source);
        }
    }

    for policy in ingest::policies(kb)? {
        let lowered = policy.to_lowercase();
        if PRIORITY_TOPICS.iter().any(|topic| lowered.contains(topic)) {
            evidence.push(EvidenceItem::new("policy", policy).with_relevance(0.8));
        }
    }
    Ok(evidence)
}
