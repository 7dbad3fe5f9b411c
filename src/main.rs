#![allow(dead_code, unused_imports)]
#![allow(rustdoc::broken_intra_doc_links, rustdoc::invalid_html_tags)]
//! # Civic Reasoner — Motor de Raciocínio para Alocação de Recursos
//!
//! **Ponto de entrada** do processo. Inicializa o motor cognitivo e atende
//! consultas em linguagem natural lidas da entrada padrão, uma por linha.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG)
//!   ├── EngineConfig::from_env()
//!   ├── CognitiveEngine::load (ou motor vazio se falhar)
//!   ├── Semeia conhecimento de domínio (se configurado e o grafo estiver vazio)
//!   └── Loop stdin:
//!       ├── consulta  → handle_query em spawn_blocking + timeout → JSON
//!       ├── :stats    → estatísticas de roteamento e do grafo
//!       ├── :learning → resumo do aprendizado
//!       ├── :save     → persiste
//!       └── :quit     → sai (salvando)
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! echo "Why is Turkana a priority?" | RUST_LOG=debug cargo run
//!
//! CIVIC_DATA_DIR=/tmp/civic CIVIC_QUERY_TIMEOUT_MS=2000 cargo run
//! ```

/// Módulo `core` — TruthValue, átomos, padrões e o grafo de conhecimento.
mod core;

/// Módulo `error` — erros tipados do motor.
mod error;

/// Módulo `config` — parâmetros do motor (defaults + variáveis de ambiente).
mod config;

/// Módulo `knowledge` — registros de ingestão e conhecimento de domínio.
mod knowledge;

/// Módulo `inference` — tabela de regras e encadeamento.
mod inference;

/// Módulo `causal` — grafo causal, efeitos e contrafactuais.
mod causal;

/// Módulo `reasoning` — cadeias de raciocínio e pontuação de confiança.
mod reasoning;

/// Módulo `nlu` — análise de consultas (intenção, requisitos, complexidade).
mod nlu;

/// Módulo `orchestrator` — roteamento de consultas.
mod orchestrator;

/// Módulo `feedback` — aprendizado a partir de avaliações.
mod feedback;

/// Módulo `engine` — a fachada [`CognitiveEngine`](engine::CognitiveEngine).
mod engine;

/// Módulo `persistence` — grafo, regras, relações causais e avaliações em disco.
mod persistence;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::engine::CognitiveEngine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Civic Reasoner — Starting...");

    let config = EngineConfig::from_env();
    let engine = match CognitiveEngine::load(config.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::warn!(error = %e, "Falha ao carregar estado do disco, iniciando vazio");
            CognitiveEngine::new(config.clone())?
        }
    };

    if config.seed_domain_knowledge && engine.knowledge_stats()?.nodes == 0 {
        let seeded = engine.seed_domain()?;
        tracing::info!(concepts = seeded.concepts, "Conhecimento de domínio semeado");
    }
    let engine = Arc::new(engine);

    tracing::info!("Pronto. Uma consulta por linha; :stats, :learning, :save, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" => break,
            ":stats" => {
                print_json(&serde_json::json!({
                    "routing": engine.routing_stats(),
                    "knowledge": engine.knowledge_stats()?,
                    "rules": engine.rule_count(),
                }));
            }
            ":learning" => print_json(&engine.learning_summary()),
            ":save" => save(&engine),
            query => answer(&engine, query, config.query_timeout()).await,
        }
    }

    save(&engine);
    tracing::info!("Encerrado");
    Ok(())
}

/// Responde uma consulta numa thread de bloqueio, sob o timeout configurado.
async fn answer(engine: &Arc<CognitiveEngine>, query: &str, timeout: std::time::Duration) {
    let task = {
        let engine = engine.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || engine.handle_query(&query, None))
    };

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(response))) => print_json(&response),
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "Consulta rejeitada");
            print_json(&serde_json::json!({ "error": e.to_string() }));
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Tarefa da consulta falhou");
            print_json(&serde_json::json!({ "error": "internal error" }));
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Consulta excedeu o timeout");
            print_json(&serde_json::json!({ "error": "query timed out" }));
        }
    }
}

fn save(engine: &CognitiveEngine) {
    match engine.save() {
        Ok(report) => print_json(&report),
        Err(e) => tracing::error!(error = %e, "Falha ao salvar estado"),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Falha ao serializar resposta"),
    }
}
