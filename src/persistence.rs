//! # Persistência — Grafo, Regras e Grafo Causal em Disco
//!
//! Dois arquivos em `data_dir`:
//!
//! | Arquivo | Conteúdo | Formato |
//! |---------|----------|---------|
//! | `knowledge_file` (`atoms.scm`) | nós e links do grafo | uma expressão de átomo por linha |
//! | `engine_state.json` | regras, relações causais e histórico de avaliações | JSON pretty-printed |
//!
//! O arquivo de átomos é reaplicado pelo mesmo caminho da ingestão
//! ([`KnowledgeBase::import_lines`]), então reimportar não duplica nós.
//!
//! ## Atomicidade
//!
//! Os dois arquivos são escritos em `.tmp` ao lado do destino e só então
//! renomeados, um após o outro. Falha em qualquer escrita deixa os dois
//! arquivos anteriores intactos (e remove os `.tmp`).
//!
//! ## Arquivos Ausentes
//!
//! Sem arquivo de átomos: grafo vazio. Sem `engine_state.json`: `None`,
//! e o chamador decide os defaults (regras padrão, grafo causal vazio).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::causal::CausalRelation;
use crate::config::EngineConfig;
use crate::core::KnowledgeBase;
use crate::feedback::QueryFeedback;
use crate::inference::Rule;

const STATE_FILE: &str = "engine_state.json";

/// Estado do motor além do grafo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub causal_relations: Vec<CausalRelation>,
    #[serde(default)]
    pub feedback: Vec<QueryFeedback>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SaveReport {
    pub atoms: usize,
    pub rules: usize,
    pub causal_relations: usize,
    pub feedback: usize,
}

/// Resultado de [`load`].
#[derive(Debug)]
pub struct LoadedState {
    pub kb: KnowledgeBase,
    pub snapshot: Option<EngineSnapshot>,
}

pub fn state_path(config: &EngineConfig) -> PathBuf {
    config.data_dir.join(STATE_FILE)
}

/// Salva grafo e snapshot em `config.data_dir`, criando o diretório.
///
/// # Erros
///
/// Falha ao criar o diretório, serializar ou escrever/renomear.
pub fn save(
    config: &EngineConfig,
    kb: &KnowledgeBase,
    snapshot: &EngineSnapshot,
) -> Result<SaveReport> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Falha ao criar diretório {}", config.data_dir.display())
    })?;

    let lines = kb.export_lines();
    let mut body = lines.join("\n");
    body.push('\n');
    let json = serde_json::to_string_pretty(snapshot)
        .context("Falha ao serializar estado do motor")?;

    write_all_atomic(&[
        (config.knowledge_path(), body.into_bytes()),
        (state_path(config), json.into_bytes()),
    ])?;

    let report = SaveReport {
        atoms: lines.len(),
        rules: snapshot.rules.len(),
        causal_relations: snapshot.causal_relations.len(),
        feedback: snapshot.feedback.len(),
    };
    tracing::info!(
        dir = %config.data_dir.display(),
        atoms = report.atoms,
        rules = report.rules,
        causal = report.causal_relations,
        feedback = report.feedback,
        "Persistência: estado salvo"
    );
    Ok(report)
}

/// Carrega grafo e snapshot. Arquivos ausentes não são erro.
///
/// # Erros
///
/// Arquivo existente mas ilegível ou corrompido.
pub fn load(config: &EngineConfig) -> Result<LoadedState> {
    let atoms_path = config.knowledge_path();
    let mut kb = KnowledgeBase::new();
    if atoms_path.exists() {
        kb.import_all(&atoms_path)
            .with_context(|| format!("Falha ao importar {}", atoms_path.display()))?;
    } else {
        tracing::info!(path = %atoms_path.display(), "Persistência: nenhum arquivo de átomos, grafo vazio");
    }

    let state = state_path(config);
    let snapshot = if state.exists() {
        let json = std::fs::read_to_string(&state)
            .with_context(|| format!("Falha ao ler {}", state.display()))?;
        let snapshot: EngineSnapshot = serde_json::from_str(&json)
            .with_context(|| format!("Falha ao desserializar {}", state.display()))?;
        Some(snapshot)
    } else {
        None
    };

    Ok(LoadedState { kb, snapshot })
}

/// Escreve todos os `.tmp` e só então renomeia cada um para o destino.
fn write_all_atomic(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let staged: Vec<(PathBuf, &Path)> = files
        .iter()
        .map(|(path, _)| (tmp_path(path), path.as_path()))
        .collect();

    for ((tmp, _), (_, contents)) in staged.iter().zip(files) {
        if let Err(e) = std::fs::write(tmp, contents) {
            discard(&staged);
            return Err(e).with_context(|| format!("Falha ao escrever {}", tmp.display()));
        }
    }
    for (tmp, path) in &staged {
        std::fs::rename(tmp, path).with_context(|| {
            format!("Falha ao renomear {} para {}", tmp.display(), path.display())
        })?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        let _ = std::fs::remove_file(tmp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LinkType, TruthValue};
    use crate::orchestrator::RoutingDecision;

    fn config_in(dir: &Path) -> EngineConfig {
        EngineConfig {
            data_dir: dir.to_path_buf(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_load_missing_files_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&config_in(dir.path())).unwrap();
        assert_eq!(loaded.kb.node_count(), 0);
        assert!(loaded.snapshot.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir.path().join("nested"));

        let mut kb = KnowledgeBase::new();
        kb.add_concept_link(LinkType::Similarity, "Poverty", "Unemployment", Some(0.7))
            .unwrap();
        let snapshot = EngineSnapshot {
            rules: vec![Rule::new("r", "A", "B", TruthValue::new(0.9, 0.8).unwrap(), "").unwrap()],
            causal_relations: vec![CausalRelation::new("Drought", "Poverty", 0.6, 0.5).unwrap()],
            feedback: vec![QueryFeedback::new(
                "why is poverty high",
                RoutingDecision::Cognitive,
                5,
                true,
                120,
            )
            .unwrap()],
        };

        let report = save(&config, &kb, &snapshot).unwrap();
        assert_eq!(report.atoms, 3);
        assert_eq!(report.feedback, 1);
        assert!(!tmp_path(&config.knowledge_path()).exists());
        assert!(!tmp_path(&state_path(&config)).exists());

        let loaded = load(&config).unwrap();
        assert_eq!(loaded.kb.node_count(), 2);
        assert_eq!(loaded.kb.link_count(), 1);
        assert_eq!(loaded.snapshot, Some(snapshot));
    }

    #[test]
    fn test_invalid_values_in_state_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(
            state_path(&config),
            r#"{"causal_relations":[{"cause":"","effect":"B","strength":5.0,"confidence":-2.0}]}"#,
        )
        .unwrap();
        assert!(load(&config).is_err());

        std::fs::write(
            state_path(&config),
            r#"{"rules":[{"name":"r","condition":"","conclusion":"B","truth_value":{"strength":0.9,"confidence":0.8},"description":""}]}"#,
        )
        .unwrap();
        assert!(load(&config).is_err());
    }

    /// Falha ao preparar o segundo arquivo não toca no par já salvo.
    #[test]
    fn test_failed_staging_keeps_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut kb = KnowledgeBase::new();
        kb.add_concept_link(LinkType::Causal, "Drought", "Poverty", Some(0.6))
            .unwrap();
        save(&config, &kb, &EngineSnapshot::default()).unwrap();
        let atoms_before = std::fs::read_to_string(config.knowledge_path()).unwrap();
        let state_before = std::fs::read_to_string(state_path(&config)).unwrap();

        // um diretório no lugar do .tmp faz a escrita falhar
        std::fs::create_dir(tmp_path(&state_path(&config))).unwrap();
        kb.add_concept_link(LinkType::Similarity, "Poverty", "Unemployment", Some(0.7))
            .unwrap();
        let snapshot = EngineSnapshot {
            rules: vec![Rule::new("r", "A", "B", TruthValue::new(0.9, 0.8).unwrap(), "").unwrap()],
            ..EngineSnapshot::default()
        };
        assert!(save(&config, &kb, &snapshot).is_err());

        assert_eq!(std::fs::read_to_string(config.knowledge_path()).unwrap(), atoms_before);
        assert_eq!(std::fs::read_to_string(state_path(&config)).unwrap(), state_before);
        assert!(!tmp_path(&config.knowledge_path()).exists());
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(state_path(&config), "{ not json").unwrap();
        let err = load(&config).unwrap_err();
        assert!(err.to_string().contains("Falha ao desserializar"));
    }
}
