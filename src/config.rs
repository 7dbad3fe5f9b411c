//! # Configuração do Motor
//!
//! [`EngineConfig`] reúne os limites de inferência e os caminhos de
//! persistência. Cada campo tem um default e pode ser sobrescrito por
//! variável de ambiente:
//!
//! | Campo | Default | Variável |
//! |-------|---------|----------|
//! | `data_dir` | `data` | `CIVIC_DATA_DIR` |
//! | `knowledge_file` | `atoms.scm` | `CIVIC_KNOWLEDGE_FILE` |
//! | `forward_max_steps` | 10 | `CIVIC_FORWARD_MAX_STEPS` |
//! | `backward_max_depth` | 5 | `CIVIC_BACKWARD_MAX_DEPTH` |
//! | `causal_max_depth` | 5 | `CIVIC_CAUSAL_MAX_DEPTH` |
//! | `related_max_results` | 5 | `CIVIC_RELATED_MAX_RESULTS` |
//! | `query_timeout_ms` | 5000 | `CIVIC_QUERY_TIMEOUT_MS` |
//! | `seed_domain_knowledge` | true | `CIVIC_SEED_DOMAIN` |
//!
//! Valores que não fazem parse geram um `warn!` e mantêm o default.
//! Profundidades são limitadas a [`MAX_DEPTH_CAP`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Teto absoluto para qualquer profundidade de busca (encadeamento
/// regressivo e DFS causal). Limita a pilha de recursão.
pub const MAX_DEPTH_CAP: usize = 32;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub knowledge_file: String,
    pub forward_max_steps: usize,
    pub backward_max_depth: usize,
    pub causal_max_depth: usize,
    pub related_max_results: usize,
    pub query_timeout_ms: u64,
    pub seed_domain_knowledge: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            knowledge_file: "atoms.scm".to_string(),
            forward_max_steps: 10,
            backward_max_depth: 5,
            causal_max_depth: 5,
            related_max_results: 5,
            query_timeout_ms: 5000,
            seed_domain_knowledge: true,
        }
    }
}

impl EngineConfig {
    /// Defaults + overrides do ambiente do processo.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Mesma lógica de [`from_env`](Self::from_env), com a fonte das
    /// variáveis injetada.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("CIVIC_DATA_DIR") {
            if !val.trim().is_empty() {
                config.data_dir = PathBuf::from(val.trim());
            }
        }
        if let Some(val) = lookup("CIVIC_KNOWLEDGE_FILE") {
            if !val.trim().is_empty() {
                config.knowledge_file = val.trim().to_string();
            }
        }
        override_parsed(&lookup, "CIVIC_FORWARD_MAX_STEPS", &mut config.forward_max_steps);
        override_parsed(&lookup, "CIVIC_BACKWARD_MAX_DEPTH", &mut config.backward_max_depth);
        override_parsed(&lookup, "CIVIC_CAUSAL_MAX_DEPTH", &mut config.causal_max_depth);
        override_parsed(&lookup, "CIVIC_RELATED_MAX_RESULTS", &mut config.related_max_results);
        override_parsed(&lookup, "CIVIC_QUERY_TIMEOUT_MS", &mut config.query_timeout_ms);
        override_parsed(&lookup, "CIVIC_SEED_DOMAIN", &mut config.seed_domain_knowledge);

        config.clamp_depths()
    }

    fn clamp_depths(mut self) -> Self {
        for (name, depth) in [
            ("backward_max_depth", &mut self.backward_max_depth),
            ("causal_max_depth", &mut self.causal_max_depth),
        ] {
            if *depth > MAX_DEPTH_CAP {
                tracing::warn!(
                    field = name,
                    requested = *depth,
                    cap = MAX_DEPTH_CAP,
                    "Config: profundidade acima do teto, limitando"
                );
                *depth = MAX_DEPTH_CAP;
            }
        }
        self
    }

    /// Caminho completo do arquivo de átomos.
    pub fn knowledge_path(&self) -> PathBuf {
        self.data_dir.join(&self.knowledge_file)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(
            key,
            value = %raw,
            "Config: valor inválido, mantendo o default"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(|_| None);
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.knowledge_path(), PathBuf::from("data").join("atoms.scm"));
        assert_eq!(config.query_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("CIVIC_DATA_DIR", "/tmp/civic"),
            ("CIVIC_FORWARD_MAX_STEPS", "25"),
            ("CIVIC_SEED_DOMAIN", "false"),
            ("CIVIC_QUERY_TIMEOUT_MS", " 750 "),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/civic"));
        assert_eq!(config.forward_max_steps, 25);
        assert!(!config.seed_domain_knowledge);
        assert_eq!(config.query_timeout_ms, 750);
    }

    #[test]
    fn test_invalid_value_keeps_default() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("CIVIC_BACKWARD_MAX_DEPTH", "deep"),
            ("CIVIC_SEED_DOMAIN", "maybe"),
        ]));
        assert_eq!(config.backward_max_depth, 5);
        assert!(config.seed_domain_knowledge);
    }

    #[test]
    fn test_depth_clamped_to_cap() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("CIVIC_BACKWARD_MAX_DEPTH", "1000"),
            ("CIVIC_CAUSAL_MAX_DEPTH", "32"),
        ]));
        assert_eq!(config.backward_max_depth, MAX_DEPTH_CAP);
        assert_eq!(config.causal_max_depth, 32);
    }
}
