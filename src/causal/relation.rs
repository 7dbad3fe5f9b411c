//! Tipos de dados do grafo causal: relações e observações.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_unit, EngineError, EngineResult};

/// Relação `cause → effect` com força e confiança em `[0, 1]`.
///
/// A desserialização passa por [`CausalRelation::new`]: um estado salvo
/// com nomes vazios ou valores fora do intervalo é rejeitado.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCausalRelation")]
pub struct CausalRelation {
    pub cause: String,
    pub effect: String,
    pub strength: f64,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub mechanism: Option<String>,
}

#[derive(Deserialize)]
struct RawCausalRelation {
    cause: String,
    effect: String,
    strength: f64,
    confidence: f64,
    #[serde(default)]
    evidence: Vec<String>,
    #[serde(default)]
    mechanism: Option<String>,
}

impl TryFrom<RawCausalRelation> for CausalRelation {
    type Error = EngineError;

    fn try_from(raw: RawCausalRelation) -> Result<Self, Self::Error> {
        let mut relation = CausalRelation::new(raw.cause, raw.effect, raw.strength, raw.confidence)?;
        relation.evidence = raw.evidence;
        relation.mechanism = raw.mechanism;
        Ok(relation)
    }
}

impl CausalRelation {
    /// Cria uma relação validada.
    ///
    /// # Erros
    ///
    /// [`EngineError::InvalidInput`] para nomes vazios ou força/confiança
    /// fora de `[0, 1]`.
    pub fn new(
        cause: impl Into<String>,
        effect: impl Into<String>,
        strength: f64,
        confidence: f64,
    ) -> EngineResult<Self> {
        let cause = cause.into();
        let effect = effect.into();
        if cause.trim().is_empty() || effect.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "relação causal exige causa e efeito".into(),
            ));
        }
        Ok(Self {
            cause,
            effect,
            strength: ensure_unit("strength", strength)?,
            confidence: ensure_unit("confidence", confidence)?,
            evidence: Vec::new(),
            mechanism: None,
        })
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.mechanism = Some(mechanism.into());
        self
    }

    /// Peso usado para ranquear causas: `strength × confidence`.
    pub fn weight(&self) -> f64 {
        self.strength * self.confidence
    }
}

/// Linha de dados observacionais: variáveis nomeadas com valor numérico.
///
/// A ordem de inserção é preservada; ela decide a direção das relações
/// descobertas (a variável vista primeiro vira a causa).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation(Vec<(String, f64)>);

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define uma variável (substitui o valor se já existir).
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Observation {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Observation::new(), |obs, (name, value)| obs.with(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_validation() {
        assert!(CausalRelation::new("Poverty", "Low_Education", 0.75, 0.7).is_ok());
        assert!(matches!(
            CausalRelation::new("Poverty", "Low_Education", 1.5, 0.7),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(CausalRelation::new("", "X", 0.5, 0.5).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: CausalRelation = serde_json::from_str(
            r#"{"cause":"Drought","effect":"Poverty","strength":0.6,"confidence":0.5,"evidence":["Rainfall"]}"#,
        )
        .unwrap();
        assert_eq!(ok.evidence, ["Rainfall"]);

        let bad = serde_json::from_str::<CausalRelation>(
            r#"{"cause":"","effect":"B","strength":5.0,"confidence":-2.0}"#,
        );
        assert!(bad.is_err());
        let out_of_range = serde_json::from_str::<CausalRelation>(
            r#"{"cause":"A","effect":"B","strength":0.5,"confidence":-2.0}"#,
        );
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_observation_keeps_order_and_replaces() {
        let obs = Observation::new().with("poverty", 0.8).with("allocation", 10.0).with("poverty", 0.9);
        assert_eq!(obs.variables().collect::<Vec<_>>(), vec!["poverty", "allocation"]);
        assert_eq!(obs.get("poverty"), Some(0.9));
        assert_eq!(obs.get("missing"), None);
    }

    #[test]
    fn test_observation_deserializes_from_pairs() {
        let obs: Observation = serde_json::from_str(r#"[["poverty", 0.5], ["allocation", 2.0]]"#).unwrap();
        assert_eq!(obs.get("allocation"), Some(2.0));
    }
}
