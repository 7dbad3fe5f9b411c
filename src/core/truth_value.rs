//! # TruthValue — Grau de Verdade Probabilístico
//!
//! Implementação do par **(strength, confidence)** usado pela lógica
//! probabilística do motor (estilo PLN — Probabilistic Logic Networks).
//!
//! - **Strength (s)**: "Quão verdadeira é a proposição?" — de 0.0 a 1.0
//! - **Confidence (c)**: "Quanta evidência sustenta essa avaliação?" — de 0.0 a 1.0
//!
//! Valores fora de `[0, 1]` são **rejeitados na construção**
//! ([`EngineError::InvalidInput`]) — nunca corrigidos silenciosamente.
//!
//! ## Cálculo
//!
//! Todos os operadores são funções puras e determinísticas:
//!
//! | Regra | Strength | Confidence |
//! |-------|----------|------------|
//! | **Dedução** | `a.s × b.s` | `min(a.c, b.c) × 0.9` |
//! | **Abdução** | `imp.s × cons.s × 0.8` | `min(imp.c, cons.c) × 0.7` |
//! | **Indução** | média das strengths | `min(0.9, n / 10)` |
//! | **Conjunção** | `a.s × b.s` | `min(a.c, b.c)` |
//! | **Disjunção** | `a.s + b.s − a.s × b.s` | `min(a.c, b.c)` |
//! | **Negação** | `1 − s` | `c` |
//!
//! Os fatores 0.9 e 0.7 são **política**: dedução e abdução amortecem a
//! confiança para modelar a perda de informação a cada passo de inferência.
//! Esse decaimento alimenta o roteamento e a qualidade das explicações.
//!
//! ## Exemplo
//!
//! ```text
//! "Região pobre"            ⟨0.80, 0.90⟩
//! "Pobreza ⇒ prioridade"    ⟨0.70, 0.80⟩
//! ⊢ dedução                 ⟨0.56, 0.72⟩
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_unit, EngineResult};

/// Amortecimento de confiança aplicado pela dedução.
const DEDUCTION_DAMPING: f64 = 0.9;

/// Amortecimento de strength aplicado pela abdução.
const ABDUCTION_STRENGTH_DAMPING: f64 = 0.8;

/// Amortecimento de confiança aplicado pela abdução.
const ABDUCTION_CONFIDENCE_DAMPING: f64 = 0.7;

/// Teto de confiança da indução — generalização nunca é certeza.
const INDUCTION_MAX_CONFIDENCE: f64 = 0.9;

/// Grau de verdade `(strength, confidence)`, ambos em `[0, 1]`.
///
/// Tipo de valor imutável (`Copy`). A desserialização passa pela mesma
/// validação de [`TruthValue::new`].
///
/// ## Display
///
/// `⟨strength, confidence⟩`, por exemplo: `⟨0.85, 0.90⟩`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTruthValue")]
pub struct TruthValue {
    strength: f64,
    confidence: f64,
}

/// Forma "crua" usada apenas para validar a desserialização.
#[derive(Deserialize)]
struct RawTruthValue {
    strength: f64,
    confidence: f64,
}

impl TryFrom<RawTruthValue> for TruthValue {
    type Error = crate::error::EngineError;

    fn try_from(raw: RawTruthValue) -> Result<Self, Self::Error> {
        TruthValue::new(raw.strength, raw.confidence)
    }
}

impl TruthValue {
    /// Cria um TruthValue validado.
    ///
    /// # Erros
    ///
    /// [`EngineError::InvalidInput`](crate::error::EngineError::InvalidInput)
    /// se qualquer componente estiver fora de `[0, 1]` ou for `NaN`.
    pub fn new(strength: f64, confidence: f64) -> EngineResult<Self> {
        Ok(Self {
            strength: ensure_unit("strength", strength)?,
            confidence: ensure_unit("confidence", confidence)?,
        })
    }

    /// Construtor interno para resultados do cálculo.
    ///
    /// Os operadores preservam `[0, 1]` para entradas válidas; o clamp
    /// só absorve ruído de ponto flutuante (ex: `1.0000000000000002`).
    fn computed(strength: f64, confidence: f64) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Certeza total ⟨1.0, 1.0⟩ — elemento neutro da dedução em strength.
    pub fn certain() -> Self {
        Self::computed(1.0, 1.0)
    }

    /// "Não sabemos nada" ⟨0.5, 0.0⟩.
    pub fn unknown() -> Self {
        Self::computed(0.5, 0.0)
    }

    /// Observação direta sem TV conhecido ⟨1.0, 0.8⟩.
    pub fn observed() -> Self {
        Self::computed(1.0, 0.8)
    }

    /// Palpite sem evidência relevante ⟨0.5, 0.1⟩.
    pub fn vague() -> Self {
        Self::computed(0.5, 0.1)
    }

    /// Strength — grau de verdade.
    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Confidence — peso da evidência.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// `true` se a strength passa de 0.7.
    pub fn is_strong(&self) -> bool {
        self.strength > 0.7
    }

    /// `true` se a confiança passa de 0.7.
    pub fn is_confident(&self) -> bool {
        self.confidence > 0.7
    }

    // ════════════════════════════════════════════════════════════
    // OPERADORES DO CÁLCULO
    // ════════════════════════════════════════════════════════════

    /// **Dedução** — `A ⇒ B`, `B ⇒ C` ⊢ `A ⇒ C`.
    ///
    /// Strength multiplica; confiança é a menor das duas, amortecida em 10%.
    pub fn deduction(&self, other: &TruthValue) -> TruthValue {
        TruthValue::computed(
            self.strength * other.strength,
            self.confidence.min(other.confidence) * DEDUCTION_DAMPING,
        )
    }

    /// **Abdução** — dada a implicação `H ⇒ O` (`self`) e a observação `O`,
    /// hipotetiza `H`.
    ///
    /// É a forma mais fraca de inferência: strength ×0.8, confiança ×0.7.
    pub fn abduction(&self, consequent: &TruthValue) -> TruthValue {
        TruthValue::computed(
            self.strength * consequent.strength * ABDUCTION_STRENGTH_DAMPING,
            self.confidence.min(consequent.confidence) * ABDUCTION_CONFIDENCE_DAMPING,
        )
    }

    /// **Indução** — generaliza a partir de `n` instâncias.
    ///
    /// Strength é a média; confiança cresce com `n` (`n/10`) até o teto 0.9.
    /// Sem instâncias retorna ⟨0.5, 0.0⟩.
    pub fn induction(instances: &[TruthValue]) -> TruthValue {
        if instances.is_empty() {
            return TruthValue::unknown();
        }
        let n = instances.len() as f64;
        let mean = instances.iter().map(|tv| tv.strength).sum::<f64>() / n;
        TruthValue::computed(mean, (n / 10.0).min(INDUCTION_MAX_CONFIDENCE))
    }

    /// **Conjunção** — `A ∧ B` (independência assumida).
    pub fn conjunction(&self, other: &TruthValue) -> TruthValue {
        TruthValue::computed(
            self.strength * other.strength,
            self.confidence.min(other.confidence),
        )
    }

    /// **Disjunção** — `A ∨ B` (inclusão–exclusão).
    pub fn disjunction(&self, other: &TruthValue) -> TruthValue {
        TruthValue::computed(
            self.strength + other.strength - self.strength * other.strength,
            self.confidence.min(other.confidence),
        )
    }

    /// **Negação** — `¬A`; a confiança não muda.
    pub fn negation(&self) -> TruthValue {
        TruthValue::computed(1.0 - self.strength, self.confidence)
    }
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "⟨{:.2}, {:.2}⟩", self.strength, self.confidence)
    }
}
