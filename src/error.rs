//! # Erros do Motor Cognitivo
//!
//! Taxonomia única de erros usada por todas as camadas do motor.
//!
//! | Variante | Quando ocorre | Recuperável? |
//! |----------|---------------|--------------|
//! | [`MalformedQuery`](EngineError::MalformedQuery) | Padrão estruturalmente inválido | Sim (chamador corrige) |
//! | [`UnknownRule`](EngineError::UnknownRule) | Remoção de regra inexistente | Sim |
//! | [`InvalidInput`](EngineError::InvalidInput) | Valor fora de `[0, 1]`, id vazio, aridade inválida | Sim |
//! | [`Parse`](EngineError::Parse) | Linha corrompida num arquivo exportado | Não — import aborta |
//! | [`Io`](EngineError::Io) | Falha de leitura/escrita | Não |
//! | [`Internal`](EngineError::Internal) | Estado impossível do store | Não |
//!
//! Condições *esperadas* de "sem resposta" (nenhuma cadeia causal, nenhuma
//! regra aplicável, profundidade esgotada) **não** são erros: são modeladas
//! como `None`, `Vec` vazio ou [`RuleApplication::NotApplied`](crate::inference::RuleApplication).
//! Assim o chamador distingue "o motor falhou" de "o motor respondeu:
//! evidência insuficiente".

use std::path::PathBuf;

use thiserror::Error;

/// Erro do motor cognitivo.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Padrão de consulta com defeito estrutural (ex: sem argumentos).
    #[error("consulta malformada: {0}")]
    MalformedQuery(String),

    /// Regra não encontrada na tabela.
    #[error("regra desconhecida: {0}")]
    UnknownRule(String),

    /// Entrada rejeitada na construção (ex: strength fora de [0, 1]).
    #[error("entrada inválida: {0}")]
    InvalidInput(String),

    /// Linha de exportação que não pôde ser interpretada.
    #[error("linha {line} inválida: {message}")]
    Parse { line: usize, message: String },

    /// Falha de E/S ao ler ou gravar o grafo.
    #[error("falha de E/S em {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Estado interno inconsistente — nunca deveria acontecer.
    #[error("erro interno do motor: {0}")]
    Internal(String),
}

/// Atalho para resultados do motor.
pub type EngineResult<T> = Result<T, EngineError>;

/// Valida que um valor está no intervalo fechado `[0, 1]`.
///
/// `NaN` é rejeitado.
pub(crate) fn ensure_unit(name: &str, value: f64) -> EngineResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(EngineError::InvalidInput(format!(
            "{name} = {value} está fora de [0.0, 1.0]"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_unit_accepts_bounds() {
        assert!(ensure_unit("strength", 0.0).is_ok());
        assert!(ensure_unit("strength", 1.0).is_ok());
    }

    #[test]
    fn test_ensure_unit_rejects_out_of_range_and_nan() {
        assert!(matches!(
            ensure_unit("confidence", 1.01),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(ensure_unit("confidence", -0.1).is_err());
        assert!(ensure_unit("confidence", f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = EngineError::Parse { line: 3, message: "parêntese sem par".into() };
        assert_eq!(err.to_string(), "linha 3 inválida: parêntese sem par");
    }
}
