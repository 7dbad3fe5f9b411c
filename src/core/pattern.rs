//! # Pattern — Consultas Tipadas com Variáveis
//!
//! Em vez de montar strings de consulta, o chamador constrói um
//! [`Pattern`] com slots explícitos:
//!
//! ```text
//! Pattern::link(LinkType::Inheritance)
//!     .var("region")
//!     .concept("High_Poverty_Region")
//! ```
//!
//! equivale à forma textual `(InheritanceLink $region High_Poverty_Region)`.
//!
//! ## Semântica de casamento
//!
//! - o link precisa ter o mesmo tipo e a mesma aridade do padrão;
//! - cada termo [`Term::Node`] exige igualdade exata do nó na posição;
//! - cada [`Term::Var`] liga a posição ao nó encontrado — a mesma
//!   variável repetida precisa ligar o mesmo nó;
//! - o peso do link é ignorado.

use std::collections::BTreeMap;

use super::atom::{node_from_sexpr, Sexpr};
use super::concept::{AtomType, NodeKey};
use super::link::{Link, LinkType};
use crate::error::{EngineError, EngineResult};

/// Conjunto de ligações variável → nó de um resultado.
pub type Binding = BTreeMap<String, NodeKey>;

/// Termo posicional de um padrão.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// Variável livre (sem o `$`).
    Var(String),
    /// Nó fixo.
    Node(NodeKey),
}

/// Padrão de consulta sobre links.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub link_type: LinkType,
    pub terms: Vec<Term>,
}

impl Pattern {
    /// Começa um padrão para o tipo de link dado.
    pub fn link(link_type: LinkType) -> Self {
        Self { link_type, terms: Vec::new() }
    }

    /// Adiciona uma variável livre.
    pub fn var(mut self, name: impl Into<String>) -> Self {
        self.terms.push(Term::Var(name.into()));
        self
    }

    /// Adiciona um nó fixo.
    pub fn node(mut self, atom_type: AtomType, id: impl Into<String>) -> Self {
        self.terms.push(Term::Node(NodeKey::new(atom_type, id)));
        self
    }

    /// Atalho para um `ConceptNode` fixo.
    pub fn concept(self, id: impl Into<String>) -> Self {
        self.node(AtomType::Concept, id)
    }

    /// Verifica a estrutura do padrão.
    ///
    /// # Erros
    ///
    /// [`EngineError::MalformedQuery`] se faltar argumento (aridade < 2),
    /// se uma variável tiver nome vazio ou se um nó fixo tiver id vazio.
    pub fn validate(&self) -> EngineResult<()> {
        if self.terms.len() < 2 {
            return Err(EngineError::MalformedQuery(format!(
                "{} exige ao menos 2 termos, recebeu {}",
                self.link_type.tag(),
                self.terms.len()
            )));
        }
        for term in &self.terms {
            match term {
                Term::Var(name) if name.trim().is_empty() => {
                    return Err(EngineError::MalformedQuery("variável sem nome".into()))
                }
                Term::Node(key) if key.id.trim().is_empty() => {
                    return Err(EngineError::MalformedQuery("nó com id vazio".into()))
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Nomes das variáveis, na ordem da primeira ocorrência.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for term in &self.terms {
            if let Term::Var(name) = term {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Tenta casar o padrão com um link; devolve as ligações se casar.
    pub fn match_link(&self, link: &Link) -> Option<Binding> {
        if link.link_type != self.link_type || link.args.len() != self.terms.len() {
            return None;
        }
        let mut binding = Binding::new();
        for (term, arg) in self.terms.iter().zip(&link.args) {
            match term {
                Term::Node(key) => {
                    if key != arg {
                        return None;
                    }
                }
                Term::Var(name) => match binding.get(name) {
                    Some(bound) if bound != arg => return None,
                    Some(_) => {}
                    None => {
                        binding.insert(name.clone(), arg.clone());
                    }
                },
            }
        }
        Some(binding)
    }

    /// Interpreta a forma textual `(TipoLink termo termo ...)`.
    ///
    /// Termos: `$nome` é variável; símbolo solto é `ConceptNode`;
    /// `(PredicateNode x)` etc. são nós tipados.
    pub fn parse(text: &str) -> Result<Pattern, String> {
        let expr = Sexpr::parse(text)?;
        let items = match expr {
            Sexpr::List(items) => items,
            _ => return Err("padrão deve ser uma lista".into()),
        };
        let (head, rest) = items.split_first().ok_or("padrão vazio")?;
        let tag = match head {
            Sexpr::Symbol(tag) => tag,
            _ => return Err("padrão sem tag".into()),
        };
        let link_type =
            LinkType::from_tag(tag).ok_or_else(|| format!("tipo de link desconhecido: {tag}"))?;
        let mut pattern = Pattern::link(link_type);
        for item in rest {
            let term = match item {
                Sexpr::Symbol(s) if s.starts_with('$') => Term::Var(s[1..].to_string()),
                other => Term::Node(node_from_sexpr(other)?),
            };
            pattern.terms.push(term);
        }
        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(t: LinkType, args: &[&str]) -> Link {
        Link::new(t, args.iter().map(|a| NodeKey::concept(*a)).collect(), None).unwrap()
    }

    #[test]
    fn test_match_binds_variables() {
        let p = Pattern::link(LinkType::Inheritance).var("r").concept("Region");
        let b = p.match_link(&link(LinkType::Inheritance, &["Region_A", "Region"])).unwrap();
        assert_eq!(b["r"], NodeKey::concept("Region_A"));
        assert!(p.match_link(&link(LinkType::Inheritance, &["Region_A", "Policy"])).is_none());
        assert!(p.match_link(&link(LinkType::Similarity, &["Region_A", "Region"])).is_none());
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let p = Pattern::link(LinkType::Similarity).var("x").var("x");
        assert!(p.match_link(&link(LinkType::Similarity, &["A", "A"])).is_some());
        assert!(p.match_link(&link(LinkType::Similarity, &["A", "B"])).is_none());
    }

    #[test]
    fn test_validate_structure() {
        assert!(matches!(
            Pattern::link(LinkType::Inheritance).var("x").validate(),
            Err(EngineError::MalformedQuery(_))
        ));
        assert!(Pattern::link(LinkType::Inheritance).var("").concept("B").validate().is_err());
        assert!(Pattern::link(LinkType::Inheritance).var("x").concept("B").validate().is_ok());
    }

    #[test]
    fn test_parse_textual_pattern() {
        let p = Pattern::parse("(EvaluationLink (PredicateNode poverty_index) $region $value)")
            .unwrap();
        assert_eq!(p.link_type, LinkType::Evaluation);
        assert_eq!(p.terms[0], Term::Node(NodeKey::predicate("poverty_index")));
        assert_eq!(p.variables(), vec!["region", "value"]);
        assert!(Pattern::parse("(InheritanceLink $x").is_err());
        assert!(Pattern::parse("(NopeLink $x $y)").is_err());
    }
}
