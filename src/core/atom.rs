//! # Atom — Fato do Grafo e sua Forma Textual
//!
//! Um [`Atom`] é um nó ou um link. Esta é a unidade da exportação
//! linha-a-linha: cada linha do arquivo é a expressão de **um** átomo.
//!
//! ## Sintaxe
//!
//! ```text
//! (ConceptNode Poverty)
//! (InheritanceLink (ConceptNode Region_Nairobi) (ConceptNode Region))
//! (SimilarityLink (ConceptNode Poverty) (ConceptNode Unemployment) (Weight 0.7))
//! (ConceptNode "Região com espaço")
//! ```
//!
//! Dentro de um link, um símbolo solto (`Region`) é lido como `ConceptNode`.
//! Ids com espaço, parênteses, aspas, barra invertida ou iniciados por `$`
//! são escritos entre aspas.

use super::concept::{AtomType, NodeKey};
use super::link::{Link, LinkType};

/// Aninhamento máximo aceito pelo parser.
const MAX_NESTING: usize = 32;

/// Nó ou link.
#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    Node(NodeKey),
    Link(Link),
}

impl Atom {
    /// Serializa o átomo para uma linha de exportação.
    pub fn to_expr(&self) -> String {
        match self {
            Atom::Node(key) => node_expr(key),
            Atom::Link(link) => {
                let mut out = format!("({}", link.link_type.tag());
                for arg in &link.args {
                    out.push(' ');
                    out.push_str(&node_expr(arg));
                }
                if let Some(w) = link.weight {
                    out.push_str(&format!(" (Weight {w})"));
                }
                out.push(')');
                out
            }
        }
    }

    /// Interpreta uma linha de exportação.
    ///
    /// Retorna a mensagem de erro como `String`; quem chama decide se isso
    /// é fatal (import) ou recuperável (consulta textual).
    pub fn parse(text: &str) -> Result<Atom, String> {
        let expr = Sexpr::parse(text)?;
        let items = match &expr {
            Sexpr::List(items) => items,
            _ => return Err("átomo deve ser uma lista".into()),
        };
        let tag = match items.first() {
            Some(Sexpr::Symbol(tag)) => tag.as_str(),
            _ => return Err("átomo sem tag".into()),
        };
        if let Some(atom_type) = AtomType::from_tag(tag) {
            return node_from_items(atom_type, &items[1..]).map(Atom::Node);
        }
        let link_type =
            LinkType::from_tag(tag).ok_or_else(|| format!("tag desconhecida: {tag}"))?;
        let mut args = Vec::new();
        let mut weight = None;
        for item in &items[1..] {
            match item {
                Sexpr::List(inner) if is_weight(inner) => {
                    if weight.is_some() {
                        return Err("peso declarado mais de uma vez".into());
                    }
                    weight = Some(parse_weight(inner)?);
                }
                other => args.push(node_from_sexpr(other)?),
            }
        }
        Link::new(link_type, args, weight)
            .map(Atom::Link)
            .map_err(|e| e.to_string())
    }
}

/// Expressão de um nó, com aspas quando necessário.
pub(crate) fn node_expr(key: &NodeKey) -> String {
    format!("({} {})", key.atom_type.tag(), quote_if_needed(&key.id))
}

fn quote_if_needed(id: &str) -> String {
    let needs_quotes = id.is_empty()
        || id.starts_with('$')
        || id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\\'));
    if !needs_quotes {
        return id.to_string();
    }
    let mut out = String::with_capacity(id.len() + 2);
    out.push('"');
    for c in id.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn is_weight(items: &[Sexpr]) -> bool {
    matches!(items.first(), Some(Sexpr::Symbol(tag)) if tag == "Weight")
}

fn parse_weight(items: &[Sexpr]) -> Result<f64, String> {
    match items {
        [_, Sexpr::Symbol(value)] => value
            .parse::<f64>()
            .map_err(|_| format!("peso inválido: {value}")),
        _ => Err("Weight exige exatamente um valor".into()),
    }
}

fn node_from_items(atom_type: AtomType, rest: &[Sexpr]) -> Result<NodeKey, String> {
    match rest {
        [Sexpr::Symbol(id)] | [Sexpr::Quoted(id)] => Ok(NodeKey::new(atom_type, id.clone())),
        _ => Err(format!("{} exige exatamente um nome", atom_type.tag())),
    }
}

/// Converte um argumento de link em nó (símbolo solto ⇒ `ConceptNode`).
pub(crate) fn node_from_sexpr(expr: &Sexpr) -> Result<NodeKey, String> {
    match expr {
        Sexpr::Symbol(id) | Sexpr::Quoted(id) => Ok(NodeKey::concept(id.clone())),
        Sexpr::List(items) => match items.first() {
            Some(Sexpr::Symbol(tag)) => {
                let atom_type =
                    AtomType::from_tag(tag).ok_or_else(|| format!("argumento não é nó: {tag}"))?;
                node_from_items(atom_type, &items[1..])
            }
            _ => Err("argumento de link sem tag".into()),
        },
    }
}

// ─── S-expressions ───

/// Árvore sintática mínima das expressões de átomo e de padrão.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Sexpr {
    /// Símbolo sem aspas (pode ser variável `$x` em padrões).
    Symbol(String),
    /// String entre aspas — nunca é variável.
    Quoted(String),
    List(Vec<Sexpr>),
}

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Symbol(String),
    Quoted(String),
}

impl Sexpr {
    /// Interpreta exatamente uma expressão; sobras são erro.
    pub(crate) fn parse(text: &str) -> Result<Sexpr, String> {
        let tokens = tokenize(text)?;
        let mut pos = 0;
        let expr = parse_tokens(&tokens, &mut pos, 0)?;
        if pos != tokens.len() {
            return Err("conteúdo após o fim da expressão".into());
        }
        Ok(expr)
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err("escape no fim da linha".into()),
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err("aspas sem fechamento".into());
                }
                tokens.push(Token::Quoted(value));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                tokens.push(Token::Symbol(value));
            }
        }
    }
    Ok(tokens)
}

fn parse_tokens(tokens: &[Token], pos: &mut usize, depth: usize) -> Result<Sexpr, String> {
    if depth > MAX_NESTING {
        return Err("aninhamento excessivo".into());
    }
    match tokens.get(*pos) {
        None => Err("expressão vazia".into()),
        Some(Token::Close) => Err("parêntese de fechamento inesperado".into()),
        Some(Token::Symbol(s)) => {
            *pos += 1;
            Ok(Sexpr::Symbol(s.clone()))
        }
        Some(Token::Quoted(s)) => {
            *pos += 1;
            Ok(Sexpr::Quoted(s.clone()))
        }
        Some(Token::Open) => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    None => return Err("parêntese sem par".into()),
                    Some(Token::Close) => {
                        *pos += 1;
                        return Ok(Sexpr::List(items));
                    }
                    Some(_) => items.push(parse_tokens(tokens, pos, depth + 1)?),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_expr_quotes_when_needed() {
        assert_eq!(Atom::Node(NodeKey::concept("Poverty")).to_expr(), "(ConceptNode Poverty)");
        assert_eq!(
            Atom::Node(NodeKey::concept("Rural (north)")).to_expr(),
            r#"(ConceptNode "Rural (north)")"#
        );
        assert_eq!(
            Atom::Node(NodeKey::concept(r#"say "hi""#)).to_expr(),
            r#"(ConceptNode "say \"hi\"")"#
        );
    }

    #[test]
    fn test_parse_link_with_weight() {
        let atom = Atom::parse(
            "(SimilarityLink (ConceptNode Poverty) (ConceptNode Unemployment) (Weight 0.7))",
        )
        .unwrap();
        match atom {
            Atom::Link(link) => {
                assert_eq!(link.link_type, LinkType::Similarity);
                assert_eq!(link.args[1], NodeKey::concept("Unemployment"));
                assert_eq!(link.weight, Some(0.7));
            }
            other => panic!("esperava link, veio {other:?}"),
        }
    }

    #[test]
    fn test_bare_symbols_are_concepts() {
        let atom = Atom::parse("(InheritanceLink Region_A Region)").unwrap();
        assert_eq!(
            atom,
            Atom::Link(
                Link::new(
                    LinkType::Inheritance,
                    vec![NodeKey::concept("Region_A"), NodeKey::concept("Region")],
                    None
                )
                .unwrap()
            )
        );
    }

    #[test]
    fn test_expression_survives_reparse() {
        let link = Link::new(
            LinkType::Evaluation,
            vec![
                NodeKey::predicate("name"),
                NodeKey::concept("Region_Nairobi"),
                NodeKey::number("Nairobi City (County)"),
            ],
            None,
        )
        .unwrap();
        let expr = Atom::Link(link.clone()).to_expr();
        assert_eq!(Atom::parse(&expr).unwrap(), Atom::Link(link));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Atom::parse("(ConceptNode Poverty").is_err());
        assert!(Atom::parse("(ConceptNode)").is_err());
        assert!(Atom::parse("(FooLink A B)").is_err());
        assert!(Atom::parse("(InheritanceLink A)").is_err());
        assert!(Atom::parse("(ConceptNode A) extra").is_err());
        assert!(Atom::parse(r#"(ConceptNode "open)"#).is_err());
        let deep = format!("{}{}", "(".repeat(100), ")".repeat(100));
        assert!(Atom::parse(&deep).is_err());
    }
}
