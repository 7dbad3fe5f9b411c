//! # KnowledgeBase — Grafo de Conhecimento Tipado
//!
//! A [`KnowledgeBase`] é o **store central** do motor: guarda nós e links
//! em memória, com um índice reverso para consultas rápidas por nó.
//!
//! ## Armazenamento
//!
//! - **Nós**: `Vec<NodeKey>` em ordem de inserção + `HashSet` para identidade
//! - **Links**: `Vec<Link>` em ordem de inserção (duplicatas toleradas)
//! - **Índice reverso**: `HashMap<NodeKey, Vec<usize>>` — "quais links citam este nó?"
//!
//! A ordem de inserção é a ordem de todos os resultados: consultas são
//! determinísticas para um mesmo estado do store.
//!
//! ## Invariantes
//!
//! - re-adicionar um nó `(tipo, id)` existente é no-op;
//! - todo nó citado por um link existe (links criam nós ausentes);
//! - consultas deduplicam ligações idênticas.
//!
//! ## Concorrência
//!
//! O store em si não sincroniza nada. No motor ele vive em
//! `Arc<RwLock<KnowledgeBase>>` — ver [`CognitiveEngine`](crate::engine::CognitiveEngine).
//!
//! ## Exemplo
//!
//! ```text
//! kb.add_link(LinkType::Inheritance,
//!             vec![NodeKey::concept("Region_A"), NodeKey::concept("Region")], None)?;
//! kb.query(&Pattern::link(LinkType::Inheritance).var("r").concept("Region"))?
//!   → [{ r: ConceptNode:Region_A }]
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use super::atom::Atom;
use super::concept::{AtomType, NodeKey};
use super::link::{Link, LinkType};
use super::pattern::{Binding, Pattern, Term};
use crate::error::{EngineError, EngineResult};

/// Contadores do store.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct KbStats {
    pub nodes: usize,
    pub links: usize,
    /// Quantidade de links por tag de tipo.
    pub links_by_type: BTreeMap<String, usize>,
}

/// Resultado de um import linha-a-linha.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Linhas interpretadas (vazias e comentários não contam).
    pub atoms_read: usize,
    /// Nós efetivamente criados (re-import ⇒ 0).
    pub nodes_created: usize,
    /// Links adicionados.
    pub links_added: usize,
}

/// Grafo de conhecimento in-memory.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    nodes: Vec<NodeKey>,
    node_set: HashSet<NodeKey>,
    links: Vec<Link>,
    /// Índice reverso: nó → posições em `links`, crescentes.
    node_links: HashMap<NodeKey, Vec<usize>>,
}

impl KnowledgeBase {
    /// Cria um store vazio.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════
    // MUTAÇÃO
    // ════════════════════════════════════════════════════════════

    /// Adiciona um nó. Retorna `true` se ele foi criado agora.
    ///
    /// # Erros
    ///
    /// [`EngineError::InvalidInput`] se o id for vazio.
    pub fn add_node(&mut self, atom_type: AtomType, id: &str) -> EngineResult<bool> {
        if id.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "{} com id vazio",
                atom_type.tag()
            )));
        }
        Ok(self.insert_node(NodeKey::new(atom_type, id)))
    }

    fn insert_node(&mut self, key: NodeKey) -> bool {
        if self.node_set.contains(&key) {
            return false;
        }
        tracing::debug!(node = %key, "KG: nó armazenado");
        self.node_set.insert(key.clone());
        self.nodes.push(key);
        true
    }

    /// Adiciona um link, criando os nós ausentes.
    ///
    /// Sempre retorna `Ok(true)` para um link válido — links não são únicos.
    ///
    /// # Erros
    ///
    /// Aridade < 2, id vazio ou peso fora de `[0, 1]`.
    pub fn add_link(
        &mut self,
        link_type: LinkType,
        args: Vec<NodeKey>,
        weight: Option<f64>,
    ) -> EngineResult<bool> {
        let link = Link::new(link_type, args, weight)?;
        self.insert_link(link);
        Ok(true)
    }

    /// Atalho para links entre `ConceptNode`s.
    pub fn add_concept_link(
        &mut self,
        link_type: LinkType,
        from: &str,
        to: &str,
        weight: Option<f64>,
    ) -> EngineResult<bool> {
        self.add_link(
            link_type,
            vec![NodeKey::concept(from), NodeKey::concept(to)],
            weight,
        )
    }

    /// Insere um link já validado. Devolve quantos nós foram criados.
    fn insert_link(&mut self, link: Link) -> usize {
        let mut created = 0;
        for arg in &link.args {
            if self.insert_node(arg.clone()) {
                created += 1;
            }
        }
        let position = self.links.len();
        let mut seen: Vec<&NodeKey> = Vec::with_capacity(link.args.len());
        for arg in &link.args {
            if seen.contains(&arg) {
                continue;
            }
            seen.push(arg);
            self.node_links.entry(arg.clone()).or_default().push(position);
        }
        tracing::debug!(kind = %link.link_type.label(), args = link.args.len(), "KG: link armazenado");
        self.links.push(link);
        created
    }

    /// Caminho único usado por ingestão e import.
    ///
    /// Para nós retorna se foi criado; para links, sempre `true`.
    pub fn add_atom(&mut self, atom: &Atom) -> EngineResult<bool> {
        match atom {
            Atom::Node(key) => self.add_node(key.atom_type, &key.id),
            Atom::Link(link) => {
                let link = Link::new(link.link_type, link.args.clone(), link.weight)?;
                self.insert_link(link);
                Ok(true)
            }
        }
    }

    /// Remove todos os átomos.
    pub fn clear(&mut self) -> bool {
        self.nodes.clear();
        self.node_set.clear();
        self.links.clear();
        self.node_links.clear();
        tracing::info!("KG: store limpo");
        true
    }

    // ════════════════════════════════════════════════════════════
    // CONSULTA
    // ════════════════════════════════════════════════════════════

    /// Consulta por padrão tipado.
    ///
    /// Resultados deduplicados, na ordem de inserção dos links.
    ///
    /// # Erros
    ///
    /// [`EngineError::MalformedQuery`] para defeitos estruturais do padrão.
    pub fn query(&self, pattern: &Pattern) -> EngineResult<Vec<Binding>> {
        pattern.validate()?;
        let mut seen: HashSet<Binding> = HashSet::new();
        let mut results = Vec::new();
        for link in self.candidates(pattern) {
            if let Some(binding) = pattern.match_link(link) {
                if seen.insert(binding.clone()) {
                    results.push(binding);
                }
            }
        }
        Ok(results)
    }

    /// Consulta pela forma textual, ex: `(InheritanceLink $r Region)`.
    ///
    /// Erro de sintaxe ou de estrutura não propaga: é logado e o
    /// resultado é vazio.
    pub fn query_text(&self, text: &str) -> Vec<Binding> {
        let pattern = match Pattern::parse(text) {
            Ok(p) => p,
            Err(reason) => {
                tracing::warn!(query = %text, %reason, "KG: padrão textual inválido");
                return Vec::new();
            }
        };
        self.query(&pattern).unwrap_or_else(|e| {
            tracing::warn!(query = %text, error = %e, "KG: padrão textual inválido");
            Vec::new()
        })
    }

    /// Ids ligados a uma variável, na ordem dos resultados.
    pub fn query_ids(&self, pattern: &Pattern, var: &str) -> EngineResult<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for binding in self.query(pattern)? {
            if let Some(key) = binding.get(var) {
                if !ids.contains(&key.id) {
                    ids.push(key.id.clone());
                }
            }
        }
        Ok(ids)
    }

    /// `true` se algum link casa com o padrão.
    pub fn matches(&self, pattern: &Pattern) -> EngineResult<bool> {
        pattern.validate()?;
        Ok(self.candidates(pattern).any(|l| pattern.match_link(l).is_some()))
    }

    /// Links candidatos: via índice reverso do primeiro nó fixo, ou todos.
    fn candidates<'a>(&'a self, pattern: &Pattern) -> Box<dyn Iterator<Item = &'a Link> + 'a> {
        let anchor = pattern.terms.iter().find_map(|t| match t {
            Term::Node(key) => Some(key),
            Term::Var(_) => None,
        });
        match anchor {
            Some(key) => {
                let positions = self.node_links.get(key).map(Vec::as_slice).unwrap_or(&[]);
                Box::new(positions.iter().filter_map(move |&i| self.links.get(i)))
            }
            None => Box::new(self.links.iter()),
        }
    }

    /// Nós ligados a `id` por `SimilarityLink`, em qualquer direção.
    ///
    /// Considera nós de qualquer tipo com esse id. Sem duplicatas, na ordem
    /// de inserção dos links, truncado em `max_results`.
    pub fn get_related(&self, id: &str, max_results: usize) -> Vec<String> {
        self.similar_to(id, 0.0)
            .into_iter()
            .map(|(other, _)| other)
            .take(max_results)
            .collect()
    }

    /// Vizinhos por similaridade com peso ≥ `min_weight` (sem peso conta 1.0).
    pub fn similar_to(&self, id: &str, min_weight: f64) -> Vec<(String, f64)> {
        let mut related: Vec<(String, f64)> = Vec::new();
        for link in &self.links {
            if link.link_type != LinkType::Similarity {
                continue;
            }
            let weight = link.weight.unwrap_or(1.0);
            if weight < min_weight {
                continue;
            }
            let other = if link.head().id == id {
                link.target()
            } else if link.target().id == id {
                link.head()
            } else {
                continue;
            };
            if other.id != id && !related.iter().any(|(r, _)| *r == other.id) {
                related.push((other.id.clone(), weight));
            }
        }
        related
    }

    /// Links que citam um nó.
    pub fn links_for(&self, key: &NodeKey) -> Vec<&Link> {
        self.node_links
            .get(key)
            .map(|ps| ps.iter().filter_map(|&i| self.links.get(i)).collect())
            .unwrap_or_default()
    }

    /// `true` se o nó existe.
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.node_set.contains(key)
    }

    /// Nós em ordem de inserção.
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// Links em ordem de inserção.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Contadores gerais e por tipo de link.
    pub fn stats(&self) -> KbStats {
        let mut links_by_type = BTreeMap::new();
        for link in &self.links {
            *links_by_type.entry(link.link_type.tag().to_string()).or_insert(0) += 1;
        }
        KbStats {
            nodes: self.nodes.len(),
            links: self.links.len(),
            links_by_type,
        }
    }

    // ════════════════════════════════════════════════════════════
    // EXPORTAÇÃO / IMPORTAÇÃO
    // ════════════════════════════════════════════════════════════

    /// Uma expressão por átomo: primeiro os nós, depois os links.
    pub fn export_lines(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|k| Atom::Node(k.clone()).to_expr())
            .chain(self.links.iter().map(|l| Atom::Link(l.clone()).to_expr()))
            .collect()
    }

    /// Reaplica linhas exportadas pelo mesmo caminho da ingestão.
    ///
    /// Linhas vazias e comentários (`;`) são ignorados. Idempotente para
    /// nós; links são re-adicionados.
    ///
    /// # Erros
    ///
    /// [`EngineError::Parse`] na primeira linha corrompida. As linhas
    /// anteriores já aplicadas permanecem.
    pub fn import_lines<I, S>(&mut self, lines: I) -> EngineResult<ImportReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = ImportReport::default();
        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let atom = Atom::parse(line).map_err(|message| EngineError::Parse {
                line: index + 1,
                message,
            })?;
            report.atoms_read += 1;
            match &atom {
                Atom::Node(_) => {
                    if self.add_atom(&atom)? {
                        report.nodes_created += 1;
                    }
                }
                Atom::Link(link) => {
                    report.nodes_created += self.insert_link(link.clone());
                    report.links_added += 1;
                }
            }
        }
        Ok(report)
    }

    /// Grava a exportação em `path`. Retorna o número de linhas.
    pub fn export_all(&self, path: &Path) -> EngineResult<usize> {
        let lines = self.export_lines();
        let mut body = lines.join("\n");
        body.push('\n');
        std::fs::write(path, body).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), atoms = lines.len(), "KG: exportado");
        Ok(lines.len())
    }

    /// Lê e reaplica a exportação em `path`.
    pub fn import_all(&mut self, path: &Path) -> EngineResult<ImportReport> {
        let body = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report = self.import_lines(body.lines())?;
        tracing::info!(
            path = %path.display(),
            atoms = report.atoms_read,
            nodes_created = report.nodes_created,
            "KG: importado"
        );
        Ok(report)
    }
}
