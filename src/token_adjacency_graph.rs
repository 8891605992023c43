//! Directed "useful intermediate hop" graph.
//!
//! Every token starts from the chain's default intermediates; explicit edges
//! are appended after them. The graph is immutable once built.

use ethers::types::Address;
use indexmap::IndexSet;
use std::collections::HashMap;

use crate::errors::{SamplerError, SamplerResult};

#[derive(Debug, Clone, Default)]
pub struct TokenAdjacencyGraph {
    graph: HashMap<Address, Vec<Address>>,
    default_tokens: Vec<Address>,
}

impl TokenAdjacencyGraph {
    pub fn builder(default_tokens: Vec<Address>) -> TokenAdjacencyGraphBuilder {
        TokenAdjacencyGraphBuilder {
            graph: HashMap::new(),
            default_tokens,
        }
    }

    /// A graph with no explicit edges.
    pub fn from_defaults(default_tokens: Vec<Address>) -> Self {
        Self {
            graph: HashMap::new(),
            default_tokens,
        }
    }

    /// A graph that proposes no intermediate tokens at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Explicit neighbours of `token`, or the defaults if it has none.
    pub fn get_adjacent_tokens(&self, token: &Address) -> &[Address] {
        self.graph
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_tokens[..])
    }

    /// Candidate hops between `a` and `b`: the union of both neighbour lists in
    /// first-seen order, never containing `a` or `b` themselves.
    pub fn get_intermediate_tokens(&self, a: &Address, b: &Address) -> Vec<Address> {
        let mut tokens: IndexSet<Address> = IndexSet::new();
        for token in self
            .get_adjacent_tokens(a)
            .iter()
            .chain(self.get_adjacent_tokens(b))
        {
            if token != a && token != b {
                tokens.insert(*token);
            }
        }
        tokens.into_iter().collect()
    }

    pub fn default_tokens(&self) -> &[Address] {
        &self.default_tokens
    }
}

#[derive(Debug, Clone)]
pub struct TokenAdjacencyGraphBuilder {
    graph: HashMap<Address, Vec<Address>>,
    default_tokens: Vec<Address>,
}

impl TokenAdjacencyGraphBuilder {
    /// Appends `to` under `from`. A new entry starts from the default list.
    pub fn add(mut self, from: Address, to: Address) -> SamplerResult<Self> {
        if from == to {
            return Err(SamplerError::SelfLoop(from));
        }
        let defaults = &self.default_tokens;
        let entry = self.graph.entry(from).or_insert_with(|| defaults.clone());
        if !entry.contains(&to) {
            entry.push(to);
        }
        Ok(self)
    }

    pub fn add_bidirectional(self, a: Address, b: Address) -> SamplerResult<Self> {
        self.add(a, b)?.add(b, a)
    }

    /// Connects every pair of `tokens` in both directions.
    pub fn add_complete_subgraph(mut self, tokens: &[Address]) -> SamplerResult<Self> {
        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                self = self.add_bidirectional(*a, *b)?;
            }
        }
        Ok(self)
    }

    pub fn build(self) -> TokenAdjacencyGraph {
        TokenAdjacencyGraph {
            graph: self.graph,
            default_tokens: self.default_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::conversions::string_to_address;

    fn token(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn unknown_token_falls_back_to_defaults() {
        let graph = TokenAdjacencyGraph::builder(vec![token(1), token(2)]).build();
        assert_eq!(graph.get_adjacent_tokens(&token(9)), &[token(1), token(2)]);
    }

    #[test]
    fn add_appends_after_defaults_without_duplicates() {
        let graph = TokenAdjacencyGraph::builder(vec![token(1)])
            .add(token(0xa), token(0xb))
            .unwrap()
            .add(token(0xa), token(0xb))
            .unwrap()
            .build();
        assert_eq!(graph.get_adjacent_tokens(&token(0xa)), &[token(1), token(0xb)]);
    }

    #[test]
    fn self_loop_is_rejected() {
        let err = TokenAdjacencyGraph::builder(vec![])
            .add(token(3), token(3))
            .unwrap_err();
        assert!(matches!(err, SamplerError::SelfLoop(t) if t == token(3)));
    }

    #[test]
    fn complete_subgraph_links_every_pair() {
        let graph = TokenAdjacencyGraph::builder(vec![])
            .add_complete_subgraph(&[token(1), token(2), token(3)])
            .unwrap()
            .build();
        assert_eq!(graph.get_adjacent_tokens(&token(1)), &[token(2), token(3)]);
        assert_eq!(graph.get_adjacent_tokens(&token(2)), &[token(1), token(3)]);
        assert_eq!(graph.get_adjacent_tokens(&token(3)), &[token(1), token(2)]);
    }

    #[test]
    fn intermediate_tokens_exclude_the_pair_itself() {
        let graph = TokenAdjacencyGraph::builder(vec![token(1), token(2)])
            .add_bidirectional(token(0xa), token(0xb))
            .unwrap()
            .add(token(0xb), token(3))
            .unwrap()
            .build();
        // a: [1, 2, b]; b: [1, 2, a, 3]
        assert_eq!(
            graph.get_intermediate_tokens(&token(0xa), &token(0xb)),
            vec![token(1), token(2), token(3)]
        );
    }

    #[test]
    fn intermediate_tokens_ignore_address_case() {
        let upper = string_to_address("0xC02AAA39B223FE8D0A0E5C4F27EAD9083C756CC2").unwrap();
        let lower = string_to_address("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap();
        let graph = TokenAdjacencyGraph::builder(vec![lower, token(1)]).build();
        assert_eq!(graph.get_intermediate_tokens(&upper, &token(7)), vec![token(1)]);
    }

    #[test]
    fn empty_graph_has_no_hops() {
        let graph = TokenAdjacencyGraph::empty();
        assert!(graph.get_intermediate_tokens(&token(1), &token(2)).is_empty());
    }
}
