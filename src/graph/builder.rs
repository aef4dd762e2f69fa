//! Graph construction from a module hierarchy.
//!
//! The builder is the only place layer identifiers are minted. Layers added
//! inside a scope are numbered by position, mirroring how sequential
//! containers name their children, so the same hierarchy always yields the
//! same ids.

use super::model::Graph;
use super::node::{Layer, LayerId};
use crate::Result;

#[derive(Debug)]
struct Scope {
    name: String,
    next_index: usize,
}

/// Builder for [`Graph`].
///
/// # Example
///
/// ```
/// use podar::graph::{GraphBuilder, Layer, Linear};
/// use ndarray::{ArrayD, IxDyn};
///
/// let fc = Linear::new(ArrayD::zeros(IxDyn(&[2, 4])), None).unwrap();
/// let graph = GraphBuilder::new("mlp", &[4])
///     .scope("classifier")
///     .layer(Layer::Linear(fc))
///     .layer(Layer::Relu)
///     .end_scope()
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.nodes()[0].id().as_str(), "classifier.0");
/// assert_eq!(graph.nodes()[1].id().as_str(), "classifier.1");
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    input_shape: Vec<usize>,
    scopes: Vec<Scope>,
    root_index: usize,
    nodes: Vec<(LayerId, Layer)>,
}

impl GraphBuilder {
    /// Start a graph with a per-sample input shape.
    pub fn new(name: impl Into<String>, input_shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            input_shape: input_shape.to_vec(),
            scopes: Vec::new(),
            root_index: 0,
            nodes: Vec::new(),
        }
    }

    /// Enter a named submodule.
    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.push(Scope { name: name.into(), next_index: 0 });
        self
    }

    /// Leave the current submodule. No-op at the root.
    pub fn end_scope(mut self) -> Self {
        self.scopes.pop();
        self
    }

    /// Add a layer named by its position in the current scope.
    pub fn layer(mut self, layer: Layer) -> Self {
        let index = match self.scopes.last_mut() {
            Some(scope) => {
                let i = scope.next_index;
                scope.next_index += 1;
                i
            }
            None => {
                let i = self.root_index;
                self.root_index += 1;
                i
            }
        };
        let id = self.mint(&index.to_string());
        self.nodes.push((id, layer));
        self
    }

    /// Add a layer with an explicit child name in the current scope.
    pub fn named(mut self, name: &str, layer: Layer) -> Self {
        let id = self.mint(name);
        self.nodes.push((id, layer));
        self
    }

    fn mint(&self, leaf: &str) -> LayerId {
        let mut path: Vec<&str> = self.scopes.iter().map(|s| s.name.as_str()).collect();
        path.push(leaf);
        LayerId::from_path(&path)
    }

    /// Finish the graph. Fails on duplicate identifiers.
    pub fn build(self) -> Result<Graph> {
        Graph::from_parts(self.name, self.input_shape, self.nodes)
    }
}
