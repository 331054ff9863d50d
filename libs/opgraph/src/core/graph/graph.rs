// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use petgraph::graph::{DiGraph, NodeIndex};
use std::sync::Arc;

use super::handle::OutputHandle;
use super::node::{GraphNode, InputRef, NodeId, NodeSpec, Producer};
use crate::core::contract::ColumnDescriptor;
use crate::core::error::{GraphError, Result};
use crate::core::types::ColumnType;

/// Name of the node that introduces external columns.
pub const SOURCE_OP: &str = "Source";

/// Boundary and reshaping operators without a registered contract.
pub const STRUCTURAL_OPS: [&str; 4] = [SOURCE_OP, "Sample", "Partition", "Unpartition"];

pub fn is_structural(name: &str) -> bool {
    STRUCTURAL_OPS.contains(&name)
}

/// Operator graph under construction. Nodes can only consume columns of
/// nodes added before them, so construction order is always topological.
#[derive(Debug, Clone)]
pub struct Graph {
    id: Arc<str>,
    nodes: Vec<GraphNode>,
    outputs: Vec<OutputHandle>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            id: Arc::from(cuid2::create_id()),
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handle to a column supplied from outside the graph.
    pub fn external(&self, column: impl Into<String>, column_type: ColumnType) -> OutputHandle {
        OutputHandle::new(self.id.clone(), Producer::External, column, column_type)
    }

    /// Add a [`SOURCE_OP`] node over an external column.
    pub fn source(&mut self, column: impl Into<String>, column_type: ColumnType) -> Result<OutputHandle> {
        let input = self.external(column, column_type);
        let mut outputs = self.add_node(NodeSpec::new(SOURCE_OP).input(input), &[])?;
        outputs.pop().ok_or_else(|| {
            GraphError::ContractViolation(format!("{} produced no output", SOURCE_OP))
        })
    }

    /// Add a node and return its output handles in declared order.
    ///
    /// Structural operators pass each input through as one output; every
    /// other operator gets exactly `declared_outputs`.
    pub fn add_node(
        &mut self,
        spec: NodeSpec,
        declared_outputs: &[ColumnDescriptor],
    ) -> Result<Vec<OutputHandle>> {
        for handle in &spec.inputs {
            self.check_handle(handle, &spec.name)?;
        }

        let outputs: Vec<ColumnDescriptor> = if is_structural(&spec.name) {
            spec.inputs
                .iter()
                .map(|h| ColumnDescriptor::new(h.column(), h.column_type()))
                .collect()
        } else {
            declared_outputs.to_vec()
        };

        let id = NodeId::new(self.nodes.len());
        let inputs = spec
            .inputs
            .iter()
            .map(|h| InputRef {
                producer: h.producer(),
                column: h.column().to_string(),
            })
            .collect();

        tracing::debug!(
            "Added node {} '{}' ({} inputs, {} outputs)",
            id,
            spec.name,
            spec.inputs.len(),
            outputs.len()
        );

        let handles = outputs
            .iter()
            .map(|c| OutputHandle::new(self.id.clone(), Producer::Node(id), &c.name, c.column_type))
            .collect();

        self.nodes.push(GraphNode {
            id,
            name: spec.name,
            device: spec.device,
            batch: spec.batch,
            state_window: spec.state_window,
            stencil: spec.stencil,
            inputs,
            outputs,
            args: spec.args,
            codec: spec.codec,
            extra: spec.extra,
        });

        Ok(handles)
    }

    /// Mark a column as a graph output, keeping its encode options.
    pub fn output(&mut self, handle: OutputHandle) -> Result<()> {
        self.check_handle(&handle, "graph output")?;
        self.outputs.push(handle);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[OutputHandle] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn construction_order(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// A topological order computed from the edges.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        use petgraph::algo::toposort;

        let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(self.nodes.len(), 0);
        let indices: Vec<NodeIndex> = self.nodes.iter().map(|n| graph.add_node(n.id)).collect();

        for node in &self.nodes {
            for input in &node.inputs {
                if let Producer::Node(producer) = input.producer {
                    graph.add_edge(indices[producer.index()], indices[node.id.index()], ());
                }
            }
        }

        let sorted = toposort(&graph, None)
            .map_err(|_| GraphError::ContractViolation("Graph contains cycles".into()))?;

        Ok(sorted.into_iter().map(|idx| graph[idx]).collect())
    }

    fn check_handle(&self, handle: &OutputHandle, consumer: &str) -> Result<()> {
        if handle.graph_id() != &*self.id {
            return Err(GraphError::ContractViolation(format!(
                "{}: column '{}' belongs to a different graph",
                consumer,
                handle.column()
            )));
        }

        if let Producer::Node(id) = handle.producer() {
            let node = self.node(id).ok_or_else(|| {
                GraphError::ContractViolation(format!(
                    "{}: column '{}' refers to missing {}",
                    consumer,
                    handle.column(),
                    id
                ))
            })?;

            if !node.outputs.iter().any(|c| c.name == handle.column()) {
                return Err(GraphError::ContractViolation(format!(
                    "{}: {} '{}' has no output column '{}'",
                    consumer,
                    id,
                    node.name,
                    handle.column()
                )));
            }
        }

        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
