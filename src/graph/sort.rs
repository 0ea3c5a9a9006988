use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};

use crate::{
    FlowbaseError, Result,
    model::{ConnectionModel, NodeModel, WorkflowModel},
};

/// A workflow's nodes and connections as a directed graph.
///
/// Node indices follow the insertion order of the workflow's node list, which
/// makes [`WorkflowGraph::sorted_nodes`] fully deterministic: among nodes whose
/// dependencies are all satisfied, the one listed first in the workflow runs
/// first.
pub struct WorkflowGraph {
    graph: DiGraph<NodeModel, ConnectionModel>,
    connection_count: usize,
}

impl TryFrom<&WorkflowModel> for WorkflowGraph {
    type Error = FlowbaseError;

    fn try_from(model: &WorkflowModel) -> Result<Self> {
        let mut graph = DiGraph::<NodeModel, ConnectionModel>::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();

        for node in &model.nodes {
            if indices.contains_key(&node.id) {
                return Err(FlowbaseError::Graph(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
            let index = graph.add_node(node.clone());
            indices.insert(node.id.clone(), index);
        }

        for connection in &model.connections {
            let from = indices.get(&connection.from_node_id).ok_or_else(|| {
                FlowbaseError::Graph(format!(
                    "connection {} references unknown node: {}",
                    connection.id, connection.from_node_id
                ))
            })?;
            let to = indices.get(&connection.to_node_id).ok_or_else(|| {
                FlowbaseError::Graph(format!(
                    "connection {} references unknown node: {}",
                    connection.id, connection.to_node_id
                ))
            })?;
            graph.add_edge(*from, *to, connection.clone());
        }

        Ok(Self {
            graph,
            connection_count: model.connections.len(),
        })
    }
}

impl WorkflowGraph {
    /// Flatten the graph into the execution order.
    ///
    /// Kahn's algorithm with a min-heap over node indices, so ties between
    /// ready nodes always break toward the node listed earlier in the
    /// workflow. A workflow with no connections runs in its stored node
    /// order. Disconnected nodes are included exactly once.
    pub fn sorted_nodes(&self) -> Result<Vec<NodeModel>> {
        if self.connection_count == 0 {
            return Ok(self.graph.node_weights().cloned().collect());
        }

        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        let mut ready = BinaryHeap::new();
        for index in self.graph.node_indices() {
            let degree = self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .count();
            in_degree.insert(index, degree);
            if degree == 0 {
                ready.push(Reverse(index));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(index)) = ready.pop() {
            order.push(self.graph[index].clone());
            for next in self.graph.neighbors_directed(index, Direction::Outgoing) {
                let degree = in_degree
                    .get_mut(&next)
                    .ok_or_else(|| FlowbaseError::Graph("inconsistent graph state".to_string()))?;
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let remaining: Vec<&str> = self
                .graph
                .node_indices()
                .filter(|i| in_degree.get(i).is_some_and(|d| *d > 0))
                .map(|i| self.graph[i].id.as_str())
                .collect();
            return Err(FlowbaseError::CyclicGraph(remaining.join(", ")));
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;

    fn node(id: &str) -> NodeModel {
        NodeModel {
            id: id.to_string(),
            name: id.to_string(),
            node_type: NodeType::HttpRequest,
            data: serde_json::json!({}),
            retry: None,
        }
    }

    fn conn(
        from: &str,
        to: &str,
    ) -> ConnectionModel {
        ConnectionModel {
            id: format!("{}-{}", from, to),
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
        }
    }

    fn workflow(
        nodes: Vec<NodeModel>,
        connections: Vec<ConnectionModel>,
    ) -> WorkflowModel {
        WorkflowModel {
            id: "w1".to_string(),
            name: "w1".to_string(),
            user_id: "u1".to_string(),
            nodes,
            connections,
        }
    }

    fn sorted_ids(model: &WorkflowModel) -> Vec<String> {
        let graph = WorkflowGraph::try_from(model).unwrap();
        graph
            .sorted_nodes()
            .unwrap()
            .iter()
            .map(|n| n.id.clone())
            .collect()
    }

    #[test]
    fn test_sort_linear_chain() {
        let model = workflow(
            vec![node("a"), node("b"), node("c")],
            vec![conn("a", "b"), conn("b", "c")],
        );
        assert_eq!(sorted_ids(&model), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_linear_chain_reversed_node_list() {
        let model = workflow(
            vec![node("c"), node("b"), node("a")],
            vec![conn("a", "b"), conn("b", "c")],
        );
        assert_eq!(sorted_ids(&model), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_diamond_breaks_ties_by_node_order() {
        let model = workflow(
            vec![node("a"), node("b"), node("c"), node("d")],
            vec![
                conn("a", "b"),
                conn("a", "c"),
                conn("b", "d"),
                conn("c", "d"),
            ],
        );
        assert_eq!(sorted_ids(&model), vec!["a", "b", "c", "d"]);

        // same edges, branches listed the other way round
        let model = workflow(
            vec![node("a"), node("c"), node("b"), node("d")],
            vec![
                conn("a", "b"),
                conn("a", "c"),
                conn("b", "d"),
                conn("c", "d"),
            ],
        );
        assert_eq!(sorted_ids(&model), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_sort_no_connections_keeps_stored_order() {
        let model = workflow(vec![node("z"), node("m"), node("a")], vec![]);
        assert_eq!(sorted_ids(&model), vec!["z", "m", "a"]);
    }

    #[test]
    fn test_sort_disconnected_node_included_once() {
        let model = workflow(
            vec![node("a"), node("lone"), node("b")],
            vec![conn("a", "b")],
        );
        let ids = sorted_ids(&model);
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.iter().filter(|id| *id == "lone").count(), 1);
        let pos = |id: &str| ids.iter().position(|x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
    }

    #[test]
    fn test_sort_parallel_edges_between_same_nodes() {
        let mut model = workflow(
            vec![node("a"), node("b")],
            vec![conn("a", "b"), conn("a", "b")],
        );
        model.connections[1].id = "a-b-2".to_string();
        assert_eq!(sorted_ids(&model), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let model = workflow(vec![node("a"), node("a")], vec![]);
        let err = WorkflowGraph::try_from(&model).err().unwrap();
        assert!(matches!(err, FlowbaseError::Graph(_)));
    }

    #[test]
    fn test_dangling_connection_rejected() {
        let model = workflow(vec![node("a")], vec![conn("a", "ghost")]);
        let err = WorkflowGraph::try_from(&model).err().unwrap();
        assert!(matches!(err, FlowbaseError::Graph(_)));
    }

    #[test]
    fn test_cycle_detected() {
        let model = workflow(
            vec![node("a"), node("b"), node("c")],
            vec![conn("a", "b"), conn("b", "c"), conn("c", "a")],
        );
        let graph = WorkflowGraph::try_from(&model).unwrap();
        let err = graph.sorted_nodes().err().unwrap();
        assert!(matches!(err, FlowbaseError::CyclicGraph(_)));
    }

    #[test]
    fn test_self_loop_detected() {
        let model = workflow(vec![node("a"), node("b")], vec![conn("b", "b")]);
        let graph = WorkflowGraph::try_from(&model).unwrap();
        let err = graph.sorted_nodes().err().unwrap();
        assert!(matches!(err, FlowbaseError::CyclicGraph(_)));
        assert!(err.to_string().contains("b"));
    }

    #[test]
    fn test_sort_is_stable_across_repeats() {
        let model = workflow(
            vec![node("t"), node("x"), node("y"), node("z")],
            vec![conn("t", "x"), conn("t", "y"), conn("t", "z")],
        );
        let first = sorted_ids(&model);
        for _ in 0..10 {
            assert_eq!(sorted_ids(&model), first);
        }
        assert_eq!(first, vec!["t", "x", "y", "z"]);
    }
}
