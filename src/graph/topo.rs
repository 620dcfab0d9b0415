use std::collections::{HashMap, HashSet, VecDeque};

/// Order `nodes` so every upstream node precedes its consumers.
///
/// `edges` are `(upstream, consumer)` pairs. Ties keep the order of `nodes`,
/// so the result is deterministic. On a cycle, the nodes that could not be
/// ordered are returned as the error.
pub fn topological_order<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Vec<String>, Vec<String>> {
    let nodes: Vec<&str> = nodes.into_iter().collect();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adj_list: HashMap<&str, Vec<&str>> = HashMap::new();

    // Initialize in-degree count and adjacency list
    for &node in &nodes {
        in_degree.insert(node, 0);
        adj_list.insert(node, Vec::new());
    }

    for (upstream, consumer) in edges {
        if let (Some(neighbors), Some(degree)) =
            (adj_list.get_mut(upstream), in_degree.get_mut(consumer))
        {
            neighbors.push(consumer);
            *degree += 1;
        }
    }

    // Kahn's algorithm
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .copied()
        .filter(|node| in_degree.get(node) == Some(&0))
        .collect();
    let mut result = Vec::with_capacity(nodes.len());

    while let Some(node) = queue.pop_front() {
        result.push(node.to_string());

        if let Some(neighbors) = adj_list.get(node) {
            for &neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    if result.len() == nodes.len() {
        Ok(result)
    } else {
        let ordered: HashSet<&str> = result.iter().map(String::as_str).collect();
        Err(nodes
            .into_iter()
            .filter(|node| !ordered.contains(node))
            .map(str::to_string)
            .collect())
    }
}

/// Whether `to` can be reached from `from` following `(from, to)` edges
pub fn reaches<'a>(
    from: &'a str,
    to: &str,
    edges: impl IntoIterator<Item = (&'a str, &'a str)> + Clone,
) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(
            edges
                .clone()
                .into_iter()
                .filter(|(source, _)| *source == current)
                .map(|(_, target)| target),
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_follows_edges() {
        let order = topological_order(
            ["project", "select", "stream"],
            [("stream", "select"), ("select", "project")],
        )
        .unwrap();
        assert_eq!(order, vec!["stream", "select", "project"]);
    }

    #[test]
    fn test_ties_keep_node_order() {
        let order = topological_order(["b", "a", "c"], [("a", "c")]).unwrap();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_reports_remaining_nodes() {
        let err = topological_order(
            ["s", "x", "y"],
            [("s", "x"), ("x", "y"), ("y", "x")],
        )
        .unwrap_err();
        assert_eq!(err, vec!["x", "y"]);
    }

    #[test]
    fn test_reaches() {
        let edges = [("a", "b"), ("b", "c")];
        assert!(reaches("a", "c", edges));
        assert!(!reaches("c", "a", edges));
        assert!(reaches("a", "a", edges));
    }
}
