//! Property-based tests: random graphs with sharing and cycles.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use graph_data::{DataIn, Encoder, List, PrimitiveValue, Section, TypeRegistry, Value};
use proptest::prelude::*;

/// Outgoing edges of each node, and the nodes written at the root.
fn arb_graph() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    (1..8usize).prop_flat_map(|n| {
        (
            proptest::collection::vec(proptest::collection::vec(0..n, 0..4), n),
            proptest::collection::vec(0..n, 1..4),
        )
    })
}

fn build(edges: &[Vec<usize>]) -> Vec<Rc<List>> {
    let nodes: Vec<Rc<List>> = edges.iter().map(|_| Rc::new(List::new())).collect();
    for (node, targets) in nodes.iter().zip(edges) {
        for &target in targets {
            node.push(Value::from(Rc::clone(&nodes[target])));
        }
    }
    nodes
}

fn reachable(edges: &[Vec<usize>], roots: &[usize]) -> HashSet<usize> {
    let mut seen: HashSet<usize> = roots.iter().copied().collect();
    let mut queue: VecDeque<usize> = seen.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        for &target in &edges[node] {
            if seen.insert(target) {
                queue.push_back(target);
            }
        }
    }
    seen
}

fn count_objects(section: &Section) -> usize {
    let own = usize::from(section.contains("__classname"));
    own + section
        .iter()
        .map(|(_, value)| match value {
            PrimitiveValue::Section(nested) => count_objects(nested),
            _ => 0,
        })
        .sum::<usize>()
}

proptest! {
    #[test]
    fn shared_graphs_store_each_object_once((edges, roots) in arb_graph()) {
        let registry = TypeRegistry::with_builtins();
        let nodes = build(&edges);
        let mut encoder = Encoder::new(&registry);
        for (slot, &root) in roots.iter().enumerate() {
            encoder.write(format!("root{slot}"), Value::from(Rc::clone(&nodes[root]))).unwrap();
        }
        let tree = encoder.into_tree();
        prop_assert_eq!(count_objects(&tree), reachable(&edges, &roots).len());

        for node in &nodes {
            node.clear();
        }
    }

    #[test]
    fn shared_graphs_keep_identity((edges, roots) in arb_graph()) {
        let registry = TypeRegistry::with_builtins();
        let nodes = build(&edges);
        let mut encoder = Encoder::new(&registry);
        for (slot, &root) in roots.iter().enumerate() {
            encoder.write(format!("root{slot}"), Value::from(Rc::clone(&nodes[root]))).unwrap();
        }
        let data = DataIn::new(&registry, encoder.into_tree());

        let mut decoded: HashMap<usize, Rc<List>> = HashMap::new();
        let mut queue = VecDeque::new();
        for (slot, &root) in roots.iter().enumerate() {
            let list = data.read::<Rc<List>>(&format!("root{slot}")).unwrap().unwrap();
            match decoded.get(&root) {
                Some(known) => {
                    prop_assert!(Rc::ptr_eq(known, &list));
                }
                None => {
                    decoded.insert(root, list);
                    queue.push_back(root);
                }
            }
        }
        while let Some(node) = queue.pop_front() {
            let list = Rc::clone(&decoded[&node]);
            prop_assert_eq!(list.len(), edges[node].len());
            for (index, &target) in edges[node].iter().enumerate() {
                let child = list.get(index).and_then(|v| v.downcast::<List>()).unwrap();
                match decoded.get(&target) {
                    Some(known) => {
                        prop_assert!(Rc::ptr_eq(known, &child));
                    }
                    None => {
                        decoded.insert(target, child);
                        queue.push_back(target);
                    }
                }
            }
        }

        let distinct: HashSet<*const List> = decoded.values().map(Rc::as_ptr).collect();
        prop_assert_eq!(distinct.len(), decoded.len());

        for list in nodes.iter().chain(decoded.values()) {
            list.clear();
        }
    }
}
