use super::*;

fn name(s: &str) -> ModelName {
    ModelName::new(s)
}

fn dag_from(edges: &[(&str, &str)], nodes: &[&str]) -> ModelDag {
    let mut dag = ModelDag::new();
    for n in nodes {
        dag.add_node(&name(n));
    }
    for (dep, dependent) in edges {
        dag.add_edge(&name(dep), &name(dependent));
    }
    dag
}

#[test]
fn test_topological_order_simple_chain() {
    let dag = dag_from(&[("a", "b"), ("b", "c")], &[]);
    let order = dag.topological_order().unwrap();
    assert_eq!(order, vec![name("a"), name("b"), name("c")]);
}

#[test]
fn test_topological_order_dependencies_first() {
    let dag = dag_from(&[("staging.orders", "marts.revenue"), ("staging.users", "marts.revenue")], &[]);
    let order = dag.topological_order().unwrap();
    let pos = |n: &str| order.iter().position(|m| m == n).unwrap();
    assert!(pos("staging.orders") < pos("marts.revenue"));
    assert!(pos("staging.users") < pos("marts.revenue"));
}

#[test]
fn test_topological_order_lexicographic_ties() {
    // all independent: order must be fully lexicographic
    let dag = dag_from(&[], &["c.z", "a.m", "b.k"]);
    let order = dag.topological_order().unwrap();
    assert_eq!(order, vec![name("a.m"), name("b.k"), name("c.z")]);
}

#[test]
fn test_topological_order_is_deterministic() {
    let dag = dag_from(
        &[("base", "mid_a"), ("base", "mid_b"), ("mid_a", "top"), ("mid_b", "top")],
        &[],
    );
    let first = dag.topological_order().unwrap();
    for _ in 0..5 {
        assert_eq!(dag.topological_order().unwrap(), first);
    }
    assert_eq!(first, vec![name("base"), name("mid_a"), name("mid_b"), name("top")]);
}

#[test]
fn test_cycle_detected_with_path() {
    let dag = dag_from(&[("a", "b"), ("b", "c"), ("c", "a")], &[]);
    let err = dag.topological_order().unwrap_err();
    match err {
        CoreError::CircularDependency { cycle } => {
            assert_eq!(cycle, "a -> b -> c -> a");
        }
        other => panic!("expected CircularDependency, got {:?}", other),
    }
    assert!(dag.validate().is_err());
}

#[test]
fn test_self_cycle() {
    let dag = dag_from(&[("a", "a")], &[]);
    let err = dag.validate().unwrap_err();
    match err {
        CoreError::CircularDependency { cycle } => assert_eq!(cycle, "a -> a"),
        other => panic!("expected CircularDependency, got {:?}", other),
    }
}

#[test]
fn test_dependencies_and_dependents() {
    let dag = dag_from(&[("a", "b"), ("a", "c"), ("b", "c")], &[]);
    assert_eq!(dag.dependencies("c"), vec![name("a"), name("b")]);
    assert_eq!(dag.dependents("a"), vec![name("b"), name("c")]);
    assert!(dag.dependencies("a").is_empty());
}

#[test]
fn test_ancestors_descendants() {
    let dag = dag_from(&[("a", "b"), ("b", "c"), ("x", "c")], &[]);
    assert_eq!(dag.ancestors("c"), vec![name("a"), name("b"), name("x")]);
    assert_eq!(dag.descendants("a"), vec![name("b"), name("c")]);
    assert!(dag.descendants("c").is_empty());
}

#[test]
fn test_duplicate_edges_ignored() {
    let mut dag = ModelDag::new();
    dag.add_edge(&name("a"), &name("b"));
    dag.add_edge(&name("a"), &name("b"));
    assert_eq!(dag.dependencies("b"), vec![name("a")]);
}

#[test]
fn test_contains_and_names() {
    let dag = dag_from(&[("a", "b")], &[]);
    assert!(dag.contains("a"));
    assert!(!dag.contains("z"));
    assert_eq!(dag.names(), vec![name("a"), name("b")]);
}
