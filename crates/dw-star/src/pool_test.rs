use super::*;
use crate::context::ContextSpec;

#[test]
fn test_pool_get_put() {
    let pool = ThreadPool::new(5);

    let thread = pool.get("test1");
    assert_eq!(thread.name(), "test1");

    pool.put(thread);
    assert_eq!(pool.size(), 1);

    let thread2 = pool.get("test2");
    assert_eq!(pool.size(), 0);
    assert_eq!(thread2.name(), "test2");
    pool.put(thread2);
}

#[test]
fn test_pool_max_size_discards_overflow() {
    let pool = ThreadPool::new(2);

    let threads: Vec<EvalThread> = (0..3).map(|_| pool.get("test")).collect();
    for thread in threads {
        pool.put(thread);
    }
    assert_eq!(pool.size(), 2);
}

#[test]
fn test_pool_zero_uses_default() {
    let pool = ThreadPool::new(0);
    for _ in 0..5 {
        let t = pool.get("test");
        pool.put(t);
    }
    assert!(pool.size() > 0);
}

#[test]
fn test_pool_concurrent_checkouts() {
    let pool = Arc::new(ThreadPool::new(10));
    let mut handles = Vec::new();
    for _ in 0..100 {
        let pool = Arc::clone(&pool);
        handles.push(std::thread::spawn(move || {
            let t = pool.get("concurrent");
            pool.put(t);
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert!(pool.size() <= 10);
}

#[test]
fn test_executor_in_order_results() {
    let mut spec = ContextSpec::bare("dev");
    spec.config = ScriptValue::Dict(vec![("x".into(), ScriptValue::Int(10))]);
    let executor = ParallelExecutor::new(5, Arc::new(spec));

    let tasks = vec![
        EvalTask { name: "task1".into(), expr: "config[\"x\"] + 1".into() },
        EvalTask { name: "task2".into(), expr: "config[\"x\"] + 2".into() },
        EvalTask { name: "task3".into(), expr: "config[\"x\"] * 3".into() },
    ];

    let results = executor.execute(tasks);
    assert_eq!(results.len(), 3);

    let expected = [11, 12, 30];
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.name, format!("task{}", i + 1));
        let value = result.value.as_ref().unwrap();
        assert_eq!(value.as_int(), Some(expected[i]), "task {i}");
    }
}

#[test]
fn test_executor_mixed_errors() {
    let executor = ParallelExecutor::new(2, Arc::new(ContextSpec::bare("dev")));

    let tasks = vec![
        EvalTask { name: "valid".into(), expr: "1 + 1".into() },
        EvalTask { name: "invalid".into(), expr: "undefined_var".into() },
    ];

    let results = executor.execute(tasks);
    assert_eq!(results.len(), 2);
    assert!(results[0].value.is_ok());
    assert!(results[1].value.is_err());
}

#[test]
fn test_executor_empty_batch() {
    let executor = ParallelExecutor::new(4, Arc::new(ContextSpec::bare("dev")));
    assert!(executor.execute(Vec::new()).is_empty());
}

#[test]
fn test_executor_more_tasks_than_workers() {
    let executor = ParallelExecutor::new(2, Arc::new(ContextSpec::bare("dev")));
    let tasks: Vec<EvalTask> = (0..20)
        .map(|i| EvalTask { name: format!("t{i}"), expr: format!("{i} * 2") })
        .collect();
    let results = executor.execute(tasks);
    assert_eq!(results.len(), 20);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(
            result.value.as_ref().unwrap().as_int(),
            Some((i * 2) as i64)
        );
    }
}
