//! Many threads sharing one store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tempfile::TempDir;
use tourney::model::{PromptDraft, ResultsTable, SuiteScope};
use tourney::{DataStore, MemoryStore, SqliteStore};

const SUITES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

#[test]
fn test_select_suite_never_tears() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("tourney.db")).unwrap());
    for name in SUITES {
        store.create_suite(name).unwrap();
    }

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    store.select_suite(SUITES[(t + i) % SUITES.len()]).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..100 {
                let current = store
                    .list_suites()
                    .unwrap()
                    .iter()
                    .filter(|s| s.is_current)
                    .count();
                assert_eq!(current, 1);
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();
    assert!(SUITES.contains(&store.current_suite().unwrap().name.as_str()));
}

#[test]
fn test_concurrent_appends_keep_distinct_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tourney.db");
    // A second connection to the same file exercises SQLite's own locking.
    let first = Arc::new(SqliteStore::open(&path).unwrap());
    let second = Arc::new(SqliteStore::open(&path).unwrap());

    let handles: Vec<_> = [first.clone(), second]
        .into_iter()
        .enumerate()
        .map(|(t, store)| {
            thread::spawn(move || {
                for i in 0..20 {
                    store
                        .add_prompt(SuiteScope::Current, &PromptDraft::new(format!("{t}-{i}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let prompts = first.read_prompts(SuiteScope::Current).unwrap();
    assert_eq!(prompts.len(), 40);
    let mut orders: Vec<i64> = prompts.iter().map(|p| p.display_order).collect();
    orders.dedup();
    assert_eq!(orders.len(), 40);
}

/// Suite "a" has three prompts scored by model-a, suite "b" one prompt
/// scored by model-b. Returns each suite's expected results table.
fn seed_two_suites(store: &dyn DataStore) -> (ResultsTable, ResultsTable) {
    let mut tables = Vec::new();
    for (suite, prompts, model, score) in [("a", 3, "model-a", 100), ("b", 1, "model-b", 50)] {
        store.create_suite(suite).unwrap();
        let scope = SuiteScope::Named(suite);
        for i in 0..prompts {
            store
                .add_prompt(scope, &PromptDraft::new(format!("{suite}{i}")))
                .unwrap();
        }
        let table: ResultsTable = [(model.to_string(), vec![score; prompts])].into_iter().collect();
        store.write_results(scope, &table).unwrap();
        tables.push(table);
    }
    let b = tables.pop().unwrap();
    let a = tables.pop().unwrap();
    (a, b)
}

/// Flip the current suite between "a" and "b" until `done` is set.
fn spawn_flipper<S: DataStore + 'static>(store: Arc<S>, done: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut i = 0;
        while !done.load(Ordering::Relaxed) {
            store.select_suite(if i % 2 == 0 { "a" } else { "b" }).unwrap();
            i += 1;
        }
    })
}

fn results_come_from_one_suite<S: DataStore + 'static>(store: S) {
    let store = Arc::new(store);
    let (table_a, table_b) = seed_two_suites(store.as_ref());
    let done = Arc::new(AtomicBool::new(false));
    let flipper = spawn_flipper(Arc::clone(&store), Arc::clone(&done));

    for _ in 0..2000 {
        let results = store.read_results(SuiteScope::Current).unwrap();
        assert!(
            results == table_a || results == table_b,
            "results mixed two suites: {results:?}"
        );
    }
    done.store(true, Ordering::Relaxed);
    flipper.join().unwrap();
}

fn moves_stay_in_one_suite<S: DataStore + 'static>(store: S) {
    let store = Arc::new(store);
    seed_two_suites(store.as_ref());
    let done = Arc::new(AtomicBool::new(false));
    let flipper = spawn_flipper(Arc::clone(&store), Arc::clone(&done));

    // Moving the first prompt to the end is valid in both suites.
    for _ in 0..1000 {
        store.move_prompt(SuiteScope::Current, 0, 1).unwrap();
    }
    done.store(true, Ordering::Relaxed);
    flipper.join().unwrap();

    let mut a: Vec<String> = store
        .read_prompts(SuiteScope::Named("a"))
        .unwrap()
        .into_iter()
        .map(|p| p.text)
        .collect();
    a.sort();
    assert_eq!(a, vec!["a0", "a1", "a2"]);
    assert_eq!(store.read_prompts(SuiteScope::Named("b")).unwrap().len(), 1);
}

#[test]
fn test_read_results_during_suite_switches() {
    let dir = TempDir::new().unwrap();
    results_come_from_one_suite(SqliteStore::open(&dir.path().join("tourney.db")).unwrap());
    results_come_from_one_suite(MemoryStore::new());
}

#[test]
fn test_move_prompt_during_suite_switches() {
    let dir = TempDir::new().unwrap();
    moves_stay_in_one_suite(SqliteStore::open(&dir.path().join("tourney.db")).unwrap());
    moves_stay_in_one_suite(MemoryStore::new());
}
