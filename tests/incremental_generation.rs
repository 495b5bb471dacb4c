mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use gencache::cache::{ChangeCache, FileCache, MemoryCache};
use gencache::engine::{EngineOptions, GenerationEngine, cache_key};
use gencache::errors::GencacheError;
use gencache::exec::Task;
use gencache::hash::{ContentHasher, FileHasher};
use gencache_test_utils::builders::{SourceTreeBuilder, loaded_file_cache, real_engine};
use gencache_test_utils::fakes::FakeExecFinder;

fn fake_exec_engine(finder: Arc<FakeExecFinder>, cache: Arc<dyn ChangeCache>) -> GenerationEngine {
    GenerationEngine::new(EngineOptions {
        hasher: Arc::new(ContentHasher::new()),
        cache,
        finder,
        workers: 4,
    })
}

/// Three files: two `mockgen` directives, one `protoc`. Only the two
/// `mockgen` files are tasks; both run cold and both skip warm.
#[tokio::test]
async fn mockgen_scenario_runs_cold_and_skips_warm() {
    init_tracing();

    let tree = SourceTreeBuilder::new()
        .directive("simple/simple.go", "mockgen -source=simple.go -destination=mock_simple.go")
        .directive("nested/pkg1/service.go", "mockgen -source=service.go -destination=mock_service.go")
        .directive("nested/pkg2/proto.go", "protoc --go_out=. repo.proto")
        .build();

    let finder = Arc::new(FakeExecFinder::new("mockgen"));
    let cache: Arc<dyn ChangeCache> = Arc::new(MemoryCache::new());
    let engine = fake_exec_engine(Arc::clone(&finder), Arc::clone(&cache));
    let cancel = CancellationToken::new();

    let cold = with_timeout(engine.generate(&cancel, tree.root())).await.unwrap();
    assert_eq!(cold.considered, 2);
    assert_eq!(cold.executed, 2);
    assert_eq!(cold.skipped, 0);
    assert!(cold.is_success());

    let cold_tasks = finder.take_created();
    assert!(cold_tasks.iter().all(|t| t.runs() == 1));
    let mut labels: Vec<String> = cold_tasks.iter().map(|t| t.to_string()).collect();
    labels.sort();
    assert_eq!(
        labels,
        vec![
            "mockgen -source=service.go -destination=mock_service.go",
            "mockgen -source=simple.go -destination=mock_simple.go",
        ]
    );

    let warm = with_timeout(engine.generate(&cancel, tree.root())).await.unwrap();
    assert_eq!(warm.considered, 2);
    assert_eq!(warm.executed, 0);
    assert_eq!(warm.skipped, 2);
    assert!(finder.take_created().iter().all(|t| t.runs() == 0));
}

#[tokio::test]
async fn content_change_reruns_only_that_task_and_refreshes_digest() {
    init_tracing();

    let tree = SourceTreeBuilder::new()
        .directive("a/a.go", "mockgen -source=a.go")
        .directive("b/b.go", "mockgen -source=b.go")
        .build();

    let finder = Arc::new(FakeExecFinder::new("mockgen"));
    let cache: Arc<dyn ChangeCache> = Arc::new(MemoryCache::new());
    let engine = fake_exec_engine(Arc::clone(&finder), Arc::clone(&cache));
    let cancel = CancellationToken::new();

    engine.generate(&cancel, tree.root()).await.unwrap();
    finder.take_created();

    let a = tree.path("a/a.go");
    let key = cache_key(&a);
    let before = cache.get(&key).expect("digest recorded for a.go");

    tree.write("a/a.go", "package a\n\n//go:generate mockgen -source=a.go\ntype Changed interface{}\n");

    let summary = engine.generate(&cancel, tree.root()).await.unwrap();
    assert_eq!((summary.executed, summary.skipped), (1, 1));

    let reran: Vec<_> = finder
        .take_created()
        .into_iter()
        .filter(|t| t.runs() == 1)
        .collect();
    assert_eq!(reran.len(), 1);
    assert_eq!(reran[0].file_path(), a.as_path());

    let after = cache.get(&key).unwrap();
    assert_ne!(before, after);
    assert_eq!(after, ContentHasher::new().hash(&a).unwrap());
}

#[tokio::test]
async fn foreign_digest_in_cache_forces_execution() {
    init_tracing();

    let tree = SourceTreeBuilder::new().directive("a.go", "mockgen -source=a.go").build();
    let finder = Arc::new(FakeExecFinder::new("mockgen"));
    let cache: Arc<dyn ChangeCache> = Arc::new(MemoryCache::new());
    cache.set(&cache_key(&tree.path("a.go")), "xxhash:1234abcd");

    let engine = fake_exec_engine(Arc::clone(&finder), Arc::clone(&cache));
    let summary = engine.generate(&CancellationToken::new(), tree.root()).await.unwrap();

    assert_eq!(summary.executed, 1);
    assert!(cache.get(&cache_key(&tree.path("a.go"))).unwrap().starts_with("blake3:"));
}

#[tokio::test]
async fn saved_cache_makes_the_next_process_skip() {
    init_tracing();

    let tree = SourceTreeBuilder::new()
        .directive("x.go", "mockgen -source=x.go")
        .directive("y.go", "mockgen -source=y.go")
        .build();

    {
        let cache = loaded_file_cache(&tree, "mockgen");
        let finder = Arc::new(FakeExecFinder::new("mockgen"));
        let engine = fake_exec_engine(finder, Arc::clone(&cache) as Arc<dyn ChangeCache>);
        let s = engine.generate(&CancellationToken::new(), tree.root()).await.unwrap();
        assert_eq!(s.executed, 2);
        cache.save().unwrap();
    }

    let written = std::fs::read_to_string(tree.cache_path("mockgen")).unwrap();
    assert_eq!(written.lines().count(), 2);
    assert!(written.lines().all(|l| l.split(' ').nth(1).unwrap().starts_with("blake3:")));

    let cache = loaded_file_cache(&tree, "mockgen");
    let finder = Arc::new(FakeExecFinder::new("mockgen"));
    let engine = fake_exec_engine(finder, cache);
    let s = engine.generate(&CancellationToken::new(), tree.root()).await.unwrap();
    assert_eq!((s.executed, s.skipped), (0, 2));
}

#[cfg(unix)]
#[tokio::test]
async fn real_processes_are_idempotent_across_runs() {
    init_tracing();

    let tree = SourceTreeBuilder::new()
        .directive("one/one.go", "touch one_gen.txt")
        .directive("two/two.go", "touch two_gen.txt")
        .directive("three/three.go", "touch three_gen.txt")
        .build();

    let cache = loaded_file_cache(&tree, "touch");
    let engine = real_engine("touch", Arc::clone(&cache) as Arc<dyn ChangeCache>, 2);
    let cancel = CancellationToken::new();

    let first = with_timeout(engine.generate(&cancel, tree.root())).await.unwrap();
    assert_eq!(first.executed, 3);
    for rel in ["one/one_gen.txt", "two/two_gen.txt", "three/three_gen.txt"] {
        assert!(tree.path(rel).exists(), "{rel} should be generated next to its source");
    }

    std::fs::remove_file(tree.path("two/two_gen.txt")).unwrap();

    let second = with_timeout(engine.generate(&cancel, tree.root())).await.unwrap();
    assert_eq!((second.executed, second.skipped), (0, 3));
    assert!(
        !tree.path("two/two_gen.txt").exists(),
        "skipped task must not spawn its process"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn generator_that_removes_its_source_leaves_cache_untouched() {
    init_tracing();

    let tree = SourceTreeBuilder::new()
        .directive("victim.go", "rm victim.go")
        .build();

    let cache = Arc::new(FileCache::new(tree.cache_path("rm")));
    let engine = real_engine("rm", Arc::clone(&cache) as Arc<dyn ChangeCache>, 1);

    let summary = engine
        .run_pass(&CancellationToken::new(), tree.root())
        .await
        .unwrap();

    assert_eq!(summary.failed(), 1);
    assert!(matches!(summary.errors[0], GencacheError::Hash { .. }));
    assert!(cache.is_empty());
}
