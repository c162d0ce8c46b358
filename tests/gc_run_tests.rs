//! The interactive `gc` flow end to end

mod common;

use common::*;
use kitgc::cli::{Outcome, run_gc};
use kitgc::error::GcError;
use kitgc::gc::{GarbageCollector, GcOptions};

fn options() -> GcOptions {
    GcOptions {
        namespace: NAMESPACE.to_string(),
        ..Default::default()
    }
}

struct Run {
    outcome: anyhow::Result<Outcome>,
    out: String,
    err: String,
}

async fn run(
    cluster: &FakeCluster,
    registry: &FakeRegistry,
    options: &GcOptions,
    input: &str,
) -> Run {
    let mut collector = GarbageCollector::new(cluster, registry, "camel-k", Vec::new());
    let mut out = Vec::new();
    let mut err = Vec::new();
    let outcome = run_gc(
        &mut collector,
        options,
        &mut input.as_bytes(),
        &mut out,
        &mut err,
    )
    .await;
    Run {
        outcome,
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
    }
}

#[tokio::test]
async fn test_building_kit_stops_the_run() {
    let cluster = FakeCluster::new(
        vec![kit("a", None), kit_in_phase("b", None, "Build Running")],
        Vec::new(),
    );
    let registry = FakeRegistry::new();

    let run = run(&cluster, &registry, &options(), "y\n").await;

    let err = run.outcome.unwrap_err();
    match err.downcast_ref::<GcError>() {
        Some(GcError::StillBuilding { name, phase, .. }) => {
            assert_eq!(name, "b");
            assert_eq!(phase, "Build Running");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(run.out.is_empty());
    assert_eq!(cluster.writes(), 0);
}

#[tokio::test]
async fn test_nothing_to_do() {
    let cluster = FakeCluster::new(vec![kit("a", None)], vec![integration("route", "a")]);
    let registry = FakeRegistry::new();

    let run = run(&cluster, &registry, &options(), "").await;

    assert_eq!(run.outcome.unwrap(), Outcome::NothingToDo);
    assert_eq!(run.out, "Nothing to do\n");
}

#[tokio::test]
async fn test_dry_run_only_prints() {
    let cluster = FakeCluster::new(
        vec![kit("a", None), kit("b", None)],
        vec![integration("route", "a")],
    );
    let registry = FakeRegistry::new();
    let options = GcOptions {
        dry_run: true,
        ..options()
    };

    let run = run(&cluster, &registry, &options, "y\n").await;

    assert_eq!(run.outcome.unwrap(), Outcome::DryRun);
    assert!(run.out.contains("The following Integration Kits will be deleted:"));
    assert!(run.out.contains("b in namespace: camel"));
    assert!(!run.out.contains("Continue Y/N ?"));
    assert_eq!(cluster.writes(), 0);
}

#[tokio::test]
async fn test_assume_yes_deletes_unused_kits() {
    let cluster = FakeCluster::new(
        vec![kit("a", None), kit("b", None), kit("c", Some("a"))],
        vec![integration("route", "a")],
    );
    let registry = FakeRegistry::new();
    let options = GcOptions {
        assume_yes: true,
        ..options()
    };

    let run = run(&cluster, &registry, &options, "").await;

    assert_eq!(
        run.outcome.unwrap(),
        Outcome::Completed {
            squashed: 0,
            deleted: 2
        }
    );
    assert_eq!(cluster.deleted_kits(), vec!["b", "c"]);
    assert!(registry.deleted().is_empty());
}

#[tokio::test]
async fn test_declining_the_prompt_changes_nothing() {
    let cluster = FakeCluster::new(vec![kit("a", None)], Vec::new());
    let registry = FakeRegistry::new();

    let run = run(&cluster, &registry, &options(), "yes\nn\n").await;

    assert_eq!(run.outcome.unwrap(), Outcome::Aborted);
    assert!(run.out.ends_with("\nContinue Y/N ?\n"));
    assert_eq!(run.err, "Please enter Y or N\n");
    assert_eq!(cluster.writes(), 0);
}

#[tokio::test]
async fn test_confirmed_run_removes_images_too() {
    let cluster = FakeCluster::new(vec![kit("a", None)], Vec::new());
    let registry = FakeRegistry::new();
    let options = GcOptions {
        remove_images: true,
        ..options()
    };

    let run = run(&cluster, &registry, &options, "Y\n").await;

    assert_eq!(
        run.outcome.unwrap(),
        Outcome::Completed {
            squashed: 0,
            deleted: 1
        }
    );
    assert!(run
        .out
        .contains("The following Images will be deleted from the Image Registry:"));
    assert_eq!(registry.deleted(), vec![image("a")]);
    assert_eq!(cluster.deleted_kits(), vec!["a"]);
}
