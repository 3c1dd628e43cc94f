// ABOUTME: Tests for concurrent project loading, staleness, refresh, and route-driven selection
// ABOUTME: One failing project must never block the others

use std::time::Duration;
use tokio::task::yield_now;

use sitetree_events::project::{Event as ProjectEvent, SelectionSource};
use sitetree_types::PageNode;

use super::fakes::{Harness, OTHER_PROJECT, PROJECT, example_tree, other_tree};
use crate::error::TreeError;
use crate::route::Route;
use crate::store::ProjectLoad;

fn configured() -> Vec<String> {
    vec![PROJECT.to_string(), OTHER_PROJECT.to_string()]
}

#[tokio::test]
async fn test_load_all_records_each_outcome() {
    let harness = Harness::new(vec![example_tree(), other_tree()]);
    harness.backend.fail_fetches(PROJECT);

    let outcomes = harness.loader.load_all(&configured()).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].1.is_err());
    assert!(outcomes[1].1.is_ok());

    assert!(matches!(
        harness.session.project_load(PROJECT),
        Some(ProjectLoad::Failed(TreeError::Server { status: 502, .. }))
    ));
    assert_eq!(harness.session.loaded_projects(), vec![OTHER_PROJECT.to_string()]);

    // the failed project is not known, so the route falls back to a ready one
    let resolution = harness
        .loader
        .select_for_route(&Route::parse("/webpage/example.com/blog"))
        .unwrap();
    assert_eq!(resolution.project, OTHER_PROJECT);
    assert_eq!(resolution.source, SelectionSource::Fallback);
}

#[tokio::test]
async fn test_route_then_retained_selection() {
    let harness = Harness::new(vec![example_tree(), other_tree()]);
    harness.loader.load_all(&configured()).await;

    let first = harness
        .loader
        .select_for_route(&Route::parse("/app/webpage/example.org/post-office"))
        .unwrap();
    assert_eq!(first.source, SelectionSource::Route);

    // a later route into another project keeps the selection
    let second = harness
        .loader
        .select_for_route(&Route::parse("/webpage/example.com"))
        .unwrap();
    assert_eq!(second.project, OTHER_PROJECT);
    assert_eq!(second.source, SelectionSource::Retained);

    let selected: Vec<ProjectEvent> = harness
        .bus
        .project_events()
        .into_iter()
        .filter(|event| matches!(event, ProjectEvent::ProjectSelected { .. }))
        .collect();
    assert_eq!(selected.len(), 1, "re-selecting the same project is silent");
}

#[tokio::test]
async fn test_failed_refresh_keeps_cached_tree() {
    let harness = Harness::loaded().await;
    let generation = harness.session.generation(PROJECT).unwrap();
    harness.backend.fail_fetches(PROJECT);

    let error = harness.loader.refresh(PROJECT).await.unwrap_err();
    assert!(error.is_retryable());
    assert_eq!(harness.session.generation(PROJECT), Some(generation));
    assert!(harness.session.tree(PROJECT).unwrap().contains("/blog/post-1"));

    harness.backend.heal_fetches(PROJECT);
    let refreshed = harness.loader.refresh(PROJECT).await.unwrap();
    assert_eq!(refreshed, generation + 1);
    assert!(harness.bus.project_events().iter().any(|event| matches!(
        event,
        ProjectEvent::TreeReplaced { generation, .. } if *generation == refreshed
    )));
}

#[tokio::test(start_paused = true)]
async fn test_stale_tree_is_refetched_lazily() {
    let harness = Harness::loaded().await;
    assert_eq!(harness.backend.fetches().len(), 1);

    harness.loader.ensure_loaded(PROJECT).await.unwrap();
    assert_eq!(harness.backend.fetches().len(), 1, "fresh tree served from cache");

    tokio::time::advance(Duration::from_secs(301)).await;
    harness.loader.ensure_loaded(PROJECT).await.unwrap();
    assert_eq!(harness.backend.fetches().len(), 2);
}

#[tokio::test]
async fn test_user_pick_loads_the_project() {
    let harness = Harness::loaded().await;

    let resolution = harness.loader.select_project(OTHER_PROJECT).await.unwrap();
    assert_eq!(resolution.source, SelectionSource::User);
    assert_eq!(
        harness.session.selected_project().as_deref(),
        Some(OTHER_PROJECT)
    );
    assert!(harness.session.tree(OTHER_PROJECT).is_some());

    let unknown = harness.loader.select_project("example.net").await;
    assert!(unknown.is_err());
    assert_eq!(
        harness.session.selected_project().as_deref(),
        Some(OTHER_PROJECT)
    );
}

#[tokio::test]
async fn test_late_cached_fetch_never_replaces_forced_refresh() {
    let harness = Harness::new(vec![example_tree(), other_tree()]);
    let release_cached = harness.backend.hold_next_fetch();
    let release_forced = harness.backend.hold_next_fetch();

    let cached = tokio::spawn({
        let loader = harness.loader.clone();
        async move { loader.ensure_loaded(PROJECT).await }
    });
    while harness.backend.fetches().is_empty() {
        yield_now().await;
    }

    // the server gains a page after the cached fetch read its tree
    let mut updated = example_tree();
    updated.root.children.push(PageNode::new("new-page").with_id(50));
    harness.backend.set_tree(updated);

    let forced = tokio::spawn({
        let loader = harness.loader.clone();
        async move { loader.refresh(PROJECT).await }
    });
    while harness.backend.fetches().len() < 2 {
        yield_now().await;
    }
    release_forced.send(()).unwrap();
    let refreshed = forced.await.unwrap().unwrap();
    assert!(harness.session.tree(PROJECT).unwrap().contains("/new-page"));

    release_cached.send(()).unwrap();
    let reported = cached.await.unwrap().unwrap();
    assert_eq!(reported, refreshed);
    assert!(harness.session.tree(PROJECT).unwrap().contains("/new-page"));
    assert_eq!(harness.session.epoch(PROJECT), Some(1));

    let loads = harness
        .bus
        .project_events()
        .into_iter()
        .filter(|event| matches!(event, ProjectEvent::TreeLoaded { .. }))
        .count();
    assert_eq!(loads, 1, "the overtaken response is not announced");
}
