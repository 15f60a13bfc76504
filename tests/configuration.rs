//! Layered configuration handling against a file-system store.

use std::sync::Arc;
use std::time::Duration;

use content_rewriter::lifecycle::Shutdown;
use content_rewriter::manager::ChangeWorker;
use content_rewriter::store::{ChangeEvent, StoreWatcher};
use content_rewriter::ComponentRegistry;

mod common;

use common::{html_pipeline, orders, StoreFixture};

const APPS_KEY: &str = "/apps/site/config/rewriter/rewrite-1";
const LIBS_KEY: &str = "/libs/site/config/rewriter/rewrite-1";

fn ordered(order: i64) -> String {
    html_pipeline(&format!("order = {order}"))
}

#[test]
fn test_override_replacement_promotes_lower_root() {
    let fixture = StoreFixture::new();
    fixture.write(APPS_KEY, &ordered(10));
    fixture.write(LIBS_KEY, &ordered(3));
    fixture.write("/libs/site/config/rewriter/other", &ordered(7));
    let manager = fixture.manager(ComponentRegistry::with_defaults());
    assert_eq!(orders(&manager), vec![10, 7]);

    fixture.remove_node(APPS_KEY);
    manager.handle_event(&ChangeEvent::removed(APPS_KEY));
    assert_eq!(orders(&manager), vec![7, 3]);

    fixture.write(APPS_KEY, &ordered(1));
    manager.handle_event(&ChangeEvent::added(APPS_KEY));
    assert_eq!(orders(&manager), vec![7, 1]);
}

#[test]
fn test_lower_root_change_does_not_disturb_winner() {
    let fixture = StoreFixture::new();
    fixture.write(APPS_KEY, &ordered(10));
    fixture.write(LIBS_KEY, &ordered(3));
    let manager = fixture.manager(ComponentRegistry::with_defaults());
    let before = manager.processor_configurations();

    fixture.write(LIBS_KEY, &ordered(99));
    manager.handle_event(&ChangeEvent::changed(LIBS_KEY));
    let after = manager.processor_configurations();
    assert_eq!(orders(&manager), vec![10]);
    assert!(Arc::ptr_eq(&before[0], &after[0]));
}

#[test]
fn test_cascade_delete_removes_everything_beneath() {
    let fixture = StoreFixture::new();
    fixture.write("/apps/site/config/rewriter/a", &ordered(1));
    fixture.write("/apps/site/config/rewriter/b", &ordered(2));
    fixture.write("/apps/blog/config/rewriter/c", &ordered(4));
    fixture.write(LIBS_KEY, &ordered(3));
    let manager = fixture.manager(ComponentRegistry::with_defaults());
    assert_eq!(orders(&manager), vec![4, 3, 2, 1]);

    fixture.remove_dir("/apps/site/config");
    manager.handle_event(&ChangeEvent::removed("/apps/site/config"));
    assert_eq!(orders(&manager), vec![4, 3]);
    assert!(manager.known_paths("/apps/site").is_empty());
    assert_eq!(manager.known_paths("/apps/blog").len(), 1);
}

#[test]
fn test_invalid_and_disabled_entries_stay_inactive() {
    let fixture = StoreFixture::new();
    fixture.write(APPS_KEY, "generatorType = \"html-generator\"\n");
    fixture.write(LIBS_KEY, &ordered(3));
    fixture.write(
        "/apps/site/config/rewriter/off",
        &html_pipeline("enabled = false"),
    );
    let manager = fixture.manager(ComponentRegistry::with_defaults());
    // the invalid top entry hides the lower one for the same key
    assert!(manager.processor_configurations().is_empty());

    let dump = manager.print_configuration();
    assert!(dump.contains("Configuration rewrite-1"));
    assert!(dump.contains("Configuration off"));
    assert!(dump.contains(&format!("- {LIBS_KEY}")));
}

#[test]
fn test_broken_file_keeps_previous_state() {
    let fixture = StoreFixture::new();
    fixture.write(APPS_KEY, &ordered(5));
    let manager = fixture.manager(ComponentRegistry::with_defaults());

    fixture.write(APPS_KEY, "order = [");
    manager.handle_event(&ChangeEvent::changed(APPS_KEY));
    assert_eq!(orders(&manager), vec![5]);
}

#[test]
fn test_dump_lists_active_then_overridden() {
    let fixture = StoreFixture::new();
    fixture.write(APPS_KEY, &ordered(10));
    fixture.write(LIBS_KEY, &ordered(3));
    let manager = fixture.manager(ComponentRegistry::with_defaults());

    let dump = manager.print_configuration();
    let active = dump.find("Active Configurations").unwrap();
    let key = dump.find("Configuration rewrite-1").unwrap();
    assert!(active < key);
    assert!(dump.contains(&format!("Resource path: {APPS_KEY}")));
    assert!(dump.contains("Overriding configurations from the following resource paths:"));
    assert!(dump.contains(&format!("- {LIBS_KEY}")));
}

#[tokio::test]
async fn test_watcher_and_worker_keep_state_current() {
    let fixture = StoreFixture::new();
    fixture.write(LIBS_KEY, &ordered(3));
    fixture.mkdir("/apps/site/config/rewriter");
    let manager = fixture.manager(ComponentRegistry::with_defaults());
    assert_eq!(orders(&manager), vec![3]);

    let search_paths = manager.search_paths().to_vec();
    let (watcher, rx) = StoreWatcher::new(fixture.store(), &search_paths, Duration::from_millis(50));
    let _watcher = watcher.run().unwrap();
    let shutdown = Shutdown::new();
    let worker = ChangeWorker::new(Arc::clone(&manager), rx).spawn(shutdown.subscribe());

    fixture.write(APPS_KEY, &ordered(8));
    wait_for(|| orders(&manager) == vec![8]).await;

    fixture.remove_node(APPS_KEY);
    wait_for(|| orders(&manager) == vec![3]).await;

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
