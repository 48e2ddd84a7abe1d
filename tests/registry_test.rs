//! Registry persistence invariants that need more than one `RegistryStore`
//! handle or more than one thread to exercise: lock contention across
//! concurrent writers, and round-trip stability of a registry with
//! multiple projects.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use piv_supervisor::domain::models::project::{CycleMetadata, Project, ProjectStatus};
use piv_supervisor::infrastructure::registry_store::RegistryStore;

fn project(name: &str) -> Project {
    Project {
        name: name.to_string(),
        path: format!("/tmp/{name}"),
        status: ProjectStatus::Idle,
        heartbeat: Utc::now(),
        current_phase: None,
        last_completed_phase: None,
        piv_commands_version: "v1".to_string(),
        orchestrator_pid: None,
        registered_at: Utc::now(),
        cycle_metadata: CycleMetadata::default(),
    }
}

/// Two handles to the same registry file contend for the advisory lock:
/// both updates must land, and neither clobbers the other's write.
#[test]
fn concurrent_updates_from_two_handles_both_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.yaml");

    let store_a = Arc::new(RegistryStore::new(&path).with_lock_timeout(Duration::from_secs(5)));
    let store_b = Arc::new(RegistryStore::new(&path).with_lock_timeout(Duration::from_secs(5)));

    let a = {
        let store_a = store_a.clone();
        std::thread::spawn(move || {
            store_a.update(|r| {
                r.register(project("alpha"));
                Ok(())
            })
        })
    };
    let b = {
        let store_b = store_b.clone();
        std::thread::spawn(move || {
            store_b.update(|r| {
                r.register(project("beta"));
                Ok(())
            })
        })
    };

    a.join().unwrap().unwrap();
    b.join().unwrap().unwrap();

    let registry = store_a.read().unwrap();
    assert!(registry.find_by_name("alpha").is_some());
    assert!(registry.find_by_name("beta").is_some());
}

/// A registry holding several projects with distinct field combinations
/// round-trips through YAML without losing or reordering entries.
#[test]
fn multi_project_registry_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::new(dir.path().join("registry.yaml"));

    store
        .update(|r| {
            let mut running = project("running-one");
            running.status = ProjectStatus::Running;
            running.orchestrator_pid = Some(42);
            running.current_phase = Some(3);
            r.register(running);

            let mut failed = project("failed-one");
            failed.status = ProjectStatus::Failed;
            r.register(failed);

            r.register(project("idle-one"));
            Ok(())
        })
        .unwrap();

    let reopened = RegistryStore::new(dir.path().join("registry.yaml"));
    let registry = reopened.read().unwrap();

    assert_eq!(registry.projects.len(), 3);
    assert_eq!(registry.find_by_name("running-one").unwrap().orchestrator_pid, Some(42));
    assert_eq!(registry.find_by_name("failed-one").unwrap().status, ProjectStatus::Failed);
    assert!(registry.find_by_name("idle-one").unwrap().orchestrator_pid.is_none());
}

/// Deregistering one project from a populated registry leaves every
/// other project untouched.
#[test]
fn deregister_leaves_other_projects_intact() {
    let dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::new(dir.path().join("registry.yaml"));

    store
        .update(|r| {
            r.register(project("keep-me"));
            r.register(project("remove-me"));
            Ok(())
        })
        .unwrap();

    store
        .update(|r| {
            r.deregister("remove-me");
            Ok(())
        })
        .unwrap();

    let registry = store.read().unwrap();
    assert!(registry.find_by_name("keep-me").is_some());
    assert!(registry.find_by_name("remove-me").is_none());
}
