use crate::harness::clock::MockClock;
use crate::harness::faults::FaultSwitch;
use crate::harness::workspace::TestWorkspace;
use vellum_core::{Patch, VersionSelector};

#[test]
fn test_concurrent_patches_on_one_draft() {
    let workspace = TestWorkspace::empty().unwrap();
    let service = workspace
        .open_service(&MockClock::new(), &FaultSwitch::new())
        .unwrap();
    service.create_version("p", "f", "shared");

    std::thread::scope(|s| {
        for writer in 0..8i64 {
            let service = &service;
            s.spawn(move || {
                for i in 0..25i64 {
                    let patch = Patch::new(format!("user-{}", writer), "p", writer * 100 + i);
                    service.create_patch("p", "f", patch).unwrap();
                }
            });
        }
    });

    assert_eq!(service.get_patch_list("p", "f").unwrap().len(), 200);
    let generation = service.commit_version("p", "f").unwrap();
    let record = service
        .get_version_record("p", "f", VersionSelector::Generation(generation))
        .unwrap();
    assert_eq!(record.patches.len(), 200);
    assert_eq!(record.content, b"shared");
}

#[test]
fn test_concurrent_commits_of_separate_files() {
    let workspace = TestWorkspace::empty().unwrap();
    let service = workspace
        .open_service(&MockClock::new(), &FaultSwitch::new())
        .unwrap();

    std::thread::scope(|s| {
        for file in 0..6 {
            let service = &service;
            s.spawn(move || {
                let file_id = format!("file-{}", file);
                for round in 0..5 {
                    service.create_version("p", &file_id, format!("{} round {}", file_id, round));
                    service.commit_version("p", &file_id).unwrap();
                }
            });
        }
    });

    for file in 0..6 {
        let file_id = format!("file-{}", file);
        let generations = service.file_version_list("p", &file_id).unwrap();
        assert_eq!(generations.len(), 5);
        assert_eq!(
            service.get_version("p", &file_id, VersionSelector::Latest).unwrap(),
            format!("{} round 4", file_id).into_bytes()
        );
    }
}

#[test]
fn test_concurrent_deletes_lose_no_coffin() {
    let workspace = TestWorkspace::empty().unwrap();
    let service = workspace
        .open_service(&MockClock::new(), &FaultSwitch::new())
        .unwrap();

    std::thread::scope(|s| {
        for thread in 0..4i64 {
            let service = &service;
            s.spawn(move || {
                for i in 0..10i64 {
                    let file_id = format!("t{}-{}", thread, i);
                    service
                        .delete_file("p", &file_id, &format!("{}.tex", file_id), thread * 10 + i)
                        .unwrap();
                }
            });
        }
    });

    let mut stamps: Vec<i64> = service
        .list_coffins("p")
        .unwrap()
        .iter()
        .map(|c| c.removal_timestamp)
        .collect();
    stamps.sort_unstable();
    assert_eq!(stamps, (0..40).collect::<Vec<_>>());
}
