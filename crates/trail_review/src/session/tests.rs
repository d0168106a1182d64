use std::fs;

use serde_json::Value;

use super::*;
use crate::io::FsStore;
use crate::raster::MASKED;
use crate::test_support::{Fixture, PERSISTED_DIAGNOSTIC};

fn trail_id(session: &ReviewSession<FsStore>) -> Option<TrailId> {
    session.current_trail().map(|t| t.id)
}

fn position(session: &ReviewSession<FsStore>) -> (usize, Extension, ReviewMode) {
    let cursor = session.cursor();
    (cursor.image, cursor.extension, session.mode())
}

#[test]
fn test_filter_skips_demoted_and_exhausts_to_image_review() {
    let fixture = Fixture::new();
    fixture.add_image(
        "a",
        vec![],
        vec![
            Fixture::trail(1, TrailStatus::ACCEPTED, 5.0),
            Fixture::trail(2, TrailStatus::DEMOTED, 10.0),
        ],
    );

    let mut session = fixture.session(&["a"]);
    assert_eq!(position(&session), (0, Extension::Wfc2, ReviewMode::Trail));
    assert_eq!(trail_id(&session), Some(1));

    session.advance().expect("Should advance");
    assert_eq!(position(&session), (0, Extension::Wfc2, ReviewMode::Image));
    assert_eq!(trail_id(&session), None);
}

#[test]
fn test_empty_wfc1_moves_straight_to_wfc2() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![], vec![]);
    fixture.add_image("b", vec![], vec![]);
    fixture.add_image("c", vec![], vec![]);
    fixture.add_image("d", vec![], vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)]);

    let mut session = fixture.session(&["a", "b", "c", "d"]);
    session.jump_to_image(3).expect("Should jump");

    assert_eq!(position(&session), (3, Extension::Wfc2, ReviewMode::Trail));
    assert_eq!(trail_id(&session), Some(1));
}

#[test]
fn test_extensions_alternate_until_ended() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![], vec![]);
    fixture.add_image("b", vec![], vec![]);

    let mut session = fixture.session(&["a", "b"]);
    assert_eq!(position(&session), (0, Extension::Wfc2, ReviewMode::Image));

    session.advance_image().expect("Should advance");
    assert_eq!(position(&session), (1, Extension::Wfc2, ReviewMode::Image));

    session.advance_image().expect("Should advance");
    assert_eq!(session.mode(), ReviewMode::Ended);
    assert!(session.current_image().is_none());
}

#[test]
fn test_trails_on_both_chips_are_visited_in_order() {
    let fixture = Fixture::new();
    fixture.add_image(
        "a",
        vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)],
        vec![Fixture::trail(7, TrailStatus::ACCEPTED, 9.0)],
    );
    fixture.add_image("b", vec![Fixture::trail(3, TrailStatus::ACCEPTED, 5.0)], vec![]);

    let mut session = fixture.session(&["a", "b"]);
    let mut visited = vec![(position(&session), trail_id(&session))];
    while session.mode() != ReviewMode::Ended {
        match session.mode() {
            ReviewMode::Trail => session.advance().expect("Should advance"),
            _ => session.advance_image().expect("Should advance"),
        }
        visited.push((position(&session), trail_id(&session)));
    }

    assert_eq!(
        visited,
        vec![
            ((0, Extension::Wfc1, ReviewMode::Trail), Some(1)),
            ((0, Extension::Wfc2, ReviewMode::Trail), Some(7)),
            ((0, Extension::Wfc2, ReviewMode::Image), None),
            ((1, Extension::Wfc1, ReviewMode::Trail), Some(3)),
            ((1, Extension::Wfc2, ReviewMode::Image), None),
            ((2, Extension::Wfc1, ReviewMode::Ended), None),
        ]
    );
}

#[test]
fn test_missing_files_are_skipped() {
    let fixture = Fixture::new();
    fixture.add_image("b", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);

    let session = fixture.session(&["a", "b"]);
    assert_eq!(position(&session), (1, Extension::Wfc1, ReviewMode::Trail));
}

#[test]
fn test_resize_rejects_non_numeric_width() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);
    let before = session.catalog().cloned();

    let error = session.resize_width("abc").expect_err("Should reject width");
    assert!(error.is_validation());
    assert_eq!(session.catalog().cloned(), before);
    assert_eq!(session.profile().map(|p| p.width), Some(1.5));
    assert!(!session.is_dirty());
}

#[test]
fn test_resize_updates_record_and_profile() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);

    session.resize_width("3.5").expect("Should resize");
    assert_eq!(session.current_trail().map(|t| t.width), Some(3.5));
    assert_eq!(session.profile().map(|p| p.width), Some(3.5));
    assert!(session.is_dirty());

    session.save().expect("Should save");
    let store = fixture.store();
    let profile = store.load_profile("a", Extension::Wfc1, 1).expect("Should load profile");
    let catalog = store.load_catalog("a", Extension::Wfc1).expect("Should load catalog");
    assert_eq!(profile.width, 3.5);
    assert_eq!(catalog.find(1).map(|t| t.width), Some(3.5));
}

#[test]
fn test_reject_then_undo_restores_everything() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);
    let original_catalog = session.catalog().cloned();
    let original_rasters = session.rasters().map(|r| r.trails.clone());
    assert_eq!(session.rasters().map(|r| r.trails.masked_pixels()), Some(10));

    session.reject().expect("Should reject");
    assert_eq!(session.current_trail().map(|t| t.status), Some(TrailStatus::REJECTED));
    assert_eq!(session.rasters().map(|r| r.trails.masked_pixels()), Some(0));
    assert!(session.is_dirty());
    let working = session.current_diagnostic().expect("Should have a diagnostic");
    assert_ne!(fs::read(&working).expect("Should read"), PERSISTED_DIAGNOSTIC);

    assert_eq!(session.undo().expect("Should undo"), UndoOutcome::Reverted);
    assert_eq!(session.catalog().cloned(), original_catalog);
    assert_eq!(session.rasters().map(|r| r.trails.clone()), original_rasters);
    assert_eq!(session.mode(), ReviewMode::Trail);
    assert_eq!(trail_id(&session), Some(1));
    assert!(!session.is_dirty());
    let shown = session.current_diagnostic().expect("Should have a diagnostic");
    assert_eq!(fs::read(shown).expect("Should read"), PERSISTED_DIAGNOSTIC);

    assert_eq!(session.undo().expect("Should undo"), UndoOutcome::NothingToUndo);
}

#[test]
fn test_undo_restores_profile_backup() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);

    session.resize_width("6").expect("Should resize");
    session.undo().expect("Should undo");

    assert_eq!(session.profile().map(|p| p.width), Some(1.5));
    assert_eq!(session.current_trail().map(|t| t.width), Some(1.5));
}

#[test]
fn test_save_is_idempotent_and_clears_dirty() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);
    let paths = [
        fixture.layout.catalog("a", Extension::Wfc1),
        fixture.layout.mask("a", Extension::Wfc1),
        fixture.layout.segmentation("a", Extension::Wfc1),
        fixture.layout.profile("a", Extension::Wfc1, 1),
        fixture.layout.trail_diagnostic("a", Extension::Wfc1, 1),
        fixture.layout.image_diagnostic("a"),
    ];

    session.reject().expect("Should reject");
    session.save().expect("Should save");
    assert!(!session.is_dirty());
    let first: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).expect("Should read")).collect();

    session.save().expect("Should save");
    let second: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).expect("Should read")).collect();
    assert_eq!(first, second);

    assert_ne!(first[4], PERSISTED_DIAGNOSTIC);
    assert_eq!(session.undo().expect("Should undo"), UndoOutcome::NothingToUndo);
    assert_eq!(session.current_trail().map(|t| t.status), Some(TrailStatus::REJECTED));
}

#[test]
fn test_advance_saves_pending_edits() {
    let fixture = Fixture::new();
    fixture.add_image(
        "a",
        vec![
            Fixture::trail(1, TrailStatus::ACCEPTED, 5.0),
            Fixture::trail(2, TrailStatus::ACCEPTED, 10.0),
        ],
        vec![],
    );
    let mut session = fixture.session(&["a"]);

    session.reject().expect("Should reject");
    session.advance().expect("Should advance");
    assert_eq!(trail_id(&session), Some(2));
    assert!(!session.is_dirty());

    let store = fixture.store();
    let catalog = store.load_catalog("a", Extension::Wfc1).expect("Should load catalog");
    assert_eq!(catalog.find(1).map(|t| t.status), Some(TrailStatus::REJECTED));
    let segmentation = store.load_segmentation("a", Extension::Wfc1).expect("Should load segmentation");
    assert!(segmentation.pixels().all(|p| p[0] != 1));
    assert!(segmentation.pixels().any(|p| p[0] == 2));
}

#[test]
fn test_accepting_demoted_trail_after_toggle() {
    let fixture = Fixture::new();
    fixture.add_image(
        "a",
        vec![
            Fixture::trail(1, TrailStatus::ACCEPTED, 5.0),
            Fixture::trail(2, TrailStatus::DEMOTED, 10.0),
        ],
        vec![],
    );
    let mut session = fixture.session(&["a"]);

    session.toggle_filter().expect("Should toggle");
    assert_eq!(session.filter(), StatusFilter::Everything);
    assert_eq!(trail_id(&session), Some(1));

    session.advance().expect("Should advance");
    assert_eq!(trail_id(&session), Some(2));

    session.accept().expect("Should accept");
    let rasters = session.rasters().expect("Should have rasters");
    assert_eq!(rasters.trails.segmentation.get_pixel(7, 10)[0], 2);
    assert_eq!(rasters.trails.mask.get_pixel(7, 10)[0], MASKED);
    assert_eq!(rasters.trails.segmentation.get_pixel(7, 5)[0], 1);
}

#[test]
fn test_add_trail_switches_chip_and_assigns_next_id() {
    let fixture = Fixture::new();
    fixture.add_image(
        "a",
        vec![Fixture::trail(3, TrailStatus::DEMOTED, 10.0)],
        vec![],
    );
    let mut session = fixture.session(&["a"]);
    assert_eq!(position(&session), (0, Extension::Wfc2, ReviewMode::Image));

    let id = session
        .add_trail(Extension::Wfc1, [8.0, 20.0], [56.0, 20.0], 1.5)
        .expect("Should add trail");

    assert_eq!(id, 4);
    assert_eq!(position(&session), (0, Extension::Wfc1, ReviewMode::Trail));
    let record = session.current_trail().expect("Should review new trail");
    assert_eq!(record.id, 4);
    assert_eq!(record.status, TrailStatus::ACCEPTED);
    assert_eq!(record.endpoints, [[2.0, 5.0], [14.0, 5.0]]);
    assert_eq!(record.aux.get("theta"), Some(&Value::from(-1)));
    assert_eq!(record.aux.get("snr"), Some(&Value::from(-1)));

    let profile = session.profile().expect("Should have a profile");
    assert_eq!(profile.center, 4.0);
    assert_eq!(profile.values.len(), 9);
    assert!(profile.values.iter().all(Option::is_some));
    assert_eq!(profile.snr, None);

    let rasters = session.rasters().expect("Should have rasters");
    assert_eq!(rasters.trails.segmentation.get_pixel(8, 5)[0], 4);
    assert!(session.is_dirty());
}

#[test]
fn test_undo_after_add_returns_to_image_review() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![], vec![]);
    let mut session = fixture.session(&["a"]);

    session
        .add_trail(Extension::Wfc1, [8.0, 20.0], [56.0, 20.0], 1.5)
        .expect("Should add trail");
    assert_eq!(session.undo().expect("Should undo"), UndoOutcome::Reverted);

    assert_eq!(position(&session), (0, Extension::Wfc2, ReviewMode::Image));
    let catalog = fixture
        .store()
        .load_catalog("a", Extension::Wfc1)
        .expect("Should load catalog");
    assert!(catalog.is_empty());
}

#[test]
fn test_add_trail_validation_leaves_state_alone() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![], vec![]);
    let mut session = fixture.session(&["a"]);

    let degenerate = session.add_trail(Extension::Wfc1, [8.0, 8.0], [8.0, 8.0], 1.5);
    assert!(degenerate.expect_err("Should reject").is_validation());
    let bad_width = session.add_trail(Extension::Wfc2, [8.0, 8.0], [40.0, 8.0], -1.0);
    assert!(bad_width.expect_err("Should reject").is_validation());

    assert_eq!(position(&session), (0, Extension::Wfc2, ReviewMode::Image));
    assert!(!session.is_dirty());
}

#[test]
fn test_commands_require_the_right_mode() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);

    let error = session.advance_image().expect_err("Should be unavailable");
    assert!(matches!(error, ReviewError::InvalidCommand { mode: "trail", .. }));
    assert!(session.add_trail(Extension::Wfc1, [0.0, 0.0], [9.0, 9.0], 1.0).is_err());

    session.advance().expect("Should advance");
    assert_eq!(session.mode(), ReviewMode::Image);
    assert!(session.reject().expect_err("Should be unavailable").is_validation());
}

#[test]
fn test_jump_out_of_range() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);

    let error = session.jump_to_image(5).expect_err("Should reject index");
    assert!(error.is_validation());
    assert_eq!(trail_id(&session), Some(1));
}

#[test]
fn test_jump_discards_unsaved_edits() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);

    session.reject().expect("Should reject");
    session.jump_to_image(0).expect("Should jump");

    assert_eq!(session.current_trail().map(|t| t.status), Some(TrailStatus::ACCEPTED));
    assert!(!session.is_dirty());
}

#[test]
fn test_viewer_requires_configuration() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let session = fixture.session(&["a"]);

    assert!(session.open_viewer().expect_err("Should need a viewer").is_validation());
}

#[test]
fn test_quit_ends_session() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![], vec![]);
    let mut session = fixture.session(&["a"]);

    session.quit();
    assert_eq!(session.mode(), ReviewMode::Ended);
    assert!(session.current_diagnostic().is_none());
}

#[test]
fn test_trail_without_stored_profile_gets_one_extracted() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    fs::remove_file(fixture.layout.profile("a", Extension::Wfc1, 1)).expect("Should remove profile");
    let mut session = fixture.session(&["a"]);

    let profile = session.profile().expect("Should extract a profile");
    assert_eq!(profile.width, 1.5);
    assert_eq!(profile.values.len(), 9);

    session.resize_width("3").expect("Should resize");
    session.save().expect("Should save");
    let saved = fixture
        .store()
        .load_profile("a", Extension::Wfc1, 1)
        .expect("Should load saved profile");
    assert_eq!(saved.width, 3.0);
    assert_eq!(saved.values.len(), 9);
}

#[test]
fn test_failed_save_names_file_and_keeps_edits() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);
    let catalog_path = fixture.layout.catalog("a", Extension::Wfc1);
    let original = fs::read(&catalog_path).expect("Should read catalog");

    session.reject().expect("Should reject");
    fs::remove_file(&catalog_path).expect("Should remove catalog");
    fs::create_dir_all(catalog_path.join("blocker")).expect("Should block catalog path");

    let error = session.save().expect_err("Should fail to save");
    assert!(matches!(&error, ReviewError::Save { path, .. } if *path == catalog_path));
    assert!(!error.is_validation());
    assert!(error.to_string().starts_with(&format!("Failed to save {}", catalog_path.display())));
    assert!(session.is_dirty());
    assert_eq!(session.current_trail().map(|t| t.status), Some(TrailStatus::REJECTED));

    fs::remove_dir_all(&catalog_path).expect("Should unblock catalog path");
    fs::write(&catalog_path, original).expect("Should restore catalog");
    assert_eq!(session.undo().expect("Should undo"), UndoOutcome::Reverted);
    assert_eq!(session.current_trail().map(|t| t.status), Some(TrailStatus::ACCEPTED));
    assert!(!session.is_dirty());
}

#[test]
fn test_toggle_filter_discards_unsaved_edits() {
    let fixture = Fixture::new();
    fixture.add_image("a", vec![Fixture::trail(1, TrailStatus::ACCEPTED, 5.0)], vec![]);
    let mut session = fixture.session(&["a"]);

    session.resize_width("4").expect("Should resize");
    assert!(session.is_dirty());
    session.toggle_filter().expect("Should toggle");

    assert_eq!(session.filter(), StatusFilter::Everything);
    assert!(!session.is_dirty());
    assert_eq!(session.current_trail().map(|t| t.width), Some(1.5));
    let catalog = fixture.store().load_catalog("a", Extension::Wfc1).expect("Should load catalog");
    assert_eq!(catalog.find(1).map(|t| t.width), Some(1.5));
}
