use module_forge::error::ForgeError;
use module_forge::paths::ModuleNames;
use module_forge::routes::{self, RemoveOutcome, RouteLedger};
use std::fs;
use tempfile::TempDir;

fn routes_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("routes/module-generated.php")
}

#[test]
fn init_creates_the_scaffold_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = routes_path(&dir);

    assert!(RouteLedger::init(&path).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), routes::SCAFFOLD);
    assert!(!RouteLedger::init(&path).unwrap());
}

#[test]
fn pristine_scaffold_survives_load_and_save_byte_identical() {
    let dir = TempDir::new().unwrap();
    let path = routes_path(&dir);
    RouteLedger::init(&path).unwrap();

    RouteLedger::load(&path).unwrap().save().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), routes::SCAFFOLD);
}

#[test]
fn insert_then_remove_restores_the_original_file() {
    let dir = TempDir::new().unwrap();
    let path = routes_path(&dir);
    RouteLedger::init(&path).unwrap();
    let names = ModuleNames::derive("EventCandidate");

    let mut ledger = RouteLedger::load(&path).unwrap();
    ledger
        .insert_block("eventCandidate", routes::route_block_body(&names))
        .unwrap();
    ledger.save().unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("// eventCandidate Start"));
    assert!(written.contains("// eventCandidate End"));
    assert!(written.contains("'all-event-candidate-records'"));
    assert!(written.contains("EventCandidateController"));

    let mut ledger = RouteLedger::load(&path).unwrap();
    assert_eq!(ledger.remove_block("eventCandidate"), RemoveOutcome::Removed);
    ledger.save().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), routes::SCAFFOLD);
}

#[test]
fn removing_one_block_leaves_siblings_intact() {
    let dir = TempDir::new().unwrap();
    let path = routes_path(&dir);
    RouteLedger::init(&path).unwrap();

    let mut ledger = RouteLedger::load(&path).unwrap();
    for name in ["Author", "Book"] {
        let names = ModuleNames::derive(name);
        ledger
            .insert_block(&names.camel, routes::route_block_body(&names))
            .unwrap();
    }
    ledger.save().unwrap();

    let mut ledger = RouteLedger::load(&path).unwrap();
    assert_eq!(ledger.block_names().collect::<Vec<_>>(), ["author", "book"]);
    assert!(ledger.contains("author"));
    assert_eq!(ledger.remove_block("author"), RemoveOutcome::Removed);
    assert_eq!(ledger.remove_block("author"), RemoveOutcome::NotFound);
    ledger.save().unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(!written.contains("// author Start"));
    assert!(written.contains("// book Start"));
    assert!(written.contains("'all-book-records'"));
}

#[test]
fn duplicate_block_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = routes_path(&dir);
    RouteLedger::init(&path).unwrap();
    let names = ModuleNames::derive("Author");

    let mut ledger = RouteLedger::load(&path).unwrap();
    ledger
        .insert_block("author", routes::route_block_body(&names))
        .unwrap();
    let err = ledger
        .insert_block("author", routes::route_block_body(&names))
        .unwrap_err();
    assert!(matches!(err, ForgeError::Collision { .. }));
}

#[test]
fn mangled_files_are_reported_not_rewritten() {
    let dir = TempDir::new().unwrap();
    let path = routes_path(&dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "<?php\n\n// hand edited, markers gone\n").unwrap();

    let err = RouteLedger::load(&path).unwrap_err();
    assert!(matches!(err, ForgeError::Structural(_)));
    // the file itself is untouched
    assert!(fs::read_to_string(&path).unwrap().contains("hand edited"));
}
