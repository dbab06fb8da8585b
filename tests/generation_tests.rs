use assert_matches::assert_matches;
use module_forge::error::{ForgeError, GenerationStep};
use module_forge::paths::{ArtifactPaths, ModuleNames};
use module_forge::schema::{RelationKind, RelationshipSpec};
use module_forge::testing::sample_schema;
use module_forge::{EngineConfig, Orchestrator};
use std::fs;
use tempfile::TempDir;

fn workspace() -> (TempDir, EngineConfig, Orchestrator) {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::for_workspace(dir.path());
    let orchestrator = Orchestrator::ephemeral(config.clone()).unwrap();
    assert!(orchestrator.init_routes().unwrap());
    (dir, config, orchestrator)
}

#[test]
fn generate_produces_every_artifact_and_the_table() {
    let (_dir, config, orchestrator) = workspace();

    let report = orchestrator
        .generate(sample_schema("EventCandidate"), Some(1))
        .unwrap();

    assert_eq!(report.module, "EventCandidate");
    assert_eq!(report.table, "event_candidates");
    assert_eq!(report.route_block, "eventCandidate");
    assert_eq!(report.artifacts.len(), 10);
    for artifact in &report.artifacts {
        assert!(
            artifact.path.exists(),
            "missing {} at {}",
            artifact.kind,
            artifact.path.display()
        );
    }

    let paths = ArtifactPaths::new(&config);
    let names = ModuleNames::derive("EventCandidate");
    let model = fs::read_to_string(paths.model(&names)).unwrap();
    assert!(model.contains("class EventCandidate extends Model"));

    let routes = fs::read_to_string(paths.routes_file()).unwrap();
    assert!(routes.contains("// eventCandidate Start"));
    assert!(routes.contains("'all-event-candidate-records'"));

    let row = orchestrator
        .store()
        .get_module_by_name("EventCandidate")
        .unwrap()
        .expect("module row");
    assert_eq!(row.id, report.module_id);

    // the table really exists and is empty
    let count: i64 = orchestrator
        .store()
        .connection()
        .query_row("SELECT count(*) FROM event_candidates", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn duplicate_slug_fails_validation_before_any_file_is_written() {
    let (_dir, config, orchestrator) = workspace();
    orchestrator
        .generate(sample_schema("EventCandidate"), None)
        .unwrap();

    let mut second = sample_schema("EventLog");
    second.slug = "event-candidate".to_string();
    let err = orchestrator.generate(second, None).unwrap_err();

    assert_matches!(err, ForgeError::Validation(report) => {
        assert!(report.errors.iter().any(|e| e.field == "slug"));
    });

    let paths = ArtifactPaths::new(&config);
    let names = ModuleNames::derive("EventLog");
    assert!(!paths.model(&names).exists());
    assert!(orchestrator
        .store()
        .get_module_by_name("EventLog")
        .unwrap()
        .is_none());
}

#[test]
fn migration_failure_removes_the_committed_metadata() {
    let (_dir, _config, orchestrator) = workspace();
    orchestrator
        .store()
        .connection()
        .execute_batch("CREATE TABLE widgets (id INTEGER PRIMARY KEY)")
        .unwrap();

    let err = orchestrator
        .generate(sample_schema("Widget"), None)
        .unwrap_err();

    assert_matches!(
        err,
        ForgeError::Partial {
            step: GenerationStep::MigrationExecution,
            ..
        }
    );
    assert!(orchestrator
        .store()
        .get_module_by_name("Widget")
        .unwrap()
        .is_none());
}

#[test]
fn belongs_to_relationship_resolves_the_target_table() {
    let (_dir, config, orchestrator) = workspace();
    let author = orchestrator
        .generate(sample_schema("Author"), None)
        .unwrap();

    let mut book = sample_schema("Book");
    book.relationships.push(RelationshipSpec {
        kind: RelationKind::BelongsTo,
        module: author.module_id,
        foreign_key: None,
        local_key: None,
        pivot_table: None,
        pivot_columns: Vec::new(),
    });
    orchestrator.generate(book, None).unwrap();

    let paths = ArtifactPaths::new(&config);
    let names = ModuleNames::derive("Book");
    let model = fs::read_to_string(paths.model(&names)).unwrap();
    assert!(model.contains("public function author()"));
    assert!(model.contains("belongsTo"));

    // the foreign key column landed in the table
    let sql: String = orchestrator
        .store()
        .connection()
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'books'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(sql.contains("author_id"));
}
