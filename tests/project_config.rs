use std::fs;
use std::path::PathBuf;

use foldgen::project::{Project, PROJECT_FILE};
use foldgen::{load_program, reducers, Value};

#[test]
fn test_fixture_project_defaults() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/organpipe");
    let project = Project::load(&root.join(PROJECT_FILE)).unwrap();
    assert_eq!(project.name, "organpipe");
    assert_eq!(project.entry, root.join("main.json"));
    assert_eq!(project.run.producer.as_deref(), Some("organpipe"));
    assert_eq!(project.log_filter.as_deref(), Some("foldgen=info"));

    let (_, module) = load_program(&project.entry).unwrap();
    let producer = project.run.producer.as_deref().unwrap();
    let args = project.run.args.iter().copied().map(Value::Int).collect();
    let generator = module.call(producer, args).unwrap();
    assert_eq!(reducers::sum(&module, &generator).unwrap(), 9);
}

#[test]
fn test_project_entry_in_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(PROJECT_FILE),
        "[project]\nname = \"tmp\"\nentry = \"src/prog.json\"\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/prog.json"),
        r#"{"items": [
            {"item": "producer",
             "head": {"mode": "callable", "name": "three", "params": []},
             "body": {"stmt": "delegate",
                      "source": {"expr": "range",
                                 "start": {"expr": "int", "value": 1},
                                 "stop": {"expr": "int", "value": 3}}}}
        ]}"#,
    )
    .unwrap();

    let found = Project::find(&dir.path().join("src")).unwrap();
    let project = Project::load(&found).unwrap();
    assert_eq!(project.entry, dir.path().join("src/prog.json"));

    let (program, module) = load_program(&project.entry).unwrap();
    assert!(program.find_producer("three").is_some());
    let generator = module.call("three", vec![]).unwrap();
    assert_eq!(reducers::count(&module, &generator).unwrap(), 3);
}

#[test]
fn test_missing_entry_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let errors = load_program(&dir.path().join("absent.json")).unwrap_err();
    assert!(errors[0].message.starts_with("cannot read"), "{}", errors[0].message);
}
