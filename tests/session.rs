use std::{fs, rc::Rc};

use geoscript::{
    console::{Console, Level, MemorySink},
    repl::Reply,
    session::SessionError,
    ConsolePanel, Repl, RunOutcome, Session, SessionConfig, Status, Value,
};
use indexmap::IndexMap;
use tempfile::tempdir;

const COLLECTION: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": { "type": "Point", "coordinates": [15.0, 37.75] },
      "properties": { "name": "Etna" }
    }
  ]
}"#;

fn session() -> (Session, Rc<MemorySink>) {
    let original = MemorySink::new();
    let console = Console::intercept(Rc::clone(&original));
    (Session::new(SessionConfig::default(), console), original)
}

fn point() -> Value {
    let mut entries = IndexMap::new();
    entries.insert("type".into(), Value::string("Point"));
    entries.insert(
        "coordinates".into(),
        Value::array(vec![Value::float(1.5), Value::float(2.5)]),
    );
    Value::map(entries)
}

#[test]
fn layer_ids_are_never_reused() {
    let (mut session, _) = session();
    assert_eq!(session.add_input_layer(point(), None), "layer1");
    assert_eq!(session.add_input_layer(point(), None), "layer2");

    session.remove_input_layer("layer1").expect("remove");
    assert_eq!(session.add_input_layer(point(), None), "layer3");

    let ids: Vec<&str> = session.layers().map(|layer| layer.id.as_str()).collect();
    assert_eq!(ids, ["layer2", "layer3"]);
}

#[test]
fn removing_an_unknown_layer_fails() {
    let (mut session, _) = session();
    let err = session.remove_input_layer("layer9").expect_err("unknown");
    assert!(matches!(err, SessionError::UnknownLayer(id) if id == "layer9"));
}

#[test]
fn bindings_expose_layers_all_layers_and_scratch() {
    let (mut session, _) = session();
    let data = point();
    session.add_input_layer(data.clone(), None);

    let bindings = session.bindings();
    assert_eq!(bindings.names(), ["layer1", "inputLayers", "scratch"]);
    assert!(Value::same(&bindings.get("layer1").expect("layer1"), &data));

    let all = bindings
        .get("inputLayers")
        .and_then(|value| value.array_snapshot())
        .expect("array of layers");
    assert_eq!(all.len(), 1);
    assert!(Value::same(&all[0], &data));
    assert!(bindings.get("scratch").expect("scratch").is_unit());
}

#[test]
fn displayable_result_replaces_the_scratch_layer() {
    let (mut session, _) = session();
    let outcome = session.run_script("return { type: \"FeatureCollection\", features: [] }");

    assert!(matches!(outcome, RunOutcome::Displayed));
    assert_eq!(session.status(), Status::Done);
    let json = session.scratch_json().expect("serialize").expect("scratch set");
    assert_eq!(json, "{\n  \"type\": \"FeatureCollection\",\n  \"features\": []\n}");
}

#[test]
fn scratch_is_bound_on_the_next_run() {
    let (mut session, _) = session();
    session.add_input_layer(point(), None);
    session.run_script("return layer1");
    assert!(Value::same(
        session.scratch().expect("scratch"),
        &session.layer("layer1").expect("layer").data
    ));

    let outcome = session.run_script("return [scratch, layer1]");
    assert!(matches!(outcome, RunOutcome::Displayed));
}

#[test]
fn non_geojson_result_warns_and_keeps_scratch() {
    let (mut session, original) = session();
    session.run_script("return { type: \"Point\", coordinates: [0, 0] }");
    let before = session.scratch().cloned().expect("scratch");

    let outcome = session.run_script("return 42");

    assert!(matches!(outcome, RunOutcome::NotDisplayable(_)));
    assert_eq!(session.status(), Status::Done);
    assert!(Value::same(session.scratch().expect("scratch"), &before));
    let (level, message) = original.events().pop().expect("warning logged");
    assert_eq!(level, Level::Warn);
    assert!(message.contains("not GeoJSON"), "{message}");
}

#[test]
fn absent_result_changes_nothing() {
    let (mut session, original) = session();
    for source in ["", "return none", "var x = 1"] {
        assert!(matches!(session.run_script(source), RunOutcome::NoResult));
        assert_eq!(session.status(), Status::Done);
    }
    assert!(session.scratch().is_none());
    assert!(original.events().is_empty());
}

#[test]
fn failure_logs_the_trace_and_sets_error_status() {
    let (mut session, original) = session();
    session.run_script("return { type: \"Point\", coordinates: [0, 0] }");

    let outcome = session.run_script("return missing");

    assert!(outcome.is_failure());
    assert_eq!(session.status(), Status::Error);
    assert!(session.scratch().is_some());
    let (level, message) = original.events().pop().expect("error logged");
    assert_eq!(level, Level::Error);
    assert!(message.contains("undefined variable `missing`"), "{message}");
    assert!(message.contains("at <script>"), "{message}");
}

#[test]
fn syntax_error_keeps_the_previous_scratch_layer() {
    let (mut session, original) = session();
    session.run_script("return { type: \"Point\", coordinates: [0, 0] }");
    let before = session.scratch().cloned().expect("scratch");
    let json_before = session.scratch_json().expect("serialize");

    let outcome = session.run_script("return { type: ");

    assert!(matches!(&outcome, RunOutcome::Failed(err) if err.is_compile()));
    assert_eq!(session.status(), Status::Error);
    assert!(Value::same(session.scratch().expect("scratch"), &before));
    assert_eq!(session.scratch_json().expect("serialize"), json_before);
    let (level, _) = original.events().pop().expect("error logged");
    assert_eq!(level, Level::Error);
}

#[test]
fn self_containing_result_is_not_displayed() {
    let (mut session, original) = session();
    let outcome = session.run_script("var a = [1]\nstd.collections.insert(a, 0, a)\nreturn a");

    assert!(matches!(outcome, RunOutcome::NotDisplayable(_)));
    assert!(session.scratch().is_none());
    let (level, message) = original.events().pop().expect("warning logged");
    assert_eq!(level, Level::Warn);
    assert!(message.contains("not GeoJSON"), "{message}");
}

#[test]
fn runaway_recursion_fails_the_run() {
    let (mut session, _) = session();
    let outcome = session.run_script("fn f() { return f() }\nreturn f()");
    match outcome {
        RunOutcome::Failed(err) => assert!(err.message().contains("maximum call depth")),
        _ => panic!("recursion should fail"),
    }
    assert_eq!(session.status(), Status::Error);
}

#[test]
fn clearing_resets_scratch_and_status() {
    let (mut session, _) = session();
    session.run_script("return { type: \"Point\", coordinates: [0, 0] }");
    session.clear_scratch_layer();

    assert_eq!(session.status(), Status::Cleared);
    assert!(session.scratch().is_none());
    assert!(session.scratch_json().expect("serialize").is_none());
}

#[test]
fn geojson_files_load_as_layers() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("volcanoes.geojson");
    fs::write(&path, COLLECTION).expect("write fixture");

    let (mut session, _) = session();
    let id = session.load_geojson_file(&path).expect("load");
    let layer = session.layer(&id).expect("layer");

    assert_eq!(layer.source.as_deref(), Some(path.display().to_string().as_str()));
    assert_eq!(
        layer.data.get_field("type").and_then(|v| v.as_str().map(String::from)),
        Some("FeatureCollection".to_string())
    );

    let outcome = session.run_script(
        "const names = std.collections.map(layer1.features, |f| f.properties.name)\n\
         console.log(names)\n\
         return layer1",
    );
    assert!(matches!(outcome, RunOutcome::Displayed));
}

#[test]
fn unreadable_files_are_reported() {
    let dir = tempdir().expect("temp dir");
    let broken = dir.path().join("broken.geojson");
    fs::write(&broken, "{ not json").expect("write fixture");

    let (mut session, original) = session();
    let err = session.load_geojson_file(&broken).expect_err("invalid JSON");
    assert!(matches!(err, SessionError::Parse { .. }));

    let err = session
        .load_geojson_file(dir.path().join("absent.geojson"))
        .expect_err("missing file");
    assert!(matches!(err, SessionError::Read { .. }));

    let levels: Vec<Level> = original.events().into_iter().map(|(level, _)| level).collect();
    assert_eq!(levels, [Level::Error, Level::Error]);
    assert_eq!(session.layers().count(), 0);
}

fn repl() -> (Repl, Rc<ConsolePanel>) {
    let console = Console::intercept(MemorySink::new());
    let panel = ConsolePanel::new();
    console.register_shared(panel.clone());
    let session = Session::new(SessionConfig::default(), console);
    (Repl::new(session, Rc::clone(&panel)), panel)
}

fn text(reply: Reply) -> String {
    match reply {
        Reply::Text(text) => text,
        Reply::Quit => panic!("unexpected quit"),
    }
}

#[test]
fn repl_runs_scripts_and_reports_status() {
    let (mut repl, panel) = repl();

    assert_eq!(text(repl.handle_line("console.log(\"hi\")")), "Done.");
    assert_eq!(
        text(repl.handle_line("return { type: \"Point\", coordinates: [1, 2] }")),
        "Done. scratch layer updated"
    );
    assert_eq!(text(repl.handle_line("return 1 + 2")), "Done. result: 3");
    assert_eq!(text(repl.handle_line("return nope")), "Error.");

    assert!(text(repl.handle_line(":console")).contains("[LOG] hi"));
    assert!(panel.line_count() >= 3);
}

#[test]
fn repl_commands_manage_layers_and_scratch() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("layer.geojson");
    fs::write(&path, COLLECTION).expect("write fixture");
    let (mut repl, _) = repl();

    assert_eq!(text(repl.handle_line(":layers")), "(no input layers)");
    let loaded = text(repl.handle_line(&format!(":load {}", path.display())));
    assert!(loaded.ends_with("as layer1"), "{loaded}");
    assert!(text(repl.handle_line(":layers")).starts_with("layer1\t("));

    assert_eq!(text(repl.handle_line(":scratch")), "(scratch layer is empty)");
    repl.handle_line("return layer1");
    assert!(text(repl.handle_line(":scratch")).contains("\"Etna\""));
    assert_eq!(text(repl.handle_line(":clear")), "Cleared.");

    assert_eq!(text(repl.handle_line(":remove layer1")), "removed layer1");
    assert!(text(repl.handle_line(":remove layer1")).contains("no input layer"));
    assert_eq!(text(repl.handle_line(":load")), "usage: :load <argument>");
    assert!(text(repl.handle_line(":bogus")).starts_with("unknown command"));
    assert_eq!(repl.handle_line(":quit"), Reply::Quit);
    assert_eq!(repl.session().status(), Status::Cleared);
}
