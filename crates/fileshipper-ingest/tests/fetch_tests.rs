//! End-to-end fetch tests against real directories and an on-disk imports file
//!
//! Covers:
//! - Resolution through `imports.ini`
//! - Single-file and wildcard fetches for every text format
//! - Import settings as stored by the form layer
//! - Configuration re-read on every call

use fileshipper_ingest::{
    FetchRequest, FetchResult, Format, ImportSettings, IniFile, SourceResolver,
};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// A data directory plus an imports file pointing at it
struct Fixture {
    data: TempDir,
    config: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            data: tempfile::tempdir().unwrap(),
            config: tempfile::tempdir().unwrap(),
        };
        fixture.write_imports(&format!("[hosts]\nbasedir = {}\n", fixture.basedir()));
        fixture
    }

    fn basedir(&self) -> String {
        self.data.path().to_string_lossy().into_owned()
    }

    fn imports_path(&self) -> std::path::PathBuf {
        self.config.path().join("imports.ini")
    }

    fn write_imports(&self, content: &str) {
        std::fs::write(self.imports_path(), content).unwrap();
    }

    fn write(&self, name: &str, content: &str) {
        std::fs::write(self.data.path().join(name), content).unwrap();
    }

    fn resolver(&self) -> SourceResolver<IniFile> {
        SourceResolver::new(IniFile::new(self.imports_path()))
    }

    fn fetch(&self, file: &str, format: Format) -> FetchResult {
        self.resolver()
            .fetch(&FetchRequest::new(self.basedir(), file, format))
            .unwrap()
    }
}

fn records(result: FetchResult) -> Vec<Value> {
    match result {
        FetchResult::Records(records) => records.into_iter().map(Value::Object).collect(),
        FetchResult::Files(_) => panic!("expected a single-file result"),
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolve_through_imports_file() {
    let fixture = Fixture::new();
    let section = fixture.resolver().resolve(&fixture.basedir()).unwrap();
    assert_eq!(section.name, "hosts");
    assert!(!section.remote);
}

#[test]
fn test_unconfigured_basedir_fails() {
    let fixture = Fixture::new();
    let err = fixture.resolver().resolve("/srv/unknown").unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("/srv/unknown"));
}

#[test]
fn test_configuration_is_reread_on_every_call() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver();
    let other = tempfile::tempdir().unwrap();
    let other_dir = other.path().to_string_lossy().into_owned();

    assert!(resolver.resolve(&other_dir).is_err());

    fixture.write_imports(&format!(
        "[hosts]\nbasedir = {}\n\n[other]\nbasedir = {}\n",
        fixture.basedir(),
        other_dir
    ));
    assert_eq!(resolver.resolve(&other_dir).unwrap().name, "other");
}

#[test]
fn test_list_base_directories_skips_missing() {
    let fixture = Fixture::new();
    fixture.write_imports(&format!(
        "[hosts]\nbasedir = {}\n\n[gone]\nbasedir = /nonexistent/fileshipper\n",
        fixture.basedir()
    ));

    let dirs = fixture.resolver().list_base_directories().unwrap();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs.get(&fixture.basedir()).map(String::as_str), Some("hosts"));
}

// ============================================================================
// Formats
// ============================================================================

#[test]
fn test_fetch_csv_with_settings() {
    let fixture = Fixture::new();
    fixture.write("hosts.csv", "host;zone;note\nweb1;dmz;\n'db;1';core;primary\n");

    let settings = ImportSettings::from_json(&format!(
        r#"{{"basedir": "{}", "file_name": "hosts.csv", "file_format": "csv",
            "csv_delimiter": ";", "csv_enclosure": "'"}}"#,
        fixture.basedir()
    ))
    .unwrap();

    let result = fixture.resolver().fetch(&settings.to_request().unwrap()).unwrap();
    assert_eq!(
        records(result),
        vec![
            json!({"host": "web1", "zone": "dmz", "note": null}),
            json!({"host": "db;1", "zone": "core", "note": "primary"}),
        ]
    );
}

#[test]
fn test_csv_column_mismatch_names_file_and_row() {
    let fixture = Fixture::new();
    fixture.write("hosts.csv", "a,b,c\n1,2\n");

    let err = fixture
        .resolver()
        .fetch(&FetchRequest::new(fixture.basedir(), "hosts.csv", Format::Csv))
        .unwrap_err();
    assert!(err.is_data_format());
    let message = err.to_string();
    assert!(message.contains("hosts.csv"), "{}", message);
    assert!(message.contains("row 1"), "{}", message);
}

#[test]
fn test_fetch_json_keyed_collection() {
    let fixture = Fixture::new();
    fixture.write(
        "hosts.json",
        r#"{"web1": {"address": "10.0.0.1", "vars": {"os": "linux"}}, "web2": {"address": "10.0.0.2"}}"#,
    );

    let rows = records(fixture.fetch("hosts.json", Format::Json));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["vars"], json!({"os": "linux"}));
}

#[cfg(feature = "yaml")]
#[test]
fn test_fetch_yaml() {
    let fixture = Fixture::new();
    fixture.write(
        "hosts.yaml",
        "- name: web1\n  disks:\n    0: sda\n    1: sdb\n  labels: {0: a, env: prod}\n  notes: ''\n",
    );

    let rows = records(fixture.fetch("hosts.yaml", Format::Yaml));
    assert_eq!(
        rows,
        vec![json!({
            "name": "web1",
            "disks": ["sda", "sdb"],
            "labels": {"0": "a", "env": "prod"},
            "notes": ""
        })]
    );
}

#[cfg(feature = "xml")]
#[test]
fn test_fetch_xml() {
    let fixture = Fixture::new();
    fixture.write(
        "hosts.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <hosts>
          <host id="1"><name>web1</name><group>web</group><group>linux</group></host>
          <host id="2"><name>db1</name></host>
        </hosts>"#,
    );

    let rows = records(fixture.fetch("hosts.xml", Format::Xml));
    assert_eq!(
        rows,
        vec![
            json!({"@attributes": {"id": "1"}, "name": "web1", "group": ["web", "linux"]}),
            json!({"@attributes": {"id": "2"}, "name": "db1"}),
        ]
    );
}

// ============================================================================
// Wildcard
// ============================================================================

#[test]
fn test_wildcard_fetch_orders_files_by_name() {
    let fixture = Fixture::new();
    for name in ["a.csv", "c.csv", "b.csv"] {
        fixture.write(name, &format!("file\n{}\n", name));
    }
    fixture.write(".hidden.csv", "file\nhidden\n");

    let FetchResult::Files(files) = fixture.fetch("*", Format::Csv) else {
        panic!("expected a wildcard result");
    };

    assert_eq!(files.keys().collect::<Vec<_>>(), vec!["a.csv", "b.csv", "c.csv"]);
    assert_eq!(files["c.csv"][0]["file"], json!("c.csv"));

    let serialized = serde_json::to_string(&FetchResult::Files(files)).unwrap();
    let a = serialized.find("a.csv").unwrap();
    let b = serialized.find("b.csv").unwrap();
    assert!(a < b);
}

#[test]
fn test_wildcard_fetch_fails_as_a_whole() {
    let fixture = Fixture::new();
    fixture.write("a.json", r#"[{"ok": true}]"#);
    fixture.write("b.json", r#"[{"ok": true},]"#);

    let err = fixture
        .resolver()
        .fetch(&FetchRequest::new(fixture.basedir(), "*", Format::Json))
        .unwrap_err();
    assert!(err.is_data_format());
}

#[test]
fn test_columns_of_wildcard_fetch() {
    let fixture = Fixture::new();
    fixture.write("a.csv", "zone,host\ndmz,web1\n");
    fixture.write("b.csv", "other\nx\n");

    let columns = fixture
        .resolver()
        .list_columns(&FetchRequest::new(fixture.basedir(), "*", Format::Csv))
        .unwrap();
    assert_eq!(columns, vec!["zone", "host"]);
}

#[test]
fn test_enum_files_lists_wildcard_first() {
    let fixture = Fixture::new();
    fixture.write("z.csv", "");
    fixture.write("m.csv", "");
    std::fs::create_dir(Path::new(&fixture.basedir()).join("archive")).unwrap();

    let files = fixture.resolver().enum_files(&fixture.basedir()).unwrap();
    assert_eq!(files, vec!["*", "m.csv", "z.csv"]);
}
