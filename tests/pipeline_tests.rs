//! End-to-end conversion runs over CSV inputs

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use sheetconv::config::{Config, ExportConfig, LineBreak};
use sheetconv::error::ConvertError;
use sheetconv::filter::GroupFilter;
use sheetconv::runner::run;
use sheetconv::session::RunStatus;
use tempfile::TempDir;

const ITEMS: &str = "\
Id,Name,Price,Tags
*int,string,float,string[]
\"@range(1,999)\",\"len(1,16)\",,
1,sword,12.5,\"melee,metal\"
2,shield,,
# retired,,,
3,bow,7,ranged
";

fn write(dir: &Path, name: &str, text: &str) {
    if let Some(parent) = dir.join(name).parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(dir.join(name), text).unwrap();
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_per_file_and_aggregated_targets() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    write(&input, "Items.csv", ITEMS);
    write(&input, "nested/Skills.csv", "Key,Power\n*string,int\nfire,3\n");
    write(&input, "!Draft.csv", "not,a\ntable,at all\n");

    let out = dir.path().join("out");
    let config = Config::default()
        .with_inputs(vec![input])
        .with_export(ExportConfig::new("js", out.join("js")).with_template("exports.{name} = {data};"))
        .with_export(ExportConfig::new("json", out.join("all.json")).with_ids(false));

    let report = run(&config).await.unwrap();
    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(report.artifacts.len(), 3);

    let names: Vec<_> = report.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Items", "Skills"]);
    assert_eq!(report.tables[0].rows, 3);

    let js = fs::read_to_string(out.join("js").join("Skills.js")).unwrap();
    assert_eq!(js, "exports.Skills = {fire:{Key:'fire',Power:3},_ids:['fire']};");

    let all = read_json(&out.join("all.json"));
    assert_eq!(
        all,
        serde_json::json!({
            "Items": {
                "1": {"Id": 1, "Name": "sword", "Price": 12.5, "Tags": ["melee", "metal"]},
                "2": {"Id": 2, "Name": "shield"},
                "3": {"Id": 3, "Name": "bow", "Price": 7.0, "Tags": ["ranged"]}
            },
            "Skills": {"fire": {"Key": "fire", "Power": 3}}
        })
    );
}

#[tokio::test]
async fn test_defaults_if_empty() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Items.csv", ITEMS);
    let path = dir.path().join("out.json");
    let config = Config::default()
        .with_inputs(vec![dir.path().join("Items.csv")])
        .with_export(
            ExportConfig::new("json", &path)
                .with_defaults_if_empty(true)
                .with_ids(false),
        );

    run(&config).await.unwrap();
    let all = read_json(&path);
    assert_eq!(
        all["Items"]["2"],
        serde_json::json!({"Id": 2, "Name": "shield", "Price": 0.0, "Tags": []})
    );
}

#[tokio::test]
async fn test_recorded_errors_drop_rows() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "Items.csv",
        "Id,Level\n*int,uint8\n1,5\n2,999\n3,x\n4,7\n",
    );
    let path = dir.path().join("out").join("all.json");
    let config = Config::default()
        .with_inputs(vec![dir.path().to_path_buf()])
        .with_export(ExportConfig::new("json", &path));

    let report = run(&config).await.unwrap();
    assert_eq!(report.status, RunStatus::CompletedWithErrors(2));
    let cells: Vec<_> = report
        .errors
        .iter()
        .map(|e| e.location.cell.clone().unwrap_or_default())
        .collect();
    assert_eq!(cells, vec!["B4", "B5"]);

    let all = read_json(&path);
    assert_eq!(all["Items"]["_ids"], serde_json::json!([1, 4]));
}

#[tokio::test]
async fn test_type_check_disabled() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Items.csv", "Id,Level\n*int,uint8\n1,999\n");
    let config = Config::default()
        .with_inputs(vec![dir.path().to_path_buf()])
        .with_type_check(false);

    let report = run(&config).await.unwrap();
    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(report.tables[0].rows, 1);
}

#[tokio::test]
async fn test_custom_data_cell_sits_above_header() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Items.csv", "version 3,\nId,Name\n*int,string\n1,a\n");
    let path = dir.path().join("all.json");

    // without it the note is read as the header row
    let plain = Config::default().with_inputs(vec![dir.path().join("Items.csv")]);
    assert!(matches!(
        run(&plain).await.err().unwrap(),
        ConvertError::TypeRowMissing { .. }
    ));

    let config = Config::default()
        .with_inputs(vec![dir.path().join("Items.csv")])
        .with_custom_data_cell("A1")
        .with_export(ExportConfig::new("json", &path).with_ids(false));
    let report = run(&config).await.unwrap();
    assert_eq!(report.status, RunStatus::Clean);
    assert_eq!(report.tables[0].columns, 2);
    assert_eq!(
        read_json(&path),
        serde_json::json!({"Items": {"1": {"Id": 1, "Name": "a"}}})
    );
}

#[tokio::test]
async fn test_duplicate_table_across_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/Items.csv", "Id\n*int\n1\n");
    write(dir.path(), "b/Items.csv", "Id\n*int\n2\n");
    let out = dir.path().join("out").join("all.js");
    let config = Config::default()
        .with_inputs(vec![dir.path().to_path_buf()])
        .with_export(ExportConfig::new("js", &out));

    match run(&config).await {
        Err(ConvertError::DuplicateTable { name, first, second }) => {
            assert_eq!(name, "Items");
            assert_eq!(first, dir.path().join("a").join("Items.csv"));
            assert_eq!(second, dir.path().join("b").join("Items.csv"));
        }
        other => panic!("expected DuplicateTable, got {:?}", other.map(|r| r.status)),
    }
    assert!(!out.exists());
}

#[tokio::test]
async fn test_missing_type_row_aborts() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Items.csv", "Id,Name\nint,string\n1,a\n");
    let out = dir.path().join("out");
    let config = Config::default()
        .with_inputs(vec![dir.path().join("Items.csv")])
        .with_export(ExportConfig::new("js", &out));

    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, ConvertError::TypeRowMissing { .. }));
    assert!(err.to_string().contains("A2"));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_bad_template_fails_before_reading() {
    let config = Config::default()
        .with_inputs(vec!["/does/not/exist".into()])
        .with_export(ExportConfig::new("js", "out").with_template("{data}"));
    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, ConvertError::MissingPlaceholder { placeholder: "{name}" }));
}

#[tokio::test]
async fn test_group_filter_and_crlf() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Items.csv", ITEMS);
    let out = dir.path().join("out");
    // CSV headers carry no color, so every column is in the default group
    let config = Config::default()
        .with_inputs(vec![dir.path().to_path_buf()])
        .with_line_break(LineBreak::CrLf)
        .with_export(
            ExportConfig::new("json", &out)
                .with_pretty(true)
                .with_group_filter(GroupFilter::new().with_rule("Items", ["client"])),
        )
        .with_export(ExportConfig::new("json", out.join("default")).with_pretty(true));

    let report = run(&config).await.unwrap();
    assert_eq!(report.artifacts, vec![out.join("default").join("Items.json")]);

    let text = fs::read_to_string(out.join("default").join("Items.json")).unwrap();
    assert!(text.contains("\r\n"));
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[tokio::test]
async fn test_repeated_runs_are_independent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Items.csv", ITEMS);
    let config = Config::default().with_inputs(vec![dir.path().to_path_buf()]);

    let first = run(&config).await.unwrap();
    let second = run(&config).await.unwrap();
    assert_eq!(first.tables, second.tables);
}
