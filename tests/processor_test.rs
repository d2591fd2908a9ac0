use sourcegen::config::{ProjectConfig, VariableMap};
use sourcegen::error::Error;
use sourcegen::loader::TemplateLoader;
use sourcegen::manifest::{Fragment, Manifest, ManifestEntry};
use sourcegen::processor::Processor;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn entry(output: &str, fragments: &[&str], when: Option<&str>) -> ManifestEntry {
    ManifestEntry {
        output: output.to_string(),
        fragments: fragments.iter().map(|f| Fragment::Path(f.to_string())).collect(),
        when: when.map(String::from),
    }
}

fn example_variables() -> VariableMap {
    let config = ProjectConfig::parse(
        Path::new("project.yml"),
        r#"
library_name: libfoo
library_name_suffix: foo
structure_name: mz_header
prefix: exe
flags:
  with_python: false
  with_tests: true
"#,
    )
    .unwrap();
    config.variable_map().unwrap()
}

fn seed_templates(templates: &TempDir) {
    write_file(templates.path(), "header.c", "/* ${library_name} */\n");
    write_file(
        templates.path(),
        "initialize.c",
        "int ${prefix}_${structure_name}_initialize(void);\n",
    );
    write_file(
        templates.path(),
        "read_data.c",
        "int ${prefix}_${structure_name}_read_data(void);\n",
    );
}

#[test]
fn test_generates_composed_output() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![entry(
        "${library_name}/${library_name}_${structure_name}.c",
        &["header.c", "initialize.c", "read_data.c"],
        None,
    )]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    let summary = processor.run(&manifest).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 0);

    let generated = fs::read_to_string(out.path().join("libfoo/libfoo_mz_header.c")).unwrap();
    assert_eq!(
        generated,
        "/* libfoo */\nint exe_mz_header_initialize(void);\nint exe_mz_header_read_data(void);\n"
    );
}

#[test]
fn test_guard_skips_entry() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![
        entry("always.c", &["header.c"], None),
        entry("python.c", &["header.c"], Some("with_python")),
        entry("tests.c", &["header.c"], Some("all(with_tests, not(with_python))")),
    ]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    let summary = processor.run(&manifest).unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped, 1);
    assert!(out.path().join("always.c").exists());
    assert!(!out.path().join("python.c").exists());
    assert!(out.path().join("tests.c").exists());
}

#[test]
fn test_collision_writes_nothing() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![
        entry("${library_name}.c", &["header.c"], None),
        entry("libfoo.c", &["initialize.c"], None),
    ]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    match processor.run(&manifest) {
        Err(Error::OutputPathCollision { path, first, second }) => {
            assert!(path.ends_with("libfoo.c"));
            assert_eq!(first, "${library_name}.c");
            assert_eq!(second, "libfoo.c");
        }
        other => panic!("Expected OutputPathCollision, got {:?}", other),
    }
    assert!(!out.path().join("libfoo.c").exists());
}

#[test]
fn test_output_path_escape_rejected() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![entry("../escape.c", &["header.c"], None)]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    assert!(matches!(processor.run(&manifest), Err(Error::PathEscapesRoot { .. })));
    assert!(!out.path().parent().unwrap().join("escape.c").exists());
}

#[test]
fn test_unknown_variable_aborts_after_earlier_writes() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);
    write_file(templates.path(), "broken.c", "${does_not_exist}");

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![
        entry("first.c", &["header.c"], None),
        entry("second.c", &["broken.c"], None),
        entry("third.c", &["header.c"], None),
    ]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    match processor.run(&manifest) {
        Err(Error::UnknownVariable { name, .. }) => assert_eq!(name, "does_not_exist"),
        other => panic!("Expected UnknownVariable, got {:?}", other),
    }
    // Already-written outputs stay; nothing past the failure is written.
    assert!(out.path().join("first.c").exists());
    assert!(!out.path().join("second.c").exists());
    assert!(!out.path().join("third.c").exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![entry("a/b/out.c", &["header.c"], None)]);

    let processor = Processor::new(&loader, &variables, out.path(), true, 1);
    let summary = processor.run(&manifest).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_empty_fragment_list_rejected() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![ManifestEntry {
        output: "a.c".to_string(),
        fragments: Vec::new(),
        when: None,
    }]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    match processor.run(&manifest) {
        Err(Error::EmptyFragmentList { output }) => assert_eq!(output, "a.c"),
        other => panic!("Expected EmptyFragmentList, got {:?}", other),
    }
}

#[test]
fn test_unknown_guard_flag_fails() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![entry("a.c", &["header.c"], Some("no_such_flag"))]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    assert!(matches!(processor.run(&manifest), Err(Error::GuardEvalFailed { .. })));
}

#[test]
fn test_cancellation_stops_run() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![entry("a.c", &["header.c"], None)]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    processor.cancel_flag().cancel();
    let summary = processor.run(&manifest).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.written, 0);
    assert!(!out.path().join("a.c").exists());
}

#[test]
fn test_no_temporary_files_left_behind() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![
        entry("one/a.c", &["header.c"], None),
        entry("two/b.c", &["header.c", "initialize.c"], None),
    ]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 1);
    processor.run(&manifest).unwrap();

    for file in walkdir::WalkDir::new(out.path()) {
        let file = file.unwrap();
        let name = file.file_name().to_string_lossy();
        assert!(!name.starts_with(".sourcegen-"), "leftover temp file: {}", name);
    }
}

fn run_into(manifest: &Manifest, variables: &VariableMap, templates: &TempDir, jobs: usize) -> TempDir {
    let out = TempDir::new().unwrap();
    let loader = TemplateLoader::new(templates.path());
    let processor = Processor::new(&loader, variables, out.path(), false, jobs);
    processor.run(manifest).unwrap();
    out
}

#[test]
fn test_determinism_across_runs_and_jobs() {
    let templates = TempDir::new().unwrap();
    seed_templates(&templates);

    let variables = example_variables();
    let manifest = Manifest::new(vec![
        entry("${library_name}/a.c", &["header.c", "initialize.c"], None),
        entry("${library_name}/b.c", &["read_data.c"], None),
        entry("tests/c.c", &["header.c", "read_data.c", "initialize.c"], None),
    ]);

    let first = run_into(&manifest, &variables, &templates, 1);
    let second = run_into(&manifest, &variables, &templates, 1);
    let parallel = run_into(&manifest, &variables, &templates, 4);

    assert!(!dir_diff::is_different(first.path(), second.path()).unwrap());
    assert!(!dir_diff::is_different(first.path(), parallel.path()).unwrap());
}

#[test]
fn test_parallel_failure_reports_first_in_manifest_order() {
    let templates = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    seed_templates(&templates);
    write_file(templates.path(), "bad_one.c", "${first_missing}");
    write_file(templates.path(), "bad_two.c", "${second_missing}");

    let variables = example_variables();
    let loader = TemplateLoader::new(templates.path());
    let manifest = Manifest::new(vec![
        entry("a.c", &["bad_one.c"], None),
        entry("b.c", &["bad_two.c"], None),
    ]);

    let processor = Processor::new(&loader, &variables, out.path(), false, 2);
    match processor.run(&manifest) {
        Err(Error::UnknownVariable { name, .. }) => assert_eq!(name, "first_missing"),
        other => panic!("Expected UnknownVariable, got {:?}", other),
    }
}
