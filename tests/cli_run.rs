//! Diagnostic runner against a runtime description on disk

use clap::Parser;
use faces_util::cli::{run, Cli};
use faces_util::config_loader::ResolverConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const RUNTIME: &str = r#"
[[modules]]
id = 1
identifier = "com.example.guestbook.portlet"
import_package = "javax.faces, com.liferay.faces.util.context"
dynamic_import_package = "*"

[[modules.types]]
name = "com.example.guestbook.GuestbookBean"
annotations = ["javax.faces.bean.ManagedBean"]

[[modules]]
id = 2
identifier = "com.liferay.faces.util"
entries = ["com/liferay/faces/util/i18n/Messages.properties"]

[modules.documents]
"META-INF/faces-config.xml" = "<faces-config><factory><faces-context-factory>com.liferay.faces.util.context.FacesContextFactoryImpl</faces-context-factory></factory></faces-config>"
"META-INF/liferay-faces-util.taglib.xml" = "<facelet-taglib><namespace>http://liferay.com/faces/util</namespace><tag><component><component-type>javax.faces.Output</component-type></component></tag></facelet-taglib>"

[[modules.types]]
name = "com.liferay.faces.util.context.FacesContextFactoryImpl"

[[modules]]
id = 3
identifier = "com.liferay.faces.alloy"

[modules.documents]
"META-INF/faces-config.xml" = "<faces-config><component><component-class>com.liferay.faces.alloy.component.Button</component-class></component></faces-config>"

[[modules]]
id = 9
identifier = "org.glassfish.javax.faces"

[[wires]]
requirer = 1
provider = 2
kind = "static"

[[wires]]
requirer = 1
provider = 9
kind = "static"

[[wires]]
requirer = 1
provider = 3
kind = "dynamic"

[default_loader]
resources = ["com/liferay/faces/util/i18n/Messages.properties"]
"#;

fn runtime_file() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runtime.toml");
    fs::write(&path, RUNTIME).unwrap();
    (dir, path)
}

fn run_command(args: &[&str]) -> Vec<String> {
    let (_dir, path) = runtime_file();
    let mut argv = vec!["faces-modules", "--runtime", path.to_str().unwrap(), "--root", "1"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    run(&cli, ResolverConfig::default()).unwrap()
}

#[test]
fn discover_lists_modules_in_priority_order() {
    let lines = run_command(&["discover"]);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("RootModule"));
    assert!(lines[1].starts_with("FrameworkRuntime"));
    assert!(lines[2].starts_with("UtilityLibrary"));
    assert!(!lines.iter().any(|line| line.contains("alloy")));
}

#[test]
fn resolve_type_reports_defining_module() {
    let lines = run_command(&["resolve-type", "com.liferay.faces.util.context.FacesContextFactoryImpl"]);
    assert_eq!(lines, vec!["com.liferay.faces.util.context.FacesContextFactoryImpl -> module #2"]);

    let lines = run_command(&["resolve-type", "com.example.Missing"]);
    assert_eq!(lines, vec!["com.example.Missing: not found"]);
}

#[test]
fn resolve_resource_all_merges_default_loader() {
    let lines = run_command(&["resolve-resource", "--all", "com/liferay/faces/util/i18n/Messages.properties"]);
    assert_eq!(
        lines,
        vec![
            "bundle://2/com/liferay/faces/util/i18n/Messages.properties",
            "file:///default/com/liferay/faces/util/i18n/Messages.properties",
        ]
    );
}

#[test]
fn scan_annotations_groups_by_annotation() {
    let lines = run_command(&["scan-annotations"]);
    assert_eq!(lines, vec!["javax.faces.bean.ManagedBean", "  com.example.guestbook.GuestbookBean"]);
}

#[test]
fn filter_configs_keeps_documents_of_discovered_modules() {
    let lines = run_command(&["filter-configs"]);
    assert_eq!(lines, vec!["retained bundle://2/META-INF/faces-config.xml"]);
}

#[test]
fn filter_configs_handles_tag_libraries() {
    let lines = run_command(&["filter-configs", "--taglibs"]);
    assert_eq!(lines, vec!["retained bundle://2/META-INF/liferay-faces-util.taglib.xml"]);
}

#[test]
fn unreadable_runtime_description_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let cli = Cli::try_parse_from(["faces-modules", "--runtime", missing.to_str().unwrap(), "--root", "1", "discover"])
        .unwrap();
    assert!(run(&cli, ResolverConfig::default()).is_err());
}
