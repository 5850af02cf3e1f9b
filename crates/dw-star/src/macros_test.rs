use super::*;
use std::fs;
use tempfile::TempDir;

fn macros_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[test]
fn test_missing_directory_is_empty_registry() {
    let registry = load_and_register(Path::new("/nonexistent/path/to/macros")).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_empty_directory() {
    let dir = TempDir::new().unwrap();
    let registry = load_and_register(dir.path()).unwrap();
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_not_a_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("macros");
    fs::write(&file, "not a dir").unwrap();
    assert!(load_and_register(&file).is_err());
}

#[test]
fn test_single_macro_exports() {
    let dir = macros_dir(&[(
        "utils.star",
        r#"
def greet(name):
    return "Hello, " + name + "!"

def add(a, b):
    return a + b

_private = "should not be exported"
"#,
    )]);

    let registry = load_and_register(dir.path()).unwrap();
    assert_eq!(registry.len(), 1);

    let module = registry.get("utils").unwrap();
    assert_eq!(module.namespace, "utils");
    assert_eq!(module.exports, vec!["add".to_string(), "greet".to_string()]);
    assert!(!module.exports.contains(&"_private".to_string()));
}

#[test]
fn test_multiple_macros() {
    let dir = macros_dir(&[
        ("datetime.star", "def now():\n    return \"2024-01-01\"\n"),
        ("math.star", "def square(x):\n    return x * x\n"),
    ]);

    let registry = load_and_register(dir.path()).unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.namespaces(), vec!["datetime", "math"]);
}

#[test]
fn test_syntax_error() {
    let dir = macros_dir(&[("broken.star", "def broken(:\n    return 1\n")]);
    let err = load_and_register(dir.path()).unwrap_err();
    match err {
        StarError::Load { file, .. } => assert!(file.ends_with("broken.star")),
        other => panic!("expected Load error, got {:?}", other),
    }
}

#[test]
fn test_invalid_namespace() {
    let dir = macros_dir(&[("123invalid.star", "x = 1\n")]);
    assert!(load_and_register(dir.path()).is_err());
}

#[test]
fn test_reserved_namespace_rejected() {
    for reserved in RESERVED_NAMESPACES {
        let file_name = format!("{reserved}.star");
        let dir = macros_dir(&[(file_name.as_str(), "x = 1\n")]);
        let err = load_and_register(dir.path()).unwrap_err();
        assert!(matches!(err, StarError::Registry { .. }), "{reserved} should be rejected");
    }
}

#[test]
fn test_duplicate_namespace_names_first_registrant() {
    let dir = macros_dir(&[("utils.star", "x = 1\n")]);
    let mut registry = load_and_register(dir.path()).unwrap();

    let duplicate = load_macro_file(&dir.path().join("utils.star")).unwrap();
    let err = registry.register(duplicate).unwrap_err();
    match err {
        StarError::Registry { namespace, message } => {
            assert_eq!(namespace, "utils");
            assert!(message.contains("utils.star"));
        }
        other => panic!("expected Registry error, got {:?}", other),
    }
}

#[test]
fn test_reloading_is_idempotent() {
    let dir = macros_dir(&[
        ("a.star", "def one():\n    return 1\n"),
        ("b.star", "def two():\n    return 2\n"),
    ]);
    let first = load_and_register(dir.path()).unwrap();
    let second = load_and_register(dir.path()).unwrap();
    assert_eq!(first.namespaces(), second.namespaces());
    assert_eq!(
        first.get("a").unwrap().exports,
        second.get("a").unwrap().exports
    );
}

#[test]
fn test_non_star_files_ignored() {
    let dir = macros_dir(&[("utils.star", "x = 1\n"), ("README.md", "# docs")]);
    let registry = load_and_register(dir.path()).unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_underscore_namespace_is_valid() {
    let dir = macros_dir(&[("_shared.star", "def helper():\n    return 1\n")]);
    let registry = load_and_register(dir.path()).unwrap();
    assert!(registry.has("_shared"));
}
