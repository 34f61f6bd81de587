// tests/integration_tests.rs

use std::fs;
use std::path::Path;

#[test]
fn test_example_config_parses() {
    let content =
        fs::read_to_string("flightwatch.example.toml").expect("Failed to read example config");
    let table: toml::Table = content.parse().expect("Example config is not valid TOML");

    for key in ["bounds_box", "ssid", "password", "query_delay_secs", "pause_secs"] {
        assert!(table.contains_key(key), "Example config missing key: {}", key);
    }

    let bounds = table
        .get("bounds_box")
        .and_then(|value| value.as_str())
        .expect("bounds_box is not a string");
    let parts: Vec<f64> = bounds
        .split(',')
        .map(|part| part.trim().parse().expect("bounds_box value is not a number"))
        .collect();
    assert_eq!(parts.len(), 4);
}

#[test]
fn test_project_structure() {
    let expected_files = vec![
        "src/main.rs",
        "src/config.rs",
        "src/extract.rs",
        "src/selector.rs",
        "src/model.rs",
        "src/render.rs",
        "src/poll.rs",
        "src/net.rs",
        "Cargo.toml",
        "README.md",
    ];

    for file in expected_files {
        assert!(Path::new(file).exists(), "Expected file {} not found", file);
    }
}

#[test]
fn test_cargo_toml_metadata() {
    let cargo_content = fs::read_to_string("Cargo.toml").expect("Failed to read Cargo.toml");

    assert!(cargo_content.contains("name = \"flightwatch\""), "Missing package name");
    assert!(cargo_content.contains("description ="), "Missing description");
    assert!(cargo_content.contains("license ="), "Missing license");
    assert!(cargo_content.contains("readme ="), "Missing readme");
    assert!(cargo_content.contains("homepage ="), "Missing homepage");
    assert!(cargo_content.contains("repository ="), "Missing repository");
}

#[test]
fn test_readme_exists_and_complete() {
    let readme_content = fs::read_to_string("README.md").expect("Failed to read README.md");

    let required_sections = vec![
        "# flightwatch",
        "## Features",
        "## Quick Start",
        "## Configuration",
        "## Controls",
        "## Development",
    ];

    for section in required_sections {
        assert!(readme_content.contains(section), "README missing section: {}", section);
    }
}
