//! Loading documents from disk, fallbacks and resets.

mod common;

use std::fs;
use std::sync::Arc;

use common::*;

fn studio_file() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studio.yaml");
    fs::write(&path, STUDIO_CONFIG).unwrap();
    fs::write(dir.path().join("grade.cube"), "gain 3.0\n").unwrap();
    let path = path.to_string_lossy().into_owned();
    (dir, path)
}

#[test]
fn file_config_records_its_location() {
    let (dir, path) = studio_file();
    let engine = Arc::new(MockEngine::new());
    let config = config_with(&engine, &path);

    assert!(!config.has_error(), "{}", config.geterror(false));
    assert_eq!(config.configname(), path);
    assert_eq!(config.configfilename(), path);
    assert_eq!(config.engine_config_name().as_deref(), Some("studio"));
    assert_eq!(config.working_dir(), dir.path());
    assert_eq!(config.num_colorspaces(), 11);

    // Relative file transforms are found next to the config.
    let grade = config.create_file_transform("grade.cube", false);
    assert!(!grade.is_empty(), "{}", config.geterror(false));
    assert_close(&apply_rgb(&grade, [0.1, 0.2, 0.3]), &[0.3, 0.6, 0.9], 1e-6);
}

#[test]
fn reset_to_the_same_config_keeps_the_cache() {
    let (_dir, path) = studio_file();
    let engine = Arc::new(MockEngine::new());
    let mut config = config_with(&engine, &path);

    let handle = config.create_color_processor("sRGB", "ACEScg", "", "");
    assert_eq!(config.cache().len(), 1);
    assert!(config.reset(&path));
    assert_eq!(config.cache().len(), 1);
    assert!(config.create_color_processor("sRGB", "ACEScg", "", "").ptr_eq(&handle));

    assert!(config.reset("ocio://default"));
    assert_eq!(config.configname(), "ocio://default");
    assert!(config.cache().is_empty());
    assert_eq!(config.num_colorspaces(), 6);
    assert_eq!(config.resolve("sRGB"), "srgb_tx");

    // `""` while on the builtin default is a no-op.
    let _ = config.create_color_processor("sRGB", "ACEScg", "", "");
    assert!(config.reset(""));
    assert_eq!(config.cache().len(), 1);
}

#[test]
fn missing_file_falls_back_to_the_builtin_default() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nowhere.ocio");
    let missing = missing.to_string_lossy().into_owned();

    let engine = Arc::new(MockEngine::new());
    let config = config_with(&engine, &missing);
    let message = config.geterror(false);
    assert!(message.contains("non-existent"), "{message}");
    assert!(message.contains("nowhere.ocio"), "{message}");

    // The current config has a single space, so the builtin default wins.
    assert_eq!(config.configname(), "ocio://default");
    assert_eq!(config.num_colorspaces(), 6);
    assert_eq!(config.engine_config_name().as_deref(), Some("mock-builtin-default"));
}

#[test]
fn missing_file_falls_back_to_a_usable_current_config() {
    let engine = Arc::new(MockEngine::new().with_current(STUDIO_CONFIG));
    let config = config_with(&engine, "/definitely/not/here.ocio");

    assert!(config.has_error());
    assert_eq!(config.configname(), "studio");
    assert_eq!(config.configfilename(), "current");
    assert_eq!(config.num_colorspaces(), 11);
}

#[test]
fn unreadable_document_records_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "colorspaces: [this is: not: valid\n").unwrap();
    let path = path.to_string_lossy().into_owned();

    let engine = Arc::new(MockEngine::new());
    let config = config_with(&engine, &path);
    let message = config.geterror(true);
    assert!(message.starts_with("Error reading color config"), "{message}");
    assert_eq!(config.configname(), "ocio://default");
    assert!(!config.has_error());
}

#[test]
fn inline_text_is_its_own_name() {
    let (_engine, config) = studio();
    assert_eq!(config.configname(), STUDIO_CONFIG);
    assert_eq!(config.configfilename(), "");
    assert_eq!(config.engine_config_name().as_deref(), Some("studio"));
}
