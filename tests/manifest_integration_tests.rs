//! Integration tests for ManifestGenerator over a fixture asset tree
//!
//! These tests verify that the generator:
//! - Lists every recognized category/format pair and nothing else
//! - Skips hidden files, hidden directories and its own output
//! - Sorts by (category, name, format) and extracts SVG viewBox sizes
//! - Produces the same entries on repeated runs

use camino::{Utf8Path, Utf8PathBuf};
use skeuokit::models::{AssetCategory, AssetFormat, AssetManifest, ViewBox};
use skeuokit::services::ManifestGenerator;
use std::fs;
use tempfile::TempDir;

const SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 18">"#,
    r#"<path d="M0 0h24v18H0z"/></svg>"#,
);

fn write(root: &Utf8Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Assets root with one file per category/format pair plus files that must be skipped
fn fixture_tree() -> (Utf8PathBuf, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

    write(&root, "icons/wifi.svg", SVG.as_bytes());
    write(&root, "icons/wifi.webp", b"RIFF....WEBP");
    write(&root, "icons/wifi.png", b"png");
    write(&root, "icons/lock.jpg", b"jpg");
    write(&root, "icons/lock.jpeg", b"jpeg");
    write(&root, "wallpapers/linen.png", b"png");
    write(&root, "textures/felt/green.webp", b"webp");
    write(&root, "textures/palette.json", b"{}");
    write(&root, "audio/tap.ogg", b"ogg");
    write(&root, "audio/lock.mp3", b"mp3");
    write(&root, "audio/unlock.WAV", b"wav");

    // Excluded: disallowed format, unknown category, hidden file and dir, loose file
    write(&root, "icons/spinner.gif", b"gif");
    write(&root, "fonts/helvetica.png", b"png");
    write(&root, "icons/.wifi-draft.svg", SVG.as_bytes());
    write(&root, "icons/.cache/wifi.png", b"png");
    write(&root, "readme.json", b"{}");

    (root, temp_dir)
}

fn ids(manifest: &AssetManifest) -> Vec<&str> {
    manifest.assets.iter().map(|a| a.id.as_str()).collect()
}

#[test]
fn test_fixture_tree_entries_and_order() {
    let (root, _temp_dir) = fixture_tree();
    let manifest = ManifestGenerator::new(&root).build().unwrap();

    assert_eq!(
        ids(&manifest),
        vec![
            "audio/lock.mp3",
            "audio/tap.ogg",
            "audio/unlock.WAV",
            "icons/lock.jpeg",
            "icons/lock.jpg",
            "icons/wifi.png",
            "icons/wifi.svg",
            "icons/wifi.webp",
            "textures/felt/green.webp",
            "textures/palette.json",
            "wallpapers/linen.png",
        ]
    );
    assert_eq!(manifest.asset_count, 11);
}

#[test]
fn test_entry_fields() {
    let (root, _temp_dir) = fixture_tree();
    let manifest = ManifestGenerator::new(&root)
        .with_web_prefix("/static/")
        .build()
        .unwrap();

    let find = |id: &str| manifest.assets.iter().find(|a| a.id == id).unwrap();

    let svg = find("icons/wifi.svg");
    assert_eq!(svg.name, "wifi");
    assert_eq!(svg.category, AssetCategory::Icons);
    assert_eq!(svg.format, AssetFormat::Svg);
    assert_eq!(svg.path, "/static/icons/wifi.svg");
    assert_eq!(svg.bytes, SVG.len() as u64);
    assert!(svg.preload);
    assert_eq!(
        svg.view_box,
        Some(ViewBox {
            width: 24.0,
            height: 18.0
        })
    );

    let nested = find("textures/felt/green.webp");
    assert_eq!(nested.name, "green");
    assert!(!nested.preload);
    assert_eq!(nested.view_box, None);

    // Extension matching is case-insensitive; the id keeps the file's case
    let wav = find("audio/unlock.WAV");
    assert_eq!(wav.format, AssetFormat::Wav);
    assert_eq!(wav.category, AssetCategory::Audio);
}

#[test]
fn test_generate_writes_json_and_skips_own_output() {
    let (root, _temp_dir) = fixture_tree();
    let generator = ManifestGenerator::new(&root);

    let first = generator.generate().unwrap();
    let written = fs::read_to_string(root.join("asset-manifest.json")).unwrap();
    assert!(written.ends_with("}\n"));
    assert!(written.contains("\"generatedAt\""));
    assert!(written.contains("\"assetCount\": 11"));
    assert!(written.contains("\"viewBox\""));

    let parsed: AssetManifest = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed.assets, first.assets);

    // The written manifest sits in the scanned root; a rerun must not list it
    let second = generator.generate().unwrap();
    assert_eq!(second.assets, first.assets);
}

#[test]
fn test_output_inside_category_dir_is_skipped() {
    let (root, _temp_dir) = fixture_tree();
    let generator =
        ManifestGenerator::new(&root).with_output(root.join("textures").join("manifest.json"));

    generator.generate().unwrap();
    let rerun = generator.build().unwrap();

    assert!(!ids(&rerun).contains(&"textures/manifest.json"));
    assert_eq!(rerun.asset_count, 11);
}

#[test]
fn test_same_name_in_sibling_dirs_sorts_by_id() {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    // Written in reverse so directory order cannot line up by accident
    write(&root, "textures/wood/grain.png", b"png");
    write(&root, "textures/stone/grain.png", b"png");
    write(&root, "textures/leather/grain.png", b"png");

    let generator = ManifestGenerator::new(&root);
    let first = generator.build().unwrap();
    assert_eq!(
        ids(&first),
        vec![
            "textures/leather/grain.png",
            "textures/stone/grain.png",
            "textures/wood/grain.png",
        ]
    );
    assert_eq!(ids(&generator.build().unwrap()), ids(&first));
}

#[test]
fn test_malformed_view_box_has_no_dimensions() {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    write(&root, "icons/broken.svg", br#"<svg viewBox="0 0 24"></svg>"#);
    write(&root, "icons/none.svg", b"<svg></svg>");

    let manifest = ManifestGenerator::new(&root).build().unwrap();
    assert_eq!(manifest.asset_count, 2);
    assert!(manifest.assets.iter().all(|a| a.view_box.is_none()));
}

#[test]
fn test_empty_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

    let manifest = ManifestGenerator::new(&root).build().unwrap();
    assert_eq!(manifest.asset_count, 0);
    assert!(manifest.assets.is_empty());
}
