//! Recorded model output for tests.
//!
//! Fixtures live under `src/fixtures/`:
//! - `streams/<name>_deltas.json`: the text deltas of one streamed reply, in
//!   arrival order, split where the upstream split them.
//! - `content/*.json`: whole `generateContent` responses.

use std::path::PathBuf;

use crate::types::GenerateContentResponse;

/// Get the path to a fixture file.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("fixtures")
        .join(relative_path)
}

/// Load a fixture file as a string.
pub fn load_fixture(relative_path: &str) -> String {
    std::fs::read_to_string(fixture_path(relative_path))
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", relative_path, e))
}

/// Load a JSON fixture and parse it.
pub fn load_json_fixture<T: serde::de::DeserializeOwned>(relative_path: &str) -> T {
    let content = load_fixture(relative_path);
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse JSON fixture {}: {}", relative_path, e))
}

/// Deltas of the recorded stream `name` (`"analysis"`, `"gym"` or `"chat"`).
pub fn load_deltas(name: &str) -> Vec<String> {
    load_json_fixture(&format!("streams/{}_deltas.json", name))
}

/// A recorded `generateContent` response.
pub fn load_response(name: &str) -> GenerateContentResponse {
    load_json_fixture(&format!("content/{}.json", name))
}
