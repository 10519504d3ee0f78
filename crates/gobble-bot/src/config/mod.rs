//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit flag, then environment variable, then a
//! project-local `.gobble/` file if present, then `~/.gobble/`.

use std::path::PathBuf;

/// Dataset of licensed eating establishments on data.gov.sg.
pub const DEFAULT_DATASET_ID: &str = "d_1f0313499a17075d13aae6ed3e825bc6";

pub const DEFAULT_DATASET_API: &str = "https://api-open.data.gov.sg/v1/public/api/datasets";

const CATALOG_FILE: &str = "catalog.gbc";
const USERS_FILE: &str = "users.db";

/// Resolve the catalog file path.
pub fn resolve_catalog_path(explicit: Option<&str>) -> String {
    resolve_path(explicit, "GOBBLE_CATALOG", CATALOG_FILE)
}

/// Resolve the user store path.
pub fn resolve_users_path(explicit: Option<&str>) -> String {
    resolve_path(explicit, "GOBBLE_USERS", USERS_FILE)
}

/// Resolve the dataset id to ingest.
pub fn resolve_dataset_id(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var("GOBBLE_DATASET_ID").ok())
        .unwrap_or_else(|| DEFAULT_DATASET_ID.to_string())
}

/// Resolve the dataset API base URL, without a trailing slash.
pub fn resolve_dataset_api(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var("GOBBLE_DATASET_API").ok())
        .unwrap_or_else(|| DEFAULT_DATASET_API.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn resolve_path(explicit: Option<&str>, env_var: &str, file_name: &str) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }

    if let Ok(env_path) = std::env::var(env_var) {
        return env_path;
    }

    let cwd_path = PathBuf::from(".gobble").join(file_name);
    if cwd_path.exists() {
        return cwd_path.display().to_string();
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    format!("{home}/.gobble/{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(resolve_catalog_path(Some("/tmp/c.gbc")), "/tmp/c.gbc");
        assert_eq!(resolve_users_path(Some("u.db")), "u.db");
    }

    #[test]
    fn test_explicit_dataset_settings_win() {
        assert_eq!(resolve_dataset_id(Some("d_abc")), "d_abc");
        assert_eq!(
            resolve_dataset_api(Some("http://localhost:9000/datasets/")),
            "http://localhost:9000/datasets"
        );
    }
}
