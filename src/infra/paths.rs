// src/infra/paths.rs — Filesystem locations for config and history
//
// SCRUTINEER_HOME overrides everything for sandboxed runs: config sits
// directly under it and data under its data/ subdirectory. Without the
// override, config lives in ~/.scrutineer/ and data follows the
// platform convention (XDG_DATA_HOME/scrutineer on Linux).

use std::path::PathBuf;
use std::sync::OnceLock;

use directories::{BaseDirs, ProjectDirs};

/// Directory holding config.toml.
pub fn config_dir() -> PathBuf {
    match home_override() {
        Some(home) => home,
        None => home_dir().join(".scrutineer"),
    }
}

/// Directory holding the run-history database.
pub fn data_dir() -> PathBuf {
    match home_override() {
        Some(home) => home.join("data"),
        None => platform_dirs().data_local_dir().to_path_buf(),
    }
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn db_path() -> PathBuf {
    data_dir().join("scrutineer.db")
}

fn home_override() -> Option<PathBuf> {
    std::env::var_os("SCRUTINEER_HOME").map(PathBuf::from)
}

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .expect("Could not determine home directory")
        .home_dir()
        .to_path_buf()
}

fn platform_dirs() -> &'static ProjectDirs {
    static DIRS: OnceLock<ProjectDirs> = OnceLock::new();
    DIRS.get_or_init(|| {
        ProjectDirs::from("", "", "scrutineer").expect("Could not determine home directory")
    })
}
