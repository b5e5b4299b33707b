// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the POSTWRIGHT_HOME environment variable for isolation.
// When POSTWRIGHT_HOME is set, all config and data live under that directory.
// When unset, config uses ~/.postwright/ and data uses XDG_DATA_HOME/postwright.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

static PROJECT_DIRS: OnceLock<ProjectDirs> = OnceLock::new();

fn project_dirs() -> &'static ProjectDirs {
    PROJECT_DIRS.get_or_init(|| {
        ProjectDirs::from("", "", "postwright").expect("Could not determine home directory")
    })
}

/// Returns the POSTWRIGHT_HOME override, if set.
fn postwright_home() -> Option<PathBuf> {
    std::env::var_os("POSTWRIGHT_HOME").map(PathBuf::from)
}

/// Configuration directory: $POSTWRIGHT_HOME/ or ~/.postwright/
pub fn config_dir() -> PathBuf {
    if let Some(home) = postwright_home() {
        return home;
    }
    dirs_home().join(".postwright")
}

/// Data directory: $POSTWRIGHT_HOME/data/ or XDG_DATA_HOME/postwright
pub fn data_dir() -> PathBuf {
    if let Some(home) = postwright_home() {
        return home.join("data");
    }
    project_dirs().data_local_dir().to_path_buf()
}

/// Home directory
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .expect("Could not determine home directory")
        .home_dir()
        .to_path_buf()
}

/// Config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Database path
pub fn db_path() -> PathBuf {
    data_dir().join("postwright.db")
}
