use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::keybinds::{EditorAction, Keymap};
use crate::search::ReplaceStrategy;
use crate::session::{DEFAULT_IDLE_TIMEOUT_MINUTES, SessionContext};

const QUALIFIER: &str = "net.inkpost";
const ORGANIZATION: &str = "Inkpost";
const APPLICATION: &str = "inkpost";
const CONFIG_FILE_NAME: &str = "config.toml";
const DRAFTS_DIR_NAME: &str = "drafts";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where drafts live; defaults to the platform data directory
    pub drafts_dir: Option<PathBuf>,
    pub search: SearchConfig,
    pub editor: EditorConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: ReplaceStrategy,
    /// Shortcuts toggling the search panel, e.g. `["Ctrl+F", "Ctrl+H"]`
    pub hotkeys: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 0 keeps sessions alive until logout
    pub idle_timeout_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            idle_timeout_minutes: DEFAULT_IDLE_TIMEOUT_MINUTES,
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

pub fn config_file_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

impl Config {
    /// Read `path`. A missing file yields the defaults; a broken one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(err) => return Err(Error::io(path, err)),
        };

        let config: Config = toml::from_str(&contents).map_err(|source| Error::TomlDecode {
            path: path.to_path_buf(),
            source,
        })?;

        // Surface bad key bindings now rather than on first key press
        config.keymap()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `--config` when given, else from the platform config directory
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match config_file_path() {
                Some(path) => Self::load(&path),
                None => Ok(Config::default()),
            },
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(|err| Error::io(path, err))
    }

    pub fn keymap(&self) -> Result<Keymap> {
        let mut keymap = Keymap::default();
        if let Some(hotkeys) = &self.search.hotkeys {
            keymap.rebind(EditorAction::ToggleSearch, hotkeys)?;
        }
        Ok(keymap)
    }

    pub fn drafts_dir(&self) -> PathBuf {
        if let Some(dir) = &self.drafts_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_local_dir().join(DRAFTS_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(".inkpost").join(DRAFTS_DIR_NAME))
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(chrono::Duration::minutes(
            self.session.idle_timeout_minutes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybinds::KeyEvent;
    use std::env;

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = env::temp_dir().join("inkpost-test-config-missing/config.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.session.idle_timeout_minutes, 15);
        assert_eq!(config.search.strategy, ReplaceStrategy::Markup);
    }

    #[test]
    fn test_parse_sections() {
        let temp_dir = env::temp_dir().join("inkpost-test-config-parse");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();
        let path = temp_dir.join("config.toml");
        fs::write(
            &path,
            r#"
drafts_dir = "/tmp/drafts"

[search]
strategy = "text-nodes"
hotkeys = ["Ctrl+K"]

[editor]
history_limit = 5
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.drafts_dir(), PathBuf::from("/tmp/drafts"));
        assert_eq!(config.search.strategy, ReplaceStrategy::TextNodes);
        assert_eq!(config.editor.history_limit, 5);
        assert_eq!(config.session.idle_timeout_minutes, 15);

        let keymap = config.keymap().unwrap();
        assert_eq!(
            keymap.resolve(&KeyEvent::ctrl('k')),
            Some(EditorAction::ToggleSearch)
        );
        assert_eq!(keymap.resolve(&KeyEvent::ctrl('f')), None);

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_invalid_files_are_errors() {
        let temp_dir = env::temp_dir().join("inkpost-test-config-invalid");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();

        let bad_toml = temp_dir.join("bad.toml");
        fs::write(&bad_toml, "search = [").unwrap();
        assert!(matches!(
            Config::load(&bad_toml),
            Err(Error::TomlDecode { .. })
        ));

        let bad_keys = temp_dir.join("keys.toml");
        fs::write(&bad_keys, "[search]\nhotkeys = [\"Ctrl+\"]\n").unwrap();
        assert!(matches!(
            Config::load(&bad_keys),
            Err(Error::InvalidKeyBinding { .. })
        ));

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = env::temp_dir().join("inkpost-test-config-save");
        let _ = fs::remove_dir_all(&temp_dir);
        let path = temp_dir.join("nested/config.toml");

        let mut config = Config::default();
        config.search.strategy = ReplaceStrategy::TextNodes;
        config.session.idle_timeout_minutes = 0;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);

        fs::remove_dir_all(&temp_dir).ok();
    }
}
