use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::blog::BlogDraft;
use crate::error::{Error, Result};

const DRAFT_EXTENSION: &str = "toml";

/// A draft together with where it is stored
#[derive(Debug, Clone)]
pub struct StoredDraft {
    pub name: String,
    pub path: PathBuf,
    pub draft: BlogDraft,
}

pub struct DraftStore {
    base_path: PathBuf,
}

impl DraftStore {
    pub fn new(base_path: PathBuf) -> Self {
        DraftStore { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `trips/lisbon` maps to `<base>/trips/lisbon.toml`
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut path = self.base_path.join(name);
        if path.extension().is_none() {
            path.set_extension(DRAFT_EXTENSION);
        }
        path
    }

    /// Load a draft by name. A draft that was never saved comes back empty.
    pub fn load(&self, name: &str) -> Result<StoredDraft> {
        let path = self.path_for(name);

        let draft = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| Error::TomlDecode {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => BlogDraft::default(),
            Err(err) => return Err(Error::io(&path, err)),
        };

        Ok(StoredDraft {
            name: name.to_string(),
            path,
            draft,
        })
    }

    /// Save a draft, creating parent directories as needed
    pub fn save(&self, stored: &StoredDraft) -> Result<()> {
        if let Some(parent) = stored.path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let toml = toml::to_string_pretty(&stored.draft)?;
        fs::write(&stored.path, toml).map_err(|err| Error::io(&stored.path, err))?;
        debug!("Saved draft '{}' to {}", stored.name, stored.path.display());
        Ok(())
    }

    /// Names of all drafts below the base directory, sorted
    pub fn list_all(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.base_path).follow_links(true) {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.base_path.clone());
                Error::io(path, err.into())
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(DRAFT_EXTENSION)
            {
                continue;
            }
            if let Ok(relative) = path.with_extension("").strip_prefix(&self.base_path) {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete a draft. Removing a draft that does not exist is not an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(&path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_load_non_existent_draft() {
        let temp_dir = env::temp_dir().join("inkpost-test-load");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();

        let store = DraftStore::new(temp_dir.clone());
        let stored = store.load("trips/lisbon").unwrap();

        assert_eq!(stored.draft, BlogDraft::default());
        assert_eq!(stored.name, "trips/lisbon");
        assert_eq!(stored.path, temp_dir.join("trips/lisbon.toml"));

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = env::temp_dir().join("inkpost-test-save");
        let _ = fs::remove_dir_all(&temp_dir);

        let store = DraftStore::new(temp_dir.clone());
        let mut stored = store.load("nested/dir/story").unwrap();
        stored.draft.title = "Lisbon".to_string();
        stored.draft.content = "<p>Trams &amp; tiles</p>".to_string();
        stored.draft.set_tags("travel, city");
        store.save(&stored).unwrap();

        assert!(stored.path.exists());
        let reloaded = store.load("nested/dir/story").unwrap();
        assert_eq!(reloaded.draft, stored.draft);

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_list_all_recursive() {
        let temp_dir = env::temp_dir().join("inkpost-test-list-all");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(temp_dir.join("dir1/subdir")).unwrap();

        fs::write(temp_dir.join("root.toml"), "title = \"root\"").unwrap();
        fs::write(temp_dir.join("dir1/page1.toml"), "").unwrap();
        fs::write(temp_dir.join("dir1/subdir/page2.toml"), "").unwrap();
        fs::write(temp_dir.join("dir1/notes.txt"), "ignored").unwrap();

        let store = DraftStore::new(temp_dir.clone());
        assert_eq!(
            store.list_all().unwrap(),
            vec!["dir1/page1", "dir1/subdir/page2", "root"]
        );

        store.remove("dir1/page1").unwrap();
        store.remove("dir1/page1").unwrap();
        assert_eq!(store.list_all().unwrap().len(), 2);

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let store = DraftStore::new(env::temp_dir().join("inkpost-test-no-such-dir"));
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_draft_is_an_error() {
        let temp_dir = env::temp_dir().join("inkpost-test-corrupt");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();
        fs::write(temp_dir.join("bad.toml"), "title = ").unwrap();

        let store = DraftStore::new(temp_dir.clone());
        assert!(matches!(store.load("bad"), Err(Error::TomlDecode { .. })));

        fs::remove_dir_all(&temp_dir).ok();
    }
}
