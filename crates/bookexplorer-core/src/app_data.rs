//! Where Book Explorer stores its own data (config, book database).

use std::path::PathBuf;

/// File name of the SQLite database inside the app data directory.
pub const DATABASE_FILENAME: &str = "books.sqlite";

/// Returns the directory where Book Explorer stores config and the book database.
/// On Linux: `~/.local/share/bookexplorer/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "BookExplorer", "BookExplorer")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Default location of the book database, if the app data directory is available.
pub fn default_database_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DATABASE_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_lives_in_app_data_dir() {
        let (Some(dir), Some(db)) = (app_data_dir(), default_database_path()) else {
            return;
        };
        assert_eq!(db.parent(), Some(dir.as_path()));
        assert_eq!(db.file_name().and_then(|n| n.to_str()), Some(DATABASE_FILENAME));
    }
}
