use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::database::{AssetContext, AssetVariant};

pub struct AssetDbConfig {
    /// Path to the directory holding assetdb's state (preferences, databases)
    pub data_dir: String,

    /// Directory the bundled asset databases are read from
    pub assets_dir: String,

    /// Directory installed databases are written to (default: {data_dir}/databases)
    pub database_dir: Option<String>,

    /// Install variant used when none is given on the command line
    pub variant: AssetVariant,
}

const EMPTY_CONFIG: &str = r#"### assetdb configuration file

### directory for state kept by assetdb (preferences, installed databases)
# data_dir = "~/.assetdb"

### directory holding the bundled asset databases
# assets_dir = "assets/databases"

### directory installed databases are written to
# database_dir = "~/.assetdb/databases"

### install variant: "forced-upgrade" (default) or "recopy"
# variant = "forced-upgrade"
"#;

fn home_data_dir() -> String {
    let home_dir = dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());
    format!("{}/.assetdb", home_dir)
}

impl Default for AssetDbConfig {
    fn default() -> Self {
        Self {
            data_dir: home_data_dir(),
            assets_dir: "assets/databases".to_string(),
            database_dir: None,
            variant: AssetVariant::default(),
        }
    }
}

impl AssetDbConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<AssetDbConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.assetdb/assetdb.toml as the configuration file path
        let assetdb_dir = home_data_dir();

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(assetdb_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create assetdb directory: {}", e))?;
                let p = format!("{}/assetdb.toml", assetdb_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of ASSETDB)
        // E.g., `ASSETDB_ASSETS_DIR=./assets ./assetdb` would set the assets directory
        builder = builder.add_source(config::Environment::with_prefix("ASSETDB"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Build a configuration from flat key-value settings
    pub fn from_map(config: &HashMap<String, String>) -> Result<AssetDbConfig> {
        let defaults = AssetDbConfig::default();

        let data_dir = config
            .get("data_dir")
            .map(|p| expand_home(p))
            .unwrap_or(defaults.data_dir);

        let assets_dir = config
            .get("assets_dir")
            .map(|p| expand_home(p))
            .unwrap_or(defaults.assets_dir);

        let database_dir = config.get("database_dir").map(|p| expand_home(p));

        let variant = match config.get("variant") {
            Some(v) => v.parse::<AssetVariant>().map_err(|e| anyhow!(e))?,
            None => defaults.variant,
        };

        Ok(AssetDbConfig {
            data_dir,
            assets_dir,
            database_dir,
            variant,
        })
    }

    /// Get the path to the preference file holding the version marker
    pub fn preferences_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/preferences.json", data_dir)
    }

    /// Get the directory installed databases are written to
    pub fn database_dir(&self) -> String {
        match &self.database_dir {
            Some(dir) => dir.clone(),
            None => format!("{}/databases", self.data_dir.trim_end_matches('/')),
        }
    }

    /// Asset and database locations as an `AssetContext`
    pub fn context(&self) -> AssetContext {
        AssetContext::new(&self.assets_dir, self.database_dir())
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("Assets Directory:   {}", self.assets_dir),
            format!("Database Directory: {}", self.database_dir()),
            format!("Preferences:        {}", self.preferences_path()),
            format!("Variant:            {}", self.variant),
        ]
        .join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        format!("{}/assetdb.toml", home_data_dir())
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}

// =============================================================================
// Installed database info (used by the status command)
// =============================================================================

/// Row count of one table in an installed database
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct TableInfo {
    pub name: String,
    pub rows: u64,
}

/// Information about an installed database file
#[derive(Debug, Serialize, Clone)]
pub struct InstalledDatabaseInfo {
    pub name: String,
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_version: Option<u32>,
    /// Version recorded in the preference store, 0 if never installed
    pub marker: u32,
    pub tables: Vec<TableInfo>,
}

/// Inspect the installed copy of `name` inside `storage_dir`
pub fn get_database_info(name: &str, storage_dir: &Path, marker: u32) -> InstalledDatabaseInfo {
    use crate::database::{DatabaseConn, SchemaManager};

    let path: PathBuf = storage_dir.join(name);
    let metadata = std::fs::metadata(&path).ok().filter(|m| m.is_file());
    let exists = metadata.is_some();

    let modified = metadata.as_ref().and_then(|m| m.modified().ok()).map(|t| {
        let datetime: chrono::DateTime<chrono::Utc> = t.into();
        datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    });

    let (user_version, tables) = if exists {
        match DatabaseConn::open_plain(&path) {
            Ok(db) => {
                let version = SchemaManager::new(&db.conn).version().ok();
                let tables = db
                    .user_tables()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|table| TableInfo {
                        rows: db.table_count(&table).unwrap_or(0),
                        name: table,
                    })
                    .collect();
                (version, tables)
            }
            Err(_) => (None, Vec::new()),
        }
    } else {
        (None, Vec::new())
    };

    InstalledDatabaseInfo {
        name: name.to_string(),
        path: path.to_string_lossy().to_string(),
        exists,
        size_bytes: metadata.map(|m| m.len()),
        modified,
        user_version,
        marker,
        tables,
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssetDbConfig::default();
        assert_eq!(config.assets_dir, "assets/databases");
        assert!(config.database_dir.is_none());
        assert_eq!(config.variant, AssetVariant::ForcedUpgrade);
    }

    #[test]
    fn test_paths() {
        let config = AssetDbConfig {
            data_dir: "/test/dir/".to_string(),
            assets_dir: "/test/assets".to_string(),
            database_dir: None,
            variant: AssetVariant::Recopy,
        };

        assert_eq!(config.preferences_path(), "/test/dir/preferences.json");
        assert_eq!(config.database_dir(), "/test/dir/databases");

        let context = config.context();
        assert_eq!(context.assets_dir, PathBuf::from("/test/assets"));
        assert_eq!(context.database_dir, PathBuf::from("/test/dir/databases"));
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("data_dir".to_string(), "/srv/app".to_string());
        map.insert("database_dir".to_string(), "/srv/db".to_string());
        map.insert("variant".to_string(), "recopy".to_string());

        let config = AssetDbConfig::from_map(&map).unwrap();
        assert_eq!(config.data_dir, "/srv/app");
        assert_eq!(config.database_dir(), "/srv/db");
        assert_eq!(config.variant, AssetVariant::Recopy);

        map.insert("variant".to_string(), "sideways".to_string());
        assert!(AssetDbConfig::from_map(&map).is_err());
    }

    #[test]
    fn test_new_with_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assetdb.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/assetdb-test\"\nassets_dir = \"/tmp/assets\"\n",
        )
        .unwrap();

        let config = AssetDbConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.data_dir, "/tmp/assetdb-test");
        assert_eq!(config.assets_dir, "/tmp/assets");
    }

    #[test]
    fn test_new_writes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");

        AssetDbConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("### assetdb configuration file"));
    }

    #[test]
    fn test_database_info() {
        let dir = tempfile::tempdir().unwrap();
        {
            let conn = rusqlite::Connection::open(dir.path().join("app.db")).unwrap();
            conn.execute_batch(
                "CREATE TABLE items (id INTEGER PRIMARY KEY);
                 INSERT INTO items (id) VALUES (1), (2);
                 PRAGMA user_version = 4;",
            )
            .unwrap();
        }

        let info = get_database_info("app.db", dir.path(), 4);
        assert!(info.exists);
        assert_eq!(info.user_version, Some(4));
        assert_eq!(info.marker, 4);
        assert!(info.size_bytes.unwrap_or(0) > 0);
        assert!(info.modified.is_some());
        assert_eq!(
            info.tables,
            vec![TableInfo {
                name: "items".to_string(),
                rows: 2
            }]
        );

        let missing = get_database_info("absent.db", dir.path(), 0);
        assert!(!missing.exists);
        assert!(missing.user_version.is_none());
        assert!(missing.tables.is_empty());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[cfg(feature = "display")]
    #[test]
    fn test_table_info_renders_as_table() {
        use tabled::settings::Style;
        use tabled::Table;

        let tables = vec![
            TableInfo {
                name: "items".to_string(),
                rows: 12,
            },
            TableInfo {
                name: "tags".to_string(),
                rows: 0,
            },
        ];
        let rendered = Table::new(&tables).with(Style::markdown()).to_string();

        let header = rendered.lines().next().unwrap();
        assert!(header.contains("name") && header.contains("rows"));
        assert!(rendered.contains("items"));
        assert!(rendered.contains("tags"));
    }
}
