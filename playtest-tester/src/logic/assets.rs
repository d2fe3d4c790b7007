use log::warn;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use playtest_core::{CostCatalog, SessionConfig};

/// Session configuration and cost catalog the tester runs with.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub session: SessionConfig,
    pub catalog: Arc<CostCatalog>,
}

impl Default for TesterAssets {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            catalog: Arc::new(CostCatalog::default()),
        }
    }
}

impl TesterAssets {
    /// Load user-supplied documents, using the bundled `assets/` ones where no path is given.
    #[must_use]
    pub fn load_with_overrides(session_path: Option<&Path>, catalog_path: Option<&Path>) -> Self {
        let root = Self::assets_root();
        let bundled_session = root.join("session.json");
        let bundled_catalog = root.join("catalog.json");
        Self::load(
            Some(session_path.unwrap_or(bundled_session.as_path())),
            Some(catalog_path.unwrap_or(bundled_catalog.as_path())),
        )
    }

    /// Load explicit documents. A missing path or file keeps the default silently;
    /// a malformed one is reported and ignored.
    #[must_use]
    pub fn load(session_path: Option<&Path>, catalog_path: Option<&Path>) -> Self {
        let session = session_path
            .and_then(|path| load_json::<SessionConfig>(path, "session config"))
            .unwrap_or_default();
        let catalog = catalog_path.and_then(Self::load_catalog).unwrap_or_default();
        Self {
            session,
            catalog: Arc::new(catalog),
        }
    }

    fn assets_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
    }

    fn load_catalog(path: &Path) -> Option<CostCatalog> {
        let json = fs::read_to_string(path).ok()?;
        match CostCatalog::from_json(&json) {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                warn!("Failed to parse cost catalog {}: {err}", path.display());
                None
            }
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Option<T> {
    let json = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Failed to parse {what} {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playtest_core::{PersonaKind, UnitKind};

    fn temp_file(label: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "playtest-assets-{label}-{}.json",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let missing = std::env::temp_dir().join("playtest-assets-does-not-exist.json");
        let assets = TesterAssets::load(Some(&missing), Some(&missing));
        assert_eq!(assets.session, SessionConfig::default());
        assert_eq!(*assets.catalog, CostCatalog::default());
    }

    #[test]
    fn malformed_session_is_ignored() {
        let path = temp_file("malformed", "{ not json");
        let assets = TesterAssets::load(Some(&path), None);
        assert_eq!(assets.session, SessionConfig::default());
    }

    #[test]
    fn partial_documents_merge_with_defaults() {
        let session = temp_file(
            "session",
            r#"{"personas": ["risk_taker"], "games_per_persona": 2}"#,
        );
        let catalog = temp_file(
            "catalog",
            r#"{"units": {"worker": {"cost": {"minerals": 40.0}, "base_value": 1.0}}}"#,
        );
        let assets = TesterAssets::load(Some(&session), Some(&catalog));
        assert_eq!(assets.session.personas, vec![PersonaKind::RiskTaker]);
        assert_eq!(assets.session.games_per_persona, 2);
        assert_eq!(assets.session.max_ticks, 5_000);
        assert!((assets.catalog.unit(UnitKind::Worker).cost.minerals - 40.0).abs() < f64::EPSILON);
        assert!((assets.catalog.unit(UnitKind::Siege).cost.gas - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bundled_assets_load() {
        let assets = TesterAssets::load_with_overrides(None, None);
        assert!(assets.session.validate().is_ok());
    }
}
