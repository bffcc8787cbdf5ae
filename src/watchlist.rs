//! Persistent list of starred coin ids, written back in full on every
//! mutation so the file is always consistent with the in-memory list.

use std::fs;
use std::path::PathBuf;

use log::warn;

use crate::error::CoinDashError;

pub struct WatchlistStore {
    path: PathBuf,
    ids: Vec<String>,
}

impl WatchlistStore {
    /// Loads the watchlist from disk. A missing file is a normal first
    /// run; a corrupt one is logged and treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> WatchlistStore {
        let path = path.into();
        let ids = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("watchlist file {} is not valid JSON: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        WatchlistStore { path, ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, coin_id: &str) -> bool {
        self.ids.iter().any(|id| id == coin_id)
    }

    pub fn add(&mut self, coin_id: &str) -> Result<(), CoinDashError> {
        if self.contains(coin_id) {
            return Ok(());
        }
        self.ids.push(coin_id.to_string());
        self.persist()
    }

    pub fn remove(&mut self, coin_id: &str) -> Result<(), CoinDashError> {
        let before = self.ids.len();
        self.ids.retain(|id| id != coin_id);
        if self.ids.len() == before {
            return Ok(());
        }
        self.persist()
    }

    /// Adds the coin if absent, removes it if present. Returns whether
    /// the coin is on the list afterwards.
    pub fn toggle(&mut self, coin_id: &str) -> Result<bool, CoinDashError> {
        if self.contains(coin_id) {
            self.remove(coin_id)?;
            Ok(false)
        } else {
            self.add(coin_id)?;
            Ok(true)
        }
    }

    pub fn clear(&mut self) -> Result<(), CoinDashError> {
        if self.ids.is_empty() {
            return Ok(());
        }
        self.ids.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), CoinDashError> {
        let json = serde_json::to_string_pretty(&self.ids)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("coindash-watchlist-{}-{}.json", name, std::process::id()));
        path
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = WatchlistStore::load(temp_path("missing"));
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();
        let store = WatchlistStore::load(&path);
        assert!(store.is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn add_persists_and_survives_reload() {
        let path = temp_path("roundtrip");
        let mut store = WatchlistStore::load(&path);
        store.add("bitcoin").unwrap();
        store.add("ethereum").unwrap();
        store.add("bitcoin").unwrap();
        assert_eq!(store.ids(), ["bitcoin", "ethereum"]);

        let reloaded = WatchlistStore::load(&path);
        assert_eq!(reloaded.ids(), ["bitcoin", "ethereum"]);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn toggle_flips_membership() {
        let path = temp_path("toggle");
        let mut store = WatchlistStore::load(&path);
        assert!(store.toggle("solana").unwrap());
        assert!(store.contains("solana"));
        assert!(!store.toggle("solana").unwrap());
        assert!(!store.contains("solana"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn clear_empties_list_and_file() {
        let path = temp_path("clear");
        let mut store = WatchlistStore::load(&path);
        store.add("bitcoin").unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());

        let reloaded = WatchlistStore::load(&path);
        assert!(reloaded.is_empty());
        fs::remove_file(&path).unwrap();
    }
}
