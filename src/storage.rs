use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// Ajustes por servidor almacenados en JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    /// Máximo de canciones tomadas de un catálogo
    pub playlist_limit: usize,
}

/// Manager de almacenamiento basado en archivos JSON
pub struct JsonStorage {
    data_dir: PathBuf,
    default_playlist_limit: usize,
    guilds_cache: HashMap<u64, GuildSettings>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf, default_playlist_limit: usize) -> Result<Self> {
        fs::create_dir_all(data_dir.join("servers")).await?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        let mut storage = Self {
            data_dir,
            default_playlist_limit,
            guilds_cache: HashMap::new(),
        };

        storage.load_all_guilds().await?;

        Ok(storage)
    }

    /// Ajustes de la guild; los valores por defecto si nunca se guardaron
    pub fn settings(&self, guild_id: u64) -> GuildSettings {
        self.guilds_cache
            .get(&guild_id)
            .cloned()
            .unwrap_or(GuildSettings {
                guild_id,
                playlist_limit: self.default_playlist_limit,
            })
    }

    pub async fn set_playlist_limit(&mut self, guild_id: u64, limit: usize) -> Result<GuildSettings> {
        if limit == 0 {
            anyhow::bail!("El límite de playlist debe ser mayor que cero");
        }

        let mut settings = self.settings(guild_id);
        settings.playlist_limit = limit;
        self.save_settings(&settings).await?;
        self.guilds_cache.insert(guild_id, settings.clone());

        info!("💾 Límite de playlist de guild {} ajustado a {}", guild_id, limit);
        Ok(settings)
    }

    // Métodos privados

    async fn load_settings(&self, guild_id: u64) -> Result<GuildSettings> {
        let content = fs::read_to_string(self.guild_file_path(guild_id)).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_settings(&self, settings: &GuildSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(self.guild_file_path(settings.guild_id), content).await?;
        Ok(())
    }

    async fn load_all_guilds(&mut self) -> Result<()> {
        let mut files = fs::read_dir(self.data_dir.join("servers")).await?;
        let mut loaded_count = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let Some(guild_id) = path
                .file_stem()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix("guild_"))
                .and_then(|id| id.parse::<u64>().ok())
            else {
                continue;
            };

            match self.load_settings(guild_id).await {
                Ok(settings) => {
                    self.guilds_cache.insert(guild_id, settings);
                    loaded_count += 1;
                }
                Err(e) => warn!("Error cargando ajustes para guild {}: {}", guild_id, e),
            }
        }

        if loaded_count > 0 {
            info!("📂 Cargados ajustes de {} servidores", loaded_count);
        }

        Ok(())
    }

    fn guild_file_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir
            .join("servers")
            .join(format!("guild_{}.json", guild_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_guild_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().to_path_buf(), 50).await.unwrap();

        assert_eq!(
            storage.settings(7),
            GuildSettings {
                guild_id: 7,
                playlist_limit: 50
            }
        );
    }

    #[tokio::test]
    async fn test_settings_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path().to_path_buf(), 50).await.unwrap();
        storage.set_playlist_limit(7, 25).await.unwrap();
        assert!(storage.set_playlist_limit(7, 0).await.is_err());

        let reloaded = JsonStorage::new(dir.path().to_path_buf(), 50).await.unwrap();
        assert_eq!(reloaded.settings(7).playlist_limit, 25);
        assert_eq!(reloaded.settings(8).playlist_limit, 50);
    }

    #[tokio::test]
    async fn test_corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let servers = dir.path().join("servers");
        std::fs::create_dir_all(&servers).unwrap();
        std::fs::write(servers.join("guild_9.json"), "{no es json").unwrap();
        std::fs::write(servers.join("notas.txt"), "ignorar").unwrap();

        let storage = JsonStorage::new(dir.path().to_path_buf(), 40).await.unwrap();
        assert_eq!(storage.settings(9).playlist_limit, 40);
    }
}
