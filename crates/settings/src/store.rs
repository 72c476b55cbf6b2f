//! File-backed settings store with atomic writes and per-guild locking.

use std::{path::PathBuf, sync::Arc};

use {
    dashmap::DashMap,
    tokio::{fs, sync::Mutex},
    tracing::{debug, error, warn},
};

use {
    crate::{
        error::{Context, Result},
        schema::GuildSettings,
    },
    lorebot_common::types::GuildId,
};

const SETTINGS_FILE: &str = "settings.txt";
const NAME_FILE: &str = "_server_name.txt";

/// Owns every guild's settings: an in-memory cache over one text file per
/// guild. Mutations go through [`SettingsStore::update`], which holds the
/// guild's lock across the whole mutate-then-persist sequence so concurrent
/// messages cannot lose writes.
pub struct SettingsStore {
    dir: PathBuf,
    cache: DashMap<GuildId, Arc<Mutex<GuildSettings>>>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            cache: DashMap::new(),
        }
    }

    /// Create a store using the default `~/.lorebot/guilds/` layout.
    pub fn default_path() -> Result<Self> {
        let home = dirs_next::home_dir().context("cannot determine home directory")?;
        Ok(Self::new(home.join(".lorebot").join("guilds")))
    }

    fn guild_dir(&self, id: GuildId) -> PathBuf {
        self.dir.join(format!("guild-{id}"))
    }

    fn settings_path(&self, id: GuildId) -> PathBuf {
        self.guild_dir(id).join(SETTINGS_FILE)
    }

    /// Fetch the cached entry for a guild, loading it from disk (or creating
    /// defaults, without persisting) on first access.
    async fn entry(&self, id: GuildId) -> Arc<Mutex<GuildSettings>> {
        if let Some(existing) = self.cache.get(&id) {
            return Arc::clone(&existing);
        }

        let loaded = if self.has_save(id).await {
            self.load(id).await.unwrap_or_else(|err| {
                error!(guild_id = id, %err, "could not read settings save, using defaults");
                GuildSettings::new(id)
            })
        } else {
            debug!(guild_id = id, "no settings save, initializing defaults");
            GuildSettings::new(id)
        };

        // Another task may have populated the entry while we were reading the
        // file; entry() makes sure everyone ends up sharing one lock.
        Arc::clone(
            &self
                .cache
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(loaded))),
        )
    }

    /// Current settings snapshot. First access creates defaults in memory but
    /// does not persist them.
    pub async fn get(&self, id: GuildId) -> GuildSettings {
        let entry = self.entry(id).await;
        let guard = entry.lock().await;
        guard.clone()
    }

    /// Apply a mutation and persist the result, returning the new snapshot.
    ///
    /// The guild lock is held across mutate + save. A failed save is logged
    /// and the in-memory state stays authoritative.
    pub async fn update<F>(&self, id: GuildId, mutate: F) -> GuildSettings
    where
        F: FnOnce(&mut GuildSettings),
    {
        let entry = self.entry(id).await;
        let mut guard = entry.lock().await;
        mutate(&mut guard);
        if let Err(err) = self.save(&guard).await {
            error!(guild_id = id, %err, "could not persist settings, keeping in-memory state");
        }
        guard.clone()
    }

    /// Write the full settings record, atomically enough that a reader never
    /// observes a half-written file: write to a temp path, then rename.
    pub async fn save(&self, settings: &GuildSettings) -> Result<()> {
        let id = settings.id();
        fs::create_dir_all(self.guild_dir(id))
            .await
            .with_context(|| format!("create settings dir for guild {id}"))?;

        let path = self.settings_path(id);
        let tmp = path.with_extension("txt.tmp");
        fs::write(&tmp, settings.serialize())
            .await
            .with_context(|| format!("write settings for guild {id}"))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("finalize settings for guild {id}"))?;
        Ok(())
    }

    /// Reconstruct settings from disk. Corrupt fields default individually.
    pub async fn load(&self, id: GuildId) -> Result<GuildSettings> {
        let text = fs::read_to_string(self.settings_path(id))
            .await
            .with_context(|| format!("read settings for guild {id}"))?;
        Ok(GuildSettings::parse(id, &text))
    }

    pub async fn has_save(&self, id: GuildId) -> bool {
        fs::try_exists(self.settings_path(id)).await.unwrap_or(false)
    }

    /// Remove all durable and cached state for a guild (tenant removal).
    pub async fn delete(&self, id: GuildId) -> Result<()> {
        self.cache.remove(&id);
        let dir = self.guild_dir(id);
        if fs::try_exists(&dir).await.unwrap_or(false) {
            fs::remove_dir_all(&dir)
                .await
                .with_context(|| format!("delete settings for guild {id}"))?;
        }
        Ok(())
    }

    /// Number of guilds with a durable settings save.
    pub async fn saved_guild_count(&self) -> usize {
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_guild_dir = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with("guild-"));
            if is_guild_dir && fs::try_exists(entry.path().join(SETTINGS_FILE)).await.unwrap_or(false)
            {
                count += 1;
            }
        }
        count
    }

    /// Record the guild's display name beside its settings. Best-effort: a
    /// failure is logged and otherwise ignored.
    pub async fn record_name(&self, id: GuildId, name: &str) {
        let write = async {
            fs::create_dir_all(self.guild_dir(id)).await?;
            fs::write(self.guild_dir(id).join(NAME_FILE), format!("{name}\n")).await
        };
        if let Err(err) = write.await {
            warn!(guild_id = id, %err, "could not record guild name");
        }
    }
}
