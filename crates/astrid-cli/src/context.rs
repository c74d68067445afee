//! Operator data directory and key resolution.
//!
//! Mirrors `astrid-config`'s own `ASTRID_HOME` convention (`~/.astrid` by
//! default, overridable via the `ASTRID_HOME` environment variable) so an
//! operator pointing both the kernel and this CLI at the same home
//! resolves the same database and runtime key.

use std::path::PathBuf;

use anyhow::{Context, Result};
use astrid_audit::AuditLog;
use astrid_crypto::KeyPair;
use astrid_mediator::{BanList, IdentityLinks};
use astrid_scheduler::CronStore;
use astrid_storage::Database;

/// Resolve the Astrid home directory: `$ASTRID_HOME`, or `~/.astrid`.
#[must_use]
pub(crate) fn astrid_home() -> PathBuf {
    if let Ok(home) = std::env::var("ASTRID_HOME") {
        return PathBuf::from(home);
    }
    directories::BaseDirs::new().map_or_else(|| PathBuf::from(".astrid"), |dirs| dirs.home_dir().join(".astrid"))
}

/// Everything an operator subcommand needs: the shared database handle and
/// an audit log signing on the runtime's behalf.
pub(crate) struct CliContext {
    pub(crate) db: Database,
    pub(crate) audit: AuditLog,
}

impl CliContext {
    /// Connect to the operator's Astrid home, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created, the
    /// database cannot be opened, or the runtime key cannot be loaded or
    /// generated.
    pub(crate) async fn connect() -> Result<Self> {
        let home = astrid_home();
        let data_dir = home.join("data");
        let key_path = home.join("keys").join("runtime.key");

        std::fs::create_dir_all(&data_dir).with_context(|| format!("creating data directory {}", data_dir.display()))?;
        std::fs::create_dir_all(key_path.parent().expect("key_path has a parent"))
            .with_context(|| format!("creating key directory for {}", key_path.display()))?;

        let db = Database::connect_embedded(data_dir.to_str().context("data directory path is not valid UTF-8")?)
            .await
            .context("opening the Astrid database")?;
        let keypair = KeyPair::load_or_generate(&key_path).context("loading or generating the runtime key")?;
        let audit = AuditLog::new(db.clone(), keypair);

        Ok(Self { db, audit })
    }

    #[must_use]
    pub(crate) fn bans(&self) -> BanList {
        BanList::new(self.db.clone())
    }

    #[must_use]
    pub(crate) fn identity_links(&self) -> IdentityLinks {
        IdentityLinks::new(self.db.clone())
    }

    #[must_use]
    pub(crate) fn cron(&self) -> CronStore {
        CronStore::new(self.db.clone())
    }
}
