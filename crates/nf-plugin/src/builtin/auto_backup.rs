//! Periodic snapshots of unsaved work.
//!
//! While the document is dirty, a copy is written to
//! `<work dir>/backups/<stem>_backup_<YYYYmmdd_HHMMSS>.ngp` every interval.
//! Clean documents are skipped. The project path and dirty flag are left
//! alone.

use crate::context::HookContext;
use crate::error::PluginError;
use crate::host::{Plugin, PluginEnv};
use crate::registry::Capabilities;
use crate::timer::TimerId;
use chrono::{DateTime, Local};
use nf_core::document::PROJECT_EXTENSION;
use nf_core::{Notice, ProjectDocument};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NAME: &str = "auto_backup";
pub const BACKUP_NOW_LABEL: &str = "Backup Now";
pub const BACKUP_DIR: &str = "backups";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;

const MIN_INTERVAL_MINUTES: u64 = 1;
const MAX_INTERVAL_MINUTES: u64 = 60;

pub struct AutoBackup {
    backup_dir: PathBuf,
    interval: Duration,
    timer: Option<TimerId>,
}

impl AutoBackup {
    pub fn new(env: &PluginEnv) -> Self {
        Self::with_interval(env.work_dir.join(BACKUP_DIR), DEFAULT_INTERVAL_MINUTES)
    }

    /// `minutes` is clamped to 1..=60.
    pub fn with_interval(backup_dir: impl Into<PathBuf>, minutes: u64) -> Self {
        let minutes = minutes.clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);
        Self {
            backup_dir: backup_dir.into(),
            interval: Duration::from_secs(minutes * 60),
            timer: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Plugin for AutoBackup {
    fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        let dir = self.backup_dir.clone();
        self.timer = Some(caps.schedule_repeating(
            self.interval,
            Box::new(move |ctx: &mut HookContext<'_>| {
                if !ctx.is_dirty() {
                    log::debug!("no unsaved changes, backup skipped");
                    return Ok(());
                }
                backup(&dir, ctx).map(|_| ())
            }),
        ));

        let dir = self.backup_dir.clone();
        caps.register_menu_command(
            BACKUP_NOW_LABEL,
            Box::new(move |ctx: &mut HookContext<'_>| {
                let path = backup(&dir, ctx)?;
                ctx.notify(Notice::info(format!("Backed up to {}", path.display())));
                Ok(())
            }),
        )
    }

    fn teardown(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        if let Some(id) = self.timer.take() {
            caps.cancel_timer(id);
        }
        caps.remove_menu_command(BACKUP_NOW_LABEL);
        Ok(())
    }
}

/// `Untitled` stands in for a project that was never saved.
pub fn backup_file_name(project: Option<&Path>, at: DateTime<Local>) -> String {
    let stem = project
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled");
    format!("{stem}_backup_{}.{PROJECT_EXTENSION}", at.format("%Y%m%d_%H%M%S"))
}

fn backup(dir: &Path, ctx: &mut HookContext<'_>) -> Result<PathBuf, PluginError> {
    fs::create_dir_all(dir).map_err(|e| PluginError::failed(format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(backup_file_name(ctx.project_path, Local::now()));
    ProjectDocument::capture(ctx.graph, ctx.data)
        .write(&path)
        .map_err(|e| PluginError::failed(e.to_string()))?;
    log::info!("backup written to {}", path.display());
    Ok(path)
}
