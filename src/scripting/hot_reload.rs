//! 脚本热重载
//!
//! 文件监视线程只负责把变更路径送入通道；真正的重载在帧线程上、
//! 两帧之间进行。同一文件在去抖窗口内的多次变更只触发一次重载。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

/// 热重载错误
#[derive(Error, Debug)]
pub enum HotReloadError {
    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Watch root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// 重载统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadStats {
    pub reload_count: u64,
    pub failed_reload_count: u64,
    pub last_reload_error: Option<String>,
}

impl ReloadStats {
    pub fn record_success(&mut self) {
        self.reload_count += 1;
        self.last_reload_error = None;
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failed_reload_count += 1;
        self.last_reload_error = Some(error.into());
    }
}

fn is_script_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("mjs") | Some("js")
    )
}

/// 变更收集与去抖
pub struct HotReloadCoordinator {
    tx: Sender<PathBuf>,
    rx: Receiver<PathBuf>,
    watcher: Option<RecommendedWatcher>,
    pending: HashMap<PathBuf, Instant>,
    debounce: Duration,
    stats: ReloadStats,
}

impl HotReloadCoordinator {
    pub fn new(debounce: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            watcher: None,
            pending: HashMap::new(),
            debounce,
            stats: ReloadStats::default(),
        }
    }

    /// 递归监视脚本目录
    pub fn watch(&mut self, root: &Path) -> Result<(), HotReloadError> {
        if !root.is_dir() {
            return Err(HotReloadError::MissingRoot(root.to_path_buf()));
        }

        let tx = self.tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    for path in event.paths {
                        if is_script_file(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(target: "script.hot_reload", "watch error: {}", err),
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        self.watcher = Some(watcher);

        tracing::info!(target: "script.hot_reload", root = %root.display(), "watching scripts for changes");
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!(target: "script.hot_reload", "file watcher stopped");
        }
        self.pending.clear();
    }

    /// 手动报告一次变更（与监视线程走同一通道）
    pub fn notify_changed(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(path.into());
    }

    /// 取出已经稳定（超过去抖窗口）的变更路径
    pub fn poll_ready(&mut self) -> Vec<PathBuf> {
        self.poll_ready_at(Instant::now())
    }

    pub fn poll_ready_at(&mut self, now: Instant) -> Vec<PathBuf> {
        for path in self.rx.try_iter() {
            self.pending.insert(path, now);
        }

        let debounce = self.debounce;
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) >= debounce)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready.sort();
        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.rx.is_empty()
    }

    pub fn stats(&self) -> &ReloadStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut ReloadStats {
        &mut self.stats
    }
}
