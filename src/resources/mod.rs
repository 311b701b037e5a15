//! 资源子系统
//!
//! - 文本文件加载与缓存，支持通过作业系统的 I/O 线程异步加载
//! - 位图字体句柄；字体引用渲染器拥有的纹理，必须在渲染器关闭前释放

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::{ResourceError, ResourceResult};
use crate::core::jobs::{JobHandle, JobKind, JobSystem};
use crate::render::{Renderer, TextureId};

/// 位图字体
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapFont {
    pub name: String,
    pub texture: TextureId,
    /// 单个字形的宽高比
    pub glyph_aspect: f32,
}

type PendingLoad = JobHandle<std::io::Result<String>>;

/// 资源子系统
#[derive(Default)]
pub struct ResourceSubsystem {
    font_directory: PathBuf,
    text_cache: HashMap<PathBuf, Arc<str>>,
    fonts: HashMap<String, Arc<BitmapFont>>,
    pending: Vec<(PathBuf, PendingLoad)>,
    failed: Vec<(PathBuf, String)>,
}

impl ResourceSubsystem {
    pub fn new(font_directory: impl Into<PathBuf>) -> Self {
        Self {
            font_directory: font_directory.into(),
            ..Self::default()
        }
    }

    pub fn startup(&mut self) {
        tracing::info!(target: "resources", fonts = %self.font_directory.display(), "resource subsystem started");
    }

    /// 释放字体与缓存；在渲染器关闭之前调用
    pub fn shutdown(&mut self) {
        self.release_fonts();
        self.text_cache.clear();
        self.pending.clear();
        tracing::info!(target: "resources", "resource subsystem shut down");
    }

    /// 收集已完成的异步加载
    pub fn begin_frame(&mut self) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for (path, mut handle) in self.pending.drain(..) {
            match handle.try_take() {
                None => still_pending.push((path, handle)),
                Some(Ok(Ok(text))) => {
                    tracing::debug!(target: "resources", path = %path.display(), "async load finished");
                    self.text_cache.insert(path, Arc::from(text));
                }
                Some(Ok(Err(err))) => {
                    tracing::warn!(target: "resources", path = %path.display(), "async load failed: {}", err);
                    self.failed.push((path, err.to_string()));
                }
                Some(Err(err)) => {
                    tracing::error!(target: "resources", path = %path.display(), "async load job failed: {}", err);
                    self.failed.push((path, err.to_string()));
                }
            }
        }
        self.pending = still_pending;
    }

    pub fn end_frame(&mut self) {}

    /// 同步加载文本；结果被缓存
    pub fn load_text(&mut self, path: impl AsRef<Path>) -> ResourceResult<Arc<str>> {
        let path = path.as_ref();
        if let Some(text) = self.text_cache.get(path) {
            return Ok(Arc::clone(text));
        }
        let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ResourceError::NotFound {
                path: path.display().to_string(),
            },
            _ => ResourceError::LoadFailed {
                path: path.display().to_string(),
                reason: err.to_string(),
            },
        })?;
        let text: Arc<str> = Arc::from(text);
        self.text_cache.insert(path.to_path_buf(), Arc::clone(&text));
        Ok(text)
    }

    /// 在 I/O 工作线程上读取文件；完成后在某个 `begin_frame` 中进入缓存
    pub fn load_text_async(&mut self, jobs: &JobSystem, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.text_cache.contains_key(&path) || self.pending.iter().any(|(p, _)| *p == path) {
            return;
        }
        let job_path = path.clone();
        let handle = jobs.submit(JobKind::Io, move || std::fs::read_to_string(job_path));
        self.pending.push((path, handle));
    }

    pub fn cached_text(&self, path: impl AsRef<Path>) -> Option<Arc<str>> {
        self.text_cache.get(path.as_ref()).cloned()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// 取出累计的异步加载失败
    pub fn take_failures(&mut self) -> Vec<(PathBuf, String)> {
        std::mem::take(&mut self.failed)
    }

    /// 字体的纹理由渲染器创建并持有
    pub fn create_or_get_bitmap_font(&mut self, name: &str, renderer: &mut Renderer) -> Arc<BitmapFont> {
        if let Some(font) = self.fonts.get(name) {
            return Arc::clone(font);
        }
        let texture_path = self.font_directory.join(format!("{}.png", name));
        let texture = renderer.create_or_get_texture(&texture_path.to_string_lossy());
        let font = Arc::new(BitmapFont {
            name: name.to_string(),
            texture,
            glyph_aspect: 0.7,
        });
        self.fonts.insert(name.to_string(), Arc::clone(&font));
        font
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn release_fonts(&mut self) {
        let count = self.fonts.len();
        self.fonts.clear();
        if count > 0 {
            tracing::debug!(target: "resources", count, "bitmap fonts released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobConfig, WindowConfig};
    use std::time::{Duration, Instant};

    #[test]
    fn test_load_text_caches_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        std::fs::write(&path, "hello").unwrap();

        let mut resources = ResourceSubsystem::new("Data/Fonts");
        assert_eq!(&*resources.load_text(&path).unwrap(), "hello");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(&*resources.load_text(&path).unwrap(), "hello");

        assert!(matches!(
            resources.load_text(dir.path().join("missing.txt")),
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_async_load_lands_in_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{}").unwrap();
        let jobs = JobSystem::new(&JobConfig::default()).unwrap();

        let mut resources = ResourceSubsystem::new("Data/Fonts");
        resources.load_text_async(&jobs, &path);
        resources.load_text_async(&jobs, dir.path().join("absent.json"));

        let deadline = Instant::now() + Duration::from_secs(5);
        while resources.pending_loads() > 0 && Instant::now() < deadline {
            resources.begin_frame();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(resources.cached_text(&path).as_deref(), Some("{}"));
        assert_eq!(resources.take_failures().len(), 1);
    }

    #[test]
    fn test_fonts_reference_renderer_textures() {
        let mut renderer = Renderer::new(&WindowConfig::default());
        let mut resources = ResourceSubsystem::new("Data/Fonts");
        let font = resources.create_or_get_bitmap_font("SquirrelFixedFont", &mut renderer);
        let again = resources.create_or_get_bitmap_font("SquirrelFixedFont", &mut renderer);
        assert!(Arc::ptr_eq(&font, &again));
        assert!(renderer.has_texture(font.texture));

        resources.shutdown();
        assert_eq!(resources.font_count(), 0);
    }
}
