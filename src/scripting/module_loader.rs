//! ES 模块加载器
//!
//! 负责模块说明符解析、源码读取与缓存、依赖图维护。模块名即规范化后的
//! 绝对路径（使用 `/` 分隔）；带 `scheme://` 前缀的名称是内存中的虚拟模块
//! （例如 `test://phase1_validation`），其相对导入以脚本根目录为基准。
//!
//! 解析规则：
//! - `./x`、`../x`：相对于导入者所在目录
//! - `/x`：相对于脚本根目录（已是根目录下完整路径时原样使用）
//! - 裸名称 `x`：相对于脚本根目录
//! - 依次尝试原名、`.mjs`、`.js` 扩展名

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use rquickjs::loader::{Loader, Resolver};
use rquickjs::module::Declared;
use rquickjs::{Ctx, Module};

use crate::core::error::{ModuleError, ModuleResult};
use crate::core::utils::lock;

use super::module_scan::{scan_imports, ImportKind};

/// 依次尝试的扩展名
const PROBE_EXTENSIONS: &[&str] = &["", ".mjs", ".js"];

/// 与运行时共享的加载器
pub type SharedModuleLoader = Arc<Mutex<ModuleLoader>>;

/// 一次预解析得到的依赖图
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleGraph {
    pub root: String,
    /// 按发现顺序排列，根模块在首位
    pub modules: Vec<String>,
}

impl ModuleGraph {
    pub fn contains(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }
}

/// 模块加载器
#[derive(Debug)]
pub struct ModuleLoader {
    root: PathBuf,
    virtual_sources: HashMap<String, String>,
    source_cache: HashMap<String, String>,
    /// 导入者 → 已解析的依赖
    edges: HashMap<String, Vec<String>>,
    /// 运行时回调中记录的第一个失败，用于区分失败类别
    pending_failure: Option<ModuleError>,
}

impl ModuleLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = fs::canonicalize(root).unwrap_or_else(|_| absolute(root));
        tracing::debug!(target: "script.modules", root = %root.display(), "module loader created");
        Self {
            root,
            virtual_sources: HashMap::new(),
            source_cache: HashMap::new(),
            edges: HashMap::new(),
            pending_failure: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_virtual(name: &str) -> bool {
        name.contains("://")
    }

    /// 注册内存模块；同名模块会被替换
    pub fn register_virtual(&mut self, name: &str, source: &str) {
        self.virtual_sources
            .insert(name.to_string(), source.to_string());
        self.source_cache.remove(name);
    }

    /// 文件路径对应的模块名
    pub fn module_name_for_path(&self, path: &Path) -> String {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let path = fs::canonicalize(&path).unwrap_or_else(|_| normalize(&path));
        path_to_name(&path)
    }

    /// 解析入口模块；文件不存在时返回 `NotFound`
    pub fn resolve_entry(&self, path: &str) -> ModuleResult<String> {
        if Self::is_virtual(path) {
            return if self.virtual_sources.contains_key(path) {
                Ok(path.to_string())
            } else {
                Err(ModuleError::NotFound {
                    path: path.to_string(),
                })
            };
        }

        let candidate = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.root.join(path)
        };
        self.probe(&normalize(&candidate))
            .ok_or_else(|| ModuleError::NotFound {
                path: path.to_string(),
            })
    }

    /// 解析 `importer` 中出现的说明符
    pub fn resolve(&self, importer: &str, specifier: &str) -> ModuleResult<String> {
        let unresolved = || ModuleError::Resolution {
            importer: importer.to_string(),
            specifier: specifier.to_string(),
        };

        if Self::is_virtual(specifier) {
            return if self.virtual_sources.contains_key(specifier) {
                Ok(specifier.to_string())
            } else {
                Err(unresolved())
            };
        }

        let candidate = if specifier.starts_with("./") || specifier.starts_with("../") {
            let base = if Self::is_virtual(importer) || importer.is_empty() {
                self.root.clone()
            } else {
                Path::new(importer)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone())
            };
            base.join(specifier)
        } else if Path::new(specifier).starts_with(&self.root) {
            PathBuf::from(specifier)
        } else {
            self.root.join(specifier.trim_start_matches('/'))
        };

        self.probe(&normalize(&candidate)).ok_or_else(unresolved)
    }

    fn probe(&self, candidate: &Path) -> Option<String> {
        let base = candidate.as_os_str().to_string_lossy().into_owned();
        PROBE_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{}{}", base, ext)))
            .find(|path| path.is_file())
            .map(|path| path_to_name(&path))
    }

    /// 读取模块源码（带缓存）
    pub fn source(&mut self, name: &str) -> ModuleResult<String> {
        if let Some(source) = self.source_cache.get(name) {
            return Ok(source.clone());
        }

        let source = match self.virtual_sources.get(name) {
            Some(source) => source.clone(),
            None => fs::read_to_string(name).map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ModuleError::NotFound {
                    path: name.to_string(),
                },
                _ => ModuleError::Read {
                    path: name.to_string(),
                    message: err.to_string(),
                },
            })?,
        };

        self.source_cache.insert(name.to_string(), source.clone());
        Ok(source)
    }

    /// 预解析依赖图
    ///
    /// 任何静态依赖无法解析都会以 `Resolution` 失败；字面量动态导入只在
    /// 可解析时记为依赖边，其失败留给运行时的 Promise 处理。
    pub fn collect_graph(&mut self, root: &str) -> ModuleResult<ModuleGraph> {
        let mut modules = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root.to_string()];

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let source = self.source(&name)?;

            let mut dependencies = Vec::new();
            for import in scan_imports(&source) {
                match self.resolve(&name, &import.specifier) {
                    Ok(resolved) => dependencies.push(resolved),
                    Err(err) if import.kind != ImportKind::Dynamic => return Err(err),
                    Err(_) => {
                        tracing::debug!(
                            target: "script.modules",
                            importer = %name,
                            specifier = %import.specifier,
                            "dynamic import not resolvable ahead of time"
                        );
                    }
                }
            }

            for dependency in dependencies.iter().rev() {
                if !visited.contains(dependency) {
                    stack.push(dependency.clone());
                }
            }
            self.edges.insert(name.clone(), dependencies);
            modules.push(name);
        }

        Ok(ModuleGraph {
            root: root.to_string(),
            modules,
        })
    }

    /// 丢弃某个模块的缓存源码
    pub fn invalidate(&mut self, name: &str) {
        self.source_cache.remove(name);
    }

    pub fn invalidate_all(&mut self) {
        self.source_cache.clear();
    }

    /// 直接或间接导入了 `name` 的所有模块
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let mut dependents = Vec::new();
        let mut frontier = vec![name.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = frontier.pop() {
            for (importer, dependencies) in &self.edges {
                if dependencies.contains(&current) && seen.insert(importer.clone()) {
                    dependents.push(importer.clone());
                    frontier.push(importer.clone());
                }
            }
        }

        dependents.sort();
        dependents
    }

    /// 依赖图中已知的模块
    pub fn tracked_modules(&self) -> Vec<String> {
        let mut modules: Vec<_> = self.edges.keys().cloned().collect();
        modules.sort();
        modules
    }

    pub(crate) fn record_failure(&mut self, failure: ModuleError) {
        if self.pending_failure.is_none() {
            self.pending_failure = Some(failure);
        }
    }

    pub(crate) fn take_failure(&mut self) -> Option<ModuleError> {
        self.pending_failure.take()
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        std::env::current_dir()
            .map(|cwd| normalize(&cwd.join(path)))
            .unwrap_or_else(|_| normalize(path))
    }
}

/// 词法规范化：去掉 `.`，折叠 `..`
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn path_to_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ============================================================================
// rquickjs 接入
// ============================================================================

/// 运行时的模块说明符解析回调
pub(crate) struct BridgeResolver(pub SharedModuleLoader);

impl Resolver for BridgeResolver {
    fn resolve<'js>(&mut self, _ctx: &Ctx<'js>, base: &str, name: &str) -> rquickjs::Result<String> {
        let mut loader = lock(&self.0);
        loader.resolve(base, name).map_err(|err| {
            tracing::warn!(target: "script.modules", base, name, "{}", err);
            loader.record_failure(err);
            rquickjs::Error::new_resolving(base, name)
        })
    }
}

/// 运行时的模块源码加载回调
pub(crate) struct BridgeLoader(pub SharedModuleLoader);

impl Loader for BridgeLoader {
    fn load<'js>(&mut self, ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Module<'js, Declared>> {
        let source = {
            let mut loader = lock(&self.0);
            match loader.source(name) {
                Ok(source) => source,
                Err(err) => {
                    loader.record_failure(err);
                    return Err(rquickjs::Error::new_loading(name));
                }
            }
        };

        tracing::trace!(target: "script.modules", name, "declaring module");
        Module::declare(ctx.clone(), name, source).map_err(|err| {
            lock(&self.0).record_failure(ModuleError::Compilation {
                module: name.to_string(),
                message: String::new(),
            });
            err
        })
    }
}
