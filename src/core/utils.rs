//! 核心工具函数
//!
//! 提供项目中常用的工具函数，避免代码重复

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 帧线程与脚本回调之间共享的可变状态
pub type Shared<T> = Arc<Mutex<T>>;

/// 包装为 [`Shared`]
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// 获取锁；若持有者曾 panic，则继续使用内部数据
///
/// 帧循环在一次回调 panic 后仍需要能关闭各子系统。
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 获取当前Unix时间戳（秒）
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 获取当前Unix时间戳（秒，浮点数）
///
/// 用于需要高精度时间戳的场景
pub fn current_timestamp_f64() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// 文件最后修改时间（Unix 秒）
pub fn file_modified_seconds(path: &std::path::Path) -> std::io::Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts1 = current_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let ts2 = current_timestamp();
        assert!(ts2 >= ts1);
        assert!(current_timestamp_f64() > 0.0);
    }

    #[test]
    fn test_lock_recovers_from_poison() {
        let value = shared(5);
        let clone = Arc::clone(&value);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert!(value.is_poisoned());
        *lock(&value) += 1;
        assert_eq!(*lock(&value), 6);
    }

    #[test]
    fn test_file_modified_seconds() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let seconds = file_modified_seconds(file.path()).unwrap();
        assert!(seconds > 0.0);
        assert!(file_modified_seconds(std::path::Path::new("/definitely/missing")).is_err());
    }
}
