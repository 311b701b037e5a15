//! 按大小/时间轮转的日志文件
//!
//! 当前会话总是写入 `<log_directory>/<current_log_name>`。超过大小上限、
//! 超过时间间隔或进程启动时发现旧文件，旧文件会被改名为
//! `<session_prefix>_<unix 时间戳>.log`。

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::RotationConfig;
use crate::core::utils::current_timestamp;

pub struct RotatingFileWriter {
    config: RotationConfig,
    file: Option<BufWriter<File>>,
    written: u64,
    opened_at: Instant,
    auto_flush: bool,
    rotations: u32,
}

impl RotatingFileWriter {
    /// 打开当前日志文件；已存在的非空文件先归档
    pub fn open(config: RotationConfig, auto_flush: bool) -> io::Result<Self> {
        fs::create_dir_all(&config.log_directory)?;
        let mut writer = Self {
            config,
            file: None,
            written: 0,
            opened_at: Instant::now(),
            auto_flush,
            rotations: 0,
        };
        let current = writer.current_path();
        if fs::metadata(&current).map(|m| m.len() > 0).unwrap_or(false) {
            writer.archive_current()?;
        }
        writer.open_fresh()?;
        Ok(writer)
    }

    pub fn current_path(&self) -> PathBuf {
        self.config.log_directory.join(&self.config.current_log_name)
    }

    /// 本进程内发生的轮转次数
    pub fn rotations(&self) -> u32 {
        self.rotations
    }

    fn open_fresh(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.current_path())?;
        self.file = Some(BufWriter::new(file));
        self.written = 0;
        self.opened_at = Instant::now();
        Ok(())
    }

    fn archive_current(&mut self) -> io::Result<PathBuf> {
        let target = archive_path(
            &self.config.log_directory,
            &self.config.session_prefix,
            current_timestamp(),
        );
        fs::rename(self.current_path(), &target)?;
        Ok(target)
    }

    fn should_rotate(&self, incoming: usize) -> bool {
        if self.written == 0 {
            return false;
        }
        let max_size = self.config.max_file_size_bytes;
        let over_size = max_size > 0 && self.written + incoming as u64 > max_size;
        let max_age = Duration::from_secs(self.config.max_time_interval_hours * 3600);
        let over_age = !max_age.is_zero() && self.opened_at.elapsed() >= max_age;
        over_size || over_age
    }

    /// 立即归档当前文件并重新开始
    pub fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        self.archive_current()?;
        self.rotations += 1;
        self.open_fresh()
    }
}

/// 同一秒内多次归档时追加序号避免覆盖
fn archive_path(directory: &Path, prefix: &str, timestamp: u64) -> PathBuf {
    let mut candidate = directory.join(format!("{}_{}.log", prefix, timestamp));
    let mut counter = 1;
    while candidate.exists() {
        candidate = directory.join(format!("{}_{}_{}.log", prefix, timestamp, counter));
        counter += 1;
    }
    candidate
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rotate(buf.len()) {
            self.rotate()?;
        }
        let auto_flush = self.auto_flush;
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Err(io::Error::new(io::ErrorKind::Other, "log file is closed")),
        };
        let written = file.write(buf)?;
        if auto_flush {
            file.flush()?;
        }
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for RotatingFileWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
