//! 作业系统
//!
//! 固定大小的工作线程池：N 个通用线程与 M 个 I/O 线程，各自从
//! `crossbeam-channel` 队列取作业。作业永远不接触脚本运行时。
//!
//! ```ignore
//! let jobs = JobSystem::new(&JobConfig::default())?;
//! let handle = jobs.submit(JobKind::Io, || std::fs::read_to_string("a.txt"));
//! let text = handle.wait()?;
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::config::JobConfig;
use crate::core::error::{JobError, JobResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// 作业类别，决定由哪一组工作线程执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Generic,
    Io,
}

impl JobKind {
    fn label(self) -> &'static str {
        match self {
            JobKind::Generic => "generic",
            JobKind::Io => "io",
        }
    }
}

/// 作业结果句柄
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: Receiver<JobResult<T>>,
    result: Option<JobResult<T>>,
}

impl<T> JobHandle<T> {
    fn poll(&mut self) {
        if self.result.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(result) => self.result = Some(result),
            Err(TryRecvError::Disconnected) => self.result = Some(Err(JobError::Disconnected)),
            Err(TryRecvError::Empty) => {}
        }
    }

    pub fn is_finished(&mut self) -> bool {
        self.poll();
        self.result.is_some()
    }

    /// 作业完成时取出结果；未完成返回 `None`
    pub fn try_take(&mut self) -> Option<JobResult<T>> {
        self.poll();
        self.result.take()
    }

    /// 阻塞直到作业完成
    pub fn wait(mut self) -> JobResult<T> {
        if let Some(result) = self.result.take() {
            return result;
        }
        self.rx.recv().unwrap_or(Err(JobError::Disconnected))
    }
}

struct WorkerGroup {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    fn spawn(kind: JobKind, count: usize, completed: &Arc<AtomicUsize>) -> JobResult<Self> {
        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let rx = rx.clone();
            let completed = Arc::clone(completed);
            let handle = thread::Builder::new()
                .name(format!("job-{}-{}", kind.label(), index))
                .spawn(move || worker_loop(rx, completed))
                .map_err(|e| JobError::Spawn(e.to_string()))?;
            workers.push(handle);
        }
        Ok(Self {
            tx: Some(tx),
            workers,
        })
    }

    fn shutdown(&mut self) {
        // 关闭发送端后，工作线程处理完剩余作业即退出
        self.tx = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!(target: "jobs", "worker thread terminated abnormally");
            }
        }
    }
}

fn worker_loop(rx: Receiver<Job>, completed: Arc<AtomicUsize>) {
    while let Ok(job) = rx.recv() {
        job();
        completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// 作业系统
pub struct JobSystem {
    generic: WorkerGroup,
    io: WorkerGroup,
    completed: Arc<AtomicUsize>,
}

impl JobSystem {
    /// 启动工作线程；`generic_workers` 为 0 时按 CPU 核心数减一计算
    pub fn new(config: &JobConfig) -> JobResult<Self> {
        let generic_count = if config.generic_workers == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            config.generic_workers
        };
        let io_count = config.io_workers.max(1);

        let completed = Arc::new(AtomicUsize::new(0));
        let generic = WorkerGroup::spawn(JobKind::Generic, generic_count, &completed)?;
        let io = WorkerGroup::spawn(JobKind::Io, io_count, &completed)?;

        tracing::info!(target: "jobs", generic = generic_count, io = io_count, "job system started");
        Ok(Self {
            generic,
            io,
            completed,
        })
    }

    /// 提交作业；作业中的 panic 以 [`JobError::Panicked`] 返回，工作线程继续运行
    pub fn submit<F, T>(&self, kind: JobKind, job: F) -> JobHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = unbounded();
        let wrapped: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(target: "jobs", "job panicked: {}", message);
                JobError::Panicked(message)
            });
            // 调用方可能已丢弃句柄
            let _ = result_tx.send(result);
        });

        let group = match kind {
            JobKind::Generic => &self.generic,
            JobKind::Io => &self.io,
        };
        match &group.tx {
            Some(tx) if tx.send(wrapped).is_ok() => {}
            _ => tracing::warn!(target: "jobs", kind = kind.label(), "job submitted after shutdown"),
        }

        JobHandle {
            rx: result_rx,
            result: None,
        }
    }

    pub fn worker_count(&self, kind: JobKind) -> usize {
        match kind {
            JobKind::Generic => self.generic.workers.len(),
            JobKind::Io => self.io.workers.len(),
        }
    }

    pub fn completed_jobs(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn begin_frame(&mut self) {}

    pub fn end_frame(&mut self) {}

    /// 等待所有已提交作业完成并回收全部工作线程
    pub fn shutdown(&mut self) {
        if self.generic.tx.is_none() && self.io.tx.is_none() {
            return;
        }
        self.generic.shutdown();
        self.io.shutdown();
        tracing::info!(target: "jobs", completed = self.completed_jobs(), "job system shut down");
    }

    pub fn is_running(&self) -> bool {
        self.generic.tx.is_some()
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> JobSystem {
        JobSystem::new(&JobConfig {
            generic_workers: 2,
            io_workers: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_results_come_back_through_handles() {
        let jobs = jobs();
        let handles: Vec<_> = (0..8)
            .map(|i| jobs.submit(JobKind::Generic, move || i * i))
            .collect();
        let results: Vec<i32> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn test_io_jobs_run_on_io_worker() {
        let jobs = jobs();
        let name = jobs
            .submit(JobKind::Io, || thread::current().name().map(str::to_string))
            .wait()
            .unwrap();
        assert_eq!(name.as_deref(), Some("job-io-0"));
        assert_eq!(jobs.worker_count(JobKind::Io), 1);
    }

    #[test]
    fn test_panicking_job_keeps_worker_alive() {
        let jobs = JobSystem::new(&JobConfig {
            generic_workers: 1,
            io_workers: 1,
        })
        .unwrap();
        let failed = jobs.submit(JobKind::Generic, || -> u32 { panic!("boom") }).wait();
        assert!(matches!(failed, Err(JobError::Panicked(ref m)) if m == "boom"));

        let after = jobs.submit(JobKind::Generic, || 7u32).wait();
        assert_eq!(after.unwrap(), 7);
    }

    #[test]
    fn test_try_take_and_shutdown_joins() {
        let mut jobs = jobs();
        let mut handle = jobs.submit(JobKind::Generic, || "done");
        jobs.shutdown();
        assert!(!jobs.is_running());
        assert!(handle.is_finished());
        assert_eq!(handle.try_take().unwrap().unwrap(), "done");
        assert_eq!(jobs.completed_jobs(), 1);

        let late = jobs.submit(JobKind::Generic, || 1);
        assert!(matches!(late.wait(), Err(JobError::Disconnected)));
    }
}
