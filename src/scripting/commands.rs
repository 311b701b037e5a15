//! 延迟脚本命令
//!
//! 原生回调不能在脚本正在执行时重新进入运行时，因此 `executeCommand`、
//! `executeFile`、`gc` 等请求只入队，由脚本子系统在帧间的 `update` 中排空。

use std::path::PathBuf;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// 排队等待执行的命令
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    /// 执行一段脚本源码
    ExecuteCommand(String),
    /// 执行一个脚本文件（经典脚本，非模块）
    ExecuteFile(PathBuf),
    /// 强制垃圾回收
    CollectGarbage,
}

/// 可克隆的命令发送端
#[derive(Debug, Clone)]
pub struct ScriptCommandSender {
    tx: Sender<ScriptCommand>,
}

impl ScriptCommandSender {
    /// 入队；子系统已关闭时返回 false
    pub fn send(&self, command: ScriptCommand) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "script", command = ?err.0, "script subsystem is gone, command dropped");
                false
            }
        }
    }

    pub fn execute_command(&self, source: impl Into<String>) -> bool {
        self.send(ScriptCommand::ExecuteCommand(source.into()))
    }

    pub fn execute_file(&self, path: impl Into<PathBuf>) -> bool {
        self.send(ScriptCommand::ExecuteFile(path.into()))
    }

    pub fn collect_garbage(&self) -> bool {
        self.send(ScriptCommand::CollectGarbage)
    }
}

/// 子系统持有的命令队列
#[derive(Debug)]
pub(crate) struct CommandQueue {
    tx: Sender<ScriptCommand>,
    rx: Receiver<ScriptCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> ScriptCommandSender {
        ScriptCommandSender {
            tx: self.tx.clone(),
        }
    }

    pub fn drain(&self) -> Vec<ScriptCommand> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_preserves_order() {
        let queue = CommandQueue::new();
        let sender = queue.sender();
        assert!(sender.execute_command("1 + 1"));
        assert!(sender.collect_garbage());
        assert!(sender.execute_file("Data/Scripts/extra.js"));

        assert_eq!(
            queue.drain(),
            vec![
                ScriptCommand::ExecuteCommand("1 + 1".into()),
                ScriptCommand::CollectGarbage,
                ScriptCommand::ExecuteFile(PathBuf::from("Data/Scripts/extra.js")),
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_send_after_drop_reports_failure() {
        let queue = CommandQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.collect_garbage());
    }
}
