//! 把日志事件送入开发者控制台的 `tracing` 层

use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::core::dev_console::{DevConsole, LineKind};
use crate::core::utils::{lock, Shared};

/// 脚本 `print` 直接写控制台，这个目标的事件不再重复输出
pub const PRINT_TARGET: &str = "script.print";

pub struct DevConsoleLayer {
    console: Shared<DevConsole>,
}

impl DevConsoleLayer {
    pub fn new(console: Shared<DevConsole>) -> Self {
        Self { console }
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

fn line_kind(level: &Level, target: &str) -> LineKind {
    if target.starts_with("script.console") {
        return LineKind::Script;
    }
    match *level {
        Level::ERROR => LineKind::Error,
        Level::WARN => LineKind::Warning,
        _ => LineKind::Info,
    }
}

impl<S: Subscriber> Layer<S> for DevConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() == PRINT_TARGET {
            return;
        }
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "[{}] {}: {}{}",
            metadata.level(),
            metadata.target(),
            visitor.message,
            visitor.fields
        );
        lock(&self.console).add_line(line_kind(metadata.level(), metadata.target()), &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::shared;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_become_console_lines() {
        let console = shared(DevConsole::new(16));
        let subscriber =
            tracing_subscriber::registry().with(DevConsoleLayer::new(console.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "script", object = "game", "slow call");
            tracing::info!(target: "script.console", "from js");
            tracing::info!(target: PRINT_TARGET, "printed directly");
        });

        let console = lock(&console);
        let lines: Vec<_> = console.lines().cloned().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].kind, LineKind::Warning);
        assert_eq!(lines[0].text, "[WARN] script: slow call object=game");
        assert_eq!(lines[1].kind, LineKind::Script);
    }
}
