//! 事件系统
//!
//! 按名称（不区分大小写）订阅与触发的同步事件总线。回调返回 `true`
//! 表示事件已被消费，后续订阅者不再收到。

use std::collections::HashMap;

/// 事件参数（键值字符串）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventArgs {
    values: HashMap<String, String>,
}

impl EventArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.values.insert(key.to_ascii_lowercase(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }
}

/// 事件回调
pub type EventCallback = Box<dyn FnMut(&EventArgs) -> bool + Send>;

/// 订阅句柄，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    callback: EventCallback,
}

/// 同步事件总线
pub struct EventSystem {
    subscriptions: HashMap<String, Vec<Subscription>>,
    next_id: u64,
}

crate::impl_default_and_new!(EventSystem {
    subscriptions: HashMap::new(),
    next_id: 1,
});

impl EventSystem {
    pub fn subscribe<F>(&mut self, event: &str, callback: F) -> SubscriptionId
    where
        F: FnMut(&EventArgs) -> bool + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions
            .entry(event.to_ascii_lowercase())
            .or_default()
            .push(Subscription {
                id,
                callback: Box::new(callback),
            });
        tracing::trace!(target: "events", event, id = id.0, "subscribed");
        id
    }

    pub fn unsubscribe(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(list) = self.subscriptions.get_mut(&event.to_ascii_lowercase()) else {
            return false;
        };
        let before = list.len();
        list.retain(|subscription| subscription.id != id);
        before != list.len()
    }

    /// 触发事件；返回是否有订阅者消费了它
    pub fn fire(&mut self, event: &str, args: &EventArgs) -> bool {
        let Some(list) = self.subscriptions.get_mut(&event.to_ascii_lowercase()) else {
            tracing::trace!(target: "events", event, "no subscribers");
            return false;
        };
        for subscription in list.iter_mut() {
            if (subscription.callback)(args) {
                return true;
            }
        }
        false
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscriptions
            .get(&event.to_ascii_lowercase())
            .map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fire_is_case_insensitive() {
        let mut events = EventSystem::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        events.subscribe("OnCloseButtonClicked", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        });

        assert!(!events.fire("oncloseButtonclicked", &EventArgs::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!events.fire("Unknown", &EventArgs::new()));
    }

    #[test]
    fn test_consumed_event_stops_propagation() {
        let mut events = EventSystem::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&hits);
        let second = Arc::clone(&hits);
        events.subscribe("quit", move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            true
        });
        events.subscribe("quit", move |_| {
            second.fetch_add(10, Ordering::SeqCst);
            false
        });

        assert!(events.fire("quit", &EventArgs::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_and_args() {
        let mut events = EventSystem::new();
        let id = events.subscribe("echo", |args| args.get("Text") == Some("hi"));
        assert!(events.fire("echo", &EventArgs::new().with("text", "hi")));
        assert!(events.unsubscribe("ECHO", id));
        assert_eq!(events.subscriber_count("echo"), 0);
        assert_eq!(EventArgs::new().get_or("missing", "fallback"), "fallback");
    }
}
