//! 时钟
//!
//! 两个独立时钟：
//! - [`SystemClock`]: 墙钟，每帧测量真实经过时间，并截断到 `max_delta`
//! - [`Clock`]: 游戏时钟，由系统时钟驱动，可暂停、缩放、单步
//!
//! 两者都交给脚本入口：`update(gameDelta, systemDelta)`。

use std::time::{Duration, Instant};

/// 可暂停、可缩放的时钟
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    paused: bool,
    step_single_frame: bool,
    time_scale: f64,
    delta_seconds: f64,
    total_seconds: f64,
    frame_count: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            paused: false,
            step_single_frame: false,
            time_scale: 1.0,
            delta_seconds: 0.0,
            total_seconds: 0.0,
            frame_count: 0,
        }
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以父时钟的时间推进，返回本帧的时长
    ///
    /// 单步模式下本帧按未暂停推进，结束后重新暂停。
    pub fn advance(&mut self, parent_delta: f64) -> f64 {
        let stepping = self.step_single_frame;
        if stepping {
            self.paused = false;
        }

        self.delta_seconds = if self.paused {
            0.0
        } else {
            parent_delta.max(0.0) * self.time_scale
        };
        self.total_seconds += self.delta_seconds;
        self.frame_count += 1;

        if stepping {
            self.step_single_frame = false;
            self.paused = true;
        }
        self.delta_seconds
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// 下一帧推进一次后回到暂停
    pub fn step_single_frame(&mut self) {
        self.step_single_frame = true;
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn delta_seconds(&self) -> f64 {
        self.delta_seconds
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn reset(&mut self) {
        *self = Self {
            paused: self.paused,
            time_scale: self.time_scale,
            ..Self::default()
        };
    }
}

/// 系统（墙钟）时钟
#[derive(Debug, Clone)]
pub struct SystemClock {
    clock: Clock,
    last_tick: Instant,
    max_delta: f64,
}

impl SystemClock {
    pub fn new(max_delta_seconds: f64) -> Self {
        Self {
            clock: Clock::new(),
            last_tick: Instant::now(),
            max_delta: max_delta_seconds,
        }
    }

    /// 测量距上次 tick 的真实时间并推进，返回截断后的时长
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.tick_with(elapsed)
    }

    /// 以给定时长推进（测试与回放使用）
    pub fn tick_with(&mut self, elapsed: Duration) -> f64 {
        let delta = elapsed.as_secs_f64().min(self.max_delta);
        self.clock.advance(delta)
    }

    pub fn delta_seconds(&self) -> f64 {
        self.clock.delta_seconds()
    }

    pub fn total_seconds(&self) -> f64 {
        self.clock.total_seconds()
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }
}
