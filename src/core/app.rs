//! 应用与帧驱动
//!
//! [`App`] 显式持有所有子系统，替代全局实例指针。生命周期：
//!
//! - `Initializing`: 按依赖顺序构造并启动子系统（事件、作业、输入、窗口、
//!   渲染、音频、资源、脚本），创建游戏对象，把可脚本化对象绑定到注册表，
//!   最后执行入口模块
//! - `Running`: 每帧依次执行 BeginFrame → Update → Render → EndFrame
//! - `ShuttingDown`: 退出请求在当前帧完成后生效；按构造的逆序关闭
//!
//! 脚本层初始化后，每帧的游戏逻辑由脚本入口对象驱动；
//! 脚本层不可用时跳过本帧的游戏逻辑，或在配置了原生回退时直接调用
//! `Game::update` / `Game::render`。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::{AudioScriptInterface, AudioSystem};
use crate::config::AppConfig;
use crate::core::clock::SystemClock;
use crate::core::dev_console::{DevConsole, LineKind};
use crate::core::error::{AppResult, ScriptError};
use crate::core::events::{EventArgs, EventSystem};
use crate::core::jobs::JobSystem;
use crate::core::utils::{lock, shared, Shared};
use crate::game::{Game, GameScriptInterface};
use crate::input::{keys, InputScriptInterface, InputSystem};
use crate::logging::PRINT_TARGET;
use crate::platform::{Window, WindowEventSender, CLOSE_BUTTON_EVENT};
use crate::render::Renderer;
use crate::resources::{BitmapFont, ResourceSubsystem};
use crate::scripting::{ScriptArgs, ScriptSubsystem, ScriptValue, SharedScriptableObject};

/// 默认调试字体
pub const DEFAULT_FONT: &str = "SquirrelFixedFont";

/// 保留的帧阶段记录条数
const PHASE_HISTORY_LIMIT: usize = 64;

/// 退出请求标志，可在任意线程、任意对象中克隆持有
#[derive(Debug, Clone, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 应用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Initializing,
    Running,
    ShuttingDown,
}

/// 帧阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    BeginFrame,
    Update,
    Render,
    EndFrame,
}

/// 子系统标识（按构造顺序排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Event,
    Job,
    Input,
    Window,
    Render,
    Audio,
    Resource,
    Script,
}

impl Subsystem {
    pub const STARTUP_ORDER: [Subsystem; 8] = [
        Subsystem::Event,
        Subsystem::Job,
        Subsystem::Input,
        Subsystem::Window,
        Subsystem::Render,
        Subsystem::Audio,
        Subsystem::Resource,
        Subsystem::Script,
    ];
}

/// 生命周期中的一步，供诊断与测试检查顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Started(Subsystem),
    GameCreated,
    BindingsInstalled,
    EntryModuleExecuted,
    BindingsRemoved,
    GameReleased,
    ShutDown(Subsystem),
}

/// 应用
pub struct App {
    config: AppConfig,
    state: AppState,
    quit: QuitSignal,

    // 逆构造顺序声明，字段的隐式析构顺序与 `shutdown` 一致
    bindings: Vec<(&'static str, SharedScriptableObject)>,
    font: Option<Arc<BitmapFont>>,
    game: Option<Shared<Game>>,
    scripts: ScriptSubsystem,
    resources: ResourceSubsystem,
    audio: Shared<AudioSystem>,
    renderer: Shared<Renderer>,
    window: Window,
    input: Shared<InputSystem>,
    jobs: JobSystem,
    events: EventSystem,

    console: Shared<DevConsole>,
    system_clock: SystemClock,
    frame_index: u64,
    phase_history: VecDeque<(u64, FramePhase)>,
    lifecycle: Vec<LifecycleStep>,
    shut_down: bool,
}

impl App {
    /// 按依赖顺序构造子系统（尚未启动）
    pub fn new(config: AppConfig, console: Shared<DevConsole>) -> AppResult<Self> {
        config.validate()?;

        let events = EventSystem::new();
        let jobs = JobSystem::new(&config.jobs)?;
        let input = shared(InputSystem::new());
        let window = Window::new(&config.window);
        let renderer = shared(Renderer::new(&config.window));
        let audio = shared(AudioSystem::new());
        let resources = ResourceSubsystem::new("Data/Fonts");
        let scripts = ScriptSubsystem::new(config.script.clone());
        let system_clock = SystemClock::new(config.frame.max_delta_seconds);

        Ok(Self {
            config,
            state: AppState::Initializing,
            quit: QuitSignal::new(),
            bindings: Vec::new(),
            font: None,
            game: None,
            scripts,
            resources,
            audio,
            renderer,
            window,
            input,
            jobs,
            events,
            console,
            system_clock,
            frame_index: 0,
            phase_history: VecDeque::with_capacity(PHASE_HISTORY_LIMIT),
            lifecycle: Vec::new(),
            shut_down: false,
        })
    }

    // ========================================================================
    // 启动
    // ========================================================================

    pub fn startup(&mut self) -> AppResult<()> {
        if self.state != AppState::Initializing {
            return Ok(());
        }
        tracing::info!(target: "app", "application starting");

        self.start_subsystems()?;
        self.create_game();
        if self.config.script.enabled {
            self.bind_scriptable_objects();
            self.execute_entry_module();
        } else {
            tracing::warn!(target: "app", native_fallback = self.config.frame.native_fallback, "scripting disabled");
        }

        self.system_clock = SystemClock::new(self.config.frame.max_delta_seconds);
        self.state = AppState::Running;
        tracing::info!(target: "app", "application running");
        Ok(())
    }

    fn start_subsystems(&mut self) -> AppResult<()> {
        for subsystem in Subsystem::STARTUP_ORDER {
            match subsystem {
                Subsystem::Event => {
                    let quit = self.quit.clone();
                    self.events.subscribe("quit", move |_| {
                        quit.request();
                        true
                    });
                    let quit = self.quit.clone();
                    self.events.subscribe(CLOSE_BUTTON_EVENT, move |_| {
                        quit.request();
                        true
                    });
                }
                Subsystem::Job => {}
                Subsystem::Input => lock(&self.input).startup(),
                Subsystem::Window => self.window.startup(),
                Subsystem::Render => lock(&self.renderer).startup(),
                Subsystem::Audio => lock(&self.audio).startup(),
                Subsystem::Resource => {
                    self.resources.startup();
                    let font = self
                        .resources
                        .create_or_get_bitmap_font(DEFAULT_FONT, &mut lock(&self.renderer));
                    self.font = Some(font);
                }
                Subsystem::Script => {
                    if self.config.script.enabled {
                        self.scripts.startup()?;
                    }
                }
            }
            self.lifecycle.push(LifecycleStep::Started(subsystem));
        }
        Ok(())
    }

    fn create_game(&mut self) {
        let mut game = Game::new(
            Arc::clone(&self.input),
            self.quit.clone(),
            self.window.client_size(),
        );
        game.load_assets(&mut lock(&self.renderer));
        self.game = Some(shared(game));
        self.lifecycle.push(LifecycleStep::GameCreated);
    }

    /// 注册 `game` / `input` / `audio` 对象与 `print` / `debug` / `gc` 全局函数
    fn bind_scriptable_objects(&mut self) {
        if !self.scripts.is_initialized() {
            crate::fatal_error!("script subsystem is not initialized while binding scriptable objects");
        }
        let Some(game) = self.game.as_ref() else {
            crate::fatal_error!("game object is missing while binding scriptable objects");
        };

        let game_object: SharedScriptableObject = shared(GameScriptInterface::new(
            Arc::downgrade(game),
            Arc::downgrade(&self.renderer),
            self.scripts.command_sender(),
        ));
        let input_object: SharedScriptableObject =
            shared(InputScriptInterface::new(Arc::downgrade(&self.input)));
        let audio_object: SharedScriptableObject =
            shared(AudioScriptInterface::new(Arc::downgrade(&self.audio)));

        for (name, object) in [
            ("game", game_object),
            ("input", input_object),
            ("audio", audio_object),
        ] {
            self.scripts.register_scriptable_object(name, &object);
            self.bindings.push((name, object));
        }

        let console = Arc::clone(&self.console);
        self.scripts.register_global_function("print", move |args| {
            let text = join_args(args);
            tracing::info!(target: PRINT_TARGET, "{}", text);
            lock(&console).add_line(LineKind::Script, &text);
            ScriptValue::Null
        });
        self.scripts.register_global_function("debug", |args| {
            tracing::debug!(target: "script.console", "{}", join_args(args));
            ScriptValue::Null
        });
        let commands = self.scripts.command_sender();
        self.scripts
            .register_global_function("gc", move |_args| commands.collect_garbage().into());

        self.lifecycle.push(LifecycleStep::BindingsInstalled);
        tracing::info!(target: "app", objects = self.bindings.len(), "script bindings installed");
    }

    /// 入口模块失败不是致命错误：错误被记录，帧驱动继续运行
    fn execute_entry_module(&mut self) {
        match self.scripts.execute_entry_module() {
            Ok(()) => self.lifecycle.push(LifecycleStep::EntryModuleExecuted),
            Err(err) => {
                tracing::error!(target: "app", "entry module failed: {}", err);
                lock(&self.console).add_line(LineKind::Error, &err.to_string());
            }
        }
    }

    // ========================================================================
    // 帧
    // ========================================================================

    /// 以墙钟时间运行一帧
    pub fn run_frame(&mut self) {
        let system_delta = self.system_clock.tick();
        self.frame(system_delta);
    }

    /// 以给定的经过时间运行一帧
    pub fn run_frame_with(&mut self, elapsed: Duration) {
        let system_delta = self.system_clock.tick_with(elapsed);
        self.frame(system_delta);
    }

    fn frame(&mut self, system_delta: f64) {
        if self.state != AppState::Running {
            return;
        }
        let frame = self.frame_index;
        let _span = tracing::trace_span!(target: "app", "frame", frame).entered();

        self.begin_frame();
        self.update(system_delta);
        self.render();
        self.end_frame();

        self.frame_index += 1;
        if self.quit.is_requested() {
            tracing::info!(target: "app", frame, "quit requested, shutting down after this frame");
            self.state = AppState::ShuttingDown;
        }
    }

    fn record_phase(&mut self, phase: FramePhase) {
        if self.phase_history.len() == PHASE_HISTORY_LIMIT {
            self.phase_history.pop_front();
        }
        self.phase_history.push_back((self.frame_index, phase));
    }

    fn begin_frame(&mut self) {
        self.record_phase(FramePhase::BeginFrame);

        self.jobs.begin_frame();
        {
            let mut input = lock(&self.input);
            input.begin_frame();
            self.window.begin_frame(&mut input, &mut self.events);
            if input.was_key_just_pressed(keys::TILDE) {
                lock(&self.console).toggle_open();
            }
        }
        lock(&self.renderer).begin_frame();
        lock(&self.audio).begin_frame();
        self.resources.begin_frame();
        for (path, reason) in self.resources.take_failures() {
            tracing::warn!(target: "app", path = %path.display(), "resource load failed: {}", reason);
        }
        if self.scripts.is_initialized() {
            self.scripts.update();
        }
        lock(&self.console).begin_frame();
    }

    fn update(&mut self, system_delta: f64) {
        self.record_phase(FramePhase::Update);
        let Some(game) = self.game.clone() else {
            return;
        };

        let game_delta = lock(&game).advance_clock(system_delta);
        let scripted = self.scripts.is_initialized()
            && !matches!(
                self.scripts.call_entry_update(game_delta, system_delta),
                Err(ScriptError::MissingEntryPoint(_))
            );

        if !scripted && self.config.frame.native_fallback {
            lock(&game).update(game_delta as f32, system_delta as f32);
        }
    }

    fn render(&mut self) {
        self.record_phase(FramePhase::Render);

        let scripted = self.scripts.is_initialized()
            && !matches!(
                self.scripts.call_entry_render(),
                Err(ScriptError::MissingEntryPoint(_))
            );
        if !scripted && self.config.frame.native_fallback {
            if let Some(game) = &self.game {
                lock(game).render(&mut lock(&self.renderer));
            }
        }

        lock(&self.console).render(&mut lock(&self.renderer));
    }

    fn end_frame(&mut self) {
        self.record_phase(FramePhase::EndFrame);

        self.jobs.end_frame();
        lock(&self.input).end_frame();
        self.window.end_frame();
        lock(&self.renderer).end_frame();
        lock(&self.audio).end_frame();
        self.resources.end_frame();
        lock(&self.console).end_frame();
    }

    /// 运行直到请求退出（或达到配置的最大帧数）
    pub fn run_main_loop(&mut self) {
        let frame_budget = match self.config.frame.target_fps {
            0 => None,
            fps => Some(Duration::from_secs_f64(1.0 / f64::from(fps))),
        };
        let max_frames = self.config.frame.max_frames;

        while self.state == AppState::Running {
            let started = Instant::now();
            self.run_frame();

            if max_frames > 0 && self.frame_index >= max_frames {
                tracing::info!(target: "app", frames = self.frame_index, "frame limit reached");
                self.state = AppState::ShuttingDown;
            }
            if let Some(budget) = frame_budget {
                if let Some(remaining) = budget.checked_sub(started.elapsed()) {
                    std::thread::sleep(remaining);
                }
            }
        }
    }

    // ========================================================================
    // 关闭
    // ========================================================================

    /// 按构造的逆序关闭；可重复调用
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.state = AppState::ShuttingDown;
        tracing::info!(target: "app", frames = self.frame_index, "application shutting down");

        // 脚本对象先于其拥有者释放
        if !self.bindings.is_empty() || self.scripts.is_initialized() {
            for (name, _) in &self.bindings {
                self.scripts.unregister_scriptable_object(name);
            }
            for function in ["print", "debug", "gc"] {
                self.scripts.unregister_global_function(function);
            }
            self.bindings.clear();
            self.lifecycle.push(LifecycleStep::BindingsRemoved);
        }
        if self.game.take().is_some() {
            self.lifecycle.push(LifecycleStep::GameReleased);
        }

        for subsystem in Subsystem::STARTUP_ORDER.iter().rev() {
            match subsystem {
                Subsystem::Script => self.scripts.shutdown(),
                Subsystem::Resource => {
                    // 字体引用渲染器的纹理
                    self.font = None;
                    self.resources.shutdown();
                }
                Subsystem::Audio => lock(&self.audio).shutdown(),
                Subsystem::Render => lock(&self.renderer).shutdown(),
                Subsystem::Window => self.window.shutdown(),
                Subsystem::Input => lock(&self.input).shutdown(),
                Subsystem::Job => self.jobs.shutdown(),
                Subsystem::Event => self.events.clear(),
            }
            self.lifecycle.push(LifecycleStep::ShutDown(*subsystem));
        }
        tracing::info!(target: "app", "application stopped");
    }

    // ========================================================================
    // 访问器
    // ========================================================================

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn quit_signal(&self) -> QuitSignal {
        self.quit.clone()
    }

    pub fn request_quit(&mut self) {
        self.events.fire("quit", &EventArgs::new().with("source", "app"));
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    /// 最近若干帧的阶段记录 `(帧序号, 阶段)`
    pub fn phase_history(&self) -> Vec<(u64, FramePhase)> {
        self.phase_history.iter().copied().collect()
    }

    pub fn lifecycle(&self) -> &[LifecycleStep] {
        &self.lifecycle
    }

    pub fn window_events(&self) -> WindowEventSender {
        self.window.event_sender()
    }

    pub fn scripts(&self) -> &ScriptSubsystem {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut ScriptSubsystem {
        &mut self.scripts
    }

    pub fn game(&self) -> Option<Shared<Game>> {
        self.game.clone()
    }

    pub fn renderer(&self) -> Shared<Renderer> {
        Arc::clone(&self.renderer)
    }

    pub fn input(&self) -> Shared<InputSystem> {
        Arc::clone(&self.input)
    }

    pub fn audio(&self) -> Shared<AudioSystem> {
        Arc::clone(&self.audio)
    }

    pub fn jobs(&self) -> &JobSystem {
        &self.jobs
    }

    pub fn console(&self) -> Shared<DevConsole> {
        Arc::clone(&self.console)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_args(args: &ScriptArgs) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
