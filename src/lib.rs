//! # ProtogameJS
//!
//! A frame-driven game runtime whose per-frame gameplay is written in
//! JavaScript (QuickJS via `rquickjs`) and calls back into native Rust
//! subsystems through a string-keyed bridge.
//!
//! ## Architecture
//!
//! - The frame driver ([`core::App`]) owns every subsystem explicitly and
//!   runs BeginFrame → Update → Render → EndFrame.
//! - Each frame it invokes `JSEngine.update(gameDt, systemDt)` and
//!   `JSEngine.render()` in the script runtime.
//! - Scripts call native objects (`game`, `input`, `audio`) registered in the
//!   [`scripting::ScriptRegistry`]; arguments are extracted into strong types
//!   and every call returns a [`scripting::ScriptMethodResult`].
//!
//! ### Example
//!
//! ```ignore
//! use protogame_js::config::AppConfig;
//! use protogame_js::core::{shared, App, DevConsole};
//!
//! let mut app = App::new(AppConfig::default(), shared(DevConsole::new(1000)))?;
//! app.startup()?;
//! app.run_main_loop();
//! app.shutdown();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: application context, frame driver, clocks, events, jobs
//! - [`scripting`]: script bridge, module loader, hot reload
//! - [`game`]: gameplay state exposed to scripts as `game`
//! - [`input`] / [`audio`] / [`render`] / [`resources`] / [`platform`]: engine subsystems
//! - [`config`] / [`logging`]: configuration and the tracing stack

/// Core application functionality including the frame driver
pub mod core;
/// Configuration system
pub mod config;
/// Logging setup built on tracing-subscriber
pub mod logging;
/// Platform abstraction (headless window)
pub mod platform;
/// Frame command recorder
pub mod render;
/// Resource loading for text files and fonts
pub mod resources;
/// Keyboard and cursor state
pub mod input;
/// Sound registry and playback state
pub mod audio;
/// Script bridge and QuickJS runtime
pub mod scripting;
/// Gameplay objects driven from script
pub mod game;
