use std::fs;
use std::time::Duration;

use protogame_js::config::{AppConfig, ScriptConfig};
use protogame_js::core::{lock, shared, App, AppState, DevConsole, LifecycleStep, Subsystem};
use protogame_js::scripting::ScriptValue;
use tempfile::TempDir;

const FRAME: Duration = Duration::from_millis(16);

const RECORDING_ENGINE: &str = r#"
globalThis.frames = [];
globalThis.updates = 0;
globalThis.JSEngine = {
    update(gameDt, systemDt) {
        frames.push('update');
        updates += 1;
        game.update(gameDt, systemDt);
        if (globalThis.onUpdate) {
            onUpdate(updates);
        }
        if (globalThis.quitAfter !== undefined && updates >= quitAfter) {
            game.appRequestQuit();
        }
    },
    render() {
        frames.push('render');
        game.render();
    },
};
"#;

fn script_app(entry_source: &str, native_fallback: bool) -> (App, TempDir) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.mjs"), entry_source).unwrap();

    let mut config = AppConfig::default();
    config.script = ScriptConfig::with_root(dir.path());
    config.frame.target_fps = 0;
    config.frame.native_fallback = native_fallback;

    let mut app = App::new(config, shared(DevConsole::new(100))).unwrap();
    app.startup().unwrap();
    (app, dir)
}

fn eval(app: &mut App, source: &str) -> ScriptValue {
    app.scripts_mut().execute_script(source).unwrap()
}

#[test]
fn test_script_drives_update_then_render() {
    let (mut app, _dir) = script_app(RECORDING_ENGINE, false);
    assert!(app.scripts().has_entry_point());

    for _ in 0..3 {
        app.run_frame_with(FRAME);
    }

    assert_eq!(
        eval(&mut app, "frames.join(',')"),
        ScriptValue::from("update,render,update,render,update,render")
    );
    assert!(!lock(&app.renderer()).last_frame_commands().is_empty());
}

#[test]
fn test_script_quit_stops_main_loop() {
    let (mut app, _dir) = script_app(RECORDING_ENGINE, false);
    eval(&mut app, "globalThis.quitAfter = 3");

    app.run_main_loop();

    assert_eq!(app.state(), AppState::ShuttingDown);
    assert_eq!(app.frame_count(), 3);
    assert_eq!(eval(&mut app, "frames.length"), ScriptValue::Int(6));
}

#[test]
fn test_startup_and_shutdown_order() {
    let (mut app, _dir) = script_app(RECORDING_ENGINE, false);
    app.shutdown();

    let steps = app.lifecycle().to_vec();
    let position = |step: LifecycleStep| steps.iter().position(|s| *s == step).unwrap();

    assert!(position(LifecycleStep::Started(Subsystem::Script)) < position(LifecycleStep::GameCreated));
    assert!(position(LifecycleStep::GameCreated) < position(LifecycleStep::BindingsInstalled));
    assert!(position(LifecycleStep::BindingsInstalled) < position(LifecycleStep::EntryModuleExecuted));
    assert!(position(LifecycleStep::BindingsRemoved) < position(LifecycleStep::GameReleased));
    assert!(position(LifecycleStep::GameReleased) < position(LifecycleStep::ShutDown(Subsystem::Script)));
    assert!(
        position(LifecycleStep::ShutDown(Subsystem::Script))
            < position(LifecycleStep::ShutDown(Subsystem::Event))
    );
    assert!(!app.scripts().is_initialized());
}

#[test]
fn test_execute_command_runs_next_frame() {
    let source = format!(
        "{}\nglobalThis.onUpdate = (n) => {{ if (n === 1) game.executeCommand('globalThis.ranAt = frames.length'); }};",
        RECORDING_ENGINE
    );
    let (mut app, _dir) = script_app(&source, false);

    app.run_frame_with(FRAME);
    assert_eq!(eval(&mut app, "typeof ranAt"), ScriptValue::from("undefined"));

    app.run_frame_with(FRAME);
    assert_eq!(eval(&mut app, "ranAt"), ScriptValue::Int(2));
}

#[test]
fn test_throwing_update_keeps_running() {
    let source = r#"
globalThis.renders = 0;
globalThis.JSEngine = {
    update() { throw new Error('boom'); },
    render() { renders += 1; },
};
"#;
    let (mut app, _dir) = script_app(source, true);

    app.run_frame_with(FRAME);
    app.run_frame_with(FRAME);

    assert_eq!(app.state(), AppState::Running);
    assert_eq!(app.frame_count(), 2);
    assert!(app.scripts().last_error().unwrap().contains("boom"));
    assert_eq!(eval(&mut app, "renders"), ScriptValue::Int(2));
}

#[test]
fn test_missing_entry_point_uses_native_fallback() {
    let (mut app, _dir) = script_app("globalThis.loaded = true;", true);
    assert!(!app.scripts().has_entry_point());

    app.run_frame_with(FRAME);
    assert!(!lock(&app.renderer()).last_frame_commands().is_empty());
}

#[test]
fn test_missing_entry_point_without_fallback_draws_nothing() {
    let (mut app, _dir) = script_app("globalThis.loaded = true;", false);
    app.run_frame_with(FRAME);
    assert!(lock(&app.renderer()).last_frame_commands().is_empty());
}
