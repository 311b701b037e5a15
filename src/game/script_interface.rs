//! 游戏对象的脚本接口（全局名 `game`）
//!
//! `executeCommand` / `executeFile` 不在调用内部执行脚本，只把请求放入
//! 延迟命令队列，由脚本子系统在帧间执行。

use std::path::Path;
use std::sync::{Mutex, Weak};

use glam::Vec3;

use super::game::{Game, GameState};
use crate::core::utils::{file_modified_seconds, lock};
use crate::render::Renderer;
use crate::scripting::extract::{extract_float, extract_int, extract_string, extract_vec3};
use crate::scripting::{
    dispatch, method_infos, MethodError, ScriptArgs, ScriptCommandSender, ScriptMethod,
    ScriptMethodInfo, ScriptMethodResult, ScriptValue, ScriptableObject,
};

type MethodOutput = Result<Option<ScriptValue>, MethodError>;

pub struct GameScriptInterface {
    game: Weak<Mutex<Game>>,
    renderer: Weak<Mutex<Renderer>>,
    commands: ScriptCommandSender,
}

fn format_vec3(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

impl GameScriptInterface {
    pub fn new(
        game: Weak<Mutex<Game>>,
        renderer: Weak<Mutex<Renderer>>,
        commands: ScriptCommandSender,
    ) -> Self {
        Self {
            game,
            renderer,
            commands,
        }
    }

    fn with_game<R>(&self, f: impl FnOnce(&mut Game) -> R) -> Result<R, MethodError> {
        let game = self
            .game
            .upgrade()
            .ok_or(MethodError::Unavailable("game"))?;
        let mut game = lock(&game);
        Ok(f(&mut game))
    }

    fn app_request_quit(&mut self, _args: &ScriptArgs) -> MethodOutput {
        self.with_game(|game| game.request_quit())?;
        Ok(None)
    }

    fn create_cube(&mut self, args: &ScriptArgs) -> MethodOutput {
        let position = extract_vec3(args, 0)?;
        let message = self.with_game(|game| game.create_cube(position))?;
        Ok(Some(message.into()))
    }

    fn move_prop(&mut self, args: &ScriptArgs) -> MethodOutput {
        let index = extract_int(args, 0)?;
        let position = extract_vec3(args, 1)?;
        self.with_game(|game| game.move_prop(i64::from(index), position))?
            .map_err(|err| MethodError::Failed(err.to_string()))?;
        Ok(Some(
            format!("Prop {} moved to {}", index, format_vec3(position)).into(),
        ))
    }

    fn get_player_position(&mut self, _args: &ScriptArgs) -> MethodOutput {
        self.with_game(|game| Some(game.player_position().into()))
    }

    fn move_player_camera(&mut self, args: &ScriptArgs) -> MethodOutput {
        let offset = extract_vec3(args, 0)?;
        let position = self.with_game(|game| game.move_player_camera(offset))?;
        Ok(Some(
            format!("Player camera moved to {}", format_vec3(position)).into(),
        ))
    }

    fn update(&mut self, args: &ScriptArgs) -> MethodOutput {
        let game_delta = extract_float(args, 0)?;
        let system_delta = extract_float(args, 1)?;
        self.with_game(|game| game.update(game_delta, system_delta))?;
        Ok(None)
    }

    fn render(&mut self, _args: &ScriptArgs) -> MethodOutput {
        let renderer = self
            .renderer
            .upgrade()
            .ok_or(MethodError::Unavailable("renderer"))?;
        self.with_game(|game| game.render(&mut lock(&renderer)))?;
        Ok(None)
    }

    fn execute_command(&mut self, args: &ScriptArgs) -> MethodOutput {
        let source = extract_string(args, 0)?;
        if !self.commands.execute_command(source) {
            return Err(MethodError::Unavailable("script subsystem"));
        }
        Ok(Some("command queued".into()))
    }

    fn execute_file(&mut self, args: &ScriptArgs) -> MethodOutput {
        let path = extract_string(args, 0)?;
        let message = format!("file queued: {}", path);
        if !self.commands.execute_file(path) {
            return Err(MethodError::Unavailable("script subsystem"));
        }
        Ok(Some(message.into()))
    }

    fn is_attract_mode(&mut self, _args: &ScriptArgs) -> MethodOutput {
        self.with_game(|game| Some(game.is_attract_mode().into()))
    }

    fn get_file_timestamp(&mut self, args: &ScriptArgs) -> MethodOutput {
        let path = extract_string(args, 0)?;
        let seconds = file_modified_seconds(Path::new(&path))
            .map_err(|err| MethodError::Failed(format!("cannot stat '{}': {}", path, err)))?;
        Ok(Some(seconds.into()))
    }
}

const GAME_METHODS: &[ScriptMethod<GameScriptInterface>] = &[
    ScriptMethod {
        info: ScriptMethodInfo::new("appRequestQuit", "request application quit", &[], "void"),
        handler: GameScriptInterface::app_request_quit,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "createCube",
            "create a cube at (x, y, z)",
            &["float", "float", "float"],
            "string",
        ),
        handler: GameScriptInterface::create_cube,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "moveProp",
            "move prop at index to (x, y, z)",
            &["int", "float", "float", "float"],
            "string",
        ),
        handler: GameScriptInterface::move_prop,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new("getPlayerPosition", "player position {x, y, z}", &[], "object"),
        handler: GameScriptInterface::get_player_position,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "movePlayerCamera",
            "offset the player from the shake origin",
            &["float", "float", "float"],
            "string",
        ),
        handler: GameScriptInterface::move_player_camera,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "update",
            "native game update",
            &["float", "float"],
            "void",
        ),
        handler: GameScriptInterface::update,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new("render", "native game render", &[], "void"),
        handler: GameScriptInterface::render,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "executeCommand",
            "queue script source for the next frame",
            &["string"],
            "string",
        ),
        handler: GameScriptInterface::execute_command,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "executeFile",
            "queue a script file for the next frame",
            &["string"],
            "string",
        ),
        handler: GameScriptInterface::execute_file,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new("isAttractMode", "whether the game is in attract mode", &[], "bool"),
        handler: GameScriptInterface::is_attract_mode,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "getFileTimestamp",
            "last modification time in seconds",
            &["string"],
            "float",
        ),
        handler: GameScriptInterface::get_file_timestamp,
    },
];

impl ScriptableObject for GameScriptInterface {
    fn available_methods(&self) -> Vec<ScriptMethodInfo> {
        method_infos(GAME_METHODS)
    }

    fn available_properties(&self) -> Vec<String> {
        vec![
            "attractMode".to_string(),
            "gameState".to_string(),
            "propCount".to_string(),
        ]
    }

    fn call_method(&mut self, name: &str, args: &ScriptArgs) -> ScriptMethodResult {
        dispatch(self, GAME_METHODS, name, args)
    }

    fn get_property(&self, name: &str) -> Option<ScriptValue> {
        match name {
            "attractMode" => self.with_game(|game| game.is_attract_mode().into()).ok(),
            "gameState" => self.with_game(|game| game.state().as_str().into()).ok(),
            "propCount" => self.with_game(|game| game.prop_count().into()).ok(),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: &ScriptValue) -> bool {
        if name != "gameState" {
            return false;
        }
        let Some(state) = value.as_str().and_then(GameState::parse) else {
            return false;
        };
        self.with_game(|game| game.set_state(state)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::core::app::QuitSignal;
    use crate::core::utils::{shared, Shared};
    use crate::input::InputSystem;
    use crate::script_args;
    use crate::scripting::commands::CommandQueue;
    use crate::scripting::ScriptCommand;
    use proptest::prelude::*;
    use std::sync::Arc;

    struct Fixture {
        game: Shared<Game>,
        _renderer: Shared<Renderer>,
        queue: CommandQueue,
        quit: QuitSignal,
        bridge: GameScriptInterface,
    }

    fn fixture() -> Fixture {
        let quit = QuitSignal::new();
        let game = shared(Game::new(shared(InputSystem::new()), quit.clone(), (1600, 800)));
        let renderer = shared(Renderer::new(&WindowConfig::default()));
        let queue = CommandQueue::new();
        let bridge = GameScriptInterface::new(
            Arc::downgrade(&game),
            Arc::downgrade(&renderer),
            queue.sender(),
        );
        Fixture {
            game,
            _renderer: renderer,
            queue,
            quit,
            bridge,
        }
    }

    fn sample_args(info: &ScriptMethodInfo) -> ScriptArgs {
        info.param_types
            .iter()
            .map(|ty| match *ty {
                "int" => ScriptValue::from(0),
                "float" => ScriptValue::from(0.5),
                "string" => ScriptValue::from("1 + 1"),
                "bool" => ScriptValue::from(true),
                other => panic!("unexpected parameter type {}", other),
            })
            .collect()
    }

    #[test]
    fn test_documented_methods_succeed() {
        let mut f = fixture();
        for info in f.bridge.available_methods() {
            if info.name == "getFileTimestamp" {
                continue;
            }
            let result = f.bridge.call_method(info.name, &sample_args(&info));
            assert!(result.is_success(), "{} failed: {:?}", info.name, result);
        }
        assert!(f.quit.is_requested());
    }

    #[test]
    fn test_wrong_arity_has_no_side_effect() {
        let mut f = fixture();
        let result = f.bridge.call_method("createCube", &script_args![1.0, 2.0]);
        assert_eq!(
            result.error_message(),
            Some("createCube expects 3 arguments, got 2")
        );
        assert_eq!(lock(&f.game).prop_count(), 4);

        let moved = f.bridge.call_method("moveProp", &script_args![0, 1.0]);
        assert!(moved.is_error());
        assert_eq!(lock(&f.game).props()[0].position, Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_create_cube_message() {
        let mut f = fixture();
        let result = f.bridge.call_method("createCube", &script_args![1.0, 2.0, 3.0]);
        let message = result.value().and_then(ScriptValue::as_str).unwrap().to_string();
        assert!(message.contains("1.00") && message.contains("2.00") && message.contains("3.00"));
        assert_eq!(f.bridge.get_property("propCount"), Some(ScriptValue::from(5usize)));
    }

    #[test]
    fn test_move_prop_out_of_range_is_error() {
        let mut f = fixture();
        let result = f.bridge.call_method("moveProp", &script_args![99, 0.0, 0.0, 0.0]);
        assert_eq!(
            result.error_message(),
            Some("moveProp: prop index 99 is out of range (prop count 4)")
        );
        assert_eq!(lock(&f.game).prop_count(), 4);
    }

    #[test]
    fn test_string_is_not_a_number() {
        let mut f = fixture();
        let result = f.bridge.call_method("createCube", &script_args!["1", 2.0, 3.0]);
        assert!(result.is_error());
        assert_eq!(lock(&f.game).prop_count(), 4);
    }

    #[test]
    fn test_player_position_object() {
        let mut f = fixture();
        let result = f.bridge.call_method("getPlayerPosition", &script_args![]);
        let position = result.value().unwrap();
        assert_eq!(position.field("x").and_then(ScriptValue::as_f64), Some(-2.0));
        assert_eq!(position.field("z").and_then(ScriptValue::as_f64), Some(1.0));
    }

    #[test]
    fn test_commands_are_deferred() {
        let mut f = fixture();
        f.bridge.call_method("executeCommand", &script_args!["print('hi')"]);
        f.bridge.call_method("executeFile", &script_args!["extra.js"]);
        assert_eq!(
            f.queue.drain(),
            vec![
                ScriptCommand::ExecuteCommand("print('hi')".into()),
                ScriptCommand::ExecuteFile("extra.js".into()),
            ]
        );
    }

    #[test]
    fn test_file_timestamp() {
        let mut f = fixture();
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let stamp = f.bridge.call_method("getFileTimestamp", &script_args![path]);
        assert!(stamp.value().and_then(ScriptValue::as_f64).unwrap() > 0.0);
        assert!(f
            .bridge
            .call_method("getFileTimestamp", &script_args!["/no/such/file.mjs"])
            .is_error());
    }

    #[test]
    fn test_properties() {
        let mut f = fixture();
        assert_eq!(f.bridge.get_property("attractMode"), Some(ScriptValue::from(true)));
        assert!(!f.bridge.set_property("attractMode", &ScriptValue::from(false)));
        assert!(!f.bridge.set_property("propCount", &ScriptValue::from(1)));
        assert!(!f.bridge.set_property("gameState", &ScriptValue::from(1)));
        assert_eq!(f.bridge.get_property("health"), None);

        for alias in ["GAME", "game", "1"] {
            f.bridge.set_property("gameState", &ScriptValue::from("ATTRACT"));
            assert!(f.bridge.set_property("gameState", &ScriptValue::from(alias)));
            assert_eq!(f.bridge.get_property("gameState"), Some(ScriptValue::from("GAME")));
        }
        assert!(!f.bridge.set_property("gameState", &ScriptValue::from("nonsense")));
        assert_eq!(f.bridge.get_property("gameState"), Some(ScriptValue::from("GAME")));
    }

    #[test]
    fn test_calls_after_game_dropped() {
        let mut f = fixture();
        f.game = shared(Game::new(shared(InputSystem::new()), QuitSignal::new(), (1, 1)));
        let result = f.bridge.call_method("isAttractMode", &script_args![]);
        assert_eq!(
            result.error_message(),
            Some("isAttractMode: game is no longer available")
        );
        assert_eq!(f.bridge.get_property("gameState"), None);
    }

    proptest! {
        #[test]
        fn prop_game_state_aliases_ignore_case(mask in proptest::collection::vec(any::<bool>(), 4)) {
            let mut f = fixture();
            let alias: String = "game"
                .chars()
                .zip(mask)
                .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert!(f.bridge.set_property("gameState", &ScriptValue::from(alias)));
            prop_assert_eq!(f.bridge.get_property("gameState"), Some(ScriptValue::from("GAME")));
        }

        #[test]
        fn prop_unknown_state_leaves_value(text in "[a-z]{1,12}") {
            prop_assume!(text != "game" && text != "attract");
            let mut f = fixture();
            prop_assert!(!f.bridge.set_property("gameState", &ScriptValue::from(text)));
            prop_assert_eq!(f.bridge.get_property("gameState"), Some(ScriptValue::from("ATTRACT")));
            prop_assert_eq!(f.bridge.call_method("isAttractMode", &script_args![]), ScriptMethodResult::success_with(true));
        }
    }
}
