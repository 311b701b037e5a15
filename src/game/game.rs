//! 游戏状态与场景
//!
//! 入口脚本通过 `game` 对象驱动本模块：`JSEngine.update` 调用
//! `game.update(gameDt, systemDt)`，`JSEngine.render` 调用 `game.render()`。
//! 脚本层不可用且启用了原生回退时，帧驱动直接调用同样的方法。

use glam::{Vec2, Vec3};
use rand::Rng;

use super::player::Player;
use super::prop::{Prop, PropBehavior, PropShape};
use crate::core::app::QuitSignal;
use crate::core::clock::Clock;
use crate::core::error::{GameError, GameResult};
use crate::core::utils::{lock, Shared};
use crate::input::{keys, InputSystem};
use crate::render::{Camera, Renderer, Rgba8};

/// 球体道具使用的测试纹理
pub const TEST_TEXTURE_PATH: &str = "Data/Images/TestUV.png";

/// 游戏状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Attract,
    Game,
}

impl GameState {
    pub fn as_str(self) -> &'static str {
        match self {
            GameState::Attract => "ATTRACT",
            GameState::Game => "GAME",
        }
    }

    /// 名称不区分大小写，也接受 `"0"`/`"1"`
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "ATTRACT" | "0" => Some(GameState::Attract),
            "GAME" | "1" => Some(GameState::Game),
            _ => None,
        }
    }
}

pub struct Game {
    state: GameState,
    clock: Clock,
    player: Player,
    props: Vec<Prop>,
    screen_camera: Camera,
    original_player_position: Vec3,
    camera_shake_active: bool,
    input: Shared<InputSystem>,
    quit: QuitSignal,
}

impl Game {
    pub fn new(input: Shared<InputSystem>, quit: QuitSignal, screen_size: (u32, u32)) -> Self {
        let player = Player::new();
        let mut game = Self {
            state: GameState::Attract,
            clock: Clock::new(),
            original_player_position: player.position,
            player,
            props: Vec::new(),
            screen_camera: Camera::screen(screen_size.0 as f32, screen_size.1 as f32),
            camera_shake_active: false,
            input,
            quit,
        };
        game.spawn_initial_props();
        tracing::info!(target: "game", props = game.props.len(), "game created");
        game
    }

    fn spawn_initial_props(&mut self) {
        self.props.push(
            Prop::new(PropShape::Cube, Vec3::new(2.0, 2.0, 0.0), Rgba8::WHITE)
                .with_behavior(PropBehavior::Spin(Vec3::new(0.0, 30.0, 30.0))),
        );
        self.props.push(
            Prop::new(PropShape::Cube, Vec3::new(-2.0, -2.0, 0.0), Rgba8::GRAY)
                .with_behavior(PropBehavior::Pulse),
        );
        self.props.push(
            Prop::new(PropShape::Sphere, Vec3::new(10.0, -5.0, 1.0), Rgba8::WHITE)
                .with_behavior(PropBehavior::Spin(Vec3::new(45.0, 0.0, 0.0))),
        );
        self.props.push(Prop::new(PropShape::Grid, Vec3::ZERO, Rgba8::WHITE));
    }

    /// 创建依赖渲染器的资源（纹理）
    pub fn load_assets(&mut self, renderer: &mut Renderer) {
        let texture = renderer.create_or_get_texture(TEST_TEXTURE_PATH);
        for prop in self.props.iter_mut().filter(|p| p.shape == PropShape::Sphere) {
            prop.texture = Some(texture);
        }
    }

    // ========================================================================
    // 状态
    // ========================================================================

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn set_state(&mut self, state: GameState) {
        if self.state != state {
            tracing::info!(target: "game", from = self.state.as_str(), to = state.as_str(), "game state changed");
        }
        self.state = state;
    }

    pub fn is_attract_mode(&self) -> bool {
        self.state == GameState::Attract
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// 以系统时钟时长推进游戏时钟，返回本帧游戏时长
    pub fn advance_clock(&mut self, system_delta: f64) -> f64 {
        self.clock.advance(system_delta)
    }

    pub fn request_quit(&self) {
        tracing::info!(target: "game", "quit requested");
        self.quit.request();
    }

    // ========================================================================
    // 场景操作
    // ========================================================================

    pub fn prop_count(&self) -> usize {
        self.props.len()
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_position(&self) -> Vec3 {
        self.player.position
    }

    /// 在指定位置创建随机颜色的立方体，返回描述信息
    pub fn create_cube(&mut self, position: Vec3) -> String {
        let mut rng = rand::thread_rng();
        let color = Rgba8::new(
            rng.gen_range(100..=255),
            rng.gen_range(100..=255),
            rng.gen_range(100..=255),
            255,
        );
        self.props.push(Prop::new(PropShape::Cube, position, color));

        let message = format!(
            "Cube created at ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        );
        tracing::info!(target: "game", props = self.props.len(), "{}", message);
        message
    }

    pub fn move_prop(&mut self, index: i64, position: Vec3) -> GameResult<()> {
        let count = self.props.len();
        let prop = usize::try_from(index)
            .ok()
            .and_then(|i| self.props.get_mut(i));
        let Some(prop) = prop else {
            tracing::warn!(target: "game", index, count, "move_prop: index out of range");
            return Err(GameError::PropIndexOutOfRange { index, count });
        };
        prop.position = position;
        Ok(())
    }

    /// 相对第一次调用时的玩家位置偏移（相机震动）
    pub fn move_player_camera(&mut self, offset: Vec3) -> Vec3 {
        if !self.camera_shake_active {
            self.original_player_position = self.player.position;
            self.camera_shake_active = true;
            tracing::debug!(target: "game", origin = ?self.original_player_position, "camera shake started");
        }
        self.player.position = self.original_player_position + offset;
        self.player.position
    }

    pub fn is_camera_shake_active(&self) -> bool {
        self.camera_shake_active
    }

    // ========================================================================
    // 帧
    // ========================================================================

    pub fn update(&mut self, game_delta: f32, system_delta: f32) {
        let input = std::sync::Arc::clone(&self.input);
        let input = lock(&input);

        self.handle_keys(&input);
        let attract = self.is_attract_mode();
        self.player.update(system_delta, &input, attract);

        let total = self.clock.total_seconds() as f32;
        for prop in &mut self.props {
            prop.update(game_delta, total);
        }
    }

    fn handle_keys(&mut self, input: &InputSystem) {
        match self.state {
            GameState::Attract => {
                if input.was_key_just_pressed(keys::ESC) {
                    self.request_quit();
                }
                if input.was_key_just_pressed(keys::SPACE) {
                    self.set_state(GameState::Game);
                }
            }
            GameState::Game => {
                if input.was_key_just_pressed(keys::ESC) {
                    self.set_state(GameState::Attract);
                }
                if input.was_key_just_pressed(keys::letter('P')) {
                    self.clock.toggle_pause();
                }
                if input.was_key_just_pressed(keys::letter('O')) {
                    self.clock.step_single_frame();
                }
                if input.was_key_just_pressed(keys::letter('T')) {
                    self.clock.set_time_scale(0.1);
                }
                if input.was_key_just_released(keys::letter('T')) {
                    self.clock.set_time_scale(1.0);
                }
            }
        }
    }

    pub fn render(&self, renderer: &mut Renderer) {
        renderer.clear_screen(Rgba8::new(64, 64, 64, 255));

        renderer.begin_camera(&self.player.camera());
        if self.state == GameState::Game {
            for prop in &self.props {
                prop.render(renderer);
            }
        }
        renderer.end_camera();

        renderer.begin_camera(&self.screen_camera);
        if self.state == GameState::Attract {
            renderer.draw_text("Press SPACE to start", Vec2::new(40.0, 40.0), Rgba8::GREEN);
        }
        renderer.end_camera();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::shared;
    use crate::config::WindowConfig;
    use crate::render::RenderCommand;

    fn game() -> (Game, Shared<InputSystem>, QuitSignal) {
        let input = shared(InputSystem::new());
        let quit = QuitSignal::new();
        let game = Game::new(std::sync::Arc::clone(&input), quit.clone(), (1600, 800));
        (game, input, quit)
    }

    fn tap(game: &mut Game, input: &Shared<InputSystem>, key: u8) {
        lock(input).handle_key_pressed(key);
        game.update(0.0, 0.0);
        let mut input = lock(input);
        input.handle_key_released(key);
        input.end_frame();
    }

    #[test]
    fn test_initial_scene() {
        let (game, _, _) = game();
        assert_eq!(game.prop_count(), 4);
        assert!(game.is_attract_mode());
        assert_eq!(game.player_position(), Vec3::new(-2.0, 0.0, 1.0));
    }

    #[test]
    fn test_state_parse_aliases() {
        assert_eq!(GameState::parse("game"), Some(GameState::Game));
        assert_eq!(GameState::parse("1"), Some(GameState::Game));
        assert_eq!(GameState::parse("Attract"), Some(GameState::Attract));
        assert_eq!(GameState::parse("2"), None);
    }

    #[test]
    fn test_create_cube_echoes_position() {
        let (mut game, _, _) = game();
        let message = game.create_cube(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(message, "Cube created at (1.00, 2.00, 3.00)");
        assert_eq!(game.prop_count(), 5);
        let color = game.props()[4].color;
        assert!(color.r >= 100 && color.g >= 100 && color.b >= 100);
    }

    #[test]
    fn test_move_prop_out_of_range() {
        let (mut game, _, _) = game();
        let before: Vec<Vec3> = game.props().iter().map(|p| p.position).collect();
        assert_eq!(
            game.move_prop(99, Vec3::ZERO),
            Err(GameError::PropIndexOutOfRange { index: 99, count: 4 })
        );
        assert!(game.move_prop(-1, Vec3::ZERO).is_err());
        let after: Vec<Vec3> = game.props().iter().map(|p| p.position).collect();
        assert_eq!(before, after);

        game.move_prop(0, Vec3::ONE).unwrap();
        assert_eq!(game.props()[0].position, Vec3::ONE);
    }

    #[test]
    fn test_camera_shake_is_relative_to_origin() {
        let (mut game, _, _) = game();
        game.move_player_camera(Vec3::new(0.5, 0.0, 0.0));
        let position = game.move_player_camera(Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(position, Vec3::new(-2.0, 0.5, 1.0));
        assert!(game.is_camera_shake_active());
    }

    #[test]
    fn test_key_handling() {
        let (mut game, input, quit) = game();
        tap(&mut game, &input, keys::SPACE);
        assert_eq!(game.state(), GameState::Game);

        tap(&mut game, &input, keys::letter('P'));
        assert!(game.clock().is_paused());
        tap(&mut game, &input, keys::ESC);
        assert!(game.is_attract_mode());
        assert!(!quit.is_requested());

        tap(&mut game, &input, keys::ESC);
        assert!(quit.is_requested());
    }

    #[test]
    fn test_slow_motion_while_t_held() {
        let (mut game, input, _) = game();
        game.set_state(GameState::Game);
        lock(&input).handle_key_pressed(keys::letter('T'));
        game.update(0.0, 0.0);
        assert_eq!(game.clock().time_scale(), 0.1);
        lock(&input).end_frame();
        lock(&input).handle_key_released(keys::letter('T'));
        game.update(0.0, 0.0);
        assert_eq!(game.clock().time_scale(), 1.0);
    }

    #[test]
    fn test_render_draws_props_only_in_game() {
        let (mut game, _, _) = game();
        let mut renderer = Renderer::new(&WindowConfig::default());
        renderer.startup();

        renderer.begin_frame();
        game.render(&mut renderer);
        assert_eq!(renderer.draw_calls(), 1);
        assert!(renderer
            .current_commands()
            .iter()
            .any(|c| matches!(c, RenderCommand::DrawText { .. })));
        renderer.end_frame();

        game.set_state(GameState::Game);
        renderer.begin_frame();
        game.render(&mut renderer);
        assert_eq!(renderer.draw_calls(), 4);
        renderer.end_frame();
    }
}
