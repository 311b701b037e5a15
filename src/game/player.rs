//! 玩家（自由飞行相机）

use glam::Vec3;

use crate::input::{keys, InputSystem};
use crate::render::Camera;

pub const PLAYER_START_POSITION: Vec3 = Vec3::new(-2.0, 0.0, 1.0);

const MOVE_SPEED: f32 = 2.0;
const SPRINT_FACTOR: f32 = 10.0;
const MOUSE_SENSITIVITY: f32 = 0.125;
const MAX_PITCH_DEGREES: f32 = 85.0;
const MAX_ROLL_DEGREES: f32 = 45.0;
const ROLL_RATE_DEGREES: f32 = 90.0;

#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec3,
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
    pub roll_degrees: f32,
    pub velocity: Vec3,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: PLAYER_START_POSITION,
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            roll_degrees: 0.0,
            velocity: Vec3::ZERO,
        }
    }
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 使用系统时钟的时长：暂停游戏时仍可移动相机
    pub fn update(&mut self, delta_seconds: f32, input: &InputSystem, attract_mode: bool) {
        if !attract_mode && input.was_key_just_pressed(keys::letter('H')) {
            self.reset();
        }

        let camera = self.camera();
        let forward = camera.forward();
        let left = camera.left();

        let mut velocity = Vec3::ZERO;
        if input.is_key_down(keys::letter('W')) {
            velocity += forward * MOVE_SPEED;
        }
        if input.is_key_down(keys::letter('S')) {
            velocity -= forward * MOVE_SPEED;
        }
        if input.is_key_down(keys::letter('A')) {
            velocity += left * MOVE_SPEED;
        }
        if input.is_key_down(keys::letter('D')) {
            velocity -= left * MOVE_SPEED;
        }
        if input.is_key_down(keys::letter('Z')) {
            velocity -= Vec3::Z * MOVE_SPEED;
        }
        if input.is_key_down(keys::letter('C')) {
            velocity += Vec3::Z * MOVE_SPEED;
        }
        self.velocity = velocity;

        let mut move_delta = delta_seconds;
        if input.is_key_down(keys::SHIFT) {
            move_delta *= SPRINT_FACTOR;
        }
        self.position += velocity * move_delta;

        let cursor = input.cursor_client_delta();
        self.yaw_degrees -= cursor.x * MOUSE_SENSITIVITY;
        self.pitch_degrees = (self.pitch_degrees + cursor.y * MOUSE_SENSITIVITY)
            .clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);

        let mut roll_rate = 0.0;
        if input.is_key_down(keys::letter('Q')) {
            roll_rate = ROLL_RATE_DEGREES;
        }
        if input.is_key_down(keys::letter('E')) {
            roll_rate = -ROLL_RATE_DEGREES;
        }
        self.roll_degrees = (self.roll_degrees + roll_rate * delta_seconds)
            .clamp(-MAX_ROLL_DEGREES, MAX_ROLL_DEGREES);
    }

    pub fn camera(&self) -> Camera {
        Camera {
            yaw_degrees: self.yaw_degrees,
            pitch_degrees: self.pitch_degrees,
            roll_degrees: self.roll_degrees,
            ..Camera::perspective(self.position)
        }
    }
}
