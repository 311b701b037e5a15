//! 游戏逻辑
//!
//! 状态机（吸引/游戏）、玩家相机、场景道具，以及暴露给脚本的 `game` 对象。

pub mod game;
pub mod player;
pub mod prop;
pub mod script_interface;

pub use game::{Game, GameState};
pub use player::Player;
pub use prop::{Prop, PropBehavior, PropShape};
pub use script_interface::GameScriptInterface;
