use serde::{Deserialize, Serialize};

mod action;
mod battle;
mod board;
mod catalog;
mod error;
mod unit;

pub use action::*;
pub use battle::*;
pub use board::*;
pub use catalog::*;
pub use error::*;
pub use unit::*;

pub type UnitID = u64;
pub type TemplateID = String;
pub type Coord = i32;

/// 戰場寬度：7(玩家) + 1(緩衝) + 7(敵方)
pub const GRID_WIDTH: Coord = 15;
pub const GRID_HEIGHT: Coord = 7;
/// 玩家領地的最後一欄（含）
pub const PLAYER_ZONE_LAST_X: Coord = 6;
/// 緩衝區所在欄
pub const BUFFER_ZONE_X: Coord = 7;
pub const MAX_MOVES_PER_TURN: u8 = 2;
/// 目標位於敵方領地時的傷害倍率
pub const ENEMY_TERRITORY_MULTIPLIER: i32 = 3;
pub const MIN_DAMAGE: i32 = 1;

#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Pos {
    pub x: Coord,
    pub y: Coord,
}

impl Pos {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// 飽和加法，資料提供的偏移量再大也只會落在棋盤外
    pub fn offset(self, dx: Coord, dy: Coord) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// 曼哈頓距離
    pub fn distance(self, other: Pos) -> Coord {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
