//! 測試輔助：用 ASCII art 擺放 15x7 戰場
//!
//! 每行以空白分隔 15 個符號，共 7 行：
//! - `.` = 空格
//! - `A` 開頭 = 玩家方角色，`E` 開頭 = 敵方角色
//! - 其他符號 = 只記錄位置的標記（例如瞄準點）
//!
//! 角色的 UnitID 依由左到右、由上到下的順序從 1 開始編號。
#![allow(dead_code)]

use battle_lib::*;
use skills_lib::*;
use std::collections::HashMap;

/// 解析 ASCII，回傳 標記 -> 位置列表（依讀取順序）
pub fn load_from_ascii(ascii: &str) -> HashMap<String, Vec<Pos>> {
    let lines: Vec<&str> = ascii
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    assert_eq!(lines.len(), GRID_HEIGHT as usize, "棋盤高度必須為 {GRID_HEIGHT}");

    let mut markers: HashMap<String, Vec<Pos>> = HashMap::new();
    for (y, line) in lines.iter().enumerate() {
        let cells: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(cells.len(), GRID_WIDTH as usize, "第 {y} 行寬度錯誤");
        for (x, cell) in cells.into_iter().enumerate() {
            if cell != "." {
                markers
                    .entry(cell.to_string())
                    .or_default()
                    .push(Pos::new(x as Coord, y as Coord));
            }
        }
    }
    markers
}

pub fn character(id: UnitID, side: Side, pos: Pos) -> Character {
    Character {
        id,
        template: "dummy".to_string(),
        name: format!("{side}{id}"),
        side,
        hp: 100,
        max_hp: 100,
        mp: 50,
        max_mp: 50,
        attack: 10,
        defense: 0,
        speed: 10,
        pos,
        skills: vec![],
        moved_count: 0,
        has_moved: false,
        has_acted: false,
        in_enemy_territory: false,
    }
}

pub struct Scene {
    pub board: Board,
    pub markers: HashMap<String, Vec<Pos>>,
}

impl Scene {
    pub fn pos(&self, marker: &str) -> Pos {
        self.markers[marker][0]
    }

    pub fn id(&self, marker: &str) -> UnitID {
        self.board
            .pos_to_unit(self.pos(marker))
            .unwrap_or_else(|| panic!("標記 {marker} 上沒有角色"))
    }
}

/// 以 ASCII 建立棋盤，customize 可依標記調整角色數值
pub fn scene_from_ascii_with(ascii: &str, customize: impl Fn(&str, &mut Character)) -> Scene {
    let markers = load_from_ascii(ascii);

    let mut placements: Vec<(Pos, &str, Side)> = markers
        .iter()
        .flat_map(|(marker, positions)| {
            let side = match marker.chars().next() {
                Some('A') => Some(Side::Ally),
                Some('E') => Some(Side::Enemy),
                _ => None,
            };
            positions
                .iter()
                .filter_map(move |pos| side.map(|side| (*pos, marker.as_str(), side)))
        })
        .collect();
    // 由上到下、由左到右
    placements.sort_by_key(|(pos, _, _)| (pos.y, pos.x));

    let mut board = Board::new();
    for (id, (pos, marker, side)) in (1..).zip(placements) {
        let mut unit = character(id, side, pos);
        customize(marker, &mut unit);
        board.insert_unit(unit).unwrap();
    }
    Scene { board, markers }
}

pub fn scene_from_ascii(ascii: &str) -> Scene {
    scene_from_ascii_with(ascii, |_, _| {})
}

/// 只有一個技能的角色設定
pub fn give_skill(unit: &mut Character, skill: Skill) {
    unit.skills = vec![skill];
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
