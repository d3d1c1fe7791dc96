//! board.rs：
//! - 固定 15x7 的戰場格子、佔據狀態與領地劃分。
//! - 佔據表以 `y * width + x` 為索引的平面陣列保存，與 Character.pos 在任何操作完成後保持一致。
//! - 只提供查詢與原子性的移動/放置/移除，不負責回合流程或技能效果。
use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter};

/// 領地
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Display, EnumIter, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Territory {
    PlayerZone,
    BufferZone,
    EnemyZone,
}

impl Territory {
    /// 領地歸屬的陣營，緩衝區不屬於任何一方
    pub fn owner(self) -> Option<Side> {
        match self {
            Territory::PlayerZone => Some(Side::Ally),
            Territory::BufferZone => None,
            Territory::EnemyZone => Some(Side::Enemy),
        }
    }
}

pub fn is_valid(pos: Pos) -> bool {
    (0..GRID_WIDTH).contains(&pos.x) && (0..GRID_HEIGHT).contains(&pos.y)
}

/// 只依 x 座標判斷領地
pub fn territory_of(pos: Pos) -> Territory {
    if pos.x <= PLAYER_ZONE_LAST_X {
        Territory::PlayerZone
    } else if pos.x == BUFFER_ZONE_X {
        Territory::BufferZone
    } else {
        Territory::EnemyZone
    }
}

/// 該陣營站在 pos 是否屬於深入敵方領地
pub fn is_enemy_territory(side: Side, pos: Pos) -> bool {
    territory_of(pos).owner() == Some(side.opponent())
}

/// 上下左右四個相鄰座標（不檢查邊界）
pub fn orthogonal_neighbors(pos: Pos) -> [Pos; 4] {
    [
        pos.offset(0, 1),
        pos.offset(0, -1),
        pos.offset(1, 0),
        pos.offset(-1, 0),
    ]
}

#[derive(Debug, Clone)]
pub struct Board {
    cells: Vec<Option<UnitID>>,
    units: BTreeMap<UnitID, Character>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: vec![None; (GRID_WIDTH * GRID_HEIGHT) as usize],
            units: BTreeMap::new(),
        }
    }

    fn index(pos: Pos) -> Option<usize> {
        is_valid(pos).then(|| (pos.y * GRID_WIDTH + pos.x) as usize)
    }

    pub fn pos_to_unit(&self, pos: Pos) -> Option<UnitID> {
        Self::index(pos).and_then(|i| self.cells[i])
    }

    pub fn is_occupied(&self, pos: Pos) -> bool {
        self.pos_to_unit(pos).is_some()
    }

    pub fn occupant_at(&self, pos: Pos) -> Option<&Character> {
        self.pos_to_unit(pos).and_then(|id| self.units.get(&id))
    }

    pub fn unit(&self, unit_id: UnitID) -> Option<&Character> {
        self.units.get(&unit_id)
    }

    pub(crate) fn unit_mut(&mut self, unit_id: UnitID) -> Option<&mut Character> {
        self.units.get_mut(&unit_id)
    }

    /// 棋盤上所有存活角色（依 UnitID 排序）
    pub fn units(&self) -> impl Iterator<Item = &Character> {
        self.units.values()
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &Character> {
        self.units.values().filter(move |unit| unit.side == side)
    }

    pub fn living_count(&self, side: Side) -> usize {
        self.living(side).count()
    }

    /// 上下左右中合法且無人佔據的格子
    pub fn valid_moves(&self, pos: Pos) -> Vec<Pos> {
        orthogonal_neighbors(pos)
            .into_iter()
            .filter(|next| is_valid(*next) && !self.is_occupied(*next))
            .collect()
    }

    /// 放置新角色到其 pos，並依位置計算是否在敵方領地
    pub fn insert_unit(&mut self, mut unit: Character) -> Result<(), Error> {
        let func = "Board::insert_unit";

        let pos = unit.pos;
        let index = Self::index(pos).ok_or(Error::OutOfBounds { func, pos })?;
        if self.units.contains_key(&unit.id) {
            return Err(Error::DuplicateUnit {
                func,
                unit_id: unit.id,
            });
        }
        if self.cells[index].is_some() {
            return Err(Error::PosOccupied { func, pos });
        }
        unit.in_enemy_territory = is_enemy_territory(unit.side, pos);
        self.cells[index] = Some(unit.id);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// 原子性地移動 from 上的角色到 to，並重算 in_enemy_territory
    pub fn move_unit(&mut self, from: Pos, to: Pos) -> Result<UnitID, Error> {
        let func = "Board::move_unit";

        let from_index = Self::index(from).ok_or(Error::OutOfBounds { func, pos: from })?;
        let to_index = Self::index(to).ok_or(Error::OutOfBounds { func, pos: to })?;
        let unit_id = self.cells[from_index].ok_or(Error::NoUnitAtPos { func, pos: from })?;
        if self.cells[to_index].is_some() {
            return Err(Error::PosOccupied { func, pos: to });
        }
        let unit = self
            .units
            .get_mut(&unit_id)
            .ok_or(Error::UnitNotFound { func, unit_id })?;
        unit.pos = to;
        unit.in_enemy_territory = is_enemy_territory(unit.side, to);
        self.cells[from_index] = None;
        self.cells[to_index] = Some(unit_id);
        Ok(unit_id)
    }

    /// 從棋盤移除角色，回傳被移除的角色
    pub fn remove_unit(&mut self, unit_id: UnitID) -> Option<Character> {
        let unit = self.units.remove(&unit_id)?;
        if let Some(index) = Self::index(unit.pos) {
            if self.cells[index] == Some(unit_id) {
                self.cells[index] = None;
            }
        }
        Some(unit)
    }
}
