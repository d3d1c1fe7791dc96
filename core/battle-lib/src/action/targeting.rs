//! targeting.rs：
//! - 技能範圍的純幾何計算：(施放者位置, 瞄準點, 形狀參數) → 受影響的格子。
//! - 每種 RangeShape 對應一個獨立的函式，經由 `shape_fn` 查表分派。
//! - 不修改棋盤，也不判斷格子上是誰；全體敵/友形狀只讀取存活角色的位置。
use crate::*;
use skills_lib::*;
use std::collections::BTreeSet;

/// 形狀函式的輸入
#[derive(Debug, Clone, Copy)]
pub struct ShapeArgs<'a> {
    pub caster: Pos,
    pub caster_side: Side,
    pub aim: Pos,
    pub radius: Coord,
    pub pattern: &'a [Offset],
    pub board: &'a Board,
}

pub type ShapeFn = fn(&ShapeArgs) -> Vec<Pos>;

/// 形狀 → 幾何函式
pub fn shape_fn(shape: RangeShape) -> ShapeFn {
    match shape {
        RangeShape::Single => single_cells,
        RangeShape::Line => line_cells,
        RangeShape::Cross => cross_cells,
        RangeShape::Area => area_cells,
        RangeShape::Circle => circle_cells,
        RangeShape::Cone => cone_cells,
        RangeShape::HorizontalSweep => horizontal_sweep_cells,
        RangeShape::VerticalSweep => vertical_sweep_cells,
        RangeShape::Custom => custom_cells,
        RangeShape::AllEnemies => all_enemies_cells,
        RangeShape::AllAllies => all_allies_cells,
    }
}

/// 計算技能在瞄準點的影響範圍
/// 回傳去重、過濾掉棋盤外座標、依 (x, y) 排序的格子；瞄準點在棋盤外時為空
pub fn affected_cells(board: &Board, caster: &Character, skill: &Skill, aim: Pos) -> Vec<Pos> {
    if !is_valid(aim) {
        return vec![];
    }
    // 半徑超過棋盤對角距離沒有意義
    let radius = Coord::try_from(skill.radius)
        .unwrap_or(Coord::MAX)
        .min(GRID_WIDTH + GRID_HEIGHT);
    let args = ShapeArgs {
        caster: caster.pos,
        caster_side: caster.side,
        aim,
        radius,
        pattern: &skill.custom_pattern,
        board,
    };
    shape_fn(skill.shape)(&args)
        .into_iter()
        .filter(|pos| is_valid(*pos))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 以施放者為中心、曼哈頓距離 range 內的可施放格子（僅供顯示）
pub fn casting_area(from: Pos, range: usize) -> Vec<Pos> {
    let range = Coord::try_from(range)
        .unwrap_or(Coord::MAX)
        .min(GRID_WIDTH + GRID_HEIGHT);
    (0..GRID_WIDTH)
        .flat_map(|x| (0..GRID_HEIGHT).map(move |y| Pos::new(x, y)))
        .filter(|pos| pos.distance(from) <= range)
        .collect()
}

pub fn single_cells(args: &ShapeArgs) -> Vec<Pos> {
    vec![args.aim]
}

/// 從施放者到瞄準點（含兩端）；dx 不為 0 時沿 x 軸，否則沿 y 軸
pub fn line_cells(args: &ShapeArgs) -> Vec<Pos> {
    let from = args.caster;
    let dx = args.aim.x - from.x;
    let dy = args.aim.y - from.y;
    if dx != 0 {
        let step = dx.signum();
        (0..=dx.abs()).map(|i| from.offset(i * step, 0)).collect()
    } else if dy != 0 {
        let step = dy.signum();
        (0..=dy.abs()).map(|i| from.offset(0, i * step)).collect()
    } else {
        vec![]
    }
}

pub fn horizontal_sweep_cells(args: &ShapeArgs) -> Vec<Pos> {
    (0..GRID_WIDTH).map(|x| Pos::new(x, args.aim.y)).collect()
}

pub fn vertical_sweep_cells(args: &ShapeArgs) -> Vec<Pos> {
    (0..GRID_HEIGHT).map(|y| Pos::new(args.aim.x, y)).collect()
}

/// 以瞄準點為中心的十字：橫向與縱向各掃 radius 格
pub fn cross_cells(args: &ShapeArgs) -> Vec<Pos> {
    let r = args.radius;
    (-r..=r)
        .flat_map(|i| [args.aim.offset(i, 0), args.aim.offset(0, i)])
        .collect()
}

/// 菱形：曼哈頓距離 <= radius
pub fn area_cells(args: &ShapeArgs) -> Vec<Pos> {
    let r = args.radius;
    (-r..=r)
        .flat_map(|dx| (-r..=r).map(move |dy| (dx, dy)))
        .filter(|(dx, dy)| dx.abs() + dy.abs() <= r)
        .map(|(dx, dy)| args.aim.offset(dx, dy))
        .collect()
}

/// 圓形：歐幾里得距離平方 <= radius²
pub fn circle_cells(args: &ShapeArgs) -> Vec<Pos> {
    let r = args.radius;
    let r2 = r * r;
    (-r..=r)
        .flat_map(|dx| (-r..=r).map(move |dy| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r2)
        .map(|(dx, dy)| args.aim.offset(dx, dy))
        .collect()
}

/// 扇形：從施放者出發，沿主軸每前進一格，橫向展開 ±步數
/// |dx| > |dy| 為水平，否則垂直；方向只在分量為正時取 +1
pub fn cone_cells(args: &ShapeArgs) -> Vec<Pos> {
    let from = args.caster;
    let dx = args.aim.x - from.x;
    let dy = args.aim.y - from.y;
    let horizontal = dx.abs() > dy.abs();
    let direction = {
        let main = if horizontal { dx } else { dy };
        if main > 0 { 1 } else { -1 }
    };
    (1..=args.radius)
        .flat_map(|dist| (-dist..=dist).map(move |spread| (dist, spread)))
        .map(|(dist, spread)| {
            if horizontal {
                from.offset(direction * dist, spread)
            } else {
                from.offset(spread, direction * dist)
            }
        })
        .collect()
}

pub fn custom_cells(args: &ShapeArgs) -> Vec<Pos> {
    args.pattern
        .iter()
        .map(|(dx, dy)| args.aim.offset(*dx, *dy))
        .collect()
}

pub fn all_enemies_cells(args: &ShapeArgs) -> Vec<Pos> {
    args.board
        .living(args.caster_side.opponent())
        .map(|unit| unit.pos)
        .collect()
}

pub fn all_allies_cells(args: &ShapeArgs) -> Vec<Pos> {
    args.board
        .living(args.caster_side)
        .map(|unit| unit.pos)
        .collect()
}
