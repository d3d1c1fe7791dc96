//! movement.rs：
//! - 負責強制位移相關邏輯（擊退、拉近、傳送、陣型排列）。
//! - 一般回合移動只是一格的 Board::move_unit，不在此處理。
//! - 僅處理移動本身，不負責傷害、回合流程或事件紀錄。
use crate::*;
use skills_lib::*;

/// 推開方向：從參考點經過目標往外
/// 以 |dx|、|dy| 較大者為主軸，相等時取兩軸符號組成的斜向
/// 目標正好在參考點上時沒有方向
pub fn push_direction(reference: Pos, target: Pos) -> Option<Offset> {
    let dx = target.x - reference.x;
    let dy = target.y - reference.y;
    if dx == 0 && dy == 0 {
        return None;
    }
    let direction = if dx.abs() > dy.abs() {
        (dx.signum(), 0)
    } else if dy.abs() > dx.abs() {
        (0, dy.signum())
    } else {
        (dx.signum(), dy.signum())
    };
    Some(direction)
}

/// 拉近方向：推開方向取反
pub fn pull_direction(reference: Pos, target: Pos) -> Option<Offset> {
    push_direction(reference, target).map(|(dx, dy)| (-dx, -dy))
}

/// 依位移模式決定單位向量
/// - away / toward 以施放者位置為參考點
/// - explosion / vortex 以瞄準點為參考點
/// - 上下左右與 gravity 為固定方向
pub fn displacement_direction(
    mode: DisplacementMode,
    caster: Pos,
    aim: Pos,
    target: Pos,
) -> Option<Offset> {
    if let Some(direction) = mode.fixed_direction() {
        return Some(direction);
    }
    let reference = if mode.uses_aim_point() { aim } else { caster };
    if mode.is_pull() {
        pull_direction(reference, target)
    } else {
        push_direction(reference, target)
    }
}

/// 逐格推進，遇到棋盤外或已佔據的格子就停下，剩餘距離直接捨棄
pub fn push_destination(board: &Board, start: Pos, direction: Offset, distance: usize) -> Pos {
    let (dx, dy) = direction;
    let mut current = start;
    for _ in 0..distance {
        let next = current.offset(dx, dy);
        if !is_valid(next) || board.is_occupied(next) {
            break;
        }
        current = next;
    }
    current
}

/// 推動單位，回傳 (起點, 終點)；起點等於終點代表完全被擋住
pub fn push_unit(
    board: &mut Board,
    unit_id: UnitID,
    direction: Offset,
    distance: usize,
) -> Result<(Pos, Pos), Error> {
    let func = "push_unit";

    let start = board
        .unit(unit_id)
        .ok_or(Error::UnitNotFound { func, unit_id })?
        .pos;
    let end = push_destination(board, start, direction, distance);
    if end != start {
        board.move_unit(start, end).map_err(|e| Error::Wrap {
            func,
            source: Box::new(e),
        })?;
    }
    Ok((start, end))
}

/// 直接傳送到目標格，目標格必須合法且無人
pub fn teleport_unit(board: &mut Board, unit_id: UnitID, to: Pos) -> Result<Pos, Error> {
    let func = "teleport_unit";

    let from = board
        .unit(unit_id)
        .ok_or(Error::UnitNotFound { func, unit_id })?
        .pos;
    board.move_unit(from, to).map_err(|e| Error::Wrap {
        func,
        source: Box::new(e),
    })?;
    Ok(from)
}

/// 陣型分配：第 i 位友軍對應 center + pattern[i]，數量取兩者較少者
pub fn formation_slots(allies: &[UnitID], center: Pos, pattern: &[Offset]) -> Vec<(UnitID, Pos)> {
    allies
        .iter()
        .zip(pattern)
        .map(|(unit_id, (dx, dy))| (*unit_id, center.offset(*dx, *dy)))
        .collect()
}
