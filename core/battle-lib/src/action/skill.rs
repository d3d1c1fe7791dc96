//! skill.rs：
//! - 負責技能效果結算：傷害、位移、自我傳送、陣型變換。
//! - 受影響的格子在結算前取一次快照，但每一格都在套用當下重新讀取佔據狀態。
//! - 角色死亡立即從棋盤與行動順序移除；任一方全滅即停止剩餘結算。
//! - 不負責狀態機流轉與指令合法性，呼叫端（Battle）需先確認可以施放。
use crate::*;
use skills_lib::*;
use std::collections::BTreeSet;
use strum::IntoEnumIterator;

/// 一次施放的結算結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastOutcome {
    pub events: Vec<BattleEvent>,
    /// 依死亡先後排列
    pub fallen: Vec<Character>,
}

/// 傷害公式：先扣防禦並保底 1，目標位於敵方領地時再乘以倍率
pub fn damage_dealt(skill_damage: i32, target: &Character) -> i32 {
    let dealt = (skill_damage - target.defense).max(MIN_DAMAGE);
    if target.in_enemy_territory {
        dealt * ENEMY_TERRITORY_MULTIPLIER
    } else {
        dealt
    }
}

/// 有一方已無存活角色時，回傳另一方（勝利方）
pub fn battle_winner(board: &Board) -> Option<Side> {
    Side::iter()
        .find(|side| board.living_count(*side) == 0)
        .map(Side::opponent)
}

/// 施放技能主流程
/// - 扣除魔力、計算影響範圍後依效果種類結算
/// - 傷害與位移並存時，先完成整輪傷害再進行位移
pub fn cast_skill(
    board: &mut Board,
    turn_order: &mut TurnOrder,
    caster_id: UnitID,
    skill_index: usize,
    aim: Pos,
) -> Result<CastOutcome, Error> {
    let func = "cast_skill";

    let caster = board.unit(caster_id).ok_or(Error::UnitNotFound {
        func,
        unit_id: caster_id,
    })?;
    let skill = caster
        .skills
        .get(skill_index)
        .cloned()
        .ok_or(Error::SkillIndexOutOfRange {
            func,
            index: skill_index,
        })?;
    if !caster.can_cast(&skill) {
        return Err(Error::NotEnoughMp {
            func,
            mp: caster.mp,
            cost: skill.mp_cost,
        });
    }
    let caster_pos = caster.pos;
    let cells = affected_cells(board, caster, &skill, aim);
    log::info!("{} 在 {} 施放 {}", caster.name, aim, skill.name);

    if let Some(caster) = board.unit_mut(caster_id) {
        caster.spend_mp(skill.mp_cost);
    }

    let mut outcome = CastOutcome::default();
    outcome.events.push(BattleEvent::SkillCast {
        caster: caster_id,
        skill: skill.id.clone(),
        aim,
        cells: cells.clone(),
    });

    if skill.effect.deals_damage() {
        apply_damage(board, turn_order, caster_id, &skill, &cells, &mut outcome);
        if battle_winner(board).is_some() {
            return Ok(outcome);
        }
    }
    if skill.effect.displaces() {
        apply_displacement(board, caster_id, caster_pos, &skill, aim, &cells, &mut outcome);
    }
    match skill.effect {
        EffectKind::SelfTeleport => apply_self_teleport(board, caster_id, aim, &mut outcome),
        EffectKind::AllyFormation => apply_formation(
            board,
            turn_order,
            caster_id,
            aim,
            &skill.formation_pattern,
            &mut outcome,
        ),
        EffectKind::Damage | EffectKind::Displacement | EffectKind::DamageDisplacement => {}
    }
    Ok(outcome)
}

fn apply_damage(
    board: &mut Board,
    turn_order: &mut TurnOrder,
    caster_id: UnitID,
    skill: &Skill,
    cells: &[Pos],
    outcome: &mut CastOutcome,
) {
    for pos in cells {
        let Some(target_id) = board.pos_to_unit(*pos) else {
            continue;
        };
        if target_id == caster_id {
            continue;
        }
        let Some(target) = board.unit_mut(target_id) else {
            continue;
        };
        let amount = damage_dealt(skill.damage, target);
        let died = target.take_damage(amount);
        log::info!("{} 受到 {} 點傷害，剩餘 HP {}", target.name, amount, target.hp);
        outcome.events.push(BattleEvent::Damaged {
            source: caster_id,
            target: target_id,
            amount,
            hp: target.hp,
        });
        if !died {
            continue;
        }

        // 立即移除，後續目標看到的是更新後的棋盤
        turn_order.remove(target_id);
        if let Some(fallen) = board.remove_unit(target_id) {
            log::info!("{} 已被擊敗", fallen.name);
            outcome.fallen.push(fallen);
        }
        outcome.events.push(BattleEvent::Defeated { unit: target_id });
        if battle_winner(board).is_some() {
            break;
        }
    }
}

fn apply_displacement(
    board: &mut Board,
    caster_id: UnitID,
    caster_pos: Pos,
    skill: &Skill,
    aim: Pos,
    cells: &[Pos],
    outcome: &mut CastOutcome,
) {
    // 每個角色一次施放最多被位移一次
    let mut handled = BTreeSet::new();
    for pos in cells {
        let Some(target_id) = board.pos_to_unit(*pos) else {
            continue;
        };
        if target_id == caster_id || !handled.insert(target_id) {
            continue;
        }
        let Some(direction) = displacement_direction(skill.displacement, caster_pos, aim, *pos)
        else {
            continue;
        };
        match push_unit(board, target_id, direction, skill.displacement_distance) {
            Ok((from, to)) if from != to => {
                log::info!("單位 {target_id} 被擊退 {from} -> {to}");
                outcome.events.push(BattleEvent::Displaced {
                    unit: target_id,
                    from,
                    to,
                });
            }
            Ok(_) => {}
            Err(err) => log::debug!("位移略過: {err}"),
        }
    }
}

fn apply_self_teleport(board: &mut Board, caster_id: UnitID, aim: Pos, outcome: &mut CastOutcome) {
    match teleport_unit(board, caster_id, aim) {
        Ok(from) => {
            log::info!("單位 {caster_id} 傳送 {from} -> {aim}");
            outcome.events.push(BattleEvent::Teleported {
                unit: caster_id,
                from,
                to: aim,
            });
        }
        Err(err) => log::debug!("傳送失敗，不產生效果: {err}"),
    }
}

fn apply_formation(
    board: &mut Board,
    turn_order: &TurnOrder,
    caster_id: UnitID,
    center: Pos,
    pattern: &[Offset],
    outcome: &mut CastOutcome,
) {
    let Some(side) = board.unit(caster_id).map(|caster| caster.side) else {
        return;
    };
    // 依行動順序而非距離排列
    let allies: Vec<UnitID> = turn_order
        .ids()
        .iter()
        .copied()
        .filter(|id| board.unit(*id).is_some_and(|unit| unit.side == side))
        .collect();

    for (unit_id, to) in formation_slots(&allies, center, pattern) {
        let Some(from) = board.unit(unit_id).map(|unit| unit.pos) else {
            continue;
        };
        if from == to {
            continue;
        }
        match board.move_unit(from, to) {
            Ok(_) => {
                log::info!("單位 {unit_id} 移動到陣型位置 {to}");
                outcome.events.push(BattleEvent::FormationMoved {
                    unit: unit_id,
                    from,
                    to,
                });
            }
            Err(err) => {
                log::debug!("陣型位置略過: {err}");
                outcome
                    .events
                    .push(BattleEvent::FormationSkipped { unit: unit_id, to });
            }
        }
    }
}
