//! battle.rs：
//! - 負責戰鬥流程：行動順序、回合狀態機、指令驗證與事件紀錄。
//! - 所有指令都經由 Battle 進入；不合法的指令不改變任何狀態，只留下 debug log。
//! - 技能效果的實際結算交給 action::skill，本檔不計算傷害或位移。
use crate::*;
use serde::{Deserialize, Serialize};
use skills_lib::*;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// 回合狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BattleState {
    TurnStart,
    ChoosingAction,
    Moving,
    AfterMove,
    SelectingSkill,
    SelectingTargets,
    TurnEnd,
    BattleEnd,
}

/// 行動選單的選項
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Move,
    Skill,
    EndTurn,
}

/// 戰鬥中發生的事，依發生順序累積，由表現層以 drain_events 取走
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleEvent {
    TurnStarted {
        unit: UnitID,
    },
    Moved {
        unit: UnitID,
        from: Pos,
        to: Pos,
    },
    SkillCast {
        caster: UnitID,
        skill: SkillID,
        aim: Pos,
        cells: Vec<Pos>,
    },
    Damaged {
        source: UnitID,
        target: UnitID,
        amount: i32,
        hp: i32,
    },
    Defeated {
        unit: UnitID,
    },
    Displaced {
        unit: UnitID,
        from: Pos,
        to: Pos,
    },
    Teleported {
        unit: UnitID,
        from: Pos,
        to: Pos,
    },
    FormationMoved {
        unit: UnitID,
        from: Pos,
        to: Pos,
    },
    FormationSkipped {
        unit: UnitID,
        to: Pos,
    },
    BattleEnded {
        winner: Side,
    },
}

/// 行動順序：開戰時決定，之後只會因死亡而縮短
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOrder {
    order: Vec<UnitID>,
    cursor: usize,
}

impl TurnOrder {
    pub fn new(order: Vec<UnitID>) -> Self {
        Self { order, cursor: 0 }
    }

    /// 依速度由高到低排序；同速時依 UnitID 由小到大，與放上棋盤的先後無關
    pub fn by_speed(board: &Board) -> Self {
        let mut units: Vec<&Character> = board.units().collect();
        units.sort_by_key(|unit| std::cmp::Reverse(unit.speed));
        Self::new(units.into_iter().map(|unit| unit.id).collect())
    }

    pub fn ids(&self) -> &[UnitID] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<UnitID> {
        self.order.get(self.cursor).copied()
    }

    /// 以目前（可能已縮短）的長度取餘數前進
    pub fn advance(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.order.len();
    }

    /// 移除單位並修正游標，使下一次 advance 仍輪到原本的下一位
    pub fn remove(&mut self, unit_id: UnitID) -> bool {
        let Some(index) = self.order.iter().position(|id| *id == unit_id) else {
            return false;
        };
        self.order.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        } else if index == self.cursor {
            self.cursor = match self.cursor {
                0 => self.order.len().saturating_sub(1),
                cursor => cursor - 1,
            };
        }
        if self.cursor >= self.order.len() {
            self.cursor = 0;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct Battle {
    board: Board,
    turn_order: TurnOrder,
    state: BattleState,
    cursor: Pos,
    skill_cursor: usize,
    valid_moves: Vec<Pos>,
    selected_skill: Option<usize>,
    preview: Vec<Pos>,
    events: Vec<BattleEvent>,
    fallen: Vec<Character>,
    winner: Option<Side>,
}

impl Battle {
    /// 以擺好角色的棋盤開戰，雙方都至少要有一名角色
    /// 同速角色的行動先後由 UnitID 決定，要保留建立順序就依序編號（from_config 即如此）
    pub fn new(board: Board) -> Result<Self, Error> {
        let func = "Battle::new";

        if let Some(side) = Side::iter().find(|side| board.living_count(*side) == 0) {
            return Err(Error::EmptySide { func, side });
        }
        let turn_order = TurnOrder::by_speed(&board);
        let mut battle = Battle {
            board,
            turn_order,
            state: BattleState::TurnStart,
            cursor: Pos::default(),
            skill_cursor: 0,
            valid_moves: vec![],
            selected_skill: None,
            preview: vec![],
            events: vec![],
            fallen: vec![],
            winner: None,
        };
        battle.start_turn();
        Ok(battle)
    }

    /// 依開戰配置複製模板並擺放角色；UnitID 依玩家方、敵方的順序從 1 開始編號
    pub fn from_config(
        config: &BattleConfig,
        catalog: &(impl SkillGetter + CharacterTemplateGetter),
    ) -> Result<Self, Error> {
        let func = "Battle::from_config";

        let mut board = Board::new();
        let sides = [(Side::Ally, &config.allies), (Side::Enemy, &config.enemies)];
        let markers = sides
            .into_iter()
            .flat_map(|(side, markers)| markers.iter().map(move |marker| (side, marker)));
        for (unit_id, (side, marker)) in (1..).zip(markers) {
            let template =
                catalog
                    .get_template(&marker.template)
                    .ok_or_else(|| Error::MissingTemplate {
                        func,
                        template: marker.template.clone(),
                    })?;
            let mut unit = Character::from_template(unit_id, template, side, marker.pos, catalog)
                .map_err(|e| Error::Wrap {
                    func,
                    source: Box::new(e),
                })?;
            unit.name = match (&marker.name, side) {
                (Some(name), _) => name.clone(),
                (None, Side::Ally) => template.name.clone(),
                (None, Side::Enemy) => format!("{ENEMY_NAME_PREFIX}{}", template.name),
            };
            board.insert_unit(unit).map_err(|e| Error::Wrap {
                func,
                source: Box::new(e),
            })?;
        }
        Battle::new(board).map_err(|e| Error::Wrap {
            func,
            source: Box::new(e),
        })
    }

    // ===== 查詢 =====

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn_order(&self) -> &TurnOrder {
        &self.turn_order
    }

    pub fn territory_of(&self, pos: Pos) -> Territory {
        territory_of(pos)
    }

    pub fn occupant_at(&self, pos: Pos) -> Option<&Character> {
        self.board.occupant_at(pos)
    }

    pub fn valid_moves(&self, pos: Pos) -> Vec<Pos> {
        self.board.valid_moves(pos)
    }

    /// Moving 狀態下可以確認的目的地
    pub fn move_targets(&self) -> &[Pos] {
        &self.valid_moves
    }

    /// 任意角色、任意技能在 aim 的影響範圍（不檢查魔力與狀態）
    pub fn preview_targets(&self, caster: UnitID, skill_index: usize, aim: Pos) -> Vec<Pos> {
        self.board
            .unit(caster)
            .and_then(|unit| {
                unit.skills
                    .get(skill_index)
                    .map(|skill| affected_cells(&self.board, unit, skill, aim))
            })
            .unwrap_or_default()
    }

    /// SelectingTargets 狀態下，目前游標位置的影響範圍
    pub fn preview(&self) -> &[Pos] {
        &self.preview
    }

    pub fn current_actor(&self) -> Option<&Character> {
        self.turn_order.current().and_then(|id| self.board.unit(id))
    }

    pub fn current_state(&self) -> BattleState {
        self.state
    }

    pub fn cursor(&self) -> Pos {
        self.cursor
    }

    pub fn skill_cursor(&self) -> usize {
        self.skill_cursor
    }

    pub fn selected_skill(&self) -> Option<&Skill> {
        let index = self.selected_skill?;
        self.current_actor()?.skills.get(index)
    }

    /// 目前行動者的技能可施放範圍（僅供顯示，瞄準不受此限制）
    pub fn casting_area(&self, skill_index: usize) -> Vec<Pos> {
        self.current_actor()
            .and_then(|actor| {
                actor
                    .skills
                    .get(skill_index)
                    .map(|skill| casting_area(actor.pos, skill.range))
            })
            .unwrap_or_default()
    }

    /// ChoosingAction / AfterMove 狀態下目前合法的選項
    pub fn legal_actions(&self) -> Vec<ActionKind> {
        if !matches!(
            self.state,
            BattleState::ChoosingAction | BattleState::AfterMove
        ) {
            return vec![];
        }
        let Some(actor) = self.current_actor() else {
            return vec![];
        };
        let mut actions = vec![];
        if actor.can_move() {
            actions.push(ActionKind::Move);
        }
        if actor.can_act() && !actor.skills.is_empty() {
            actions.push(ActionKind::Skill);
        }
        actions.push(ActionKind::EndTurn);
        actions
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &Character> {
        self.board.living(side)
    }

    /// 戰鬥中倒下的角色，依死亡先後排列
    pub fn fallen(&self) -> &[Character] {
        &self.fallen
    }

    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    // ===== 指令（不合法時靜默忽略） =====

    pub fn submit_action(&mut self, kind: ActionKind) {
        let result = self.try_submit_action(kind);
        ignore_rejected(result);
    }

    /// 移動共用游標；超出棋盤時夾回邊界
    pub fn set_cursor(&mut self, pos: Pos) {
        let result = self.try_set_cursor(pos);
        ignore_rejected(result);
    }

    /// 確認移動到目前游標位置
    pub fn confirm_move(&mut self) {
        let result = self.try_confirm_move();
        ignore_rejected(result);
    }

    /// 移動游標到 pos 並確認移動
    pub fn submit_move(&mut self, pos: Pos) {
        let result = self.try_submit_move(pos);
        ignore_rejected(result);
    }

    pub fn set_skill_cursor(&mut self, index: usize) {
        let result = self.try_set_skill_cursor(index);
        ignore_rejected(result);
    }

    /// 確認目前技能游標所指的技能
    pub fn confirm_skill(&mut self) {
        let result = self.try_submit_skill_selection(self.skill_cursor);
        ignore_rejected(result);
    }

    pub fn submit_skill_selection(&mut self, index: usize) {
        let result = self.try_submit_skill_selection(index);
        ignore_rejected(result);
    }

    /// 以目前游標位置為瞄準點施放
    pub fn confirm_target(&mut self) {
        let result = self.try_confirm_target();
        ignore_rejected(result);
    }

    /// 移動游標到 aim 並施放
    pub fn submit_target(&mut self, aim: Pos) {
        let result = self.try_submit_target(aim);
        ignore_rejected(result);
    }

    pub fn cancel(&mut self) {
        let result = self.try_cancel();
        ignore_rejected(result);
    }

    // ===== 狀態機內部 =====

    fn transition(&mut self, next: BattleState) {
        log::debug!("狀態 {} -> {}", self.state, next);
        self.state = next;
    }

    fn expect_state(&self, func: &'static str, expected: BattleState) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::IllegalCommand {
                func,
                state: self.state,
            })
        }
    }

    fn actor_id(&self, func: &'static str) -> Result<UnitID, Error> {
        self.turn_order.current().ok_or(Error::IllegalCommand {
            func,
            state: self.state,
        })
    }

    fn start_turn(&mut self) {
        self.transition(BattleState::TurnStart);
        self.valid_moves.clear();
        self.selected_skill = None;
        self.preview.clear();
        self.skill_cursor = 0;

        let Some(actor_id) = self.turn_order.current() else {
            return;
        };
        if let Some(actor) = self.board.unit_mut(actor_id) {
            actor.reset_turn();
            self.cursor = actor.pos;
            log::debug!("輪到 {}（{}）", actor.name, actor_id);
        }
        self.events.push(BattleEvent::TurnStarted { unit: actor_id });
        self.transition(BattleState::ChoosingAction);
    }

    fn end_turn(&mut self) {
        self.transition(BattleState::TurnEnd);
        if self.check_battle_end() {
            return;
        }
        self.turn_order.advance();
        self.start_turn();
    }

    /// 任一方全滅時進入 BattleEnd
    fn check_battle_end(&mut self) -> bool {
        let Some(winner) = battle_winner(&self.board) else {
            return false;
        };
        self.winner = Some(winner);
        self.valid_moves.clear();
        self.selected_skill = None;
        self.preview.clear();
        self.transition(BattleState::BattleEnd);
        log::info!("戰鬥結束，{winner} 方獲勝");
        self.events.push(BattleEvent::BattleEnded { winner });
        true
    }

    fn refresh_preview(&mut self) {
        let preview = match (self.current_actor(), self.selected_skill) {
            (Some(actor), Some(index)) => actor
                .skills
                .get(index)
                .map(|skill| affected_cells(&self.board, actor, skill, self.cursor))
                .unwrap_or_default(),
            _ => vec![],
        };
        self.preview = preview;
    }

    fn try_submit_action(&mut self, kind: ActionKind) -> Result<(), Error> {
        let func = "Battle::submit_action";

        if !matches!(
            self.state,
            BattleState::ChoosingAction | BattleState::AfterMove
        ) {
            return Err(Error::IllegalCommand {
                func,
                state: self.state,
            });
        }
        if !self.legal_actions().contains(&kind) {
            return Err(Error::NotEnoughActions { func });
        }
        match kind {
            ActionKind::Move => {
                let actor_id = self.actor_id(func)?;
                let pos = self
                    .board
                    .unit(actor_id)
                    .ok_or(Error::UnitNotFound {
                        func,
                        unit_id: actor_id,
                    })?
                    .pos;
                self.valid_moves = self.board.valid_moves(pos);
                self.cursor = pos;
                self.transition(BattleState::Moving);
            }
            ActionKind::Skill => {
                self.skill_cursor = 0;
                self.transition(BattleState::SelectingSkill);
            }
            ActionKind::EndTurn => self.end_turn(),
        }
        Ok(())
    }

    fn try_set_cursor(&mut self, pos: Pos) -> Result<(), Error> {
        let func = "Battle::set_cursor";

        let clamped = Pos::new(
            pos.x.clamp(0, GRID_WIDTH - 1),
            pos.y.clamp(0, GRID_HEIGHT - 1),
        );
        match self.state {
            BattleState::Moving => self.cursor = clamped,
            BattleState::SelectingTargets => {
                self.cursor = clamped;
                self.refresh_preview();
            }
            state => return Err(Error::IllegalCommand { func, state }),
        }
        Ok(())
    }

    fn try_confirm_move(&mut self) -> Result<(), Error> {
        let func = "Battle::confirm_move";

        self.expect_state(func, BattleState::Moving)?;
        let to = self.cursor;
        if !self.valid_moves.contains(&to) {
            return Err(Error::NotReachable { func, pos: to });
        }
        let actor_id = self.actor_id(func)?;
        let actor = self.board.unit(actor_id).ok_or(Error::UnitNotFound {
            func,
            unit_id: actor_id,
        })?;
        if !actor.can_move() {
            return Err(Error::NotEnoughActions { func });
        }
        let from = actor.pos;
        self.board.move_unit(from, to).map_err(|e| Error::Wrap {
            func,
            source: Box::new(e),
        })?;
        if let Some(actor) = self.board.unit_mut(actor_id) {
            actor.moved_count += 1;
            actor.has_moved = true;
        }
        log::debug!("單位 {actor_id} 移動 {from} -> {to}");
        self.events.push(BattleEvent::Moved {
            unit: actor_id,
            from,
            to,
        });
        self.valid_moves.clear();
        self.transition(BattleState::AfterMove);
        Ok(())
    }

    fn try_submit_move(&mut self, pos: Pos) -> Result<(), Error> {
        let func = "Battle::submit_move";

        self.expect_state(func, BattleState::Moving)?;
        // 先檢查原始座標，避免棋盤外的座標被夾回邊界後剛好變成合法目的地
        if !self.valid_moves.contains(&pos) {
            return Err(Error::NotReachable { func, pos });
        }
        self.cursor = pos;
        self.try_confirm_move().map_err(|e| Error::Wrap {
            func,
            source: Box::new(e),
        })
    }

    fn try_set_skill_cursor(&mut self, index: usize) -> Result<(), Error> {
        let func = "Battle::set_skill_cursor";

        self.expect_state(func, BattleState::SelectingSkill)?;
        let count = self.current_actor().map_or(0, |actor| actor.skills.len());
        if count == 0 {
            return Err(Error::SkillIndexOutOfRange { func, index });
        }
        self.skill_cursor = index.min(count - 1);
        Ok(())
    }

    fn try_submit_skill_selection(&mut self, index: usize) -> Result<(), Error> {
        let func = "Battle::submit_skill_selection";

        self.expect_state(func, BattleState::SelectingSkill)?;
        let actor_id = self.actor_id(func)?;
        let actor = self.board.unit(actor_id).ok_or(Error::UnitNotFound {
            func,
            unit_id: actor_id,
        })?;
        let skill = actor
            .skills
            .get(index)
            .ok_or(Error::SkillIndexOutOfRange { func, index })?;
        if !actor.can_cast(skill) {
            return Err(Error::NotEnoughMp {
                func,
                mp: actor.mp,
                cost: skill.mp_cost,
            });
        }
        self.skill_cursor = index;
        self.selected_skill = Some(index);
        self.transition(BattleState::SelectingTargets);
        self.refresh_preview();
        Ok(())
    }

    fn try_confirm_target(&mut self) -> Result<(), Error> {
        let func = "Battle::confirm_target";

        self.expect_state(func, BattleState::SelectingTargets)?;
        let index = self.selected_skill.ok_or(Error::IllegalCommand {
            func,
            state: self.state,
        })?;
        let actor_id = self.actor_id(func)?;
        let outcome = cast_skill(
            &mut self.board,
            &mut self.turn_order,
            actor_id,
            index,
            self.cursor,
        )
        .map_err(|e| Error::Wrap {
            func,
            source: Box::new(e),
        })?;
        if let Some(actor) = self.board.unit_mut(actor_id) {
            actor.has_acted = true;
        }
        self.events.extend(outcome.events);
        self.fallen.extend(outcome.fallen);
        // 施放技能必定結束回合，包含純位移類技能
        self.end_turn();
        Ok(())
    }

    fn try_submit_target(&mut self, aim: Pos) -> Result<(), Error> {
        let func = "Battle::submit_target";

        self.expect_state(func, BattleState::SelectingTargets)?;
        if !is_valid(aim) {
            return Err(Error::OutOfBounds { func, pos: aim });
        }
        self.cursor = aim;
        self.refresh_preview();
        self.try_confirm_target().map_err(|e| Error::Wrap {
            func,
            source: Box::new(e),
        })
    }

    fn try_cancel(&mut self) -> Result<(), Error> {
        let func = "Battle::cancel";

        match self.state {
            BattleState::Moving => {
                self.valid_moves.clear();
                self.transition(BattleState::ChoosingAction);
            }
            BattleState::SelectingSkill => {
                let has_moved = self.current_actor().is_some_and(|actor| actor.has_moved);
                if has_moved {
                    self.transition(BattleState::AfterMove);
                } else {
                    self.transition(BattleState::ChoosingAction);
                }
            }
            BattleState::SelectingTargets => {
                self.selected_skill = None;
                self.preview.clear();
                self.transition(BattleState::SelectingSkill);
            }
            state => return Err(Error::IllegalCommand { func, state }),
        }
        Ok(())
    }
}

fn ignore_rejected(result: Result<(), Error>) {
    if let Err(err) = result {
        log::debug!("忽略指令: {err}");
    }
}
