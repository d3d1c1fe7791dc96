//! unit.rs：
//! - 定義角色模板（CharacterTemplate）與戰鬥中的角色實例（Character）。
//! - 角色實例在開戰時由模板複製產生，之後與模板、其他實例不共用任何可變狀態。
//! - 不負責回合流程與技能效果，只提供角色自身的判定（可否移動、可否施放）。
use crate::*;
use serde::{Deserialize, Serialize};
use skills_lib::*;
use strum_macros::{Display, EnumIter};

/// 陣營
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, Display, EnumIter, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    Ally,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Ally => Side::Enemy,
            Side::Enemy => Side::Ally,
        }
    }
}

/// 角色模板（唯讀，由 Catalog 注入）
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CharacterTemplate {
    #[serde(default)]
    pub id: TemplateID,
    pub name: String,
    pub max_hp: i32,
    pub max_mp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    #[serde(default)]
    pub skills: Vec<SkillID>,
}

/// 戰鬥中的角色實例
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub id: UnitID,
    pub template: TemplateID,
    pub name: String,
    pub side: Side,
    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub pos: Pos,
    pub skills: Vec<Skill>,
    // 每回合重置
    pub moved_count: u8,
    pub has_moved: bool,
    pub has_acted: bool,
    // 每次移動後重算
    pub in_enemy_territory: bool,
}

pub trait SkillGetter {
    fn get_skill(&self, id: &SkillID) -> Option<&Skill>;
}

impl Character {
    /// 由模板複製出新的角色實例，技能也一併複製
    pub fn from_template(
        id: UnitID,
        template: &CharacterTemplate,
        side: Side,
        pos: Pos,
        skills: &impl SkillGetter,
    ) -> Result<Self, Error> {
        let func = "Character::from_template";

        let skills = template
            .skills
            .iter()
            .map(|skill_id| {
                skills
                    .get_skill(skill_id)
                    .cloned()
                    .ok_or_else(|| Error::SkillNotFound {
                        func,
                        skill_id: skill_id.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Character {
            id,
            template: template.id.clone(),
            name: template.name.clone(),
            side,
            hp: template.max_hp,
            max_hp: template.max_hp,
            mp: template.max_mp,
            max_mp: template.max_mp,
            attack: template.attack,
            defense: template.defense,
            speed: template.speed,
            pos,
            skills,
            moved_count: 0,
            has_moved: false,
            has_acted: false,
            in_enemy_territory: is_enemy_territory(side, pos),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn reset_turn(&mut self) {
        self.moved_count = 0;
        self.has_moved = false;
        self.has_acted = false;
    }

    pub fn can_move(&self) -> bool {
        self.moved_count < MAX_MOVES_PER_TURN && !self.has_acted
    }

    pub fn can_act(&self) -> bool {
        !self.has_acted
    }

    pub fn can_cast(&self, skill: &Skill) -> bool {
        self.mp >= skill.mp_cost
    }

    /// 扣除 HP（不低於 0），回傳是否因此死亡
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = (self.hp - amount.max(0)).max(0);
        !self.is_alive()
    }

    /// 扣除魔力（不低於 0）
    pub fn spend_mp(&mut self, cost: i32) {
        self.mp = (self.mp - cost.max(0)).max(0);
    }
}
