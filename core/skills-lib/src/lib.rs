use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

pub type SkillID = String;
/// 相對座標偏移 (dx, dy)
pub type Offset = (i32, i32);

pub const DEFAULT_RANGE: usize = 3;
pub const DEFAULT_RADIUS: usize = 1;

/// 技能資料結構
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Skill {
    // 由技能表的 key 補上，資料檔中可省略
    #[serde(default)]
    pub id: SkillID,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mp_cost: i32,
    #[serde(default)]
    pub effect: EffectKind,
    #[serde(default)]
    pub shape: RangeShape,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub displacement_distance: usize,
    #[serde(default)]
    pub displacement: DisplacementMode,
    /// 施放距離（曼哈頓），只用於顯示可施放範圍
    #[serde(default = "default_range")]
    pub range: usize,
    /// 範圍半徑：Cross / Area / Circle / Cone 使用
    #[serde(default = "default_radius")]
    pub radius: usize,
    /// Custom 形狀的相對座標
    #[serde(default)]
    pub custom_pattern: Vec<Offset>,
    /// AllyFormation 的陣型座標，依序分配給友軍
    #[serde(default)]
    pub formation_pattern: Vec<Offset>,
}

/// 技能效果種類
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Default,
    EnumString,
    Display,
    EnumIter,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EffectKind {
    #[default]
    Damage,
    Displacement,
    DamageDisplacement,
    SelfTeleport,
    AllyFormation,
}

/// 技能範圍形狀
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Default,
    EnumString,
    Display,
    EnumIter,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RangeShape {
    #[default]
    Single,
    Line,
    Cross,
    Area,
    Circle,
    Cone,
    HorizontalSweep,
    VerticalSweep,
    Custom,
    AllEnemies,
    AllAllies,
}

/// 位移方向模式
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Default,
    EnumString,
    Display,
    EnumIter,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DisplacementMode {
    // 以施放者為參考點
    #[default]
    Away,
    Toward,
    // 固定方向
    Up,
    Down,
    Left,
    Right,
    // 以瞄準點為參考點
    Explosion,
    Vortex,
    // 固定向下
    Gravity,
}

impl EffectKind {
    pub fn deals_damage(&self) -> bool {
        matches!(self, EffectKind::Damage | EffectKind::DamageDisplacement)
    }

    pub fn displaces(&self) -> bool {
        matches!(
            self,
            EffectKind::Displacement | EffectKind::DamageDisplacement
        )
    }
}

impl DisplacementMode {
    /// 固定方向的單位向量；需要參考點的模式回傳 None
    pub fn fixed_direction(&self) -> Option<Offset> {
        match self {
            DisplacementMode::Up => Some((0, -1)),
            DisplacementMode::Down | DisplacementMode::Gravity => Some((0, 1)),
            DisplacementMode::Left => Some((-1, 0)),
            DisplacementMode::Right => Some((1, 0)),
            DisplacementMode::Away
            | DisplacementMode::Toward
            | DisplacementMode::Explosion
            | DisplacementMode::Vortex => None,
        }
    }

    /// 參考點是否為瞄準點（否則為施放者位置）
    pub fn uses_aim_point(&self) -> bool {
        matches!(self, DisplacementMode::Explosion | DisplacementMode::Vortex)
    }

    /// 是否朝參考點拉近
    pub fn is_pull(&self) -> bool {
        matches!(self, DisplacementMode::Toward | DisplacementMode::Vortex)
    }
}

impl Default for Skill {
    fn default() -> Self {
        Skill {
            id: SkillID::new(),
            name: String::new(),
            description: String::new(),
            mp_cost: 0,
            effect: EffectKind::default(),
            shape: RangeShape::default(),
            damage: 0,
            displacement_distance: 0,
            displacement: DisplacementMode::default(),
            range: DEFAULT_RANGE,
            radius: DEFAULT_RADIUS,
            custom_pattern: Vec::new(),
            formation_pattern: Vec::new(),
        }
    }
}

fn default_range() -> usize {
    DEFAULT_RANGE
}

fn default_radius() -> usize {
    DEFAULT_RADIUS
}
