//! catalog.rs：
//! - 唯讀的技能表與角色模板表，於建立戰鬥時注入。
//! - 內建資料放在 data/catalog.toml，以 include_str! 編入。
//! - BattleConfig 描述開戰配置（哪些模板、站在哪裡），不負責任何戰鬥邏輯。
use crate::*;
use serde::{Deserialize, Serialize};
use skills_lib::*;
use std::collections::BTreeMap;

/// 玩家方預設站位（最多五名）
pub const ALLY_START_POSITIONS: [Pos; 5] = [
    Pos::new(2, 2),
    Pos::new(3, 3),
    Pos::new(2, 4),
    Pos::new(1, 3),
    Pos::new(3, 2),
];

/// 敵方預設站位（最多五名）
pub const ENEMY_START_POSITIONS: [Pos; 5] = [
    Pos::new(11, 2),
    Pos::new(12, 3),
    Pos::new(11, 4),
    Pos::new(10, 3),
    Pos::new(12, 2),
];

/// 敵方角色未指定名稱時的前綴
pub const ENEMY_NAME_PREFIX: &str = "敵";

pub trait CharacterTemplateGetter {
    fn get_template(&self, id: &TemplateID) -> Option<&CharacterTemplate>;
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Catalog {
    #[serde(default)]
    pub skills: BTreeMap<SkillID, Skill>,
    #[serde(default)]
    pub characters: BTreeMap<TemplateID, CharacterTemplate>,
}

impl SkillGetter for Catalog {
    fn get_skill(&self, id: &SkillID) -> Option<&Skill> {
        self.skills.get(id)
    }
}

impl CharacterTemplateGetter for Catalog {
    fn get_template(&self, id: &TemplateID) -> Option<&CharacterTemplate> {
        self.characters.get(id)
    }
}

impl Catalog {
    /// 解析 TOML 資料，並以表格 key 作為 id
    /// 角色模板引用的技能都必須存在
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let func = "Catalog::from_toml";

        let mut catalog: Catalog = toml::from_str(content).map_err(|e| Error::Parse {
            func,
            format: "toml",
            reason: e.to_string(),
        })?;
        for (id, skill) in catalog.skills.iter_mut() {
            skill.id = id.clone();
        }
        for (id, template) in catalog.characters.iter_mut() {
            template.id = id.clone();
        }
        if let Some(skill_id) = catalog
            .characters
            .values()
            .flat_map(|template| template.skills.iter())
            .find(|skill_id| !catalog.skills.contains_key(*skill_id))
        {
            return Err(Error::SkillNotFound {
                func,
                skill_id: skill_id.clone(),
            });
        }
        Ok(catalog)
    }

    /// 內建的十二屬性角色與通用技能
    pub fn builtin() -> Result<Self, Error> {
        Self::from_toml(include_str!("../data/catalog.toml")).map_err(|e| Error::Wrap {
            func: "Catalog::builtin",
            source: Box::new(e),
        })
    }
}

/// 單一角色的開戰配置
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UnitMarker {
    pub template: TemplateID,
    pub pos: Pos,
    /// 不指定時使用模板名稱，敵方另加前綴
    #[serde(default)]
    pub name: Option<String>,
}

/// 開戰配置：雙方角色與站位
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BattleConfig {
    #[serde(default)]
    pub allies: Vec<UnitMarker>,
    #[serde(default)]
    pub enemies: Vec<UnitMarker>,
}

impl BattleConfig {
    /// 標準陣容：依序放到預設站位，超過五名的部分捨棄
    pub fn lineup<S: AsRef<str>>(allies: &[S], enemies: &[S]) -> Self {
        fn markers<S: AsRef<str>>(templates: &[S], positions: &[Pos]) -> Vec<UnitMarker> {
            templates
                .iter()
                .zip(positions)
                .map(|(template, pos)| UnitMarker {
                    template: template.as_ref().to_string(),
                    pos: *pos,
                    name: None,
                })
                .collect()
        }
        BattleConfig {
            allies: markers(allies, &ALLY_START_POSITIONS),
            enemies: markers(enemies, &ENEMY_START_POSITIONS),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Parse {
            func: "BattleConfig::from_toml",
            format: "toml",
            reason: e.to_string(),
        })
    }
}
