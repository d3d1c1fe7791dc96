// 戰鬥核心錯誤型別，攜帶 function name 與 context，支援來源錯誤巢狀
use crate::*;
use skills_lib::*;
use thiserror::Error;

/// 戰鬥核心錯誤型別
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{func}`: 缺少角色模板 {template}")]
    MissingTemplate {
        func: &'static str,
        template: TemplateID,
    },

    #[error("`{func}`: 技能 {skill_id} 不存在")]
    SkillNotFound {
        func: &'static str,
        skill_id: SkillID,
    },

    #[error("`{func}`: 單位 {unit_id} 不存在")]
    UnitNotFound { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 位置 {pos} 超出棋盤")]
    OutOfBounds { func: &'static str, pos: Pos },

    #[error("`{func}`: 位置 {pos} 已被佔用")]
    PosOccupied { func: &'static str, pos: Pos },

    #[error("`{func}`: 位置 {pos} 無單位")]
    NoUnitAtPos { func: &'static str, pos: Pos },

    #[error("`{func}`: 單位 {unit_id} 已存在")]
    DuplicateUnit { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: {side} 方沒有任何角色")]
    EmptySide { func: &'static str, side: Side },

    #[error("`{func}`: 狀態 {state} 不接受此指令")]
    IllegalCommand {
        func: &'static str,
        state: BattleState,
    },

    #[error("`{func}`: 行動次數不足")]
    NotEnoughActions { func: &'static str },

    #[error("`{func}`: 魔力不足，需要 {cost}，目前 {mp}")]
    NotEnoughMp { func: &'static str, mp: i32, cost: i32 },

    #[error("`{func}`: 技能索引 {index} 超出範圍")]
    SkillIndexOutOfRange { func: &'static str, index: usize },

    #[error("`{func}`: 目標 {pos} 不在可移動範圍")]
    NotReachable { func: &'static str, pos: Pos },

    #[error("`{func}`: {format} 解析失敗: {reason}")]
    Parse {
        func: &'static str,
        format: &'static str,
        reason: String,
    },

    #[error("`{func}`: 包裝: {source}")]
    Wrap {
        func: &'static str,
        #[source]
        source: Box<Error>,
    },
}

pub fn root_error(err: &Error) -> &Error {
    let mut err = err;
    while let Error::Wrap { source, .. } = err {
        err = source.as_ref();
    }
    err
}
