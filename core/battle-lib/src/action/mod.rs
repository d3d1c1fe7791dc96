//! action/mod.rs：
//! - 作為 action 子模組的入口，統一 re-export targeting、movement、skill 等子模組。
//! - 不放具體邏輯或資料結構實作。
//! - 僅負責模組組織與匯入。
mod movement;
mod skill;
mod targeting;

pub use movement::*;
pub use skill::*;
pub use targeting::*;
