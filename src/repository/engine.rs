// ==========================================
// 通用实体仓储 - 仓储引擎
// ==========================================
// 职责: 类型化 CRUD 门面, 组合条件编译 / 列投影 / 错误翻译
// 约束: 一个实例终身绑定一张表
//       写操作影响 0 行视为语义失败
//       从不开启/提交/回滚事务
// ==========================================

mod core;
mod decode;
mod reads;
mod writes;


pub use self::core::{Entity, Repository};
