//! 基础设施层：群组推送、ID 生成与仓储构建

pub mod broadcaster;
pub mod id_generator;
pub mod persistence;

pub use broadcaster::LocalGroupBroadcaster;
pub use id_generator::TickMessageIdGenerator;
pub use persistence::{MessageCenterRepositories, build_repositories};
