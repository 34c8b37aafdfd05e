//! 领域服务

pub mod broadcast_center;

pub use broadcast_center::{
    BroadcastCenter, BroadcastCenterOptions, DEFAULT_DEDUP_WINDOW_MINUTES, SendOutcome, SendReport,
};
