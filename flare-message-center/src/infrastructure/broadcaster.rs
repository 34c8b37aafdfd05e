//! 进程内群组推送
//!
//! 每个连接对应一个无界事件通道，群组成员关系保存在内存中。

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

use crate::domain::model::ClientEvent;
use crate::domain::repository::{ClientProxy, GroupBroadcaster};

/// 进程内群组推送实现
#[derive(Default)]
pub struct LocalGroupBroadcaster {
    connections: DashMap<String, UnboundedSender<ClientEvent>>,
    groups: DashMap<String, HashSet<String>>,
}

impl LocalGroupBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册连接，返回该连接的事件接收端
    pub fn connect(&self, connection_id: impl Into<String>) -> UnboundedReceiver<ClientEvent> {
        let (sender, receiver) = unbounded_channel();
        let connection_id = connection_id.into();
        debug!(connection_id = %connection_id, "Connection registered");
        self.connections.insert(connection_id, sender);
        receiver
    }

    /// 注销连接并移出所有群组
    pub fn disconnect(&self, connection_id: &str) {
        self.connections.remove(connection_id);
        self.leave_all(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 群组当前成员（按连接 ID 排序）
    pub fn group_members(&self, group_name: &str) -> Vec<String> {
        let mut members = self
            .groups
            .get(group_name)
            .map(|members| members.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        members.sort();
        members
    }

    fn leave_all(&self, connection_id: &str) {
        for mut group in self.groups.iter_mut() {
            group.value_mut().remove(connection_id);
        }
        self.groups.retain(|_, members| !members.is_empty());
    }
}

struct ConnectionProxy {
    connection_id: String,
    sender: UnboundedSender<ClientEvent>,
}

#[async_trait]
impl ClientProxy for ConnectionProxy {
    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| anyhow!("connection {} is closed", self.connection_id))
    }
}

struct GroupProxy {
    group_name: String,
    members: Vec<(String, UnboundedSender<ClientEvent>)>,
}

#[async_trait]
impl ClientProxy for GroupProxy {
    async fn send(&self, event: ClientEvent) -> Result<()> {
        for (connection_id, sender) in &self.members {
            if sender.send(event.clone()).is_err() {
                warn!(
                    group = %self.group_name,
                    connection_id = %connection_id,
                    "Dropping event for closed connection"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GroupBroadcaster for LocalGroupBroadcaster {
    fn client(&self, connection_id: &str) -> Option<Arc<dyn ClientProxy>> {
        let sender = self.connections.get(connection_id)?.value().clone();
        Some(Arc::new(ConnectionProxy {
            connection_id: connection_id.to_string(),
            sender,
        }))
    }

    /// 客户端密钥即 `setClientId` 下发的连接 ID
    fn user(&self, secret: &str) -> Option<Arc<dyn ClientProxy>> {
        self.client(secret)
    }

    fn group(&self, group_name: &str) -> Option<Arc<dyn ClientProxy>> {
        let member_ids = self.group_members(group_name);
        let members = member_ids
            .into_iter()
            .filter_map(|id| {
                let sender = self.connections.get(&id)?.value().clone();
                Some((id, sender))
            })
            .collect::<Vec<_>>();
        if members.is_empty() {
            return None;
        }
        Some(Arc::new(GroupProxy {
            group_name: group_name.to_string(),
            members,
        }))
    }

    async fn add_to_group(&self, connection_id: &str, group_name: &str) -> Result<()> {
        if !self.connections.contains_key(connection_id) {
            return Err(anyhow!("connection {} is not registered", connection_id));
        }
        self.groups
            .entry(group_name.to_string())
            .or_default()
            .insert(connection_id.to_string());
        debug!(connection_id, group = group_name, "Connection added to group");
        Ok(())
    }

    async fn remove_from_groups(&self, connection_id: &str) -> Result<()> {
        self.leave_all(connection_id);
        Ok(())
    }
}
