//! 广播中心集成测试（内存仓储 + 手动时钟 + 记录型推送）

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use flare_message_center::domain::error::{BroadcastError, SendRejection};
use flare_message_center::domain::model::{
    ClearAllMessages, ClientEvent, GetMessages, JoinGroupRequest, MessageContent, MessageFilter,
    MessageInfo, MessageTrack, SendMessage, UpdateMessageTracker,
};
use flare_message_center::domain::repository::{ClientProxy, GroupBroadcaster};
use flare_message_center::domain::service::{
    BroadcastCenter, BroadcastCenterOptions, SendOutcome,
};
use flare_message_center::infrastructure::TickMessageIdGenerator;
use flare_message_center_core::data::{
    DeletableRepository, Filter, InMemoryRepository, InsertBulkRepository, OperationalRepository,
    QueryRepository, QueryResult, UpsertRepository,
};
use flare_message_center_core::{DataError, DataResult, ManualDateTimeService};
use tokio_util::sync::CancellationToken;

type PushLog = Arc<Mutex<Vec<(String, ClientEvent)>>>;

/// 记录所有推送与加群调用的测试替身
#[derive(Default)]
struct RecordingBroadcaster {
    connections: Mutex<HashSet<String>>,
    groups: Mutex<HashSet<String>>,
    pushes: PushLog,
    joins: Mutex<Vec<(String, String)>>,
    left: Mutex<Vec<String>>,
    /// 加群时连接已断开
    disconnect_on_join: AtomicBool,
}

impl RecordingBroadcaster {
    fn with_groups(groups: &[&str]) -> Self {
        let broadcaster = Self::default();
        broadcaster
            .groups
            .lock()
            .unwrap()
            .extend(groups.iter().map(|g| g.to_string()));
        broadcaster
    }

    fn connect(&self, connection_id: &str) {
        self.connections.lock().unwrap().insert(connection_id.to_string());
    }

    fn pushes(&self) -> Vec<(String, ClientEvent)> {
        self.pushes.lock().unwrap().clone()
    }

    fn push_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (target, _) in self.pushes() {
            *counts.entry(target).or_insert(0) += 1;
        }
        counts
    }

    fn joins(&self) -> Vec<(String, String)> {
        self.joins.lock().unwrap().clone()
    }

    fn proxy(&self, target: &str) -> Arc<dyn ClientProxy> {
        Arc::new(RecordingProxy {
            target: target.to_string(),
            log: self.pushes.clone(),
        })
    }
}

struct RecordingProxy {
    target: String,
    log: PushLog,
}

#[async_trait]
impl ClientProxy for RecordingProxy {
    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.log.lock().unwrap().push((self.target.clone(), event));
        Ok(())
    }
}

#[async_trait]
impl GroupBroadcaster for RecordingBroadcaster {
    fn client(&self, connection_id: &str) -> Option<Arc<dyn ClientProxy>> {
        self.connections
            .lock()
            .unwrap()
            .contains(connection_id)
            .then(|| self.proxy(connection_id))
    }

    fn user(&self, secret: &str) -> Option<Arc<dyn ClientProxy>> {
        self.client(secret)
    }

    fn group(&self, group_name: &str) -> Option<Arc<dyn ClientProxy>> {
        self.groups
            .lock()
            .unwrap()
            .contains(group_name)
            .then(|| self.proxy(group_name))
    }

    async fn add_to_group(&self, connection_id: &str, group_name: &str) -> Result<()> {
        if self.disconnect_on_join.load(Ordering::SeqCst) {
            self.connections.lock().unwrap().remove(connection_id);
        }
        if !self.connections.lock().unwrap().contains(connection_id) {
            return Err(anyhow!("unknown connection"));
        }
        self.joins
            .lock()
            .unwrap()
            .push((connection_id.to_string(), group_name.to_string()));
        Ok(())
    }

    async fn remove_from_groups(&self, connection_id: &str) -> Result<()> {
        self.left.lock().unwrap().push(connection_id.to_string());
        Ok(())
    }
}

/// 指定 nonce 的写入失败，其余操作交给内存仓储
struct FailingInsertRepository {
    inner: InMemoryRepository<MessageInfo>,
    failing_nonce: String,
}

#[async_trait]
impl QueryRepository<MessageInfo> for FailingInsertRepository {
    async fn get_by_id(&self, key: &i64, cancel: &CancellationToken) -> DataResult<Option<MessageInfo>> {
        self.inner.get_by_id(key, cancel).await
    }

    fn query(&self, filter: Filter, cancel: &CancellationToken) -> QueryResult<MessageInfo> {
        self.inner.query(filter, cancel)
    }
}

#[async_trait]
impl OperationalRepository<MessageInfo> for FailingInsertRepository {
    async fn insert(&self, entity: MessageInfo, cancel: &CancellationToken) -> DataResult<()> {
        if entity.nonce == self.failing_nonce {
            return Err(DataError::RateLimitExhausted {
                remaining: 1,
                attempts: 3,
            });
        }
        self.inner.insert(entity, cancel).await
    }

    async fn update(&self, key: &i64, entity: MessageInfo, cancel: &CancellationToken) -> DataResult<bool> {
        self.inner.update(key, entity, cancel).await
    }
}

#[async_trait]
impl UpsertRepository<MessageInfo> for FailingInsertRepository {
    async fn upsert(&self, key: &i64, entity: MessageInfo, cancel: &CancellationToken) -> DataResult<bool> {
        self.inner.upsert(key, entity, cancel).await
    }
}

#[async_trait]
impl DeletableRepository<MessageInfo> for FailingInsertRepository {
    async fn delete(&self, key: &i64, cancel: &CancellationToken) -> DataResult<bool> {
        self.inner.delete(key, cancel).await
    }

    async fn delete_many(&self, filter: Filter, cancel: &CancellationToken) -> DataResult<bool> {
        self.inner.delete_many(filter, cancel).await
    }
}

#[async_trait]
impl InsertBulkRepository<MessageInfo> for FailingInsertRepository {
    async fn insert_bulk(&self, entities: Vec<MessageInfo>, cancel: &CancellationToken) -> DataResult<()> {
        self.inner.insert_bulk(entities, cancel).await
    }
}

struct Fixture {
    center: BroadcastCenter,
    messages: Arc<InMemoryRepository<MessageInfo>>,
    tracks: Arc<InMemoryRepository<MessageTrack>>,
    broadcaster: Arc<RecordingBroadcaster>,
    clock: Arc<ManualDateTimeService>,
    cancel: CancellationToken,
}

impl Fixture {
    fn new(groups: &[&str]) -> Self {
        let messages = Arc::new(InMemoryRepository::<MessageInfo>::new());
        let tracks = Arc::new(InMemoryRepository::<MessageTrack>::new());
        let broadcaster = Arc::new(RecordingBroadcaster::with_groups(groups));
        let clock = Arc::new(ManualDateTimeService::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        ));
        let center = BroadcastCenter::new(
            messages.clone(),
            tracks.clone(),
            broadcaster.clone(),
            clock.clone(),
            Arc::new(TickMessageIdGenerator::new(clock.clone())),
            BroadcastCenterOptions::default(),
        );
        Self {
            center,
            messages,
            tracks,
            broadcaster,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    async fn stored_messages(&self) -> Vec<MessageInfo> {
        let mut stored = self.messages.get_all(&self.cancel).get().await.unwrap();
        stored.sort_by_key(|m| m.id);
        stored
    }
}

fn filter() -> MessageFilter {
    MessageFilter::new(["scope-1"], ["activity-1"])
}

fn notification(nonce: &str, groups: &[&str]) -> SendMessage {
    SendMessage::new(
        nonce,
        filter(),
        groups.iter().copied(),
        MessageContent::notification("msg1", "https://example.com/messages"),
    )
}

#[tokio::test]
async fn test_notification_to_single_group() {
    let fixture = Fixture::new(&["Test"]);

    let report = fixture
        .center
        .send_message(notification("n1", &["Test"]), &fixture.cancel)
        .await
        .unwrap();

    assert_eq!(report.response.nonce_status, HashMap::from([("n1".to_string(), true)]));
    assert!(report.response.error_message.is_none());

    let stored = fixture.stored_messages().await;
    assert_eq!(stored.len(), 1);
    let record = &stored[0];
    assert!(record.id > 0);
    assert_eq!(record.nonce, "n1");
    assert_eq!(record.created_at, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());

    assert_eq!(
        fixture.broadcaster.pushes(),
        vec![(
            "Test".to_string(),
            ClientEvent::Update {
                event_id: record.id,
                filter: filter(),
            }
        )]
    );
    assert_eq!(
        report.outcomes,
        vec![SendOutcome::Accepted {
            message_id: record.id,
            pushed_groups: 1,
            skipped_groups: 0,
        }]
    );
}

#[tokio::test]
async fn test_duplicate_nonce_is_rejected_within_window() {
    let fixture = Fixture::new(&["Test"]);

    fixture
        .center
        .send_message(notification("n1", &["Test"]), &fixture.cancel)
        .await
        .unwrap();

    fixture.clock.advance(Duration::minutes(4));
    let second = fixture
        .center
        .send_message(notification("n1", &["Test"]), &fixture.cancel)
        .await
        .unwrap();

    assert_eq!(second.response.nonce_status.get("n1"), Some(&false));
    assert_eq!(second.response.error_message.as_deref(), Some("Duplicated message."));
    assert_eq!(second.outcomes, vec![SendOutcome::Rejected(SendRejection::Duplicate)]);
    assert_eq!(fixture.messages.len().await, 1);
    assert_eq!(fixture.broadcaster.pushes().len(), 1);
}

#[tokio::test]
async fn test_duplicate_nonce_is_accepted_after_window() {
    let fixture = Fixture::new(&["Test"]);

    fixture
        .center
        .send_message(notification("n1", &["Test"]), &fixture.cancel)
        .await
        .unwrap();

    fixture.clock.advance(Duration::minutes(5) + Duration::seconds(1));
    let again = fixture
        .center
        .send_message(notification("n1", &["Test"]), &fixture.cancel)
        .await
        .unwrap();

    assert!(again.response.is_success("n1"));
    let stored = fixture.stored_messages().await;
    assert_eq!(stored.len(), 2);
    assert!(stored[0].id < stored[1].id);
}

#[tokio::test]
async fn test_groups_and_filter_are_deduplicated() {
    let fixture = Fixture::new(&["g1", "g2"]);
    let message = SendMessage::new(
        "n1",
        MessageFilter::new(["s1", "s1", "s2"], ["a1", "a2", "a1"]),
        ["g1", "g2", "g1"],
        MessageContent::dynamic(serde_json::json!({ "count": 3 }), Some("application/json".into())),
    );

    fixture.center.send_message(message, &fixture.cancel).await.unwrap();

    let stored = fixture.stored_messages().await;
    assert_eq!(stored[0].target_groups, vec!["g1", "g2"]);
    assert_eq!(stored[0].filter.scopes, vec!["s1", "s2"]);
    assert_eq!(stored[0].filter.activities, vec!["a1", "a2"]);
    assert_eq!(
        fixture.broadcaster.push_counts(),
        HashMap::from([("g1".to_string(), 1), ("g2".to_string(), 1)])
    );
}

#[tokio::test]
async fn test_invalid_messages_are_neither_stored_nor_pushed() {
    let fixture = Fixture::new(&["Test"]);

    let mut invalid = Vec::new();
    let mut message = notification("", &["Test"]);
    invalid.push(message.clone());
    message = notification("n2", &["Test"]);
    message.filter = None;
    invalid.push(message);
    message = notification("n3", &["Test"]);
    message.filter = Some(MessageFilter::new(Vec::<String>::new(), vec!["a".to_string()]));
    invalid.push(message);
    message = notification("n4", &["Test"]);
    message.filter = Some(MessageFilter::new(["s"], [" "]));
    invalid.push(message);
    invalid.push(notification("n5", &[]));
    invalid.push(notification("n6", &["Test", ""]));
    message = notification("n7", &["Test"]);
    message.content = MessageContent::notification("", "https://example.com");
    invalid.push(message);
    message = notification("n8", &["Test"]);
    message.content = MessageContent::notification("msg", " ");
    invalid.push(message);
    message = notification("n9", &["Test"]);
    message.content = MessageContent::dynamic(serde_json::Value::Null, None);
    invalid.push(message);

    for message in invalid {
        let nonce = message.nonce.clone();
        let report = fixture.center.send_message(message, &fixture.cancel).await.unwrap();
        assert_eq!(
            report.response.error_message.as_deref(),
            Some("Nonce, Filter and TargetGroup can't be null or empty.")
        );
        assert!(!report.response.is_success(&nonce));
    }

    assert!(fixture.messages.is_empty().await);
    assert!(fixture.broadcaster.pushes().is_empty());
}

#[tokio::test]
async fn test_batch_fan_out_counts() {
    let fixture = Fixture::new(&["g1", "g2", "g3"]);

    let report = fixture
        .center
        .send_messages(
            vec![notification("n1", &["g1", "g2"]), notification("n2", &["g2", "g3"])],
            &fixture.cancel,
        )
        .await
        .unwrap();

    assert!(report.response.is_success("n1"));
    assert!(report.response.is_success("n2"));
    assert_eq!(
        fixture.broadcaster.push_counts(),
        HashMap::from([
            ("g1".to_string(), 1),
            ("g2".to_string(), 2),
            ("g3".to_string(), 1),
        ])
    );
}

#[tokio::test]
async fn test_group_without_members_is_skipped() {
    let fixture = Fixture::new(&["Test"]);

    let report = fixture
        .center
        .send_message(notification("n1", &["Test", "Ghost"]), &fixture.cancel)
        .await
        .unwrap();

    assert!(report.response.is_success("n1"));
    assert!(matches!(
        report.outcomes[0],
        SendOutcome::Accepted {
            pushed_groups: 1,
            skipped_groups: 1,
            ..
        }
    ));
    assert_eq!(fixture.broadcaster.pushes().len(), 1);
}

#[tokio::test]
async fn test_batch_merges_statuses_and_keeps_last_error() {
    let fixture = Fixture::new(&["Test"]);

    let report = fixture
        .center
        .send_messages(
            vec![
                notification("n1", &["Test"]),
                notification("n1", &["Test"]),
                notification("", &["Test"]),
                notification("n2", &["Test"]),
            ],
            &fixture.cancel,
        )
        .await
        .unwrap();

    assert_eq!(
        report.response.nonce_status,
        HashMap::from([("n1".to_string(), true), ("n2".to_string(), true)])
    );
    assert_eq!(
        report.response.error_message.as_deref(),
        Some("Nonce, Filter and TargetGroup can't be null or empty.")
    );
    assert_eq!(fixture.messages.len().await, 2);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let fixture = Fixture::new(&["Test"]);

    let report = fixture.center.send_messages(Vec::new(), &fixture.cancel).await.unwrap();

    assert!(report.response.nonce_status.is_empty());
    assert!(report.response.error_message.is_some());
    assert!(fixture.messages.is_empty().await);
}

#[tokio::test]
async fn test_unsupported_content() {
    let fixture = Fixture::new(&["Test"]);
    let mut unsupported = notification("n1", &["Test"]);
    unsupported.content = MessageContent::Unsupported;

    let single = fixture
        .center
        .send_message(unsupported.clone(), &fixture.cancel)
        .await;
    assert!(matches!(single, Err(BroadcastError::UnsupportedContent(_))));
    assert!(fixture.messages.is_empty().await);

    let batch = fixture
        .center
        .send_messages(vec![unsupported, notification("n2", &["Test"])], &fixture.cancel)
        .await
        .unwrap();
    assert_eq!(batch.response.nonce_status.get("n1"), Some(&false));
    assert!(batch.response.is_success("n2"));
    assert_eq!(batch.outcomes[0], SendOutcome::Unsupported);
    assert_eq!(fixture.messages.len().await, 1);
}

#[tokio::test]
async fn test_batch_store_failure_keeps_other_statuses() {
    let broadcaster = Arc::new(RecordingBroadcaster::with_groups(&["Test"]));
    let clock = Arc::new(ManualDateTimeService::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    ));
    let messages = Arc::new(FailingInsertRepository {
        inner: InMemoryRepository::new(),
        failing_nonce: "n2".to_string(),
    });
    let center = BroadcastCenter::new(
        messages.clone(),
        Arc::new(InMemoryRepository::<MessageTrack>::new()),
        broadcaster.clone(),
        clock.clone(),
        Arc::new(TickMessageIdGenerator::new(clock)),
        BroadcastCenterOptions::default(),
    );
    let cancel = CancellationToken::new();

    let report = center
        .send_messages(
            vec![
                notification("n1", &["Test"]),
                notification("n2", &["Test"]),
                notification("n3", &["Test"]),
            ],
            &cancel,
        )
        .await
        .unwrap();

    assert!(report.response.is_success("n1"));
    assert_eq!(report.response.nonce_status.get("n2"), Some(&false));
    assert!(report.response.is_success("n3"));
    assert!(report.response.error_message.is_some());
    assert_eq!(report.outcomes[1], SendOutcome::Failed);
    assert_eq!(messages.inner.len().await, 2);
    assert_eq!(broadcaster.push_counts().get("Test"), Some(&2));
}

#[tokio::test]
async fn test_cancelled_send_surfaces_store_error() {
    let fixture = Fixture::new(&["Test"]);
    fixture.cancel.cancel();

    let result = fixture
        .center
        .send_message(notification("n1", &["Test"]), &fixture.cancel)
        .await;

    assert!(matches!(result, Err(BroadcastError::Store(DataError::Cancelled))));
    assert!(fixture.broadcaster.pushes().is_empty());
}

#[tokio::test]
async fn test_join_group_validation() {
    let fixture = Fixture::new(&[]);
    fixture.broadcaster.connect("c1");

    let cases = [
        JoinGroupRequest {
            secret: String::new(),
            group_name: "g1".into(),
            nonce: "j1".into(),
        },
        JoinGroupRequest {
            secret: "c1".into(),
            group_name: "  ".into(),
            nonce: "j2".into(),
        },
        JoinGroupRequest {
            secret: "unknown".into(),
            group_name: "g1".into(),
            nonce: "j3".into(),
        },
    ];

    for request in cases {
        let nonce = request.nonce.clone();
        let response = fixture.center.join_group(request).await.unwrap();
        assert_eq!(response.nonce, nonce);
        assert!(response.joined_group_name.is_none());
        assert_eq!(
            response.error_message.as_deref(),
            Some("Invalid message, some parameters are invalid or missing")
        );
    }
    assert!(fixture.broadcaster.joins().is_empty());

    let response = fixture
        .center
        .join_group(JoinGroupRequest {
            secret: "c1".into(),
            group_name: "g1".into(),
            nonce: "j4".into(),
        })
        .await
        .unwrap();
    assert_eq!(response.joined_group_name.as_deref(), Some("g1"));
    assert_eq!(response.nonce, "j4");
    assert!(response.error_message.is_none());
    assert_eq!(fixture.broadcaster.joins(), vec![("c1".to_string(), "g1".to_string())]);
}

#[tokio::test]
async fn test_join_group_after_disconnect_is_invalid() {
    let fixture = Fixture::new(&[]);
    fixture.broadcaster.connect("c1");
    fixture.broadcaster.disconnect_on_join.store(true, Ordering::SeqCst);

    let response = fixture
        .center
        .join_group(JoinGroupRequest {
            secret: "c1".into(),
            group_name: "g1".into(),
            nonce: "j1".into(),
        })
        .await
        .unwrap();

    assert!(response.joined_group_name.is_none());
    assert_eq!(response.nonce, "j1");
    assert_eq!(
        response.error_message.as_deref(),
        Some("Invalid message, some parameters are invalid or missing")
    );
    assert!(fixture.broadcaster.joins().is_empty());
}

#[tokio::test]
async fn test_client_secret_and_leave() {
    let fixture = Fixture::new(&[]);
    fixture.broadcaster.connect("c1");

    fixture.center.send_client_secret("").await.unwrap();
    fixture.center.send_client_secret("unknown").await.unwrap();
    fixture.center.send_client_secret("c1").await.unwrap();
    assert_eq!(
        fixture.broadcaster.pushes(),
        vec![(
            "c1".to_string(),
            ClientEvent::SetClientId {
                client_id: "c1".to_string()
            }
        )]
    );

    fixture.center.leave_group(" ").await.unwrap();
    fixture.center.leave_group("c1").await.unwrap();
    assert_eq!(*fixture.broadcaster.left.lock().unwrap(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn test_replay_returns_group_messages_in_id_order() {
    let fixture = Fixture::new(&["g1", "g2"]);
    for (nonce, groups) in [("n1", vec!["g1"]), ("n2", vec!["g2"]), ("n3", vec!["g1", "g2"])] {
        fixture
            .center
            .send_message(notification(nonce, &groups), &fixture.cancel)
            .await
            .unwrap();
        fixture.clock.advance(Duration::seconds(1));
    }

    let request = GetMessages {
        user_id: "u1".into(),
        from_group: "g1".into(),
        from_message_id: 42,
        filter: Some(filter()),
    };
    let pack = fixture
        .center
        .sync_message(request.clone(), &fixture.cancel)
        .await
        .unwrap();

    assert_eq!(pack.last_message_id, 42);
    assert!(!pack.has_more_pages);
    assert_eq!(pack.messages.len(), 2);
    assert!(pack.messages[0].id < pack.messages[1].id);
    assert!(pack.messages.iter().all(|m| !m.has_seen));

    let more = fixture
        .center
        .get_more_messages(request, &fixture.cancel)
        .await
        .unwrap();
    assert_eq!(more.messages, pack.messages);
}

#[tokio::test]
async fn test_replay_returns_every_group_message() {
    let fixture = Fixture::new(&["g1"]);
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let records: Vec<MessageInfo> = (1..=1005_i64)
        .map(|id| MessageInfo {
            id,
            nonce: format!("n{id}"),
            content: MessageContent::notification("msg", "https://example.com/messages"),
            filter: filter(),
            target_groups: vec![if id % 2 == 0 { "g1" } else { "g2" }.to_string(), "all".to_string()],
            created_at,
        })
        .collect();
    fixture.messages.insert_bulk(records, &fixture.cancel).await.unwrap();

    let request = GetMessages {
        user_id: "u1".into(),
        from_group: "all".into(),
        from_message_id: 0,
        filter: Some(filter()),
    };
    let pack = fixture
        .center
        .sync_message(request.clone(), &fixture.cancel)
        .await
        .unwrap();
    assert_eq!(pack.messages.len(), 1005);
    assert!(!pack.has_more_pages);
    assert_eq!(pack.messages.first().map(|m| m.id), Some(1));
    assert_eq!(pack.messages.last().map(|m| m.id), Some(1005));
    assert!(pack.messages.windows(2).all(|pair| pair[0].id < pair[1].id));

    let more = fixture
        .center
        .get_more_messages(request, &fixture.cancel)
        .await
        .unwrap();
    assert_eq!(more.messages.len(), 1005);
    assert!(!more.has_more_pages);
}

#[tokio::test]
async fn test_invalid_replay_returns_empty_pack() {
    let fixture = Fixture::new(&["g1"]);
    fixture
        .center
        .send_message(notification("n1", &["g1"]), &fixture.cancel)
        .await
        .unwrap();

    let pack = fixture
        .center
        .sync_message(
            GetMessages {
                user_id: "u1".into(),
                from_group: String::new(),
                from_message_id: 7,
                filter: Some(filter()),
            },
            &fixture.cancel,
        )
        .await
        .unwrap();

    assert_eq!(pack.last_message_id, 7);
    assert!(!pack.has_more_pages);
    assert!(pack.messages.is_empty());
}

#[tokio::test]
async fn test_tracker_keeps_one_active_track_per_user() {
    let fixture = Fixture::new(&[]);

    let invalid = fixture
        .center
        .update_message_tracker(
            UpdateMessageTracker {
                user_id: "u1".into(),
                from_message_id: -1,
                thru_message_id: 10,
            },
            &fixture.cancel,
        )
        .await
        .unwrap();
    assert!(!invalid);
    assert!(fixture.tracks.is_empty().await);

    for (from, thru) in [(1, 10), (10, 25)] {
        let updated = fixture
            .center
            .update_message_tracker(
                UpdateMessageTracker {
                    user_id: "u1".into(),
                    from_message_id: from,
                    thru_message_id: thru,
                },
                &fixture.cancel,
            )
            .await
            .unwrap();
        assert!(updated);
    }

    let tracks = fixture.tracks.get_all(&fixture.cancel).get().await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].user_id, "u1");
    assert_eq!(tracks[0].from_event_id, 10);
    assert_eq!(tracks[0].thru_event_id, 25);
    assert!(tracks[0].deleted_at.is_none());
}

#[tokio::test]
async fn test_clear_all_messages_is_not_supported() {
    let fixture = Fixture::new(&[]);

    let invalid = fixture
        .center
        .clear_all_messages(ClearAllMessages::default())
        .await
        .unwrap();
    assert!(!invalid);

    let result = fixture
        .center
        .clear_all_messages(ClearAllMessages {
            user_id: "u1".into(),
        })
        .await;
    assert!(matches!(result, Err(BroadcastError::NotImplemented(_))));
}
