//! In-process collaborators.
//!
//! [`InMemoryNotifications`] keeps a local notification queue, and
//! [`StaticIdentityProvider`] serves a fixed user list. Both can be told to
//! fail so that degraded paths can be exercised. [`FixedClock`] is a
//! settable [`Clock`].

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, TimeZone};
use tokio::sync::mpsc;

use pillminder_shared::{Identity, UserId};

use crate::error::{IdentityError, NotifyError};
use crate::ports::{
    Clock, IdentityProvider, NotificationChannel, NotificationContent, NotificationEvent,
    NotificationService, PermissionStatus, PresentationOptions, ScheduledNotification,
};

const EVENT_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

struct NotificationState {
    scheduled: BTreeMap<String, ScheduledNotification>,
    delivered: Vec<NotificationContent>,
    presentation: Option<PresentationOptions>,
    channels: Vec<NotificationChannel>,
    permission: PermissionStatus,
    grant_on_request: bool,
    failing: bool,
    failing_keys: HashSet<String>,
    subscribers: Vec<mpsc::Sender<NotificationEvent>>,
}

/// Local notification queue keyed by notification key.
pub struct InMemoryNotifications {
    state: Mutex<NotificationState>,
}

impl InMemoryNotifications {
    /// A queue whose permission is already granted.
    pub fn new() -> Self {
        Self::with_permission(PermissionStatus::Granted, true)
    }

    /// A queue with the given initial permission. `grant_on_request`
    /// decides what a permission request resolves to.
    pub fn with_permission(permission: PermissionStatus, grant_on_request: bool) -> Self {
        Self {
            state: Mutex::new(NotificationState {
                scheduled: BTreeMap::new(),
                delivered: Vec::new(),
                presentation: None,
                channels: Vec::new(),
                permission,
                grant_on_request,
                failing: false,
                failing_keys: HashSet::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Make every scheduling call fail with [`NotifyError::Unavailable`].
    pub fn set_failing(&self, failing: bool) -> Result<(), NotifyError> {
        self.lock()?.failing = failing;
        Ok(())
    }

    /// Make `schedule_at` fail for one key only.
    pub fn fail_key(&self, key: &str) -> Result<(), NotifyError> {
        self.lock()?.failing_keys.insert(key.to_string());
        Ok(())
    }

    /// Notifications delivered through `schedule_now`, oldest first.
    pub fn delivered(&self) -> Result<Vec<NotificationContent>, NotifyError> {
        Ok(self.lock()?.delivered.clone())
    }

    pub fn presentation(&self) -> Result<Option<PresentationOptions>, NotifyError> {
        Ok(self.lock()?.presentation)
    }

    pub fn channels(&self) -> Result<Vec<NotificationChannel>, NotifyError> {
        Ok(self.lock()?.channels.clone())
    }

    /// Push an event to every live subscriber. Returns how many received it.
    pub async fn emit(&self, event: NotificationEvent) -> Result<usize, NotifyError> {
        let subscribers = {
            let mut state = self.lock()?;
            state.subscribers.retain(|tx| !tx.is_closed());
            state.subscribers.clone()
        };

        let mut delivered = 0;
        for tx in subscribers {
            if tx.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    fn lock(&self) -> Result<MutexGuard<'_, NotificationState>, NotifyError> {
        self.state
            .lock()
            .map_err(|_| NotifyError::Unavailable("notification state poisoned".into()))
    }

    fn lock_working(&self) -> Result<MutexGuard<'_, NotificationState>, NotifyError> {
        let state = self.lock()?;
        if state.failing {
            return Err(NotifyError::Unavailable("scheduler offline".into()));
        }
        Ok(state)
    }
}

impl Default for InMemoryNotifications {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotifications {
    async fn cancel(&self, key: &str) -> Result<(), NotifyError> {
        if self.lock_working()?.scheduled.remove(key).is_some() {
            tracing::debug!(key, "cancelled notification");
        }
        Ok(())
    }

    async fn schedule_at(
        &self,
        key: &str,
        content: NotificationContent,
        fire_at: DateTime<FixedOffset>,
    ) -> Result<(), NotifyError> {
        let mut state = self.lock_working()?;
        if state.failing_keys.contains(key) {
            return Err(NotifyError::Unavailable(format!("cannot schedule {key}")));
        }
        state.scheduled.insert(
            key.to_string(),
            ScheduledNotification {
                key: key.to_string(),
                content,
                fire_at,
            },
        );
        tracing::debug!(key, %fire_at, "scheduled notification");
        Ok(())
    }

    async fn schedule_now(&self, content: NotificationContent) -> Result<(), NotifyError> {
        self.lock_working()?.delivered.push(content);
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>, NotifyError> {
        Ok(self.lock()?.scheduled.values().cloned().collect())
    }

    async fn set_presentation(&self, options: PresentationOptions) -> Result<(), NotifyError> {
        self.lock()?.presentation = Some(options);
        Ok(())
    }

    async fn register_channel(&self, channel: NotificationChannel) -> Result<(), NotifyError> {
        let mut state = self.lock()?;
        state.channels.retain(|c| c.id != channel.id);
        state.channels.push(channel);
        Ok(())
    }

    async fn permission_status(&self) -> Result<PermissionStatus, NotifyError> {
        Ok(self.lock()?.permission)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotifyError> {
        let mut state = self.lock()?;
        if state.permission != PermissionStatus::Granted {
            state.permission = if state.grant_on_request {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
        }
        Ok(state.permission)
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<NotificationEvent>, NotifyError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.lock()?.subscribers.push(tx);
        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

struct IdentityState {
    users: Vec<Identity>,
    current: Option<UserId>,
    listing_fails: bool,
    failing_lookups: HashSet<UserId>,
    lookups: usize,
}

/// Identity provider over a fixed user list.
pub struct StaticIdentityProvider {
    state: Mutex<IdentityState>,
}

impl StaticIdentityProvider {
    pub fn new(users: Vec<Identity>) -> Self {
        Self {
            state: Mutex::new(IdentityState {
                users,
                current: None,
                listing_fails: false,
                failing_lookups: HashSet::new(),
                lookups: 0,
            }),
        }
    }

    /// Sign in as `id`. The user need not be in the list.
    pub fn sign_in(&self, id: UserId) -> Result<(), IdentityError> {
        self.lock()?.current = Some(id);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), IdentityError> {
        self.lock()?.current = None;
        Ok(())
    }

    /// Make `list_all_users` fail.
    pub fn fail_listing(&self, fails: bool) -> Result<(), IdentityError> {
        self.lock()?.listing_fails = fails;
        Ok(())
    }

    /// Make `get_user_by_id(id)` fail.
    pub fn fail_lookup(&self, id: UserId) -> Result<(), IdentityError> {
        self.lock()?.failing_lookups.insert(id);
        Ok(())
    }

    /// Number of `get_user_by_id` calls served so far.
    pub fn lookup_count(&self) -> Result<usize, IdentityError> {
        Ok(self.lock()?.lookups)
    }

    fn lock(&self) -> Result<MutexGuard<'_, IdentityState>, IdentityError> {
        self.state
            .lock()
            .map_err(|_| IdentityError::Unavailable("identity state poisoned".into()))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self) -> Result<Option<Identity>, IdentityError> {
        let state = self.lock()?;
        Ok(state.current.map(|id| {
            state
                .users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .unwrap_or_else(|| Identity::new(id))
        }))
    }

    async fn list_all_users(&self) -> Result<Vec<Identity>, IdentityError> {
        let state = self.lock()?;
        if state.listing_fails {
            return Err(IdentityError::Forbidden("user listing disabled".into()));
        }
        Ok(state.users.clone())
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Identity, IdentityError> {
        let mut state = self.lock()?;
        state.lookups += 1;
        if state.failing_lookups.contains(&id) {
            return Err(IdentityError::Unavailable(format!("lookup of {id} failed")));
        }
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(IdentityError::UserNotFound)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to. Wall-clock readings are resolved
/// in the zone of the instant it holds.
pub struct FixedClock<Tz: TimeZone = FixedOffset> {
    now: Mutex<DateTime<Tz>>,
}

impl<Tz: TimeZone> FixedClock<Tz> {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.set(self.current() + by);
    }

    fn current(&self) -> DateTime<Tz> {
        match self.now.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<Tz> Clock for FixedClock<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    fn now(&self) -> DateTime<FixedOffset> {
        self.current().fixed_offset()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> LocalResult<DateTime<FixedOffset>> {
        self.current()
            .timezone()
            .from_local_datetime(&local)
            .map(|at| at.fixed_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NotificationData;
    use pillminder_shared::DoseStatus;

    fn content(title: &str) -> NotificationContent {
        NotificationContent {
            title: title.into(),
            body: String::new(),
            channel_id: None,
            play_sound: true,
            data: NotificationData::Confirmation {
                status: DoseStatus::OnTime,
                minutes: 0,
            },
        }
    }

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_replaces_same_key() {
        let queue = InMemoryNotifications::new();
        queue
            .schedule_at("k", content("first"), at("2025-03-01T08:00:00+00:00"))
            .await
            .unwrap();
        queue
            .schedule_at("k", content("second"), at("2025-03-02T08:00:00+00:00"))
            .await
            .unwrap();

        let pending = queue.list_scheduled().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content.title, "second");

        queue.cancel("k").await.unwrap();
        queue.cancel("missing").await.unwrap();
        assert!(queue.list_scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_queue_rejects_scheduling() {
        let queue = InMemoryNotifications::new();
        queue.set_failing(true).unwrap();
        assert!(matches!(
            queue.schedule_now(content("x")).await,
            Err(NotifyError::Unavailable(_))
        ));
        assert!(queue.delivered().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_key_rejects_only_that_key() {
        let queue = InMemoryNotifications::new();
        queue.fail_key("bad").unwrap();
        let when = at("2025-03-01T08:00:00+00:00");

        assert!(queue.schedule_at("bad", content("x"), when).await.is_err());
        queue.schedule_at("good", content("y"), when).await.unwrap();

        let keys: Vec<_> = queue
            .list_scheduled()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.key)
            .collect();
        assert_eq!(keys, vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn test_permission_request_follows_policy() {
        let denied = InMemoryNotifications::with_permission(PermissionStatus::Undetermined, false);
        assert_eq!(
            denied.request_permission().await.unwrap(),
            PermissionStatus::Denied
        );

        let granted = InMemoryNotifications::with_permission(PermissionStatus::Undetermined, true);
        assert_eq!(
            granted.request_permission().await.unwrap(),
            PermissionStatus::Granted
        );
    }

    #[tokio::test]
    async fn test_emit_skips_closed_subscribers() {
        let queue = InMemoryNotifications::new();
        let mut live = queue.subscribe().await.unwrap();
        let closed = queue.subscribe().await.unwrap();
        drop(closed);

        let sent = queue
            .emit(NotificationEvent::Received(content("hello")))
            .await
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(
            live.recv().await,
            Some(NotificationEvent::Received(content("hello")))
        );
    }

    #[tokio::test]
    async fn test_identity_lookups_and_failures() {
        let known = Identity::new(UserId::new()).with_email("a@b.c");
        let provider = StaticIdentityProvider::new(vec![known.clone()]);

        assert_eq!(provider.current_user().await.unwrap(), None);
        provider.sign_in(known.id).unwrap();
        assert_eq!(provider.current_user().await.unwrap(), Some(known.clone()));

        assert_eq!(provider.get_user_by_id(known.id).await.unwrap(), known);
        assert_eq!(
            provider.get_user_by_id(UserId::new()).await,
            Err(IdentityError::UserNotFound)
        );
        provider.fail_lookup(known.id).unwrap();
        assert!(provider.get_user_by_id(known.id).await.is_err());
        assert_eq!(provider.lookup_count().unwrap(), 3);

        provider.fail_listing(true).unwrap();
        assert!(provider.list_all_users().await.is_err());
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(at("2025-03-01T08:00:00+02:00"));
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), at("2025-03-01T09:30:00+02:00"));
    }
}
