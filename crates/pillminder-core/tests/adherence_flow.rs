use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use pillminder_core::memory::{FixedClock, InMemoryNotifications, StaticIdentityProvider};
use pillminder_core::ports::{NotificationEvent, NotificationService};
use pillminder_core::{
    AdminService, CoreConfig, MedicationService, NotificationSession, ReminderKeys,
    SqliteDataStore,
};
use pillminder_shared::{DoseStatus, Identity, UserId};
use pillminder_store::Database;

fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

struct App {
    meds: MedicationService,
    admin: AdminService,
    queue: Arc<InMemoryNotifications>,
    clock: Arc<FixedClock>,
    user: UserId,
    _dir: tempfile::TempDir,
}

fn app() -> App {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteDataStore::new(
        Database::open_at(&dir.path().join("pillminder.db")).unwrap(),
    ));

    let user = UserId::new();
    let identity = Arc::new(StaticIdentityProvider::new(vec![Identity::new(user)
        .with_email("jane.doe@example.com")]));
    identity.sign_in(user).unwrap();

    let queue = Arc::new(InMemoryNotifications::new());
    let clock = Arc::new(FixedClock::new(at("2025-06-01T07:00:00+01:00")));
    let config = CoreConfig::default();

    App {
        meds: MedicationService::new(
            identity.clone(),
            store.clone(),
            queue.clone(),
            clock.clone(),
            &config,
        ),
        admin: AdminService::new(identity, store),
        queue,
        clock,
        user,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_three_medication_day() {
    let app = app();

    let a = app.meds.add_medication("Amlodipine", "08:00").await.unwrap();
    let b = app.meds.add_medication("Bisoprolol", "12:30").await.unwrap();
    let c = app.meds.add_medication("Cetirizine", "20:00").await.unwrap();
    assert_eq!(app.queue.list_scheduled().await.unwrap().len(), 6);

    let s = app.meds.adherence().await.unwrap();
    assert_eq!((s.total, s.taken, s.missed, s.adherence_rate), (3, 0, 3, 0));

    // A taken 25 minutes after its slot.
    app.clock.set(at("2025-06-01T08:25:00+01:00"));
    let (_, timing) = app.meds.log_taken(a.id, a.time).await.unwrap();
    assert_eq!(timing.status, DoseStatus::Late);

    let s = app.meds.adherence().await.unwrap();
    assert_eq!((s.total, s.taken, s.missed, s.adherence_rate), (3, 1, 2, 33));

    // B marked taken exactly at its slot.
    app.clock.set(at("2025-06-01T12:30:00+01:00"));
    let updated = app.meds.set_taken(b.id, true, Some(b.time)).await.unwrap();
    assert!(updated.taken);

    let logs = app.meds.dose_logs(b.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DoseStatus::OnTime);
    assert_eq!(logs[0].minutes_difference, 0);

    let s = app.meds.adherence().await.unwrap();
    assert_eq!((s.total, s.taken, s.missed, s.adherence_rate), (3, 2, 1, 67));
    assert_eq!((s.on_time, s.late, s.early), (1, 1, 0));

    // The admin view agrees.
    let consolidation = app.admin.patient_aggregates().await.unwrap();
    assert_eq!(consolidation.patients.len(), 1);
    let patient = &consolidation.patients[0];
    assert_eq!(patient.profile.id, app.user);
    assert_eq!(patient.profile.full_name, "Jane Doe");
    assert_eq!(patient.summary, s);

    // Rescheduling never stacks reminders.
    app.meds.reminders().schedule(&a).await.unwrap();
    app.meds.reminders().schedule(&a).await.unwrap();
    let keys = ReminderKeys::for_medication(a.id);
    let pending = app.queue.list_scheduled().await.unwrap();
    assert_eq!(pending.len(), 6);
    assert_eq!(
        pending
            .iter()
            .filter(|n| n.key == keys.primary || n.key == keys.backup)
            .count(),
        2
    );

    // Deleting B removes its reminders, its log, and its share of the summary.
    app.meds.delete_medication(b.id).await.unwrap();
    let b_keys = ReminderKeys::for_medication(b.id);
    let pending = app.queue.list_scheduled().await.unwrap();
    assert_eq!(pending.len(), 4);
    assert!(pending
        .iter()
        .all(|n| n.key != b_keys.primary && n.key != b_keys.backup));
    assert!(app.meds.dose_logs(b.id).await.unwrap().is_empty());

    let s = app.meds.adherence().await.unwrap();
    assert_eq!((s.total, s.taken, s.missed, s.adherence_rate), (2, 1, 1, 50));

    let remaining: Vec<_> = app
        .meds
        .today_schedule()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(remaining, vec![a.id, c.id]);
}

#[tokio::test]
async fn test_tapping_a_scheduled_reminder_reaches_the_app() {
    let app = app();
    let (session, mut taps) =
        NotificationSession::initialize(app.queue.clone(), &CoreConfig::default().channel_id)
            .await
            .unwrap();
    assert!(session.permissions_granted());

    let med = app.meds.add_medication("Vitamin D", "09:00").await.unwrap();
    let reminder = app
        .queue
        .list_scheduled()
        .await
        .unwrap()
        .into_iter()
        .find(|n| n.key == ReminderKeys::for_medication(med.id).primary)
        .unwrap();

    app.queue
        .emit(NotificationEvent::Tapped(reminder.content))
        .await
        .unwrap();

    let tap = taps.recv().await.unwrap();
    assert_eq!(tap.medication_id, med.id);
    assert_eq!(tap.medication_name, "Vitamin D");

    session.shutdown().await;
}
