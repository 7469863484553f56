//! Notification session lifecycle.
//!
//! A [`NotificationSession`] configures the notification service once
//! (presentation policy, channel, permission), then runs a background task
//! that listens for notification events until [`NotificationSession::shutdown`]
//! is called or the session is dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pillminder_shared::constants::REMINDER_CHANNEL_NAME;
use pillminder_shared::MedicationId;

use crate::error::NotifyError;
use crate::ports::{
    ChannelImportance, NotificationChannel, NotificationData, NotificationEvent,
    NotificationService, PermissionStatus, PresentationOptions,
};

const TAP_BUFFER: usize = 32;

/// A daily reminder the user tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderTap {
    pub medication_id: MedicationId,
    pub medication_name: String,
}

/// Foreground presentation: alert and sound, no badge.
pub const PRESENTATION: PresentationOptions = PresentationOptions {
    show_alert: true,
    play_sound: true,
    set_badge: false,
};

/// The reminder channel registered at start-up.
pub fn reminder_channel(channel_id: &str) -> NotificationChannel {
    NotificationChannel {
        id: channel_id.to_string(),
        name: REMINDER_CHANNEL_NAME.to_string(),
        importance: ChannelImportance::Max,
        vibration_pattern: vec![0, 250, 250, 250],
        sound: true,
    }
}

/// Running notification listener.
pub struct NotificationSession {
    permissions_granted: bool,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NotificationSession {
    /// Configure `service` and start listening.
    ///
    /// Permission denial does not fail the session; it only clears
    /// [`permissions_granted`](Self::permissions_granted). Taps on daily
    /// reminders are forwarded on the returned receiver.
    pub async fn initialize(
        service: Arc<dyn NotificationService>,
        channel_id: &str,
    ) -> Result<(Self, mpsc::Receiver<ReminderTap>), NotifyError> {
        service.set_presentation(PRESENTATION).await?;
        service.register_channel(reminder_channel(channel_id)).await?;

        let permissions_granted = ensure_permission(service.as_ref()).await?;
        if permissions_granted {
            info!("Notification permissions granted");
        } else {
            warn!("Notification permissions not granted; reminders may not be shown");
        }

        let events = service.subscribe().await?;
        let (tap_tx, tap_rx) = mpsc::channel(TAP_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(listen(events, tap_tx, shutdown_rx));

        Ok((
            Self {
                permissions_granted,
                shutdown_tx: Some(shutdown_tx),
                task: Some(task),
            },
            tap_rx,
        ))
    }

    pub fn permissions_granted(&self) -> bool {
        self.permissions_granted
    }

    /// Stop the listener and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Notification listener ended abnormally");
            }
        }
        debug!("Notification session shut down");
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn ensure_permission(service: &dyn NotificationService) -> Result<bool, NotifyError> {
    let mut status = service.permission_status().await?;
    if status != PermissionStatus::Granted {
        status = service.request_permission().await?;
    }
    Ok(status == PermissionStatus::Granted)
}

async fn listen(
    mut events: mpsc::Receiver<NotificationEvent>,
    taps: mpsc::Sender<ReminderTap>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => {
                match event {
                    Some(NotificationEvent::Received(content)) => {
                        info!(title = %content.title, "Notification received");
                    }
                    Some(NotificationEvent::Tapped(content)) => {
                        debug!(data = ?content.data, "Notification tapped");
                        if let NotificationData::DailyReminder {
                            medication_id,
                            medication_name,
                            ..
                        } = content.data
                        {
                            info!(medication = %medication_name, "Reminder tapped");
                            let tap = ReminderTap {
                                medication_id,
                                medication_name,
                            };
                            if taps.send(tap).await.is_err() {
                                debug!("Tap receiver dropped");
                            }
                        }
                    }
                    None => {
                        debug!("Notification event stream closed");
                        break;
                    }
                }
            }
        }
    }
}
