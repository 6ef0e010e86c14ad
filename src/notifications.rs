use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::format::format_session_date;
use crate::models::{NewNotification, Notification, NotificationKind, Session};
use crate::storage::{SlotStore, StorageError, NOTIFICATION_SLOT};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationState {
    notifications: Vec<Notification>,
    unread_count: usize,
}

/// Newest-first notification list with a running unread counter.
///
/// A store opened on a [`SlotStore`] writes its whole state back after every
/// mutation; an in-memory store never touches disk.
#[derive(Debug)]
pub struct NotificationStore {
    slots: Option<SlotStore>,
    state: NotificationState,
}

impl NotificationStore {
    pub fn in_memory() -> Self {
        Self {
            slots: None,
            state: NotificationState::default(),
        }
    }

    pub fn open(slots: SlotStore) -> Result<Self, StorageError> {
        let mut state: NotificationState = slots.load(NOTIFICATION_SLOT)?;
        let actual = state.notifications.iter().filter(|n| !n.read).count();
        if actual != state.unread_count {
            warn!(
                stored = state.unread_count,
                actual, "unread count out of sync, recounting"
            );
            state.unread_count = actual;
        }
        Ok(Self {
            slots: Some(slots),
            state,
        })
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.state.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.state.unread_count
    }

    pub fn get(&self, id: Uuid) -> Option<&Notification> {
        self.state.notifications.iter().find(|n| n.id == id)
    }

    pub fn add_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<&Notification, StorageError> {
        let created = Notification {
            id: Uuid::new_v4(),
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            read: false,
            created_at: Utc::now().timestamp_millis(),
            data: notification.data,
        };
        let id = created.id;
        let title = created.title.clone();
        let mut next = self.state.clone();
        next.notifications.insert(0, created);
        next.unread_count += 1;
        self.commit(next)?;
        info!(%id, %title, "notification added");
        Ok(&self.state.notifications[0])
    }

    pub fn add_session_booking_notification(
        &mut self,
        session: &Session,
    ) -> Result<&Notification, StorageError> {
        let when = format_session_date(&session.session_date);
        self.add_notification(NewNotification {
            title: "New Session Booked".to_string(),
            message: format!("{} has booked a session for {}", session.user_name, when),
            kind: NotificationKind::Success,
            data: Some(json!({ "sessionId": session.session_id })),
        })
    }

    /// Returns whether an unread notification was flipped to read.
    pub fn mark_as_read(&mut self, id: Uuid) -> Result<bool, StorageError> {
        let Some(index) = self
            .state
            .notifications
            .iter()
            .position(|n| n.id == id && !n.read)
        else {
            return Ok(false);
        };
        let mut next = self.state.clone();
        next.notifications[index].read = true;
        next.unread_count = next.unread_count.saturating_sub(1);
        self.commit(next)?;
        Ok(true)
    }

    pub fn mark_all_as_read(&mut self) -> Result<(), StorageError> {
        let mut next = self.state.clone();
        for notification in &mut next.notifications {
            notification.read = true;
        }
        next.unread_count = 0;
        self.commit(next)
    }

    /// Returns whether a notification with `id` existed.
    pub fn delete_notification(&mut self, id: Uuid) -> Result<bool, StorageError> {
        let Some(index) = self.state.notifications.iter().position(|n| n.id == id) else {
            return Ok(false);
        };
        let mut next = self.state.clone();
        let removed = next.notifications.remove(index);
        if !removed.read {
            next.unread_count = next.unread_count.saturating_sub(1);
        }
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear_all(&mut self) -> Result<(), StorageError> {
        self.commit(NotificationState::default())
    }

    /// Adds the demo notifications one at a time, `interval` apart.
    pub async fn initialize_test_notifications(
        &mut self,
        interval: Duration,
    ) -> Result<usize, StorageError> {
        let samples = sample_notifications();
        let total = samples.len();
        for (index, sample) in samples.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(interval).await;
            }
            self.add_notification(sample)?;
        }
        Ok(total)
    }

    /// Writes `next` to the slot, then swaps it in. A failed write leaves
    /// the store as it was.
    fn commit(&mut self, next: NotificationState) -> Result<(), StorageError> {
        if let Some(slots) = &self.slots {
            slots.save(NOTIFICATION_SLOT, &next)?;
        }
        self.state = next;
        Ok(())
    }
}

fn sample_notifications() -> Vec<NewNotification> {
    [
        (
            "New Session Request",
            "Sarah Johnson requested a counseling session for tomorrow at 2 PM",
            NotificationKind::Info,
        ),
        (
            "Payment Received",
            "Payment of $120 received from Michael Brown for last week's session",
            NotificationKind::Success,
        ),
        (
            "Upcoming Session Reminder",
            "You have a session with Emma Thompson in 1 hour",
            NotificationKind::Warning,
        ),
        (
            "Session Cancelled",
            "David Wilson cancelled their session scheduled for today at 4 PM",
            NotificationKind::Error,
        ),
        (
            "Profile Update Required",
            "Please update your availability schedule for next week",
            NotificationKind::Info,
        ),
    ]
    .into_iter()
    .map(|(title, message, kind)| NewNotification {
        title: title.to_string(),
        message: message.to_string(),
        kind,
        data: None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str) -> NewNotification {
        NewNotification {
            title: title.to_string(),
            message: format!("{title} message"),
            kind: NotificationKind::Info,
            data: None,
        }
    }

    #[test]
    fn add_prepends_unread_notification() {
        let mut store = NotificationStore::in_memory();
        store.add_notification(note("first")).unwrap();
        store.add_notification(note("second")).unwrap();

        let titles: Vec<&str> = store.notifications().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(store.unread_count(), 2);
        assert!(store.notifications().iter().all(|n| !n.read));
        assert_ne!(store.notifications()[0].id, store.notifications()[1].id);
    }

    #[test]
    fn mark_as_read_only_counts_once() {
        let mut store = NotificationStore::in_memory();
        let id = store.add_notification(note("once")).unwrap().id;

        assert!(store.mark_as_read(id).unwrap());
        assert_eq!(store.unread_count(), 0);
        assert!(!store.mark_as_read(id).unwrap());
        assert_eq!(store.unread_count(), 0);
        assert!(store.get(id).unwrap().read);
    }

    #[test]
    fn mark_as_read_unknown_id_is_noop() {
        let mut store = NotificationStore::in_memory();
        store.add_notification(note("kept")).unwrap();
        assert!(!store.mark_as_read(Uuid::new_v4()).unwrap());
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn mark_all_as_read_resets_count() {
        let mut store = NotificationStore::in_memory();
        store.add_notification(note("a")).unwrap();
        store.add_notification(note("b")).unwrap();
        store.mark_all_as_read().unwrap();
        assert_eq!(store.unread_count(), 0);
        assert!(store.notifications().iter().all(|n| n.read));
    }

    #[test]
    fn delete_adjusts_count_only_for_unread() {
        let mut store = NotificationStore::in_memory();
        let read_id = store.add_notification(note("read")).unwrap().id;
        let unread_id = store.add_notification(note("unread")).unwrap().id;
        store.mark_as_read(read_id).unwrap();
        assert_eq!(store.unread_count(), 1);

        assert!(store.delete_notification(read_id).unwrap());
        assert_eq!(store.unread_count(), 1);
        assert!(store.delete_notification(unread_id).unwrap());
        assert_eq!(store.unread_count(), 0);
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn delete_unknown_id_changes_nothing() {
        let mut store = NotificationStore::in_memory();
        store.add_notification(note("stays")).unwrap();
        let before = store.notifications().to_vec();

        assert!(!store.delete_notification(Uuid::new_v4()).unwrap());
        assert_eq!(store.notifications(), before.as_slice());
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn clear_all_empties_store() {
        let mut store = NotificationStore::in_memory();
        store.add_notification(note("a")).unwrap();
        store.clear_all().unwrap();
        assert!(store.notifications().is_empty());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn booking_notification_carries_session_id() {
        let mut store = NotificationStore::in_memory();
        let session = Session {
            session_id: "sess-42".to_string(),
            user_name: "Kofi Boateng".to_string(),
            session_date: "2025-01-06T14:00:00Z".to_string(),
            ..Session::default()
        };
        let created = store.add_session_booking_notification(&session).unwrap();
        assert_eq!(created.title, "New Session Booked");
        assert_eq!(created.kind, NotificationKind::Success);
        assert_eq!(
            created.message,
            "Kofi Boateng has booked a session for Monday, January 6, 2025 at 2:00 PM"
        );
        assert_eq!(created.data, Some(json!({ "sessionId": "sess-42" })));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotStore::new(dir.path());
        let kept_id = {
            let mut store = NotificationStore::open(slots.clone()).unwrap();
            let read_id = store.add_notification(note("read")).unwrap().id;
            let kept_id = store.add_notification(note("kept")).unwrap().id;
            store.mark_as_read(read_id).unwrap();
            kept_id
        };

        let reopened = NotificationStore::open(slots).unwrap();
        assert_eq!(reopened.notifications().len(), 2);
        assert_eq!(reopened.unread_count(), 1);
        assert_eq!(reopened.notifications()[0].id, kept_id);
    }

    #[test]
    fn reopen_recounts_inconsistent_unread() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotStore::new(dir.path());
        {
            let mut store = NotificationStore::open(slots.clone()).unwrap();
            store.add_notification(note("a")).unwrap();
        }
        let mut state: NotificationState = slots.load(NOTIFICATION_SLOT).unwrap();
        state.unread_count = 7;
        slots.save(NOTIFICATION_SLOT, &state).unwrap();

        let reopened = NotificationStore::open(slots).unwrap();
        assert_eq!(reopened.unread_count(), 1);
    }

    #[test]
    fn persisted_slot_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotStore::new(dir.path());
        let mut store = NotificationStore::open(slots.clone()).unwrap();
        store.add_notification(note("wire")).unwrap();

        let raw: serde_json::Value =
            crate::storage::read_json(&slots.slot_path(NOTIFICATION_SLOT)).unwrap();
        assert_eq!(raw["unreadCount"], 1);
        assert_eq!(raw["notifications"][0]["type"], "info");
        assert!(raw["notifications"][0]["createdAt"].is_i64());
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NotificationStore::open(SlotStore::new(dir.path())).unwrap();
        let id = store.add_notification(note("kept")).unwrap().id;
        let before = store.notifications().to_vec();

        // A regular file where the slot directory should be makes every save fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        store.slots = Some(SlotStore::new(blocker.join("slots")));

        assert!(store.add_notification(note("lost")).is_err());
        assert!(store.mark_as_read(id).is_err());
        assert!(store.delete_notification(id).is_err());
        assert!(store.clear_all().is_err());
        assert_eq!(store.notifications(), before.as_slice());
        assert_eq!(store.unread_count(), 1);
    }

    #[tokio::test]
    async fn seeding_adds_demo_notifications_newest_first() {
        let mut store = NotificationStore::in_memory();
        let added = store
            .initialize_test_notifications(Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(added, 5);
        assert_eq!(store.unread_count(), 5);
        assert_eq!(store.notifications()[0].title, "Profile Update Required");
        assert_eq!(store.notifications()[4].title, "New Session Request");
    }
}
