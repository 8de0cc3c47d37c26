use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::models::{NotificationRequest, PackingItem, Reminder, ReminderInput, ReminderState};
use crate::notify::{Notifier, ONE_HOUR_ID, PRIMARY_ID, THIRTY_MINUTES_ID};
use crate::store::{self, Db, REMINDER_KEY};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// Saved as disabled; nothing is pending.
    Disabled,
    /// Saved as enabled with these alerts pending.
    Armed { triggers: Vec<NotificationRequest> },
    /// Enabling with a target that is not in the future; nothing changed.
    RejectedPastTarget,
}

/// Owns the single departure reminder and its pending alerts.
pub struct ReminderScheduler {
    conn: Db,
    notifier: Arc<dyn Notifier>,
    reminder: Mutex<Reminder>,
}

impl ReminderScheduler {
    pub fn load(conn: Db, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let reminder = match store::load::<Reminder>(&conn, REMINDER_KEY) {
            Some(reminder) => reminder,
            None => {
                let reminder = Reminder::default();
                store::save(&conn, REMINDER_KEY, &reminder)?;
                reminder
            }
        };
        Ok(Self {
            conn,
            notifier,
            reminder: Mutex::new(reminder),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Reminder> {
        self.reminder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Reminder {
        self.lock().clone()
    }

    pub fn state(&self) -> ReminderState {
        self.state_at(Utc::now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> ReminderState {
        let reminder = self.lock();
        if reminder.is_enabled && reminder.date > now {
            ReminderState::Armed
        } else {
            ReminderState::Disabled
        }
    }

    pub fn update_reminder(&self, input: ReminderInput) -> Result<ScheduleOutcome> {
        self.update_reminder_at(input, Utc::now())
    }

    /// Replaces the reminder and reschedules its alerts relative to `now`.
    pub fn update_reminder_at(
        &self,
        input: ReminderInput,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome> {
        let mut reminder = self.lock();
        let next = Reminder {
            id: reminder.id,
            is_enabled: input.is_enabled,
            date: input.date,
            check_iron: input.check_iron,
            check_water: input.check_water,
            check_packing_list: input.check_packing_list,
        };

        if next.is_enabled && next.date <= now {
            warn!("Reminder date must be in the future, got {}", next.date.to_rfc3339());
            return Ok(ScheduleOutcome::RejectedPastTarget);
        }

        self.notifier.remove_all_pending();
        store::save(&self.conn, REMINDER_KEY, &next)?;
        *reminder = next;

        if !reminder.is_enabled {
            return Ok(ScheduleOutcome::Disabled);
        }

        let triggers = triggers_for(&reminder, now);
        for trigger in &triggers {
            self.notifier.schedule(trigger)?;
        }
        info!(
            "Reminder armed for {} with {} notifications",
            reminder.date.to_rfc3339(),
            triggers.len()
        );
        Ok(ScheduleOutcome::Armed { triggers })
    }

    /// Clears pending alerts and saves the reminder as disabled.
    pub fn cancel_reminder(&self) -> Result<Reminder> {
        self.notifier.remove_all_pending();
        let mut reminder = self.lock();
        reminder.is_enabled = false;
        store::save(&self.conn, REMINDER_KEY, &*reminder)?;
        info!("Reminder cancelled");
        Ok(reminder.clone())
    }

    pub fn pending(&self) -> Result<Vec<NotificationRequest>> {
        self.notifier.pending()
    }
}

/// Alerts for `reminder` as of `now`: on time, then 30 and 60 minutes early when there is room.
pub fn triggers_for(reminder: &Reminder, now: DateTime<Utc>) -> Vec<NotificationRequest> {
    if reminder.date <= now {
        return Vec::new();
    }
    let lead = reminder.date - now;
    let checklist = checklist_text(reminder);

    let mut triggers = vec![NotificationRequest {
        identifier: PRIMARY_ID.to_string(),
        title: "⏰ Time to leave home!".to_string(),
        body: format!("Time to hit the road!{checklist}"),
        fire_at: reminder.date,
    }];

    if lead > Duration::minutes(30) {
        triggers.push(NotificationRequest {
            identifier: THIRTY_MINUTES_ID.to_string(),
            title: "⏰ Reminder: 30 minutes to go".to_string(),
            body: format!("In 30 minutes it's time to leave home!{checklist}"),
            fire_at: reminder.date - Duration::minutes(30),
        });
    }

    if lead > Duration::minutes(60) {
        triggers.push(NotificationRequest {
            identifier: ONE_HOUR_ID.to_string(),
            title: "⏰ Reminder: 1 hour to go".to_string(),
            body: "In 1 hour it's time to leave home! Don't forget to check everything you need."
                .to_string(),
            fire_at: reminder.date - Duration::minutes(60),
        });
    }

    triggers
}

fn checklist_text(reminder: &Reminder) -> String {
    let lines: Vec<&str> = [
        (reminder.check_iron, "• Turn off the iron"),
        (reminder.check_water, "• Shut off the water"),
        (reminder.check_packing_list, "• Check the packing list"),
    ]
    .into_iter()
    .filter_map(|(enabled, line)| enabled.then_some(line))
    .collect();

    if lines.is_empty() {
        String::new()
    } else {
        format!("\n\nDon't forget:\n{}", lines.join("\n"))
    }
}

pub fn unpacked_items_count(items: &[PackingItem]) -> usize {
    items.iter().filter(|i| !i.is_packed).count()
}
