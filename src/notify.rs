use anyhow::Result;
use tracing::{error, info};

use crate::models::NotificationRequest;
use crate::store::{self, Db};

pub const PRIMARY_ID: &str = "travelReminder";
pub const THIRTY_MINUTES_ID: &str = "travelReminder30min";
pub const ONE_HOUR_ID: &str = "travelReminder1h";

/// Identifiers of every alert this application schedules.
pub const REMINDER_IDS: [&str; 3] = [PRIMARY_ID, THIRTY_MINUTES_ID, ONE_HOUR_ID];

/// The host notification service. Delivery happens outside this process.
pub trait Notifier: Send + Sync {
    fn schedule(&self, request: &NotificationRequest) -> Result<()>;

    /// Fire-and-forget: failures are logged, never returned.
    fn remove_all_pending(&self);

    fn pending(&self) -> Result<Vec<NotificationRequest>>;
}

/// Keeps pending requests in the local database.
pub struct StoreNotifier {
    conn: Db,
}

impl StoreNotifier {
    pub fn new(conn: Db) -> Self {
        Self { conn }
    }
}

impl Notifier for StoreNotifier {
    fn schedule(&self, request: &NotificationRequest) -> Result<()> {
        store::insert_notification(&self.conn, request)?;
        info!(
            "Notification {} scheduled for {}",
            request.identifier,
            request.fire_at.to_rfc3339()
        );
        Ok(())
    }

    fn remove_all_pending(&self) {
        match store::delete_notifications(&self.conn, &REMINDER_IDS) {
            Ok(removed) if removed > 0 => info!("Removed {removed} pending notifications"),
            Ok(_) => {}
            Err(e) => error!("Failed to remove pending notifications: {e}"),
        }
    }

    fn pending(&self) -> Result<Vec<NotificationRequest>> {
        store::list_notifications(&self.conn)
    }
}
