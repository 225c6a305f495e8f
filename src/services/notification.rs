//! Seller notification inbox.

use tracing::debug;

use super::{ServiceError, resource_path};
use crate::client::ApiClient;
use crate::types::{Notification, PaginatedResponse};

pub const NOTIFICATIONS_ENDPOINT: &str = "/api/v1/notifications";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
pub struct NotificationService {
    client: ApiClient,
}

impl NotificationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of notifications. Page numbers start at 1; zero values fall
    /// back to the defaults.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get_page`].
    pub async fn list(&self, page: u32, limit: u32) -> Result<PaginatedResponse<Notification>, ServiceError> {
        let page = if page == 0 { DEFAULT_PAGE } else { page };
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        let path = format!("{NOTIFICATIONS_ENDPOINT}?page={page}&limit={limit}");
        let response = self.client.get_page(&path).await?;
        debug!(page, limit, count = response.data.len(), "notifications fetched");
        Ok(response)
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_discarding`].
    pub async fn mark_read(&self, id: &str) -> Result<(), ServiceError> {
        let path = resource_path(NOTIFICATIONS_ENDPOINT, &[id, "read"])?;
        self.client.send_discarding(reqwest::Method::PUT, &path).await?;
        Ok(())
    }
}

/// Unread entries in a fetched page.
#[must_use]
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
