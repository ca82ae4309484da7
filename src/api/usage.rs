use super::ApiClient;
use crate::error::Result;
use crate::types::UsageHistory;

/// Daily usage for the last `days` days; `0` leaves the window to the server.
pub async fn fetch_usage_history(api: &ApiClient, client_id: &str, days: u32) -> Result<UsageHistory> {
    let mut path = format!("/api/clients/{}/usage/history", urlencoding::encode(client_id));
    if days > 0 {
        path.push_str(&format!("?days={days}"));
    }
    api.get_json(&path).await
}
