use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the engine remembers about a device between observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHistory {
    pub last_uptime: Option<u64>,
    /// Last non-empty PPPoE username ever reported.
    pub last_pppoe_username: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl DeviceHistory {
    /// Fold a new observation in. An absent or empty username keeps the
    /// previously known one so credential loss stays detectable.
    pub fn observe(
        previous: Option<&Self>,
        uptime: Option<u64>,
        pppoe_username: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let username = pppoe_username
            .filter(|u| !u.trim().is_empty())
            .map(String::from)
            .or_else(|| previous.and_then(|p| p.last_pppoe_username.clone()));
        Self {
            last_uptime: uptime.or_else(|| previous.and_then(|p| p.last_uptime)),
            last_pppoe_username: username,
            last_seen: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_known_username() {
        let now = Utc::now();
        let first = DeviceHistory::observe(None, Some(86400), Some("user@isp"), now);
        let second = DeviceHistory::observe(Some(&first), Some(120), Some(""), now);
        assert_eq!(second.last_pppoe_username.as_deref(), Some("user@isp"));
        assert_eq!(second.last_uptime, Some(120));
    }
}
