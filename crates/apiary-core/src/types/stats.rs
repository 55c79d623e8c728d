//! Aggregated statistics returned by the data endpoints

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A labelled count, the backend's chart primitive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub value: u64,
}

/// Response of `GET /data/stats/charts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartBundle {
    #[serde(default)]
    pub top_ips: Vec<NamedCount>,
    #[serde(default)]
    pub top_usernames: Vec<NamedCount>,
    #[serde(default)]
    pub top_passwords: Vec<NamedCount>,
}

/// Response of `GET /data/stats/summary`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_count: u64,
    pub most_login_ip: NamedCount,
    pub most_login_user: NamedCount,
    pub most_login_pwd: NamedCount,
}

/// One point of the `GET /data/stats/traffic` series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficPoint {
    pub timestamp: NaiveDateTime,
    pub count: u64,
}
