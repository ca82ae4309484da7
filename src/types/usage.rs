use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One day of usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsagePoint {
    pub date: String,
    pub queries: f64,
    pub scan_mb: f64,
}

#[derive(Debug, Deserialize)]
struct UsagePointWire {
    #[serde(default)]
    date: String,
    #[serde(default, deserialize_with = "lenient_number")]
    queries: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    query_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    scan_mb: Option<f64>,
    #[serde(default, rename = "scanMb", deserialize_with = "lenient_number")]
    scan_mb_camel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    data_scanned_mb: Option<f64>,
}

impl From<UsagePointWire> for UsagePoint {
    fn from(wire: UsagePointWire) -> Self {
        Self {
            date: wire.date,
            queries: wire.queries.or(wire.query_count).unwrap_or(0.0),
            scan_mb: wire
                .scan_mb
                .or(wire.scan_mb_camel)
                .or(wire.data_scanned_mb)
                .unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "UsageTotalsWire")]
pub struct UsageTotals {
    pub queries: Option<f64>,
    pub scan_mb: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UsageTotalsWire {
    #[serde(default, deserialize_with = "lenient_number")]
    queries: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    scan_mb: Option<f64>,
    #[serde(default, rename = "scanMb", deserialize_with = "lenient_number")]
    scan_mb_camel: Option<f64>,
}

impl From<UsageTotalsWire> for UsageTotals {
    fn from(wire: UsageTotalsWire) -> Self {
        Self {
            queries: wire.queries,
            scan_mb: wire.scan_mb.or(wire.scan_mb_camel),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePeriod {
    pub start: String,
    pub end: String,
}

/// Usage history for a workspace, with points sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "UsageHistoryWire")]
pub struct UsageHistory {
    pub points: Vec<UsagePoint>,
    pub totals: Option<UsageTotals>,
    pub period: Option<UsagePeriod>,
}

#[derive(Debug, Deserialize)]
struct UsageHistoryWire {
    #[serde(default)]
    history: Vec<UsagePointWire>,
    #[serde(default)]
    totals: Option<UsageTotals>,
    #[serde(default)]
    period: Option<UsagePeriod>,
}

impl From<UsageHistoryWire> for UsageHistory {
    fn from(wire: UsageHistoryWire) -> Self {
        let mut points: Vec<UsagePoint> = wire.history.into_iter().map(UsagePoint::from).collect();
        points.sort_by(|a, b| a.date.cmp(&b.date));
        Self {
            points,
            totals: wire.totals,
            period: wire.period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_queries: f64,
    pub total_scan_mb: f64,
    pub average_queries: f64,
    pub average_scan_mb: f64,
    pub latest: Option<UsagePoint>,
}

impl UsageHistory {
    #[must_use]
    pub fn summary(&self) -> UsageSummary {
        let total_queries: f64 = self.points.iter().map(|p| p.queries).sum();
        let total_scan_mb: f64 = self.points.iter().map(|p| p.scan_mb).sum();
        let days = self.points.len() as f64;
        let average = |total: f64| if days > 0.0 { total / days } else { 0.0 };
        UsageSummary {
            total_queries,
            total_scan_mb,
            average_queries: average(total_queries),
            average_scan_mb: average(total_scan_mb),
            latest: self.points.last().cloned(),
        }
    }
}

/// Numbers, or strings holding numbers; anything else reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryEntry {
    pub query_id: String,
    #[serde(default)]
    pub client_id: String,
    pub statement: String,
    pub status: String,
    pub submitted_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub elapsed_ms: Option<f64>,
    #[serde(default)]
    pub data_scanned_mb: Option<f64>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub as_of_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistorySummary {
    #[serde(default)]
    pub total_queries: u64,
    #[serde(default)]
    pub failed_queries: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default)]
    pub range: Option<HistoryRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryHistory {
    #[serde(default)]
    pub entries: Vec<QueryHistoryEntry>,
    #[serde(default)]
    pub summary: QueryHistorySummary,
}
