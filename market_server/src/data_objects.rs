use chrono::{DateTime, Utc};
use market_engine::{helpers::parse_status_list, order_objects::OrderQueryFilter, OrderFlowError};
use serde::{Deserialize, Serialize};

/// Query parameters of the vendor order search, e.g. `/order?status=paid,confirmed&from=2024-05-01T00:00:00Z`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    /// Comma separated list of statuses
    pub status: Option<String>,
    /// RFC 3339 timestamp
    pub from: Option<String>,
    /// RFC 3339 timestamp
    pub to: Option<String>,
}

fn parse_timestamp(value: &str, name: &str) -> Result<DateTime<Utc>, OrderFlowError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrderFlowError::invalid_input(format!("Invalid '{name}' date '{value}'. {e}")))
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = OrderFlowError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let mut filter = OrderQueryFilter::default();
        if let Some(status) = params.status {
            filter = filter.with_statuses(parse_status_list(&status)?);
        }
        if let Some(from) = params.from.filter(|s| !s.trim().is_empty()) {
            filter = filter.since(parse_timestamp(&from, "from")?)?;
        }
        if let Some(to) = params.to.filter(|s| !s.trim().is_empty()) {
            filter = filter.until(parse_timestamp(&to, "to")?)?;
        }
        Ok(filter)
    }
}
