use serde::Deserialize;

use crate::domain::{
    errors::{DatafeedError, DatafeedResult},
    market_data::{Bar, HistoryPayload, HistoryStatus},
};
use crate::time_utils::secs_to_millis;

/// UDF-style history answer: parallel arrays keyed by field letter
#[derive(Debug, Deserialize)]
pub struct UdfHistoryResponse {
    pub s: String,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<Option<f64>>,
    #[serde(default)]
    pub h: Vec<Option<f64>>,
    #[serde(default)]
    pub l: Vec<Option<f64>>,
    #[serde(default)]
    pub c: Vec<Option<f64>>,
    #[serde(default)]
    pub v: Vec<Option<f64>>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

impl UdfHistoryResponse {
    /// Converts to domain bars. Null prices become NaN and are dropped later by
    /// validation; missing volumes count as zero.
    pub fn into_payload(self) -> DatafeedResult<HistoryPayload> {
        match self.s.as_str() {
            "no_data" => return Ok(HistoryPayload::no_data()),
            "error" => {
                return Err(DatafeedError::Backend {
                    status: 200,
                    message: self.errmsg.unwrap_or_else(|| "unspecified history error".to_string()),
                });
            }
            "ok" => {}
            other => return Err(DatafeedError::MalformedResponse(format!("unknown status '{}'", other))),
        }

        let len = self.t.len();
        let columns = [("o", self.o.len()), ("h", self.h.len()), ("l", self.l.len()), ("c", self.c.len())];
        if let Some((name, found)) = columns.iter().find(|(_, n)| *n != len) {
            return Err(DatafeedError::MalformedResponse(format!(
                "column {} has {} values for {} timestamps",
                name, found, len
            )));
        }
        if !self.v.is_empty() && self.v.len() != len {
            return Err(DatafeedError::MalformedResponse(format!(
                "column v has {} values for {} timestamps",
                self.v.len(),
                len
            )));
        }

        let price = |column: &[Option<f64>], i: usize| column[i].unwrap_or(f64::NAN);
        let bars = (0..len)
            .map(|i| {
                Bar::new(
                    secs_to_millis(self.t[i]),
                    price(&self.o, i),
                    price(&self.h, i),
                    price(&self.l, i),
                    price(&self.c, i),
                    self.v.get(i).copied().flatten().unwrap_or(0.0),
                )
            })
            .collect();

        Ok(HistoryPayload { status: HistoryStatus::Ok, bars })
    }
}

/// Maps a non-success HTTP status to a datafeed error.
pub fn status_error(status: u16, status_text: &str) -> Option<DatafeedError> {
    match status {
        200..=299 => None,
        401 => Some(DatafeedError::SessionExpired),
        _ => Some(DatafeedError::Backend { status, message: status_text.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DatafeedResult<HistoryPayload> {
        serde_json::from_str::<UdfHistoryResponse>(json).unwrap().into_payload()
    }

    #[test]
    fn ok_payload_converts_seconds_to_millis() {
        let payload = parse(r#"{"s":"ok","t":[60,120],"o":[1,2],"h":[1,2],"l":[1,2],"c":[1,2],"v":[5,null]}"#).unwrap();
        assert_eq!(payload.status, HistoryStatus::Ok);
        assert_eq!(payload.bars[0].time, 60_000);
        assert_eq!(payload.bars[1].volume, 0.0);
    }

    #[test]
    fn null_price_becomes_invalid_bar() {
        let payload = parse(r#"{"s":"ok","t":[60],"o":[null],"h":[1],"l":[1],"c":[1]}"#).unwrap();
        assert!(!payload.bars[0].is_valid());
    }

    #[test]
    fn no_data_and_errors() {
        assert_eq!(parse(r#"{"s":"no_data"}"#).unwrap().status, HistoryStatus::NoData);
        assert!(matches!(parse(r#"{"s":"error","errmsg":"boom"}"#), Err(DatafeedError::Backend { .. })));
        assert!(matches!(
            parse(r#"{"s":"ok","t":[60,120],"o":[1],"h":[1,2],"l":[1,2],"c":[1,2]}"#),
            Err(DatafeedError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unauthorized_means_session_expired() {
        assert_eq!(status_error(401, "Unauthorized"), Some(DatafeedError::SessionExpired));
        assert_eq!(status_error(204, ""), None);
        assert!(matches!(status_error(503, "Unavailable"), Some(DatafeedError::Backend { status: 503, .. })));
    }
}
