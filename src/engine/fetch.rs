//! Paginated fetching of one (stream, context, window) unit
//!
//! ```text
//! START -> FETCHING -> MORE_PAGES -> FETCHING -> ... -> DONE
//! ```
//!
//! Records go to the caller in server order. The loop ends when the
//! paginator reports no continuation, or when the result ceiling is hit
//! while more data remains.

use crate::error::{Error, Result};
use crate::http::Transport;
use crate::pagination::{NextPage, PaginationState};
use crate::stream::{RequestParams, StreamDefinition};
use crate::types::QueryParams;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// What one unit fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub records: usize,
    pub pages: usize,
    /// Stopped at the ceiling with more data available
    pub truncated: bool,
}

/// Progress at the moment a fetch failed
#[derive(Debug)]
pub struct FetchError {
    pub error: Error,
    pub partial: FetchOutcome,
}

/// Drives one pagination sequence against the transport
pub struct PaginatedFetcher<'a> {
    transport: &'a dyn Transport,
    stream: &'a StreamDefinition,
    ceiling: usize,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(transport: &'a dyn Transport, stream: &'a StreamDefinition, ceiling: usize) -> Self {
        Self {
            transport,
            stream,
            ceiling,
        }
    }

    /// Fetch every page of a unit, handing each record to `on_record`
    ///
    /// Transport failures become `FetchFailed` for this unit. A malformed
    /// body or an error from `on_record` aborts the unit as is.
    pub async fn fetch<F>(
        &self,
        request: RequestParams,
        unit: &str,
        mut on_record: F,
    ) -> std::result::Result<FetchOutcome, FetchError>
    where
        F: FnMut(Value) -> Result<()> + Send,
    {
        let stream = &self.stream.name;
        let paginator = self.stream.pagination.build();
        let mut state = PaginationState::new();
        let mut outcome = FetchOutcome::default();

        let base_query = request.query;
        let mut path = request.path;
        let mut query = base_query.clone();
        query.extend(paginator.initial_params(&mut state));

        loop {
            debug!(stream = %stream, unit, path = %path, page = outcome.pages + 1, "Fetching page");

            let body = match self
                .transport
                .request(self.stream.method, &path, &query)
                .await
            {
                Ok(body) => body,
                Err(e) => {
                    return Err(FetchError {
                        error: Error::fetch_failed(stream, unit, e),
                        partial: outcome,
                    })
                }
            };

            let records = match self.stream.extract_records(&body) {
                Ok(records) => records,
                Err(error) => {
                    return Err(FetchError {
                        error,
                        partial: outcome,
                    })
                }
            };
            outcome.pages += 1;
            let count = records.len();

            for record in records {
                if outcome.records >= self.ceiling {
                    outcome.truncated = true;
                    break;
                }
                if let Err(error) = on_record(record) {
                    return Err(FetchError {
                        error,
                        partial: outcome,
                    });
                }
                outcome.records += 1;
            }

            if outcome.truncated {
                break;
            }

            match paginator.process_response(&body, count, &mut state) {
                NextPage::Done => break,
                NextPage::Continue {
                    query_params,
                    url: Some(next_url),
                } => {
                    query = missing_params(&next_url, &base_query);
                    query.extend(query_params);
                    path = next_url;
                }
                NextPage::Continue {
                    query_params,
                    url: None,
                } => {
                    query = base_query.clone();
                    query.extend(query_params);
                }
            }

            if outcome.records >= self.ceiling {
                outcome.truncated = true;
                break;
            }
        }

        if outcome.truncated {
            let limit = Error::ResultLimitExceeded {
                stream: stream.clone(),
                unit: unit.to_string(),
                limit: self.ceiling,
            };
            warn!(
                stream = %stream,
                unit,
                records = outcome.records,
                warning = %limit,
                "Result ceiling reached, unit truncated"
            );
        }

        Ok(outcome)
    }
}

/// Base parameters the next-page link does not already carry
///
/// Aircall links repeat most filters, but not always the window bounds.
fn missing_params(next_url: &str, base: &QueryParams) -> QueryParams {
    let present: HashSet<String> = match Url::parse(next_url)
        .or_else(|_| Url::parse("http://localhost/").and_then(|root| root.join(next_url)))
    {
        Ok(url) => url.query_pairs().map(|(k, _)| k.into_owned()).collect(),
        Err(_) => HashSet::new(),
    };

    base.iter()
        .filter(|(k, _)| !present.contains(k))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_params_keeps_link_values() {
        let base = params(&[("from", "1"), ("to", "2"), ("per_page", "50")]);
        assert_eq!(
            missing_params("https://api.aircall.io/v1/calls?page=2&per_page=50&from=1", &base),
            params(&[("to", "2")])
        );
    }

    #[test]
    fn test_missing_params_relative_link() {
        let base = params(&[("order", "asc")]);
        assert_eq!(missing_params("/v1/calls?page=2", &base), base);
        assert!(missing_params("v1/calls?order=desc", &base).is_empty());
    }
}
