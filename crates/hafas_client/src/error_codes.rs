//! Built-in vendor error code tables
//!
//! One table for the legacy envelope protocol (`err` codes) and one for the
//! REST protocol (`errorCode` values). Profiles may replace either lookup.

use crate::error::{ErrorInfo, ErrorKind};

const fn info(kind: ErrorKind, message: &'static str) -> ErrorInfo {
    ErrorInfo { kind, message }
}

const INVALID_AUTH: ErrorInfo = info(
    ErrorKind::AccessDenied,
    "HAFAS error: invalid or missing authentication data",
);

static LEGACY_ERRORS: &[(&str, ErrorInfo)] = &[
    ("H_UNKNOWN", info(ErrorKind::ServerError, "HAFAS error: unknown internal error")),
    ("AUTH", INVALID_AUTH),
    ("R5000", INVALID_AUTH),
    ("R0007", info(ErrorKind::ServerError, "HAFAS error: internal communication error")),
    ("METHOD_NA", info(ErrorKind::InvalidRequest, "HAFAS error: method is not enabled")),
    ("NO_MATCH", info(ErrorKind::NotFound, "HAFAS error: no matching location found")),
    ("LOCATION", info(ErrorKind::InvalidRequest, "HAFAS error: location/stop not found")),
    ("PROBLEMS", info(ErrorKind::ServerError, "HAFAS error: an unknown problem occurred during search")),
    ("CGI_READ_FAILED", info(ErrorKind::ServerError, "HAFAS error: reading the request failed")),
    ("CGI_NO_SERVER", info(ErrorKind::ServerError, "HAFAS error: no backend server available")),
    ("H390", info(ErrorKind::InvalidRequest, "HAFAS error: departure/arrival is out of range")),
    ("H410", info(ErrorKind::ServerError, "HAFAS error: incomplete response due to timetable change")),
    ("H455", info(ErrorKind::InvalidRequest, "HAFAS error: prolonged stop")),
    ("H460", info(ErrorKind::InvalidRequest, "HAFAS error: stop(s) passed multiple times")),
    ("H500", info(ErrorKind::InvalidRequest, "HAFAS error: too many trains, connection is not complete")),
    ("H890", info(ErrorKind::NotFound, "HAFAS error: no connections found")),
    ("H891", info(ErrorKind::NotFound, "HAFAS error: no route found, try with an intermediate station")),
    ("H892", info(ErrorKind::InvalidRequest, "HAFAS error: query too complex, try fewer intermediate stations")),
    ("H895", info(ErrorKind::InvalidRequest, "HAFAS error: departure/arrival are too near")),
    ("H899", info(ErrorKind::ServerError, "HAFAS error: unsuccessful or incomplete search (timetable change)")),
    ("H900", info(ErrorKind::ServerError, "HAFAS error: unsuccessful or incomplete search (timetable change)")),
    ("H9220", info(ErrorKind::NotFound, "HAFAS error: no stations found close to the address")),
    ("H9230", info(ErrorKind::ServerError, "HAFAS error: an internal error occurred")),
    ("H9240", info(ErrorKind::NotFound, "HAFAS error: no route found")),
    ("H9250", info(ErrorKind::ServerError, "HAFAS error: leg query interrupted")),
    ("H9260", info(ErrorKind::InvalidRequest, "HAFAS error: unknown departure station")),
    ("H9280", info(ErrorKind::InvalidRequest, "HAFAS error: unknown intermediate station")),
    ("H9300", info(ErrorKind::InvalidRequest, "HAFAS error: unknown arrival station")),
    ("H9320", info(ErrorKind::InvalidRequest, "HAFAS error: the input is incorrect or incomplete")),
    ("H9360", info(ErrorKind::InvalidRequest, "HAFAS error: invalid date/time")),
    ("H9380", info(ErrorKind::InvalidRequest, "HAFAS error: departure/arrival/intermediate station defined more than once")),
    ("SQ001", info(ErrorKind::NotFound, "HAFAS error: no departures/arrivals data available")),
    ("SQ005", info(ErrorKind::NotFound, "HAFAS error: no trips found")),
    ("TI001", info(ErrorKind::NotFound, "HAFAS error: no trip info available")),
];

static REST_ERRORS: &[(&str, ErrorInfo)] = &[
    ("API_AUTH", INVALID_AUTH),
    ("API_QUOTA", info(ErrorKind::AccessDenied, "HAFAS error: quota exceeded for access token")),
    ("API_FORMAT", info(ErrorKind::InvalidRequest, "HAFAS error: requested response format not supported")),
    ("API_PARAM", info(ErrorKind::InvalidRequest, "HAFAS error: invalid request parameters")),
    ("SVC_PARAM", info(ErrorKind::InvalidRequest, "HAFAS error: invalid request parameters")),
    ("SVC_LOC", info(ErrorKind::InvalidRequest, "HAFAS error: location missing or invalid")),
    ("SVC_LOC_ARR", info(ErrorKind::InvalidRequest, "HAFAS error: arrival location missing or invalid")),
    ("SVC_LOC_DEP", info(ErrorKind::InvalidRequest, "HAFAS error: departure location missing or invalid")),
    ("SVC_LOC_VIA", info(ErrorKind::InvalidRequest, "HAFAS error: via location missing or invalid")),
    ("SVC_LOC_EQUAL", info(ErrorKind::InvalidRequest, "HAFAS error: origin and destination are equal")),
    ("SVC_LOC_NEAR", info(ErrorKind::InvalidRequest, "HAFAS error: origin and destination are too close")),
    ("SVC_DATATIME", info(ErrorKind::InvalidRequest, "HAFAS error: date/time missing or invalid")),
    ("SVC_DATATIME_PERIOD", info(ErrorKind::InvalidRequest, "HAFAS error: date/time outside of the timetable period")),
    ("SVC_PROD", info(ErrorKind::InvalidRequest, "HAFAS error: product field invalid")),
    ("SVC_CTX", info(ErrorKind::InvalidRequest, "HAFAS error: context invalid")),
    ("SVC_NO_RESULT", info(ErrorKind::NotFound, "HAFAS error: no result found")),
    ("SVC_NO_MATCH", info(ErrorKind::NotFound, "HAFAS error: no match found")),
    ("SVC_FAILED_SEARCH", info(ErrorKind::ServerError, "HAFAS error: search failed")),
    ("INT_ERR", info(ErrorKind::ServerError, "HAFAS error: internal error")),
    ("INT_GATEWAY", info(ErrorKind::ServerError, "HAFAS error: gateway error")),
    ("INT_TIMEOUT", info(ErrorKind::ServerError, "HAFAS error: backend timed out")),
];

fn lookup(table: &'static [(&str, ErrorInfo)], code: &str) -> Option<&'static ErrorInfo> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, info)| info)
}

/// Look up a legacy envelope protocol error code
#[must_use]
pub fn legacy_error(code: &str) -> Option<&'static ErrorInfo> {
    lookup(LEGACY_ERRORS, code)
}

/// Look up a REST protocol error code
#[must_use]
pub fn rest_error(code: &str) -> Option<&'static ErrorInfo> {
    lookup(REST_ERRORS, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_lookup() {
        let info = legacy_error("H890").unwrap();
        assert_eq!(info.kind, ErrorKind::NotFound);
        assert_eq!(legacy_error("AUTH").unwrap().kind, ErrorKind::AccessDenied);
        assert!(legacy_error("nope").is_none());
    }

    #[test]
    fn test_rest_lookup() {
        assert_eq!(rest_error("API_AUTH").unwrap().kind, ErrorKind::AccessDenied);
        assert_eq!(rest_error("SVC_NO_RESULT").unwrap().kind, ErrorKind::NotFound);
        assert!(rest_error("H890").is_none());
    }

    #[test]
    fn test_tables_have_unique_codes() {
        for table in [LEGACY_ERRORS, REST_ERRORS] {
            let mut codes: Vec<_> = table.iter().map(|(code, _)| *code).collect();
            codes.sort_unstable();
            let before = codes.len();
            codes.dedup();
            assert_eq!(before, codes.len());
        }
    }
}
