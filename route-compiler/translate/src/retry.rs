use route_compiler_core::{route::RetryPolicy, rule::RetrySpec};

const DEFAULT_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_ON: &str =
    "connect-failure,refused-stream,unavailable,cancelled,retriable-status-codes";
const RETRIABLE_STATUS_CODES: &str = "retriable-status-codes";
const PREVIOUS_HOSTS_PREDICATE: &str = "envoy.retry_host_predicates.previous_hosts";
const HOST_SELECTION_ATTEMPTS: u32 = 5;

/// The retry policy applied when a rule does not configure one.
pub fn default_retry_policy() -> RetryPolicy {
    RetryPolicy {
        retry_on: DEFAULT_RETRY_ON.to_string(),
        num_retries: DEFAULT_ATTEMPTS,
        per_try_timeout: None,
        retriable_status_codes: vec![503],
        retry_host_predicates: vec![PREVIOUS_HOSTS_PREDICATE.to_string()],
        host_selection_retry_max_attempts: HOST_SELECTION_ATTEMPTS,
    }
}

/// Translates a rule's retry settings.
///
/// Without settings the default policy applies; a non-positive attempt count
/// disables retries. Numeric `retry_on` entries are retriable status codes.
pub fn convert_retry_policy(spec: Option<&RetrySpec>) -> Option<RetryPolicy> {
    let Some(RetrySpec {
        attempts,
        per_try_timeout,
        retry_on,
    }) = spec
    else {
        return Some(default_retry_policy());
    };

    let num_retries = u32::try_from(*attempts).ok().filter(|n| *n > 0)?;
    let mut policy = default_retry_policy();
    policy.num_retries = num_retries;
    policy.per_try_timeout = (*per_try_timeout).filter(|t| !t.is_zero());

    if !retry_on.trim().is_empty() {
        let (mut conditions, codes) = parse_retry_on(retry_on);
        if !codes.is_empty() && !conditions.iter().any(|c| c == RETRIABLE_STATUS_CODES) {
            conditions.push(RETRIABLE_STATUS_CODES.to_string());
        }
        policy.retry_on = conditions.join(",");
        policy.retriable_status_codes = codes;
    }

    Some(policy)
}

fn parse_retry_on(retry_on: &str) -> (Vec<String>, Vec<u32>) {
    let mut conditions = Vec::new();
    let mut codes = Vec::new();
    for part in retry_on.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<u32>() {
            Ok(code) => codes.push(code),
            Err(_) => conditions.push(part.to_string()),
        }
    }
    (conditions, codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_compiler_core::Duration;

    fn spec(attempts: i32, retry_on: &str) -> RetrySpec {
        RetrySpec {
            attempts,
            per_try_timeout: None,
            retry_on: retry_on.to_string(),
        }
    }

    #[test]
    fn absent_spec_uses_default() {
        assert_eq!(convert_retry_policy(None), Some(default_retry_policy()));
    }

    #[test]
    fn non_positive_attempts_disable_retries() {
        assert_eq!(convert_retry_policy(Some(&spec(0, ""))), None);
        assert_eq!(convert_retry_policy(Some(&spec(-1, "5xx"))), None);
    }

    #[test]
    fn parses_conditions_and_codes() {
        let mut retries = spec(3, "gateway-error, 503,connect-failure,429");
        retries.per_try_timeout = Some(Duration::from_millis(250));
        let policy = convert_retry_policy(Some(&retries)).expect("policy");
        assert_eq!(policy.num_retries, 3);
        assert_eq!(
            policy.retry_on,
            "gateway-error,connect-failure,retriable-status-codes"
        );
        assert_eq!(policy.retriable_status_codes, [503, 429]);
        assert_eq!(policy.per_try_timeout, Some(Duration::from_millis(250)));
        assert_eq!(policy.host_selection_retry_max_attempts, 5);
    }

    #[test]
    fn empty_retry_on_keeps_defaults() {
        let policy = convert_retry_policy(Some(&spec(5, ""))).expect("policy");
        assert_eq!(policy.num_retries, 5);
        assert_eq!(policy.retry_on, DEFAULT_RETRY_ON);
        assert_eq!(policy.retriable_status_codes, [503]);
    }
}
