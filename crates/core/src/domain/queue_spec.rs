// Queue Spec Parser
//
// Grammar (per comma-separated token): `[<N>*]<name>`
// - `<N>*`  repeats the name N times (N independent workers on one queue)
// - `@name` scopes the name to the local host: `name_<hostname>`

use super::error::{DomainError, Result};

/// Concrete queue name a worker is bound to
pub type QueueName = String;

const SEPARATOR: char = ',';
const MULTIPLIER: char = '*';
const HOST_SCOPE_PREFIX: char = '@';

/// Parse a queue spec string into the ordered list of concrete queue names
///
/// Multipliers expand first, then host scoping is applied to every copy.
/// Parsing an already-expanded name list returns it unchanged.
///
/// # Errors
/// `DomainError::InvalidQueueSpec` when a token is empty, a multiplier is
/// not a positive integer, or a (possibly scoped) name is empty.
///
/// # Example
/// ```
/// use hive_core::domain::parse_queue_spec;
///
/// let queues = parse_queue_spec("3*foo,@bar,baz", "h").unwrap();
/// assert_eq!(queues, vec!["foo", "foo", "foo", "bar_h", "baz"]);
/// ```
pub fn parse_queue_spec(spec: &str, hostname: &str) -> Result<Vec<QueueName>> {
    let mut queues = Vec::new();

    for token in spec.split(SEPARATOR).map(str::trim) {
        if token.is_empty() {
            return Err(DomainError::InvalidQueueSpec(format!(
                "empty token in {:?}",
                spec
            )));
        }

        let (count, name) = parse_count(token)?;
        let name = scope_to_host(name, hostname)?;
        queues.extend(std::iter::repeat(name).take(count));
    }

    Ok(queues)
}

/// Split `N*name` into (N, name); plain tokens count once
fn parse_count(token: &str) -> Result<(usize, &str)> {
    let Some((count, name)) = token.split_once(MULTIPLIER) else {
        return Ok((1, token));
    };

    let count = count.trim();
    let count: usize = count.parse().map_err(|_| {
        DomainError::InvalidQueueSpec(format!("multiplier {:?} is not a number", count))
    })?;

    if count == 0 {
        return Err(DomainError::InvalidQueueSpec(format!(
            "multiplier must be positive in {:?}",
            token
        )));
    }

    Ok((count, name.trim()))
}

fn scope_to_host(name: &str, hostname: &str) -> Result<QueueName> {
    let resolved = match name.strip_prefix(HOST_SCOPE_PREFIX) {
        Some(base) if !base.is_empty() => format!("{}_{}", base, hostname),
        Some(_) => String::new(),
        None => name.to_string(),
    };

    if resolved.is_empty() {
        return Err(DomainError::InvalidQueueSpec(format!(
            "missing queue name in {:?}",
            name
        )));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_expands_before_host_scoping() {
        let queues = parse_queue_spec("3*foo,@bar,baz", "h").unwrap();
        assert_eq!(queues, vec!["foo", "foo", "foo", "bar_h", "baz"]);
    }

    #[test]
    fn test_multiplied_host_scoped_name() {
        let queues = parse_queue_spec("2*@local", "web1").unwrap();
        assert_eq!(queues, vec!["local_web1", "local_web1"]);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let queues = parse_queue_spec("  a , 2 * b ,c ", "h").unwrap();
        assert_eq!(queues, vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn test_reparse_of_expanded_names_is_identity() {
        let first = parse_queue_spec("2*foo,@bar", "h").unwrap();
        let second = parse_queue_spec(&first.join(","), "h").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_spec_is_rejected() {
        assert!(matches!(
            parse_queue_spec("", "h"),
            Err(DomainError::InvalidQueueSpec(_))
        ));
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(matches!(
            parse_queue_spec("a,,b", "h"),
            Err(DomainError::InvalidQueueSpec(_))
        ));
        assert!(matches!(
            parse_queue_spec("a, ", "h"),
            Err(DomainError::InvalidQueueSpec(_))
        ));
    }

    #[test]
    fn test_non_numeric_multiplier_is_rejected() {
        let err = parse_queue_spec("x*foo", "h").unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_zero_multiplier_is_rejected() {
        let err = parse_queue_spec("0*foo", "h").unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_missing_name_is_rejected() {
        assert!(parse_queue_spec("3*", "h").is_err());
        assert!(parse_queue_spec("@", "h").is_err());
    }
}
