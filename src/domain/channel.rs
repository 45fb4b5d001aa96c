//! Channel naming shared by the saga engine (subscriber) and the inbound-callback path (publisher).
//!
//! Both sides may live in different processes, so the output must be byte-identical for identical
//! inputs. The layout is `<namespace>:<phase>_<id>_<id>...`. Segments are percent-escaped for the
//! separator characters, so distinct identities never collapse onto the same channel. Changing this
//! layout is a breaking change and requires bumping [`CHANNEL_NAMESPACE`].

/// Version prefix of every channel name.
pub const CHANNEL_NAMESPACE: &str = "v1";

const NAMESPACE_SEPARATOR: char = ':';
const SEGMENT_SEPARATOR: char = '_';

/// Builds the channel name for a saga phase and its correlation ids.
pub fn channel(phase: &str, ids: &[&str]) -> String {
    let capacity = CHANNEL_NAMESPACE.len()
        + phase.len()
        + ids.iter().map(|id| id.len() + 1).sum::<usize>()
        + 1;
    let mut name = String::with_capacity(capacity);
    name.push_str(CHANNEL_NAMESPACE);
    name.push(NAMESPACE_SEPARATOR);
    push_escaped(&mut name, phase);
    for id in ids {
        name.push(SEGMENT_SEPARATOR);
        push_escaped(&mut name, id);
    }
    name
}

/// Builds the saga key for a set of correlation ids.
///
/// Uses the same escaping as [`channel`], so two id tuples share a key exactly when they would
/// share a channel within one phase.
pub fn correlation_key(ids: &[&str]) -> String {
    let mut key = String::with_capacity(ids.iter().map(|id| id.len() + 1).sum());
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            key.push(SEGMENT_SEPARATOR);
        }
        push_escaped(&mut key, id);
    }
    key
}

fn push_escaped(out: &mut String, segment: &str) {
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '_' => out.push_str("%5F"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_layout() {
        assert_eq!(
            channel("lookup", &["MSISDN", "123", ""]),
            "v1:lookup_MSISDN_123_"
        );
        assert_eq!(channel("OTPValidation", &["r51ec534"]), "v1:OTPValidation_r51ec534");
        assert_eq!(channel("ping", &[]), "v1:ping");
    }

    #[test]
    fn test_correlation_key() {
        assert_eq!(correlation_key(&["r51ec534"]), "r51ec534");
        assert_eq!(correlation_key(&["MSISDN", "123", ""]), "MSISDN_123_");
        assert_ne!(correlation_key(&["a_b", "c"]), correlation_key(&["a", "b_c"]));
    }

    #[test]
    fn test_channel_is_stable() {
        let a = channel("lookup", &["MSISDN", "123", ""]);
        let b = channel("lookup", &["MSISDN", "123", ""]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_separator_in_ids_does_not_collide() {
        let joined = channel("lookup", &["a_b", "c"]);
        let split = channel("lookup", &["a", "b_c"]);
        assert_ne!(joined, split);
        assert_eq!(joined, "v1:lookup_a%5Fb_c");
    }

    #[test]
    fn test_empty_trailing_id_is_distinct() {
        assert_ne!(
            channel("lookup", &["MSISDN", "123"]),
            channel("lookup", &["MSISDN", "123", ""])
        );
    }
}
