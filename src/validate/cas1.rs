use super::ValidationOutcome;
use crate::types::Attributes;

/// Parse a CAS 1.0 `/validate` body.
///
/// `yes\n<user>\n` is a success, `no\n\n` a rejection, anything else malformed.
/// `yes` with an empty user line counts as malformed.
#[must_use]
pub fn parse(body: &str) -> ValidationOutcome {
    let mut lines = body.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

    match (lines.next(), lines.next()) {
        (Some("yes"), Some(user)) if !user.is_empty() => {
            ValidationOutcome::success(user, Attributes::new())
        }
        (Some("no"), _) => ValidationOutcome::rejected(None),
        _ => {
            tracing::debug!(body = %body, "Unrecognized CAS 1.0 response");
            ValidationOutcome::malformed()
        }
    }
}
