use hush_protocol::HookId;

/// A state change worth pushing to subscribed sessions (§4.5 "Hooks").
///
/// `subject` is the username the event is about; delivery is always to that
/// same user's own session (a subscription is "notify me about me" — the only
/// shape the spec's scenarios exercise, e.g. the duplicate-session hook
/// waking the incumbent session when someone else attempts to log in as
/// them).
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub hook_id: HookId,
    pub subject: String,
    pub detail: String,
}

impl HookEvent {
    pub fn new(hook_id: HookId, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            hook_id,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}
