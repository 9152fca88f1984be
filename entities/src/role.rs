use serde::{Deserialize, Serialize};

/// Capability verbs checked by the policy engine.
pub mod verbs {
    pub const ASSIGNMENT_LIST: &str = "assignment.list";
    pub const ASSIGNMENT_CREATE: &str = "assignment.create";
    pub const ASSIGNMENT_DELETE: &str = "assignment.delete";

    pub const PROJECT_READ: &str = "project.read";
    pub const PROJECT_UPDATE: &str = "project.update";
    pub const PROJECT_DELETE: &str = "project.delete";

    pub const FORM_LIST: &str = "form.list";
    pub const FORM_READ: &str = "form.read";
    pub const FORM_CREATE: &str = "form.create";
    pub const FORM_UPDATE: &str = "form.update";
    pub const FORM_DELETE: &str = "form.delete";

    pub const SUBMISSION_LIST: &str = "submission.list";
    pub const SUBMISSION_READ: &str = "submission.read";
    pub const SUBMISSION_CREATE: &str = "submission.create";
    pub const SUBMISSION_UPDATE: &str = "submission.update";

    pub const USER_READ: &str = "user.read";
    pub const AUDIT_READ: &str = "audit.read";

    /// Every verb known to the system, in a stable order.
    pub const ALL: &[&str] = &[
        ASSIGNMENT_LIST,
        ASSIGNMENT_CREATE,
        ASSIGNMENT_DELETE,
        PROJECT_READ,
        PROJECT_UPDATE,
        PROJECT_DELETE,
        FORM_LIST,
        FORM_READ,
        FORM_CREATE,
        FORM_UPDATE,
        FORM_DELETE,
        SUBMISSION_LIST,
        SUBMISSION_READ,
        SUBMISSION_CREATE,
        SUBMISSION_UPDATE,
        USER_READ,
        AUDIT_READ,
    ];
}

/// A named, fixed bundle of capability verbs.
///
/// Roles are seeded once and never created or edited through this system.
/// `id` is the primary reference; `system` is the stable lowercase name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub system: String,
    pub verbs: Vec<String>,
}

impl Role {
    pub fn grants(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}
