//! Execution Context
//!
//! Immutable snapshot of the instance and session an action runs under.
//! It is passed explicitly to every dispatch and moved whole into
//! asynchronous work, so no action ever reads state left behind by another.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::metadata::Instance;
use super::value::Value;

/// Caller session
#[derive(Debug, Clone)]
pub struct Session {
    /// Session ID for tracing
    pub id: Uuid,

    /// Authenticated user, if any
    pub user_id: Option<String>,

    /// Security key values (e.g. client id) made available to backends
    pub values: HashMap<String, Value>,

    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for a known user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::anonymous()
        }
    }

    /// Create an anonymous session
    pub fn anonymous() -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            values: HashMap::new(),
            started_at: Utc::now(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Context carried into every action
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    instance: Arc<Instance>,
    session: Arc<Session>,
}

impl ExecutionContext {
    pub fn new(instance: Arc<Instance>, session: Session) -> Self {
        Self {
            instance,
            session: Arc::new(session),
        }
    }

    /// Context with an anonymous session
    pub fn anonymous(instance: Arc<Instance>) -> Self {
        Self::new(instance, Session::anonymous())
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Same instance, different session
    pub fn with_session(&self, session: Session) -> Self {
        Self::new(Arc::clone(&self.instance), session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_for_user() {
        let session = Session::for_user("darin").with_value("clientId", 42);
        assert_eq!(session.user_id.as_deref(), Some("darin"));
        assert_eq!(session.value("clientId"), Some(&Value::Integer(42)));
    }

    #[test]
    fn test_clone_is_snapshot() {
        let ctx = ExecutionContext::anonymous(Arc::new(Instance::new()));
        let other = ctx.with_session(Session::for_user("tim"));
        assert!(ctx.session().user_id.is_none());
        assert_eq!(other.session().user_id.as_deref(), Some("tim"));
        assert_ne!(ctx.session().id, other.session().id);
    }
}
