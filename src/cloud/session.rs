//! Caller-owned session state.
//!
//! The session is a plain value: every cloud operation takes it by
//! mutable reference, so there is no hidden long-lived connector state
//! and tests can assert exactly what an operation touched.

/// Authentication and registration state for one client session.
///
/// Invariant: `is_authenticated` is true only after a successful login
/// (or user registration) produced a non-empty user id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
    sensor_id: Option<String>,
    authenticated: bool,
}

impl Session {
    /// Fresh, unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// User id from a successful login, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Sensor id from a successful registration, if any.
    pub fn sensor_id(&self) -> Option<&str> {
        self.sensor_id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Record a successful login. `user_id` must be non-empty; the cloud
    /// client validates that before calling.
    pub(crate) fn authenticate(&mut self, user_id: String) {
        debug_assert!(!user_id.is_empty());
        self.user_id = Some(user_id);
        self.authenticated = true;
    }

    pub(crate) fn attach_sensor(&mut self, sensor_id: String) {
        self.sensor_id = Some(sensor_id);
    }

    pub(crate) fn detach_sensor(&mut self) {
        self.sensor_id = None;
    }
}
