use std::sync::Mutex;

pub const LOGIN_ROUTE: &str = "/auth";

/// Where the user currently is, and how to send them somewhere else.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> String;
    fn navigate(&self, route: &str);
}

/// In-memory route holder used by the CLI and tests.
pub struct RouteState {
    location: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl RouteState {
    pub fn new(initial: &str) -> Self {
        Self {
            location: Mutex::new(initial.to_string()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every route navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for RouteState {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RouteState {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn navigate(&self, route: &str) {
        tracing::debug!(route, "navigate");
        *self.location.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = route.to_string();
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_records_history() {
        let routes = RouteState::default();
        assert_eq!(routes.current_location(), "/");
        routes.navigate("/search");
        routes.navigate(LOGIN_ROUTE);
        assert_eq!(routes.current_location(), "/auth");
        assert_eq!(routes.history(), vec!["/search", "/auth"]);
    }
}
