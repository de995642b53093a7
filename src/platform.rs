//! Platform capability probing
//!
//! Posting user-visible alerts and arming exact wakes are both gated by
//! platform capabilities. Both are probed once at startup; components
//! receive the result by value and apply their own degradation policy
//! when a capability is missing.

/// Capabilities granted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// May post user-visible alerts.
    pub alerts: bool,
    /// May arm exact-time wakes (as opposed to best-effort timers).
    pub exact_wake: bool,
}

impl Capabilities {
    /// Probe the platform once at startup.
    ///
    /// Headless deployments have no permission broker to ask, so the
    /// probe honors the standard environment overrides used to run with
    /// reduced capabilities.
    pub fn probe() -> Self {
        let alerts = std::env::var_os("NOTEBELL_DISABLE_ALERTS").is_none();
        let exact_wake = std::env::var_os("NOTEBELL_INEXACT_WAKES").is_none();

        if !alerts {
            tracing::warn!("Alert capability denied, reminders will not be shown");
        }
        if !exact_wake {
            tracing::warn!("Exact-wake capability denied, reminders degrade to best-effort timing");
        }

        Self { alerts, exact_wake }
    }

    /// All capabilities granted.
    pub fn granted() -> Self {
        Self {
            alerts: true,
            exact_wake: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_allows_everything() {
        let caps = Capabilities::granted();
        assert!(caps.alerts);
        assert!(caps.exact_wake);
    }
}
