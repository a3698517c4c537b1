//! Health of the client's collaborators: the state file and the backend.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Usable with reduced guarantees (state not persisted, backend untested)
    Degraded,
    Unhealthy,
}

/// Last observed state of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ComponentState {
    /// Not exercised yet in this run
    Unknown,
    Up,
    Down(String),
}

#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: RwLock<ComponentState>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(ComponentState::Unknown),
        }
    }

    pub fn set_healthy(&self) {
        *self.state.write() = ComponentState::Up;
    }

    pub fn set_unhealthy(&self, reason: impl Into<String>) {
        *self.state.write() = ComponentState::Down(reason.into());
    }

    pub fn state(&self) -> ComponentState {
        self.state.read().clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub name: String,
    #[serde(flatten)]
    pub state: ComponentState,
}

pub struct HealthRegistry {
    pub store: ComponentHealth,
    pub backend: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            store: ComponentHealth::new("store"),
            backend: ComponentHealth::new("backend"),
        }
    }

    /// An unreachable backend makes the client unhealthy. Memory-only
    /// storage or an untested backend only degrade it.
    pub fn report(&self) -> HealthReport {
        let store = self.store.state();
        let backend = self.backend.state();

        let status = match (&backend, &store) {
            (ComponentState::Down(_), _) => HealthStatus::Unhealthy,
            (ComponentState::Up, ComponentState::Up) => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        };

        HealthReport {
            status,
            components: vec![
                ComponentReport {
                    name: self.store.name.to_string(),
                    state: store,
                },
                ComponentReport {
                    name: self.backend.name.to_string(),
                    state: backend,
                },
            ],
        }
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static HEALTH: HealthRegistry = HealthRegistry::new();

/// Process-wide health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
