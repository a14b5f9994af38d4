//! Publish targets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A service this pipeline knows how to build and publish
///
/// Every variant maps to a source subdirectory, so resolution can never
/// come up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "intersect-dashboard")]
    Dashboard,
    #[serde(rename = "intersect-service")]
    Service,
    #[serde(rename = "intersect-storage")]
    Storage,
}

impl Service {
    /// All known services, in publish order
    pub const ALL: [Service; 3] = [Service::Dashboard, Service::Service, Service::Storage];

    /// Name used on the command line and in image references
    pub fn name(&self) -> &'static str {
        match self {
            Service::Dashboard => "intersect-dashboard",
            Service::Service => "intersect-service",
            Service::Storage => "intersect-storage",
        }
    }

    /// Subdirectory of the source root holding this service
    pub fn subdirectory(&self) -> &'static str {
        match self {
            Service::Dashboard => "nsdf_intersect_dashboard",
            Service::Service => "nsdf_intersect_service",
            // On-disk spelling of the storage directory
            Service::Storage => "ndsf_intersect_storage",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Service {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::ALL
            .into_iter()
            .find(|service| service.name() == s)
            .ok_or_else(|| CoreError::UnknownService {
                name: s.to_string(),
                expected: Service::ALL
                    .iter()
                    .map(Service::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_resolve_to_subdirectories() {
        let dashboard: Service = "intersect-dashboard".parse().unwrap();
        assert_eq!(dashboard, Service::Dashboard);
        assert_eq!(dashboard.subdirectory(), "nsdf_intersect_dashboard");

        let service: Service = "intersect-service".parse().unwrap();
        assert_eq!(service.subdirectory(), "nsdf_intersect_service");

        let storage: Service = "intersect-storage".parse().unwrap();
        assert_eq!(storage.subdirectory(), "ndsf_intersect_storage");
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "unknown-x".parse::<Service>().unwrap_err();
        match &err {
            CoreError::UnknownService { name, expected } => {
                assert_eq!(name, "unknown-x");
                assert!(expected.contains("intersect-storage"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("unknown-x"));
    }

    #[test]
    fn test_name_round_trips_through_display() {
        for service in Service::ALL {
            assert_eq!(service.to_string().parse::<Service>().unwrap(), service);
        }
    }

    #[test]
    fn test_serde_uses_service_names() {
        let json = serde_json::to_string(&Service::Storage).unwrap();
        assert_eq!(json, "\"intersect-storage\"");
    }
}
