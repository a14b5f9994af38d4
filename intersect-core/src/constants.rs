//! Process-wide pipeline defaults

/// Base image for the test environment
pub const DEFAULT_BASE_IMAGE: &str = "python:3.10-slim";

/// Where source trees are mounted inside an execution environment
pub const SOURCE_MOUNT_PATH: &str = "/src";

/// Directories never mounted into an execution environment
pub const DEFAULT_EXCLUDES: &[&str] = &[".venv", "dist"];

/// Root directory holding one subdirectory per service
pub const DEFAULT_SOURCE_ROOT: &str = "services";

/// Source tree tested when the caller gives none
pub const DEFAULT_TEST_SOURCE: &str = "services/nsdf_intersect_dashboard";

/// Ephemeral, unauthenticated registry used for throwaway publishes
pub const DEFAULT_REGISTRY: &str = "ttl.sh";

/// Tag used when no tags are given
pub const DEFAULT_TAG: &str = "latest";

/// Exclusive upper bound of the random suffix for ephemeral image names
pub const EPHEMERAL_SUFFIX_BOUND: u32 = 10_000_000;

/// OCI label holding the image creation timestamp
pub const CREATED_LABEL: &str = "org.opencontainers.image.created";

/// Build argument carrying the image version
pub const VERSION_BUILD_ARG: &str = "VERSION";

/// Build argument carrying the commit SHA
pub const GIT_SHA_BUILD_ARG: &str = "GIT_SHA";
