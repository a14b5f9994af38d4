//! Image publishing

use intersect_core::constants::DEFAULT_SOURCE_ROOT;
use intersect_core::domain::{
    Provenance, PublishMode, PublishOutcome, RegistryCredentials, Secret, Service, SourceTree,
    TagSet, image_reference, is_default_registry, validate_tag,
};
use tracing::{debug, info};

use super::Pipeline;
use crate::engine::ContainerEngine;
use crate::error::{PipelineError, Result};

/// What to publish and where
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub service: Service,
    pub tags: TagSet,
    /// Required when the pipeline embeds provenance
    pub commit_sha: Option<String>,
    /// Falls back to the pipeline's configured registry
    pub registry: Option<String>,
    pub username: String,
    pub password: Secret,
    /// Directory holding one subdirectory per service
    pub source_root: SourceTree,
}

impl PublishRequest {
    /// Request for `service` with every other field at its default:
    /// tag `latest`, the configured registry, source root `services`
    pub fn new(service: Service) -> Self {
        Self {
            service,
            tags: TagSet::latest(),
            commit_sha: None,
            registry: None,
            username: String::new(),
            password: Secret::default(),
            source_root: SourceTree::new(DEFAULT_SOURCE_ROOT),
        }
    }

    /// Same as [`PublishRequest::new`], resolving the service by name
    ///
    /// Unknown names are rejected.
    pub fn for_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_commit_sha(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: Secret) -> Self {
        self.username = username.into();
        self.password = password;
        self
    }

    pub fn with_source_root(mut self, source_root: SourceTree) -> Self {
        self.source_root = source_root;
        self
    }
}

impl<E: ContainerEngine> Pipeline<E> {
    /// Builds and pushes the requested service image once per tag
    ///
    /// Tags are handled one at a time, in order. The first failing build or
    /// push aborts the remaining tags; images already pushed stay pushed.
    /// Dropping the returned future cancels the step in flight and skips the
    /// remaining tags.
    pub async fn publish_image(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let mode = self.config.publish_mode;
        if mode == PublishMode::Single && request.tags.len() != 1 {
            return Err(PipelineError::InvalidRequest(format!(
                "single-tag mode publishes exactly one tag, got {}",
                request.tags.len()
            )));
        }

        let commit_sha = match (&request.commit_sha, self.config.embed_provenance) {
            (Some(sha), true) => Some(sha.as_str()),
            (None, true) => {
                return Err(PipelineError::InvalidRequest(
                    "a commit SHA is required when embedding provenance".to_string(),
                ));
            }
            (_, false) => None,
        };

        let registry = request
            .registry
            .as_deref()
            .unwrap_or(self.config.registry.as_str());
        let authenticated = !is_default_registry(registry);
        if authenticated {
            if request.username.is_empty() {
                return Err(PipelineError::InvalidRequest(format!(
                    "a username is required to publish to {}",
                    registry
                )));
            }
            // Tags only become part of the reference outside the ephemeral registry
            for tag in request.tags.iter() {
                validate_tag(tag)?;
            }
        }

        let source = request.source_root.directory(request.service.subdirectory());
        info!(
            "Publishing {} ({} tag(s), {} mode) to {}",
            request.service,
            request.tags.len(),
            mode,
            registry
        );

        let mut published = Vec::with_capacity(request.tags.len());
        for tag in request.tags.iter() {
            let provenance = commit_sha.map(|sha| Provenance::new(tag, sha));
            let mut image = self
                .build_from_dockerfile(source.clone(), provenance.as_ref())
                .await?;

            let reference = image_reference(
                registry,
                &request.username,
                request.service,
                tag,
                &mut rand::rng(),
            );

            if authenticated {
                debug!("Attaching credentials for {}", registry);
                image = image.with_registry_auth(RegistryCredentials::new(
                    registry,
                    &request.username,
                    request.password.clone(),
                ));
            }

            let reference = self.engine.publish(&image, &reference).await?;
            info!("Published {} as {}", request.service, reference);
            published.push(reference);
        }

        Ok(match mode {
            PublishMode::Single => PublishOutcome::Single(published.remove(0)),
            PublishMode::Multi => PublishOutcome::Multi(published),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::{EngineCall, RecordingEngine};
    use intersect_core::constants::EPHEMERAL_SUFFIX_BOUND;
    use std::path::Path;

    fn pipeline(engine: RecordingEngine, config: Config) -> Pipeline<RecordingEngine> {
        Pipeline::new(engine, config)
    }

    fn assert_ephemeral(reference: &str, name: &str) {
        let digits = reference
            .strip_prefix(&format!("ttl.sh/{}-", name))
            .unwrap_or_else(|| panic!("unexpected reference {}", reference));
        assert!(!digits.is_empty());
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert!(digits.parse::<u32>().unwrap() < EPHEMERAL_SUFFIX_BOUND);
    }

    #[tokio::test]
    async fn test_two_versions_to_ttl_sh() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let request = PublishRequest::for_name("intersect-service")
            .unwrap()
            .with_tags(TagSet::new(["1.0.0", "1.0.1"]))
            .with_commit_sha("abc123");

        let outcome = pipeline.publish_image(&request).await.unwrap();
        let references = outcome.references();
        assert_eq!(references.len(), 2);
        for reference in &references {
            assert_ephemeral(reference, "intersect-service");
            assert!(!reference.contains(':'));
        }

        let engine = pipeline.engine();
        assert_eq!(engine.builds().len(), 2);
        assert_eq!(engine.publishes().len(), 2);

        // Build, push, build, push
        let kinds: Vec<&str> = engine
            .calls()
            .iter()
            .map(|call| match call {
                EngineCall::Build { .. } => "build",
                EngineCall::Publish { .. } => "publish",
                EngineCall::Run { .. } => "run",
            })
            .collect();
        assert_eq!(kinds, vec!["build", "publish", "build", "publish"]);

        let versions: Vec<String> = engine
            .builds()
            .into_iter()
            .map(|call| match call {
                EngineCall::Build {
                    context,
                    build_args,
                    ..
                } => {
                    assert_eq!(context, Path::new("services").join("nsdf_intersect_service"));
                    assert_eq!(build_args[0].value, "abc123");
                    build_args[1].value.clone()
                }
                other => panic!("unexpected call: {:?}", other),
            })
            .collect();
        assert_eq!(versions, vec!["1.0.0", "1.0.1"]);

        for call in engine.publishes() {
            if let EngineCall::Publish {
                authenticated_as, ..
            } = call
            {
                assert_eq!(authenticated_as, None);
            }
        }
    }

    #[tokio::test]
    async fn test_private_registry_reference_and_auth() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let request = PublishRequest::new(Service::Dashboard)
            .with_tags(TagSet::new(["2.1.0"]))
            .with_commit_sha("def456")
            .with_registry("ghcr.io")
            .with_credentials("nsdf", Secret::new("token"));

        let outcome = pipeline.publish_image(&request).await.unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Multi(vec!["ghcr.io/nsdf/intersect-dashboard:2.1.0".to_string()])
        );

        // Credentials were on the image when the push happened
        assert_eq!(
            pipeline.engine().publishes(),
            vec![EngineCall::Publish {
                image: "local/image-1".to_string(),
                reference: "ghcr.io/nsdf/intersect-dashboard:2.1.0".to_string(),
                authenticated_as: Some("nsdf".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_tags_behave_like_latest() {
        let config = Config::default().with_embed_provenance(false);
        let empty: Vec<String> = Vec::new();

        let defaulted = pipeline(RecordingEngine::new(), config.clone());
        let request = PublishRequest::new(Service::Storage)
            .with_tags(TagSet::new(empty))
            .with_registry("registry.example.org")
            .with_credentials("ci", Secret::new("pw"));
        let first = defaulted.publish_image(&request).await.unwrap();

        let explicit = pipeline(RecordingEngine::new(), config);
        let request = request.with_tags(TagSet::new(["latest"]));
        let second = explicit.publish_image(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.references(),
            vec!["registry.example.org/ci/intersect-storage:latest"]
        );
        assert_eq!(defaulted.engine().calls(), explicit.engine().calls());
    }

    #[tokio::test]
    async fn test_single_mode_returns_one_reference() {
        let config = Config::default()
            .with_publish_mode(PublishMode::Single)
            .with_embed_provenance(false);
        let pipeline = pipeline(RecordingEngine::new(), config);

        let outcome = pipeline
            .publish_image(&PublishRequest::new(Service::Dashboard))
            .await
            .unwrap();
        match outcome {
            PublishOutcome::Single(reference) => assert_ephemeral(&reference, "intersect-dashboard"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let request = PublishRequest::new(Service::Dashboard)
            .with_tags(TagSet::new(["1", "2"]));
        let err = pipeline.publish_image(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_plain_builds_when_provenance_disabled() {
        let pipeline = pipeline(
            RecordingEngine::new(),
            Config::default().with_embed_provenance(false),
        );
        let request = PublishRequest::new(Service::Service).with_commit_sha("ignored");
        pipeline.publish_image(&request).await.unwrap();

        match &pipeline.engine().builds()[0] {
            EngineCall::Build {
                build_args, labels, ..
            } => {
                assert!(build_args.is_empty());
                assert!(labels.is_empty());
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_sha_is_rejected_before_building() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let err = pipeline
            .publish_image(&PublishRequest::new(Service::Dashboard))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert!(pipeline.engine().calls().is_empty());
    }

    #[tokio::test]
    async fn test_private_registry_requires_username() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let request = PublishRequest::new(Service::Dashboard)
            .with_commit_sha("abc")
            .with_registry("ghcr.io");

        let err = pipeline.publish_image(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert!(pipeline.engine().calls().is_empty());
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        let err = PublishRequest::for_name("unknown-x").unwrap_err();
        assert!(err.is_unknown_service());
    }

    #[tokio::test]
    async fn test_first_failure_stops_remaining_tags() {
        let pipeline = pipeline(
            RecordingEngine::new().with_failing_publish(1),
            Config::default(),
        );
        let request = PublishRequest::new(Service::Dashboard)
            .with_tags(TagSet::new(["1", "2", "3"]))
            .with_commit_sha("abc");

        let err = pipeline.publish_image(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish { .. }));

        // The first push is kept, the third tag is never built
        assert_eq!(pipeline.engine().builds().len(), 2);
        assert_eq!(pipeline.engine().publishes().len(), 2);
    }

    #[tokio::test]
    async fn test_build_failure_skips_push() {
        let pipeline = pipeline(
            RecordingEngine::new().with_failing_build(),
            Config::default(),
        );
        let request = PublishRequest::new(Service::Dashboard).with_commit_sha("abc");

        let err = pipeline.publish_image(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Build { .. }));
        assert!(pipeline.engine().publishes().is_empty());
    }

    #[tokio::test]
    async fn test_source_root_is_honored() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let request = PublishRequest::new(Service::Storage)
            .with_commit_sha("abc")
            .with_source_root(SourceTree::new("/repo/services"));
        pipeline.publish_image(&request).await.unwrap();

        match &pipeline.engine().builds()[0] {
            EngineCall::Build { context, .. } => {
                assert_eq!(context, &Path::new("/repo/services").join("ndsf_intersect_storage"));
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_build_metadata_versions_publish_to_ttl_sh() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let request = PublishRequest::new(Service::Service)
            .with_tags(TagSet::new(["1.0.0+build.7", "2.0.0"]))
            .with_commit_sha("abc123");

        let outcome = pipeline.publish_image(&request).await.unwrap();
        let references = outcome.references();
        assert_eq!(references.len(), 2);
        for reference in &references {
            assert_ephemeral(reference, "intersect-service");
        }

        match &pipeline.engine().builds()[0] {
            EngineCall::Build { build_args, .. } => {
                assert_eq!(build_args[1].value, "1.0.0+build.7");
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_private_registry_rejects_invalid_tag_before_building() {
        let pipeline = pipeline(RecordingEngine::new(), Config::default());
        let request = PublishRequest::new(Service::Service)
            .with_tags(TagSet::new(["1.0.0", "1.0.0+build.7"]))
            .with_commit_sha("abc123")
            .with_registry("ghcr.io")
            .with_credentials("nsdf", Secret::new("token"));

        let err = pipeline.publish_image(&request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Core(intersect_core::CoreError::InvalidTag(ref tag)) if tag == "1.0.0+build.7"
        ));
        assert!(pipeline.engine().calls().is_empty());
    }

    #[tokio::test]
    async fn test_configured_registry_is_the_fallback() {
        let config = Config::default()
            .with_registry("registry.example.org")
            .with_embed_provenance(false);
        let pipeline = pipeline(RecordingEngine::new(), config);
        let request = PublishRequest::new(Service::Dashboard)
            .with_tags(TagSet::new(["3.0.0"]))
            .with_credentials("ci", Secret::new("pw"));

        let outcome = pipeline.publish_image(&request).await.unwrap();
        assert_eq!(
            outcome.references(),
            vec!["registry.example.org/ci/intersect-dashboard:3.0.0"]
        );

        // An explicit registry still wins
        let request = request.with_registry("ttl.sh");
        let outcome = pipeline.publish_image(&request).await.unwrap();
        assert_ephemeral(outcome.references()[0], "intersect-dashboard");
    }

    #[tokio::test]
    async fn test_cancelled_publish_attempts_no_further_tags() {
        let pipeline = pipeline(
            RecordingEngine::new().with_stalled_publish(1),
            Config::default(),
        );
        let request = PublishRequest::new(Service::Storage)
            .with_tags(TagSet::new(["1", "2", "3"]))
            .with_commit_sha("abc");

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            pipeline.publish_image(&request),
        )
        .await;
        assert!(result.is_err());

        // The second push was in flight when the future was dropped
        let engine = pipeline.engine();
        assert_eq!(engine.builds().len(), 2);
        assert_eq!(engine.publishes().len(), 2);

        tokio::task::yield_now().await;
        assert_eq!(engine.calls().len(), 4);
    }
}
