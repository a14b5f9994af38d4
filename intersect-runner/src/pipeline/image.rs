//! Image builds

use chrono::Utc;
use intersect_core::domain::{Image, ImageRecipe, Provenance, Service, SourceTree};
use tracing::info;

use super::Pipeline;
use crate::engine::ContainerEngine;
use crate::error::Result;

impl<E: ContainerEngine> Pipeline<E> {
    /// Builds an image from the build descriptor in `source`
    ///
    /// With `provenance`, the version and commit are passed as the `VERSION`
    /// and `GIT_SHA` build arguments and the image is labeled with its
    /// creation time. Without it the descriptor is built as is.
    pub async fn build_from_dockerfile(
        &self,
        source: SourceTree,
        provenance: Option<&Provenance>,
    ) -> Result<Image> {
        let mut recipe = ImageRecipe::from_dockerfile(source);
        if let Some(provenance) = provenance {
            recipe = recipe.with_provenance(provenance, Utc::now());
            info!(
                "Building {} (version {}, commit {})",
                recipe.context.path().display(),
                provenance.version,
                provenance.commit_sha
            );
        } else {
            info!("Building {}", recipe.context.path().display());
        }

        self.engine.build(&recipe).await
    }

    /// Plain build of a service, from `source` or the service's directory
    /// under the source root
    pub async fn build_container(
        &self,
        service: Service,
        source: Option<SourceTree>,
    ) -> Result<Image> {
        let source = source.unwrap_or_else(|| self.service_source(service));
        self.build_from_dockerfile(source, None).await
    }

    pub async fn build_dashboard_container(&self, source: Option<SourceTree>) -> Result<Image> {
        self.build_container(Service::Dashboard, source).await
    }

    pub async fn build_service_container(&self, source: Option<SourceTree>) -> Result<Image> {
        self.build_container(Service::Service, source).await
    }

    pub async fn build_storage_container(&self, source: Option<SourceTree>) -> Result<Image> {
        self.build_container(Service::Storage, source).await
    }
}
