//! Image build controller.
//!
//! Decides which of a project's images need rebuilding by comparing each
//! image definition against the hash recorded in the generated cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{Config, ImageConfig};
use crate::generated::{CacheConfig, ImageCache};
use crate::kube::KubeClient;
use crate::utils::config_hash;

/// Builds a project's images.
pub trait BuildController: fmt::Debug + Send + Sync {
    /// Names of all images the project defines.
    fn images(&self) -> Vec<String>;

    /// Names of the images whose definition changed since the last build.
    fn images_to_build(&self) -> Vec<String>;
}

/// [`BuildController`] for images defined in `podforge.yaml`.
#[derive(Debug, Clone)]
pub struct ImageBuildController {
    images: BTreeMap<String, ImageConfig>,
    cache: BTreeMap<String, ImageCache>,
    kube_client: Option<Arc<dyn KubeClient>>,
}

impl ImageBuildController {
    pub fn new(config: &Config, cache: &CacheConfig, kube_client: Option<Arc<dyn KubeClient>>) -> Self {
        Self {
            images: config.images.clone(),
            cache: cache.images.clone(),
            kube_client,
        }
    }

    /// The cluster binding builds target (for in-cluster builders).
    #[must_use]
    pub fn kube_client(&self) -> Option<&Arc<dyn KubeClient>> {
        self.kube_client.as_ref()
    }
}

impl BuildController for ImageBuildController {
    fn images(&self) -> Vec<String> {
        self.images.keys().cloned().collect()
    }

    fn images_to_build(&self) -> Vec<String> {
        self.images
            .iter()
            .filter(|(name, image)| {
                let recorded = self.cache.get(*name).map(|c| c.image_config_hash.as_str());
                match config_hash(image) {
                    Ok(hash) => recorded != Some(hash.as_str()),
                    Err(_) => true,
                }
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}
