//! Corosync membership rendering.
//!
//! Implements:
//! - Peer discovery over the peer relation (IPv4 or IPv6)
//! - Template context assembly from charm config and the principal
//! - Rendering and writing corosync.conf

mod context;
mod peers;
mod template;

use template::render_config;

use hacluster_common::HaclusterError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::hookenv::{CharmConfig, Relations};
use crate::network::AddressResolver;

/// Renderer settings taken from the tool configuration
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Target file, written in full on every emit
    pub conf_path: PathBuf,
    pub peer_relation: String,
    pub ha_relation: String,
}

impl From<&AppConfig> for RendererSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            conf_path: config.corosync_conf.clone(),
            peer_relation: config.peer_relation.clone(),
            ha_relation: config.ha_relation.clone(),
        }
    }
}

/// Builds corosync.conf from the deployment system's view of the cluster
pub struct CorosyncRenderer {
    config: Arc<dyn CharmConfig>,
    relations: Arc<dyn Relations>,
    resolver: Arc<dyn AddressResolver>,
    settings: RendererSettings,
}

impl CorosyncRenderer {
    pub fn new(
        config: Arc<dyn CharmConfig>,
        relations: Arc<dyn Relations>,
        resolver: Arc<dyn AddressResolver>,
        settings: RendererSettings,
    ) -> Self {
        Self {
            config,
            relations,
            resolver,
            settings,
        }
    }

    pub fn conf_path(&self) -> &Path {
        &self.settings.conf_path
    }

    /// Rendered file contents, `None` if the configuration is incomplete
    pub async fn render(&self) -> Result<Option<String>, HaclusterError> {
        Ok(self.context().await?.as_ref().map(render_config))
    }

    /// Render and write the configuration file.
    ///
    /// Returns false when the configuration is incomplete or the file could
    /// not be written.
    pub async fn emit(&self) -> Result<bool, HaclusterError> {
        match self.render().await? {
            Some(text) => Ok(emit_config(self.conf_path(), &text).await),
            None => Ok(false),
        }
    }
}

/// Write `text` to `path`, creating parent directories as needed
pub async fn emit_config(path: &Path, text: &str) -> bool {
    let result = async {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, text).await
    }
    .await;

    match result {
        Ok(()) => {
            tracing::info!(path = %path.display(), bytes = text.len(), "Wrote corosync configuration");
            true
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Could not write corosync configuration");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{FakeConfig, FakeRelations, FakeResolver};

    pub(crate) fn renderer(
        config: FakeConfig,
        relations: FakeRelations,
        resolver: FakeResolver,
    ) -> (Arc<FakeResolver>, CorosyncRenderer) {
        renderer_at(config, relations, resolver, PathBuf::from("/nonexistent/corosync.conf"))
    }

    fn renderer_at(
        config: FakeConfig,
        relations: FakeRelations,
        resolver: FakeResolver,
        conf_path: PathBuf,
    ) -> (Arc<FakeResolver>, CorosyncRenderer) {
        let resolver = Arc::new(resolver);
        let settings = RendererSettings {
            conf_path,
            peer_relation: "hanode".to_string(),
            ha_relation: "ha".to_string(),
        };
        let renderer = CorosyncRenderer::new(
            Arc::new(config),
            Arc::new(relations),
            resolver.clone(),
            settings,
        );
        (resolver, renderer)
    }

    fn relations() -> FakeRelations {
        FakeRelations::new("hanode/0")
            .private_address("10.0.0.1")
            .unit("hanode", "hanode:1", "hanode/1")
            .data("hanode:1", "hanode/1", "private-address", "10.0.0.2")
            .unit("ha", "ha:2", "keystone/0")
            .data("ha:2", "keystone/0", "corosync_bindiface", "eth0")
    }

    fn config(debug: bool) -> FakeConfig {
        FakeConfig::new()
            .set("debug", debug)
            .set("prefer-ipv6", false)
            .set("corosync_mcastport", "1234")
            .set("corosync_transport", "udpu")
            .set("corosync_mcastaddr", "corosync_mcastaddr")
    }

    async fn check_debug(enabled: bool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corosync.conf");
        let (resolver, renderer) = renderer_at(config(enabled), relations(), FakeResolver::new(), path.clone());

        let ctx = renderer.context().await.unwrap().unwrap();
        assert_eq!(ctx.debug, enabled);

        let mut lookups = resolver.host_lookups();
        lookups.sort();
        assert_eq!(lookups, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(resolver.ipv6_lookups(), 0);

        assert!(renderer.emit().await.unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        let pattern = if enabled { "debug: on\n" } else { "debug: off\n" };
        assert_eq!(content.matches(pattern).count(), 2, "{content}");
    }

    #[tokio::test]
    async fn test_debug_on() {
        check_debug(true).await;
    }

    #[tokio::test]
    async fn test_debug_off() {
        check_debug(false).await;
    }

    #[tokio::test]
    async fn test_emit_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("corosync").join("corosync.conf");
        let (_, renderer) = renderer_at(config(true), relations(), FakeResolver::new(), path.clone());

        assert!(renderer.emit().await.unwrap());
        let first = std::fs::read(&path).unwrap();
        assert!(renderer.emit().await.unwrap());
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_emit_skips_incomplete_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corosync.conf");
        let config = FakeConfig::new().set("corosync_transport", "udp");
        let (_, renderer) = renderer_at(config, relations(), FakeResolver::new(), path.clone());

        assert!(!renderer.emit().await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_emit_config_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten as a file
        assert!(!emit_config(dir.path(), "totem {}\n").await);
    }
}
