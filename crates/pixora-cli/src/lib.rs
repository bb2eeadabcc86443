//! Helpers shared by the `pixora` binary.

use anyhow::Context;
use pixora_api_client::ProjectClient;
use pixora_core::transform_url::ParsedChain;
use pixora_core::{
    AssetReference, EdgeSet, EditorConfig, ErrorMetadata, PipelineError, PipelineResult,
    PixelSize, ProjectStore, TransformUrlBuilder, TransformUrlParser,
};
use pixora_editor::tools::extend::clamp_amount;
use pixora_editor::{ApplyOutcome, EditorSession, ExportedImage, ExtensionStrategy, Notification};
use pixora_storage::{create_store, AssetStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_LOG_FILTER: &str = "pixora=info";

/// Load `.env`, then install the subscriber so a `RUST_LOG` set there applies
pub fn init() {
    dotenvy::dotenv().ok();
    init_tracing();
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Asset store and project service behind `project` commands
pub struct Collaborators {
    pub config: EditorConfig,
    pub store: Arc<dyn AssetStore>,
    pub projects: Arc<ProjectClient>,
}

impl Collaborators {
    pub async fn from_env() -> anyhow::Result<Self> {
        Self::from_config(EditorConfig::from_env()?).await
    }

    pub async fn from_config(config: EditorConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let store = create_store(&config)
            .await
            .context("Failed to create asset store")?;
        let projects = Arc::new(
            ProjectClient::from_config(&config).context("Failed to create project client")?,
        );
        Ok(Self {
            config,
            store,
            projects,
        })
    }

    /// Open and load a stored project
    pub async fn session(&self, id: Uuid) -> anyhow::Result<EditorSession> {
        let project = self.projects.get_project(id).await?;
        let mut session = EditorSession::open(project, self.store.clone(), self.projects.clone())
            .with_extension_amount(self.config.default_extension_amount);
        session.load().await?;
        session.drain_notifications();
        Ok(session)
    }
}

/// Extension reference for an image currently displayed at `current`
pub fn extend_reference(
    base: &AssetReference,
    current: PixelSize,
    directions: EdgeSet,
    amount: u32,
    strategy: ExtensionStrategy,
) -> PipelineResult<AssetReference> {
    if directions.is_empty() {
        return Err(PipelineError::NoOperations);
    }
    if TransformUrlParser::parse(base).has_background_removal() {
        return Err(PipelineError::UnsupportedChain(
            "Cannot extend an image whose background was removed".to_string(),
        ));
    }

    let extended = strategy.extended_size(
        f64::from(current.width),
        f64::from(current.height),
        directions,
        clamp_amount(amount),
    );
    TransformUrlBuilder::new()
        .extend(
            f64::from(extended.width),
            f64::from(extended.height),
            directions,
        )
        .build(base)
}

/// Decoded view of a reference
#[derive(Debug, Serialize)]
pub struct ReferenceReport {
    pub reference: AssetReference,
    pub transformed: bool,
    pub background_removed: bool,
    pub chain: ParsedChain,
}

pub fn inspect(reference: &AssetReference) -> ReferenceReport {
    let chain = TransformUrlParser::parse(reference);
    ReferenceReport {
        reference: reference.clone(),
        transformed: reference.is_transformed(),
        background_removed: chain.has_background_removal(),
        chain,
    }
}

/// Printable summary of an applied transformation
#[derive(Debug, Serialize)]
pub struct OutcomeReport {
    pub reference: AssetReference,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
    pub notifications: Vec<Notification>,
}

impl OutcomeReport {
    pub fn new(outcome: &ApplyOutcome, notifications: Vec<Notification>) -> Self {
        OutcomeReport {
            reference: outcome.reference.clone(),
            saved: outcome.is_saved(),
            save_error: outcome.save_error.as_ref().map(ErrorMetadata::user_message),
            notifications,
        }
    }
}

/// Write an export to `output`; a directory receives `<title>.<ext>`
pub fn write_export(output: &Path, title: &str, exported: &ExportedImage) -> anyhow::Result<PathBuf> {
    let path = if output.is_dir() {
        output.join(exported.file_name(title))
    } else {
        output.to_path_buf()
    };

    std::fs::write(&path, &exported.data)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixora_core::StorageBackend;
    use pixora_editor::ExportFormat;

    #[tokio::test]
    async fn collaborators_build_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(dir.path().display().to_string()),
            local_storage_base_url: Some("http://localhost:3000/assets".to_string()),
            ..EditorConfig::default()
        };

        let collaborators = Collaborators::from_config(config).await.unwrap();
        assert_eq!(collaborators.store.backend_name(), "local");

        let missing = Collaborators::from_config(EditorConfig::default()).await;
        assert!(missing.is_err());
    }

    #[test]
    fn log_filter_reads_dotenv_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=pixora_editor=debug\n").unwrap();

        dotenvy::from_path_override(&path).unwrap();
        assert_eq!(log_filter().to_string(), "pixora_editor=debug");
    }

    #[test]
    fn extend_reference_pins_original() {
        let reference = extend_reference(
            &AssetReference::new("img.png"),
            PixelSize::new(800, 600),
            EdgeSet::LEFT,
            200,
            ExtensionStrategy::PerAxis,
        )
        .unwrap();
        assert_eq!(
            reference.as_str(),
            "img.png?tr=bg-genfill,w-1000,h-600,cm-pad_resize,fo-right"
        );
    }

    #[test]
    fn extend_reference_clamps_amount() {
        let reference = extend_reference(
            &AssetReference::new("img.png"),
            PixelSize::new(800, 600),
            EdgeSet::TOP,
            10_000,
            ExtensionStrategy::PerAxis,
        )
        .unwrap();
        assert!(reference.as_str().contains("h-1100"));
    }

    #[test]
    fn extend_reference_rejects_removed_background() {
        let result = extend_reference(
            &AssetReference::new("img.png?tr=e-bgremove"),
            PixelSize::new(800, 600),
            EdgeSet::TOP,
            200,
            ExtensionStrategy::PerAxis,
        );
        assert!(matches!(result, Err(PipelineError::UnsupportedChain(_))));

        let result = extend_reference(
            &AssetReference::new("img.png"),
            PixelSize::new(800, 600),
            EdgeSet::empty(),
            200,
            ExtensionStrategy::PerAxis,
        );
        assert_eq!(result.unwrap_err(), PipelineError::NoOperations);
    }

    #[test]
    fn inspect_reports_chain() {
        let report = inspect(&AssetReference::new("img.png?tr=x-1,y-2,w-3,h-4:e-bgremove"));
        assert!(report.transformed);
        assert!(report.background_removed);
        assert_eq!(report.chain.steps.len(), 2);

        let report = inspect(&AssetReference::new("img.png"));
        assert!(!report.transformed);
        assert!(report.chain.is_empty());
    }

    #[test]
    fn write_export_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exported = ExportedImage {
            format: ExportFormat::PNG,
            width: 1,
            height: 1,
            data: vec![1u8, 2, 3].into(),
        };

        let path = write_export(dir.path(), "Beach", &exported).unwrap();
        assert_eq!(path, dir.path().join("Beach.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);

        let explicit = dir.path().join("out.png");
        let path = write_export(&explicit, "Beach", &exported).unwrap();
        assert_eq!(path, explicit);
    }
}
