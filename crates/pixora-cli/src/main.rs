//! Pixora CLI: build and inspect transformation references, and drive editor
//! sessions against the configured asset store and project service.
//!
//! Configuration comes from `PIXORA_*` variables (a `.env` file is honoured).

use anyhow::Context;
use clap::{Parser, Subcommand};
use pixora_cli::{extend_reference, init, inspect, write_export, Collaborators, OutcomeReport};
use pixora_core::{AssetReference, EdgeSet, PixelSize, TransformUrlBuilder};
use pixora_editor::{
    create_project, AiEffect, BackgroundMode, CropWindow, ExportFormat,
    ExtensionStrategy, NewProjectUpload,
};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pixora", about = "Pixora transform pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a transformation reference without fetching anything
    Url {
        #[command(subcommand)]
        sub: UrlCommands,
    },
    /// Decode the transformation chain of a reference
    Inspect {
        reference: String,
    },
    /// Edit a stored project
    Project {
        #[command(subcommand)]
        sub: ProjectCommands,
    },
}

#[derive(clap::Args)]
struct ExtendArgs {
    /// Edges to grow towards, e.g. `left,top`
    #[arg(long, value_parser = EdgeSet::parse_list)]
    directions: EdgeSet,
    /// Pixels added per axis (or per edge), 50..=500 in steps of 25
    #[arg(long)]
    amount: Option<u32>,
    /// `per-axis` or `per-edge`
    #[arg(long, default_value = "per-axis")]
    strategy: ExtensionStrategy,
}

#[derive(clap::Args)]
struct CropArgs {
    #[arg(long)]
    x: f64,
    #[arg(long)]
    y: f64,
    #[arg(long)]
    width: f64,
    #[arg(long)]
    height: f64,
}

#[derive(Subcommand)]
enum UrlCommands {
    /// Generative extension of an image displayed at `--current-width` x `--current-height`
    Extend {
        reference: String,
        #[arg(long)]
        current_width: u32,
        #[arg(long)]
        current_height: u32,
        #[command(flatten)]
        args: ExtendArgs,
    },
    /// Crop window in intrinsic pixels
    Crop {
        reference: String,
        #[command(flatten)]
        args: CropArgs,
    },
    /// Remove the background, or replace it when `--prompt` is given
    RemoveBg {
        reference: String,
        #[arg(long)]
        prompt: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Upload an image and create a project around it
    New {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// List projects, most recently updated first
    List,
    Extend {
        id: Uuid,
        #[command(flatten)]
        args: ExtendArgs,
    },
    Crop {
        id: Uuid,
        #[command(flatten)]
        args: CropArgs,
    },
    RemoveBg {
        id: Uuid,
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Apply `upscale` or `retouch`
    Effect {
        id: Uuid,
        effect: AiEffect,
    },
    /// Discard all edits and return to the uploaded original
    Reset {
        id: Uuid,
    },
    /// Persist the canvas as it is
    Save {
        id: Uuid,
    },
    /// Render the canvas to a file
    Export {
        id: Uuid,
        /// `png`, `jpeg`, `jpeg-medium` or `webp`
        #[arg(long, default_value = "png", value_parser = parse_format)]
        format: ExportFormat,
        /// Output file, or a directory to receive `<title>.<ext>`
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    Delete {
        id: Uuid,
    },
}

fn parse_format(key: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_key(key).ok_or_else(|| format!("Unknown export format: {}", key))
}

fn background_mode(prompt: Option<String>) -> BackgroundMode {
    match prompt {
        Some(prompt) => BackgroundMode::Replace { prompt },
        None => BackgroundMode::Remove,
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn run_url(command: UrlCommands) -> anyhow::Result<()> {
    let reference = match command {
        UrlCommands::Extend {
            reference,
            current_width,
            current_height,
            args,
        } => extend_reference(
            &AssetReference::new(reference),
            PixelSize::new(current_width, current_height),
            args.directions,
            args.amount.unwrap_or(pixora_editor::tools::extend::DEFAULT_EXTENSION_AMOUNT),
            args.strategy,
        )?,
        UrlCommands::Crop { reference, args } => TransformUrlBuilder::new()
            .crop(args.x, args.y, args.width, args.height)
            .build(&AssetReference::new(reference))?,
        UrlCommands::RemoveBg { reference, prompt } => TransformUrlBuilder::new()
            .operation(background_mode(prompt).operation())
            .build(&AssetReference::new(reference))?,
    };
    println!("{}", reference);
    Ok(())
}

async fn run_project(command: ProjectCommands) -> anyhow::Result<()> {
    let collaborators = Collaborators::from_env().await?;

    match command {
        ProjectCommands::New { file, title } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image.png")
                .to_string();
            let content_type = match filename.rsplit('.').next().map(str::to_lowercase).as_deref() {
                Some("jpg") | Some("jpeg") => "image/jpeg".to_string(),
                Some(ext) => format!("image/{}", ext),
                None => "application/octet-stream".to_string(),
            };
            let project = create_project(
                collaborators.store.as_ref(),
                collaborators.projects.as_ref(),
                &collaborators.config,
                NewProjectUpload {
                    filename,
                    content_type,
                    data,
                    title,
                },
            )
            .await?;
            print_json(&project)?;
        }
        ProjectCommands::List => {
            print_json(&collaborators.projects.list_projects().await?)?;
        }
        ProjectCommands::Delete { id } => {
            collaborators.projects.delete_project(id).await?;
            print_json(&serde_json::json!({ "success": true, "message": format!("Project {} deleted", id) }))?;
        }
        ProjectCommands::Extend { id, args } => {
            let mut session = collaborators.session(id).await?;
            let tools = session.tools_mut();
            tools.extend.set_strategy(args.strategy);
            if let Some(amount) = args.amount {
                tools.extend.set_amount(amount);
            }
            tools.extend.set_directions(args.directions);
            let outcome = session.apply_extend().await?;
            print_json(&OutcomeReport::new(&outcome, session.drain_notifications()))?;
        }
        ProjectCommands::Crop { id, args } => {
            let mut session = collaborators.session(id).await?;
            session.tools_mut().crop.select_region(CropWindow {
                crop_x: args.x,
                crop_y: args.y,
                width: args.width,
                height: args.height,
            });
            let outcome = session.apply_crop().await?;
            print_json(&OutcomeReport::new(&outcome, session.drain_notifications()))?;
        }
        ProjectCommands::RemoveBg { id, prompt } => {
            let mut session = collaborators.session(id).await?;
            session.tools_mut().background.select(background_mode(prompt));
            let outcome = session.apply_background().await?;
            print_json(&OutcomeReport::new(&outcome, session.drain_notifications()))?;
        }
        ProjectCommands::Effect { id, effect } => {
            let mut session = collaborators.session(id).await?;
            session.tools_mut().effect.select(Some(effect));
            let outcome = session.apply_effect().await?;
            print_json(&OutcomeReport::new(&outcome, session.drain_notifications()))?;
        }
        ProjectCommands::Reset { id } => {
            let mut session = collaborators.session(id).await?;
            let outcome = session.reset_to_original().await?;
            print_json(&OutcomeReport::new(&outcome, session.drain_notifications()))?;
        }
        ProjectCommands::Save { id } => {
            let mut session = collaborators.session(id).await?;
            session.save().await?;
            print_json(&session.drain_notifications())?;
        }
        ProjectCommands::Export { id, format, output } => {
            let mut session = collaborators.session(id).await?;
            let exported = session.export(format)?;
            let path = write_export(&output, &session.project().title, &exported)?;
            tracing::info!(path = %path.display(), width = exported.width, height = exported.height, "Exported canvas");
            print_json(&serde_json::json!({
                "path": path,
                "format": format.name,
                "width": exported.width,
                "height": exported.height,
            }))?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Url { sub } => run_url(sub)?,
        Commands::Inspect { reference } => print_json(&inspect(&AssetReference::new(reference)))?,
        Commands::Project { sub } => run_project(sub).await?,
    }

    Ok(())
}
