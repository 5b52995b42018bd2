//! Maintenance tasks for Just Snap scenes
//!
//! Usage:
//!   cargo xtask recover --scene scene.ron     # Show objects a crashed session left hidden
//!   cargo xtask new-scene --out scene.ron     # Write the sample scene
//!   cargo xtask inspect scene.ron             # Validate and summarize a scene
//!   cargo xtask init-config                   # Write the default snap config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use just_snap::{RecoveryRecord, SceneDocument, SnapConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Maintenance tasks for Just Snap scenes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Un-hide the objects listed in a recovery record and rewrite the scene
    Recover {
        /// Scene document to repair
        #[arg(long)]
        scene: PathBuf,
        /// Recovery record (defaults to the viewer's config directory)
        #[arg(long)]
        record: Option<PathBuf>,
        /// Leave the record file in place
        #[arg(long)]
        keep_record: bool,
    },
    /// Write the built-in sample scene
    NewScene {
        #[arg(long)]
        out: PathBuf,
        /// Write plain RON instead of compressed
        #[arg(long)]
        plain: bool,
    },
    /// Validate a scene document and list its objects
    Inspect { scene: PathBuf },
    /// Write the default snap config (refuses to overwrite)
    InitConfig {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Recover { scene, record, keep_record } => recover(&scene, record, keep_record),
        Commands::NewScene { out, plain } => new_scene(&out, plain),
        Commands::Inspect { scene } => inspect(&scene),
        Commands::InitConfig { out } => init_config(out),
    }
}

fn recover(scene_path: &Path, record: Option<PathBuf>, keep_record: bool) -> Result<()> {
    let record_path = record.unwrap_or_else(RecoveryRecord::default_path);
    if !record_path.exists() {
        println!("No recovery record at {}, nothing to do", record_path.display());
        return Ok(());
    }

    let record = RecoveryRecord::load(&record_path)
        .with_context(|| format!("Failed to read recovery record {}", record_path.display()))?;
    let mut scene = SceneDocument::load(scene_path)
        .with_context(|| format!("Failed to load scene {}", scene_path.display()))?;

    let restored = scene.apply_recovery(&record);
    let missing = record.hidden.len() - restored;
    scene
        .save(scene_path)
        .with_context(|| format!("Failed to save scene {}", scene_path.display()))?;

    println!("Restored {} of {} hidden objects in {}", restored, record.hidden.len(), scene_path.display());
    if missing > 0 {
        println!("{} listed objects were already visible or no longer exist", missing);
    }

    if !keep_record {
        std::fs::remove_file(&record_path)
            .with_context(|| format!("Failed to remove {}", record_path.display()))?;
    }
    Ok(())
}

fn new_scene(out: &Path, plain: bool) -> Result<()> {
    let scene = SceneDocument::sample();
    if plain {
        let text = scene.to_ron_string()?;
        std::fs::write(out, text).with_context(|| format!("Failed to write {}", out.display()))?;
    } else {
        scene.save(out).with_context(|| format!("Failed to write {}", out.display()))?;
    }
    println!("Sample scene with {} objects written to {}", scene.objects.len(), out.display());
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let scene = SceneDocument::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    scene.validate()?;

    println!("{}: {} objects", path.display(), scene.objects.len());
    for object in &scene.objects {
        let mut flags = Vec::new();
        if object.hidden {
            flags.push("hidden");
        }
        if object.local {
            flags.push("local");
        }
        let verts = object.primitive.build().map(|m| m.vertex_count()).unwrap_or(0);
        println!(
            "  {:<16} {:>5} verts  at ({:.2}, {:.2}, {:.2}) {}",
            object.name,
            verts,
            object.position.x,
            object.position.y,
            object.position.z,
            flags.join(", ")
        );
    }
    Ok(())
}

fn init_config(out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(SnapConfig::default_path);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    SnapConfig::default().save(&path)?;
    println!("Default snap config written to {}", path.display());
    Ok(())
}
