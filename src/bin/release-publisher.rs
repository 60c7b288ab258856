//! Release Publisher CLI
//!
//! Publishes a staged release to Maven Central and promotes builds in Artifactory

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use release_publisher::{
    ArtifactoryService, ConfigLoadOptions, ConfigLoader, PublishError, ReleaseConfig,
    ReleaseInfo, SonatypeService, cancellation,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Release publishing for Maven Central and Artifactory
#[derive(Parser)]
#[command(name = "release-publisher")]
#[command(version = "0.1.0")]
#[command(about = "Release publishing for Maven Central and Artifactory", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./.release-config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish artifacts through a staging repository and release them
    Publish {
        /// Artifactory build-info.json describing the release
        #[arg(long, value_name = "FILE")]
        build_info: PathBuf,

        /// Root directory of the artifacts to upload
        #[arg(long, value_name = "DIR")]
        artifacts: PathBuf,
    },

    /// Check whether a release has already been published
    Check {
        /// Artifactory build-info.json describing the release
        #[arg(long, value_name = "FILE")]
        build_info: PathBuf,
    },

    /// Promote a build to a target repository in Artifactory
    Promote {
        /// Artifactory build-info.json describing the release
        #[arg(long, value_name = "FILE")]
        build_info: PathBuf,

        /// Repository to promote the build to
        #[arg(long, value_name = "REPO")]
        target_repo: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(ConfigLoadOptions {
        config_path: cli.config,
        project_path: PathBuf::from("."),
        env: std::env::vars().collect(),
    })
    .await?;

    match cli.command {
        Commands::Publish {
            build_info,
            artifacts,
        } => publish_command(&config, &build_info, &artifacts).await,
        Commands::Check { build_info } => check_command(&config, &build_info).await,
        Commands::Promote {
            build_info,
            target_repo,
        } => promote_command(&config, &build_info, &target_repo).await,
    }
}

async fn load_release(build_info: &Path) -> Result<ReleaseInfo> {
    ReleaseInfo::load(build_info)
        .await
        .with_context(|| format!("Failed to read release from {}", build_info.display()))
}

async fn publish_command(config: &ReleaseConfig, build_info: &Path, artifacts: &Path) -> Result<i32> {
    println!("\n📦 release-publisher\n");

    let release = load_release(build_info).await?;
    let service = SonatypeService::new(&config.sonatype, config.state_file.as_deref())?;

    if service.artifacts_published(&release).await {
        println!(
            "⏭️  {} is already published, skipping",
            release.marker_artifact
        );
        return Ok(0);
    }

    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⚠️  Interrupted, stopping before the next upload or staging request");
            handle.cancel();
        }
    });

    match service
        .publish_with_cancellation(&release, artifacts, signal)
        .await
    {
        Ok(report) => {
            println!("\n✅ Publishing completed successfully!");
            println!("  Staging repository: {}", report.repository_id);
            println!("  Artifacts: {}", report.artifacts);
            println!("  Duration: {:.1}s", report.duration.as_secs_f64());
            Ok(0)
        }
        Err(e) => {
            print_failure("Publishing failed", &e);
            Ok(1)
        }
    }
}

async fn check_command(config: &ReleaseConfig, build_info: &Path) -> Result<i32> {
    let release = load_release(build_info).await?;
    let service = SonatypeService::new(&config.sonatype, None)?;

    if service.artifacts_published(&release).await {
        println!("✅ {} is published", release.marker_artifact);
    } else {
        println!("📭 {} is not published", release.marker_artifact);
    }
    Ok(0)
}

async fn promote_command(config: &ReleaseConfig, build_info: &Path, target_repo: &str) -> Result<i32> {
    let release = load_release(build_info).await?;
    let service = ArtifactoryService::new(&config.artifactory)?;

    match service.promote(target_repo, &release).await {
        Ok(()) => {
            println!(
                "✅ Promoted {}/{} to {}",
                release.build_name, release.build_number, target_repo
            );
            Ok(0)
        }
        Err(e) => {
            print_failure("Promotion failed", &e);
            Ok(1)
        }
    }
}

fn print_failure(title: &str, error: &PublishError) {
    eprintln!("\n❌ {}: {}", title, error);
    eprintln!("  Code: {}", error.code());
    if let Some(repository_id) = error.repository_id() {
        eprintln!("  Staging repository: {}", repository_id);
    }
    if let PublishError::CloseRejected { diagnostics, .. } = error {
        for diagnostic in diagnostics {
            eprintln!("  - {}", diagnostic);
        }
    }
    eprintln!("\n💡 Suggested actions:");
    for action in error.suggested_actions() {
        eprintln!("  - {}", action);
    }
}
