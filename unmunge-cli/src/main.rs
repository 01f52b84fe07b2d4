//! Entry point for `unmunge`.

mod cli;
mod error;
mod file_saver;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Mode, Options};
use error::CliError;
use file_saver::FilesystemFileSaver;
use ucfb_chunk::ChunkReader;
use ucfb_dispatch::{DispatchEnv, GameVersion, Platform};
use ucfb_handlers::collaborators::{HandlerContext, NullCollaborators};
use ucfb_handlers::register_default_handlers;
use ucfb_model_formats::save_all;
use ucfb_scene::ModelsBuilder;

fn main() -> ExitCode {
    let options = Options::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| match options.verbose {
                0 => EnvFilter::new("warn"),
                1 => EnvFilter::new("info"),
                2 => EnvFilter::new("debug"),
                _ => EnvFilter::new("trace"),
            }),
        )
        .init();

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "unmunge failed");
            ExitCode::FAILURE
        }
    }
}

/// Each pipeline returns its crate-local [`CliError`]; composed here into
/// `anyhow::Error` (spec.md §11 ambient stack), the only point in the
/// workspace that erases a specific error taxonomy for display.
fn run(options: &Options) -> anyhow::Result<()> {
    match options.mode {
        Mode::Extract => extract(options)?,
        Mode::Explode => explode(options)?,
        Mode::Assemble => assemble(options)?,
    }
    Ok(())
}

/// Fully decodes the input container, dispatching every chunk through its
/// registered handler and saving every integrated model once dispatch
/// completes (spec.md §2, §4.C, §4.E).
fn extract(options: &Options) -> error::Result<()> {
    let bytes = std::fs::read(&options.input).map_err(|source| CliError::ReadInput {
        path: options.input.display().to_string(),
        source,
    })?;
    let root = ChunkReader::open(&bytes)?;

    let platform: Platform = options.platform.into();
    let version: GameVersion = options.version.into();

    let models = ModelsBuilder::new();
    let saver = FilesystemFileSaver::new(options.output.clone());
    let collaborators = NullCollaborators;
    let ctx = HandlerContext {
        models: &models,
        saver: &saver,
        image_codec: &collaborators,
        lua_decompiler: &collaborators,
        terrain_unpacker: &collaborators,
        hash_names: &collaborators,
    };

    let dispatcher = register_default_handlers();
    let env = DispatchEnv {
        platform,
        version,
        ctx: &ctx,
        dispatcher: &dispatcher,
    };

    let handler = dispatcher.lookup(root.tag(), platform, version);
    if let Err(err) = handler(root, env) {
        tracing::warn!(error = %err, "root chunk handler failed");
    }

    let outversion: GameVersion = options.outversion.into();
    let _ = outversion; // fed to the mesh writer once it gains per-version emission (spec.md §6.2)
    tracing::debug!(imgfmt = options.imgfmt.as_tag(), "image codec out of scope; raw dumps only");

    let format = options.modelfmt.into();
    let discard = options.modeldiscard.into();
    let failures = save_all(&models, format, discard, &|relative_path, bytes| {
        saver.save(relative_path, bytes)
    });
    for (name, err) in &failures {
        tracing::warn!(model = %name, error = %err, "failed to save model");
    }

    tracing::info!(models = models.len(), "extraction complete");
    Ok(())
}

/// Mechanically splits the chunk tree into `<index>_<tag>_<size>` files and
/// directories, preserving raw bytes (spec.md §4.D).
fn explode(options: &Options) -> error::Result<()> {
    let bytes = std::fs::read(&options.input).map_err(|source| CliError::ReadInput {
        path: options.input.display().to_string(),
        source,
    })?;
    ucfb_explode::explode_root(&bytes, &options.output)?;
    Ok(())
}

/// Inverts [`explode`], reassembling a directory tree back into one
/// chunked container (spec.md §4.D).
fn assemble(options: &Options) -> error::Result<()> {
    let bytes = ucfb_explode::assemble_root(&options.input)?;
    std::fs::write(&options.output, bytes)?;
    Ok(())
}
