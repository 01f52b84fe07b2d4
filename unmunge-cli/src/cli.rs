//! Root CLI structure for unmunge, surfacing exactly the options named in
//! spec.md §6.2; everything here is a thin translation layer into the core
//! crates' own types (`ucfb_dispatch::{Platform, GameVersion}`,
//! `ucfb_model_formats::{ModelFormat, DiscardFlags}`), which stay free of a
//! `clap` dependency.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ucfb_dispatch::{GameVersion, Platform};
use ucfb_model_formats::{DiscardFlags, ModelFormat};

#[derive(Parser)]
#[command(name = "unmunge")]
#[command(about = "Unmunges a chunked game-asset container into editable files", long_about = None)]
#[command(version)]
pub struct Options {
    /// Input file: a chunked container (`-mode extract`/`explode`) or a
    /// previously exploded directory (`-mode assemble`).
    pub input: PathBuf,

    /// Where to write extracted files, the exploded directory tree, or the
    /// assembled container.
    #[arg(short, long, default_value = "unmunge_out")]
    pub output: PathBuf,

    /// Top-level pipeline to run.
    #[arg(long = "mode", value_enum, default_value_t = Mode::Extract)]
    pub mode: Mode,

    /// Input game-version dialect, fed to the dispatcher.
    #[arg(long = "version", value_enum, default_value_t = CliGameVersion::SwbfIi)]
    pub version: CliGameVersion,

    /// Output game-version dialect, fed to the mesh writer.
    #[arg(long = "outversion", value_enum, default_value_t = CliGameVersion::SwbfIi)]
    pub outversion: CliGameVersion,

    /// Input source platform, fed to the dispatcher.
    #[arg(long = "platform", value_enum, default_value_t = CliPlatform::Pc)]
    pub platform: CliPlatform,

    /// Output model container format.
    #[arg(long = "modelfmt", value_enum, default_value_t = CliModelFormat::Msh)]
    pub modelfmt: CliModelFormat,

    /// Drops non-LOD0 parts and/or collision data before a model is saved.
    #[arg(long = "modeldiscard", value_enum, default_value_t = CliDiscard::None)]
    pub modeldiscard: CliDiscard,

    /// Output image format for decoded textures (collaborator: image codec).
    #[arg(long = "imgfmt", value_enum, default_value_t = CliImageFormat::Tga)]
    pub imgfmt: CliImageFormat,

    /// Verbosity level (can be repeated for more detail).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Extract,
    Explode,
    Assemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliPlatform {
    Pc,
    Ps2,
    Xbox,
}

impl From<CliPlatform> for Platform {
    fn from(value: CliPlatform) -> Self {
        match value {
            CliPlatform::Pc => Platform::Pc,
            CliPlatform::Ps2 => Platform::Ps2,
            CliPlatform::Xbox => Platform::Xbox,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliGameVersion {
    SwbfIi,
    Swbf,
}

impl From<CliGameVersion> for GameVersion {
    fn from(value: CliGameVersion) -> Self {
        match value {
            CliGameVersion::SwbfIi => GameVersion::SwbfIi,
            CliGameVersion::Swbf => GameVersion::Swbf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliModelFormat {
    Msh,
    #[value(name = "glTF")]
    Gltf,
}

impl From<CliModelFormat> for ModelFormat {
    fn from(value: CliModelFormat) -> Self {
        match value {
            CliModelFormat::Msh => ModelFormat::Msh,
            CliModelFormat::Gltf => ModelFormat::Gltf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliDiscard {
    None,
    Lod,
    Collision,
    LodCollision,
}

impl From<CliDiscard> for DiscardFlags {
    fn from(value: CliDiscard) -> Self {
        match value {
            CliDiscard::None => DiscardFlags {
                lod: false,
                collision: false,
            },
            CliDiscard::Lod => DiscardFlags {
                lod: true,
                collision: false,
            },
            CliDiscard::Collision => DiscardFlags {
                lod: false,
                collision: true,
            },
            CliDiscard::LodCollision => DiscardFlags {
                lod: true,
                collision: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliImageFormat {
    Tga,
    Png,
    Dds,
}

impl CliImageFormat {
    pub fn as_tag(self) -> &'static str {
        match self {
            CliImageFormat::Tga => "tga",
            CliImageFormat::Png => "png",
            CliImageFormat::Dds => "dds",
        }
    }
}
