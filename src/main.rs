use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dicom_paramap::{
    assembler::{AssembleOptions, assemble_with_options, disassemble},
    dicom_io::{open_document, open_source_dataset, save_document, source_options},
    enums::FramePositioning,
    metadata::MetaDescription,
    nrrd::{Encoding, read_volume, write_volume_with_encoding},
};
use tracing_subscriber::prelude::*;

/// File name of the volume written by `paramap2itkimage`.
const OUTPUT_VOLUME: &str = "pmap.nrrd";

#[derive(Parser)]
#[command(name = "dicom-paramap")]
#[command(about = "Convert scalar volumes to and from DICOM Parametric Map objects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a volume as a Parametric Map
    #[command(name = "itkimage2paramap")]
    ItkImageToParamap {
        /// Input volume (NRRD)
        #[arg(long)]
        input: PathBuf,
        /// JSON metadata description
        #[arg(long)]
        meta: PathBuf,
        /// Output DICOM file
        #[arg(long)]
        output: PathBuf,
        /// Reference dataset to take patient and study attributes from
        #[arg(long)]
        source: Option<PathBuf>,
        /// Store (0, 0, index) as the plane position of each frame
        #[arg(long)]
        index_positions: bool,
    },
    /// Decode a Parametric Map into a volume
    #[command(name = "paramap2itkimage")]
    ParamapToItkImage {
        /// Input Parametric Map
        #[arg(long)]
        input: PathBuf,
        /// Directory receiving pmap.nrrd
        #[arg(long)]
        output_dir: PathBuf,
        /// Write the volume payload without gzip compression
        #[arg(long)]
        uncompressed: bool,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn encode(
    input: PathBuf,
    meta: PathBuf,
    output: PathBuf,
    source: Option<PathBuf>,
    index_positions: bool,
) -> Result<()> {
    let volume = read_volume(&input)
        .with_context(|| format!("reading volume {}", input.display()))?;
    let meta = MetaDescription::from_file(&meta)
        .with_context(|| format!("reading metadata {}", meta.display()))?;
    let source = source
        .map(|path| {
            open_source_dataset(&path)
                .with_context(|| format!("reading source dataset {}", path.display()))
        })
        .transpose()?;

    let mut options = source
        .as_ref()
        .map(|source| source_options(source))
        .unwrap_or_else(AssembleOptions::default);
    if index_positions {
        options.positioning = FramePositioning::IndexPlaceholder;
    }

    let document =
        assemble_with_options(&volume, &meta, &options).context("assembling parametric map")?;
    save_document(&document, &output, source.as_deref())
        .with_context(|| format!("writing parametric map {}", output.display()))?;
    Ok(())
}

fn decode(input: PathBuf, output_dir: PathBuf, encoding: Encoding) -> Result<()> {
    let document = open_document(&input)
        .with_context(|| format!("reading parametric map {}", input.display()))?;
    let volume = disassemble(&document).context("resolving geometry and decoding frames")?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    let output = output_dir.join(OUTPUT_VOLUME);
    write_volume_with_encoding(&volume, &output, encoding)
        .with_context(|| format!("writing volume {}", output.display()))?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::ItkImageToParamap {
            input,
            meta,
            output,
            source,
            index_positions,
        } => encode(input, meta, output, source, index_positions),
        Commands::ParamapToItkImage {
            input,
            output_dir,
            uncompressed,
        } => {
            let encoding = if uncompressed {
                Encoding::Raw
            } else {
                Encoding::Gzip
            };
            decode(input, output_dir, encoding)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
