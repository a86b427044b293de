// Command line interface module
// Handles parsing of command line arguments and stdin input

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use imgtouch::geometry::{Point, Size};
use imgtouch::image_loader::ImageSource;
use imgtouch::viewer::ZoomCommand;
use std::io::{self, Read};
use std::path::PathBuf;

/// imgtouch - Image viewer model and thumbnail tool
#[derive(Parser, Debug)]
#[command(name = "imgtouch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resize an image to a fixed size and write it out
    Thumb {
        /// Source image
        #[arg(value_name = "SRC")]
        src: PathBuf,

        /// Destination file (may be the same as SRC)
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Target width, 0 to derive it from the height
        #[arg(short = 'W', long, default_value = "0", allow_negative_numbers = true)]
        width: i32,

        /// Target height, 0 to derive it from the width
        #[arg(short = 'H', long, default_value = "0", allow_negative_numbers = true)]
        height: i32,

        /// Encoder quality (1 - 100, anything else means 95)
        #[arg(short, long, default_value = "95", allow_negative_numbers = true)]
        quality: i32,

        /// MIME type of the output, e.g. image/jpeg
        #[arg(short, long, default_value = "image/jpeg")]
        mime: String,

        /// Pick the encoder from --mime and apply --quality
        #[arg(long, default_value = "false")]
        honor_quality: bool,
    },

    /// Shrink an image to fit a box, keeping its aspect ratio
    Scaled {
        /// Source image
        #[arg(value_name = "SRC")]
        src: PathBuf,

        /// Destination file
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Box size, e.g. 128x128
        #[arg(short, long)]
        size: Size,
    },

    /// Load an image into the viewer, run zoom and pan commands, report the layout
    View {
        /// Path to the image file (can also be provided via stdin pipe)
        #[arg(value_name = "IMAGE")]
        image_path: Option<PathBuf>,

        /// Container size
        #[arg(short, long, default_value = "800x600")]
        container: Size,

        /// Zoom commands applied in order: in, out, fit, original
        #[arg(short, long)]
        zoom: Vec<ZoomCommand>,

        /// Drag the image by X,Y after zooming
        #[arg(short, long, allow_hyphen_values = true)]
        pan: Option<Point>,

        /// Write the displayed frame to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Check if stdin has data available (is a pipe)
fn stdin_has_data() -> bool {
    !atty::is(atty::Stream::Stdin)
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}

/// Decide where the `view` image comes from
pub fn resolve_view_source(image_path: Option<PathBuf>) -> Result<ImageSource> {
    if let Some(path) = image_path {
        return Ok(ImageSource::Path(path));
    }
    if stdin_has_data() {
        let data = read_stdin()?;
        if data.is_empty() {
            bail!("No data received from stdin");
        }
        return Ok(ImageSource::Bytes(data));
    }
    bail!("No image provided. Please provide an image path or pipe image data to stdin.\n\
           Usage: imgtouch view <IMAGE> [OPTIONS]\n\
           Or:    cat image.png | imgtouch view [OPTIONS]");
}
