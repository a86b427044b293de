// imgtouch - Image viewer model and thumbnail tool
// Drives the viewer and thumbnail helpers from the command line

mod cli;

use anyhow::{Context, Result};
use cli::Command;
use imgtouch::geometry::Point;
use imgtouch::image_loader::{load_image, ImageSource};
use imgtouch::thumbnail::{self, Quality};
use imgtouch::viewer::{Viewer, ViewerCommand};
use log::info;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::parse_args();

    match args.command {
        Command::Thumb {
            src,
            dest,
            width,
            height,
            quality,
            mime,
            honor_quality,
        } => {
            info!(
                "Thumbnailing {:?} -> {:?} ({}x{}, quality {})",
                src, dest, width, height, quality
            );
            let result = if honor_quality {
                thumbnail::generate_thumbnail_with_quality(&dest, &src, width, height, quality, &mime)
            } else {
                thumbnail::generate_thumbnail(&dest, &src, width, height, quality, &mime)
            };
            result.with_context(|| format!("Failed to create thumbnail {}", dest.display()))?;
            info!("Thumbnail written to {:?}", dest);
        }

        Command::Scaled { src, dest, size } => {
            let image = load_image(&ImageSource::Path(src))?;
            let thumb = thumbnail::scaled_thumbnail(&image, size)
                .with_context(|| format!("Failed to scale image to {}", size))?;
            thumbnail::save_image_to_file(&dest, &thumb, Quality::DEFAULT, "image/png")
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            info!("Scaled thumbnail ({}) written to {:?}", size, dest);
        }

        Command::View {
            image_path,
            container,
            zoom,
            pan,
            out,
        } => {
            let source = cli::resolve_view_source(image_path)?;
            let image = load_image(&source)?;
            info!(
                "Image loaded: {}x{} pixels, container {}",
                image.width(),
                image.height(),
                container
            );

            let mut viewer = Viewer::new(container);
            viewer.apply(ViewerCommand::LoadImage(image));
            report(&viewer, "loaded");

            for command in zoom {
                viewer.apply(ViewerCommand::Zoom(command));
                report(&viewer, &format!("{:?}", command));
            }

            if let Some(delta) = pan {
                viewer.apply(ViewerCommand::BeginDrag(Point::ORIGIN));
                viewer.apply(ViewerCommand::ContinueDrag(delta));
                viewer.apply(ViewerCommand::EndDrag);
                report(&viewer, "pan");
            }

            if let Some(out) = out {
                match viewer.frame() {
                    Some(frame) => {
                        thumbnail::save_image_to_file(&out, frame, Quality::DEFAULT, "image/png")
                            .with_context(|| format!("Failed to write {}", out.display()))?;
                        info!("Frame written to {:?}", out);
                    }
                    None => log::warn!("Nothing to render, skipping {:?}", out),
                }
            }
        }
    }

    Ok(())
}

fn report(viewer: &Viewer, step: &str) {
    info!(
        "{}: scale {:.4}, display {} at {}",
        step,
        viewer.scale(),
        viewer.display_size(),
        viewer.position()
    );
}
