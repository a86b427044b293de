// Viewer module
// Zoom and pan state for an image shown inside a fixed-size container

use crate::geometry::{Point, Size};
use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;
use std::str::FromStr;

/// Smallest allowed zoom factor
pub const MIN_SCALE: f64 = 0.3;
/// Largest allowed zoom factor
pub const MAX_SCALE: f64 = 3.0;
/// Zoom in/out increment
pub const SCALE_STEP: f64 = 0.1;
/// Native size (1:1)
pub const DEFAULT_SCALE: f64 = 1.0;

/// Zoom commands understood by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomCommand {
    /// Grow by one step
    In,
    /// Shrink by one step
    Out,
    /// Shrink to fit the container, never enlarging past native size
    AutoFit,
    /// Show at native size
    OriginalSize,
}

impl FromStr for ZoomCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "+" => Ok(ZoomCommand::In),
            "out" | "-" => Ok(ZoomCommand::Out),
            "fit" | "auto" | "autofit" => Ok(ZoomCommand::AutoFit),
            "original" | "1:1" | "origin" => Ok(ZoomCommand::OriginalSize),
            _ => Err(format!(
                "Unknown zoom command '{}' (expected in, out, fit or original)",
                s
            )),
        }
    }
}

/// Everything a UI layer can ask the viewer to do
#[derive(Debug, Clone)]
pub enum ViewerCommand {
    LoadImage(DynamicImage),
    Zoom(ZoomCommand),
    Resize(Size),
    BeginDrag(Point),
    ContinueDrag(Point),
    EndDrag,
}

/// Layout margins, in pixels, subtracted from the container size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Reserved space when computing the auto-fit scale
    pub fit_margin: u32,
    /// Reserved space when centering the display surface
    pub layout_margin: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fit_margin: 0,
            layout_margin: 6,
        }
    }
}

/// Image viewer state
///
/// The source image never changes size; zooming only changes the size of
/// the display surface, which sits at `position` inside the container and
/// is allowed to overflow it.
#[derive(Debug, Clone)]
pub struct Viewer {
    config: ViewerConfig,
    container: Size,
    source: Option<DynamicImage>,
    scale: f64,
    display: Size,
    position: Point,
    dragging: bool,
    /// Pointer position (surface-relative) recorded when the drag began
    anchor: Point,
    /// Source resampled to the display size
    frame: Option<DynamicImage>,
}

impl Viewer {
    /// Create an empty viewer for a container of the given size
    pub fn new(container: Size) -> Self {
        Self::with_config(container, ViewerConfig::default())
    }

    pub fn with_config(container: Size, config: ViewerConfig) -> Self {
        Self {
            config,
            container,
            source: None,
            scale: DEFAULT_SCALE,
            display: Size::default(),
            position: Point::ORIGIN,
            dragging: false,
            anchor: Point::ORIGIN,
            frame: None,
        }
    }

    /// Dispatch a single command
    pub fn apply(&mut self, command: ViewerCommand) {
        match command {
            ViewerCommand::LoadImage(image) => self.load_image(image),
            ViewerCommand::Zoom(zoom) => self.zoom(zoom),
            ViewerCommand::Resize(container) => self.recompute_geometry(container),
            ViewerCommand::BeginDrag(pointer) => self.begin_drag(pointer),
            ViewerCommand::ContinueDrag(pointer) => self.continue_drag(pointer),
            ViewerCommand::EndDrag => self.end_drag(),
        }
    }

    /// Replace the source image and fit it to the container
    pub fn load_image(&mut self, image: DynamicImage) {
        debug!("Loading {}x{} image", image.width(), image.height());
        self.source = Some(image);
        self.frame = None;
        self.zoom(ZoomCommand::AutoFit);
    }

    /// Change the scale factor, then lay out and re-render
    ///
    /// Does nothing until an image has been loaded.
    pub fn zoom(&mut self, command: ZoomCommand) {
        let Some(source) = self.source.as_ref() else {
            debug!("Ignoring {:?}: no image loaded", command);
            return;
        };
        let native = Size::new(source.width(), source.height());

        match command {
            ZoomCommand::In => {
                if self.scale < MAX_SCALE {
                    self.scale = (self.scale + SCALE_STEP).min(MAX_SCALE);
                }
            }
            ZoomCommand::Out => {
                if self.scale > MIN_SCALE {
                    self.scale = (self.scale - SCALE_STEP).max(MIN_SCALE);
                }
            }
            ZoomCommand::OriginalSize => self.scale = DEFAULT_SCALE,
            ZoomCommand::AutoFit => self.scale = self.fit_scale(native),
        }

        debug!("{:?} -> scale {:.3}", command, self.scale);
        self.refresh();
    }

    /// Store a new container size and lay out the display surface in it
    pub fn recompute_geometry(&mut self, container: Size) {
        self.container = container;
        self.refresh();
    }

    /// Press on the display surface
    pub fn begin_drag(&mut self, pointer: Point) {
        self.dragging = true;
        self.anchor = pointer;
    }

    /// Pointer moved while pressed
    ///
    /// `pointer` is relative to the display surface, which follows the drag,
    /// so the offset is always measured against the press point.
    pub fn continue_drag(&mut self, pointer: Point) {
        if !self.dragging {
            return;
        }
        let delta = pointer - self.anchor;
        self.position.x = self.position.x.saturating_add(delta.x);
        self.position.y = self.position.y.saturating_add(delta.y);
    }

    /// Release
    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.anchor = Point::ORIGIN;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn display_size(&self) -> Size {
        self.display
    }

    /// Top-left of the display surface inside the container
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn source(&self) -> Option<&DynamicImage> {
        self.source.as_ref()
    }

    /// The image as currently displayed
    pub fn frame(&self) -> Option<&DynamicImage> {
        self.frame.as_ref()
    }

    /// Largest scale <= 1.0 at which the image fits the container
    fn fit_scale(&self, native: Size) -> f64 {
        let margin = self.config.fit_margin;
        let available_width = self.container.width.saturating_sub(margin) as f64;
        let available_height = self.container.height.saturating_sub(margin) as f64;

        let mut scale = DEFAULT_SCALE;
        if native.width > 0 {
            scale = scale.min(available_width / native.width as f64);
        }
        if native.height > 0 {
            scale = scale.min(available_height / native.height as f64);
        }
        scale.max(MIN_SCALE)
    }

    fn refresh(&mut self) {
        let previous = self.display;
        self.layout();
        if self.frame.is_none() || self.display != previous {
            self.render();
        }
    }

    fn layout(&mut self) {
        let Some(source) = self.source.as_ref() else {
            self.display = Size::default();
            return;
        };

        self.display = Size::new(
            (self.scale * source.width() as f64).floor() as u32,
            (self.scale * source.height() as f64).floor() as u32,
        );

        // Center along each axis that still has room; otherwise keep the
        // current offset so the surface overflows from where it is.
        let margin = self.config.layout_margin as i64;
        let width_gap = self.container.width as i64 - margin - self.display.width as i64;
        if width_gap >= 0 {
            self.position.x = (width_gap / 2) as i32;
        }
        let height_gap = self.container.height as i64 - margin - self.display.height as i64;
        if height_gap >= 0 {
            self.position.y = (height_gap / 2) as i32;
        }
    }

    fn render(&mut self) {
        self.frame = match self.source.as_ref() {
            Some(source) if !self.display.is_empty() => Some(source.resize_exact(
                self.display.width,
                self.display.height,
                FilterType::Triangle,
            )),
            _ => None,
        };
    }
}
