//! Frame-sequence animation playback.
//!
//! An [`AnimationPlayer`] owns the decoded frame textures for one character
//! and advances through them on a fixed interval, independent of how often
//! the owning window actually renders. Frames are decoded with the `image`
//! crate and uploaded as SDL textures, so a player is only usable on the
//! thread that owns the window's renderer. The watcher's forced-render path
//! may additionally call [`AnimationPlayer::update`] and the read-only
//! accessors through the shared `Mutex`, never the loading or cleanup calls.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, warn};
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;
use sdl2::render::{BlendMode, Texture, TextureCreator, WindowCanvas};
use sdl2::surface::Surface;
use sdl2::video::WindowContext;
use thiserror::Error;

use crate::animation::characters::list_frame_files;

/// Default playback scale for a freshly spawned character.
pub const DEFAULT_SCALE: f64 = 0.51;
/// Lower clamp for the scale factor.
pub const MIN_SCALE: f64 = 0.1;
/// Multiplier applied by one scale-up/scale-down step.
pub const SCALE_STEP: f64 = 1.1;
/// Default delay between animation frames (~12 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(83);

/// Errors raised while loading a character's frame directory.
#[derive(Debug, Error)]
pub enum FrameLoadError {
    #[error("failed to read frames directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no decodable frames found in {path}")]
    NoFramesFound { path: PathBuf },
}

/// One decoded frame: the uploaded texture plus its unscaled pixel size.
struct Frame {
    texture: Texture,
    width: u32,
    height: u32,
}

/// Plays a looping frame sequence loaded from a character directory.
pub struct AnimationPlayer {
    frames: Vec<Frame>,
    current: usize,
    scale: f64,
    frame_interval: Duration,
    last_advance: Instant,
    frames_path: PathBuf,
}

// SAFETY: the contained textures are raw SDL handles. They are created and
// destroyed on the window's own thread, and every other access goes through
// the owning `Mutex` and is limited to frame advancement and draw calls.
unsafe impl Send for AnimationPlayer {}

impl AnimationPlayer {
    pub fn new(frames_path: impl Into<PathBuf>) -> Self {
        Self {
            frames: Vec::new(),
            current: 0,
            scale: DEFAULT_SCALE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            last_advance: Instant::now(),
            frames_path: frames_path.into(),
        }
    }

    /// Decode every frame image in the directory, in lexicographic filename
    /// order, and upload them as blended textures.
    ///
    /// Files that fail to decode or upload are skipped with a warning.
    /// Fails with [`FrameLoadError::NoFramesFound`] if not a single frame
    /// could be loaded.
    pub fn load_frames(
        &mut self,
        texture_creator: &TextureCreator<WindowContext>,
    ) -> Result<usize, FrameLoadError> {
        let files = list_frame_files(&self.frames_path).map_err(|source| {
            FrameLoadError::DirectoryRead {
                path: self.frames_path.clone(),
                source,
            }
        })?;

        for file in &files {
            let image = match image::open(file) {
                Ok(image) => image.to_rgba8(),
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    continue;
                }
            };
            let (width, height) = image.dimensions();
            let mut bytes = image.into_raw();
            let surface =
                match Surface::from_data(&mut bytes, width, height, width * 4, PixelFormatEnum::RGBA32)
                {
                    Ok(surface) => surface,
                    Err(e) => {
                        warn!("Skipping {}: {}", file.display(), e);
                        continue;
                    }
                };
            let mut texture = match texture_creator.create_texture_from_surface(&surface) {
                Ok(texture) => texture,
                Err(e) => {
                    warn!("Failed to create texture for {}: {}", file.display(), e);
                    continue;
                }
            };
            texture.set_blend_mode(BlendMode::Blend);
            debug!("Loaded {} ({}x{})", file.display(), width, height);
            self.frames.push(Frame {
                texture,
                width,
                height,
            });
        }

        if self.frames.is_empty() {
            return Err(FrameLoadError::NoFramesFound {
                path: self.frames_path.clone(),
            });
        }

        self.last_advance = Instant::now();
        debug!(
            "Loaded {} frames from {}",
            self.frames.len(),
            self.frames_path.display()
        );
        Ok(self.frames.len())
    }

    /// Advance the animation if the frame interval has elapsed.
    pub fn update(&mut self) {
        self.advance(Instant::now());
    }

    /// Time-parameterized advance step behind [`AnimationPlayer::update`].
    ///
    /// Advances by at most one frame per call, wrapping past the last frame.
    /// No-op while the sequence is empty or the interval has not elapsed.
    pub(crate) fn advance(&mut self, now: Instant) {
        if self.frames.is_empty() {
            return;
        }
        if now.duration_since(self.last_advance) >= self.frame_interval {
            self.current = (self.current + 1) % self.frames.len();
            self.last_advance = now;
        }
    }

    /// Draw the current frame at origin and size the window to exactly bound
    /// it. The overlay window has no size state of its own; the scaled frame
    /// extent is the window size.
    pub fn render(&self, canvas: &mut WindowCanvas) -> Result<(), String> {
        let Some(frame) = self.frames.get(self.current) else {
            return Ok(());
        };
        let (width, height) = self.scaled_size_of(frame);
        canvas
            .window_mut()
            .set_size(width, height)
            .map_err(|e| e.to_string())?;
        canvas.copy(
            &frame.texture,
            None,
            Some(Rect::new(0, 0, width, height)),
        )?;
        Ok(())
    }

    /// Raw handle and scaled size of the current frame, for the
    /// forced-render path. `None` while no frames are loaded.
    pub(crate) fn current_frame_raw(&self) -> Option<(*mut sdl2::sys::SDL_Texture, u32, u32)> {
        let frame = self.frames.get(self.current)?;
        let (width, height) = self.scaled_size_of(frame);
        Some((frame.texture.raw(), width, height))
    }

    fn scaled_size_of(&self, frame: &Frame) -> (u32, u32) {
        let width = (frame.width as f64 * self.scale).round().max(1.0) as u32;
        let height = (frame.height as f64 * self.scale).round().max(1.0) as u32;
        (width, height)
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.max(MIN_SCALE);
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn scale_up(&mut self) {
        self.scale *= SCALE_STEP;
    }

    pub fn scale_down(&mut self) {
        self.scale = (self.scale / SCALE_STEP).max(MIN_SCALE);
    }

    pub fn set_frame_interval(&mut self, interval: Duration) {
        self.frame_interval = interval;
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn frames_path(&self) -> &Path {
        &self.frames_path
    }

    /// Destroy all textures. Safe with zero frames and safe to call more
    /// than once; the frame list is emptied on the first call. Must run on
    /// the owning thread while the renderer is still alive.
    pub fn cleanup(&mut self) {
        let count = self.frames.len();
        for frame in self.frames.drain(..) {
            unsafe { frame.texture.destroy() };
        }
        self.current = 0;
        if count > 0 {
            debug!("Released {count} frame textures");
        }
    }
}
