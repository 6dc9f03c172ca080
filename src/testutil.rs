//! Shared test fixtures: headless SDL contexts and frame-directory builders.

use std::path::Path;

use sdl2::render::WindowCanvas;

/// Create a hidden window and renderer on SDL's `dummy` video driver, so
/// tests run without a display server. The returned `Sdl` context must stay
/// alive for as long as the canvas is used.
pub fn sdl_canvas() -> (sdl2::Sdl, WindowCanvas) {
    // SAFETY: tests touching SDL are serialized with #[serial]; no other
    // thread reads the environment concurrently.
    unsafe { std::env::set_var("SDL_VIDEODRIVER", "dummy") };
    let sdl = sdl2::init().expect("SDL init");
    let video = sdl.video().expect("video subsystem");
    let window = video
        .window("deskling-test", 64, 64)
        .hidden()
        .build()
        .expect("window");
    let canvas = window.into_canvas().build().expect("canvas");
    (sdl, canvas)
}

/// Write small valid PNG frames with the given filenames into `dir`,
/// creating the directory first if needed.
pub fn write_frames(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).expect("create frames dir");
    for name in names {
        let path = dir.join(name);
        let jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
        if jpeg {
            // The JPEG encoder rejects alpha channels.
            let image = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 128, 0]));
            image.save(path).expect("write frame");
        } else {
            let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 128, 0, 255]));
            image.save(path).expect("write frame");
        }
    }
}

/// Write a file that looks like a frame but cannot be decoded.
pub fn write_garbage(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir).expect("create frames dir");
    std::fs::write(dir.join(name), b"definitely not an image").expect("write garbage");
}
