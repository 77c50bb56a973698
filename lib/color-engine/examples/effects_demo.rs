/// Renders every color effect of an image into `tmp/`
///
/// cargo run -p color-engine --example effects_demo -- path/to/image.png
use color_engine::{ColorEffect, Effect, RasterBuffer};
use image::{ImageReader, Rgb};
use std::{path::Path, time::Instant};

fn gradient(width: u32, height: u32) -> RasterBuffer {
    RasterBuffer::from_fn(width, height, |x, y| {
        let r = (x * 255 / width) as u8;
        let g = (y * 255 / height) as u8;
        let b = ((x + y) * 255 / (width + height)) as u8;
        Rgb([r, g, b])
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    let img = match std::env::args().nth(1) {
        Some(path) => color_engine::normalize(ImageReader::open(path)?.decode()?),
        None => gradient(800, 600),
    };

    for effect in ColorEffect::ALL {
        let start = Instant::now();
        let out = effect.apply(img.clone());
        let elapsed = start.elapsed();

        let path = output_dir.join(format!("{}_effect.png", effect.name()));
        out.save(&path)?;

        println!(
            "✓ {:<10} {:>8.2} ms  {}",
            effect.name(),
            elapsed.as_secs_f64() * 1000.0,
            path.display()
        );
    }

    Ok(())
}
