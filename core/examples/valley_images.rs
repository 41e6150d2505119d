// Generates and saves the stages of one valley run:
// Base Perlin field
// Carved field, grayscale
// Carved field, colored and lit, with the path drawn on top

use valley_core::render::{ColorGradient, Lighting, overlay_path, render_color, render_grayscale, save};
use valley_core::{ValleyConfig, ValleyPipeline};

fn main() -> valley_core::Result<()> {
    let pipeline = ValleyPipeline::new(ValleyConfig::default())?;

    // 1) Base noise, before the valley
    let base = pipeline.build_field()?;
    save(render_grayscale(&base)?, "valley_base.png")?;

    // 2) Carved grayscale
    let out = pipeline.run_on(base)?;
    save(render_grayscale(&out.field)?, "valley_gray.png")?;
    println!(
        "Carved {} of {} cells, path of {} points",
        out.stats.lowered,
        out.stats.cells,
        out.path.len()
    );

    // 3) Colored + lit, path overlay
    let mut color = render_color(&out.field, &ColorGradient::terrain(), Some(Lighting::default()))?;
    overlay_path(&mut color, &out.path, [255, 0, 0]);
    save(color, "valley_color.png")?;
    Ok(())
}
