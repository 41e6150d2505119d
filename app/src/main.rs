use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use valley_core::render::{self, ColorGradient, Lighting};
use valley_core::{ValleyConfig, ValleyPipeline};

#[derive(Parser, Debug)]
#[command(name = "valley")]
#[command(about = "Carve a midpoint-displacement valley into a Perlin heightmap")]
struct Args {
    /// JSON config file; the flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the path offsets
    #[arg(short, long)]
    seed: Option<u64>,

    /// Seed for the noise field
    #[arg(long)]
    noise_seed: Option<u32>,

    /// Subdivision depth (the path holds depth² points)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Field width and height in cells
    #[arg(long)]
    size: Option<usize>,

    /// Grayscale heightmap output
    #[arg(long, default_value = "heightmap.bmp")]
    gray: PathBuf,

    /// Colored heightmap output
    #[arg(long, default_value = "color.bmp")]
    color: PathBuf,

    /// Skip the colored image
    #[arg(long)]
    no_color: bool,

    /// Render colors without shading
    #[arg(long)]
    no_light: bool,

    /// Draw the generated path on the colored image
    #[arg(long)]
    overlay_path: bool,

    /// Print every path point
    #[arg(long)]
    print_path: bool,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn load_config(args: &Args) -> anyhow::Result<ValleyConfig> {
    let mut config = match &args.config {
        Some(path) => ValleyConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ValleyConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(seed) = args.noise_seed {
        config.noise.seed = seed;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(size) = args.size {
        config.noise.width = size;
        config.noise.height = size;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    if args.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let start = Instant::now();
    let pipeline = ValleyPipeline::new(config).context("invalid configuration")?;
    let output = pipeline.run().context("valley generation failed")?;
    tracing::info!(
        "Generated in {:.2} ms (seed {})",
        start.elapsed().as_secs_f32() * 1000.0,
        pipeline.config().seed
    );

    if args.print_path {
        for (i, p) in output.path.points().iter().enumerate() {
            println!("{:>4} {:>10.3} {:>10.3}", i, p.x, p.y);
        }
    }

    let gray = render::render_grayscale(&output.field)?;
    render::save(gray, &args.gray).with_context(|| format!("writing {}", args.gray.display()))?;

    if !args.no_color {
        let lighting = (!args.no_light).then(Lighting::default);
        let mut color = render::render_color(&output.field, &ColorGradient::terrain(), lighting)?;
        if args.overlay_path {
            render::overlay_path(&mut color, &output.path, [255, 0, 0]);
        }
        render::save(color, &args.color)
            .with_context(|| format!("writing {}", args.color.display()))?;
    }

    Ok(())
}
