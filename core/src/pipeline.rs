use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::carve::{CarveStats, HeightmapCarver};
use crate::config::ValleyConfig;
use crate::error::Result;
use crate::field::{HeightField, PlaneFieldBuilder, perlin_source};
use crate::path::{PathGenerator, Polyline};

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct ValleyOutput {
    pub path: Polyline,
    pub field: HeightField,
    pub stats: CarveStats,
}

/// Validated config plus the steps that turn it into a carved field.
#[derive(Debug, Clone)]
pub struct ValleyPipeline {
    config: ValleyConfig,
}

impl ValleyPipeline {
    pub fn new(config: ValleyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValleyConfig {
        &self.config
    }

    // Seeded once here so the same config always yields the same path
    pub fn generate_path(&self) -> Result<Polyline> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        PathGenerator::from_config(&self.config).generate(
            self.config.depth,
            self.config.start,
            self.config.end,
            &mut rng,
        )
    }

    pub fn build_field(&self) -> Result<HeightField> {
        let noise = &self.config.noise;
        PlaneFieldBuilder::from_config(noise).build(&perlin_source(noise))
    }

    pub fn run(&self) -> Result<ValleyOutput> {
        tracing::info!(
            seed = self.config.seed,
            depth = self.config.depth,
            width = self.config.noise.width,
            height = self.config.noise.height,
            "starting valley run"
        );
        let field = self.build_field()?;
        self.run_on(field)
    }

    // Carve a field supplied by the caller instead of the configured noise
    pub fn run_on(&self, mut field: HeightField) -> Result<ValleyOutput> {
        // A failed path never reaches the carver
        let path = self.generate_path()?;
        let carver = HeightmapCarver::from_config(&self.config)?;
        let stats = carver.carve(&mut field, &path)?;
        Ok(ValleyOutput { path, field, stats })
    }
}
