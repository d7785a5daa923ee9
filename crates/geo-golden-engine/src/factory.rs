//! Deterministic snapshot capture from a live dataset.
//!
//! Used when authoring a new fixture: the factory copies the structural
//! properties of a dataset verbatim and samples a reproducible subset of its
//! pixels, geolocations and metadata attributes.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use geo_golden_core::{
    ContentSnapshot, Dataset, GeoCoding, GeoSample, MetadataSample, PixelPos, PixelSample, Raster,
    RasterSnapshot, SceneSize, VectorSnapshot,
};

use crate::metadata_path::flatten;
use crate::random::{RandomSource, Xorshift64};

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Seed of every random stream
    pub seed: u64,
    /// Pixel samples per raster
    pub pixel_samples: usize,
    /// Geolocation samples for the scene and for each separately geocoded raster
    pub geo_samples: usize,
    /// Sampled metadata attributes
    pub metadata_samples: usize,
    /// Capture min, max and histogram
    pub statistics: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            pixel_samples: 10,
            geo_samples: 5,
            metadata_samples: 10,
            statistics: true,
        }
    }
}

/// Creates the random stream for a seed.
pub type SourceFactory = Arc<dyn Fn(u64) -> Box<dyn RandomSource> + Send + Sync>;

/// Builds a `ContentSnapshot` from a dataset.
///
/// Every sampling step draws from its own stream: the scene geolocations and
/// the metadata use `seed`, raster `i` uses `seed + i`.
#[derive(Clone)]
pub struct SnapshotFactory {
    options: SnapshotOptions,
    source: SourceFactory,
}

impl std::fmt::Debug for SnapshotFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotFactory")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for SnapshotFactory {
    fn default() -> Self {
        Self::new(SnapshotOptions::default())
    }
}

impl SnapshotFactory {
    /// Create a factory drawing from [`Xorshift64`] streams.
    pub fn new(options: SnapshotOptions) -> Self {
        Self::with_source(
            options,
            Arc::new(|seed: u64| Box::new(Xorshift64::new(seed)) as Box<dyn RandomSource>),
        )
    }

    /// Create a factory drawing from streams made by `source`.
    pub fn with_source(options: SnapshotOptions, source: SourceFactory) -> Self {
        Self { options, source }
    }

    fn stream(&self, seed: u64) -> Box<dyn RandomSource> {
        (self.source)(seed)
    }

    /// Sampling parameters in use.
    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// Capture a snapshot. The same dataset and seed always give the same result.
    pub fn create(&self, dataset: &dyn Dataset) -> ContentSnapshot {
        let seed = self.options.seed;
        debug!("Capturing snapshot of '{}' with seed {}", dataset.name(), seed);

        let geo_locations = dataset.geo_coding().map(|coding| {
            let mut rng = self.stream(seed);
            self.geo_samples(coding, dataset.scene_size(), rng.as_mut())
        });

        let codings = dataset.sample_codings();

        let rasters = dataset
            .rasters()
            .into_iter()
            .enumerate()
            .map(|(i, raster)| self.raster_snapshot(raster, seed.wrapping_add(i as u64)))
            .collect();

        let vectors = dataset
            .vectors()
            .into_iter()
            .map(|layer| VectorSnapshot {
                name: layer.name().to_string(),
                description: layer.description().map(str::to_string),
                feature_count: match layer.feature_count() {
                    Ok(count) => Some(count),
                    Err(e) => {
                        warn!("Feature count of '{}' not captured: {}", layer.name(), e);
                        None
                    }
                },
            })
            .collect();

        ContentSnapshot {
            name: Some(dataset.name().to_string()),
            description: dataset.description().map(str::to_string),
            product_type: Some(dataset.product_type().to_string()),
            scene_size: Some(dataset.scene_size()),
            start_time: dataset.start_time(),
            end_time: dataset.end_time(),
            geo_locations,
            sample_codings: (!codings.is_empty()).then_some(codings),
            rasters: Some(rasters),
            vectors: Some(vectors),
            metadata: Some(self.metadata_samples(dataset)),
        }
    }

    fn raster_snapshot(&self, raster: &dyn Raster, seed: u64) -> RasterSnapshot {
        let mut rng = self.stream(seed);
        let size = raster.size();

        let mut pixel_samples = Vec::new();
        if size.pixel_count() > 0 {
            for _ in 0..self.options.pixel_samples {
                let (x, y) = random_pixel(size, rng.as_mut());
                match raster.read_pixel(x, y) {
                    Ok(value) => pixel_samples.push(PixelSample::new(centre(x, y), value)),
                    Err(e) => {
                        warn!("Pixel ({}, {}) of '{}' not sampled: {}", x, y, raster.name(), e)
                    }
                }
            }
        }

        let geo_locations = raster
            .geo_coding()
            .map(|coding| self.geo_samples(coding, size, rng.as_mut()));

        let mut snapshot = RasterSnapshot {
            name: raster.name().to_string(),
            description: raster.description().map(str::to_string),
            size: Some(size),
            data_type: Some(raster.data_type()),
            raster_kind: Some(raster.kind()),
            no_data_value: Some(raster.no_data_value()),
            no_data_value_used: Some(raster.is_no_data_value_used()),
            valid_pixel_expression: raster.valid_pixel_expression().map(str::to_string),
            pixel_samples: Some(pixel_samples),
            geo_locations,
            ..RasterSnapshot::default()
        };

        if self.options.statistics {
            match raster.statistics() {
                Ok(stats) => {
                    snapshot.min = Some(stats.min);
                    snapshot.max = Some(stats.max);
                    snapshot.histogram_bins = Some(stats.histogram);
                }
                Err(e) => warn!("Statistics of '{}' not captured: {}", raster.name(), e),
            }
        }

        snapshot
    }

    /// Pixel-centre samples; positions outside the transform's domain are dropped.
    fn geo_samples(
        &self,
        coding: &dyn GeoCoding,
        size: SceneSize,
        rng: &mut dyn RandomSource,
    ) -> Vec<GeoSample> {
        if size.pixel_count() == 0 {
            return Vec::new();
        }
        (0..self.options.geo_samples)
            .filter_map(|_| {
                let (x, y) = random_pixel(size, rng);
                let pixel = centre(x, y);
                let geo = coding.geo_pos(pixel);
                geo.is_valid().then(|| GeoSample::new(pixel, geo))
            })
            .collect()
    }

    fn metadata_samples(&self, dataset: &dyn Dataset) -> Vec<MetadataSample> {
        let attributes = flatten(dataset.metadata());
        let wanted = self.options.metadata_samples;

        let chosen: BTreeSet<usize> = if attributes.len() <= wanted {
            (0..attributes.len()).collect()
        } else {
            let mut rng = self.stream(self.options.seed);
            let mut chosen = BTreeSet::new();
            // duplicates are skipped, so bound the number of draws
            for _ in 0..wanted * 8 {
                if chosen.len() == wanted {
                    break;
                }
                chosen.insert(rng.next_below(attributes.len() as u64) as usize);
            }
            chosen
        };

        chosen
            .into_iter()
            .map(|i| {
                let (path, attribute) = &attributes[i];
                MetadataSample::new(path.clone(), attribute.value.clone())
            })
            .collect()
    }
}

fn random_pixel(size: SceneSize, rng: &mut dyn RandomSource) -> (u32, u32) {
    let x = rng.next_below(size.width as u64) as u32;
    let y = rng.next_below(size.height as u64) as u32;
    (x, y)
}

fn centre(x: u32, y: u32) -> PixelPos {
    PixelPos::new(x as f64 + 0.5, y as f64 + 0.5)
}
