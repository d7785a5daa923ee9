//! Raster checks: properties, pixel samples, geolocations and statistics.

use geo_golden_core::{
    ContentSnapshot, Dataset, PixelSample, Raster, RasterSnapshot, Violation, ViolationKind,
    DEFAULT_EPS,
};

use super::fuzzy::{fuzzy_equals, STATISTICS_EPS};
use super::geo::check_geo_samples;
use super::{check_text, ContentCheck};

/// All expected rasters, each checked independently of the others.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCheck;

impl ContentCheck for RasterCheck {
    fn name(&self) -> &'static str {
        "rasters"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        let Some(rasters) = expected.rasters.as_deref() else {
            return Vec::new();
        };

        let mut violations = Vec::new();
        for (i, expected_raster) in rasters.iter().enumerate() {
            let subject = format!("raster[{i}] '{}'", expected_raster.name);
            match dataset.raster(&expected_raster.name) {
                Some(raster) => violations.extend(check_raster(&subject, raster, expected_raster)),
                None => violations.push(
                    Violation::new(ViolationKind::Raster, "raster not found").with_subject(subject),
                ),
            }
        }
        violations
    }
}

fn check_raster(subject: &str, raster: &dyn Raster, expected: &RasterSnapshot) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();
    let tag = |v: Violation| v.with_subject(subject.to_string());

    if let Some(v) = check_text(
        ViolationKind::Raster,
        "description",
        expected.description.as_deref(),
        raster.description(),
    ) {
        violations.push(tag(v));
    }

    if let Some(size) = expected.size {
        if size != raster.size() {
            violations.push(tag(Violation::mismatch(
                ViolationKind::Raster,
                "raster size differs",
                size,
                raster.size(),
            )));
        }
    }

    if let Some(data_type) = expected.data_type {
        if data_type != raster.data_type() {
            violations.push(tag(Violation::mismatch(
                ViolationKind::Raster,
                "data type differs",
                data_type,
                raster.data_type(),
            )));
        }
    }

    if let Some(kind) = expected.raster_kind {
        if kind != raster.kind() {
            violations.push(tag(Violation::mismatch(
                ViolationKind::Raster,
                "raster kind differs",
                kind,
                raster.kind(),
            )));
        }
    }

    if let Some(no_data) = expected.no_data_value {
        if !fuzzy_equals(no_data, raster.no_data_value(), DEFAULT_EPS) {
            violations.push(tag(Violation::mismatch(
                ViolationKind::Raster,
                "no-data value differs",
                no_data,
                raster.no_data_value(),
            )
            .with_tolerance(DEFAULT_EPS)));
        }
    }

    if let Some(used) = expected.no_data_value_used {
        if used != raster.is_no_data_value_used() {
            violations.push(tag(Violation::mismatch(
                ViolationKind::Raster,
                "no-data usage differs",
                used,
                raster.is_no_data_value_used(),
            )));
        }
    }

    if let Some(v) = check_text(
        ViolationKind::Raster,
        "valid-pixel expression",
        expected.valid_pixel_expression.as_deref(),
        raster.valid_pixel_expression(),
    ) {
        violations.push(tag(v));
    }

    for (j, sample) in expected.pixel_samples.iter().flatten().enumerate() {
        if let Some(v) = check_pixel(raster, j, sample) {
            violations.push(tag(v));
        }
    }

    violations.extend(check_geo_samples(
        ViolationKind::Raster,
        subject,
        raster.geo_coding(),
        expected.geo_locations.as_deref().unwrap_or_default(),
    ));

    violations.extend(check_statistics(raster, expected).into_iter().map(tag));

    violations
}

fn check_pixel(raster: &dyn Raster, index: usize, sample: &PixelSample) -> Option<Violation> {
    let what = format!("pixelSample[{index}] at {}", sample.pixel_pos);

    let Some((x, y)) = sample
        .pixel_pos
        .to_index()
        .filter(|(x, y)| raster.size().contains(*x, *y))
    else {
        return Some(Violation::new(
            ViolationKind::Raster,
            format!("{what} lies outside the {} raster", raster.size()),
        ));
    };

    match raster.read_pixel(x, y) {
        Ok(actual) if fuzzy_equals(sample.value, actual, sample.eps) => None,
        Ok(actual) => Some(
            Violation::mismatch(
                ViolationKind::Raster,
                format!("{what} value differs"),
                sample.value,
                actual,
            )
            .with_tolerance(sample.eps),
        ),
        Err(e) => Some(Violation::new(
            ViolationKind::Raster,
            format!("{what} could not be read: {e}"),
        )),
    }
}

/// Min, max and histogram share one statistics computation.
fn check_statistics(raster: &dyn Raster, expected: &RasterSnapshot) -> Vec<Violation> {
    if expected.min.is_none() && expected.max.is_none() && expected.histogram_bins.is_none() {
        return Vec::new();
    }

    let stats = match raster.statistics() {
        Ok(stats) => stats,
        Err(e) => {
            return vec![Violation::new(
                ViolationKind::Raster,
                format!("statistics could not be computed: {e}"),
            )]
        }
    };

    let mut violations = Vec::new();
    for (label, expected_value, actual) in [
        ("minimum", expected.min, stats.min),
        ("maximum", expected.max, stats.max),
    ] {
        if let Some(expected_value) = expected_value {
            if !fuzzy_equals(expected_value, actual, STATISTICS_EPS) {
                violations.push(
                    Violation::mismatch(
                        ViolationKind::Raster,
                        format!("{label} differs"),
                        expected_value,
                        actual,
                    )
                    .with_tolerance(STATISTICS_EPS),
                );
            }
        }
    }

    // bins are discrete counts, compared exactly
    if let Some(bins) = &expected.histogram_bins {
        if bins != &stats.histogram {
            let detail = match first_difference(bins, &stats.histogram) {
                Some(bin) => format!("histogram differs at bin {bin}"),
                None => "histogram differs".to_string(),
            };
            violations.push(Violation::mismatch(
                ViolationKind::Raster,
                detail,
                format!("{} bins", bins.len()),
                format!("{} bins", stats.histogram.len()),
            ));
        }
    }

    violations
}

fn first_difference(a: &[u64], b: &[u64]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{AffineGeoCoding, MemoryDataset, MemoryRaster};
    use geo_golden_core::{DataType, GeoPos, GeoSample, PixelPos, RasterKind, SceneSize};

    fn dataset() -> MemoryDataset {
        let mut dataset = MemoryDataset::new("p", "T", SceneSize::new(3, 2));
        let mut band = MemoryRaster::new(
            "band_1",
            SceneSize::new(3, 2),
            vec![1.0, 2.0, 3.0, 4.0, -1.0, f64::NAN],
        );
        band.no_data_value = -1.0;
        band.no_data_value_used = true;
        band.geo_coding = Some(AffineGeoCoding::new(10.0, 20.0, 1.0, 1.0));
        dataset.rasters.push(band);
        dataset
    }

    fn check(expected: RasterSnapshot) -> Vec<Violation> {
        RasterCheck.check(
            &dataset(),
            &ContentSnapshot {
                rasters: Some(vec![expected]),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_presence_only() {
        assert!(check(RasterSnapshot::named("band_1")).is_empty());
        let missing = check(RasterSnapshot::named("band_9"));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].message, "raster not found");
    }

    #[test]
    fn test_properties() {
        let violations = check(RasterSnapshot {
            size: Some(SceneSize::new(3, 2)),
            data_type: Some(DataType::Float64),
            raster_kind: Some(RasterKind::Mask),
            no_data_value: Some(-1.0),
            no_data_value_used: Some(false),
            ..RasterSnapshot::named("band_1")
        });
        let messages: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(messages, vec!["raster kind differs", "no-data usage differs"]);
    }

    #[test]
    fn test_pixel_samples() {
        let violations = check(RasterSnapshot {
            pixel_samples: Some(vec![
                PixelSample::new(PixelPos::new(0.5, 0.5), 1.0),
                PixelSample::new(PixelPos::new(2.5, 1.5), f64::NAN),
                PixelSample::new(PixelPos::new(1.5, 0.5), 2.5),
                PixelSample::new(PixelPos::new(7.5, 0.5), 0.0),
            ]),
            ..RasterSnapshot::named("band_1")
        });
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.starts_with("pixelSample[2]"));
        assert_eq!(violations[0].tolerance, Some(DEFAULT_EPS));
        assert!(violations[1].message.contains("outside"));
    }

    #[test]
    fn test_statistics_exclude_no_data() {
        let violations = check(RasterSnapshot {
            min: Some(1.0),
            max: Some(4.0),
            ..RasterSnapshot::named("band_1")
        });
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_histogram_is_exact() {
        let ds = dataset();
        let mut bins = ds.rasters[0].statistics().unwrap().histogram;
        assert!(check(RasterSnapshot {
            histogram_bins: Some(bins.clone()),
            ..RasterSnapshot::named("band_1")
        })
        .is_empty());

        bins[0] += 1;
        let violations = check(RasterSnapshot {
            histogram_bins: Some(bins),
            ..RasterSnapshot::named("band_1")
        });
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "histogram differs at bin 0");
    }

    #[test]
    fn test_raster_geolocations() {
        let violations = check(RasterSnapshot {
            geo_locations: Some(vec![GeoSample::new(
                PixelPos::new(0.5, 0.5),
                GeoPos::new(9.5, 20.5),
            )]),
            ..RasterSnapshot::named("band_1")
        });
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[1, 2], &[1, 3]), Some(1));
        assert_eq!(first_difference(&[1, 2], &[1, 2, 0]), Some(2));
        assert_eq!(first_difference(&[1, 2], &[1, 2]), None);
    }
}
