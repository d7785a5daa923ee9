//! Geocoding round-trip checks.

use geo_golden_core::{GeoCoding, GeoSample, Violation, ViolationKind};

use super::fuzzy::fuzzy_equals;

/// Check samples against a geocoding in both directions.
///
/// Pixel -> geo and geo -> pixel are compared independently, so a defect in
/// only one direction of a transform is still reported.
pub(crate) fn check_geo_samples(
    kind: ViolationKind,
    owner: &str,
    geo_coding: Option<&dyn GeoCoding>,
    samples: &[GeoSample],
) -> Vec<Violation> {
    if samples.is_empty() {
        return Vec::new();
    }
    let Some(geo_coding) = geo_coding else {
        return vec![Violation::new(kind, "expected a geocoding but none is present")
            .with_subject(owner.to_string())];
    };

    let mut violations = Vec::new();
    for (i, sample) in samples.iter().enumerate() {
        let subject = format!("{owner} geoLocation[{i}]");

        let actual_geo = geo_coding.geo_pos(sample.pixel_pos);
        if !fuzzy_equals(sample.geo_pos.lat, actual_geo.lat, sample.forward_eps)
            || !fuzzy_equals(sample.geo_pos.lon, actual_geo.lon, sample.forward_eps)
        {
            violations.push(
                Violation::mismatch(
                    kind,
                    format!("geo position at pixel {} differs", sample.pixel_pos),
                    sample.geo_pos,
                    actual_geo,
                )
                .with_subject(subject.clone())
                .with_tolerance(sample.forward_eps),
            );
        }

        let actual_pixel = geo_coding.pixel_pos(sample.geo_pos);
        if !fuzzy_equals(sample.pixel_pos.x, actual_pixel.x, sample.inverse_eps)
            || !fuzzy_equals(sample.pixel_pos.y, actual_pixel.y, sample.inverse_eps)
        {
            violations.push(
                Violation::mismatch(
                    kind,
                    format!("pixel position at geo {} differs", sample.geo_pos),
                    sample.pixel_pos,
                    actual_pixel,
                )
                .with_subject(subject)
                .with_tolerance(sample.inverse_eps),
            );
        }
    }
    violations
}
