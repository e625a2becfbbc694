//! Label validation against a taxonomy.
//!
//! This module checks labels for:
//! - Taxonomy conformance (known categories, declared properties and values,
//!   category filters)
//! - Structural integrity (unique object ids and image files)
//! - Geometric validity (enough vertices, finite coordinates inside the unit
//!   frame, object centers inside the ROI)
//!
//! Filter and ROI findings are warnings: [`ImageLabel::clean`] would drop
//! those objects. Polygons still being drawn are warnings too. Everything
//! else is an error.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::error::HoplabelError;
use crate::format::{FileFailure, LabelSet};
use crate::geom::{contains_point, Normalized, Point};
use crate::label::{ImageLabel, ImageLabelPair, ObjectLabel};
use crate::meta::LabelMeta;

/// Tolerance for vertices slightly outside the unit frame.
const BOUNDS_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates every label in `pairs` and returns a report of all issues.
pub fn validate_labels(
    pairs: &[ImageLabelPair],
    meta: &LabelMeta,
    _opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut seen_images: HashSet<&std::path::Path> = HashSet::new();

    for (image, label) in pairs {
        let name = image.to_string_lossy().replace('\\', "/");
        if !seen_images.insert(image.as_path()) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImage,
                "image has more than one label",
                IssueContext::Image {
                    image: name.clone(),
                },
            ));
        }
        validate_label(&name, label, meta, &mut report);
    }

    report
}

/// Validates one label.
pub fn validate_label(image: &str, label: &ImageLabel, meta: &LabelMeta, report: &mut ValidationReport) {
    if let Some(roi) = &label.roi {
        check_points(roi, IssueContext::Roi { image: image.to_string() }, report);
    }

    let roi = label.roi_polygon();
    let mut seen_ids: HashMap<i64, usize> = HashMap::new();

    for (idx, ob) in label.objects.iter().enumerate() {
        let id = ob.id.as_i64();
        let context = || IssueContext::Object {
            image: image.to_string(),
            id,
        };

        if let Some(first_idx) = seen_ids.get(&id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateObjectId,
                format!("Duplicate object ID {} (first seen at index {})", id, first_idx),
                context(),
            ));
        } else {
            seen_ids.insert(id, idx);
        }

        if ob.polygon.len() < 2 {
            report.add(ValidationIssue::warning(
                IssueCode::DegeneratePolygon,
                format!("Polygon has {} vertex(es), at least 2 needed", ob.polygon.len()),
                context(),
            ));
        }

        let finite = check_points(&ob.polygon, context(), report);

        if ob.is_objective() {
            validate_taxonomy(ob, meta, report, &context);
        }

        if finite && !ob.is_roi() && !ob.polygon.is_empty() && !contains_point(&roi, &ob.center()) {
            report.add(ValidationIssue::warning(
                IssueCode::CenterOutsideRoi,
                format!("Center {:?} lies outside the ROI", ob.center()),
                context(),
            ));
        }
    }
}

/// Checks that every point is finite and inside the unit frame. Returns
/// false if any point is not finite.
fn check_points(points: &[Point<Normalized>], context: IssueContext, report: &mut ValidationReport) -> bool {
    if let Some(p) = points.iter().find(|p| !p.is_finite()) {
        report.add(ValidationIssue::error(
            IssueCode::CoordNotFinite,
            format!("Non-finite coordinates ({}, {})", p.x, p.y),
            context,
        ));
        return false;
    }

    let outside = points.iter().filter(|p| {
        p.x < -BOUNDS_TOLERANCE
            || p.y < -BOUNDS_TOLERANCE
            || p.x > 1.0 + BOUNDS_TOLERANCE
            || p.y > 1.0 + BOUNDS_TOLERANCE
    });
    let count = outside.count();
    if count > 0 {
        report.add(ValidationIssue::error(
            IssueCode::CoordOutOfBounds,
            format!("{} vertex(es) outside the unit frame", count),
            context,
        ));
    }
    true
}

fn validate_taxonomy(
    ob: &ObjectLabel,
    meta: &LabelMeta,
    report: &mut ValidationReport,
    context: &dyn Fn() -> IssueContext,
) {
    let cat_id = ob.category.value.id();
    let Ok(cat) = meta.cat_meta(cat_id) else {
        report.add(ValidationIssue::error(
            IssueCode::UnknownCategory,
            format!("Category {} is not in meta '{}'", cat_id, meta.name),
            context(),
        ));
        return;
    };

    if let Err(err) = cat.check(ob) {
        report.add(ValidationIssue::warning(
            IssueCode::FilterRejected,
            format!("Rejected by the '{}' filter: {}", cat.name, err),
            context(),
        ));
    }

    for (name, value) in &ob.properties {
        let prop = match meta.prop_meta(cat_id, name) {
            Ok(prop) => prop,
            Err(err) => {
                report.add(ValidationIssue::error(
                    IssueCode::UndeclaredProperty,
                    err.to_string(),
                    context(),
                ));
                continue;
            }
        };
        // Sentinels are always legal.
        if value.is_normal() && prop.value_meta(value.value).is_err() {
            report.add(ValidationIssue::error(
                IssueCode::UnknownPropertyValue,
                format!("Property '{}' has unknown value {}", name, value.value),
                context(),
            ));
        }
    }
}

/// Counts from cleaning a set.
#[derive(Debug, Default)]
pub struct CleanSummary {
    pub labels: usize,
    /// Objects dropped across all labels.
    pub dropped: usize,
    pub failures: Vec<FileFailure>,
}

/// Applies [`ImageLabel::clean`] to every label of `set` and writes the
/// cleaned labels back.
pub fn clean_dataset(set: &dyn LabelSet, meta: &LabelMeta) -> Result<CleanSummary, HoplabelError> {
    let loaded = set.find_pairs()?;
    let mut pairs = loaded.pairs;
    let mut dropped = 0;
    for (image, label) in pairs.iter_mut() {
        let n = label.clean(meta);
        if n > 0 {
            log::info!("{}: dropped {} object(s)", image.display(), n);
        }
        dropped += n;
    }

    let saved = set.save(&pairs)?;
    let mut failures = loaded.failures;
    failures.extend(saved.failures);
    Ok(CleanSummary {
        labels: saved.labels,
        dropped,
        failures,
    })
}
