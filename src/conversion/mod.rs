//! Whole-dataset conversion between label formats.
//!
//! A conversion reads every pair of a source set, analyzes what the target
//! format can not hold, writes the target set, and reports both. Per-file
//! failures on either side become report warnings; the run itself only
//! fails when a set can not be opened or written at all.

pub mod report;

pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity,
};

use std::path::Path;

use crate::error::HoplabelError;
use crate::format::{label_set_for, open_label_set, FileFailure, LabelFormat, SetOptions};
use crate::label::ImageLabelPair;

/// Classification of how lossy a format is relative to native labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lossiness {
    /// Holds everything a native label holds.
    Lossless,
    /// Always loses polygons, properties and label metadata.
    Lossy,
}

/// How lossy `format` is relative to native labels.
pub fn lossiness(format: LabelFormat) -> Lossiness {
    match format {
        LabelFormat::Hop => Lossiness::Lossless,
        LabelFormat::Darknet | LabelFormat::Coco | LabelFormat::Kitti => Lossiness::Lossy,
    }
}

/// Builds the report of converting `pairs` from `from` to `to`, before
/// anything is written.
pub fn build_conversion_report(
    pairs: &[ImageLabelPair],
    from: LabelFormat,
    to: LabelFormat,
    opts: &SetOptions,
) -> ConversionReport {
    let mut report = ConversionReport::new(from.name(), to.name());
    report.input = ConversionCounts {
        images: pairs.len(),
        objects: pairs.iter().map(|(_, l)| l.objects.len()).sum(),
    };

    if lossiness(to) == Lossiness::Lossy {
        analyze_lossy_target(pairs, to, &mut report);
    }

    if matches!(from, LabelFormat::Darknet | LabelFormat::Kitti) {
        report.add(ConversionIssue::info(
            ConversionIssueCode::ReaderIdAssignment,
            format!("{from} reader numbers objects from 1 in line order"),
        ));
    }

    match to {
        LabelFormat::Darknet => {
            report.add(ConversionIssue::info(
                ConversionIssueCode::DarknetWriterFloatPrecision,
                "Darknet writer outputs normalized floats at 6 decimal places",
            ));
            if opts.crop_roi {
                report.add(ConversionIssue::info(
                    ConversionIssueCode::DarknetWriterCropToRoi,
                    "labels are cropped to each image's ROI; windows are listed in crop_windows.json",
                ));
            }
        }
        LabelFormat::Kitti => report.add(ConversionIssue::info(
            ConversionIssueCode::KittiWriterZeroFields,
            "KITTI writer sets truncation, occlusion and every 3D field to zero",
        )),
        LabelFormat::Hop | LabelFormat::Coco => {}
    }
    report.add(ConversionIssue::info(
        ConversionIssueCode::ImagePlacement,
        match to {
            LabelFormat::Coco => "COCO file names point at the source images, which stay in place",
            _ => "source images are hard-linked, or copied, into the target set",
        },
    ));

    report
}

fn analyze_lossy_target(pairs: &[ImageLabelPair], to: LabelFormat, report: &mut ConversionReport) {
    let objects = || pairs.iter().flat_map(|(_, l)| l.objects.iter());

    // KITTI keeps excluded regions as DontCare.
    let unwritable = objects()
        .filter(|o| !o.is_objective())
        .filter(|o| !(to == LabelFormat::Kitti && o.category.is_excluded()))
        .count();
    if unwritable > 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::DropNonObjectiveObjects,
            format!("{unwritable} object(s) without an objective category will not be written"),
        ));
    }

    let with_props = objects().filter(|o| !o.properties.is_empty()).count();
    if with_props > 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::DropProperties,
            format!("{with_props} object(s) carry properties that will be dropped"),
        ));
    }

    let polygons = objects()
        .filter(|o| o.polygon.len() != 4 || o.polygon != o.rect().vertexes())
        .count();
    if polygons > 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::PolygonToBox,
            format!("{polygons} non-rectangular polygon(s) will be reduced to boxes"),
        ));
    }

    let with_roi = pairs.iter().filter(|(_, l)| l.roi.is_some()).count();
    if with_roi > 0 {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::DropRoi,
            format!("{with_roi} ROI polygon(s) will be dropped"),
        ));
    }

    if !pairs.is_empty() {
        report.add(ConversionIssue::warning(
            ConversionIssueCode::DropLabelMetadata,
            "user agent, dates, host and sensor are not kept",
        ));
    }
}

fn add_failures(report: &mut ConversionReport, code: ConversionIssueCode, failures: &[FileFailure]) {
    for failure in failures {
        report.add(ConversionIssue::warning(code, failure.to_string()));
    }
}

/// Converts the set at `src` into a new set of `dst_format` at `dst`.
///
/// `src_format` of `None` detects the source format.
pub fn convert_dataset(
    src: &Path,
    src_format: Option<LabelFormat>,
    dst: &Path,
    dst_format: LabelFormat,
    opts: &SetOptions,
) -> Result<ConversionReport, HoplabelError> {
    let source = open_label_set(src, src_format, opts)?;
    let loaded = source.find_pairs()?;

    let mut report = build_conversion_report(&loaded.pairs, source.format(), dst_format, opts);
    add_failures(
        &mut report,
        ConversionIssueCode::SkippedInputFile,
        &loaded.failures,
    );

    let target = label_set_for(dst_format, dst, opts);
    let summary = target.save(&loaded.pairs)?;
    report.output = ConversionCounts {
        images: summary.labels,
        objects: summary.objects,
    };
    add_failures(
        &mut report,
        ConversionIssueCode::FailedOutputFile,
        &summary.failures,
    );

    log::info!(
        "converted {} -> {}: {} of {} label(s) written",
        src.display(),
        dst.display(),
        report.output.images,
        report.input.images
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point, Rect};
    use crate::label::{Category, ImageLabel, ObjectId, ObjectLabel};
    use std::path::PathBuf;

    fn sample_pairs() -> Vec<ImageLabelPair> {
        let mut label = ImageLabel::only_roi("test", 0);
        let mut car = ObjectLabel::new(
            ObjectId::new(1),
            Category::Objective(0),
            1.0,
            Rect::new(0.1, 0.1, 0.2, 0.2).vertexes(),
        );
        car.set_prop("color", 1, 1.0);
        label.objects.push(car);
        label.objects.push(ObjectLabel::new(
            ObjectId::new(2),
            Category::Pending,
            2.0,
            vec![
                Point::new(0.5, 0.5),
                Point::new(0.6, 0.5),
                Point::new(0.55, 0.6),
            ],
        ));
        vec![(PathBuf::from("image/a.jpg"), label)]
    }

    #[test]
    fn native_target_is_not_lossy() {
        let report = build_conversion_report(
            &sample_pairs(),
            LabelFormat::Hop,
            LabelFormat::Hop,
            &SetOptions::default(),
        );
        assert!(!report.is_lossy());
        assert_eq!(report.input.objects, 2);
    }

    #[test]
    fn darknet_target_reports_every_loss() {
        let report = build_conversion_report(
            &sample_pairs(),
            LabelFormat::Hop,
            LabelFormat::Darknet,
            &SetOptions::default(),
        );
        let codes: Vec<ConversionIssueCode> = report.issues.iter().map(|i| i.code).collect();
        for code in [
            ConversionIssueCode::DropNonObjectiveObjects,
            ConversionIssueCode::DropProperties,
            ConversionIssueCode::PolygonToBox,
            ConversionIssueCode::DropRoi,
            ConversionIssueCode::DarknetWriterFloatPrecision,
        ] {
            assert!(codes.contains(&code), "missing {code:?}");
        }
    }

    #[test]
    fn darknet_source_adds_id_note() {
        let report = build_conversion_report(
            &[],
            LabelFormat::Darknet,
            LabelFormat::Hop,
            &SetOptions::default(),
        );
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == ConversionIssueCode::ReaderIdAssignment));
    }

    #[test]
    fn convert_native_to_darknet() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let src = temp.path().join("src");
        let opts = SetOptions::new(1);
        label_set_for(LabelFormat::Hop, &src, &opts)
            .save(&sample_pairs())
            .expect("seed native set");

        let dst = temp.path().join("dst");
        let report =
            convert_dataset(&src, None, &dst, LabelFormat::Darknet, &opts).expect("convert");
        assert_eq!(report.from, "hop");
        assert_eq!(report.output.images, 1);
        assert_eq!(report.output.objects, 1);
        assert!(dst.join("labels/a.txt").is_file());
    }
}
