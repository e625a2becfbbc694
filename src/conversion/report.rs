//! Conversion report types for tracking lossiness and policy decisions.
//!
//! This module provides structured reporting for format conversions,
//! similar to how `validation::ValidationReport` tracks label issues.

use serde::Serialize;
use std::fmt;

/// A report generated during format conversion.
///
/// Tracks input/output counts, lossiness warnings, and policy decisions
/// to help users understand exactly what happened during conversion.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Source format name.
    pub from: String,
    /// Target format name.
    pub to: String,
    /// Counts read from the source set.
    pub input: ConversionCounts,
    /// Counts written to the target set.
    pub output: ConversionCounts,
    /// Issues discovered while converting.
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues (true lossiness).
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .count()
    }

    /// Count of info-level issues (policy decisions, notes).
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Info)
            .count()
    }

    /// Returns true if any warning-level issue was recorded.
    pub fn is_lossy(&self) -> bool {
        self.warning_count() > 0
    }

    pub fn lossy_messages(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .map(|i| i.message.as_str())
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} -> {}: {} images, {} objects",
            self.from, self.to, self.input.images, self.input.objects
        )?;

        if self.output != self.input {
            writeln!(
                f,
                "  output: {} images, {} objects",
                self.output.images, self.output.objects
            )?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for message in self.lossy_messages() {
                writeln!(f, "  - {}", message)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    pub images: usize,
    pub objects: usize,
}

/// A single issue discovered during conversion.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    pub message: String,
}

impl ConversionIssue {
    pub fn warning(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    /// Information was lost or a file was skipped.
    Warning,
    /// A policy note; nothing was lost.
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON report and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    // File-level failures
    /// A source label file could not be read.
    SkippedInputFile,
    /// A target label file could not be written.
    FailedOutputFile,

    // Lossiness
    /// Objects whose category the target cannot store were not written.
    DropNonObjectiveObjects,
    /// Object properties have no equivalent in the target format.
    DropProperties,
    /// The ROI polygon has no equivalent in the target format.
    DropRoi,
    /// Polygons are reduced to their bounding boxes.
    PolygonToBox,
    /// Label bookkeeping (user agent, dates, host, sensor) is not kept.
    DropLabelMetadata,

    // Policy decisions (Info level)
    /// Readers without object ids number objects by line order.
    ReaderIdAssignment,
    /// Darknet writer outputs normalized floats at 6 decimal places.
    DarknetWriterFloatPrecision,
    /// Darknet labels were cropped to each image's ROI.
    DarknetWriterCropToRoi,
    /// KITTI writer sets every 3D field to zero.
    KittiWriterZeroFields,
    /// Where the target set's images come from.
    ImagePlacement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_not_lossy() {
        let report = ConversionReport::new("darknet", "hop");
        assert!(!report.is_lossy());
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.info_count(), 0);
    }

    #[test]
    fn warning_makes_report_lossy() {
        let mut report = ConversionReport::new("hop", "darknet");
        report.add(ConversionIssue::warning(
            ConversionIssueCode::DropProperties,
            "3 object(s) carry properties that will be dropped",
        ));
        report.add(ConversionIssue::info(
            ConversionIssueCode::ImagePlacement,
            "source images are hard-linked, or copied, into the target set",
        ));
        assert!(report.is_lossy());
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.info_count(), 1);
        assert_eq!(report.lossy_messages().count(), 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = ConversionReport::new("hop", "kitti");
        report.input = ConversionCounts {
            images: 10,
            objects: 50,
        };
        report.add(ConversionIssue::warning(
            ConversionIssueCode::DropRoi,
            "ROI polygons will be dropped",
        ));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"from\":\"hop\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"code\":\"drop_roi\""));
    }

    #[test]
    fn display_shows_output_only_when_different() {
        let mut report = ConversionReport::new("hop", "darknet");
        report.input = ConversionCounts {
            images: 2,
            objects: 4,
        };
        report.output = report.input.clone();
        assert!(!report.to_string().contains("output:"));
        report.output.objects = 3;
        assert!(report.to_string().contains("output: 2 images, 3 objects"));
    }
}
