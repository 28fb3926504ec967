use crate::engine::AnalysisReport;
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const RISKS_FILE: &str = "risks.json";
pub const CATEGORIES_FILE: &str = "risk-categories.json";
pub const STATISTICS_FILE: &str = "statistics.json";
pub const REPORT_FILE: &str = "report.json";

pub struct JsonExporter;

impl JsonExporter {
    /// Write the risk list, category catalog, statistics and full report
    /// into `dir`, creating it when missing. Returns the written paths.
    pub fn export(report: &AnalysisReport, dir: &Path) -> ThreatGraphResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| ThreatGraphError::io(e, Some(dir.to_path_buf())))?;

        let written = vec![
            Self::write(&dir.join(RISKS_FILE), &report.risks)?,
            Self::write(&dir.join(CATEGORIES_FILE), &report.categories)?,
            Self::write(&dir.join(STATISTICS_FILE), &report.statistics)?,
            Self::write(&dir.join(REPORT_FILE), report)?,
        ];
        log::info!("Wrote {} JSON files to {:?}", written.len(), dir);
        Ok(written)
    }

    fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> ThreatGraphResult<PathBuf> {
        log::debug!("Writing {:?}", path);
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json).map_err(|e| ThreatGraphError::io(e, Some(path.to_path_buf())))?;
        Ok(path.to_path_buf())
    }
}
