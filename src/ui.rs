use crate::engine::AnalysisReport;
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::models::{RiskStatus, Severity};
use crate::statistics::{sort_risks, RiskOrder};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TOP_RISKS_SHOWN: usize = 10;

pub enum UIEvent {
    RuleCompleted { category_id: String, risks: usize },
    Complete,
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub rules_completed: AtomicU64,
    pub risks_found: AtomicU64,
}

pub struct AnalysisUI {
    term: Term,
    progress: ProgressBar,
    stats: Arc<RunStats>,
    start_time: Instant,
}

impl AnalysisUI {
    pub fn new(total_rules: u64, quiet: bool) -> ThreatGraphResult<Self> {
        let term = Term::stdout();
        let progress_style = ProgressStyle::with_template(
            "{prefix} {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} rules {msg}",
        )
        .map_err(|e| ThreatGraphError::config("progress style", e.to_string()))?
        .progress_chars("█▉▊▋▌▍▎▏  ");

        let progress = if quiet {
            ProgressBar::hidden()
        } else {
            term.hide_cursor()?;
            ProgressBar::new(total_rules)
        };
        progress.set_style(progress_style);
        progress.set_prefix(style("RULES").green().bold().to_string());

        Ok(Self {
            term,
            progress,
            stats: Arc::new(RunStats::default()),
            start_time: Instant::now(),
        })
    }

    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Consume events until `Complete` or until every sender is dropped
    pub fn spawn(&self, mut events: mpsc::UnboundedReceiver<UIEvent>) -> JoinHandle<()> {
        let progress = self.progress.clone();
        let stats = Arc::clone(&self.stats);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    UIEvent::RuleCompleted { category_id, risks } => {
                        log::trace!("UI: rule '{}' done with {} risks", category_id, risks);
                        stats.rules_completed.fetch_add(1, Ordering::Relaxed);
                        let total = stats.risks_found.fetch_add(risks as u64, Ordering::Relaxed) + risks as u64;
                        progress.set_message(format!(
                            "{} | {}",
                            style(&category_id).dim(),
                            style(format!("{} risks", total)).red().bold()
                        ));
                        // model-defined categories are not known when the bar is created
                        if progress.position() >= progress.length().unwrap_or(0) {
                            progress.inc_length(1);
                        }
                        progress.inc(1);
                    }
                    UIEvent::Complete => break,
                }
            }
            progress.finish_and_clear();
        })
    }

    pub fn print_summary(&self, report: &AnalysisReport) {
        if self.progress.is_hidden() {
            return;
        }
        let info = &report.run_info;
        let stats = &report.statistics;

        println!();
        println!("    {} {}", style("▶").green(), style("Analysis completed").white().bold());
        println!("    {} Model: {}", style("├─").dim(), style(&info.model_title).white().bold());
        println!(
            "    {} Rules: {} executed, {} skipped, {} failed",
            style("├─").dim(),
            style(info.rules_executed).white().bold(),
            info.rules_skipped,
            style(info.rule_failures.len()).red()
        );
        println!(
            "    {} Risks: {} total, {} still at risk",
            style("├─").dim(),
            style(stats.total).white().bold(),
            style(stats.still_at_risk).red().bold()
        );
        println!(
            "    {} Duration: {:.2}s",
            style("└─").dim(),
            self.start_time.elapsed().as_secs_f64()
        );
        println!();

        for severity in Severity::ALL.iter().rev() {
            let open: usize = RiskStatus::ALL
                .iter()
                .filter(|status| status.is_still_at_risk())
                .map(|status| stats.count(*severity, *status))
                .sum();
            let all: usize = RiskStatus::ALL.iter().map(|status| stats.count(*severity, *status)).sum();
            println!(
                "      {} {:>4} open / {:>4} total",
                severity_label(*severity),
                open,
                all
            );
        }

        let mut open: Vec<_> = report
            .risks
            .iter()
            .filter(|risk| report.tracking.status_of(&risk.synthetic_id).is_still_at_risk())
            .cloned()
            .collect();
        if !open.is_empty() {
            sort_risks(&mut open, RiskOrder::BySeverity, &report.tracking);
            println!();
            println!("    {}", style("Top open risks").white().bold());
            for risk in open.iter().take(TOP_RISKS_SHOWN) {
                println!("      {} {}", severity_label(risk.severity), style(&risk.synthetic_id).dim());
            }
        }

        if !report.tracking.orphaned.is_empty() {
            println!();
            println!(
                "    {} {} risk tracking entries match no risk",
                style("⚠").yellow(),
                report.tracking.orphaned.len()
            );
        }
        println!();
    }
}

fn severity_label(severity: Severity) -> String {
    let label = format!("{:<10}", severity.title());
    match severity {
        Severity::Critical => style(label).red().bold().to_string(),
        Severity::High => style(label).red().to_string(),
        Severity::Elevated => style(label).yellow().to_string(),
        Severity::Medium => style(label).cyan().to_string(),
        Severity::Low => style(label).dim().to_string(),
    }
}

impl Drop for AnalysisUI {
    fn drop(&mut self) {
        let _ = self.term.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_update_stats() {
        let ui = AnalysisUI::new(3, true).unwrap();
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = ui.spawn(receiver);
        for (id, risks) in [("missing-vault", 1), ("missing-waf", 4)] {
            sender
                .send(UIEvent::RuleCompleted {
                    category_id: id.to_string(),
                    risks,
                })
                .unwrap();
        }
        sender.send(UIEvent::Complete).unwrap();
        handle.await.unwrap();

        let stats = ui.stats();
        assert_eq!(stats.rules_completed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.risks_found.load(Ordering::Relaxed), 5);
    }
}
