use clap::Parser;
use env_logger::Env;
use std::sync::Arc;
use threatgraph::cli::{Args, Command};
use threatgraph::config::{is_yaml, AnalysisConfig};
use threatgraph::exporter::JsonExporter;
use threatgraph::explain;
use threatgraph::ui::{AnalysisUI, UIEvent};
use threatgraph::{ThreatAnalyzer, ThreatGraphError};
use tokio::sync::mpsc;

fn display_banner() {
    println!();
    println!("    \x1b[1;38;5;51mthreatgraph\x1b[0m \x1b[38;5;240mv{}\x1b[0m", env!("CARGO_PKG_VERSION"));
    println!("    \x1b[3;38;5;147mArchitecture risks, derived from the model\x1b[0m");
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    if !args.quiet {
        display_banner();
    }
    log::debug!("Threatgraph starting with args: {:?}", args);

    let config = AnalysisConfig::resolve(&args)?;
    let analyzer = Arc::new(ThreatAnalyzer::new(config)?);

    match args.command.clone() {
        Command::ListRules => {
            let registry = analyzer.registry(Vec::new())?;
            print!("{}", explain::render_categories(&explain::list_categories(&registry)));
        }
        Command::Explain { model, synthetic_id } => {
            let worker = Arc::clone(&analyzer);
            let explanation =
                tokio::task::spawn_blocking(move || worker.explain_file(&model, &synthetic_id)).await??;
            print!("{}", explanation.render());
        }
        Command::Analyze { model, output } => {
            let source = tokio::fs::read_to_string(&model)
                .await
                .map_err(|e| ThreatGraphError::io(e, Some(model.clone())))?;
            let yaml = is_yaml(&model);

            let expected_rules = analyzer.expected_rule_count()? as u64;
            let ui = AnalysisUI::new(expected_rules, args.quiet)?;
            let (ui_sender, ui_receiver) = mpsc::unbounded_channel();
            let ui_task = ui.spawn(ui_receiver);

            let worker = Arc::clone(&analyzer);
            let rule_events = ui_sender.clone();
            let result = tokio::task::spawn_blocking(move || {
                worker.analyze_source(&source, yaml, move |category, risks| {
                    let _ = rule_events.send(UIEvent::RuleCompleted {
                        category_id: category.id.clone(),
                        risks,
                    });
                })
            })
            .await;

            let _ = ui_sender.send(UIEvent::Complete);
            ui_task.await?;
            let report = result?.map_err(|e| {
                if e.is_configuration() {
                    log::error!("Analysis of {:?} stopped before any rule ran", model);
                }
                e
            })?;

            JsonExporter::export(&report, &output)?;
            ui.print_summary(&report);
        }
    }

    Ok(())
}
