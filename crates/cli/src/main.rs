mod quiz;

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::config::{
    back_policy_from_env_value, resolve_question_graph, resolve_scoring_rules,
};
use triage_core::{CoreConfig, PatientInfo, QuestionGraph, Report, ReportBuilder};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Symptom intake questionnaire and triage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the questions in a question graph
    Questions {
        /// Question graph YAML (defaults to the built-in catalog)
        #[arg(long)]
        graph: Option<PathBuf>,
    },
    /// Check a question graph file for integrity errors
    Validate {
        /// Question graph YAML
        graph: PathBuf,
    },
    /// Run the questionnaire interactively and print the report as JSON
    Quiz {
        /// Question graph YAML (defaults to the built-in catalog)
        #[arg(long)]
        graph: Option<PathBuf>,
        /// Scoring rules YAML (defaults to the built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Fixed seed for reproducible results
        #[arg(long)]
        seed: Option<u64>,
        /// What `back` does to symptoms: keep or retract
        #[arg(long)]
        back_policy: Option<String>,
        /// Patient name printed on the report (optional)
        #[arg(long)]
        patient_name: Option<String>,
        /// Also write the report JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score symptoms described in free text
    Analyse {
        /// Free-text description, e.g. "fever and a dry cough"
        text: String,
        /// Fixed seed for reproducible results
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Questions { graph }) => {
            let graph = resolve_question_graph(graph)?;
            for node in graph.nodes() {
                println!("{} [{}] {}", node.id(), node.kind().as_str(), node.prompt());
                for option in node.options() {
                    let next = option.next_question_id().unwrap_or("-");
                    match option.linked_symptom() {
                        Some(symptom) => println!(
                            "    {} -> {}  ({})",
                            option.id(),
                            next,
                            symptom.name()
                        ),
                        None => println!("    {} -> {}", option.id(), next),
                    }
                }
            }
        }
        Some(Commands::Validate { graph }) => match QuestionGraph::load(&graph) {
            Ok(loaded) => println!(
                "{}: {} questions, {} linked symptoms",
                graph.display(),
                loaded.len(),
                loaded.symptom_vocabulary().len()
            ),
            Err(e) => {
                eprintln!("{}: {}", graph.display(), e);
                std::process::exit(1);
            }
        },
        Some(Commands::Quiz {
            graph,
            rules,
            seed,
            back_policy,
            patient_name,
            output,
        }) => {
            let config = CoreConfig::new(
                resolve_question_graph(graph)?,
                resolve_scoring_rules(rules)?,
                back_policy_from_env_value(back_policy)?,
                seed,
            )?;
            let mut session = config.start_session();

            let stdin = io::stdin();
            let mut stdout = io::stdout();
            let Some(_) = quiz::run(&mut session, stdin.lock(), &mut stdout)? else {
                println!();
                println!("No result.");
                return Ok(());
            };

            let mut builder = ReportBuilder::new();
            if let Some(name) = patient_name {
                builder = builder.with_patient(PatientInfo {
                    name: Some(name),
                    ..PatientInfo::default()
                });
            }
            let report = builder.build_for_session(&session)?;
            print_report(&report, output)?;
        }
        Some(Commands::Analyse { text, seed }) => {
            let config = CoreConfig::with_defaults()?;
            let mut session = match seed {
                Some(seed) => config.start_session().with_seed(seed),
                None => config.start_session(),
            };

            let added = session.ingest_text(&text)?;
            tracing::info!(recognised = added.len(), "ingested description");
            session.run_analysis()?;

            let report = ReportBuilder::new().build_for_session(&session)?;
            print_report(&report, None)?;
        }
        None => {
            println!("Use 'triage --help' for commands");
        }
    }

    Ok(())
}

fn print_report(report: &Report, output: Option<PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    let mut stdout = io::stdout();
    writeln!(stdout)?;
    writeln!(stdout, "{json}")?;

    if let Some(path) = output {
        std::fs::write(&path, &json)?;
        eprintln!("Wrote report {} to {}", report.id(), path.display());
    }
    Ok(())
}
