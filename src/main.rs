use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use driving_survey::{
    export_csv, logging, render_bar_chart, render_table, summarize, Collector, Result, StoreArgs,
};

#[derive(Parser)]
#[command(about = "Driving anger and behaviour questionnaires")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the response table if it does not exist
    Init,
    /// Fill in the questionnaire and store the scored answers
    Survey,
    /// Show every stored response and a bar chart of the totals
    Dashboard,
    /// Write every stored response as CSV
    Export {
        /// Destination file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = cli.store.open()?;
    let survey = store.survey();

    match cli.command {
        Command::Init => {
            println!("{}: {} responses", cli.store.db.display(), store.count()?);
        }
        Command::Survey => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let response = Collector::new(survey).run(&mut stdin.lock(), &mut stdout.lock())?;
            let scored = survey.score(response)?;
            store.insert(&scored)?;

            println!();
            println!("Réponses enregistrées.");
            for total in &scored.totals {
                println!("{}: {}", total.name, total.value);
            }
        }
        Command::Dashboard => {
            let records = store.query_all()?;
            let mut out = io::stdout().lock();
            render_table(survey, &records, &mut out)?;
            writeln!(out)?;
            render_bar_chart(&summarize(survey, &records)?, &mut out)?;
        }
        Command::Export { output } => {
            let records = store.query_all()?;
            if let Some(bytes) = export_csv(survey, &records)? {
                match output {
                    Some(path) => fs::write(path, bytes)?,
                    None => io::stdout().write_all(&bytes)?,
                }
            }
        }
    }
    Ok(())
}
