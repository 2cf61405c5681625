use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use driving_survey::{logging, read_bulk, Error, StoreArgs};

/// Scores and stores every row of a CSV answer file.
#[derive(Parser)]
struct Args {
    path: PathBuf,

    #[command(flatten)]
    store: StoreArgs,

    /// Print the scores without storing them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Error> {
    logging::init();
    let args = Args::parse();
    let store = args.store.open()?;
    let survey = store.survey();
    let reader = BufReader::new(File::open(&args.path)?);

    let mut skipped = 0;
    for (index, row) in read_bulk(survey, reader).enumerate() {
        match row.and_then(|(number, response)| Ok((number, survey.score(response)?))) {
            Ok((number, scored)) => {
                let totals = scored
                    .totals
                    .iter()
                    .map(|total| format!("{} = {}", total.name, total.value))
                    .collect::<Vec<_>>()
                    .join(", ");
                if args.dry_run {
                    println!("row = {number}, {totals}");
                } else {
                    let id = store.insert(&scored)?;
                    println!("row = {number}, id = {id}, {totals}");
                }
            }
            Err(err) => {
                skipped += 1;
                warn!(row = index + 1, "skipped: {err}");
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "some rows were not imported");
    }
    Ok(())
}
