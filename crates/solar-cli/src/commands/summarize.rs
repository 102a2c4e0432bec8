use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use solar_sweep::report::SWEEP_REPORT_DIR;
use solar_sweep::{collect_results, write_summary_csv};

use super::PlanArgs;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    /// Destination CSV; defaults to `sweeps/summary.csv` under the data root.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let (_, registry) = args.plan.load()?;
    let rows = collect_results(&registry)?;
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| registry.data_root().join(SWEEP_REPORT_DIR).join("summary.csv"));
    write_summary_csv(&out, &rows)?;
    println!("{} results written to {}", rows.len(), out.display());
    Ok(())
}
