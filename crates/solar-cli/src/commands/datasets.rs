use std::error::Error;

use clap::Args;
use solar_sweep::run_dataset_stage;

use super::{print_stage, PlanArgs};

#[derive(Args, Debug)]
pub struct DatasetsArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
}

pub fn run(args: &DatasetsArgs) -> Result<(), Box<dyn Error>> {
    let (plan, registry) = args.plan.load()?;
    let report = run_dataset_stage(&registry, &plan)?;
    print_stage(&report);
    Ok(())
}
