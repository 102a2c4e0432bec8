use std::error::Error;

use clap::Args;
use solar_sweep::run_training_stage;

use super::{print_stage, trainer, PlanArgs};

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
}

pub fn run(args: &TrainArgs) -> Result<(), Box<dyn Error>> {
    let (plan, registry) = args.plan.load()?;
    let mut trainer = trainer(&plan)?;
    let report = run_training_stage(&registry, &plan, &mut trainer)?;
    print_stage(&report);
    Ok(())
}
