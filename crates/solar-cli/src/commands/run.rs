use std::error::Error;

use clap::Args;
use solar_sweep::{run_sweep, CommandEvaluator, CommandTrainer, Evaluator, Trainer};

use super::{evaluator, print_stage, trainer, PlanArgs};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let (plan, registry) = args.plan.load()?;
    let mut trainer: Option<CommandTrainer> = if plan.stages.train {
        Some(trainer(&plan)?)
    } else {
        None
    };
    let mut evaluator: Option<CommandEvaluator> = if plan.stages.eval {
        Some(evaluator(&plan)?)
    } else {
        None
    };

    let report = run_sweep(
        &registry,
        &plan,
        trainer.as_mut().map(|trainer| trainer as &mut dyn Trainer),
        evaluator.as_mut().map(|evaluator| evaluator as &mut dyn Evaluator),
    )?;
    for stage in &report.stages {
        print_stage(stage);
    }
    println!("plan hash: {}", report.plan_hash);
    if report.has_failures() {
        return Err("sweep finished with failed cells".into());
    }
    Ok(())
}
