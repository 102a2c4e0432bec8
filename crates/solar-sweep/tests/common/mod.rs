#![allow(dead_code)]

use std::fs;
use std::path::Path;

use solar_core::errors::{ErrorInfo, SweepError};
use solar_data::read_sample_list;
use solar_sweep::{
    load_plan, write_result_csv, write_train_log_header, Collaborator, EvalJob, EvalResult,
    Evaluator, SweepPlan, TrainJob, Trainer,
};

pub const BASE_PLAN: &str = r#"
data_root: data
train_sets: [A, B, CMB]
test_sets: [A, B]
combo_sets:
  CMB: [A, B]
seeds: [42]
backbones: [resnet34]
model_revs: [1]
dataset:
  splits: [0.2, 0.72, 0.08]
  total_count: 40
"#;

pub fn seed_site(data_root: &Path, site: &str, count: usize) {
    let tiles = data_root.join(site).join("tiles");
    fs::create_dir_all(tiles.join("img")).expect("img dir");
    fs::create_dir_all(tiles.join("mask")).expect("mask dir");
    for idx in 0..count {
        let name = format!("{site}_{idx:03}.png");
        fs::write(tiles.join("img").join(&name), b"img").expect("img");
        fs::write(tiles.join("mask").join(&name), b"mask").expect("mask");
    }
}

/// Writes `body` next to a seeded data root and loads it.
pub fn plan_in(dir: &Path, body: &str) -> SweepPlan {
    let plan_path = dir.join("sweep.yaml");
    fs::write(&plan_path, body).expect("write plan");
    let plan = load_plan(&plan_path).expect("load plan");
    for site in ["A", "B"] {
        if !plan.data_root_path().join(site).exists() {
            seed_site(&plan.data_root_path(), site, 50);
        }
    }
    plan
}

#[derive(Default)]
pub struct RecordingTrainer {
    pub jobs: Vec<TrainJob>,
    pub releases: usize,
    pub fail_on: Option<String>,
}

impl Collaborator for RecordingTrainer {
    fn release(&mut self) {
        self.releases += 1;
    }
}

impl Trainer for RecordingTrainer {
    fn train(&mut self, job: &TrainJob) -> Result<(), SweepError> {
        let file_name = job
            .best_weights
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if let Some(fail_on) = &self.fail_on {
            if file_name.starts_with(&format!("{fail_on}_")) {
                return Err(SweepError::Collaborator(ErrorInfo::new(
                    "collab.mock",
                    "training diverged",
                )));
            }
        }
        write_train_log_header(job)?;
        fs::write(&job.best_weights, b"best").expect("best weights");
        fs::write(&job.final_weights, b"final").expect("final weights");
        self.jobs.push(job.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEvaluator {
    pub jobs: Vec<EvalJob>,
    pub releases: usize,
}

impl Collaborator for RecordingEvaluator {
    fn release(&mut self) {
        self.releases += 1;
    }
}

impl Evaluator for RecordingEvaluator {
    fn evaluate(&mut self, job: &EvalJob) -> Result<(), SweepError> {
        let samples = read_sample_list(&job.test_img_list, job.img_root.as_deref())?;
        for sample in &samples {
            assert!(sample.is_file(), "{} does not resolve", sample.display());
            let name = sample.file_name().expect("file name");
            fs::write(job.prediction_dir.join(name), b"pred").expect("prediction");
        }
        let weight_file = job
            .weights
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        write_result_csv(
            &job.result_file,
            &EvalResult {
                weight_file,
                metrics: vec![
                    ("loss".to_string(), 0.5),
                    ("iou_score".to_string(), samples.len() as f64),
                ],
            },
        )?;
        self.jobs.push(job.clone());
        Ok(())
    }
}
