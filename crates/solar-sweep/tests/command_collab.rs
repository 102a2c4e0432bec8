use std::fs;
use std::path::Path;

use solar_core::Seed;
use solar_sweep::trainlog::EPOCH_HEADER;
use solar_sweep::{CommandEvaluator, CommandSpec, CommandTrainer, EvalJob, Evaluator, TrainJob, Trainer};

fn train_job(root: &Path) -> TrainJob {
    let models = root.join("run,1").join("models");
    TrainJob {
        img_root: Some(root.join("tiles").join("img")),
        mask_root: Some(root.join("tiles").join("mask")),
        train_img_list: root.join("tiles").join("train_img_42.txt"),
        train_mask_list: root.join("tiles").join("train_mask_42.txt"),
        valid_img_list: root.join("tiles").join("valid_img_42.txt"),
        valid_mask_list: root.join("tiles").join("valid_mask_42.txt"),
        log_file: models.join("NY-Q_resnet34_42_v1_trainlog.csv"),
        best_weights: models.join("NY-Q_resnet34_42_v1_weights_best.h5"),
        final_weights: models.join("NY-Q_resnet34_42_v1_weights_final.h5"),
        backbone: "resnet34".to_string(),
        seed: Seed::new(42),
        size: 576,
        epochs: 350,
        freeze: true,
        patience: 0,
        batchnorm: false,
    }
}

fn recording_shell(out: &Path) -> CommandSpec {
    CommandSpec {
        program: "sh".into(),
        args: vec![
            "-c".to_string(),
            r#"printf '%s\n' "$@" > "$0""#.to_string(),
            out.display().to_string(),
        ],
    }
}

#[test]
fn trainer_writes_log_header_then_passes_every_field() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let job = train_job(dir.path());
    let argv_file = dir.path().join("argv.txt");
    let mut trainer = CommandTrainer::new(recording_shell(&argv_file));
    trainer.train(&job).expect("train");

    let log = fs::read_to_string(&job.log_file).expect("log");
    let lines: Vec<&str> = log.lines().collect();
    assert!(lines[0].starts_with("train_img_dir,train_mask_dir,train_img_file,"));
    assert!(lines[0].ends_with("patience,batchnorm,"));
    assert!(lines[1].contains("run;1"), "commas inside values are replaced");
    assert!(lines[1].contains(",resnet34,42,(576; 576),350,true,0,false,"));
    assert_eq!(lines[2], "");
    assert_eq!(lines[3], EPOCH_HEADER);

    let argv: Vec<String> = fs::read_to_string(&argv_file)
        .expect("argv")
        .lines()
        .map(str::to_string)
        .collect();
    let value_of = |flag: &str| {
        argv.iter()
            .position(|arg| arg == flag)
            .map(|idx| argv[idx + 1].clone())
    };
    assert_eq!(value_of("--train-img-file"), Some(job.train_img_list.display().to_string()));
    assert_eq!(value_of("--best-weights"), Some(job.best_weights.display().to_string()));
    assert_eq!(value_of("--seed"), Some("42".to_string()));
    assert_eq!(value_of("--freeze"), Some("true".to_string()));
}

#[test]
fn unseeded_jobs_omit_the_seed_flag() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let mut job = train_job(dir.path());
    job.seed = Seed::none();
    let argv_file = dir.path().join("argv.txt");
    CommandTrainer::new(recording_shell(&argv_file))
        .train(&job)
        .expect("train");
    let argv = fs::read_to_string(&argv_file).expect("argv");
    assert!(!argv.lines().any(|arg| arg == "--seed"));
    let log = fs::read_to_string(&job.log_file).expect("log");
    assert!(log.lines().nth(1).expect("values").contains(",resnet34,None,"));
}

#[test]
fn non_zero_exit_is_a_collaborator_error() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let spec = CommandSpec {
        program: "sh".into(),
        args: vec!["-c".to_string(), "exit 3".to_string()],
    };
    let err = CommandTrainer::new(spec)
        .train(&train_job(dir.path()))
        .expect_err("exit 3");
    assert_eq!(err.code(), "collab.exit_status");
    assert_eq!(err.info().context.get("status").map(String::as_str), Some("3"));
    assert!(matches!(err, solar_core::SweepError::Collaborator(_)));
}

#[test]
fn missing_program_cannot_spawn() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let spec = CommandSpec {
        program: dir.path().join("no-such-evaluator"),
        args: Vec::new(),
    };
    let job = EvalJob {
        img_root: None,
        mask_root: None,
        test_img_list: dir.path().join("test_img_42.txt"),
        test_mask_list: dir.path().join("test_mask_42.txt"),
        weights: dir.path().join("weights_best.h5"),
        result_file: dir.path().join("result.csv"),
        prediction_dir: dir.path().join("pred_masks"),
        plot_dir: None,
        backbone: "resnet34".to_string(),
        size: 576,
        batchnorm: false,
    };
    let err = CommandEvaluator::new(spec).evaluate(&job).expect_err("spawn");
    assert_eq!(err.code(), "collab.spawn");
}
