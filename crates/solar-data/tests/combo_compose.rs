use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use solar_core::{ModelRev, Seed};
use solar_data::{
    compose_combo, compose_combo_pair, compose_combo_set, fresh_split, read_list_lines, split_count,
    write_list, write_list_group, write_list_pair, ComboSource, SplitFractions,
};
use solar_registry::{build_registry, ComboSpec, SplitKey, SweepDims};
use tempfile::tempdir;

fn seed_site(data_root: &Path, site: &str, count: usize) {
    let tiles = data_root.join(site).join("tiles");
    fs::create_dir_all(tiles.join("img")).expect("img dir");
    fs::create_dir_all(tiles.join("mask")).expect("mask dir");
    for idx in 0..count {
        let name = format!("{site}_{idx:04}.png");
        fs::write(tiles.join("img").join(&name), b"img").expect("img");
        fs::write(tiles.join("mask").join(&name), b"mask").expect("mask");
    }
}

fn fractions() -> SplitFractions {
    SplitFractions::new(0.2, 0.72, 0.08).expect("fractions")
}

fn sources(dir: &Path, lists: &[(&str, usize)]) -> Vec<ComboSource> {
    lists
        .iter()
        .map(|(name, count)| {
            let lines: Vec<String> = (0..*count).map(|idx| format!("{name}_{idx}.png")).collect();
            let list = dir.join(format!("{name}.txt"));
            write_list(&list, &lines).expect("write list");
            ComboSource::new(list, Some(dir.join(name)))
        })
        .collect()
}

#[test]
fn combo_scenario_draws_budget_from_constituent_train_lists() {
    let dir = tempdir().expect("tmp");
    let data_root = dir.path();
    seed_site(data_root, "A", 1000);
    seed_site(data_root, "B", 1000);

    let dims = SweepDims {
        train_sets: vec!["A".into(), "B".into(), "CMB".into()],
        seeds: vec![Seed::new(42)],
        backbones: vec!["resnet34".into()],
        model_revs: vec![ModelRev::new(1)],
        test_sets: vec!["A".into(), "B".into()],
    };
    let combos = ComboSpec::new().with_combo("CMB", ["A", "B"]);
    let registry = build_registry(data_root, dims, &combos).expect("registry");

    for site in ["A", "B"] {
        let set = registry.set(site).expect("set");
        fresh_split(
            set.img_root().expect("img root"),
            set.mask_root().expect("mask root"),
            &set.tiles_root,
            fractions(),
            Seed::new(42),
            Some(1000),
        )
        .expect("split");
    }

    let constituents = vec!["A".to_string(), "B".to_string()];
    let summary =
        compose_combo_set(&registry, "CMB", &constituents, Seed::new(42), 1000, fractions()).expect("combo");
    assert_eq!(summary.train, 720);
    assert_eq!(summary.valid, 80);

    let lists = registry.split_lists(&SplitKey::new("CMB", Seed::new(42))).expect("lists");
    let combo_train = read_list_lines(&lists.train_img).expect("combo train");
    let combo_masks = read_list_lines(&lists.train_mask).expect("combo masks");
    assert_eq!(combo_train.len(), split_count(1000, 0.72));
    assert_eq!(combo_masks.len(), combo_train.len());

    let mut union = BTreeSet::new();
    for site in ["A", "B"] {
        let set = registry.set(site).expect("set");
        let site_lists = registry.split_lists(&SplitKey::new(site, Seed::new(42))).expect("lists");
        for line in read_list_lines(&site_lists.train_img).expect("site train") {
            union.insert(set.img_root().expect("root").join(line));
        }
    }
    for (img, mask) in combo_train.iter().zip(&combo_masks) {
        let img = PathBuf::from(img);
        assert!(img.is_absolute());
        assert!(union.contains(&img), "{} not drawn from constituent train lists", img.display());
        assert_eq!(img.file_name(), PathBuf::from(mask).file_name());
    }
    assert!(!lists.test_img.exists(), "combos never receive test lists");
}

#[test]
fn compose_combo_is_byte_identical_for_identical_inputs() {
    let dir = tempdir().expect("tmp");
    let sources = sources(dir.path(), &[("A", 50), ("B", 30)]);
    let out_a = dir.path().join("out_a.txt");
    let out_b = dir.path().join("out_b.txt");
    assert_eq!(compose_combo(&sources, &out_a, 40, Seed::new(42)).expect("a"), 40);
    assert_eq!(compose_combo(&sources, &out_b, 40, Seed::new(42)).expect("b"), 40);
    assert_eq!(fs::read(&out_a).expect("read a"), fs::read(&out_b).expect("read b"));

    let out_c = dir.path().join("out_c.txt");
    compose_combo(&sources, &out_c, 40, Seed::new(43)).expect("c");
    assert_ne!(fs::read(&out_a).expect("read a"), fs::read(&out_c).expect("read c"));
}

#[test]
fn compose_combo_draws_distinct_entries() {
    let dir = tempdir().expect("tmp");
    let sources = sources(dir.path(), &[("A", 10), ("B", 10)]);
    let out = dir.path().join("all.txt");
    compose_combo(&sources, &out, 20, Seed::new(5)).expect("compose");
    let lines = read_list_lines(&out).expect("lines");
    let unique: BTreeSet<_> = lines.iter().collect();
    assert_eq!(unique.len(), 20);
}

#[test]
fn over_budget_request_is_rejected_without_output() {
    let dir = tempdir().expect("tmp");
    let sources = sources(dir.path(), &[("A", 3)]);
    let out = dir.path().join("out.txt");
    let err = compose_combo(&sources, &out, 4, Seed::new(1)).expect_err("too many");
    assert_eq!(err.code(), "dataset.insufficient_samples");
    assert!(!out.exists());
}

#[test]
fn pair_composition_rejects_mismatched_constituents() {
    let dir = tempdir().expect("tmp");
    let imgs = sources(dir.path(), &[("A", 5)]);
    let masks = sources(dir.path(), &[("M", 4)]);
    let err = compose_combo_pair(
        &imgs,
        &masks,
        &dir.path().join("img.txt"),
        &dir.path().join("mask.txt"),
        2,
        Seed::new(1),
    )
    .expect_err("mismatch");
    assert_eq!(err.code(), "dataset.pair_mismatch");
    assert!(!dir.path().join("img.txt").exists());
    assert!(!dir.path().join("mask.txt").exists());
}

#[test]
fn pair_writer_refuses_unequal_lists() {
    let dir = tempdir().expect("tmp");
    let err = write_list_pair(
        &dir.path().join("img.txt"),
        &["a.png", "b.png"],
        &dir.path().join("mask.txt"),
        &["a.png"],
    )
    .expect_err("unequal");
    assert_eq!(err.code(), "dataset.pair_mismatch");
    assert!(!dir.path().join("img.txt").exists());
}

#[test]
fn combo_requires_constituent_splits_on_disk() {
    let dir = tempdir().expect("tmp");
    let dims = SweepDims {
        train_sets: vec!["A".into(), "CMB".into()],
        seeds: vec![Seed::new(42)],
        backbones: vec!["resnet34".into()],
        model_revs: vec![ModelRev::new(1)],
        test_sets: vec!["A".into()],
    };
    let combos = ComboSpec::new().with_combo("CMB", ["A"]);
    let registry = build_registry(dir.path(), dims, &combos).expect("registry");
    let err = compose_combo_set(&registry, "CMB", &["A".to_string()], Seed::new(42), 10, fractions())
        .expect_err("missing constituent");
    assert_eq!(err.code(), "dataset.missing_constituent_split");
}

#[test]
fn failed_validation_draw_leaves_no_combo_lists() {
    let dir = tempdir().expect("tmp");
    seed_site(dir.path(), "A", 100);
    let dims = SweepDims {
        train_sets: vec!["A".into(), "CMB".into()],
        seeds: vec![Seed::new(42)],
        backbones: vec!["resnet34".into()],
        model_revs: vec![ModelRev::new(1)],
        test_sets: vec!["A".into()],
    };
    let combos = ComboSpec::new().with_combo("CMB", ["A"]);
    let registry = build_registry(dir.path(), dims, &combos).expect("registry");
    let greedy = SplitFractions::new(0.5, 0.3, 0.5).expect("fractions");

    let set = registry.set("A").expect("set");
    let split = fresh_split(
        set.img_root().expect("img root"),
        set.mask_root().expect("mask root"),
        &set.tiles_root,
        greedy,
        Seed::new(42),
        None,
    )
    .expect("split");
    assert_eq!((split.test, split.train, split.valid), (50, 30, 20));

    let err = compose_combo_set(&registry, "CMB", &["A".to_string()], Seed::new(42), 100, greedy)
        .expect_err("validation budget exceeds constituents");
    assert_eq!(err.code(), "dataset.insufficient_samples");
    let lists = registry.split_lists(&SplitKey::new("CMB", Seed::new(42))).expect("lists");
    for file in lists.all() {
        assert!(!file.exists(), "{} written by a failed composition", file.display());
    }
}

#[test]
fn group_writer_rolls_back_when_a_later_file_fails() {
    let dir = tempdir().expect("tmp");
    let first = dir.path().join("valid_img.txt");
    let blocked = dir.path().join("train_img.txt");
    fs::create_dir_all(blocked.join("occupied")).expect("blocking dir");

    let err = write_list_group(&[(first.as_path(), &["a.png"][..]), (blocked.as_path(), &["b.png"][..])])
        .expect_err("rename onto a directory");
    assert_eq!(err.code(), "dataset.list_persist");
    assert!(!first.exists(), "earlier list kept after the group failed");
    assert!(blocked.is_dir());
}
