//! Reference-comparison path, with a shell script standing in for the
//! benchmark runner.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bmperf_metrics::Target;
use bmperf_runner::{
    ArtifactDiscovery, BuildTree, MemoryReport, Orchestrator, ReportSchema, RunOptions, RunSummary,
    TreeOverrides, run_all,
};
use serial_test::serial;

fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

fn runner_script(root: &Path, body: &str) -> PathBuf {
    let path = write(root, "bin/fake_bmrt_test", &format!("#!/bin/sh\n{body}\n"));
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const TIMINGS: &str = r#"echo "args: $@"
echo "profile dir: $BMRUNTIME_PROFILE_OUT_DIR"
echo "model: $MODEL_NAME"
echo "Input 0) 'data' shape=[1 3 224 224]"
echo "Input 1) 'im_info' shape=[1 3]"
echo "[BMRT] INFO:calculate time(s): 0.004"
echo "[BMRT] INFO:calculate time(s): 0.006""#;

/// Tree with one fp model at batch 1, reference data present.
fn reference_tree(script_body: &str, model_extra: &str) -> (tempfile::TempDir, BuildTree) {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_script(dir.path(), script_body);
    let global = format!("runner: {}\ndevices: [3]\n", runner.display());
    write(dir.path(), "config.yaml", &global);
    let model = format!(
        "fp_compile_options: x\nruntime_cmp: true\nrun_env: [MODEL_NAME=$(name)]\n{model_extra}"
    );
    write(dir.path(), "resnet50/config.yaml", &model);
    let artifact_dir = dir.path().join("output/resnet50/1b.fp.compilation");
    write(&artifact_dir, "compilation.bmodel", "bmodel");
    write(&artifact_dir, "output_ref_data.dat", "ref");
    let overrides = TreeOverrides {
        target: Some(Target::Bm1684x),
        ..TreeOverrides::default()
    };
    let tree = BuildTree::load(dir.path(), &overrides).unwrap();
    (dir, tree)
}

fn run(tree: &BuildTree) -> (MemoryReport, RunSummary) {
    let entries = tree.walk(&[]).unwrap();
    let schema = ReportSchema::new(&[], false);
    let options = RunOptions {
        cpu_window: Duration::from_millis(50),
        ..RunOptions::default()
    };
    let orch = Orchestrator::new(tree, &schema, options);
    let discovery = ArtifactDiscovery::NamingTemplate;
    let mut sink = MemoryReport::default();
    let summary = run_all(tree, &entries, discovery, &orch, &mut sink).unwrap();
    (sink, summary)
}

#[test]
#[serial]
fn latency_comes_from_runner_log() {
    let (_dir, tree) = reference_tree(TIMINGS, "");
    let (sink, summary) = run(&tree);

    assert_eq!(summary.measured, 1);
    let row = &sink.rows[0];
    assert_eq!(row[0], "resnet50");
    assert_eq!(row[1], "1x3x224x224:1x3");
    assert_eq!(row[3], "5.000");
    assert_eq!(row[4], "200.000");

    let workdir = tree.global().outdir.join("resnet50");
    let log = fs::read_to_string(workdir.join("run.1b.fp.compilation.log")).unwrap();
    let context = workdir.join("1b.fp.compilation");
    let context = context.display();
    let args = format!("args: --loopnum 2000 --dev 3 --context {context}");
    assert!(log.contains(&args));
    assert!(log.contains("profile dir: 1b.profiledata"));
    assert!(log.contains("model: resnet50"));
}

#[test]
#[serial]
fn aggregate_timing_is_divided_by_rounds() {
    let body = r#"echo "args: $@"
echo "INFO:calculate time(s): 0.050""#;
    let (_dir, tree) = reference_tree(body, "iter_opt: --calculate_times\ntime_rounds: 10\n");
    let (sink, _) = run(&tree);

    // 50 ms over 10 rounds
    assert_eq!(sink.rows[0][3], "5.000");
    assert_eq!(sink.rows[0][4], "200.000");
}

#[test]
#[serial]
fn missing_calculate_stat_reports_nan() {
    let (_dir, tree) = reference_tree("echo nothing useful", "");
    let (sink, _) = run(&tree);
    assert_eq!(sink.rows[0][3], "nan");
    assert_eq!(sink.rows[0][4], "nan");
}

#[test]
#[serial]
fn failing_runner_skips_the_row() {
    let (_dir, tree) = reference_tree("echo boom; exit 1", "");
    let (sink, summary) = run(&tree);
    assert_eq!(summary.measured, 0);
    assert_eq!(summary.skipped, 1);
    assert!(sink.rows.is_empty());
}

#[test]
#[serial]
fn empty_reference_file_selects_direct_path() {
    let (_dir, tree) = reference_tree(TIMINGS, "");
    let ref_file = tree
        .global()
        .outdir
        .join("resnet50/1b.fp.compilation/output_ref_data.dat");
    fs::write(ref_file, "").unwrap();

    // no provider configured, so the direct path cannot measure
    let (sink, summary) = run(&tree);
    assert_eq!(summary.skipped, 1);
    assert!(sink.rows.is_empty());
}
