//! Artifact discovery for both tree flavors, and the run loop.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use bmperf_device::{DeviceError, Performance, PerformanceProvider};
use bmperf_metrics::Target;
use bmperf_runner::{
    ArtifactDiscovery, BuildTree, MemoryReport, Orchestrator, ReportSchema, RowSink, RunOptions,
    TreeOverrides, run_all,
};

fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

fn load(root: &Path, target: Target) -> BuildTree {
    let overrides = TreeOverrides {
        target: Some(target),
        devices: Some(vec![0]),
        outdir: None,
    };
    BuildTree::load(root, &overrides).unwrap()
}

// ── Naming templates ────────────────────────────────────────────────────────

fn template_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config.yaml",
        "int8_loops:\n  - {build_env: [X=1], int8_outdir_template: '{}b.int8.compilation'}\n",
    );
    write(
        dir.path(),
        "resnet50/config.yaml",
        "gops: 4\n\
         fp_compile_options: --fast\n\
         fp_batch_sizes: [1, 4]\n\
         bmnetu_options: --cali\n\
         bmnetu_batch_sizes: [1, 8]\n",
    );
    write(
        dir.path(),
        "mobilenet/config.yaml",
        "gops: 1\ntime: false\nfp_compile_options: x\n",
    );
    write(
        dir.path(),
        "yolov5s/config.yaml",
        "bmnetu_options: x\nint8_loops:\n  - {shape: 640}\n  - {shape: 320, prec: INT8}\n",
    );

    for rel in [
        "output/resnet50/1b.fp.compilation",
        "output/resnet50/4b.fp.compilation",
        "output/resnet50/8b.int8.compilation",
        "output/mobilenet/1b.fp.compilation",
        "output/yolov5s/1b.compilation",
    ] {
        write(dir.path(), &format!("{rel}/compilation.bmodel"), "bmodel");
    }
    dir
}

#[test]
fn template_discovery_follows_build_loops() {
    let dir = template_tree();
    let tree = load(dir.path(), Target::Bm1684);
    let entries = tree.walk(&[]).unwrap();
    let discovery = ArtifactDiscovery::NamingTemplate;

    let names: Vec<_> = entries.iter().map(|e| e.config.name()).collect();
    assert_eq!(names, ["mobilenet", "resnet50", "yolov5s"]);

    // time: false
    let mobilenet = discovery.artifacts(&tree, &entries[0].config).unwrap();
    assert!(mobilenet.is_empty());

    let resnet = discovery.artifacts(&tree, &entries[1].config).unwrap();
    let labels: Vec<_> = resnet
        .iter()
        .map(|r| (r.artifact.name.as_str(), r.artifact.batch_size))
        .collect();
    // 1b.int8.compilation is missing and skipped
    assert_eq!(
        labels,
        [
            ("1b.fp.compilation", 1),
            ("4b.fp.compilation", 4),
            ("8b.int8.compilation", 8),
        ]
    );
    assert_eq!(resnet[0].config.attribute("prec"), "FP32");
    assert_eq!(resnet[2].config.attribute("prec"), "INT8");
    // BM1684 profiles are .dat
    let profile = Path::new("1b.fp.compilation/compiler_profile_0.dat");
    assert!(resnet[0].artifact.profile.ends_with(profile));
}

#[test]
fn int8_loops_without_batch_sizes_use_batch_one() {
    let dir = template_tree();
    let tree = load(dir.path(), Target::Bm1684x);
    let entries = tree.walk(&["yolov5s".to_string()]).unwrap();
    let runs = ArtifactDiscovery::NamingTemplate
        .artifacts(&tree, &entries[0].config)
        .unwrap();

    // both loop variants point at the same 1b artifact
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].config.attribute("shape"), "640");
    assert_eq!(runs[1].config.attribute("shape"), "320");
    assert!(runs[0].artifact.profile.ends_with("compiler_profile_0.txt"));
}

#[test]
fn template_headers_are_sorted_and_filtered() {
    let dir = template_tree();
    let tree = load(dir.path(), Target::Bm1684x);
    let entries = tree.walk(&[]).unwrap();
    let headers = ArtifactDiscovery::NamingTemplate.extra_headers(&entries);
    assert_eq!(headers, ["prec", "shape"]);
    let scanned = ArtifactDiscovery::DirectoryScan.extra_headers(&entries);
    assert!(scanned.is_empty());
}

#[test]
fn non_mapping_loop_override_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.yaml", "{}\n");
    write(
        dir.path(),
        "m/config.yaml",
        "fp_compile_options: x\nfp_loops: [3]\n",
    );
    let tree = load(dir.path(), Target::Bm1684x);
    let entries = tree.walk(&[]).unwrap();
    let discovery = ArtifactDiscovery::NamingTemplate;
    assert!(discovery.artifacts(&tree, &entries[0].config).is_err());
}

// ── Directory scan ──────────────────────────────────────────────────────────

#[test]
fn directory_scan_finds_bmodels() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.yaml", "{}\n");
    write(dir.path(), "det/config.yaml", "gops: 2\n");
    write(dir.path(), "output/det/yolo_int8.bmodel", "x");
    write(dir.path(), "output/det/sub/yolo_f32.bmodel", "x");
    write(dir.path(), "output/det/yolo_compilation.bmodel", "x");
    write(
        dir.path(),
        "output/det/yolo_int8.bmodel.compiler_profile_0.txt",
        "API_END runtime: 1.0",
    );

    let tree = load(dir.path(), Target::Bm1684x);
    let entries = tree.walk(&[]).unwrap();
    let runs = ArtifactDiscovery::DirectoryScan
        .artifacts(&tree, &entries[0].config)
        .unwrap();

    let names: Vec<_> = runs.iter().map(|r| r.config.name()).collect();
    assert_eq!(names, ["yolo_f32", "yolo_int8"]);
    assert_eq!(runs[0].config.attribute("prec"), "FP32");
    assert_eq!(runs[1].config.attribute("prec"), "INT8");
    assert!(runs.iter().all(|r| r.artifact.batch_size == 1));
    let outdir = &tree.global().outdir;
    assert_eq!(
        runs[1].artifact.profile,
        outdir.join("det/yolo_int8.bmodel.compiler_profile_0.txt")
    );
}

#[test]
fn directory_scan_of_missing_workdir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.yaml", "{}\n");
    write(dir.path(), "det/config.yaml", "gops: 2\n");
    let tree = load(dir.path(), Target::Bm1684x);
    let entries = tree.walk(&[]).unwrap();
    let runs = ArtifactDiscovery::DirectoryScan
        .artifacts(&tree, &entries[0].config)
        .unwrap();
    assert!(runs.is_empty());
}

// ── run_all ─────────────────────────────────────────────────────────────────

/// Fails every other call.
struct FlakyProvider {
    calls: Cell<usize>,
}

impl PerformanceProvider for FlakyProvider {
    fn available_devices(&self) -> Result<Vec<i32>, DeviceError> {
        Ok(vec![0])
    }

    fn get_performance(
        &self,
        _rounds: u32,
        bmodel: &Path,
        _devices: &[i32],
    ) -> Result<Performance, DeviceError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        if n % 2 == 1 {
            return Err(DeviceError::Benchmark {
                code: -1,
                path: bmodel.to_path_buf(),
            });
        }
        Ok(Performance {
            avg_latency_ms: 1.0,
            throughput: 1000.0,
            shape: "1x3".into(),
            cpu_usage: None,
        })
    }
}

#[test]
fn run_all_skips_failed_artifacts_and_keeps_order() {
    let dir = template_tree();
    let tree = load(dir.path(), Target::Bm1684x);
    let entries = tree.walk(&[]).unwrap();
    let discovery = ArtifactDiscovery::NamingTemplate;
    let schema = ReportSchema::new(&discovery.extra_headers(&entries), false);
    let provider = FlakyProvider { calls: Cell::new(0) };
    let orch = Orchestrator::new(&tree, &schema, RunOptions::default()).with_provider(&provider);

    let mut sink = MemoryReport::default();
    sink.write_header(&schema.header()).unwrap();
    let summary = run_all(&tree, &entries, discovery, &orch, &mut sink).unwrap();

    // resnet50: 3 artifacts, yolov5s: 2
    assert_eq!(summary.measured + summary.skipped, 5);
    assert_eq!(summary.skipped, 2);
    assert_eq!(sink.rows.len(), 3);
    assert!(sink.rows.iter().all(|r| r.len() == sink.header.len()));
    assert_eq!(sink.rows[0][..3], ["resnet50", "FP32", ""]);
    assert_eq!(sink.rows[2][..3], ["yolov5s", "INT8", "320"]);
}

#[test]
fn run_all_stops_on_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.yaml", "{}\n");
    write(
        dir.path(),
        "a/config.yaml",
        "prec: FP16\nfp_compile_options: x\n",
    );
    write(
        dir.path(),
        "output/a/1b.fp.compilation/compilation.bmodel",
        "x",
    );
    let tree = load(dir.path(), Target::Bm1684);
    let entries = tree.walk(&[]).unwrap();
    let schema = ReportSchema::new(&[], false);
    let provider = FlakyProvider { calls: Cell::new(0) };
    let orch = Orchestrator::new(&tree, &schema, RunOptions::default()).with_provider(&provider);

    let discovery = ArtifactDiscovery::NamingTemplate;
    let mut sink = MemoryReport::default();
    let err = run_all(&tree, &entries, discovery, &orch, &mut sink).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.to_string(), "invalid prec type \"FP16\" for BM1684");
}
