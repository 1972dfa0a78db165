//! Command-line arguments of the `bmperf` binary.

use std::path::PathBuf;
use std::time::Duration;

use bmperf_metrics::Target;
use bmperf_runner::{ArtifactDiscovery, ReportSchema, RunOptions, TreeOverrides};
use clap::{Parser, ValueEnum};

/// bmperf - bmodel performance measurement on Sophon TPUs
#[derive(Debug, Parser)]
#[command(name = "bmperf")]
#[command(about = "Measure latency and utilization of every bmodel in an artifact tree")]
#[command(long_about = r#"
Walks an artifact tree (a directory with a global config.yaml and one
sub-directory with its own config.yaml per model), runs every compiled bmodel
on the TPU and writes one row per artifact to <outdir>/stats.csv.

Examples:
  # Measure everything under the current directory
  bmperf

  # Only resnet50 and yolov5s, on devices 0 and 1 of a BM1684X
  bmperf --target BM1684X --devices 0,1 resnet50 yolov5s

  # Artifacts produced by the MLIR toolchain, with simulator estimates
  bmperf --root /data/models --mlir --cmodel
"#)]
#[command(version)]
pub struct Cli {
    /// Artifact tree root
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Discover artifacts by scanning directories (MLIR toolchain layout)
    #[arg(long)]
    pub mlir: bool,

    /// Add simulator-estimate columns to the report
    #[arg(long)]
    pub cmodel: bool,

    /// Run direct measurements on every available device
    #[arg(long, alias = "use_all_devices")]
    pub use_all_devices: bool,

    /// Target chip (BM1684, BM1684X); overrides config.yaml and BMPERF_TARGET
    #[arg(long, value_name = "TARGET")]
    pub target: Option<Target>,

    /// Comma-separated device ids; overrides config.yaml and BMPERF_DEVICES
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub devices: Vec<i32>,

    /// Output directory; overrides config.yaml and BMPERF_OUTDIR
    #[arg(long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        default_value_t = LogFormat::Compact,
        env = "BMPERF_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Only measure these model directories
    #[arg(value_name = "MODELS")]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl Cli {
    pub fn overrides(&self) -> TreeOverrides {
        TreeOverrides {
            target: self.target,
            devices: (!self.devices.is_empty()).then(|| self.devices.clone()),
            outdir: self.outdir.clone(),
        }
    }

    pub fn discovery(&self) -> ArtifactDiscovery {
        if self.mlir {
            ArtifactDiscovery::DirectoryScan
        } else {
            ArtifactDiscovery::NamingTemplate
        }
    }

    /// Report layout for the given attribute columns; `--cmodel` adds the
    /// simulator-estimate columns.
    pub fn report_schema(&self, extras: &[String]) -> ReportSchema {
        ReportSchema::new(extras, self.cmodel)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            use_all_devices: self.use_all_devices,
            cpu_window: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Cli {
        Cli::try_parse_from(std::iter::once("bmperf").chain(line.split_whitespace())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse("");
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.overrides(), TreeOverrides::default());
        assert_eq!(cli.discovery(), ArtifactDiscovery::NamingTemplate);
        assert_eq!(cli.run_options(), RunOptions::default());
        assert_eq!(cli.log_level, "info");
        assert!(cli.models.is_empty());
    }

    #[test]
    fn overrides_from_flags() {
        let cli = parse("--target bm1684x --devices 0,2 --outdir out resnet50");
        assert_eq!(
            cli.overrides(),
            TreeOverrides {
                target: Some(Target::Bm1684x),
                devices: Some(vec![0, 2]),
                outdir: Some(PathBuf::from("out")),
            }
        );
        assert_eq!(cli.models, vec!["resnet50".to_string()]);
    }

    #[test]
    fn switches() {
        let cli = parse("--mlir --cmodel --use_all_devices --log-format json");
        assert_eq!(cli.discovery(), ArtifactDiscovery::DirectoryScan);
        assert!(cli.cmodel);
        assert!(cli.run_options().use_all_devices);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn cmodel_selects_the_estimate_schema() {
        let extras = vec!["prec".to_string()];
        assert!(!parse("").report_schema(&extras).estimates());

        let schema = parse("--cmodel").report_schema(&extras);
        assert!(schema.estimates());
        assert_eq!(schema.header(), ReportSchema::new(&extras, true).header());
        assert_eq!(schema.extras().collect::<Vec<_>>(), ["prec"]);
    }

    #[test]
    fn unknown_target_is_a_usage_error() {
        let err = Cli::try_parse_from(["bmperf", "--target", "BM1682"]).unwrap_err();
        assert!(err.to_string().contains("invalid target BM1682"));
    }

    #[test]
    fn bad_device_id_is_a_usage_error() {
        assert!(Cli::try_parse_from(["bmperf", "--devices", "0,x"]).is_err());
    }
}
