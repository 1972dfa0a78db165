//! Direct benchmark execution via dynamic loading.

use std::ffi::{CStr, CString, c_int};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{debug, info, warn};

use crate::cpu::CpuSampler;
use crate::error::{DeviceError, Result};
use crate::ffi::{GetDevNumFn, GetPerformanceFn, LatRes, MAX_DEVICES_NUM, ParamIn};

const GET_DEV_NUM: &str = "getDevNum";
const GET_PERFORMANCE: &str = "getPerformance";

/// Result of one direct benchmark execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    /// Average latency per iteration, ms.
    pub avg_latency_ms: f64,
    /// Frames per second across all devices used.
    pub throughput: f64,
    /// Input shape description reported by the library.
    pub shape: String,
    /// Harness CPU usage across the call, fraction of one core.
    pub cpu_usage: Option<f64>,
}

/// Something that can benchmark a compiled bmodel on a device set.
pub trait PerformanceProvider {
    /// Ids of every device the provider can drive.
    fn available_devices(&self) -> Result<Vec<i32>>;

    /// Run `rounds` iterations of `bmodel` spread over `devices`.
    fn get_performance(&self, rounds: u32, bmodel: &Path, devices: &[i32]) -> Result<Performance>;
}

/// `libbenchmark.so` loaded at runtime.
pub struct BenchmarkLibrary {
    lib: Library,
    path: PathBuf,
}

impl std::fmt::Debug for BenchmarkLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkLibrary")
            .field("path", &self.path)
            .finish()
    }
}

impl BenchmarkLibrary {
    /// Load the library at `path`. A bare file name goes through the
    /// platform loader search path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // SAFETY: the benchmark library has no initialisers with
        // preconditions beyond being loaded once per process image.
        let lib = unsafe { Library::new(&path) }.map_err(|source| DeviceError::LibraryLoad {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "loaded benchmark library");
        Ok(Self { lib, path })
    }

    fn symbol<T>(&self, name: &'static str) -> Result<Symbol<'_, T>> {
        // SAFETY: T is one of the function pointer types in `ffi`, matching
        // the declarations in the library's interface header.
        unsafe { self.lib.get::<T>(name.as_bytes()) }.map_err(|source| DeviceError::MissingSymbol {
            symbol: name,
            source,
        })
    }
}

impl PerformanceProvider for BenchmarkLibrary {
    fn available_devices(&self) -> Result<Vec<i32>> {
        let get_dev_num = self.symbol::<GetDevNumFn>(GET_DEV_NUM)?;
        // SAFETY: takes no arguments and only queries the driver.
        let count = unsafe { get_dev_num() }.max(0);
        let count = count as usize;
        if count > MAX_DEVICES_NUM {
            return Err(DeviceError::TooManyDevices {
                count,
                max: MAX_DEVICES_NUM,
            });
        }
        debug!(count, "enumerated TPU devices");
        Ok((0..count as i32).collect())
    }

    fn get_performance(&self, rounds: u32, bmodel: &Path, devices: &[i32]) -> Result<Performance> {
        if devices.is_empty() {
            return Err(DeviceError::NoDevice);
        }
        if devices.len() > MAX_DEVICES_NUM {
            return Err(DeviceError::TooManyDevices {
                count: devices.len(),
                max: MAX_DEVICES_NUM,
            });
        }
        let bmodel_fn = bmodel
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(|| DeviceError::InvalidPath(bmodel.to_path_buf()))?;

        let mut param = ParamIn {
            loop_num: c_int::try_from(rounds).unwrap_or(c_int::MAX),
            enable_copy: 1,
            use_dev_nums: devices.len() as c_int,
            dev_ids: [0; MAX_DEVICES_NUM],
            bmodel_fn: bmodel_fn.as_ptr(),
        };
        param.dev_ids[..devices.len()].copy_from_slice(devices);
        let mut res = LatRes::default();

        let get_performance = self.symbol::<GetPerformanceFn>(GET_PERFORMANCE)?;
        let mut sampler = CpuSampler::current();
        debug!(
            rounds,
            devices = ?devices,
            bmodel = %bmodel.display(),
            "calling getPerformance"
        );
        // SAFETY: `param` and `res` are live for the whole call and
        // `bmodel_fn` outlives `param`.
        let code = unsafe { get_performance(&mut param, &mut res) };
        let cpu_usage = sampler.as_mut().and_then(CpuSampler::usage);
        if code != 0 {
            return Err(DeviceError::Benchmark {
                code,
                path: bmodel.to_path_buf(),
            });
        }

        let shape = if res.shape_info.is_null() {
            warn!(bmodel = %bmodel.display(), "benchmark library reported no shape");
            String::new()
        } else {
            // SAFETY: non-null shape_info points at a nul-terminated string
            // owned by the library and valid until the next call.
            unsafe { CStr::from_ptr(res.shape_info) }
                .to_string_lossy()
                .into_owned()
        };

        Ok(Performance {
            avg_latency_ms: f64::from(res.avg_latency),
            throughput: f64::from(res.throughput),
            shape,
            cpu_usage,
        })
    }
}
