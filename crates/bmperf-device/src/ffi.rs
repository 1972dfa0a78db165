//! `#[repr(C)]` mirrors of the benchmark library interface.

use std::ffi::{c_char, c_float, c_int};

/// Capacity of [`ParamIn::dev_ids`].
pub const MAX_DEVICES_NUM: usize = 64;

#[repr(C)]
#[derive(Debug)]
pub(crate) struct ParamIn {
    pub loop_num: c_int,
    pub enable_copy: c_int,
    pub use_dev_nums: c_int,
    pub dev_ids: [c_int; MAX_DEVICES_NUM],
    pub bmodel_fn: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub(crate) struct LatRes {
    pub avg_latency: c_float,
    pub throughput: c_float,
    pub shape_info: *const c_char,
}

impl Default for LatRes {
    fn default() -> Self {
        Self {
            avg_latency: 0.0,
            throughput: 0.0,
            shape_info: std::ptr::null(),
        }
    }
}

pub(crate) type GetDevNumFn = unsafe extern "C" fn() -> c_int;
pub(crate) type GetPerformanceFn = unsafe extern "C" fn(*mut ParamIn, *mut LatRes) -> c_int;
