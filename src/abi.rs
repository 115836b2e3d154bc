//! Plugin ABI data contract (§6): the `repr(C)` layout a dynamically loaded
//! problem plugin populates to hand a [`crate::problem::Problem`]
//! implementation across an FFI boundary.
//!
//! This module only describes the wire shape and a safe [`ProblemFunctions`]
//! wrapper around the raw vtable; it does not `dlopen` anything. Loading a
//! shared object, resolving its entry symbol, and keeping the library
//! handle alive for as long as `instance` is in scope are the caller's
//! responsibility (`libloading` or `dlopen(2)` directly), kept out of this
//! crate the same way file/string parsing is.

use std::os::raw::{c_char, c_void};

/// Mirrors `ALPAQA_DL_ABI_VERSION`: the plugin and host must agree on this
/// value before any function pointer is followed.
pub const ABI_VERSION: u64 = 0xA1A0_0000_0002;

pub type Real = f64;
pub type Length = isize;
pub type Index = isize;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    Unsymmetric = 0,
    Upper = 1,
    Lower = 2,
}

/// Raw function-pointer vtable a plugin fills in. Every entry is optional
/// (`None` means "not implemented"); the required cost/gradient/constraint
/// evaluations are still plain `Option` here because the ABI promises
/// nothing at the type level — [`crate::problem::Problem`] is what enforces
/// "required vs optional" on the safe side of the boundary.
#[repr(C)]
pub struct ProblemFunctions {
    pub n: Length,
    pub m: Length,
    pub eval_f: Option<unsafe extern "C" fn(instance: *mut c_void, x: *const Real) -> Real>,
    pub eval_grad_f: Option<unsafe extern "C" fn(instance: *mut c_void, x: *const Real, grad_fx: *mut Real)>,
    pub eval_g: Option<unsafe extern "C" fn(instance: *mut c_void, x: *const Real, gx: *mut Real)>,
    pub eval_grad_g_prod: Option<
        unsafe extern "C" fn(instance: *mut c_void, x: *const Real, y: *const Real, grad_gxy: *mut Real),
    >,
    pub eval_jac_g: Option<unsafe extern "C" fn(instance: *mut c_void, x: *const Real, j_values: *mut Real)>,
    pub eval_grad_gi: Option<
        unsafe extern "C" fn(instance: *mut c_void, x: *const Real, i: Index, grad_gi: *mut Real),
    >,
    pub eval_hess_l_prod: Option<
        unsafe extern "C" fn(
            instance: *mut c_void,
            x: *const Real,
            y: *const Real,
            scale: Real,
            v: *const Real,
            hv: *mut Real,
        ),
    >,
    pub eval_hess_l: Option<
        unsafe extern "C" fn(instance: *mut c_void, x: *const Real, y: *const Real, scale: Real, h_values: *mut Real),
    >,
    pub eval_prox_grad_step: Option<
        unsafe extern "C" fn(
            instance: *mut c_void,
            gamma: Real,
            x: *const Real,
            grad_psi: *const Real,
            x_hat: *mut Real,
            p: *mut Real,
        ) -> Real,
    >,
    pub initialize_box_c: Option<unsafe extern "C" fn(instance: *mut c_void, lb: *mut Real, ub: *mut Real)>,
    pub initialize_box_d: Option<unsafe extern "C" fn(instance: *mut c_void, lb: *mut Real, ub: *mut Real)>,
    pub initialize_l1_reg:
        Option<unsafe extern "C" fn(instance: *mut c_void, lambda: *mut Real, size: *mut Length)>,
}

/// Opaque handle to a plugin-owned map of functions beyond the fixed
/// vtable above; never dereferenced by this crate.
#[repr(C)]
pub struct FunctionDict {
    _private: [u8; 0],
}

/// The struct a plugin's entry point (`alpaqa_problem_register_t`) returns.
#[repr(C)]
pub struct ProblemRegistration {
    pub abi_version: u64,
    pub instance: *mut c_void,
    pub functions: *mut ProblemFunctions,
    pub cleanup: Option<unsafe extern "C" fn(instance: *mut c_void)>,
    pub extra_functions: *mut FunctionDict,
}

/// Raised when a loaded plugin's registration cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("plugin ABI version {found:#x} does not match host version {expected:#x}")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("plugin registration returned a null instance pointer")]
    NullInstance,
    #[error("plugin registration returned a null function table")]
    NullFunctions,
}

/// Validates a raw [`ProblemRegistration`] against [`ABI_VERSION`] and
/// non-null instance/function-table invariants, without touching any
/// function pointer inside it.
///
/// # Safety
/// `registration` must point to a valid, fully initialized
/// `ProblemRegistration` for the duration of this call.
pub unsafe fn validate_registration(registration: *const ProblemRegistration) -> Result<(), AbiError> {
    let reg = &*registration;
    if reg.abi_version != ABI_VERSION {
        return Err(AbiError::VersionMismatch {
            expected: ABI_VERSION,
            found: reg.abi_version,
        });
    }
    if reg.instance.is_null() {
        return Err(AbiError::NullInstance);
    }
    if reg.functions.is_null() {
        return Err(AbiError::NullFunctions);
    }
    Ok(())
}

/// Symbol name a plugin shared object is expected to export, mirroring
/// `alpaqa_register_problem` / the `problem_register_t` entry point.
pub const ENTRY_SYMBOL: &[u8] = b"alpaqa_register_problem\0";

/// Just documents the expected signature of [`ENTRY_SYMBOL`]; callers doing
/// the actual `dlsym` transmute this to a function pointer of this type.
pub type EntryPoint = unsafe extern "C" fn(argc: Index, argv: *const *const c_char) -> ProblemRegistration;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_is_rejected() {
        let mut funcs = ProblemFunctions {
            n: 1,
            m: 0,
            eval_f: None,
            eval_grad_f: None,
            eval_g: None,
            eval_grad_g_prod: None,
            eval_jac_g: None,
            eval_grad_gi: None,
            eval_hess_l_prod: None,
            eval_hess_l: None,
            eval_prox_grad_step: None,
            initialize_box_c: None,
            initialize_box_d: None,
            initialize_l1_reg: None,
        };
        let reg = ProblemRegistration {
            abi_version: 1,
            instance: &mut () as *mut () as *mut c_void,
            functions: &mut funcs as *mut ProblemFunctions,
            cleanup: None,
            extra_functions: std::ptr::null_mut(),
        };
        let err = unsafe { validate_registration(&reg as *const ProblemRegistration) }.unwrap_err();
        assert_eq!(
            err,
            AbiError::VersionMismatch {
                expected: ABI_VERSION,
                found: 1
            }
        );
    }
}
