use std::{panic, ptr, slice};

use thiserror::Error;

use crate::fill::{native::embedded, worker::panic_message};

/// Failure reported by a native module itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct NativeFault(pub String);

/// A precompiled solver reached through a byte-level call boundary.
///
/// Modules are not assumed to be thread safe: the adapter never calls one module
/// concurrently.
pub trait NativeModule: Send {
    /// Takes an encoded [`NativeRequest`](super::wire::NativeRequest) and returns an encoded
    /// [`NativeResponse`](super::wire::NativeResponse).
    fn call(&mut self, input: &[u8]) -> Result<Vec<u8>, NativeFault>;

    /// Whether a fault leaves the module unusable until it is loaded again.
    fn faults_are_sticky(&self) -> bool {
        true
    }
}

/// Loads (or reloads) a native module.
pub trait NativeLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn NativeModule>, NativeFault>;
}

impl<F> NativeLoader for F
where
    F: Fn() -> Result<Box<dyn NativeModule>, NativeFault> + Send + Sync,
{
    fn load(&self) -> Result<Box<dyn NativeModule>, NativeFault> {
        self()
    }
}

/// Output buffer owned by the native side until handed back to its free function.
#[repr(C)]
#[derive(Debug)]
pub struct NativeBuffer {
    pub data: *mut u8,
    pub len: usize,
}

/// `int solve(const uint8_t *input, size_t len, NativeBuffer *output)`, zero on success.
pub type SolveFn = unsafe extern "C" fn(input: *const u8, len: usize, output: *mut NativeBuffer) -> i32;

/// `void free_buffer(NativeBuffer buffer)`
pub type FreeFn = unsafe extern "C" fn(buffer: NativeBuffer);

/// Module exposed as a pair of C symbols.
pub struct CAbiModule {
    solve: SolveFn,
    free: FreeFn,
    sticky: bool,
}

impl CAbiModule {
    /// # Safety
    ///
    /// `solve` must write either a null buffer or a buffer of `len` initialized bytes that stays
    /// valid until passed to `free`, and `free` must accept every buffer `solve` produces.
    pub unsafe fn new(solve: SolveFn, free: FreeFn) -> CAbiModule {
        CAbiModule {
            solve,
            free,
            sticky: true,
        }
    }

    /// Declares that the module recovers from its own faults.
    pub fn with_recoverable_faults(mut self) -> CAbiModule {
        self.sticky = false;
        self
    }
}

impl NativeModule for CAbiModule {
    fn call(&mut self, input: &[u8]) -> Result<Vec<u8>, NativeFault> {
        let mut output = NativeBuffer {
            data: ptr::null_mut(),
            len: 0,
        };
        // SAFETY: the contract of `CAbiModule::new` covers the buffer returned by `solve`.
        let status = unsafe { (self.solve)(input.as_ptr(), input.len(), &mut output) };
        let bytes = if output.data.is_null() {
            vec![]
        } else {
            // SAFETY: see above; the buffer is copied before it is freed.
            let bytes = unsafe { slice::from_raw_parts(output.data, output.len) }.to_vec();
            unsafe { (self.free)(output) };
            bytes
        };

        if status != 0 {
            return Err(NativeFault(format!(
                "status {}: {}",
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(bytes)
    }

    fn faults_are_sticky(&self) -> bool {
        self.sticky
    }
}

fn export_buffer(bytes: Vec<u8>) -> NativeBuffer {
    let boxed = bytes.into_boxed_slice();
    let len = boxed.len();
    let data = Box::into_raw(boxed) as *mut u8;
    NativeBuffer { data, len }
}

/// C entry point of the embedded best-first solver.
///
/// # Safety
///
/// `input` must point to `len` readable bytes and `output` to a writable [`NativeBuffer`]. The
/// buffer written to `output` must be released with [`xfill_free_buffer`].
#[no_mangle]
pub unsafe extern "C" fn xfill_solve(input: *const u8, len: usize, output: *mut NativeBuffer) -> i32 {
    if input.is_null() || output.is_null() {
        return 2;
    }
    let input = slice::from_raw_parts(input, len);
    match panic::catch_unwind(|| embedded::solve_bytes(input)) {
        Ok(bytes) => {
            *output = export_buffer(bytes);
            0
        }
        Err(payload) => {
            *output = export_buffer(panic_message(payload.as_ref()).into_bytes());
            1
        }
    }
}

/// Releases a buffer produced by [`xfill_solve`].
///
/// # Safety
///
/// `buffer` must come from [`xfill_solve`] and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn xfill_free_buffer(buffer: NativeBuffer) {
    if !buffer.data.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
            buffer.data,
            buffer.len,
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::{xfill_free_buffer, xfill_solve, CAbiModule, NativeBuffer, NativeFault, NativeModule};
    use crate::fill::native::wire::NativeResponse;

    unsafe extern "C" fn failing_solve(
        _input: *const u8,
        _len: usize,
        output: *mut NativeBuffer,
    ) -> i32 {
        *output = super::export_buffer(b"out of memory".to_vec());
        12
    }

    #[test]
    fn c_abi_roundtrip() {
        let mut module = unsafe { CAbiModule::new(xfill_solve, xfill_free_buffer) };
        assert!(module.faults_are_sticky());

        let bytes = module.call(b"not a request").unwrap();
        assert!(matches!(
            NativeResponse::decode(&bytes),
            Ok(NativeResponse::Error { .. })
        ));
    }

    #[test]
    fn c_abi_status_is_a_fault() {
        let mut module =
            unsafe { CAbiModule::new(failing_solve, xfill_free_buffer) }.with_recoverable_faults();
        assert!(!module.faults_are_sticky());
        assert_eq!(
            Err(NativeFault(String::from("status 12: out of memory"))),
            module.call(b"{}")
        );
    }
}
