//! Runtime linkage audit.
//!
//! The linker already refuses to produce a binary when a bound symbol is
//! missing. This module answers the follow-up question at runtime: which
//! loaded object supplies each native symbol, and at what address.

use std::ffi::{CStr, CString, c_void};

use crate::bindings::{BINDINGS, BindingDecl};

/// Where a native symbol resolved in the running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub address: usize,
    /// Path of the shared object providing the symbol, when known.
    pub object: Option<String>,
}

/// Audit outcome for one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageReport {
    pub local_name: &'static str,
    pub native_symbol: &'static str,
    pub resolved: Option<ResolvedSymbol>,
}

impl LinkageReport {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Resolve `decl`'s native symbol through the dynamic loader's global scope.
#[cfg(unix)]
#[must_use]
pub fn resolve(decl: &BindingDecl) -> Option<ResolvedSymbol> {
    let name = CString::new(decl.native_symbol).ok()?;
    // SAFETY: `name` is a valid C string; RTLD_DEFAULT searches the global scope.
    let addr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
    if addr.is_null() {
        return None;
    }
    Some(ResolvedSymbol {
        address: addr as usize,
        object: containing_object(addr),
    })
}

/// Symbol lookup needs a dynamic loader; other targets report nothing.
#[cfg(not(unix))]
#[must_use]
pub fn resolve(_decl: &BindingDecl) -> Option<ResolvedSymbol> {
    None
}

#[cfg(unix)]
fn containing_object(addr: *mut c_void) -> Option<String> {
    let mut info = std::mem::MaybeUninit::<libc::Dl_info>::zeroed();
    // SAFETY: `info` is writable storage for one Dl_info.
    let found = unsafe { libc::dladdr(addr.cast_const(), info.as_mut_ptr()) };
    if found == 0 {
        return None;
    }
    // SAFETY: dladdr returned nonzero, so it filled `info`.
    let info = unsafe { info.assume_init() };
    if info.dli_fname.is_null() {
        return None;
    }
    // SAFETY: dli_fname is a null-terminated path owned by the loader.
    let path = unsafe { CStr::from_ptr(info.dli_fname) };
    Some(path.to_string_lossy().into_owned())
}

/// Audit every entry in the binding table.
#[must_use]
pub fn audit() -> Vec<LinkageReport> {
    BINDINGS
        .iter()
        .map(|decl| LinkageReport {
            local_name: decl.local_name,
            native_symbol: decl.native_symbol,
            resolved: resolve(decl),
        })
        .collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn every_binding_resolves_in_process() {
        let reports = audit();
        assert_eq!(reports.len(), BINDINGS.len());
        for report in &reports {
            assert!(
                report.is_resolved(),
                "{} -> {} did not resolve",
                report.local_name,
                report.native_symbol
            );
        }
    }

    #[test]
    fn resolved_address_is_nonzero() {
        let decl = crate::bindings::lookup("strlen").unwrap();
        let resolved = resolve(decl).unwrap();
        assert_ne!(resolved.address, 0);
    }

    #[test]
    fn unknown_symbol_does_not_resolve() {
        let decl = BindingDecl {
            native_symbol: "libcbind_no_such_symbol",
            ..*crate::bindings::lookup("strlen").unwrap()
        };
        assert!(resolve(&decl).is_none());
    }
}
