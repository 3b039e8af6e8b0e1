//! Helper macro for the binding table.
//!
//! `bind_native!` takes one entry per exposed routine and expands to an
//! `unsafe extern "C"` declaration carrying `#[link_name]`, plus a `BINDINGS`
//! table built from the same tokens, so the queryable metadata cannot drift
//! from what the linker actually sees.

/// Declare foreign routines bound directly onto native C runtime symbols.
///
/// # Usage
///
/// ```ignore
/// bind_native! {
///     /// Doc comment for the binding.
///     fixed fn local_name = "native_symbol"(arg: *const c_char) -> usize;
///     variadic fn other = "other_symbol"(fmt: *const c_char) -> c_int;
/// }
/// ```
///
/// `variadic` appends a C `...` tail after the listed parameters.
macro_rules! bind_native {
    (@decl fixed $(#[$meta:meta])* $local:ident $native:literal ( $($arg:ident : $argty:ty),* ) $ret:ty) => {
        unsafe extern "C" {
            $(#[$meta])*
            #[link_name = $native]
            pub fn $local( $($arg : $argty),* ) -> $ret;
        }
    };

    (@decl variadic $(#[$meta:meta])* $local:ident $native:literal ( $($arg:ident : $argty:ty),* ) $ret:ty) => {
        unsafe extern "C" {
            $(#[$meta])*
            #[link_name = $native]
            pub fn $local( $($arg : $argty,)* ... ) -> $ret;
        }
    };

    (@variadic fixed) => { false };
    (@variadic variadic) => { true };

    (
        $(
            $(#[$meta:meta])*
            $kind:ident fn $local:ident = $native:literal ( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty;
        )*
    ) => {
        $(
            bind_native!(@decl $kind $(#[$meta])* $local $native ( $($arg : $argty),* ) $ret);
        )*

        /// Every binding declared in this module, in declaration order.
        pub static BINDINGS: &[BindingDecl] = &[
            $(
                BindingDecl {
                    local_name: stringify!($local),
                    native_symbol: $native,
                    signature: Signature {
                        params: &[ $( (stringify!($arg), stringify!($argty)) ),* ],
                        variadic: bind_native!(@variadic $kind),
                        ret: stringify!($ret),
                    },
                    ownership: Ownership::BorrowedForCall,
                },
            )*
        ];
    };
}
