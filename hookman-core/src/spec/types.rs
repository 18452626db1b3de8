//! Native parameter types and the typed function-pointer bridge

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use serde::{Deserialize, Serialize};

/// C-ABI scalar type of a hook parameter or return value.
///
/// Spec files use the lowercase Rust names (`i32`, `f64`, `pointer`, ...);
/// the usual C spellings are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    #[serde(alias = "char")]
    I8,
    #[serde(alias = "short")]
    I16,
    #[serde(alias = "int")]
    I32,
    #[serde(alias = "long long")]
    I64,
    U8,
    U16,
    U32,
    U64,
    #[serde(alias = "ssize_t")]
    Isize,
    #[serde(alias = "size_t")]
    Usize,
    #[serde(alias = "float")]
    F32,
    #[serde(alias = "double")]
    F64,
    #[serde(alias = "void*", alias = "ptr")]
    Pointer,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Isize => "isize",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Pointer => "pointer",
        }
    }

    /// Render a signature as `fn(i32, f64) -> f64`.
    pub fn describe_signature(params: &[ParamType], returns: Option<ParamType>) -> String {
        let args = params
            .iter()
            .map(ParamType::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        match returns {
            Some(ret) => format!("fn({args}) -> {ret}"),
            None => format!("fn({args})"),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rust types that can cross the hook boundary as an argument.
pub trait NativeArg {
    const TYPE: ParamType;
}

macro_rules! native_arg {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(impl NativeArg for $ty {
            const TYPE: ParamType = ParamType::$kind;
        })+
    };
}

native_arg! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    isize => Isize,
    usize => Usize,
    f32 => F32,
    f64 => F64,
}

impl<T> NativeArg for *const T {
    const TYPE: ParamType = ParamType::Pointer;
}

impl<T> NativeArg for *mut T {
    const TYPE: ParamType = ParamType::Pointer;
}

/// Rust types a hook may return; `()` stands for `void`.
pub trait NativeReturn {
    const TYPE: Option<ParamType>;
}

impl NativeReturn for () {
    const TYPE: Option<ParamType> = None;
}

impl<T: NativeArg> NativeReturn for T {
    const TYPE: Option<ParamType> = Some(T::TYPE);
}

/// A C function-pointer type a bound hook can be viewed as.
///
/// Implemented for `extern "C" fn` and `unsafe extern "C" fn` pointers of
/// one to six [`NativeArg`] parameters.
///
/// # Safety
///
/// Implementors must be pointer-sized function pointer types so that
/// [`from_address`](Self::from_address) is a plain reinterpretation.
pub unsafe trait HookSignature: Copy {
    fn params() -> Vec<ParamType>;

    fn returns() -> Option<ParamType>;

    /// Reinterpret a resolved symbol address as this function type.
    ///
    /// # Safety
    ///
    /// `address` must point at a function with exactly this ABI and
    /// signature, and the code behind it must stay mapped while the
    /// returned pointer is used.
    unsafe fn from_address(address: NonNull<c_void>) -> Self;
}

macro_rules! impl_hook_signature {
    ($($arg:ident),+) => {
        unsafe impl<R: NativeReturn, $($arg: NativeArg),+> HookSignature for extern "C" fn($($arg),+) -> R {
            fn params() -> Vec<ParamType> {
                vec![$(<$arg as NativeArg>::TYPE),+]
            }

            fn returns() -> Option<ParamType> {
                R::TYPE
            }

            unsafe fn from_address(address: NonNull<c_void>) -> Self {
                unsafe { std::mem::transmute_copy::<NonNull<c_void>, Self>(&address) }
            }
        }

        unsafe impl<R: NativeReturn, $($arg: NativeArg),+> HookSignature for unsafe extern "C" fn($($arg),+) -> R {
            fn params() -> Vec<ParamType> {
                vec![$(<$arg as NativeArg>::TYPE),+]
            }

            fn returns() -> Option<ParamType> {
                R::TYPE
            }

            unsafe fn from_address(address: NonNull<c_void>) -> Self {
                unsafe { std::mem::transmute_copy::<NonNull<c_void>, Self>(&address) }
            }
        }
    };
}

impl_hook_signature!(A);
impl_hook_signature!(A, B);
impl_hook_signature!(A, B, C);
impl_hook_signature!(A, B, C, D);
impl_hook_signature!(A, B, C, D, E);
impl_hook_signature!(A, B, C, D, E, G);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        ty: ParamType,
    }

    fn parse(s: &str) -> ParamType {
        toml::from_str::<Wrapper>(&format!("ty = \"{s}\"")).unwrap().ty
    }

    #[test]
    fn test_param_type_parses_rust_names() {
        assert_eq!(parse("i32"), ParamType::I32);
        assert_eq!(parse("f64"), ParamType::F64);
        assert_eq!(parse("usize"), ParamType::Usize);
        assert_eq!(parse("pointer"), ParamType::Pointer);
    }

    #[test]
    fn test_param_type_accepts_c_aliases() {
        assert_eq!(parse("int"), ParamType::I32);
        assert_eq!(parse("double"), ParamType::F64);
        assert_eq!(parse("void*"), ParamType::Pointer);
        assert_eq!(parse("size_t"), ParamType::Usize);
    }

    #[test]
    fn test_signature_of_extern_fn() {
        type Friction = extern "C" fn(f64, f64) -> f64;
        assert_eq!(Friction::params(), vec![ParamType::F64, ParamType::F64]);
        assert_eq!(Friction::returns(), Some(ParamType::F64));
    }

    #[test]
    fn test_void_return_and_pointers() {
        type Notify = unsafe extern "C" fn(*const u8, usize);
        assert_eq!(Notify::params(), vec![ParamType::Pointer, ParamType::Usize]);
        assert_eq!(Notify::returns(), None);
    }

    #[test]
    fn test_from_address_roundtrips_function() {
        extern "C" fn double_it(v: i32) -> i32 {
            v * 2
        }
        let address = NonNull::new(double_it as *mut c_void).unwrap();
        let f = unsafe { <extern "C" fn(i32) -> i32>::from_address(address) };
        assert_eq!(f(21), 42);
    }

    #[test]
    fn test_describe_signature() {
        assert_eq!(
            ParamType::describe_signature(&[ParamType::I32, ParamType::F64], Some(ParamType::F64)),
            "fn(i32, f64) -> f64"
        );
        assert_eq!(ParamType::describe_signature(&[ParamType::Pointer], None), "fn(pointer)");
    }
}
