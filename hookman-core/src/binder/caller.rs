//! HookCaller - the dispatch object handed to the host application

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::loader::NativeLibrary;
use crate::error::{BindError, CallError};
use crate::spec::{
    CanonicalHookId, HookDescriptor, HookSignature, HookSpecRegistry, same_hook_name,
};

#[derive(Debug, Clone)]
struct Binding {
    address: NonNull<c_void>,
    plugin: String,
}

/// One call slot per hook in the spec
#[derive(Debug, Clone)]
pub struct HookSlot {
    descriptor: HookDescriptor,
    id: CanonicalHookId,
    binding: Option<Binding>,
}

impl HookSlot {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn id(&self) -> &CanonicalHookId {
        &self.id
    }

    pub fn descriptor(&self) -> &HookDescriptor {
        &self.descriptor
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Plugin providing the implementation, if bound
    pub fn plugin(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.plugin.as_str())
    }
}

/// Bound hook implementations plus the libraries that back them.
///
/// Built by [`LibraryBinder`](super::LibraryBinder) and never modified
/// afterward; rebuild it to pick up plugin changes. Calling an unbound hook
/// is the host's responsibility: [`HookCaller::function`] returns `None` for
/// it.
pub struct HookCaller {
    runtime: String,
    slots: Vec<HookSlot>,
    // Fields drop in declaration order, libraries go last.
    libraries: Vec<Box<dyn NativeLibrary>>,
}

impl HookCaller {
    pub(crate) fn unbound(registry: &HookSpecRegistry) -> Self {
        let slots = registry
            .hooks()
            .map(|(descriptor, id)| HookSlot {
                descriptor: descriptor.clone(),
                id: id.clone(),
                binding: None,
            })
            .collect();

        Self {
            runtime: registry.runtime().to_string(),
            slots,
            libraries: Vec::new(),
        }
    }

    /// Register an implementation. A slot accepts exactly one.
    pub(crate) fn bind_slot(
        &mut self,
        index: usize,
        address: NonNull<c_void>,
        plugin: &str,
    ) -> Result<(), BindError> {
        let slot = &mut self.slots[index];

        if let Some(existing) = &slot.binding {
            return Err(BindError::InternalConsistency {
                hook: slot.descriptor.name.clone(),
                bound_by: existing.plugin.clone(),
                rejected: plugin.to_string(),
            });
        }

        slot.binding = Some(Binding {
            address,
            plugin: plugin.to_string(),
        });
        Ok(())
    }

    pub(crate) fn retain_library(&mut self, library: Box<dyn NativeLibrary>) {
        self.libraries.push(library);
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn slots(&self) -> &[HookSlot] {
        &self.slots
    }

    pub fn slot(&self, hook: &str) -> Option<&HookSlot> {
        self.slots
            .iter()
            .find(|s| same_hook_name(&s.descriptor.name, hook))
    }

    pub fn is_bound(&self, hook: &str) -> bool {
        self.slot(hook).is_some_and(HookSlot::is_bound)
    }

    /// Number of libraries this caller keeps loaded
    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    /// Raw address bound to a hook
    pub fn address(&self, hook: &str) -> Option<NonNull<c_void>> {
        self.slot(hook)
            .and_then(|s| s.binding.as_ref())
            .map(|b| b.address)
    }

    /// Typed view of a bound hook.
    ///
    /// `F` is checked against the declared parameter and return types. The
    /// handle borrows the caller so it cannot outlive the library behind it.
    ///
    /// ```ignore
    /// type Friction = extern "C" fn(f64, f64) -> f64;
    /// if let Some(friction) = caller.function::<Friction>("friction")? {
    ///     let f = friction.call(1.0e5, 1.0e-4);
    /// }
    /// ```
    pub fn function<F: HookSignature>(
        &self,
        hook: &str,
    ) -> Result<Option<HookFn<'_, F>>, CallError> {
        let slot = self
            .slot(hook)
            .ok_or_else(|| CallError::UnknownHook(hook.to_string()))?;

        let expected = slot.descriptor.param_types();
        let params = F::params();
        let returns = F::returns();
        if params != expected || returns != slot.descriptor.returns {
            return Err(CallError::mismatch(
                &slot.descriptor.name,
                (&expected, slot.descriptor.returns),
                (&params, returns),
            ));
        }

        Ok(slot.binding.as_ref().map(|binding| HookFn {
            // SAFETY: The address was resolved from the plugin's export for
            // this hook and its signature matches the descriptor. The
            // library stays loaded for as long as `self` is borrowed.
            function: unsafe { F::from_address(binding.address) },
            _caller: PhantomData,
        }))
    }
}

impl fmt::Debug for HookCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCaller")
            .field("runtime", &self.runtime)
            .field("slots", &self.slots)
            .field("libraries", &self.libraries.len())
            .finish()
    }
}

/// A bound hook function borrowed from its [`HookCaller`].
///
/// The function pointer never leaves the handle; invoke it with `call`.
///
/// ```compile_fail
/// use hookman_core::HookCaller;
///
/// type Friction = extern "C" fn(f64) -> f64;
///
/// fn escape(caller: &HookCaller) -> Friction {
///     *caller.function::<Friction>("friction").unwrap().unwrap()
/// }
/// ```
///
/// ```compile_fail
/// use hookman_core::{HookCaller, HookFn};
///
/// type Friction = extern "C" fn(f64) -> f64;
///
/// fn outlive(caller: HookCaller) -> HookFn<'static, Friction> {
///     caller.function::<Friction>("friction").unwrap().unwrap()
/// }
/// ```
#[derive(Clone, Copy)]
pub struct HookFn<'caller, F> {
    function: F,
    _caller: PhantomData<&'caller HookCaller>,
}

macro_rules! impl_hook_call {
    ($($arg:ident: $ty:ident),+) => {
        impl<R, $($ty),+> HookFn<'_, extern "C" fn($($ty),+) -> R> {
            pub fn call(&self, $($arg: $ty),+) -> R {
                (self.function)($($arg),+)
            }
        }

        impl<R, $($ty),+> HookFn<'_, unsafe extern "C" fn($($ty),+) -> R> {
            /// # Safety
            ///
            /// Whatever contract the hook itself documents for its arguments.
            pub unsafe fn call(&self, $($arg: $ty),+) -> R {
                unsafe { (self.function)($($arg),+) }
            }
        }
    };
}

impl_hook_call!(a: A);
impl_hook_call!(a: A, b: B);
impl_hook_call!(a: A, b: B, c: C);
impl_hook_call!(a: A, b: B, c: C, d: D);
impl_hook_call!(a: A, b: B, c: C, d: D, e: E);
impl_hook_call!(a: A, b: B, c: C, d: D, e: E, g: G);

impl<F> fmt::Debug for HookFn<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookFn").finish_non_exhaustive()
    }
}
