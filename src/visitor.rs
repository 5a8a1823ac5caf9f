//! Ordered, early-exit traversal over a discovered module set.
//!
//! Every consumer iterates through `traverse` instead of its own loop, so
//! ordering, skip lists and short-circuiting behave identically everywhere.
//! Consumers implement `ModuleVisitor` or build a `FnVisitor` from closures.

use crate::module_graph::Module;
use crate::priority::DiscoveryKey;
use crate::walker::DiscoveredModuleSet;

/// Single-slot holder of a consumer's accumulating answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorResult<T> {
    value: T,
}

impl<T> VisitorResult<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> VisitorResult<Option<T>> {
    /// True once an early-exit consumer has an answer
    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }
}

pub trait ModuleVisitor {
    type Output;

    fn initial(&mut self) -> Self::Output;

    fn visit(&mut self, key: &DiscoveryKey, module: &Module, result: &mut VisitorResult<Self::Output>);

    /// Hook for the root module entry
    fn visit_root(&mut self, module: &Module, result: &mut VisitorResult<Self::Output>) {
        self.visit(&DiscoveryKey::ROOT, module, result);
    }

    /// Asked after each visited module
    fn should_stop(&self, _result: &VisitorResult<Self::Output>) -> bool {
        false
    }
}

/// Visit `set` in key order, skipping `skip_keys`, until exhausted or the
/// visitor asks to stop
pub fn traverse<V: ModuleVisitor>(set: &DiscoveredModuleSet, skip_keys: &[DiscoveryKey], visitor: &mut V) -> V::Output {
    let mut result = VisitorResult::new(visitor.initial());

    for (key, module) in set.iter() {
        if skip_keys.contains(key) {
            continue;
        }
        if key.is_root() {
            visitor.visit_root(module, &mut result);
        } else {
            visitor.visit(key, module, &mut result);
        }
        if visitor.should_stop(&result) {
            break;
        }
    }

    result.into_inner()
}

type VisitFn<'f, T> = Box<dyn FnMut(&DiscoveryKey, &Module, &mut VisitorResult<T>) + 'f>;
type RootFn<'f, T> = Box<dyn FnMut(&Module, &mut VisitorResult<T>) + 'f>;
type StopFn<'f, T> = Box<dyn Fn(&VisitorResult<T>) -> bool + 'f>;

/// Closure-built visitor
pub struct FnVisitor<'f, T> {
    initial: Option<T>,
    visit: VisitFn<'f, T>,
    visit_root: Option<RootFn<'f, T>>,
    stop: Option<StopFn<'f, T>>,
}

impl<'f, T> FnVisitor<'f, T> {
    pub fn new(initial: T, visit: impl FnMut(&DiscoveryKey, &Module, &mut VisitorResult<T>) + 'f) -> Self {
        Self {
            initial: Some(initial),
            visit: Box::new(visit),
            visit_root: None,
            stop: None,
        }
    }

    pub fn on_root(mut self, visit_root: impl FnMut(&Module, &mut VisitorResult<T>) + 'f) -> Self {
        self.visit_root = Some(Box::new(visit_root));
        self
    }

    pub fn stop_when(mut self, stop: impl Fn(&VisitorResult<T>) -> bool + 'f) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }
}

impl<'f, T: Default> ModuleVisitor for FnVisitor<'f, T> {
    type Output = T;

    fn initial(&mut self) -> T {
        self.initial.take().unwrap_or_default()
    }

    fn visit(&mut self, key: &DiscoveryKey, module: &Module, result: &mut VisitorResult<T>) {
        (self.visit)(key, module, result);
    }

    fn visit_root(&mut self, module: &Module, result: &mut VisitorResult<T>) {
        match self.visit_root.as_mut() {
            Some(visit_root) => visit_root(module, result),
            None => (self.visit)(&DiscoveryKey::ROOT, module, result),
        }
    }

    fn should_stop(&self, result: &VisitorResult<T>) -> bool {
        self.stop.as_ref().is_some_and(|stop| stop(result))
    }
}

/// Stop as soon as an `Option` answer is present
pub fn first_found<T>(result: &VisitorResult<Option<T>>) -> bool {
    result.is_found()
}
