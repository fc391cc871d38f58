//! Lifecycle hooks around pattern transitions
//!
//! Every transition found by the scanner runs two hooks: `before_enter` and
//! `after_enter` around the push of an opened pattern, `before_exit` and
//! `after_exit` around the pop of a closed one. Hooks only see the scratch
//! map and the text since the previous transition; they cannot touch the
//! stacks.
//!
//! Configurations compose hooks with [`LifecycleHooks::chain`]: the first
//! set runs, then the second, for each of the four points.

use super::grammar::{Pattern, PatternId};
use super::matcher::Scratch;
use std::fmt;
use std::rc::Rc;

/// Where in a transition a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before the opened pattern is pushed
    BeforeEnter,
    /// After the opened pattern is pushed
    AfterEnter,
    /// Before the closed pattern is popped
    BeforeExit,
    /// After the closed pattern is popped
    AfterExit,
}

/// Data handed to a hook
pub struct HookContext<'a> {
    /// Pattern being entered or exited
    pub id: PatternId,
    /// The pattern itself
    pub pattern: &'a Pattern,
    /// Text skipped since the previous transition
    pub text_before: &'a str,
    /// Grammar-specific flags
    pub scratch: &'a mut Scratch,
    /// Pattern-context depth at the time the hook runs
    pub depth: usize,
}

impl HookContext<'_> {
    /// Store a boolean flag in the scratch map
    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.scratch
            .insert(key.to_string(), serde_json::Value::Bool(value));
    }
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("id", &self.id)
            .field("pattern", &self.pattern.name)
            .field("text_before", &self.text_before)
            .field("depth", &self.depth)
            .finish()
    }
}

/// A single hook
pub type Hook = Rc<dyn Fn(&mut HookContext<'_>)>;

/// Wrap a closure as a [`Hook`]
pub fn hook(f: impl Fn(&mut HookContext<'_>) + 'static) -> Hook {
    Rc::new(f)
}

/// Run `first` then `second`
pub fn chain_hooks(first: Option<&Hook>, second: Option<&Hook>) -> Option<Hook> {
    match (first, second) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(Rc::clone(only)),
        (Some(first), Some(second)) => {
            let (first, second) = (Rc::clone(first), Rc::clone(second));
            Some(Rc::new(move |ctx: &mut HookContext<'_>| {
                first(ctx);
                second(ctx);
            }))
        }
    }
}

/// The four hooks of a grammar
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    /// Runs before an opened pattern is pushed
    pub before_enter: Option<Hook>,
    /// Runs after an opened pattern is pushed
    pub after_enter: Option<Hook>,
    /// Runs before a closed pattern is popped
    pub before_exit: Option<Hook>,
    /// Runs after a closed pattern is popped
    pub after_exit: Option<Hook>,
}

impl LifecycleHooks {
    /// No hooks
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook for one point
    pub fn with(mut self, point: HookPoint, f: impl Fn(&mut HookContext<'_>) + 'static) -> Self {
        *self.slot_mut(point) = Some(hook(f));
        self
    }

    /// Hooks of `self` followed by hooks of `then`, point by point
    pub fn chain(&self, then: &LifecycleHooks) -> LifecycleHooks {
        LifecycleHooks {
            before_enter: chain_hooks(self.before_enter.as_ref(), then.before_enter.as_ref()),
            after_enter: chain_hooks(self.after_enter.as_ref(), then.after_enter.as_ref()),
            before_exit: chain_hooks(self.before_exit.as_ref(), then.before_exit.as_ref()),
            after_exit: chain_hooks(self.after_exit.as_ref(), then.after_exit.as_ref()),
        }
    }

    /// Hook registered for `point`
    pub fn get(&self, point: HookPoint) -> Option<&Hook> {
        match point {
            HookPoint::BeforeEnter => self.before_enter.as_ref(),
            HookPoint::AfterEnter => self.after_enter.as_ref(),
            HookPoint::BeforeExit => self.before_exit.as_ref(),
            HookPoint::AfterExit => self.after_exit.as_ref(),
        }
    }

    fn slot_mut(&mut self, point: HookPoint) -> &mut Option<Hook> {
        match point {
            HookPoint::BeforeEnter => &mut self.before_enter,
            HookPoint::AfterEnter => &mut self.after_enter,
            HookPoint::BeforeExit => &mut self.before_exit,
            HookPoint::AfterExit => &mut self.after_exit,
        }
    }

    /// Invoke the hook for `point`, if any
    #[inline]
    pub fn run(&self, point: HookPoint, ctx: &mut HookContext<'_>) {
        if let Some(hook) = self.get(point) {
            hook(ctx);
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("before_enter", &self.before_enter.is_some())
            .field("after_enter", &self.after_enter.is_some())
            .field("before_exit", &self.before_exit.is_some())
            .field("after_exit", &self.after_exit.is_some())
            .finish()
    }
}
