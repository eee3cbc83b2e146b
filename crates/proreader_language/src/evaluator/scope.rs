//! Variable frames.
//!
//! qmake scoping is shallow: there is one global frame, and each user
//! function call pushes a frame holding only its arguments (`ARGS`, `ARGC`,
//! `1`, `2`, ...). A name bound in the top function frame is local; every
//! other read or write goes to the global frame, so a function that assigns
//! `VAR` changes the caller's `VAR`.

use proreader_foundation::{ValueList, ValueMap};

/// Global frame plus a stack of function frames.
#[derive(Clone, Debug)]
pub struct ScopeStack {
    /// `frames[0]` is the global frame and is never popped.
    frames: Vec<ValueMap>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Creates a stack holding an empty global frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![ValueMap::new()],
        }
    }

    /// Number of frames, including the global one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Pushes a function frame.
    pub fn push_frame(&mut self, frame: ValueMap) {
        self.frames.push(frame);
    }

    /// Pops the top function frame. The global frame stays.
    pub fn pop_frame(&mut self) -> Option<ValueMap> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Pops frames until `depth` remain (never fewer than one).
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    /// Returns true if `name` is bound in the top function frame.
    #[must_use]
    pub fn is_local(&self, name: &str) -> bool {
        self.frames.len() > 1 && self.top().contains(name)
    }

    fn frame_for(&self, name: &str) -> &ValueMap {
        if self.is_local(name) {
            self.top()
        } else {
            self.global()
        }
    }

    fn frame_for_mut(&mut self, name: &str) -> &mut ValueMap {
        let index = if self.is_local(name) {
            self.frames.len() - 1
        } else {
            0
        };
        &mut self.frames[index]
    }

    /// Values of `name`, if bound.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ValueList> {
        self.frame_for(name).get(name)
    }

    /// Returns true if `name` is bound (even to an empty list).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.frame_for(name).contains(name)
    }

    /// Mutable values of `name`, binding it to an empty list first if needed.
    pub fn entry(&mut self, name: &str) -> &mut ValueList {
        self.frame_for_mut(name).entry(name)
    }

    /// Binds `name`.
    pub fn set(&mut self, name: &str, values: ValueList) {
        self.frame_for_mut(name).insert(name, values);
    }

    /// Unbinds `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<ValueList> {
        self.frame_for_mut(name).remove(name)
    }

    /// Binds `name` in the top frame, making it local to the current call.
    pub fn declare_local(&mut self, name: &str, values: ValueList) {
        let top = self.frames.len() - 1;
        self.frames[top].insert(name, values);
    }

    /// Moves a local binding into the global frame. Returns false if `name`
    /// was not local.
    pub fn export(&mut self, name: &str) -> bool {
        if !self.is_local(name) {
            return false;
        }
        let mut moved = None;
        for frame in self.frames[1..].iter_mut().rev() {
            if let Some(values) = frame.remove(name) {
                moved.get_or_insert(values);
            }
        }
        if let Some(values) = moved {
            self.frames[0].insert(name, values);
        }
        true
    }

    /// The global frame.
    #[must_use]
    pub fn global(&self) -> &ValueMap {
        &self.frames[0]
    }

    /// The global frame, mutably.
    pub fn global_mut(&mut self) -> &mut ValueMap {
        &mut self.frames[0]
    }

    /// The top frame (the global one outside of calls).
    #[must_use]
    pub fn top(&self) -> &ValueMap {
        &self.frames[self.frames.len() - 1]
    }

    /// The top frame, mutably.
    pub fn top_mut(&mut self) -> &mut ValueMap {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    /// Every visible variable name, sorted and without duplicates.
    #[must_use]
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .global()
            .sorted_names()
            .into_iter()
            .chain(self.top().sorted_names())
            .map(str::to_string)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
