//! Executing-script tracking and stack trace rendering.

use std::fmt::Write;
use std::sync::Mutex;

/// Source of the current call stack as text, innermost frame first.
pub trait StackSource: Send + Sync {
    fn capture(&self) -> String;
}

/// Stack of scripts currently executing in one context.
///
/// `None` frames are inline code with no URL.
#[derive(Default)]
pub struct ScriptStack {
    frames: Mutex<Vec<Option<String>>>,
}

impl ScriptStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame; it is popped when the returned guard drops.
    pub fn enter(&self, url: Option<&str>) -> ScriptFrame<'_> {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(url.map(str::to_string));
        }
        ScriptFrame { stack: self }
    }

    pub fn depth(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl StackSource for ScriptStack {
    fn capture(&self) -> String {
        let frames = self.frames.lock().map(|f| f.clone()).unwrap_or_default();
        let mut out = String::from("Error");
        for (depth, frame) in frames.iter().enumerate().rev() {
            let line = depth + 1;
            let _ = match frame {
                Some(url) => write!(out, "\n    at <anonymous> ({url}:{line}:1)"),
                None => write!(out, "\n    at <anonymous>:{line}:1"),
            };
        }
        out
    }
}

/// Guard for one executing script frame.
pub struct ScriptFrame<'a> {
    stack: &'a ScriptStack,
}

impl Drop for ScriptFrame<'_> {
    fn drop(&mut self) {
        if let Ok(mut frames) = self.stack.frames.lock() {
            frames.pop();
        }
    }
}
