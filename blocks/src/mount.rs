//! The mount boundary: transform, bind, invoke and render one block, turning
//! every failure into an inert error node.

use std::any::Any;
use std::fmt;
use std::thread;

use interpreter::ComponentValue;
use jsx::LoweredCode;
use tracing::{debug, warn};

use crate::block::CustomBlock;
use crate::config::MountOptions;
use crate::node::{ErrorNode, RenderNode, Stage};
use crate::render;

/// Stack reserved for the thread that mounts one block. Transform, bind and
/// render all recurse over author code, and their depth limits are sized
/// against this rather than against the caller's stack.
pub const MOUNT_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub message: String,
}

impl Failure {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Failure {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

impl From<Failure> for RenderNode {
    fn from(failure: Failure) -> Self {
        RenderNode::Error(ErrorNode {
            stage: failure.stage,
            message: failure.message,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Pending,
    Succeeded,
    Failed,
}

/// Everything produced by one compilation of a block's source. Built fresh
/// for each mount and dropped with it.
#[derive(Debug, Default)]
pub struct CompiledUnit {
    pub lowered: Option<LoweredCode>,
    pub value: Option<ComponentValue>,
    pub failure: Option<Failure>,
}

impl CompiledUnit {
    pub fn state(&self) -> MountState {
        match (&self.failure, &self.value) {
            (Some(_), _) => MountState::Failed,
            (None, Some(_)) => MountState::Succeeded,
            (None, None) => MountState::Pending,
        }
    }
}

/// Transform then bind `source`. Stops at the first failing stage.
pub fn compile(source: &str, options: &MountOptions) -> CompiledUnit {
    let mut unit = CompiledUnit::default();
    let lowered = match jsx::transform(source) {
        Ok(lowered) => lowered,
        Err(e) => {
            unit.failure = Some(Failure::new(Stage::Transform, e.to_string()));
            return unit;
        }
    };
    match interpreter::bind_with(&lowered, &options.bind_options()) {
        Ok(value) => unit.value = Some(value),
        Err(e) => unit.failure = Some(Failure::new(Stage::Bind, e.to_string())),
    }
    unit.lowered = Some(lowered);
    unit
}

pub fn mount(block: &CustomBlock) -> RenderNode {
    mount_with(block, &MountOptions::default())
}

/// Mount `block` for the current render. Never panics and never returns an
/// error: failures come back as [`RenderNode::Error`].
///
/// The pipeline runs on its own thread with [`MOUNT_STACK_SIZE`] of stack.
/// Nothing it builds outlives the mount.
pub fn mount_with(block: &CustomBlock, options: &MountOptions) -> RenderNode {
    let result = thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name(format!("mount-{}", block.id))
            .stack_size(MOUNT_STACK_SIZE)
            .spawn_scoped(scope, || run(&block.source, options));
        match worker {
            Ok(handle) => handle.join().unwrap_or_else(|payload| {
                Err(Failure::new(
                    Stage::Render,
                    format!("internal error: {}", panic_message(payload.as_ref())),
                ))
            }),
            Err(e) => Err(Failure::new(
                Stage::Render,
                format!("internal error: cannot start mount thread: {}", e),
            )),
        }
    });
    match result {
        Ok(node) => {
            debug!(block = %block.id, empty = (node == RenderNode::Empty), "mounted custom block");
            node
        }
        Err(failure) => {
            warn!(block = %block.id, stage = %failure.stage, error = %failure.message, "custom block failed");
            failure.into()
        }
    }
}

fn run(source: &str, options: &MountOptions) -> Result<RenderNode, Failure> {
    let unit = compile(source, options);
    if let Some(failure) = unit.failure {
        return Err(failure);
    }
    let Some(mut component) = unit.value else {
        return Ok(RenderNode::Empty);
    };
    if !component.is_factory() {
        debug!(kind = component.value().type_of(), "bound value is not a component factory");
        return Ok(RenderNode::Empty);
    }
    let output = component
        .invoke()
        .map_err(|e| Failure::new(Stage::Render, e.to_string()))?;
    render::render(&mut component, &output).map_err(|e| Failure::new(Stage::Render, e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_records_the_failing_stage() {
        let options = MountOptions::default();

        let unit = compile("() => (<div>", &options);
        assert_eq!(unit.state(), MountState::Failed);
        assert!(unit.lowered.is_none());
        assert_eq!(unit.failure.unwrap().stage, Stage::Transform);

        let unit = compile("() => missing", &options);
        assert!(unit.lowered.is_some());
        assert_eq!(unit.failure.unwrap().stage, Stage::Bind);

        let unit = compile("() => 1", &options);
        assert_eq!(unit.state(), MountState::Succeeded);
        assert!(unit.value.unwrap().is_factory());
    }

    #[test]
    fn pending_until_compiled() {
        assert_eq!(CompiledUnit::default().state(), MountState::Pending);
    }

    #[test]
    fn panic_payloads_are_described() {
        let payload = std::panic::catch_unwind(|| panic!("exploded")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "exploded");

        let payload = thread::spawn(|| panic!("{} exploded", 2)).join().unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "2 exploded");
    }
}
