//! Custom code blocks on a page: the persisted source model, the authoring
//! surface, and the mount boundary that turns a block into render output.

pub mod block;
pub mod config;
pub mod editor;
pub mod mount;
pub mod node;
pub mod page;
mod render;

pub use block::{CustomBlock, DEFAULT_SOURCE, create_default};
pub use config::{ConfigError, MAX_CALL_DEPTH_CEILING, MountOptions};
pub use editor::Editor;
pub use mount::{
    CompiledUnit, Failure, MOUNT_STACK_SIZE, MountState, compile, mount, mount_with,
};
pub use node::{ElementNode, ErrorNode, RenderNode, Stage};
pub use page::{GalleryEmbed, Hero, Page, PageError, Section, SectionKind};
pub use render::MAX_RENDER_DEPTH;
