use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::page::SectionKind;

/// Source given to a freshly inserted block. It must always mount to
/// non-error content.
pub const DEFAULT_SOURCE: &str = r#"() => {
  const [title] = React.useState('Custom block');
  return (
    <div className="custom-block">
      <h2>{title}</h2>
      <p>Edit the source of this block to build your own component.</p>
    </div>
  );
}"#;

/// One instance of author-supplied dynamic content.
///
/// The `id` is assigned once and kept across edits. The source is only ever
/// executed through transform and bind, on every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBlock {
    pub id: Uuid,
    #[serde(default)]
    pub source: String,
}

impl CustomBlock {
    pub fn new(id: Uuid, source: impl Into<String>) -> Self {
        CustomBlock {
            id,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> SectionKind {
        SectionKind::CustomCode
    }
}

/// A new block with a fresh identifier and [`DEFAULT_SOURCE`].
pub fn create_default() -> CustomBlock {
    CustomBlock::new(Uuid::new_v4(), DEFAULT_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blocks_get_distinct_ids() {
        let a = create_default();
        let b = create_default();
        assert_ne!(a.id, b.id);
        assert_eq!(a.source, DEFAULT_SOURCE);
        assert_eq!(a.kind(), SectionKind::CustomCode);
    }

    #[test]
    fn default_source_transforms() {
        let lowered = jsx::transform(DEFAULT_SOURCE).expect("default source must transform");
        assert!(lowered.as_str().contains("React.createElement(\"div\""));
    }
}
