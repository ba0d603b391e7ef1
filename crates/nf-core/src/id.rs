use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

/// Global string interner for scene IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned, opaque identifier for a scene.
///
/// Freshly created scenes get a random UUID; documents loaded from disk may
/// carry any string, which is interned as-is so hand-edited files keep their
/// references. Internally a 4-byte `Spur` index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(Spur);

impl SceneId {
    /// Intern a string as a SceneId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        SceneId(INTERNER.get_or_intern(s))
    }

    /// Allocate a globally unique id.
    ///
    /// The interner never frees strings, so every generated id stays
    /// resident for the life of the process.
    pub fn generate() -> Self {
        Self::intern(&Uuid::new_v4().to_string())
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SceneId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SceneId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SceneId::intern(&s))
    }
}
