use scraper::ElementRef;
use serde::Serialize;

use crate::dom::tree::{child_elements, class_tokens, tag_name};

/// Ordered tag names of a node's direct element children.
///
/// Two nodes with equal structure signatures are structurally
/// interchangeable: same children, same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StructureSignature(pub Vec<String>);

/// Sorted, de-duplicated class tokens of a node. Order-independent by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassSignature(pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub structure: StructureSignature,
    pub class: ClassSignature,
}

impl StructureSignature {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0.join(">"))
    }
}

impl ClassSignature {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0.join("."))
    }
}

impl Signature {
    /// A node with neither children nor classes carries no pattern at all.
    pub fn is_extractable(&self) -> bool {
        !self.structure.is_empty() || !self.class.is_empty()
    }
}

/// Compute both fingerprints of `node`. Pure: identical subtree shape and
/// class attribute always give identical output.
pub fn signature(node: &ElementRef<'_>) -> Signature {
    Signature {
        structure: structure_signature(node),
        class: class_signature(node),
    }
}

pub fn structure_signature(node: &ElementRef<'_>) -> StructureSignature {
    StructureSignature(
        child_elements(*node)
            .iter()
            .map(|child| tag_name(child).to_string())
            .collect(),
    )
}

pub fn class_signature(node: &ElementRef<'_>) -> ClassSignature {
    let mut tokens: Vec<String> = class_tokens(node).into_iter().map(str::to_string).collect();
    tokens.sort();
    tokens.dedup();
    ClassSignature(tokens)
}

/// Short, stable hex label for a signature; used in logs and the run trace.
fn fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..10].to_string()
}
