//! Schema comparison
//!
//! [`diff`] lists the shape differences between two schema versions by
//! path. Each change knows whether it can break existing configurations or
//! stored state, which is what decides whether a schema upgrade needs a
//! version bump and a state migration.

use std::fmt;

use schemata_value::{AttributePath, Type};

use crate::attribute::{Attribute, AttributeKind};
use crate::block::{Block, Blocks};
use crate::nested::{Attributes, NestingMode};
use crate::schema::Schema;

/// One kind of difference
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// Attribute appeared
    AttributeAdded {
        /// Whether it must be configured
        required: bool,
    },

    /// Attribute disappeared
    AttributeRemoved,

    /// Block appeared
    BlockAdded {
        /// Minimum element count
        min_items: u64,
    },

    /// Block disappeared
    BlockRemoved,

    /// Value type changed
    TypeChanged {
        /// Previous type
        old: Type,
        /// Current type
        new: Type,
    },

    /// Nesting mode changed
    NestingChanged {
        /// Previous mode
        old: NestingMode,
        /// Current mode
        new: NestingMode,
    },

    /// Required flag changed
    RequiredChanged {
        /// New flag
        required: bool,
    },

    /// Optional flag changed
    OptionalChanged {
        /// New flag
        optional: bool,
    },

    /// Computed flag changed
    ComputedChanged {
        /// New flag
        computed: bool,
    },

    /// Sensitive flag changed
    SensitiveChanged {
        /// New flag
        sensitive: bool,
    },

    /// Deprecation message changed
    DeprecationChanged {
        /// New message, `None` when no longer deprecated
        message: Option<String>,
    },

    /// Plain or markdown description changed
    DescriptionChanged,

    /// Block bounds changed, as `(min_items, max_items)`
    ItemBoundsChanged {
        /// Previous bounds
        old: (u64, u64),
        /// Current bounds
        new: (u64, u64),
    },

    /// Schema version changed
    VersionChanged {
        /// Previous version
        old: i64,
        /// Current version
        new: i64,
    },
}

/// Difference at one path
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaChange {
    /// Path of the changed node, by names only
    pub path: AttributePath,

    /// What changed
    pub kind: ChangeKind,
}

impl SchemaChange {
    /// Whether existing configurations or state may no longer fit
    #[must_use]
    pub fn is_breaking(&self) -> bool {
        match &self.kind {
            ChangeKind::AttributeAdded { required } => *required,
            ChangeKind::BlockAdded { min_items } => *min_items > 0,
            ChangeKind::AttributeRemoved
            | ChangeKind::BlockRemoved
            | ChangeKind::TypeChanged { .. }
            | ChangeKind::NestingChanged { .. } => true,
            ChangeKind::RequiredChanged { required } => *required,
            ChangeKind::OptionalChanged { optional } => !*optional,
            ChangeKind::ItemBoundsChanged { old, new } => tighter(*old, *new),
            ChangeKind::ComputedChanged { .. }
            | ChangeKind::SensitiveChanged { .. }
            | ChangeKind::DeprecationChanged { .. }
            | ChangeKind::DescriptionChanged
            | ChangeKind::VersionChanged { .. } => false,
        }
    }
}

/// Whether `new` bounds reject some count `old` accepted (0 max is unbounded)
fn tighter(old: (u64, u64), new: (u64, u64)) -> bool {
    let max_tighter = new.1 > 0 && (old.1 == 0 || new.1 < old.1);
    new.0 > old.0 || max_tighter
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "<schema>".to_string()
        } else {
            self.path.to_string()
        };
        match &self.kind {
            ChangeKind::AttributeAdded { .. } => write!(f, "{path}: attribute added"),
            ChangeKind::AttributeRemoved => write!(f, "{path}: attribute removed"),
            ChangeKind::BlockAdded { .. } => write!(f, "{path}: block added"),
            ChangeKind::BlockRemoved => write!(f, "{path}: block removed"),
            ChangeKind::TypeChanged { old, new } => write!(f, "{path}: type {old} -> {new}"),
            ChangeKind::NestingChanged { old, new } => write!(f, "{path}: nesting {old} -> {new}"),
            ChangeKind::RequiredChanged { required } => write!(f, "{path}: required = {required}"),
            ChangeKind::OptionalChanged { optional } => write!(f, "{path}: optional = {optional}"),
            ChangeKind::ComputedChanged { computed } => write!(f, "{path}: computed = {computed}"),
            ChangeKind::SensitiveChanged { sensitive } => {
                write!(f, "{path}: sensitive = {sensitive}")
            }
            ChangeKind::DeprecationChanged { message: Some(m) } => {
                write!(f, "{path}: deprecated ({m})")
            }
            ChangeKind::DeprecationChanged { message: None } => {
                write!(f, "{path}: no longer deprecated")
            }
            ChangeKind::DescriptionChanged => write!(f, "{path}: description changed"),
            ChangeKind::ItemBoundsChanged { old, new } => write!(
                f,
                "{path}: items [{}, {}] -> [{}, {}]",
                old.0, old.1, new.0, new.1
            ),
            ChangeKind::VersionChanged { old, new } => write!(f, "{path}: version {old} -> {new}"),
        }
    }
}

/// Shape differences from `old` to `new`
///
/// Behaviour (validators, plan modifiers) is not compared. Changes are
/// listed depth-first in the declaration order of `old`, followed by
/// additions in the declaration order of `new`.
#[must_use]
pub fn diff(old: &Schema, new: &Schema) -> Vec<SchemaChange> {
    let mut changes = Changes::default();
    let root = AttributePath::root();
    if old.version() != new.version() {
        changes.push(&root, ChangeKind::VersionChanged {
            old: old.version(),
            new: new.version(),
        });
    }
    if old.description() != new.description()
        || old.markdown_description() != new.markdown_description()
    {
        changes.push(&root, ChangeKind::DescriptionChanged);
    }
    if old.deprecation_message() != new.deprecation_message() {
        changes.push(&root, ChangeKind::DeprecationChanged {
            message: new.deprecation_message().map(str::to_string),
        });
    }
    changes.members(
        (old.attributes(), old.blocks()),
        (new.attributes(), new.blocks()),
        &root,
    );

    tracing::debug!(
        changes = changes.0.len(),
        breaking = changes.0.iter().filter(|c| c.is_breaking()).count(),
        "Schemas compared"
    );
    changes.0
}

#[derive(Default)]
struct Changes(Vec<SchemaChange>);

impl Changes {
    fn push(&mut self, path: &AttributePath, kind: ChangeKind) {
        self.0.push(SchemaChange {
            path: path.clone(),
            kind,
        });
    }

    fn members(
        &mut self,
        (old_attributes, old_blocks): (&Attributes, &Blocks),
        (new_attributes, new_blocks): (&Attributes, &Blocks),
        path: &AttributePath,
    ) {
        for (name, old) in old_attributes {
            let path = path.at_name(name.as_str());
            match new_attributes.get(name) {
                Some(new) => self.attribute(old, new, &path),
                None => self.push(&path, ChangeKind::AttributeRemoved),
            }
        }
        for (name, old) in old_blocks {
            let path = path.at_name(name.as_str());
            match new_blocks.get(name) {
                Some(new) => self.block(old, new, &path),
                None => self.push(&path, ChangeKind::BlockRemoved),
            }
        }
        for (name, new) in new_attributes {
            if !old_attributes.contains_key(name) {
                self.push(&path.at_name(name.as_str()), ChangeKind::AttributeAdded {
                    required: new.is_required(),
                });
            }
        }
        for (name, new) in new_blocks {
            if !old_blocks.contains_key(name) {
                self.push(&path.at_name(name.as_str()), ChangeKind::BlockAdded {
                    min_items: new.min_items(),
                });
            }
        }
    }

    fn attribute(&mut self, old: &Attribute, new: &Attribute, path: &AttributePath) {
        match (old.kind(), new.kind()) {
            (AttributeKind::Type(a), AttributeKind::Type(b)) => {
                if a != b {
                    self.push(path, ChangeKind::TypeChanged {
                        old: a.clone(),
                        new: b.clone(),
                    });
                }
            }
            (AttributeKind::Nested(a), AttributeKind::Nested(b)) => {
                if a.nesting() == b.nesting() {
                    let empty = Blocks::new();
                    self.members((a.attributes(), &empty), (b.attributes(), &empty), path);
                } else {
                    self.push(path, ChangeKind::NestingChanged {
                        old: a.nesting(),
                        new: b.nesting(),
                    });
                }
            }
            _ => self.push(path, ChangeKind::TypeChanged {
                old: old.effective_type(),
                new: new.effective_type(),
            }),
        }

        if old.is_required() != new.is_required() {
            self.push(path, ChangeKind::RequiredChanged {
                required: new.is_required(),
            });
        }
        if old.is_optional() != new.is_optional() {
            self.push(path, ChangeKind::OptionalChanged {
                optional: new.is_optional(),
            });
        }
        if old.is_computed() != new.is_computed() {
            self.push(path, ChangeKind::ComputedChanged {
                computed: new.is_computed(),
            });
        }
        if old.is_sensitive() != new.is_sensitive() {
            self.push(path, ChangeKind::SensitiveChanged {
                sensitive: new.is_sensitive(),
            });
        }
        self.documentation(
            (old.description(), old.markdown_description(), old.deprecation_message()),
            (new.description(), new.markdown_description(), new.deprecation_message()),
            path,
        );
    }

    fn block(&mut self, old: &Block, new: &Block, path: &AttributePath) {
        if old.nesting() != new.nesting() {
            self.push(path, ChangeKind::NestingChanged {
                old: old.nesting().into(),
                new: new.nesting().into(),
            });
            return;
        }
        let old_bounds = (old.min_items(), old.max_items());
        let new_bounds = (new.min_items(), new.max_items());
        if old_bounds != new_bounds {
            self.push(path, ChangeKind::ItemBoundsChanged {
                old: old_bounds,
                new: new_bounds,
            });
        }
        self.documentation(
            (old.description(), old.markdown_description(), old.deprecation_message()),
            (new.description(), new.markdown_description(), new.deprecation_message()),
            path,
        );
        self.members(
            (old.attributes(), old.blocks()),
            (new.attributes(), new.blocks()),
            path,
        );
    }

    fn documentation(
        &mut self,
        old: (Option<&str>, Option<&str>, Option<&str>),
        new: (Option<&str>, Option<&str>, Option<&str>),
        path: &AttributePath,
    ) {
        if old.0 != new.0 || old.1 != new.1 {
            self.push(path, ChangeKind::DescriptionChanged);
        }
        if old.2 != new.2 {
            self.push(path, ChangeKind::DeprecationChanged {
                message: new.2.map(str::to_string),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockNesting;
    use crate::validator::LengthBetween;
    use pretty_assertions::assert_eq;

    fn string(required: bool) -> Attribute {
        let builder = Attribute::builder().ty(Type::String);
        let builder = if required { builder.required() } else { builder.optional() };
        builder.build().unwrap()
    }

    fn base() -> Schema {
        Schema::builder()
            .attribute("name", string(true))
            .attribute("note", string(false))
            .block(
                "rule",
                Block::builder(BlockNesting::List)
                    .attribute("cidr", string(false))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn identical_schemas_have_no_changes() {
        assert!(diff(&base(), &base()).is_empty());
    }

    #[test]
    fn behaviour_is_not_a_change() {
        let mut builder = Schema::builder()
            .attribute("name", string(true))
            .attribute("note", string(false));
        if let Some(note) = builder.attribute_mut("note") {
            note.add_validator(LengthBetween::new(0, 10));
        }
        let with_validator = builder
            .block(
                "rule",
                Block::builder(BlockNesting::List)
                    .attribute("cidr", string(false))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(with_validator, base());
        assert!(diff(&base(), &with_validator).is_empty());
    }

    #[test]
    fn classifies_changes() {
        let new = Schema::builder()
            .version(1)
            .attribute("name", string(true))
            .attribute("note", string(true))
            .attribute("extra", string(false))
            .block(
                "rule",
                Block::builder(BlockNesting::List)
                    .attribute(
                        "cidr",
                        Attribute::builder()
                            .ty(Type::list(Type::String))
                            .optional()
                            .build()
                            .unwrap(),
                    )
                    .max_items(3)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let changes = diff(&base(), &new);
        let rendered: Vec<(String, bool)> = changes
            .iter()
            .map(|c| (c.to_string(), c.is_breaking()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("<schema>: version 0 -> 1".to_string(), false),
                ("note: required = true".to_string(), true),
                ("note: optional = false".to_string(), true),
                ("rule: items [0, 0] -> [0, 3]".to_string(), true),
                ("rule.cidr: type string -> list(string)".to_string(), true),
                ("extra: attribute added".to_string(), false),
            ]
        );
    }

    #[test]
    fn removal_is_breaking() {
        let new = Schema::builder().attribute("name", string(true)).build().unwrap();
        let changes = diff(&base(), &new);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(SchemaChange::is_breaking));
    }

    #[test]
    fn bounds_tightening() {
        assert!(tighter((0, 0), (1, 0)));
        assert!(tighter((0, 5), (0, 3)));
        assert!(!tighter((1, 3), (0, 5)));
        assert!(!tighter((0, 3), (0, 0)));
    }
}
