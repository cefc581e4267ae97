//! Class hierarchy for the host value model.
//!
//! Every runtime value has a most-derived class. Classes form a DAG with
//! multiple inheritance rooted at `object`. The resolver only ever asks two
//! questions of the hierarchy (is `a` a descendant of `b`, and what is the
//! class called), captured by [`ClassHierarchy`].
//!
//! Parents are fixed when a class is declared, so the full ancestor set is
//! computed once and descendant queries are a single set lookup.
//!
//! Class ids are only meaningful within the table that issued them. Every
//! [`ClassRef`] remembers its table, and builtin classes belong to all tables.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashSet;

use crate::error::{DispatchError, DispatchResult};

/// Identifier of a class in a [`ClassTable`]. The same id names unrelated
/// classes in different tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub const OBJECT: ClassId = ClassId(0);
    pub const NUMBER: ClassId = ClassId(1);
    pub const REAL: ClassId = ClassId(2);
    pub const INT: ClassId = ClassId(3);
    pub const FLOAT: ClassId = ClassId(4);
    pub const BOOL: ClassId = ClassId(5);
    pub const STR: ClassId = ClassId(6);
    pub const LIST: ClassId = ClassId(7);
    pub const TUPLE: ClassId = ClassId(8);
    pub const NONE: ClassId = ClassId(9);

    /// Index of this class in its table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of the [`ClassTable`] a class was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(u32);

impl TableId {
    /// Owner of the builtin classes, shared by every table.
    pub const BUILTIN: TableId = TableId(0);

    fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        TableId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builtin classes as `(name, parents)`, indexed by their fixed ids.
const BUILTINS: [(&str, &[ClassId]); 10] = [
    ("object", &[]),
    ("Number", &[ClassId::OBJECT]),
    ("Real", &[ClassId::NUMBER]),
    ("int", &[ClassId::REAL]),
    ("float", &[ClassId::REAL]),
    ("bool", &[ClassId::INT]),
    ("str", &[ClassId::OBJECT]),
    ("list", &[ClassId::OBJECT]),
    ("tuple", &[ClassId::OBJECT]),
    ("NoneType", &[ClassId::OBJECT]),
];

/// A class id paired with its name and owning table, so types can display
/// themselves without a table at hand. Equality and hashing ignore the name.
#[derive(Clone)]
pub struct ClassRef {
    id: ClassId,
    table: TableId,
    name: Arc<str>,
}

impl ClassRef {
    fn new(id: ClassId, table: TableId, name: Arc<str>) -> Self {
        Self { id, table, name }
    }

    /// Reference to one of the builtin classes. `id` must be one of the
    /// builtin [`ClassId`] constants.
    pub(crate) fn builtin(id: ClassId) -> Self {
        static REFS: OnceLock<Vec<ClassRef>> = OnceLock::new();
        let refs = REFS.get_or_init(|| {
            BUILTINS
                .iter()
                .enumerate()
                .map(|(i, (name, _))| {
                    ClassRef::new(ClassId(i as u32), TableId::BUILTIN, Arc::from(*name))
                })
                .collect()
        });
        refs[id.index()].clone()
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    /// The table that declared this class.
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.table == other.table
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.table.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The two queries the subtype relation needs from a host hierarchy.
pub trait ClassHierarchy {
    /// Whether `child` is `ancestor` or declares it (transitively) as a parent.
    fn is_descendant(&self, child: ClassId, ancestor: ClassId) -> bool;

    /// The declared name of a class.
    fn name(&self, class: ClassId) -> Option<&str>;
}

/// A declared class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Reference to this class.
    pub class: ClassRef,
    /// Directly declared parents.
    pub parents: Vec<ClassId>,
    /// All ancestors, including the class itself.
    ancestors: FxHashSet<ClassId>,
}

/// The default class hierarchy, pre-seeded with the builtin classes.
#[derive(Debug, Clone)]
pub struct ClassTable {
    id: TableId,
    classes: Vec<ClassInfo>,
}

impl ClassTable {
    /// Create a table holding only the builtin classes.
    pub fn new() -> Self {
        let mut table = Self {
            id: TableId::fresh(),
            classes: Vec::with_capacity(BUILTINS.len()),
        };
        for (name, parents) in BUILTINS {
            table.push(Arc::from(name), parents.to_vec(), TableId::BUILTIN);
        }
        table
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Whether `class` is a builtin or was declared in this table.
    pub fn owns(&self, class: &ClassRef) -> bool {
        class.table == TableId::BUILTIN || class.table == self.id
    }

    /// Declare a new class. Every class descends from `object` even when no
    /// parent is given.
    pub fn declare(&mut self, name: &str, parents: &[ClassId]) -> DispatchResult<ClassRef> {
        if let Some(missing) = parents.iter().find(|p| p.index() >= self.classes.len()) {
            return Err(DispatchError::UnknownClass(format!(
                "parent #{} of `{}`",
                missing.0, name
            )));
        }
        let parents = if parents.is_empty() {
            vec![ClassId::OBJECT]
        } else {
            parents.to_vec()
        };
        Ok(self.push(Arc::from(name), parents, self.id))
    }

    fn push(&mut self, name: Arc<str>, parents: Vec<ClassId>, table: TableId) -> ClassRef {
        let id = ClassId(self.classes.len() as u32);
        let mut ancestors = FxHashSet::default();
        ancestors.insert(id);
        for parent in &parents {
            ancestors.extend(self.classes[parent.index()].ancestors.iter().copied());
        }
        let class = ClassRef::new(id, table, name);
        self.classes.push(ClassInfo {
            class: class.clone(),
            parents,
            ancestors,
        });
        class
    }

    /// Look up a class.
    pub fn get(&self, id: ClassId) -> Option<&ClassInfo> {
        self.classes.get(id.index())
    }

    /// Find a class by name. Later declarations shadow earlier ones.
    pub fn find(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().rev().find(|c| c.class.name() == name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassHierarchy for ClassTable {
    fn is_descendant(&self, child: ClassId, ancestor: ClassId) -> bool {
        self.classes
            .get(child.index())
            .is_some_and(|info| info.ancestors.contains(&ancestor))
    }

    fn name(&self, class: ClassId) -> Option<&str> {
        self.get(class).map(|info| info.class.name())
    }
}
