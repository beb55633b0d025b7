//! Ownership tokens used to detect stale asynchronous continuations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use strum::{AsRefStr, Display, EnumIter};

use super::errors::{AnnotationError, AnnotationResult};
use super::trading_config::ConfigId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Loading,
    Saving,
}

/// `{operation kind -> current owner id}`, at most one owner per kind.
#[derive(Debug, Default, Clone)]
pub struct OwnershipMap {
    owners: HashMap<OperationKind, ConfigId>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as the sole owner of `kind`, superseding any previous owner.
    pub fn claim(&mut self, kind: OperationKind, id: ConfigId) -> Option<ConfigId> {
        self.owners.insert(kind, id)
    }

    /// Clears `kind` only if `id` still owns it.
    pub fn release(&mut self, kind: OperationKind, id: ConfigId) -> bool {
        if self.is_owner(kind, id) {
            self.owners.remove(&kind);
            true
        } else {
            false
        }
    }

    pub fn owner(&self, kind: OperationKind) -> Option<ConfigId> {
        self.owners.get(&kind).copied()
    }

    pub fn is_owner(&self, kind: OperationKind, id: ConfigId) -> bool {
        self.owner(kind) == Some(id)
    }

    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

pub type SharedOwnership = Rc<RefCell<OwnershipMap>>;

/// Token held by one in-flight operation; `check` fails once it was superseded.
#[derive(Debug, Clone)]
pub struct OwnershipGuard {
    map: SharedOwnership,
    kind: OperationKind,
    id: ConfigId,
}

impl OwnershipGuard {
    pub fn claim(map: &SharedOwnership, kind: OperationKind, id: ConfigId) -> Self {
        map.borrow_mut().claim(kind, id);
        Self { map: Rc::clone(map), kind, id }
    }

    pub fn id(&self) -> ConfigId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn is_current(&self) -> bool {
        self.map.borrow().is_owner(self.kind, self.id)
    }

    pub fn check(&self) -> AnnotationResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(AnnotationError::StaleOperation)
        }
    }

    pub fn release(self) -> bool {
        self.map.borrow_mut().release(self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_claim_supersedes_guard() {
        let map: SharedOwnership = Rc::default();
        let first = OwnershipGuard::claim(&map, OperationKind::Loading, ConfigId(7));
        assert!(first.check().is_ok());
        let second = OwnershipGuard::claim(&map, OperationKind::Loading, ConfigId(9));
        assert_eq!(first.check(), Err(AnnotationError::StaleOperation));
        assert!(second.is_current());
        assert!(!first.release());
        assert_eq!(map.borrow().owner(OperationKind::Loading), Some(ConfigId(9)));
    }

    #[test]
    fn kinds_are_independent() {
        let mut map = OwnershipMap::new();
        map.claim(OperationKind::Saving, ConfigId(1));
        map.claim(OperationKind::Loading, ConfigId(2));
        assert!(map.is_owner(OperationKind::Saving, ConfigId(1)));
        assert!(map.release(OperationKind::Loading, ConfigId(2)));
        assert_eq!(map.owner(OperationKind::Loading), None);
        assert_eq!(map.owner(OperationKind::Saving), Some(ConfigId(1)));
    }
}
