//! Runtime reflection registry
//!
//! The [`Registry`] is the schema database: every known message and enum
//! [`Type`], each owning its [`Field`] records, reachable by declared number
//! and by interned name. The descriptor loader populates it; the encode and
//! decode engines walk it.
//!
//! # Design
//!
//! Types and fields live in index-addressed arenas and are referenced by
//! [`TypeId`] / [`FieldId`] handles. Slots are never popped, so a handle
//! taken before a deletion still points at a slot afterwards; dereferencing
//! checks a liveness flag instead of risking a dangling pointer. A deleted
//! type keeps its slot and its name binding, and [`Registry::get_or_create_type`]
//! revives that same slot on re-registration, preserving outstanding handles.
//!
//! The registry is an explicit value. Callers wanting a shared instance pass
//! one around deliberately; there is no process-wide global. Nothing here
//! locks: concurrent use must be serialized by the caller.

use std::collections::HashMap;

use crate::names::{Name, NameTable};
use crate::wire::FieldKind;

/// Handle to a [`Type`] slot in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// Handle to a [`Field`] slot in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(u32);

/// One declared field (or enum constant) of a [`Type`]
#[derive(Debug, PartialEq)]
pub struct Field {
    /// Interned field name
    pub name: Name,
    /// Declared field number, or the constant's value on an enum type
    pub number: i32,
    /// Value type for message/enum/map fields; `None` for plain scalars
    pub value_type: Option<TypeId>,
    /// Declared default, kept as its textual descriptor form
    pub default_value: Option<Name>,
    /// 1-based oneof membership, 0 = none
    pub oneof_index: u32,
    /// Wire-level kind
    pub kind: FieldKind,
    pub repeated: bool,
    pub packed: bool,
    /// True when the field carries no value-type reference
    pub scalar: bool,
}

/// A named schema node: a message, map entry, or enum
#[derive(Debug)]
pub struct Type {
    name: Name,
    /// Byte offset of the last dotted path component within the name
    base_off: usize,
    by_number: HashMap<i32, FieldId>,
    by_name: HashMap<Name, FieldId>,
    oneofs: HashMap<u32, Name>,
    field_count: u32,
    pub is_enum: bool,
    pub is_map: bool,
    pub is_proto3: bool,
    is_dead: bool,
}

impl Type {
    /// Interned fully-qualified name
    #[inline]
    pub fn name(&self) -> Name {
        self.name
    }

    /// Number of live fields
    #[inline]
    pub fn field_count(&self) -> usize {
        self.field_count as usize
    }

    /// Oneof declaration name for a 1-based index
    pub fn oneof(&self, index: u32) -> Option<Name> {
        self.oneofs.get(&index).copied()
    }
}

/// The schema database
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) names: NameTable,
    types: Vec<Type>,
    type_index: HashMap<Name, TypeId>,
    fields: Vec<Option<Field>>,
    field_free: Vec<u32>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Return the live type registered under `name`, or register a new one
    ///
    /// A previously deleted type with the same key is revived in place
    /// rather than reallocated, so handles taken while it was dead remain
    /// valid.
    pub fn get_or_create_type(&mut self, name: &str) -> TypeId {
        let interned = self.names.intern(name);
        if let Some(&id) = self.type_index.get(&interned) {
            // Drop the duplicate reference taken by the intern above.
            self.names.release(interned);
            self.types[id.0 as usize].is_dead = false;
            return id;
        }
        let base_off = name.rfind('.').map_or(0, |dot| dot + 1);
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type {
            name: interned,
            base_off,
            by_number: HashMap::new(),
            by_name: HashMap::new(),
            oneofs: HashMap::new(),
            field_count: 0,
            is_enum: false,
            is_map: false,
            is_proto3: false,
            is_dead: false,
        });
        self.type_index.insert(interned, id);
        id
    }

    /// Dereference a type handle; `None` when the slot is dead
    pub fn get_type(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize).filter(|t| !t.is_dead)
    }

    pub(crate) fn type_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    /// Look up a live type by fully-qualified name
    ///
    /// Accepts both `".pkg.Msg"` and `"pkg.Msg"` spellings.
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        let interned = if name.starts_with('.') {
            self.names.lookup(name)
        } else {
            self.names.lookup(&format!(".{name}"))
        }?;
        let id = *self.type_index.get(&interned)?;
        self.get_type(id).map(|_| id)
    }

    /// Fully-qualified name of a type slot
    pub fn type_name(&self, id: TypeId) -> &str {
        self.types
            .get(id.0 as usize)
            .and_then(|t| self.names.resolve(t.name))
            .unwrap_or("")
    }

    /// Last dotted path component of a type's name
    pub fn type_basename(&self, id: TypeId) -> &str {
        let Some(t) = self.types.get(id.0 as usize) else {
            return "";
        };
        let name = self.names.resolve(t.name).unwrap_or("");
        &name[t.base_off.min(name.len())..]
    }

    /// Mark a type dead and free its fields
    ///
    /// The slot and its name binding are retained so outstanding handles
    /// stay valid and the type can be revived. Iteration and lookups stop
    /// reporting it immediately.
    pub fn delete_type(&mut self, id: TypeId) {
        let Some(slot) = self.types.get_mut(id.0 as usize) else {
            return;
        };
        let by_name = std::mem::take(&mut slot.by_name);
        slot.by_number.clear();
        let oneofs = std::mem::take(&mut slot.oneofs);
        slot.field_count = 0;
        slot.is_dead = true;
        for (_, fid) in by_name {
            self.free_field(fid);
        }
        for (_, name) in oneofs {
            self.names.release(name);
        }
    }

    /// Visit every live type exactly once, in unspecified order
    pub fn iter_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_dead)
            .map(|(i, _)| TypeId(i as u32))
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Return or create the field of `type_id` bound to both `name` and
    /// `number`
    ///
    /// A field already holding exactly this (name, number) pair is reused
    /// with its default cleared. A stale field bound to only one of the two
    /// keys is unlinked from **both** indices and freed, and the field count
    /// adjusted, so the by-number and by-name views never disagree.
    pub fn get_or_create_field(&mut self, type_id: TypeId, name: &str, number: i32) -> FieldId {
        let interned = self.names.intern(name);
        let ty = &self.types[type_id.0 as usize];
        let by_name_hit = ty.by_name.get(&interned).copied();
        let by_number_hit = ty.by_number.get(&number).copied();

        if let Some(fid) = by_name_hit {
            if by_number_hit == Some(fid) {
                self.names.release(interned);
                if let Some(field) = self.fields[fid.0 as usize].as_mut() {
                    if let Some(default) = field.default_value.take() {
                        self.names.release(default);
                    }
                }
                return fid;
            }
        }

        // Evict whichever stale fields held one of the two keys.
        if let Some(fid) = by_name_hit {
            self.unlink_field(type_id, fid);
        }
        if let Some(fid) = by_number_hit {
            self.unlink_field(type_id, fid);
        }

        let field = Field {
            name: interned,
            number,
            value_type: None,
            default_value: None,
            oneof_index: 0,
            kind: FieldKind::Int32,
            repeated: false,
            packed: false,
            scalar: true,
        };
        let fid = match self.field_free.pop() {
            Some(slot) => {
                self.fields[slot as usize] = Some(field);
                FieldId(slot)
            }
            None => {
                self.fields.push(Some(field));
                FieldId((self.fields.len() - 1) as u32)
            }
        };
        let ty = &mut self.types[type_id.0 as usize];
        ty.by_name.insert(interned, fid);
        ty.by_number.insert(number, fid);
        ty.field_count += 1;
        fid
    }

    /// Dereference a field handle; `None` when the slot has been freed
    pub fn get_field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.fields.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Field of a type by declared number
    pub fn field_by_number(&self, type_id: TypeId, number: i32) -> Option<FieldId> {
        self.get_type(type_id)?.by_number.get(&number).copied()
    }

    /// Field of a type by name
    pub fn field_by_name(&self, type_id: TypeId, name: &str) -> Option<FieldId> {
        let interned = self.names.lookup(name)?;
        self.get_type(type_id)?.by_name.get(&interned).copied()
    }

    /// Remove a field from both indices and free it
    ///
    /// Removal is atomic across the by-number and by-name views: after this
    /// call neither index reports the field and the count reflects it.
    pub fn delete_field(&mut self, type_id: TypeId, field_id: FieldId) {
        self.unlink_field(type_id, field_id);
    }

    /// Visit every live field of a type exactly once, in unspecified order
    pub fn iter_fields(&self, type_id: TypeId) -> impl Iterator<Item = FieldId> + '_ {
        self.get_type(type_id)
            .into_iter()
            .flat_map(|t| t.by_number.values().copied())
    }

    /// Oneof declaration name for a 1-based index
    pub fn oneof_name(&self, type_id: TypeId, index: u32) -> Option<&str> {
        let name = self.get_type(type_id)?.oneof(index)?;
        self.names.resolve(name)
    }

    pub(crate) fn set_oneof(&mut self, type_id: TypeId, index: u32, name: &str) {
        let interned = self.names.intern(name);
        if let Some(old) = self.types[type_id.0 as usize].oneofs.insert(index, interned) {
            self.names.release(old);
        }
    }

    /// Resolve an interned name, empty string for a freed handle
    pub(crate) fn name_str(&self, name: Name) -> &str {
        self.names.resolve(name).unwrap_or("")
    }

    fn unlink_field(&mut self, type_id: TypeId, field_id: FieldId) {
        let Some(field) = self.fields.get(field_id.0 as usize).and_then(Option::as_ref) else {
            return;
        };
        let name = field.name;
        let number = field.number;
        let ty = &mut self.types[type_id.0 as usize];
        let mut unlinked = false;
        if ty.by_name.get(&name) == Some(&field_id) {
            ty.by_name.remove(&name);
            unlinked = true;
        }
        if ty.by_number.get(&number) == Some(&field_id) {
            ty.by_number.remove(&number);
            unlinked = true;
        }
        if unlinked {
            ty.field_count = ty.field_count.saturating_sub(1);
            self.free_field(field_id);
        }
    }

    fn free_field(&mut self, field_id: FieldId) {
        if let Some(field) = self.fields[field_id.0 as usize].take() {
            self.names.release(field.name);
            if let Some(default) = field.default_value {
                self.names.release(default);
            }
            self.field_free.push(field_id.0);
        }
    }
}
