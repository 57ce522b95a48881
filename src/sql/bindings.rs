//! Clause-keyed binding table.
//!
//! Every mutator that emits a `?` pushes its value under the clause it belongs
//! to. Flattening walks the clauses in [`BindingType::ALL`] order, which is the
//! order the grammar emits placeholders in.

use std::fmt;
use std::str::FromStr;

use super::error::{QueryError, QueryResult};
use super::value::Value;

/// The clause a bound value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    Order,
    Union,
    UnionOrder,
}

impl BindingType {
    /// All clauses in placeholder order.
    pub const ALL: [BindingType; 9] = [
        BindingType::Select,
        BindingType::From,
        BindingType::Join,
        BindingType::Where,
        BindingType::GroupBy,
        BindingType::Having,
        BindingType::Order,
        BindingType::Union,
        BindingType::UnionOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingType::Select => "select",
            BindingType::From => "from",
            BindingType::Join => "join",
            BindingType::Where => "where",
            BindingType::GroupBy => "groupBy",
            BindingType::Having => "having",
            BindingType::Order => "order",
            BindingType::Union => "union",
            BindingType::UnionOrder => "unionOrder",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindingType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| QueryError::InvalidBindingType(s.to_string()))
    }
}

/// Bound values grouped by clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    slots: [Vec<Value>; 9],
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value. Raw expressions are skipped, they never own a placeholder.
    pub fn push(&mut self, ty: BindingType, value: Value) {
        if !value.is_raw() {
            self.slots[ty.index()].push(value);
        }
    }

    pub fn extend<I>(&mut self, ty: BindingType, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        for value in values {
            self.push(ty, value);
        }
    }

    /// Add by clause name, failing on unknown names.
    pub fn push_named(&mut self, ty: &str, value: Value) -> QueryResult<()> {
        let ty = ty.parse::<BindingType>()?;
        self.push(ty, value);
        Ok(())
    }

    pub fn get(&self, ty: BindingType) -> &[Value] {
        &self.slots[ty.index()]
    }

    /// Replace one clause's values.
    pub fn set(&mut self, ty: BindingType, values: Vec<Value>) {
        self.slots[ty.index()] = values.into_iter().filter(|v| !v.is_raw()).collect();
    }

    pub fn clear(&mut self, ty: BindingType) {
        self.slots[ty.index()].clear();
    }

    /// Append every clause of `other` onto the matching clause here.
    pub fn merge(&mut self, other: &Bindings) {
        for ty in BindingType::ALL {
            self.slots[ty.index()].extend(other.get(ty).iter().cloned());
        }
    }

    /// All values in placeholder order.
    pub fn flatten(&self) -> Vec<Value> {
        self.flatten_in(&BindingType::ALL)
    }

    /// Values for the given clauses, in the order the clauses are listed.
    pub fn flatten_in(&self, order: &[BindingType]) -> Vec<Value> {
        order
            .iter()
            .flat_map(|ty| self.get(*ty).iter().cloned())
            .collect()
    }

    /// All values in placeholder order, skipping the excluded clauses.
    pub fn flatten_except(&self, excluded: &[BindingType]) -> Vec<Value> {
        BindingType::ALL
            .into_iter()
            .filter(|ty| !excluded.contains(ty))
            .flat_map(|ty| self.get(ty).iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }
}
