//! Column-role mappings for the two lists being reconciled.
//!
//! A [`Mapping`] names which header carries each logical role. Only `code`
//! and `quantity` are mandatory; [`Mapping::guess`] fills unset roles from
//! common header spellings so simple exports work without configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{data::Table, error::ReconcileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Code,
    Quantity,
    Description,
    Revision,
    Category,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Code => "code",
            Role::Quantity => "quantity",
            Role::Description => "description",
            Role::Revision => "revision",
            Role::Category => "category",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Original,
    Partial,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Original => f.write_str("original"),
            Side::Partial => f.write_str("partial"),
        }
    }
}

// Lowercase header spellings tried, in order, by `Mapping::guess`.
const CODE_HEADERS: &[&str] = &[
    "codice",
    "code",
    "codice articolo",
    "part number",
    "part_number",
    "item",
    "articolo",
];
const QUANTITY_HEADERS: &[&str] = &["quantità", "quantita", "quantity", "qty", "qta", "qtà"];
const DESCRIPTION_HEADERS: &[&str] = &["descrizione", "description", "desc"];
const REVISION_HEADERS: &[&str] = &["revisione", "revision", "rev"];
const CATEGORY_HEADERS: &[&str] = &["categoria", "category", "cat"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mapping {
    pub code: Option<String>,
    pub quantity: Option<String>,
    pub description: Option<String>,
    pub revision: Option<String>,
    pub category: Option<String>,
}

impl Mapping {
    pub fn new(code: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            quantity: Some(quantity.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, column: impl Into<String>) -> Self {
        self.description = Some(column.into());
        self
    }

    pub fn with_revision(mut self, column: impl Into<String>) -> Self {
        self.revision = Some(column.into());
        self
    }

    pub fn with_category(mut self, column: impl Into<String>) -> Self {
        self.category = Some(column.into());
        self
    }

    pub fn column(&self, role: Role) -> Option<&str> {
        let value = match role {
            Role::Code => &self.code,
            Role::Quantity => &self.quantity,
            Role::Description => &self.description,
            Role::Revision => &self.revision,
            Role::Category => &self.category,
        };
        value.as_deref().filter(|c| !c.trim().is_empty())
    }

    fn slot(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::Code => &mut self.code,
            Role::Quantity => &mut self.quantity,
            Role::Description => &mut self.description,
            Role::Revision => &mut self.revision,
            Role::Category => &mut self.category,
        }
    }

    /// Fills unset roles from header names. Explicitly mapped roles are left
    /// untouched and a header is never assigned to two roles.
    pub fn guess(&mut self, headers: &[String]) {
        let candidates: [(Role, &[&str]); 5] = [
            (Role::Code, CODE_HEADERS),
            (Role::Quantity, QUANTITY_HEADERS),
            (Role::Description, DESCRIPTION_HEADERS),
            (Role::Revision, REVISION_HEADERS),
            (Role::Category, CATEGORY_HEADERS),
        ];
        for (role, spellings) in candidates {
            if self.column(role).is_some() {
                continue;
            }
            let found = spellings.iter().find_map(|spelling| {
                headers
                    .iter()
                    .find(|h| h.trim().to_lowercase() == *spelling && !self.is_assigned(h))
                    .cloned()
            });
            if let Some(header) = found {
                *self.slot(role) = Some(header);
            }
        }
    }

    fn is_assigned(&self, header: &str) -> bool {
        [
            Role::Code,
            Role::Quantity,
            Role::Description,
            Role::Revision,
            Role::Category,
        ]
        .into_iter()
        .any(|role| self.column(role) == Some(header))
    }

    /// Resolves the mandatory roles against a table. A column that is
    /// mapped but missing from the headers counts as unmapped.
    pub fn resolve<'a>(&'a self, side: Side, table: &Table) -> Result<ResolvedMapping<'a>, ReconcileError> {
        let required = |role: Role| {
            self.column(role)
                .filter(|column| table.has_column(column))
                .ok_or(ReconcileError::MissingMapping { side, role })
        };
        Ok(ResolvedMapping {
            code: required(Role::Code)?,
            quantity: required(Role::Quantity)?,
            description: self.column(Role::Description),
            revision: self.column(Role::Revision),
            category: self.column(Role::Category),
        })
    }
}

/// A mapping whose mandatory roles are known to exist.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMapping<'a> {
    pub code: &'a str,
    pub quantity: &'a str,
    pub description: Option<&'a str>,
    pub revision: Option<&'a str>,
    pub category: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mappings {
    pub original: Mapping,
    pub partial: Mapping,
}

impl Mappings {
    pub fn new(original: Mapping, partial: Mapping) -> Self {
        Self { original, partial }
    }

    pub fn side(&self, side: Side) -> &Mapping {
        match side {
            Side::Original => &self.original,
            Side::Partial => &self.partial,
        }
    }
}
