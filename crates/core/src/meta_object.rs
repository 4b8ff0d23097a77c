//! Meta-objects: queryable data sources exposed to the no-code layer.
//!
//! Meta-objects are authored elsewhere; this module only reads them. The
//! backend has shipped several payload shapes over time, so
//! [`normalize_meta_objects`] accepts all of them and silently drops
//! entries it cannot identify.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreResult;
use crate::payload::{list, scalar_text, text, unwrap_list};
use crate::services::MetaObjectSource;

/// Display name used when a meta-object carries none.
pub const UNNAMED_OBJECT_LABEL: &str = "Unnamed object";

/// Envelope keys a meta-object list may be wrapped in.
const ENVELOPE_KEYS: &[&str] = &["metaObjects", "objetos", "data"];

const ID_KEYS: &[&str] = &["metaId", "meta_id", "id", "_id"];
const SLUG_KEYS: &[&str] = &["idObjeto", "id_objeto", "slug", "apiName"];
const NAME_KEYS: &[&str] = &["nomeAmigavel", "nome_amigavel", "nome", "name", "label"];
const KIND_KEYS: &[&str] = &["tipo", "type", "kind"];
const FIELD_KEYS: &[&str] = &["fields", "campos"];
const COLUMN_KEYS: &[&str] = &["columns", "colunas"];
const COLUMN_NAME_KEYS: &[&str] = &["name", "nome", "label"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether a meta-object is system-provided or user-created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetaObjectKind {
    /// Read-only, provided by the platform.
    Base,
    /// Created by a user; may be deleted later.
    #[default]
    Customizado,
}

impl MetaObjectKind {
    /// Parse a stored kind. Only a case-insensitive `BASE` maps to
    /// [`MetaObjectKind::Base`]; anything else is user-created.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("base") {
            Self::Base
        } else {
            Self::Customizado
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "BASE",
            Self::Customizado => "CUSTOMIZADO",
        }
    }
}

/// One queryable data source in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaObject {
    pub meta_id: String,
    pub id_objeto: String,
    pub nome_amigavel: String,
    pub tipo: MetaObjectKind,
    /// Field names in source order, used to populate axis pickers.
    pub fields: Vec<String>,
}

impl MetaObject {
    /// Parse a single descriptor. Returns `None` when the entry is not an
    /// object or has no usable identifier.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let meta_id = text(obj, ID_KEYS)?;
        let id_objeto = text(obj, SLUG_KEYS).unwrap_or_else(|| meta_id.clone());
        let nome_amigavel =
            text(obj, NAME_KEYS).unwrap_or_else(|| UNNAMED_OBJECT_LABEL.to_string());
        let tipo = text(obj, KIND_KEYS)
            .map(|raw| MetaObjectKind::from_raw(&raw))
            .unwrap_or_default();

        Some(Self {
            meta_id,
            id_objeto,
            nome_amigavel,
            tipo,
            fields: resolve_fields(obj),
        })
    }

    pub fn is_base(&self) -> bool {
        self.tipo == MetaObjectKind::Base
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize any meta-object payload into canonical [`MetaObject`]s.
///
/// Accepts a bare array or an object wrapping the array under
/// `metaObjects`, `objetos` or `data`. Never fails.
pub fn normalize_meta_objects(payload: &Value) -> Vec<MetaObject> {
    let entries = unwrap_list(payload, ENVELOPE_KEYS);
    let objects: Vec<MetaObject> = entries.iter().filter_map(MetaObject::from_value).collect();

    let dropped = entries.len() - objects.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = objects.len(), "Dropped unidentifiable meta-objects");
    }
    objects
}

/// Fetch the meta-object list shown on the wizard's first step.
pub async fn load_meta_objects(source: &dyn MetaObjectSource) -> CoreResult<Vec<MetaObject>> {
    let payload = source.fetch_meta_objects().await?;
    Ok(payload.into_meta_objects())
}

/// Resolve field names from `fields` or, failing that, from `columns`.
///
/// Entries may be plain strings or objects naming the column under
/// `name`, `nome` or `label`. Blank names are skipped and duplicates keep
/// their first position.
fn resolve_fields(obj: &Map<String, Value>) -> Vec<String> {
    let source = list(obj, FIELD_KEYS)
        .filter(|items| !items.is_empty())
        .or_else(|| list(obj, COLUMN_KEYS));

    let mut fields: Vec<String> = Vec::new();
    for item in source.map(Vec::as_slice).unwrap_or(&[]) {
        let name = match item {
            Value::Object(column) => text(column, COLUMN_NAME_KEYS),
            other => scalar_text(other),
        };
        if let Some(name) = name {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
    }
    fields
}
