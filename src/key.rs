use crate::error::{Error, Result};
use crate::types::{TenantId, is_allowed_name_char};
use std::fmt;

/// Structured cache key: `entity:tenant:part...`.
///
/// Tenant scoping is carried as a typed field rather than a string
/// convention, so tenant-wide invalidation matches on the field and cannot
/// silently miss a malformed key. Segments are validated at construction;
/// `:` and `*` never appear inside one, which keeps the rendered form
/// unambiguous for pattern matching.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    entity: String,
    tenant: TenantId,
    parts: Vec<String>,
}

impl CacheKey {
    /// Creates a key from an entity name, tenant, and trailing parts.
    pub fn new<I, S>(entity: impl AsRef<str>, tenant: TenantId, parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entity = validate_segment(entity.as_ref(), "entity")?;
        let parts = parts
            .into_iter()
            .map(|part| validate_segment(part.as_ref(), "part"))
            .collect::<Result<Vec<String>>>()?;
        Ok(Self {
            entity,
            tenant,
            parts,
        })
    }

    /// Returns the entity segment.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the tenant this key is scoped to.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Returns the trailing parts.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.tenant)?;
        for part in &self.parts {
            write!(f, ":{part}")?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = Error;

    /// Parses the canonical `entity:tenant:part...` form.
    fn try_from(value: &str) -> Result<Self> {
        let mut segments = value.split(':');
        let entity = segments.next().unwrap_or_default();
        let Some(tenant) = segments.next() else {
            return Err(Error::InvalidCacheKey(format!(
                "expected entity:tenant:part... form, got {value:?}"
            )));
        };
        Self::new(entity, TenantId::new(tenant)?, segments)
    }
}

fn validate_segment(value: &str, kind: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::InvalidCacheKey(format!(
            "{kind} segment must not be empty"
        )));
    }
    if !value.chars().all(is_allowed_name_char) {
        return Err(Error::InvalidCacheKey(format!(
            "{kind} segment {value:?} contains invalid characters"
        )));
    }
    Ok(value.to_string())
}
