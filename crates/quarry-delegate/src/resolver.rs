//! Property resolution

use crate::{AccessPoint, DelegateError};
use quarry_site::{Properties, PropertyDescriptor};

/// Look up `name`, failing with `UnknownProperty`
pub fn resolve<'a>(properties: &'a Properties, name: &str) -> Result<&'a PropertyDescriptor, DelegateError> {
    properties.get(name).ok_or_else(|| DelegateError::UnknownProperty {
        scope: properties.scope().to_string(),
        name: name.to_string(),
    })
}

/// Resolve a dotted path, following one relation per segment.
///
/// `author.name` resolves `author` in `properties`, then `name` in the store
/// `author` points to.
pub fn resolve_path<'a>(
    path: &str,
    ap: AccessPoint<'a>,
    properties: &'a Properties,
) -> Result<&'a PropertyDescriptor, DelegateError> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let mut property = resolve(properties, first)?;
    let mut scope = properties.scope();

    for segment in segments {
        let remote = property.remote.as_ref().ok_or_else(|| DelegateError::NotARelation {
            scope: scope.to_string(),
            property: property.name.clone(),
        })?;
        let store = ap.remote_store(remote)?;
        property = resolve(store.properties(), segment)?;
        scope = store.id();
    }

    Ok(property)
}
