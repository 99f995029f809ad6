use crate::resolver::resolve;
use crate::{AccessPoint, Delegate, DelegateError, Validation};
use quarry_query::{QueryNode, QuerySelect};
use quarry_site::{Properties, PropertyDescriptor, RemoteRef};
use quarry_sql::SelectStmt;

impl Delegate for QuerySelect {
    fn validate(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Validation, DelegateError> {
        if is_delegable(self, ap, properties)? {
            Ok(Validation::delegable(QueryNode::Select(self.clone())))
        } else {
            tracing::debug!(store = %ap.store.id(), "select kept residual");
            Ok(Validation::residual(QueryNode::Select(self.clone())))
        }
    }

    /// Replace the projection with this select's columns
    fn translate(
        &self,
        mut stmt: SelectStmt,
        ap: AccessPoint<'_>,
        properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        stmt.columns.clear();
        translate_select(self, stmt, ap, properties)
    }

    fn output_properties(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        let mut output = Properties::new(properties.scope());
        collect_outputs(self, ap, properties, &mut output)?;
        Ok(output)
    }
}

fn relation<'a>(
    properties: &'a Properties,
    name: &str,
) -> Result<(&'a PropertyDescriptor, &'a RemoteRef), DelegateError> {
    let property = resolve(properties, name)?;
    let remote = property.remote.as_ref().ok_or_else(|| DelegateError::NotARelation {
        scope: properties.scope().to_string(),
        property: name.to_string(),
    })?;
    Ok((property, remote))
}

/// Every sub-select must reach a joinable store; all or nothing
fn is_delegable(select: &QuerySelect, ap: AccessPoint<'_>, properties: &Properties) -> Result<bool, DelegateError> {
    for source in select.mapping.values() {
        resolve(properties, source)?;
    }

    let mut delegable = true;
    for (name, sub_select) in &select.sub_selects {
        let (_, remote) = relation(properties, name)?;
        let store = ap.remote_store(remote)?;
        let sub_delegable = is_delegable(sub_select, ap, store.properties())?;
        delegable &= sub_delegable && ap.can_join(store);
    }
    Ok(delegable)
}

/// Inner join each sub-select's store on
/// `local.column = remote.remote_property`, then append the mapped columns
fn translate_select(
    select: &QuerySelect,
    mut stmt: SelectStmt,
    ap: AccessPoint<'_>,
    properties: &Properties,
) -> Result<SelectStmt, DelegateError> {
    for (name, sub_select) in &select.sub_selects {
        let (property, remote) = relation(properties, name)?;
        let (store, table) = ap.joinable(remote)?;
        let remote_property = resolve(store.properties(), &remote.remote_property)?;
        let local = stmt
            .corresponding_column(&property.column)
            .ok_or_else(|| DelegateError::ColumnOutOfScope {
                column: property.column.to_string(),
            })?;

        stmt = stmt.join(table.clone(), local.eq(remote_property.column.clone()));
        stmt = translate_select(sub_select, stmt, ap, store.properties())?;
    }

    for (output, source) in &select.mapping {
        let property = resolve(properties, source)?;
        stmt = stmt.append_column(property.column.clone(), output);
    }
    Ok(stmt)
}

/// Output names bound to their source descriptors, sub-select outputs
/// flattened in
fn collect_outputs(
    select: &QuerySelect,
    ap: AccessPoint<'_>,
    properties: &Properties,
    output: &mut Properties,
) -> Result<(), DelegateError> {
    for (name, source) in &select.mapping {
        output.insert(resolve(properties, source)?.renamed(name));
    }
    for (name, sub_select) in &select.sub_selects {
        let (_, remote) = relation(properties, name)?;
        let store = ap.remote_store(remote)?;
        collect_outputs(sub_select, ap, store.properties(), output)?;
    }
    Ok(())
}
