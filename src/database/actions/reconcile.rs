use crate::{
    error::{Error, ErrorKind},
    permissions::{ensure_owned, Owner},
    schema::{EntityFields, EntityKind, NamedEntity, Recipe},
    store::Transaction,
};

/// Get-or-create for one descriptor.
///
/// The insert is guarded by the `(owner, name)` unique constraint. When it
/// reports a conflict another writer created the row after our lookup, so the
/// lookup is repeated once.
pub async fn resolve_entity(
    tx: &mut dyn Transaction,
    kind: EntityKind,
    owner: Owner,
    fields: &EntityFields,
) -> Result<NamedEntity, Error> {
    if let Some(entity) = tx.find_entity(kind, owner, fields).await? {
        return Ok(entity);
    }

    if let Some(entity) = tx.insert_entity(kind, owner, fields).await? {
        log::trace!("Created {kind} {} for user {}", entity.id, owner.id());
        return Ok(entity);
    }

    tx.find_entity(kind, owner, fields).await?.ok_or_else(|| {
        ErrorKind::InternalServerError.new(&format!(
            "Failed to create or find {kind} \"{}\"",
            fields.name
        ))
    })
}

/// Adds the entity for every descriptor to the recipe's `kind` association,
/// creating entities the owner doesn't have yet.
///
/// Existing members are left alone; callers that replace the membership clear
/// it first. Returns the resolved entities in descriptor order without
/// duplicates.
pub async fn reconcile(
    tx: &mut dyn Transaction,
    kind: EntityKind,
    owner: Owner,
    recipe: &Recipe,
    descriptors: &[EntityFields],
) -> Result<Vec<NamedEntity>, Error> {
    let recipe = ensure_owned(owner, Some(recipe), "recipe")?;
    let mut resolved: Vec<NamedEntity> = Vec::with_capacity(descriptors.len());

    for fields in descriptors {
        let entity = resolve_entity(tx, kind, owner, fields).await?;
        tx.add_to_association(kind, recipe.id, entity.id).await?;

        if !resolved.iter().any(|known| known.id == entity.id) {
            resolved.push(entity);
        }
    }

    Ok(resolved)
}
