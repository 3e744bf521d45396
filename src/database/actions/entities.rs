use crate::{
    error::{Error, ErrorKind},
    permissions::{ensure_owned, Owner},
    schema::{EntityFields, EntityKind, Id, NamedEntity},
    store::Store,
};

pub async fn list_entities(
    store: &dyn Store,
    kind: EntityKind,
    owner: Owner,
    assigned_only: bool,
) -> Result<Vec<NamedEntity>, Error> {
    let mut tx = store.begin().await?;
    tx.list_entities(kind, owner, assigned_only).await
}

pub async fn get_entity(
    store: &dyn Store,
    kind: EntityKind,
    owner: Owner,
    id: Id,
) -> Result<NamedEntity, Error> {
    let mut tx = store.begin().await?;
    ensure_owned(owner, tx.get_entity(kind, owner, id).await?, &kind.to_string())
}

pub async fn update_entity(
    store: &dyn Store,
    kind: EntityKind,
    owner: Owner,
    id: Id,
    fields: &EntityFields,
) -> Result<NamedEntity, Error> {
    let what = kind.to_string();
    let mut tx = store.begin().await?;
    ensure_owned(owner, tx.get_entity(kind, owner, id).await?, &what)?;

    let updated = tx
        .update_entity(kind, owner, id, fields)
        .await
        .map_err(|e| match e.kind {
            ErrorKind::Conflict => ErrorKind::Conflict.new(&format!(
                "name: A {kind} named \"{}\" already exists",
                fields.name
            )),
            _ => e,
        })?;
    let updated = ensure_owned(owner, updated, &what)?;
    tx.commit().await?;

    Ok(updated)
}

/// Removing an entity also drops it from every recipe it was attached to.
pub async fn delete_entity(
    store: &dyn Store,
    kind: EntityKind,
    owner: Owner,
    id: Id,
) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    if !tx.delete_entity(kind, owner, id).await? {
        return Err(ErrorKind::NotFound.new(&format!("No {kind} found with the specified id")));
    }
    tx.commit().await?;

    log::trace!("User {} deleted {kind} {id}", owner.id());
    Ok(())
}
