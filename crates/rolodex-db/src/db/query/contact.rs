//! Contact, address and contact-tag queries.
//!
//! Every mutating query takes the owning user id and constrains on it, so a
//! row owned by someone else is indistinguishable from a missing row here.
//! Callers that need to tell the two apart use [`owners_of`] first.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{billing_address, contact, contact_tag, delivery_address, tag};
use crate::error::DbResult;
use crate::model::address::{
    AddressFields, BillingAddress, DeliveryAddress, NewBillingAddress, NewDeliveryAddress,
};
use crate::model::contact::{Contact, ContactChangeset, ContactDetails, NewContact};
use crate::model::tag::{ContactTag, Tag};

/// ## Summary
/// Returns a query over one user's contacts.
#[must_use]
pub fn for_user(user_id: uuid::Uuid) -> contact::BoxedQuery<'static, Pg> {
    contact::table
        .filter(contact::user_id.eq(user_id))
        .into_boxed()
}

/// ## Summary
/// Finds a contact by id regardless of owner.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, id: i64) -> DbResult<Option<Contact>> {
    Ok(contact::table
        .find(id)
        .select(Contact::as_select())
        .first::<Contact>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Counts the contacts a user owns.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn count_for_user(conn: &mut DbConnection<'_>, user_id: uuid::Uuid) -> DbResult<i64> {
    Ok(for_user(user_id).count().get_result::<i64>(conn).await?)
}

/// ## Summary
/// Returns `(id, owner)` for every listed contact that exists.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn owners_of(
    conn: &mut DbConnection<'_>,
    ids: &[i64],
) -> DbResult<Vec<(i64, uuid::Uuid)>> {
    Ok(contact::table
        .filter(contact::id.eq_any(ids))
        .select((contact::id, contact::user_id))
        .load::<(i64, uuid::Uuid)>(conn)
        .await?)
}

/// ## Summary
/// Loads a user's contacts, optionally restricted to `ids`, ordered by id.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn list_for_user(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    ids: Option<&[i64]>,
) -> DbResult<Vec<Contact>> {
    let mut query = for_user(user_id);
    if let Some(ids) = ids {
        query = query.filter(contact::id.eq_any(ids.to_vec()));
    }
    Ok(query
        .order(contact::id.asc())
        .select(Contact::as_select())
        .load::<Contact>(conn)
        .await?)
}

/// ## Summary
/// Inserts a contact and returns the stored row.
///
/// ## Errors
/// Returns database errors if the insert fails.
pub async fn insert(conn: &mut DbConnection<'_>, new_contact: &NewContact) -> DbResult<Contact> {
    Ok(diesel::insert_into(contact::table)
        .values(new_contact)
        .returning(Contact::as_returning())
        .get_result::<Contact>(conn)
        .await?)
}

/// ## Summary
/// Overwrites a contact's editable columns.
///
/// Returns `None` when no row with this id belongs to `user_id`, which also
/// covers a row deleted concurrently.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn update(
    conn: &mut DbConnection<'_>,
    id: i64,
    user_id: uuid::Uuid,
    changes: &ContactChangeset,
) -> DbResult<Option<Contact>> {
    Ok(diesel::update(
        contact::table
            .filter(contact::id.eq(id))
            .filter(contact::user_id.eq(user_id)),
    )
    .set(changes)
    .returning(Contact::as_returning())
    .get_result::<Contact>(conn)
    .await
    .optional()?)
}

/// ## Summary
/// Flips `is_favorite` on one contact.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn toggle_favorite(
    conn: &mut DbConnection<'_>,
    id: i64,
    user_id: uuid::Uuid,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<Option<Contact>> {
    Ok(diesel::update(
        contact::table
            .filter(contact::id.eq(id))
            .filter(contact::user_id.eq(user_id)),
    )
    .set((
        contact::is_favorite.eq(diesel::dsl::not(contact::is_favorite)),
        contact::updated_at.eq(Some(now)),
    ))
    .returning(Contact::as_returning())
    .get_result::<Contact>(conn)
    .await
    .optional()?)
}

/// ## Summary
/// Sets `is_favorite` on every listed contact owned by `user_id`.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn set_favorite(
    conn: &mut DbConnection<'_>,
    ids: &[i64],
    user_id: uuid::Uuid,
    is_favorite: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(diesel::update(
        contact::table
            .filter(contact::id.eq_any(ids))
            .filter(contact::user_id.eq(user_id)),
    )
    .set((
        contact::is_favorite.eq(is_favorite),
        contact::updated_at.eq(Some(now)),
    ))
    .execute(conn)
    .await?)
}

/// ## Summary
/// Deletes the listed contacts owned by `user_id`. Addresses and tag links
/// go with them through `ON DELETE CASCADE`.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete_many(
    conn: &mut DbConnection<'_>,
    ids: &[i64],
    user_id: uuid::Uuid,
) -> DbResult<usize> {
    Ok(diesel::delete(
        contact::table
            .filter(contact::id.eq_any(ids))
            .filter(contact::user_id.eq(user_id)),
    )
    .execute(conn)
    .await?)
}

/// ## Summary
/// Creates the contact's delivery address or updates it in place.
///
/// ## Errors
/// Returns database errors if the upsert fails.
pub async fn upsert_delivery_address(
    conn: &mut DbConnection<'_>,
    contact_id: i64,
    fields: AddressFields,
) -> DbResult<DeliveryAddress> {
    let row = NewDeliveryAddress::new(contact_id, fields);
    Ok(diesel::insert_into(delivery_address::table)
        .values(&row)
        .on_conflict(delivery_address::contact_id)
        .do_update()
        .set(&row)
        .returning(DeliveryAddress::as_returning())
        .get_result::<DeliveryAddress>(conn)
        .await?)
}

/// ## Summary
/// Creates the contact's billing address or updates it in place.
///
/// ## Errors
/// Returns database errors if the upsert fails.
pub async fn upsert_billing_address(
    conn: &mut DbConnection<'_>,
    contact_id: i64,
    fields: AddressFields,
) -> DbResult<BillingAddress> {
    let row = NewBillingAddress::new(contact_id, fields);
    Ok(diesel::insert_into(billing_address::table)
        .values(&row)
        .on_conflict(billing_address::contact_id)
        .do_update()
        .set(&row)
        .returning(BillingAddress::as_returning())
        .get_result::<BillingAddress>(conn)
        .await?)
}

/// ## Summary
/// Replaces the tag set of every listed contact with `tag_ids`.
///
/// Existing links are deleted and the new set inserted; no diffing. Both
/// slices are expected to be free of duplicates.
///
/// ## Errors
/// Returns database errors if either statement fails.
pub async fn replace_tags(
    conn: &mut DbConnection<'_>,
    contact_ids: &[i64],
    tag_ids: &[i64],
) -> DbResult<()> {
    diesel::delete(contact_tag::table.filter(contact_tag::contact_id.eq_any(contact_ids)))
        .execute(conn)
        .await?;

    let rows: Vec<ContactTag> = contact_ids
        .iter()
        .flat_map(|&contact_id| {
            tag_ids
                .iter()
                .map(move |&tag_id| ContactTag { contact_id, tag_id })
        })
        .collect();

    if !rows.is_empty() {
        diesel::insert_into(contact_tag::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    tracing::trace!(
        contact_count = contact_ids.len(),
        tag_count = tag_ids.len(),
        "Replaced contact tags"
    );

    Ok(())
}

/// ## Summary
/// Attaches addresses and tags to already-loaded contacts, preserving order.
///
/// ## Errors
/// Returns database errors if queries fail.
pub async fn load_details(
    conn: &mut DbConnection<'_>,
    contacts: Vec<Contact>,
) -> DbResult<Vec<ContactDetails>> {
    if contacts.is_empty() {
        return Ok(Vec::new());
    }

    let deliveries = DeliveryAddress::belonging_to(&contacts)
        .select(DeliveryAddress::as_select())
        .load::<DeliveryAddress>(conn)
        .await?
        .grouped_by(&contacts);

    let billings = BillingAddress::belonging_to(&contacts)
        .select(BillingAddress::as_select())
        .load::<BillingAddress>(conn)
        .await?
        .grouped_by(&contacts);

    let tags = ContactTag::belonging_to(&contacts)
        .inner_join(tag::table)
        .order(tag::name.asc())
        .select((ContactTag::as_select(), Tag::as_select()))
        .load::<(ContactTag, Tag)>(conn)
        .await?
        .grouped_by(&contacts);

    Ok(contacts
        .into_iter()
        .zip(deliveries)
        .zip(billings)
        .zip(tags)
        .map(|(((contact, delivery), billing), tags)| ContactDetails {
            contact,
            delivery_address: delivery.into_iter().next(),
            billing_address: billing.into_iter().next(),
            tags: tags.into_iter().map(|(_, tag)| tag).collect(),
        })
        .collect())
}

/// ## Summary
/// Loads one contact with its addresses and tags.
///
/// ## Errors
/// Returns database errors if queries fail.
pub async fn find_details(
    conn: &mut DbConnection<'_>,
    id: i64,
) -> DbResult<Option<ContactDetails>> {
    let Some(contact) = find(conn, id).await? else {
        return Ok(None);
    };
    Ok(load_details(conn, vec![contact]).await?.into_iter().next())
}
