//! Contact store operations.
//!
//! Every operation takes the caller explicitly. Reads treat someone else's
//! contact as missing; writes report it as forbidden so a client can tell a
//! stale id from a wrong account.

pub mod transfer;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;

use rolodex_core::constants::{MAX_CONTACT_COUNT, MAX_IMAGE_SIZE};
use rolodex_core::util::text::capitalize_first;
use rolodex_db::db::connection::DbConnection;
use rolodex_db::db::query::contact_list::{self, ContactListQuery, ContactPage};
use rolodex_db::db::query::{contact, tag, user as account};
use rolodex_db::db::transaction::with_transaction;
use rolodex_db::model::address::AddressFields;
use rolodex_db::model::contact::{ContactChangeset, ContactDetails, NewContact};

use crate::auth::AuthenticatedUser;
use crate::error::{ID_MISMATCH, ServiceError, ServiceResult, ValidationErrors};

pub(crate) const CONTACT_NOT_FOUND: &str = "Contact not found";
pub(crate) const CONTACTS_NOT_FOUND: &str = "No contacts found.";
pub(crate) const CONTACT_LIMIT_REACHED: &str = "You have reached the maximum number of contacts.";
pub(crate) const IMAGE_TOO_LARGE: &str = "Image size cannot exceed 1MB";
const NO_CONTACT_IDS: &str = "No contact IDs were provided.";
const FOREIGN_CONTACT: &str = "You do not have access to this contact.";
const FOREIGN_CONTACTS: &str = "One or more contacts belong to another user.";
const UNKNOWN_TAGS: &str = "One or more tags do not exist.";

/// A contact as submitted by a client, before normalization.
///
/// `None` addresses mean "not supplied": on edit the stored address is left
/// as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInput {
    pub image: Option<Vec<u8>>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub delivery_address: Option<AddressFields>,
    pub billing_address: Option<AddressFields>,
    pub tag_ids: Vec<i64>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_address(address: AddressFields) -> AddressFields {
    AddressFields {
        country: blank_to_none(address.country),
        street: blank_to_none(address.street),
        city: blank_to_none(address.city),
        postal_code: blank_to_none(address.postal_code),
        province: blank_to_none(address.province),
    }
}

impl ContactInput {
    /// Normalizes the input and records field problems in `errors`, with
    /// field names prefixed by `prefix`.
    pub(crate) fn normalize_into(self, errors: &mut ValidationErrors, prefix: &str) -> Self {
        let first_name = capitalize_first(self.first_name.trim());
        if first_name.is_empty() {
            errors.add(
                &format!("{prefix}firstName"),
                "The FirstName field is required.",
            );
        }

        let image = self.image.filter(|bytes| !bytes.is_empty());
        if image.as_ref().is_some_and(|bytes| bytes.len() > MAX_IMAGE_SIZE) {
            errors.add(&format!("{prefix}image"), IMAGE_TOO_LARGE);
        }

        let tag_ids: BTreeSet<i64> = self.tag_ids.into_iter().collect();

        Self {
            image,
            first_name,
            last_name: blank_to_none(self.last_name),
            phone_number: blank_to_none(self.phone_number),
            email: blank_to_none(self.email),
            website: blank_to_none(self.website),
            notes: blank_to_none(self.notes),
            is_favorite: self.is_favorite,
            delivery_address: self.delivery_address.map(normalize_address),
            billing_address: self.billing_address.map(normalize_address),
            tag_ids: tag_ids.into_iter().collect(),
        }
    }

    /// ## Summary
    /// Trims, capitalizes and de-duplicates the input.
    ///
    /// ## Errors
    /// Returns a validation error when the first name is blank or the image
    /// is larger than 1 MiB.
    pub fn normalized(self) -> ServiceResult<Self> {
        let mut errors = ValidationErrors::default();
        let input = self.normalize_into(&mut errors, "");
        errors.into_result()?;
        Ok(input)
    }

    pub(crate) fn new_contact(
        &self,
        user_id: uuid::Uuid,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> NewContact {
        NewContact {
            user_id,
            image: self.image.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
            notes: self.notes.clone(),
            is_favorite: self.is_favorite,
            created_at,
            updated_at,
        }
    }

    fn changeset(&self, now: DateTime<Utc>) -> ContactChangeset {
        ContactChangeset {
            image: self.image.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
            notes: self.notes.clone(),
            is_favorite: self.is_favorite,
            updated_at: Some(now),
        }
    }
}

/// Checks that every id in `tag_ids` (already de-duplicated) is a tag owned
/// by `user_id`.
async fn verify_tags(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    tag_ids: &[i64],
) -> ServiceResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let owned = tag::owned_ids(conn, user_id, tag_ids).await?;
    if owned.len() != tag_ids.len() {
        tracing::debug!(
            requested = tag_ids.len(),
            owned = owned.len(),
            "Rejected unknown tag ids"
        );
        return Err(ServiceError::invalid("tagIds", UNKNOWN_TAGS));
    }
    Ok(())
}

/// Resolves one contact id for a write: missing is `NotFound`, someone
/// else's is `Forbidden`.
async fn authorize_single(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    id: i64,
) -> ServiceResult<()> {
    match contact::owners_of(conn, &[id]).await?.first() {
        None => Err(ServiceError::NotFound(CONTACT_NOT_FOUND.to_string())),
        Some((_, owner)) if *owner != user_id => {
            tracing::warn!(contact_id = id, "Write to another user's contact rejected");
            Err(ServiceError::Forbidden(FOREIGN_CONTACT.to_string()))
        }
        Some(_) => Ok(()),
    }
}

/// Resolves the ids of a bulk write to the existing contacts among them.
///
/// Ids that match nothing are dropped. One foreign contact rejects the whole
/// batch.
async fn authorize_bulk(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    ids: &[i64],
) -> ServiceResult<Vec<i64>> {
    if ids.is_empty() {
        return Err(ServiceError::InvalidRequest(NO_CONTACT_IDS.to_string()));
    }

    let owners = contact::owners_of(conn, ids).await?;
    if owners.is_empty() {
        return Err(ServiceError::NotFound(CONTACTS_NOT_FOUND.to_string()));
    }

    if owners.iter().any(|(_, owner)| *owner != user_id) {
        tracing::warn!(
            requested = ids.len(),
            "Bulk write touching another user's contacts rejected"
        );
        return Err(ServiceError::Forbidden(FOREIGN_CONTACTS.to_string()));
    }

    Ok(owners.into_iter().map(|(id, _)| id).collect())
}

/// Writes the supplied addresses of a contact; `None` leaves an address alone.
pub(crate) async fn write_addresses(
    conn: &mut DbConnection<'_>,
    contact_id: i64,
    delivery: Option<AddressFields>,
    billing: Option<AddressFields>,
) -> ServiceResult<()> {
    if let Some(fields) = delivery {
        contact::upsert_delivery_address(conn, contact_id, fields).await?;
    }
    if let Some(fields) = billing {
        contact::upsert_billing_address(conn, contact_id, fields).await?;
    }
    Ok(())
}

async fn load_owned_details(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    id: i64,
) -> ServiceResult<ContactDetails> {
    contact::find_details(conn, id)
        .await?
        .filter(|details| details.contact.user_id == user_id)
        .ok_or_else(|| ServiceError::NotFound(CONTACT_NOT_FOUND.to_string()))
}

/// ## Summary
/// Lists a page of the caller's contacts.
///
/// ## Errors
/// Returns database errors if queries fail.
#[tracing::instrument(skip(conn, user, query), fields(
    user_id = %user.id,
    tag_id = ?query.tag_id,
    has_search = query.search.is_some(),
    filter_count = query.filters.len()
))]
pub async fn list_contacts(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    query: &ContactListQuery,
) -> ServiceResult<ContactPage> {
    Ok(contact_list::list_contacts(conn, user.id, query).await?)
}

/// ## Summary
/// Fetches one of the caller's contacts with its addresses and tags.
///
/// ## Errors
/// Returns `NotFound` when the contact does not exist or belongs to someone
/// else.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn get_contact(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    id: i64,
) -> ServiceResult<ContactDetails> {
    load_owned_details(conn, user.id, id).await
}

/// ## Summary
/// Creates a contact for the caller.
///
/// ## Side Effects
/// - Locks the caller's account row and inserts the contact, any supplied
///   addresses and its tag links in one transaction
///
/// ## Errors
/// Returns an error if:
/// - the input fails validation or names tags the caller does not own
/// - the caller already owns the maximum number of contacts
/// - database operations fail
#[tracing::instrument(skip(conn, user, input), fields(user_id = %user.id))]
pub async fn add_contact(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    input: ContactInput,
) -> ServiceResult<ContactDetails> {
    let input = input.normalized()?;
    let user_id = user.id;

    let contact_id = with_transaction(conn, move |tx| {
        async move {
            account::lock_for_update(tx, user_id).await?;
            let count = contact::count_for_user(tx, user_id).await?;
            if count >= MAX_CONTACT_COUNT {
                tracing::debug!(count, "Contact limit reached");
                return Err(ServiceError::CapacityExceeded(
                    CONTACT_LIMIT_REACHED.to_string(),
                ));
            }

            verify_tags(tx, user_id, &input.tag_ids).await?;

            let created = contact::insert(tx, &input.new_contact(user_id, Utc::now(), None)).await?;
            write_addresses(
                tx,
                created.id,
                input.delivery_address,
                input.billing_address,
            )
            .await?;
            if !input.tag_ids.is_empty() {
                contact::replace_tags(tx, &[created.id], &input.tag_ids).await?;
            }

            Ok::<_, ServiceError>(created.id)
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(contact_id, "Contact created");

    load_owned_details(conn, user_id, contact_id).await
}

/// ## Summary
/// Replaces the editable fields of one of the caller's contacts.
///
/// Supplied addresses are created or updated in place; the tag set is
/// replaced wholesale.
///
/// ## Side Effects
/// - Updates the contact, its addresses and its tag links in one transaction
///
/// ## Errors
/// Returns an error if:
/// - `path_id` and `body_id` differ, or the input fails validation
/// - the contact does not exist (`NotFound`) or is someone else's (`Forbidden`)
/// - database operations fail
#[tracing::instrument(skip(conn, user, input), fields(user_id = %user.id))]
pub async fn edit_contact(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    path_id: i64,
    body_id: i64,
    input: ContactInput,
) -> ServiceResult<ContactDetails> {
    if path_id != body_id {
        return Err(ServiceError::InvalidRequest(ID_MISMATCH.to_string()));
    }
    let input = input.normalized()?;
    let user_id = user.id;

    with_transaction(conn, move |tx| {
        async move {
            authorize_single(tx, user_id, path_id).await?;
            verify_tags(tx, user_id, &input.tag_ids).await?;

            // Zero rows means the contact vanished after the ownership check.
            contact::update(tx, path_id, user_id, &input.changeset(Utc::now()))
                .await?
                .ok_or_else(|| ServiceError::NotFound(CONTACT_NOT_FOUND.to_string()))?;

            write_addresses(tx, path_id, input.delivery_address, input.billing_address).await?;
            contact::replace_tags(tx, &[path_id], &input.tag_ids).await?;

            Ok::<_, ServiceError>(())
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(contact_id = path_id, "Contact updated");

    load_owned_details(conn, user_id, path_id).await
}

/// ## Summary
/// Flips the favorite flag of one of the caller's contacts.
///
/// ## Errors
/// Returns `NotFound` or `Forbidden` as for [`edit_contact`], or database
/// errors.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn toggle_favorite(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    id: i64,
) -> ServiceResult<()> {
    authorize_single(conn, user.id, id).await?;

    let updated = contact::toggle_favorite(conn, id, user.id, Utc::now())
        .await?
        .ok_or_else(|| ServiceError::NotFound(CONTACT_NOT_FOUND.to_string()))?;

    tracing::debug!(is_favorite = updated.is_favorite, "Favorite toggled");
    Ok(())
}

/// ## Summary
/// Sets the favorite flag on a batch of the caller's contacts.
///
/// ## Errors
/// Returns an error if:
/// - `ids` is empty
/// - none of the ids exist
/// - any of them belongs to another user (nothing is modified)
/// - database operations fail
#[tracing::instrument(skip(conn, user, ids), fields(user_id = %user.id, id_count = ids.len()))]
pub async fn set_favorites(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    ids: &[i64],
    is_favorite: bool,
) -> ServiceResult<usize> {
    let user_id = user.id;
    let ids = ids.to_vec();

    let updated = with_transaction(conn, move |tx| {
        async move {
            let owned = authorize_bulk(tx, user_id, &ids).await?;
            let updated =
                contact::set_favorite(tx, &owned, user_id, is_favorite, Utc::now()).await?;
            Ok::<_, ServiceError>(updated)
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(updated, "Favorites updated");
    Ok(updated)
}

/// ## Summary
/// Replaces the tag set of every contact in a batch with `tag_ids`.
///
/// ## Errors
/// Same batch rules as [`set_favorites`], plus a validation error when a tag
/// id is not one of the caller's tags.
#[tracing::instrument(skip(conn, user, ids, tag_ids), fields(
    user_id = %user.id,
    id_count = ids.len(),
    tag_count = tag_ids.len()
))]
pub async fn replace_tags_bulk(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    ids: &[i64],
    tag_ids: &[i64],
) -> ServiceResult<usize> {
    let user_id = user.id;
    let ids = ids.to_vec();
    let tag_ids: Vec<i64> = tag_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

    let updated = with_transaction(conn, move |tx| {
        async move {
            let owned = authorize_bulk(tx, user_id, &ids).await?;
            verify_tags(tx, user_id, &tag_ids).await?;
            contact::replace_tags(tx, &owned, &tag_ids).await?;
            Ok::<_, ServiceError>(owned.len())
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(updated, "Contact tags replaced");
    Ok(updated)
}

/// ## Summary
/// Deletes one of the caller's contacts with its addresses and tag links.
///
/// ## Errors
/// Returns `NotFound` or `Forbidden` as for [`edit_contact`], or database
/// errors.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn delete_contact(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    id: i64,
) -> ServiceResult<()> {
    authorize_single(conn, user.id, id).await?;

    let deleted = contact::delete_many(conn, &[id], user.id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound(CONTACT_NOT_FOUND.to_string()));
    }

    tracing::info!(contact_id = id, "Contact deleted");
    Ok(())
}

/// ## Summary
/// Deletes a batch of the caller's contacts.
///
/// ## Errors
/// Same batch rules as [`set_favorites`].
#[tracing::instrument(skip(conn, user, ids), fields(user_id = %user.id, id_count = ids.len()))]
pub async fn delete_contacts(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    ids: &[i64],
) -> ServiceResult<usize> {
    let user_id = user.id;
    let ids = ids.to_vec();

    let deleted = with_transaction(conn, move |tx| {
        async move {
            let owned = authorize_bulk(tx, user_id, &ids).await?;
            Ok::<_, ServiceError>(contact::delete_many(tx, &owned, user_id).await?)
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(deleted, "Contacts deleted");
    Ok(deleted)
}
