//! Contact listing: whitelisted filter/sort parsing and the paginated query.
//!
//! Every field a client can name is mapped through [`SortField`] or
//! [`FilterField`]; nothing from the request is ever turned into a column
//! name directly.

use diesel::dsl;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel_async::RunQueryDsl;

use rolodex_core::constants::DEFAULT_PAGE_LIMIT;
use rolodex_core::error::{CoreError, CoreResult};

use crate::db::connection::DbConnection;
use crate::db::query::contact::{for_user, load_details};
use crate::db::query::text_match::contains_pattern;
use crate::db::schema::{billing_address, contact, contact_tag, delivery_address};
use crate::error::DbResult;
use crate::model::contact::{Contact, ContactDetails};

type ContactPredicate = Box<dyn BoxableExpression<contact::table, Pg, SqlType = Bool>>;

/// Column a contact page is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    FirstName,
    LastName,
    PhoneNumber,
    Email,
    Website,
}

impl SortField {
    /// ## Summary
    /// Resolves a client-supplied sort field name.
    ///
    /// Anything outside the whitelist, including the empty string, falls back
    /// to `FirstName`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "LastName" => Self::LastName,
            "PhoneNumber" => Self::PhoneNumber,
            "Email" => Self::Email,
            "Website" => Self::Website,
            _ => Self::FirstName,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Country,
    Street,
    City,
    PostalCode,
    Province,
}

impl AddressField {
    fn parse(lowercase: &str) -> Option<Self> {
        match lowercase {
            "country" => Some(Self::Country),
            "street" => Some(Self::Street),
            "city" => Some(Self::City),
            "postalcode" => Some(Self::PostalCode),
            "province" => Some(Self::Province),
            _ => None,
        }
    }
}

/// A text column reachable from a contact, matched by substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    FirstName,
    LastName,
    PhoneNumber,
    Email,
    DeliveryAddress(AddressField),
    BillingAddress(AddressField),
    Website,
    Notes,
}

impl TextField {
    /// Every field free-text search looks at.
    pub const SEARCHABLE: [Self; 16] = [
        Self::FirstName,
        Self::LastName,
        Self::PhoneNumber,
        Self::Email,
        Self::DeliveryAddress(AddressField::Country),
        Self::DeliveryAddress(AddressField::Street),
        Self::DeliveryAddress(AddressField::City),
        Self::DeliveryAddress(AddressField::PostalCode),
        Self::DeliveryAddress(AddressField::Province),
        Self::BillingAddress(AddressField::Country),
        Self::BillingAddress(AddressField::Street),
        Self::BillingAddress(AddressField::City),
        Self::BillingAddress(AddressField::PostalCode),
        Self::BillingAddress(AddressField::Province),
        Self::Website,
        Self::Notes,
    ];
}

/// A field accepted as a `filters[...]` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Text(TextField),
    IsFavorite,
}

impl FilterField {
    /// ## Summary
    /// Resolves a filter key such as `deliveryAddress.city`, ignoring case.
    ///
    /// Returns `None` for keys outside the whitelist.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let lowercase = name.to_ascii_lowercase();
        let field = match lowercase.as_str() {
            "firstname" => Self::Text(TextField::FirstName),
            "lastname" => Self::Text(TextField::LastName),
            "phonenumber" => Self::Text(TextField::PhoneNumber),
            "email" => Self::Text(TextField::Email),
            "website" => Self::Text(TextField::Website),
            "notes" => Self::Text(TextField::Notes),
            "isfavorite" => Self::IsFavorite,
            other => {
                if let Some(rest) = other.strip_prefix("deliveryaddress.") {
                    Self::Text(TextField::DeliveryAddress(AddressField::parse(rest)?))
                } else if let Some(rest) = other.strip_prefix("billingaddress.") {
                    Self::Text(TextField::BillingAddress(AddressField::parse(rest)?))
                } else {
                    return None;
                }
            }
        };
        Some(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFilter {
    pub field: FilterField,
    pub value: String,
}

/// Parameters of one contact listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactListQuery {
    pub tag_id: Option<i64>,
    pub search: Option<String>,
    pub filters: Vec<ContactFilter>,
    pub sort_field: SortField,
    pub sort_descending: bool,
    pub starting_index: i64,
    pub limit: i64,
}

impl Default for ContactListQuery {
    fn default() -> Self {
        Self {
            tag_id: None,
            search: None,
            filters: Vec::new(),
            sort_field: SortField::default(),
            sort_descending: false,
            starting_index: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ContactListQuery {
    /// ## Summary
    /// Builds a listing query from decoded URL query pairs.
    ///
    /// Parameter names are matched case-insensitively. `filters[<field>]=<value>`
    /// entries outside the whitelist and unknown parameters are ignored; a
    /// repeated filter key keeps its last value.
    ///
    /// ## Errors
    /// Returns [`CoreError::ValidationError`] when `tagId`, `startingIndex`,
    /// `limit` or `sortDescending` is malformed, or when a paging value is negative.
    pub fn from_query_pairs<'a, I>(pairs: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();

        for (key, value) in pairs {
            let lowercase = key.to_ascii_lowercase();
            match lowercase.as_str() {
                "tagid" => {
                    query.tag_id = if value.is_empty() {
                        None
                    } else {
                        Some(parse_number(key, value)?)
                    };
                }
                "search" => {
                    query.search = (!value.is_empty()).then(|| value.to_owned());
                }
                "sortfield" => query.sort_field = SortField::parse(value),
                "sortdescending" => query.sort_descending = parse_flag(key, value)?,
                "startingindex" => query.starting_index = parse_paging(key, value)?,
                "limit" => query.limit = parse_paging(key, value)?,
                other => {
                    let Some(name) = other
                        .strip_prefix("filters[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    else {
                        continue;
                    };
                    let Some(field) = FilterField::parse(name) else {
                        tracing::trace!(filter = %name, "Ignoring unknown contact filter");
                        continue;
                    };
                    query.filters.retain(|existing| existing.field != field);
                    query.filters.push(ContactFilter {
                        field,
                        value: value.to_owned(),
                    });
                }
            }
        }

        Ok(query)
    }
}

fn parse_number(key: &str, value: &str) -> CoreResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_err| CoreError::ValidationError(format!("The value '{value}' is not valid for {key}.")))
}

fn parse_paging(key: &str, value: &str) -> CoreResult<i64> {
    let number = parse_number(key, value)?;
    if number < 0 {
        return Err(CoreError::ValidationError(format!(
            "{key} must not be negative."
        )));
    }
    Ok(number)
}

fn parse_flag(key: &str, value: &str) -> CoreResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Ok(false),
        "true" => Ok(true),
        _ => Err(CoreError::ValidationError(format!(
            "The value '{value}' is not valid for {key}."
        ))),
    }
}

/// One page of contacts plus the size of the whole filtered set.
#[derive(Debug, Clone)]
pub struct ContactPage {
    pub data: Vec<ContactDetails>,
    pub total: i64,
    pub starting_index: i64,
    pub limit: i64,
}

macro_rules! address_match {
    (@column $table:ident, $column:ident, $pattern:expr) => {
        Box::new(
            contact::id.eq_any(
                $table::table
                    .filter($table::$column.assume_not_null().ilike($pattern))
                    .select($table::contact_id),
            ),
        ) as ContactPredicate
    };
    ($table:ident, $field:expr, $pattern:expr) => {
        match $field {
            AddressField::Country => address_match!(@column $table, country, $pattern),
            AddressField::Street => address_match!(@column $table, street, $pattern),
            AddressField::City => address_match!(@column $table, city, $pattern),
            AddressField::PostalCode => address_match!(@column $table, postal_code, $pattern),
            AddressField::Province => address_match!(@column $table, province, $pattern),
        }
    };
}

fn text_predicate(field: TextField, pattern: &str) -> ContactPredicate {
    let pattern = pattern.to_owned();
    match field {
        TextField::FirstName => Box::new(contact::first_name.ilike(pattern)),
        TextField::LastName => Box::new(contact::last_name.assume_not_null().ilike(pattern)),
        TextField::PhoneNumber => {
            Box::new(contact::phone_number.assume_not_null().ilike(pattern))
        }
        TextField::Email => Box::new(contact::email.assume_not_null().ilike(pattern)),
        TextField::Website => Box::new(contact::website.assume_not_null().ilike(pattern)),
        TextField::Notes => Box::new(contact::notes.assume_not_null().ilike(pattern)),
        TextField::DeliveryAddress(address_field) => {
            address_match!(delivery_address, address_field, pattern)
        }
        TextField::BillingAddress(address_field) => {
            address_match!(billing_address, address_field, pattern)
        }
    }
}

fn filter_predicate(filter: &ContactFilter) -> ContactPredicate {
    match filter.field {
        FilterField::Text(field) => text_predicate(field, &contains_pattern(&filter.value)),
        FilterField::IsFavorite => match filter.value.trim().to_ascii_lowercase().as_str() {
            "true" => Box::new(contact::is_favorite.eq(true)),
            "false" => Box::new(contact::is_favorite.eq(false)),
            _ => Box::new(dsl::sql::<Bool>("FALSE")),
        },
    }
}

fn search_predicate(search: &str) -> ContactPredicate {
    let pattern = contains_pattern(search);
    let mut predicate = text_predicate(TextField::FirstName, &pattern);
    for field in TextField::SEARCHABLE
        .iter()
        .filter(|field| **field != TextField::FirstName)
    {
        predicate = Box::new(predicate.or(text_predicate(*field, &pattern)));
    }
    predicate
}

/// ## Summary
/// Returns the caller's contacts narrowed by tag, search and filters.
///
/// Built fresh for each use since boxed predicates cannot be cloned.
fn scoped(user_id: uuid::Uuid, query: &ContactListQuery) -> contact::BoxedQuery<'static, Pg> {
    let mut scoped = for_user(user_id);

    if let Some(tag_id) = query.tag_id {
        scoped = scoped.filter(
            contact::id.eq_any(
                contact_tag::table
                    .filter(contact_tag::tag_id.eq(tag_id))
                    .select(contact_tag::contact_id),
            ),
        );
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        scoped = scoped.filter(search_predicate(search));
    }

    for filter in &query.filters {
        scoped = scoped.filter(filter_predicate(filter));
    }

    scoped
}

fn ordered(
    scoped: contact::BoxedQuery<'static, Pg>,
    sort_field: SortField,
    descending: bool,
) -> contact::BoxedQuery<'static, Pg> {
    let sorted = match (sort_field, descending) {
        (SortField::FirstName, false) => scoped.order(contact::first_name.asc()),
        (SortField::FirstName, true) => scoped.order(contact::first_name.desc()),
        (SortField::LastName, false) => scoped.order(contact::last_name.asc()),
        (SortField::LastName, true) => scoped.order(contact::last_name.desc()),
        (SortField::PhoneNumber, false) => scoped.order(contact::phone_number.asc()),
        (SortField::PhoneNumber, true) => scoped.order(contact::phone_number.desc()),
        (SortField::Email, false) => scoped.order(contact::email.asc()),
        (SortField::Email, true) => scoped.order(contact::email.desc()),
        (SortField::Website, false) => scoped.order(contact::website.asc()),
        (SortField::Website, true) => scoped.order(contact::website.desc()),
    };
    sorted.then_order_by(contact::id.asc())
}

/// ## Summary
/// Lists one page of a user's contacts with addresses and tags attached.
///
/// `total` counts every contact matching the filters, independent of the page
/// window. Ties in the sort column are broken by ascending contact id.
///
/// ## Errors
/// Returns database errors if queries fail.
#[tracing::instrument(skip(conn, query), fields(user_id = %user_id, tag_id = ?query.tag_id, filter_count = query.filters.len()))]
pub async fn list_contacts(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    query: &ContactListQuery,
) -> DbResult<ContactPage> {
    let total = scoped(user_id, query)
        .count()
        .get_result::<i64>(conn)
        .await?;

    let contacts = ordered(scoped(user_id, query), query.sort_field, query.sort_descending)
        .offset(query.starting_index)
        .limit(query.limit)
        .select(Contact::as_select())
        .load::<Contact>(conn)
        .await?;

    tracing::debug!(total, returned = contacts.len(), "Listed contacts");

    let data = load_details(conn, contacts).await?;

    Ok(ContactPage {
        data,
        total,
        starting_index: query.starting_index,
        limit: query.limit,
    })
}

#[cfg(test)]
#[path = "contact_list_tests.rs"]
mod tests;
