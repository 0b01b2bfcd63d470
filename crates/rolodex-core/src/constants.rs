/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const AUTH_ROUTE_COMPONENT: &str = "auth";
pub const AUTH_ROUTE_PREFIX: &str = const_str::concat!(API_ROUTE_PREFIX, "/", AUTH_ROUTE_COMPONENT);

pub const CONTACTS_ROUTE_COMPONENT: &str = "contacts";
pub const CONTACTS_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", CONTACTS_ROUTE_COMPONENT);

pub const TAGS_ROUTE_COMPONENT: &str = "tags";
pub const TAGS_ROUTE_PREFIX: &str = const_str::concat!(API_ROUTE_PREFIX, "/", TAGS_ROUTE_COMPONENT);

/// Maximum number of contacts a single user may own.
pub const MAX_CONTACT_COUNT: i64 = 500;

/// Maximum number of tags a single user may own.
pub const MAX_TAG_COUNT: i64 = 50;

/// Maximum size in bytes of a contact or profile image.
pub const MAX_IMAGE_SIZE: usize = 1024 * 1024;

/// Default page size for the contact listing.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Password length bounds enforced at registration and password change.
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 100;
